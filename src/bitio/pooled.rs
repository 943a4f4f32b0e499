//! Pooled `BytesMut` storage.
//!
//! A [`BufferPool`] hands out [`PooledBuffer`]s and takes them back when
//! they are dropped, so a buffer acquired for one block is released exactly
//! once on every exit path, including an encode that fails half way.
//! [`PooledBuffer::freeze`] detaches the bytes for hand-off to readers; that
//! also counts as the release.

use std::sync::Arc;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use super::{ByteSink, ByteSource};
use crate::error::{Error, Result};

/// Default initial size of a pooled buffer, in bytes.
pub const DEFAULT_ALLOCATION: usize = 4096;

/// Default growth cap of a pooled buffer, in bytes.
const DEFAULT_MAX_CAPACITY: usize = 16 * 1024 * 1024;

/// Default number of idle buffers kept for reuse.
const DEFAULT_MAX_IDLE: usize = 32;

/// Sizing of a [`BufferPool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    /// Initial capacity of freshly allocated buffers.
    pub buffer_size: usize,
    /// A buffer never grows beyond this many bytes.
    pub max_capacity: usize,
    /// Idle buffers beyond this count are freed instead of recycled.
    pub max_idle: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_ALLOCATION,
            max_capacity: DEFAULT_MAX_CAPACITY,
            max_idle: DEFAULT_MAX_IDLE,
        }
    }
}

impl PoolConfig {
    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    pub fn with_max_capacity(mut self, max_capacity: usize) -> Self {
        self.max_capacity = max_capacity;
        self
    }

    pub fn with_max_idle(mut self, max_idle: usize) -> Self {
        self.max_idle = max_idle;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.buffer_size == 0 {
            return Err(Error::InvalidArgument("pool buffer size must be greater than zero"));
        }
        if self.max_capacity < self.buffer_size {
            return Err(Error::InvalidArgument(
                "pool max capacity must be at least the buffer size",
            ));
        }
        Ok(())
    }
}

/// Snapshot of pool bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    pub acquired: u64,
    pub released: u64,
    pub idle: usize,
}

impl PoolStats {
    /// Buffers acquired and not yet released.
    pub fn outstanding(&self) -> u64 {
        self.acquired.saturating_sub(self.released)
    }
}

#[derive(Debug)]
struct PoolInner {
    config: PoolConfig,
    state: Mutex<PoolState>,
}

/// Idle list and counters, kept under one lock so a snapshot never sees a
/// release without its acquire.
#[derive(Debug, Default)]
struct PoolState {
    idle: Vec<BytesMut>,
    acquired: u64,
    released: u64,
}

/// A shared pool of reusable byte buffers. Cloning shares the pool.
#[derive(Debug, Clone)]
pub struct BufferPool {
    inner: Arc<PoolInner>,
}

impl BufferPool {
    /// Creates a pool with the given sizing.
    pub fn new(config: PoolConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_config(config))
    }

    /// Creates a pool with [`PoolConfig::default`].
    pub fn with_defaults() -> Self {
        Self::from_config(PoolConfig::default())
    }

    fn from_config(config: PoolConfig) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                config,
                state: Mutex::new(PoolState::default()),
            }),
        }
    }

    pub fn config(&self) -> &PoolConfig {
        &self.inner.config
    }

    /// Takes an idle buffer, or allocates one of the configured size.
    pub fn acquire(&self) -> PooledBuffer {
        let recycled = {
            let mut state = self.inner.state.lock();
            state.acquired += 1;
            state.idle.pop()
        };
        let reused = recycled.is_some();
        let buf =
            recycled.unwrap_or_else(|| BytesMut::with_capacity(self.inner.config.buffer_size));
        debug!(reused, capacity = buf.capacity(), "acquired pooled buffer");
        PooledBuffer {
            buf,
            pool: Some(self.clone()),
        }
    }

    /// Acquires a buffer with at least `initial_size` bytes of capacity.
    pub fn acquire_with_capacity(&self, initial_size: usize) -> Result<PooledBuffer> {
        if initial_size == 0 || initial_size > self.inner.config.max_capacity {
            return Err(Error::InvalidArgument(
                "initial size must be within 1..=max_capacity",
            ));
        }
        let mut buffer = self.acquire();
        buffer.buf.reserve(initial_size);
        Ok(buffer)
    }

    pub fn stats(&self) -> PoolStats {
        let state = self.inner.state.lock();
        PoolStats {
            acquired: state.acquired,
            released: state.released,
            idle: state.idle.len(),
        }
    }

    fn release(&self, mut buf: BytesMut) {
        buf.clear();
        let recycled = {
            let mut state = self.inner.state.lock();
            state.released += 1;
            if state.idle.len() < self.inner.config.max_idle {
                state.idle.push(buf);
                true
            } else {
                false
            }
        };
        debug!(recycled, "released pooled buffer");
    }

    fn detach(&self) {
        self.inner.state.lock().released += 1;
        debug!("detached pooled buffer");
    }
}

/// A byte buffer on loan from a [`BufferPool`]. Returned to the pool on drop.
#[derive(Debug)]
pub struct PooledBuffer {
    buf: BytesMut,
    /// `None` once the buffer has been handed back or detached.
    pool: Option<BufferPool>,
}

impl PooledBuffer {
    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.buf.capacity()
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Detaches the contents from the pool as an immutable [`Bytes`].
    pub fn freeze(mut self) -> Bytes {
        if let Some(pool) = self.pool.take() {
            pool.detach();
        }
        std::mem::take(&mut self.buf).freeze()
    }

    fn max_capacity(&self) -> usize {
        self.pool
            .as_ref()
            .map_or(DEFAULT_MAX_CAPACITY, |pool| pool.inner.config.max_capacity)
    }
}

impl ByteSink for PooledBuffer {
    #[inline]
    fn push_byte(&mut self, byte: u8) -> Result<()> {
        let max = self.max_capacity();
        if self.buf.len() >= max {
            warn!(limit = max, "pooled bit buffer is full");
            return Err(Error::CapacityExhausted { capacity: max });
        }
        if self.buf.len() == self.buf.capacity() {
            trace!(len = self.buf.len(), "growing pooled bit buffer");
        }
        self.buf.put_u8(byte);
        Ok(())
    }
}

impl Drop for PooledBuffer {
    fn drop(&mut self) {
        if let Some(pool) = self.pool.take() {
            pool.release(std::mem::take(&mut self.buf));
        }
    }
}

/// Frozen pooled buffers (and any other `Bytes`) are read front to back.
impl ByteSource for Bytes {
    #[inline]
    fn next_byte(&mut self) -> Result<u8> {
        if !self.has_remaining() {
            return Err(Error::UnexpectedEnd);
        }
        Ok(self.get_u8())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drop_returns_buffer_to_pool() {
        let pool = BufferPool::with_defaults();
        {
            let mut buf = pool.acquire();
            buf.push_byte(7).unwrap();
            assert_eq!(pool.stats().outstanding(), 1);
        }
        let stats = pool.stats();
        assert_eq!(stats.acquired, 1);
        assert_eq!(stats.released, 1);
        assert_eq!(stats.idle, 1);

        // The recycled buffer comes back empty.
        let buf = pool.acquire();
        assert!(buf.is_empty());
        assert_eq!(pool.stats().idle, 0);
    }

    #[test]
    fn test_freeze_counts_as_single_release() {
        let pool = BufferPool::with_defaults();
        let mut buf = pool.acquire();
        buf.push_byte(0xAB).unwrap();
        buf.push_byte(0xCD).unwrap();
        let mut frozen = buf.freeze();
        let stats = pool.stats();
        assert_eq!(stats.released, 1);
        assert_eq!(stats.idle, 0);
        assert_eq!(stats.outstanding(), 0);

        assert_eq!(frozen.next_byte().unwrap(), 0xAB);
        assert_eq!(frozen.next_byte().unwrap(), 0xCD);
        assert_eq!(frozen.next_byte(), Err(Error::UnexpectedEnd));
    }

    #[test]
    fn test_max_idle_bounds_recycling() {
        let pool = BufferPool::new(PoolConfig::default().with_max_idle(1)).unwrap();
        let a = pool.acquire();
        let b = pool.acquire();
        drop(a);
        drop(b);
        let stats = pool.stats();
        assert_eq!(stats.released, 2);
        assert_eq!(stats.idle, 1);
    }

    #[test]
    fn test_max_capacity_is_a_hard_limit() {
        let config = PoolConfig::default()
            .with_buffer_size(4)
            .with_max_capacity(4);
        let pool = BufferPool::new(config).unwrap();
        let mut buf = pool.acquire();
        for b in 0..4 {
            buf.push_byte(b).unwrap();
        }
        assert_eq!(
            buf.push_byte(4),
            Err(Error::CapacityExhausted { capacity: 4 })
        );
        assert_eq!(buf.as_bytes(), &[0, 1, 2, 3]);
    }

    #[test]
    fn test_buffer_grows_up_to_max_capacity() {
        let config = PoolConfig::default()
            .with_buffer_size(8)
            .with_max_capacity(1024);
        let pool = BufferPool::new(config).unwrap();
        let mut buf = pool.acquire();
        for i in 0..1000u32 {
            buf.push_byte(i as u8).unwrap();
        }
        assert_eq!(buf.len(), 1000);
    }

    #[test]
    fn test_outstanding_never_underflows() {
        let stats = PoolStats {
            acquired: 3,
            released: 5,
            idle: 0,
        };
        assert_eq!(stats.outstanding(), 0);
    }

    #[test]
    fn test_with_defaults_matches_default_config() {
        let a = BufferPool::with_defaults();
        let b = BufferPool::new(PoolConfig::default()).unwrap();
        assert_eq!(a.config(), b.config());
        assert_eq!(a.stats(), b.stats());
    }

    #[test]
    fn test_invalid_config() {
        let zero = PoolConfig::default().with_buffer_size(0);
        assert!(matches!(BufferPool::new(zero), Err(Error::InvalidArgument(_))));

        let inverted = PoolConfig::default()
            .with_buffer_size(1024)
            .with_max_capacity(16);
        assert!(matches!(
            BufferPool::new(inverted),
            Err(Error::InvalidArgument(_))
        ));

        let pool = BufferPool::with_defaults();
        assert!(pool.acquire_with_capacity(0).is_err());
        assert_eq!(pool.stats().acquired, 0);
        let buf = pool.acquire_with_capacity(8192).unwrap();
        assert!(buf.capacity() >= 8192);
    }
}
