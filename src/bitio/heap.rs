use tracing::{trace, warn};

use super::{ByteSink, ByteSource};
use crate::error::{Error, Result};

/// A growable in-memory byte store for [`BitWriter`](super::BitWriter).
///
/// An optional byte limit can be set to cap memory usage. When the limit is
/// reached, pushing another byte fails with [`Error::CapacityExhausted`]
/// instead of growing.
#[derive(Debug, Clone, Default)]
pub struct HeapBuffer {
    bytes: Vec<u8>,
    /// Maximum number of bytes the buffer may hold (`None` = unlimited).
    max_bytes: Option<usize>,
}

impl HeapBuffer {
    /// Creates a new empty buffer with no size limit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a buffer with the given pre-allocated capacity in bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(capacity),
            max_bytes: None,
        }
    }

    /// Creates a buffer that refuses to grow beyond `max_bytes` bytes.
    pub fn with_limit(max_bytes: usize) -> Result<Self> {
        if max_bytes == 0 {
            return Err(Error::InvalidArgument("byte limit must be greater than zero"));
        }
        Ok(Self {
            bytes: Vec::with_capacity(max_bytes.min(128)),
            max_bytes: Some(max_bytes),
        })
    }

    /// Sets (or clears) the byte limit on an existing buffer.
    ///
    /// A zero limit is rejected the same way [`with_limit`](Self::with_limit)
    /// rejects it, leaving the current limit in place.
    pub fn set_limit(&mut self, max_bytes: Option<usize>) -> Result<()> {
        if max_bytes == Some(0) {
            return Err(Error::InvalidArgument("byte limit must be greater than zero"));
        }
        self.max_bytes = max_bytes;
        Ok(())
    }

    /// Returns the current byte limit, if any.
    pub fn limit(&self) -> Option<usize> {
        self.max_bytes
    }

    /// Returns the number of bytes that can still be stored before hitting
    /// the limit, or `None` if no limit is set.
    pub fn remaining_capacity(&self) -> Option<usize> {
        self.max_bytes.map(|max| max.saturating_sub(self.bytes.len()))
    }

    /// Returns the number of stored bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns `true` if no byte has been stored.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Returns the stored bytes.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consumes the buffer and returns the stored bytes.
    #[inline]
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

impl ByteSink for HeapBuffer {
    #[inline]
    fn push_byte(&mut self, byte: u8) -> Result<()> {
        if let Some(max) = self.max_bytes {
            if self.bytes.len() >= max {
                warn!(limit = max, "heap bit buffer is full");
                return Err(Error::CapacityExhausted { capacity: max });
            }
        }
        if self.bytes.len() == self.bytes.capacity() {
            trace!(len = self.bytes.len(), "growing heap bit buffer");
        }
        self.bytes.push(byte);
        Ok(())
    }
}

impl From<Vec<u8>> for HeapBuffer {
    fn from(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            max_bytes: None,
        }
    }
}

/// A [`ByteSource`] over a borrowed byte slice.
#[derive(Debug, Clone)]
pub struct SliceSource<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> SliceSource<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    /// Returns the number of bytes not yet consumed.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }
}

impl ByteSource for SliceSource<'_> {
    #[inline]
    fn next_byte(&mut self) -> Result<u8> {
        let byte = *self.bytes.get(self.pos).ok_or(Error::UnexpectedEnd)?;
        self.pos += 1;
        Ok(byte)
    }
}
