//! Bit-level input/output over byte-granular storage.
//!
//! The codecs only ever talk to [`BitOutput`] and [`BitInput`]. The bit cursor
//! that implements them is written once ([`BitWriter`], [`BitReader`]) and is
//! generic over the storage, which only has to move whole bytes:
//!
//! - [`ByteSink`] accepts one byte at a time and reports exhaustion as
//!   [`Error::CapacityExhausted`].
//! - [`ByteSource`] yields one byte at a time and reports the end of data as
//!   [`Error::UnexpectedEnd`].
//!
//! Three backends are provided: a growable heap buffer ([`HeapBuffer`]), a
//! pooled `BytesMut` buffer ([`PooledBuffer`]) and a fixed-capacity word
//! array ([`WordArray`]).

mod heap;
mod pooled;
mod words;

pub use heap::{HeapBuffer, SliceSource};
pub use pooled::{BufferPool, PoolConfig, PoolStats, PooledBuffer, DEFAULT_ALLOCATION};
pub use words::{WordArray, WordSource};

use crate::error::{Error, Result};

/// Sequential bit writer, most significant bit first.
pub trait BitOutput {
    /// Writes a single bit.
    fn write_bit(&mut self, bit: bool) -> Result<()>;

    /// Advances the cursor by one bit, leaving it cleared.
    fn skip_bit(&mut self) -> Result<()> {
        self.write_bit(false)
    }

    /// Writes the lowest `count` bits of `value`, most significant first.
    /// `count` must be in `1..=64`.
    fn write_bits(&mut self, value: u64, count: u32) -> Result<()>;

    /// Commits any partially filled trailing byte. Unwritten bits are zero.
    fn flush(&mut self) -> Result<()>;
}

/// Sequential bit reader, most significant bit first.
pub trait BitInput {
    /// Reads a single bit.
    fn read_bit(&mut self) -> Result<bool>;

    /// Reads `count` bits (`1..=64`) as a big-endian unsigned value.
    fn get_long(&mut self, count: u32) -> Result<u64>;

    /// Reads bits until a `0` is seen or `max_bits` bits were consumed,
    /// returning the bits read as an unsigned value.
    ///
    /// `0` → `0b0`, `10` → `0b10`, `110` → `0b110`; with `max_bits = 4`,
    /// `1111` → `0b1111` without consuming a terminating zero.
    fn next_clear_bit(&mut self, max_bits: u32) -> Result<u32> {
        let mut value = 0u32;
        for _ in 0..max_bits {
            value <<= 1;
            if self.read_bit()? {
                value |= 1;
            } else {
                break;
            }
        }
        Ok(value)
    }
}

impl<T: BitOutput + ?Sized> BitOutput for &mut T {
    #[inline]
    fn write_bit(&mut self, bit: bool) -> Result<()> {
        (**self).write_bit(bit)
    }

    #[inline]
    fn skip_bit(&mut self) -> Result<()> {
        (**self).skip_bit()
    }

    #[inline]
    fn write_bits(&mut self, value: u64, count: u32) -> Result<()> {
        (**self).write_bits(value, count)
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }
}

impl<T: BitInput + ?Sized> BitInput for &mut T {
    #[inline]
    fn read_bit(&mut self) -> Result<bool> {
        (**self).read_bit()
    }

    #[inline]
    fn get_long(&mut self, count: u32) -> Result<u64> {
        (**self).get_long(count)
    }

    #[inline]
    fn next_clear_bit(&mut self, max_bits: u32) -> Result<u32> {
        (**self).next_clear_bit(max_bits)
    }
}

/// Storage that accepts whole bytes from a [`BitWriter`].
pub trait ByteSink {
    /// Appends one byte, or fails with [`Error::CapacityExhausted`].
    fn push_byte(&mut self, byte: u8) -> Result<()>;
}

/// Storage that yields whole bytes to a [`BitReader`].
pub trait ByteSource {
    /// Consumes the next byte, or fails with [`Error::UnexpectedEnd`].
    fn next_byte(&mut self) -> Result<u8>;
}

impl<T: ByteSink + ?Sized> ByteSink for &mut T {
    #[inline]
    fn push_byte(&mut self, byte: u8) -> Result<()> {
        (**self).push_byte(byte)
    }
}

/// Returns a mask with the lowest `n` bits set, for `n < 64`.
#[inline]
fn low_mask(n: u32) -> u64 {
    (1u64 << n) - 1
}

// ── writer ─────────────────────────────────────────────────────────────

/// Bit cursor writing into a [`ByteSink`].
///
/// Bits accumulate in a single byte which is handed to the sink as soon as
/// it is full. [`flush`](BitOutput::flush) hands over the last partial byte.
#[derive(Debug)]
pub struct BitWriter<S> {
    sink: S,
    /// Byte currently being filled.
    byte: u8,
    /// Free bits left in `byte` (8 when empty, 0 when full but not yet stored).
    bits_left: u8,
    /// Total number of bits written.
    bits_written: u64,
    flushed: bool,
}

impl<S: ByteSink> BitWriter<S> {
    /// Creates a writer appending to `sink`.
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            byte: 0,
            bits_left: 8,
            bits_written: 0,
            flushed: false,
        }
    }

    /// Returns the number of bits written so far, excluding flush padding.
    #[inline]
    pub fn len_bits(&self) -> u64 {
        self.bits_written
    }

    /// Returns `true` once [`flush`](BitOutput::flush) has completed.
    #[inline]
    pub fn is_flushed(&self) -> bool {
        self.flushed
    }

    /// Returns a reference to the backing store.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Consumes the writer and returns the backing store.
    ///
    /// Bits that were not flushed are discarded.
    pub fn into_inner(self) -> S {
        self.sink
    }

    /// Stores the current byte if it is full.
    ///
    /// On failure the full byte stays pending, so every later write retries
    /// the store and fails the same way instead of corrupting the cursor.
    #[inline]
    fn flip_byte(&mut self) -> Result<()> {
        if self.bits_left == 0 {
            self.sink.push_byte(self.byte)?;
            self.byte = 0;
            self.bits_left = 8;
        }
        Ok(())
    }
}

impl<S: ByteSink> BitOutput for BitWriter<S> {
    #[inline]
    fn write_bit(&mut self, bit: bool) -> Result<()> {
        debug_assert!(!self.flushed, "write after flush");
        self.flip_byte()?;
        if bit {
            self.byte |= 1 << (self.bits_left - 1);
        }
        self.bits_left -= 1;
        self.bits_written += 1;
        self.flip_byte()
    }

    fn write_bits(&mut self, value: u64, count: u32) -> Result<()> {
        debug_assert!((1..=64).contains(&count), "bit count {count} out of range");
        debug_assert!(!self.flushed, "write after flush");
        self.flip_byte()?;

        let mut remaining = count;
        while remaining > 0 {
            let free = u32::from(self.bits_left);
            let n = remaining.min(free);
            let chunk = (value >> (remaining - n)) & low_mask(n);
            self.byte |= (chunk as u8) << (free - n);
            remaining -= n;
            self.bits_left -= n as u8;
            self.flip_byte()?;
        }
        self.bits_written += u64::from(count);
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        if self.flushed {
            return Ok(());
        }
        self.flip_byte()?;
        if self.bits_left < 8 {
            self.bits_left = 0;
            self.flip_byte()?;
        }
        self.flushed = true;
        Ok(())
    }
}

// ── reader ─────────────────────────────────────────────────────────────

/// Bit cursor reading from a [`ByteSource`].
///
/// Nothing is pulled from the source until the first bit is requested.
#[derive(Debug)]
pub struct BitReader<S> {
    source: S,
    /// Byte currently being consumed.
    byte: u8,
    /// Unconsumed bits left in `byte`.
    bits_left: u8,
}

impl<S: ByteSource> BitReader<S> {
    /// Creates a reader consuming `source`.
    pub fn new(source: S) -> Self {
        Self {
            source,
            byte: 0,
            bits_left: 0,
        }
    }

    /// Returns a reference to the backing source.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Consumes the reader and returns the backing source.
    pub fn into_inner(self) -> S {
        self.source
    }

    #[inline]
    fn pull_byte(&mut self) -> Result<()> {
        self.byte = self.source.next_byte()?;
        self.bits_left = 8;
        Ok(())
    }
}

impl<S: ByteSource> BitInput for BitReader<S> {
    #[inline]
    fn read_bit(&mut self) -> Result<bool> {
        if self.bits_left == 0 {
            self.pull_byte()?;
        }
        self.bits_left -= 1;
        Ok((self.byte >> self.bits_left) & 1 == 1)
    }

    fn get_long(&mut self, count: u32) -> Result<u64> {
        debug_assert!((1..=64).contains(&count), "bit count {count} out of range");
        let mut remaining = count;
        let mut value = 0u64;
        while remaining > 0 {
            if self.bits_left == 0 {
                self.pull_byte()?;
            }
            let available = u32::from(self.bits_left);
            let n = remaining.min(available);
            let chunk = (u64::from(self.byte) >> (available - n)) & low_mask(n);
            value = (value << n) | chunk;
            remaining -= n;
            self.bits_left -= n as u8;
        }
        Ok(value)
    }
}
