use tracing::warn;

use super::{ByteSink, ByteSource};
use crate::error::{Error, Result};

/// A fixed-capacity store of `u64` words.
///
/// All words are allocated up front and bytes are packed into them
/// big-endian, so `words()[0] >> 56` is the first byte of the stream. The
/// array never grows: pushing past the last word fails with
/// [`Error::CapacityExhausted`].
#[derive(Debug, Clone)]
pub struct WordArray {
    words: Vec<u64>,
    /// Number of bytes stored.
    len: usize,
}

impl WordArray {
    /// Allocates `words` zeroed words.
    pub fn with_capacity(words: usize) -> Result<Self> {
        if words == 0 {
            return Err(Error::InvalidArgument("word array capacity must be greater than zero"));
        }
        Ok(Self {
            words: vec![0; words],
            len: 0,
        })
    }

    /// Capacity in bytes.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.words.len() * 8
    }

    /// Number of stored bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Words holding the stored bytes. The last word may be partly used.
    pub fn words(&self) -> &[u64] {
        &self.words[..self.len.div_ceil(8)]
    }

    /// Copies the stored bytes out in stream order.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.words()
            .iter()
            .flat_map(|w| w.to_be_bytes())
            .take(self.len)
            .collect()
    }

    /// Returns a source reading the stored bytes back.
    pub fn source(&self) -> WordSource<'_> {
        WordSource::new(self.words(), self.len)
    }
}

impl ByteSink for WordArray {
    #[inline]
    fn push_byte(&mut self, byte: u8) -> Result<()> {
        let index = self.len / 8;
        let Some(word) = self.words.get_mut(index) else {
            let capacity = self.words.len() * 8;
            warn!(capacity, "word array is full");
            return Err(Error::CapacityExhausted { capacity });
        };
        let shift = 56 - 8 * (self.len % 8);
        *word |= u64::from(byte) << shift;
        self.len += 1;
        Ok(())
    }
}

/// A [`ByteSource`] over big-endian packed words.
#[derive(Debug, Clone)]
pub struct WordSource<'a> {
    words: &'a [u64],
    /// Number of valid bytes in `words`.
    len: usize,
    pos: usize,
}

impl<'a> WordSource<'a> {
    /// Reads `len` bytes packed into `words`. `len` is clamped to the words
    /// actually present.
    pub fn new(words: &'a [u64], len: usize) -> Self {
        Self {
            words,
            len: len.min(words.len() * 8),
            pos: 0,
        }
    }
}

impl ByteSource for WordSource<'_> {
    #[inline]
    fn next_byte(&mut self) -> Result<u8> {
        if self.pos >= self.len {
            return Err(Error::UnexpectedEnd);
        }
        let word = self.words[self.pos / 8];
        let shift = 56 - 8 * (self.pos % 8);
        self.pos += 1;
        Ok((word >> shift) as u8)
    }
}
