use tracing::debug;

use crate::bitio::{BitOutput, BitWriter, HeapBuffer};
use crate::error::Result;
use crate::pair::Pair;
use crate::timestamp::{self, TimestampEncoder};
use crate::value::ValueEncoder;

/// The block compressor.
///
/// Writes the 64-bit block start on construction, then one sample per
/// [`add_value`](Self::add_value) call, and the end-of-stream marker on
/// [`close`](Self::close). Samples must be added in strictly increasing
/// timestamp order, and the first two timestamps must each be less than
/// 16383 units after their predecessor (the block start for the first).
///
/// # Example
/// ```
/// use gorilla_block::{BitWriter, Compressor, HeapBuffer};
///
/// let block_start = 1_609_459_200;
/// let mut c = Compressor::new(block_start, BitWriter::new(HeapBuffer::new())).unwrap();
/// c.add_f64(block_start + 60, 12.0).unwrap();
/// c.add_f64(block_start + 120, 12.5).unwrap();
/// c.add_f64(block_start + 180, 13.0).unwrap();
/// c.close().unwrap();
///
/// let bytes = c.into_inner().into_inner().into_bytes();
/// assert!(bytes.len() < 3 * 16);
/// ```
#[derive(Debug)]
pub struct Compressor<W> {
    out: W,
    block_start: i64,
    /// Number of samples written.
    count: u64,
    timestamps: TimestampEncoder,
    values: ValueEncoder,
    closed: bool,
}

impl<W: BitOutput> Compressor<W> {
    /// Starts a block anchored at `block_start`, writing its header to `out`.
    pub fn new(block_start: i64, mut out: W) -> Result<Self> {
        out.write_bits(block_start as u64, 64)?;
        Ok(Self {
            out,
            block_start,
            count: 0,
            timestamps: TimestampEncoder::new(block_start),
            values: ValueEncoder::new(),
            closed: false,
        })
    }

    /// Appends a sample with a raw 64-bit value.
    ///
    /// The sample counter only advances on success. After an error the
    /// output holds a partial sample and the block should be discarded.
    pub fn add_value(&mut self, timestamp: i64, value: u64) -> Result<()> {
        debug_assert!(!self.closed, "add_value after close()");

        match self.count {
            0 => {
                self.timestamps.write_header(timestamp, &mut self.out)?;
                self.values.write_first(value, &mut self.out)?;
            }
            1 => {
                self.timestamps.write_header(timestamp, &mut self.out)?;
                self.values.write_next(value, &mut self.out)?;
            }
            _ => {
                self.timestamps.write_next(timestamp, &mut self.out)?;
                self.values.write_next(value, &mut self.out)?;
            }
        }

        self.count += 1;
        Ok(())
    }

    /// Appends a sample holding the bits of an `f64`.
    pub fn add_f64(&mut self, timestamp: i64, value: f64) -> Result<()> {
        self.add_value(timestamp, value.to_bits())
    }

    /// Appends a sample holding a two's complement `i64`.
    pub fn add_i64(&mut self, timestamp: i64, value: i64) -> Result<()> {
        self.add_value(timestamp, value as u64)
    }

    pub fn add_pair(&mut self, pair: Pair) -> Result<()> {
        self.add_value(pair.timestamp, pair.value)
    }

    /// Writes the end-of-stream marker and flushes the output.
    ///
    /// Calling `close` again is a no-op.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        timestamp::write_end_marker(&mut self.out)?;
        self.out.flush()?;
        self.closed = true;
        debug!(
            block_start = self.block_start,
            samples = self.count,
            "closed block"
        );
        Ok(())
    }

    /// Closes the block and returns the output.
    pub fn finish(mut self) -> Result<W> {
        self.close()?;
        Ok(self.out)
    }

    /// Returns the number of samples written so far.
    pub fn len(&self) -> u64 {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn block_start(&self) -> i64 {
        self.block_start
    }

    /// Returns a reference to the bound output.
    pub fn output(&self) -> &W {
        &self.out
    }

    /// Consumes the compressor and returns the bound output, closed or not.
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl Compressor<BitWriter<HeapBuffer>> {
    /// Compresses `pairs` into a closed block held in a fresh heap buffer.
    pub fn encode<I>(block_start: i64, pairs: I) -> Result<Vec<u8>>
    where
        I: IntoIterator<Item = Pair>,
    {
        let mut c = Compressor::new(block_start, BitWriter::new(HeapBuffer::new()))?;
        for pair in pairs {
            c.add_pair(pair)?;
        }
        let bytes = c.finish()?.into_inner().into_bytes();
        debug!(bytes = bytes.len(), "encoded block");
        Ok(bytes)
    }
}
