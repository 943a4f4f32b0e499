//! XOR value codec.
//!
//! The first value is stored raw. Each later value is XOR-ed with its
//! predecessor and stored as:
//!
//! - `0` when the XOR is zero;
//! - `10` + the meaningful bits, when they fit the previous window;
//! - `11` + 5-bit leading zero count + 6-bit meaningful bit count + the
//!   meaningful bits, opening a new window.
//!
//! Leading zero counts above 31 are clamped to 31 so they fit five bits. A
//! meaningful count of 64 does not fit six bits and is written as 0.

use crate::bitio::{BitInput, BitOutput};
use crate::error::{Error, Result};

const LEADING_ZEROS_BITS: u32 = 5;
const MEANINGFUL_BITS_BITS: u32 = 6;
const MAX_LEADING_ZEROS: u32 = (1 << LEADING_ZEROS_BITS) - 1;

/// Window value before any window has been written. No non-zero XOR fits it.
const NO_WINDOW: u32 = 64;

/// Encoding half of the value codec.
#[derive(Debug, Clone)]
pub struct ValueEncoder {
    prev_value: u64,
    prev_leading: u32,
    prev_trailing: u32,
}

impl Default for ValueEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ValueEncoder {
    pub fn new() -> Self {
        Self {
            prev_value: 0,
            prev_leading: NO_WINDOW,
            prev_trailing: NO_WINDOW,
        }
    }

    /// Writes the first value of a block raw.
    pub fn write_first<W: BitOutput>(&mut self, value: u64, out: &mut W) -> Result<()> {
        out.write_bits(value, 64)?;
        self.prev_value = value;
        Ok(())
    }

    /// Writes a value XOR-ed against the previous one.
    pub fn write_next<W: BitOutput>(&mut self, value: u64, out: &mut W) -> Result<()> {
        let xor = value ^ self.prev_value;

        if xor == 0 {
            out.skip_bit()?;
        } else {
            out.write_bit(true)?;

            let leading = xor.leading_zeros().min(MAX_LEADING_ZEROS);
            let trailing = xor.trailing_zeros();

            if leading >= self.prev_leading && trailing >= self.prev_trailing {
                out.skip_bit()?;
                let meaningful = 64 - self.prev_leading - self.prev_trailing;
                out.write_bits(xor >> self.prev_trailing, meaningful)?;
            } else {
                out.write_bit(true)?;
                let meaningful = 64 - leading - trailing;
                out.write_bits(u64::from(leading), LEADING_ZEROS_BITS)?;
                out.write_bits(u64::from(meaningful), MEANINGFUL_BITS_BITS)?;
                out.write_bits(xor >> trailing, meaningful)?;

                self.prev_leading = leading;
                self.prev_trailing = trailing;
            }
        }

        self.prev_value = value;
        Ok(())
    }
}

/// Decoding half of the value codec.
#[derive(Debug, Clone)]
pub struct ValueDecoder {
    prev_value: u64,
    prev_leading: u32,
    prev_trailing: u32,
}

impl Default for ValueDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ValueDecoder {
    pub fn new() -> Self {
        Self {
            prev_value: 0,
            prev_leading: NO_WINDOW,
            prev_trailing: NO_WINDOW,
        }
    }

    /// Reads the raw first value of a block.
    pub fn read_first<R: BitInput>(&mut self, input: &mut R) -> Result<u64> {
        self.prev_value = input.get_long(64)?;
        Ok(self.prev_value)
    }

    /// Reads a value XOR-ed against the previous one.
    pub fn read_next<R: BitInput>(&mut self, input: &mut R) -> Result<u64> {
        if !input.read_bit()? {
            return Ok(self.prev_value);
        }

        if input.read_bit()? {
            let leading = input.get_long(LEADING_ZEROS_BITS)? as u32;
            let meaningful = match input.get_long(MEANINGFUL_BITS_BITS)? as u32 {
                0 => 64,
                n => n,
            };
            let trailing = 64u32
                .checked_sub(leading + meaningful)
                .ok_or(Error::CorruptWindow {
                    leading,
                    meaningful,
                })?;
            self.prev_leading = leading;
            self.prev_trailing = trailing;
        }

        let meaningful = match 64u32.checked_sub(self.prev_leading + self.prev_trailing) {
            Some(n) if n > 0 => n,
            _ => {
                return Err(Error::CorruptWindow {
                    leading: self.prev_leading,
                    meaningful: 0,
                })
            }
        };
        let bits = input.get_long(meaningful)?;
        self.prev_value ^= bits << self.prev_trailing;
        Ok(self.prev_value)
    }
}
