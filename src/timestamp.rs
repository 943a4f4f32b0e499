//! Delta-of-delta timestamp codec.
//!
//! The first two samples store their delta raw in a [`HEADER_DELTA_BITS`]
//! field. Every later sample stores `dod = delta - previous delta` with a
//! bucket code:
//!
//! | dod              | prefix | payload |
//! |------------------|--------|---------|
//! | 0                | `0`    | -       |
//! | [-63, 64]        | `10`   | 7 bits  |
//! | [-255, 256]      | `110`  | 9 bits  |
//! | [-2047, 2048]    | `1110` | 12 bits |
//! | otherwise        | `1111` | 32 bits |
//!
//! A `b`-bit payload `raw` decodes to `raw - 2^b` when `raw > 2^(b-1)`, which
//! gives every bucket the range `[-(2^(b-1) - 1), 2^(b-1)]`.
//!
//! The end of a block is marked by `1111` followed by 32 one bits. Read in a
//! header slot that is the reserved delta [`HEADER_END_MARKER`]; read as a
//! dod it is the reserved payload [`DOD_END_MARKER`], which no dod in range
//! can produce because `-1` always takes the 7-bit bucket.

use crate::bitio::{BitInput, BitOutput};
use crate::error::{Error, Result};

/// Width of the raw delta stored for the first and second samples.
pub const HEADER_DELTA_BITS: u32 = 14;

/// Header delta reserved as the end-of-stream marker.
pub const HEADER_END_MARKER: u64 = (1 << HEADER_DELTA_BITS) - 1;

/// 32-bit dod payload reserved as the end-of-stream marker.
pub const DOD_END_MARKER: u64 = 0xFFFF_FFFF;

/// `(min, max, prefix, prefix bits, payload bits)` of the narrow dod buckets,
/// narrowest first.
const BUCKETS: [(i64, i64, u64, u32, u32); 3] = [
    (-63, 64, 0b10, 2, 7),
    (-255, 256, 0b110, 3, 9),
    (-2047, 2048, 0b1110, 4, 12),
];

const WIDE_PREFIX: u64 = 0b1111;
const WIDE_PAYLOAD_BITS: u32 = 32;

/// Writes the end-of-stream marker.
pub(crate) fn write_end_marker<W: BitOutput>(out: &mut W) -> Result<()> {
    out.write_bits(WIDE_PREFIX, 4)?;
    out.write_bits(DOD_END_MARKER, WIDE_PAYLOAD_BITS)?;
    out.skip_bit()
}

/// Interprets a `bits`-wide payload with the bucket ranges above.
#[inline]
fn decode_payload(raw: u64, bits: u32) -> i64 {
    let raw = raw as i64;
    if raw > 1 << (bits - 1) {
        raw - (1 << bits)
    } else {
        raw
    }
}

/// Encoding half of the timestamp codec.
#[derive(Debug, Clone)]
pub struct TimestampEncoder {
    prev_timestamp: i64,
    prev_delta: i64,
}

impl TimestampEncoder {
    /// Starts a block anchored at `block_start`.
    pub fn new(block_start: i64) -> Self {
        Self {
            prev_timestamp: block_start,
            prev_delta: 0,
        }
    }

    /// Encodes the first or second sample as a raw header delta.
    ///
    /// Nothing is written and the state is left untouched if the delta cannot
    /// be represented.
    pub fn write_header<W: BitOutput>(&mut self, timestamp: i64, out: &mut W) -> Result<()> {
        let delta = timestamp.wrapping_sub(self.prev_timestamp);
        if !(0..HEADER_END_MARKER as i64).contains(&delta) {
            return Err(Error::HeaderDeltaOutOfRange { delta });
        }
        out.write_bits(delta as u64, HEADER_DELTA_BITS)?;
        self.prev_delta = delta;
        self.prev_timestamp = timestamp;
        Ok(())
    }

    /// Encodes a sample after the second one as a delta-of-delta.
    pub fn write_next<W: BitOutput>(&mut self, timestamp: i64, out: &mut W) -> Result<()> {
        debug_assert!(
            timestamp > self.prev_timestamp,
            "timestamps must be strictly increasing ({timestamp} after {})",
            self.prev_timestamp
        );
        let delta = timestamp.wrapping_sub(self.prev_timestamp);
        let dod = delta.wrapping_sub(self.prev_delta);
        write_dod(dod, out)?;
        self.prev_delta = delta;
        self.prev_timestamp = timestamp;
        Ok(())
    }
}

/// Writes one delta-of-delta with its bucket prefix.
fn write_dod<W: BitOutput>(dod: i64, out: &mut W) -> Result<()> {
    if dod == 0 {
        return out.skip_bit();
    }
    for (min, max, prefix, prefix_bits, payload_bits) in BUCKETS {
        if (min..=max).contains(&dod) {
            out.write_bits(prefix, prefix_bits)?;
            return out.write_bits(dod as u64, payload_bits);
        }
    }
    debug_assert!(
        dod > -(1 << 31) && dod <= 1 << 31,
        "delta-of-delta {dod} overflows the 32-bit bucket"
    );
    out.write_bits(WIDE_PREFIX, 4)?;
    out.write_bits(dod as u64, WIDE_PAYLOAD_BITS)
}

/// Decoding half of the timestamp codec.
#[derive(Debug, Clone)]
pub struct TimestampDecoder {
    prev_timestamp: i64,
    prev_delta: i64,
}

impl TimestampDecoder {
    /// Starts a block anchored at `block_start`.
    pub fn new(block_start: i64) -> Self {
        Self {
            prev_timestamp: block_start,
            prev_delta: 0,
        }
    }

    /// Reads a raw header delta. `None` means the end marker was found.
    pub fn read_header<R: BitInput>(&mut self, input: &mut R) -> Result<Option<i64>> {
        let delta = input.get_long(HEADER_DELTA_BITS)?;
        if delta == HEADER_END_MARKER {
            return Ok(None);
        }
        self.prev_delta = delta as i64;
        self.prev_timestamp = self.prev_timestamp.wrapping_add(self.prev_delta);
        Ok(Some(self.prev_timestamp))
    }

    /// Reads a delta-of-delta. `None` means the end marker was found.
    pub fn read_next<R: BitInput>(&mut self, input: &mut R) -> Result<Option<i64>> {
        let dod = match input.next_clear_bit(4)? {
            0b0 => 0,
            0b10 => decode_payload(input.get_long(7)?, 7),
            0b110 => decode_payload(input.get_long(9)?, 9),
            0b1110 => decode_payload(input.get_long(12)?, 12),
            _ => {
                let raw = input.get_long(WIDE_PAYLOAD_BITS)?;
                if raw == DOD_END_MARKER {
                    return Ok(None);
                }
                decode_payload(raw, WIDE_PAYLOAD_BITS)
            }
        };
        self.prev_delta = self.prev_delta.wrapping_add(dod);
        self.prev_timestamp = self.prev_timestamp.wrapping_add(self.prev_delta);
        Ok(Some(self.prev_timestamp))
    }
}
