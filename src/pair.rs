/// A single sample: a timestamp and an opaque 64-bit value.
///
/// The value is stored as a raw bit pattern. [`f64_value`](Self::f64_value)
/// and [`i64_value`](Self::i64_value) reinterpret it; equality compares the
/// bits, so NaN payloads and `-0.0` compare exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pair {
    pub timestamp: i64,
    pub value: u64,
}

impl Pair {
    /// Creates a pair from a raw value pattern.
    pub const fn new(timestamp: i64, value: u64) -> Self {
        Self { timestamp, value }
    }

    /// Creates a pair holding the bits of an `f64`.
    pub fn from_f64(timestamp: i64, value: f64) -> Self {
        Self::new(timestamp, value.to_bits())
    }

    /// Creates a pair holding a two's complement `i64`.
    pub const fn from_i64(timestamp: i64, value: i64) -> Self {
        Self::new(timestamp, value as u64)
    }

    #[inline]
    pub fn f64_value(&self) -> f64 {
        f64::from_bits(self.value)
    }

    #[inline]
    pub const fn i64_value(&self) -> i64 {
        self.value as i64
    }
}
