//! Error type shared by the bit I/O layer and the block codecs.

use thiserror::Error;

/// Errors produced while building or reading a compressed block.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The writer's backing store cannot accept another byte.
    #[error("bit output capacity exhausted at {capacity} bytes")]
    CapacityExhausted { capacity: usize },

    /// A constructor was handed an unusable size or limit.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// The first or second sample's delta does not fit the fixed header field.
    #[error("timestamp delta {delta} does not fit the 14-bit header field")]
    HeaderDeltaOutOfRange { delta: i64 },

    /// The reader ran past the end of its backing store.
    #[error("unexpected end of compressed stream")]
    UnexpectedEnd,

    /// A decoded value window cannot describe a 64-bit word.
    #[error("corrupted value window (leading={leading}, meaningful={meaningful})")]
    CorruptWindow { leading: u32, meaningful: u32 },
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
