//! # gorilla-block
//!
//! Streaming block compression for time series, after Facebook's Gorilla
//! (*"Gorilla: A Fast, Scalable, In-Memory Time Series Database"*, VLDB 2015).
//!
//! ## Algorithm overview
//!
//! A block is anchored at a start timestamp and holds `(timestamp, value)`
//! samples in strictly increasing timestamp order. Values are opaque 64-bit
//! patterns; callers usually store `f64` bits or `i64`s.
//!
//! - **Timestamps** are stored as *delta-of-delta*. Regular intervals cost a
//!   single bit per sample; deviations use 7, 9, 12 or 32-bit payloads chosen
//!   by a short prefix. See [`timestamp`].
//! - **Values** are XOR-ed with their predecessor. An unchanged value costs
//!   one bit, a change stores only the meaningful bits between the leading and
//!   trailing zeros, reusing the previous window when it fits. See [`value`].
//!
//! ## Block layout
//!
//! ```text
//! block start        64 bits
//! sample 0           14-bit delta from block start, 64-bit raw value
//! sample 1           14-bit delta, XOR value
//! sample n >= 2      delta-of-delta, XOR value
//! end marker         1111 + 32 one bits + 0, zero padded to a byte
//! ```
//!
//! ## Storage
//!
//! The codecs write through [`BitOutput`] and read through [`BitInput`].
//! [`BitWriter`] and [`BitReader`] implement them over any [`ByteSink`] or
//! [`ByteSource`]: a growable [`HeapBuffer`], a [`PooledBuffer`] from a
//! [`BufferPool`], or a fixed-capacity [`WordArray`].
//!
//! ## Example
//!
//! ```rust
//! use gorilla_block::{BitWriter, Compressor, Decompressor, HeapBuffer, Pair};
//!
//! let block_start = 1_609_459_200;
//! let mut c = Compressor::new(block_start, BitWriter::new(HeapBuffer::new())).unwrap();
//! c.add_f64(block_start + 10, 1.0).unwrap();
//! c.add_f64(block_start + 20, -2.0).unwrap();
//! c.add_f64(block_start + 28, -2.5).unwrap();
//! c.close().unwrap();
//!
//! let bytes = c.into_inner().into_inner().into_bytes();
//! let pairs = Decompressor::decode(&bytes).unwrap();
//! assert_eq!(pairs.len(), 3);
//! assert_eq!(pairs[2], Pair::from_f64(block_start + 28, -2.5));
//! ```
//!
//! ## Pooled buffers
//!
//! ```rust
//! use gorilla_block::{BitReader, BitWriter, BufferPool, Compressor, Decompressor, SliceSource};
//!
//! let pool = BufferPool::with_defaults();
//! let mut c = Compressor::new(0, BitWriter::new(pool.acquire())).unwrap();
//! c.add_i64(60, 7).unwrap();
//! let buffer = c.finish().unwrap().into_inner();
//!
//! let mut d = Decompressor::new(BitReader::new(SliceSource::new(buffer.as_bytes())));
//! assert_eq!(d.read_pair().unwrap().unwrap().i64_value(), 7);
//! drop(d);
//! drop(buffer); // returned to the pool
//! assert_eq!(pool.stats().outstanding(), 0);
//! ```

pub mod bitio;
pub mod compressor;
pub mod decompressor;
pub mod error;
pub mod pair;
pub mod timestamp;
pub mod value;

// Re-export primary types at the crate root.
pub use bitio::{
    BitInput, BitOutput, BitReader, BitWriter, BufferPool, ByteSink, ByteSource, HeapBuffer,
    PoolConfig, PoolStats, PooledBuffer, SliceSource, WordArray, WordSource,
};
pub use compressor::Compressor;
pub use decompressor::Decompressor;
pub use error::{Error, Result};
pub use pair::Pair;
