use std::iter::FusedIterator;

use tracing::debug;

use crate::bitio::{BitInput, BitReader, SliceSource};
use crate::error::Result;
use crate::pair::Pair;
use crate::timestamp::TimestampDecoder;
use crate::value::ValueDecoder;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Block start and first sample not read yet.
    Initial,
    SecondPoint,
    Subsequent,
    /// End marker seen or an error occurred.
    Finished,
}

/// The block decompressor.
///
/// Reads one sample per [`read_pair`](Self::read_pair) call and returns
/// `Ok(None)` once the end-of-stream marker is reached, on that call and
/// every later one. It also iterates as `Result<Pair>`.
///
/// # Example
/// ```
/// use gorilla_block::{Compressor, Decompressor, Pair};
///
/// let input = vec![Pair::from_f64(1_010, 12.0), Pair::from_f64(1_070, 12.5)];
/// let bytes = Compressor::encode(1_000, input.clone()).unwrap();
///
/// let mut d = Decompressor::from_slice(&bytes);
/// assert_eq!(d.read_pair().unwrap(), Some(input[0]));
/// assert_eq!(d.read_pair().unwrap(), Some(input[1]));
/// assert_eq!(d.read_pair().unwrap(), None);
/// assert_eq!(d.block_start(), Some(1_000));
/// ```
#[derive(Debug)]
pub struct Decompressor<R> {
    input: R,
    state: State,
    block_start: Option<i64>,
    /// Number of samples read.
    count: u64,
    timestamps: TimestampDecoder,
    values: ValueDecoder,
}

impl<R: BitInput> Decompressor<R> {
    /// Binds a reader. Nothing is read until the first call to `read_pair`.
    pub fn new(input: R) -> Self {
        Self {
            input,
            state: State::Initial,
            block_start: None,
            count: 0,
            timestamps: TimestampDecoder::new(0),
            values: ValueDecoder::new(),
        }
    }

    /// Returns the block start once the header has been read.
    pub fn block_start(&self) -> Option<i64> {
        self.block_start
    }

    /// Returns `true` once the end marker was reached or a read failed.
    pub fn is_finished(&self) -> bool {
        self.state == State::Finished
    }

    /// Decodes the next sample, or `None` at the end of the block.
    ///
    /// Any error leaves the decompressor finished.
    pub fn read_pair(&mut self) -> Result<Option<Pair>> {
        let next = match self.state {
            State::Finished => return Ok(None),
            State::Initial => self.read_first(),
            State::SecondPoint => self.read_second(),
            State::Subsequent => self.read_subsequent(),
        };

        match next {
            Ok(Some(pair)) => {
                self.count += 1;
                Ok(Some(pair))
            }
            Ok(None) => {
                self.state = State::Finished;
                debug!(samples = self.count, "reached end of block");
                Ok(None)
            }
            Err(e) => {
                self.state = State::Finished;
                Err(e)
            }
        }
    }

    /// Consumes the decompressor and returns the bound input.
    pub fn into_inner(self) -> R {
        self.input
    }

    // ── internal helpers ───────────────────────────────────────────────

    fn read_first(&mut self) -> Result<Option<Pair>> {
        let block_start = self.input.get_long(64)? as i64;
        self.block_start = Some(block_start);
        self.timestamps = TimestampDecoder::new(block_start);

        let Some(timestamp) = self.timestamps.read_header(&mut self.input)? else {
            return Ok(None);
        };
        let value = self.values.read_first(&mut self.input)?;
        self.state = State::SecondPoint;
        Ok(Some(Pair::new(timestamp, value)))
    }

    fn read_second(&mut self) -> Result<Option<Pair>> {
        let Some(timestamp) = self.timestamps.read_header(&mut self.input)? else {
            return Ok(None);
        };
        let value = self.values.read_next(&mut self.input)?;
        self.state = State::Subsequent;
        Ok(Some(Pair::new(timestamp, value)))
    }

    fn read_subsequent(&mut self) -> Result<Option<Pair>> {
        let Some(timestamp) = self.timestamps.read_next(&mut self.input)? else {
            return Ok(None);
        };
        let value = self.values.read_next(&mut self.input)?;
        Ok(Some(Pair::new(timestamp, value)))
    }
}

impl<'a> Decompressor<BitReader<SliceSource<'a>>> {
    /// Binds a decompressor to a byte slice.
    pub fn from_slice(bytes: &'a [u8]) -> Self {
        Self::new(BitReader::new(SliceSource::new(bytes)))
    }

    /// Decodes every sample of the block in `bytes`.
    pub fn decode(bytes: &'a [u8]) -> Result<Vec<Pair>> {
        Self::from_slice(bytes).collect()
    }
}

impl<R: BitInput> Iterator for Decompressor<R> {
    type Item = Result<Pair>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_pair().transpose()
    }
}

impl<R: BitInput> FusedIterator for Decompressor<R> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compressor::Compressor;
    use crate::error::Error;

    #[test]
    fn test_roundtrip_basic() {
        let input = vec![
            Pair::from_f64(1_609_459_260, 12.0),
            Pair::from_f64(1_609_459_320, 12.5),
            Pair::from_f64(1_609_459_380, 13.0),
            Pair::from_f64(1_609_459_440, 11.5),
            Pair::from_f64(1_609_459_500, 12.0),
        ];
        let bytes = Compressor::encode(1_609_459_200, input.clone()).unwrap();
        assert_eq!(Decompressor::decode(&bytes).unwrap(), input);
    }

    #[test]
    fn test_empty_block() {
        let bytes = Compressor::encode(1_000, []).unwrap();
        let mut d = Decompressor::from_slice(&bytes);
        assert_eq!(d.read_pair().unwrap(), None);
        assert!(d.is_finished());
        assert_eq!(d.block_start(), Some(1_000));
    }

    #[test]
    fn test_end_of_stream_is_idempotent() {
        let bytes = Compressor::encode(0, [Pair::new(1, 1)]).unwrap();
        let mut d = Decompressor::from_slice(&bytes);
        assert_eq!(d.read_pair().unwrap(), Some(Pair::new(1, 1)));
        for _ in 0..3 {
            assert_eq!(d.read_pair().unwrap(), None);
        }
    }

    #[test]
    fn test_nothing_read_before_first_call() {
        let empty: [u8; 0] = [];
        let d = Decompressor::from_slice(&empty);
        assert_eq!(d.block_start(), None);
        assert!(!d.is_finished());
    }

    #[test]
    fn test_truncated_block_errors_then_stops() {
        let input: Vec<Pair> = (1..=10).map(|i| Pair::from_f64(i * 10, i as f64)).collect();
        let bytes = Compressor::encode(0, input).unwrap();
        let truncated = &bytes[..bytes.len() / 2];

        let mut d = Decompressor::from_slice(truncated);
        let results: Vec<_> = d.by_ref().collect();
        assert!(results.len() < 10);
        assert_eq!(results.last(), Some(&Err(Error::UnexpectedEnd)));
        assert!(d.is_finished());
        assert_eq!(d.next(), None);
    }

    #[test]
    fn test_iterator_matches_read_pair() {
        let input: Vec<Pair> = (1..=200)
            .map(|i| Pair::from_f64(i * 60, (i as f64).sqrt()))
            .collect();
        let bytes = Compressor::encode(0, input.clone()).unwrap();

        let mut d = Decompressor::from_slice(&bytes);
        let mut read = Vec::new();
        while let Some(pair) = d.read_pair().unwrap() {
            read.push(pair);
        }
        let iterated: Vec<Pair> = Decompressor::from_slice(&bytes)
            .map(|r| r.unwrap())
            .collect();
        assert_eq!(read, input);
        assert_eq!(iterated, input);
    }
}
