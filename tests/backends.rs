use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use gorilla_block::{
    BitReader, BitWriter, BufferPool, Compressor, Decompressor, Error, HeapBuffer, Pair,
    PoolConfig, SliceSource, WordArray,
};

const T0: i64 = 1_700_000_000_000;

fn sample_pairs(n: i64) -> Vec<Pair> {
    (1..=n)
        .map(|i| Pair::from_f64(T0 + i * 1_000 + (i % 7), 100.0 + (i as f64 * 0.37).cos()))
        .collect()
}

#[test]
fn test_all_backends_produce_identical_blocks() {
    let input = sample_pairs(2_000);
    let heap = Compressor::encode(T0, input.iter().copied()).unwrap();

    let pool = BufferPool::with_defaults();
    let mut c = Compressor::new(T0, BitWriter::new(pool.acquire())).unwrap();
    for pair in &input {
        c.add_pair(*pair).unwrap();
    }
    let pooled = c.finish().unwrap().into_inner();
    assert_eq!(pooled.as_bytes(), heap.as_slice());

    let mut c = Compressor::new(T0, BitWriter::new(WordArray::with_capacity(8_192).unwrap()))
        .unwrap();
    for pair in &input {
        c.add_pair(*pair).unwrap();
    }
    let words = c.finish().unwrap().into_inner();
    assert_eq!(words.to_bytes(), heap);
}

#[test]
fn test_pooled_block_reads_through_frozen_bytes() {
    let input = sample_pairs(500);
    let pool = BufferPool::new(PoolConfig::default().with_buffer_size(64)).unwrap();

    let mut c = Compressor::new(T0, BitWriter::new(pool.acquire())).unwrap();
    for pair in &input {
        c.add_pair(*pair).unwrap();
    }
    let frozen = c.finish().unwrap().into_inner().freeze();
    assert_eq!(pool.stats().outstanding(), 0);

    let output: Vec<Pair> = Decompressor::new(BitReader::new(frozen))
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(output, input);
}

#[test]
fn test_pooled_block_reads_in_place() {
    let input = sample_pairs(100);
    let pool = BufferPool::with_defaults();
    {
        let mut c = Compressor::new(T0, BitWriter::new(pool.acquire())).unwrap();
        for pair in &input {
            c.add_pair(*pair).unwrap();
        }
        let buffer = c.finish().unwrap().into_inner();
        let d = Decompressor::new(BitReader::new(SliceSource::new(buffer.as_bytes())));
        let output: Vec<Pair> = d.map(|r| r.unwrap()).collect();
        assert_eq!(output, input);
    }
    let stats = pool.stats();
    assert_eq!(stats.acquired, 1);
    assert_eq!(stats.released, 1);
    assert_eq!(stats.idle, 1);
}

#[test]
fn test_word_array_block_reads_through_word_source() {
    let input = sample_pairs(300);
    let mut c =
        Compressor::new(T0, BitWriter::new(WordArray::with_capacity(1_024).unwrap())).unwrap();
    for pair in &input {
        c.add_pair(*pair).unwrap();
    }
    let words = c.finish().unwrap().into_inner();
    let output: Vec<Pair> = Decompressor::new(BitReader::new(words.source()))
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(output, input);
}

#[test]
fn test_word_array_exhaustion_is_fatal() {
    let mut c =
        Compressor::new(T0, BitWriter::new(WordArray::with_capacity(4).unwrap())).unwrap();
    let mut written = 0;
    let err = loop {
        match c.add_f64(T0 + (written + 1) * 60, written as f64 * 1.5) {
            Ok(()) => written += 1,
            Err(e) => break e,
        }
    };
    assert_eq!(err, Error::CapacityExhausted { capacity: 32 });
    assert_eq!(c.len(), written as u64);
}

#[test]
fn test_pool_releases_on_failed_encode() {
    let config = PoolConfig::default()
        .with_buffer_size(32)
        .with_max_capacity(32);
    let pool = BufferPool::new(config).unwrap();

    let result = (|| -> gorilla_block::Result<Vec<u8>> {
        let mut c = Compressor::new(T0, BitWriter::new(pool.acquire()))?;
        for pair in sample_pairs(1_000) {
            c.add_pair(pair)?;
        }
        Ok(c.finish()?.into_inner().as_bytes().to_vec())
    })();

    assert_eq!(result, Err(Error::CapacityExhausted { capacity: 32 }));
    let stats = pool.stats();
    assert_eq!(stats.acquired, 1);
    assert_eq!(stats.released, 1);
}

#[test]
fn test_pool_releases_on_panic() {
    let pool = BufferPool::with_defaults();
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        let mut c = Compressor::new(T0, BitWriter::new(pool.acquire())).unwrap();
        c.add_f64(T0 + 1, 1.0).unwrap();
        panic!("caller failed mid-block");
    }));
    assert!(outcome.is_err());
    assert_eq!(pool.stats().outstanding(), 0);
}

#[test]
fn test_pool_is_shared_across_threads() {
    let pool = BufferPool::with_defaults();
    let handles: Vec<_> = (0..4)
        .map(|t| {
            let pool = pool.clone();
            std::thread::spawn(move || {
                for _ in 0..10 {
                    let input = sample_pairs(50 + t);
                    let mut c = Compressor::new(T0, BitWriter::new(pool.acquire())).unwrap();
                    for pair in &input {
                        c.add_pair(*pair).unwrap();
                    }
                    let buffer = c.finish().unwrap().into_inner();
                    let output = Decompressor::from_slice(buffer.as_bytes())
                        .collect::<Result<Vec<_>, _>>()
                        .unwrap();
                    assert_eq!(output, input);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    let stats = pool.stats();
    assert_eq!(stats.acquired, 40);
    assert_eq!(stats.outstanding(), 0);
}

#[test]
fn test_heap_and_owned_vec_inputs_agree() {
    let input = sample_pairs(64);
    let bytes = Compressor::encode(T0, input.iter().copied()).unwrap();
    let from_vec: Vec<Pair> = Decompressor::new(BitReader::new(bytes::Bytes::from(bytes.clone())))
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(from_vec, input);

    let reloaded = HeapBuffer::from(bytes);
    assert_eq!(Decompressor::decode(reloaded.as_bytes()).unwrap(), input);
}

#[test]
fn test_pool_stats_stay_consistent_under_contention() {
    let pool = BufferPool::with_defaults();
    let running = Arc::new(AtomicBool::new(true));
    let workers: Vec<_> = (0..4)
        .map(|_| {
            let pool = pool.clone();
            let running = Arc::clone(&running);
            std::thread::spawn(move || {
                while running.load(Ordering::Relaxed) {
                    drop(pool.acquire());
                }
            })
        })
        .collect();

    for _ in 0..200_000 {
        let stats = pool.stats();
        assert!(
            stats.released <= stats.acquired,
            "released ahead of acquired: {stats:?}"
        );
        assert!(stats.outstanding() <= 4, "too many outstanding: {stats:?}");
    }

    running.store(false, Ordering::Relaxed);
    for worker in workers {
        worker.join().unwrap();
    }
    assert_eq!(pool.stats().outstanding(), 0);
}
