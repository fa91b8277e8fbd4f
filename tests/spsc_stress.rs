//! SPSC Stress Test - Randomized producer/consumer di dua thread
//!
//! Producer dan consumer memakai ukuran grant acak, partial commit/release,
//! dan grant yang sengaja ditinggalkan. Stream akhir dibandingkan dengan
//! generator referensi yang deterministik.
//!
//! Usage:
//!   cargo test --release --test spsc_stress -- --nocapture

#![cfg(not(feature = "loom"))]

use std::thread;
use std::time::Instant;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use ringpipe::{Consumer, Producer, RingBuffer};

/// Byte ke-`index` dari stream referensi (xorshift dari posisi)
fn reference_byte(index: u64) -> u8 {
    let mut x = index.wrapping_mul(0x9E37_79B9_7F4A_7C15) ^ 0xD1B5_4A32_D192_ED03;
    x ^= x >> 33;
    x = x.wrapping_mul(0xFF51_AFD7_ED55_8CCD);
    x ^= x >> 29;
    (x & 0xFF) as u8
}

fn run_producer(mut producer: Producer, total: u64, max_grant: usize, seed: u64) -> u64 {
    let mut rng = StdRng::seed_from_u64(seed);
    let capacity = producer.capacity();
    let mut sent = 0u64;
    let mut full_hits = 0u64;

    while sent < total {
        let want = rng.gen_range(0..=max_grant).min((total - sent) as usize);
        let mut grant = producer.reserve(want);
        if grant.is_empty() {
            drop(grant);
            full_hits += 1;
            thread::yield_now();
            continue;
        }

        let len = grant.len();
        for (i, byte) in grant.iter_mut().enumerate() {
            *byte = reference_byte(sent + i as u64);
        }

        match rng.gen_range(0..10) {
            // Ditinggalkan: tidak ada yang terpublikasi
            0 => drop(grant),
            // Partial commit
            1 | 2 => {
                let used = rng.gen_range(0..=len);
                grant.commit_prefix(used);
                sent += used as u64;
            }
            _ => {
                grant.commit();
                sent += len as u64;
            }
        }

        let cursors = producer.cursors();
        assert!(cursors.in_use() <= capacity, "capacity bound: {:?}", cursors);
        assert_eq!(cursors.write_head, cursors.write_tail);
    }

    full_hits
}

fn run_consumer(mut consumer: Consumer, total: u64, max_grant: usize, seed: u64) -> u64 {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut received = 0u64;
    let mut empty_hits = 0u64;
    let mut last_tail = 0usize;

    while received < total {
        let want = rng.gen_range(0..=max_grant);
        let grant = consumer.reserve(want);
        if grant.is_empty() {
            drop(grant);
            empty_hits += 1;
            thread::yield_now();
            continue;
        }

        let used = match rng.gen_range(0..10) {
            0 => 0,
            1 | 2 => rng.gen_range(0..=grant.len()),
            _ => grant.len(),
        };

        for (i, &byte) in grant[..used].iter().enumerate() {
            let index = received + i as u64;
            assert_eq!(byte, reference_byte(index), "mismatch at byte {}", index);
        }

        if used == 0 {
            drop(grant);
        } else {
            grant.release_prefix(used);
        }
        received += used as u64;

        let cursors = consumer.cursors();
        assert!(cursors.read_tail >= last_tail, "read_tail went backwards");
        assert_eq!(cursors.read_head, cursors.read_tail);
        assert!(cursors.read_tail <= cursors.write_tail);
        last_tail = cursors.read_tail;
    }

    empty_hits
}

fn stress(capacity: usize, total: u64, max_grant: usize, seed: u64) {
    let (producer, consumer) = RingBuffer::create(capacity).unwrap();

    let start = Instant::now();
    let writer = thread::spawn(move || run_producer(producer, total, max_grant, seed));
    let empty_hits = run_consumer(consumer, total, max_grant, seed ^ 0xA5A5);
    let full_hits = writer.join().unwrap();

    println!(
        "capacity={} total={} max_grant={} full_hits={} empty_hits={} elapsed={:.2}ms",
        capacity,
        total,
        max_grant,
        full_hits,
        empty_hits,
        start.elapsed().as_secs_f64() * 1000.0
    );
}

#[test]
fn test_stress_small_ring_large_grants() {
    stress(16, 200_000, 64, 1);
}

#[test]
fn test_stress_odd_capacity() {
    // 1000 dibulatkan ke 1024
    stress(1000, 2_000_000, 333, 2);
}

#[test]
fn test_stress_tiny_grants() {
    stress(64, 100_000, 3, 3);
}

#[test]
fn test_stress_single_byte_ring() {
    stress(1, 20_000, 4, 4);
}

#[test]
fn test_stream_ends_when_producer_dropped() {
    const TOTAL: u64 = 500_000;
    let (producer, mut consumer) = RingBuffer::create(4096).unwrap();
    let writer = thread::spawn(move || run_producer(producer, TOTAL, 700, 5));

    let mut received = 0u64;
    loop {
        let gone = consumer.producer_gone();
        let grant = consumer.reserve(usize::MAX);
        if grant.is_empty() {
            if gone {
                break;
            }
            drop(grant);
            thread::yield_now();
            continue;
        }
        for (i, &byte) in grant.iter().enumerate() {
            assert_eq!(byte, reference_byte(received + i as u64));
        }
        received += grant.len() as u64;
        grant.release();
    }

    writer.join().unwrap();
    assert_eq!(received, TOTAL);
}
