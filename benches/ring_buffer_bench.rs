//! Criterion benchmark untuk Ring Buffer
//!
//! Run dengan: cargo bench

use std::thread;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use ringpipe::RingBuffer;

const CAPACITY: usize = 64 * 1024;

fn bench_grant_cycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("ring_buffer");

    // Reserve/commit + reserve/release satu frame kecil
    for frame in [64usize, 256, 4096] {
        group.throughput(Throughput::Bytes(frame as u64));
        group.bench_with_input(BenchmarkId::new("grant_cycle", frame), &frame, |b, &frame| {
            let (mut producer, mut consumer) = RingBuffer::create(CAPACITY).unwrap();
            let data = vec![0x5Au8; frame];
            b.iter(|| {
                let mut grant = producer.reserve(black_box(frame));
                let n = grant.len();
                grant.copy_from_slice(&data[..n]);
                grant.commit();

                let grant = consumer.reserve(frame);
                black_box(&*grant);
                grant.release();
            });
        });
    }

    // Reserve pada buffer penuh: jalur "gagal cepat" producer real-time
    group.throughput(Throughput::Elements(1));
    group.bench_function("reserve_when_full", |b| {
        let (mut producer, _consumer) = RingBuffer::create(CAPACITY).unwrap();
        while producer.write(&[0u8; 1024]) > 0 {}
        b.iter(|| {
            let grant = producer.reserve(black_box(256));
            black_box(grant.len());
        });
    });

    group.bench_function("reserve_when_empty", |b| {
        let (_producer, mut consumer) = RingBuffer::create(CAPACITY).unwrap();
        b.iter(|| {
            let grant = consumer.reserve(black_box(256));
            black_box(grant.len());
        });
    });

    group.finish();
}

fn bench_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("throughput");
    const TOTAL: usize = 8 * 1024 * 1024;
    group.throughput(Throughput::Bytes(TOTAL as u64));
    group.sample_size(20);

    // Dua thread: producer dan consumer dengan ukuran chunk berbeda
    for chunk in [256usize, 4096, 16 * 1024] {
        group.bench_with_input(BenchmarkId::new("two_thread", chunk), &chunk, |b, &chunk| {
            b.iter(|| {
                let (mut producer, mut consumer) = RingBuffer::create(CAPACITY).unwrap();
                let writer = thread::spawn(move || {
                    let data = vec![0xA5u8; chunk];
                    let mut sent = 0;
                    while sent < TOTAL {
                        let n = producer.write(&data[..chunk.min(TOTAL - sent)]);
                        if n == 0 {
                            std::hint::spin_loop();
                        }
                        sent += n;
                    }
                });

                let mut received = 0;
                while received < TOTAL {
                    let grant = consumer.reserve(chunk);
                    received += grant.len();
                    black_box(&*grant);
                    grant.release();
                }
                writer.join().unwrap();
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_grant_cycle, bench_throughput);
criterion_main!(benches);
