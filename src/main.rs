//! ringpipe - Wait-Free SPSC Byte Ring Buffer
//!
//! Laporan latency dan throughput ring buffer di proses ini:
//! - Siklus reserve/commit satu thread
//! - Streaming dua thread (producer real-time vs consumer blocking)
//! - Storage dengan page terkunci (`--lock-memory`)
//!
//! Usage:
//!   cargo run --release -- [--capacity 1m] [--chunk 4k] [--lock-memory]

use std::thread;
use std::time::Instant;

use ringpipe::config::PipeConfig;
use ringpipe::{RingBuffer, RingError, StorageOptions};

fn main() {
    ringpipe::logging::init();

    if let Err(e) = run() {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), RingError> {
    let config = PipeConfig::from_env_and_args()?;

    println!("🚀 ringpipe - SPSC Byte Ring Buffer");
    println!("===================================\n");
    println!(
        "  capacity={} chunk={} wait={} lock_memory={}\n",
        config.capacity, config.chunk, config.wait, config.lock_memory
    );

    benchmark_grant_cycle(&config)?;
    benchmark_streaming(&config)?;

    println!("\n✅ All benchmarks complete!");
    Ok(())
}

fn storage_options(config: &PipeConfig) -> StorageOptions {
    StorageOptions {
        lock_memory: config.lock_memory,
        populate: true,
    }
}

fn benchmark_grant_cycle(config: &PipeConfig) -> Result<(), RingError> {
    println!("📊 Reserve/Commit Cycle (single thread)");
    println!("---------------------------------------");

    const ITERATIONS: usize = 1_000_000;
    const FRAME: usize = 256;

    let (mut producer, mut consumer) =
        RingBuffer::with_options(config.capacity, storage_options(config))?;
    let frame = [0x5Au8; FRAME];

    // Warm up
    for _ in 0..1000 {
        producer.write(&frame);
        let grant = consumer.reserve(FRAME);
        grant.release();
    }

    let start = Instant::now();
    for _ in 0..ITERATIONS {
        let mut grant = producer.reserve(FRAME);
        let n = grant.len();
        grant.copy_from_slice(&frame[..n]);
        grant.commit();

        let grant = consumer.reserve(FRAME);
        grant.release();
    }
    let duration = start.elapsed();

    let cycle_ns = duration.as_nanos() as f64 / ITERATIONS as f64;
    println!("  Frame size: {} bytes", FRAME);
    println!("  Operations: {}", ITERATIONS);
    println!(
        "  Cycle latency: {:.2} ns/op ({:.3} μs/op)",
        cycle_ns,
        cycle_ns / 1000.0
    );
    println!(
        "  Throughput:    {:.2} MB/sec\n",
        (ITERATIONS * FRAME) as f64 / duration.as_secs_f64() / 1_000_000.0
    );

    Ok(())
}

fn benchmark_streaming(config: &PipeConfig) -> Result<(), RingError> {
    println!("📊 Two-Thread Streaming");
    println!("-----------------------");

    const TOTAL: usize = 512 * 1024 * 1024;

    let (mut producer, mut consumer) =
        RingBuffer::with_options(config.capacity, storage_options(config))?;
    let chunk = config.chunk;

    let start = Instant::now();

    // Producer: tidak pernah menunggu lebih dari hint, seperti callback audio
    let writer = thread::spawn(move || {
        let frame = vec![0xA5u8; chunk];
        let mut sent = 0usize;
        let mut overruns = 0u64;
        while sent < TOTAL {
            let n = producer.write(&frame[..chunk.min(TOTAL - sent)]);
            if n == 0 {
                overruns += 1;
                std::hint::spin_loop();
            }
            sent += n;
        }
        overruns
    });

    let mut received = 0usize;
    let mut stalls = 0u64;
    while received < TOTAL {
        let grant = consumer.reserve(chunk);
        if grant.is_empty() {
            drop(grant);
            stalls += 1;
            std::hint::spin_loop();
            continue;
        }
        received += grant.len();
        grant.release();
    }

    let duration = start.elapsed();
    let overruns = writer.join().unwrap_or(0);

    println!("  Bytes:        {} MB", TOTAL / (1024 * 1024));
    println!("  Duration:     {:.2} ms", duration.as_secs_f64() * 1000.0);
    println!(
        "  Throughput:   {:.2} GB/sec",
        TOTAL as f64 / duration.as_secs_f64() / 1_000_000_000.0
    );
    println!("  Full hits:    {}", overruns);
    println!("  Empty hits:   {}", stalls);

    Ok(())
}
