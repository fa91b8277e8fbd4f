//! ringpipe relay - stdin -> ring -> stdout / TCP subscriber
//!
//! Thread pembaca stdin mengisi ring, thread utama menguras ring ke stdout
//! atau ke satu subscriber TCP (mio, non-blocking).
//!
//! Usage:
//!   arecord -f S16_LE -c 2 -r 48000 | cargo run --release --bin ringpipe_relay -- --addr 0.0.0.0:9999
//!
//! Options:
//! - `--addr ADDR` - listen dan kirim ke subscriber pertama (default: tulis ke stdout)
//! - `--capacity SIZE`, `--chunk SIZE`, `--wait MODE`, `--lock-memory`
//!
//! Kalau stdout/subscriber error, proses keluar dengan status 1 tanpa
//! menunggu stdin EOF.

use std::io;
use std::net::TcpListener;
use std::thread;

use ringpipe::config::PipeConfig;
use ringpipe::network::TcpSink;
use ringpipe::stream::{drain_to, fill_from, PumpControl};
use ringpipe::{RingBuffer, RingError, StorageOptions};

/// SO_SNDBUF untuk socket subscriber
#[cfg(unix)]
const SEND_BUFFER_SIZE: usize = 256 * 1024;

fn main() {
    ringpipe::logging::init();

    if let Err(e) = run() {
        tracing::error!("relay failed: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), RingError> {
    let config = PipeConfig::from_env_and_args()?;
    let options = StorageOptions {
        lock_memory: config.lock_memory,
        populate: true,
    };
    let (mut producer, mut consumer) = RingBuffer::with_options(config.capacity, options)?;
    let control = PumpControl::new(config.wait, config.chunk);

    tracing::info!(
        capacity = producer.capacity(),
        chunk = control.chunk,
        wait = %control.wait,
        "relay ring ready"
    );

    // Subscriber dulu: stdin baru dibaca setelah ada tujuan
    let sink = match config.addr.as_deref() {
        Some(addr) => {
            let listener = TcpListener::bind(addr)?;
            tracing::info!("waiting for subscriber on {}", listener.local_addr()?);
            let (stream, peer) = listener.accept()?;
            tracing::info!(%peer, "subscriber connected");

            let sink = TcpSink::from_std(stream)?;
            // Ignore errors - not all platforms support this
            #[cfg(unix)]
            {
                if let Err(e) = sink.set_send_buffer_size(SEND_BUFFER_SIZE) {
                    tracing::warn!("failed to set SO_SNDBUF: {}", e);
                }
            }
            Some(sink)
        }
        None => None,
    };

    let filler = {
        let control = control.clone();
        thread::spawn(move || fill_from(&mut producer, io::stdin().lock(), &control))
    };

    let drained = match sink {
        Some(mut sink) => sink.run(&mut consumer, &control),
        None => drain_to(&mut consumer, io::stdout().lock(), &control),
    };

    // Output mati: thread stdin bisa sedang blocking di `read`, jadi tidak
    // di-join. `main` langsung exit dan thread ikut berhenti.
    let drained = match drained {
        Ok(stats) => stats,
        Err(e) => {
            control.stop();
            return Err(e.into());
        }
    };
    drop(consumer);

    let filled = filler
        .join()
        .map_err(|_| io::Error::new(io::ErrorKind::Other, "stdin reader panicked"))??;
    tracing::info!(
        bytes_in = filled.bytes,
        bytes_out = drained.bytes,
        full_stalls = filled.stalls,
        empty_stalls = drained.stalls,
        "relay finished"
    );

    Ok(())
}
