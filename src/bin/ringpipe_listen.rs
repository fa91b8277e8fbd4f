//! ringpipe listen - TCP -> ring -> stdout
//!
//! Pasangan `ringpipe_relay`: thread jaringan mengisi ring dari socket,
//! thread utama menulis ke stdout.
//!
//! Usage:
//!   cargo run --release --bin ringpipe_listen -- --addr 127.0.0.1:9999 | aplay -f S16_LE -c 2 -r 48000
//!
//! Options:
//! - `--addr ADDR` - alamat relay (default: 127.0.0.1:9999, atau `RINGPIPE_ADDR`)
//! - `--capacity SIZE`, `--chunk SIZE`, `--wait MODE`, `--lock-memory`

use std::io;
use std::net::TcpStream;
use std::thread;

use ringpipe::config::PipeConfig;
use ringpipe::stream::{drain_to, fill_from, PumpControl};
use ringpipe::{RingBuffer, RingError, StorageOptions};

const DEFAULT_ADDR: &str = "127.0.0.1:9999";

fn main() {
    ringpipe::logging::init();

    if let Err(e) = run() {
        tracing::error!("listener failed: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), RingError> {
    let config = PipeConfig::from_env_and_args()?;
    let addr = config.addr.as_deref().unwrap_or(DEFAULT_ADDR);

    let stream = TcpStream::connect(addr)?;
    stream.set_nodelay(true)?;
    tracing::info!("connected to {}", addr);

    let options = StorageOptions {
        lock_memory: config.lock_memory,
        populate: true,
    };
    let (mut producer, mut consumer) = RingBuffer::with_options(config.capacity, options)?;
    let control = PumpControl::new(config.wait, config.chunk);

    let receiver = {
        let control = control.clone();
        thread::spawn(move || fill_from(&mut producer, stream, &control))
    };

    // Stdout error: thread socket bisa sedang blocking di `read`, jangan di-join
    let drained = match drain_to(&mut consumer, io::stdout().lock(), &control) {
        Ok(stats) => stats,
        Err(e) => {
            control.stop();
            return Err(e.into());
        }
    };
    drop(consumer);

    let received = receiver
        .join()
        .map_err(|_| io::Error::new(io::ErrorKind::Other, "socket reader panicked"))??;
    tracing::info!(
        bytes_in = received.bytes,
        bytes_out = drained.bytes,
        "stream closed by relay"
    );

    Ok(())
}
