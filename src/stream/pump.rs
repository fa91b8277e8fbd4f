//! Blocking pump antara ring buffer dan byte stream.
//!
//! Ini sisi "thread biasa" dari pasangan real-time/blocking:
//! - `fill_from`: baca dari `Read` (stdin, socket) langsung ke write grant
//! - `drain_to`: tulis read grant ke `Write` (stdout, file, socket)
//!
//! Tidak ada buffer perantara: data di-copy oleh syscall langsung ke/dari
//! storage ring.

use std::io::{self, ErrorKind, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::WaitStrategy;
use crate::core::{Consumer, Producer};

/// Default ukuran grant per iterasi pump (16KB)
pub const DEFAULT_CHUNK: usize = 16 * 1024;

/// Kontrol bersama untuk satu atau beberapa pump.
#[derive(Debug, Clone)]
pub struct PumpControl {
    stop: Arc<AtomicBool>,
    pub wait: WaitStrategy,
    pub chunk: usize,
}

impl Default for PumpControl {
    fn default() -> Self {
        Self::new(WaitStrategy::default(), DEFAULT_CHUNK)
    }
}

impl PumpControl {
    pub fn new(wait: WaitStrategy, chunk: usize) -> Self {
        Self {
            stop: Arc::new(AtomicBool::new(false)),
            wait,
            chunk: chunk.max(1),
        }
    }

    /// Minta semua pump yang berbagi kontrol ini berhenti.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Release);
    }

    #[inline(always)]
    pub fn is_stopped(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }
}

/// Statistik satu kali jalan pump.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PumpStats {
    /// Bytes yang dipindahkan
    pub bytes: u64,
    /// Grant yang di-commit/release dengan isi
    pub grants: u64,
    /// Iterasi yang tidak dapat apa-apa dan menjalankan wait strategy
    pub stalls: u64,
}

/// Isi ring dari `reader` sampai EOF, stop, atau consumer hilang.
///
/// Stop flag hanya dicek di antara `read`; `read` yang sedang blocking
/// tidak bisa diinterupsi dari sini.
pub fn fill_from<R: Read>(
    producer: &mut Producer,
    mut reader: R,
    control: &PumpControl,
) -> io::Result<PumpStats> {
    let mut stats = PumpStats::default();
    tracing::debug!(chunk = control.chunk, wait = %control.wait, "fill pump started");

    while !control.is_stopped() {
        if producer.consumer_gone() {
            tracing::debug!("consumer dropped, fill pump exiting");
            break;
        }

        let mut grant = producer.reserve(control.chunk);
        if grant.is_empty() {
            grant.commit_prefix(0);
            stats.stalls += 1;
            control.wait.wait();
            continue;
        }

        // Commit 0 byte = kembalikan reservasi tanpa dianggap abandoned
        match reader.read(&mut grant) {
            Ok(0) => {
                grant.commit_prefix(0);
                break;
            }
            Ok(n) => {
                grant.commit_prefix(n);
                stats.bytes += n as u64;
                stats.grants += 1;
            }
            Err(ref e) if e.kind() == ErrorKind::Interrupted => grant.commit_prefix(0),
            Err(ref e) if e.kind() == ErrorKind::WouldBlock => {
                grant.commit_prefix(0);
                stats.stalls += 1;
                control.wait.wait();
            }
            Err(e) => {
                grant.commit_prefix(0);
                return Err(e);
            }
        }
    }

    tracing::debug!(
        bytes = stats.bytes,
        grants = stats.grants,
        stalls = stats.stalls,
        "fill pump finished"
    );
    Ok(stats)
}

/// Kuras ring ke `writer`.
///
/// Berhenti saat ring kosong DAN (stop flag di-set atau producer sudah
/// di-drop). Setiap release hanya sebanyak bytes yang benar-benar ditulis.
pub fn drain_to<W: Write>(
    consumer: &mut Consumer,
    mut writer: W,
    control: &PumpControl,
) -> io::Result<PumpStats> {
    let mut stats = PumpStats::default();
    tracing::debug!(chunk = control.chunk, wait = %control.wait, "drain pump started");

    loop {
        // Cek sebelum reserve: commit terakhir producer sudah terlihat kalau ini true
        let finished = consumer.producer_gone() || control.is_stopped();

        let grant = consumer.reserve(control.chunk);
        if grant.is_empty() {
            grant.release_prefix(0);
            if finished {
                break;
            }
            stats.stalls += 1;
            control.wait.wait();
            continue;
        }

        match writer.write(&grant) {
            Ok(0) => {
                grant.release_prefix(0);
                return Err(io::Error::new(
                    ErrorKind::WriteZero,
                    "failed to write ring data",
                ));
            }
            Ok(n) => {
                grant.release_prefix(n);
                stats.bytes += n as u64;
                stats.grants += 1;
            }
            Err(ref e) if e.kind() == ErrorKind::Interrupted => grant.release_prefix(0),
            Err(ref e) if e.kind() == ErrorKind::WouldBlock => {
                grant.release_prefix(0);
                stats.stalls += 1;
                control.wait.wait();
            }
            Err(e) => {
                grant.release_prefix(0);
                return Err(e);
            }
        }
    }

    writer.flush()?;
    tracing::debug!(
        bytes = stats.bytes,
        grants = stats.grants,
        stalls = stats.stalls,
        "drain pump finished"
    );
    Ok(stats)
}
