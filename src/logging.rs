//! Inisialisasi `tracing` untuk binary.
//!
//! Log selalu ke stderr: stdout dipakai sebagai byte stream oleh
//! `ringpipe_relay` dan `ringpipe_listen`.

use tracing_subscriber::EnvFilter;

/// Environment variable untuk filter log (format `EnvFilter`)
pub const LOG_ENV: &str = "RINGPIPE_LOG";

/// Pasang subscriber global. Aman dipanggil lebih dari sekali.
pub fn init() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
