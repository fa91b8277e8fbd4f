//! Stream Layer: Blocking I/O di atas ring buffer
//!
//! Sisi non-real-time dari pipeline. Callback real-time cukup memegang
//! `Producer`/`Consumer`; thread lain menjalankan pump di sini yang boleh
//! blocking di syscall.

mod pump;
mod wait;

pub use pump::{drain_to, fill_from, PumpControl, PumpStats, DEFAULT_CHUNK};
pub use wait::WaitStrategy;
