//! Network Layer: Non-blocking TCP sink
//!
//! Menggunakan mio untuk cross-platform async I/O.
//!
//! Fitur:
//! - Non-blocking write dengan epoll/kqueue/IOCP
//! - Zero-copy: read grant ring langsung ditulis ke socket
//! - Backpressure alami: bytes yang belum diterima socket tetap di ring

mod sink;

pub use sink::{SinkProgress, TcpSink};
