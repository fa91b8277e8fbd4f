//! ringpipe - Wait-Free SPSC Byte Ring Buffer
//!
//! Memisahkan konteks real-time (callback audio, polling loop) dari thread
//! yang melakukan blocking stream I/O.
//!
//! Arsitektur:
//! - Core: ring buffer byte dengan empat cursor, handle `Producer`/`Consumer`
//! - Stream: pump blocking `fill_from`/`drain_to` dengan wait strategy
//! - Network: sink TCP non-blocking berbasis mio
//!
//! ```
//! use ringpipe::RingBuffer;
//!
//! let (mut producer, mut consumer) = RingBuffer::create(1000).unwrap();
//! assert_eq!(producer.capacity(), 1024);
//!
//! // Producer: reserve -> isi -> commit
//! let mut grant = producer.reserve(5);
//! grant.copy_from_slice(b"hello");
//! grant.commit();
//!
//! // Consumer: reserve -> baca -> release
//! let grant = consumer.reserve(usize::MAX);
//! assert_eq!(&*grant, b"hello");
//! grant.release();
//! ```
//!
//! Satu producer, satu consumer. Handle tidak bisa di-clone dan setiap
//! operasi butuh `&mut self`, jadi penulis/pembaca kedua tidak bisa ada.
//! Ring buffer tidak pernah menunggu: grant dengan panjang 0 berarti
//! "belum ada apa-apa", pemanggil yang memutuskan cara menunggu.

pub mod config;
pub mod core;
pub mod error;
pub mod logging;
pub mod network;
pub mod stream;

pub use crate::core::{
    round_capacity, Consumer, Cursors, Producer, ReadGrant, RingBuffer, StorageOptions,
    WriteGrant,
};
pub use crate::error::{ConfigError, Result, RingError};
