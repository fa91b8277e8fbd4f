//! Core module: Wait-Free SPSC Byte Ring Buffer dengan mmap backing
//!
//! Prinsip desain:
//! - Wait-Free: Hanya atomic load/store, tidak ada Mutex/CAS/spin
//! - Kontigu: Setiap grant adalah satu slice, tidak pernah melewati ujung storage
//! - No-Allocation: Storage di-map sekali saat init

mod ring_buffer;
mod storage;
pub(crate) mod sync;

pub use ring_buffer::{
    round_capacity, Consumer, Cursors, Producer, ReadGrant, RingBuffer, WriteGrant,
};
pub use storage::StorageOptions;
