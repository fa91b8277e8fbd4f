//! Atomic shim: std atomics secara default, loom atomics untuk model checking.
//!
//! Semua cursor di ring buffer lewat sini supaya test `loom_model` bisa
//! menelusuri setiap interleaving producer/consumer.

#[cfg(feature = "loom")]
pub(crate) use loom::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
#[cfg(feature = "loom")]
pub(crate) use loom::sync::Arc;

#[cfg(not(feature = "loom"))]
pub(crate) use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
#[cfg(not(feature = "loom"))]
pub(crate) use std::sync::Arc;
