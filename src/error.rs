//! Error types untuk ringpipe.
//!
//! "Buffer penuh" dan "buffer kosong" BUKAN error: keduanya direpresentasikan
//! sebagai grant dengan panjang 0. Yang ada di sini hanya kegagalan alokasi,
//! konfigurasi, dan I/O di layer pump/network.

use thiserror::Error;

/// All errors produced by ringpipe.
#[derive(Debug, Error)]
pub enum RingError {
    #[error("failed to allocate {capacity} byte ring storage: {source}")]
    Alloc {
        capacity: usize,
        #[source]
        source: std::io::Error,
    },

    #[error("requested capacity {requested} cannot be rounded up to a power of two")]
    CapacityOverflow { requested: usize },

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Invalid command-line flag or environment value.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown flag: {0}")]
    UnknownFlag(String),

    #[error("flag {0} requires a value")]
    MissingValue(String),

    #[error("invalid value {value:?} for {key}")]
    InvalidValue { key: String, value: String },
}

pub type Result<T> = std::result::Result<T, RingError>;
