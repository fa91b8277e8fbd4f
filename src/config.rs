//! Konfigurasi pipeline dari command line dan environment.
//!
//! Flag:
//! - `--capacity SIZE` - kapasitas ring (default: 128k), dibulatkan ke power of 2
//! - `--chunk SIZE` - ukuran grant per iterasi pump (default: 16k)
//! - `--wait MODE` - `spin`, `yield`, atau `sleep:<micros>` (default: sleep:1000)
//! - `--lock-memory` - lock storage ring ke RAM
//! - `--addr ADDR` - alamat TCP (relay: listen, listen: connect)
//!
//! `SIZE` menerima suffix `k`/`m` (1024-based). Environment `RINGPIPE_CAPACITY`
//! dan `RINGPIPE_ADDR` dipakai kalau flag tidak diberikan.

use crate::error::ConfigError;
use crate::stream::{WaitStrategy, DEFAULT_CHUNK};

pub const CAPACITY_ENV: &str = "RINGPIPE_CAPACITY";
pub const ADDR_ENV: &str = "RINGPIPE_ADDR";

/// 48kHz * int16 * stereo * 500ms, dibulatkan: sama dengan buffer device di sisi audio
pub const DEFAULT_CAPACITY: usize = 128 * 1024;

/// Pipeline configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipeConfig {
    pub capacity: usize,
    pub chunk: usize,
    pub wait: WaitStrategy,
    pub lock_memory: bool,
    pub addr: Option<String>,
}

impl Default for PipeConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            chunk: DEFAULT_CHUNK,
            wait: WaitStrategy::default(),
            lock_memory: false,
            addr: None,
        }
    }
}

impl PipeConfig {
    /// Parse dari `std::env::args()` (tanpa nama program) dan environment proses.
    pub fn from_env_and_args() -> Result<Self, ConfigError> {
        let base = Self::from_lookup(|key| std::env::var(key).ok())?;
        base.apply_args(std::env::args().skip(1))
    }

    /// Default + environment via `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(value) = lookup(CAPACITY_ENV) {
            config.capacity = parse_size(CAPACITY_ENV, &value)?;
        }
        if let Some(value) = lookup(ADDR_ENV) {
            config.addr = Some(value);
        }
        Ok(config)
    }

    /// Terapkan flag command line di atas konfigurasi ini.
    pub fn apply_args<I>(mut self, args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = String>,
    {
        let mut args = args.into_iter();

        while let Some(flag) = args.next() {
            match flag.as_str() {
                "--lock-memory" => self.lock_memory = true,
                "--capacity" | "--chunk" | "--wait" | "--addr" => {
                    let value = args
                        .next()
                        .ok_or_else(|| ConfigError::MissingValue(flag.clone()))?;
                    match flag.as_str() {
                        "--capacity" => self.capacity = parse_size(&flag, &value)?,
                        "--chunk" => self.chunk = parse_size(&flag, &value)?.max(1),
                        "--wait" => self.wait = value.parse()?,
                        _ => self.addr = Some(value),
                    }
                }
                _ => return Err(ConfigError::UnknownFlag(flag)),
            }
        }

        Ok(self)
    }
}

/// Parse ukuran dengan suffix opsional `k`/`K` atau `m`/`M`.
pub fn parse_size(key: &str, value: &str) -> Result<usize, ConfigError> {
    let invalid = || ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    };

    let trimmed = value.trim();
    let (digits, multiplier) = match trimmed.char_indices().last() {
        Some((idx, 'k' | 'K')) => (&trimmed[..idx], 1024),
        Some((idx, 'm' | 'M')) => (&trimmed[..idx], 1024 * 1024),
        _ => (trimmed, 1),
    };

    let base: usize = digits.parse().map_err(|_| invalid())?;
    base.checked_mul(multiplier).ok_or_else(invalid)
}
