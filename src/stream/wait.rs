//! Strategi tunggu untuk sisi blocking.
//!
//! Ring buffer sendiri tidak pernah menunggu. Pemanggil yang dapat grant
//! kosong memilih sendiri: spin, yield, atau sleep.

use std::fmt;
use std::str::FromStr;
use std::thread;
use std::time::Duration;

use crate::error::ConfigError;

/// Apa yang dilakukan pump saat tidak ada bytes (free atau readable).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitStrategy {
    /// Busy poll dengan `spin_loop` hint
    Spin,
    /// Serahkan sisa time slice ke scheduler
    Yield,
    /// Tidur selama durasi tetap
    Sleep(Duration),
}

impl Default for WaitStrategy {
    fn default() -> Self {
        WaitStrategy::Sleep(Duration::from_millis(1))
    }
}

impl WaitStrategy {
    #[inline]
    pub fn wait(&self) {
        match self {
            WaitStrategy::Spin => std::hint::spin_loop(),
            WaitStrategy::Yield => thread::yield_now(),
            WaitStrategy::Sleep(period) => thread::sleep(*period),
        }
    }
}

impl FromStr for WaitStrategy {
    type Err = ConfigError;

    /// Format: `spin`, `yield`, atau `sleep:<micros>`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::InvalidValue {
            key: "wait".to_string(),
            value: s.to_string(),
        };

        match s {
            "spin" => Ok(WaitStrategy::Spin),
            "yield" => Ok(WaitStrategy::Yield),
            _ => {
                let micros = s.strip_prefix("sleep:").ok_or_else(invalid)?;
                let micros: u64 = micros.parse().map_err(|_| invalid())?;
                Ok(WaitStrategy::Sleep(Duration::from_micros(micros)))
            }
        }
    }
}

impl fmt::Display for WaitStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WaitStrategy::Spin => write!(f, "spin"),
            WaitStrategy::Yield => write!(f, "yield"),
            WaitStrategy::Sleep(period) => write!(f, "sleep:{}", period.as_micros()),
        }
    }
}
