//! Per-evaluation resource limits

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{JudgeError, Result};
use crate::util;

/// Wall-clock and memory ceilings for one evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Limits {
    /// Wall-clock limit in milliseconds, measured from launch
    pub time_ms: u64,
    /// Resident memory ceiling in bytes
    pub memory_bytes: u64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            time_ms: 2000,
            memory_bytes: 256 * 1024 * 1024,
        }
    }
}

impl Limits {
    pub fn new(time_ms: u64, memory_bytes: u64) -> Self {
        Self {
            time_ms,
            memory_bytes,
        }
    }

    /// Build limits from a millisecond count and a size string such as "64M"
    pub fn parse(time_ms: u64, memory: &str) -> Result<Self> {
        let limits = Self::new(time_ms, util::parse_memory_size(memory)?);
        limits.validate()?;
        Ok(limits)
    }

    pub fn time_limit(&self) -> Duration {
        Duration::from_millis(self.time_ms)
    }

    /// Whole seconds covering the time limit, rounded up
    pub fn time_limit_secs_ceil(&self) -> u64 {
        self.time_ms.div_ceil(1000)
    }

    pub fn validate(&self) -> Result<()> {
        if self.time_ms == 0 {
            return Err(JudgeError::InvalidConfig(
                "Time limit must be greater than zero".to_string(),
            ));
        }

        if self.memory_bytes == 0 {
            return Err(JudgeError::InvalidConfig(
                "Memory limit must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}
