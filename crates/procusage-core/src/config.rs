//! Runtime configuration shared by the collector and the sink.

use serde::{Deserialize, Deserializer, Serialize};
use std::path::PathBuf;
use tracing::warn;

/// Default location of the usage log.
pub const DEFAULT_LOG_PATH: &str = "/var/log/procusage.csv";

/// Default mount point of the proc filesystem.
pub const DEFAULT_PROC_PATH: &str = "/proc";

/// Clock ticks per second (USER_HZ). Must match `getconf CLK_TCK` on the host.
pub const DEFAULT_CLK_TCK: u64 = 100;

/// Paths and constants used to measure a process and record the result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base path of the proc filesystem. Tests point this at fixtures.
    pub proc_path: PathBuf,
    /// CSV file that receives one row per measured process.
    pub log_path: PathBuf,
    /// Kernel clock ticks per second, used to convert tick counters to seconds.
    #[serde(deserialize_with = "deserialize_clk_tck")]
    pub clk_tck: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            proc_path: PathBuf::from(DEFAULT_PROC_PATH),
            log_path: PathBuf::from(DEFAULT_LOG_PATH),
            clk_tck: DEFAULT_CLK_TCK,
        }
    }
}

impl Config {
    pub fn with_proc_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.proc_path = path.into();
        self
    }

    pub fn with_log_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_path = path.into();
        self
    }

    /// Overrides the clock tick rate. Zero falls back to [`DEFAULT_CLK_TCK`].
    pub fn with_clk_tck(mut self, clk_tck: u64) -> Self {
        self.clk_tck = checked_clk_tck(clk_tck);
        self
    }
}

/// Every tick counter is divided by the rate, so zero is replaced by the default.
pub(crate) fn checked_clk_tck(clk_tck: u64) -> u64 {
    if clk_tck == 0 {
        warn!("clk_tck must be positive, using {}", DEFAULT_CLK_TCK);
        return DEFAULT_CLK_TCK;
    }
    clk_tck
}

fn deserialize_clk_tck<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    u64::deserialize(deserializer).map(checked_clk_tck)
}
