//! Folds the `/proc` sources of one process into a [`UsageRecord`].

use crate::collector::procfs::parser::ParseError;
use crate::collector::procfs::{CollectError, ProcReader, ProcessId};
use crate::collector::traits::FileSystem;
use crate::config::{Config, checked_clk_tck};
use crate::storage::UsageRecord;
use chrono::{DateTime, FixedOffset, Local, TimeDelta};
use std::fmt;
use tracing::debug;

/// The `/proc` source a failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Uptime,
    Cmdline,
    Stat,
    Io,
    Sched,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Source::Uptime => "uptime",
            Source::Cmdline => "cmdline",
            Source::Stat => "stat",
            Source::Io => "io",
            Source::Sched => "sched",
        })
    }
}

/// A source failed, so no record was produced.
#[derive(Debug)]
pub struct AggregationError {
    pub origin: Source,
    pub cause: CollectError,
}

impl AggregationError {
    fn new(origin: Source, cause: CollectError) -> Self {
        Self { origin, cause }
    }
}

impl fmt::Display for AggregationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} source failed: {}", self.origin, self.cause)
    }
}

impl std::error::Error for AggregationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.cause)
    }
}

/// Computes usage records from the `/proc` files of a process.
pub struct UsageCollector<F: FileSystem> {
    reader: ProcReader<F>,
    clk_tck: u64,
}

impl<F: FileSystem> UsageCollector<F> {
    /// Creates a collector reading below `config.proc_path`.
    pub fn new(fs: F, config: &Config) -> Self {
        Self {
            reader: ProcReader::new(fs, &config.proc_path),
            clk_tck: checked_clk_tck(config.clk_tck),
        }
    }

    /// Measures `pid` now.
    pub fn calculate(&self, pid: ProcessId) -> Result<UsageRecord, AggregationError> {
        self.calculate_at(pid, Local::now().fixed_offset())
    }

    /// Measures `pid`, deriving the start timestamp from `now`.
    ///
    /// All five sources are read; if any of them fails the first failure is
    /// returned and nothing else is derived.
    pub fn calculate_at(
        &self,
        pid: ProcessId,
        now: DateTime<FixedOffset>,
    ) -> Result<UsageRecord, AggregationError> {
        let uptime = self.reader.read_uptime();
        let cmdline = self.reader.read_cmdline(pid);
        let stat = self.reader.read_stat(pid);
        let io = self.reader.read_io(pid);
        let sched = self.reader.read_sched(pid);

        let uptime = uptime.map_err(|e| AggregationError::new(Source::Uptime, e))?;
        let cmdline = cmdline.map_err(|e| AggregationError::new(Source::Cmdline, e))?;
        let stat = stat.map_err(|e| AggregationError::new(Source::Stat, e))?;
        let io = io.map_err(|e| AggregationError::new(Source::Io, e))?;
        let sched = sched.map_err(|e| AggregationError::new(Source::Sched, e))?;

        let io_counter = |key: &str| {
            io.get(key).ok_or_else(|| {
                let path = self.reader.process_file(pid, "io");
                let err = ParseError::new(format!("missing counter '{}'", key));
                AggregationError::new(Source::Io, CollectError::format(&path, err))
            })
        };
        let rchar = io_counter("rchar")?;
        let wchar = io_counter("wchar")?;
        let syscr = io_counter("syscr")?;
        let syscw = io_counter("syscw")?;

        let iowait_sum = sched.get("iowait_sum").ok_or_else(|| {
            let path = self.reader.process_file(pid, "sched");
            let err = ParseError::new("missing value 'iowait_sum'");
            AggregationError::new(Source::Sched, CollectError::format(&path, err))
        })?;

        let clk_tck = self.clk_tck as f64;
        let real = uptime - stat.starttime as f64 / clk_tck;
        let start = TimeDelta::try_milliseconds((real * 1000.0).round() as i64)
            .and_then(|age| now.checked_sub_signed(age))
            .ok_or_else(|| {
                let path = self.reader.process_file(pid, "stat");
                let err = ParseError::new(format!("start time out of range ({}s ago)", real));
                AggregationError::new(Source::Stat, CollectError::format(&path, err))
            })?;

        debug!("pid {} started {:.2}s ago", stat.pid, real);

        Ok(UsageRecord {
            pid: stat.pid,
            start,
            nice: stat.nice,
            real,
            utime: stat.utime as f64 / clk_tck,
            stime: stat.stime as f64 / clk_tck,
            cutime: stat.cutime as f64 / clk_tck,
            cstime: stat.cstime as f64 / clk_tck,
            rchar,
            wchar,
            syscr,
            syscw,
            iowait: iowait_sum.as_f64() / 1000.0,
            cmdline,
        })
    }
}
