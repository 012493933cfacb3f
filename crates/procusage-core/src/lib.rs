//! procusage-core - per-process resource usage accounting from `/proc`.
//!
//! Provides:
//! - `collector`: `/proc` readers, parsers and the usage aggregator
//! - `storage`: the usage record model and the append-only CSV sink
//! - `config`: paths and clock-tick configuration
//! - `hook`: exit-time trigger that logs the current process

pub mod collector;
pub mod config;
pub mod hook;
pub mod storage;

pub use collector::{AggregationError, CollectError, ProcessId, UsageCollector};
pub use config::Config;
pub use storage::{CsvSink, RecordSink, SinkError, UsageRecord};

use crate::collector::FileSystem;
use tracing::debug;

/// Failure of a complete measure-and-append cycle.
#[derive(Debug)]
pub enum UsageError {
    /// One of the `/proc` sources could not be used; nothing was written.
    Aggregation(AggregationError),
    /// The record was computed but could not be appended.
    Sink(SinkError),
}

impl std::fmt::Display for UsageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UsageError::Aggregation(e) => write!(f, "failed to acquire usage statistics: {}", e),
            UsageError::Sink(e) => write!(f, "failed to append usage record: {}", e),
        }
    }
}

impl std::error::Error for UsageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            UsageError::Aggregation(e) => Some(e),
            UsageError::Sink(e) => Some(e),
        }
    }
}

impl From<AggregationError> for UsageError {
    fn from(e: AggregationError) -> Self {
        UsageError::Aggregation(e)
    }
}

impl From<SinkError> for UsageError {
    fn from(e: SinkError) -> Self {
        UsageError::Sink(e)
    }
}

/// Measures `pid` and appends the resulting record to `sink`.
///
/// The sink is only touched when every source was read successfully.
pub fn log_usage_with<F: FileSystem, S: RecordSink + ?Sized>(
    collector: &UsageCollector<F>,
    sink: &S,
    pid: ProcessId,
) -> Result<UsageRecord, UsageError> {
    let record = collector.calculate(pid)?;
    sink.append(&record)?;
    debug!("usage record for pid {} appended", record.pid);
    Ok(record)
}

/// Measures `pid` on the real `/proc` and appends to the configured CSV log.
pub fn log_usage(config: &Config, pid: ProcessId) -> Result<UsageRecord, UsageError> {
    let collector = UsageCollector::new(collector::RealFs::new(), config);
    let sink = CsvSink::new(&config.log_path);
    log_usage_with(&collector, &sink, pid)
}
