//! Usage record model and the append-only sinks that persist it.

pub mod csv;
pub mod model;
pub mod sink;

pub use model::{CSV_HEADER, UsageRecord};
pub use sink::{CsvSink, MemorySink, RecordSink, SinkError};
