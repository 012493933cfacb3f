//! Readers for the per-process files under `/proc`.
//!
//! `parser` holds the pure text decoders, `process` binds them to paths.

pub mod parser;
pub mod process;

pub use parser::{ParseError, ProcIo, ProcStat, SchedStats, SchedValue};
pub use process::{CollectError, ProcReader, ProcessId};
