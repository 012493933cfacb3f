//! Per-process usage collection for Linux.
//!
//! Reads a handful of `/proc` files for one process and folds them into a
//! single [`UsageRecord`](crate::storage::UsageRecord).
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                      UsageCollector                      │
//! │  (uptime + stat + io + sched + cmdline → UsageRecord)    │
//! │                            │                             │
//! │                     ┌──────▼──────┐                      │
//! │                     │  ProcReader │  /proc/uptime        │
//! │                     │             │  /proc/[pid]/stat    │
//! │                     │             │  /proc/[pid]/io      │
//! │                     │             │  /proc/[pid]/sched   │
//! │                     │             │  /proc/[pid]/cmdline │
//! │                     └──────┬──────┘                      │
//! │                     ┌──────▼──────┐                      │
//! │                     │  FileSystem │ (trait)              │
//! │                     └──────┬──────┘                      │
//! └────────────────────────────┼─────────────────────────────┘
//!                  ┌───────────┴───────────┐
//!           ┌──────▼──────┐         ┌──────▼──────┐
//!           │   RealFs    │         │   MockFs    │
//!           │  (Linux)    │         │  (Testing)  │
//!           └─────────────┘         └─────────────┘
//! ```
//!
//! # Usage
//!
//! ```
//! use procusage_core::collector::{MockFs, ProcessId, UsageCollector};
//! use procusage_core::Config;
//!
//! let fs = MockFs::typical_process();
//! let collector = UsageCollector::new(fs, &Config::default());
//! let record = collector.calculate(ProcessId::Pid(4242)).unwrap();
//! assert_eq!(record.pid, 4242);
//! ```

pub mod mock;
pub mod procfs;
pub mod traits;
mod usage;

pub use mock::MockFs;
pub use procfs::{CollectError, ProcReader, ProcessId};
pub use traits::{FileSystem, RealFs};
pub use usage::{AggregationError, Source, UsageCollector};
