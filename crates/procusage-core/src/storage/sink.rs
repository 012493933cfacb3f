//! Append-only destinations for usage records.

use crate::storage::csv::write_row;
use crate::storage::model::{CSV_HEADER, UsageRecord};
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

/// Error type for append failures.
#[derive(Debug)]
pub enum SinkError {
    /// The log file could not be opened or created.
    Open { path: PathBuf, source: io::Error },
    /// The exclusive lock could not be acquired.
    Lock { path: PathBuf, source: io::Error },
    /// Writing the row failed after the lock was taken.
    Write { path: PathBuf, source: io::Error },
}

impl fmt::Display for SinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SinkError::Open { path, source } => {
                write!(f, "cannot open {}: {}", path.display(), source)
            }
            SinkError::Lock { path, source } => {
                write!(f, "failed to acquire lock for {}: {}", path.display(), source)
            }
            SinkError::Write { path, source } => {
                write!(f, "failed to write {}: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for SinkError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SinkError::Open { source, .. }
            | SinkError::Lock { source, .. }
            | SinkError::Write { source, .. } => Some(source),
        }
    }
}

/// Destination for usage records.
pub trait RecordSink {
    /// Persists one record. Either the whole record is stored or nothing is.
    fn append(&self, record: &UsageRecord) -> Result<(), SinkError>;
}

/// Exclusive `flock(2)` on a file, released on drop.
struct FileLock<'a> {
    file: &'a File,
}

impl<'a> FileLock<'a> {
    fn exclusive(file: &'a File) -> io::Result<Self> {
        flock(file, libc::LOCK_EX)?;
        Ok(Self { file })
    }
}

impl Drop for FileLock<'_> {
    fn drop(&mut self) {
        // Closing the descriptor releases the lock as well.
        let _ = flock(self.file, libc::LOCK_UN);
    }
}

fn flock(file: &File, operation: libc::c_int) -> io::Result<()> {
    loop {
        // SAFETY: the descriptor belongs to `file`, which outlives this call.
        let rc = unsafe { libc::flock(file.as_raw_fd(), operation) };
        if rc == 0 {
            return Ok(());
        }
        let err = io::Error::last_os_error();
        if err.kind() != io::ErrorKind::Interrupted {
            return Err(err);
        }
    }
}

/// CSV usage log shared by many processes.
///
/// Every append opens the file, takes an exclusive advisory lock, writes the
/// header if the file is empty, writes the row and releases the lock.
#[derive(Debug, Clone)]
pub struct CsvSink {
    path: PathBuf,
}

impl CsvSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes the row, cutting the file back to its previous length if the
    /// write fails partway. Must be called with the lock held.
    fn write_locked(&self, mut file: &File, record: &UsageRecord) -> io::Result<()> {
        let original_len = file.metadata()?.len();
        let mut buf = String::new();
        if original_len == 0 {
            write_row(&mut buf, CSV_HEADER);
        }
        write_row(&mut buf, record.csv_fields());

        if let Err(e) = file.write_all(buf.as_bytes()).and_then(|()| file.flush()) {
            if let Err(trunc) = file.set_len(original_len) {
                warn!(
                    "cannot roll back partial row in {}: {}",
                    self.path.display(),
                    trunc
                );
            }
            return Err(e);
        }
        Ok(())
    }
}

impl RecordSink for CsvSink {
    fn append(&self, record: &UsageRecord) -> Result<(), SinkError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|source| SinkError::Open {
                path: self.path.clone(),
                source,
            })?;

        let lock = FileLock::exclusive(&file).map_err(|source| SinkError::Lock {
            path: self.path.clone(),
            source,
        })?;

        self.write_locked(&file, record)
            .map_err(|source| SinkError::Write {
                path: self.path.clone(),
                source,
            })?;

        drop(lock);
        debug!("appended usage of pid {} to {}", record.pid, self.path.display());
        Ok(())
    }
}

/// Keeps records in memory. Useful for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<UsageRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of every record appended so far.
    pub fn records(&self) -> Vec<UsageRecord> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }
}

impl RecordSink for MemorySink {
    fn append(&self, record: &UsageRecord) -> Result<(), SinkError> {
        if let Ok(mut records) = self.records.lock() {
            records.push(record.clone());
        }
        Ok(())
    }
}
