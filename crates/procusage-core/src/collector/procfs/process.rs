//! Reads the `/proc` files of a single process.

use crate::collector::procfs::parser::{
    ParseError, ProcIo, ProcStat, SchedStats, parse_cmdline, parse_proc_io, parse_proc_sched,
    parse_proc_stat, parse_uptime,
};
use crate::collector::traits::FileSystem;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// The process whose files are read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcessId {
    /// The calling process, read through `/proc/self`.
    Current,
    Pid(u32),
}

impl ProcessId {
    /// Maps a raw pid to a target, treating 0 as the current process.
    pub fn from_raw(pid: u32) -> Self {
        if pid == 0 {
            ProcessId::Current
        } else {
            ProcessId::Pid(pid)
        }
    }
}

impl From<u32> for ProcessId {
    fn from(pid: u32) -> Self {
        Self::from_raw(pid)
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessId::Current => f.write_str("self"),
            ProcessId::Pid(pid) => write!(f, "{}", pid),
        }
    }
}

/// Error type for reading a single `/proc` source.
#[derive(Debug)]
pub enum CollectError {
    /// The file could not be read (process gone, permissions, I/O).
    Read { path: PathBuf, source: io::Error },
    /// The file was read but its layout is not one this crate understands.
    Format { path: PathBuf, message: String },
}

impl CollectError {
    pub(crate) fn format(path: &Path, err: ParseError) -> Self {
        CollectError::Format {
            path: path.to_path_buf(),
            message: err.message,
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            CollectError::Read { path, .. } | CollectError::Format { path, .. } => path,
        }
    }

    pub fn is_format(&self) -> bool {
        matches!(self, CollectError::Format { .. })
    }
}

impl fmt::Display for CollectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollectError::Read { path, source } => {
                write!(f, "cannot read {}: {}", path.display(), source)
            }
            CollectError::Format { path, message } => {
                write!(f, "unexpected format of {}: {}", path.display(), message)
            }
        }
    }
}

impl std::error::Error for CollectError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CollectError::Read { source, .. } => Some(source),
            CollectError::Format { .. } => None,
        }
    }
}

/// Reads and decodes `/proc` files through a [`FileSystem`].
pub struct ProcReader<F: FileSystem> {
    fs: F,
    proc_path: PathBuf,
}

impl<F: FileSystem> ProcReader<F> {
    /// Creates a new reader.
    ///
    /// # Arguments
    /// * `fs` - Filesystem implementation (real or mock)
    /// * `proc_path` - Base path to proc filesystem (usually "/proc")
    pub fn new(fs: F, proc_path: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            proc_path: proc_path.into(),
        }
    }

    pub fn proc_path(&self) -> &Path {
        &self.proc_path
    }

    /// Path of a per-process file, e.g. `/proc/self/stat`.
    pub fn process_file(&self, pid: ProcessId, name: &str) -> PathBuf {
        self.proc_path.join(pid.to_string()).join(name)
    }

    fn read_text(&self, path: &Path) -> Result<String, CollectError> {
        self.fs
            .read_to_string(path)
            .map_err(|source| CollectError::Read {
                path: path.to_path_buf(),
                source,
            })
    }

    /// Reads `/proc/uptime` and returns seconds since boot.
    ///
    /// Content that is not two floats is reported as a read failure.
    pub fn read_uptime(&self) -> Result<f64, CollectError> {
        let path = self.proc_path.join("uptime");
        let content = self.read_text(&path)?;
        let uptime = parse_uptime(&content).map_err(|e| {
            warn!("could not understand {}: {}", path.display(), e);
            CollectError::Read {
                path: path.clone(),
                source: io::Error::new(io::ErrorKind::InvalidData, e),
            }
        })?;
        debug!("uptime: {}s", uptime);
        Ok(uptime)
    }

    /// Reads `/proc/[pid]/stat`.
    pub fn read_stat(&self, pid: ProcessId) -> Result<ProcStat, CollectError> {
        let path = self.process_file(pid, "stat");
        let content = self.read_text(&path)?;
        let stat = parse_proc_stat(&content).map_err(|e| {
            warn!("could not understand the format of {}: {}", path.display(), e);
            CollectError::format(&path, e)
        })?;
        debug!("stat of {}: {} fields", pid, stat.field_count);
        Ok(stat)
    }

    /// Reads `/proc/[pid]/io`.
    pub fn read_io(&self, pid: ProcessId) -> Result<ProcIo, CollectError> {
        let path = self.process_file(pid, "io");
        let content = self.read_text(&path)?;
        let io = parse_proc_io(&content).map_err(|e| CollectError::format(&path, e))?;
        debug!("io of {}: {} counters", pid, io.len());
        Ok(io)
    }

    /// Reads `/proc/[pid]/sched`.
    pub fn read_sched(&self, pid: ProcessId) -> Result<SchedStats, CollectError> {
        let path = self.process_file(pid, "sched");
        let content = self.read_text(&path)?;
        let sched = parse_proc_sched(&content);
        debug!("sched of {}: {} values", pid, sched.len());
        Ok(sched)
    }

    /// Reads `/proc/[pid]/cmdline`, joined with spaces. Not escaped.
    pub fn read_cmdline(&self, pid: ProcessId) -> Result<String, CollectError> {
        let path = self.process_file(pid, "cmdline");
        let raw = self.fs.read(&path).map_err(|source| CollectError::Read {
            path: path.clone(),
            source,
        })?;
        Ok(parse_cmdline(&raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::mock::MockFs;
    use crate::collector::procfs::parser::SchedValue;

    #[test]
    fn test_process_id_sentinel() {
        assert_eq!(ProcessId::from_raw(0), ProcessId::Current);
        assert_eq!(ProcessId::from(42), ProcessId::Pid(42));
        assert_eq!(ProcessId::Current.to_string(), "self");
        assert_eq!(ProcessId::Pid(42).to_string(), "42");
    }

    #[test]
    fn test_read_uptime() {
        let reader = ProcReader::new(MockFs::typical_process(), "/proc");
        assert_eq!(reader.read_uptime().unwrap(), 12345.67);
    }

    #[test]
    fn test_read_uptime_garbage_is_read_error() {
        let mut fs = MockFs::new();
        fs.add_file("/proc/uptime", "not a number\n");
        let reader = ProcReader::new(fs, "/proc");

        let err = reader.read_uptime().unwrap_err();
        assert!(matches!(err, CollectError::Read { .. }));
        assert_eq!(err.path(), Path::new("/proc/uptime"));
    }

    #[test]
    fn test_read_stat_current_process() {
        let reader = ProcReader::new(MockFs::typical_process(), "/proc");

        let stat = reader.read_stat(ProcessId::Current).unwrap();
        assert_eq!(stat.pid, 4242);
        assert_eq!(stat.comm, "php");
    }

    #[test]
    fn test_read_stat_format_error() {
        let mut fs = MockFs::new();
        fs.add_file("/proc/1/stat", "1 (init) S 0 1 1 0 -1 4194560");
        let reader = ProcReader::new(fs, "/proc");

        let err = reader.read_stat(ProcessId::Pid(1)).unwrap_err();
        assert!(err.is_format());
        assert_eq!(err.path(), Path::new("/proc/1/stat"));
    }

    #[test]
    fn test_read_process_gone() {
        let reader = ProcReader::new(MockFs::typical_process(), "/proc");

        let err = reader.read_stat(ProcessId::Pid(9999)).unwrap_err();
        assert!(matches!(
            err,
            CollectError::Read { ref source, .. } if source.kind() == io::ErrorKind::NotFound
        ));
        assert!(reader.read_io(ProcessId::Pid(9999)).is_err());
        assert!(reader.read_sched(ProcessId::Pid(9999)).is_err());
        assert!(reader.read_cmdline(ProcessId::Pid(9999)).is_err());
    }

    #[test]
    fn test_read_io_permission_denied() {
        let mut fs = MockFs::typical_process();
        fs.fail_with("/proc/4242/io", io::ErrorKind::PermissionDenied);
        let reader = ProcReader::new(fs, "/proc");

        let err = reader.read_io(ProcessId::Pid(4242)).unwrap_err();
        assert!(!err.is_format());
        assert!(err.to_string().contains("/proc/4242/io"));
    }

    #[test]
    fn test_read_sched_and_cmdline() {
        let reader = ProcReader::new(MockFs::typical_process(), "/proc");

        let sched = reader.read_sched(ProcessId::Pid(4242)).unwrap();
        assert_eq!(sched.get("iowait_sum"), Some(SchedValue::Float(1500.0)));

        let cmdline = reader.read_cmdline(ProcessId::Pid(4242)).unwrap();
        assert_eq!(cmdline, "php /srv/app/cron.php --verbose");
    }

    #[test]
    fn test_read_kernel_thread() {
        let reader = ProcReader::new(MockFs::kernel_thread(), "/proc");

        let stat = reader.read_stat(ProcessId::Pid(77)).unwrap();
        assert_eq!(stat.comm, "kworker/0:1 (events)");
        assert_eq!(reader.read_cmdline(ProcessId::Pid(77)).unwrap(), "");
    }

    #[test]
    fn test_custom_proc_path() {
        let mut fs = MockFs::new();
        fs.add_file("/fixtures/proc/uptime", "10.5 3.2\n");
        let reader = ProcReader::new(fs, "/fixtures/proc");

        assert_eq!(reader.proc_path(), Path::new("/fixtures/proc"));
        assert_eq!(reader.read_uptime().unwrap(), 10.5);
    }
}
