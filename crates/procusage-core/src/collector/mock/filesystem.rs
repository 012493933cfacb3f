//! In-memory mock filesystem for testing readers without a real `/proc`.

use crate::collector::traits::FileSystem;
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

/// Files the collector reads for each process.
const PROCESS_FILES: [&str; 4] = ["stat", "io", "sched", "cmdline"];

/// In-memory filesystem for testing.
///
/// Stores file contents as raw bytes, so binary files such as
/// `/proc/[pid]/cmdline` can be modelled exactly. Paths can also be marked
/// as failing with a specific error kind to simulate permission problems.
#[derive(Debug, Clone, Default)]
pub struct MockFs {
    files: HashMap<PathBuf, Vec<u8>>,
    failures: HashMap<PathBuf, io::ErrorKind>,
}

impl MockFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) a file with the given content.
    pub fn add_file(&mut self, path: impl AsRef<Path>, content: impl AsRef<[u8]>) {
        let path = path.as_ref().to_path_buf();
        self.failures.remove(&path);
        self.files.insert(path, content.as_ref().to_vec());
    }

    /// Removes a file, so reading it fails with `NotFound`.
    pub fn remove_file(&mut self, path: impl AsRef<Path>) {
        self.files.remove(path.as_ref());
    }

    /// Makes every read of `path` fail with `kind`.
    pub fn fail_with(&mut self, path: impl AsRef<Path>, kind: io::ErrorKind) {
        self.failures.insert(path.as_ref().to_path_buf(), kind);
    }

    /// Adds a process with the `/proc/[pid]/` files the collector reads.
    ///
    /// # Arguments
    /// * `pid` - Process ID
    /// * `stat` - Content of `/proc/[pid]/stat`
    /// * `io` - Content of `/proc/[pid]/io`
    /// * `sched` - Content of `/proc/[pid]/sched`
    /// * `cmdline` - Content of `/proc/[pid]/cmdline` (NUL separated)
    pub fn add_process(&mut self, pid: u32, stat: &str, io: &str, sched: &str, cmdline: &[u8]) {
        let base = PathBuf::from(format!("/proc/{}", pid));
        self.add_file(base.join("stat"), stat);
        self.add_file(base.join("io"), io);
        self.add_file(base.join("sched"), sched);
        self.add_file(base.join("cmdline"), cmdline);
    }

    /// Exposes the files of `pid` under `/proc/self` as well.
    pub fn link_self(&mut self, pid: u32) {
        let base = PathBuf::from(format!("/proc/{}", pid));
        let self_dir = Path::new("/proc/self");
        for name in PROCESS_FILES {
            if let Some(content) = self.files.get(&base.join(name)).cloned() {
                self.files.insert(self_dir.join(name), content);
            }
        }
    }

    fn lookup(&self, path: &Path) -> io::Result<&[u8]> {
        if let Some(kind) = self.failures.get(path) {
            return Err(io::Error::new(*kind, format!("simulated failure: {:?}", path)));
        }
        self.files.get(path).map(Vec::as_slice).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("file not found: {:?}", path),
            )
        })
    }
}

impl FileSystem for MockFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        let bytes = self.lookup(path)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.lookup(path).map(<[u8]>::to_vec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_fs_add_file() {
        let mut fs = MockFs::new();
        fs.add_file("/proc/uptime", "12345.67 10000.00\n");

        let content = fs.read_to_string(Path::new("/proc/uptime")).unwrap();
        assert_eq!(content, "12345.67 10000.00\n");
    }

    #[test]
    fn test_mock_fs_add_process() {
        let mut fs = MockFs::new();
        fs.add_process(1234, "stat", "rchar: 1\n", "sched", b"/bin/bash\0--login\0");

        for name in PROCESS_FILES {
            assert!(fs.read(&Path::new("/proc/1234").join(name)).is_ok());
        }
        assert_eq!(
            fs.read(Path::new("/proc/1234/cmdline")).unwrap(),
            b"/bin/bash\0--login\0"
        );
    }

    #[test]
    fn test_mock_fs_link_self() {
        let mut fs = MockFs::new();
        fs.add_process(1234, "stat", "io", "sched", b"bash\0");
        fs.link_self(1234);

        let content = fs.read_to_string(Path::new("/proc/self/stat")).unwrap();
        assert_eq!(content, "stat");
    }

    #[test]
    fn test_mock_fs_not_found() {
        let fs = MockFs::new();
        let result = fs.read_to_string(Path::new("/nonexistent"));
        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_mock_fs_simulated_failure() {
        let mut fs = MockFs::new();
        fs.add_file("/proc/1/io", "rchar: 1\n");
        fs.fail_with("/proc/1/io", io::ErrorKind::PermissionDenied);

        let err = fs.read(Path::new("/proc/1/io")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
    }

    #[test]
    fn test_mock_fs_rejects_invalid_utf8() {
        let mut fs = MockFs::new();
        fs.add_file("/proc/1/cmdline", b"\xff\xfe\0");

        let err = fs.read_to_string(Path::new("/proc/1/cmdline")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }
}
