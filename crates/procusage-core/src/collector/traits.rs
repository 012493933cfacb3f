//! Filesystem access behind a trait so readers can run against fixtures.

use std::io;
use std::path::Path;

/// Read-only access to the files the collector consumes.
///
/// Implemented by [`RealFs`] for the live `/proc` and by
/// [`MockFs`](crate::collector::MockFs) for tests.
pub trait FileSystem: Send + Sync {
    /// Reads the entire contents of a file as a string.
    ///
    /// Fails with `InvalidData` when the content is not valid UTF-8.
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Reads the entire contents of a file as raw bytes.
    ///
    /// Used for files that may carry arbitrary bytes, such as
    /// `/proc/[pid]/cmdline`.
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;
}

/// Real filesystem implementation that delegates to `std::fs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealFs;

impl RealFs {
    pub fn new() -> Self {
        Self
    }
}

impl FileSystem for RealFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        std::fs::read(path)
    }
}
