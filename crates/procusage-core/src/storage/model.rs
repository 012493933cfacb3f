use chrono::{DateTime, FixedOffset, SecondsFormat};
use serde::{Serialize, Serializer};

/// Column names of the usage log, in row order.
pub const CSV_HEADER: [&str; 14] = [
    "pid", "start", "nice", "real", "utime", "stime", "cutime", "cstime", "rchar", "wchar",
    "syscr", "syscw", "iowait", "cmdline",
];

/// Resource usage summary of one process execution.
///
/// Times are in seconds, I/O volumes in bytes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageRecord {
    pub pid: u32,
    /// Wall-clock start of the process.
    #[serde(serialize_with = "serialize_start")]
    pub start: DateTime<FixedOffset>,
    pub nice: i64,
    /// Seconds elapsed since the process started.
    pub real: f64,
    pub utime: f64,
    pub stime: f64,
    /// CPU time of waited-for children.
    pub cutime: f64,
    pub cstime: f64,
    pub rchar: u64,
    pub wchar: u64,
    pub syscr: u64,
    pub syscw: u64,
    /// Time spent blocked on I/O.
    pub iowait: f64,
    /// Space-joined argument vector. Not escaped; never pass it to a shell.
    pub cmdline: String,
}

impl UsageRecord {
    /// ISO-8601 start timestamp with UTC offset, e.g. `2015-03-01T10:00:00+01:00`.
    pub fn start_iso8601(&self) -> String {
        self.start.to_rfc3339_opts(SecondsFormat::Secs, false)
    }

    /// Row values matching [`CSV_HEADER`].
    pub fn csv_fields(&self) -> [String; 14] {
        [
            self.pid.to_string(),
            self.start_iso8601(),
            self.nice.to_string(),
            self.real.to_string(),
            self.utime.to_string(),
            self.stime.to_string(),
            self.cutime.to_string(),
            self.cstime.to_string(),
            self.rchar.to_string(),
            self.wchar.to_string(),
            self.syscr.to_string(),
            self.syscw.to_string(),
            self.iowait.to_string(),
            self.cmdline.clone(),
        ]
    }
}

fn serialize_start<S: Serializer>(
    start: &DateTime<FixedOffset>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&start.to_rfc3339_opts(SecondsFormat::Secs, false))
}
