//! Parsers for `/proc` filesystem files.
//!
//! These are pure functions that parse the content of various `/proc` files
//! into structured data. They are designed to be easily testable with string inputs.

use std::collections::BTreeMap;

/// Minimum number of positional fields a `/proc/[pid]/stat` line must yield.
///
/// Everything up to and including `delayacct_blkio_ticks` (kernel 2.6.18).
pub const STAT_MIN_FIELDS: usize = 42;

/// Positional layout of `/proc/[pid]/stat`, as printed by `do_task_stat()`.
pub const STAT_FIELDS: [&str; 52] = [
    "pid",
    "comm",
    "state",
    "ppid",
    "pgrp",
    "session",
    "tty_nr",
    "tpgid",
    "flags",
    "minflt",
    "cminflt",
    "majflt",
    "cmajflt",
    "utime",
    "stime",
    "cutime",
    "cstime",
    "priority",
    "nice",
    "num_threads",
    "itrealvalue",
    "starttime",
    "vsize",
    "rss",
    "rsslim",
    "startcode",
    "endcode",
    "startstack",
    "kstkesp",
    "kstkeip",
    "signal",
    "blocked",
    "sigignore",
    "sigcatch",
    "wchan",
    "nswap",
    "cnswap",
    "exit_signal",
    "processor",
    "rt_priority",
    "policy",
    "delayacct_blkio_ticks",
    "guest_time",  // 2.6.24
    "cguest_time", // 2.6.24
    "start_data",  // 3.3
    "end_data",    // 3.3
    "start_brk",   // 3.3
    "arg_start",   // 3.5
    "arg_end",     // 3.5
    "env_start",   // 3.5
    "env_end",     // 3.5
    "exit_code",   // 3.5
];

/// Error type for parsing failures.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
}

impl ParseError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Parse error: {}", self.message)
    }
}

impl std::error::Error for ParseError {}

/// Parses `/proc/uptime` content and returns seconds since boot.
///
/// Format: "12345.67 10000.00" (uptime, aggregate idle time).
pub fn parse_uptime(content: &str) -> Result<f64, ParseError> {
    let parts: Vec<&str> = content.split_whitespace().collect();
    if parts.len() != 2 {
        return Err(ParseError::new(format!(
            "expected 2 fields in uptime, got {}",
            parts.len()
        )));
    }

    let mut values = [0.0f64; 2];
    for (value, part) in values.iter_mut().zip(&parts) {
        *value = part
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| ParseError::new(format!("invalid uptime value '{}'", part)))?;
    }

    Ok(values[0])
}

/// Parsed data from `/proc/[pid]/stat`.
///
/// The first [`STAT_MIN_FIELDS`] fields are always present. The trailing
/// ones were added in later kernels and are `None` when the running kernel
/// did not print them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcStat {
    pub pid: u32,
    pub comm: String,
    pub state: char,
    pub ppid: i64,
    pub pgrp: i64,
    pub session: i64,
    pub tty_nr: i64,
    pub tpgid: i64,
    pub flags: u64,
    pub minflt: u64,
    pub cminflt: u64,
    pub majflt: u64,
    pub cmajflt: u64,
    pub utime: u64,
    pub stime: u64,
    pub cutime: i64,
    pub cstime: i64,
    pub priority: i64,
    pub nice: i64,
    pub num_threads: i64,
    pub itrealvalue: i64,
    pub starttime: u64,
    pub vsize: u64,
    pub rss: i64,
    pub rsslim: u64,
    pub startcode: u64,
    pub endcode: u64,
    pub startstack: u64,
    pub kstkesp: u64,
    pub kstkeip: u64,
    pub signal: u64,
    pub blocked: u64,
    pub sigignore: u64,
    pub sigcatch: u64,
    pub wchan: u64,
    pub nswap: u64,
    pub cnswap: u64,
    pub exit_signal: i64,
    pub processor: i64,
    pub rt_priority: u64,
    pub policy: u64,
    pub delayacct_blkio_ticks: u64,
    pub guest_time: Option<u64>,
    pub cguest_time: Option<i64>,
    pub start_data: Option<u64>,
    pub end_data: Option<u64>,
    pub start_brk: Option<u64>,
    pub arg_start: Option<u64>,
    pub arg_end: Option<u64>,
    pub env_start: Option<u64>,
    pub env_end: Option<u64>,
    pub exit_code: Option<i64>,
    /// Number of positional fields that were actually parsed.
    pub field_count: usize,
}

impl ProcStat {
    /// Names of the fields present in this record, in kernel order.
    pub fn field_names(&self) -> &'static [&'static str] {
        &STAT_FIELDS[..self.field_count.min(STAT_FIELDS.len())]
    }
}

/// Sequential reader over the whitespace-separated stat fields.
///
/// Stops at the first field that does not decode, like `sscanf` does, so
/// `parsed` is the number of leading fields that were understood.
struct StatFields<'a> {
    tokens: std::str::SplitWhitespace<'a>,
    parsed: usize,
    stopped: bool,
}

impl<'a> StatFields<'a> {
    fn new(rest: &'a str, already_parsed: usize) -> Self {
        Self {
            tokens: rest.split_whitespace(),
            parsed: already_parsed,
            stopped: false,
        }
    }

    fn next_with<T>(&mut self, decode: impl FnOnce(&str) -> Option<T>) -> Option<T> {
        if self.stopped || self.parsed >= STAT_FIELDS.len() {
            return None;
        }
        match self.tokens.next().and_then(decode) {
            Some(value) => {
                self.parsed += 1;
                Some(value)
            }
            None => {
                self.stopped = true;
                None
            }
        }
    }

    fn signed(&mut self) -> Option<i64> {
        self.next_with(|s| s.parse().ok())
    }

    fn unsigned(&mut self) -> Option<u64> {
        self.next_with(|s| s.parse().ok())
    }

    fn character(&mut self) -> Option<char> {
        self.next_with(|s| {
            let mut chars = s.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Some(c),
                _ => None,
            }
        })
    }
}

/// Parses `/proc/[pid]/stat` content.
///
/// The format is tricky because the comm field can contain spaces and parentheses.
/// Format: pid (comm) state ppid pgrp session tty_nr ...
///
/// Fails when fewer than [`STAT_MIN_FIELDS`] fields can be decoded, which
/// means the line is in a layout this parser does not understand.
pub fn parse_proc_stat(content: &str) -> Result<ProcStat, ParseError> {
    let content = content.trim();

    let open_paren = content.find('(');
    let close_paren = content.rfind(')');
    let pid = open_paren.and_then(|idx| content[..idx].trim().parse::<u32>().ok());

    let (pid, comm, rest) = match (pid, open_paren, close_paren) {
        (Some(pid), Some(open), Some(close)) if close > open => {
            (pid, &content[open + 1..close], &content[close + 1..])
        }
        (pid, _, _) => {
            return Err(ParseError::new(format!(
                "not enough fields in stat: expected {}+, got {}",
                STAT_MIN_FIELDS,
                usize::from(pid.is_some())
            )));
        }
    };

    let mut f = StatFields::new(rest, 2);
    let required = (|| {
        Some(ProcStat {
            pid,
            comm: comm.to_string(),
            state: f.character()?,
            ppid: f.signed()?,
            pgrp: f.signed()?,
            session: f.signed()?,
            tty_nr: f.signed()?,
            tpgid: f.signed()?,
            flags: f.unsigned()?,
            minflt: f.unsigned()?,
            cminflt: f.unsigned()?,
            majflt: f.unsigned()?,
            cmajflt: f.unsigned()?,
            utime: f.unsigned()?,
            stime: f.unsigned()?,
            cutime: f.signed()?,
            cstime: f.signed()?,
            priority: f.signed()?,
            nice: f.signed()?,
            num_threads: f.signed()?,
            itrealvalue: f.signed()?,
            starttime: f.unsigned()?,
            vsize: f.unsigned()?,
            rss: f.signed()?,
            rsslim: f.unsigned()?,
            startcode: f.unsigned()?,
            endcode: f.unsigned()?,
            startstack: f.unsigned()?,
            kstkesp: f.unsigned()?,
            kstkeip: f.unsigned()?,
            signal: f.unsigned()?,
            blocked: f.unsigned()?,
            sigignore: f.unsigned()?,
            sigcatch: f.unsigned()?,
            wchan: f.unsigned()?,
            nswap: f.unsigned()?,
            cnswap: f.unsigned()?,
            exit_signal: f.signed()?,
            processor: f.signed()?,
            rt_priority: f.unsigned()?,
            policy: f.unsigned()?,
            delayacct_blkio_ticks: f.unsigned()?,
            ..ProcStat::default()
        })
    })();

    let Some(mut stat) = required else {
        return Err(ParseError::new(format!(
            "not enough fields in stat: expected {}+, got {}",
            STAT_MIN_FIELDS, f.parsed
        )));
    };

    stat.guest_time = f.unsigned();
    stat.cguest_time = f.signed();
    stat.start_data = f.unsigned();
    stat.end_data = f.unsigned();
    stat.start_brk = f.unsigned();
    stat.arg_start = f.unsigned();
    stat.arg_end = f.unsigned();
    stat.env_start = f.unsigned();
    stat.env_end = f.unsigned();
    stat.exit_code = f.signed();
    stat.field_count = f.parsed;

    Ok(stat)
}

/// Parsed data from `/proc/[pid]/io`.
///
/// Holds whatever counters the kernel printed; which ones are required is
/// decided by the caller.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcIo {
    counters: BTreeMap<String, u64>,
}

impl ProcIo {
    pub fn get(&self, key: &str) -> Option<u64> {
        self.counters.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.counters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }
}

/// Parses `/proc/[pid]/io` content.
///
/// Format is `key: value` pairs, one per line.
pub fn parse_proc_io(content: &str) -> Result<ProcIo, ParseError> {
    let mut io = ProcIo::default();

    for line in content.lines().filter(|l| !l.trim().is_empty()) {
        let (key, value) = line
            .split_once(": ")
            .ok_or_else(|| ParseError::new(format!("malformed io line '{}'", line)))?;
        let value: u64 = value
            .trim()
            .parse()
            .map_err(|_| ParseError::new(format!("invalid value for io counter '{}'", key)))?;
        io.counters.insert(key.to_string(), value);
    }

    Ok(io)
}

/// A single value from `/proc/[pid]/sched`.
///
/// Counters are printed as integers, accumulated times with a fractional
/// part; the distinction is kept rather than folding everything into `f64`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SchedValue {
    Integer(u64),
    Float(f64),
}

impl SchedValue {
    pub fn as_f64(self) -> f64 {
        match self {
            SchedValue::Integer(v) => v as f64,
            SchedValue::Float(v) => v,
        }
    }
}

/// Parsed data from `/proc/[pid]/sched`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchedStats {
    values: BTreeMap<String, SchedValue>,
}

impl SchedStats {
    pub fn get(&self, key: &str) -> Option<SchedValue> {
        self.values.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Parses `/proc/[pid]/sched` content.
///
/// Lines look like `se.statistics.iowait_sum   :   1500.000000`. The key is
/// the last `[A-Za-z0-9_]` run before the colon, so dotted names collapse to
/// their final component. The header and separator lines do not match and
/// are skipped.
pub fn parse_proc_sched(content: &str) -> SchedStats {
    let mut stats = SchedStats::default();

    for line in content.lines() {
        if let Some((key, value)) = parse_sched_line(line) {
            stats.values.insert(key.to_string(), value);
        }
    }

    stats
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Finds the leftmost `<word> <ws> : <ws> <digits and dots>` in a line.
fn parse_sched_line(line: &str) -> Option<(&str, SchedValue)> {
    let bytes = line.as_bytes();

    for (colon, _) in line.match_indices(':') {
        // At least one whitespace, preceded by at least one word character.
        let mut key_end = colon;
        while key_end > 0 && bytes[key_end - 1].is_ascii_whitespace() {
            key_end -= 1;
        }
        if key_end == colon {
            continue;
        }
        let mut key_start = key_end;
        while key_start > 0 && is_word_byte(bytes[key_start - 1]) {
            key_start -= 1;
        }
        if key_start == key_end {
            continue;
        }

        let after = &line[colon + 1..];
        let value_part = after.trim_start();
        if value_part.len() == after.len() {
            continue;
        }
        let value_len = value_part
            .bytes()
            .take_while(|b| b.is_ascii_digit() || *b == b'.')
            .count();
        if value_len == 0 {
            continue;
        }

        let raw = &value_part[..value_len];
        let value = if raw.contains('.') {
            raw.parse().ok().map(SchedValue::Float)
        } else {
            raw.parse().ok().map(SchedValue::Integer)
        };
        if let Some(value) = value {
            return Some((&line[key_start..key_end], value));
        }
    }

    None
}

/// Parses `/proc/[pid]/cmdline` content.
///
/// Arguments are NUL separated with a trailing NUL; the result joins them
/// with single spaces. It is meant for logging only and is not escaped.
pub fn parse_cmdline(raw: &[u8]) -> String {
    let mut end = raw.len();
    while end > 0 && raw[end - 1] == 0 {
        end -= 1;
    }

    raw[..end]
        .split(|b| *b == 0)
        .map(String::from_utf8_lossy)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::mock::scenarios::{
        IO, SCHED_LEGACY, SCHED_MODERN, STAT_LEGACY, STAT_MODERN,
    };

    #[test]
    fn test_parse_uptime() {
        assert_eq!(parse_uptime("12345.67 10000.00\n").unwrap(), 12345.67);
        assert_eq!(parse_uptime("350735.47 234388.90").unwrap(), 350735.47);
    }

    #[test]
    fn test_parse_uptime_invalid() {
        assert!(parse_uptime("").is_err());
        assert!(parse_uptime("12345.67").is_err());
        assert!(parse_uptime("12345.67 abc").is_err());
        assert!(parse_uptime("12345.67 1.0 2.0").is_err());
        assert!(parse_uptime("inf 1.0").is_err());
    }

    #[test]
    fn test_parse_stat_modern_kernel() {
        let stat = parse_proc_stat(STAT_MODERN).unwrap();

        assert_eq!(stat.field_count, 52);
        assert_eq!(stat.field_names(), &STAT_FIELDS[..]);
        assert_eq!(stat.pid, 4242);
        assert_eq!(stat.comm, "php");
        assert_eq!(stat.state, 'R');
        assert_eq!(stat.ppid, 4200);
        assert_eq!(stat.tty_nr, 34816);
        assert_eq!(stat.utime, 250);
        assert_eq!(stat.stime, 40);
        assert_eq!(stat.cutime, 10);
        assert_eq!(stat.cstime, 5);
        assert_eq!(stat.priority, 25);
        assert_eq!(stat.nice, 5);
        assert_eq!(stat.starttime, 100);
        assert_eq!(stat.rsslim, u64::MAX);
        assert_eq!(stat.exit_signal, 17);
        assert_eq!(stat.processor, 3);
        assert_eq!(stat.delayacct_blkio_ticks, 12);
        assert_eq!(stat.guest_time, Some(0));
        assert_eq!(stat.start_data, Some(94000000200000));
        assert_eq!(stat.env_end, Some(140730000002000));
        assert_eq!(stat.exit_code, Some(0));
    }

    #[test]
    fn test_parse_stat_legacy_kernel() {
        let stat = parse_proc_stat(STAT_LEGACY).unwrap();

        assert_eq!(stat.field_count, STAT_MIN_FIELDS);
        assert_eq!(stat.field_names().len(), 42);
        assert_eq!(stat.field_names().last(), Some(&"delayacct_blkio_ticks"));
        assert_eq!(stat.delayacct_blkio_ticks, 12);
        assert_eq!(stat.guest_time, None);
        assert_eq!(stat.cguest_time, None);
        assert_eq!(stat.exit_code, None);
    }

    #[test]
    fn test_parse_stat_partial_trailing_fields() {
        // 2.6.24 kernels add guest_time and cguest_time only.
        let line = format!("{} 7 3", STAT_LEGACY.trim());
        let stat = parse_proc_stat(&line).unwrap();

        assert_eq!(stat.field_count, 44);
        assert_eq!(stat.field_names().last(), Some(&"cguest_time"));
        assert_eq!(stat.guest_time, Some(7));
        assert_eq!(stat.cguest_time, Some(3));
        assert_eq!(stat.start_data, None);
    }

    #[test]
    fn test_parse_stat_ignores_unknown_trailing_fields() {
        let line = format!("{} 11 22 33", STAT_MODERN.trim());
        let stat = parse_proc_stat(&line).unwrap();

        assert_eq!(stat.field_count, 52);
        assert_eq!(stat.exit_code, Some(0));
    }

    #[test]
    fn test_parse_stat_too_few_fields() {
        let mut tokens: Vec<&str> = STAT_LEGACY.split_whitespace().collect();
        tokens.pop();
        let err = parse_proc_stat(&tokens.join(" ")).unwrap_err();
        assert!(err.message.contains("got 41"), "{}", err.message);

        assert!(parse_proc_stat("").is_err());
        assert!(parse_proc_stat("1234 bash S 1 1 1").is_err());
    }

    #[test]
    fn test_parse_stat_stops_at_undecodable_field() {
        // Garbage in field 30 (kstkeip): only 29 fields are understood.
        let mut tokens: Vec<&str> = STAT_MODERN.split_whitespace().collect();
        tokens[29] = "garbage";
        let err = parse_proc_stat(&tokens.join(" ")).unwrap_err();
        assert!(err.message.contains("got 29"), "{}", err.message);

        // Garbage in field 45 (start_data): the first 44 still qualify.
        let mut tokens: Vec<&str> = STAT_MODERN.split_whitespace().collect();
        tokens[44] = "garbage";
        let stat = parse_proc_stat(&tokens.join(" ")).unwrap();
        assert_eq!(stat.field_count, 44);
        assert_eq!(stat.cguest_time, Some(0));
        assert_eq!(stat.start_data, None);
        assert_eq!(stat.exit_code, None);
    }

    #[test]
    fn test_parse_stat_special_comm() {
        let line = "77 (kworker/0:1 (events)) I 2 0 0 0 -1 69238880 0 0 0 0 0 310 0 0 20 0 1 0 35 0 0 18446744073709551615 0 0 0 0 0 0 0 2147483647 0 0 0 0 17 0 0 0 0";
        let stat = parse_proc_stat(line).unwrap();

        assert_eq!(stat.comm, "kworker/0:1 (events)");
        assert_eq!(stat.state, 'I');
        assert_eq!(stat.tpgid, -1);
        assert_eq!(stat.stime, 310);
    }

    #[test]
    fn test_parse_io() {
        let io = parse_proc_io("rchar: 100\nwchar: 200\nsyscr: 3\nsyscw: 4\n").unwrap();

        assert_eq!(io.len(), 4);
        assert_eq!(io.get("rchar"), Some(100));
        assert_eq!(io.get("wchar"), Some(200));
        assert_eq!(io.get("syscr"), Some(3));
        assert_eq!(io.get("syscw"), Some(4));
        assert_eq!(io.get("read_bytes"), None);
    }

    #[test]
    fn test_parse_io_full() {
        let io = parse_proc_io(IO).unwrap();
        assert_eq!(io.len(), 7);
        assert_eq!(io.get("write_bytes"), Some(323932160));
        assert_eq!(io.get("cancelled_write_bytes"), Some(0));
    }

    #[test]
    fn test_parse_io_invalid() {
        assert!(parse_proc_io("rchar 100\n").is_err());
        assert!(parse_proc_io("rchar: lots\n").is_err());
        assert!(parse_proc_io("").unwrap().is_empty());
    }

    #[test]
    fn test_parse_sched_line_types() {
        let stats = parse_proc_sched("iowait_sum                  :                 1500.000000\n");
        assert_eq!(stats.get("iowait_sum"), Some(SchedValue::Float(1500.0)));

        let stats = parse_proc_sched("nr_switches   :   42\n");
        assert_eq!(stats.get("nr_switches"), Some(SchedValue::Integer(42)));
    }

    #[test]
    fn test_parse_sched_modern() {
        let stats = parse_proc_sched(SCHED_MODERN);

        assert_eq!(stats.get("iowait_sum"), Some(SchedValue::Float(1500.0)));
        assert_eq!(stats.get("iowait_count"), Some(SchedValue::Integer(7)));
        assert_eq!(stats.get("sum_exec_runtime"), Some(SchedValue::Float(2900.123456)));
        assert_eq!(stats.get("weight"), Some(SchedValue::Integer(1024)));
        assert_eq!(stats.get("delta"), Some(SchedValue::Integer(55)));
        assert_eq!(stats.get("prio"), Some(SchedValue::Integer(125)));
        // Header and separator lines are skipped.
        assert_eq!(stats.get("threads"), None);
        assert_eq!(stats.len(), 13);
    }

    #[test]
    fn test_parse_sched_legacy() {
        let stats = parse_proc_sched(SCHED_LEGACY);
        assert_eq!(stats.get("iowait_sum"), Some(SchedValue::Float(1500.0)));
        assert_eq!(stats.len(), 7);
    }

    #[test]
    fn test_parse_sched_skips_non_matching() {
        let stats = parse_proc_sched(
            "bash (1, #threads: 1)\n-----\nkey:1\nkey : \nneg   :   -5\nmm->numa_scan_seq   :   0\n",
        );
        assert_eq!(stats.len(), 1);
        assert_eq!(stats.get("numa_scan_seq"), Some(SchedValue::Integer(0)));
    }

    #[test]
    fn test_parse_sched_line_skips_unparsable_value() {
        assert_eq!(
            parse_sched_line("a   :   1.2.3   b   :   7"),
            Some(("b", SchedValue::Integer(7)))
        );
        assert_eq!(parse_sched_line("nr   :   99999999999999999999999"), None);

        let stats = parse_proc_sched("x : 1.2.3\niowait_sum : 1500.000000\n");
        assert_eq!(stats.len(), 1);
        assert_eq!(stats.get("iowait_sum"), Some(SchedValue::Float(1500.0)));
    }

    #[test]
    fn test_sched_value_as_f64() {
        assert_eq!(SchedValue::Integer(3).as_f64(), 3.0);
        assert_eq!(SchedValue::Float(1.5).as_f64(), 1.5);
    }

    #[test]
    fn test_parse_cmdline() {
        assert_eq!(
            parse_cmdline(b"php\0/srv/app/cron.php\0--verbose\0"),
            "php /srv/app/cron.php --verbose"
        );
        assert_eq!(parse_cmdline(b"bash\0\0\0"), "bash");
        assert_eq!(parse_cmdline(b""), "");
        assert_eq!(parse_cmdline(b"\xffbin\0"), "\u{fffd}bin");
    }

    #[test]
    fn test_parse_cmdline_round_trip() {
        let args = ["python3", "-m", "http.server", "8080"];
        let mut raw = Vec::new();
        for arg in args {
            raw.extend_from_slice(arg.as_bytes());
            raw.push(0);
        }

        let joined = parse_cmdline(&raw);
        let split: Vec<&str> = joined.split(' ').collect();
        assert_eq!(split, args);
        assert_eq!(parse_cmdline(&raw), joined);
    }
}
