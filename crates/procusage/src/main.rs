//! procusage - logs the resource usage of a process to a shared CSV file.
//!
//! Reads `/proc/<pid>/{stat,io,sched,cmdline}` and `/proc/uptime`, derives
//! one usage record and appends it under an exclusive lock.

use std::process::ExitCode;

use clap::Parser;
use tracing::{Level, debug, error, info};
use tracing_subscriber::EnvFilter;

use procusage_core::collector::RealFs;
use procusage_core::{Config, CsvSink, ProcessId, UsageCollector, UsageRecord, log_usage_with};

/// Per-process resource usage logger.
#[derive(Parser, Debug)]
#[command(name = "procusage", about = "Per-process resource usage logger", version)]
struct Args {
    /// Process to measure. 0 measures procusage itself.
    #[arg(short, long, default_value = "0")]
    pid: u32,

    /// CSV file receiving the usage record.
    #[arg(short, long, default_value = procusage_core::config::DEFAULT_LOG_PATH)]
    log_file: String,

    /// Path to /proc filesystem (for testing/mocking).
    #[arg(long, default_value = procusage_core::config::DEFAULT_PROC_PATH)]
    proc_path: String,

    /// Kernel clock ticks per second (`getconf CLK_TCK`).
    #[arg(long, default_value_t = procusage_core::config::DEFAULT_CLK_TCK,
          value_parser = clap::value_parser!(u64).range(1..))]
    clk_tck: u64,

    /// Print the record as JSON instead of appending it to the log.
    #[arg(long)]
    stdout: bool,

    /// Print the effective configuration as JSON and exit.
    #[arg(long)]
    show_config: bool,

    /// Increase logging verbosity (-v for debug, -vv for trace). Default is warn level.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode - only show errors.
    #[arg(short, long)]
    quiet: bool,
}

impl Args {
    fn config(&self) -> Config {
        Config::default()
            .with_proc_path(&self.proc_path)
            .with_log_path(&self.log_file)
            .with_clk_tck(self.clk_tck)
    }
}

fn log_level(verbose: u8, quiet: bool) -> Level {
    if quiet {
        return Level::ERROR;
    }
    match verbose {
        0 => Level::WARN,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Initializes the tracing subscriber on stderr.
fn init_logging(verbose: u8, quiet: bool) {
    let level = log_level(verbose, quiet);

    let mut filter = EnvFilter::from_default_env();
    for target in ["procusage", "procusage_core"] {
        if let Ok(directive) = format!("{}={}", target, level).parse() {
            filter = filter.add_directive(directive);
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), String> {
    let json = serde_json::to_string_pretty(value).map_err(|e| e.to_string())?;
    println!("{}", json);
    Ok(())
}

fn run(args: &Args) -> Result<Option<UsageRecord>, String> {
    let config = args.config();
    if args.show_config {
        print_json(&config)?;
        return Ok(None);
    }

    let pid = ProcessId::from_raw(args.pid);
    let collector = UsageCollector::new(RealFs::new(), &config);
    debug!("measuring pid {} below {}", pid, config.proc_path.display());

    if args.stdout {
        let record = collector
            .calculate(pid)
            .map_err(|e| format!("failed to acquire usage statistics: {}", e))?;
        print_json(&record)?;
        return Ok(Some(record));
    }

    let sink = CsvSink::new(&config.log_path);
    let record = log_usage_with(&collector, &sink, pid).map_err(|e| e.to_string())?;
    info!(
        "pid {} (real {:.2}s, cpu {:.2}s) logged to {}",
        record.pid,
        record.real,
        record.utime + record.stime,
        sink.path().display()
    );
    Ok(Some(record))
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose, args.quiet);

    match run(&args) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
