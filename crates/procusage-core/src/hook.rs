//! Exit-time trigger for logging the usage of the current process.
//!
//! [`install`] registers an `atexit(3)` handler, so the record is written on
//! every normal termination including `std::process::exit`. [`UsageGuard`]
//! does the same from a destructor for hosts that prefer scoped setup.
//! Whichever runs first wins; the record is written at most once per process.
//!
//! Failures are reported through `tracing` only. Nothing here panics, exits,
//! or writes to the host's stdout/stderr.

use crate::collector::ProcessId;
use crate::config::Config;
use crate::log_usage;
use std::panic::{self, AssertUnwindSafe};
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, error, warn};

static EXIT_CONFIG: OnceLock<Config> = OnceLock::new();
static FIRED: AtomicBool = AtomicBool::new(false);

/// Registers the exit handler. Returns `false` if a handler was already
/// installed (the first configuration stays in effect) or registration failed.
pub fn install(config: Config) -> bool {
    if EXIT_CONFIG.set(config).is_err() {
        debug!("exit hook already installed");
        return false;
    }

    // SAFETY: `run_at_exit` takes no arguments and never unwinds.
    let rc = unsafe { libc::atexit(run_at_exit) };
    if rc != 0 {
        warn!("failed to register exit hook (atexit returned {})", rc);
        return false;
    }
    true
}

/// Whether the usage of this process has already been logged (or attempted).
pub fn has_fired() -> bool {
    FIRED.load(Ordering::SeqCst)
}

extern "C" fn run_at_exit() {
    if let Some(config) = EXIT_CONFIG.get() {
        run_once(&FIRED, config);
    }
}

/// Logs the current process unless `fired` is already set.
///
/// Returns `true` when this call performed the attempt.
fn run_once(fired: &AtomicBool, config: &Config) -> bool {
    if fired.swap(true, Ordering::SeqCst) {
        return false;
    }

    match panic::catch_unwind(AssertUnwindSafe(|| log_usage(config, ProcessId::Current))) {
        Ok(Ok(record)) => debug!(
            "logged usage of pid {} to {}",
            record.pid,
            config.log_path.display()
        ),
        Ok(Err(e)) => error!("{}", e),
        Err(_) => error!("usage logging panicked"),
    }
    true
}

/// Logs the usage of the current process when dropped.
///
/// Keep it alive for the lifetime of `main`:
///
/// ```no_run
/// use procusage_core::{Config, hook::UsageGuard};
///
/// let _usage = UsageGuard::new(Config::default());
/// // ... host program ...
/// ```
#[must_use = "the usage is logged when the guard is dropped"]
pub struct UsageGuard {
    config: Config,
}

impl UsageGuard {
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

impl Drop for UsageGuard {
    fn drop(&mut self) {
        run_once(&FIRED, &self.config);
    }
}
