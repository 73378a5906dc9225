//! Crash artifacts: `crash-<pid>.log` in the runtime directory.

use std::backtrace::Backtrace;
use std::fmt::Display;
use std::fs;
use std::panic::PanicHookInfo;
use std::path::{Path, PathBuf};

use log::{error, warn};

use crate::paths::runtime_dir;

pub fn crash_file() -> PathBuf {
    runtime_dir().join(format!("crash-{}.log", std::process::id()))
}

/// Writes `report` to `path`. Failure is logged, never fatal.
fn write_report(path: &Path, report: &str) {
    if let Some(dir) = path.parent() {
        if let Err(e) = fs::create_dir_all(dir) {
            warn!("cannot create {}: {e}", dir.display());
            return;
        }
    }
    match fs::write(path, report) {
        Ok(()) => error!("crash report written to {}", path.display()),
        Err(e) => warn!("cannot write crash report {}: {e}", path.display()),
    }
}

fn panic_report(info: &PanicHookInfo<'_>, backtrace: &Backtrace) -> String {
    let message = info
        .payload()
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| info.payload().downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "<non-string panic payload>".to_string());
    let location = info
        .location()
        .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
        .unwrap_or_else(|| "<unknown>".to_string());
    format!("panic: {message}\nat: {location}\n\n{backtrace}\n")
}

/// Chains a hook that writes the crash file before the previous hook runs.
/// `cleanup` runs first, for restoring the terminal.
pub fn install_panic_hook(cleanup: fn()) {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        cleanup();
        let report = panic_report(info, &Backtrace::force_capture());
        error!("{report}");
        write_report(&crash_file(), &report);
        previous(info);
    }));
}

/// Records a fatal startup error.
pub fn write_fatal(err: &dyn Display) {
    error!("fatal: {err}");
    write_report(&crash_file(), &format!("fatal: {err}\n"));
}
