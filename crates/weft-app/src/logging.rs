//! File logging. Nothing is ever logged to the terminal a client paints on.

use std::fs::{self, OpenOptions};
use std::io;
use std::path::Path;

use log::LevelFilter;
use simplelog::{CombinedLogger, Config, ConfigBuilder, WriteLogger};

fn new_config() -> Config {
    let mut builder = ConfigBuilder::new();
    // falls back to UTC when the local offset cannot be determined
    let builder = match builder.set_time_offset_to_local() {
        Ok(b) | Err(b) => b,
    };
    builder
        .set_time_format_rfc3339()
        .set_thread_level(LevelFilter::Debug)
        .set_target_level(LevelFilter::Debug)
        .build()
}

/// Appends log records at `level` and above to `path`.
pub fn init_file_logger(path: &Path, level: LevelFilter) -> io::Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    CombinedLogger::init(vec![WriteLogger::new(level, new_config(), file)])
        .map_err(|e| io::Error::new(io::ErrorKind::AlreadyExists, e))
}

/// Parses `--log-level` values.
pub fn parse_level(value: &str) -> Result<LevelFilter, String> {
    value
        .parse()
        .map_err(|_| format!("invalid log level: {value} (off, error, warn, info, debug, trace)"))
}
