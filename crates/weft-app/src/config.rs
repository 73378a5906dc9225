//! Config files: one command per line, run in order.

use std::fs;
use std::io;
use std::path::Path;

use log::{info, warn};
use thiserror::Error;

use crate::commands::Context;
use crate::state::Server;

/// A line that failed to parse or run. Loading carries on past it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {message}")]
pub struct ConfigError {
    pub line: usize,
    pub message: String,
}

pub fn load_file(server: &mut Server, path: &Path) -> io::Result<Vec<ConfigError>> {
    let text = fs::read_to_string(path)?;
    let errors = load_str(server, &text);
    info!("loaded {} with {} error(s)", path.display(), errors.len());
    for e in &errors {
        warn!("{}: {e}", path.display());
    }
    Ok(errors)
}

pub fn load_str(server: &mut Server, text: &str) -> Vec<ConfigError> {
    let ctx = Context::default();
    text.lines()
        .enumerate()
        .filter_map(|(i, line)| {
            server.run_line(&ctx, line).err().map(|e| ConfigError {
                line: i + 1,
                message: e.to_string(),
            })
        })
        .collect()
}
