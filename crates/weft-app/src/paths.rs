//! Where the socket, logs, crash dumps and config live.

use std::fs;
use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

/// Environment variable set in every pane: `<socket>,<pane id>`.
pub const ENV_VAR: &str = "WEFT";

/// `$TMPDIR/weft-<user>`, or under `/tmp` when `TMPDIR` is unset.
pub fn runtime_dir() -> PathBuf {
    let base = std::env::var_os("TMPDIR")
        .filter(|d| !d.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("/tmp"));
    base.join(format!("weft-{}", user_name()))
}

fn user_name() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("LOGNAME"))
        .ok()
        .filter(|u| !u.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Creates the runtime directory if needed and makes it private.
pub fn ensure_private_dir(dir: &Path) -> io::Result<()> {
    fs::create_dir_all(dir)?;
    fs::set_permissions(dir, fs::Permissions::from_mode(0o700))
}

/// Splits a `WEFT` value into its socket path and pane id text.
pub fn parse_env(value: &str) -> Option<(PathBuf, Option<&str>)> {
    let (socket, pane) = match value.rsplit_once(',') {
        Some((socket, pane)) => (socket, Some(pane).filter(|p| !p.is_empty())),
        None => (value, None),
    };
    (!socket.is_empty()).then(|| (PathBuf::from(socket), pane))
}

/// The `-S` path, else the socket of the enclosing pane, else the default.
pub fn socket_path(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    std::env::var(ENV_VAR)
        .ok()
        .and_then(|v| parse_env(&v).map(|(socket, _)| socket))
        .unwrap_or_else(|| runtime_dir().join("default"))
}

/// The pane the current process runs in, when started from inside one.
pub fn enclosing_pane() -> Option<weft_mux::PaneId> {
    let value = std::env::var(ENV_VAR).ok()?;
    let (_, pane) = parse_env(&value)?;
    pane?.parse().ok()
}

pub fn default_log_file() -> PathBuf {
    runtime_dir().join("server.log")
}

/// `~/.weft.conf`
pub fn default_config_file() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .filter(|h| !h.is_empty())
        .map(|home| PathBuf::from(home).join(".weft.conf"))
}
