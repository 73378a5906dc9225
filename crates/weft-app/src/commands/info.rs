use std::fmt::Write;
use std::path::Path;

use chrono::{Local, TimeZone};

use weft_mux::MuxError;

use super::{current_pane, resolve_session, resolve_window, Context};
use crate::command::CommandError;
use crate::config;
use crate::format::expand;
use crate::state::Server;
use crate::status::{format_values, window_flags};

const DEFAULT_MESSAGE: &str = "[#S] #I:#W, current pane #P - (%H:%M %d-%b-%y)";

pub fn list_sessions(server: &Server) -> String {
    let mut out = String::new();
    for session in server.mux.sessions() {
        let size = server
            .mux
            .window(session.active_window())
            .map(|w| w.size().to_string())
            .unwrap_or_default();
        let created = i64::try_from(session.created())
            .ok()
            .and_then(|secs| Local.timestamp_opt(secs, 0).single())
            .map(|t| t.format("%a %b %e %H:%M:%S %Y").to_string())
            .unwrap_or_default();
        let attached = if server.mux.clients().on_session(session.id()).is_empty() {
            ""
        } else {
            " (attached)"
        };
        let _ = writeln!(
            out,
            "{}: {} windows (created {created}) [{size}]{attached}",
            session.name(),
            session.len(),
        );
    }
    out
}

pub fn list_windows(server: &Server, ctx: &Context, target: Option<&str>) -> Result<String, CommandError> {
    let session = resolve_session(server, ctx, target)?;
    let sess = server.mux.session(session).ok_or(MuxError::SessionNotFound(session))?;
    let mut out = String::new();
    for (index, id) in sess.windows() {
        let Some(window) = server.mux.window(id) else {
            continue;
        };
        let _ = writeln!(
            out,
            "{index}: {}{} ({} panes) [{}] {id}",
            window.name(),
            window_flags(sess, window),
            window.pane_count(),
            window.size(),
        );
    }
    Ok(out)
}

pub fn list_panes(server: &Server, ctx: &Context, target: Option<&str>) -> Result<String, CommandError> {
    let window = resolve_window(server, ctx, target)?;
    let win = server.mux.window(window).ok_or(MuxError::WindowNotFound(window))?;
    let mut out = String::new();
    for (index, pane) in win.panes().into_iter().enumerate() {
        let size = server.panes.get(pane).map(|p| p.size()).unwrap_or_default();
        let dead = match server.panes.get(pane) {
            Some(p) if p.is_exited() => " (dead)",
            _ => "",
        };
        let active = if pane == win.active_pane() { " (active)" } else { "" };
        let _ = writeln!(out, "{index}: [{size}] {pane}{active}{dead}");
    }
    Ok(out)
}

/// Expands the message, or a default one, against the current pane.
pub fn display_message(server: &Server, ctx: &Context, message: &[String]) -> Result<String, CommandError> {
    let format = if message.is_empty() {
        DEFAULT_MESSAGE.to_string()
    } else {
        message.join(" ")
    };
    let pane = current_pane(server, ctx)?;
    let window = server.mux.window_of(pane).ok_or(MuxError::PaneNotFound(pane))?;
    let values =
        format_values(&server.mux, &server.panes, window, Some(pane)).ok_or(MuxError::WindowNotFound(window))?;
    Ok(expand(&format, &values.context(), &Local::now()))
}

pub fn set_option(server: &mut Server, name: &str, value: &str) -> Result<String, CommandError> {
    let effect = server.options.set(name, value)?;
    server.apply_option(effect);
    Ok(String::new())
}

pub fn show_options(server: &Server, name: Option<&str>) -> Result<String, CommandError> {
    match name {
        Some(name) => Ok(format!("{name} {:?}\n", server.options.get(name)?)),
        None => Ok(server.options.show()),
    }
}

/// How many `source-file` commands may be running inside one another.
const MAX_SOURCE_DEPTH: usize = 10;

/// Runs a config file. Failing lines are reported together after the rest
/// of the file has run.
pub fn source_file(server: &mut Server, path: &Path) -> Result<String, CommandError> {
    if server.source_depth >= MAX_SOURCE_DEPTH {
        return Err(CommandError::Failed("source-file nested too deeply".to_string()));
    }
    server.source_depth += 1;
    let loaded = config::load_file(server, path);
    server.source_depth -= 1;
    let errors = loaded?;
    if errors.is_empty() {
        return Ok(String::new());
    }
    let report: Vec<String> = errors
        .iter()
        .map(|e| format!("{}:{}", path.display(), e))
        .collect();
    Err(CommandError::Failed(report.join("\n")))
}
