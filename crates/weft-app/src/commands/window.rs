use std::path::PathBuf;

use log::info;

use weft_mux::{LayoutKind, MuxError, SessionId, WindowId};

use super::{
    current_pane, current_session, current_window, default_window_name, issuing_clients, resolve_session,
    resolve_window, Context,
};
use crate::command::CommandError;
use crate::state::Server;

/// Splits a `new-window`/`move-window` destination into its session and
/// optional index: `sess:idx`, `sess:`, `:idx`, `idx` or `sess`.
fn destination(server: &Server, ctx: &Context, target: Option<&str>) -> Result<(SessionId, Option<u32>), CommandError> {
    let Some(target) = target else {
        return Ok((current_session(server, ctx)?, None));
    };
    let index = |text: &str| -> Result<Option<u32>, CommandError> {
        if text.is_empty() {
            return Ok(None);
        }
        text.parse()
            .map(Some)
            .map_err(|_| CommandError::Target(format!("window index: {text}")))
    };
    match target.split_once(':') {
        Some((session, idx)) => {
            let session = resolve_session(server, ctx, Some(session).filter(|s| !s.is_empty()))?;
            Ok((session, index(idx)?))
        }
        None => match target.parse::<u32>() {
            Ok(i) => Ok((current_session(server, ctx)?, Some(i))),
            Err(_) => Ok((resolve_session(server, ctx, Some(target))?, None)),
        },
    }
}

pub fn new_window(
    server: &mut Server,
    ctx: &Context,
    name: Option<&str>,
    cwd: Option<PathBuf>,
    detached: bool,
    target: Option<&str>,
    command: &[String],
) -> Result<String, CommandError> {
    let (session, index) = destination(server, ctx, target)?;
    let sess = server.mux.session(session).ok_or(MuxError::SessionNotFound(session))?;
    if let Some(index) = index {
        if sess.window_at(index).is_some() {
            return Err(MuxError::IndexInUse(index).into());
        }
    }
    let size = server
        .mux
        .window(sess.active_window())
        .map(|w| w.size())
        .unwrap_or_else(|| server.mux.default_window_size());
    let from = current_pane(server, ctx).ok();

    let pane = server.mux.alloc_pane();
    server.spawn_pane(pane, size, command, cwd, from)?;
    let name = match name {
        Some(n) => n.to_string(),
        None => default_window_name(server, pane, command),
    };
    match server.mux.create_window(session, &name, pane, index, !detached) {
        Ok(window) => {
            info!("new window {window} in session {session}");
            if !detached {
                focus_window(server, ctx, window)?;
            }
            Ok(String::new())
        }
        Err(e) => {
            server.panes.remove(pane);
            Err(e.into())
        }
    }
}

pub fn kill_window(server: &mut Server, ctx: &Context, target: Option<&str>) -> Result<String, CommandError> {
    let window = resolve_window(server, ctx, target)?;
    let teardown = server.mux.kill_window(window)?;
    info!("killed window {window}");
    server.apply_teardown(teardown);
    Ok(String::new())
}

pub fn rename_window(server: &mut Server, ctx: &Context, target: Option<&str>, name: &str) -> Result<String, CommandError> {
    let window = resolve_window(server, ctx, target)?;
    server
        .mux
        .window_mut(window)
        .ok_or(MuxError::WindowNotFound(window))?
        .rename(name);
    Ok(String::new())
}

/// Makes `window` active in its session and points the issuing client at
/// it, following it into that session if needed. Other clients attached to
/// the session keep their view.
pub(crate) fn focus_window(server: &mut Server, ctx: &Context, window: WindowId) -> Result<(), CommandError> {
    let session = server
        .mux
        .window(window)
        .ok_or(MuxError::WindowNotFound(window))?
        .session();
    server.mux.select_window(session, window)?;
    for client in issuing_clients(server, ctx) {
        server.mux.switch_window(client, window)?;
    }
    Ok(())
}

pub fn select_window(server: &mut Server, ctx: &Context, target: &str) -> Result<String, CommandError> {
    let window = resolve_window(server, ctx, Some(target))?;
    focus_window(server, ctx, window)?;
    Ok(String::new())
}

/// Steps from the window the issuer is looking at, not the session's.
pub fn cycle_window(server: &mut Server, ctx: &Context, step: isize) -> Result<String, CommandError> {
    let from = current_window(server, ctx)?;
    let session = server
        .mux
        .window(from)
        .ok_or(MuxError::WindowNotFound(from))?
        .session();
    let next = server
        .mux
        .session(session)
        .ok_or(MuxError::SessionNotFound(session))?
        .cycle_from(from, step);
    focus_window(server, ctx, next)?;
    Ok(String::new())
}

pub fn last_window(server: &mut Server, ctx: &Context) -> Result<String, CommandError> {
    let client_last = ctx
        .client
        .and_then(|c| server.mux.client(c))
        .and_then(|c| c.last_window);
    let last = match client_last {
        Some(last) => last,
        None => {
            let session = current_session(server, ctx)?;
            server
                .mux
                .session(session)
                .ok_or(MuxError::SessionNotFound(session))?
                .last_window()
                .ok_or(MuxError::NoPrevious("window"))?
        }
    };
    focus_window(server, ctx, last)?;
    Ok(String::new())
}

/// Renumbers a window within its session.
pub fn move_window(server: &mut Server, ctx: &Context, source: Option<&str>, target: &str) -> Result<String, CommandError> {
    let window = resolve_window(server, ctx, source)?;
    let from = server
        .mux
        .window(window)
        .ok_or(MuxError::WindowNotFound(window))?
        .session();
    let (session, index) = destination(server, ctx, Some(target))?;
    if session != from {
        return Err(CommandError::Failed("cannot move a window to another session".to_string()));
    }
    let index = index.ok_or_else(|| CommandError::Target(format!("window index: {target}")))?;
    server
        .mux
        .session_mut(session)
        .ok_or(MuxError::SessionNotFound(session))?
        .move_window(window, index)?;
    Ok(String::new())
}

pub fn select_layout(server: &mut Server, ctx: &Context, kind: LayoutKind) -> Result<String, CommandError> {
    let window = current_window(server, ctx)?;
    server
        .mux
        .window_mut(window)
        .ok_or(MuxError::WindowNotFound(window))?
        .select_layout(kind);
    Ok(String::new())
}

pub fn cycle_layout(server: &mut Server, ctx: &Context, step: isize) -> Result<String, CommandError> {
    let window = current_window(server, ctx)?;
    let kind = server
        .mux
        .window_mut(window)
        .ok_or(MuxError::WindowNotFound(window))?
        .cycle_layout(step);
    log::debug!("window {window} layout now {kind}");
    Ok(String::new())
}

/// Positive steps move every pane one place back in tree order.
pub fn rotate_window(server: &mut Server, ctx: &Context, step: isize) -> Result<String, CommandError> {
    let window = current_window(server, ctx)?;
    server
        .mux
        .window_mut(window)
        .ok_or(MuxError::WindowNotFound(window))?
        .rotate(step);
    Ok(String::new())
}
