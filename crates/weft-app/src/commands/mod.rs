//! Command execution against the server state.
//!
//! Each submodule handles one level of the hierarchy. Every handler either
//! fails before changing anything, or applies its change and returns the
//! text to show the issuer.

pub mod client;
pub mod info;
pub mod pane;
pub mod session;
pub mod window;

use weft_mux::{ClientId, Direction, PaneId, SessionId, WindowId};

use crate::command::{Command, CommandError};
use crate::state::Server;

/// Who issued a command: an attached client, a process inside a pane, or
/// neither (config file, one-shot from outside).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Context {
    pub client: Option<ClientId>,
    pub pane: Option<PaneId>,
}

pub fn execute(server: &mut Server, ctx: &Context, command: Command) -> Result<String, CommandError> {
    match command {
        Command::NewSession {
            name,
            window_name,
            cwd,
            detached,
            command,
        } => session::new_session(
            server,
            ctx,
            name.as_deref(),
            window_name.as_deref(),
            cwd,
            detached,
            &command,
        ),
        Command::KillSession { target } => session::kill_session(server, ctx, target.as_deref()),
        Command::RenameSession { target, name } => session::rename_session(server, ctx, target.as_deref(), &name),
        Command::HasSession { target } => session::has_session(server, ctx, target.as_deref()),
        Command::ListSessions => Ok(info::list_sessions(server)),
        Command::NewWindow {
            name,
            cwd,
            detached,
            target,
            command,
        } => window::new_window(server, ctx, name.as_deref(), cwd, detached, target.as_deref(), &command),
        Command::KillWindow { target } => window::kill_window(server, ctx, target.as_deref()),
        Command::RenameWindow { target, name } => window::rename_window(server, ctx, target.as_deref(), &name),
        Command::SelectWindow { target } => window::select_window(server, ctx, &target),
        Command::NextWindow => window::cycle_window(server, ctx, 1),
        Command::PreviousWindow => window::cycle_window(server, ctx, -1),
        Command::LastWindow => window::last_window(server, ctx),
        Command::MoveWindow { source, target } => window::move_window(server, ctx, source.as_deref(), &target),
        Command::ListWindows { target } => info::list_windows(server, ctx, target.as_deref()),
        Command::SplitWindow {
            horizontal,
            percent,
            cwd,
            target,
            command,
            ..
        } => pane::split_window(server, ctx, horizontal, percent, cwd, target.as_deref(), &command),
        Command::KillPane { target } => pane::kill_pane(server, ctx, target.as_deref()),
        Command::RenamePane { target, name } => pane::rename_pane(server, ctx, target.as_deref(), &name),
        Command::SelectPane {
            left,
            right,
            up,
            down,
            target,
        } => {
            let direction = [
                (left, Direction::Left),
                (right, Direction::Right),
                (up, Direction::Up),
                (down, Direction::Down),
            ]
            .into_iter()
            .find_map(|(set, d)| set.then_some(d));
            pane::select_pane(server, ctx, direction, target.as_deref())
        }
        Command::LastPane => pane::last_pane(server, ctx),
        Command::SwapPane { up, .. } => pane::swap_pane(server, ctx, if up { -1 } else { 1 }),
        Command::RotateWindow { down, .. } => window::rotate_window(server, ctx, if down { -1 } else { 1 }),
        Command::BreakPane { detached, target } => pane::break_pane(server, ctx, detached, target.as_deref()),
        Command::ResizePane {
            left,
            right,
            up,
            down,
            zoom,
            target,
        } => {
            let steps = [
                (Direction::Left, left),
                (Direction::Right, right),
                (Direction::Up, up),
                (Direction::Down, down),
            ];
            pane::resize_pane(server, ctx, &steps, zoom, target.as_deref())
        }
        Command::SelectLayout { layout } => window::select_layout(server, ctx, layout),
        Command::NextLayout => window::cycle_layout(server, ctx, 1),
        Command::PreviousLayout => window::cycle_layout(server, ctx, -1),
        Command::SendKeys { literal, target, keys } => pane::send_keys(server, ctx, literal, target.as_deref(), &keys),
        Command::ClearHistory { target } => pane::clear_history(server, ctx, target.as_deref()),
        Command::ListPanes { target } => info::list_panes(server, ctx, target.as_deref()),
        Command::DisplayMessage { message, .. } => info::display_message(server, ctx, &message),
        Command::SetOption { name, value, .. } => info::set_option(server, &name, &value),
        Command::ShowOptions { name, .. } => info::show_options(server, name.as_deref()),
        Command::SourceFile { path } => info::source_file(server, &path),
        Command::DetachClient { others } => client::detach_client(server, ctx, others),
        Command::SwitchClient { target } => client::switch_client(server, ctx, &target),
        Command::KillServer => {
            server.request_shutdown();
            Ok(String::new())
        }
    }
}

/// The session a command applies to when no target is given: the
/// client's, else the one holding the issuing pane, else the first.
pub(crate) fn current_session(server: &Server, ctx: &Context) -> Result<SessionId, CommandError> {
    if let Some(client) = ctx.client.and_then(|c| server.mux.client(c)) {
        return Ok(client.session);
    }
    if let Some(window) = ctx.pane.and_then(|p| server.mux.window_of(p)) {
        if let Some(w) = server.mux.window(window) {
            return Ok(w.session());
        }
    }
    server
        .mux
        .sessions()
        .next()
        .map(|s| s.id())
        .ok_or_else(|| CommandError::Failed("no sessions".to_string()))
}

pub(crate) fn current_window(server: &Server, ctx: &Context) -> Result<WindowId, CommandError> {
    if let Some(window) = ctx.pane.and_then(|p| server.mux.window_of(p)) {
        return Ok(window);
    }
    if let Some(client) = ctx.client.and_then(|c| server.mux.client(c)) {
        return Ok(client.window);
    }
    let session = current_session(server, ctx)?;
    server
        .mux
        .session(session)
        .map(|s| s.active_window())
        .ok_or_else(|| CommandError::Target(session.to_string()))
}

pub(crate) fn current_pane(server: &Server, ctx: &Context) -> Result<PaneId, CommandError> {
    if let Some(pane) = ctx.pane.filter(|p| server.mux.window_of(*p).is_some()) {
        return Ok(pane);
    }
    let window = current_window(server, ctx)?;
    server
        .mux
        .window(window)
        .map(|w| w.active_pane())
        .ok_or_else(|| CommandError::Target(window.to_string()))
}

/// Clients whose view follows a window change: the issuing client, else
/// whoever watches the issuing pane's window. Config and one-shot commands
/// move nobody.
pub(crate) fn issuing_clients(server: &Server, ctx: &Context) -> Vec<ClientId> {
    if let Some(client) = ctx.client.filter(|c| server.mux.client(*c).is_some()) {
        return vec![client];
    }
    match ctx.pane.and_then(|p| server.mux.window_of(p)) {
        Some(window) => server.mux.clients().watchers(window),
        None => Vec::new(),
    }
}

/// Name for a new window: the first word of its command, else the shell.
pub(crate) fn default_window_name(server: &Server, pane: PaneId, command: &[String]) -> String {
    match command.first().and_then(|c| c.split_whitespace().next()) {
        Some(word) => word.rsplit('/').next().unwrap_or(word).to_string(),
        None => server
            .panes
            .get(pane)
            .map(|p| p.command().program_name().to_string())
            .unwrap_or_default(),
    }
}

/// A target split into its `session:window.pane` parts. Empty parts are
/// `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TargetParts<'a> {
    session: Option<&'a str>,
    window: Option<&'a str>,
    pane: Option<&'a str>,
}

fn split_target(target: &str) -> TargetParts<'_> {
    let (session, rest) = match target.split_once(':') {
        Some((session, rest)) => (Some(session), rest),
        None => (None, target),
    };
    let (window, pane) = match rest.rsplit_once('.') {
        Some((window, pane)) => (Some(window), Some(pane)),
        None => (Some(rest), None),
    };
    TargetParts {
        session: session.filter(|s| !s.is_empty()),
        window: window.filter(|s| !s.is_empty()),
        pane: pane.filter(|s| !s.is_empty()),
    }
}

/// `$N` or a session name.
pub(crate) fn resolve_session(server: &Server, ctx: &Context, target: Option<&str>) -> Result<SessionId, CommandError> {
    let Some(target) = target else {
        return current_session(server, ctx);
    };
    let name = target.strip_suffix(':').unwrap_or(target);
    if let Some(session) = server.mux.session_by_name(name) {
        return Ok(session.id());
    }
    if name.starts_with('$') {
        if let Ok(id) = name.parse::<SessionId>() {
            if server.mux.session(id).is_some() {
                return Ok(id);
            }
        }
    }
    Err(CommandError::Target(format!("session: {target}")))
}

/// `@N`, `%N` (the pane's window), `[session:]index`, `[session:]name`.
pub(crate) fn resolve_window(server: &Server, ctx: &Context, target: Option<&str>) -> Result<WindowId, CommandError> {
    let Some(target) = target else {
        return current_window(server, ctx);
    };
    let not_found = || CommandError::Target(format!("window: {target}"));
    if target.starts_with('@') {
        let id: WindowId = target.parse().map_err(|_| not_found())?;
        return server.mux.window(id).map(|w| w.id()).ok_or_else(not_found);
    }
    if target.starts_with('%') {
        let pane: PaneId = target.parse().map_err(|_| not_found())?;
        return server.mux.window_of(pane).ok_or_else(not_found);
    }
    let parts = if target.contains(':') {
        split_target(target)
    } else {
        TargetParts {
            session: None,
            window: Some(target),
            pane: None,
        }
    };
    let session_id = resolve_session(server, ctx, parts.session)?;
    let session = server.mux.session(session_id).ok_or_else(not_found)?;
    let Some(window) = parts.window else {
        return Ok(session.active_window());
    };
    if let Ok(index) = window.parse::<u32>() {
        return session.window_at(index).ok_or_else(not_found);
    }
    session
        .window_ids()
        .into_iter()
        .find(|w| server.mux.window(*w).map(|w| w.name()) == Some(window))
        .ok_or_else(not_found)
}

/// `%N`, or `[session:][window].pane` where pane is an index in tree order
/// or `+`/`-` relative to the window's active pane.
pub(crate) fn resolve_pane(server: &Server, ctx: &Context, target: Option<&str>) -> Result<PaneId, CommandError> {
    let Some(target) = target else {
        return current_pane(server, ctx);
    };
    let not_found = || CommandError::Target(format!("pane: {target}"));
    if target.starts_with('%') {
        let id: PaneId = target.parse().map_err(|_| not_found())?;
        return server.mux.window_of(id).map(|_| id).ok_or_else(not_found);
    }
    let parts = split_target(target);
    let window = match (parts.session, parts.window) {
        (None, None) => current_window(server, ctx)?,
        (session, window) => {
            let session = resolve_session(server, ctx, session)?;
            let session = server.mux.session(session).ok_or_else(not_found)?;
            match window {
                None => session.active_window(),
                Some(w) => {
                    let scoped = format!("{}:{w}", session.name());
                    resolve_window(server, ctx, Some(&scoped))?
                }
            }
        }
    };
    let win = server.mux.window(window).ok_or_else(not_found)?;
    let Some(pane) = parts.pane else {
        return Ok(win.active_pane());
    };
    let panes = win.panes();
    let active = panes.iter().position(|p| *p == win.active_pane()).unwrap_or(0) as isize;
    let len = panes.len() as isize;
    let index = match pane {
        "+" => (active + 1).rem_euclid(len),
        "-" => (active - 1).rem_euclid(len),
        n => n.parse::<isize>().map_err(|_| not_found())?,
    };
    usize::try_from(index)
        .ok()
        .and_then(|i| panes.get(i).copied())
        .ok_or_else(not_found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::tests::Harness;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_split_target() {
        assert_eq!(
            split_target("work:2.1"),
            TargetParts {
                session: Some("work"),
                window: Some("2"),
                pane: Some("1"),
            }
        );
        assert_eq!(
            split_target(":.+"),
            TargetParts {
                session: None,
                window: None,
                pane: Some("+"),
            }
        );
        assert_eq!(
            split_target("work:"),
            TargetParts {
                session: Some("work"),
                window: None,
                pane: None,
            }
        );
    }

    #[test]
    fn test_resolve_targets() {
        let mut h = Harness::new();
        h.run("new-session -d -s work").unwrap();
        h.run("new-window -n logs").unwrap();
        h.run("split-window -h").unwrap();
        let ctx = Context::default();
        let s = &h.server;

        let work = resolve_session(s, &ctx, Some("work")).unwrap();
        assert_eq!(resolve_session(s, &ctx, Some(&work.to_string())).unwrap(), work);
        assert!(matches!(resolve_session(s, &ctx, Some("nope")), Err(CommandError::Target(_))));

        let logs = resolve_window(s, &ctx, Some("logs")).unwrap();
        assert_eq!(resolve_window(s, &ctx, Some("work:1")).unwrap(), logs);
        assert_eq!(resolve_window(s, &ctx, Some(&logs.to_string())).unwrap(), logs);
        let first = resolve_window(s, &ctx, Some(":0")).unwrap();
        assert_ne!(first, logs);

        let panes = s.mux.window(logs).unwrap().panes();
        let active = s.mux.window(logs).unwrap().active_pane();
        assert_eq!(active, panes[1]);
        assert_eq!(resolve_pane(s, &ctx, Some(":.+")).unwrap(), panes[0]);
        assert_eq!(resolve_pane(s, &ctx, Some(":.-")).unwrap(), panes[0]);
        assert_eq!(resolve_pane(s, &ctx, Some("work:logs.0")).unwrap(), panes[0]);
        assert_eq!(resolve_pane(s, &ctx, Some(&panes[0].to_string())).unwrap(), panes[0]);
        assert!(resolve_pane(s, &ctx, Some(":.9")).is_err());
        assert!(resolve_pane(s, &ctx, Some("%999")).is_err());
    }

    #[test]
    fn test_context_pane_wins() {
        let mut h = Harness::new();
        h.run("new-session -d").unwrap();
        h.run("new-window").unwrap();
        let first_session = h.server.mux.sessions().next().unwrap();
        let first_window = first_session.window_at(0).unwrap();
        let pane = h.server.mux.window(first_window).unwrap().active_pane();
        let ctx = Context {
            client: None,
            pane: Some(pane),
        };
        assert_eq!(current_window(&h.server, &ctx).unwrap(), first_window);
        assert_eq!(current_pane(&h.server, &ctx).unwrap(), pane);
    }
}
