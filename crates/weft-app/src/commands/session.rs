use std::path::PathBuf;

use log::info;

use weft_mux::MuxError;

use super::{default_window_name, resolve_session, Context};
use crate::command::CommandError;
use crate::state::{unix_now, Server};

/// Creates a session with one window running `command`, or the default
/// shell. Unless `detached`, the issuing client switches to it.
pub fn new_session(
    server: &mut Server,
    ctx: &Context,
    name: Option<&str>,
    window_name: Option<&str>,
    cwd: Option<PathBuf>,
    detached: bool,
    command: &[String],
) -> Result<String, CommandError> {
    if let Some(name) = name {
        if server.mux.session_by_name(name).is_some() {
            return Err(MuxError::SessionExists(name.to_string()).into());
        }
    }
    let pane = server.mux.alloc_pane();
    let size = server.mux.default_window_size();
    server.spawn_pane(pane, size, command, cwd, ctx.pane)?;

    let window_name = match window_name {
        Some(n) => n.to_string(),
        None => default_window_name(server, pane, command),
    };
    let (session, window) = match server.mux.create_session(name, &window_name, pane) {
        Ok(created) => created,
        Err(e) => {
            server.panes.remove(pane);
            return Err(e.into());
        }
    };
    if let Some(s) = server.mux.session_mut(session) {
        s.set_created(unix_now());
    }
    info!("new session {session} with window {window}");

    if !detached {
        if let Some(client) = ctx.client {
            server.mux.switch_client(client, session)?;
        }
    }
    Ok(String::new())
}

pub fn kill_session(server: &mut Server, ctx: &Context, target: Option<&str>) -> Result<String, CommandError> {
    let session = resolve_session(server, ctx, target)?;
    let teardown = server.mux.kill_session(session)?;
    info!("killed session {session}");
    server.apply_teardown(teardown);
    Ok(String::new())
}

pub fn rename_session(
    server: &mut Server,
    ctx: &Context,
    target: Option<&str>,
    name: &str,
) -> Result<String, CommandError> {
    let session = resolve_session(server, ctx, target)?;
    if name.is_empty() || name.contains(':') {
        return Err(CommandError::Failed(format!("bad session name: {name}")));
    }
    if let Some(existing) = server.mux.session_by_name(name) {
        if existing.id() != session {
            return Err(MuxError::SessionExists(name.to_string()).into());
        }
    }
    server
        .mux
        .session_mut(session)
        .ok_or(MuxError::SessionNotFound(session))?
        .rename(name);
    Ok(String::new())
}

/// Succeeds, silently, when the session exists.
pub fn has_session(server: &mut Server, ctx: &Context, target: Option<&str>) -> Result<String, CommandError> {
    resolve_session(server, ctx, target)?;
    Ok(String::new())
}

#[cfg(test)]
mod tests {
    use crate::command::CommandError;
    use crate::state::tests::Harness;
    use pretty_assertions::assert_eq;
    use weft_mux::MuxError;

    #[test]
    fn test_new_session_names() {
        let mut h = Harness::new();
        h.run("new-session -d -s work").unwrap();
        h.run("new -d").unwrap();
        let names: Vec<String> = h.server.mux.sessions().map(|s| s.name().to_string()).collect();
        assert_eq!(names.len(), 2);
        assert!(names.contains(&"work".to_string()));

        let err = h.run("new-session -d -s work").unwrap_err();
        assert!(matches!(err, CommandError::Mux(MuxError::SessionExists(_))));
        // the refused session spawned nothing
        assert_eq!(h.server.panes.len(), 2);
        h.server.mux.check_invariants().unwrap();
    }

    #[test]
    fn test_window_named_after_command() {
        let mut h = Harness::new();
        h.run("new-session -d -s a /bin/cat -u").unwrap();
        let session = h.server.mux.session_by_name("a").unwrap();
        let window = h.server.mux.window(session.active_window()).unwrap();
        assert_eq!(window.name(), "cat");
        assert!(session.created() > 0);
    }

    #[test]
    fn test_rename_and_has_session() {
        let mut h = Harness::new();
        h.run("new-session -d -s a").unwrap();
        h.run("new-session -d -s b").unwrap();
        assert!(h.run("has-session -t a").is_ok());
        assert!(matches!(h.run("has -t zzz"), Err(CommandError::Target(_))));

        h.run("rename-session -t a alpha").unwrap();
        assert!(h.server.mux.session_by_name("alpha").is_some());
        assert!(h.run("rename -t alpha b").is_err());
        assert!(h.server.mux.session_by_name("alpha").is_some());
    }

    #[test]
    fn test_kill_session() {
        let mut h = Harness::new();
        h.run("new-session -d -s a").unwrap();
        h.run("new-session -d -s b").unwrap();
        h.run("new-window -t b:").unwrap();
        h.run("kill-session -t b").unwrap();
        assert!(h.server.mux.session_by_name("b").is_none());
        assert_eq!(h.server.panes.len(), 1);
        assert!(!h.server.is_shutting_down());

        h.run("kill-session -t a").unwrap();
        assert!(h.server.is_shutting_down());
        assert!(h.server.panes.is_empty());
    }
}
