//! Server state owned by the arbiter task.
//!
//! Everything here runs on one task, so there are no locks: pane reader
//! threads and connection tasks only talk to it through [`Event`]s.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use log::{debug, info, warn};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use weft_mux::{ClientId, Mux, MuxError, PaneId, Size, Teardown, WindowId};
use weft_pty::{PaneArena, PaneCommand, SpawnError};

use crate::command::{parse_command, Command, CommandError};
use crate::commands::{self, Context};
use crate::io_thread::start_io_thread;
use crate::ipc::{ClientMessage, CursorPos, ProtocolError, ServerMessage};
use crate::options::{OptionEffect, Options};
use crate::paths::ENV_VAR;

pub type ConnId = u64;

/// Capacity of each connection's outbound queue. A client that falls this
/// far behind loses frames and gets a full redraw once it catches up.
pub const OUTBOUND_QUEUE: usize = 64;

/// Everything the arbiter reacts to, besides the listener and the clock.
#[derive(Debug)]
pub enum Event {
    PaneOutput { pane: PaneId, data: Vec<u8> },
    PaneEof { pane: PaneId },
    Message { conn: ConnId, message: ClientMessage },
    Disconnected { conn: ConnId, error: Option<ProtocolError> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnState {
    /// Connected, not attached. One-shot commands run in this state.
    Connecting,
    Attached(ClientId),
    Detached,
}

pub struct Connection {
    /// Dropped on detach, which lets the writer task finish.
    pub(crate) tx: Option<mpsc::Sender<ServerMessage>>,
    pub(crate) state: ConnState,
    /// Window and geometry epoch of the last full frame sent.
    pub(crate) seen: Option<(WindowId, u64)>,
    /// Set when a frame was dropped; the next tick sends a full frame.
    pub(crate) resync: bool,
    pub(crate) last_status: Option<String>,
    pub(crate) last_cursor: Option<CursorPos>,
}

impl Connection {
    fn new(tx: mpsc::Sender<ServerMessage>) -> Self {
        Self {
            tx: Some(tx),
            state: ConnState::Connecting,
            seen: None,
            resync: true,
            last_status: None,
            last_cursor: None,
        }
    }
}

pub struct Server {
    pub(crate) mux: Mux,
    pub(crate) panes: PaneArena,
    pub(crate) options: Options,
    pub(crate) conns: BTreeMap<ConnId, Connection>,
    socket_path: PathBuf,
    events: mpsc::Sender<Event>,
    /// Panes whose reader saw EOF but whose process is not reaped yet.
    exiting: BTreeSet<PaneId>,
    shutdown: bool,
    next_conn: ConnId,
    /// `source-file` commands currently running inside one another.
    pub(crate) source_depth: usize,
}

impl Server {
    pub fn new(socket_path: PathBuf, events: mpsc::Sender<Event>) -> Self {
        let options = Options::default();
        let mut mux = Mux::new(Size::default());
        mux.set_base_index(options.base_index);
        mux.set_status_rows(options.status_rows());
        Self {
            mux,
            panes: PaneArena::new(),
            options,
            conns: BTreeMap::new(),
            socket_path,
            events,
            exiting: BTreeSet::new(),
            shutdown: false,
            next_conn: 1,
            source_depth: 0,
        }
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown
    }

    pub fn request_shutdown(&mut self) {
        self.shutdown = true;
    }

    pub fn add_connection(&mut self, tx: mpsc::Sender<ServerMessage>) -> ConnId {
        let id = self.next_conn;
        self.next_conn += 1;
        self.conns.insert(id, Connection::new(tx));
        debug!("connection {id} opened");
        id
    }

    pub fn connection_state(&self, conn: ConnId) -> Option<ConnState> {
        self.conns.get(&conn).map(|c| c.state)
    }

    pub fn on_event(&mut self, event: Event) {
        match event {
            Event::PaneOutput { pane, data } => self.on_pane_output(pane, &data),
            Event::PaneEof { pane } => self.on_pane_eof(pane),
            Event::Message { conn, message } => self.on_message(conn, message),
            Event::Disconnected { conn, error } => self.on_disconnect(conn, error),
        }
    }

    fn on_pane_output(&mut self, pane: PaneId, data: &[u8]) {
        // late output of a killed pane
        if let Some(p) = self.panes.get_mut(pane) {
            p.feed(data);
        }
    }

    fn on_pane_eof(&mut self, pane: PaneId) {
        if self.panes.contains(pane) {
            debug!("pane {pane} reader closed");
            self.exiting.insert(pane);
            self.poll_exits();
        }
    }

    /// Reaps panes whose output has ended. Called on EOF and on every tick
    /// until each such pane's exit status is known.
    pub fn poll_exits(&mut self) {
        let pending: Vec<PaneId> = self.exiting.iter().copied().collect();
        for pane in pending {
            let Some(p) = self.panes.get_mut(pane) else {
                self.exiting.remove(&pane);
                continue;
            };
            if let Some(code) = p.poll_exit() {
                self.exiting.remove(&pane);
                self.on_pane_exited(pane, code);
            }
        }
    }

    fn on_pane_exited(&mut self, pane: PaneId, code: u32) {
        info!("pane {pane} exited with status {code}");
        if self.options.remain_on_exit {
            if let Some(p) = self.panes.get_mut(pane) {
                let notice = format!("\r\nPane is dead (status {code})\r\n");
                p.screen_mut().feed(notice.as_bytes());
            }
            return;
        }
        if let Err(e) = self.kill_pane(pane) {
            debug!("exited pane {pane} already gone: {e}");
        }
    }

    /// Removes a pane from its window, cascading to the window and session
    /// when it was the last one, and kills its process.
    pub fn kill_pane(&mut self, pane: PaneId) -> Result<(), MuxError> {
        let teardown = self.mux.remove_pane(pane)?;
        self.apply_teardown(teardown);
        Ok(())
    }

    pub(crate) fn apply_teardown(&mut self, teardown: Teardown) {
        for pane in &teardown.panes {
            self.exiting.remove(pane);
            // dropping the pane kills and reaps the child
            self.panes.remove(*pane);
        }
        for client in &teardown.orphaned {
            if let Some(conn) = self.conn_of(*client) {
                self.detach_conn(conn, "session closed");
            }
        }
        if !teardown.sessions.is_empty() {
            info!("sessions closed: {:?}", teardown.sessions);
        }
        if self.mux.is_empty() {
            info!("no sessions left");
            self.shutdown = true;
        }
        self.sync_geometry();
    }

    /// Resizes every visible pane to its rectangle. Panes hidden by a
    /// zoomed window keep their size.
    pub fn sync_geometry(&mut self) {
        let mut failed = Vec::new();
        for window in self.mux.windows() {
            for (pane, rect) in window.visible_panes() {
                let Some(p) = self.panes.get_mut(pane) else {
                    continue;
                };
                if let Err(e) = p.resize(rect.size()) {
                    warn!("pane {pane} resize failed: {e}");
                    failed.push(pane);
                }
            }
        }
        for pane in failed {
            if let Some(p) = self.panes.get_mut(pane) {
                p.force_exited();
                self.exiting.insert(pane);
            }
        }
    }

    pub(crate) fn conn_of(&self, client: ClientId) -> Option<ConnId> {
        self.conns
            .iter()
            .find_map(|(id, c)| (c.state == ConnState::Attached(client)).then_some(*id))
    }

    /// Queues a message without waiting. A full queue drops it and marks the
    /// connection for a full redraw.
    pub(crate) fn send(&mut self, conn: ConnId, message: ServerMessage) {
        let Some(c) = self.conns.get_mut(&conn) else {
            return;
        };
        let Some(tx) = &c.tx else {
            return;
        };
        match tx.try_send(message) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                if !c.resync {
                    debug!("connection {conn} is behind, dropping frames");
                }
                c.resync = true;
            }
            // the reader task reports the disconnect
            Err(TrySendError::Closed(_)) => {}
        }
    }

    /// Detaches the connection's client and tells it why. The connection
    /// stays `Detached`, ignoring further messages, until its reader ends;
    /// the writer closes once the message is flushed.
    pub(crate) fn detach_conn(&mut self, conn: ConnId, reason: &str) {
        let Some(state) = self.conns.get(&conn).map(|c| c.state) else {
            return;
        };
        if let ConnState::Attached(client) = state {
            if let Err(e) = self.mux.detach_client(client) {
                debug!("client {client} already gone: {e}");
            }
            info!("client {client} detached: {reason}");
        }
        self.send(
            conn,
            ServerMessage::Detached {
                reason: reason.to_string(),
            },
        );
        if let Some(c) = self.conns.get_mut(&conn) {
            c.state = ConnState::Detached;
            c.tx = None;
        }
        self.sync_geometry();
    }

    fn on_disconnect(&mut self, conn: ConnId, error: Option<ProtocolError>) {
        let Some(c) = self.conns.remove(&conn) else {
            return;
        };
        match &error {
            Some(e) => warn!("connection {conn} dropped: {e}"),
            None => debug!("connection {conn} closed"),
        }
        if let ConnState::Attached(client) = c.state {
            if self.mux.detach_client(client).is_ok() {
                info!("client {client} disconnected");
            }
            self.sync_geometry();
        }
    }

    pub fn on_message(&mut self, conn: ConnId, message: ClientMessage) {
        let Some(state) = self.connection_state(conn) else {
            return;
        };
        if state == ConnState::Detached {
            return;
        }
        match message {
            ClientMessage::Attach {
                session,
                rows,
                cols,
                detach_others,
            } => self.attach(conn, session.as_deref(), Size::new(rows, cols), detach_others),
            ClientMessage::Input { data } => {
                let ConnState::Attached(client) = state else {
                    return;
                };
                self.route_input(client, &data);
            }
            ClientMessage::Resize { rows, cols } => {
                let ConnState::Attached(client) = state else {
                    return;
                };
                if let Err(e) = self.mux.resize_client(client, Size::new(rows, cols)) {
                    warn!("resize from connection {conn}: {e}");
                }
                if let Some(c) = self.conns.get_mut(&conn) {
                    c.resync = true;
                }
                self.sync_geometry();
            }
            ClientMessage::Command { line, pane } => {
                let ctx = Context {
                    client: match state {
                        ConnState::Attached(client) => Some(client),
                        _ => None,
                    },
                    pane,
                };
                let (ok, output) = match self.run_line(&ctx, &line) {
                    Ok(output) => (true, output),
                    Err(e) => (false, e.to_string()),
                };
                self.send(conn, ServerMessage::CommandResult { ok, output });
            }
            ClientMessage::Detach => self.detach_conn(conn, "detached"),
        }
    }

    fn attach(&mut self, conn: ConnId, session: Option<&str>, viewport: Size, detach_others: bool) {
        if let Some(ConnState::Attached(client)) = self.connection_state(conn) {
            // a second attach on the same connection only resizes
            if let Err(e) = self.mux.resize_client(client, viewport) {
                warn!("re-attach of client {client}: {e}");
            }
            self.sync_geometry();
            return;
        }
        if let Err(e) = self.ensure_default_session() {
            self.detach_conn(conn, &format!("cannot create session: {e}"));
            return;
        }
        let target = match session {
            Some(name) => self
                .mux
                .session_by_name(name)
                .or_else(|| name.parse().ok().and_then(|id| self.mux.session(id)))
                .map(|s| s.id()),
            None => self.mux.sessions().next().map(|s| s.id()),
        };
        let Some(target) = target else {
            self.detach_conn(conn, &format!("can't find session {}", session.unwrap_or_default()));
            return;
        };
        if detach_others {
            let others: Vec<ConnId> = self
                .conns
                .iter()
                .filter(|(id, c)| **id != conn && matches!(c.state, ConnState::Attached(_)))
                .map(|(id, _)| *id)
                .collect();
            for other in others {
                self.detach_conn(other, "detached by another client");
            }
        }
        match self.mux.attach_client(target, viewport) {
            Ok(client) => {
                info!("client {client} attached to {target} at {viewport}");
                if let Some(c) = self.conns.get_mut(&conn) {
                    c.state = ConnState::Attached(client);
                    c.seen = None;
                    c.resync = true;
                }
            }
            Err(e) => self.detach_conn(conn, &e.to_string()),
        }
        self.sync_geometry();
    }

    fn route_input(&mut self, client: ClientId, data: &[u8]) {
        let Some(pane) = self
            .mux
            .client(client)
            .and_then(|c| self.mux.window(c.window))
            .map(|w| w.active_pane())
        else {
            return;
        };
        let Some(p) = self.panes.get_mut(pane) else {
            return;
        };
        if let Err(e) = p.write_input(data) {
            warn!("input to pane {pane} failed: {e}");
            p.force_exited();
            self.exiting.insert(pane);
        }
    }

    /// Parses and runs one command line.
    pub fn run_line(&mut self, ctx: &Context, line: &str) -> Result<String, CommandError> {
        match parse_command(line)? {
            Some(command) => self.run(ctx, command),
            None => Ok(String::new()),
        }
    }

    pub fn run(&mut self, ctx: &Context, command: Command) -> Result<String, CommandError> {
        debug!("running {command:?}");
        if command.needs_session() {
            self.ensure_default_session()?;
        }
        let result = commands::execute(self, ctx, command);
        self.sync_geometry();
        result
    }

    /// Creates a session when there is none.
    pub fn ensure_default_session(&mut self) -> Result<(), CommandError> {
        if self.mux.is_empty() {
            commands::session::new_session(self, &Context::default(), None, None, None, true, &[])?;
        }
        Ok(())
    }

    /// Applies side effects of an option change to the arrangement.
    pub(crate) fn apply_option(&mut self, effect: OptionEffect) {
        match effect {
            OptionEffect::StatusRows => {
                self.mux.set_status_rows(self.options.status_rows());
            }
            OptionEffect::BaseIndex => self.mux.set_base_index(self.options.base_index),
            OptionEffect::Redraw => {
                for c in self.conns.values_mut() {
                    c.last_status = None;
                }
            }
            OptionEffect::RenderRate | OptionEffect::None => {}
        }
    }

    /// Starts a process for `pane` and its reader thread. The pane is not
    /// placed in any window yet.
    pub(crate) fn spawn_pane(
        &mut self,
        pane: PaneId,
        size: Size,
        words: &[String],
        cwd: Option<PathBuf>,
        from: Option<PaneId>,
    ) -> Result<(), SpawnError> {
        let shell = self.options.default_shell.as_deref();
        let mut command = if words.is_empty() {
            PaneCommand::shell(shell)
        } else {
            let shell = PaneCommand::shell(shell).argv.remove(0);
            PaneCommand::new(vec![shell, "-c".to_string(), words.join(" ")])
        };
        command = command
            .with_env("TERM", self.options.default_terminal.clone())
            .with_env(ENV_VAR, format!("{},{pane}", self.socket_path.display()));
        if let Some(dir) = cwd.or_else(|| from.and_then(|p| self.pane_cwd(p))) {
            command = command.with_cwd(dir);
        }

        let history = self.options.history_limit;
        let p = self.panes.spawn(pane, command, size, history)?;
        let Some(reader) = p.take_reader() else {
            self.panes.remove(pane);
            return Err(SpawnError::Io("pty reader already taken".to_string()));
        };
        if let Err(e) = start_io_thread(pane, reader, self.events.clone()) {
            self.panes.remove(pane);
            return Err(SpawnError::Io(format!("failed to start reader thread: {e}")));
        }
        info!("spawned pane {pane} at {size}");
        Ok(())
    }

    /// Working directory of a pane's process, where the OS exposes it.
    fn pane_cwd(&self, pane: PaneId) -> Option<PathBuf> {
        let pid = self.panes.get(pane)?.process_id()?;
        std::fs::read_link(format!("/proc/{pid}/cwd")).ok()
    }

    /// Tells every connection the server is going away, then kills every
    /// pane and removes the socket file.
    pub fn teardown(&mut self, reason: &str) {
        let conns: Vec<ConnId> = self.conns.keys().copied().collect();
        for conn in conns {
            self.send(
                conn,
                ServerMessage::Detached {
                    reason: reason.to_string(),
                },
            );
        }
        self.conns.clear();
        self.exiting.clear();
        self.panes.clear();
        if let Err(e) = std::fs::remove_file(&self.socket_path) {
            debug!("removing {}: {e}", self.socket_path.display());
        }
        info!("server stopped: {reason}");
    }
}

pub(crate) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::time::{Duration, Instant};

    pub(crate) struct Harness {
        pub server: Server,
        pub events: mpsc::Receiver<Event>,
        _dir: tempfile::TempDir,
    }

    impl Harness {
        pub fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let (tx, events) = mpsc::channel(1024);
            let mut server = Server::new(dir.path().join("sock"), tx);
            server.options.default_shell = Some("/bin/sh".to_string());
            Self {
                server,
                events,
                _dir: dir,
            }
        }

        /// Opens a connection and attaches it.
        pub fn attach(&mut self, rows: u16, cols: u16) -> (ConnId, mpsc::Receiver<ServerMessage>) {
            let (tx, rx) = mpsc::channel(OUTBOUND_QUEUE);
            let conn = self.server.add_connection(tx);
            self.server.on_message(
                conn,
                ClientMessage::Attach {
                    session: None,
                    rows,
                    cols,
                    detach_others: false,
                },
            );
            (conn, rx)
        }

        pub fn client(&self, conn: ConnId) -> ClientId {
            match self.server.connection_state(conn) {
                Some(ConnState::Attached(client)) => client,
                other => panic!("connection {conn} not attached: {other:?}"),
            }
        }

        pub fn run(&mut self, line: &str) -> Result<String, CommandError> {
            self.server.run_line(&Context::default(), line)
        }

        /// Feeds reader events to the server until `done` holds or time runs
        /// out.
        pub fn pump_until(&mut self, mut done: impl FnMut(&Server) -> bool) -> bool {
            let deadline = Instant::now() + Duration::from_secs(5);
            while Instant::now() < deadline {
                while let Ok(event) = self.events.try_recv() {
                    self.server.on_event(event);
                }
                self.server.poll_exits();
                if done(&self.server) {
                    return true;
                }
                std::thread::sleep(Duration::from_millis(20));
            }
            false
        }
    }

    #[test]
    fn test_attach_creates_default_session() {
        let mut h = Harness::new();
        let (conn, _rx) = h.attach(24, 80);
        let client = h.client(conn);
        let window = h.server.mux.client(client).unwrap().window;
        assert_eq!(h.server.mux.window(window).unwrap().size(), Size::new(23, 80));
        assert_eq!(h.server.panes.len(), 1);
        h.server.mux.check_invariants().unwrap();
    }

    #[test]
    fn test_disconnect_leaves_other_client_alone() {
        let mut h = Harness::new();
        let (a, _rx_a) = h.attach(24, 80);
        let (b, _rx_b) = h.attach(30, 100);
        h.run("split-window -h").unwrap();
        let client_b = h.client(b);
        let window = h.server.mux.client(client_b).unwrap().window;
        let active = h.server.mux.window(window).unwrap().active_pane();

        // the reader task saw half a frame, then the socket closed
        h.server.on_event(Event::Disconnected {
            conn: a,
            error: Some(ProtocolError::Truncated),
        });

        assert_eq!(h.server.connection_state(a), None);
        assert_eq!(h.server.connection_state(b), Some(ConnState::Attached(client_b)));
        assert_eq!(h.server.mux.window(window).unwrap().active_pane(), active);
        // only the remaining client constrains the size now
        assert_eq!(h.server.mux.window(window).unwrap().size(), Size::new(29, 100));
        assert_eq!(h.server.mux.clients().len(), 1);
    }

    #[test]
    fn test_detach_sends_reason_and_keeps_panes() {
        let mut h = Harness::new();
        let (conn, mut rx) = h.attach(24, 80);
        h.server.on_message(conn, ClientMessage::Detach);
        assert_eq!(h.server.connection_state(conn), Some(ConnState::Detached));
        assert_eq!(
            rx.try_recv().unwrap(),
            ServerMessage::Detached {
                reason: "detached".to_string()
            }
        );
        assert!(h.server.mux.clients().is_empty());
        assert_eq!(h.server.panes.len(), 1);
    }

    #[test]
    fn test_attach_detach_others() {
        let mut h = Harness::new();
        let (first, _rx1) = h.attach(24, 80);
        let (tx, _rx2) = mpsc::channel(OUTBOUND_QUEUE);
        let second = h.server.add_connection(tx);
        h.server.on_message(
            second,
            ClientMessage::Attach {
                session: None,
                rows: 40,
                cols: 120,
                detach_others: true,
            },
        );
        assert_eq!(h.server.connection_state(first), Some(ConnState::Detached));
        assert!(matches!(h.server.connection_state(second), Some(ConnState::Attached(_))));
    }

    #[test]
    fn test_attach_unknown_session() {
        let mut h = Harness::new();
        let (tx, mut rx) = mpsc::channel(OUTBOUND_QUEUE);
        let conn = h.server.add_connection(tx);
        h.server.on_message(
            conn,
            ClientMessage::Attach {
                session: Some("nope".to_string()),
                rows: 24,
                cols: 80,
                detach_others: false,
            },
        );
        assert!(matches!(rx.try_recv(), Ok(ServerMessage::Detached { .. })));
        assert_eq!(h.server.connection_state(conn), Some(ConnState::Detached));
        // the writer sees the end of the queue after the reason
        assert!(matches!(rx.try_recv(), Err(mpsc::error::TryRecvError::Disconnected)));
    }

    #[test]
    fn test_one_shot_command_result() {
        let mut h = Harness::new();
        h.server.ensure_default_session().unwrap();
        let (tx, mut rx) = mpsc::channel(OUTBOUND_QUEUE);
        let conn = h.server.add_connection(tx);
        h.server.on_message(
            conn,
            ClientMessage::Command {
                line: "bogus-command".to_string(),
                pane: None,
            },
        );
        assert_eq!(
            rx.try_recv().unwrap(),
            ServerMessage::CommandResult {
                ok: false,
                output: "unknown command: bogus-command".to_string(),
            }
        );
        assert_eq!(h.server.connection_state(conn), Some(ConnState::Connecting));
    }

    #[test]
    fn test_exit_of_last_pane_shuts_down() {
        let mut h = Harness::new();
        h.run("new-session -d exit 0").unwrap();
        assert!(h.pump_until(|s| s.is_shutting_down()));
        assert!(h.server.mux.is_empty());
        assert!(h.server.panes.is_empty());
    }

    #[test]
    fn test_remain_on_exit_keeps_dead_pane() {
        let mut h = Harness::new();
        h.run("set-option remain-on-exit on").unwrap();
        h.run("new-session -d exit 3").unwrap();
        let pane = h.server.panes.ids()[0];
        assert!(h.pump_until(|s| s.panes.get(pane).map(|p| p.is_exited()).unwrap_or(false)));
        assert!(!h.server.is_shutting_down());
        assert!(h.pump_until(|s| {
            let text = s.panes.get(pane).unwrap().screen().snapshot();
            (0..text.rows).any(|r| text.row_text(r).contains("Pane is dead (status 3)"))
        }));
        h.run(&format!("kill-pane -t {pane}")).unwrap();
        assert!(h.server.is_shutting_down());
    }

    #[test]
    fn test_input_reaches_active_pane() {
        let mut h = Harness::new();
        let (conn, _rx) = h.attach(24, 80);
        h.server.on_message(
            conn,
            ClientMessage::Input {
                data: b"echo weft-$((6*7))\r".to_vec(),
            },
        );
        let pane = h.server.panes.ids()[0];
        assert!(h.pump_until(|s| {
            let snap = s.panes.get(pane).unwrap().screen().snapshot();
            (0..snap.rows).any(|r| snap.row_text(r).contains("weft-42"))
        }));
    }

    #[test]
    fn test_teardown_detaches_and_removes_socket() {
        let mut h = Harness::new();
        let (_conn, mut rx) = h.attach(24, 80);
        std::fs::write(h.server.socket_path(), b"").unwrap();
        h.server.teardown("server exited");
        assert_eq!(
            rx.try_recv().unwrap(),
            ServerMessage::Detached {
                reason: "server exited".to_string()
            }
        );
        assert!(h.server.panes.is_empty());
        assert!(!h.server.socket_path().exists());
    }
}
