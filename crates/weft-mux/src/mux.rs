//! The arrangement: every session, window and attached client, and the
//! structural operations that keep them consistent.
//!
//! Nothing here owns a process. Callers allocate a pane id, spawn whatever
//! backs it, then place it; when panes go away the returned [`Teardown`]
//! says which processes to release and which clients lost their view.

use std::collections::{BTreeMap, HashMap};

use log::debug;

use crate::clients::{Client, ClientRegistry};
use crate::error::MuxError;
use crate::geometry::{Orientation, Size};
use crate::ids::{ClientId, IdAllocator, PaneId, SessionId, WindowId};
use crate::layout::Removal;
use crate::session::Session;
use crate::window::Window;

/// Everything a removal cascaded into.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Teardown {
    pub panes: Vec<PaneId>,
    pub windows: Vec<WindowId>,
    pub sessions: Vec<SessionId>,
    /// Clients left with no session to show. They are already removed from
    /// the registry.
    pub orphaned: Vec<ClientId>,
}

impl Teardown {
    pub fn merge(&mut self, other: Teardown) {
        self.panes.extend(other.panes);
        self.windows.extend(other.windows);
        self.sessions.extend(other.sessions);
        self.orphaned.extend(other.orphaned);
    }
}

#[derive(Debug)]
pub struct Mux {
    ids: IdAllocator,
    sessions: BTreeMap<SessionId, Session>,
    windows: BTreeMap<WindowId, Window>,
    pane_windows: HashMap<PaneId, WindowId>,
    clients: ClientRegistry,
    base_index: u32,
    status_rows: u16,
    default_size: Size,
}

impl Mux {
    /// `default_size` is the terminal size assumed for windows nobody has
    /// watched yet, status line included.
    pub fn new(default_size: Size) -> Self {
        Self {
            ids: IdAllocator::default(),
            sessions: BTreeMap::new(),
            windows: BTreeMap::new(),
            pane_windows: HashMap::new(),
            clients: ClientRegistry::default(),
            base_index: 0,
            status_rows: 1,
            default_size,
        }
    }

    pub fn alloc_pane(&mut self) -> PaneId {
        self.ids.pane()
    }

    pub fn base_index(&self) -> u32 {
        self.base_index
    }

    pub fn set_base_index(&mut self, base: u32) {
        self.base_index = base;
    }

    pub fn status_rows(&self) -> u16 {
        self.status_rows
    }

    /// Changes the rows reserved for the status line and resizes every
    /// watched window. Returns the windows whose size changed.
    pub fn set_status_rows(&mut self, rows: u16) -> Vec<WindowId> {
        self.status_rows = rows;
        let ids: Vec<WindowId> = self.windows.keys().copied().collect();
        ids.into_iter().filter(|w| self.reconcile(*w)).collect()
    }

    /// Pane area of a window nobody watches yet.
    pub fn default_window_size(&self) -> Size {
        Size::new(
            self.default_size.rows.saturating_sub(self.status_rows).max(1),
            self.default_size.cols.max(1),
        )
    }

    pub fn session(&self, id: SessionId) -> Option<&Session> {
        self.sessions.get(&id)
    }

    pub fn session_mut(&mut self, id: SessionId) -> Option<&mut Session> {
        self.sessions.get_mut(&id)
    }

    pub fn sessions(&self) -> impl Iterator<Item = &Session> {
        self.sessions.values()
    }

    pub fn session_by_name(&self, name: &str) -> Option<&Session> {
        self.sessions.values().find(|s| s.name() == name)
    }

    pub fn window(&self, id: WindowId) -> Option<&Window> {
        self.windows.get(&id)
    }

    pub fn window_mut(&mut self, id: WindowId) -> Option<&mut Window> {
        self.windows.get_mut(&id)
    }

    pub fn windows(&self) -> impl Iterator<Item = &Window> {
        self.windows.values()
    }

    pub fn window_of(&self, pane: PaneId) -> Option<WindowId> {
        self.pane_windows.get(&pane).copied()
    }

    pub fn pane_ids(&self) -> Vec<PaneId> {
        self.windows.values().flat_map(|w| w.panes()).collect()
    }

    pub fn clients(&self) -> &ClientRegistry {
        &self.clients
    }

    pub fn client(&self, id: ClientId) -> Option<&Client> {
        self.clients.get(id)
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn window_ref(&self, id: WindowId) -> Result<&Window, MuxError> {
        self.windows.get(&id).ok_or(MuxError::WindowNotFound(id))
    }

    fn window_entry(&mut self, id: WindowId) -> Result<&mut Window, MuxError> {
        self.windows.get_mut(&id).ok_or(MuxError::WindowNotFound(id))
    }

    fn session_entry(&mut self, id: SessionId) -> Result<&mut Session, MuxError> {
        self.sessions.get_mut(&id).ok_or(MuxError::SessionNotFound(id))
    }

    /// Creates a session whose first window holds `pane`. An unnamed
    /// session is named after its number.
    pub fn create_session(
        &mut self,
        name: Option<&str>,
        window_name: &str,
        pane: PaneId,
    ) -> Result<(SessionId, WindowId), MuxError> {
        if let Some(name) = name {
            if self.session_by_name(name).is_some() {
                return Err(MuxError::SessionExists(name.to_string()));
            }
        }
        if self.pane_windows.contains_key(&pane) {
            return Err(MuxError::DuplicatePane(pane));
        }
        let id = self.ids.session();
        let name = match name {
            Some(name) => name.to_string(),
            None => {
                let mut n = id.raw();
                while self.session_by_name(&n.to_string()).is_some() {
                    n += 1;
                }
                n.to_string()
            }
        };
        let window = self.ids.window();
        let size = self.default_window_size();
        self.windows
            .insert(window, Window::new(window, id, window_name, pane, size));
        self.pane_windows.insert(pane, window);
        self.sessions
            .insert(id, Session::new(id, name, self.base_index, window));
        debug!("created session {id} with window {window} and pane {pane}");
        Ok((id, window))
    }

    /// Adds a window holding `pane` to `session`, at `index` or the first free
    /// one. When `select` is set, the new window becomes the session's active
    /// window. Attached clients stay where they are; see [`Mux::switch_window`].
    pub fn create_window(
        &mut self,
        session: SessionId,
        name: &str,
        pane: PaneId,
        index: Option<u32>,
        select: bool,
    ) -> Result<WindowId, MuxError> {
        if self.pane_windows.contains_key(&pane) {
            return Err(MuxError::DuplicatePane(pane));
        }
        let base = self.base_index;
        let sess = self.sessions.get(&session).ok_or(MuxError::SessionNotFound(session))?;
        let index = match index {
            Some(index) if sess.window_at(index).is_some() => return Err(MuxError::IndexInUse(index)),
            Some(index) => index,
            None => sess.free_index(base),
        };
        let size = self
            .windows
            .get(&sess.active_window())
            .map(|w| w.size())
            .unwrap_or_else(|| self.default_window_size());

        let window = self.ids.window();
        self.windows
            .insert(window, Window::new(window, session, name, pane, size));
        self.pane_windows.insert(pane, window);
        let sess = self.session_entry(session)?;
        sess.insert(index, window)?;
        if select {
            sess.select_window(window)?;
        }
        debug!("created window {window} at index {index} in session {session}");
        Ok(window)
    }

    /// Splits `target` and places `new_pane` beside it.
    pub fn split_pane(
        &mut self,
        target: PaneId,
        orientation: Orientation,
        ratio: f64,
        new_pane: PaneId,
    ) -> Result<WindowId, MuxError> {
        if self.pane_windows.contains_key(&new_pane) {
            return Err(MuxError::DuplicatePane(new_pane));
        }
        let window = self.window_of(target).ok_or(MuxError::PaneNotFound(target))?;
        self.window_entry(window)?
            .split(target, orientation, ratio, new_pane)?;
        self.pane_windows.insert(new_pane, window);
        Ok(window)
    }

    /// Removes a pane. Removing the last pane of a window destroys the
    /// window, and the last window of a session destroys the session.
    pub fn remove_pane(&mut self, pane: PaneId) -> Result<Teardown, MuxError> {
        let window = self.window_of(pane).ok_or(MuxError::PaneNotFound(pane))?;
        match self.window_entry(window)?.remove_pane(pane)? {
            Removal::Removed => {
                self.pane_windows.remove(&pane);
                Ok(Teardown {
                    panes: vec![pane],
                    ..Teardown::default()
                })
            }
            Removal::Emptied => self.kill_window(window),
        }
    }

    /// Destroys a window. Clients watching it move to the window at the
    /// previous index of the same session, or else the next one.
    pub fn kill_window(&mut self, window: WindowId) -> Result<Teardown, MuxError> {
        let session = self.window_ref(window)?.session();
        let neighbor = self
            .sessions
            .get(&session)
            .ok_or(MuxError::SessionNotFound(session))?
            .neighbor(window);
        let removed = self.windows.remove(&window).ok_or(MuxError::WindowNotFound(window))?;
        let mut teardown = Teardown {
            panes: removed.panes(),
            windows: vec![window],
            ..Teardown::default()
        };
        for pane in &teardown.panes {
            self.pane_windows.remove(pane);
        }
        let emptied = self.session_entry(session)?.remove(window)?;
        for id in self.clients.ids() {
            if let Some(client) = self.clients.get_mut(id) {
                if client.last_window == Some(window) {
                    client.last_window = None;
                }
            }
        }
        if emptied {
            self.sessions.remove(&session);
            teardown.sessions.push(session);
            teardown.orphaned = self.rehome_clients(session);
        } else if let Some(next) = neighbor {
            for id in self.clients.watchers(window) {
                if let Some(client) = self.clients.get_mut(id) {
                    client.window = next;
                    if client.last_window == Some(next) {
                        client.last_window = None;
                    }
                }
            }
            self.reconcile(next);
        }
        debug!("killed window {window}: {teardown:?}");
        Ok(teardown)
    }

    pub fn kill_session(&mut self, session: SessionId) -> Result<Teardown, MuxError> {
        let windows = self
            .sessions
            .get(&session)
            .ok_or(MuxError::SessionNotFound(session))?
            .window_ids();
        let mut teardown = Teardown::default();
        for window in windows {
            teardown.merge(self.kill_window(window)?);
        }
        Ok(teardown)
    }

    /// Moves `pane` out of its window into a new window of the same session.
    pub fn break_pane(&mut self, pane: PaneId, select: bool) -> Result<WindowId, MuxError> {
        let window = self.window_of(pane).ok_or(MuxError::PaneNotFound(pane))?;
        let win = self.window_ref(window)?;
        if win.pane_count() < 2 {
            return Err(MuxError::SinglePane);
        }
        let session = win.session();
        self.window_entry(window)?.remove_pane(pane)?;
        self.pane_windows.remove(&pane);
        self.create_window(session, "", pane, None, select)
    }

    /// Makes `window` the active window of `session`: the one new clients
    /// and session-level commands start from. Attached clients are not moved.
    pub fn select_window(&mut self, session: SessionId, window: WindowId) -> Result<(), MuxError> {
        self.session_entry(session)?.select_window(window)?;
        Ok(())
    }

    /// Points one client at `window`, which also becomes its session's
    /// active window. Other clients keep watching what they were.
    pub fn switch_window(&mut self, id: ClientId, window: WindowId) -> Result<(), MuxError> {
        let session = self.window_ref(window)?.session();
        self.session_entry(session)?.select_window(window)?;
        let client = self.clients.get_mut(id).ok_or(MuxError::ClientNotFound(id))?;
        let old = client.window;
        if old == window {
            return Ok(());
        }
        client.last_window = (client.session == session).then_some(old);
        client.session = session;
        client.window = window;
        self.reconcile(old);
        self.reconcile(window);
        debug!("client {id} switched to window {window}");
        Ok(())
    }

    /// Moves the clients of a destroyed session to another session, and
    /// drops the ones that have nowhere to go.
    fn rehome_clients(&mut self, from: SessionId) -> Vec<ClientId> {
        let target = self.sessions.values().next().map(|s| (s.id(), s.active_window()));
        let mut orphaned = Vec::new();
        for id in self.clients.on_session(from) {
            match target {
                Some((session, window)) => {
                    if let Some(client) = self.clients.get_mut(id) {
                        client.session = session;
                        client.window = window;
                        client.last_window = None;
                    }
                }
                None => {
                    let _ = self.clients.remove(id);
                    orphaned.push(id);
                }
            }
        }
        if let Some((_, window)) = target {
            self.reconcile(window);
        }
        orphaned
    }

    /// Registers a client watching the active window of `session`.
    pub fn attach_client(&mut self, session: SessionId, viewport: Size) -> Result<ClientId, MuxError> {
        let window = self
            .sessions
            .get(&session)
            .ok_or(MuxError::SessionNotFound(session))?
            .active_window();
        let id = self.ids.client();
        self.clients.insert(Client::new(id, session, window, viewport));
        self.reconcile(window);
        debug!("client {id} attached to session {session} at {viewport}");
        Ok(id)
    }

    pub fn detach_client(&mut self, id: ClientId) -> Result<Client, MuxError> {
        let client = self.clients.remove(id)?;
        self.reconcile(client.window);
        debug!("client {id} detached");
        Ok(client)
    }

    pub fn resize_client(&mut self, id: ClientId, viewport: Size) -> Result<WindowId, MuxError> {
        let client = self.clients.get_mut(id).ok_or(MuxError::ClientNotFound(id))?;
        client.viewport = viewport;
        let window = client.window;
        self.reconcile(window);
        Ok(window)
    }

    /// Moves a client to another session's active window.
    pub fn switch_client(&mut self, id: ClientId, session: SessionId) -> Result<WindowId, MuxError> {
        let window = self
            .sessions
            .get(&session)
            .ok_or(MuxError::SessionNotFound(session))?
            .active_window();
        let client = self.clients.get_mut(id).ok_or(MuxError::ClientNotFound(id))?;
        let old = client.window;
        client.session = session;
        client.window = window;
        client.last_window = None;
        self.reconcile(old);
        self.reconcile(window);
        Ok(window)
    }

    /// Applies the sizing rule to one window. Returns true when its size
    /// changed.
    pub fn reconcile(&mut self, window: WindowId) -> bool {
        let Some(size) = self.clients.effective_size(window, self.status_rows) else {
            return false;
        };
        match self.windows.get_mut(&window) {
            Some(win) => win.resize(size),
            None => false,
        }
    }

    /// Cross-checks every index. Used by tests and debug assertions.
    pub fn check_invariants(&self) -> Result<(), String> {
        let mut seen = HashMap::new();
        for window in self.windows.values() {
            let session = self
                .sessions
                .get(&window.session())
                .ok_or_else(|| format!("{} belongs to missing {}", window.id(), window.session()))?;
            if !session.contains(window.id()) {
                return Err(format!("{} missing from {}", window.id(), session.id()));
            }
            if !window.contains(window.active_pane()) {
                return Err(format!("{} active pane is not in its layout", window.id()));
            }
            for pane in window.panes() {
                if seen.insert(pane, window.id()).is_some() {
                    return Err(format!("{pane} placed twice"));
                }
                if self.pane_windows.get(&pane) != Some(&window.id()) {
                    return Err(format!("{pane} index disagrees with {}", window.id()));
                }
            }
        }
        if seen.len() != self.pane_windows.len() {
            return Err("pane index has stale entries".to_string());
        }
        for session in self.sessions.values() {
            if session.is_empty() {
                return Err(format!("{} has no windows", session.id()));
            }
            for (_, window) in session.windows() {
                if !self.windows.contains_key(&window) {
                    return Err(format!("{} lists missing {window}", session.id()));
                }
            }
            if !session.contains(session.active_window()) {
                return Err(format!("{} active window is not in it", session.id()));
            }
        }
        for client in self.clients.iter() {
            if !self.windows.contains_key(&client.window) {
                return Err(format!("{} watches missing {}", client.id, client.window));
            }
        }
        Ok(())
    }
}
