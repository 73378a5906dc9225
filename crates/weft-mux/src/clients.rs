//! Attached clients and the window sizing rule.
//!
//! A window watched by several clients is drawn at the smallest size any of
//! them can show: the minimum of their viewport rows and the minimum of their
//! viewport columns, taken separately, less the status line. The result only
//! depends on who is watching right now, never on the order they arrived in.

use std::collections::BTreeMap;

use crate::error::MuxError;
use crate::geometry::Size;
use crate::ids::{ClientId, SessionId, WindowId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Client {
    pub id: ClientId,
    pub session: SessionId,
    pub window: WindowId,
    /// The window this client watched before its current one, within the
    /// same session.
    pub last_window: Option<WindowId>,
    /// The client's terminal size, status line included.
    pub viewport: Size,
    /// True when this client is the only one watching its window, so the
    /// window is sized to it exactly.
    pub exclusive_fullsize: bool,
}

impl Client {
    pub fn new(id: ClientId, session: SessionId, window: WindowId, viewport: Size) -> Self {
        Self {
            id,
            session,
            window,
            last_window: None,
            viewport,
            exclusive_fullsize: false,
        }
    }
}

#[derive(Debug, Default)]
pub struct ClientRegistry {
    clients: BTreeMap<ClientId, Client>,
}

impl ClientRegistry {
    pub fn insert(&mut self, client: Client) {
        self.clients.insert(client.id, client);
    }

    pub fn remove(&mut self, id: ClientId) -> Result<Client, MuxError> {
        self.clients.remove(&id).ok_or(MuxError::ClientNotFound(id))
    }

    pub fn get(&self, id: ClientId) -> Option<&Client> {
        self.clients.get(&id)
    }

    pub fn get_mut(&mut self, id: ClientId) -> Option<&mut Client> {
        self.clients.get_mut(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Client> {
        self.clients.values()
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    pub fn ids(&self) -> Vec<ClientId> {
        self.clients.keys().copied().collect()
    }

    pub fn watchers(&self, window: WindowId) -> Vec<ClientId> {
        self.clients
            .values()
            .filter(|c| c.window == window)
            .map(|c| c.id)
            .collect()
    }

    pub fn on_session(&self, session: SessionId) -> Vec<ClientId> {
        self.clients
            .values()
            .filter(|c| c.session == session)
            .map(|c| c.id)
            .collect()
    }

    /// Recomputes the size of `window` from its current watchers and
    /// refreshes their `exclusive_fullsize` flags. Returns `None` when
    /// nobody watches it; the window then keeps whatever size it had.
    pub fn effective_size(&mut self, window: WindowId, status_rows: u16) -> Option<Size> {
        let watchers: Vec<&mut Client> = self
            .clients
            .values_mut()
            .filter(|c| c.window == window)
            .collect();
        let exclusive = watchers.len() == 1;
        let mut size: Option<Size> = None;
        for client in watchers {
            client.exclusive_fullsize = exclusive;
            let rows = client.viewport.rows.saturating_sub(status_rows).max(1);
            let cols = client.viewport.cols.max(1);
            size = Some(match size {
                Some(s) => Size::new(s.rows.min(rows), s.cols.min(cols)),
                None => Size::new(rows, cols),
            });
        }
        size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const WIN: WindowId = WindowId::from_raw(1);
    const OTHER: WindowId = WindowId::from_raw(2);
    const SESSION: SessionId = SessionId::from_raw(0);

    fn client(n: u64, window: WindowId, rows: u16, cols: u16) -> Client {
        Client::new(ClientId::from_raw(n), SESSION, window, Size::new(rows, cols))
    }

    #[test]
    fn test_single_watcher_is_exclusive() {
        let mut reg = ClientRegistry::default();
        reg.insert(client(1, WIN, 24, 80));
        assert_eq!(reg.effective_size(WIN, 1), Some(Size::new(23, 80)));
        assert!(reg.get(ClientId::from_raw(1)).unwrap().exclusive_fullsize);
    }

    #[test]
    fn test_smallest_intersection() {
        let mut reg = ClientRegistry::default();
        reg.insert(client(1, WIN, 24, 80));
        reg.insert(client(2, WIN, 30, 100));
        assert_eq!(reg.effective_size(WIN, 1), Some(Size::new(23, 80)));
        assert!(reg.iter().all(|c| !c.exclusive_fullsize));

        // per-dimension minimum, not the smaller viewport
        reg.insert(client(3, WIN, 40, 60));
        assert_eq!(reg.effective_size(WIN, 1), Some(Size::new(23, 60)));

        reg.remove(ClientId::from_raw(3)).unwrap();
        assert_eq!(reg.effective_size(WIN, 1), Some(Size::new(23, 80)));
        reg.remove(ClientId::from_raw(1)).unwrap();
        assert_eq!(reg.effective_size(WIN, 1), Some(Size::new(29, 100)));
        assert!(reg.get(ClientId::from_raw(2)).unwrap().exclusive_fullsize);
    }

    #[test]
    fn test_order_independent() {
        let viewports = [(24, 80), (30, 100), (40, 60)];
        let mut forward = ClientRegistry::default();
        let mut backward = ClientRegistry::default();
        for (i, (r, c)) in viewports.iter().enumerate() {
            forward.insert(client(i as u64, WIN, *r, *c));
        }
        for (i, (r, c)) in viewports.iter().enumerate().rev() {
            backward.insert(client(i as u64, WIN, *r, *c));
        }
        assert_eq!(forward.effective_size(WIN, 0), backward.effective_size(WIN, 0));
    }

    #[test]
    fn test_unwatched_window_has_no_size() {
        let mut reg = ClientRegistry::default();
        reg.insert(client(1, OTHER, 24, 80));
        assert_eq!(reg.effective_size(WIN, 1), None);
        assert_eq!(reg.watchers(OTHER), vec![ClientId::from_raw(1)]);
    }

    #[test]
    fn test_tiny_viewport_keeps_one_row() {
        let mut reg = ClientRegistry::default();
        reg.insert(client(1, WIN, 1, 0));
        assert_eq!(reg.effective_size(WIN, 1), Some(Size::new(1, 1)));
    }
}
