use std::collections::BTreeMap;

use crate::error::MuxError;
use crate::ids::{SessionId, WindowId};

/// A named, ordered group of windows. Windows are keyed by their index,
/// the number shown in the status line, so iteration is in display order.
#[derive(Debug, Clone)]
pub struct Session {
    id: SessionId,
    name: String,
    windows: BTreeMap<u32, WindowId>,
    active: WindowId,
    last: Option<WindowId>,
    created: u64,
}

impl Session {
    pub fn new(id: SessionId, name: impl Into<String>, index: u32, window: WindowId) -> Self {
        Self {
            id,
            name: name.into(),
            windows: BTreeMap::from([(index, window)]),
            active: window,
            last: None,
            created: 0,
        }
    }

    /// Creation time in seconds since the epoch, as recorded by the server.
    pub fn created(&self) -> u64 {
        self.created
    }

    pub fn set_created(&mut self, secs: u64) {
        self.created = secs;
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// `(index, window)` pairs in index order.
    pub fn windows(&self) -> impl Iterator<Item = (u32, WindowId)> + '_ {
        self.windows.iter().map(|(i, w)| (*i, *w))
    }

    pub fn window_ids(&self) -> Vec<WindowId> {
        self.windows.values().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    pub fn contains(&self, window: WindowId) -> bool {
        self.index_of(window).is_some()
    }

    pub fn index_of(&self, window: WindowId) -> Option<u32> {
        self.windows
            .iter()
            .find_map(|(i, w)| (*w == window).then_some(*i))
    }

    pub fn window_at(&self, index: u32) -> Option<WindowId> {
        self.windows.get(&index).copied()
    }

    pub fn active_window(&self) -> WindowId {
        self.active
    }

    pub fn last_window(&self) -> Option<WindowId> {
        self.last
    }

    pub fn select_window(&mut self, window: WindowId) -> Result<(), MuxError> {
        if !self.contains(window) {
            return Err(MuxError::WindowNotFound(window));
        }
        if window != self.active {
            self.last = Some(self.active);
            self.active = window;
        }
        Ok(())
    }

    pub fn select_last(&mut self) -> Result<WindowId, MuxError> {
        let last = self.last.ok_or(MuxError::NoPrevious("window"))?;
        self.select_window(last)?;
        Ok(last)
    }

    /// The window `step` places after `from` in index order, wrapping
    /// around. An unknown `from` counts as the first window.
    pub fn cycle_from(&self, from: WindowId, step: isize) -> WindowId {
        let ids = self.window_ids();
        let len = ids.len() as isize;
        let idx = ids.iter().position(|w| *w == from).unwrap_or(0) as isize;
        ids[(idx + step).rem_euclid(len) as usize]
    }

    /// The window that takes over when `window` goes away: the one at the
    /// previous index, or else the next.
    pub fn neighbor(&self, window: WindowId) -> Option<WindowId> {
        let index = self.index_of(window)?;
        self.windows
            .range(..index)
            .next_back()
            .or_else(|| self.windows.range(index + 1..).next())
            .map(|(_, w)| *w)
    }

    /// The lowest unused index at or above `base`.
    pub fn free_index(&self, base: u32) -> u32 {
        (base..).find(|i| !self.windows.contains_key(i)).unwrap_or(base)
    }

    pub fn insert(&mut self, index: u32, window: WindowId) -> Result<(), MuxError> {
        if self.windows.contains_key(&index) {
            return Err(MuxError::IndexInUse(index));
        }
        self.windows.insert(index, window);
        Ok(())
    }

    /// Removes `window`. If it was active, the window at the previous
    /// index takes over, or else the next one. Returns true when the
    /// session has no windows left.
    pub fn remove(&mut self, window: WindowId) -> Result<bool, MuxError> {
        let index = self.index_of(window).ok_or(MuxError::WindowNotFound(window))?;
        let neighbor = self.neighbor(window);
        self.windows.remove(&index);
        if self.last == Some(window) {
            self.last = None;
        }
        if self.active == window {
            match neighbor {
                Some(next) => self.active = next,
                None => return Ok(true),
            }
            if self.last == Some(self.active) {
                self.last = None;
            }
        }
        Ok(self.windows.is_empty())
    }

    pub fn move_window(&mut self, window: WindowId, index: u32) -> Result<(), MuxError> {
        let current = self.index_of(window).ok_or(MuxError::WindowNotFound(window))?;
        if current == index {
            return Ok(());
        }
        if self.windows.contains_key(&index) {
            return Err(MuxError::IndexInUse(index));
        }
        self.windows.remove(&current);
        self.windows.insert(index, window);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn w(n: u64) -> WindowId {
        WindowId::from_raw(n)
    }

    fn session() -> Session {
        let mut s = Session::new(SessionId::from_raw(0), "0", 0, w(1));
        s.insert(1, w(2)).unwrap();
        s.insert(2, w(3)).unwrap();
        s
    }

    #[test]
    fn test_index_order_and_free_index() {
        let mut s = session();
        assert_eq!(s.window_ids(), vec![w(1), w(2), w(3)]);
        s.remove(w(2)).unwrap();
        assert_eq!(s.free_index(0), 1);
        assert_eq!(s.free_index(5), 5);
        assert_eq!(s.insert(2, w(9)), Err(MuxError::IndexInUse(2)));
    }

    #[test]
    fn test_cycle_wraps() {
        let s = session();
        assert_eq!(s.cycle_from(w(1), 1), w(2));
        assert_eq!(s.cycle_from(w(1), -1), w(3));
        assert_eq!(s.cycle_from(w(3), 1), w(1));
    }

    #[test]
    fn test_remove_active_selects_previous_index() {
        let mut s = session();
        s.select_window(w(2)).unwrap();
        s.select_window(w(1)).unwrap();
        s.select_window(w(3)).unwrap();
        // the last window was w(1), but the previous index wins
        assert_eq!(s.remove(w(3)), Ok(false));
        assert_eq!(s.active_window(), w(2));
        // no lower index left, so the next one takes over
        s.select_window(w(1)).unwrap();
        assert_eq!(s.remove(w(1)), Ok(false));
        assert_eq!(s.active_window(), w(2));
        assert_eq!(s.last_window(), None);
        assert_eq!(s.remove(w(2)), Ok(true));
    }

    #[test]
    fn test_neighbor_and_cycle_from() {
        let s = session();
        assert_eq!(s.neighbor(w(2)), Some(w(1)));
        assert_eq!(s.neighbor(w(1)), Some(w(2)));
        assert_eq!(s.neighbor(w(9)), None);
        assert_eq!(s.cycle_from(w(3), 1), w(1));
        assert_eq!(s.cycle_from(w(2), -1), w(1));
    }

    #[test]
    fn test_select_last() {
        let mut s = session();
        s.select_window(w(2)).unwrap();
        assert_eq!(s.select_last(), Ok(w(1)));
        assert_eq!(s.select_last(), Ok(w(2)));
    }

    #[test]
    fn test_move_window() {
        let mut s = session();
        s.move_window(w(1), 7).unwrap();
        assert_eq!(s.index_of(w(1)), Some(7));
        assert_eq!(s.window_ids(), vec![w(2), w(3), w(1)]);
        assert_eq!(s.move_window(w(2), 2), Err(MuxError::IndexInUse(2)));
    }
}
