use std::collections::BTreeMap;

use weft_mux::{PaneId, Size};

use crate::pane::Pane;
use crate::pty::{PaneCommand, SpawnError};

/// Owns every live pane, keyed by id.
///
/// Removing a pane drops it, which kills and reaps its process.
#[derive(Default)]
pub struct PaneArena {
    panes: BTreeMap<PaneId, Pane>,
}

impl PaneArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn(
        &mut self,
        id: PaneId,
        command: PaneCommand,
        size: Size,
        history_limit: usize,
    ) -> Result<&mut Pane, SpawnError> {
        let pane = Pane::spawn(id, command, size, history_limit)?;
        Ok(self.panes.entry(id).or_insert(pane))
    }

    pub fn get(&self, id: PaneId) -> Option<&Pane> {
        self.panes.get(&id)
    }

    pub fn get_mut(&mut self, id: PaneId) -> Option<&mut Pane> {
        self.panes.get_mut(&id)
    }

    pub fn remove(&mut self, id: PaneId) -> Option<Pane> {
        self.panes.remove(&id)
    }

    pub fn contains(&self, id: PaneId) -> bool {
        self.panes.contains_key(&id)
    }

    pub fn ids(&self) -> Vec<PaneId> {
        self.panes.keys().copied().collect()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&PaneId, &mut Pane)> {
        self.panes.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.panes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.panes.is_empty()
    }

    /// Kills every pane.
    pub fn clear(&mut self) {
        self.panes.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh() -> PaneCommand {
        PaneCommand::new(vec!["/bin/sh".to_string()])
    }

    #[test]
    fn test_spawn_and_list() {
        let mut arena = PaneArena::new();
        let a = PaneId::from_raw(1);
        let b = PaneId::from_raw(2);
        arena.spawn(a, sh(), Size::new(24, 80), 100).unwrap();
        arena.spawn(b, sh(), Size::new(24, 80), 100).unwrap();
        assert_eq!(arena.ids(), vec![a, b]);
        assert!(arena.get(a).is_some());
        assert!(arena.get(PaneId::from_raw(999)).is_none());
    }

    #[test]
    fn test_remove() {
        let mut arena = PaneArena::new();
        let id = PaneId::from_raw(1);
        arena.spawn(id, sh(), Size::new(24, 80), 100).unwrap();
        assert!(arena.remove(id).is_some());
        assert!(arena.is_empty());
        // removing twice is harmless
        assert!(arena.remove(id).is_none());
    }

    #[test]
    fn test_failed_spawn_leaves_arena_unchanged() {
        let mut arena = PaneArena::new();
        let command = PaneCommand::new(vec!["/nonexistent/weft-no-such-shell".to_string()]);
        assert!(arena.spawn(PaneId::from_raw(1), command, Size::new(24, 80), 100).is_err());
        assert!(arena.is_empty());
    }
}
