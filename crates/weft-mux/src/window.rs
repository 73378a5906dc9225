use crate::error::MuxError;
use crate::geometry::{Direction, Orientation, Rect, Size};
use crate::ids::{PaneId, SessionId, WindowId};
use crate::layout::{LayoutKind, LayoutNode, Removal};

/// One full-screen arrangement of panes.
///
/// `size` is the area available to panes, which excludes the status line.
/// Every change to the geometry bumps `epoch`, which is what tells the
/// renderer that watchers need a full frame.
#[derive(Debug, Clone)]
pub struct Window {
    id: WindowId,
    session: SessionId,
    name: String,
    layout: LayoutNode,
    active: PaneId,
    last_active: Option<PaneId>,
    zoomed: bool,
    preset: Option<LayoutKind>,
    size: Size,
    epoch: u64,
}

impl Window {
    pub fn new(id: WindowId, session: SessionId, name: impl Into<String>, pane: PaneId, size: Size) -> Self {
        Self {
            id,
            session,
            name: name.into(),
            layout: LayoutNode::leaf(pane),
            active: pane,
            last_active: None,
            zoomed: false,
            preset: None,
            size,
            epoch: 0,
        }
    }

    pub fn id(&self) -> WindowId {
        self.id
    }

    pub fn session(&self) -> SessionId {
        self.session
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn layout(&self) -> &LayoutNode {
        &self.layout
    }

    pub fn panes(&self) -> Vec<PaneId> {
        self.layout.panes()
    }

    pub fn pane_count(&self) -> usize {
        self.layout.pane_count()
    }

    pub fn contains(&self, pane: PaneId) -> bool {
        self.layout.contains(pane)
    }

    pub fn active_pane(&self) -> PaneId {
        self.active
    }

    pub fn last_pane(&self) -> Option<PaneId> {
        self.last_active
    }

    pub fn is_zoomed(&self) -> bool {
        self.zoomed
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn area(&self) -> Rect {
        Rect::from_size(self.size)
    }

    /// Sets the pane area. Returns true when it changed.
    pub fn resize(&mut self, size: Size) -> bool {
        if self.size == size {
            return false;
        }
        self.size = size;
        self.epoch += 1;
        true
    }

    /// Forces watchers to get a full frame without changing anything.
    pub fn touch(&mut self) {
        self.epoch += 1;
    }

    /// Rectangles of the panes that are on screen. A zoomed window shows
    /// only its active pane, over the whole area.
    pub fn visible_panes(&self) -> Vec<(PaneId, Rect)> {
        if self.zoomed {
            return vec![(self.active, self.area())];
        }
        self.layout.compute(self.area())
    }

    pub fn pane_rect(&self, pane: PaneId) -> Option<Rect> {
        self.visible_panes()
            .into_iter()
            .find_map(|(p, r)| (p == pane).then_some(r))
    }

    /// The pane drawn at a cell of the window, if any.
    pub fn pane_at(&self, row: u16, col: u16) -> Option<PaneId> {
        self.visible_panes()
            .into_iter()
            .find_map(|(p, r)| r.contains(row, col).then_some(p))
    }

    pub fn select_pane(&mut self, pane: PaneId) -> Result<(), MuxError> {
        if !self.layout.contains(pane) {
            return Err(MuxError::PaneNotFound(pane));
        }
        if pane != self.active {
            if self.zoomed {
                self.zoomed = false;
                self.epoch += 1;
            }
            self.last_active = Some(self.active);
            self.active = pane;
        }
        Ok(())
    }

    pub fn select_last_pane(&mut self) -> Result<PaneId, MuxError> {
        let last = self.last_active.ok_or(MuxError::NoPrevious("pane"))?;
        self.select_pane(last)?;
        Ok(last)
    }

    /// Moves focus `step` panes along tree order, wrapping around.
    pub fn cycle_pane(&mut self, step: isize) -> PaneId {
        let panes = self.panes();
        let len = panes.len() as isize;
        let idx = panes.iter().position(|p| *p == self.active).unwrap_or(0) as isize;
        let next = panes[(idx + step).rem_euclid(len) as usize];
        // tree membership was just read from the layout
        let _ = self.select_pane(next);
        next
    }

    pub fn select_direction(&mut self, direction: Direction) -> Result<PaneId, MuxError> {
        let next = self
            .layout
            .neighbor(self.active, direction, self.area())
            .ok_or(MuxError::NoNeighbor(direction))?;
        self.select_pane(next)?;
        Ok(next)
    }

    /// Splits `target`, focusing the new pane.
    pub fn split(
        &mut self,
        target: PaneId,
        orientation: Orientation,
        ratio: f64,
        new_pane: PaneId,
    ) -> Result<(), MuxError> {
        self.layout.split(target, orientation, ratio, new_pane)?;
        self.zoomed = false;
        self.preset = None;
        self.last_active = Some(target);
        self.active = new_pane;
        self.epoch += 1;
        Ok(())
    }

    /// Takes `pane` out of the layout. The active pane falls back to the
    /// previously active one when that still exists, else to the first pane.
    pub fn remove_pane(&mut self, pane: PaneId) -> Result<Removal, MuxError> {
        let removal = self.layout.remove(pane)?;
        if removal == Removal::Emptied {
            return Ok(removal);
        }
        if self.last_active == Some(pane) {
            self.last_active = None;
        }
        if self.active == pane {
            self.zoomed = false;
            self.active = match self.last_active.take() {
                Some(last) if self.layout.contains(last) => last,
                _ => self.layout.panes()[0],
            };
        }
        self.epoch += 1;
        Ok(removal)
    }

    /// Returns whether the window is now zoomed. A single pane never zooms.
    pub fn toggle_zoom(&mut self) -> bool {
        let zoomed = !self.zoomed && self.pane_count() > 1;
        if zoomed != self.zoomed {
            self.zoomed = zoomed;
            self.epoch += 1;
        }
        self.zoomed
    }

    pub fn select_layout(&mut self, kind: LayoutKind) {
        if let Some(layout) = LayoutNode::preset(kind, &self.panes(), self.active) {
            self.layout = layout;
        }
        self.preset = Some(kind);
        self.zoomed = false;
        self.epoch += 1;
    }

    /// Applies the preset `step` places after the last one used.
    pub fn cycle_layout(&mut self, step: isize) -> LayoutKind {
        let kind = match self.preset {
            Some(current) => current.cycle(step),
            None => LayoutKind::ALL[0],
        };
        self.select_layout(kind);
        kind
    }

    pub fn rotate(&mut self, step: isize) {
        self.layout.rotate(step);
        self.epoch += 1;
    }

    pub fn swap_panes(&mut self, a: PaneId, b: PaneId) -> Result<(), MuxError> {
        self.layout.swap(a, b)?;
        self.epoch += 1;
        Ok(())
    }

    pub fn resize_pane(&mut self, pane: PaneId, direction: Direction, amount: u16) -> Result<(), MuxError> {
        let area = self.area();
        self.layout.resize_pane(pane, direction, amount, area)?;
        self.zoomed = false;
        self.epoch += 1;
        Ok(())
    }
}
