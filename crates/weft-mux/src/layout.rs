//! The split tree behind every window.
//!
//! Leaves are panes. A split divides its rectangle among two or more
//! children along one axis, each child holding a ratio of the length; the
//! ratios of one split always sum to 1. Splitting a leaf always replaces it
//! with a fresh two-child split, and removing a leaf renormalizes its
//! siblings and collapses one-child splits, so a split followed by a kill of
//! the new pane gives back the exact tree that was there before.

use std::fmt;
use std::str::FromStr;

use crate::error::MuxError;
use crate::geometry::{Direction, Orientation, Rect, Size};
use crate::ids::PaneId;

#[derive(Clone, Debug, PartialEq)]
pub enum LayoutNode {
    Leaf(PaneId),
    Split {
        orientation: Orientation,
        children: Vec<(LayoutNode, f64)>,
    },
}

/// What removing a pane did to the tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Removal {
    /// The pane was removed and other panes remain.
    Removed,
    /// The pane was the only leaf. The tree is left untouched and the
    /// owning window should be destroyed.
    Emptied,
}

impl LayoutNode {
    pub fn leaf(pane: PaneId) -> Self {
        LayoutNode::Leaf(pane)
    }

    /// Panes in tree order: depth-first, children left to right.
    pub fn panes(&self) -> Vec<PaneId> {
        let mut out = Vec::new();
        self.collect_panes(&mut out);
        out
    }

    fn collect_panes(&self, out: &mut Vec<PaneId>) {
        match self {
            LayoutNode::Leaf(pane) => out.push(*pane),
            LayoutNode::Split { children, .. } => {
                for (child, _) in children {
                    child.collect_panes(out);
                }
            }
        }
    }

    pub fn contains(&self, pane: PaneId) -> bool {
        match self {
            LayoutNode::Leaf(p) => *p == pane,
            LayoutNode::Split { children, .. } => children.iter().any(|(c, _)| c.contains(pane)),
        }
    }

    pub fn pane_count(&self) -> usize {
        match self {
            LayoutNode::Leaf(_) => 1,
            LayoutNode::Split { children, .. } => children.iter().map(|(c, _)| c.pane_count()).sum(),
        }
    }

    /// Replaces the leaf `target` with a split holding `target` and
    /// `new_pane`; `target` keeps `ratio` of the space.
    pub fn split(
        &mut self,
        target: PaneId,
        orientation: Orientation,
        ratio: f64,
        new_pane: PaneId,
    ) -> Result<(), MuxError> {
        if !(ratio > 0.0 && ratio < 1.0) {
            return Err(MuxError::InvalidRatio(ratio));
        }
        if self.contains(new_pane) {
            return Err(MuxError::DuplicatePane(new_pane));
        }
        let leaf = self
            .find_leaf_mut(target)
            .ok_or(MuxError::PaneNotFound(target))?;
        *leaf = LayoutNode::Split {
            orientation,
            children: vec![
                (LayoutNode::Leaf(target), ratio),
                (LayoutNode::Leaf(new_pane), 1.0 - ratio),
            ],
        };
        Ok(())
    }

    fn find_leaf_mut(&mut self, pane: PaneId) -> Option<&mut LayoutNode> {
        if matches!(self, LayoutNode::Leaf(p) if *p == pane) {
            return Some(self);
        }
        match self {
            LayoutNode::Leaf(_) => None,
            LayoutNode::Split { children, .. } => children
                .iter_mut()
                .find_map(|(child, _)| child.find_leaf_mut(pane)),
        }
    }

    pub fn remove(&mut self, pane: PaneId) -> Result<Removal, MuxError> {
        match self {
            LayoutNode::Leaf(p) if *p == pane => return Ok(Removal::Emptied),
            LayoutNode::Leaf(_) => return Err(MuxError::PaneNotFound(pane)),
            LayoutNode::Split { .. } => {}
        }
        if !self.remove_from_split(pane) {
            return Err(MuxError::PaneNotFound(pane));
        }
        if let LayoutNode::Split { children, .. } = self {
            if children.len() == 1 {
                let (only, _) = children.remove(0);
                *self = only;
            }
        }
        Ok(Removal::Removed)
    }

    /// Removes `pane` somewhere below this split. Returns false when the
    /// pane is not in this subtree.
    fn remove_from_split(&mut self, pane: PaneId) -> bool {
        let LayoutNode::Split { children, .. } = self else {
            return false;
        };
        if let Some(idx) = children
            .iter()
            .position(|(c, _)| matches!(c, LayoutNode::Leaf(p) if *p == pane))
        {
            children.remove(idx);
            normalize(children);
            return true;
        }
        for (child, _) in children.iter_mut() {
            if !child.remove_from_split(pane) {
                continue;
            }
            if let LayoutNode::Split { children: inner, .. } = child {
                if inner.len() == 1 {
                    // the survivor takes the collapsed split's place and ratio
                    let (only, _) = inner.remove(0);
                    *child = only;
                }
            }
            return true;
        }
        false
    }

    /// Smallest size this subtree can be laid out in without overflowing:
    /// one cell per leaf along each axis it is divided on.
    pub fn min_size(&self) -> Size {
        match self {
            LayoutNode::Leaf(_) => Size::new(1, 1),
            LayoutNode::Split {
                orientation,
                children,
            } => {
                let mut rows = 0u16;
                let mut cols = 0u16;
                for (child, _) in children {
                    let min = child.min_size();
                    match orientation {
                        Orientation::Horizontal => {
                            cols = cols.saturating_add(min.cols);
                            rows = rows.max(min.rows);
                        }
                        Orientation::Vertical => {
                            rows = rows.saturating_add(min.rows);
                            cols = cols.max(min.cols);
                        }
                    }
                }
                Size::new(rows, cols)
            }
        }
    }

    /// Assigns a rectangle to every pane. When `area` is too small for the
    /// tree, children keep their minimum size and overflow past the edge;
    /// the renderer clips them.
    pub fn compute(&self, area: Rect) -> Vec<(PaneId, Rect)> {
        let mut out = Vec::with_capacity(self.pane_count());
        self.place(area, &mut out);
        out
    }

    fn place(&self, area: Rect, out: &mut Vec<(PaneId, Rect)>) {
        match self {
            LayoutNode::Leaf(pane) => out.push((*pane, area)),
            LayoutNode::Split { children, .. } => {
                for ((child, _), rect) in children.iter().zip(self.child_rects(area)) {
                    child.place(rect, out);
                }
            }
        }
    }

    /// Rectangles of this split's direct children within `area`.
    fn child_rects(&self, area: Rect) -> Vec<Rect> {
        let LayoutNode::Split {
            orientation,
            children,
        } = self
        else {
            return vec![area];
        };
        let sizes = self.child_lengths(area);
        let mut offset = 0u16;
        let mut rects = Vec::with_capacity(children.len());
        for len in sizes {
            let rect = match orientation {
                Orientation::Horizontal => {
                    Rect::new(area.row, area.col.saturating_add(offset), area.rows, len)
                }
                Orientation::Vertical => {
                    Rect::new(area.row.saturating_add(offset), area.col, len, area.cols)
                }
            };
            rects.push(rect);
            offset = offset.saturating_add(len);
        }
        rects
    }

    fn child_lengths(&self, area: Rect) -> Vec<u16> {
        let LayoutNode::Split {
            orientation,
            children,
        } = self
        else {
            return Vec::new();
        };
        let ratios: Vec<f64> = children.iter().map(|(_, r)| *r).collect();
        let mins: Vec<u16> = children
            .iter()
            .map(|(c, _)| c.min_size().along(*orientation))
            .collect();
        distribute(area.size().along(*orientation), &ratios, &mins)
    }

    /// Grows `pane` by `amount` cells toward `direction`, taking the space
    /// from the adjacent sibling on that side. When there is no sibling on
    /// that side, the pane shrinks from the opposite edge instead.
    pub fn resize_pane(
        &mut self,
        pane: PaneId,
        direction: Direction,
        amount: u16,
        area: Rect,
    ) -> Result<(), MuxError> {
        let path = self.path_to(pane).ok_or(MuxError::PaneNotFound(pane))?;
        let amount = amount as i32;
        if self.adjust_along_path(&path, direction, amount, area) {
            return Ok(());
        }
        self.adjust_along_path(&path, direction.opposite(), -amount, area);
        Ok(())
    }

    /// Finds the deepest split on `path` that divides along `direction`'s
    /// axis and has a sibling on that side, then moves `delta` cells from
    /// that sibling to the child on the path.
    fn adjust_along_path(&mut self, path: &[usize], direction: Direction, delta: i32, area: Rect) -> bool {
        // rectangles of every node on the path, root first
        let mut rects = Vec::with_capacity(path.len());
        let mut node: &LayoutNode = self;
        let mut rect = area;
        for &idx in path {
            rects.push(rect);
            let child_rect = node.child_rects(rect)[idx];
            let LayoutNode::Split { children, .. } = node else {
                break;
            };
            node = &children[idx].0;
            rect = child_rect;
        }

        let target_depth = (0..path.len()).rev().find(|&depth| {
            let node = self.node_at(&path[..depth]);
            let LayoutNode::Split {
                orientation,
                children,
            } = node
            else {
                return false;
            };
            let idx = path[depth];
            *orientation == direction.axis()
                && if direction.is_backward() {
                    idx > 0
                } else {
                    idx + 1 < children.len()
                }
        });
        let Some(depth) = target_depth else {
            return false;
        };

        let split_rect = rects[depth];
        let idx = path[depth];
        let neighbor = if direction.is_backward() { idx - 1 } else { idx + 1 };
        let split = self.node_at_mut(&path[..depth]);
        let mut sizes = split.child_lengths(split_rect);
        let LayoutNode::Split {
            orientation,
            children,
        } = split
        else {
            return false;
        };
        let mins: Vec<u16> = children
            .iter()
            .map(|(c, _)| c.min_size().along(*orientation))
            .collect();
        let grow = delta.clamp(
            -(sizes[idx] as i32 - mins[idx] as i32).max(0),
            (sizes[neighbor] as i32 - mins[neighbor] as i32).max(0),
        );
        sizes[idx] = (sizes[idx] as i32 + grow) as u16;
        sizes[neighbor] = (sizes[neighbor] as i32 - grow) as u16;
        let total: u32 = sizes.iter().map(|&s| s as u32).sum();
        if total > 0 {
            for ((_, ratio), size) in children.iter_mut().zip(&sizes) {
                *ratio = *size as f64 / total as f64;
            }
        }
        true
    }

    fn path_to(&self, pane: PaneId) -> Option<Vec<usize>> {
        match self {
            LayoutNode::Leaf(p) => (*p == pane).then(Vec::new),
            LayoutNode::Split { children, .. } => {
                children.iter().enumerate().find_map(|(idx, (child, _))| {
                    child.path_to(pane).map(|mut rest| {
                        rest.insert(0, idx);
                        rest
                    })
                })
            }
        }
    }

    fn node_at(&self, path: &[usize]) -> &LayoutNode {
        let mut node = self;
        for &idx in path {
            match node {
                LayoutNode::Split { children, .. } => node = &children[idx].0,
                LayoutNode::Leaf(_) => break,
            }
        }
        node
    }

    fn node_at_mut(&mut self, path: &[usize]) -> &mut LayoutNode {
        let mut node = self;
        for &idx in path {
            match node {
                LayoutNode::Split { children, .. } => node = &mut children[idx].0,
                LayoutNode::Leaf(_) => break,
            }
        }
        node
    }

    /// The pane whose edge touches `pane`'s edge on the `direction` side,
    /// preferring the one sharing the most border and then the top-most or
    /// left-most.
    pub fn neighbor(&self, pane: PaneId, direction: Direction, area: Rect) -> Option<PaneId> {
        let rects = self.compute(area);
        let (_, from) = rects.iter().find(|(p, _)| *p == pane)?;
        rects
            .iter()
            .filter(|(p, _)| *p != pane)
            .filter(|(_, r)| match direction {
                Direction::Left => r.right() == from.col as u32,
                Direction::Right => r.col as u32 == from.right(),
                Direction::Up => r.bottom() == from.row as u32,
                Direction::Down => r.row as u32 == from.bottom(),
            })
            .map(|(p, r)| (*p, r, r.cross_overlap(from, direction.axis())))
            .filter(|(_, _, overlap)| *overlap > 0)
            .max_by(|a, b| a.2.cmp(&b.2).then((b.1.row, b.1.col).cmp(&(a.1.row, a.1.col))))
            .map(|(p, _, _)| p)
    }

    /// Moves every pane `count` places along tree order, keeping the shape.
    pub fn rotate(&mut self, count: isize) {
        let panes = self.panes();
        let len = panes.len() as isize;
        if len < 2 {
            return;
        }
        let rotated: Vec<PaneId> = (0..len)
            .map(|i| panes[(i + count).rem_euclid(len) as usize])
            .collect();
        let mut iter = rotated.into_iter();
        self.relabel(&mut iter);
    }

    fn relabel(&mut self, panes: &mut impl Iterator<Item = PaneId>) {
        match self {
            LayoutNode::Leaf(p) => {
                if let Some(next) = panes.next() {
                    *p = next;
                }
            }
            LayoutNode::Split { children, .. } => {
                for (child, _) in children {
                    child.relabel(panes);
                }
            }
        }
    }

    /// Exchanges the positions of two panes.
    pub fn swap(&mut self, a: PaneId, b: PaneId) -> Result<(), MuxError> {
        if !self.contains(a) {
            return Err(MuxError::PaneNotFound(a));
        }
        if !self.contains(b) {
            return Err(MuxError::PaneNotFound(b));
        }
        self.swap_labels(a, b);
        Ok(())
    }

    fn swap_labels(&mut self, a: PaneId, b: PaneId) {
        match self {
            LayoutNode::Leaf(p) if *p == a => *p = b,
            LayoutNode::Leaf(p) if *p == b => *p = a,
            LayoutNode::Leaf(_) => {}
            LayoutNode::Split { children, .. } => {
                for (child, _) in children {
                    child.swap_labels(a, b);
                }
            }
        }
    }

    /// Builds a preset arrangement of `panes`. `main` is used by the
    /// main-* presets and falls back to the first pane.
    pub fn preset(kind: LayoutKind, panes: &[PaneId], main: PaneId) -> Option<LayoutNode> {
        let first = *panes.first()?;
        let main = if panes.contains(&main) { main } else { first };
        let node = match kind {
            LayoutKind::EvenHorizontal => even(Orientation::Horizontal, leaves(panes.iter())),
            LayoutKind::EvenVertical => even(Orientation::Vertical, leaves(panes.iter())),
            LayoutKind::MainHorizontal | LayoutKind::MainVertical => {
                let (outer, inner) = if kind == LayoutKind::MainHorizontal {
                    (Orientation::Vertical, Orientation::Horizontal)
                } else {
                    (Orientation::Horizontal, Orientation::Vertical)
                };
                let rest = leaves(panes.iter().filter(|p| **p != main));
                if rest.is_empty() {
                    LayoutNode::Leaf(main)
                } else {
                    even(outer, vec![LayoutNode::Leaf(main), even(inner, rest)])
                }
            }
            LayoutKind::Tiled => {
                let columns = (panes.len() as f64).sqrt().ceil().max(1.0) as usize;
                let rows = panes
                    .chunks(columns)
                    .map(|row| even(Orientation::Horizontal, leaves(row.iter())))
                    .collect();
                even(Orientation::Vertical, rows)
            }
        };
        Some(node)
    }
}

fn leaves<'a>(panes: impl Iterator<Item = &'a PaneId>) -> Vec<LayoutNode> {
    panes.map(|p| LayoutNode::Leaf(*p)).collect()
}

/// A split of `nodes` with equal ratios; a single node is returned as is.
fn even(orientation: Orientation, mut nodes: Vec<LayoutNode>) -> LayoutNode {
    if nodes.len() == 1 {
        return nodes.remove(0);
    }
    let ratio = 1.0 / nodes.len() as f64;
    LayoutNode::Split {
        orientation,
        children: nodes.into_iter().map(|n| (n, ratio)).collect(),
    }
}

fn normalize(children: &mut [(LayoutNode, f64)]) {
    let total: f64 = children.iter().map(|(_, r)| *r).sum();
    if total <= 0.0 {
        let even = 1.0 / children.len().max(1) as f64;
        for (_, r) in children.iter_mut() {
            *r = even;
        }
        return;
    }
    for (_, r) in children.iter_mut() {
        *r /= total;
    }
}

/// Divides `len` cells among children by ratio. Boundaries fall at
/// `round(len * cumulative_ratio)` with the last pinned to `len`. Children
/// pushed below their minimum are raised to it, one cell at a time from the
/// sibling with the most room to spare (lowest index on ties). When the
/// minimums alone exceed `len`, every child gets exactly its minimum.
pub(crate) fn distribute(len: u16, ratios: &[f64], mins: &[u16]) -> Vec<u16> {
    let min_total: u32 = mins.iter().map(|&m| m as u32).sum();
    if min_total >= len as u32 {
        return mins.to_vec();
    }

    let mut sizes = Vec::with_capacity(ratios.len());
    let mut cumulative = 0.0;
    let mut prev = 0u16;
    for (i, ratio) in ratios.iter().enumerate() {
        cumulative += ratio;
        let boundary = if i + 1 == ratios.len() {
            len
        } else {
            ((len as f64) * cumulative).round().clamp(prev as f64, len as f64) as u16
        };
        sizes.push(boundary - prev);
        prev = boundary;
    }

    let mut deficit = 0u32;
    for (size, &min) in sizes.iter_mut().zip(mins) {
        if *size < min {
            deficit += (min - *size) as u32;
            *size = min;
        }
    }
    while deficit > 0 {
        let donor = (0..sizes.len())
            .filter(|&i| sizes[i] > mins[i])
            .max_by(|&a, &b| {
                (sizes[a] - mins[a])
                    .cmp(&(sizes[b] - mins[b]))
                    .then(b.cmp(&a))
            });
        let Some(i) = donor else { break };
        sizes[i] -= 1;
        deficit -= 1;
    }
    sizes
}

/// Named preset arrangements.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LayoutKind {
    EvenHorizontal,
    EvenVertical,
    MainHorizontal,
    MainVertical,
    Tiled,
}

impl LayoutKind {
    pub const ALL: [LayoutKind; 5] = [
        LayoutKind::EvenHorizontal,
        LayoutKind::EvenVertical,
        LayoutKind::MainHorizontal,
        LayoutKind::MainVertical,
        LayoutKind::Tiled,
    ];

    pub fn name(self) -> &'static str {
        match self {
            LayoutKind::EvenHorizontal => "even-horizontal",
            LayoutKind::EvenVertical => "even-vertical",
            LayoutKind::MainHorizontal => "main-horizontal",
            LayoutKind::MainVertical => "main-vertical",
            LayoutKind::Tiled => "tiled",
        }
    }

    /// The preset `step` places after this one, wrapping around.
    pub fn cycle(self, step: isize) -> LayoutKind {
        let len = Self::ALL.len() as isize;
        let idx = Self::ALL.iter().position(|k| *k == self).unwrap_or(0) as isize;
        Self::ALL[(idx + step).rem_euclid(len) as usize]
    }
}

impl fmt::Display for LayoutKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LayoutKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|k| k.name() == s)
            .ok_or_else(|| format!("invalid layout: {s}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn p(n: u64) -> PaneId {
        PaneId::from_raw(n)
    }

    /// Every point of `area` is covered by exactly one pane.
    fn assert_tiles(layout: &LayoutNode, area: Rect) {
        let rects = layout.compute(area);
        let total: u32 = rects.iter().map(|(_, r)| r.area()).sum();
        assert_eq!(total, area.area(), "areas do not add up: {rects:?}");
        for (i, (_, a)) in rects.iter().enumerate() {
            assert!(a.row >= area.row && a.bottom() <= area.bottom(), "{a:?} escapes {area:?}");
            assert!(a.col >= area.col && a.right() <= area.right(), "{a:?} escapes {area:?}");
            for (_, b) in &rects[i + 1..] {
                assert_eq!(a.intersection(b), None, "{a:?} overlaps {b:?}");
            }
        }
    }

    fn grid() -> LayoutNode {
        let mut layout = LayoutNode::leaf(p(1));
        layout.split(p(1), Orientation::Horizontal, 0.5, p(2)).unwrap();
        layout.split(p(2), Orientation::Vertical, 0.5, p(3)).unwrap();
        layout.split(p(1), Orientation::Vertical, 0.3, p(4)).unwrap();
        layout.split(p(3), Orientation::Horizontal, 0.5, p(5)).unwrap();
        layout
    }

    #[test]
    fn test_single_pane_fills_area() {
        let layout = LayoutNode::leaf(p(1));
        assert_eq!(
            layout.compute(Rect::new(0, 0, 23, 80)),
            vec![(p(1), Rect::new(0, 0, 23, 80))]
        );
    }

    #[test]
    fn test_split_halves() {
        let mut layout = LayoutNode::leaf(p(1));
        layout.split(p(1), Orientation::Horizontal, 0.5, p(2)).unwrap();
        assert_eq!(
            layout.compute(Rect::new(0, 0, 24, 81)),
            vec![
                (p(1), Rect::new(0, 0, 24, 41)),
                (p(2), Rect::new(0, 41, 24, 40)),
            ]
        );
        let mut layout = LayoutNode::leaf(p(1));
        layout.split(p(1), Orientation::Vertical, 0.5, p(2)).unwrap();
        assert_eq!(
            layout.compute(Rect::new(0, 0, 23, 80)),
            vec![
                (p(1), Rect::new(0, 0, 12, 80)),
                (p(2), Rect::new(12, 0, 11, 80)),
            ]
        );
    }

    #[test]
    fn test_tiles_at_many_sizes() {
        let layout = grid();
        for rows in [5u16, 7, 13, 23, 24, 50] {
            for cols in [6u16, 9, 17, 80, 81, 211] {
                assert_tiles(&layout, Rect::new(0, 0, rows, cols));
            }
        }
    }

    #[test]
    fn test_split_then_remove_restores_tree() {
        let before = grid();
        for target in before.panes() {
            for orientation in [Orientation::Horizontal, Orientation::Vertical] {
                let mut layout = before.clone();
                layout.split(target, orientation, 0.5, p(99)).unwrap();
                assert_eq!(layout.remove(p(99)), Ok(Removal::Removed));
                assert_eq!(layout, before);
            }
        }
    }

    #[test]
    fn test_remove_renormalizes_siblings() {
        let mut layout = LayoutNode::Split {
            orientation: Orientation::Horizontal,
            children: vec![
                (LayoutNode::leaf(p(1)), 0.25),
                (LayoutNode::leaf(p(2)), 0.25),
                (LayoutNode::leaf(p(3)), 0.5),
            ],
        };
        layout.remove(p(3)).unwrap();
        assert_eq!(
            layout,
            LayoutNode::Split {
                orientation: Orientation::Horizontal,
                children: vec![(LayoutNode::leaf(p(1)), 0.5), (LayoutNode::leaf(p(2)), 0.5)],
            }
        );
    }

    #[test]
    fn test_remove_collapses_to_leaf() {
        let mut layout = LayoutNode::leaf(p(1));
        layout.split(p(1), Orientation::Vertical, 0.5, p(2)).unwrap();
        layout.remove(p(1)).unwrap();
        assert_eq!(layout, LayoutNode::leaf(p(2)));
        assert_eq!(layout.remove(p(2)), Ok(Removal::Emptied));
        assert_eq!(layout.remove(p(7)), Err(MuxError::PaneNotFound(p(7))));
    }

    #[test]
    fn test_split_errors_leave_tree_alone() {
        let mut layout = grid();
        let before = layout.clone();
        assert_eq!(
            layout.split(p(42), Orientation::Vertical, 0.5, p(43)),
            Err(MuxError::PaneNotFound(p(42)))
        );
        assert_eq!(
            layout.split(p(1), Orientation::Vertical, 0.5, p(2)),
            Err(MuxError::DuplicatePane(p(2)))
        );
        assert_eq!(
            layout.split(p(1), Orientation::Vertical, 1.0, p(9)),
            Err(MuxError::InvalidRatio(1.0))
        );
        assert_eq!(layout, before);
    }

    #[test]
    fn test_overflow_keeps_minimums() {
        let mut layout = LayoutNode::leaf(p(1));
        layout.split(p(1), Orientation::Horizontal, 0.5, p(2)).unwrap();
        layout.split(p(2), Orientation::Horizontal, 0.5, p(3)).unwrap();
        layout.split(p(3), Orientation::Horizontal, 0.5, p(4)).unwrap();
        let rects = layout.compute(Rect::new(0, 0, 3, 2));
        assert!(rects.iter().all(|(_, r)| r.cols == 1 && r.rows == 3));
        assert_eq!(rects.last().map(|(_, r)| r.col), Some(3));
    }

    #[test]
    fn test_distribute_borrows_from_largest() {
        // the third child needs two cells but rounding gives it none
        assert_eq!(distribute(10, &[0.6, 0.38, 0.02], &[1, 1, 2]), vec![4, 4, 2]);
        assert_eq!(distribute(4, &[0.5, 0.5], &[3, 3]), vec![3, 3]);
        assert_eq!(distribute(0, &[1.0], &[1]), vec![1]);
    }

    #[test]
    fn test_min_size() {
        let layout = grid();
        let min = layout.min_size();
        let rects = layout.compute(Rect::new(0, 0, min.rows, min.cols));
        assert!(rects.iter().all(|(_, r)| r.rows >= 1 && r.cols >= 1));
        assert_tiles(&layout, Rect::new(0, 0, min.rows, min.cols));
    }

    #[test]
    fn test_resize_round_trip() {
        let area = Rect::new(0, 0, 23, 80);
        let mut layout = LayoutNode::leaf(p(1));
        layout.split(p(1), Orientation::Horizontal, 0.5, p(2)).unwrap();
        let before = layout.compute(area);

        layout.resize_pane(p(1), Direction::Right, 5, area).unwrap();
        let grown = layout.compute(area);
        assert_eq!(grown[0].1.cols, 45);
        assert_eq!(grown[1].1.cols, 35);

        layout.resize_pane(p(1), Direction::Left, 5, area).unwrap();
        assert_eq!(layout.compute(area), before);
    }

    #[test]
    fn test_resize_falls_back_to_other_side() {
        let area = Rect::new(0, 0, 23, 80);
        let mut layout = LayoutNode::leaf(p(1));
        layout.split(p(1), Orientation::Horizontal, 0.5, p(2)).unwrap();
        // the right pane has no sibling further right: it gives up its left edge
        layout.resize_pane(p(2), Direction::Right, 10, area).unwrap();
        let rects = layout.compute(area);
        assert_eq!(rects[0].1.cols, 50);
        assert_eq!(rects[1].1.cols, 30);
    }

    #[test]
    fn test_resize_reaches_ancestor_split() {
        let area = Rect::new(0, 0, 20, 80);
        let mut layout = LayoutNode::leaf(p(1));
        layout.split(p(1), Orientation::Horizontal, 0.5, p(2)).unwrap();
        layout.split(p(1), Orientation::Vertical, 0.5, p(3)).unwrap();
        layout.resize_pane(p(3), Direction::Right, 4, area).unwrap();
        let rects = layout.compute(area);
        let width = |pane| rects.iter().find(|(q, _)| *q == pane).map(|(_, r)| r.cols);
        assert_eq!(width(p(1)), Some(44));
        assert_eq!(width(p(3)), Some(44));
        assert_eq!(width(p(2)), Some(36));
    }

    #[test]
    fn test_resize_clamps_at_minimum() {
        let area = Rect::new(0, 0, 10, 10);
        let mut layout = LayoutNode::leaf(p(1));
        layout.split(p(1), Orientation::Horizontal, 0.5, p(2)).unwrap();
        layout.resize_pane(p(1), Direction::Right, 100, area).unwrap();
        let rects = layout.compute(area);
        assert_eq!(rects[0].1.cols, 9);
        assert_eq!(rects[1].1.cols, 1);
    }

    #[test]
    fn test_neighbor() {
        let area = Rect::new(0, 0, 24, 80);
        let mut layout = LayoutNode::leaf(p(1));
        layout.split(p(1), Orientation::Horizontal, 0.5, p(2)).unwrap();
        layout.split(p(2), Orientation::Vertical, 0.5, p(3)).unwrap();
        assert_eq!(layout.neighbor(p(1), Direction::Right, area), Some(p(2)));
        assert_eq!(layout.neighbor(p(3), Direction::Left, area), Some(p(1)));
        assert_eq!(layout.neighbor(p(2), Direction::Down, area), Some(p(3)));
        assert_eq!(layout.neighbor(p(3), Direction::Up, area), Some(p(2)));
        assert_eq!(layout.neighbor(p(1), Direction::Left, area), None);
    }

    #[test]
    fn test_rotate_and_swap() {
        let mut layout = LayoutNode::leaf(p(1));
        layout.split(p(1), Orientation::Horizontal, 0.5, p(2)).unwrap();
        layout.split(p(2), Orientation::Horizontal, 0.5, p(3)).unwrap();
        layout.rotate(1);
        assert_eq!(layout.panes(), vec![p(2), p(3), p(1)]);
        layout.rotate(-1);
        assert_eq!(layout.panes(), vec![p(1), p(2), p(3)]);
        layout.swap(p(1), p(3)).unwrap();
        assert_eq!(layout.panes(), vec![p(3), p(2), p(1)]);
        assert_eq!(layout.swap(p(1), p(9)), Err(MuxError::PaneNotFound(p(9))));
    }

    #[test]
    fn test_presets_tile() {
        let panes: Vec<PaneId> = (1..=5).map(p).collect();
        let area = Rect::new(0, 0, 23, 80);
        for kind in LayoutKind::ALL {
            let layout = LayoutNode::preset(kind, &panes, p(3)).unwrap();
            let mut placed = layout.panes();
            placed.sort();
            assert_eq!(placed, panes, "{kind}");
            assert_tiles(&layout, area);
        }
        let main = LayoutNode::preset(LayoutKind::MainVertical, &panes, p(3)).unwrap();
        assert_eq!(main.panes()[0], p(3));
        assert_eq!(
            LayoutNode::preset(LayoutKind::Tiled, &[p(1)], p(1)),
            Some(LayoutNode::leaf(p(1)))
        );
        assert_eq!(LayoutNode::preset(LayoutKind::Tiled, &[], p(1)), None);
    }

    #[test]
    fn test_layout_kind_names() {
        assert_eq!("main-vertical".parse::<LayoutKind>(), Ok(LayoutKind::MainVertical));
        assert!("spiral".parse::<LayoutKind>().is_err());
        assert_eq!(LayoutKind::Tiled.cycle(1), LayoutKind::EvenHorizontal);
        assert_eq!(LayoutKind::EvenHorizontal.cycle(-1), LayoutKind::Tiled);
    }
}
