//! Dirty-driven frame building, run once per render tick.
//!
//! Each visible pane's dirty state is taken once per tick and shared by every
//! client watching its window. A client whose window or geometry changed, or
//! that dropped frames, gets a full frame instead.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Local};
use log::trace;

use weft_mux::{ClientId, PaneId, Rect, Window, WindowId};
use weft_pty::PaneArena;
use weft_vt::{Cell, DirtyRegions};

use crate::ipc::{cursor_shape_str, encode_cells, CursorPos, PaneFrame, RowUpdate, ServerMessage};
use crate::state::{ConnId, ConnState, Server};
use crate::status::status_line;

impl Server {
    pub fn render_tick(&mut self, now: &DateTime<Local>) {
        let watchers = self.watchers();
        let watched: BTreeSet<WindowId> = watchers.iter().map(|(_, (_, w))| *w).collect();

        let mut visible: BTreeSet<PaneId> = BTreeSet::new();
        for window in &watched {
            if let Some(win) = self.mux.window(*window) {
                visible.extend(win.visible_panes().into_iter().map(|(p, _)| p));
            }
        }

        // unwatched panes lose their dirty state; nobody will ask for it
        let mut dirty: BTreeMap<PaneId, DirtyRegions> = BTreeMap::new();
        let mut rang: BTreeSet<WindowId> = BTreeSet::new();
        for (pane, p) in self.panes.iter_mut() {
            let regions = p.screen_mut().take_dirty();
            let bell = p.screen_mut().take_bell();
            if !visible.contains(pane) {
                continue;
            }
            if bell {
                if let Some(window) = self.mux.window_of(*pane) {
                    rang.insert(window);
                }
            }
            if !regions.is_empty() {
                dirty.insert(*pane, regions);
            }
        }

        for (conn, (client, window)) in watchers {
            self.render_client(conn, client, window, &dirty, now);
            if self.options.bell && rang.contains(&window) {
                self.send(conn, ServerMessage::Bell);
            }
        }
    }

    /// Attached connections with their client and watched window.
    fn watchers(&self) -> Vec<(ConnId, (ClientId, WindowId))> {
        self.conns
            .iter()
            .filter_map(|(conn, c)| match c.state {
                ConnState::Attached(client) => self.mux.client(client).map(|cl| (*conn, (client, cl.window))),
                _ => None,
            })
            .collect()
    }

    fn render_client(
        &mut self,
        conn: ConnId,
        client: ClientId,
        window: WindowId,
        dirty: &BTreeMap<PaneId, DirtyRegions>,
        now: &DateTime<Local>,
    ) {
        let Some(cl) = self.mux.client(client) else {
            return;
        };
        let Some(win) = self.mux.window(window) else {
            return;
        };
        let status = status_line(
            &self.mux,
            &self.panes,
            &self.options,
            cl.session,
            cl.viewport.cols,
            now,
        );
        let cursor = cursor_of(win, &self.panes);
        let Some(c) = self.conns.get(&conn) else {
            return;
        };

        let epoch = (window, win.epoch());
        let message = if c.resync || c.seen != Some(epoch) {
            trace!("full frame for connection {conn}");
            ServerMessage::FullFrame {
                window,
                rows: win.size().rows,
                cols: win.size().cols,
                panes: full_panes(win, &self.panes),
                cursor: cursor.clone(),
                status: status.clone(),
            }
        } else {
            let rows = dirty_rows(win, &self.panes, dirty);
            let status_changed = status != c.last_status;
            if rows.is_empty() && !status_changed && c.last_cursor.as_ref() == Some(&cursor) {
                return;
            }
            ServerMessage::Update {
                window,
                rows,
                cursor: cursor.clone(),
                status: if status_changed { status.clone() } else { None },
            }
        };

        if let Some(c) = self.conns.get_mut(&conn) {
            c.seen = Some(epoch);
            c.resync = false;
            c.last_status = status;
            c.last_cursor = Some(cursor);
        }
        // a full queue sets resync again
        self.send(conn, message);
    }
}

/// The active pane's cursor in window coordinates.
fn cursor_of(win: &Window, panes: &PaneArena) -> CursorPos {
    let active = win.active_pane();
    let rect = win.pane_rect(active).and_then(|r| r.intersection(&win.area()));
    let (Some(rect), Some(pane)) = (rect, panes.get(active)) else {
        return CursorPos::hidden();
    };
    let cursor = pane.screen().cursor();
    if cursor.row >= rect.rows || cursor.col >= rect.cols {
        return CursorPos::hidden();
    }
    CursorPos {
        row: rect.row + cursor.row,
        col: rect.col + cursor.col,
        visible: cursor.visible,
        shape: cursor_shape_str(cursor.shape).to_string(),
    }
}

/// Cells of `row` clipped to `rect`'s width, padded with blanks where the
/// screen is narrower.
fn clipped_row(pane: &weft_pty::Pane, rect: &Rect, row: u16, left: u16, right: u16) -> Vec<Cell> {
    let right = right.min(rect.cols.saturating_sub(1));
    let mut cells = if row < pane.screen().rows() {
        pane.screen().row_cells(row, left, right)
    } else {
        Vec::new()
    };
    cells.resize(usize::from(right - left) + 1, Cell::default());
    cells
}

/// Visible panes with their rectangles cut to the window. Panes pushed past
/// the edge by minimum sizes lose their overflow.
fn clipped_panes(win: &Window) -> Vec<(PaneId, Rect)> {
    let area = win.area();
    win.visible_panes()
        .into_iter()
        .filter_map(|(id, rect)| rect.intersection(&area).map(|r| (id, r)))
        .collect()
}

fn full_panes(win: &Window, panes: &PaneArena) -> Vec<PaneFrame> {
    clipped_panes(win)
        .into_iter()
        .filter_map(|(id, rect)| {
            let pane = panes.get(id)?;
            let mut cells = Vec::with_capacity(usize::from(rect.rows) * usize::from(rect.cols));
            if rect.cols > 0 {
                for row in 0..rect.rows {
                    cells.extend(clipped_row(pane, &rect, row, 0, rect.cols - 1));
                }
            }
            Some(PaneFrame {
                pane: id,
                rect,
                cells: encode_cells(&cells),
            })
        })
        .collect()
}

fn dirty_rows(win: &Window, panes: &PaneArena, dirty: &BTreeMap<PaneId, DirtyRegions>) -> Vec<RowUpdate> {
    let mut out = Vec::new();
    for (id, rect) in clipped_panes(win) {
        let (Some(regions), Some(pane)) = (dirty.get(&id), panes.get(id)) else {
            continue;
        };
        if rect.rows == 0 || rect.cols == 0 {
            continue;
        }
        let spans: Vec<(u16, u16, u16)> = match regions.clone().clip(rect.rows, rect.cols) {
            DirtyRegions::Full => (0..rect.rows).map(|r| (r, 0, rect.cols - 1)).collect(),
            DirtyRegions::Rows(rows) => rows.into_iter().map(|d| (d.row, d.left, d.right)).collect(),
        };
        for (row, left, right) in spans {
            out.push(RowUpdate {
                pane: id,
                row,
                col: left,
                cells: encode_cells(&clipped_row(pane, &rect, row, left, right)),
            });
        }
    }
    out
}
