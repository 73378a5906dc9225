use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use alacritty_terminal::event::{Event, EventListener};
use alacritty_terminal::grid::Dimensions;
use alacritty_terminal::index::{Column, Line};
use alacritty_terminal::term::{Config, Term, TermDamage};
use alacritty_terminal::vte::ansi::{self, CursorShape as AlacCursorShape};

use crate::cell::Cell;
use crate::palette::{convert_cell, convert_cursor_shape};
use crate::screen::{CursorState, DirtyRegions, DirtyRow, Snapshot};

/// Scrollback kept per pane unless configured otherwise.
pub const DEFAULT_HISTORY_LIMIT: usize = 2000;

/// Side effects the engine reports while parsing output.
#[derive(Default)]
struct Signals {
    title: Option<String>,
    bell: bool,
    replies: Vec<String>,
}

/// Collects engine events. `Term` owns one copy and the model keeps another.
#[derive(Clone, Default)]
pub struct SignalSink {
    inner: Arc<Mutex<Signals>>,
}

impl SignalSink {
    fn lock(&self) -> MutexGuard<'_, Signals> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl EventListener for SignalSink {
    fn send_event(&self, event: Event) {
        let mut signals = self.lock();
        match event {
            Event::Title(title) => signals.title = Some(title),
            Event::ResetTitle => signals.title = None,
            Event::Bell => signals.bell = true,
            Event::PtyWrite(data) => signals.replies.push(data),
            _ => {}
        }
    }
}

struct GridSize {
    rows: usize,
    cols: usize,
}

impl Dimensions for GridSize {
    fn total_lines(&self) -> usize {
        self.rows
    }

    fn screen_lines(&self) -> usize {
        self.rows
    }

    fn columns(&self) -> usize {
        self.cols
    }
}

/// Screen state of one pane.
///
/// Raw pty output goes in through [`feed`](Self::feed); what comes out is
/// either a full [`Snapshot`] or the set of rows that changed since the last
/// [`take_dirty`](Self::take_dirty). Geometry changes always count as a full
/// redraw.
pub struct ScreenModel {
    term: Term<SignalSink>,
    parser: ansi::Processor,
    signals: SignalSink,
    rows: u16,
    cols: u16,
    force_full: bool,
    /// Output arrived since the last `take_dirty`.
    fed: bool,
    /// Cursor position at the last `take_dirty`.
    cursor_at: (u16, u16),
}

impl ScreenModel {
    pub fn new(rows: u16, cols: u16, history_limit: usize) -> Self {
        let rows = rows.max(1);
        let cols = cols.max(1);
        let config = Config {
            scrolling_history: history_limit,
            ..Config::default()
        };
        let size = GridSize {
            rows: rows as usize,
            cols: cols as usize,
        };
        let signals = SignalSink::default();
        let term = Term::new(config, &size, signals.clone());

        Self {
            term,
            parser: ansi::Processor::new(),
            signals,
            rows,
            cols,
            force_full: true,
            fed: false,
            cursor_at: (0, 0),
        }
    }

    pub fn rows(&self) -> u16 {
        self.rows
    }

    pub fn cols(&self) -> u16 {
        self.cols
    }

    /// Advances the engine with raw output bytes, in the order produced.
    pub fn feed(&mut self, bytes: &[u8]) {
        self.parser.advance(&mut self.term, bytes);
        self.fed = true;
    }

    /// Reflows the grid to the new size. The whole screen becomes dirty.
    pub fn resize(&mut self, rows: u16, cols: u16) {
        let rows = rows.max(1);
        let cols = cols.max(1);
        if (rows, cols) != (self.rows, self.cols) {
            self.term.resize(GridSize {
                rows: rows as usize,
                cols: cols as usize,
            });
            self.rows = rows;
            self.cols = cols;
        }
        self.force_full = true;
    }

    /// Forces the next [`take_dirty`](Self::take_dirty) to report a full redraw.
    pub fn mark_full(&mut self) {
        self.force_full = true;
    }

    /// Returns everything that changed since the previous call and clears it.
    ///
    /// The engine always reports the cursor's cell as damaged, so with no
    /// output and a cursor that stayed put the result is empty.
    pub fn take_dirty(&mut self) -> DirtyRegions {
        let damage = match self.term.damage() {
            TermDamage::Full => DirtyRegions::Full,
            TermDamage::Partial(lines) => DirtyRegions::from_spans(lines.map(|d| DirtyRow {
                row: d.line as u16,
                left: d.left as u16,
                right: d.right as u16,
            })),
        };
        self.term.reset_damage();

        let cursor = self.cursor();
        let moved = (cursor.row, cursor.col) != self.cursor_at;
        self.cursor_at = (cursor.row, cursor.col);
        let fed = std::mem::take(&mut self.fed);

        if std::mem::take(&mut self.force_full) {
            return DirtyRegions::Full;
        }
        if !fed && !moved {
            return DirtyRegions::default();
        }
        damage.clip(self.rows, self.cols)
    }

    fn cell_at(&self, row: u16, col: u16) -> Cell {
        if row >= self.rows || col >= self.cols {
            return Cell::default();
        }
        let cell = &self.term.grid()[Line(row as i32)][Column(col as usize)];
        convert_cell(cell, self.term.colors())
    }

    /// Cells of `row` from `left` to `right` inclusive.
    pub fn row_cells(&self, row: u16, left: u16, right: u16) -> Vec<Cell> {
        (left..=right.min(self.cols.saturating_sub(1)))
            .map(|col| self.cell_at(row, col))
            .collect()
    }

    pub fn cursor(&self) -> CursorState {
        let content = self.term.renderable_content();
        let cursor = &content.cursor;
        CursorState {
            row: cursor.point.line.0.max(0) as u16,
            col: cursor.point.column.0 as u16,
            shape: convert_cursor_shape(cursor.shape),
            visible: cursor.shape != AlacCursorShape::Hidden,
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        let mut cells = Vec::with_capacity(self.rows as usize * self.cols as usize);
        for row in 0..self.rows {
            for col in 0..self.cols {
                cells.push(self.cell_at(row, col));
            }
        }
        Snapshot {
            rows: self.rows,
            cols: self.cols,
            cells,
            cursor: self.cursor(),
        }
    }

    /// Title set by the program through OSC 0/2, if any.
    pub fn title(&self) -> Option<String> {
        self.signals.lock().title.clone()
    }

    /// True once per bell rung since the last call.
    pub fn take_bell(&mut self) -> bool {
        std::mem::take(&mut self.signals.lock().bell)
    }

    /// Answers to terminal queries (cursor position reports and the like)
    /// that must be written back to the program.
    pub fn take_replies(&mut self) -> Vec<String> {
        std::mem::take(&mut self.signals.lock().replies)
    }

    pub fn clear_history(&mut self) {
        self.term.grid_mut().clear_history();
        self.force_full = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::{CellFlags, Rgb};
    use crate::screen::CursorShape;

    fn model(rows: u16, cols: u16) -> ScreenModel {
        ScreenModel::new(rows, cols, DEFAULT_HISTORY_LIMIT)
    }

    #[test]
    fn test_new_model_dimensions() {
        let screen = model(24, 80);
        assert_eq!((screen.rows(), screen.cols()), (24, 80));
        let snap = screen.snapshot();
        assert_eq!(snap.cells.len(), 24 * 80);
    }

    #[test]
    fn test_zero_size_is_clamped() {
        let screen = model(0, 0);
        assert_eq!((screen.rows(), screen.cols()), (1, 1));
    }

    #[test]
    fn test_feed_text() {
        let mut screen = model(24, 80);
        screen.feed(b"hello");
        let snap = screen.snapshot();
        assert_eq!(snap.row_text(0), "hello");
        assert_eq!(snap.cursor.row, 0);
        assert_eq!(snap.cursor.col, 5);
        assert!(snap.cursor.visible);
        assert_eq!(snap.cursor.shape, CursorShape::Block);
    }

    #[test]
    fn test_wrapping_moves_cursor() {
        let mut screen = model(5, 10);
        screen.feed(b"0123456789AB");
        let cursor = screen.cursor();
        assert_eq!((cursor.row, cursor.col), (1, 2));
    }

    #[test]
    fn test_sgr_attributes() {
        let mut screen = model(24, 80);
        screen.feed(b"\x1b[1;31mR");
        let cell = screen.snapshot().cell(0, 0).clone();
        assert_eq!(cell.ch, 'R');
        assert!(cell.flags.contains(CellFlags::BOLD));
        assert_ne!(cell.fg, Rgb::WHITE);
    }

    #[test]
    fn test_new_model_starts_full_dirty() {
        let mut screen = model(24, 80);
        assert!(screen.take_dirty().is_full());
        assert!(screen.take_dirty().is_empty());
    }

    #[test]
    fn test_output_dirties_only_touched_rows() {
        let mut screen = model(24, 80);
        let _ = screen.take_dirty();

        screen.feed(b"hi");
        match screen.take_dirty() {
            DirtyRegions::Rows(rows) => {
                assert_eq!(rows.len(), 1, "{rows:?}");
                assert_eq!(rows[0].row, 0);
                assert!(rows[0].left <= 1 && rows[0].right >= 1);
            }
            DirtyRegions::Full => panic!("expected a partial redraw"),
        }
        assert!(screen.take_dirty().is_empty());
    }

    #[test]
    fn test_line_of_output_is_not_full_redraw() {
        let mut screen = model(24, 80);
        screen.feed(b"$ ");
        let _ = screen.take_dirty();

        screen.feed(b"echo hi\r\nhi\r\n$ ");
        match screen.take_dirty() {
            DirtyRegions::Rows(rows) => {
                let touched: Vec<u16> = rows.iter().map(|r| r.row).collect();
                assert_eq!(touched, vec![0, 1, 2]);
            }
            DirtyRegions::Full => panic!("expected a partial redraw"),
        }
    }

    #[test]
    fn test_idle_screen_is_clean() {
        let mut screen = model(24, 80);
        screen.feed(b"$ ");
        let _ = screen.take_dirty();
        assert!(screen.take_dirty().is_empty());
        assert!(screen.take_dirty().is_empty());

        screen.feed(b"x");
        assert!(!screen.take_dirty().is_empty());
        assert!(screen.take_dirty().is_empty());
    }

    #[test]
    fn test_resize_marks_full() {
        let mut screen = model(24, 80);
        let _ = screen.take_dirty();
        screen.resize(40, 120);
        assert_eq!((screen.rows(), screen.cols()), (40, 120));
        assert!(screen.take_dirty().is_full());
        assert_eq!(screen.snapshot().cells.len(), 40 * 120);
    }

    #[test]
    fn test_resize_to_same_size_still_full() {
        let mut screen = model(24, 80);
        let _ = screen.take_dirty();
        screen.resize(24, 80);
        assert!(screen.take_dirty().is_full());
    }

    #[test]
    fn test_row_cells_span() {
        let mut screen = model(4, 10);
        screen.feed(b"abcdef");
        let cells: String = screen.row_cells(0, 2, 4).iter().map(|c| c.ch).collect();
        assert_eq!(cells, "cde");
        assert_eq!(screen.row_cells(0, 8, 200).len(), 2);
    }

    #[test]
    fn test_title_from_osc() {
        let mut screen = model(24, 80);
        screen.feed(b"\x1b]0;build\x07");
        assert_eq!(screen.title().as_deref(), Some("build"));
    }

    #[test]
    fn test_bell_is_consumed() {
        let mut screen = model(24, 80);
        assert!(!screen.take_bell());
        screen.feed(b"\x07");
        assert!(screen.take_bell());
        assert!(!screen.take_bell());
    }

    #[test]
    fn test_cursor_position_report_reply() {
        let mut screen = model(24, 80);
        screen.feed(b"\x1b[6n");
        let replies = screen.take_replies();
        assert_eq!(replies.len(), 1);
        assert!(replies[0].starts_with("\x1b["));
        assert!(screen.take_replies().is_empty());
    }

    #[test]
    fn test_hidden_cursor() {
        let mut screen = model(24, 80);
        screen.feed(b"\x1b[?25l");
        assert!(!screen.cursor().visible);
    }
}
