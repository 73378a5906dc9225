//! Paints server frames onto the client's terminal.

use std::collections::HashMap;
use std::io::{self, Write};

use crossterm::cursor::{Hide, MoveTo, SetCursorStyle, Show};
use crossterm::style::{
    Attribute, Color, Print, SetAttribute, SetBackgroundColor, SetForegroundColor,
};
use crossterm::queue;
use crossterm::terminal::{Clear, ClearType};

use weft_mux::{PaneId, Rect};
use weft_vt::{CellFlags, Rgb};

use crate::ipc::{decode_cell, CursorPos, PaneFrame, RowUpdate, ServerMessage, CELL_BYTES};

#[derive(Clone, Copy, PartialEq, Eq)]
struct Pen {
    fg: Rgb,
    bg: Rgb,
    flags: CellFlags,
}

const FLAG_ATTRIBUTES: [(CellFlags, Attribute); 8] = [
    (CellFlags::BOLD, Attribute::Bold),
    (CellFlags::ITALIC, Attribute::Italic),
    (CellFlags::UNDERLINE, Attribute::Underlined),
    (CellFlags::STRIKETHROUGH, Attribute::CrossedOut),
    (CellFlags::INVERSE, Attribute::Reverse),
    (CellFlags::DIM, Attribute::Dim),
    (CellFlags::HIDDEN, Attribute::Hidden),
    (CellFlags::BLINK, Attribute::SlowBlink),
];

fn color(rgb: Rgb) -> Color {
    Color::Rgb {
        r: rgb.r,
        g: rgb.g,
        b: rgb.b,
    }
}

/// Keeps the pane rectangles of the last full frame so updates in pane
/// coordinates land in the right place.
pub struct Painter<W: Write> {
    out: W,
    rects: HashMap<PaneId, Rect>,
    rows: u16,
    cols: u16,
    status: Option<String>,
    pen: Option<Pen>,
}

impl<W: Write> Painter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            rects: HashMap::new(),
            rows: 0,
            cols: 0,
            status: None,
            pen: None,
        }
    }

    /// Paints a frame or update. Other messages are ignored.
    pub fn paint(&mut self, message: &ServerMessage) -> io::Result<()> {
        match message {
            ServerMessage::FullFrame {
                rows,
                cols,
                panes,
                cursor,
                status,
                ..
            } => self.full_frame(*rows, *cols, panes, cursor, status.as_deref()),
            ServerMessage::Update {
                rows,
                cursor,
                status,
                ..
            } => self.update(rows, cursor, status.as_deref()),
            _ => Ok(()),
        }
    }

    fn full_frame(
        &mut self,
        rows: u16,
        cols: u16,
        panes: &[PaneFrame],
        cursor: &CursorPos,
        status: Option<&str>,
    ) -> io::Result<()> {
        self.rows = rows;
        self.cols = cols;
        self.rects = panes.iter().map(|p| (p.pane, p.rect)).collect();
        self.pen = None;
        queue!(self.out, Hide, SetAttribute(Attribute::Reset), Clear(ClearType::All))?;
        for frame in panes {
            let width = usize::from(frame.rect.cols);
            if width == 0 {
                continue;
            }
            for (i, row) in frame.cells.chunks(width * CELL_BYTES).enumerate() {
                let Ok(i) = u16::try_from(i) else { break };
                if i >= frame.rect.rows {
                    break;
                }
                self.cells(frame.rect.row + i, frame.rect.col, frame.rect.cols, row)?;
            }
        }
        self.status = status.map(str::to_string);
        self.status_line()?;
        self.cursor(cursor)
    }

    fn update(&mut self, rows: &[RowUpdate], cursor: &CursorPos, status: Option<&str>) -> io::Result<()> {
        queue!(self.out, Hide)?;
        for update in rows {
            let Some(rect) = self.rects.get(&update.pane).copied() else {
                continue;
            };
            if update.row >= rect.rows || update.col >= rect.cols {
                continue;
            }
            self.cells(
                rect.row + update.row,
                rect.col + update.col,
                rect.cols - update.col,
                &update.cells,
            )?;
        }
        if let Some(status) = status {
            self.status = Some(status.to_string());
            self.status_line()?;
        }
        self.cursor(cursor)
    }

    /// Shows `text` in place of the status line until the next status.
    pub fn message(&mut self, text: &str) -> io::Result<()> {
        let line: String = text
            .lines()
            .next()
            .unwrap_or_default()
            .chars()
            .take(usize::from(self.cols))
            .collect();
        self.pen = None;
        queue!(
            self.out,
            MoveTo(0, self.rows),
            SetAttribute(Attribute::Reset),
            SetAttribute(Attribute::Reverse),
            Print(format!("{line:<width$}", width = usize::from(self.cols))),
            SetAttribute(Attribute::Reset)
        )?;
        self.out.flush()
    }

    fn cells(&mut self, row: u16, col: u16, max: u16, bytes: &[u8]) -> io::Result<()> {
        queue!(self.out, MoveTo(col, row))?;
        let mut used = 0u16;
        for chunk in bytes.chunks_exact(CELL_BYTES) {
            let Some(cell) = decode_cell(chunk) else { break };
            // spacer behind a wide char
            if cell.width == 0 {
                continue;
            }
            let width = u16::from(cell.width);
            if used + width > max {
                break;
            }
            self.set_pen(Pen {
                fg: cell.fg,
                bg: cell.bg,
                flags: cell.flags,
            })?;
            queue!(self.out, Print(cell.ch))?;
            used += width;
        }
        Ok(())
    }

    fn set_pen(&mut self, pen: Pen) -> io::Result<()> {
        if self.pen == Some(pen) {
            return Ok(());
        }
        queue!(
            self.out,
            SetAttribute(Attribute::Reset),
            SetForegroundColor(color(pen.fg)),
            SetBackgroundColor(color(pen.bg))
        )?;
        for (flag, attribute) in FLAG_ATTRIBUTES {
            if pen.flags.contains(flag) {
                queue!(self.out, SetAttribute(attribute))?;
            }
        }
        self.pen = Some(pen);
        Ok(())
    }

    fn status_line(&mut self) -> io::Result<()> {
        let Some(status) = self.status.as_deref() else {
            return Ok(());
        };
        self.pen = None;
        queue!(
            self.out,
            MoveTo(0, self.rows),
            SetAttribute(Attribute::Reset),
            SetForegroundColor(Color::Black),
            SetBackgroundColor(Color::Green),
            Print(status),
            SetAttribute(Attribute::Reset)
        )
    }

    fn cursor(&mut self, cursor: &CursorPos) -> io::Result<()> {
        if cursor.visible {
            let style = match cursor.shape.as_str() {
                "underline" => SetCursorStyle::SteadyUnderScore,
                "bar" => SetCursorStyle::SteadyBar,
                _ => SetCursorStyle::SteadyBlock,
            };
            queue!(self.out, MoveTo(cursor.col, cursor.row), style, Show)?;
        }
        self.out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ipc::encode_cells;
    use weft_mux::WindowId;
    use weft_vt::Cell;

    fn text_cells(text: &str) -> Vec<u8> {
        let cells: Vec<Cell> = text
            .chars()
            .map(|ch| Cell {
                ch,
                ..Cell::default()
            })
            .collect();
        encode_cells(&cells)
    }

    fn frame(cells: Vec<u8>) -> ServerMessage {
        ServerMessage::FullFrame {
            window: WindowId::from_raw(1),
            rows: 2,
            cols: 4,
            panes: vec![PaneFrame {
                pane: PaneId::from_raw(3),
                rect: Rect::new(0, 0, 2, 4),
                cells,
            }],
            cursor: CursorPos::hidden(),
            status: Some("[0]".to_string()),
        }
    }

    #[test]
    fn test_full_frame_prints_cells_and_status() {
        let mut painter = Painter::new(Vec::new());
        painter.paint(&frame(text_cells("abcdefgh"))).unwrap();
        let out = String::from_utf8(painter.into_inner()).unwrap();
        assert!(out.contains("abcd"));
        assert!(out.contains("efgh"));
        assert!(out.contains("[0]"));
    }

    #[test]
    fn test_update_for_unknown_pane_is_skipped() {
        let mut painter = Painter::new(Vec::new());
        painter.paint(&frame(text_cells("        "))).unwrap();
        let before = painter.out.len();
        painter
            .paint(&ServerMessage::Update {
                window: WindowId::from_raw(1),
                rows: vec![RowUpdate {
                    pane: PaneId::from_raw(9),
                    row: 0,
                    col: 0,
                    cells: text_cells("zz"),
                }],
                cursor: CursorPos::hidden(),
                status: None,
            })
            .unwrap();
        let out = String::from_utf8(painter.into_inner()).unwrap();
        assert!(!out[before..].contains('z'));
    }

    #[test]
    fn test_update_is_clipped_to_pane() {
        let mut painter = Painter::new(Vec::new());
        painter.paint(&frame(text_cells("        "))).unwrap();
        let before = painter.out.len();
        painter
            .paint(&ServerMessage::Update {
                window: WindowId::from_raw(1),
                rows: vec![RowUpdate {
                    pane: PaneId::from_raw(3),
                    row: 1,
                    col: 2,
                    cells: text_cells("xyzw"),
                }],
                cursor: CursorPos::hidden(),
                status: None,
            })
            .unwrap();
        let out = String::from_utf8(painter.into_inner()).unwrap();
        let tail = &out[before..];
        assert!(tail.contains("xy"));
        assert!(!tail.contains('z'));
    }
}
