use crate::cell::Cell;

/// Shape of the terminal cursor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CursorShape {
    Block,
    Underline,
    Bar,
    Hidden,
}

/// Cursor position within a pane's grid, plus how it should be drawn.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CursorState {
    pub row: u16,
    pub col: u16,
    pub shape: CursorShape,
    pub visible: bool,
}

/// A full copy of a pane's visible grid, used for complete redraws.
#[derive(Clone, Debug)]
pub struct Snapshot {
    pub rows: u16,
    pub cols: u16,
    /// Row-major, `rows * cols` entries.
    pub cells: Vec<Cell>,
    pub cursor: CursorState,
}

impl Snapshot {
    pub fn row(&self, row: u16) -> &[Cell] {
        let start = row as usize * self.cols as usize;
        &self.cells[start..start + self.cols as usize]
    }

    pub fn cell(&self, row: u16, col: u16) -> &Cell {
        &self.row(row)[col as usize]
    }

    /// The row as plain text, trailing blanks trimmed.
    pub fn row_text(&self, row: u16) -> String {
        let text: String = self
            .row(row)
            .iter()
            .filter(|c| c.width != 0)
            .map(|c| c.ch)
            .collect();
        text.trim_end().to_string()
    }
}

/// An inclusive column span of one row that changed since the last redraw.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DirtyRow {
    pub row: u16,
    pub left: u16,
    pub right: u16,
}

/// What changed on a screen since the dirty state was last taken.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DirtyRegions {
    /// Everything must be redrawn.
    Full,
    /// Only these spans changed, sorted by row with one entry per row.
    /// Empty means nothing changed.
    Rows(Vec<DirtyRow>),
}

impl Default for DirtyRegions {
    fn default() -> Self {
        DirtyRegions::Rows(Vec::new())
    }
}

impl DirtyRegions {
    pub fn is_empty(&self) -> bool {
        matches!(self, DirtyRegions::Rows(rows) if rows.is_empty())
    }

    pub fn is_full(&self) -> bool {
        matches!(self, DirtyRegions::Full)
    }

    /// Builds a normalized row list: one span per row covering every input
    /// span for that row, sorted by row.
    pub fn from_spans(spans: impl IntoIterator<Item = DirtyRow>) -> Self {
        let mut regions = DirtyRegions::default();
        for span in spans {
            regions.add(span);
        }
        regions
    }

    /// Adds one span, widening an existing entry for the same row.
    pub fn add(&mut self, span: DirtyRow) {
        let DirtyRegions::Rows(rows) = self else {
            return;
        };
        match rows.binary_search_by_key(&span.row, |r| r.row) {
            Ok(i) => {
                rows[i].left = rows[i].left.min(span.left);
                rows[i].right = rows[i].right.max(span.right);
            }
            Err(i) => rows.insert(i, span),
        }
    }

    /// Folds another set of changes into this one.
    pub fn merge(&mut self, other: DirtyRegions) {
        match other {
            DirtyRegions::Full => *self = DirtyRegions::Full,
            DirtyRegions::Rows(spans) => {
                for span in spans {
                    self.add(span);
                }
            }
        }
    }

    /// Drops spans outside a `rows x cols` grid and clamps the rest to it.
    pub fn clip(self, rows: u16, cols: u16) -> Self {
        match self {
            DirtyRegions::Full => DirtyRegions::Full,
            DirtyRegions::Rows(spans) => DirtyRegions::Rows(
                spans
                    .into_iter()
                    .filter(|s| s.row < rows && s.left < cols)
                    .map(|s| DirtyRow {
                        right: s.right.min(cols.saturating_sub(1)),
                        ..s
                    })
                    .collect(),
            ),
        }
    }
}
