use std::fmt;

use serde::{Deserialize, Serialize};

/// A terminal size in cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Size {
    pub rows: u16,
    pub cols: u16,
}

impl Size {
    pub const fn new(rows: u16, cols: u16) -> Self {
        Self { rows, cols }
    }

    /// Length along the axis an orientation divides.
    pub fn along(self, orientation: Orientation) -> u16 {
        match orientation {
            Orientation::Horizontal => self.cols,
            Orientation::Vertical => self.rows,
        }
    }
}

impl Default for Size {
    fn default() -> Self {
        Self::new(24, 80)
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.cols, self.rows)
    }
}

/// A rectangle of cells, origin at the top-left of the window.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub row: u16,
    pub col: u16,
    pub rows: u16,
    pub cols: u16,
}

impl Rect {
    pub const fn new(row: u16, col: u16, rows: u16, cols: u16) -> Self {
        Self {
            row,
            col,
            rows,
            cols,
        }
    }

    pub const fn from_size(size: Size) -> Self {
        Self::new(0, 0, size.rows, size.cols)
    }

    pub fn size(&self) -> Size {
        Size::new(self.rows, self.cols)
    }

    /// One past the last row.
    pub fn bottom(&self) -> u32 {
        self.row as u32 + self.rows as u32
    }

    /// One past the last column.
    pub fn right(&self) -> u32 {
        self.col as u32 + self.cols as u32
    }

    pub fn area(&self) -> u32 {
        self.rows as u32 * self.cols as u32
    }

    pub fn contains(&self, row: u16, col: u16) -> bool {
        row >= self.row && (row as u32) < self.bottom() && col >= self.col && (col as u32) < self.right()
    }

    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let top = self.row.max(other.row);
        let left = self.col.max(other.col);
        let bottom = self.bottom().min(other.bottom());
        let right = self.right().min(other.right());
        if bottom <= top as u32 || right <= left as u32 {
            return None;
        }
        Some(Rect::new(
            top,
            left,
            (bottom - top as u32) as u16,
            (right - left as u32) as u16,
        ))
    }

    /// Overlap length of the two spans perpendicular to `orientation`'s axis.
    pub(crate) fn cross_overlap(&self, other: &Rect, orientation: Orientation) -> u32 {
        let (a0, a1, b0, b1) = match orientation {
            Orientation::Horizontal => (self.row as u32, self.bottom(), other.row as u32, other.bottom()),
            Orientation::Vertical => (self.col as u32, self.right(), other.col as u32, other.right()),
        };
        a1.min(b1).saturating_sub(a0.max(b0))
    }
}

/// How a split arranges its children.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Orientation {
    /// Side by side, left to right. Columns are divided.
    Horizontal,
    /// Stacked, top to bottom. Rows are divided.
    Vertical,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    Left,
    Right,
    Up,
    Down,
}

impl Direction {
    pub fn axis(self) -> Orientation {
        match self {
            Direction::Left | Direction::Right => Orientation::Horizontal,
            Direction::Up | Direction::Down => Orientation::Vertical,
        }
    }

    /// Left and Up point toward lower indices.
    pub fn is_backward(self) -> bool {
        matches!(self, Direction::Left | Direction::Up)
    }

    pub fn opposite(self) -> Direction {
        match self {
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Direction::Left => "left",
            Direction::Right => "right",
            Direction::Up => "up",
            Direction::Down => "down",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intersection() {
        let a = Rect::new(0, 0, 10, 10);
        let b = Rect::new(5, 5, 10, 10);
        assert_eq!(a.intersection(&b), Some(Rect::new(5, 5, 5, 5)));
        let c = Rect::new(0, 10, 10, 10);
        assert_eq!(a.intersection(&c), None);
    }

    #[test]
    fn test_contains_edges() {
        let r = Rect::new(2, 3, 4, 5);
        assert!(r.contains(2, 3));
        assert!(r.contains(5, 7));
        assert!(!r.contains(6, 7));
        assert!(!r.contains(5, 8));
    }

    #[test]
    fn test_cross_overlap() {
        let left = Rect::new(0, 0, 10, 5);
        let right = Rect::new(4, 5, 10, 5);
        assert_eq!(left.cross_overlap(&right, Orientation::Horizontal), 6);
    }
}
