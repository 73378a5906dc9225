//! weft-vt: per-pane screen model for weft.
//!
//! Wraps `alacritty_terminal` behind a small API: feed raw pty output, read
//! back a grid of cells with a cursor, and ask which rows changed since the
//! last redraw.

pub mod cell;
pub mod model;
mod palette;
pub mod screen;

pub use cell::{Cell, CellFlags, Rgb};
pub use model::{ScreenModel, DEFAULT_HISTORY_LIMIT};
pub use screen::{CursorShape, CursorState, DirtyRegions, DirtyRow, Snapshot};
