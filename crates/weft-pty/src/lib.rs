//! weft-pty: pane processes for weft.
//!
//! A [`Pane`] pairs a child process running on a pty ([`PtyHandle`]) with
//! the [`weft_vt::ScreenModel`] its output is fed into. The [`PaneArena`]
//! owns every live pane; dropping a pane kills its process.

pub mod arena;
pub mod pane;
pub mod pty;

pub use arena::PaneArena;
pub use pane::{Pane, PaneState};
pub use pty::{default_shell, PaneCommand, PtyError, PtyHandle, SpawnError};
