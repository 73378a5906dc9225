use thiserror::Error;

use crate::geometry::Direction;
use crate::ids::{ClientId, PaneId, SessionId, WindowId};

/// A structural request named something that does not exist or cannot be
/// done. When one of these is returned, nothing was changed.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MuxError {
    #[error("pane {0} not found")]
    PaneNotFound(PaneId),
    #[error("window {0} not found")]
    WindowNotFound(WindowId),
    #[error("session {0} not found")]
    SessionNotFound(SessionId),
    #[error("client {0} not found")]
    ClientNotFound(ClientId),
    #[error("no window at index {0}")]
    NoSuchIndex(u32),
    #[error("pane {0} is already placed")]
    DuplicatePane(PaneId),
    #[error("split ratio {0} is outside (0, 1)")]
    InvalidRatio(f64),
    #[error("no pane {0} of the active pane")]
    NoNeighbor(Direction),
    #[error("window index {0} is in use")]
    IndexInUse(u32),
    #[error("window has only one pane")]
    SinglePane,
    #[error("no previously selected {0}")]
    NoPrevious(&'static str),
    #[error("duplicate session: {0}")]
    SessionExists(String),
}
