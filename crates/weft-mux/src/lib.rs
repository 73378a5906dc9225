//! weft-mux: the session, window and pane arrangement for weft.
//!
//! Pure data: split trees, geometry, and the client sizing rule. Processes
//! and screen contents live in `weft-pty` and `weft-vt`.

pub mod clients;
pub mod error;
pub mod geometry;
pub mod ids;
pub mod layout;
pub mod mux;
pub mod session;
pub mod window;

pub use clients::{Client, ClientRegistry};
pub use error::MuxError;
pub use geometry::{Direction, Orientation, Rect, Size};
pub use ids::{ClientId, PaneId, SessionId, WindowId};
pub use layout::{LayoutKind, LayoutNode, Removal};
pub use mux::{Mux, Teardown};
pub use session::Session;
pub use window::Window;
