//! Wire protocol between the server and its clients.
//!
//! Every message is a JSON object tagged by `type`, followed by a single NUL
//! byte. Cell data travels as 16 bytes per cell in the layout of
//! [`encode_cell`].

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use weft_mux::{PaneId, Rect, WindowId};
use weft_vt::{Cell, CellFlags, CursorShape, Rgb};

/// Largest frame the server accepts from a client.
pub const MAX_CLIENT_FRAME: usize = 1 << 20;
/// Largest frame a client accepts from the server. Full frames of big
/// terminals are large.
pub const MAX_SERVER_FRAME: usize = 64 << 20;

pub const CELL_BYTES: usize = 16;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("frame is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("malformed message: {0}")]
    Json(#[from] serde_json::Error),
    #[error("frame exceeds {0} bytes")]
    Oversized(usize),
    #[error("connection closed mid-frame")]
    Truncated,
    #[error("connection error: {0}")]
    Io(#[from] std::io::Error),
}

/// Messages sent by a client.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// Become an attached client of `session` (or the first session).
    Attach {
        session: Option<String>,
        rows: u16,
        cols: u16,
        #[serde(default)]
        detach_others: bool,
    },
    /// Raw bytes typed by the user, for the active pane.
    Input { data: Vec<u8> },
    Resize { rows: u16, cols: u16 },
    /// Run one command line. `pane` is the pane the command was typed in,
    /// for invocations from inside a pane.
    Command { line: String, pane: Option<PaneId> },
    Detach,
}

/// Messages sent by the server.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "type")]
pub enum ServerMessage {
    /// Everything a client needs to paint the window from scratch.
    FullFrame {
        window: WindowId,
        rows: u16,
        cols: u16,
        panes: Vec<PaneFrame>,
        cursor: CursorPos,
        status: Option<String>,
    },
    /// Changed row segments since the last frame of the same window.
    Update {
        window: WindowId,
        rows: Vec<RowUpdate>,
        cursor: CursorPos,
        status: Option<String>,
    },
    CommandResult { ok: bool, output: String },
    Bell,
    Detached { reason: String },
}

/// One pane's visible cells, row-major, clipped to `rect`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct PaneFrame {
    pub pane: PaneId,
    pub rect: Rect,
    pub cells: Vec<u8>,
}

/// A run of cells starting at `(row, col)` of a pane, in pane coordinates.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct RowUpdate {
    pub pane: PaneId,
    pub row: u16,
    pub col: u16,
    pub cells: Vec<u8>,
}

/// Cursor position in window coordinates.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct CursorPos {
    pub row: u16,
    pub col: u16,
    pub visible: bool,
    pub shape: String,
}

impl CursorPos {
    pub fn hidden() -> Self {
        Self {
            row: 0,
            col: 0,
            visible: false,
            shape: cursor_shape_str(CursorShape::Hidden).to_string(),
        }
    }
}

/// Encode a single cell into 16 bytes.
///
/// Layout (little-endian where applicable):
/// - bytes 0..4:  codepoint as u32 LE
/// - bytes 4..7:  foreground RGB
/// - bytes 7..10: background RGB
/// - byte 10:     CellFlags bits
/// - byte 11:     cell width (0, 1, or 2)
/// - bytes 12..16: reserved
pub fn encode_cell(cell: &Cell) -> [u8; CELL_BYTES] {
    let mut buf = [0u8; CELL_BYTES];
    buf[0..4].copy_from_slice(&(cell.ch as u32).to_le_bytes());
    buf[4] = cell.fg.r;
    buf[5] = cell.fg.g;
    buf[6] = cell.fg.b;
    buf[7] = cell.bg.r;
    buf[8] = cell.bg.g;
    buf[9] = cell.bg.b;
    buf[10] = cell.flags.bits();
    buf[11] = cell.width;
    buf
}

/// Inverse of [`encode_cell`]. Invalid codepoints decode as a space.
pub fn decode_cell(bytes: &[u8]) -> Option<Cell> {
    let bytes: &[u8; CELL_BYTES] = bytes.get(..CELL_BYTES)?.try_into().ok()?;
    let code = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    Some(Cell {
        ch: char::from_u32(code).unwrap_or(' '),
        fg: Rgb::new(bytes[4], bytes[5], bytes[6]),
        bg: Rgb::new(bytes[7], bytes[8], bytes[9]),
        flags: CellFlags::from_bits_truncate(bytes[10]),
        width: bytes[11],
    })
}

pub fn encode_cells(cells: &[Cell]) -> Vec<u8> {
    let mut data = Vec::with_capacity(cells.len() * CELL_BYTES);
    for cell in cells {
        data.extend_from_slice(&encode_cell(cell));
    }
    data
}

pub fn cursor_shape_str(shape: CursorShape) -> &'static str {
    match shape {
        CursorShape::Block => "block",
        CursorShape::Underline => "underline",
        CursorShape::Bar => "bar",
        CursorShape::Hidden => "hidden",
    }
}

/// Serializes a message and appends the terminator.
pub fn encode_frame<T: Serialize>(message: &T) -> Result<Vec<u8>, ProtocolError> {
    let mut bytes = serde_json::to_vec(message)?;
    bytes.push(0);
    Ok(bytes)
}

/// Parses one frame body, terminator already stripped.
pub fn decode_frame<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ProtocolError> {
    let text = std::str::from_utf8(bytes)?;
    Ok(serde_json::from_str(text)?)
}

pub async fn write_frame<W, T>(writer: &mut W, message: &T) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let bytes = encode_frame(message)?;
    writer.write_all(&bytes).await?;
    writer.flush().await?;
    Ok(())
}

/// Reads the next frame. Returns `None` on a clean end of stream, that is,
/// one that falls between frames.
pub async fn read_frame<R, T>(reader: &mut R, max: usize) -> Result<Option<T>, ProtocolError>
where
    R: AsyncBufRead + Unpin,
    T: DeserializeOwned,
{
    let mut buf = Vec::new();
    let n = (&mut *reader)
        .take(max as u64 + 1)
        .read_until(0, &mut buf)
        .await?;
    if n == 0 {
        return Ok(None);
    }
    if buf.last() != Some(&0) {
        if buf.len() > max {
            return Err(ProtocolError::Oversized(max));
        }
        return Err(ProtocolError::Truncated);
    }
    buf.pop();
    decode_frame(&buf).map(Some)
}
