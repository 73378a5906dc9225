//! The status line and the values behind `#` codes.

use chrono::{DateTime, Local};

use weft_mux::{Mux, PaneId, Session, SessionId, Window, WindowId};
use weft_pty::PaneArena;

use crate::format::{expand, FormatContext};
use crate::options::Options;

/// Owned values for one window and pane, borrowed into a [`FormatContext`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormatValues {
    pub session: String,
    pub window_index: u32,
    pub window_name: String,
    pub window_flags: String,
    pub pane_index: usize,
    pub pane_id: String,
    pub pane_title: String,
}

impl FormatValues {
    pub fn context(&self) -> FormatContext<'_> {
        FormatContext {
            session: &self.session,
            window_index: self.window_index,
            window_name: &self.window_name,
            window_flags: &self.window_flags,
            pane_index: self.pane_index,
            pane_id: self.pane_id.clone(),
            pane_title: &self.pane_title,
        }
    }
}

/// `*` for the active window, `-` for the last one, then `Z` when zoomed.
pub fn window_flags(session: &Session, window: &Window) -> String {
    let mut flags = String::new();
    if session.active_window() == window.id() {
        flags.push('*');
    } else if session.last_window() == Some(window.id()) {
        flags.push('-');
    }
    if window.is_zoomed() {
        flags.push('Z');
    }
    flags
}

/// Values for `window`, and for `pane` or else the window's active pane.
pub fn format_values(mux: &Mux, panes: &PaneArena, window: WindowId, pane: Option<PaneId>) -> Option<FormatValues> {
    let win = mux.window(window)?;
    let session = mux.session(win.session())?;
    let pane = pane.filter(|p| win.contains(*p)).unwrap_or_else(|| win.active_pane());
    Some(FormatValues {
        session: session.name().to_string(),
        window_index: session.index_of(window).unwrap_or_default(),
        window_name: win.name().to_string(),
        window_flags: window_flags(session, win),
        pane_index: win.panes().iter().position(|p| *p == pane).unwrap_or_default(),
        pane_id: pane.to_string(),
        pane_title: panes.get(pane).map(|p| p.title()).unwrap_or_default(),
    })
}

/// The status line for `session`, exactly `width` columns wide. `None` when
/// the status line is off.
pub fn status_line(
    mux: &Mux,
    panes: &PaneArena,
    options: &Options,
    session: SessionId,
    width: u16,
    now: &DateTime<Local>,
) -> Option<String> {
    if !options.status {
        return None;
    }
    let sess = mux.session(session)?;
    let active = format_values(mux, panes, sess.active_window(), None)?;

    let mut left = expand(&options.status_left, &active.context(), now);
    let tabs: Vec<String> = sess
        .windows()
        .filter_map(|(_, window)| {
            let values = format_values(mux, panes, window, None)?;
            let format = if window == sess.active_window() {
                &options.window_status_current_format
            } else {
                &options.window_status_format
            };
            Some(expand(format, &values.context(), now))
        })
        .collect();
    left.push_str(&tabs.join(" "));
    let right = expand(&options.status_right, &active.context(), now);

    Some(compose(&left, &right, usize::from(width)))
}

/// Left part truncated, right part right-aligned when there is room for it.
fn compose(left: &str, right: &str, width: usize) -> String {
    let right_len = right.chars().count();
    let (right, right_len) = if right_len < width { (right, right_len) } else { ("", 0) };
    let mut line: String = left.chars().take(width - right_len).collect();
    let pad = width - right_len - line.chars().count();
    line.extend(std::iter::repeat(' ').take(pad));
    line.push_str(right);
    line
}
