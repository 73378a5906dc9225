//! `#`-code and strftime expansion for status strings and `display-message`.

use std::fmt::Write;
use std::sync::OnceLock;

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Local};

/// What the `#` codes refer to.
#[derive(Debug, Clone, Default)]
pub struct FormatContext<'a> {
    /// `#S`
    pub session: &'a str,
    /// `#I`
    pub window_index: u32,
    /// `#W`
    pub window_name: &'a str,
    /// `#F`: `*` current, `-` last, `Z` zoomed
    pub window_flags: &'a str,
    /// `#P`: position of the pane in its window
    pub pane_index: usize,
    /// `#D`: pane id, as `%N`
    pub pane_id: String,
    /// `#T`
    pub pane_title: &'a str,
}

/// Expands time formats first, then `#` codes, so text substituted by a
/// `#` code is never run through strftime.
pub fn expand(format: &str, ctx: &FormatContext<'_>, now: &DateTime<Local>) -> String {
    let timed = strftime(format, now);
    let mut out = String::with_capacity(timed.len());
    let mut chars = timed.chars();
    while let Some(ch) = chars.next() {
        if ch != '#' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('S') => out.push_str(ctx.session),
            Some('I') => out.push_str(&ctx.window_index.to_string()),
            Some('W') => out.push_str(ctx.window_name),
            Some('F') => out.push_str(ctx.window_flags),
            Some('P') => out.push_str(&ctx.pane_index.to_string()),
            Some('D') => out.push_str(&ctx.pane_id),
            Some('T') => out.push_str(ctx.pane_title),
            Some('h') => out.push_str(hostname()),
            Some('#') => out.push('#'),
            Some(other) => {
                out.push('#');
                out.push(other);
            }
            None => out.push('#'),
        }
    }
    out
}

/// Formats `format` with chrono, or returns it untouched when it holds a
/// specifier chrono does not know.
fn strftime(format: &str, now: &DateTime<Local>) -> String {
    if !format.contains('%') {
        return format.to_string();
    }
    let items: Vec<Item<'_>> = StrftimeItems::new(format).collect();
    if items.iter().any(|item| matches!(item, Item::Error)) {
        return format.to_string();
    }
    let mut out = String::new();
    if write!(out, "{}", now.format_with_items(items.iter())).is_err() {
        return format.to_string();
    }
    out
}

/// Short host name, read once.
pub fn hostname() -> &'static str {
    static HOSTNAME: OnceLock<String> = OnceLock::new();
    HOSTNAME.get_or_init(|| {
        std::fs::read_to_string("/proc/sys/kernel/hostname")
            .ok()
            .or_else(|| std::env::var("HOSTNAME").ok())
            .map(|h| h.trim().split('.').next().unwrap_or_default().to_string())
            .filter(|h| !h.is_empty())
            .unwrap_or_else(|| "localhost".to_string())
    })
}
