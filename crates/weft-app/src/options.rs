//! Server options, as changed by `set-option`.
//!
//! Every option has a fixed type. A value is parsed completely before it is
//! stored, so a rejected `set-option` leaves the previous value in place.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OptionError {
    #[error("unknown option: {0}")]
    Unknown(String),
    #[error("invalid value for {name}: {value} ({expected})")]
    InvalidValue {
        name: String,
        value: String,
        expected: &'static str,
    },
}

/// Which part of the server needs to react to a changed option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionEffect {
    None,
    /// The status line was turned on or off; window sizes change.
    StatusRows,
    BaseIndex,
    RenderRate,
    /// Only the status line text changes.
    Redraw,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    pub base_index: u32,
    pub bell: bool,
    pub default_shell: Option<String>,
    pub default_terminal: String,
    pub history_limit: usize,
    pub remain_on_exit: bool,
    pub status: bool,
    pub status_left: String,
    pub status_right: String,
    pub window_status_format: String,
    pub window_status_current_format: String,
    pub render_rate: u32,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            base_index: 0,
            bell: true,
            default_shell: None,
            default_terminal: "xterm-256color".to_string(),
            history_limit: weft_vt::DEFAULT_HISTORY_LIMIT,
            remain_on_exit: false,
            status: true,
            status_left: "[#S] ".to_string(),
            status_right: " %H:%M %d-%b-%y".to_string(),
            window_status_format: "#I:#W#F".to_string(),
            window_status_current_format: "#I:#W#F".to_string(),
            render_rate: 60,
        }
    }
}

pub const OPTION_NAMES: [&str; 12] = [
    "base-index",
    "bell",
    "default-shell",
    "default-terminal",
    "history-limit",
    "remain-on-exit",
    "render-rate",
    "status",
    "status-left",
    "status-right",
    "window-status-current-format",
    "window-status-format",
];

impl Options {
    /// Rows taken by the status line.
    pub fn status_rows(&self) -> u16 {
        u16::from(self.status)
    }

    pub fn set(&mut self, name: &str, value: &str) -> Result<OptionEffect, OptionError> {
        let effect = match name {
            "base-index" => {
                self.base_index = parse_number(name, value, 0, u32::MAX as u64)? as u32;
                OptionEffect::BaseIndex
            }
            "bell" => {
                self.bell = parse_bool(name, value)?;
                OptionEffect::None
            }
            "default-shell" => {
                self.default_shell = (!value.is_empty()).then(|| value.to_string());
                OptionEffect::None
            }
            "default-terminal" => {
                if value.is_empty() {
                    return Err(invalid(name, value, "a terminal name"));
                }
                self.default_terminal = value.to_string();
                OptionEffect::None
            }
            "history-limit" => {
                self.history_limit = parse_number(name, value, 0, 1_000_000)? as usize;
                OptionEffect::None
            }
            "remain-on-exit" => {
                self.remain_on_exit = parse_bool(name, value)?;
                OptionEffect::None
            }
            "render-rate" => {
                self.render_rate = parse_number(name, value, 1, 240)? as u32;
                OptionEffect::RenderRate
            }
            "status" => {
                self.status = parse_bool(name, value)?;
                OptionEffect::StatusRows
            }
            "status-left" => {
                self.status_left = value.to_string();
                OptionEffect::Redraw
            }
            "status-right" => {
                self.status_right = value.to_string();
                OptionEffect::Redraw
            }
            "window-status-format" => {
                self.window_status_format = value.to_string();
                OptionEffect::Redraw
            }
            "window-status-current-format" => {
                self.window_status_current_format = value.to_string();
                OptionEffect::Redraw
            }
            _ => return Err(OptionError::Unknown(name.to_string())),
        };
        Ok(effect)
    }

    pub fn get(&self, name: &str) -> Result<String, OptionError> {
        let value = match name {
            "base-index" => self.base_index.to_string(),
            "bell" => on_off(self.bell),
            "default-shell" => self.default_shell.clone().unwrap_or_default(),
            "default-terminal" => self.default_terminal.clone(),
            "history-limit" => self.history_limit.to_string(),
            "remain-on-exit" => on_off(self.remain_on_exit),
            "render-rate" => self.render_rate.to_string(),
            "status" => on_off(self.status),
            "status-left" => self.status_left.clone(),
            "status-right" => self.status_right.clone(),
            "window-status-format" => self.window_status_format.clone(),
            "window-status-current-format" => self.window_status_current_format.clone(),
            _ => return Err(OptionError::Unknown(name.to_string())),
        };
        Ok(value)
    }

    /// `name "value"` lines for every option, as `show-options` prints them.
    pub fn show(&self) -> String {
        OPTION_NAMES
            .iter()
            .filter_map(|name| self.get(name).ok().map(|v| format!("{name} {v:?}\n")))
            .collect()
    }
}

fn invalid(name: &str, value: &str, expected: &'static str) -> OptionError {
    OptionError::InvalidValue {
        name: name.to_string(),
        value: value.to_string(),
        expected,
    }
}

fn on_off(value: bool) -> String {
    if value { "on" } else { "off" }.to_string()
}

fn parse_bool(name: &str, value: &str) -> Result<bool, OptionError> {
    match value.to_ascii_lowercase().as_str() {
        "on" | "true" | "yes" | "1" => Ok(true),
        "off" | "false" | "no" | "0" => Ok(false),
        _ => Err(invalid(name, value, "on or off")),
    }
}

fn parse_number(name: &str, value: &str, min: u64, max: u64) -> Result<u64, OptionError> {
    match value.parse::<u64>() {
        Ok(n) if (min..=max).contains(&n) => Ok(n),
        _ => Err(invalid(name, value, "a number in range")),
    }
}
