//! The command language: one line of words in, one [`Command`] out.
//!
//! Lines are split into words with shell-like quoting, then parsed by clap
//! into a closed enum. Anything clap rejects never reaches the server state.

use std::path::PathBuf;

use clap::error::ErrorKind;
use clap::{Parser, Subcommand};
use thiserror::Error;

use weft_mux::{LayoutKind, MuxError};
use weft_pty::{PtyError, SpawnError};

use crate::options::OptionError;

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("{0}")]
    Parse(String),
    #[error("unknown command: {0}")]
    Unknown(String),
    #[error("{0}")]
    Tokenize(&'static str),
    #[error("can't find {0}")]
    Target(String),
    #[error(transparent)]
    Mux(#[from] MuxError),
    #[error(transparent)]
    Spawn(#[from] SpawnError),
    #[error(transparent)]
    Pty(#[from] PtyError),
    #[error(transparent)]
    Option(#[from] OptionError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("no current client")]
    NoClient,
    #[error("{0}")]
    Failed(String),
}

#[derive(Debug, Parser)]
#[command(
    name = "weft",
    no_binary_name = true,
    disable_help_flag = true,
    disable_help_subcommand = true,
    disable_version_flag = true
)]
struct CommandLine {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, PartialEq, Subcommand)]
pub enum Command {
    #[command(alias = "new")]
    NewSession {
        #[arg(short = 's', value_name = "name")]
        name: Option<String>,
        #[arg(short = 'n', value_name = "window-name")]
        window_name: Option<String>,
        #[arg(short = 'c', value_name = "start-directory")]
        cwd: Option<PathBuf>,
        /// Do not switch the current client to the new session.
        #[arg(short = 'd')]
        detached: bool,
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },
    KillSession {
        #[arg(short = 't', value_name = "target-session")]
        target: Option<String>,
    },
    #[command(alias = "rename")]
    RenameSession {
        #[arg(short = 't', value_name = "target-session")]
        target: Option<String>,
        name: String,
    },
    #[command(alias = "has")]
    HasSession {
        #[arg(short = 't', value_name = "target-session")]
        target: Option<String>,
    },
    #[command(alias = "ls")]
    ListSessions,
    #[command(alias = "neww")]
    NewWindow {
        #[arg(short = 'n', value_name = "window-name")]
        name: Option<String>,
        #[arg(short = 'c', value_name = "start-directory")]
        cwd: Option<PathBuf>,
        #[arg(short = 'd')]
        detached: bool,
        #[arg(short = 't', value_name = "target-window")]
        target: Option<String>,
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },
    #[command(alias = "killw")]
    KillWindow {
        #[arg(short = 't', value_name = "target-window")]
        target: Option<String>,
    },
    #[command(alias = "renamew")]
    RenameWindow {
        #[arg(short = 't', value_name = "target-window")]
        target: Option<String>,
        name: String,
    },
    #[command(alias = "selectw")]
    SelectWindow {
        #[arg(short = 't', value_name = "target-window")]
        target: String,
    },
    #[command(alias = "next")]
    NextWindow,
    #[command(alias = "prev")]
    PreviousWindow,
    #[command(alias = "last")]
    LastWindow,
    #[command(alias = "movew")]
    MoveWindow {
        #[arg(short = 's', value_name = "src-window")]
        source: Option<String>,
        #[arg(short = 't', value_name = "dst-index")]
        target: String,
    },
    #[command(alias = "lsw")]
    ListWindows {
        #[arg(short = 't', value_name = "target-session")]
        target: Option<String>,
    },
    #[command(alias = "splitw", disable_help_flag = true)]
    SplitWindow {
        /// Side by side.
        #[arg(short = 'h', conflicts_with = "vertical")]
        horizontal: bool,
        /// Stacked; the default.
        #[arg(short = 'v')]
        vertical: bool,
        /// Size of the new pane, in percent of the split pane.
        #[arg(short = 'p', value_name = "percentage", value_parser = clap::value_parser!(u8).range(1..100))]
        percent: Option<u8>,
        #[arg(short = 'c', value_name = "start-directory")]
        cwd: Option<PathBuf>,
        #[arg(short = 't', value_name = "target-pane")]
        target: Option<String>,
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },
    #[command(alias = "killp")]
    KillPane {
        #[arg(short = 't', value_name = "target-pane")]
        target: Option<String>,
    },
    #[command(alias = "renamep")]
    RenamePane {
        #[arg(short = 't', value_name = "target-pane")]
        target: Option<String>,
        name: String,
    },
    #[command(alias = "selectp")]
    SelectPane {
        #[arg(short = 'L', group = "direction")]
        left: bool,
        #[arg(short = 'R', group = "direction")]
        right: bool,
        #[arg(short = 'U', group = "direction")]
        up: bool,
        #[arg(short = 'D', group = "direction")]
        down: bool,
        #[arg(short = 't', value_name = "target-pane", group = "direction")]
        target: Option<String>,
    },
    #[command(alias = "lastp")]
    LastPane,
    #[command(alias = "swapp")]
    SwapPane {
        #[arg(short = 'U', conflicts_with = "down")]
        up: bool,
        #[arg(short = 'D')]
        down: bool,
    },
    #[command(alias = "rotatew")]
    RotateWindow {
        #[arg(short = 'U', conflicts_with = "down")]
        up: bool,
        #[arg(short = 'D')]
        down: bool,
    },
    #[command(alias = "breakp")]
    BreakPane {
        #[arg(short = 'd')]
        detached: bool,
        #[arg(short = 't', value_name = "target-pane")]
        target: Option<String>,
    },
    #[command(alias = "resizep")]
    ResizePane {
        #[arg(short = 'L', value_name = "cells")]
        left: Option<u16>,
        #[arg(short = 'R', value_name = "cells")]
        right: Option<u16>,
        #[arg(short = 'U', value_name = "cells")]
        up: Option<u16>,
        #[arg(short = 'D', value_name = "cells")]
        down: Option<u16>,
        #[arg(short = 'Z')]
        zoom: bool,
        #[arg(short = 't', value_name = "target-pane")]
        target: Option<String>,
    },
    #[command(alias = "selectl")]
    SelectLayout {
        layout: LayoutKind,
    },
    #[command(alias = "nextl")]
    NextLayout,
    #[command(alias = "prevl")]
    PreviousLayout,
    #[command(alias = "send")]
    SendKeys {
        /// Send the words as text, without key name lookup.
        #[arg(short = 'l')]
        literal: bool,
        #[arg(short = 't', value_name = "target-pane")]
        target: Option<String>,
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        keys: Vec<String>,
    },
    #[command(alias = "clearhist")]
    ClearHistory {
        #[arg(short = 't', value_name = "target-pane")]
        target: Option<String>,
    },
    #[command(alias = "lsp")]
    ListPanes {
        #[arg(short = 't', value_name = "target-window")]
        target: Option<String>,
    },
    #[command(alias = "display")]
    DisplayMessage {
        #[arg(short = 'p')]
        print: bool,
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        message: Vec<String>,
    },
    #[command(alias = "set")]
    SetOption {
        /// Accepted for familiarity; every option is global.
        #[arg(short = 'g')]
        global: bool,
        name: String,
        value: String,
    },
    #[command(alias = "show")]
    ShowOptions {
        #[arg(short = 'g')]
        global: bool,
        name: Option<String>,
    },
    #[command(alias = "source")]
    SourceFile {
        path: PathBuf,
    },
    #[command(alias = "detach")]
    DetachClient {
        /// Detach every other client instead.
        #[arg(short = 'a')]
        others: bool,
    },
    #[command(alias = "switchc")]
    SwitchClient {
        #[arg(short = 't', value_name = "target-session")]
        target: String,
    },
    KillServer,
}

impl Command {
    /// Whether the command creates a session when none exists yet.
    pub fn needs_session(&self) -> bool {
        !matches!(
            self,
            Command::NewSession { .. }
                | Command::ListSessions
                | Command::HasSession { .. }
                | Command::KillServer
                | Command::SetOption { .. }
                | Command::ShowOptions { .. }
                | Command::SourceFile { .. }
        )
    }
}

/// Parses one line. Blank lines and comments give `None`.
pub fn parse_command(line: &str) -> Result<Option<Command>, CommandError> {
    let words = tokenize(line)?;
    if words.is_empty() {
        return Ok(None);
    }
    match CommandLine::try_parse_from(&words) {
        Ok(parsed) => Ok(Some(parsed.command)),
        Err(e) if e.kind() == ErrorKind::InvalidSubcommand => Err(CommandError::Unknown(words[0].clone())),
        Err(e) => Err(CommandError::Parse(clap_message(&e))),
    }
}

/// The first line of a clap error, without its `error: ` prefix.
fn clap_message(error: &clap::Error) -> String {
    let text = error.to_string();
    let first = text.lines().next().unwrap_or_default();
    first.strip_prefix("error: ").unwrap_or(first).to_string()
}

/// Splits a line into words. Single quotes take everything literally,
/// double quotes and bare words honor backslash escapes, and a `#` at the
/// start of a bare word comments out the rest of the line.
pub fn tokenize(line: &str) -> Result<Vec<String>, CommandError> {
    let mut words = Vec::new();
    let mut current: Option<String> = None;
    let mut chars = line.chars();

    while let Some(ch) = chars.next() {
        match ch {
            c if c.is_whitespace() => {
                if let Some(word) = current.take() {
                    words.push(word);
                }
            }
            '#' if current.is_none() => break,
            '\'' => {
                let word = current.get_or_insert_with(String::new);
                loop {
                    match chars.next() {
                        Some('\'') => break,
                        Some(c) => word.push(c),
                        None => return Err(CommandError::Tokenize("unterminated single quote")),
                    }
                }
            }
            '"' => {
                let word = current.get_or_insert_with(String::new);
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\\') => match chars.next() {
                            Some(c) => word.push(c),
                            None => return Err(CommandError::Tokenize("unterminated double quote")),
                        },
                        Some(c) => word.push(c),
                        None => return Err(CommandError::Tokenize("unterminated double quote")),
                    }
                }
            }
            '\\' => match chars.next() {
                Some(c) => current.get_or_insert_with(String::new).push(c),
                None => return Err(CommandError::Tokenize("trailing backslash")),
            },
            c => current.get_or_insert_with(String::new).push(c),
        }
    }
    if let Some(word) = current {
        words.push(word);
    }
    Ok(words)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(line: &str) -> Command {
        parse_command(line).unwrap().unwrap()
    }

    #[test]
    fn test_tokenize_quoting() {
        assert_eq!(
            tokenize(r#"send-keys "echo hi" 'a \b' c\ d"#).unwrap(),
            vec!["send-keys", "echo hi", r"a \b", "c d"]
        );
        assert_eq!(tokenize(r##"set status-left "#S \"x\"""##).unwrap(), vec!["set", "status-left", "#S \"x\""]);
        assert_eq!(tokenize("  # just a comment").unwrap(), Vec::<String>::new());
        assert_eq!(tokenize("neww # trailing").unwrap(), vec!["neww"]);
        assert_eq!(tokenize("rename a#b").unwrap(), vec!["rename", "a#b"]);
        assert_eq!(tokenize("rename ''").unwrap(), vec!["rename", ""]);
    }

    #[test]
    fn test_tokenize_errors() {
        assert!(matches!(tokenize("send 'oops"), Err(CommandError::Tokenize(_))));
        assert!(matches!(tokenize("send \"oops"), Err(CommandError::Tokenize(_))));
        assert!(matches!(tokenize("send oops\\"), Err(CommandError::Tokenize(_))));
    }

    #[test]
    fn test_aliases_match_long_names() {
        assert_eq!(parse("splitw -h"), parse("split-window -h"));
        assert_eq!(parse("neww -n logs"), parse("new-window -n logs"));
        assert_eq!(parse("killp"), Command::KillPane { target: None });
        assert_eq!(parse("selectl tiled"), Command::SelectLayout { layout: LayoutKind::Tiled });
        assert_eq!(parse("ls"), Command::ListSessions);
        assert_eq!(parse("next"), Command::NextWindow);
        assert_eq!(
            parse("renamep -t 1 logs"),
            Command::RenamePane {
                target: Some("1".to_string()),
                name: "logs".to_string(),
            }
        );
    }

    #[test]
    fn test_flags() {
        assert_eq!(
            parse("split-window -h -c /tmp top -d 1"),
            Command::SplitWindow {
                horizontal: true,
                vertical: false,
                percent: None,
                cwd: Some(PathBuf::from("/tmp")),
                target: None,
                command: vec!["top".to_string(), "-d".to_string(), "1".to_string()],
            }
        );
        assert_eq!(
            parse("resize-pane -L 5 -Z"),
            Command::ResizePane {
                left: Some(5),
                right: None,
                up: None,
                down: None,
                zoom: true,
                target: None,
            }
        );
        assert_eq!(
            parse("selectp -t :.+"),
            Command::SelectPane {
                left: false,
                right: false,
                up: false,
                down: false,
                target: Some(":.+".to_string()),
            }
        );
        assert_eq!(
            parse("send-keys -t %3 ls Enter"),
            Command::SendKeys {
                literal: false,
                target: Some("%3".to_string()),
                keys: vec!["ls".to_string(), "Enter".to_string()],
            }
        );
    }

    #[test]
    fn test_unknown_command() {
        assert!(matches!(
            parse_command("frobnicate now"),
            Err(CommandError::Unknown(name)) if name == "frobnicate"
        ));
    }

    #[test]
    fn test_bad_arguments() {
        assert!(matches!(parse_command("selectl diagonal"), Err(CommandError::Parse(_))));
        assert!(matches!(parse_command("split-window -h -v"), Err(CommandError::Parse(_))));
        assert!(matches!(parse_command("select-pane -L -R"), Err(CommandError::Parse(_))));
        assert!(matches!(parse_command("resize-pane -L many"), Err(CommandError::Parse(_))));
        assert!(matches!(parse_command("send-keys"), Err(CommandError::Parse(_))));
    }

    #[test]
    fn test_blank_line() {
        assert_eq!(parse_command("   ").unwrap(), None);
    }
}
