//! The attach client and one-shot command sender.
//!
//! An attached client puts the terminal in raw mode, forwards typed bytes
//! to the server and paints whatever frames come back. `C-b` starts a
//! prefix key; the key after it runs a command instead of reaching the pane.

use std::ffi::OsString;
use std::io::{self, Read, Write};
use std::os::unix::net::UnixStream as StdUnixStream;
use std::os::unix::process::CommandExt;
use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};

use crossterm::cursor::{SetCursorStyle, Show};
use crossterm::execute;
use crossterm::style::{Attribute, SetAttribute};
use crossterm::terminal::{self, EnterAlternateScreen, LeaveAlternateScreen};
use log::{debug, info, warn};
use tokio::io::BufReader;
use tokio::net::unix::OwnedReadHalf;
use tokio::net::UnixStream;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;

use weft_mux::PaneId;

use crate::error::ClientError;
use crate::ipc::{read_frame, write_frame, ClientMessage, ProtocolError, ServerMessage, MAX_SERVER_FRAME};
use crate::painter::Painter;

/// `C-b`
pub const PREFIX: u8 = 0x02;

const START_TIMEOUT: Duration = Duration::from_secs(5);
const START_POLL: Duration = Duration::from_millis(20);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyAction {
    Input(Vec<u8>),
    Command(String),
    Detach,
}

fn binding(key: u8) -> Option<KeyAction> {
    let command = match key {
        b'd' => return Some(KeyAction::Detach),
        b'c' => "new-window",
        b'%' => "split-window -h",
        b'"' => "split-window -v",
        b'o' => "select-pane -t :.+",
        b';' => "last-pane",
        b'n' => "next-window",
        b'p' => "previous-window",
        b'l' => "last-window",
        b'x' => "kill-pane",
        b'&' => "kill-window",
        b'z' => "resize-pane -Z",
        b' ' => "next-layout",
        b'{' => "swap-pane -U",
        b'}' => "swap-pane -D",
        b'!' => "break-pane",
        // C-o
        0x0f => "rotate-window",
        b'0'..=b'9' => {
            return Some(KeyAction::Command(format!(
                "select-window -t :{}",
                char::from(key)
            )))
        }
        _ => return None,
    };
    Some(KeyAction::Command(command.to_string()))
}

fn arrow(seq: &[u8]) -> Option<&'static str> {
    match seq {
        b"[A" | b"OA" => Some("select-pane -U"),
        b"[B" | b"OB" => Some("select-pane -D"),
        b"[C" | b"OC" => Some("select-pane -R"),
        b"[D" | b"OD" => Some("select-pane -L"),
        _ => None,
    }
}

/// Splits typed bytes into pane input and prefix commands. The prefix state
/// survives across reads.
#[derive(Debug, Default)]
pub struct PrefixReader {
    armed: bool,
}

impl PrefixReader {
    pub fn feed(&mut self, data: &[u8]) -> Vec<KeyAction> {
        let mut actions = Vec::new();
        let mut pending = Vec::new();
        let mut i = 0;
        while i < data.len() {
            let byte = data[i];
            i += 1;
            if !self.armed {
                if byte == PREFIX {
                    self.armed = true;
                } else {
                    pending.push(byte);
                }
                continue;
            }
            self.armed = false;
            if byte == PREFIX {
                // C-b C-b sends a literal C-b
                pending.push(PREFIX);
                continue;
            }
            let action = if byte == 0x1b {
                let command = data.get(i..i + 2).and_then(arrow);
                if command.is_some() {
                    i += 2;
                }
                command.map(|c| KeyAction::Command(c.to_string()))
            } else {
                binding(byte)
            };
            if let Some(action) = action {
                if !pending.is_empty() {
                    actions.push(KeyAction::Input(std::mem::take(&mut pending)));
                }
                actions.push(action);
            }
        }
        if !pending.is_empty() {
            actions.push(KeyAction::Input(pending));
        }
        actions
    }
}

/// Puts the terminal back the way the shell expects it. Safe to call when
/// nothing was changed.
pub fn restore_terminal() {
    let _ = execute!(
        io::stdout(),
        SetAttribute(Attribute::Reset),
        SetCursorStyle::DefaultUserShape,
        Show,
        LeaveAlternateScreen
    );
    let _ = terminal::disable_raw_mode();
}

struct TerminalGuard;

impl TerminalGuard {
    fn enter() -> Result<Self, ClientError> {
        terminal::enable_raw_mode().map_err(ClientError::Terminal)?;
        if let Err(e) = execute!(io::stdout(), EnterAlternateScreen) {
            restore_terminal();
            return Err(ClientError::Terminal(e));
        }
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        restore_terminal();
    }
}

enum Wake {
    Server(ServerMessage),
    Closed(Option<ProtocolError>),
    Stdin(Vec<u8>),
    StdinClosed,
    Resize,
}

fn runtime() -> Result<tokio::runtime::Runtime, ClientError> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(ClientError::Io)
}

async fn connect(socket: &Path) -> Result<UnixStream, ClientError> {
    UnixStream::connect(socket).await.map_err(|e| match e.kind() {
        io::ErrorKind::NotFound | io::ErrorKind::ConnectionRefused => {
            ClientError::NoServer(socket.to_path_buf())
        }
        _ => ClientError::Io(e),
    })
}

/// Starts `weft start-server` in the background unless a server already
/// accepts on `socket`, then waits for it to come up.
pub fn ensure_server(socket: &Path, server_args: &[OsString]) -> Result<(), ClientError> {
    if StdUnixStream::connect(socket).is_ok() {
        return Ok(());
    }
    let exe = std::env::current_exe()?;
    info!("starting server on {}", socket.display());
    std::process::Command::new(exe)
        .arg("-S")
        .arg(socket)
        .args(server_args)
        .arg("start-server")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .process_group(0)
        .spawn()?;
    let deadline = Instant::now() + START_TIMEOUT;
    while Instant::now() < deadline {
        if StdUnixStream::connect(socket).is_ok() {
            return Ok(());
        }
        std::thread::sleep(START_POLL);
    }
    Err(ClientError::StartTimeout)
}

/// Runs one command line on the server. Returns whether it succeeded and
/// its output.
pub fn send_command(socket: &Path, line: &str, pane: Option<PaneId>) -> Result<(bool, String), ClientError> {
    runtime()?.block_on(async {
        let (read_half, mut writer) = connect(socket).await?.into_split();
        write_frame(
            &mut writer,
            &ClientMessage::Command {
                line: line.to_string(),
                pane,
            },
        )
        .await?;
        let mut reader = BufReader::new(read_half);
        loop {
            match read_frame::<_, ServerMessage>(&mut reader, MAX_SERVER_FRAME).await? {
                Some(ServerMessage::CommandResult { ok, output }) => return Ok((ok, output)),
                Some(ServerMessage::Detached { reason }) => return Err(ClientError::Refused(reason)),
                Some(_) => {}
                None => return Err(ClientError::Closed),
            }
        }
    })
}

/// Attaches the terminal to `session` (or the first session) until
/// detached. Returns the reason the server gave.
pub fn attach(socket: &Path, session: Option<String>, detach_others: bool) -> Result<String, ClientError> {
    runtime()?.block_on(run_attached(socket, session, detach_others))
}

async fn run_attached(
    socket: &Path,
    session: Option<String>,
    detach_others: bool,
) -> Result<String, ClientError> {
    let (read_half, mut writer) = connect(socket).await?.into_split();
    let (cols, rows) = terminal::size().map_err(ClientError::Terminal)?;
    write_frame(
        &mut writer,
        &ClientMessage::Attach {
            session,
            rows,
            cols,
            detach_others,
        },
    )
    .await?;

    let (wake_tx, mut wakes) = mpsc::channel(64);
    tokio::spawn(server_reader(read_half, wake_tx.clone()));
    start_stdin_thread(wake_tx)?;
    let mut winch = signal(SignalKind::window_change())?;

    let _guard = TerminalGuard::enter()?;
    let mut painter = Painter::new(io::stdout());
    let mut keys = PrefixReader::default();
    loop {
        let wake = tokio::select! {
            Some(wake) = wakes.recv() => wake,
            _ = winch.recv() => Wake::Resize,
        };
        let outgoing = match wake {
            Wake::Server(ServerMessage::Detached { reason }) => return Ok(reason),
            Wake::Server(ServerMessage::Bell) => {
                let mut out = io::stdout();
                out.write_all(b"\x07").and_then(|_| out.flush()).map_err(ClientError::Terminal)?;
                continue;
            }
            Wake::Server(ServerMessage::CommandResult { ok, output }) => {
                if !ok || !output.is_empty() {
                    painter.message(&output).map_err(ClientError::Terminal)?;
                }
                continue;
            }
            Wake::Server(frame) => {
                painter.paint(&frame).map_err(ClientError::Terminal)?;
                continue;
            }
            Wake::Closed(Some(e)) => return Err(e.into()),
            Wake::Closed(None) => return Err(ClientError::Closed),
            Wake::Stdin(data) => keys
                .feed(&data)
                .into_iter()
                .map(|action| match action {
                    KeyAction::Input(data) => ClientMessage::Input { data },
                    KeyAction::Command(line) => ClientMessage::Command { line, pane: None },
                    KeyAction::Detach => ClientMessage::Detach,
                })
                .collect(),
            Wake::StdinClosed => vec![ClientMessage::Detach],
            Wake::Resize => {
                let (cols, rows) = terminal::size().map_err(ClientError::Terminal)?;
                debug!("terminal resized to {cols}x{rows}");
                vec![ClientMessage::Resize { rows, cols }]
            }
        };
        for message in &outgoing {
            write_frame(&mut writer, message).await?;
        }
    }
}

async fn server_reader(read_half: OwnedReadHalf, wakes: mpsc::Sender<Wake>) {
    let mut reader = BufReader::new(read_half);
    loop {
        let wake = match read_frame::<_, ServerMessage>(&mut reader, MAX_SERVER_FRAME).await {
            Ok(Some(message)) => Wake::Server(message),
            Ok(None) => Wake::Closed(None),
            Err(e) => Wake::Closed(Some(e)),
        };
        let closed = matches!(wake, Wake::Closed(_));
        if wakes.send(wake).await.is_err() || closed {
            return;
        }
    }
}

/// Blocking stdin reads on their own thread, like the pane readers.
fn start_stdin_thread(wakes: mpsc::Sender<Wake>) -> io::Result<()> {
    std::thread::Builder::new()
        .name("stdin".to_string())
        .spawn(move || {
            let mut stdin = io::stdin().lock();
            let mut buf = [0u8; 4096];
            loop {
                match stdin.read(&mut buf) {
                    Ok(0) => break,
                    Ok(n) => {
                        if wakes.blocking_send(Wake::Stdin(buf[..n].to_vec())).is_err() {
                            return;
                        }
                    }
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => {
                        warn!("stdin read failed: {e}");
                        break;
                    }
                }
            }
            let _ = wakes.blocking_send(Wake::StdinClosed);
        })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arbiter::{run_server, ServerOptions};
    use pretty_assertions::assert_eq;

    fn command(line: &str) -> KeyAction {
        KeyAction::Command(line.to_string())
    }

    #[test]
    fn test_plain_input_passes_through() {
        let mut keys = PrefixReader::default();
        assert_eq!(keys.feed(b"ls\r"), vec![KeyAction::Input(b"ls\r".to_vec())]);
    }

    #[test]
    fn test_prefix_commands() {
        let mut keys = PrefixReader::default();
        assert_eq!(
            keys.feed(b"ab\x02%cd"),
            vec![
                KeyAction::Input(b"ab".to_vec()),
                command("split-window -h"),
                KeyAction::Input(b"cd".to_vec()),
            ]
        );
        assert_eq!(keys.feed(b"\x02d"), vec![KeyAction::Detach]);
        assert_eq!(keys.feed(b"\x023"), vec![command("select-window -t :3")]);
        assert_eq!(keys.feed(b"\x02\x1b[A"), vec![command("select-pane -U")]);
    }

    #[test]
    fn test_prefix_split_across_reads() {
        let mut keys = PrefixReader::default();
        assert_eq!(keys.feed(b"x\x02"), vec![KeyAction::Input(b"x".to_vec())]);
        assert_eq!(keys.feed(b"c"), vec![command("new-window")]);
    }

    #[test]
    fn test_double_prefix_and_unbound_keys() {
        let mut keys = PrefixReader::default();
        assert_eq!(keys.feed(b"\x02\x02"), vec![KeyAction::Input(vec![PREFIX])]);
        // unbound keys after the prefix are swallowed
        assert_eq!(keys.feed(b"\x02Qa"), vec![KeyAction::Input(b"a".to_vec())]);
    }

    #[test]
    fn test_no_server() {
        let dir = tempfile::tempdir().unwrap();
        let socket = dir.path().join("none");
        assert!(matches!(
            send_command(&socket, "ls", None),
            Err(ClientError::NoServer(_))
        ));
    }

    #[test]
    fn test_one_shot_commands_against_server() {
        let dir = tempfile::tempdir().unwrap();
        let socket = dir.path().join("sock");
        let options = ServerOptions {
            socket: socket.clone(),
            config_file: None,
            config_required: false,
        };
        let server = std::thread::spawn(move || run_server(options));

        let deadline = Instant::now() + Duration::from_secs(10);
        while StdUnixStream::connect(&socket).is_err() {
            assert!(Instant::now() < deadline, "server did not start");
            std::thread::sleep(START_POLL);
        }

        let (ok, output) = send_command(&socket, "new-window -d", None).unwrap();
        assert!(ok, "{output}");
        let (ok, output) = send_command(&socket, "list-windows", None).unwrap();
        assert!(ok);
        assert_eq!(output.lines().count(), 2);
        assert!(output.starts_with("0: "));

        let (ok, output) = send_command(&socket, "frobnicate", None).unwrap();
        assert!(!ok);
        assert!(!output.is_empty());

        let (ok, _) = send_command(&socket, "kill-server", None).unwrap();
        assert!(ok);
        assert!(server.join().unwrap().is_ok());
    }
}
