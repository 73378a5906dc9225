use std::io::{Read, Write};
use std::path::PathBuf;

use log::{debug, warn};
use portable_pty::{
    native_pty_system, Child, ChildKiller, CommandBuilder, ExitStatus, MasterPty, PtySize,
};
use thiserror::Error;

/// Creating a pane's process failed. Nothing was spawned.
#[derive(Debug, Error)]
pub enum SpawnError {
    #[error("failed to open pty: {0}")]
    OpenPty(String),
    #[error("failed to spawn {command}: {reason}")]
    Command { command: String, reason: String },
    #[error("failed to attach to pty: {0}")]
    Io(String),
    #[error("empty command")]
    EmptyCommand,
}

/// I/O on a live pty failed.
#[derive(Debug, Error)]
pub enum PtyError {
    #[error("pty I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("pty resize failed: {0}")]
    Resize(String),
}

/// What to run in a pane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaneCommand {
    pub argv: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub env: Vec<(String, String)>,
}

impl PaneCommand {
    pub fn new(argv: Vec<String>) -> Self {
        Self {
            argv,
            cwd: None,
            env: Vec::new(),
        }
    }

    /// The given shell, or `$SHELL`, or `/bin/sh`.
    pub fn shell(shell: Option<&str>) -> Self {
        let shell = match shell {
            Some(s) if !s.is_empty() => s.to_string(),
            _ => default_shell(),
        };
        Self::new(vec![shell])
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    /// Base name of the program, used to name new windows.
    pub fn program_name(&self) -> &str {
        self.argv
            .first()
            .map(|p| p.rsplit('/').next().unwrap_or(p))
            .unwrap_or("")
    }
}

/// Owns a portable-pty child process and the master side of its pty.
///
/// Dropping the handle kills the child and reaps it.
pub struct PtyHandle {
    master: Box<dyn MasterPty + Send>,
    reader: Option<Box<dyn Read + Send>>,
    writer: Box<dyn Write + Send>,
    child: Box<dyn Child + Send + Sync>,
    exit: Option<ExitStatus>,
}

impl PtyHandle {
    pub fn spawn(command: &PaneCommand, rows: u16, cols: u16) -> Result<Self, SpawnError> {
        let program = command.argv.first().ok_or(SpawnError::EmptyCommand)?;
        let pair = native_pty_system()
            .openpty(pty_size(rows, cols))
            .map_err(|e| SpawnError::OpenPty(e.to_string()))?;

        let mut cmd = CommandBuilder::new(program);
        cmd.args(&command.argv[1..]);
        match &command.cwd {
            Some(dir) => cmd.cwd(dir),
            None => {
                if let Ok(dir) = std::env::current_dir() {
                    cmd.cwd(dir);
                }
            }
        }
        for (key, value) in &command.env {
            cmd.env(key, value);
        }

        let child = pair
            .slave
            .spawn_command(cmd)
            .map_err(|e| SpawnError::Command {
                command: program.clone(),
                reason: e.to_string(),
            })?;
        // the child holds its own copy of the slave fd
        drop(pair.slave);

        let reader = pair
            .master
            .try_clone_reader()
            .map_err(|e| SpawnError::Io(format!("failed to clone reader: {e}")))?;
        let writer = pair
            .master
            .take_writer()
            .map_err(|e| SpawnError::Io(format!("failed to take writer: {e}")))?;

        debug!("spawned {:?} as pid {:?}", command.argv, child.process_id());
        Ok(Self {
            master: pair.master,
            reader: Some(reader),
            writer,
            child,
            exit: None,
        })
    }

    pub fn resize(&self, rows: u16, cols: u16) -> Result<(), PtyError> {
        self.master
            .resize(pty_size(rows, cols))
            .map_err(|e| PtyError::Resize(e.to_string()))
    }

    pub fn write(&mut self, data: &[u8]) -> Result<(), PtyError> {
        self.writer.write_all(data)?;
        self.writer.flush()?;
        Ok(())
    }

    /// Hands the blocking reader to whoever runs the read loop. Only the first
    /// call returns it.
    pub fn take_reader(&mut self) -> Option<Box<dyn Read + Send>> {
        self.reader.take()
    }

    pub fn process_id(&self) -> Option<u32> {
        self.child.process_id()
    }

    /// The exit status, once the child has exited. Never blocks.
    pub fn poll_exit(&mut self) -> Option<ExitStatus> {
        if self.exit.is_none() {
            match self.child.try_wait() {
                Ok(status) => self.exit = status,
                Err(e) => warn!("try_wait failed: {e}"),
            }
        }
        self.exit.clone()
    }

    pub fn kill(&mut self) {
        if self.poll_exit().is_some() {
            return;
        }
        if let Err(e) = self.child.kill() {
            debug!("kill failed: {e}");
        }
    }
}

impl Drop for PtyHandle {
    fn drop(&mut self) {
        if self.exit.is_some() {
            return;
        }
        self.kill();
        // reap so the child does not linger as a zombie
        if let Ok(status) = self.child.wait() {
            self.exit = Some(status);
        }
    }
}

fn pty_size(rows: u16, cols: u16) -> PtySize {
    PtySize {
        rows: rows.max(1),
        cols: cols.max(1),
        pixel_width: 0,
        pixel_height: 0,
    }
}

/// Returns the user's default shell, falling back to `/bin/sh`.
pub fn default_shell() -> String {
    std::env::var("SHELL")
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "/bin/sh".to_string())
}
