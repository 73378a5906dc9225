use std::io::Read;

use log::{debug, warn};
use weft_mux::{PaneId, Size};
use weft_vt::ScreenModel;

use crate::pty::{PaneCommand, PtyError, PtyHandle, SpawnError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaneState {
    /// Spawned, no output seen yet.
    Starting,
    Running,
    Exited(u32),
}

/// A child process on a pty, paired with the screen model its output is
/// fed into.
pub struct Pane {
    id: PaneId,
    pty: PtyHandle,
    screen: ScreenModel,
    size: Size,
    state: PaneState,
    command: PaneCommand,
    /// Set by `rename-pane`; wins over anything the program sets.
    name: Option<String>,
}

impl Pane {
    pub fn spawn(
        id: PaneId,
        command: PaneCommand,
        size: Size,
        history_limit: usize,
    ) -> Result<Self, SpawnError> {
        let size = Size::new(size.rows.max(1), size.cols.max(1));
        let pty = PtyHandle::spawn(&command, size.rows, size.cols)?;
        let screen = ScreenModel::new(size.rows, size.cols, history_limit);
        Ok(Self {
            id,
            pty,
            screen,
            size,
            state: PaneState::Starting,
            command,
            name: None,
        })
    }

    pub fn id(&self) -> PaneId {
        self.id
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn state(&self) -> PaneState {
        self.state
    }

    pub fn is_exited(&self) -> bool {
        matches!(self.state, PaneState::Exited(_))
    }

    pub fn command(&self) -> &PaneCommand {
        &self.command
    }

    pub fn process_id(&self) -> Option<u32> {
        self.pty.process_id()
    }

    /// An empty name clears it.
    pub fn set_name(&mut self, name: &str) {
        self.name = Some(name.to_string()).filter(|n| !n.is_empty());
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The name given by the user, else the title set by the program, else
    /// the program name.
    pub fn title(&self) -> String {
        if let Some(name) = &self.name {
            return name.clone();
        }
        match self.screen.title() {
            Some(title) if !title.is_empty() => title,
            _ => self.command.program_name().to_string(),
        }
    }

    /// Extracts the pty reader for use in a dedicated I/O thread.
    pub fn take_reader(&mut self) -> Option<Box<dyn Read + Send>> {
        self.pty.take_reader()
    }

    /// Feeds child output into the screen model and writes any device
    /// replies it produced back to the child.
    pub fn feed(&mut self, bytes: &[u8]) {
        if self.state == PaneState::Starting {
            self.state = PaneState::Running;
        }
        self.screen.feed(bytes);
        for reply in self.screen.take_replies() {
            if let Err(e) = self.pty.write(reply.as_bytes()) {
                debug!("pane {} reply dropped: {e}", self.id);
            }
        }
    }

    /// Writes user input to the child. Input to an exited pane is dropped.
    pub fn write_input(&mut self, data: &[u8]) -> Result<(), PtyError> {
        if self.is_exited() {
            return Ok(());
        }
        self.pty.write(data)
    }

    /// Resizes the pty and the screen model. Returns false when the size was
    /// already current.
    pub fn resize(&mut self, size: Size) -> Result<bool, PtyError> {
        let size = Size::new(size.rows.max(1), size.cols.max(1));
        if size == self.size {
            return Ok(false);
        }
        self.size = size;
        self.screen.resize(size.rows, size.cols);
        if !self.is_exited() {
            self.pty.resize(size.rows, size.cols)?;
        }
        Ok(true)
    }

    pub fn screen(&self) -> &ScreenModel {
        &self.screen
    }

    pub fn screen_mut(&mut self) -> &mut ScreenModel {
        &mut self.screen
    }

    /// Checks whether the child has exited. Call once the reader has seen
    /// EOF; the answer can lag behind it by a moment.
    pub fn poll_exit(&mut self) -> Option<u32> {
        if let PaneState::Exited(code) = self.state {
            return Some(code);
        }
        let status = self.pty.poll_exit()?;
        let code = status.exit_code();
        debug!("pane {} exited with {code}", self.id);
        self.state = PaneState::Exited(code);
        Some(code)
    }

    /// Marks the pane dead even though the child has not been reaped, for
    /// when its pty is gone.
    pub fn force_exited(&mut self) {
        if !self.is_exited() {
            warn!("pane {} lost its pty", self.id);
            self.pty.kill();
            self.state = PaneState::Exited(self.poll_exit().unwrap_or(1));
        }
    }
}
