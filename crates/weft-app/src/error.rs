use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures that stop the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("cannot listen on {}: {source}", path.display())]
    Bind { path: PathBuf, source: io::Error },
    #[error("server already running on {}", .0.display())]
    AlreadyRunning(PathBuf),
    #[error("failed to start runtime: {0}")]
    Runtime(io::Error),
    #[error("failed to create the first session: {0}")]
    FirstSession(#[from] crate::command::CommandError),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Failures of the attach client and one-shot commands.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("no server running on {}", .0.display())]
    NoServer(PathBuf),
    #[error("server did not start")]
    StartTimeout,
    #[error(transparent)]
    Protocol(#[from] crate::ipc::ProtocolError),
    #[error("terminal error: {0}")]
    Terminal(io::Error),
    #[error("server closed the connection")]
    Closed,
    #[error("{0}")]
    Refused(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}
