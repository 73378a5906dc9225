//! The server process: one task owning all state, woken by the listener,
//! the event channel, the render clock and signals.

use std::fs;
use std::io;
use std::os::unix::net::UnixStream as StdUnixStream;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Local;
use log::{debug, info, warn};
use tokio::net::{UnixListener, UnixStream};
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, Interval, MissedTickBehavior};

use crate::config;
use crate::connection::spawn_connection;
use crate::error::ServerError;
use crate::paths;
use crate::state::{Event, Server, OUTBOUND_QUEUE};

/// Capacity of the shared event channel. Pane reader threads block when it
/// is full.
const EVENT_QUEUE: usize = 1024;

/// How long writers get to flush their last messages on shutdown.
const FLUSH_TIMEOUT: Duration = Duration::from_millis(500);

#[derive(Debug, Clone)]
pub struct ServerOptions {
    pub socket: PathBuf,
    pub config_file: Option<PathBuf>,
    /// A missing config file is an error only when it was asked for.
    pub config_required: bool,
}

enum Wakeup {
    Accept(io::Result<UnixStream>),
    Event(Event),
    Tick,
    Terminate(&'static str),
    Hangup,
}

/// Runs the server until the last session ends or `kill-server`.
pub fn run_server(options: ServerOptions) -> Result<(), ServerError> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(ServerError::Runtime)?;
    runtime.block_on(serve(options))
}

async fn serve(options: ServerOptions) -> Result<(), ServerError> {
    let listener = bind(&options.socket)?;
    info!("listening on {}", options.socket.display());

    let (events_tx, mut events) = mpsc::channel(EVENT_QUEUE);
    let mut server = Server::new(options.socket.clone(), events_tx.clone());
    if let Some(path) = &options.config_file {
        load_config(&mut server, path, options.config_required);
    }
    if let Err(e) = server.ensure_default_session() {
        server.teardown("startup failed");
        return Err(e.into());
    }

    let mut terminate = signal(SignalKind::terminate())?;
    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut hangup = signal(SignalKind::hangup())?;
    let mut rate = server.options().render_rate;
    let mut ticker = render_interval(rate);
    let mut writers: Vec<JoinHandle<()>> = Vec::new();

    while !server.is_shutting_down() {
        let wakeup = tokio::select! {
            accepted = listener.accept() => Wakeup::Accept(accepted.map(|(stream, _)| stream)),
            Some(event) = events.recv() => Wakeup::Event(event),
            _ = ticker.tick() => Wakeup::Tick,
            _ = terminate.recv() => Wakeup::Terminate("SIGTERM"),
            _ = interrupt.recv() => Wakeup::Terminate("SIGINT"),
            _ = hangup.recv() => Wakeup::Hangup,
        };
        match wakeup {
            Wakeup::Accept(Ok(stream)) => {
                let (tx, rx) = mpsc::channel(OUTBOUND_QUEUE);
                let conn = server.add_connection(tx);
                writers.retain(|w| !w.is_finished());
                writers.push(spawn_connection(conn, stream, rx, events_tx.clone()));
            }
            Wakeup::Accept(Err(e)) => warn!("accept failed: {e}"),
            Wakeup::Event(event) => server.on_event(event),
            Wakeup::Tick => {
                server.poll_exits();
                server.render_tick(&Local::now());
                if server.options().render_rate != rate {
                    rate = server.options().render_rate;
                    ticker = render_interval(rate);
                }
            }
            Wakeup::Terminate(name) => {
                info!("{name} received");
                server.request_shutdown();
            }
            // the server outlives the terminal that started it
            Wakeup::Hangup => debug!("SIGHUP ignored"),
        }
    }

    server.teardown("server exited");
    for writer in writers {
        if tokio::time::timeout(FLUSH_TIMEOUT, writer).await.is_err() {
            debug!("writer did not flush in time");
        }
    }
    Ok(())
}

fn render_interval(rate: u32) -> Interval {
    let mut ticker = interval(Duration::from_secs(1) / rate.max(1));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker
}

fn load_config(server: &mut Server, path: &Path, required: bool) {
    match config::load_file(server, path) {
        Ok(errors) if errors.is_empty() => {}
        Ok(errors) => warn!("{} had {} failing line(s)", path.display(), errors.len()),
        Err(e) if e.kind() == io::ErrorKind::NotFound && !required => {
            debug!("no config at {}", path.display());
        }
        Err(e) => warn!("cannot read {}: {e}", path.display()),
    }
}

/// Binds the control socket. A socket file nobody accepts on is stale and
/// is replaced; a live one means another server owns it.
fn bind(path: &Path) -> Result<UnixListener, ServerError> {
    if let Some(dir) = path.parent() {
        let prepared = if dir == paths::runtime_dir() {
            paths::ensure_private_dir(dir)
        } else {
            fs::create_dir_all(dir)
        };
        prepared.map_err(|source| ServerError::Bind {
            path: path.to_path_buf(),
            source,
        })?;
    }
    match UnixListener::bind(path) {
        Ok(listener) => Ok(listener),
        Err(e) if e.kind() == io::ErrorKind::AddrInUse => {
            if StdUnixStream::connect(path).is_ok() {
                return Err(ServerError::AlreadyRunning(path.to_path_buf()));
            }
            info!("removing stale socket {}", path.display());
            fs::remove_file(path)?;
            UnixListener::bind(path).map_err(|source| ServerError::Bind {
                path: path.to_path_buf(),
                source,
            })
        }
        Err(source) => Err(ServerError::Bind {
            path: path.to_path_buf(),
            source,
        }),
    }
}
