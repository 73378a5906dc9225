mod arbiter;
mod client;
mod command;
mod commands;
mod config;
mod connection;
mod crash;
mod error;
mod format;
mod io_thread;
mod ipc;
mod keys;
mod logging;
mod options;
mod painter;
mod paths;
mod render;
mod state;
mod status;

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use log::{info, LevelFilter};

use arbiter::{run_server, ServerOptions};

#[derive(Parser, Debug)]
#[command(name = "weft", version, about = "A terminal multiplexer")]
struct Cli {
    /// Control socket path.
    #[arg(short = 'S', value_name = "socket-path")]
    socket: Option<PathBuf>,
    /// Config file run at server start, instead of ~/.weft.conf.
    #[arg(short = 'f', value_name = "file")]
    config: Option<PathBuf>,
    /// Log file. The server always logs, by default to its runtime directory.
    #[arg(long, value_name = "file")]
    log: Option<PathBuf>,
    #[arg(long, value_name = "level", default_value = "info", value_parser = logging::parse_level)]
    log_level: LevelFilter,
    #[command(subcommand)]
    command: Option<Sub>,
}

#[derive(Subcommand, Debug)]
enum Sub {
    /// Run the server in the foreground.
    StartServer,
    /// Attach to a running server.
    #[command(alias = "a", alias = "attach-session")]
    Attach {
        #[arg(short = 't', value_name = "target-session")]
        target: Option<String>,
        /// Detach every other client.
        #[arg(short = 'd')]
        detach_others: bool,
    },
    /// Any other command runs once on the server.
    #[command(external_subcommand)]
    Other(Vec<String>),
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let socket = paths::socket_path(cli.socket.as_deref());
    match &cli.command {
        Some(Sub::StartServer) => start_server(&cli, socket),
        Some(Sub::Attach {
            target,
            detach_others,
        }) => attach(&cli, &socket, target.clone(), *detach_others),
        Some(Sub::Other(words)) => one_shot(&cli, &socket, words),
        None => match client::ensure_server(&socket, &server_args(&cli)) {
            Ok(()) => attach(&cli, &socket, None, false),
            Err(e) => fail(&e),
        },
    }
}

fn fail(err: &dyn std::fmt::Display) -> ExitCode {
    eprintln!("weft: {err}");
    ExitCode::FAILURE
}

fn init_logging(path: &Path, level: LevelFilter) {
    if let Err(e) = logging::init_file_logger(path, level) {
        eprintln!("weft: cannot log to {}: {e}", path.display());
    }
}

/// Flags an auto-started server inherits from this invocation.
fn server_args(cli: &Cli) -> Vec<OsString> {
    let mut args = Vec::new();
    if let Some(config) = &cli.config {
        args.push("-f".into());
        args.push(config.clone().into_os_string());
    }
    if let Some(log) = &cli.log {
        args.push("--log".into());
        args.push(log.clone().into_os_string());
    }
    args.push("--log-level".into());
    args.push(cli.log_level.as_str().to_lowercase().into());
    args
}

fn no_cleanup() {}

fn start_server(cli: &Cli, socket: PathBuf) -> ExitCode {
    let log = cli.log.clone().unwrap_or_else(paths::default_log_file);
    init_logging(&log, cli.log_level);
    crash::install_panic_hook(no_cleanup);
    info!("weft {} starting, pid {}", env!("CARGO_PKG_VERSION"), std::process::id());

    let (config_file, config_required) = match &cli.config {
        Some(path) => (Some(path.clone()), true),
        None => (paths::default_config_file(), false),
    };
    let options = ServerOptions {
        socket,
        config_file,
        config_required,
    };
    match run_server(options) {
        Ok(()) => {
            info!("server stopped");
            ExitCode::SUCCESS
        }
        Err(e) => {
            crash::write_fatal(&e);
            fail(&e)
        }
    }
}

fn attach(cli: &Cli, socket: &Path, target: Option<String>, detach_others: bool) -> ExitCode {
    if paths::enclosing_pane().is_some() {
        return fail(&"refusing to attach from inside a pane (unset WEFT to force)");
    }
    if let Some(log) = &cli.log {
        init_logging(log, cli.log_level);
    }
    crash::install_panic_hook(client::restore_terminal);
    match client::attach(socket, target, detach_others) {
        Ok(reason) => {
            println!("[{reason}]");
            ExitCode::SUCCESS
        }
        Err(e) => fail(&e),
    }
}

fn one_shot(cli: &Cli, socket: &Path, words: &[String]) -> ExitCode {
    if let Some(log) = &cli.log {
        init_logging(log, cli.log_level);
    }
    let line = join_words(words);
    match client::send_command(socket, &line, paths::enclosing_pane()) {
        Ok((true, output)) => {
            print!("{output}");
            if !output.is_empty() && !output.ends_with('\n') {
                println!();
            }
            ExitCode::SUCCESS
        }
        Ok((false, output)) => fail(&output),
        Err(e) => fail(&e),
    }
}

fn is_plain(word: &str) -> bool {
    !word.is_empty()
        && !word.starts_with('#')
        && word
            .chars()
            .all(|c| c.is_alphanumeric() || "-_./:%+=,@^~$".contains(c))
}

/// Rebuilds a command line the server's tokenizer splits back into
/// `words`.
fn join_words(words: &[String]) -> String {
    words
        .iter()
        .map(|word| {
            if is_plain(word) {
                word.clone()
            } else {
                format!("'{}'", word.replace('\'', r"'\''"))
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
