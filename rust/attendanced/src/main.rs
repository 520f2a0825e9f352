mod backup;
mod class_draft;
mod error;
mod ipc;
mod keys;
mod report;
mod roster;
mod session;
mod settings;
mod store;

use clap::Parser;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "attendanced", version, about = "Classroom attendance sidecar")]
struct Cli {
    /// Workspace directory to open at startup
    #[arg(long, env = "ATTENDANCED_WORKSPACE")]
    workspace: Option<PathBuf>,
}

fn init_logging() {
    // stdout carries responses; logs must go to stderr.
    let filter = EnvFilter::try_from_env("ATTENDANCED_LOG")
        .unwrap_or_else(|_| EnvFilter::new("attendanced=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(false)
        .init();
}

fn main() {
    init_logging();
    let cli = Cli::parse();

    let mut state = ipc::AppState::default();
    if let Some(path) = cli.workspace {
        match store::open_store(&path) {
            Ok(opened) => {
                tracing::info!(workspace = %path.display(), "workspace opened at startup");
                state.store = Some(opened);
                state.workspace = Some(path);
            }
            Err(e) => {
                tracing::warn!(workspace = %path.display(), error = ?e, "could not open startup workspace");
            }
        }
    }

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(e) => {
                tracing::error!(error = %e, "stdin closed");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let req: ipc::Request = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                // No id to echo back.
                tracing::warn!(error = %e, "unparseable request");
                let resp = ipc::err("", "bad_json", e.to_string(), None);
                let _ = writeln!(stdout, "{}", resp);
                let _ = stdout.flush();
                continue;
            }
        };

        tracing::debug!(id = %req.id, method = %req.method, "request");
        let resp = ipc::handle_request(&mut state, req);
        let _ = writeln!(
            stdout,
            "{}",
            serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string())
        );
        let _ = stdout.flush();
    }
}
