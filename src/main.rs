mod export;
mod ipc;
mod model;
mod pivot;
mod repo;
mod store;
mod tabular;

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Sidecar for the shuttle attendance UI: one JSON request per stdin line,
/// one JSON response per stdout line.
#[derive(Parser, Debug)]
#[command(name = "servisd", version)]
struct Args {
    /// Open this workspace directory before serving requests.
    #[arg(long)]
    workspace: Option<PathBuf>,

    /// Tracing filter, e.g. "info" or "servisd=debug".
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() {
    let args = Args::parse();

    // stdout carries the protocol; diagnostics go to stderr.
    let filter =
        EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(false)
        .init();

    let mut state = ipc::AppState {
        workspace: None,
        store: None,
    };

    if let Some(path) = args.workspace {
        match store::open_workspace(&path) {
            Ok(s) => {
                tracing::info!(workspace = %path.display(), "workspace opened at startup");
                state.workspace = Some(path);
                state.store = Some(s);
            }
            Err(e) => {
                tracing::error!(workspace = %path.display(), error = %e, "failed to open workspace");
            }
        }
    }

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(_) => break,
        };
        if line.trim().is_empty() {
            continue;
        }

        let req: ipc::Request = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                // Can't reply with an id we never parsed.
                tracing::warn!(error = %e, "dropping malformed request line");
                let _ = writeln!(
                    stdout,
                    "{}",
                    serde_json::json!({
                        "ok": false,
                        "error": { "code": "bad_json", "message": e.to_string() }
                    })
                );
                let _ = stdout.flush();
                continue;
            }
        };

        let resp = ipc::handle_request(&mut state, req);
        let _ = writeln!(
            stdout,
            "{}",
            serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string())
        );
        let _ = stdout.flush();
    }
}
