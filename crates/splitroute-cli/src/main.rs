//! splitroute command-line front end.
//!
//! Every invocation is one access-control session: the list is loaded, the
//! given requests are applied in order, and on exit the selection is saved
//! and the tunnel service restarted if anything changed.

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use splitroute_core::clipboard::FileClipboard;
use splitroute_core::config::{Config, Directories};
use splitroute_core::provider::InventoryProvider;
use splitroute_core::reconcile;
use splitroute_core::service::CommandService;
use splitroute_core::store::{JsonStore, StoredState};
use splitroute_core::{Collaborators, Session, SessionOptions, TeardownReport};
use splitroute_types::{CandidateApp, Request, SessionUpdate};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod requests;

use requests::parse_request;

/// Per-app tunnel access control
#[derive(Parser)]
#[command(name = "splitroute")]
#[command(about = "Choose which applications may use the tunnel")]
#[command(version)]
#[command(after_help = "\
Examples:
  splitroute list                         Show candidate apps, selected first
  splitroute apply \"mode allow\" \"toggle org.example.app\"
  splitroute apply export                 Write the selection to the clipboard file
  splitroute apply \"sort install-time\" reverse
  echo invert | splitroute edit           Read requests from stdin, one per line

Requests:
  reload, all, none, invert, import, export, dismiss,
  mode <all|allow|deny>, toggle <id>, search <keyword>,
  sort <label|package-id|install-time|update-time>, reverse [on|off], system [on|off],
  or a JSON object such as {\"type\": \"select_all\"}
")]
struct Cli {
    /// Keep config, state and inventory under this directory
    #[arg(long, global = true, value_name = "DIR")]
    base_dir: Option<PathBuf>,

    /// Print session updates as JSON lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the candidate list and print it
    List,

    /// Apply requests given as arguments, in order
    Apply {
        #[arg(required = true, value_name = "REQUEST")]
        requests: Vec<String>,
    },

    /// Apply requests read from stdin, one per line
    Edit,
}

/// Set up logging with file output for debugging.
/// In debug builds, defaults to debug level and logs to a timestamped file.
/// In release builds, defaults to info level and logs to stderr.
fn setup_logging() {
    let default_level = if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("splitroute={default_level}")));

    if cfg!(debug_assertions) {
        let temp_dir = std::env::temp_dir();
        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let log_filename = format!("splitroute-{timestamp}.log");
        let log_path = temp_dir.join(&log_filename);

        #[cfg(unix)]
        {
            let symlink_path = temp_dir.join("splitroute.log");
            let _ = std::fs::remove_file(&symlink_path);
            let _ = std::os::unix::fs::symlink(&log_path, &symlink_path);
        }

        let file_appender = tracing_appender::rolling::never(&temp_dir, &log_filename);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        std::mem::forget(guard);

        let file_layer = fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(true)
            .with_line_number(true);

        let stderr_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(true)
            .with_target(true)
            .with_line_number(true);

        tracing_subscriber::registry()
            .with(file_layer)
            .with(stderr_layer)
            .with(filter)
            .init();

        eprintln!("Logging to: {} (and stderr)", log_path.display());
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr))
            .with(filter)
            .init();
    }
}

fn directories(base_dir: Option<PathBuf>) -> Result<Directories> {
    let dirs = match base_dir {
        Some(base) => Directories::with_base(base),
        None => Directories::new().context("Failed to determine splitroute directories")?,
    };
    dirs.ensure_exists()
        .with_context(|| format!("Failed to create {}", dirs.config.display()))?;
    Ok(dirs)
}

/// Mirror of the session's main list, kept in sync from `ListPatched`
#[derive(Default)]
struct Mirror {
    apps: Vec<CandidateApp>,
}

impl Mirror {
    fn apply(&mut self, update: &SessionUpdate) {
        if let SessionUpdate::ListPatched { ops, apps } = update {
            reconcile::apply(&mut self.apps, ops, apps);
        }
    }
}

/// Consume updates until the session is gone, echoing them as they arrive
async fn watch_updates(mut rx: mpsc::UnboundedReceiver<SessionUpdate>, json: bool) -> Mirror {
    let mut mirror = Mirror::default();

    while let Some(update) = rx.recv().await {
        mirror.apply(&update);

        if json {
            match serde_json::to_string(&update) {
                Ok(line) => println!("{line}"),
                Err(e) => eprintln!("Failed to encode update: {e}"),
            }
            continue;
        }

        match &update {
            SessionUpdate::ListPatched { ops, apps } => {
                println!("List: {} apps ({} changes)", apps.len(), ops.len());
            }
            SessionUpdate::RowToggled { id, selected, .. } => {
                let verb = if *selected { "Selected" } else { "Deselected" };
                println!("{verb} {id}");
            }
            SessionUpdate::SelectedCount { count, can_select } => {
                if *can_select {
                    println!("{count} selected");
                } else {
                    println!("{count} selected (inactive: all apps use the tunnel)");
                }
            }
            SessionUpdate::SearchPatched { keyword, rows, .. } => {
                println!("Search {keyword:?}: {} matches", rows.len());
                for row in rows {
                    println!("  {} {}", mark(row.selected), row.id);
                }
            }
            SessionUpdate::Exported { count } => println!("Exported {count} packages"),
            SessionUpdate::RowsRebound { .. } | SessionUpdate::SearchClosed => {}
        }
    }

    mirror
}

fn mark(selected: bool) -> &'static str {
    if selected { "[x]" } else { "[ ]" }
}

fn print_list(apps: &[CandidateApp], store: &JsonStore) {
    let state = StoredState::load(store);
    println!("Mode: {}", state.mode);
    for app in apps {
        println!(
            "{} {:<40} {}",
            mark(state.selected.contains(&app.id)),
            app.id,
            app.label
        );
    }
}

fn print_report(report: &TeardownReport) {
    if !report.persisted {
        eprintln!("Warning: access-control state could not be saved");
    }
    if report.restarted {
        println!(
            "Tunnel restarted (waited {} status polls for it to stop)",
            report.polls
        );
    } else if report.changed {
        println!("Saved");
    }
}

async fn read_stdin_requests(tx: &mpsc::Sender<Request>) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        if line.trim().is_empty() || line.trim_start().starts_with('#') {
            continue;
        }
        match parse_request(&line) {
            Ok(request) => {
                if tx.send(request).await.is_err() {
                    bail!("Session ended unexpectedly");
                }
            }
            Err(e) => eprintln!("Skipping line: {e:#}"),
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging();

    let dirs = directories(cli.base_dir)?;
    let config = Config::load(&dirs.config_file)
        .with_context(|| format!("Failed to load {}", dirs.config_file.display()))?;
    debug!("Using {}", dirs.config.display());

    // Parse everything up front so a typo never starts a session
    let scripted = match &cli.command {
        Commands::Apply { requests } => requests
            .iter()
            .map(|r| parse_request(r))
            .collect::<Result<Vec<_>>>()?,
        Commands::List | Commands::Edit => Vec::new(),
    };

    let store = Arc::new(JsonStore::new(
        dirs.state_file.clone(),
        dirs.ui_state_file.clone(),
    ));
    let options = SessionOptions::from(&config);
    let collaborators = Collaborators {
        provider: Arc::new(InventoryProvider::new(&dirs.inventory_file)),
        store: store.clone(),
        clipboard: Arc::new(FileClipboard::new(dirs.clipboard_file.clone())),
        service: CommandService::new(&config.service, options.restart.call_timeout),
    };

    let (session, updates) = Session::new(collaborators, options);
    let printer = tokio::spawn(watch_updates(updates, cli.json));
    let (tx, task) = session.spawn();

    for request in scripted {
        if tx.send(request).await.is_err() {
            bail!("Session ended unexpectedly");
        }
    }
    if matches!(cli.command, Commands::Edit) {
        read_stdin_requests(&tx).await?;
    }
    drop(tx);

    let report = task.await.context("Session task failed")?;
    let mirror = printer.await.context("Update printer failed")?;
    info!("Session complete");

    if matches!(cli.command, Commands::List) && !cli.json {
        print_list(&mirror.apps, &store);
    }
    print_report(&report);
    Ok(())
}
