//! Vigil Daemon - Presence session tracking engine
//!
//! This binary runs the tracking engine over a line-oriented JSON
//! protocol: presence events and control operations arrive on stdin,
//! one JSON object per line, and query results go to stdout.
//!
//! # Usage
//!
//! ```bash
//! # Start the engine with defaults
//! vigild
//!
//! # Start with a config file
//! vigild --config /etc/vigil.toml
//!
//! # Override the state directory
//! vigild --state-dir /var/lib/vigil
//! VIGIL_STATE_DIR=/var/lib/vigil vigild
//!
//! # Enable debug logging
//! RUST_LOG=vigild=debug vigild
//! ```
//!
//! # Protocol
//!
//! ```json
//! {"type": "track", "subject_id": "42", "destination_id": "general", "label": "online"}
//! {"type": "presence", "subject_id": "42", "label": "idle", "timestamp": "2024-06-01T12:00:00Z"}
//! {"type": "list"}
//! {"type": "leaderboard", "limit": 5}
//! ```
//!
//! Control operations are acknowledged with `{"ok": true}` or
//! `{"ok": false, "error": "..."}`; queries respond with a JSON array.
//! Malformed lines are logged and skipped.
//!
//! # Signal Handling
//!
//! - SIGTERM/SIGINT: Graceful shutdown

use std::path::PathBuf;
use std::process;

use anyhow::Result;
use clap::Parser;
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use vigil_core::{DestinationId, StateLabel, SubjectId};
use vigild::config::VigilConfig;
use vigild::dispatch::{LogSink, NullDirectory};
use vigild::store::JsonFileStore;
use vigild::tracker::{spawn_tracker, TrackerHandle};
use vigild::wire::{presence_event, InputLine};

/// Vigil daemon - presence session tracking engine
#[derive(Parser, Debug)]
#[command(name = "vigild", version, about)]
struct Args {
    /// Path to a TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// State directory override (wins over config and environment)
    #[arg(long)]
    state_dir: Option<PathBuf>,

    /// Default notification destination override
    #[arg(long)]
    default_destination: Option<String>,
}

/// Acknowledgement line for control operations.
#[derive(Serialize)]
struct Ack {
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl Ack {
    fn from_result<E: std::fmt::Display>(result: Result<(), E>) -> Self {
        match result {
            Ok(()) => Self {
                ok: true,
                error: None,
            },
            Err(e) => Self {
                ok: false,
                error: Some(e.to_string()),
            },
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("vigild=info".parse()?)
                .add_directive("vigil_core=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    // Load configuration and apply CLI overrides
    let mut config = VigilConfig::load(args.config.as_deref())?;
    if let Some(dir) = args.state_dir {
        config.state_dir = dir;
    }
    if let Some(dest) = args.default_destination {
        config.default_destination = Some(dest);
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        pid = process::id(),
        state_dir = %config.state_dir.display(),
        "Vigil daemon starting"
    );

    // Create cancellation token for graceful shutdown
    let cancel_token = CancellationToken::new();

    // Setup signal handlers
    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        if let Err(e) = wait_for_shutdown_signal().await {
            error!(error = %e, "Error waiting for shutdown signal");
        }
        info!("Shutdown signal received");
        shutdown_token.cancel();
    });

    // Spawn the tracker over the durable store
    let store = JsonFileStore::new(&config.state_dir)?;
    let tracker = spawn_tracker(store, LogSink, NullDirectory, &config).await?;
    info!("Tracker started");

    run_line_protocol(tracker, cancel_token).await?;

    info!("Vigil daemon stopped");
    Ok(())
}

/// Reads the stdin line protocol until EOF or cancellation.
async fn run_line_protocol(tracker: TrackerHandle, cancel_token: CancellationToken) -> Result<()> {
    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();

    loop {
        let line = tokio::select! {
            _ = cancel_token.cancelled() => break,
            line = lines.next_line() => line?,
        };

        let Some(line) = line else {
            info!("Input stream closed");
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let parsed = match InputLine::parse(line) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(error = %e, "Skipping malformed input line");
                continue;
            }
        };

        handle_line(&tracker, parsed).await;
    }

    Ok(())
}

/// Executes one parsed input line against the tracker.
async fn handle_line(tracker: &TrackerHandle, line: InputLine) {
    match line {
        InputLine::Presence { .. } => {
            // presence_event only returns None for non-Presence lines
            let Some(event) = presence_event(&line) else {
                return;
            };
            match event {
                Ok(event) => tracker.observe(event).await,
                Err(e) => warn!(error = %e, "Rejected presence event"),
            }
        }
        InputLine::Track {
            subject_id,
            destination_id,
            label,
        } => {
            let result = tracker
                .track(
                    SubjectId::new(subject_id),
                    destination_id.map(DestinationId::new),
                    label.map(StateLabel::new),
                )
                .await;
            emit(&Ack::from_result(result));
        }
        InputLine::Untrack { subject_id } => {
            let result = tracker.untrack(SubjectId::new(subject_id)).await;
            emit(&Ack::from_result(result));
        }
        InputLine::SetDefaultDestination { destination_id } => {
            let result = tracker
                .set_default_destination(DestinationId::new(destination_id))
                .await;
            emit(&Ack::from_result(result));
        }
        InputLine::List => {
            emit(&tracker.list().await);
        }
        InputLine::Leaderboard { limit } => {
            emit(&tracker.leaderboard(limit).await);
        }
    }
}

/// Writes one JSON response line to stdout.
fn emit<T: Serialize>(value: &T) {
    match serde_json::to_string(value) {
        Ok(json) => println!("{json}"),
        Err(e) => error!(error = %e, "Failed to serialize response"),
    }
}

/// Waits for a shutdown signal (SIGTERM or SIGINT).
async fn wait_for_shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;

        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT");
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        info!("Received Ctrl+C");
    }

    Ok(())
}
