//! Presence session tracker using Actor pattern.
//!
//! The tracker is the central state manager for all tracked subjects.
//! It receives commands via a tokio mpsc channel and maintains the
//! canonical source of truth for session state.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌─────────────────┐     ┌──────────────────┐
//! │ Presence Source │────▶│  TrackerActor   │────▶│ Broadcast Channel│
//! └─────────────────┘     └─────────────────┘     └──────────────────┘
//!         │                       │                       │
//!         │   TrackerCommand      │   TrackerEvent        │
//!         │   (mpsc channel)      │   (broadcast)         │
//!         ▼                       ▼                       ▼
//!    Observe/Track           HashMap<SubjectId,      All subscribers
//!    subjects                TrackedEntry>           receive events
//! ```
//!
//! # Panic-Free Guarantees
//!
//! All operations in this module follow the panic-free policy:
//! - No `.unwrap()` or `.expect()` in production code
//! - All fallible operations return `Result` or `Option`
//! - Channel operations handle closure gracefully

use tokio::sync::{broadcast, mpsc};
use tokio::time::{interval, Duration};
use tracing::{debug, info};

mod actor;
mod commands;
mod handle;

pub use actor::TrackerActor;
pub use commands::{TrackerCommand, TrackerError, TrackerEvent};
pub use handle::TrackerHandle;

use crate::config::VigilConfig;
use crate::dispatch::{Directory, Dispatcher, NotificationSink};
use crate::store::{StoreError, StoreWriter, SubjectStore};

/// Channel buffer sizes
const COMMAND_BUFFER: usize = 100;
const EVENT_BUFFER: usize = 100;

/// Debounce eviction interval in seconds
const REAPER_INTERVAL_SECS: u64 = 5;

/// Spawn the tracker actor and return a handle for interaction.
///
/// This function:
/// 1. Rehydrates tracked state and engine settings from the durable store
/// 2. Creates command and event channels plus the ordered store writer
/// 3. Spawns the TrackerActor on a tokio task
/// 4. Spawns a background debounce-eviction task
/// 5. Returns a TrackerHandle for client use
///
/// # Errors
///
/// Returns an error only when the store directory itself is
/// unreadable; individual malformed documents are skipped with a
/// warning during rehydration.
pub async fn spawn_tracker<S, N, D>(
    store: S,
    sink: N,
    directory: D,
    config: &VigilConfig,
) -> Result<TrackerHandle, StoreError>
where
    S: SubjectStore,
    N: NotificationSink,
    D: Directory,
{
    let preloaded = store.load_all().await?;
    if !preloaded.is_empty() {
        info!(subjects = preloaded.len(), "Rehydrated tracked subjects");
    }
    let settings = store.load_settings().await?;

    // Create channels
    let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_BUFFER);
    let (event_tx, _) = broadcast::channel(EVENT_BUFFER);

    // All writes funnel through one queue so they land in commit order.
    let writer = StoreWriter::spawn(store);

    // Create and spawn actor
    let actor = TrackerActor::new(
        cmd_rx,
        event_tx.clone(),
        Dispatcher::new(sink, directory),
        writer,
        config,
        preloaded,
        settings,
    );
    tokio::spawn(actor.run());

    // Create handle
    let handle = TrackerHandle::new(cmd_tx.clone(), event_tx);

    // Spawn debounce eviction task
    spawn_reaper_task(cmd_tx);

    Ok(handle)
}

/// Spawn a background task that periodically evicts expired debounce
/// entries, keeping the gate's memory bounded by recent activity.
fn spawn_reaper_task(sender: mpsc::Sender<TrackerCommand>) {
    tokio::spawn(async move {
        let mut ticker = interval(Duration::from_secs(REAPER_INTERVAL_SECS));

        loop {
            ticker.tick().await;

            // Fire-and-forget eviction command
            if sender.send(TrackerCommand::EvictDebounce).await.is_err() {
                // Channel closed, actor stopped - exit reaper task
                debug!("Reaper task stopping: tracker channel closed");
                break;
            }
        }
    });
}
