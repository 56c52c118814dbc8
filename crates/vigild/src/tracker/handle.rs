//! Client interface for interacting with the TrackerActor.
//!
//! The `TrackerHandle` provides a cheap-to-clone interface for sending
//! commands to the tracker actor and subscribing to tracker events.
//!
//! # Panic-Free Guarantees
//!
//! This module follows the panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - All fallible operations use `?`, pattern matching, or `unwrap_or`
//! - Channel errors are mapped to `TrackerError::ChannelClosed`

use chrono::Utc;
use tokio::sync::{broadcast, mpsc, oneshot};

use vigil_core::{
    DestinationId, LeaderboardEntry, PresenceEvent, StateLabel, SubjectId, SubjectOverview,
};

use super::commands::{TrackerCommand, TrackerError, TrackerEvent};

// ============================================================================
// Tracker Handle
// ============================================================================

/// Handle for interacting with the tracker actor.
///
/// This is a cheap-to-clone handle that can be shared across tasks.
/// Control-plane methods are async and round-trip to the actor;
/// presence ingest is fire-and-forget.
#[derive(Clone)]
pub struct TrackerHandle {
    /// Command sender to the actor
    sender: mpsc::Sender<TrackerCommand>,

    /// Event broadcaster for subscribing to updates
    event_sender: broadcast::Sender<TrackerEvent>,
}

impl TrackerHandle {
    /// Create a new tracker handle.
    pub fn new(
        sender: mpsc::Sender<TrackerCommand>,
        event_sender: broadcast::Sender<TrackerEvent>,
    ) -> Self {
        Self {
            sender,
            event_sender,
        }
    }

    /// Enroll a subject for tracking.
    ///
    /// `initial_label` is the state the subject is observed in right
    /// now; its first session starts at the enrollment instant.
    ///
    /// # Errors
    ///
    /// - `TrackerError::AlreadyTracked` if the subject is enrolled
    /// - `TrackerError::ChannelClosed` if the actor has shut down
    pub async fn track(
        &self,
        subject_id: SubjectId,
        destination: Option<DestinationId>,
        initial_label: Option<StateLabel>,
    ) -> Result<(), TrackerError> {
        let (tx, rx) = oneshot::channel();

        self.sender
            .send(TrackerCommand::Track {
                subject_id,
                destination,
                initial_label,
                enrolled_at: Utc::now(),
                respond_to: tx,
            })
            .await
            .map_err(|_| TrackerError::ChannelClosed)?;

        rx.await.map_err(|_| TrackerError::ChannelClosed)?
    }

    /// Unenroll a subject, removing in-memory and durable state.
    ///
    /// # Errors
    ///
    /// - `TrackerError::NotTracked` if the subject is not enrolled
    /// - `TrackerError::ChannelClosed` if the actor has shut down
    pub async fn untrack(&self, subject_id: SubjectId) -> Result<(), TrackerError> {
        let (tx, rx) = oneshot::channel();

        self.sender
            .send(TrackerCommand::Untrack {
                subject_id,
                respond_to: tx,
            })
            .await
            .map_err(|_| TrackerError::ChannelClosed)?;

        rx.await.map_err(|_| TrackerError::ChannelClosed)?
    }

    /// Rebind a subject's notification destination.
    ///
    /// # Errors
    ///
    /// - `TrackerError::NotTracked` if the subject is not enrolled
    /// - `TrackerError::ChannelClosed` if the actor has shut down
    pub async fn rebind_destination(
        &self,
        subject_id: SubjectId,
        destination: DestinationId,
    ) -> Result<(), TrackerError> {
        let (tx, rx) = oneshot::channel();

        self.sender
            .send(TrackerCommand::RebindDestination {
                subject_id: Some(subject_id),
                destination,
                respond_to: tx,
            })
            .await
            .map_err(|_| TrackerError::ChannelClosed)?;

        rx.await.map_err(|_| TrackerError::ChannelClosed)?
    }

    /// Set the process-wide default destination.
    ///
    /// Idempotent; applies to subjects without an explicit binding.
    ///
    /// # Errors
    ///
    /// - `TrackerError::ChannelClosed` if the actor has shut down
    pub async fn set_default_destination(
        &self,
        destination: DestinationId,
    ) -> Result<(), TrackerError> {
        let (tx, rx) = oneshot::channel();

        self.sender
            .send(TrackerCommand::RebindDestination {
                subject_id: None,
                destination,
                respond_to: tx,
            })
            .await
            .map_err(|_| TrackerError::ChannelClosed)?;

        rx.await.map_err(|_| TrackerError::ChannelClosed)?
    }

    /// Submit a presence-change event.
    ///
    /// Fire-and-forget: the source never learns the outcome. Events
    /// for untracked subjects and duplicate bursts are dropped by the
    /// actor. Send errors are ignored (actor may be shutting down).
    pub async fn observe(&self, event: PresenceEvent) {
        let _ = self.sender.send(TrackerCommand::Observe { event }).await;
    }

    /// List tracked subjects with their current session state.
    ///
    /// Returns an empty vector if communication with the actor fails.
    pub async fn list(&self) -> Vec<SubjectOverview> {
        let (tx, rx) = oneshot::channel();

        if self
            .sender
            .send(TrackerCommand::List { respond_to: tx })
            .await
            .is_err()
        {
            return Vec::new();
        }

        rx.await.unwrap_or_default()
    }

    /// Best-session leaderboard, descending by longest duration.
    ///
    /// Returns an empty vector if communication with the actor fails.
    pub async fn leaderboard(&self, limit: Option<usize>) -> Vec<LeaderboardEntry> {
        let (tx, rx) = oneshot::channel();

        if self
            .sender
            .send(TrackerCommand::Leaderboard {
                limit,
                respond_to: tx,
            })
            .await
            .is_err()
        {
            return Vec::new();
        }

        rx.await.unwrap_or_default()
    }

    /// Trigger eviction of expired debounce entries.
    ///
    /// Fire-and-forget, driven by the reaper task.
    pub async fn evict_debounce(&self) {
        let _ = self.sender.send(TrackerCommand::EvictDebounce).await;
    }

    /// Subscribe to tracker events.
    ///
    /// Returns a broadcast receiver for all tracker events
    /// (enrollments, transitions, records, removals).
    ///
    /// This is a synchronous operation - it doesn't communicate with the actor.
    pub fn subscribe(&self) -> broadcast::Receiver<TrackerEvent> {
        self.event_sender.subscribe()
    }

    /// Check if the actor is still running.
    ///
    /// Returns `true` if the command channel is still open.
    pub fn is_connected(&self) -> bool {
        !self.sender.is_closed()
    }
}
