//! Tracker actor commands, errors, and events.
//!
//! This module defines the message types for communicating with the
//! `TrackerActor`:
//! - `TrackerCommand`: commands sent to the actor
//! - `TrackerError`: control-plane errors surfaced to callers
//! - `TrackerEvent`: events published by the tracker for subscribers
//!
//! All types are designed for async message passing and follow the
//! panic-free policy.

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use tokio::sync::oneshot;

use vigil_core::{
    DestinationId, LeaderboardEntry, PresenceEvent, StateLabel, SubjectId, SubjectOverview,
};

// ============================================================================
// Tracker Commands
// ============================================================================

/// Commands sent to the tracker actor.
///
/// Control-plane commands use a oneshot channel for the response;
/// presence ingest is fire-and-forget (the source never learns the
/// outcome, matching the at-least-once delivery contract).
#[derive(Debug)]
pub enum TrackerCommand {
    /// Enroll a subject for tracking.
    ///
    /// # Errors
    /// - `TrackerError::AlreadyTracked` if the subject is enrolled
    Track {
        subject_id: SubjectId,
        /// Per-subject destination override, if any.
        destination: Option<DestinationId>,
        /// State the subject is observed in at enrollment time.
        initial_label: Option<StateLabel>,
        /// Enrollment instant (filled by the handle, explicit for tests).
        enrolled_at: DateTime<Utc>,
        respond_to: oneshot::Sender<Result<(), TrackerError>>,
    },

    /// Unenroll a subject, removing in-memory and durable state.
    ///
    /// # Errors
    /// - `TrackerError::NotTracked` if the subject is not enrolled
    Untrack {
        subject_id: SubjectId,
        respond_to: oneshot::Sender<Result<(), TrackerError>>,
    },

    /// Rebind a subject's destination, or the process-wide default
    /// when `subject_id` is `None`.
    ///
    /// # Errors
    /// - `TrackerError::NotTracked` for an unknown subject
    RebindDestination {
        subject_id: Option<SubjectId>,
        destination: DestinationId,
        respond_to: oneshot::Sender<Result<(), TrackerError>>,
    },

    /// A presence-change event from the source. Fire-and-forget.
    Observe {
        /// Boundary-validated event.
        event: PresenceEvent,
    },

    /// List tracked subjects with their current session state.
    List {
        respond_to: oneshot::Sender<Vec<SubjectOverview>>,
    },

    /// Best-session leaderboard, descending by longest duration.
    Leaderboard {
        /// Row cap; the engine default applies when absent.
        limit: Option<usize>,
        respond_to: oneshot::Sender<Vec<LeaderboardEntry>>,
    },

    /// Evict expired debounce entries. Fired by the reaper task.
    EvictDebounce,
}

// ============================================================================
// Tracker Errors
// ============================================================================

/// Control-plane errors surfaced to callers as rejected operations.
///
/// None of these are fatal to the engine.
#[derive(Debug, Clone, Error)]
pub enum TrackerError {
    /// The subject is already enrolled.
    #[error("subject already tracked: {0}")]
    AlreadyTracked(SubjectId),

    /// The subject is not enrolled.
    #[error("subject not tracked: {0}")]
    NotTracked(SubjectId),

    /// The response channel was closed before receiving a response.
    ///
    /// This typically indicates the actor was shut down.
    #[error("response channel closed")]
    ChannelClosed,
}

// ============================================================================
// Tracker Events
// ============================================================================

/// Events published by the tracker to subscribers.
///
/// Broadcast after the corresponding state mutation has been
/// committed, which gives tests and observers a synchronous view of
/// the engine's decisions.
#[derive(Debug, Clone)]
pub enum TrackerEvent {
    /// A subject was enrolled.
    Enrolled { subject_id: SubjectId },

    /// A subject was unenrolled.
    Unenrolled { subject_id: SubjectId },

    /// A genuine transition was processed.
    Transition {
        subject_id: SubjectId,
        old_label: Option<StateLabel>,
        new_label: Option<StateLabel>,
        /// Duration of the closed session, if one closed.
        closed_duration: Option<Duration>,
    },

    /// A closed session set a new personal-best duration.
    RecordBroken {
        subject_id: SubjectId,
        label: StateLabel,
        duration: Duration,
    },
}
