//! Notification dispatch - best-effort, never blocking the engine.
//!
//! The dispatcher resolves where a notification goes (explicit
//! per-subject binding, then the process-wide default, then nowhere)
//! and hands formatting plus delivery to a spawned task. Delivery
//! failures are logged and never propagate: by the time a notice is
//! dispatched the state transition is already committed, and a failed
//! send must not roll back or block accounting.

use std::future::Future;

use chrono::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use vigil_core::{clock, DestinationId, StateLabel, SubjectId};

// ============================================================================
// Collaborator Traits
// ============================================================================

/// Delivery failure reported by a notification sink.
#[derive(Debug, Clone, Error)]
#[error("notification sink unavailable: {0}")]
pub struct SinkError(pub String);

impl SinkError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

/// Abstraction over the external notification sink.
///
/// Fire-and-forget from the engine's point of view: the sink reports
/// failure, but nothing upstream depends on the outcome.
///
/// All methods return `Send` futures so implementations can be driven
/// from spawned tokio tasks.
pub trait NotificationSink: Clone + Send + Sync + 'static {
    /// Delivers a text payload to a destination.
    fn deliver(
        &self,
        destination: DestinationId,
        message: String,
    ) -> impl Future<Output = Result<(), SinkError>> + Send;
}

/// Abstraction over the external directory service.
///
/// Resolves a subject id to a human display name; `None` falls back
/// to rendering the raw id.
pub trait Directory: Clone + Send + Sync + 'static {
    fn display_name(&self, subject_id: &SubjectId) -> impl Future<Output = Option<String>> + Send;
}

// ============================================================================
// Notices
// ============================================================================

/// A notification the transition engine wants delivered.
///
/// Kept as structured data until the display name is resolved inside
/// the dispatch task; only then is the text rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// Subject entered a state with no prior session to report.
    Started { new_label: StateLabel },

    /// Subject moved from one state to another.
    Changed {
        old_label: StateLabel,
        new_label: StateLabel,
        duration: Duration,
    },

    /// Subject left its state with nothing replacing it.
    Stopped {
        old_label: StateLabel,
        duration: Duration,
    },

    /// The closed session set a new personal-best duration.
    RecordBroken {
        label: StateLabel,
        duration: Duration,
    },
}

impl Notice {
    /// Renders the notice for a resolved display name.
    pub fn render(&self, name: &str) -> String {
        match self {
            Self::Started { new_label } => format!("{name} is now {new_label}."),
            Self::Changed {
                old_label,
                new_label,
                duration,
            } => format!(
                "{name} changed from {old_label} to {new_label}, having spent {} in {old_label}.",
                clock::format_duration(*duration)
            ),
            Self::Stopped {
                old_label,
                duration,
            } => format!(
                "{name} is no longer {old_label}, having spent {} in {old_label}.",
                clock::format_duration(*duration)
            ),
            Self::RecordBroken { label, duration } => format!(
                "New record: {name} spent {} in {label}.",
                clock::format_duration(*duration)
            ),
        }
    }
}

// ============================================================================
// Dispatcher
// ============================================================================

/// Routes notices to the notification sink.
///
/// Cheap to clone; owns clones of the sink and directory handles.
#[derive(Clone)]
pub struct Dispatcher<N, D> {
    sink: N,
    directory: D,
}

impl<N: NotificationSink, D: Directory> Dispatcher<N, D> {
    pub fn new(sink: N, directory: D) -> Self {
        Self { sink, directory }
    }

    /// Dispatches a batch of notices for one subject.
    ///
    /// `destination` is the already-resolved binding (explicit over
    /// default precedence is applied by the caller, which owns the
    /// registry). With no destination the notices are dropped and
    /// logged - a no-op, not an error.
    ///
    /// Name resolution, rendering, and delivery all happen in a
    /// spawned task; this method never suspends.
    pub fn dispatch(
        &self,
        subject_id: SubjectId,
        destination: Option<DestinationId>,
        notices: Vec<Notice>,
    ) {
        if notices.is_empty() {
            return;
        }

        let Some(destination) = destination else {
            debug!(
                subject_id = %subject_id,
                notices = notices.len(),
                "No destination resolves for subject, dropping notices"
            );
            return;
        };

        let sink = self.sink.clone();
        let directory = self.directory.clone();

        tokio::spawn(async move {
            let name = directory
                .display_name(&subject_id)
                .await
                .unwrap_or_else(|| subject_id.to_string());

            for notice in notices {
                let message = notice.render(&name);
                if let Err(e) = sink.deliver(destination.clone(), message).await {
                    warn!(
                        subject_id = %subject_id,
                        destination = %destination,
                        error = %e,
                        "Notification delivery failed"
                    );
                }
            }
        });
    }
}

// ============================================================================
// Default Implementations
// ============================================================================

/// Sink that emits notifications as structured log lines.
///
/// Used by the binary when no real sink is wired up, and handy in
/// development: every notification is still observable.
#[derive(Debug, Clone, Default)]
pub struct LogSink;

impl NotificationSink for LogSink {
    fn deliver(
        &self,
        destination: DestinationId,
        message: String,
    ) -> impl Future<Output = Result<(), SinkError>> + Send {
        async move {
            info!(destination = %destination, %message, "notification");
            Ok(())
        }
    }
}

/// Directory that resolves nothing, falling back to raw subject ids.
#[derive(Debug, Clone, Default)]
pub struct NullDirectory;

impl Directory for NullDirectory {
    fn display_name(&self, _subject_id: &SubjectId) -> impl Future<Output = Option<String>> + Send {
        async { None }
    }
}
