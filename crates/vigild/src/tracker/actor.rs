//! Tracker actor - owns all subject state and processes commands.
//!
//! The TrackerActor is the single owner of tracking state in the
//! system: the subject registry, the current session snapshots, and
//! the debounce gate. It receives commands via an mpsc channel and
//! publishes events via broadcast.
//!
//! # Concurrency discipline
//!
//! The actor runs in a single task and processes commands
//! sequentially; no locks are needed. Every state mutation - the
//! snapshot replace, the best-session update, the debounce
//! bookkeeping - happens synchronously inside a handler before any
//! asynchronous I/O is spawned for that transition. A second event
//! for the same subject therefore always observes the already-updated
//! snapshot and can never close the same session twice.
//!
//! # Panic-Free Guarantees
//!
//! This module follows the panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - Channel send failures are logged but don't panic

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info};

use vigil_core::{
    clock, DestinationId, LeaderboardEntry, PresenceEvent, SessionRecord, SessionSnapshot,
    StateLabel, SubjectId, SubjectOverview, TrackedSubject,
};

use crate::config::VigilConfig;
use crate::debounce::DebounceGate;
use crate::dispatch::{Directory, Dispatcher, Notice, NotificationSink};
use crate::store::{EngineSettings, SessionRecordDoc, StoreWriter, SubjectDocument};

use super::commands::{TrackerCommand, TrackerError, TrackerEvent};

// ============================================================================
// Tracked Entry
// ============================================================================

/// One registry entry: tracking configuration plus the current session.
#[derive(Debug, Clone)]
pub(crate) struct TrackedEntry {
    pub subject: TrackedSubject,
    pub snapshot: SessionSnapshot,
}

// ============================================================================
// Tracker Actor
// ============================================================================

/// The tracker actor - owns all subject state.
///
/// Implements the actor pattern: receives commands via mpsc channel,
/// processes them sequentially, and publishes events to subscribers.
pub struct TrackerActor<N, D> {
    /// Command receiver
    receiver: mpsc::Receiver<TrackerCommand>,

    /// Subject registry: subject id → tracking config + current session
    subjects: HashMap<SubjectId, TrackedEntry>,

    /// Process-wide fallback destination
    default_destination: Option<DestinationId>,

    /// Duplicate-burst suppression
    debounce: DebounceGate,

    /// Notification routing (spawns its own delivery tasks)
    dispatcher: Dispatcher<N, D>,

    /// Durable-store write queue (ordered, fire-and-forget)
    writer: StoreWriter,

    /// Event publisher for subscribers
    event_publisher: broadcast::Sender<TrackerEvent>,

    /// Default leaderboard row cap
    leaderboard_size: usize,
}

impl<N, D> TrackerActor<N, D>
where
    N: NotificationSink,
    D: Directory,
{
    /// Creates a new tracker actor.
    ///
    /// `preloaded` and `settings` are the cold-start state rehydrated
    /// from the store; malformed documents have already been filtered
    /// out by `load_all`. A persisted default destination (set by a
    /// rebind at runtime) wins over the configured one.
    pub fn new(
        receiver: mpsc::Receiver<TrackerCommand>,
        event_publisher: broadcast::Sender<TrackerEvent>,
        dispatcher: Dispatcher<N, D>,
        writer: StoreWriter,
        config: &VigilConfig,
        preloaded: Vec<SubjectDocument>,
        settings: Option<EngineSettings>,
    ) -> Self {
        let mut subjects = HashMap::with_capacity(preloaded.len());
        for doc in preloaded {
            let (subject_id, subject, snapshot) = doc.into_state();
            subjects.insert(subject_id, TrackedEntry { subject, snapshot });
        }

        let default_destination = settings
            .and_then(|s| s.default_destination)
            .or_else(|| config.default_destination.clone().map(DestinationId::new));

        Self {
            receiver,
            subjects,
            default_destination,
            debounce: DebounceGate::with_settings(config.debounce_window_ms, config.debounce_ttl_ms),
            dispatcher,
            writer,
            event_publisher,
            leaderboard_size: config.leaderboard_size,
        }
    }

    /// Runs the actor event loop.
    ///
    /// Processes commands until the channel closes (all senders
    /// dropped). This is the main entry point - call this in a
    /// spawned task.
    pub async fn run(mut self) {
        info!(subjects = self.subjects.len(), "Tracker actor starting");

        while let Some(cmd) = self.receiver.recv().await {
            self.handle_command(cmd);
        }

        info!(subjects = self.subjects.len(), "Tracker actor stopped");
    }

    /// Dispatches a command to the appropriate handler.
    fn handle_command(&mut self, cmd: TrackerCommand) {
        match cmd {
            TrackerCommand::Track {
                subject_id,
                destination,
                initial_label,
                enrolled_at,
                respond_to,
            } => {
                let result = self.handle_track(subject_id, destination, initial_label, enrolled_at);
                // Ignore send error - caller may have dropped the receiver
                let _ = respond_to.send(result);
            }
            TrackerCommand::Untrack {
                subject_id,
                respond_to,
            } => {
                let result = self.handle_untrack(subject_id);
                let _ = respond_to.send(result);
            }
            TrackerCommand::RebindDestination {
                subject_id,
                destination,
                respond_to,
            } => {
                let result = self.handle_rebind(subject_id, destination);
                let _ = respond_to.send(result);
            }
            TrackerCommand::Observe { event } => {
                self.handle_observe(event);
            }
            TrackerCommand::List { respond_to } => {
                let _ = respond_to.send(self.handle_list());
            }
            TrackerCommand::Leaderboard { limit, respond_to } => {
                let _ = respond_to.send(self.handle_leaderboard(limit));
            }
            TrackerCommand::EvictDebounce => {
                let evicted = self.debounce.evict_expired(Utc::now());
                if evicted > 0 {
                    debug!(evicted, remaining = self.debounce.len(), "Debounce entries evicted");
                }
            }
        }
    }

    // ========================================================================
    // Control Plane
    // ========================================================================

    /// Handles subject enrollment.
    ///
    /// The initial snapshot takes the currently observed state and the
    /// enrollment instant; the best-session counter starts at zero.
    fn handle_track(
        &mut self,
        subject_id: SubjectId,
        destination: Option<DestinationId>,
        initial_label: Option<StateLabel>,
        enrolled_at: DateTime<Utc>,
    ) -> Result<(), TrackerError> {
        if self.subjects.contains_key(&subject_id) {
            debug!(
                subject_id = %subject_id,
                "Subject already tracked, rejecting enrollment"
            );
            return Err(TrackerError::AlreadyTracked(subject_id));
        }

        let entry = TrackedEntry {
            subject: TrackedSubject::new(destination, enrolled_at),
            snapshot: SessionSnapshot::initial(initial_label, enrolled_at),
        };
        self.persist_snapshot(&subject_id, &entry, None);
        self.subjects.insert(subject_id.clone(), entry);

        info!(
            subject_id = %subject_id,
            total_subjects = self.subjects.len(),
            "Subject enrolled"
        );

        // Publish event (ignore if no subscribers)
        let _ = self
            .event_publisher
            .send(TrackerEvent::Enrolled { subject_id });

        Ok(())
    }

    /// Handles subject unenrollment, removing in-memory and durable state.
    fn handle_untrack(&mut self, subject_id: SubjectId) -> Result<(), TrackerError> {
        if self.subjects.remove(&subject_id).is_none() {
            return Err(TrackerError::NotTracked(subject_id));
        }

        info!(
            subject_id = %subject_id,
            remaining_subjects = self.subjects.len(),
            "Subject unenrolled"
        );

        self.writer.remove(subject_id.clone());

        let _ = self
            .event_publisher
            .send(TrackerEvent::Unenrolled { subject_id });

        Ok(())
    }

    /// Handles rebinding a destination.
    ///
    /// With no subject id this sets the process-wide default, which is
    /// idempotent and always succeeds.
    fn handle_rebind(
        &mut self,
        subject_id: Option<SubjectId>,
        destination: DestinationId,
    ) -> Result<(), TrackerError> {
        match subject_id {
            None => {
                info!(destination = %destination, "Default destination set");
                self.writer.save_settings(EngineSettings {
                    default_destination: Some(destination.clone()),
                });
                self.default_destination = Some(destination);
                Ok(())
            }
            Some(subject_id) => {
                let Some(entry) = self.subjects.get_mut(&subject_id) else {
                    return Err(TrackerError::NotTracked(subject_id));
                };
                entry.subject.destination = Some(destination.clone());

                info!(subject_id = %subject_id, destination = %destination, "Destination rebound");

                let entry = entry.clone();
                self.persist_snapshot(&subject_id, &entry, None);
                Ok(())
            }
        }
    }

    // ========================================================================
    // Transition Engine
    // ========================================================================

    /// Processes one presence-change event.
    ///
    /// All registry mutation happens synchronously here; persistence
    /// and notification I/O are spawned afterwards and can neither
    /// block nor roll back the transition.
    fn handle_observe(&mut self, event: PresenceEvent) {
        // Debounce on processing time, recorded before anything can
        // suspend. Window-keyed by subject, not label.
        let now = Utc::now();
        if !self.debounce.should_process(&event.subject_id, now) {
            debug!(
                subject_id = %event.subject_id,
                "Duplicate burst suppressed by debounce gate"
            );
            return;
        }

        let Some(entry) = self.subjects.get_mut(&event.subject_id) else {
            debug!(
                subject_id = %event.subject_id,
                "Presence event for untracked subject, ignoring"
            );
            return;
        };

        // Defensive re-check even after debounce: the gate is
        // time-windowed, not label-aware.
        if entry.snapshot.state_label == event.label {
            debug!(
                subject_id = %event.subject_id,
                label = ?event.label,
                "Same state label, no transition"
            );
            return;
        }

        // Close the prior session, if there is one.
        let old_label = entry.snapshot.state_label.clone();
        let mut closed: Option<SessionRecord> = None;
        let mut new_record = false;

        if let Some(label) = old_label.clone() {
            let record = SessionRecord::close(
                event.subject_id.clone(),
                label,
                entry.snapshot.started_at,
                event.timestamp,
            );
            if record.duration > entry.snapshot.longest {
                entry.snapshot.longest = record.duration;
                new_record = true;
            }
            closed = Some(record);
        }

        // Replace the snapshot wholesale - committed before any I/O.
        entry.snapshot = SessionSnapshot {
            state_label: event.label.clone(),
            started_at: event.timestamp,
            longest: entry.snapshot.longest,
        };

        debug!(
            subject_id = %event.subject_id,
            old_label = ?old_label,
            new_label = ?event.label,
            closed_duration_ms = closed.as_ref().map(|r| r.duration.num_milliseconds()),
            new_record,
            "Transition committed"
        );

        // Mirror to the durable store (fire-and-forget).
        let entry_snapshot = entry.clone();
        self.persist_snapshot(
            &event.subject_id,
            &entry_snapshot,
            closed.as_ref().map(SessionRecordDoc::from),
        );

        // Route notifications.
        let destination = entry_snapshot
            .subject
            .destination
            .clone()
            .or_else(|| self.default_destination.clone());

        let mut notices = Vec::new();
        match (&closed, &event.label) {
            (Some(record), Some(new_label)) => notices.push(Notice::Changed {
                old_label: record.state_label.clone(),
                new_label: new_label.clone(),
                duration: record.duration,
            }),
            (Some(record), None) => notices.push(Notice::Stopped {
                old_label: record.state_label.clone(),
                duration: record.duration,
            }),
            (None, Some(new_label)) => notices.push(Notice::Started {
                new_label: new_label.clone(),
            }),
            // Unreachable in practice: equal labels returned above.
            (None, None) => {}
        }
        if new_record {
            if let Some(record) = &closed {
                notices.push(Notice::RecordBroken {
                    label: record.state_label.clone(),
                    duration: record.duration,
                });
            }
        }
        self.dispatcher
            .dispatch(event.subject_id.clone(), destination, notices);

        // Publish events (ignore if no subscribers).
        let _ = self.event_publisher.send(TrackerEvent::Transition {
            subject_id: event.subject_id.clone(),
            old_label,
            new_label: event.label,
            closed_duration: closed.as_ref().map(|r| r.duration),
        });
        if new_record {
            if let Some(record) = closed {
                let _ = self.event_publisher.send(TrackerEvent::RecordBroken {
                    subject_id: event.subject_id,
                    label: record.state_label,
                    duration: record.duration,
                });
            }
        }
    }

    // ========================================================================
    // Read Models
    // ========================================================================

    /// Handles the list operation.
    fn handle_list(&self) -> Vec<SubjectOverview> {
        let now = Utc::now();
        let mut rows: Vec<SubjectOverview> = self
            .subjects
            .iter()
            .map(|(subject_id, entry)| SubjectOverview {
                subject_id: subject_id.clone(),
                destination: entry
                    .subject
                    .destination
                    .clone()
                    .or_else(|| self.default_destination.clone())
                    .map(|d| d.to_string()),
                state_label: entry.snapshot.state_label.clone().map(|l| l.to_string()),
                elapsed_in_state: clock::format_duration(entry.snapshot.elapsed_in_state(now)),
                longest_session: clock::format_duration(entry.snapshot.longest),
            })
            .collect();
        rows.sort_by(|a, b| a.subject_id.as_str().cmp(b.subject_id.as_str()));
        rows
    }

    /// Handles the leaderboard operation.
    fn handle_leaderboard(&self, limit: Option<usize>) -> Vec<LeaderboardEntry> {
        let limit = limit.unwrap_or(self.leaderboard_size);
        let mut entries: Vec<LeaderboardEntry> = self
            .subjects
            .iter()
            .map(|(subject_id, entry)| LeaderboardEntry::new(subject_id.clone(), entry.snapshot.longest))
            .collect();
        entries.sort_by(|a, b| {
            b.longest_seconds
                .partial_cmp(&a.longest_seconds)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.subject_id.as_str().cmp(b.subject_id.as_str()))
        });
        entries.truncate(limit);
        entries
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    /// Mirrors an entry to the durable store, optionally appending a
    /// closed-session record.
    ///
    /// Fire-and-forget: the write queue drains sequentially, so later
    /// snapshots never race ahead of earlier ones; failures are logged
    /// and retried at the next natural event.
    fn persist_snapshot(
        &self,
        subject_id: &SubjectId,
        entry: &TrackedEntry,
        closed: Option<SessionRecordDoc>,
    ) {
        let doc = SubjectDocument::from_state(subject_id.clone(), &entry.subject, &entry.snapshot);
        self.writer.save(doc, closed);
    }

    // ========================================================================
    // Accessors (for testing)
    // ========================================================================

    /// Returns the number of tracked subjects.
    #[cfg(test)]
    pub(crate) fn subject_count(&self) -> usize {
        self.subjects.len()
    }

    /// Returns a copy of a subject's current snapshot.
    #[cfg(test)]
    pub(crate) fn snapshot(&self, subject_id: &SubjectId) -> Option<SessionSnapshot> {
        self.subjects.get(subject_id).map(|e| e.snapshot.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{LogSink, NullDirectory};
    use crate::store::{MemoryStore, SubjectStore};
    use chrono::{DateTime, Duration, TimeZone};
    use tokio::sync::oneshot;
    use vigil_core::StateLabel;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).single().expect("valid timestamp")
    }

    fn test_config() -> VigilConfig {
        VigilConfig {
            // Actor tests drive many events back-to-back; the gate is
            // exercised separately.
            debounce_window_ms: 0,
            ..VigilConfig::default()
        }
    }

    fn create_actor() -> (
        TrackerActor<LogSink, NullDirectory>,
        broadcast::Receiver<TrackerEvent>,
        MemoryStore,
    ) {
        let (_cmd_tx, cmd_rx) = mpsc::channel(16);
        let (event_tx, event_rx) = broadcast::channel(16);
        let store = MemoryStore::new();
        let actor = TrackerActor::new(
            cmd_rx,
            event_tx,
            Dispatcher::new(LogSink, NullDirectory),
            StoreWriter::spawn(store.clone()),
            &test_config(),
            Vec::new(),
            None,
        );
        (actor, event_rx, store)
    }

    fn track(
        actor: &mut TrackerActor<LogSink, NullDirectory>,
        id: &str,
        label: Option<&str>,
        enrolled_at: DateTime<Utc>,
    ) -> Result<(), TrackerError> {
        let (tx, mut rx) = oneshot::channel();
        actor.handle_command(TrackerCommand::Track {
            subject_id: SubjectId::new(id),
            destination: None,
            initial_label: label.map(StateLabel::new),
            enrolled_at,
            respond_to: tx,
        });
        rx.try_recv().expect("actor responds synchronously")
    }

    fn observe(
        actor: &mut TrackerActor<LogSink, NullDirectory>,
        id: &str,
        label: Option<&str>,
        timestamp: DateTime<Utc>,
    ) {
        let event = PresenceEvent::new(
            SubjectId::new(id),
            label.map(StateLabel::new),
            timestamp,
        )
        .expect("valid event");
        actor.handle_command(TrackerCommand::Observe { event });
    }

    #[tokio::test]
    async fn test_track_initializes_snapshot() {
        let (mut actor, mut event_rx, _store) = create_actor();

        track(&mut actor, "user-1", Some("online"), at(0)).expect("enroll");
        assert_eq!(actor.subject_count(), 1);

        let snapshot = actor.snapshot(&SubjectId::new("user-1")).expect("snapshot");
        assert_eq!(snapshot.state_label, Some(StateLabel::new("online")));
        assert_eq!(snapshot.started_at, at(0));
        assert_eq!(snapshot.longest, Duration::zero());

        let event = event_rx.try_recv().expect("event");
        assert!(matches!(event, TrackerEvent::Enrolled { .. }));
    }

    #[tokio::test]
    async fn test_track_duplicate_rejected_and_snapshot_untouched() {
        let (mut actor, _event_rx, _store) = create_actor();

        track(&mut actor, "user-1", Some("online"), at(0)).expect("enroll");
        observe(&mut actor, "user-1", Some("idle"), at(30));
        let before = actor.snapshot(&SubjectId::new("user-1")).expect("snapshot");

        let result = track(&mut actor, "user-1", Some("offline"), at(60));
        assert!(matches!(result, Err(TrackerError::AlreadyTracked(_))));
        assert_eq!(actor.subject_count(), 1);

        let after = actor.snapshot(&SubjectId::new("user-1")).expect("snapshot");
        assert_eq!(after, before);
    }

    #[tokio::test]
    async fn test_untrack_removes_subject() {
        let (mut actor, mut event_rx, _store) = create_actor();

        track(&mut actor, "user-1", Some("online"), at(0)).expect("enroll");
        let _ = event_rx.try_recv();

        let (tx, mut rx) = oneshot::channel();
        actor.handle_command(TrackerCommand::Untrack {
            subject_id: SubjectId::new("user-1"),
            respond_to: tx,
        });
        assert!(rx.try_recv().expect("response").is_ok());
        assert_eq!(actor.subject_count(), 0);

        let event = event_rx.try_recv().expect("event");
        assert!(matches!(event, TrackerEvent::Unenrolled { .. }));
    }

    #[tokio::test]
    async fn test_untrack_unknown_fails() {
        let (mut actor, _event_rx, _store) = create_actor();

        let (tx, mut rx) = oneshot::channel();
        actor.handle_command(TrackerCommand::Untrack {
            subject_id: SubjectId::new("ghost"),
            respond_to: tx,
        });
        let result = rx.try_recv().expect("response");
        assert!(matches!(result, Err(TrackerError::NotTracked(_))));
    }

    #[tokio::test]
    async fn test_transition_closes_session_and_updates_best() {
        let (mut actor, mut event_rx, _store) = create_actor();

        track(&mut actor, "user-1", Some("online"), at(0)).expect("enroll");
        let _ = event_rx.try_recv();

        observe(&mut actor, "user-1", Some("idle"), at(30));

        let snapshot = actor.snapshot(&SubjectId::new("user-1")).expect("snapshot");
        assert_eq!(snapshot.state_label, Some(StateLabel::new("idle")));
        assert_eq!(snapshot.started_at, at(30));
        assert_eq!(snapshot.longest, Duration::seconds(30));

        let event = event_rx.try_recv().expect("transition event");
        match event {
            TrackerEvent::Transition {
                old_label,
                new_label,
                closed_duration,
                ..
            } => {
                assert_eq!(old_label, Some(StateLabel::new("online")));
                assert_eq!(new_label, Some(StateLabel::new("idle")));
                assert_eq!(closed_duration, Some(Duration::seconds(30)));
            }
            other => panic!("expected Transition, got {other:?}"),
        }

        // 30s beats the initial zero, so a record event follows.
        let event = event_rx.try_recv().expect("record event");
        assert!(matches!(event, TrackerEvent::RecordBroken { .. }));
    }

    #[tokio::test]
    async fn test_duplicate_label_is_not_a_transition() {
        let (mut actor, mut event_rx, _store) = create_actor();

        track(&mut actor, "user-1", Some("online"), at(0)).expect("enroll");
        observe(&mut actor, "user-1", Some("idle"), at(30));
        let before = actor.snapshot(&SubjectId::new("user-1")).expect("snapshot");
        while event_rx.try_recv().is_ok() {}

        // Same label again: no transition, no events, snapshot unchanged.
        observe(&mut actor, "user-1", Some("idle"), at(40));

        let after = actor.snapshot(&SubjectId::new("user-1")).expect("snapshot");
        assert_eq!(after, before);
        assert!(event_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_longest_duration_is_running_max() {
        let (mut actor, _event_rx, _store) = create_actor();

        track(&mut actor, "user-1", Some("online"), at(0)).expect("enroll");
        observe(&mut actor, "user-1", Some("idle"), at(30)); // closes 30s online
        observe(&mut actor, "user-1", Some("online"), at(40)); // closes 10s idle
        observe(&mut actor, "user-1", Some("idle"), at(100)); // closes 60s online

        let snapshot = actor.snapshot(&SubjectId::new("user-1")).expect("snapshot");
        assert_eq!(snapshot.longest, Duration::seconds(60));
    }

    #[tokio::test]
    async fn test_shorter_session_does_not_break_record() {
        let (mut actor, mut event_rx, _store) = create_actor();

        track(&mut actor, "user-1", Some("online"), at(0)).expect("enroll");
        observe(&mut actor, "user-1", Some("idle"), at(30)); // record: 30s
        while event_rx.try_recv().is_ok() {}

        observe(&mut actor, "user-1", Some("online"), at(40)); // closes 10s idle

        let snapshot = actor.snapshot(&SubjectId::new("user-1")).expect("snapshot");
        assert_eq!(snapshot.longest, Duration::seconds(30));

        // Transition event only, no record event.
        assert!(matches!(
            event_rx.try_recv(),
            Ok(TrackerEvent::Transition { .. })
        ));
        assert!(event_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_null_label_closes_session() {
        let (mut actor, mut event_rx, _store) = create_actor();

        track(&mut actor, "user-1", Some("online"), at(0)).expect("enroll");
        let _ = event_rx.try_recv();

        observe(&mut actor, "user-1", None, at(45));

        let snapshot = actor.snapshot(&SubjectId::new("user-1")).expect("snapshot");
        assert_eq!(snapshot.state_label, None);
        assert_eq!(snapshot.started_at, at(45));
        assert_eq!(snapshot.longest, Duration::seconds(45));
    }

    #[tokio::test]
    async fn test_event_for_untracked_subject_ignored() {
        let (mut actor, mut event_rx, _store) = create_actor();

        observe(&mut actor, "ghost", Some("online"), at(0));

        assert_eq!(actor.subject_count(), 0);
        assert!(event_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_debounce_suppresses_burst() {
        let (_cmd_tx, cmd_rx) = mpsc::channel(16);
        let (event_tx, mut event_rx) = broadcast::channel(16);
        let store = MemoryStore::new();
        // Real gate: one second window.
        let config = VigilConfig::default();
        let mut actor = TrackerActor::new(
            cmd_rx,
            event_tx,
            Dispatcher::new(LogSink, NullDirectory),
            StoreWriter::spawn(store),
            &config,
            Vec::new(),
            None,
        );

        track(&mut actor, "user-1", Some("online"), at(0)).expect("enroll");
        let _ = event_rx.try_recv();

        // Two genuine-looking transitions in one burst: only the
        // first is processed (the gate keys on processing time).
        observe(&mut actor, "user-1", Some("idle"), at(30));
        observe(&mut actor, "user-1", Some("online"), at(31));

        let snapshot = actor.snapshot(&SubjectId::new("user-1")).expect("snapshot");
        assert_eq!(snapshot.state_label, Some(StateLabel::new("idle")));

        assert!(matches!(
            event_rx.try_recv(),
            Ok(TrackerEvent::Transition { .. })
        ));
        assert!(matches!(
            event_rx.try_recv(),
            Ok(TrackerEvent::RecordBroken { .. })
        ));
        assert!(event_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_rebind_subject_destination() {
        let (mut actor, _event_rx, _store) = create_actor();

        track(&mut actor, "user-1", None, at(0)).expect("enroll");

        let (tx, mut rx) = oneshot::channel();
        actor.handle_command(TrackerCommand::RebindDestination {
            subject_id: Some(SubjectId::new("user-1")),
            destination: DestinationId::new("chan-2"),
            respond_to: tx,
        });
        assert!(rx.try_recv().expect("response").is_ok());

        let rows = actor.handle_list();
        assert_eq!(rows[0].destination.as_deref(), Some("chan-2"));
    }

    #[tokio::test]
    async fn test_rebind_unknown_subject_fails() {
        let (mut actor, _event_rx, _store) = create_actor();

        let (tx, mut rx) = oneshot::channel();
        actor.handle_command(TrackerCommand::RebindDestination {
            subject_id: Some(SubjectId::new("ghost")),
            destination: DestinationId::new("chan-2"),
            respond_to: tx,
        });
        let result = rx.try_recv().expect("response");
        assert!(matches!(result, Err(TrackerError::NotTracked(_))));
    }

    #[tokio::test]
    async fn test_default_destination_fallback_in_list() {
        let (mut actor, _event_rx, _store) = create_actor();

        track(&mut actor, "user-1", None, at(0)).expect("enroll");

        // No binding anywhere yet.
        assert_eq!(actor.handle_list()[0].destination, None);

        let (tx, _rx) = oneshot::channel();
        actor.handle_command(TrackerCommand::RebindDestination {
            subject_id: None,
            destination: DestinationId::new("general"),
            respond_to: tx,
        });

        assert_eq!(actor.handle_list()[0].destination.as_deref(), Some("general"));
    }

    #[tokio::test]
    async fn test_default_destination_rebind_is_persisted() {
        let (mut actor, _event_rx, store) = create_actor();

        let (tx, _rx) = oneshot::channel();
        actor.handle_command(TrackerCommand::RebindDestination {
            subject_id: None,
            destination: DestinationId::new("ops"),
            respond_to: tx,
        });

        // Let the write queue drain.
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        let settings = store.load_settings().await.expect("load").expect("present");
        assert_eq!(settings.default_destination, Some(DestinationId::new("ops")));
    }

    #[tokio::test]
    async fn test_stored_settings_override_configured_default() {
        let (_cmd_tx, cmd_rx) = mpsc::channel(16);
        let (event_tx, _event_rx) = broadcast::channel(16);

        let config = VigilConfig {
            default_destination: Some("general".into()),
            debounce_window_ms: 0,
            ..VigilConfig::default()
        };
        let settings = EngineSettings {
            default_destination: Some(DestinationId::new("ops")),
        };

        let mut actor = TrackerActor::new(
            cmd_rx,
            event_tx,
            Dispatcher::new(LogSink, NullDirectory),
            StoreWriter::spawn(MemoryStore::new()),
            &config,
            Vec::new(),
            Some(settings),
        );

        track(&mut actor, "user-1", None, at(0)).expect("enroll");
        assert_eq!(actor.handle_list()[0].destination.as_deref(), Some("ops"));
    }

    #[tokio::test]
    async fn test_leaderboard_orders_descending() {
        let (mut actor, _event_rx, _store) = create_actor();

        track(&mut actor, "a", Some("online"), at(0)).expect("enroll");
        track(&mut actor, "b", Some("online"), at(0)).expect("enroll");
        track(&mut actor, "c", Some("online"), at(0)).expect("enroll");

        observe(&mut actor, "a", None, at(10)); // 10s
        observe(&mut actor, "b", None, at(60)); // 60s
        observe(&mut actor, "c", None, at(30)); // 30s

        let board = actor.handle_leaderboard(None);
        let ids: Vec<&str> = board.iter().map(|e| e.subject_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c", "a"]);
        assert_eq!(board[0].longest_display, "0:01:00");

        let top_one = actor.handle_leaderboard(Some(1));
        assert_eq!(top_one.len(), 1);
        assert_eq!(top_one[0].subject_id.as_str(), "b");
    }

    #[tokio::test]
    async fn test_rehydration_from_documents() {
        let (_cmd_tx, cmd_rx) = mpsc::channel(16);
        let (event_tx, _event_rx) = broadcast::channel(16);
        let store = MemoryStore::new();

        let doc = SubjectDocument {
            subject_id: SubjectId::new("user-1"),
            destination_id: None,
            state_label: Some(StateLabel::new("online")),
            started_at: at(0),
            longest_duration: 120.0,
            enrolled_at: at(0),
            sessions: Vec::new(),
        };

        let actor = TrackerActor::new(
            cmd_rx,
            event_tx,
            Dispatcher::new(LogSink, NullDirectory),
            StoreWriter::spawn(store),
            &test_config(),
            vec![doc],
            None,
        );

        assert_eq!(actor.subject_count(), 1);
        let snapshot = actor.snapshot(&SubjectId::new("user-1")).expect("snapshot");
        assert_eq!(snapshot.longest, Duration::seconds(120));
        assert_eq!(snapshot.started_at, at(0));
    }
}
