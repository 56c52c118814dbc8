//! Durable store adapter - serializes subject state to a document store.
//!
//! The store is a passive mirror of the in-memory registry: it is
//! only authoritative for cold-start recovery, never for in-flight
//! timing decisions. All writes are issued fire-and-forget by the
//! tracker actor; a failed write is logged and retried at the next
//! natural event rather than actively retried.
//!
//! Document shape, one per subject: snapshot fields (destination,
//! current label, RFC 3339 `started_at`, longest duration in float
//! seconds, enrollment time) plus an append-only `sessions` array of
//! closed-session records for audit.

use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use vigil_core::{DestinationId, SessionRecord, SessionSnapshot, StateLabel, SubjectId, TrackedSubject};

// ============================================================================
// Errors
// ============================================================================

/// Errors raised by store backends.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying I/O failure (store unavailable).
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Document could not be serialized.
    #[error("store serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Tried to append a session to a subject with no document.
    #[error("no document for subject: {subject_id}")]
    DocumentMissing { subject_id: SubjectId },
}

// ============================================================================
// Documents
// ============================================================================

/// A closed session as persisted in the `sessions` array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecordDoc {
    pub state_label: StateLabel,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub duration_seconds: f64,
}

impl From<&SessionRecord> for SessionRecordDoc {
    fn from(record: &SessionRecord) -> Self {
        Self {
            state_label: record.state_label.clone(),
            start: record.start,
            end: record.end,
            duration_seconds: record.duration.num_milliseconds() as f64 / 1000.0,
        }
    }
}

/// The persisted document for one tracked subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectDocument {
    pub subject_id: SubjectId,
    #[serde(default)]
    pub destination_id: Option<DestinationId>,
    #[serde(default)]
    pub state_label: Option<StateLabel>,
    /// When the current state began (RFC 3339 text on the wire).
    pub started_at: DateTime<Utc>,
    /// Longest closed-session duration in seconds.
    pub longest_duration: f64,
    pub enrolled_at: DateTime<Utc>,
    /// Append-only closed-session history.
    #[serde(default)]
    pub sessions: Vec<SessionRecordDoc>,
}

impl SubjectDocument {
    /// Builds the document for the current in-memory state.
    ///
    /// The `sessions` array is left empty here; backends preserve the
    /// already-persisted history on save (see [`SubjectStore::save`]).
    pub fn from_state(
        subject_id: SubjectId,
        subject: &TrackedSubject,
        snapshot: &SessionSnapshot,
    ) -> Self {
        Self {
            subject_id,
            destination_id: subject.destination.clone(),
            state_label: snapshot.state_label.clone(),
            started_at: snapshot.started_at,
            longest_duration: snapshot.longest.num_milliseconds() as f64 / 1000.0,
            enrolled_at: subject.enrolled_at,
            sessions: Vec::new(),
        }
    }

    /// Converts the document back into registry state for rehydration.
    ///
    /// `started_at` is restored verbatim, so a session spanning a
    /// process restart keeps accruing time.
    pub fn into_state(self) -> (SubjectId, TrackedSubject, SessionSnapshot) {
        let snapshot = SessionSnapshot {
            state_label: self.state_label,
            started_at: self.started_at,
            longest: Duration::milliseconds((self.longest_duration * 1000.0).round() as i64),
        };
        let subject = TrackedSubject::new(self.destination_id, self.enrolled_at);
        (self.subject_id, subject, snapshot)
    }
}

/// Engine-wide durable settings, persisted alongside the subject
/// documents.
///
/// Holds state that is mutated at runtime and must survive a restart;
/// currently only the process-wide default destination.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Process-wide default notification destination.
    #[serde(default)]
    pub default_destination: Option<DestinationId>,
}

// ============================================================================
// Store Trait
// ============================================================================

/// Abstraction over the durable document store, keyed by subject id.
///
/// All methods return `Send` futures and take owned arguments so
/// calls can be moved into spawned tokio tasks.
pub trait SubjectStore: Clone + Send + Sync + 'static {
    /// Upserts a subject's document.
    ///
    /// The already-persisted `sessions` history is preserved; `save`
    /// only replaces the snapshot fields.
    fn save(&self, doc: SubjectDocument) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Appends a closed session to the subject's history.
    fn append_session(
        &self,
        subject_id: SubjectId,
        record: SessionRecordDoc,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Removes all durable state for a subject.
    ///
    /// Idempotent: removing an absent subject succeeds.
    fn remove(&self, subject_id: SubjectId) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Loads every readable subject document.
    ///
    /// Used once at process start. Malformed documents are skipped
    /// and logged, never fatal (the remaining records still load).
    fn load_all(&self) -> impl Future<Output = Result<Vec<SubjectDocument>, StoreError>> + Send;

    /// Persists the engine-wide settings document.
    fn save_settings(
        &self,
        settings: EngineSettings,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Loads the engine-wide settings document, if one was persisted.
    ///
    /// A malformed settings document is logged and treated as absent.
    fn load_settings(
        &self,
    ) -> impl Future<Output = Result<Option<EngineSettings>, StoreError>> + Send;
}

// ============================================================================
// JSON File Store
// ============================================================================

/// Document store backed by one JSON file per subject.
///
/// Files live directly under the state directory as
/// `{sanitized subject id}.json`. The authoritative subject id is the
/// one inside the document, not the filename.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

/// Settings document filename.
///
/// Uses a non-`.json` extension so the subject-document scan in
/// `load_all` never picks it up and no sanitized subject filename
/// (always `*.json`) can collide with it.
const SETTINGS_FILE: &str = "settings.state";

impl JsonFileStore {
    /// Creates a store rooted at `dir`, creating the directory if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path_for(&self, subject_id: &SubjectId) -> PathBuf {
        // Subject ids are opaque; keep filenames safe by mapping
        // anything outside a conservative set to '_'.
        let name: String = subject_id
            .as_str()
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{name}.json"))
    }

    async fn read_doc(&self, subject_id: &SubjectId) -> Result<Option<SubjectDocument>, StoreError> {
        let path = self.path_for(subject_id);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_doc(&self, subject_id: &SubjectId, doc: &SubjectDocument) -> Result<(), StoreError> {
        let path = self.path_for(subject_id);
        let bytes = serde_json::to_vec_pretty(doc)?;
        tokio::fs::write(&path, bytes).await?;
        Ok(())
    }
}

impl SubjectStore for JsonFileStore {
    fn save(&self, doc: SubjectDocument) -> impl Future<Output = Result<(), StoreError>> + Send {
        let store = self.clone();
        async move {
            let mut doc = doc;
            // Preserve the append-only history already on disk.
            if let Some(existing) = store.read_doc(&doc.subject_id).await? {
                doc.sessions = existing.sessions;
            }
            store.write_doc(&doc.subject_id, &doc).await
        }
    }

    fn append_session(
        &self,
        subject_id: SubjectId,
        record: SessionRecordDoc,
    ) -> impl Future<Output = Result<(), StoreError>> + Send {
        let store = self.clone();
        async move {
            let Some(mut doc) = store.read_doc(&subject_id).await? else {
                return Err(StoreError::DocumentMissing { subject_id });
            };
            doc.sessions.push(record);
            store.write_doc(&subject_id, &doc).await
        }
    }

    fn remove(&self, subject_id: SubjectId) -> impl Future<Output = Result<(), StoreError>> + Send {
        let store = self.clone();
        async move {
            let path = store.path_for(&subject_id);
            match tokio::fs::remove_file(&path).await {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(e.into()),
            }
        }
    }

    fn load_all(&self) -> impl Future<Output = Result<Vec<SubjectDocument>, StoreError>> + Send {
        let store = self.clone();
        async move {
            let mut docs = Vec::new();
            let mut entries = tokio::fs::read_dir(&store.dir).await?;

            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) != Some("json") {
                    continue;
                }

                let bytes = match tokio::fs::read(&path).await {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "Skipping unreadable subject document");
                        continue;
                    }
                };

                match serde_json::from_slice::<SubjectDocument>(&bytes) {
                    Ok(doc) if doc.subject_id.is_empty() => {
                        warn!(path = %path.display(), "Skipping subject document with empty id");
                    }
                    Ok(doc) => {
                        debug!(subject_id = %doc.subject_id, "Loaded subject document");
                        docs.push(doc);
                    }
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "Skipping malformed subject document");
                    }
                }
            }

            info!(count = docs.len(), dir = %store.dir.display(), "Subject documents loaded");
            Ok(docs)
        }
    }

    fn save_settings(
        &self,
        settings: EngineSettings,
    ) -> impl Future<Output = Result<(), StoreError>> + Send {
        let store = self.clone();
        async move {
            let bytes = serde_json::to_vec_pretty(&settings)?;
            tokio::fs::write(store.dir.join(SETTINGS_FILE), bytes).await?;
            Ok(())
        }
    }

    fn load_settings(
        &self,
    ) -> impl Future<Output = Result<Option<EngineSettings>, StoreError>> + Send {
        let store = self.clone();
        async move {
            let path = store.dir.join(SETTINGS_FILE);
            match tokio::fs::read(&path).await {
                Ok(bytes) => match serde_json::from_slice(&bytes) {
                    Ok(settings) => Ok(Some(settings)),
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "Skipping malformed settings document");
                        Ok(None)
                    }
                },
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
                Err(e) => Err(e.into()),
            }
        }
    }
}

// ============================================================================
// Memory Store
// ============================================================================

/// In-memory store for tests and embedded use.
///
/// Same save/append semantics as [`JsonFileStore`], without I/O.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    docs: Arc<Mutex<HashMap<SubjectId, SubjectDocument>>>,
    settings: Arc<Mutex<Option<EngineSettings>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the stored document for a subject, if any.
    pub fn document(&self, subject_id: &SubjectId) -> Option<SubjectDocument> {
        self.docs.lock().ok()?.get(subject_id).cloned()
    }

    /// Number of stored documents.
    pub fn len(&self) -> usize {
        self.docs.lock().map(|d| d.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Inserts a document directly, bypassing save semantics.
    ///
    /// Test seam for cold-start scenarios.
    pub fn seed(&self, doc: SubjectDocument) {
        if let Ok(mut docs) = self.docs.lock() {
            docs.insert(doc.subject_id.clone(), doc);
        }
    }
}

impl SubjectStore for MemoryStore {
    fn save(&self, doc: SubjectDocument) -> impl Future<Output = Result<(), StoreError>> + Send {
        let docs = self.docs.clone();
        async move {
            if let Ok(mut docs) = docs.lock() {
                let mut doc = doc;
                if let Some(existing) = docs.get(&doc.subject_id) {
                    doc.sessions = existing.sessions.clone();
                }
                docs.insert(doc.subject_id.clone(), doc);
            }
            Ok(())
        }
    }

    fn append_session(
        &self,
        subject_id: SubjectId,
        record: SessionRecordDoc,
    ) -> impl Future<Output = Result<(), StoreError>> + Send {
        let docs = self.docs.clone();
        async move {
            let mut docs = match docs.lock() {
                Ok(docs) => docs,
                Err(_) => return Ok(()),
            };
            match docs.get_mut(&subject_id) {
                Some(doc) => {
                    doc.sessions.push(record);
                    Ok(())
                }
                None => Err(StoreError::DocumentMissing { subject_id }),
            }
        }
    }

    fn remove(&self, subject_id: SubjectId) -> impl Future<Output = Result<(), StoreError>> + Send {
        let docs = self.docs.clone();
        async move {
            if let Ok(mut docs) = docs.lock() {
                docs.remove(&subject_id);
            }
            Ok(())
        }
    }

    fn load_all(&self) -> impl Future<Output = Result<Vec<SubjectDocument>, StoreError>> + Send {
        let docs = self.docs.clone();
        async move {
            Ok(docs
                .lock()
                .map(|d| d.values().cloned().collect())
                .unwrap_or_default())
        }
    }

    fn save_settings(
        &self,
        settings: EngineSettings,
    ) -> impl Future<Output = Result<(), StoreError>> + Send {
        let slot = self.settings.clone();
        async move {
            if let Ok(mut slot) = slot.lock() {
                *slot = Some(settings);
            }
            Ok(())
        }
    }

    fn load_settings(
        &self,
    ) -> impl Future<Output = Result<Option<EngineSettings>, StoreError>> + Send {
        let slot = self.settings.clone();
        async move { Ok(slot.lock().map(|s| s.clone()).unwrap_or_default()) }
    }
}

// ============================================================================
// Store Writer
// ============================================================================

/// Serializes all store writes through one queue.
///
/// The tracker actor issues writes fire-and-forget. Draining them
/// from a single task guarantees that writes land in the order the
/// state machine produced them: a snapshot save can never overtake
/// the session append it was paired with, and an older snapshot can
/// never overwrite a newer one. Write failures are logged and the
/// queue keeps draining.
#[derive(Debug, Clone)]
pub struct StoreWriter {
    sender: mpsc::UnboundedSender<WriteJob>,
}

#[derive(Debug)]
enum WriteJob {
    /// Upsert the snapshot, then append the closed session if any.
    Save {
        doc: SubjectDocument,
        closed: Option<SessionRecordDoc>,
    },
    Remove {
        subject_id: SubjectId,
    },
    Settings {
        settings: EngineSettings,
    },
}

impl StoreWriter {
    /// Spawns the writer task over a store and returns the queue handle.
    ///
    /// The task exits when every handle has been dropped and the queue
    /// has drained.
    pub fn spawn<S: SubjectStore>(store: S) -> Self {
        let (sender, mut receiver) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            while let Some(job) = receiver.recv().await {
                match job {
                    WriteJob::Save { doc, closed } => {
                        let subject_id = doc.subject_id.clone();
                        if let Err(e) = store.save(doc).await {
                            warn!(subject_id = %subject_id, error = %e, "Failed to persist subject snapshot");
                            continue;
                        }
                        if let Some(record) = closed {
                            if let Err(e) = store.append_session(subject_id.clone(), record).await {
                                warn!(subject_id = %subject_id, error = %e, "Failed to append session record");
                            }
                        }
                    }
                    WriteJob::Remove { subject_id } => {
                        if let Err(e) = store.remove(subject_id.clone()).await {
                            warn!(subject_id = %subject_id, error = %e, "Failed to remove subject document");
                        }
                    }
                    WriteJob::Settings { settings } => {
                        if let Err(e) = store.save_settings(settings).await {
                            warn!(error = %e, "Failed to persist engine settings");
                        }
                    }
                }
            }
            debug!("Store writer stopped: queue closed");
        });

        Self { sender }
    }

    /// Queues a snapshot upsert, optionally paired with the session
    /// the transition just closed.
    ///
    /// Send errors mean the writer task is gone; the mirrored write is
    /// dropped, matching the store's passive role.
    pub fn save(&self, doc: SubjectDocument, closed: Option<SessionRecordDoc>) {
        let _ = self.sender.send(WriteJob::Save { doc, closed });
    }

    /// Queues removal of a subject document.
    pub fn remove(&self, subject_id: SubjectId) {
        let _ = self.sender.send(WriteJob::Remove { subject_id });
    }

    /// Queues an engine-settings write.
    pub fn save_settings(&self, settings: EngineSettings) {
        let _ = self.sender.send(WriteJob::Settings { settings });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).single().expect("valid timestamp")
    }

    fn doc(id: &str) -> SubjectDocument {
        SubjectDocument {
            subject_id: SubjectId::new(id),
            destination_id: Some(DestinationId::new("chan-1")),
            state_label: Some(StateLabel::new("online")),
            started_at: at(0),
            longest_duration: 30.5,
            enrolled_at: at(0),
            sessions: Vec::new(),
        }
    }

    fn record() -> SessionRecordDoc {
        SessionRecordDoc {
            state_label: StateLabel::new("online"),
            start: at(0),
            end: at(30),
            duration_seconds: 30.0,
        }
    }

    #[test]
    fn test_document_roundtrip_through_state() {
        let (subject_id, subject, snapshot) = doc("user-1").into_state();
        assert_eq!(subject_id, SubjectId::new("user-1"));
        assert_eq!(subject.destination, Some(DestinationId::new("chan-1")));
        assert_eq!(snapshot.state_label, Some(StateLabel::new("online")));
        assert_eq!(snapshot.longest, Duration::milliseconds(30_500));

        let back = SubjectDocument::from_state(subject_id.clone(), &subject, &snapshot);
        assert_eq!(back.longest_duration, 30.5);
        assert_eq!(back.started_at, at(0));
    }

    #[test]
    fn test_started_at_serializes_as_rfc3339_text() {
        let json = serde_json::to_value(doc("user-1")).expect("serialize");
        let started = json
            .get("started_at")
            .and_then(|v| v.as_str())
            .expect("started_at should be a string");
        assert!(started.starts_with("2023-"));
    }

    #[tokio::test]
    async fn test_json_store_save_and_load() {
        let tmp = TempDir::new().expect("tempdir");
        let store = JsonFileStore::new(tmp.path()).expect("store");

        store.save(doc("user-1")).await.expect("save");
        store.save(doc("user-2")).await.expect("save");

        let docs = store.load_all().await.expect("load");
        assert_eq!(docs.len(), 2);
    }

    #[tokio::test]
    async fn test_json_store_save_preserves_sessions() {
        let tmp = TempDir::new().expect("tempdir");
        let store = JsonFileStore::new(tmp.path()).expect("store");

        store.save(doc("user-1")).await.expect("save");
        store
            .append_session(SubjectId::new("user-1"), record())
            .await
            .expect("append");

        // A later snapshot save must not wipe the history.
        store.save(doc("user-1")).await.expect("save");

        let docs = store.load_all().await.expect("load");
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].sessions.len(), 1);
    }

    #[tokio::test]
    async fn test_json_store_append_without_document_fails() {
        let tmp = TempDir::new().expect("tempdir");
        let store = JsonFileStore::new(tmp.path()).expect("store");

        let result = store
            .append_session(SubjectId::new("ghost"), record())
            .await;
        assert!(matches!(result, Err(StoreError::DocumentMissing { .. })));
    }

    #[tokio::test]
    async fn test_json_store_remove_is_idempotent() {
        let tmp = TempDir::new().expect("tempdir");
        let store = JsonFileStore::new(tmp.path()).expect("store");

        store.save(doc("user-1")).await.expect("save");
        store.remove(SubjectId::new("user-1")).await.expect("remove");
        store.remove(SubjectId::new("user-1")).await.expect("second remove");

        assert!(store.load_all().await.expect("load").is_empty());
    }

    #[tokio::test]
    async fn test_json_store_skips_malformed_documents() {
        let tmp = TempDir::new().expect("tempdir");
        let store = JsonFileStore::new(tmp.path()).expect("store");

        store.save(doc("user-1")).await.expect("save");
        tokio::fs::write(tmp.path().join("broken.json"), b"{ not json")
            .await
            .expect("write garbage");

        let docs = store.load_all().await.expect("load");
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].subject_id, SubjectId::new("user-1"));
    }

    #[tokio::test]
    async fn test_json_store_sanitizes_filenames() {
        let tmp = TempDir::new().expect("tempdir");
        let store = JsonFileStore::new(tmp.path()).expect("store");

        store.save(doc("../evil/../../id")).await.expect("save");

        let docs = store.load_all().await.expect("load");
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].subject_id, SubjectId::new("../evil/../../id"));
    }

    #[tokio::test]
    async fn test_json_store_settings_roundtrip() {
        let tmp = TempDir::new().expect("tempdir");
        let store = JsonFileStore::new(tmp.path()).expect("store");

        assert_eq!(store.load_settings().await.expect("load"), None);

        let settings = EngineSettings {
            default_destination: Some(DestinationId::new("general")),
        };
        store.save_settings(settings.clone()).await.expect("save");

        assert_eq!(store.load_settings().await.expect("load"), Some(settings));
        // The settings file is not a subject document.
        assert!(store.load_all().await.expect("load").is_empty());
    }

    #[tokio::test]
    async fn test_json_store_malformed_settings_treated_as_absent() {
        let tmp = TempDir::new().expect("tempdir");
        let store = JsonFileStore::new(tmp.path()).expect("store");

        tokio::fs::write(tmp.path().join("settings.state"), b"{ not json")
            .await
            .expect("write garbage");

        assert_eq!(store.load_settings().await.expect("load"), None);
    }

    #[tokio::test]
    async fn test_writer_preserves_write_order() {
        let store = MemoryStore::new();
        let writer = StoreWriter::spawn(store.clone());

        // Three snapshot saves in quick succession, the later two each
        // paired with a closed session. In-order draining means the
        // history holds both records and the last snapshot wins.
        let mut first = doc("user-1");
        first.state_label = Some(StateLabel::new("online"));
        writer.save(first, None);

        let mut second = doc("user-1");
        second.state_label = Some(StateLabel::new("idle"));
        writer.save(second, Some(record()));

        let mut third = doc("user-1");
        third.state_label = Some(StateLabel::new("offline"));
        let mut later = record();
        later.state_label = StateLabel::new("idle");
        writer.save(third, Some(later));

        writer.save_settings(EngineSettings {
            default_destination: Some(DestinationId::new("general")),
        });

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        let stored = store.document(&SubjectId::new("user-1")).expect("document");
        assert_eq!(stored.state_label, Some(StateLabel::new("offline")));
        assert_eq!(stored.sessions.len(), 2);
        assert_eq!(stored.sessions[0].state_label, StateLabel::new("online"));
        assert_eq!(stored.sessions[1].state_label, StateLabel::new("idle"));

        let settings = store.load_settings().await.expect("load").expect("settings");
        assert_eq!(settings.default_destination, Some(DestinationId::new("general")));
    }

    #[tokio::test]
    async fn test_memory_store_semantics_match() {
        let store = MemoryStore::new();

        store.save(doc("user-1")).await.expect("save");
        store
            .append_session(SubjectId::new("user-1"), record())
            .await
            .expect("append");
        store.save(doc("user-1")).await.expect("resave");

        let stored = store.document(&SubjectId::new("user-1")).expect("document");
        assert_eq!(stored.sessions.len(), 1);

        let result = store.append_session(SubjectId::new("ghost"), record()).await;
        assert!(matches!(result, Err(StoreError::DocumentMissing { .. })));
    }
}
