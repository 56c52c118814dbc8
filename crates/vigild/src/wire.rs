//! JSONL ingest/control line protocol.
//!
//! The binary consumes newline-delimited JSON objects, each tagged
//! with a `type` field. Presence events and control-plane operations
//! share the same stream; malformed lines are logged and skipped by
//! the caller, never fatal.
//!
//! Examples:
//!
//! ```json
//! {"type": "track", "subject_id": "42", "destination_id": "general", "label": "online"}
//! {"type": "presence", "subject_id": "42", "label": "idle", "timestamp": "2024-06-01T12:00:00Z"}
//! {"type": "leaderboard", "limit": 5}
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use vigil_core::{DomainResult, PresenceEvent, StateLabel, SubjectId};

/// One line of the ingest/control stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputLine {
    /// A presence-change event from the source.
    Presence {
        subject_id: String,
        #[serde(default)]
        label: Option<String>,
        timestamp: DateTime<Utc>,
    },

    /// Enroll a subject, optionally binding a destination and
    /// recording its currently observed state.
    Track {
        subject_id: String,
        #[serde(default)]
        destination_id: Option<String>,
        #[serde(default)]
        label: Option<String>,
    },

    /// Unenroll a subject.
    Untrack { subject_id: String },

    /// Set the process-wide default destination.
    SetDefaultDestination { destination_id: String },

    /// List tracked subjects with their current session state.
    List,

    /// Best-session leaderboard, top `limit` (engine default if absent).
    Leaderboard {
        #[serde(default)]
        limit: Option<usize>,
    },
}

impl InputLine {
    /// Parses one line of input.
    pub fn parse(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line)
    }
}

/// Converts a `Presence` line into a validated domain event.
///
/// Only meaningful for [`InputLine::Presence`]; returns `None` for
/// other variants.
pub fn presence_event(line: &InputLine) -> Option<DomainResult<PresenceEvent>> {
    match line {
        InputLine::Presence {
            subject_id,
            label,
            timestamp,
        } => Some(PresenceEvent::new(
            SubjectId::new(subject_id.clone()),
            label.clone().map(StateLabel::new),
            *timestamp,
        )),
        _ => None,
    }
}
