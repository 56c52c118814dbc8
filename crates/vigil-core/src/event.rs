//! Presence events delivered by the external presence source.
//!
//! The source is at-least-once: events may arrive out of order or in
//! rapid duplicate bursts. The engine copes with both; this module
//! only guarantees the event itself is well-formed before it crosses
//! the boundary.

use crate::error::{DomainError, DomainResult};
use crate::subject::{StateLabel, SubjectId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One observed presence change for a subject.
///
/// The closed representation of whatever the source delivers: a
/// subject, the state label observed now (`None` means "no active
/// state", e.g. a logout), and when the source observed it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceEvent {
    /// The subject whose presence changed.
    pub subject_id: SubjectId,

    /// The currently observed state label, or `None` for no state.
    #[serde(default)]
    pub label: Option<StateLabel>,

    /// When the source observed the change.
    ///
    /// Not guaranteed monotonic across sources; the session clock
    /// clamps negative spans.
    pub timestamp: DateTime<Utc>,
}

impl PresenceEvent {
    /// Creates a validated presence event.
    ///
    /// # Errors
    ///
    /// - `DomainError::EmptySubjectId` if the subject id is empty
    /// - `DomainError::EmptyStateLabel` if the label is present but empty
    pub fn new(
        subject_id: SubjectId,
        label: Option<StateLabel>,
        timestamp: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let event = Self {
            subject_id,
            label,
            timestamp,
        };
        event.validate()?;
        Ok(event)
    }

    /// Validates boundary invariants.
    ///
    /// Deserialized events must pass through here before reaching the
    /// transition engine.
    pub fn validate(&self) -> DomainResult<()> {
        if self.subject_id.is_empty() {
            return Err(DomainError::EmptySubjectId);
        }
        if let Some(label) = &self.label {
            if label.is_empty() {
                return Err(DomainError::EmptyStateLabel {
                    subject_id: self.subject_id.to_string(),
                });
            }
        }
        Ok(())
    }
}
