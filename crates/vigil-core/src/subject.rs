//! Type-safe identifiers and the tracked-subject entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Type-Safe Identifiers
// ============================================================================

/// Opaque stable identifier for a tracked subject.
///
/// Wraps whatever the presence source uses to identify entities
/// (e.g. a user snowflake rendered as a string). The engine never
/// interprets the contents.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubjectId(String);

impl SubjectId {
    /// Creates a new SubjectId from a string.
    ///
    /// Note: This does not validate the format. The presence source
    /// provides the identifier, so we trust its shape.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the underlying string reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if the identifier is empty.
    ///
    /// Empty identifiers are rejected at the event boundary; they can
    /// only appear in hand-built values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for SubjectId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SubjectId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for SubjectId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Identifier of a notification destination (e.g. a channel).
///
/// Opaque to the engine; only the notification sink knows how to
/// route it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DestinationId(String);

impl DestinationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DestinationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for DestinationId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for DestinationId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A presence state or activity label (e.g. "online", "Playing Doom").
///
/// The engine treats labels as opaque strings; equality of labels is
/// what defines "same state".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateLabel(String);

impl StateLabel {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for StateLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for StateLabel {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for StateLabel {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

// ============================================================================
// Tracked Subject
// ============================================================================

/// Tracking configuration for one enrolled subject.
///
/// Created by the enroll operation and destroyed by unenroll. The
/// current session snapshot lives alongside this in the registry; the
/// two are stored as one entry but mutated through separate contracts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedSubject {
    /// Per-subject notification destination override.
    ///
    /// `None` falls back to the process-wide default destination.
    pub destination: Option<DestinationId>,

    /// When the subject was enrolled.
    pub enrolled_at: DateTime<Utc>,
}

impl TrackedSubject {
    /// Creates a new tracked subject enrolled at the given instant.
    pub fn new(destination: Option<DestinationId>, enrolled_at: DateTime<Utc>) -> Self {
        Self {
            destination,
            enrolled_at,
        }
    }
}
