//! Session domain entities and read models.
//!
//! A *session* is the contiguous interval during which a subject held
//! one state label. The engine keeps exactly one current
//! [`SessionSnapshot`] per tracked subject and appends a
//! [`SessionRecord`] every time a session closes.

use crate::clock;
use crate::subject::{StateLabel, SubjectId};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

// ============================================================================
// Session Snapshot
// ============================================================================

/// The current session of one tracked subject.
///
/// Replaced wholesale on each genuine transition (closing one session
/// implicitly opens the next), never partially mutated.
///
/// Invariants:
/// - `started_at` ≤ the timestamp of the most recently processed
///   event for the subject.
/// - `longest` is monotonically non-decreasing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    /// The current state label, or `None` for no active state.
    pub state_label: Option<StateLabel>,

    /// When the current state began.
    pub started_at: DateTime<Utc>,

    /// The largest closed-session duration ever observed.
    pub longest: Duration,
}

impl SessionSnapshot {
    /// Creates the initial snapshot at enrollment time.
    ///
    /// The label is whatever state the subject is observed in at
    /// enrollment; the best-session counter starts at zero.
    pub fn initial(state_label: Option<StateLabel>, enrolled_at: DateTime<Utc>) -> Self {
        Self {
            state_label,
            started_at: enrolled_at,
            longest: Duration::zero(),
        }
    }

    /// Elapsed time in the current state as of `now`.
    pub fn elapsed_in_state(&self, now: DateTime<Utc>) -> Duration {
        clock::elapsed(self.started_at, now)
    }
}

// ============================================================================
// Session Record
// ============================================================================

/// A closed session, produced when a subject leaves a state.
///
/// Append-only: never mutated after creation. `duration` equals
/// `end − start` exactly (after clock-skew clamping), to sub-second
/// precision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    pub subject_id: SubjectId,
    pub state_label: StateLabel,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub duration: Duration,
}

impl SessionRecord {
    /// Closes a session over `[start, end]`.
    ///
    /// Computes the duration through the session clock, so skewed
    /// timestamps clamp to a zero-length session rather than a
    /// negative one.
    pub fn close(
        subject_id: SubjectId,
        state_label: StateLabel,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Self {
        let duration = clock::elapsed(start, end);
        Self {
            subject_id,
            state_label,
            start,
            end,
            duration,
        }
    }
}

// ============================================================================
// Read Models
// ============================================================================

/// Per-subject row for the list operation.
#[derive(Debug, Clone, Serialize)]
pub struct SubjectOverview {
    pub subject_id: SubjectId,
    /// Destination after precedence resolution, if any resolves.
    pub destination: Option<String>,
    /// Current state label, if any.
    pub state_label: Option<String>,
    /// Elapsed time in the current state, formatted `{H}h {M}m {S}s`.
    pub elapsed_in_state: String,
    /// Longest recorded session, formatted `{H}h {M}m {S}s`.
    pub longest_session: String,
}

/// One row of the best-session leaderboard.
#[derive(Debug, Clone, Serialize)]
pub struct LeaderboardEntry {
    pub subject_id: SubjectId,
    /// Longest recorded session in seconds.
    pub longest_seconds: f64,
    /// Longest recorded session, formatted `H:MM:SS`.
    pub longest_display: String,
}

impl LeaderboardEntry {
    pub fn new(subject_id: SubjectId, longest: Duration) -> Self {
        Self {
            subject_id,
            longest_seconds: longest.num_milliseconds() as f64 / 1000.0,
            longest_display: clock::format_clock(longest),
        }
    }
}
