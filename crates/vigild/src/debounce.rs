//! Debounce gate - collapses duplicate presence-event bursts.
//!
//! The presence source delivers at-least-once and tends to fire the
//! same change several times within a second. The gate keeps one
//! last-accepted timestamp per subject and rejects events that land
//! inside the trailing window. Entries are evicted after a TTL by a
//! periodic reaper pass so the map stays bounded; eviction is
//! deliberately decoupled from the accept/reject decision, which is a
//! single O(1) map lookup.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use vigil_core::SubjectId;

/// Default trailing window within which duplicates are suppressed.
pub const DEFAULT_WINDOW_MS: u64 = 1_000;

/// Default TTL after which per-subject entries are evicted.
pub const DEFAULT_TTL_MS: u64 = 10_000;

/// Per-subject duplicate suppression with bounded memory.
#[derive(Debug)]
pub struct DebounceGate {
    window: Duration,
    ttl: Duration,
    last_accepted: HashMap<SubjectId, DateTime<Utc>>,
}

impl DebounceGate {
    /// Creates a gate with the default window and TTL.
    pub fn new() -> Self {
        Self::with_settings(DEFAULT_WINDOW_MS, DEFAULT_TTL_MS)
    }

    /// Creates a gate with explicit window and TTL in milliseconds.
    pub fn with_settings(window_ms: u64, ttl_ms: u64) -> Self {
        Self {
            window: Duration::milliseconds(window_ms as i64),
            ttl: Duration::milliseconds(ttl_ms as i64),
            last_accepted: HashMap::new(),
        }
    }

    /// Decides whether a processing cycle should run for this subject.
    ///
    /// Returns `true` and records `now` unless an acceptance for the
    /// same subject already exists within the trailing window. A
    /// `now` that precedes the recorded acceptance (wall clock moved
    /// backwards) is accepted and re-recorded rather than suppressed.
    pub fn should_process(&mut self, subject_id: &SubjectId, now: DateTime<Utc>) -> bool {
        if let Some(&last) = self.last_accepted.get(subject_id) {
            let since = now.signed_duration_since(last);
            if since >= Duration::zero() && since < self.window {
                return false;
            }
        }
        self.last_accepted.insert(subject_id.clone(), now);
        true
    }

    /// Removes entries whose last acceptance is older than the TTL.
    ///
    /// Returns the number of evicted entries. Driven by the reaper
    /// tick; never called on the accept/reject path.
    pub fn evict_expired(&mut self, now: DateTime<Utc>) -> usize {
        let ttl = self.ttl;
        let before = self.last_accepted.len();
        self.last_accepted
            .retain(|_, &mut last| now.signed_duration_since(last) < ttl);
        before - self.last_accepted.len()
    }

    /// Number of subjects currently held in the gate.
    pub fn len(&self) -> usize {
        self.last_accepted.len()
    }

    /// Returns true if no entries are held.
    pub fn is_empty(&self) -> bool {
        self.last_accepted.is_empty()
    }
}

impl Default for DebounceGate {
    fn default() -> Self {
        Self::new()
    }
}
