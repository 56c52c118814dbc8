//! Vigil Core - Shared domain types for presence session tracking
//!
//! This crate provides the pure domain layer shared between the
//! engine (vigild) and any client code: identifiers, presence events,
//! session snapshots and records, and the session clock.
//!
//! All code follows the panic-free policy: no `.unwrap()`, `.expect()`,
//! `panic!()`, `unreachable!()`, `todo!()`, or direct indexing `[i]`.

pub mod clock;
pub mod error;
pub mod event;
pub mod session;
pub mod subject;

// Re-exports for convenience
pub use clock::{elapsed, format_clock, format_duration};
pub use error::{DomainError, DomainResult};
pub use event::PresenceEvent;
pub use session::{LeaderboardEntry, SessionRecord, SessionSnapshot, SubjectOverview};
pub use subject::{DestinationId, StateLabel, SubjectId, TrackedSubject};
