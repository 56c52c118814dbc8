//! Domain-specific error types following panic-free policy.

use thiserror::Error;

/// Errors that can occur when validating incoming domain data.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Presence event arrived with an empty subject identifier.
    #[error("presence event has an empty subject id")]
    EmptySubjectId,

    /// Presence event carried a label that is present but empty.
    ///
    /// "No state" is expressed as a null label, never an empty string.
    #[error("presence event for {subject_id} has an empty state label")]
    EmptyStateLabel { subject_id: String },
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
