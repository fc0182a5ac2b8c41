//! Domain error types
//!
//! This module defines error types specific to domain operations, plus the
//! delivery-outcome taxonomy the sync processor matches on when a remote
//! call fails.

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// ID parsing error
    #[error("Invalid ID format: {0}")]
    InvalidId(String),

    /// Unrecognized HTTP action stored for a queue entry
    #[error("Invalid queue action: {0}")]
    InvalidAction(String),

    /// Queue entry payload is not a JSON document
    #[error("Invalid queue payload: {0}")]
    InvalidPayload(String),

    /// Generic validation failure
    #[error("Validation failed: {0}")]
    ValidationFailed(String),
}

/// Classified failure of one remote delivery attempt
///
/// The sync processor decides what happens to a queue entry from this
/// classification alone: `Business` discards the entry and notifies the
/// user, `Connectivity` aborts the drain pass, everything else counts as
/// transient and bumps the entry's attempt counter.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// Server rejected the operation with a business invariant violation
    /// (negative stock, duplicate key). Retrying is pointless.
    #[error("Business rule rejected by server: {0}")]
    Business(String),

    /// No usable response: connection refused, aborted, reset, or timed out
    #[error("Network unreachable: {0}")]
    Connectivity(String),

    /// Response arrived with a non-success status that is not a recognized
    /// business violation
    #[error("Server returned status {status}: {message}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body, truncated for logging
        message: String,
    },

    /// Response body could not be decoded
    #[error("Failed to decode server response: {0}")]
    Decode(String),
}

impl RemoteError {
    /// True when the failure means the backend could not be reached at all,
    /// which aborts the current drain pass.
    #[must_use]
    pub fn is_connectivity(&self) -> bool {
        matches!(self, Self::Connectivity(_))
    }

    /// True when the failure is a server-side business violation.
    #[must_use]
    pub fn is_business(&self) -> bool {
        matches!(self, Self::Business(_))
    }
}
