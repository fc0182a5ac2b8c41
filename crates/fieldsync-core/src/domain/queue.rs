//! Mutation-queue entry
//!
//! A [`QueuedOperation`] is one pending write awaiting delivery to the
//! backend. Entries are append-only: action, target resource and creation
//! time never change once enqueued. The only permitted in-place mutations
//! are the attempt counter bump after a transient failure and the payload
//! rewrite performed by the id-remap protocol.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::errors::DomainError;
use super::newtypes::{EntryId, RecordId};

/// Target resource of the no-op probe entries the mobile client leaves
/// behind when testing connectivity. The processor deletes them without
/// issuing a network call.
pub const SANITY_MARKER_RESOURCE: &str = "sanity_check";

/// HTTP verb a queue entry replays against the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpAction {
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpAction {
    /// Canonical uppercase form, as persisted in the `acao` column
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl Display for HttpAction {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for HttpAction {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "PATCH" => Ok(Self::Patch),
            "DELETE" => Ok(Self::Delete),
            other => Err(DomainError::InvalidAction(other.to_string())),
        }
    }
}

/// One pending write in the mutation queue
///
/// Entries are processed in `created_at` ascending order and exist exactly
/// until the backend durably confirms them or the server classifies them as
/// fatally non-retryable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedOperation {
    id: EntryId,
    action: HttpAction,
    target_resource: String,
    local_record_id: Option<RecordId>,
    payload: Value,
    attempts: u32,
    created_at: DateTime<Utc>,
}

impl QueuedOperation {
    /// Create a fresh entry with zero attempts, stamped now
    #[must_use]
    pub fn new(
        action: HttpAction,
        target_resource: impl Into<String>,
        payload: Value,
        local_record_id: Option<RecordId>,
    ) -> Self {
        Self {
            id: EntryId::new(),
            action,
            target_resource: target_resource.into(),
            local_record_id,
            payload,
            attempts: 0,
            created_at: Utc::now(),
        }
    }

    /// Rehydrate an entry from its stored columns
    ///
    /// Intended for the storage adapter only; domain code creates entries
    /// through [`QueuedOperation::new`].
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        id: EntryId,
        action: HttpAction,
        target_resource: String,
        local_record_id: Option<RecordId>,
        payload: Value,
        attempts: u32,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            action,
            target_resource,
            local_record_id,
            payload,
            attempts,
            created_at,
        }
    }

    /// Unique entry id
    #[must_use]
    pub fn id(&self) -> EntryId {
        self.id
    }

    /// HTTP verb to replay
    #[must_use]
    pub fn action(&self) -> HttpAction {
        self.action
    }

    /// Endpoint path relative to the API root
    #[must_use]
    pub fn target_resource(&self) -> &str {
        &self.target_resource
    }

    /// Local record the operation correlates to, when the caller supplied one
    #[must_use]
    pub fn local_record_id(&self) -> Option<&RecordId> {
        self.local_record_id.as_ref()
    }

    /// Serialized document sent as the request body
    #[must_use]
    pub fn payload(&self) -> &Value {
        &self.payload
    }

    /// Number of failed delivery attempts so far
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Enqueue timestamp; the queue drains in ascending order of this value
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Enqueue timestamp as epoch milliseconds, the persisted form
    #[must_use]
    pub fn created_at_millis(&self) -> i64 {
        self.created_at.timestamp_millis()
    }

    /// Whether this entry is a connectivity probe to delete without sending
    #[must_use]
    pub fn is_sanity_marker(&self) -> bool {
        self.target_resource == SANITY_MARKER_RESOURCE
    }

    /// Bump the attempt counter after a transient delivery failure
    pub fn record_attempt(&mut self) {
        self.attempts += 1;
    }

    /// Replace the payload with an id-rewritten document
    ///
    /// Only the remap protocol may call this; nothing else mutates a stored
    /// payload.
    pub fn rewrite_payload(&mut self, payload: Value) {
        self.payload = payload;
    }
}
