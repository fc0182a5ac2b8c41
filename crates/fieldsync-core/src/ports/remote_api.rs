//! Remote API port (driven/secondary port)
//!
//! This module defines the interface to the backend: queued-operation
//! delivery, a cheap reachability probe, and the reference-data fetch and
//! search endpoints.
//!
//! ## Design Notes
//!
//! - `deliver` returns `Result<Value, RemoteError>` instead of
//!   `anyhow::Result` because the sync processor's per-entry outcome
//!   (discard, abort the pass, or retry later) is decided entirely by the
//!   error classification; the adapter owns that classification because
//!   only it sees the transport error and the response body.
//! - Reference fetches and searches use `anyhow::Result` like the other
//!   ports; their callers only log failures and fall back to the cache.
//! - `probe_connectivity` returns a plain bool: any failure to reach the
//!   backend simply means "offline".

use serde_json::Value;

use crate::domain::{
    errors::RemoteError,
    queue::QueuedOperation,
    reference::{Customer, Product},
};

// ============================================================================
// IRemoteApi trait
// ============================================================================

/// Port trait for backend communication
///
/// ## Implementation Notes
///
/// - `deliver` issues exactly one request using the entry's stored
///   method, resource path, and payload; it never retries internally.
///   Retry policy lives in the sync processor.
/// - The success value is the decoded JSON response body (`Value::Null`
///   for empty bodies); the processor inspects it for an id mapping.
#[async_trait::async_trait]
pub trait IRemoteApi: Send + Sync {
    /// Sends one queued operation to the backend
    ///
    /// Returns the decoded response body on success, or a classified
    /// [`RemoteError`] on failure.
    async fn deliver(&self, entry: &QueuedOperation) -> Result<Value, RemoteError>;

    /// Cheap reachability check against the backend root
    ///
    /// Returns `true` when any response arrives with a status below 500;
    /// transport failures and server errors both count as offline.
    async fn probe_connectivity(&self) -> bool;

    // --- Reference data (bootstrap) ---

    /// Bulk-fetches customer reference data, up to `limit` rows
    async fn fetch_customers(&self, limit: u32) -> anyhow::Result<Vec<Customer>>;

    /// Bulk-fetches product reference data, up to `limit` rows
    async fn fetch_products(&self, limit: u32) -> anyhow::Result<Vec<Product>>;

    // --- Reference data (search) ---

    /// Searches customers on the backend by free-text term
    ///
    /// `company` adds a tenant equality filter when present.
    async fn search_customers(
        &self,
        term: &str,
        company: Option<&str>,
    ) -> anyhow::Result<Vec<Customer>>;

    /// Searches products on the backend by free-text term
    async fn search_products(&self, term: &str) -> anyhow::Result<Vec<Product>>;
}
