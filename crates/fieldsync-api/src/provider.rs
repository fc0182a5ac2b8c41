//! RemoteApiProvider - IRemoteApi implementation for the backend REST API
//!
//! Wraps the [`RemoteClient`] and delegates each port method to it.
//!
//! ## Design Notes
//!
//! - No interior mutability is needed: every [`RemoteClient`] method takes
//!   `&self`, and the bearer token is fixed at construction time, so the
//!   provider holds the client directly instead of behind a mutex.
//! - Error classification for `deliver` lives in the client, which is the
//!   only layer that sees both the transport error and the response body.

use anyhow::Result;
use serde_json::Value;

use fieldsync_core::domain::errors::RemoteError;
use fieldsync_core::domain::queue::QueuedOperation;
use fieldsync_core::domain::reference::{Customer, Product};
use fieldsync_core::ports::remote_api::IRemoteApi;

use crate::client::RemoteClient;

// ============================================================================
// RemoteApiProvider
// ============================================================================

/// Backend API implementation that delegates to a [`RemoteClient`]
pub struct RemoteApiProvider {
    /// The underlying HTTP client
    client: RemoteClient,
}

impl RemoteApiProvider {
    /// Creates a new `RemoteApiProvider` wrapping the given [`RemoteClient`]
    pub fn new(client: RemoteClient) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl IRemoteApi for RemoteApiProvider {
    /// Sends one queued operation to the backend
    ///
    /// Delegates to [`RemoteClient::deliver`], which issues exactly one
    /// request and classifies any failure.
    async fn deliver(&self, entry: &QueuedOperation) -> Result<Value, RemoteError> {
        self.client.deliver(entry).await
    }

    /// Cheap reachability check against the backend root
    async fn probe_connectivity(&self) -> bool {
        self.client.probe_connectivity().await
    }

    /// Bulk-fetches customer reference data, up to `limit` rows
    async fn fetch_customers(&self, limit: u32) -> Result<Vec<Customer>> {
        self.client.fetch_customers(limit).await
    }

    /// Bulk-fetches product reference data, up to `limit` rows
    async fn fetch_products(&self, limit: u32) -> Result<Vec<Product>> {
        self.client.fetch_products(limit).await
    }

    /// Searches customers on the backend by free-text term
    async fn search_customers(
        &self,
        term: &str,
        company: Option<&str>,
    ) -> Result<Vec<Customer>> {
        self.client.search_customers(term, company).await
    }

    /// Searches products on the backend by free-text term
    async fn search_products(&self, term: &str) -> Result<Vec<Product>> {
        self.client.search_products(term).await
    }
}
