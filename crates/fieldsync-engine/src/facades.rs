//! Repository façades - remote-first search with local fallback
//!
//! [`CustomerDirectory`] and [`ProductCatalog`] answer search queries from
//! the backend when it is reachable and from the reference cache when it
//! is not. Remote results are persisted into the cache by a detached task
//! whose failures are logged and never reach the caller; the search
//! answer does not wait on the cache write.
//!
//! A failed remote call doubles as the offline check: there is no
//! separate connectivity probe on this path.

use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, warn};

use fieldsync_core::domain::reference::{Customer, Product};
use fieldsync_core::ports::local_store::{ILocalStore, ReferenceFilter};
use fieldsync_core::ports::remote_api::IRemoteApi;

// ============================================================================
// CustomerDirectory
// ============================================================================

/// Customer search over the backend plus the reference cache
pub struct CustomerDirectory {
    /// Reference cache
    store: Arc<dyn ILocalStore + Send + Sync>,
    /// Backend search endpoint
    remote: Arc<dyn IRemoteApi + Send + Sync>,
}

impl CustomerDirectory {
    /// Creates a new `CustomerDirectory`
    pub fn new(
        store: Arc<dyn ILocalStore + Send + Sync>,
        remote: Arc<dyn IRemoteApi + Send + Sync>,
    ) -> Self {
        Self { store, remote }
    }

    /// Searches customers by free-text term, optionally filtered by company
    ///
    /// Remote results win; the cache answers only when the backend call
    /// fails. Remote hits are cached in the background.
    pub async fn search(&self, term: &str, company: Option<&str>) -> Result<Vec<Customer>> {
        match self.remote.search_customers(term, company).await {
            Ok(results) => {
                debug!(term, results = results.len(), "Remote customer search answered");
                if !results.is_empty() {
                    let store = self.store.clone();
                    let rows = results.clone();
                    tokio::spawn(async move {
                        if let Err(err) = store.upsert_customers(&rows).await {
                            warn!(error = %err, "Failed to cache customer search results");
                        }
                    });
                }
                Ok(results)
            }
            Err(err) => {
                debug!(term, error = %err, "Remote customer search failed, using cache");
                let mut filter = ReferenceFilter::new().with_term(term);
                if let Some(company) = company {
                    filter = filter.with_company(company);
                }
                self.store.search_customers(&filter).await
            }
        }
    }
}

// ============================================================================
// ProductCatalog
// ============================================================================

/// Product search over the backend plus the reference cache
pub struct ProductCatalog {
    /// Reference cache
    store: Arc<dyn ILocalStore + Send + Sync>,
    /// Backend search endpoint
    remote: Arc<dyn IRemoteApi + Send + Sync>,
}

impl ProductCatalog {
    /// Creates a new `ProductCatalog`
    pub fn new(
        store: Arc<dyn ILocalStore + Send + Sync>,
        remote: Arc<dyn IRemoteApi + Send + Sync>,
    ) -> Self {
        Self { store, remote }
    }

    /// Searches products by free-text term
    ///
    /// The cached fallback matches the term against product names and
    /// codes, mirroring the backend search.
    pub async fn search(&self, term: &str) -> Result<Vec<Product>> {
        match self.remote.search_products(term).await {
            Ok(results) => {
                debug!(term, results = results.len(), "Remote product search answered");
                if !results.is_empty() {
                    let store = self.store.clone();
                    let rows = results.clone();
                    tokio::spawn(async move {
                        if let Err(err) = store.upsert_products(&rows).await {
                            warn!(error = %err, "Failed to cache product search results");
                        }
                    });
                }
                Ok(results)
            }
            Err(err) => {
                debug!(term, error = %err, "Remote product search failed, using cache");
                let filter = ReferenceFilter::new().with_term(term);
                self.store.search_products(&filter).await
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
