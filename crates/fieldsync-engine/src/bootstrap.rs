//! Cache bootstrapper - bulk reference-data refresh with a staleness gate
//!
//! Keeps the local customer and product mirrors usable offline. A refresh
//! runs when any reference table is empty, when no refresh timestamp is
//! recorded, or when the last refresh is older than the configured TTL;
//! otherwise the cached data is considered fresh and nothing is fetched.
//!
//! The two reference types refresh independently: a failed fetch is
//! logged and surfaced as a notification but never aborts the other type.
//! The refresh timestamp advances when at least one type succeeded; a
//! type that failed while still empty forces another attempt on the next
//! call through the empty-table condition.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use tracing::{debug, info, warn};

use fieldsync_core::config::Config;
use fieldsync_core::ports::local_store::ILocalStore;
use fieldsync_core::ports::notification::{INotificationService, Notification};
use fieldsync_core::ports::remote_api::IRemoteApi;

/// Meta key holding the last successful refresh, epoch milliseconds
const LAST_REFRESH_KEY: &str = "reference_last_refresh_ms";

// ============================================================================
// RefreshReport
// ============================================================================

/// How a refresh call ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Cache populated and within TTL; nothing was fetched
    Fresh,
    /// At least one reference type was fetched and stored
    Refreshed,
    /// Every fetch failed; the timestamp was not advanced
    Failed,
}

/// Summary of a refresh call
#[derive(Debug, Clone)]
pub struct RefreshReport {
    /// How the call ended
    pub outcome: RefreshOutcome,
    /// Customer rows upserted, `None` when the fetch failed or was skipped
    pub customers_upserted: Option<usize>,
    /// Product rows upserted, `None` when the fetch failed or was skipped
    pub products_upserted: Option<usize>,
}

// ============================================================================
// CacheBootstrapper
// ============================================================================

/// TTL-gated bulk refresh of the reference cache
pub struct CacheBootstrapper {
    /// Cache tables and the refresh timestamp
    store: Arc<dyn ILocalStore + Send + Sync>,
    /// Bulk reference endpoints
    remote: Arc<dyn IRemoteApi + Send + Sync>,
    /// Sink for refresh-failure messages
    notifier: Arc<dyn INotificationService + Send + Sync>,
    /// Maximum age of the cache before a refresh is due
    ttl: Duration,
    /// Rows requested per bulk fetch
    fetch_limit: u32,
}

impl CacheBootstrapper {
    /// Creates a new `CacheBootstrapper`
    ///
    /// # Arguments
    /// * `store` - Cache storage
    /// * `remote` - Backend client for the bulk endpoints
    /// * `notifier` - Notification sink for refresh failures
    /// * `config` - Application configuration for TTL and fetch limit
    pub fn new(
        store: Arc<dyn ILocalStore + Send + Sync>,
        remote: Arc<dyn IRemoteApi + Send + Sync>,
        notifier: Arc<dyn INotificationService + Send + Sync>,
        config: &Config,
    ) -> Self {
        Self {
            store,
            remote,
            notifier,
            ttl: Duration::from_secs(config.cache.ttl_hours * 3600),
            fetch_limit: config.cache.bootstrap_limit,
        }
    }

    /// Refreshes the reference cache when it is stale
    ///
    /// Checks the staleness conditions and either returns `Fresh` without
    /// touching the network, or bulk-fetches each reference type. Fetch
    /// failures are soft: they are logged, surfaced once as a
    /// notification, and reported as `None` in the summary. Local store
    /// failures propagate.
    #[tracing::instrument(skip(self))]
    pub async fn refresh_if_stale(&self) -> Result<RefreshReport> {
        let customer_count = self.store.customer_count().await?;
        let product_count = self.store.product_count().await?;
        let last_refresh = self.last_refresh_millis().await?;

        if !self.is_stale(customer_count, product_count, last_refresh) {
            debug!(
                customer_count,
                product_count, "Reference cache fresh, skipping refresh"
            );
            return Ok(RefreshReport {
                outcome: RefreshOutcome::Fresh,
                customers_upserted: None,
                products_upserted: None,
            });
        }

        info!(
            customer_count,
            product_count,
            limit = self.fetch_limit,
            "Refreshing reference cache"
        );

        let customers_upserted = match self.remote.fetch_customers(self.fetch_limit).await {
            Ok(rows) => {
                self.store.upsert_customers(&rows).await?;
                debug!(rows = rows.len(), "Customer reference data refreshed");
                Some(rows.len())
            }
            Err(err) => {
                warn!(error = %err, "Customer reference fetch failed");
                None
            }
        };

        let products_upserted = match self.remote.fetch_products(self.fetch_limit).await {
            Ok(rows) => {
                self.store.upsert_products(&rows).await?;
                debug!(rows = rows.len(), "Product reference data refreshed");
                Some(rows.len())
            }
            Err(err) => {
                warn!(error = %err, "Product reference fetch failed");
                None
            }
        };

        let mut failed_types = Vec::new();
        if customers_upserted.is_none() {
            failed_types.push("customers");
        }
        if products_upserted.is_none() {
            failed_types.push("products");
        }
        if !failed_types.is_empty() {
            self.notify_failure(&failed_types.join(" and ")).await;
        }

        if customers_upserted.is_none() && products_upserted.is_none() {
            return Ok(RefreshReport {
                outcome: RefreshOutcome::Failed,
                customers_upserted,
                products_upserted,
            });
        }

        // A type that failed while its table is still empty forces another
        // attempt on the next call, so advancing the clock here is safe.
        let now = Utc::now().timestamp_millis();
        self.store.set_meta(LAST_REFRESH_KEY, &now.to_string()).await?;

        Ok(RefreshReport {
            outcome: RefreshOutcome::Refreshed,
            customers_upserted,
            products_upserted,
        })
    }

    /// Reads the recorded refresh timestamp; unparseable values count as absent
    async fn last_refresh_millis(&self) -> Result<Option<i64>> {
        let value = self.store.get_meta(LAST_REFRESH_KEY).await?;
        Ok(value.and_then(|v| v.parse().ok()))
    }

    /// Staleness gate: any empty table, no timestamp, or TTL exceeded
    fn is_stale(&self, customer_count: u64, product_count: u64, last_refresh: Option<i64>) -> bool {
        if customer_count == 0 || product_count == 0 {
            return true;
        }
        match last_refresh {
            None => true,
            Some(ms) => {
                let age = Utc::now().timestamp_millis().saturating_sub(ms);
                age > self.ttl.as_millis() as i64
            }
        }
    }

    async fn notify_failure(&self, failed: &str) {
        let notification = Notification::sync(
            "Reference data refresh failed",
            format!(
                "Could not refresh {} from the backend; cached data stays in use",
                failed
            ),
        );
        if let Err(err) = self.notifier.notify(&notification).await {
            warn!(error = %err, "Failed to deliver refresh notification");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
