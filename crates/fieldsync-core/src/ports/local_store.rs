//! Local store port (driven/secondary port)
//!
//! This module defines the interface for durable on-device storage: the
//! mutation queue, the typed service-order tables, the reference cache,
//! and a small metadata key/value area.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because storage errors are adapter-specific
//!   (SQLite, filesystem, etc.) and don't need domain-level classification.
//! - `create_order_with_queue` and `apply_id_remap` are single trait
//!   methods rather than sequences of smaller calls: each corresponds to
//!   one local transaction whose steps must commit or roll back together.
//! - All write operations take references to domain entities, allowing
//!   the caller to retain ownership.

use serde_json::Value;

use crate::domain::{
    newtypes::{EntryId, RecordId},
    queue::QueuedOperation,
    reference::{Customer, Product},
    remap::{IdMapping, RemapReport},
    LaborLine, PartLine, ServiceLine, ServiceOrder,
};

// ============================================================================
// ReferenceFilter struct
// ============================================================================

/// Filter criteria for querying the reference cache
///
/// All fields are optional; when `None`, no filtering is applied for that
/// field. Multiple filters are combined with AND logic. The term match is a
/// case-insensitive substring match on the entity's indexed text fields;
/// wildcard characters in the term match literally.
///
/// # Example
///
/// ```
/// use fieldsync_core::ports::ReferenceFilter;
///
/// // All products of company "1" whose name contains "filtro"
/// let filter = ReferenceFilter::new()
///     .with_term("filtro")
///     .with_company("1");
/// ```
#[derive(Debug, Clone, Default)]
pub struct ReferenceFilter {
    /// Substring to match against indexed text fields (name, and code for
    /// products), case-insensitively
    pub term: Option<String>,
    /// Equality filter on the owning company
    pub company: Option<String>,
    /// Maximum number of rows to return
    pub limit: Option<u32>,
}

impl ReferenceFilter {
    /// Creates a new empty filter (matches all rows)
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the text search term
    pub fn with_term(mut self, term: impl Into<String>) -> Self {
        self.term = Some(term.into());
        self
    }

    /// Sets the company equality filter
    pub fn with_company(mut self, company: impl Into<String>) -> Self {
        self.company = Some(company.into());
        self
    }

    /// Sets the row limit
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Returns true if no filters are set
    pub fn is_empty(&self) -> bool {
        self.term.is_none() && self.company.is_none() && self.limit.is_none()
    }
}

// ============================================================================
// ILocalStore trait
// ============================================================================

/// Port trait for durable on-device storage
///
/// This is the primary persistence interface. It covers the mutation
/// queue, the order aggregate tables, the reference cache, and metadata.
///
/// ## Implementation Notes
///
/// - Individual operations are atomic; the compound operations
///   (`create_order_with_queue`, `apply_id_remap`, `clear_queue`) run as
///   one transaction each.
/// - `list_pending` re-reads the queue on every call and returns entries
///   in ascending `created_at` order; callers treat the result as a
///   snapshot, not a resumable stream.
/// - The order/line accessors are typed per aggregate on purpose; there
///   is no lookup of a table by string name.
#[async_trait::async_trait]
pub trait ILocalStore: Send + Sync {
    // --- Mutation queue operations ---

    /// Appends an entry to the mutation queue
    async fn enqueue(&self, entry: &QueuedOperation) -> anyhow::Result<()>;

    /// Returns all pending entries in ascending `created_at` order
    async fn list_pending(&self) -> anyhow::Result<Vec<QueuedOperation>>;

    /// Deletes a single entry
    ///
    /// Deleting an entry that no longer exists is not an error.
    async fn remove_entry(&self, id: EntryId) -> anyhow::Result<()>;

    /// Replaces the stored payload of a single entry
    ///
    /// Together with `increment_attempts`, this is the only permitted
    /// in-place queue mutation.
    async fn update_payload(&self, id: EntryId, payload: &Value) -> anyhow::Result<()>;

    /// Increments the attempt counter of a single entry by one
    async fn increment_attempts(&self, id: EntryId) -> anyhow::Result<()>;

    /// Number of entries currently queued
    async fn pending_count(&self) -> anyhow::Result<u64>;

    /// Deletes every queued entry in one transaction
    async fn clear_queue(&self) -> anyhow::Result<()>;

    // --- Order aggregate operations ---

    /// Persists a new order, its lines, and the queued create operation
    /// in one transaction
    ///
    /// All rows carry client-generated temporary ids at this point; the
    /// queued payload references them. Either everything lands or nothing
    /// does, so the queue can never point at a half-written aggregate.
    async fn create_order_with_queue(
        &self,
        order: &ServiceOrder,
        parts: &[PartLine],
        services: &[ServiceLine],
        hours: &[LaborLine],
        entry: &QueuedOperation,
    ) -> anyhow::Result<()>;

    /// Retrieves an order by its local row id
    async fn get_order(&self, id: &RecordId) -> anyhow::Result<Option<ServiceOrder>>;

    /// Retrieves the part lines of an order, by the order's local row id
    async fn list_order_parts(&self, order_id: &RecordId) -> anyhow::Result<Vec<PartLine>>;

    /// Retrieves the service lines of an order, by the order's local row id
    async fn list_order_services(&self, order_id: &RecordId) -> anyhow::Result<Vec<ServiceLine>>;

    /// Retrieves the labor lines of an order, by the order's local row id
    async fn list_order_hours(&self, order_id: &RecordId) -> anyhow::Result<Vec<LaborLine>>;

    // --- Id remap ---

    /// Applies a server id mapping in one transaction
    ///
    /// Updates the parent order's reference, each mapped child line's
    /// reference, rewrites every *other* queued payload that references a
    /// mapped local id, and finally deletes the originating entry
    /// `source_entry`. Records that no longer exist locally are skipped
    /// and counted in the returned report rather than failing the
    /// transaction.
    async fn apply_id_remap(
        &self,
        mapping: &IdMapping,
        source_entry: EntryId,
    ) -> anyhow::Result<RemapReport>;

    // --- Reference cache operations ---

    /// Upserts customers by natural key (insert or update)
    async fn upsert_customers(&self, customers: &[Customer]) -> anyhow::Result<()>;

    /// Upserts products by natural key (insert or update)
    async fn upsert_products(&self, products: &[Product]) -> anyhow::Result<()>;

    /// Queries cached customers matching the given filter
    ///
    /// Results are de-duplicated by customer code.
    async fn search_customers(&self, filter: &ReferenceFilter) -> anyhow::Result<Vec<Customer>>;

    /// Queries cached products matching the given filter
    ///
    /// The term matches the product name or code; results are
    /// de-duplicated by product code.
    async fn search_products(&self, filter: &ReferenceFilter) -> anyhow::Result<Vec<Product>>;

    /// Number of cached customer rows
    async fn customer_count(&self) -> anyhow::Result<u64>;

    /// Number of cached product rows
    async fn product_count(&self) -> anyhow::Result<u64>;

    // --- Metadata operations ---

    /// Reads a metadata value by key
    async fn get_meta(&self, key: &str) -> anyhow::Result<Option<String>>;

    /// Writes a metadata value (insert or update)
    async fn set_meta(&self, key: &str, value: &str) -> anyhow::Result<()>;
}
