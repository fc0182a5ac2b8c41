//! Service-order aggregate
//!
//! An order and its part/service/labor lines are created locally while
//! offline. Every record carries an immutable local row id plus a
//! remappable reference (`remote_ref`): the value the backend will know the
//! record by. At creation time `remote_ref` equals the local id; the remap
//! protocol replaces it with the server-assigned key after the queued
//! create is delivered. Child rows keep pointing at the parent's local row
//! id; only the reference fields are ever rewritten.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::newtypes::RecordId;

// ============================================================================
// Records
// ============================================================================

/// A service order created on the device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceOrder {
    id: RecordId,
    remote_ref: RecordId,
    company: String,
    branch: String,
    customer: Option<String>,
    customer_signature: String,
    operator_signature: String,
}

impl ServiceOrder {
    /// Create a new local order with a fresh temporary id
    #[must_use]
    pub fn create(draft: OrderDraft) -> Self {
        let id = RecordId::temporary();
        Self {
            remote_ref: id.clone(),
            id,
            company: draft.company,
            branch: draft.branch,
            customer: draft.customer,
            customer_signature: draft.customer_signature.unwrap_or_default(),
            operator_signature: draft.operator_signature.unwrap_or_default(),
        }
    }

    /// Rehydrate an order from its stored columns
    #[must_use]
    pub fn from_parts(
        id: RecordId,
        remote_ref: RecordId,
        company: String,
        branch: String,
        customer: Option<String>,
        customer_signature: String,
        operator_signature: String,
    ) -> Self {
        Self {
            id,
            remote_ref,
            company,
            branch,
            customer,
            customer_signature,
            operator_signature,
        }
    }

    /// Immutable local row id
    #[must_use]
    pub fn id(&self) -> &RecordId {
        &self.id
    }

    /// Reference the backend knows this order by; equals the local id until
    /// the remap protocol installs the server key
    #[must_use]
    pub fn remote_ref(&self) -> &RecordId {
        &self.remote_ref
    }

    #[must_use]
    pub fn company(&self) -> &str {
        &self.company
    }

    #[must_use]
    pub fn branch(&self) -> &str {
        &self.branch
    }

    #[must_use]
    pub fn customer(&self) -> Option<&str> {
        self.customer.as_deref()
    }

    #[must_use]
    pub fn customer_signature(&self) -> &str {
        &self.customer_signature
    }

    #[must_use]
    pub fn operator_signature(&self) -> &str {
        &self.operator_signature
    }
}

/// A part consumed by an order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartLine {
    id: RecordId,
    remote_ref: RecordId,
    order_id: RecordId,
    company: String,
    branch: String,
    product_code: String,
    quantity: f64,
    unit_price: f64,
    total: f64,
}

impl PartLine {
    /// Create a new part line under `order`, computing the line total
    #[must_use]
    pub fn create(order: &ServiceOrder, draft: PartDraft) -> Self {
        let id = RecordId::temporary();
        Self {
            remote_ref: id.clone(),
            id,
            order_id: order.id().clone(),
            company: order.company().to_string(),
            branch: order.branch().to_string(),
            product_code: draft.product_code,
            quantity: draft.quantity,
            unit_price: draft.unit_price,
            total: draft.quantity * draft.unit_price,
        }
    }

    /// Rehydrate a part line from its stored columns
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        id: RecordId,
        remote_ref: RecordId,
        order_id: RecordId,
        company: String,
        branch: String,
        product_code: String,
        quantity: f64,
        unit_price: f64,
        total: f64,
    ) -> Self {
        Self {
            id,
            remote_ref,
            order_id,
            company,
            branch,
            product_code,
            quantity,
            unit_price,
            total,
        }
    }

    #[must_use]
    pub fn id(&self) -> &RecordId {
        &self.id
    }

    #[must_use]
    pub fn remote_ref(&self) -> &RecordId {
        &self.remote_ref
    }

    /// Local row id of the owning order; never rewritten
    #[must_use]
    pub fn order_id(&self) -> &RecordId {
        &self.order_id
    }

    #[must_use]
    pub fn product_code(&self) -> &str {
        &self.product_code
    }

    #[must_use]
    pub fn quantity(&self) -> f64 {
        self.quantity
    }

    #[must_use]
    pub fn unit_price(&self) -> f64 {
        self.unit_price
    }

    #[must_use]
    pub fn total(&self) -> f64 {
        self.total
    }

    #[must_use]
    pub fn company(&self) -> &str {
        &self.company
    }

    #[must_use]
    pub fn branch(&self) -> &str {
        &self.branch
    }
}

/// A service performed on an order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceLine {
    id: RecordId,
    remote_ref: RecordId,
    order_id: RecordId,
    company: String,
    branch: String,
    service_code: String,
    quantity: f64,
    unit_price: f64,
    total: f64,
}

impl ServiceLine {
    /// Create a new service line under `order`, computing the line total
    #[must_use]
    pub fn create(order: &ServiceOrder, draft: ServiceDraft) -> Self {
        let id = RecordId::temporary();
        Self {
            remote_ref: id.clone(),
            id,
            order_id: order.id().clone(),
            company: order.company().to_string(),
            branch: order.branch().to_string(),
            service_code: draft.service_code,
            quantity: draft.quantity,
            unit_price: draft.unit_price,
            total: draft.quantity * draft.unit_price,
        }
    }

    /// Rehydrate a service line from its stored columns
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        id: RecordId,
        remote_ref: RecordId,
        order_id: RecordId,
        company: String,
        branch: String,
        service_code: String,
        quantity: f64,
        unit_price: f64,
        total: f64,
    ) -> Self {
        Self {
            id,
            remote_ref,
            order_id,
            company,
            branch,
            service_code,
            quantity,
            unit_price,
            total,
        }
    }

    #[must_use]
    pub fn id(&self) -> &RecordId {
        &self.id
    }

    #[must_use]
    pub fn remote_ref(&self) -> &RecordId {
        &self.remote_ref
    }

    #[must_use]
    pub fn order_id(&self) -> &RecordId {
        &self.order_id
    }

    #[must_use]
    pub fn service_code(&self) -> &str {
        &self.service_code
    }

    #[must_use]
    pub fn quantity(&self) -> f64 {
        self.quantity
    }

    #[must_use]
    pub fn unit_price(&self) -> f64 {
        self.unit_price
    }

    #[must_use]
    pub fn total(&self) -> f64 {
        self.total
    }

    #[must_use]
    pub fn company(&self) -> &str {
        &self.company
    }

    #[must_use]
    pub fn branch(&self) -> &str {
        &self.branch
    }
}

/// A labor/hours entry booked on an order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaborLine {
    id: RecordId,
    remote_ref: RecordId,
    order_id: RecordId,
    company: String,
    branch: String,
    performed_at: DateTime<Utc>,
}

impl LaborLine {
    /// Create a new labor line under `order`; defaults to "now" when the
    /// draft carries no timestamp
    #[must_use]
    pub fn create(order: &ServiceOrder, draft: LaborDraft) -> Self {
        let id = RecordId::temporary();
        Self {
            remote_ref: id.clone(),
            id,
            order_id: order.id().clone(),
            company: order.company().to_string(),
            branch: order.branch().to_string(),
            performed_at: draft.performed_at.unwrap_or_else(Utc::now),
        }
    }

    /// Rehydrate a labor line from its stored columns
    #[must_use]
    pub fn from_parts(
        id: RecordId,
        remote_ref: RecordId,
        order_id: RecordId,
        company: String,
        branch: String,
        performed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            remote_ref,
            order_id,
            company,
            branch,
            performed_at,
        }
    }

    #[must_use]
    pub fn id(&self) -> &RecordId {
        &self.id
    }

    #[must_use]
    pub fn remote_ref(&self) -> &RecordId {
        &self.remote_ref
    }

    #[must_use]
    pub fn order_id(&self) -> &RecordId {
        &self.order_id
    }

    #[must_use]
    pub fn performed_at(&self) -> DateTime<Utc> {
        self.performed_at
    }

    #[must_use]
    pub fn company(&self) -> &str {
        &self.company
    }

    #[must_use]
    pub fn branch(&self) -> &str {
        &self.branch
    }
}

// ============================================================================
// Drafts (caller input, no ids yet)
// ============================================================================

/// Order header fields supplied by the caller
#[derive(Debug, Clone, Default)]
pub struct OrderDraft {
    pub company: String,
    pub branch: String,
    pub customer: Option<String>,
    pub customer_signature: Option<String>,
    pub operator_signature: Option<String>,
}

/// Part line fields supplied by the caller
#[derive(Debug, Clone)]
pub struct PartDraft {
    pub product_code: String,
    pub quantity: f64,
    pub unit_price: f64,
}

/// Service line fields supplied by the caller
#[derive(Debug, Clone)]
pub struct ServiceDraft {
    pub service_code: String,
    pub quantity: f64,
    pub unit_price: f64,
}

/// Labor line fields supplied by the caller
#[derive(Debug, Clone, Default)]
pub struct LaborDraft {
    pub performed_at: Option<DateTime<Utc>>,
}
