//! Offline order creation use case
//!
//! Builds a service order and its part/service/labor lines with fresh
//! temporary ids, assembles the single queued POST whose payload embeds
//! the children, and hands everything to the store as one transaction.
//! The backend receives the whole aggregate in one request and answers
//! with the id mapping that the remap protocol later applies.

use std::sync::Arc;

use anyhow::{Context, Result};
use serde_json::{json, Value};

use crate::domain::newtypes::RecordId;
use crate::domain::queue::{HttpAction, QueuedOperation};
use crate::domain::{
    LaborDraft, LaborLine, OrderDraft, PartDraft, PartLine, ServiceDraft, ServiceLine,
    ServiceOrder,
};
use crate::ports::ILocalStore;

/// Resource path the queued create is replayed against.
const ORDER_CREATE_RESOURCE: &str = "Os/ordens/";

/// Use case for creating a service order while offline
///
/// Every row and the queued operation land in one store transaction, so
/// the queue can never reference an aggregate that was only partially
/// written. Returns the parent's temporary id for the caller to display
/// until the remap protocol installs the server-assigned key.
pub struct CreateOrderUseCase {
    store: Arc<dyn ILocalStore + Send + Sync>,
}

impl CreateOrderUseCase {
    /// Creates a new CreateOrderUseCase backed by the given store
    pub fn new(store: Arc<dyn ILocalStore + Send + Sync>) -> Self {
        Self { store }
    }

    /// Creates the order aggregate and enqueues its delivery
    ///
    /// # Arguments
    ///
    /// * `draft` - Order header fields
    /// * `parts` - Part line drafts, may be empty
    /// * `services` - Service line drafts, may be empty
    /// * `hours` - Labor line drafts, may be empty
    ///
    /// # Errors
    ///
    /// Returns an error if the store transaction fails; nothing is
    /// persisted in that case.
    pub async fn execute(
        &self,
        draft: OrderDraft,
        parts: Vec<PartDraft>,
        services: Vec<ServiceDraft>,
        hours: Vec<LaborDraft>,
    ) -> Result<RecordId> {
        let order = ServiceOrder::create(draft);
        let part_lines: Vec<PartLine> = parts
            .into_iter()
            .map(|p| PartLine::create(&order, p))
            .collect();
        let service_lines: Vec<ServiceLine> = services
            .into_iter()
            .map(|s| ServiceLine::create(&order, s))
            .collect();
        let labor_lines: Vec<LaborLine> = hours
            .into_iter()
            .map(|h| LaborLine::create(&order, h))
            .collect();

        let payload = build_queue_payload(&order, &part_lines, &service_lines, &labor_lines);
        let entry = QueuedOperation::new(
            HttpAction::Post,
            ORDER_CREATE_RESOURCE,
            payload,
            Some(order.id().clone()),
        );

        self.store
            .create_order_with_queue(&order, &part_lines, &service_lines, &labor_lines, &entry)
            .await
            .context("Failed to persist order aggregate and queued create")?;

        Ok(order.id().clone())
    }
}

/// Assembles the wire payload for the queued order create
///
/// `os_os` and each line's item field carry the temporary ids; the server
/// echoes them back in the id mapping of its response.
fn build_queue_payload(
    order: &ServiceOrder,
    parts: &[PartLine],
    services: &[ServiceLine],
    hours: &[LaborLine],
) -> Value {
    let pecas: Vec<Value> = parts
        .iter()
        .map(|p| {
            json!({
                "peca_item": p.id().as_str(),
                "peca_prod": p.product_code(),
                "peca_quan": p.quantity(),
                "peca_unit": p.unit_price(),
                "peca_tota": p.total(),
            })
        })
        .collect();

    let servicos: Vec<Value> = services
        .iter()
        .map(|s| {
            json!({
                "serv_item": s.id().as_str(),
                "serv_prod": s.service_code(),
                "serv_quan": s.quantity(),
                "serv_unit": s.unit_price(),
                "serv_tota": s.total(),
            })
        })
        .collect();

    let horas: Vec<Value> = hours
        .iter()
        .map(|h| {
            json!({
                "os_hora_item": h.id().as_str(),
                "os_hora_data": h.performed_at().timestamp_millis(),
            })
        })
        .collect();

    json!({
        "os_os": order.id().as_str(),
        "os_empr": order.company(),
        "os_fili": order.branch(),
        "os_clie": order.customer(),
        "os_assi_clie": order.customer_signature(),
        "os_assi_oper": order.operator_signature(),
        "pecas": pecas,
        "servicos": servicos,
        "horas": horas,
    })
}
