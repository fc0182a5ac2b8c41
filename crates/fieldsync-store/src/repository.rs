//! SQLite implementation of ILocalStore
//!
//! This module provides the concrete SQLite-based implementation of the
//! local store port defined in fieldsync-core. It handles all domain
//! type serialization/deserialization and SQL query construction.
//!
//! ## Type Mapping
//!
//! | Domain Type       | SQL Type | Strategy                                   |
//! |-------------------|----------|--------------------------------------------|
//! | EntryId           | TEXT     | UUID string via `.to_string()` / `FromStr` |
//! | RecordId          | TEXT     | String via `.as_str()` / `RecordId::new()` |
//! | HttpAction        | TEXT     | String via `.as_str()` / `FromStr`         |
//! | payload (Value)   | TEXT     | Compact JSON via `.to_string()`            |
//! | DateTime<Utc>     | INTEGER  | Epoch milliseconds                         |
//! | Quantities/prices | REAL     | Native f64                                 |
//!
//! ## Compound operations
//!
//! `create_order_with_queue` and `apply_id_remap` each run inside one
//! SQLite transaction: partial aggregates and half-applied remaps are
//! never visible, even across a crash.

use std::collections::HashSet;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, SqlitePool, Transaction};

use fieldsync_core::domain::{
    newtypes::{EntryId, RecordId},
    queue::{HttpAction, QueuedOperation},
    reference::{Customer, Product},
    remap::{IdMapping, IdPair, RemapReport},
    LaborLine, PartLine, ServiceLine, ServiceOrder,
};
use fieldsync_core::ports::{ILocalStore, ReferenceFilter};

use crate::StoreError;

/// SQLite-based implementation of the local store port
///
/// Provides persistent storage for the mutation queue, the order
/// aggregate, the reference cache, and sync metadata. All operations are
/// performed through a connection pool for concurrency.
pub struct SqliteLocalStore {
    pool: SqlitePool,
}

impl SqliteLocalStore {
    /// Creates a new store instance with the given connection pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

// ============================================================================
// Helper functions for type conversion
// ============================================================================

/// Parse a RecordId from a stored column value
fn record_id(value: String, column: &str) -> Result<RecordId, StoreError> {
    RecordId::new(value)
        .map_err(|e| StoreError::SerializationError(format!("Invalid {} value: {}", column, e)))
}

/// Convert stored epoch milliseconds back to a DateTime<Utc>
fn millis_to_datetime(ms: i64) -> Result<DateTime<Utc>, StoreError> {
    DateTime::from_timestamp_millis(ms)
        .ok_or_else(|| StoreError::SerializationError(format!("Timestamp out of range: {}", ms)))
}

/// Build a substring LIKE pattern from a search term
///
/// `%`, `_`, and the escape character itself are escaped so the term
/// matches literally; the paired clauses carry `ESCAPE '\'`.
fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

// ============================================================================
// Row mapping functions
// ============================================================================

/// Reconstruct a queue entry from a database row
fn entry_from_row(row: &SqliteRow) -> Result<QueuedOperation, StoreError> {
    let id_str: String = row.get("id");
    let action_str: String = row.get("acao");
    let resource: String = row.get("tabela_alvo");
    let local_record_str: Option<String> = row.get("registro_id_local");
    let payload_str: String = row.get("payload_json");
    let attempts: i64 = row.get("tentativas");
    let created_ms: i64 = row.get("criado_em");

    let id = EntryId::from_str(&id_str).map_err(|e| {
        StoreError::SerializationError(format!("Invalid entry id '{}': {}", id_str, e))
    })?;

    let action = HttpAction::from_str(&action_str).map_err(|e| {
        StoreError::SerializationError(format!("Invalid action '{}': {}", action_str, e))
    })?;

    let local_record_id = match local_record_str {
        Some(s) if !s.is_empty() => Some(record_id(s, "registro_id_local")?),
        _ => None,
    };

    let payload: Value = serde_json::from_str(&payload_str)
        .map_err(|e| StoreError::SerializationError(format!("Invalid payload JSON: {}", e)))?;

    let created_at = millis_to_datetime(created_ms)?;

    Ok(QueuedOperation::from_parts(
        id,
        action,
        resource,
        local_record_id,
        payload,
        attempts as u32,
        created_at,
    ))
}

/// Reconstruct a service order from a database row
fn order_from_row(row: &SqliteRow) -> Result<ServiceOrder, StoreError> {
    let id_str: String = row.get("id");
    let remote_ref_str: String = row.get("os_os");
    let company: String = row.get("os_empr");
    let branch: String = row.get("os_fili");
    let customer: Option<String> = row.get("os_clie");
    let customer_signature: String = row.get("os_assi_clie");
    let operator_signature: String = row.get("os_assi_oper");

    Ok(ServiceOrder::from_parts(
        record_id(id_str, "os_servico.id")?,
        record_id(remote_ref_str, "os_os")?,
        company,
        branch,
        customer,
        customer_signature,
        operator_signature,
    ))
}

/// Reconstruct a part line from a database row
fn part_from_row(row: &SqliteRow) -> Result<PartLine, StoreError> {
    let id_str: String = row.get("id");
    let remote_ref_str: String = row.get("peca_item");
    let order_id_str: String = row.get("peca_os");
    let company: String = row.get("peca_empr");
    let branch: String = row.get("peca_fili");
    let product_code: String = row.get("peca_prod");
    let quantity: f64 = row.get("peca_quan");
    let unit_price: f64 = row.get("peca_unit");
    let total: f64 = row.get("peca_tota");

    Ok(PartLine::from_parts(
        record_id(id_str, "pecas_os.id")?,
        record_id(remote_ref_str, "peca_item")?,
        record_id(order_id_str, "peca_os")?,
        company,
        branch,
        product_code,
        quantity,
        unit_price,
        total,
    ))
}

/// Reconstruct a service line from a database row
fn service_from_row(row: &SqliteRow) -> Result<ServiceLine, StoreError> {
    let id_str: String = row.get("id");
    let remote_ref_str: String = row.get("serv_item");
    let order_id_str: String = row.get("serv_os");
    let company: String = row.get("serv_empr");
    let branch: String = row.get("serv_fili");
    let service_code: String = row.get("serv_prod");
    let quantity: f64 = row.get("serv_quan");
    let unit_price: f64 = row.get("serv_unit");
    let total: f64 = row.get("serv_tota");

    Ok(ServiceLine::from_parts(
        record_id(id_str, "servicos_os.id")?,
        record_id(remote_ref_str, "serv_item")?,
        record_id(order_id_str, "serv_os")?,
        company,
        branch,
        service_code,
        quantity,
        unit_price,
        total,
    ))
}

/// Reconstruct a labor line from a database row
fn labor_from_row(row: &SqliteRow) -> Result<LaborLine, StoreError> {
    let id_str: String = row.get("id");
    let remote_ref_str: String = row.get("os_hora_item");
    let order_id_str: String = row.get("os_hora_os");
    let company: String = row.get("os_hora_empr");
    let branch: String = row.get("os_hora_fili");
    let performed_ms: i64 = row.get("os_hora_data");

    Ok(LaborLine::from_parts(
        record_id(id_str, "os_hora.id")?,
        record_id(remote_ref_str, "os_hora_item")?,
        record_id(order_id_str, "os_hora_os")?,
        company,
        branch,
        millis_to_datetime(performed_ms)?,
    ))
}

/// Reconstruct a customer from a database row
fn customer_from_row(row: &SqliteRow) -> Customer {
    Customer {
        enti_clie: row.get("enti_clie"),
        enti_empr: row.get("enti_empr"),
        enti_nome: row.get("enti_nome"),
        enti_tipo_enti: row.get("enti_tipo_enti"),
        enti_cpf: row.get("enti_cpf"),
        enti_cnpj: row.get("enti_cnpj"),
        enti_cida: row.get("enti_cida"),
    }
}

/// Reconstruct a product from a database row
fn product_from_row(row: &SqliteRow) -> Product {
    Product {
        prod_codi: row.get("prod_codi"),
        prod_empr: row.get("prod_empr"),
        prod_nome: row.get("prod_nome"),
        preco_vista: row.get("preco_vista"),
        saldo: row.get("saldo"),
        marca_nome: row.get("marca_nome"),
        imagem_base64: row.get("imagem_base64"),
    }
}

// ============================================================================
// Transaction helpers
// ============================================================================

/// Install a server key on one line row inside the remap transaction
///
/// The statement must be of the form `UPDATE <table> SET <ref_column> = ?
/// WHERE id = ?`. A missing row is counted, not an error: the record may
/// have been deleted locally while the create was still queued.
async fn remap_line(
    tx: &mut Transaction<'_, Sqlite>,
    sql: &'static str,
    pair: &IdPair,
    report: &mut RemapReport,
) -> Result<(), sqlx::Error> {
    let result = sqlx::query(sql)
        .bind(pair.remote_id.as_str())
        .bind(pair.local_id.as_str())
        .execute(&mut **tx)
        .await?;

    if result.rows_affected() > 0 {
        report.children_remapped += 1;
    } else {
        report.lookups_missed += 1;
        tracing::warn!(
            local_id = pair.local_id.as_str(),
            "Line row missing during id remap"
        );
    }
    Ok(())
}

const REMAP_PART_SQL: &str = "UPDATE pecas_os SET peca_item = ? WHERE id = ?";
const REMAP_SERVICE_SQL: &str = "UPDATE servicos_os SET serv_item = ? WHERE id = ?";
const REMAP_LABOR_SQL: &str = "UPDATE os_hora SET os_hora_item = ? WHERE id = ?";

// ============================================================================
// ILocalStore implementation
// ============================================================================

#[async_trait::async_trait]
impl ILocalStore for SqliteLocalStore {
    // --- Mutation queue operations ---

    async fn enqueue(&self, entry: &QueuedOperation) -> anyhow::Result<()> {
        let id = entry.id().to_string();
        let payload = entry.payload().to_string();

        sqlx::query(
            "INSERT INTO fila_sincronizacao \
             (id, acao, tabela_alvo, registro_id_local, payload_json, tentativas, criado_em) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(entry.action().as_str())
        .bind(entry.target_resource())
        .bind(entry.local_record_id().map(|r| r.as_str().to_string()))
        .bind(&payload)
        .bind(entry.attempts() as i64)
        .bind(entry.created_at_millis())
        .execute(&self.pool)
        .await?;

        tracing::trace!(entry_id = %id, resource = entry.target_resource(), "Enqueued operation");
        Ok(())
    }

    async fn list_pending(&self) -> anyhow::Result<Vec<QueuedOperation>> {
        // rowid breaks ties when two entries share a millisecond
        let rows = sqlx::query(
            "SELECT * FROM fila_sincronizacao ORDER BY criado_em ASC, rowid ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in &rows {
            entries.push(entry_from_row(row)?);
        }

        Ok(entries)
    }

    async fn remove_entry(&self, id: EntryId) -> anyhow::Result<()> {
        let id_str = id.to_string();

        sqlx::query("DELETE FROM fila_sincronizacao WHERE id = ?")
            .bind(&id_str)
            .execute(&self.pool)
            .await?;

        tracing::trace!(entry_id = %id_str, "Removed queue entry");
        Ok(())
    }

    async fn update_payload(&self, id: EntryId, payload: &Value) -> anyhow::Result<()> {
        let id_str = id.to_string();

        sqlx::query("UPDATE fila_sincronizacao SET payload_json = ? WHERE id = ?")
            .bind(payload.to_string())
            .bind(&id_str)
            .execute(&self.pool)
            .await?;

        tracing::trace!(entry_id = %id_str, "Updated queue payload");
        Ok(())
    }

    async fn increment_attempts(&self, id: EntryId) -> anyhow::Result<()> {
        let id_str = id.to_string();

        sqlx::query("UPDATE fila_sincronizacao SET tentativas = tentativas + 1 WHERE id = ?")
            .bind(&id_str)
            .execute(&self.pool)
            .await?;

        tracing::trace!(entry_id = %id_str, "Incremented attempt counter");
        Ok(())
    }

    async fn pending_count(&self) -> anyhow::Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM fila_sincronizacao")
            .fetch_one(&self.pool)
            .await?;

        Ok(count as u64)
    }

    async fn clear_queue(&self) -> anyhow::Result<()> {
        let result = sqlx::query("DELETE FROM fila_sincronizacao")
            .execute(&self.pool)
            .await?;

        tracing::debug!(removed = result.rows_affected(), "Cleared mutation queue");
        Ok(())
    }

    // --- Order aggregate operations ---

    async fn create_order_with_queue(
        &self,
        order: &ServiceOrder,
        parts: &[PartLine],
        services: &[ServiceLine],
        hours: &[LaborLine],
        entry: &QueuedOperation,
    ) -> anyhow::Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO os_servico \
             (id, os_os, os_empr, os_fili, os_clie, os_assi_clie, os_assi_oper) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(order.id().as_str())
        .bind(order.remote_ref().as_str())
        .bind(order.company())
        .bind(order.branch())
        .bind(order.customer())
        .bind(order.customer_signature())
        .bind(order.operator_signature())
        .execute(&mut *tx)
        .await?;

        for part in parts {
            sqlx::query(
                "INSERT INTO pecas_os \
                 (id, peca_item, peca_os, peca_empr, peca_fili, peca_prod, \
                  peca_quan, peca_unit, peca_tota) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(part.id().as_str())
            .bind(part.remote_ref().as_str())
            .bind(part.order_id().as_str())
            .bind(part.company())
            .bind(part.branch())
            .bind(part.product_code())
            .bind(part.quantity())
            .bind(part.unit_price())
            .bind(part.total())
            .execute(&mut *tx)
            .await?;
        }

        for service in services {
            sqlx::query(
                "INSERT INTO servicos_os \
                 (id, serv_item, serv_os, serv_empr, serv_fili, serv_prod, \
                  serv_quan, serv_unit, serv_tota) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(service.id().as_str())
            .bind(service.remote_ref().as_str())
            .bind(service.order_id().as_str())
            .bind(service.company())
            .bind(service.branch())
            .bind(service.service_code())
            .bind(service.quantity())
            .bind(service.unit_price())
            .bind(service.total())
            .execute(&mut *tx)
            .await?;
        }

        for labor in hours {
            sqlx::query(
                "INSERT INTO os_hora \
                 (id, os_hora_item, os_hora_os, os_hora_empr, os_hora_fili, os_hora_data) \
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(labor.id().as_str())
            .bind(labor.remote_ref().as_str())
            .bind(labor.order_id().as_str())
            .bind(labor.company())
            .bind(labor.branch())
            .bind(labor.performed_at().timestamp_millis())
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query(
            "INSERT INTO fila_sincronizacao \
             (id, acao, tabela_alvo, registro_id_local, payload_json, tentativas, criado_em) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(entry.id().to_string())
        .bind(entry.action().as_str())
        .bind(entry.target_resource())
        .bind(entry.local_record_id().map(|r| r.as_str().to_string()))
        .bind(entry.payload().to_string())
        .bind(entry.attempts() as i64)
        .bind(entry.created_at_millis())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::debug!(
            order_id = order.id().as_str(),
            parts = parts.len(),
            services = services.len(),
            hours = hours.len(),
            "Created order aggregate with queued delivery"
        );
        Ok(())
    }

    async fn get_order(&self, id: &RecordId) -> anyhow::Result<Option<ServiceOrder>> {
        let row = sqlx::query("SELECT * FROM os_servico WHERE id = ?")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref r) => Ok(Some(order_from_row(r)?)),
            None => Ok(None),
        }
    }

    async fn list_order_parts(&self, order_id: &RecordId) -> anyhow::Result<Vec<PartLine>> {
        let rows = sqlx::query("SELECT * FROM pecas_os WHERE peca_os = ? ORDER BY rowid ASC")
            .bind(order_id.as_str())
            .fetch_all(&self.pool)
            .await?;

        let mut parts = Vec::with_capacity(rows.len());
        for row in &rows {
            parts.push(part_from_row(row)?);
        }

        Ok(parts)
    }

    async fn list_order_services(&self, order_id: &RecordId) -> anyhow::Result<Vec<ServiceLine>> {
        let rows = sqlx::query("SELECT * FROM servicos_os WHERE serv_os = ? ORDER BY rowid ASC")
            .bind(order_id.as_str())
            .fetch_all(&self.pool)
            .await?;

        let mut services = Vec::with_capacity(rows.len());
        for row in &rows {
            services.push(service_from_row(row)?);
        }

        Ok(services)
    }

    async fn list_order_hours(&self, order_id: &RecordId) -> anyhow::Result<Vec<LaborLine>> {
        let rows = sqlx::query("SELECT * FROM os_hora WHERE os_hora_os = ? ORDER BY rowid ASC")
            .bind(order_id.as_str())
            .fetch_all(&self.pool)
            .await?;

        let mut hours = Vec::with_capacity(rows.len());
        for row in &rows {
            hours.push(labor_from_row(row)?);
        }

        Ok(hours)
    }

    // --- Id remap ---

    async fn apply_id_remap(
        &self,
        mapping: &IdMapping,
        source_entry: EntryId,
    ) -> anyhow::Result<RemapReport> {
        let mut report = RemapReport::default();
        let source_id = source_entry.to_string();
        let local = mapping.local_order_id().as_str();
        let remote = mapping.remote_order_id().as_str();

        let mut tx = self.pool.begin().await?;

        // Parent: install the server-assigned order number
        let result = sqlx::query("UPDATE os_servico SET os_os = ? WHERE id = ?")
            .bind(remote)
            .bind(local)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() > 0 {
            report.parent_remapped = true;
        } else {
            report.lookups_missed += 1;
            tracing::warn!(local_id = local, "Order row missing during id remap");
        }

        // Children: replace each mapped line's reference
        for pair in mapping.parts() {
            remap_line(&mut tx, REMAP_PART_SQL, pair, &mut report).await?;
        }
        for pair in mapping.services() {
            remap_line(&mut tx, REMAP_SERVICE_SQL, pair, &mut report).await?;
        }
        for pair in mapping.hours() {
            remap_line(&mut tx, REMAP_LABOR_SQL, pair, &mut report).await?;
        }

        // Other queued payloads still referencing a mapped temporary id
        let rows = sqlx::query("SELECT id, payload_json FROM fila_sincronizacao WHERE id != ?")
            .bind(&source_id)
            .fetch_all(&mut *tx)
            .await?;

        for row in &rows {
            let entry_id: String = row.get("id");
            let payload_str: String = row.get("payload_json");
            let payload: Value = serde_json::from_str(&payload_str).map_err(|e| {
                StoreError::SerializationError(format!("Invalid payload JSON: {}", e))
            })?;

            if let Some(updated) = mapping.rewrite(&payload) {
                sqlx::query("UPDATE fila_sincronizacao SET payload_json = ? WHERE id = ?")
                    .bind(updated.to_string())
                    .bind(&entry_id)
                    .execute(&mut *tx)
                    .await?;
                report.payloads_rewritten += 1;
            }
        }

        // The entry that produced this mapping is done
        sqlx::query("DELETE FROM fila_sincronizacao WHERE id = ?")
            .bind(&source_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::debug!(
            local_id = local,
            remote_id = remote,
            children = report.children_remapped,
            missed = report.lookups_missed,
            rewritten = report.payloads_rewritten,
            "Applied id remap"
        );

        Ok(report)
    }

    // --- Reference cache operations ---

    async fn upsert_customers(&self, customers: &[Customer]) -> anyhow::Result<()> {
        let mut tx = self.pool.begin().await?;

        for customer in customers {
            sqlx::query(
                "INSERT OR REPLACE INTO mega_entidades \
                 (id, enti_clie, enti_empr, enti_nome, enti_tipo_enti, enti_cpf, \
                  enti_cnpj, enti_cida) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(customer.natural_key())
            .bind(&customer.enti_clie)
            .bind(&customer.enti_empr)
            .bind(&customer.enti_nome)
            .bind(&customer.enti_tipo_enti)
            .bind(&customer.enti_cpf)
            .bind(&customer.enti_cnpj)
            .bind(&customer.enti_cida)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::debug!(count = customers.len(), "Upserted cached customers");
        Ok(())
    }

    async fn upsert_products(&self, products: &[Product]) -> anyhow::Result<()> {
        let mut tx = self.pool.begin().await?;

        for product in products {
            sqlx::query(
                "INSERT OR REPLACE INTO mega_produtos \
                 (id, prod_codi, prod_empr, prod_nome, preco_vista, saldo, \
                  marca_nome, imagem_base64) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(product.natural_key())
            .bind(&product.prod_codi)
            .bind(&product.prod_empr)
            .bind(&product.prod_nome)
            .bind(product.preco_vista)
            .bind(product.saldo)
            .bind(&product.marca_nome)
            .bind(&product.imagem_base64)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::debug!(count = products.len(), "Upserted cached products");
        Ok(())
    }

    async fn search_customers(&self, filter: &ReferenceFilter) -> anyhow::Result<Vec<Customer>> {
        let mut sql = String::from("SELECT * FROM mega_entidades WHERE 1=1");
        let mut binds: Vec<String> = Vec::new();

        if let Some(ref term) = filter.term {
            sql.push_str(" AND enti_nome LIKE ? ESCAPE '\\'");
            binds.push(like_pattern(term));
        }

        if let Some(ref company) = filter.company {
            sql.push_str(" AND enti_empr = ?");
            binds.push(company.clone());
        }

        sql.push_str(" ORDER BY enti_nome ASC");

        if let Some(limit) = filter.limit {
            sql.push_str(" LIMIT ?");
            binds.push(limit.to_string());
        }

        let mut query = sqlx::query(&sql);
        for bind in &binds {
            query = query.bind(bind);
        }

        let rows = query.fetch_all(&self.pool).await?;

        let mut seen = HashSet::new();
        let mut customers = Vec::with_capacity(rows.len());
        for row in &rows {
            let customer = customer_from_row(row);
            if seen.insert(customer.enti_clie.clone()) {
                customers.push(customer);
            }
        }

        Ok(customers)
    }

    async fn search_products(&self, filter: &ReferenceFilter) -> anyhow::Result<Vec<Product>> {
        let mut sql = String::from("SELECT * FROM mega_produtos WHERE 1=1");
        let mut binds: Vec<String> = Vec::new();

        if let Some(ref term) = filter.term {
            sql.push_str(" AND (prod_nome LIKE ? ESCAPE '\\' OR prod_codi LIKE ? ESCAPE '\\')");
            let pattern = like_pattern(term);
            binds.push(pattern.clone());
            binds.push(pattern);
        }

        if let Some(ref company) = filter.company {
            sql.push_str(" AND prod_empr = ?");
            binds.push(company.clone());
        }

        sql.push_str(" ORDER BY prod_nome ASC");

        if let Some(limit) = filter.limit {
            sql.push_str(" LIMIT ?");
            binds.push(limit.to_string());
        }

        let mut query = sqlx::query(&sql);
        for bind in &binds {
            query = query.bind(bind);
        }

        let rows = query.fetch_all(&self.pool).await?;

        let mut seen = HashSet::new();
        let mut products = Vec::with_capacity(rows.len());
        for row in &rows {
            let product = product_from_row(row);
            if seen.insert(product.prod_codi.clone()) {
                products.push(product);
            }
        }

        Ok(products)
    }

    async fn customer_count(&self) -> anyhow::Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM mega_entidades")
            .fetch_one(&self.pool)
            .await?;

        Ok(count as u64)
    }

    async fn product_count(&self) -> anyhow::Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM mega_produtos")
            .fetch_one(&self.pool)
            .await?;

        Ok(count as u64)
    }

    // --- Metadata operations ---

    async fn get_meta(&self, key: &str) -> anyhow::Result<Option<String>> {
        let value: Option<String> = sqlx::query_scalar("SELECT value FROM sync_meta WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(value)
    }

    async fn set_meta(&self, key: &str, value: &str) -> anyhow::Result<()> {
        sqlx::query("INSERT OR REPLACE INTO sync_meta (key, value) VALUES (?, ?)")
            .bind(key)
            .bind(value)
            .execute(&self.pool)
            .await?;

        tracing::trace!(key = key, "Wrote sync metadata");
        Ok(())
    }
}
