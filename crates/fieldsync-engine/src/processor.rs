//! Sync processor - drains the mutation queue against the backend
//!
//! The [`SyncProcessor`] is the single writer that moves queued operations
//! to the backend. It has two states, idle and draining; at most one drain
//! pass runs at a time and overlapping triggers return immediately without
//! touching the queue.
//!
//! ## Drain Flow
//!
//! 1. Check backend reachability; offline leaves the queue untouched
//! 2. Read the pending queue once, oldest first (a snapshot; entries
//!    enqueued mid-pass wait for the next trigger)
//! 3. Per entry: probe markers are dropped without a network call, every
//!    other entry is delivered in exactly one request
//! 4. A response carrying an id mapping runs the remap transaction, which
//!    consumes the entry and rewrites dependent payloads
//! 5. Business rejections discard the entry and notify the user; a
//!    connectivity failure stops the pass with the rest of the snapshot
//!    still queued; any other failure increments the attempt counter and
//!    moves on
//!
//! Queue order carries the correctness of remapping: a child referencing a
//! parent's temporary id was enqueued after the parent, so the parent's
//! remap has already rewritten the child's payload by the time the child
//! is delivered.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, error, info, warn};

use fieldsync_core::domain::errors::RemoteError;
use fieldsync_core::domain::queue::QueuedOperation;
use fieldsync_core::domain::remap::IdMapping;
use fieldsync_core::ports::local_store::ILocalStore;
use fieldsync_core::ports::notification::{INotificationService, Notification};
use fieldsync_core::ports::remote_api::IRemoteApi;

// ============================================================================
// DrainReport
// ============================================================================

/// How a drain pass ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainOutcome {
    /// The snapshot was processed to the end
    Completed,
    /// Another drain was already running; nothing was done
    AlreadyDraining,
    /// The backend was unreachable; the queue was not touched
    Offline,
    /// A connectivity failure stopped the pass partway through
    ConnectivityLost,
    /// A local storage failure stopped the pass
    StoreFailed,
}

/// Summary of a completed drain pass
///
/// Used only for logging and status surfaces; per-entry outcomes are
/// handled inside the processor.
#[derive(Debug, Clone)]
pub struct DrainReport {
    /// How the pass ended
    pub outcome: DrainOutcome,
    /// Entries delivered whose response needed no remap
    pub delivered: u32,
    /// Entries delivered whose response carried an id mapping
    pub remapped: u32,
    /// Entries dropped without delivery effect (business rejections and
    /// probe markers)
    pub discarded: u32,
    /// Entries left queued with their attempt counter incremented
    pub failed: u32,
}

impl DrainReport {
    fn with_outcome(outcome: DrainOutcome) -> Self {
        Self {
            outcome,
            delivered: 0,
            remapped: 0,
            discarded: 0,
            failed: 0,
        }
    }

    /// Total number of entries this pass acted on
    pub fn processed(&self) -> u32 {
        self.delivered + self.remapped + self.discarded + self.failed
    }
}

// ============================================================================
// Per-entry outcome
// ============================================================================

/// Result of processing a single queue entry
enum EntryOutcome {
    /// Delivered; the response needed no remap and the entry is gone
    Delivered,
    /// Delivered; the remap transaction ran and consumed the entry
    Remapped(IdMapping),
    /// Dropped without delivery effect (probe marker or business rejection)
    Discarded,
    /// Left queued with its attempt counter incremented
    Failed,
    /// The backend stopped answering; abort the pass
    LinkDown,
}

// ============================================================================
// Drain guard
// ============================================================================

/// Clears the draining flag when the pass ends, on every exit path
struct DrainGuard<'a>(&'a AtomicBool);

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

// ============================================================================
// SyncProcessor
// ============================================================================

/// Single-flight drain loop over the mutation queue
///
/// ## Dependencies
///
/// - `store`: queue reads and the per-outcome queue mutations
/// - `remote`: reachability probe and one delivery request per entry
/// - `notifier`: user-visible messages for discarded business rejections
pub struct SyncProcessor {
    /// Durable queue and record storage
    store: Arc<dyn ILocalStore + Send + Sync>,
    /// Backend delivery and probe
    remote: Arc<dyn IRemoteApi + Send + Sync>,
    /// User notification sink
    notifier: Arc<dyn INotificationService + Send + Sync>,
    /// True while a drain pass is running
    draining: AtomicBool,
}

impl SyncProcessor {
    /// Creates a new `SyncProcessor` with the given dependencies
    pub fn new(
        store: Arc<dyn ILocalStore + Send + Sync>,
        remote: Arc<dyn IRemoteApi + Send + Sync>,
        notifier: Arc<dyn INotificationService + Send + Sync>,
    ) -> Self {
        Self {
            store,
            remote,
            notifier,
            draining: AtomicBool::new(false),
        }
    }

    /// Returns whether a drain pass is currently running
    pub fn is_draining(&self) -> bool {
        self.draining.load(Ordering::Acquire)
    }

    /// Runs one drain pass over the pending queue
    ///
    /// Safe to call from concurrent triggers: while a pass is running,
    /// further calls return `AlreadyDraining` without any side effect.
    /// The returned report carries counts for logging only.
    #[tracing::instrument(skip(self))]
    pub async fn process_sync_queue(&self) -> DrainReport {
        if self
            .draining
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Drain already in progress, skipping trigger");
            return DrainReport::with_outcome(DrainOutcome::AlreadyDraining);
        }
        let _guard = DrainGuard(&self.draining);

        if !self.remote.probe_connectivity().await {
            debug!("Backend unreachable, queue left untouched");
            return DrainReport::with_outcome(DrainOutcome::Offline);
        }

        let mut snapshot = match self.store.list_pending().await {
            Ok(entries) => entries,
            Err(err) => {
                error!(error = %err, "Failed to read pending queue");
                return DrainReport::with_outcome(DrainOutcome::StoreFailed);
            }
        };

        if snapshot.is_empty() {
            debug!("Queue empty, nothing to drain");
            return DrainReport::with_outcome(DrainOutcome::Completed);
        }

        info!(pending = snapshot.len(), "Drain pass starting");
        let mut report = DrainReport::with_outcome(DrainOutcome::Completed);

        let mut index = 0;
        while index < snapshot.len() {
            let entry = snapshot[index].clone();
            index += 1;

            match self.process_entry(&entry).await {
                Ok(EntryOutcome::Delivered) => report.delivered += 1,
                Ok(EntryOutcome::Remapped(mapping)) => {
                    report.remapped += 1;
                    // The remap transaction rewrote the stored payloads of
                    // later entries; the in-flight snapshot copies must
                    // follow or they would be delivered with their stale
                    // temporary references.
                    for later in &mut snapshot[index..] {
                        if let Some(rewritten) = mapping.rewrite(later.payload()) {
                            later.rewrite_payload(rewritten);
                        }
                    }
                }
                Ok(EntryOutcome::Discarded) => report.discarded += 1,
                Ok(EntryOutcome::Failed) => report.failed += 1,
                Ok(EntryOutcome::LinkDown) => {
                    report.outcome = DrainOutcome::ConnectivityLost;
                    break;
                }
                Err(err) => {
                    error!(error = %err, "Local store failure stopped the drain pass");
                    report.outcome = DrainOutcome::StoreFailed;
                    break;
                }
            }
        }

        info!(
            outcome = ?report.outcome,
            delivered = report.delivered,
            remapped = report.remapped,
            discarded = report.discarded,
            failed = report.failed,
            "Drain pass finished"
        );

        report
    }

    /// Processes one queue entry, deciding its fate
    ///
    /// `Err` means a local store write failed; everything network-related
    /// maps onto an [`EntryOutcome`].
    async fn process_entry(&self, entry: &QueuedOperation) -> Result<EntryOutcome> {
        if entry.is_sanity_marker() {
            debug!(entry = %entry.id(), "Removing connectivity probe marker without delivery");
            self.store
                .remove_entry(entry.id())
                .await
                .context("Failed to remove probe marker entry")?;
            return Ok(EntryOutcome::Discarded);
        }

        match self.remote.deliver(entry).await {
            Ok(body) => match IdMapping::from_response(&body) {
                Some(mapping) => {
                    let remap = self
                        .store
                        .apply_id_remap(&mapping, entry.id())
                        .await
                        .context("Failed to apply id remap")?;
                    info!(
                        entry = %entry.id(),
                        remote_id = %mapping.remote_order_id(),
                        children = remap.children_remapped,
                        rewritten = remap.payloads_rewritten,
                        missed = remap.lookups_missed,
                        "Server ids applied"
                    );
                    Ok(EntryOutcome::Remapped(mapping))
                }
                None => {
                    self.store
                        .remove_entry(entry.id())
                        .await
                        .context("Failed to remove delivered entry")?;
                    debug!(entry = %entry.id(), "Entry delivered");
                    Ok(EntryOutcome::Delivered)
                }
            },
            Err(RemoteError::Business(message)) => {
                warn!(
                    entry = %entry.id(),
                    resource = entry.target_resource(),
                    "Operation rejected by the backend, discarding: {}",
                    message
                );
                self.store
                    .remove_entry(entry.id())
                    .await
                    .context("Failed to remove rejected entry")?;

                let body = match entry.local_record_id() {
                    Some(record) => {
                        format!("{} ({}): {}", entry.target_resource(), record, message)
                    }
                    None => format!("{}: {}", entry.target_resource(), message),
                };
                if let Err(err) = self
                    .notifier
                    .notify(&Notification::rejected_operation(body))
                    .await
                {
                    warn!(error = %err, "Failed to deliver rejection notification");
                }

                Ok(EntryOutcome::Discarded)
            }
            Err(RemoteError::Connectivity(message)) => {
                warn!(
                    entry = %entry.id(),
                    "Connectivity lost mid-pass, remaining entries stay queued: {}",
                    message
                );
                Ok(EntryOutcome::LinkDown)
            }
            Err(err) => {
                debug!(
                    entry = %entry.id(),
                    attempts = entry.attempts() + 1,
                    "Delivery failed, entry stays queued: {}",
                    err
                );
                self.store
                    .increment_attempts(entry.id())
                    .await
                    .context("Failed to increment attempt counter")?;
                Ok(EntryOutcome::Failed)
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    use serde_json::{json, Value};
    use tokio::sync::Semaphore;

    use fieldsync_core::domain::{
        newtypes::RecordId,
        queue::{HttpAction, SANITY_MARKER_RESOURCE},
        reference::{Customer, Product},
        LaborLine, PartLine, ServiceLine, ServiceOrder,
    };
    use fieldsync_store::{DatabasePool, SqliteLocalStore};

    /// Remote double replaying a scripted sequence of delivery results
    struct ScriptedRemote {
        online: bool,
        deliveries: Mutex<VecDeque<Result<Value, RemoteError>>>,
        sent: Mutex<Vec<(String, Value)>>,
        gate: Option<Arc<Semaphore>>,
    }

    impl ScriptedRemote {
        fn online(results: Vec<Result<Value, RemoteError>>) -> Self {
            Self {
                online: true,
                deliveries: Mutex::new(results.into()),
                sent: Mutex::new(Vec::new()),
                gate: None,
            }
        }

        fn offline() -> Self {
            let mut remote = Self::online(Vec::new());
            remote.online = false;
            remote
        }

        /// Delivery blocks until a permit is released on `gate`
        fn gated(results: Vec<Result<Value, RemoteError>>, gate: Arc<Semaphore>) -> Self {
            let mut remote = Self::online(results);
            remote.gate = Some(gate);
            remote
        }

        fn sent(&self) -> Vec<(String, Value)> {
            self.sent.lock().unwrap().clone()
        }

        fn delivery_count(&self) -> usize {
            self.sent.lock().unwrap().len()
        }
    }

    #[async_trait::async_trait]
    impl IRemoteApi for ScriptedRemote {
        async fn deliver(&self, entry: &QueuedOperation) -> Result<Value, RemoteError> {
            if let Some(ref gate) = self.gate {
                let permit = gate.acquire().await.unwrap();
                permit.forget();
            }
            self.sent
                .lock()
                .unwrap()
                .push((entry.target_resource().to_string(), entry.payload().clone()));
            self.deliveries
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok(Value::Null))
        }

        async fn probe_connectivity(&self) -> bool {
            self.online
        }

        async fn fetch_customers(&self, _limit: u32) -> anyhow::Result<Vec<Customer>> {
            Ok(Vec::new())
        }

        async fn fetch_products(&self, _limit: u32) -> anyhow::Result<Vec<Product>> {
            Ok(Vec::new())
        }

        async fn search_customers(
            &self,
            _term: &str,
            _company: Option<&str>,
        ) -> anyhow::Result<Vec<Customer>> {
            Ok(Vec::new())
        }

        async fn search_products(&self, _term: &str) -> anyhow::Result<Vec<Product>> {
            Ok(Vec::new())
        }
    }

    /// Notification double that records everything it is asked to show
    #[derive(Default)]
    struct RecordingNotifier {
        sent: Mutex<Vec<Notification>>,
    }

    impl RecordingNotifier {
        fn messages(&self) -> Vec<Notification> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl INotificationService for RecordingNotifier {
        async fn notify(&self, notification: &Notification) -> anyhow::Result<()> {
            self.sent.lock().unwrap().push(notification.clone());
            Ok(())
        }
    }

    async fn setup(
        remote: ScriptedRemote,
    ) -> (
        Arc<SyncProcessor>,
        Arc<SqliteLocalStore>,
        Arc<ScriptedRemote>,
        Arc<RecordingNotifier>,
    ) {
        let pool = DatabasePool::in_memory()
            .await
            .expect("Failed to create in-memory database");
        let store = Arc::new(SqliteLocalStore::new(pool.pool().clone()));
        let remote = Arc::new(remote);
        let notifier = Arc::new(RecordingNotifier::default());
        let processor = Arc::new(SyncProcessor::new(
            store.clone(),
            remote.clone(),
            notifier.clone(),
        ));
        (processor, store, remote, notifier)
    }

    fn rid(s: &str) -> RecordId {
        RecordId::new(s.to_string()).unwrap()
    }

    fn entry(resource: &str, payload: Value) -> QueuedOperation {
        QueuedOperation::new(HttpAction::Post, resource, payload, None)
    }

    /// An order aggregate with fixed temporary ids, plus its queued create
    fn order_aggregate() -> (
        ServiceOrder,
        PartLine,
        ServiceLine,
        LaborLine,
        QueuedOperation,
    ) {
        let order = ServiceOrder::from_parts(
            rid("LOCAL-A"),
            rid("LOCAL-A"),
            "1".to_string(),
            "1".to_string(),
            Some("55".to_string()),
            String::new(),
            String::new(),
        );
        let part = PartLine::from_parts(
            rid("LOCAL-P1"),
            rid("LOCAL-P1"),
            rid("LOCAL-A"),
            "1".to_string(),
            "1".to_string(),
            "77".to_string(),
            2.0,
            5.0,
            10.0,
        );
        let service = ServiceLine::from_parts(
            rid("LOCAL-S1"),
            rid("LOCAL-S1"),
            rid("LOCAL-A"),
            "1".to_string(),
            "1".to_string(),
            "900".to_string(),
            1.0,
            30.0,
            30.0,
        );
        let labor = LaborLine::from_parts(
            rid("LOCAL-H1"),
            rid("LOCAL-H1"),
            rid("LOCAL-A"),
            "1".to_string(),
            "1".to_string(),
            chrono::Utc::now(),
        );
        let queued = entry(
            "Os/ordens/",
            json!({
                "os_os": "LOCAL-A",
                "pecas": [{"peca_item": "LOCAL-P1"}],
                "servicos": [{"serv_item": "LOCAL-S1"}],
                "horas": [{"os_hora_item": "LOCAL-H1"}]
            }),
        );
        (order, part, service, labor, queued)
    }

    fn mapping_response() -> Value {
        json!({
            "local_os_id": "LOCAL-A",
            "remote_os_id": "9001",
            "pecas_ids": [{"local_id": "LOCAL-P1", "remote_id": "501"}],
            "servicos_ids": [{"local_id": "LOCAL-S1", "remote_id": "502"}],
            "horas_ids": [{"local_id": "LOCAL-H1", "remote_id": "503"}]
        })
    }

    #[tokio::test]
    async fn test_offline_leaves_queue_untouched() {
        let (processor, store, remote, _) = setup(ScriptedRemote::offline()).await;
        store.enqueue(&entry("Os/ordens/", json!({"a": 1}))).await.unwrap();
        store.enqueue(&entry("Os/ordens/", json!({"b": 2}))).await.unwrap();

        let report = processor.process_sync_queue().await;

        assert_eq!(report.outcome, DrainOutcome::Offline);
        assert_eq!(report.processed(), 0);
        assert_eq!(remote.delivery_count(), 0);
        assert_eq!(store.pending_count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_empty_queue_makes_no_network_calls() {
        let (processor, _, remote, _) = setup(ScriptedRemote::online(Vec::new())).await;

        let report = processor.process_sync_queue().await;

        assert_eq!(report.outcome, DrainOutcome::Completed);
        assert_eq!(report.processed(), 0);
        assert_eq!(remote.delivery_count(), 0);
    }

    #[tokio::test]
    async fn test_second_trigger_during_drain_is_noop() {
        let gate = Arc::new(Semaphore::new(0));
        let (processor, store, remote, _) = setup(ScriptedRemote::gated(
            vec![Ok(Value::Null)],
            gate.clone(),
        ))
        .await;
        store.enqueue(&entry("Os/ordens/", json!({"a": 1}))).await.unwrap();

        let first = tokio::spawn({
            let processor = processor.clone();
            async move { processor.process_sync_queue().await }
        });

        // Wait for the first pass to block inside delivery
        while !processor.is_draining() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        let second = processor.process_sync_queue().await;
        assert_eq!(second.outcome, DrainOutcome::AlreadyDraining);
        assert_eq!(second.processed(), 0);

        gate.add_permits(1);
        let first = first.await.unwrap();
        assert_eq!(first.outcome, DrainOutcome::Completed);
        assert_eq!(first.delivered, 1);
        // Exactly one request total; the overlapping trigger sent nothing
        assert_eq!(remote.delivery_count(), 1);
        assert!(!processor.is_draining());
    }

    #[tokio::test]
    async fn test_mapped_response_remaps_and_rewrites_pending_child() {
        let (processor, store, remote, _) = setup(ScriptedRemote::online(vec![
            Ok(mapping_response()),
            Ok(Value::Null),
        ]))
        .await;

        let (order, part, service, labor, queued) = order_aggregate();
        store
            .create_order_with_queue(&order, &[part], &[service], &[labor], &queued)
            .await
            .unwrap();
        // Dependent create queued behind the parent, referencing its temp id
        store
            .enqueue(&entry(
                "Os/horas/",
                json!({"os_hora_os": "LOCAL-A", "os_hora_item": "LOCAL-H9"}),
            ))
            .await
            .unwrap();

        let report = processor.process_sync_queue().await;

        assert_eq!(report.outcome, DrainOutcome::Completed);
        assert_eq!(report.remapped, 1);
        assert_eq!(report.delivered, 1);
        assert_eq!(store.pending_count().await.unwrap(), 0);

        // The parent order now points at the server id
        let stored = store.get_order(&rid("LOCAL-A")).await.unwrap().unwrap();
        assert_eq!(stored.remote_ref().as_str(), "9001");

        // The child was delivered with the rewritten payload
        let sent = remote.sent();
        assert_eq!(sent.len(), 2);
        let child_payload = sent[1].1.to_string();
        assert!(child_payload.contains("9001"));
        assert!(!child_payload.contains("LOCAL-A"));
        assert!(child_payload.contains("LOCAL-H9"));
    }

    #[tokio::test]
    async fn test_business_rejection_discards_entry_and_notifies() {
        let (processor, store, remote, notifier) = setup(ScriptedRemote::online(vec![
            Err(RemoteError::Business(
                "Estoque negativo para o produto 77".to_string(),
            )),
            Ok(Value::Null),
        ]))
        .await;
        store.enqueue(&entry("Os/ordens/", json!({"a": 1}))).await.unwrap();
        store.enqueue(&entry("Os/ordens/", json!({"b": 2}))).await.unwrap();

        let report = processor.process_sync_queue().await;

        assert_eq!(report.outcome, DrainOutcome::Completed);
        assert_eq!(report.discarded, 1);
        assert_eq!(report.delivered, 1);
        assert_eq!(remote.delivery_count(), 2);
        assert_eq!(store.pending_count().await.unwrap(), 0);

        let messages = notifier.messages();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].body.contains("Estoque negativo"));
    }

    #[tokio::test]
    async fn test_connectivity_failure_stops_pass_and_preserves_order() {
        let (processor, store, remote, _) = setup(ScriptedRemote::online(vec![
            Ok(Value::Null),
            Err(RemoteError::Connectivity("connection reset".to_string())),
        ]))
        .await;
        store.enqueue(&entry("Os/ordens/", json!({"label": "first"}))).await.unwrap();
        store.enqueue(&entry("Os/ordens/", json!({"label": "second"}))).await.unwrap();
        store.enqueue(&entry("Os/ordens/", json!({"label": "third"}))).await.unwrap();

        let report = processor.process_sync_queue().await;

        assert_eq!(report.outcome, DrainOutcome::ConnectivityLost);
        assert_eq!(report.delivered, 1);
        // Second entry failed in flight, third was never attempted
        assert_eq!(remote.delivery_count(), 2);

        let remaining = store.list_pending().await.unwrap();
        let labels: Vec<&str> = remaining
            .iter()
            .map(|e| e.payload()["label"].as_str().unwrap())
            .collect();
        assert_eq!(labels, vec!["second", "third"]);
        assert!(remaining.iter().all(|e| e.attempts() == 0));
    }

    #[tokio::test]
    async fn test_transient_failure_increments_attempts_and_continues() {
        let (processor, store, remote, notifier) = setup(ScriptedRemote::online(vec![
            Err(RemoteError::Status {
                status: 500,
                message: "internal error".to_string(),
            }),
            Ok(Value::Null),
        ]))
        .await;
        store.enqueue(&entry("Os/ordens/", json!({"label": "flaky"}))).await.unwrap();
        store.enqueue(&entry("Os/ordens/", json!({"label": "fine"}))).await.unwrap();

        let report = processor.process_sync_queue().await;

        assert_eq!(report.outcome, DrainOutcome::Completed);
        assert_eq!(report.failed, 1);
        assert_eq!(report.delivered, 1);
        assert_eq!(remote.delivery_count(), 2);

        let remaining = store.list_pending().await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].payload()["label"], "flaky");
        assert_eq!(remaining[0].attempts(), 1);
        // Transient failures stay silent
        assert!(notifier.messages().is_empty());
    }

    #[tokio::test]
    async fn test_probe_marker_removed_without_delivery() {
        let (processor, store, remote, _) =
            setup(ScriptedRemote::online(vec![Ok(Value::Null)])).await;
        store
            .enqueue(&entry(SANITY_MARKER_RESOURCE, json!({})))
            .await
            .unwrap();
        store.enqueue(&entry("Os/ordens/", json!({"a": 1}))).await.unwrap();

        let report = processor.process_sync_queue().await;

        assert_eq!(report.outcome, DrainOutcome::Completed);
        assert_eq!(report.discarded, 1);
        assert_eq!(report.delivered, 1);
        assert_eq!(store.pending_count().await.unwrap(), 0);

        // Only the real entry produced a request
        let sent = remote.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "Os/ordens/");
    }
}
