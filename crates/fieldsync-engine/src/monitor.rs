//! Connectivity monitor - watches backend reachability
//!
//! Polls the cheap HEAD probe on a fixed interval and publishes the
//! resulting online/offline state on a watch channel. The moment the
//! state flips from offline to online, a queue drain is triggered
//! fire-and-forget; everything queued while disconnected leaves as soon
//! as the backend answers again.
//!
//! Overlap with the periodic [`SyncScheduler`](crate::scheduler::SyncScheduler)
//! trigger is harmless: the processor's single-flight guard turns the
//! second trigger into a no-op.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use fieldsync_core::ports::remote_api::IRemoteApi;

use crate::processor::SyncProcessor;

// ============================================================================
// ConnectivityMonitor
// ============================================================================

/// Polls backend reachability and reacts to state transitions
///
/// The published state starts as offline; the first successful probe is
/// itself a transition and drains whatever accumulated before startup.
pub struct ConnectivityMonitor {
    /// Probe target
    remote: Arc<dyn IRemoteApi + Send + Sync>,
    /// Drain trigger for the offline-to-online transition
    processor: Arc<SyncProcessor>,
    /// Time between probes
    probe_interval: Duration,
    /// Publisher for the current online state
    status_tx: watch::Sender<bool>,
}

impl ConnectivityMonitor {
    /// Creates a new `ConnectivityMonitor`
    ///
    /// # Arguments
    /// * `remote` - Backend client providing the reachability probe
    /// * `processor` - Processor to trigger when the backend comes back
    /// * `probe_interval` - Time between probes
    pub fn new(
        remote: Arc<dyn IRemoteApi + Send + Sync>,
        processor: Arc<SyncProcessor>,
        probe_interval: Duration,
    ) -> Self {
        let (status_tx, _) = watch::channel(false);
        Self {
            remote,
            processor,
            probe_interval,
            status_tx,
        }
    }

    /// Returns a receiver observing the online state
    ///
    /// The receiver sees `true` while the backend is reachable and is
    /// notified on every transition.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.status_tx.subscribe()
    }

    /// Returns the most recently observed online state
    pub fn is_online(&self) -> bool {
        *self.status_tx.borrow()
    }

    /// Main probe loop
    ///
    /// Probes on the configured interval (first probe immediately) until
    /// `shutdown` is cancelled. Publishes transitions and spawns a drain
    /// when the backend becomes reachable.
    pub async fn run(&self, shutdown: CancellationToken) {
        info!(
            interval_ms = self.probe_interval.as_millis() as u64,
            "Connectivity monitor starting"
        );

        let mut timer = tokio::time::interval(self.probe_interval);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Connectivity monitor stopping");
                    break;
                }

                _ = timer.tick() => {
                    let online = self.remote.probe_connectivity().await;
                    let was_online = self.status_tx.send_replace(online);

                    if online == was_online {
                        continue;
                    }
                    info!(online, "Connectivity changed");

                    if online {
                        // Back online: drain what accumulated while offline
                        let processor = self.processor.clone();
                        tokio::spawn(async move {
                            let report = processor.process_sync_queue().await;
                            debug!(
                                outcome = ?report.outcome,
                                processed = report.processed(),
                                "Reconnect drain finished"
                            );
                        });
                    }
                }
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

    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use serde_json::{json, Value};

    use fieldsync_core::domain::errors::RemoteError;
    use fieldsync_core::domain::queue::{HttpAction, QueuedOperation};
    use fieldsync_core::domain::reference::{Customer, Product};
    use fieldsync_core::ports::local_store::ILocalStore;
    use fieldsync_core::ports::notification::{INotificationService, Notification};
    use fieldsync_store::{DatabasePool, SqliteLocalStore};

    /// Remote double with a switchable online state
    struct SwitchableRemote {
        online: AtomicBool,
        deliveries: AtomicUsize,
    }

    impl SwitchableRemote {
        fn new(online: bool) -> Self {
            Self {
                online: AtomicBool::new(online),
                deliveries: AtomicUsize::new(0),
            }
        }

        fn set_online(&self, online: bool) {
            self.online.store(online, Ordering::Release);
        }

        fn delivery_count(&self) -> usize {
            self.deliveries.load(Ordering::Acquire)
        }
    }

    #[async_trait::async_trait]
    impl IRemoteApi for SwitchableRemote {
        async fn deliver(&self, _entry: &QueuedOperation) -> Result<Value, RemoteError> {
            self.deliveries.fetch_add(1, Ordering::AcqRel);
            Ok(Value::Null)
        }

        async fn probe_connectivity(&self) -> bool {
            self.online.load(Ordering::Acquire)
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

    struct SilentNotifier;

    #[async_trait::async_trait]
    impl INotificationService for SilentNotifier {
        async fn notify(&self, _notification: &Notification) -> anyhow::Result<()> {
            Ok(())
        }
    }

    async fn setup(
        online: bool,
    ) -> (
        ConnectivityMonitor,
        Arc<SqliteLocalStore>,
        Arc<SwitchableRemote>,
    ) {
        let pool = DatabasePool::in_memory()
            .await
            .expect("Failed to create in-memory database");
        let store = Arc::new(SqliteLocalStore::new(pool.pool().clone()));
        let remote = Arc::new(SwitchableRemote::new(online));
        let processor = Arc::new(SyncProcessor::new(
            store.clone(),
            remote.clone(),
            Arc::new(SilentNotifier),
        ));
        let monitor =
            ConnectivityMonitor::new(remote.clone(), processor, Duration::from_millis(10));
        (monitor, store, remote)
    }

    fn entry() -> QueuedOperation {
        QueuedOperation::new(HttpAction::Post, "Os/ordens/", json!({"a": 1}), None)
    }

    #[tokio::test]
    async fn test_reconnect_drains_queue() {
        let (monitor, store, remote) = setup(false).await;
        store.enqueue(&entry()).await.unwrap();

        let shutdown = CancellationToken::new();
        let task = tokio::spawn({
            let token = shutdown.clone();
            let monitor = Arc::new(monitor);
            let handle = monitor.clone();
            async move {
                handle.run(token).await;
            }
        });

        // Give the monitor a few offline probes, then restore the link
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(remote.delivery_count(), 0);
        remote.set_online(true);

        // The transition should drain the queue shortly after
        let mut drained = false;
        for _ in 0..100 {
            if store.pending_count().await.unwrap() == 0 {
                drained = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(drained, "queue should drain after reconnect");
        assert_eq!(remote.delivery_count(), 1);

        shutdown.cancel();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_watch_channel_publishes_transition() {
        let (monitor, _store, remote) = setup(false).await;
        let monitor = Arc::new(monitor);
        let mut status = monitor.subscribe();
        assert!(!*status.borrow());

        let shutdown = CancellationToken::new();
        let task = tokio::spawn({
            let token = shutdown.clone();
            let handle = monitor.clone();
            async move {
                handle.run(token).await;
            }
        });

        remote.set_online(true);
        tokio::time::timeout(Duration::from_secs(1), status.changed())
            .await
            .expect("transition should be published")
            .unwrap();
        assert!(*status.borrow());
        assert!(monitor.is_online());

        shutdown.cancel();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_steady_online_does_not_retrigger() {
        let (monitor, store, remote) = setup(true).await;

        let shutdown = CancellationToken::new();
        let task = tokio::spawn({
            let token = shutdown.clone();
            let monitor = Arc::new(monitor);
            async move {
                monitor.run(token).await;
            }
        });

        // Let the initial transition pass with an empty queue
        tokio::time::sleep(Duration::from_millis(50)).await;

        // Enqueued while steadily online: the monitor must not drain it
        store.enqueue(&entry()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(store.pending_count().await.unwrap(), 1);
        assert_eq!(remote.delivery_count(), 0);

        shutdown.cancel();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_stops_loop() {
        let (monitor, _store, _remote) = setup(false).await;
        let shutdown = CancellationToken::new();
        shutdown.cancel();

        tokio::time::timeout(Duration::from_secs(1), monitor.run(shutdown))
            .await
            .expect("monitor should stop when cancelled");
    }
}
