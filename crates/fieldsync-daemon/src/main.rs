//! FieldSync Daemon - Background synchronization service
//!
//! This binary runs headless on the device and handles:
//! - Draining the offline mutation queue against the backend
//! - Connectivity probing with drain-on-reconnect
//! - TTL-gated reference cache refresh on startup
//! - Graceful shutdown on SIGTERM/SIGINT
//!
//! # Architecture
//!
//! The daemon wires the adapter crates into the engine: the SQLite store,
//! the backend HTTP provider, and a log-backed notification sink. It then
//! runs the connectivity monitor and the drain scheduler side by side,
//! both controlled by a `CancellationToken` that is triggered on receipt
//! of SIGTERM or SIGINT.

use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use fieldsync_api::{provider::RemoteApiProvider, RemoteClient};
use fieldsync_core::{
    config::Config,
    ports::{
        local_store::ILocalStore,
        notification::{INotificationService, Notification, NotificationPriority},
        remote_api::IRemoteApi,
    },
};
use fieldsync_engine::{
    bootstrap::RefreshOutcome, CacheBootstrapper, ConnectivityMonitor, SyncProcessor,
    SyncScheduler,
};
use fieldsync_store::{DatabasePool, PoolSettings, SqliteLocalStore};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

// ============================================================================
// LogNotifier
// ============================================================================

/// Notification sink for the headless daemon
///
/// There is no desktop session to post toasts to, so notifications are
/// written to the structured log instead. High and critical messages land
/// at warn level, where operators watch for lost writes.
struct LogNotifier;

#[async_trait::async_trait]
impl INotificationService for LogNotifier {
    async fn notify(&self, notification: &Notification) -> Result<()> {
        match notification.priority {
            NotificationPriority::High | NotificationPriority::Critical => {
                warn!(
                    category = %notification.category,
                    priority = %notification.priority,
                    "{}: {}",
                    notification.title,
                    notification.body
                );
            }
            NotificationPriority::Normal | NotificationPriority::Low => {
                info!(
                    category = %notification.category,
                    priority = %notification.priority,
                    "{}: {}",
                    notification.title,
                    notification.body
                );
            }
        }
        Ok(())
    }
}

// ============================================================================
// DaemonService struct
// ============================================================================

/// Main daemon service that owns the store and runs the engine
///
/// Holds the configuration, the SQLite store, and a cancellation token
/// for graceful shutdown.
struct DaemonService {
    /// Application configuration loaded from YAML
    config: Config,
    /// SQLite store backing the queue and the reference cache
    store: Arc<SqliteLocalStore>,
    /// Token for signalling graceful shutdown to all async tasks
    shutdown: CancellationToken,
}

impl DaemonService {
    /// Creates a new DaemonService
    ///
    /// Reports configuration problems and opens the database at the
    /// configured path, creating the parent directory when missing.
    async fn new(config: Config, shutdown: CancellationToken) -> Result<Self> {
        for problem in config.validate() {
            warn!(field = %problem.field, "Configuration problem: {}", problem.message);
        }

        let db_path = config.storage.db_path.clone();
        if let Some(parent) = db_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let pool_settings = PoolSettings {
            max_connections: config.storage.max_connections,
            busy_timeout: Duration::from_millis(config.storage.busy_timeout_ms),
        };
        let db_pool = DatabasePool::open(&db_path, pool_settings)
            .await
            .context("Failed to open database")?;
        let store = Arc::new(SqliteLocalStore::new(db_pool.pool().clone()));

        info!(db_path = %db_path.display(), "Opened local store");

        Ok(Self {
            config,
            store,
            shutdown,
        })
    }

    // ========================================================================
    // DaemonService::run() - wiring and main loop
    // ========================================================================

    /// Runs the daemon
    ///
    /// 1. Builds the backend provider and the engine components
    /// 2. Refreshes the reference cache when it is stale
    /// 3. Runs the connectivity monitor and the drain scheduler until
    ///    the shutdown token fires
    async fn run(&self) -> Result<()> {
        let client = RemoteClient::new(&self.config);
        let remote: Arc<dyn IRemoteApi + Send + Sync> = Arc::new(RemoteApiProvider::new(client));
        let notifier: Arc<dyn INotificationService + Send + Sync> = Arc::new(LogNotifier);
        let store: Arc<dyn ILocalStore + Send + Sync> =
            Arc::clone(&self.store) as Arc<dyn ILocalStore + Send + Sync>;

        let backlog = self
            .store
            .pending_count()
            .await
            .context("Failed to count pending operations")?;
        info!(backlog, "Pending queue loaded");

        let processor = Arc::new(SyncProcessor::new(
            Arc::clone(&store),
            Arc::clone(&remote),
            Arc::clone(&notifier),
        ));
        let monitor = ConnectivityMonitor::new(
            Arc::clone(&remote),
            Arc::clone(&processor),
            Duration::from_millis(self.config.sync.probe_interval_ms),
        );
        let scheduler = SyncScheduler::new(
            Arc::clone(&processor),
            Duration::from_millis(self.config.sync.drain_interval_ms),
        );
        let bootstrapper = CacheBootstrapper::new(
            Arc::clone(&store),
            Arc::clone(&remote),
            Arc::clone(&notifier),
            &self.config,
        );

        // Refresh the reference cache once on startup. Remote failures are
        // already soft inside the bootstrapper; only storage errors abort.
        match bootstrapper.refresh_if_stale().await {
            Ok(report) => match report.outcome {
                RefreshOutcome::Fresh => info!("Reference cache is fresh"),
                RefreshOutcome::Refreshed => info!(
                    customers = ?report.customers_upserted,
                    products = ?report.products_upserted,
                    "Reference cache refreshed"
                ),
                RefreshOutcome::Failed => {
                    warn!("Reference cache refresh failed, serving existing rows")
                }
            },
            Err(e) => return Err(e).context("Reference cache refresh hit a storage error"),
        }

        let monitor_shutdown = self.shutdown.clone();
        let monitor_task = tokio::spawn(async move {
            monitor.run(monitor_shutdown).await;
        });

        let scheduler_shutdown = self.shutdown.clone();
        let scheduler_task = tokio::spawn(async move {
            scheduler.run(scheduler_shutdown).await;
        });

        let (monitor_result, scheduler_result) = tokio::join!(monitor_task, scheduler_task);
        monitor_result.context("Connectivity monitor task panicked")?;
        scheduler_result.context("Drain scheduler task panicked")?;

        Ok(())
    }
}

// ============================================================================
// Graceful shutdown signal handler
// ============================================================================

/// Waits for SIGTERM or SIGINT and triggers the cancellation token
///
/// This function spawns a task that listens for OS signals and cancels
/// the provided token when a shutdown signal is received.
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C)");
        }
        _ = terminate => {
            info!("Received SIGTERM");
        }
    }

    token.cancel();
}

// ============================================================================
// Main entry point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = Config::default_path();
    let config = Config::load_or_default(&config_path);

    // RUST_LOG wins over the configured level when set
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .init();

    info!(config_path = %config_path.display(), "FieldSync daemon starting (fieldsyncd)");

    // Create cancellation token for propagation to all tasks
    let shutdown_token = CancellationToken::new();

    // Spawn signal handler task
    let signal_token = shutdown_token.clone();
    tokio::spawn(async move {
        shutdown_signal(signal_token).await;
    });

    // Create and run the daemon service
    let service = DaemonService::new(config, shutdown_token.clone()).await?;

    let result = service.run().await;

    match &result {
        Ok(()) => info!("FieldSync daemon shut down gracefully"),
        Err(e) => error!(error = %e, "FieldSync daemon exiting with error"),
    }

    result
}

// ============================================================================
// Tests
// ============================================================================
