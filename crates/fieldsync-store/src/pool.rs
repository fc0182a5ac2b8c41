//! SQLite pool construction
//!
//! Opens the queue database in WAL mode so drain-loop writes never block
//! cache reads, applies the bundled schema on first connect, and offers
//! an in-memory variant for tests. File-backed pools take their sizing
//! and lock patience from [`PoolSettings`], which the daemon fills from
//! the storage configuration.

use std::path::Path;
use std::time::Duration;

use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};

use crate::StoreError;

/// Schema applied on every connect; `CREATE TABLE IF NOT EXISTS` makes it
/// a no-op for an existing database
const SCHEMA_SQL: &str = include_str!("migrations/20260801_initial.sql");

// ============================================================================
// PoolSettings
// ============================================================================

/// Tuning for a file-backed pool
#[derive(Debug, Clone)]
pub struct PoolSettings {
    /// Upper bound on pooled connections
    pub max_connections: u32,
    /// How long a statement waits on a locked database before failing
    pub busy_timeout: Duration,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: 5,
            busy_timeout: Duration::from_secs(5),
        }
    }
}

// ============================================================================
// DatabasePool
// ============================================================================

/// Open handle to the FieldSync SQLite database
///
/// The file-backed pool runs WAL with `synchronous = NORMAL`: queue
/// writes stay cheap and the write-ahead log still survives a process
/// crash. The in-memory variant pins a single connection because SQLite
/// gives every connection its own private in-memory database.
pub struct DatabasePool {
    pool: SqlitePool,
}

impl DatabasePool {
    /// Opens the database file, creating it and its parent directory on
    /// first use, and applies the schema
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ConnectionFailed`] when the file cannot be
    /// opened and [`StoreError::MigrationFailed`] when the schema cannot
    /// be applied.
    pub async fn open(db_path: &Path, settings: PoolSettings) -> Result<Self, StoreError> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::ConnectionFailed(format!(
                    "Failed to create directory {} for the database: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(settings.busy_timeout);

        let pool = SqlitePoolOptions::new()
            .max_connections(settings.max_connections)
            .connect_with(options)
            .await
            .map_err(|e| {
                StoreError::ConnectionFailed(format!(
                    "Failed to open database at {}: {}",
                    db_path.display(),
                    e
                ))
            })?;

        Self::apply_schema(&pool).await?;

        tracing::info!(
            path = %db_path.display(),
            max_connections = settings.max_connections,
            "Database pool ready"
        );

        Ok(Self { pool })
    }

    /// Opens a fresh single-connection in-memory database for tests
    pub async fn in_memory() -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| {
                StoreError::ConnectionFailed(format!("Failed to create in-memory database: {}", e))
            })?;

        Self::apply_schema(&pool).await?;

        Ok(Self { pool })
    }

    /// The underlying sqlx pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn apply_schema(pool: &SqlitePool) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA_SQL)
            .execute(pool)
            .await
            .map_err(|e| StoreError::MigrationFailed(format!("Failed to apply schema: {}", e)))?;

        tracing::debug!("Database schema applied");
        Ok(())
    }
}
