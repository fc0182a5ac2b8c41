//! Configuration module for FieldSync.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, validation, defaults, and a builder pattern for programmatic use.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for FieldSync.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub sync: SyncConfig,
    pub cache: CacheConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

/// Backend API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Backend base URL, without the `/api/{slug}` prefix.
    pub base_url: String,
    /// Tenant slug inserted into every request path.
    pub slug: String,
    /// Bearer token for the API. `None` until provisioned by the login flow.
    pub bearer_token: Option<String>,
    /// Company code sent as the `empr` query parameter.
    pub company: String,
    /// Branch code sent as the `fili` query parameter.
    pub branch: String,
}

/// Queue-draining settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Milliseconds between periodic drain triggers.
    pub drain_interval_ms: u64,
    /// Milliseconds between connectivity probe polls.
    pub probe_interval_ms: u64,
}

/// Reference-cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Hours before a successful bootstrap refresh goes stale.
    pub ttl_hours: u64,
    /// Row limit for each bulk reference fetch.
    pub bootstrap_limit: u32,
    /// Row limit for remote search calls.
    pub search_limit: u32,
}

/// Local database settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    pub db_path: PathBuf,
    /// Maximum open connections in the SQLite pool.
    pub max_connections: u32,
    /// Milliseconds a statement waits on a locked database before failing.
    pub busy_timeout_ms: u64,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
}

// ---------------------------------------------------------------------------
// Config::load()
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/fieldsync/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("fieldsync")
            .join("config.yaml")
    }
}

// ---------------------------------------------------------------------------
// Config::default()
// ---------------------------------------------------------------------------

// Config derives Default because all its fields implement Default.
// (clippy::derivable_impls)

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            slug: "demo".to_string(),
            bearer_token: None,
            company: "1".to_string(),
            branch: "1".to_string(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            drain_interval_ms: 5000,
            probe_interval_ms: 5000,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_hours: 12,
            bootstrap_limit: 500,
            search_limit: 20,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("fieldsync")
                .join("fieldsync.db"),
            max_connections: 5,
            busy_timeout_ms: 5000,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config::validate()
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"sync.drain_interval_ms"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- api ---
        if !self.api.base_url.starts_with("http://") && !self.api.base_url.starts_with("https://") {
            errors.push(ValidationError {
                field: "api.base_url".into(),
                message: format!("must start with http:// or https://: '{}'", self.api.base_url),
            });
        }
        if self.api.slug.is_empty() {
            errors.push(ValidationError {
                field: "api.slug".into(),
                message: "must not be empty".into(),
            });
        }
        if self.api.company.is_empty() {
            errors.push(ValidationError {
                field: "api.company".into(),
                message: "must not be empty".into(),
            });
        }
        if self.api.branch.is_empty() {
            errors.push(ValidationError {
                field: "api.branch".into(),
                message: "must not be empty".into(),
            });
        }

        // --- sync ---
        if self.sync.drain_interval_ms == 0 {
            errors.push(ValidationError {
                field: "sync.drain_interval_ms".into(),
                message: "must be greater than 0".into(),
            });
        }
        if self.sync.probe_interval_ms == 0 {
            errors.push(ValidationError {
                field: "sync.probe_interval_ms".into(),
                message: "must be greater than 0".into(),
            });
        }

        // --- cache ---
        if self.cache.ttl_hours == 0 {
            errors.push(ValidationError {
                field: "cache.ttl_hours".into(),
                message: "must be greater than 0".into(),
            });
        }
        if self.cache.bootstrap_limit == 0 {
            errors.push(ValidationError {
                field: "cache.bootstrap_limit".into(),
                message: "must be greater than 0".into(),
            });
        }
        if self.cache.search_limit == 0 {
            errors.push(ValidationError {
                field: "cache.search_limit".into(),
                message: "must be greater than 0".into(),
            });
        }

        // --- storage ---
        if self.storage.db_path.as_os_str().is_empty() {
            errors.push(ValidationError {
                field: "storage.db_path".into(),
                message: "must not be empty".into(),
            });
        }
        if self.storage.max_connections == 0 {
            errors.push(ValidationError {
                field: "storage.max_connections".into(),
                message: "must be greater than 0".into(),
            });
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".into(),
                message: format!(
                    "invalid level '{}'; valid options: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Builder for constructing a [`Config`] programmatically.
///
/// Starts from [`Config::default`] and allows selective overrides.
///
/// # Example
///
/// ```rust,no_run
/// use fieldsync_core::config::ConfigBuilder;
///
/// let config = ConfigBuilder::new()
///     .api_base_url("https://erp.example.com")
///     .api_slug("acme")
///     .sync_drain_interval_ms(10_000)
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder initialised with [`Config::default`] values.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    // --- api ---

    pub fn api_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.api.base_url = base_url.into();
        self
    }

    pub fn api_slug(mut self, slug: impl Into<String>) -> Self {
        self.config.api.slug = slug.into();
        self
    }

    pub fn api_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.config.api.bearer_token = Some(token.into());
        self
    }

    pub fn api_company(mut self, company: impl Into<String>) -> Self {
        self.config.api.company = company.into();
        self
    }

    pub fn api_branch(mut self, branch: impl Into<String>) -> Self {
        self.config.api.branch = branch.into();
        self
    }

    // --- sync ---

    pub fn sync_drain_interval_ms(mut self, ms: u64) -> Self {
        self.config.sync.drain_interval_ms = ms;
        self
    }

    pub fn sync_probe_interval_ms(mut self, ms: u64) -> Self {
        self.config.sync.probe_interval_ms = ms;
        self
    }

    // --- cache ---

    pub fn cache_ttl_hours(mut self, hours: u64) -> Self {
        self.config.cache.ttl_hours = hours;
        self
    }

    pub fn cache_bootstrap_limit(mut self, limit: u32) -> Self {
        self.config.cache.bootstrap_limit = limit;
        self
    }

    pub fn cache_search_limit(mut self, limit: u32) -> Self {
        self.config.cache.search_limit = limit;
        self
    }

    // --- storage ---

    pub fn storage_db_path(mut self, path: PathBuf) -> Self {
        self.config.storage.db_path = path;
        self
    }

    pub fn storage_max_connections(mut self, connections: u32) -> Self {
        self.config.storage.max_connections = connections;
        self
    }

    pub fn storage_busy_timeout_ms(mut self, ms: u64) -> Self {
        self.config.storage.busy_timeout_ms = ms;
        self
    }

    // --- logging ---

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    // --- build ---

    /// Consume the builder and return the finished [`Config`].
    pub fn build(self) -> Config {
        self.config
    }

    /// Build and validate in one step. Returns `Err` with the list of
    /// validation errors if the configuration is invalid.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let config = self.build();
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
