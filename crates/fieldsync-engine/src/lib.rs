//! FieldSync Engine - offline queue drain and cache orchestration
//!
//! Provides:
//! - Single-flight queue drain with per-entry outcome handling
//! - Temporary-to-server id remapping after successful creates
//! - Connectivity monitoring with drain-on-reconnect
//! - Periodic drain scheduling
//! - TTL-gated reference cache bootstrap
//! - Remote-first search façades with local fallback
//!
//! ## Modules
//!
//! - [`processor`] - The drain loop: delivers queued operations and
//!   classifies every outcome
//! - [`monitor`] - Polls backend reachability and triggers a drain on the
//!   offline-to-online transition
//! - [`scheduler`] - Fixed-interval drain trigger
//! - [`bootstrap`] - Bulk reference-data refresh with a staleness gate
//! - [`facades`] - Customer and product search over remote plus cache

pub mod bootstrap;
pub mod facades;
pub mod monitor;
pub mod processor;
pub mod scheduler;

pub use bootstrap::{CacheBootstrapper, RefreshOutcome, RefreshReport};
pub use facades::{CustomerDirectory, ProductCatalog};
pub use monitor::ConnectivityMonitor;
pub use processor::{DrainOutcome, DrainReport, SyncProcessor};
pub use scheduler::SyncScheduler;
