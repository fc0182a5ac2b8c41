//! FieldSync API - Backend HTTP client
//!
//! Provides the async client for the tenant-scoped backend REST API:
//! - Queued-operation delivery with failure classification
//! - A cheap HEAD reachability probe
//! - Reference-data bulk fetch and search endpoints
//!
//! ## Architecture
//!
//! This crate implements the `IRemoteApi` port from `fieldsync-core`.
//! It is a driven (secondary) adapter in the hexagonal architecture: the
//! sync engine talks to the port trait and never sees reqwest types.
//!
//! ## Modules
//!
//! - [`client`] - HTTP client with URL construction and error classification
//! - [`provider`] - `IRemoteApi` implementation delegating to the client

pub mod client;
pub mod provider;

pub use client::RemoteClient;
pub use provider::RemoteApiProvider;
