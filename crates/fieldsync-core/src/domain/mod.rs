//! Domain entities and business logic
//!
//! This module contains the core domain types for FieldSync:
//! - Newtypes for type-safe identifiers
//! - The mutation-queue entry and its action enum
//! - The service-order aggregate (order plus part/service/labor lines)
//! - Reference-cache entities mirrored from the backend
//! - The id-mapping type driving the remap protocol
//! - Domain-specific error types

pub mod errors;
pub mod newtypes;
pub mod order;
pub mod queue;
pub mod reference;
pub mod remap;

// Re-export commonly used types
pub use errors::{DomainError, RemoteError};
pub use newtypes::*;
pub use order::{
    LaborDraft, LaborLine, OrderDraft, PartDraft, PartLine, ServiceDraft, ServiceLine,
    ServiceOrder,
};
pub use queue::{HttpAction, QueuedOperation, SANITY_MARKER_RESOURCE};
pub use reference::{Customer, Product};
pub use remap::{IdMapping, IdPair, RemapReport};
