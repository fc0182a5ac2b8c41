//! Use cases (interactors) for FieldSync
//!
//! This module contains the application use cases that orchestrate
//! domain entities and port interfaces. Use cases are thin coordinators
//! that delegate business rules to domain methods and I/O to ports.
//!
//! ## Use Cases
//!
//! - [`CreateOrderUseCase`] - Offline creation of a service order with its
//!   lines and the queued create operation

pub mod create_order;

pub use create_order::CreateOrderUseCase;
