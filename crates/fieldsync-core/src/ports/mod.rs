//! Port definitions (hexagonal architecture interfaces)
//!
//! This module defines the port traits that form the boundaries of the
//! hexagonal architecture. Ports are interfaces that the domain core
//! depends on, but whose implementations live in adapter crates.
//!
//! ## Ports Overview
//!
//! - [`ILocalStore`] - Durable on-device storage: mutation queue, order
//!   aggregate records, reference cache, metadata
//! - [`IRemoteApi`] - Backend delivery, connectivity probing, reference
//!   data fetch and search
//! - [`INotificationService`] - User-visible notifications

pub mod local_store;
pub mod notification;
pub mod remote_api;

pub use local_store::{ILocalStore, ReferenceFilter};
pub use notification::{INotificationService, Notification, NotificationPriority};
pub use remote_api::IRemoteApi;
