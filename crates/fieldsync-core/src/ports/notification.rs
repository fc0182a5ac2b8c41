//! Notification service port (driven/secondary port)
//!
//! This module defines the interface for surfacing sync events to the
//! user. Implementations may use a toast overlay, a system notification
//! daemon, or (in the headless daemon) structured log output.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because notification delivery is adapter-specific.
//! - Notifications are fire-and-forget; the caller does not wait for
//!   user interaction.
//! - By policy, only fatal business rejections reach the user. Transient
//!   and connectivity failures stay silent so an unstable link does not
//!   produce a stream of alarming messages.

use serde::{Deserialize, Serialize};

// ============================================================================
// Notification struct and NotificationPriority enum
// ============================================================================

/// Priority level for a notification
///
/// Maps to urgency levels in the presenting notification system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationPriority {
    /// Low priority, may not be shown immediately
    Low,
    /// Normal priority, shown in the notification area
    Normal,
    /// High priority, may trigger a banner or sound
    High,
    /// Critical priority, persists until acknowledged
    Critical,
}

impl Default for NotificationPriority {
    fn default() -> Self {
        NotificationPriority::Normal
    }
}

impl std::fmt::Display for NotificationPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            NotificationPriority::Low => "low",
            NotificationPriority::Normal => "normal",
            NotificationPriority::High => "high",
            NotificationPriority::Critical => "critical",
        };
        write!(f, "{}", s)
    }
}

/// A notification to display to the user
///
/// Contains the content and metadata for one user-visible message.
/// Implementations may map `category` to grouping/filtering mechanisms
/// of the presenting system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    /// Title of the notification (short, descriptive)
    pub title: String,
    /// Body text with details about the event
    pub body: String,
    /// Priority level affecting how the notification is displayed
    pub priority: NotificationPriority,
    /// Category for grouping/filtering (e.g., "sync", "error")
    pub category: String,
}

impl Notification {
    /// Creates a new notification with the given title and body
    ///
    /// Uses `Normal` priority and an empty category by default.
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            priority: NotificationPriority::Normal,
            category: String::new(),
        }
    }

    /// Sets the priority level
    pub fn with_priority(mut self, priority: NotificationPriority) -> Self {
        self.priority = priority;
        self
    }

    /// Sets the category
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// Creates a sync-status notification
    pub fn sync(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self::new(title, body).with_category("sync")
    }

    /// Creates a notification for a server-rejected operation, High priority
    ///
    /// Used when the backend reports a business invariant violation and the
    /// queued operation is discarded; the user needs to know the write was
    /// lost and why.
    pub fn rejected_operation(body: impl Into<String>) -> Self {
        Self::new("Operation rejected by server", body)
            .with_priority(NotificationPriority::High)
            .with_category("sync")
    }

    /// Creates an error notification with High priority
    pub fn error(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self::new(title, body)
            .with_priority(NotificationPriority::High)
            .with_category("error")
    }
}

// ============================================================================
// INotificationService trait
// ============================================================================

/// Port trait for user-visible notifications
///
/// ## Implementation Notes
///
/// - `notify` sends a one-shot notification (toast/banner).
/// - Implementations should gracefully handle delivery failures (e.g., no
///   notification daemon present) without crashing.
#[async_trait::async_trait]
pub trait INotificationService: Send + Sync {
    /// Sends a notification to the user
    async fn notify(&self, notification: &Notification) -> anyhow::Result<()>;
}
