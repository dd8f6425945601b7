//! Passive notification channel.
//!
//! Non-fatal failures that the user should hear about (but that do not change
//! the orchestrator's status) are broadcast here. Nobody has to listen.

use crate::analysis::ResourceId;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;

const DEFAULT_CAPACITY: usize = 32;

/// Severity of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Info,
    Error,
}

/// A message for the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub level: NotificationLevel,
    pub resource_id: ResourceId,
    pub message: String,
}

impl Notification {
    pub fn info(resource_id: ResourceId, message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Info,
            resource_id,
            message: message.into(),
        }
    }

    pub fn error(resource_id: ResourceId, message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Error,
            resource_id,
            message: message.into(),
        }
    }
}

/// Cloneable sender side of the notification channel.
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: broadcast::Sender<Notification>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Listen for notifications sent from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }

    /// Send a notification. Having no listeners is not an error.
    pub fn notify(&self, notification: Notification) {
        if self.tx.send(notification).is_err() {
            debug!("Notification dropped, no listeners");
        }
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}
