//! Notification port interface

use async_trait::async_trait;
use thiserror::Error;

/// Notification errors
#[derive(Debug, Clone, Error)]
pub enum NotificationError {
    #[error("Notification service unavailable: {0}")]
    Unavailable(String),

    #[error("Failed to show notification: {0}")]
    SendFailed(String),
}

/// Notification severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationLevel {
    Info,
    Success,
    Error,
}

impl NotificationLevel {
    /// Get the freedesktop icon name
    pub const fn icon_name(&self) -> &'static str {
        match self {
            Self::Info => "audio-input-microphone",
            Self::Success => "dialog-ok",
            Self::Error => "dialog-error",
        }
    }
}

/// Port for transient user-facing notifications
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Show a notification.
    ///
    /// # Arguments
    /// * `level` - Severity of the message
    /// * `message` - The notification body
    /// * `key` - De-duplication key; a repeat with the same key replaces
    ///   the visible notification instead of stacking a new one
    async fn notify(
        &self,
        level: NotificationLevel,
        message: &str,
        key: Option<&str>,
    ) -> Result<(), NotificationError>;
}

/// Blanket implementation for boxed notifier types
#[async_trait]
impl Notifier for Box<dyn Notifier> {
    async fn notify(
        &self,
        level: NotificationLevel,
        message: &str,
        key: Option<&str>,
    ) -> Result<(), NotificationError> {
        self.as_ref().notify(level, message, key).await
    }
}
