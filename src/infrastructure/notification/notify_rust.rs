//! Desktop notification adapter using notify-rust
//!
//! Works on Windows, macOS, and Linux. On freedesktop platforms a repeated
//! key replaces the visible notification in place.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;

use crate::application::ports::{NotificationError, NotificationLevel, Notifier};

/// Desktop notifier using notify-rust
pub struct NotifyRustNotifier {
    /// Application name for notifications
    app_name: String,
    /// Server-side ids of the last notification shown per key
    shown: Arc<StdMutex<HashMap<String, u32>>>,
}

impl NotifyRustNotifier {
    /// Create a new notify-rust notifier
    pub fn new() -> Self {
        Self::with_app_name("Recordify")
    }

    /// Create with custom app name
    pub fn with_app_name(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            shown: Arc::new(StdMutex::new(HashMap::new())),
        }
    }

    fn summary(level: NotificationLevel) -> &'static str {
        match level {
            NotificationLevel::Info => "Recordify",
            NotificationLevel::Success => "Recording saved",
            NotificationLevel::Error => "Recording error",
        }
    }
}

impl Default for NotifyRustNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Notifier for NotifyRustNotifier {
    async fn notify(
        &self,
        level: NotificationLevel,
        message: &str,
        key: Option<&str>,
    ) -> Result<(), NotificationError> {
        let message = message.to_owned();
        let app_name = self.app_name.clone();
        let key = key.map(str::to_owned);
        let shown = Arc::clone(&self.shown);

        // notify-rust operations can block, so run in spawn_blocking
        tokio::task::spawn_blocking(move || {
            let mut notification = notify_rust::Notification::new();
            notification
                .appname(&app_name)
                .summary(Self::summary(level))
                .body(&message)
                .icon(level.icon_name());

            #[cfg(all(unix, not(target_os = "macos")))]
            {
                let previous = key.as_ref().and_then(|k| {
                    shown
                        .lock()
                        .unwrap_or_else(|e| e.into_inner())
                        .get(k)
                        .copied()
                });
                if let Some(id) = previous {
                    notification.id(id);
                }

                let handle = notification
                    .show()
                    .map_err(|e| NotificationError::SendFailed(e.to_string()))?;
                if let Some(k) = key {
                    shown
                        .lock()
                        .unwrap_or_else(|e| e.into_inner())
                        .insert(k, handle.id());
                }
            }

            #[cfg(not(all(unix, not(target_os = "macos"))))]
            {
                let _ = (&key, &shown);
                notification
                    .show()
                    .map_err(|e| NotificationError::SendFailed(e.to_string()))?;
            }

            Ok(())
        })
        .await
        .map_err(|e| NotificationError::SendFailed(format!("Task join error: {}", e)))?
    }
}
