//! Terminal notification adapter
//!
//! Prints notifications to stderr. A keyed message is collapsed while it is
//! still the latest line shown and younger than `REPEAT_WINDOW`.

use std::sync::Mutex as StdMutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use colored::*;

use crate::application::ports::{NotificationError, NotificationLevel, Notifier};

/// How long an identical keyed repeat counts as still showing
const REPEAT_WINDOW: Duration = Duration::from_secs(3);

struct Shown {
    key: Option<String>,
    message: String,
    at: Instant,
}

/// Notifier writing to the terminal
#[derive(Default)]
pub struct TerminalNotifier {
    last: StdMutex<Option<Shown>>,
}

impl TerminalNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Format a line for display
    pub fn render(level: NotificationLevel, message: &str) -> String {
        let marker = match level {
            NotificationLevel::Info => "ℹ".cyan(),
            NotificationLevel::Success => "✓".green(),
            NotificationLevel::Error => "✗".red(),
        };
        format!("{} {}", marker, message)
    }

    /// Record `message` as shown at `now`; false when it repeats the keyed
    /// line still on screen
    fn should_show(&self, message: &str, key: Option<&str>, now: Instant) -> bool {
        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        let repeat = key.is_some()
            && last.as_ref().is_some_and(|shown| {
                shown.key.as_deref() == key
                    && shown.message == message
                    && now.saturating_duration_since(shown.at) < REPEAT_WINDOW
            });
        if repeat {
            return false;
        }
        *last = Some(Shown {
            key: key.map(str::to_owned),
            message: message.to_owned(),
            at: now,
        });
        true
    }
}

#[async_trait]
impl Notifier for TerminalNotifier {
    async fn notify(
        &self,
        level: NotificationLevel,
        message: &str,
        key: Option<&str>,
    ) -> Result<(), NotificationError> {
        if self.should_show(message, key, Instant::now()) {
            eprintln!("{}", Self::render(level, message));
        }
        Ok(())
    }
}
