//! CLI presenter for output formatting

use std::time::Duration;

use colored::*;
use indicatif::{ProgressBar, ProgressStyle};

use crate::application::SessionSnapshot;
use crate::domain::recording::RecordingState;

/// Presenter for CLI output formatting
pub struct Presenter {
    spinner: Option<ProgressBar>,
}

impl Presenter {
    /// Create a new presenter
    pub fn new() -> Self {
        Self { spinner: None }
    }

    /// Start a spinner with message
    pub fn start_spinner(&mut self, message: &str) {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::default_spinner()
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
                .template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(Duration::from_millis(80));
        self.spinner = Some(spinner);
    }

    /// Update spinner message, starting one if needed
    pub fn update_spinner(&mut self, message: &str) {
        match self.spinner {
            Some(ref spinner) => spinner.set_message(message.to_string()),
            None => self.start_spinner(message),
        }
    }

    /// Stop spinner without status
    pub fn stop_spinner(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
    }

    /// Run `f` with the spinner hidden so printed lines are not overdrawn
    fn suspended(&self, f: impl FnOnce()) {
        match self.spinner {
            Some(ref spinner) => spinner.suspend(f),
            None => f(),
        }
    }

    /// Print info message to stderr
    pub fn info(&self, message: &str) {
        self.suspended(|| eprintln!("{} {}", "ℹ".cyan(), message));
    }

    /// Print success message to stderr
    pub fn success(&self, message: &str) {
        self.suspended(|| eprintln!("{} {}", "✓".green(), message));
    }

    /// Print warning message to stderr
    pub fn warn(&self, message: &str) {
        self.suspended(|| eprintln!("{} {}", "⚠".yellow(), message));
    }

    /// Print error message to stderr
    pub fn error(&self, message: &str) {
        self.suspended(|| eprintln!("{} {}", "✗".red(), message));
    }

    /// Output text to stdout
    pub fn output(&self, text: &str) {
        self.suspended(|| println!("{}", text));
    }

    /// Print a key-value pair (for config list)
    pub fn key_value(&self, key: &str, value: &str) {
        self.suspended(|| println!("{}: {}", key.cyan(), value));
    }

    /// Live indicator text for states that show one
    pub fn format_live(snapshot: &SessionSnapshot) -> Option<String> {
        match snapshot.state {
            RecordingState::RequestingPermission => {
                Some("Requesting microphone access...".to_string())
            }
            RecordingState::Recording => {
                Some(format!("{} {}", "REC".red().bold(), snapshot.elapsed))
            }
            RecordingState::Paused => Some(format!("{} {}", "Paused".yellow(), snapshot.elapsed)),
            RecordingState::Uploading => Some("Saving recording...".to_string()),
            _ => None,
        }
    }

    /// One-line description of the session
    pub fn format_status(snapshot: &SessionSnapshot) -> String {
        let mut line = format!("{} {}", snapshot.state, snapshot.elapsed);
        if let Some(size) = snapshot.artifact_size {
            line.push_str(&format!(" ({} ready to save)", human_size(size)));
        }
        if let Some(error) = &snapshot.error {
            line.push_str(&format!(": {}", error));
        }
        line
    }

    /// Reflect a snapshot in the spinner
    pub fn render(&mut self, snapshot: &SessionSnapshot) {
        match Self::format_live(snapshot) {
            Some(text) => self.update_spinner(&text),
            None => self.stop_spinner(),
        }
    }

    /// Print the session status line
    pub fn status(&self, snapshot: &SessionSnapshot) {
        self.suspended(|| eprintln!("{} {}", "●".cyan(), Self::format_status(snapshot)));
    }

    /// Print the interactive command list
    pub fn help(&self, commands: &[(&str, &str)]) {
        self.suspended(|| {
            eprintln!("{}", "Commands:".bold());
            for (name, description) in commands {
                eprintln!("  {:<12} {}", name.cyan(), description);
            }
        });
    }
}

impl Default for Presenter {
    fn default() -> Self {
        Self::new()
    }
}

fn human_size(bytes: usize) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    let bytes = bytes as f64;
    if bytes >= MB {
        format!("{:.1} MB", bytes / MB)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes / KB)
    } else {
        format!("{} B", bytes)
    }
}
