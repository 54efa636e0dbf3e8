//! Application configuration value object

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default chunk cadence in milliseconds
pub const DEFAULT_TIMESLICE_MS: u64 = 250;

/// Audio capture configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioConfig {
    pub sample_rate: Option<u32>,
    pub channels: Option<u16>,
    pub timeslice_ms: Option<u64>,
}

/// Application configuration.
/// All fields are optional to support partial configs and merging.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub endpoint: Option<String>,
    pub token: Option<String>,
    pub output_dir: Option<String>,
    pub notify: Option<bool>,
    pub audio: Option<AudioConfig>,
}

impl AppConfig {
    /// Create config with default values
    pub fn defaults() -> Self {
        Self {
            endpoint: None,
            token: None,
            output_dir: None,
            notify: Some(false),
            audio: Some(AudioConfig {
                sample_rate: None,
                channels: Some(1),
                timeslice_ms: Some(DEFAULT_TIMESLICE_MS),
            }),
        }
    }

    /// Create an empty config (all None)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Merge this config with another, where other takes precedence.
    /// Only non-None values from other will override this.
    pub fn merge(self, other: Self) -> Self {
        Self {
            endpoint: other.endpoint.or(self.endpoint),
            token: other.token.or(self.token),
            output_dir: other.output_dir.or(self.output_dir),
            notify: other.notify.or(self.notify),
            audio: Self::merge_audio_config(self.audio, other.audio),
        }
    }

    /// Merge audio config sections
    fn merge_audio_config(
        base: Option<AudioConfig>,
        other: Option<AudioConfig>,
    ) -> Option<AudioConfig> {
        match (base, other) {
            (None, None) => None,
            (Some(b), None) => Some(b),
            (None, Some(o)) => Some(o),
            (Some(b), Some(o)) => Some(AudioConfig {
                sample_rate: o.sample_rate.or(b.sample_rate),
                channels: o.channels.or(b.channels),
                timeslice_ms: o.timeslice_ms.or(b.timeslice_ms),
            }),
        }
    }

    /// Get the persistence endpoint, ignoring blank values
    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref().filter(|s| !s.trim().is_empty())
    }

    /// Get the bearer token, ignoring blank values
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref().filter(|s| !s.trim().is_empty())
    }

    /// Get the local recordings directory, or the XDG data default
    pub fn output_dir_or_default(&self) -> PathBuf {
        match self.output_dir.as_deref() {
            Some(dir) if !dir.trim().is_empty() => PathBuf::from(dir),
            _ => dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("~/.local/share"))
                .join("recordify")
                .join("recordings"),
        }
    }

    /// Get notify setting, or false if not set
    pub fn notify_or_default(&self) -> bool {
        self.notify.unwrap_or(false)
    }

    /// Preferred sample rate, if pinned
    pub fn sample_rate(&self) -> Option<u32> {
        self.audio.as_ref().and_then(|a| a.sample_rate)
    }

    /// Preferred channel count, if pinned
    pub fn channels(&self) -> Option<u16> {
        self.audio.as_ref().and_then(|a| a.channels)
    }

    /// Chunk cadence, or 250ms if not set or zero
    pub fn timeslice_or_default(&self) -> Duration {
        let ms = self
            .audio
            .as_ref()
            .and_then(|a| a.timeslice_ms)
            .filter(|ms| *ms > 0)
            .unwrap_or(DEFAULT_TIMESLICE_MS);
        Duration::from_millis(ms)
    }
}
