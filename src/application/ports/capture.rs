//! Capture device port interfaces

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::domain::recording::AudioMimeType;

/// Device acquisition and capture errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AcquisitionError {
    #[error("Microphone access denied: {0}")]
    PermissionDenied(String),

    #[error("No audio input device available")]
    DeviceNotFound,

    #[error("Failed to open audio input: {0}")]
    Unavailable(String),

    #[error("Audio capture interrupted: {0}")]
    Interrupted(String),
}

impl AcquisitionError {
    /// User-facing message for the failure category
    pub const fn user_message(&self) -> &'static str {
        match self {
            Self::PermissionDenied(_) => {
                "Microphone permission denied. Please allow access in your system settings."
            }
            Self::DeviceNotFound => {
                "No microphone found. Please ensure a microphone is connected and enabled."
            }
            Self::Unavailable(_) => "Could not access microphone.",
            Self::Interrupted(_) => {
                "Recording interrupted. The microphone stopped delivering audio."
            }
        }
    }
}

/// Events emitted by a started capture stream, in capture order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureEvent {
    /// A fragment of encoded audio
    DataAvailable(Vec<u8>),
    /// Emitted once after `stop`, following the last data fragment
    Finalized,
    /// The device failed mid-capture; no further events follow
    Failed(AcquisitionError),
}

/// Sending half handed to a stream on `start`
pub type CaptureEventSender = mpsc::UnboundedSender<CaptureEvent>;

/// Requested capture parameters. `None` leaves the choice to the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureConstraints {
    pub sample_rate: Option<u32>,
    pub channels: Option<u16>,
    /// How often buffered audio is emitted as a chunk
    pub timeslice: Duration,
}

impl Default for CaptureConstraints {
    fn default() -> Self {
        Self {
            sample_rate: None,
            channels: Some(1),
            timeslice: Duration::from_millis(250),
        }
    }
}

/// Port for acquiring an audio input device
#[async_trait]
pub trait CaptureDevice: Send + Sync {
    /// Request access to an input device.
    ///
    /// # Returns
    /// A live stream holding the device, not yet capturing
    async fn request_access(
        &self,
        constraints: &CaptureConstraints,
    ) -> Result<Box<dyn CaptureStream>, AcquisitionError>;
}

/// A live device stream together with its capture session.
///
/// The controller is the only owner. `stop_tracks` must be idempotent.
/// Closing the event channel without [`CaptureEvent::Finalized`] is
/// treated as a capture failure.
#[async_trait]
pub trait CaptureStream: Send {
    /// MIME type of the emitted fragments
    fn mime_type(&self) -> AudioMimeType;

    /// Begin capturing, emitting fragments on `events`.
    /// Resolves once the device is actually delivering audio.
    async fn start(&mut self, events: CaptureEventSender) -> Result<(), AcquisitionError>;

    /// Pause the capture session
    fn pause(&mut self);

    /// Resume a paused capture session
    fn resume(&mut self);

    /// Stop the capture session: flush remaining fragments, then emit
    /// [`CaptureEvent::Finalized`]
    fn stop(&mut self);

    /// Stop every device track, releasing the input device
    fn stop_tracks(&mut self);
}

/// Blanket implementation for boxed device types
#[async_trait]
impl CaptureDevice for Box<dyn CaptureDevice> {
    async fn request_access(
        &self,
        constraints: &CaptureConstraints,
    ) -> Result<Box<dyn CaptureStream>, AcquisitionError> {
        self.as_ref().request_access(constraints).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquisition_messages_are_distinct() {
        let denied = AcquisitionError::PermissionDenied("user said no".into());
        let missing = AcquisitionError::DeviceNotFound;
        let other = AcquisitionError::Unavailable("busy".into());

        assert!(denied.user_message().contains("permission denied"));
        assert!(missing.user_message().contains("No microphone found"));
        assert_eq!(other.user_message(), "Could not access microphone.");

        let interrupted = AcquisitionError::Interrupted("device unplugged".into());
        assert!(interrupted.user_message().starts_with("Recording interrupted"));
        assert_ne!(interrupted.user_message(), other.user_message());
    }

    #[test]
    fn default_constraints_request_mono() {
        let constraints = CaptureConstraints::default();
        assert_eq!(constraints.channels, Some(1));
        assert!(constraints.sample_rate.is_none());
        assert_eq!(constraints.timeslice, Duration::from_millis(250));
    }
}
