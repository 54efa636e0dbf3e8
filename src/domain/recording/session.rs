//! Recording session state machine

use std::mem;
use std::sync::Arc;

use thiserror::Error;

use super::{AudioArtifact, AudioMimeType, ElapsedTime, RecordingState};

/// Error when an invalid state transition is attempted
#[derive(Debug, Clone, Error)]
#[error("Invalid state transition: cannot {action} while in {current_state} state")]
pub struct InvalidStateTransition {
    pub current_state: RecordingState,
    pub action: String,
}

/// Recording session entity.
/// Owns the state, the elapsed counter, the chunk buffer and the artifact.
///
/// State machine:
///   IDLE | ERROR | STOPPED -> REQUESTING_PERMISSION (begin_capture)
///   REQUESTING_PERMISSION -> RECORDING (access_granted)
///   REQUESTING_PERMISSION -> ERROR (access_failed)
///   RECORDING <-> PAUSED (pause / resume)
///   RECORDING | PAUSED -> STOPPED (finalize)
///   RECORDING | PAUSED -> STOPPED | ERROR (capture_interrupted)
///   IDLE | ERROR -> IDLE (reset_idle)
///   STOPPED -> UPLOADING (begin_upload)
///   UPLOADING -> IDLE (upload_succeeded)
///   UPLOADING -> STOPPED (upload_failed)
///
/// Device resources are not held here; the controller owns them and holds
/// a device stream only while the state is capturing.
#[derive(Debug, Default)]
pub struct RecordingSession {
    state: RecordingState,
    elapsed: ElapsedTime,
    artifact: Option<Arc<AudioArtifact>>,
    last_error: Option<String>,
    chunks: Vec<Vec<u8>>,
}

impl RecordingSession {
    /// Create a new session in idle state
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the current state
    pub fn state(&self) -> RecordingState {
        self.state
    }

    /// Get the elapsed recording time
    pub fn elapsed(&self) -> ElapsedTime {
        self.elapsed
    }

    /// Get the finished artifact, if any
    pub fn artifact(&self) -> Option<&Arc<AudioArtifact>> {
        self.artifact.as_ref()
    }

    /// Get the current error message, if any
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Number of chunks buffered and not yet finalized
    pub fn pending_chunks(&self) -> usize {
        self.chunks.len()
    }

    fn reject(&self, action: &str) -> InvalidStateTransition {
        InvalidStateTransition {
            current_state: self.state,
            action: action.to_string(),
        }
    }

    /// Transition into REQUESTING_PERMISSION, discarding any previous result
    pub fn begin_capture(&mut self) -> Result<(), InvalidStateTransition> {
        if !self.state.can_start() {
            return Err(self.reject("start recording"));
        }
        self.last_error = None;
        self.artifact = None;
        self.elapsed = ElapsedTime::ZERO;
        self.chunks.clear();
        self.state = RecordingState::RequestingPermission;
        Ok(())
    }

    /// Transition from REQUESTING_PERMISSION to RECORDING
    pub fn access_granted(&mut self) -> Result<(), InvalidStateTransition> {
        if self.state != RecordingState::RequestingPermission {
            return Err(self.reject("begin capture"));
        }
        self.state = RecordingState::Recording;
        Ok(())
    }

    /// Transition from REQUESTING_PERMISSION to ERROR
    pub fn access_failed(&mut self, message: impl Into<String>) -> Result<(), InvalidStateTransition> {
        if self.state != RecordingState::RequestingPermission {
            return Err(self.reject("fail device access"));
        }
        self.last_error = Some(message.into());
        self.state = RecordingState::Error;
        Ok(())
    }

    /// Append a captured chunk. Empty chunks and chunks arriving outside
    /// capture are dropped; returns whether the chunk was kept.
    pub fn append_chunk(&mut self, chunk: Vec<u8>) -> bool {
        if chunk.is_empty() || !self.state.is_capturing() {
            return false;
        }
        self.chunks.push(chunk);
        true
    }

    /// Transition from RECORDING to PAUSED
    pub fn pause(&mut self) -> Result<(), InvalidStateTransition> {
        if self.state != RecordingState::Recording {
            return Err(self.reject("pause recording"));
        }
        self.state = RecordingState::Paused;
        Ok(())
    }

    /// Transition from PAUSED to RECORDING
    pub fn resume(&mut self) -> Result<(), InvalidStateTransition> {
        if self.state != RecordingState::Paused {
            return Err(self.reject("resume recording"));
        }
        self.state = RecordingState::Recording;
        Ok(())
    }

    /// Count one elapsed second. Only counts while RECORDING.
    pub fn tick(&mut self) -> bool {
        if self.state != RecordingState::Recording {
            return false;
        }
        self.elapsed = self.elapsed.incremented();
        true
    }

    /// Concatenate the buffered chunks into the artifact and move to STOPPED.
    /// The chunk buffer is empty afterwards.
    pub fn finalize(
        &mut self,
        mime_type: AudioMimeType,
    ) -> Result<Arc<AudioArtifact>, InvalidStateTransition> {
        if !self.state.is_capturing() {
            return Err(self.reject("finalize recording"));
        }
        let chunks = mem::take(&mut self.chunks);
        let artifact = Arc::new(AudioArtifact::from_chunks(chunks, mime_type, self.elapsed));
        self.artifact = Some(Arc::clone(&artifact));
        self.state = RecordingState::Stopped;
        Ok(artifact)
    }

    /// The device failed mid-capture. Audio captured so far is kept as a
    /// STOPPED artifact; with nothing captured the session moves to ERROR.
    /// Either way the message is recorded.
    pub fn capture_interrupted(
        &mut self,
        message: impl Into<String>,
        mime_type: AudioMimeType,
    ) -> Result<Option<Arc<AudioArtifact>>, InvalidStateTransition> {
        if !self.state.is_capturing() {
            return Err(self.reject("interrupt recording"));
        }
        self.last_error = Some(message.into());
        if self.chunks.is_empty() {
            self.state = RecordingState::Error;
            return Ok(None);
        }
        self.finalize(mime_type).map(Some)
    }

    /// Stop requested with nothing captured: back to a clean IDLE
    pub fn reset_idle(&mut self) -> Result<(), InvalidStateTransition> {
        if !matches!(self.state, RecordingState::Idle | RecordingState::Error) {
            return Err(self.reject("reset"));
        }
        self.last_error = None;
        self.artifact = None;
        self.elapsed = ElapsedTime::ZERO;
        self.chunks.clear();
        self.state = RecordingState::Idle;
        Ok(())
    }

    /// Transition from STOPPED to UPLOADING.
    /// Returns `Ok(None)` without changing anything when there is no artifact.
    pub fn begin_upload(&mut self) -> Result<Option<Arc<AudioArtifact>>, InvalidStateTransition> {
        if self.state != RecordingState::Stopped {
            return Err(self.reject("save recording"));
        }
        let Some(artifact) = self.artifact.clone() else {
            return Ok(None);
        };
        self.last_error = None;
        self.state = RecordingState::Uploading;
        Ok(Some(artifact))
    }

    /// Transition from UPLOADING to IDLE
    pub fn upload_succeeded(&mut self) -> Result<(), InvalidStateTransition> {
        if self.state != RecordingState::Uploading {
            return Err(self.reject("complete upload"));
        }
        self.artifact = None;
        self.elapsed = ElapsedTime::ZERO;
        self.state = RecordingState::Idle;
        Ok(())
    }

    /// Transition from UPLOADING back to STOPPED, keeping the artifact for retry
    pub fn upload_failed(&mut self, message: impl Into<String>) -> Result<(), InvalidStateTransition> {
        if self.state != RecordingState::Uploading {
            return Err(self.reject("fail upload"));
        }
        self.last_error = Some(message.into());
        self.state = RecordingState::Stopped;
        Ok(())
    }
}
