//! Audio artifact value object

use std::fmt;

use super::ElapsedTime;

/// Audio MIME types a capture stream can report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AudioMimeType {
    Webm,
    Ogg,
    Wav,
    /// Raw signed 16-bit little-endian PCM
    L16 { rate: u32, channels: u16 },
}

impl AudioMimeType {
    /// Get the MIME essence without parameters
    pub const fn essence(&self) -> &'static str {
        match self {
            Self::Webm => "audio/webm",
            Self::Ogg => "audio/ogg",
            Self::Wav => "audio/wav",
            Self::L16 { .. } => "audio/L16",
        }
    }

    /// Get the file extension
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Webm => "webm",
            Self::Ogg => "ogg",
            Self::Wav => "wav",
            Self::L16 { .. } => "pcm",
        }
    }
}

impl fmt::Display for AudioMimeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::L16 { rate, channels } => {
                write!(f, "{};rate={};channels={}", self.essence(), rate, channels)
            }
            _ => write!(f, "{}", self.essence()),
        }
    }
}

impl Default for AudioMimeType {
    fn default() -> Self {
        Self::Webm
    }
}

/// The finished, playable recording.
///
/// Produced once by finalize from the ordered chunk buffer and never mutated
/// afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioArtifact {
    data: Vec<u8>,
    mime_type: AudioMimeType,
    duration: ElapsedTime,
}

impl AudioArtifact {
    /// Create an artifact from raw bytes
    pub fn new(data: Vec<u8>, mime_type: AudioMimeType, duration: ElapsedTime) -> Self {
        Self {
            data,
            mime_type,
            duration,
        }
    }

    /// Concatenate captured chunks in order
    pub fn from_chunks<I>(chunks: I, mime_type: AudioMimeType, duration: ElapsedTime) -> Self
    where
        I: IntoIterator<Item = Vec<u8>>,
    {
        let data = chunks.into_iter().flatten().collect();
        Self::new(data, mime_type, duration)
    }

    /// Get the raw audio data
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Get the MIME type
    pub fn mime_type(&self) -> AudioMimeType {
        self.mime_type
    }

    /// Elapsed time recorded when the artifact was produced
    pub fn duration(&self) -> ElapsedTime {
        self.duration
    }

    /// Get the size in bytes
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Check if the artifact holds no audio
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Human-readable size (e.g. "1.5 MB")
    pub fn human_readable_size(&self) -> String {
        let bytes = self.size() as f64;
        if bytes < 1024.0 {
            format!("{} B", self.size())
        } else if bytes < 1024.0 * 1024.0 {
            format!("{:.1} KB", bytes / 1024.0)
        } else {
            format!("{:.1} MB", bytes / (1024.0 * 1024.0))
        }
    }
}
