//! Recording states

use std::fmt;

/// Recording session states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RecordingState {
    #[default]
    Idle,
    RequestingPermission,
    Recording,
    Paused,
    Stopped,
    Uploading,
    Error,
}

impl RecordingState {
    /// Get the string representation
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::RequestingPermission => "requesting-permission",
            Self::Recording => "recording",
            Self::Paused => "paused",
            Self::Stopped => "stopped",
            Self::Uploading => "uploading",
            Self::Error => "error",
        }
    }

    /// States that accept chunk data from the device
    pub const fn is_capturing(&self) -> bool {
        matches!(self, Self::Recording | Self::Paused)
    }

    /// States from which a new recording may be started
    pub const fn can_start(&self) -> bool {
        matches!(self, Self::Idle | Self::Error | Self::Stopped)
    }
}

impl fmt::Display for RecordingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
