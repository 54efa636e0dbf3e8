//! Elapsed recording time value object

use std::fmt;

/// Whole seconds of captured audio, as counted by the elapsed-time ticker.
///
/// Displays as `MM:SS`, zero-padded, with minutes uncapped (`125:03`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ElapsedTime {
    seconds: u64,
}

impl ElapsedTime {
    /// Zero elapsed time
    pub const ZERO: Self = Self { seconds: 0 };

    /// Create from whole seconds
    pub const fn from_secs(seconds: u64) -> Self {
        Self { seconds }
    }

    /// Get whole seconds
    pub const fn as_secs(&self) -> u64 {
        self.seconds
    }

    /// Minutes component (uncapped)
    pub const fn minutes(&self) -> u64 {
        self.seconds / 60
    }

    /// Seconds component (0-59)
    pub const fn seconds_part(&self) -> u64 {
        self.seconds % 60
    }

    /// One more second
    #[must_use]
    pub const fn incremented(self) -> Self {
        Self {
            seconds: self.seconds.saturating_add(1),
        }
    }
}

impl fmt::Display for ElapsedTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.minutes(), self.seconds_part())
    }
}
