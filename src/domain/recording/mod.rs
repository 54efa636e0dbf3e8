//! Recording domain: states, elapsed time, artifact and the session entity

mod artifact;
mod elapsed;
mod session;
mod state;

pub use artifact::{AudioArtifact, AudioMimeType};
pub use elapsed::ElapsedTime;
pub use session::{InvalidStateTransition, RecordingSession};
pub use state::RecordingState;
