//! Port interfaces (traits) for external systems
//!
//! These traits define the boundaries between the application
//! and infrastructure layers.

pub mod capture;
pub mod config;
pub mod notifier;
pub mod persistence;

// Re-export common types
pub use capture::{
    AcquisitionError, CaptureConstraints, CaptureDevice, CaptureEvent, CaptureEventSender,
    CaptureStream,
};
pub use config::ConfigStore;
pub use notifier::{NotificationError, NotificationLevel, Notifier};
pub use persistence::{ArtifactStore, SaveError, SaveReceipt};
