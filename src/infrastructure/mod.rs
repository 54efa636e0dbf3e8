//! Infrastructure layer - Adapter implementations
//!
//! Contains concrete implementations of the port interfaces,
//! integrating with external systems like the audio host, HTTP
//! endpoints, the filesystem and the desktop notification service.

pub mod capture;
pub mod config;
pub mod notification;
pub mod persistence;

// Re-export adapters
pub use capture::{create_capture_device, CpalCaptureDevice};
pub use config::XdgConfigStore;
pub use notification::{create_notifier, NotifyRustNotifier, TerminalNotifier};
pub use persistence::{create_artifact_store, HttpArtifactStore, LocalArtifactStore};
