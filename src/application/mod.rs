//! Application layer - Controller and port interfaces
//!
//! Contains the recording controller that drives the session state
//! machine, and the trait definitions for external system interactions.

pub mod controller;
pub mod ports;
pub mod ticker;

pub use controller::{
    ControllerConfig, ControllerError, RecordingController, SaveOutcome, SessionSnapshot,
    CAPTURE_ERROR_KEY, SAVE_SUCCESS_MESSAGE, UPLOAD_ERROR_KEY,
};
pub use ticker::ElapsedTicker;
