//! Capture infrastructure module
//!
//! Provides microphone access through cpal.

mod cpal_capture;

pub use cpal_capture::CpalCaptureDevice;

use crate::application::ports::CaptureDevice;

/// Create the default capture device for the current platform
pub fn create_capture_device() -> Box<dyn CaptureDevice> {
    Box::new(CpalCaptureDevice::new())
}
