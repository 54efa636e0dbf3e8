//! Notification infrastructure module
//!
//! Desktop notifications through notify-rust, or plain terminal output.

mod notify_rust;
mod terminal;

pub use notify_rust::NotifyRustNotifier;
pub use terminal::TerminalNotifier;

use crate::application::ports::Notifier;

/// Create the notifier for the current session
///
/// Desktop notifications when `desktop` is set, terminal output otherwise.
pub fn create_notifier(desktop: bool) -> Box<dyn Notifier> {
    if desktop {
        Box::new(NotifyRustNotifier::new())
    } else {
        Box::new(TerminalNotifier::new())
    }
}
