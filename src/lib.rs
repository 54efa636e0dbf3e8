//! Recordify - voice memo recorder
//!
//! This crate captures audio from the microphone with pause/resume, turns
//! the captured fragments into a single playable artifact when the user
//! stops, and saves it to an HTTP endpoint or a local directory. Failed
//! saves keep the artifact so they can be retried.
//!
//! # Architecture
//!
//! The crate follows hexagonal (ports & adapters) architecture:
//!
//! - **Domain**: Recording session state machine, value objects, config
//! - **Application**: Recording controller, elapsed ticker, port interfaces (traits)
//! - **Infrastructure**: Adapter implementations (cpal, HTTP, filesystem, notifications)
//! - **CLI**: Command-line interface, argument parsing, and signal handling

pub mod application;
pub mod cli;
pub mod domain;
pub mod infrastructure;
