//! Configuration domain

mod app_config;

pub use app_config::{AppConfig, AudioConfig, DEFAULT_TIMESLICE_MS};
