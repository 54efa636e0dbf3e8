//! Persistence infrastructure module
//!
//! Recordings are uploaded over HTTP when an endpoint is configured and
//! written to a local directory otherwise.

mod http;
mod local;

pub use http::{HttpArtifactStore, DURATION_HEADER};
pub use local::{LocalArtifactStore, RecordingMetadata};

use crate::application::ports::ArtifactStore;
use crate::domain::config::AppConfig;

/// Create the artifact store selected by the configuration
pub fn create_artifact_store(config: &AppConfig) -> Box<dyn ArtifactStore> {
    match config.endpoint() {
        Some(endpoint) => {
            Box::new(HttpArtifactStore::new(endpoint).with_token(config.token().map(str::to_owned)))
        }
        None => Box::new(LocalArtifactStore::new(config.output_dir_or_default())),
    }
}
