//! Persistence port interface

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::recording::AudioArtifact;

/// Save errors
#[derive(Debug, Clone, Error)]
pub enum SaveError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Server rejected recording (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Failed to save recording: {0}")]
    Other(String),
}

impl SaveError {
    /// Whether the failure is network-classified
    pub const fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }

    /// User-facing message for the failure category
    pub const fn user_message(&self) -> &'static str {
        if self.is_network() {
            "Network error saving recording. Please try again."
        } else {
            "Failed to save recording. Please try again."
        }
    }
}

/// What the persistence endpoint reported back
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveReceipt {
    /// Identifier or location assigned by the store, if any
    pub id: Option<String>,
}

/// Port for persisting finished recordings
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Persist one finished artifact.
    ///
    /// # Arguments
    /// * `artifact` - The finalized recording
    ///
    /// # Returns
    /// A receipt on success, or a classified failure
    async fn persist(&self, artifact: &AudioArtifact) -> Result<SaveReceipt, SaveError>;
}

/// Blanket implementation for boxed store types
#[async_trait]
impl ArtifactStore for Box<dyn ArtifactStore> {
    async fn persist(&self, artifact: &AudioArtifact) -> Result<SaveReceipt, SaveError> {
        self.as_ref().persist(artifact).await
    }
}
