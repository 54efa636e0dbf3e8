//! Local filesystem artifact store adapter

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::debug;

use crate::application::ports::{ArtifactStore, SaveError, SaveReceipt};
use crate::domain::recording::AudioArtifact;

/// Metadata written next to each stored recording
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecordingMetadata {
    pub mime_type: String,
    pub duration_secs: u64,
    pub size: usize,
    pub created_at: DateTime<Utc>,
}

/// Stores recordings as files in a directory
pub struct LocalArtifactStore {
    dir: PathBuf,
}

impl LocalArtifactStore {
    /// Create a store writing into `dir`; the directory is created on demand
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Target directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn file_stem(created_at: &DateTime<Utc>) -> String {
        format!("recording-{}", created_at.format("%Y%m%d-%H%M%S-%3f"))
    }

    async fn write(path: &Path, contents: &[u8]) -> Result<(), SaveError> {
        fs::write(path, contents)
            .await
            .map_err(|e| SaveError::Other(format!("{}: {}", path.display(), e)))
    }
}

#[async_trait]
impl ArtifactStore for LocalArtifactStore {
    async fn persist(&self, artifact: &AudioArtifact) -> Result<SaveReceipt, SaveError> {
        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| SaveError::Other(format!("{}: {}", self.dir.display(), e)))?;

        let created_at = Utc::now();
        let stem = Self::file_stem(&created_at);
        let audio_path = self
            .dir
            .join(format!("{}.{}", stem, artifact.mime_type().extension()));
        let metadata_path = self.dir.join(format!("{}.json", stem));

        let metadata = RecordingMetadata {
            mime_type: artifact.mime_type().to_string(),
            duration_secs: artifact.duration().as_secs(),
            size: artifact.size(),
            created_at,
        };
        let metadata = serde_json::to_vec_pretty(&metadata)
            .map_err(|e| SaveError::Other(e.to_string()))?;

        Self::write(&audio_path, artifact.data()).await?;
        Self::write(&metadata_path, &metadata).await?;

        debug!(path = %audio_path.display(), "recording written");
        Ok(SaveReceipt {
            id: Some(audio_path.to_string_lossy().to_string()),
        })
    }
}
