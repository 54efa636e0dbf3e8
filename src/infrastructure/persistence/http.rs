//! HTTP artifact store adapter

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use tracing::debug;

use crate::application::ports::{ArtifactStore, SaveError, SaveReceipt};
use crate::domain::recording::AudioArtifact;

/// Header carrying the recording length in whole seconds
pub const DURATION_HEADER: &str = "X-Recording-Duration";

/// Request timeout for uploads
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct SaveResponse {
    id: Option<serde_json::Value>,
}

/// Uploads recordings to an HTTP endpoint
pub struct HttpArtifactStore {
    endpoint: String,
    token: Option<String>,
    client: reqwest::Client,
}

impl HttpArtifactStore {
    /// Create a store posting to `endpoint`
    pub fn new(endpoint: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            endpoint: endpoint.into(),
            token: None,
            client,
        }
    }

    /// Attach a bearer token to every upload
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    /// Endpoint URL
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn classify_transport(error: reqwest::Error) -> SaveError {
        if error.is_builder() {
            SaveError::Other(error.to_string())
        } else {
            SaveError::Network(error.to_string())
        }
    }

    /// Pull an identifier out of a success body, if there is one
    fn parse_receipt(body: &str) -> SaveReceipt {
        let id = serde_json::from_str::<SaveResponse>(body)
            .ok()
            .and_then(|response| response.id)
            .and_then(|id| match id {
                serde_json::Value::String(s) => Some(s),
                serde_json::Value::Number(n) => Some(n.to_string()),
                _ => None,
            });
        SaveReceipt { id }
    }
}

#[async_trait]
impl ArtifactStore for HttpArtifactStore {
    async fn persist(&self, artifact: &AudioArtifact) -> Result<SaveReceipt, SaveError> {
        let mut request = self
            .client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, artifact.mime_type().to_string())
            .header(DURATION_HEADER, artifact.duration().as_secs().to_string())
            .body(artifact.data().to_vec());

        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        debug!(endpoint = %self.endpoint, size = artifact.size(), "uploading recording");
        let response = request.send().await.map_err(Self::classify_transport)?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(SaveError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text().await.unwrap_or_default();
        Ok(Self::parse_receipt(&body))
    }
}
