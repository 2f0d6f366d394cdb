use reqwest::header::CONTENT_TYPE;
use sha2::{Digest, Sha256};
use translator_logging::{engine_info, engine_warn};

use crate::filename::safe_filename;
use crate::http::{build_client, describe_reqwest_error, error_parts};
use crate::{RetrieveError, TransportSettings};

/// A downloaded translation, ready for local delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub reference: String,
    /// Sanitized name suggested for saving.
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
    /// Lowercase hex SHA-256 of `bytes`.
    pub sha256: String,
}

#[async_trait::async_trait]
pub trait ArtifactRetriever: Send + Sync {
    async fn fetch(&self, artifact_ref: &str) -> Result<Artifact, RetrieveError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestArtifactRetriever {
    settings: TransportSettings,
}

impl ReqwestArtifactRetriever {
    pub fn new(settings: TransportSettings) -> Self {
        Self { settings }
    }
}

#[async_trait::async_trait]
impl ArtifactRetriever for ReqwestArtifactRetriever {
    async fn fetch(&self, artifact_ref: &str) -> Result<Artifact, RetrieveError> {
        if artifact_ref.trim().is_empty() {
            return Err(RetrieveError::EmptyReference);
        }
        let client = build_client(&self.settings, true)
            .map_err(|err| RetrieveError::Network(err.to_string()))?;

        let response = client
            .get(self.settings.endpoint(&["download", artifact_ref]))
            .send()
            .await
            .map_err(|err| RetrieveError::Network(describe_reqwest_error(&err)))?;

        if !response.status().is_success() {
            let (status, message) = error_parts(response).await;
            return Err(RetrieveError::Server { status, message });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());
        let content_type = match content_type {
            Some(ct) if self.settings.is_spreadsheet_content_type(&ct) => ct,
            other => {
                engine_warn!(
                    "Rejected artifact {} with content type {:?}",
                    artifact_ref,
                    other
                );
                return Err(RetrieveError::InvalidArtifact {
                    content_type: other,
                });
            }
        };

        let bytes = response
            .bytes()
            .await
            .map_err(|err| RetrieveError::Network(describe_reqwest_error(&err)))?
            .to_vec();
        let sha256 = hex_digest(&bytes);
        engine_info!(
            "Artifact fetched ref={} bytes={} sha256={}",
            artifact_ref,
            bytes.len(),
            sha256
        );

        Ok(Artifact {
            reference: artifact_ref.to_string(),
            filename: safe_filename(artifact_ref),
            content_type,
            bytes,
            sha256,
        })
    }
}

fn hex_digest(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut hex = String::with_capacity(digest.len() * 2);
    for byte in digest.iter() {
        use std::fmt::Write;
        let _ = write!(&mut hex, "{byte:02x}");
    }
    hex
}
