use std::time::Duration;

use thiserror::Error;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "http://localhost:5000/";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettingsError {
    #[error("invalid base url {url}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}

#[derive(Debug, Clone)]
pub struct TransportSettings {
    base_url: Url,
    pub connect_timeout: Duration,
    /// Applies to upload, download and catalog requests; never to the progress channel.
    pub request_timeout: Duration,
    pub upload_chunk_size: usize,
    /// Substrings one of which the artifact `content-type` must contain.
    pub artifact_content_markers: Vec<String>,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            base_url: Url::parse(DEFAULT_BASE_URL).expect("default base url"),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(120),
            upload_chunk_size: 64 * 1024,
            artifact_content_markers: vec![
                "spreadsheetml".to_string(),
                "application/vnd.ms-excel".to_string(),
            ],
        }
    }
}

impl TransportSettings {
    pub fn with_base_url(mut self, base_url: &str) -> Result<Self, SettingsError> {
        let invalid = |reason: String| SettingsError::InvalidBaseUrl {
            url: base_url.to_string(),
            reason,
        };
        let url = Url::parse(base_url).map_err(|err| invalid(err.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid(format!("unsupported scheme {}", url.scheme())));
        }
        if url.cannot_be_a_base() {
            return Err(invalid("url cannot carry a path".to_string()));
        }
        self.base_url = url;
        Ok(self)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Appends percent-encoded path segments to the base url.
    pub fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        url.set_query(None);
        url.set_fragment(None);
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    pub fn is_spreadsheet_content_type(&self, content_type: &str) -> bool {
        let lower = content_type.to_ascii_lowercase();
        self.artifact_content_markers
            .iter()
            .any(|marker| lower.contains(&marker.to_ascii_lowercase()))
    }
}
