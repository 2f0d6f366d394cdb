use thiserror::Error;
use translator_core::{Generation, ProgressEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadProgress {
    pub bytes_sent: u64,
    pub bytes_total: u64,
}

/// Asynchronous transport outcome, tagged with the generation it was started under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    UploadProgress {
        generation: Generation,
        progress: UploadProgress,
    },
    UploadFinished {
        generation: Generation,
        result: Result<String, TransportError>,
    },
    Stream {
        generation: Generation,
        event: ProgressEvent,
    },
    StreamFailed {
        generation: Generation,
        error: StreamError,
    },
}

impl EngineEvent {
    pub fn generation(&self) -> Generation {
        match self {
            EngineEvent::UploadProgress { generation, .. }
            | EngineEvent::UploadFinished { generation, .. }
            | EngineEvent::Stream { generation, .. }
            | EngineEvent::StreamFailed { generation, .. } => *generation,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("network error: {0}")]
    Network(String),
    #[error("server error {status}: {message}")]
    Server { status: u16, message: String },
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl TransportError {
    /// Text shown to the user; server errors carry the backend's own message.
    pub fn detail(&self) -> String {
        match self {
            TransportError::Server { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StreamError {
    #[error("malformed progress message: {0}")]
    Malformed(String),
    #[error("connection lost")]
    ConnectionLost,
    #[error("progress channel error: {0}")]
    Transport(String),
    #[error("progress channel rejected ({status}): {message}")]
    Server { status: u16, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RetrieveError {
    #[error("no artifact to download")]
    EmptyReference,
    #[error("invalid file format received (content type {content_type:?})")]
    InvalidArtifact { content_type: Option<String> },
    #[error("network error: {0}")]
    Network(String),
    #[error("download failed ({status}): {message}")]
    Server { status: u16, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("network error: {0}")]
    Network(String),
    #[error("server error {status}: {message}")]
    Server { status: u16, message: String },
    #[error("malformed provider list: {0}")]
    Malformed(String),
}
