//! Translator engine: HTTP transports for upload, progress streaming and retrieval.
mod artifact;
mod catalog;
mod engine;
mod filename;
mod http;
mod parse;
mod persist;
mod settings;
mod sink;
mod sse;
mod subscription;
mod types;
mod upload;

pub use artifact::{Artifact, ArtifactRetriever, ReqwestArtifactRetriever};
pub use catalog::{CatalogSource, ReqwestCatalogSource};
pub use engine::Transports;
pub use filename::{safe_filename, spreadsheet_mime_type};
pub use parse::parse_progress_message;
pub use persist::{ensure_output_dir, save_artifact, AtomicFileWriter, PersistError};
pub use settings::{SettingsError, TransportSettings, DEFAULT_BASE_URL};
pub use sink::{ChannelEventSink, EventSink};
pub use sse::{SseDecoder, MAX_SSE_LINE_BYTES};
pub use subscription::{EventSource, MessageStream, ProgressSubscription, SseEventSource};
pub use types::{
    CatalogError, EngineEvent, RetrieveError, StreamError, TransportError, UploadProgress,
};
pub use upload::{start_upload, ReqwestUploader, UploadHandle, UploadProgressSink, UploadTransport};
