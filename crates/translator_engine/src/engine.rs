use std::sync::Arc;

use crate::{
    ArtifactRetriever, CatalogSource, EventSource, ReqwestArtifactRetriever,
    ReqwestCatalogSource, ReqwestUploader, SseEventSource, TransportSettings, UploadTransport,
};

/// The transports a controller drives, as trait objects so tests can swap them.
#[derive(Clone)]
pub struct Transports {
    pub uploader: Arc<dyn UploadTransport>,
    pub events: Arc<dyn EventSource>,
    pub artifacts: Arc<dyn ArtifactRetriever>,
    pub catalog: Arc<dyn CatalogSource>,
}

impl Transports {
    /// HTTP transports against the backend at `settings.base_url()`.
    pub fn http(settings: TransportSettings) -> Self {
        Self {
            uploader: Arc::new(ReqwestUploader::new(settings.clone())),
            events: Arc::new(SseEventSource::new(settings.clone())),
            artifacts: Arc::new(ReqwestArtifactRetriever::new(settings.clone())),
            catalog: Arc::new(ReqwestCatalogSource::new(settings)),
        }
    }
}
