use std::sync::Arc;

use bytes::Bytes;
use futures_util::{stream, StreamExt};
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use translator_core::{Generation, SourceFile, SubmitParams};
use translator_logging::{engine_info, engine_warn};

use crate::filename::spreadsheet_mime_type;
use crate::http::{build_client, describe_reqwest_error, error_parts};
use crate::sink::EventGate;
use crate::{EngineEvent, EventSink, TransportError, TransportSettings, UploadProgress};

pub trait UploadProgressSink: Send + Sync {
    fn report(&self, progress: UploadProgress);
}

#[async_trait::async_trait]
pub trait UploadTransport: Send + Sync {
    /// Submits the file and job parameters, resolving to the backend job id.
    async fn upload(
        &self,
        file: &SourceFile,
        params: &SubmitParams,
        progress: Arc<dyn UploadProgressSink>,
    ) -> Result<String, TransportError>;
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    translation_id: Option<String>,
}

/// Multipart `POST /translate` with the file streamed in fixed-size chunks.
#[derive(Debug, Clone)]
pub struct ReqwestUploader {
    settings: TransportSettings,
}

impl ReqwestUploader {
    pub fn new(settings: TransportSettings) -> Self {
        Self { settings }
    }

    fn file_part(
        &self,
        file: &SourceFile,
        progress: Arc<dyn UploadProgressSink>,
    ) -> Result<Part, TransportError> {
        let total = file.size();
        let data = Bytes::from_owner(file.shared_bytes());
        let chunk_size = self.settings.upload_chunk_size.max(1);
        let chunks: Vec<Bytes> = (0..data.len())
            .step_by(chunk_size)
            .map(|start| data.slice(start..(start + chunk_size).min(data.len())))
            .collect();

        progress.report(UploadProgress {
            bytes_sent: 0,
            bytes_total: total,
        });
        let mut sent = 0u64;
        let body = stream::iter(chunks).map(move |chunk| {
            sent += chunk.len() as u64;
            progress.report(UploadProgress {
                bytes_sent: sent,
                bytes_total: total,
            });
            Ok::<Bytes, std::io::Error>(chunk)
        });

        Part::stream_with_length(reqwest::Body::wrap_stream(body), total)
            .file_name(file.name().to_string())
            .mime_str(spreadsheet_mime_type(file.name()))
            .map_err(|err| TransportError::Network(err.to_string()))
    }
}

#[async_trait::async_trait]
impl UploadTransport for ReqwestUploader {
    async fn upload(
        &self,
        file: &SourceFile,
        params: &SubmitParams,
        progress: Arc<dyn UploadProgressSink>,
    ) -> Result<String, TransportError> {
        let client = build_client(&self.settings, true)
            .map_err(|err| TransportError::Network(err.to_string()))?;
        let form = Form::new()
            .text("target_language", params.target_language.clone())
            .text("provider", params.provider.clone())
            .text("model", params.model.clone())
            .part("file", self.file_part(file, progress)?);

        let response = client
            .post(self.settings.endpoint(&["translate"]))
            .multipart(form)
            .send()
            .await
            .map_err(|err| TransportError::Network(describe_reqwest_error(&err)))?;

        if !response.status().is_success() {
            let (status, message) = error_parts(response).await;
            return Err(TransportError::Server { status, message });
        }

        let body = response
            .bytes()
            .await
            .map_err(|err| TransportError::Network(describe_reqwest_error(&err)))?;
        let parsed: TranslateResponse = serde_json::from_slice(&body)
            .map_err(|err| TransportError::InvalidResponse(err.to_string()))?;
        parsed
            .translation_id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| TransportError::InvalidResponse("missing translation_id".to_string()))
    }
}

struct GatedUploadProgress {
    generation: Generation,
    gate: Arc<EventGate>,
}

impl UploadProgressSink for GatedUploadProgress {
    fn report(&self, progress: UploadProgress) {
        self.gate.emit(EngineEvent::UploadProgress {
            generation: self.generation,
            progress,
        });
    }
}

/// An upload in flight. Dropping the handle aborts it.
pub struct UploadHandle {
    generation: Generation,
    token: CancellationToken,
    gate: Arc<EventGate>,
    task: JoinHandle<()>,
}

impl UploadHandle {
    /// Cancels the request; no callback fires once this returns.
    pub fn abort(&self) {
        let was_open = !self.gate.is_closed();
        self.gate.close();
        self.token.cancel();
        self.task.abort();
        if was_open {
            engine_info!("Upload aborted generation={}", self.generation);
        }
    }
}

impl Drop for UploadHandle {
    fn drop(&mut self) {
        if !self.token.is_cancelled() {
            self.abort();
        }
    }
}

/// Spawns the upload on `runtime`, reporting through `sink` tagged with `generation`.
pub fn start_upload(
    runtime: &Handle,
    transport: Arc<dyn UploadTransport>,
    generation: Generation,
    file: SourceFile,
    params: SubmitParams,
    sink: Arc<dyn EventSink>,
) -> UploadHandle {
    let token = CancellationToken::new();
    let gate = Arc::new(EventGate::new(sink));
    let progress: Arc<dyn UploadProgressSink> = Arc::new(GatedUploadProgress {
        generation,
        gate: gate.clone(),
    });

    engine_info!(
        "Upload started generation={} file={} bytes={} provider={} model={} target={}",
        generation,
        file.name(),
        file.size(),
        params.provider,
        params.model,
        params.target_language
    );

    let task_token = token.clone();
    let task_gate = gate.clone();
    let task = runtime.spawn(async move {
        let result = tokio::select! {
            _ = task_token.cancelled() => return,
            result = transport.upload(&file, &params, progress) => result,
        };
        match &result {
            Ok(job_id) => engine_info!(
                "Upload finished generation={} translation_id={}",
                generation,
                job_id
            ),
            Err(err) => engine_warn!("Upload failed generation={}: {}", generation, err),
        }
        task_gate.emit(EngineEvent::UploadFinished { generation, result });
        task_gate.close();
    });

    UploadHandle {
        generation,
        token,
        gate,
        task,
    }
}
