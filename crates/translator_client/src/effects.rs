use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::mpsc::UnboundedSender;
use translator_core::{Effect, Msg};
use translator_engine::{
    start_upload, ChannelEventSink, EngineEvent, EventSink, ProgressSubscription, Transports,
    UploadHandle,
};
use translator_logging::engine_info;

/// Executes effects against the transports and owns the live transport handles.
pub(crate) struct EffectRunner {
    runtime: Handle,
    transports: Transports,
    sink: Arc<dyn EventSink>,
    upload: Option<UploadHandle>,
    subscription: Option<ProgressSubscription>,
}

impl EffectRunner {
    pub(crate) fn new(
        runtime: Handle,
        transports: Transports,
        event_tx: UnboundedSender<EngineEvent>,
    ) -> Self {
        Self {
            runtime,
            transports,
            sink: Arc::new(ChannelEventSink::new(event_tx)),
            upload: None,
            subscription: None,
        }
    }

    pub(crate) fn transports(&self) -> &Transports {
        &self.transports
    }

    pub(crate) fn run(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::StartUpload {
                    generation,
                    file,
                    params,
                } => {
                    if let Some(previous) = self.upload.take() {
                        previous.abort();
                    }
                    self.upload = Some(start_upload(
                        &self.runtime,
                        self.transports.uploader.clone(),
                        generation,
                        file,
                        params,
                        self.sink.clone(),
                    ));
                }
                Effect::AbortUpload => {
                    if let Some(upload) = self.upload.take() {
                        upload.abort();
                    }
                }
                Effect::OpenSubscription { generation, job_id } => {
                    // The upload that produced this job id has already finished.
                    self.upload = None;
                    if let Some(previous) = self.subscription.take() {
                        previous.close();
                    }
                    engine_info!("OpenSubscription generation={} job_id={}", generation, job_id);
                    self.subscription = Some(ProgressSubscription::open(
                        &self.runtime,
                        self.transports.events.clone(),
                        job_id,
                        generation,
                        self.sink.clone(),
                    ));
                }
                Effect::CloseSubscription => {
                    if let Some(subscription) = self.subscription.take() {
                        subscription.close();
                    }
                }
            }
        }
    }
}

pub(crate) fn map_event(event: EngineEvent) -> Msg {
    match event {
        EngineEvent::UploadProgress {
            generation,
            progress,
        } => Msg::UploadProgress {
            generation,
            bytes_sent: progress.bytes_sent,
            bytes_total: progress.bytes_total,
        },
        EngineEvent::UploadFinished { generation, result } => match result {
            Ok(job_id) => Msg::UploadSucceeded { generation, job_id },
            Err(err) => Msg::UploadFailed {
                generation,
                detail: err.detail(),
            },
        },
        EngineEvent::Stream { generation, event } => Msg::StreamEvent { generation, event },
        EngineEvent::StreamFailed { generation, error } => Msg::StreamFailed {
            generation,
            detail: error.to_string(),
        },
    }
}
