use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};
use translator_core::{
    update, validate, AppState, Job, JobStatus, JobView, Msg, ProviderCatalog, SourceFile,
    SubmitParams, ValidationError,
};
use translator_engine::{
    save_artifact, Artifact, CatalogError, EngineEvent, PersistError, RetrieveError, Transports,
};
use translator_logging::{engine_debug, engine_info, engine_warn};

use crate::config::{ClientConfig, ConfigError};
use crate::effects::{map_event, EffectRunner};

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("no tokio runtime is available")]
    NoRuntime,
    #[error("no translated file is available")]
    NoArtifact,
    #[error(transparent)]
    Retrieve(#[from] RetrieveError),
    #[error(transparent)]
    Persist(#[from] PersistError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// What observers receive after every change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSnapshot {
    pub view: JobView,
    pub observed_at: DateTime<Utc>,
}

impl JobSnapshot {
    fn now(view: JobView) -> Self {
        Self {
            view,
            observed_at: Utc::now(),
        }
    }
}

/// Owns the job state and drives it from user commands and transport events.
///
/// All state transitions happen on the caller's task through `update`; transport
/// callbacks only enqueue events, which are applied by `process_pending`,
/// `next_event` or `run_until_settled`.
pub struct JobController {
    state: AppState,
    runner: EffectRunner,
    events: mpsc::UnboundedReceiver<EngineEvent>,
    observers: watch::Sender<JobSnapshot>,
    catalog: ProviderCatalog,
}

impl JobController {
    /// Builds a controller on the ambient tokio runtime.
    pub fn new(transports: Transports) -> Result<Self, ControllerError> {
        let runtime = Handle::try_current().map_err(|_| ControllerError::NoRuntime)?;
        Ok(Self::with_runtime(transports, runtime))
    }

    pub fn with_runtime(transports: Transports, runtime: Handle) -> Self {
        let (event_tx, events) = mpsc::unbounded_channel();
        let state = AppState::new();
        let (observers, _) = watch::channel(JobSnapshot::now(state.view()));
        Self {
            state,
            runner: EffectRunner::new(runtime, transports, event_tx),
            events,
            observers,
            catalog: ProviderCatalog::default(),
        }
    }

    /// HTTP transports configured from `config`.
    pub fn from_config(config: &ClientConfig) -> Result<Self, ControllerError> {
        let settings = config.transport_settings()?;
        engine_info!("Using backend {}", settings.base_url());
        Self::new(Transports::http(settings))
    }

    pub async fn load_catalog(&mut self) -> Result<&ProviderCatalog, ControllerError> {
        let catalog = self.runner.transports().catalog.fetch().await?;
        engine_info!("Loaded {} providers", catalog.providers().len());
        self.catalog = catalog;
        Ok(&self.catalog)
    }

    pub fn catalog(&self) -> &ProviderCatalog {
        &self.catalog
    }

    pub fn job(&self) -> &Job {
        self.state.job()
    }

    pub fn view(&self) -> JobView {
        self.state.view()
    }

    pub fn subscribe(&self) -> watch::Receiver<JobSnapshot> {
        self.observers.subscribe()
    }

    /// Selects a new source file, discarding any job in flight.
    pub fn select_file(&mut self, file: SourceFile) -> Result<(), ValidationError> {
        self.command(Msg::FileSelected(file))
    }

    pub fn submit(&mut self, params: SubmitParams) -> Result<(), ValidationError> {
        self.command(Msg::SubmitRequested(params))
    }

    /// Aborts the job in flight. A no-op when nothing is running.
    pub fn cancel(&mut self) {
        self.dispatch(Msg::CancelRequested);
    }

    /// Applies every event already queued. Returns how many were applied.
    pub fn process_pending(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(event) = self.events.try_recv() {
            self.dispatch(map_event(event));
            applied += 1;
        }
        applied
    }

    /// Waits for the next transport event and applies it.
    pub async fn next_event(&mut self) -> Option<()> {
        let event = self.events.recv().await?;
        self.dispatch(map_event(event));
        Some(())
    }

    /// Applies events until the job is no longer uploading or processing.
    pub async fn run_until_settled(&mut self) -> JobView {
        while self.state.job().status().is_in_flight() {
            if self.next_event().await.is_none() {
                break;
            }
        }
        self.state.view()
    }

    /// Fetches the translated workbook of a completed job.
    pub async fn download(&self) -> Result<Artifact, ControllerError> {
        let job = self.state.job();
        let artifact_ref = match (job.status(), job.result_artifact()) {
            (JobStatus::Complete, Some(reference)) => reference.to_string(),
            _ => return Err(ControllerError::NoArtifact),
        };
        let artifact = self.runner.transports().artifacts.fetch(&artifact_ref).await?;
        engine_info!(
            "Downloaded {} ({} bytes, sha256 {})",
            artifact.filename,
            artifact.bytes.len(),
            artifact.sha256
        );
        Ok(artifact)
    }

    pub async fn download_to(&self, dir: &Path) -> Result<PathBuf, ControllerError> {
        let artifact = self.download().await?;
        let path = save_artifact(dir, &artifact)?;
        engine_info!("Saved translated file to {}", path.display());
        Ok(path)
    }

    fn command(&mut self, msg: Msg) -> Result<(), ValidationError> {
        if let Err(err) = validate(&self.state, &msg) {
            engine_warn!("Rejected command: {}", err);
            return Err(err);
        }
        self.dispatch(msg);
        Ok(())
    }

    fn dispatch(&mut self, msg: Msg) {
        if let Some(generation) = msg.generation() {
            if !self.state.is_current(generation) {
                engine_debug!(
                    "Discarding stale event generation={} current={}",
                    generation,
                    self.state.job().generation()
                );
                return;
            }
        }

        let state = std::mem::take(&mut self.state);
        let (state, effects) = update(state, msg);
        self.state = state;
        self.runner.run(effects);

        let view = self.state.view();
        if self.state.consume_dirty() {
            self.observers.send_replace(JobSnapshot::now(view));
        }
    }
}
