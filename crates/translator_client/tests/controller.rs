use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::stream;
use pretty_assertions::assert_eq;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use translator_client::{ControllerError, JobController};
use translator_core::{
    JobStatus, JobView, ProviderCatalog, ProviderOption, SourceFile, SubmitParams,
    ValidationError,
};
use translator_engine::{
    Artifact, ArtifactRetriever, CatalogError, CatalogSource, EventSource, MessageStream,
    RetrieveError, StreamError, TransportError, Transports, UploadProgress, UploadProgressSink,
    UploadTransport,
};

struct DropCounter(Arc<AtomicUsize>);

impl Drop for DropCounter {
    fn drop(&mut self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

enum UploadScript {
    Succeed(&'static str),
    Fail(TransportError),
    Hang,
}

struct ScriptedUploader {
    script: UploadScript,
    calls: AtomicUsize,
    cancelled: Arc<AtomicUsize>,
}

#[async_trait::async_trait]
impl UploadTransport for ScriptedUploader {
    async fn upload(
        &self,
        file: &SourceFile,
        _params: &SubmitParams,
        progress: Arc<dyn UploadProgressSink>,
    ) -> Result<String, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let total = file.size();
        progress.report(UploadProgress {
            bytes_sent: 0,
            bytes_total: total,
        });
        match &self.script {
            UploadScript::Succeed(job_id) => {
                progress.report(UploadProgress {
                    bytes_sent: total,
                    bytes_total: total,
                });
                Ok(job_id.to_string())
            }
            UploadScript::Fail(err) => Err(err.clone()),
            UploadScript::Hang => {
                let _guard = DropCounter(self.cancelled.clone());
                futures_util::future::pending::<()>().await;
                unreachable!("pending never resolves")
            }
        }
    }
}

/// Progress channel fed by the test; dropping the sender ends the stream.
struct ScriptedSource {
    frames: Mutex<Option<UnboundedReceiver<String>>>,
    connects: AtomicUsize,
    releases: Arc<AtomicUsize>,
}

#[async_trait::async_trait]
impl EventSource for ScriptedSource {
    async fn connect(&self, _job_id: &str) -> Result<MessageStream, StreamError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        let rx = self
            .frames
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| StreamError::Transport("already connected".to_string()))?;
        let guard = DropCounter(self.releases.clone());
        let messages = stream::unfold((rx, guard), |(mut rx, guard)| async move {
            let frame = rx.recv().await?;
            Some((Ok::<String, StreamError>(frame), (rx, guard)))
        });
        Ok(Box::pin(messages))
    }
}

struct FixedArtifacts {
    result: Result<Artifact, RetrieveError>,
    requested: Mutex<Vec<String>>,
}

#[async_trait::async_trait]
impl ArtifactRetriever for FixedArtifacts {
    async fn fetch(&self, artifact_ref: &str) -> Result<Artifact, RetrieveError> {
        self.requested.lock().unwrap().push(artifact_ref.to_string());
        self.result.clone()
    }
}

struct FixedCatalog(Result<ProviderCatalog, CatalogError>);

#[async_trait::async_trait]
impl CatalogSource for FixedCatalog {
    async fn fetch(&self) -> Result<ProviderCatalog, CatalogError> {
        self.0.clone()
    }
}

struct Harness {
    controller: JobController,
    frames: UnboundedSender<String>,
    uploader: Arc<ScriptedUploader>,
    source: Arc<ScriptedSource>,
    artifacts: Arc<FixedArtifacts>,
}

fn sample_artifact() -> Artifact {
    Artifact {
        reference: "out.xlsx".to_string(),
        filename: "out.xlsx".to_string(),
        content_type: "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            .to_string(),
        bytes: b"PK\x03\x04translated".to_vec(),
        sha256: "abc".to_string(),
    }
}

fn harness_with(script: UploadScript, artifact: Result<Artifact, RetrieveError>) -> Harness {
    let (frames, rx) = mpsc::unbounded_channel();
    let uploader = Arc::new(ScriptedUploader {
        script,
        calls: AtomicUsize::new(0),
        cancelled: Arc::new(AtomicUsize::new(0)),
    });
    let source = Arc::new(ScriptedSource {
        frames: Mutex::new(Some(rx)),
        connects: AtomicUsize::new(0),
        releases: Arc::new(AtomicUsize::new(0)),
    });
    let artifacts = Arc::new(FixedArtifacts {
        result: artifact,
        requested: Mutex::new(Vec::new()),
    });
    let catalog = ProviderCatalog::new(vec![ProviderOption {
        name: "groq".to_string(),
        models: vec!["llama-3.3-70b-versatile".to_string()],
    }]);
    let transports = Transports {
        uploader: uploader.clone(),
        events: source.clone(),
        artifacts: artifacts.clone(),
        catalog: Arc::new(FixedCatalog(Ok(catalog))),
    };
    Harness {
        controller: JobController::new(transports).unwrap(),
        frames,
        uploader,
        source,
        artifacts,
    }
}

fn harness(script: UploadScript) -> Harness {
    harness_with(script, Ok(sample_artifact()))
}

fn sheet() -> SourceFile {
    SourceFile::new("budget.xlsx", b"PK\x03\x04workbook-bytes".to_vec())
}

fn params() -> SubmitParams {
    SubmitParams::new("es", "groq", "llama-3.3-70b-versatile")
}

/// Lets spawned transport tasks run without applying their events.
async fn let_transports_run() {
    tokio::time::sleep(Duration::from_millis(20)).await;
}

async fn wait_for(controller: &mut JobController, status: JobStatus) -> JobView {
    tokio::time::timeout(Duration::from_secs(5), async {
        while controller.job().status() != status {
            controller
                .next_event()
                .await
                .expect("event queue stays open");
        }
    })
    .await
    .expect("status reached in time");
    controller.view()
}

async fn processing(script_job_id: &'static str) -> Harness {
    let mut h = harness(UploadScript::Succeed(script_job_id));
    h.controller.select_file(sheet()).unwrap();
    h.controller.submit(params()).unwrap();
    wait_for(&mut h.controller, JobStatus::Processing).await;
    h
}

#[tokio::test]
async fn submit_uploads_then_processes_the_returned_job() {
    let mut h = harness(UploadScript::Succeed("J1"));
    h.controller.select_file(sheet()).unwrap();
    assert_eq!(h.controller.job().status(), JobStatus::FileSelected);

    h.controller.submit(params()).unwrap();
    assert_eq!(h.controller.job().status(), JobStatus::Uploading);
    assert_eq!(h.controller.job().progress_percent(), 0);

    let view = wait_for(&mut h.controller, JobStatus::Processing).await;
    assert_eq!(view.job_id.as_deref(), Some("J1"));
    assert_eq!(view.status_message.as_deref(), Some("Processing translation..."));
    assert!(view.can_cancel);
    assert_eq!(h.uploader.calls.load(Ordering::SeqCst), 1);

    let_transports_run().await;
    assert_eq!(h.source.connects.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn cancel_twice_while_processing_cancels_once_and_releases_once() {
    let mut h = processing("J1").await;
    let_transports_run().await;
    assert_eq!(h.source.connects.load(Ordering::SeqCst), 1);

    let mut observer = h.controller.subscribe();
    let _ = observer.borrow_and_update();

    h.controller.cancel();
    assert_eq!(h.source.releases.load(Ordering::SeqCst), 1);
    assert!(observer.has_changed().unwrap());
    assert_eq!(observer.borrow_and_update().view.status, JobStatus::Cancelled);

    h.controller.cancel();
    assert!(!observer.has_changed().unwrap());
    assert_eq!(h.controller.job().status(), JobStatus::Cancelled);
    assert_eq!(h.controller.job().progress_percent(), 0);

    let_transports_run().await;
    assert_eq!(h.source.releases.load(Ordering::SeqCst), 1);
    assert_eq!(h.controller.process_pending(), 0);
}

#[tokio::test]
async fn progress_from_a_superseded_generation_is_discarded() {
    let mut h = processing("J1").await;
    let old_generation = h.controller.job().generation();

    h.frames
        .send(r#"{"progress": 40, "message": "Translating sheet 1"}"#.to_string())
        .unwrap();
    let_transports_run().await;

    h.controller.select_file(sheet()).unwrap();
    assert_eq!(h.controller.job().generation(), old_generation + 1);

    h.controller.process_pending();
    let view = h.controller.view();
    assert_eq!(view.status, JobStatus::FileSelected);
    assert_eq!(view.progress_percent, 0);
    assert_eq!(view.status_message, None);
}

#[tokio::test]
async fn stream_progress_updates_the_job() {
    let mut h = processing("J1").await;
    h.frames
        .send(r#"{"progress": 40.7, "message": "Translating sheet 1"}"#.to_string())
        .unwrap();
    h.controller.next_event().await.unwrap();

    assert_eq!(h.controller.job().progress_percent(), 40);
    assert_eq!(
        h.controller.job().status_message(),
        Some("Translating sheet 1")
    );
    assert_eq!(h.controller.job().status(), JobStatus::Processing);
}

#[tokio::test]
async fn complete_message_finishes_the_job_once() {
    let mut h = processing("J1").await;
    let terminal = r#"{"progress": 100, "complete": true, "translated_file": "out.xlsx"}"#;
    h.frames.send(terminal.to_string()).unwrap();

    let view = h.controller.run_until_settled().await;
    assert_eq!(view.status, JobStatus::Complete);
    assert_eq!(view.result_artifact.as_deref(), Some("out.xlsx"));
    assert_eq!(view.progress_percent, 100);
    assert!(view.can_download);

    // The channel is closed after a terminal message; a duplicate never arrives.
    let _ = h.frames.send(terminal.to_string());
    let_transports_run().await;
    assert_eq!(h.controller.process_pending(), 0);
    assert_eq!(h.controller.job().status(), JobStatus::Complete);
    assert_eq!(h.source.releases.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn error_message_fails_the_job() {
    let mut h = processing("J1").await;
    h.frames.send(r#"{"error": "boom"}"#.to_string()).unwrap();

    let view = h.controller.run_until_settled().await;
    assert_eq!(view.status, JobStatus::Failed);
    assert_eq!(view.error_detail.as_deref(), Some("boom"));
    assert_eq!(view.result_artifact, None);
}

#[tokio::test]
async fn dropped_channel_fails_without_reconnecting() {
    let mut h = processing("J1").await;
    drop(h.frames);

    let view = h.controller.run_until_settled().await;
    assert_eq!(view.status, JobStatus::Failed);
    assert_eq!(view.error_detail.as_deref(), Some("connection lost"));
    assert_eq!(h.source.connects.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn malformed_message_fails_the_job() {
    let mut h = processing("J1").await;
    h.frames.send(r#"{"progress": 250}"#.to_string()).unwrap();

    let view = h.controller.run_until_settled().await;
    assert_eq!(view.status, JobStatus::Failed);
    assert!(view
        .error_detail
        .as_deref()
        .unwrap()
        .starts_with("malformed progress message"));
}

#[tokio::test]
async fn select_file_while_uploading_aborts_and_discards_the_upload() {
    let mut h = harness(UploadScript::Hang);
    h.controller.select_file(sheet()).unwrap();
    h.controller.submit(params()).unwrap();
    let_transports_run().await;
    assert_eq!(h.uploader.calls.load(Ordering::SeqCst), 1);

    let replacement = SourceFile::new("other.xls", b"\xd0\xcf\x11\xe0".to_vec());
    assert_eq!(h.controller.select_file(replacement), Ok(()));
    assert_eq!(h.controller.job().status(), JobStatus::FileSelected);

    let_transports_run().await;
    h.controller.process_pending();
    let view = h.controller.view();
    assert_eq!(view.status, JobStatus::FileSelected);
    assert_eq!(view.file_name.as_deref(), Some("other.xls"));
    assert_eq!(view.progress_percent, 0);
    assert_eq!(h.uploader.cancelled.load(Ordering::SeqCst), 1);
    assert_eq!(h.source.connects.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn upload_failure_surfaces_the_server_message() {
    let mut h = harness(UploadScript::Fail(TransportError::Server {
        status: 400,
        message: "Unsupported provider".to_string(),
    }));
    h.controller.select_file(sheet()).unwrap();
    h.controller.submit(params()).unwrap();

    let view = h.controller.run_until_settled().await;
    assert_eq!(view.status, JobStatus::Failed);
    assert_eq!(view.error_detail.as_deref(), Some("Unsupported provider"));
    assert!(view.can_submit);
}

#[tokio::test]
async fn submit_without_file_is_rejected_and_state_stays_idle() {
    let mut h = harness(UploadScript::Succeed("J1"));
    assert_eq!(
        h.controller.submit(params()),
        Err(ValidationError::NoFileSelected)
    );
    assert_eq!(h.controller.job().status(), JobStatus::Idle);
    let_transports_run().await;
    assert_eq!(h.uploader.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn submit_rejects_missing_model_and_unsupported_file() {
    let mut h = harness(UploadScript::Succeed("J1"));
    assert_eq!(
        h.controller
            .select_file(SourceFile::new("notes.csv", b"a,b".to_vec())),
        Err(ValidationError::UnsupportedFileType {
            name: "notes.csv".to_string()
        })
    );
    assert_eq!(h.controller.job().status(), JobStatus::Idle);

    h.controller.select_file(sheet()).unwrap();
    assert_eq!(
        h.controller.submit(SubmitParams::new("es", "groq", " ")),
        Err(ValidationError::MissingModel)
    );
    assert_eq!(h.controller.job().status(), JobStatus::FileSelected);
}

#[tokio::test]
async fn resubmit_after_failure_starts_a_new_generation() {
    let mut h = processing("J1").await;
    h.frames.send(r#"{"error": "quota"}"#.to_string()).unwrap();
    h.controller.run_until_settled().await;
    let failed_generation = h.controller.job().generation();

    h.controller.submit(params()).unwrap();
    assert_eq!(h.controller.job().status(), JobStatus::Uploading);
    assert_eq!(h.controller.job().generation(), failed_generation + 1);
    assert_eq!(h.controller.job().error_detail(), None);
    assert_eq!(h.controller.job().progress_percent(), 0);
}

#[tokio::test]
async fn invalid_artifact_leaves_the_job_complete() {
    let mut h = harness_with(
        UploadScript::Succeed("J1"),
        Err(RetrieveError::InvalidArtifact {
            content_type: Some("text/html".to_string()),
        }),
    );
    h.controller.select_file(sheet()).unwrap();
    h.controller.submit(params()).unwrap();
    wait_for(&mut h.controller, JobStatus::Processing).await;
    h.frames
        .send(r#"{"complete": true, "translated_file": "out.xlsx"}"#.to_string())
        .unwrap();
    h.controller.run_until_settled().await;

    let err = h.controller.download().await.unwrap_err();
    assert!(matches!(
        err,
        ControllerError::Retrieve(RetrieveError::InvalidArtifact { .. })
    ));
    assert_eq!(h.controller.job().status(), JobStatus::Complete);
    assert_eq!(h.controller.job().result_artifact(), Some("out.xlsx"));
}

#[tokio::test]
async fn download_requires_a_completed_job() {
    let h = processing("J1").await;
    assert!(matches!(
        h.controller.download().await,
        Err(ControllerError::NoArtifact)
    ));
    assert!(h.artifacts.requested.lock().unwrap().is_empty());
}

#[tokio::test]
async fn download_to_saves_the_artifact() {
    let mut h = processing("J1").await;
    h.frames
        .send(r#"{"complete": true, "translated_file": "out.xlsx"}"#.to_string())
        .unwrap();
    h.controller.run_until_settled().await;

    let dir = tempfile::tempdir().unwrap();
    let path = h.controller.download_to(dir.path()).await.unwrap();
    assert_eq!(path, dir.path().join("out.xlsx"));
    assert_eq!(std::fs::read(&path).unwrap(), sample_artifact().bytes);
    assert_eq!(
        *h.artifacts.requested.lock().unwrap(),
        vec!["out.xlsx".to_string()]
    );
}

#[tokio::test]
async fn observers_see_each_transition() {
    let mut h = harness(UploadScript::Succeed("J1"));
    let mut observer = h.controller.subscribe();
    assert_eq!(observer.borrow_and_update().view.status, JobStatus::Idle);

    h.controller.select_file(sheet()).unwrap();
    assert!(observer.has_changed().unwrap());
    let snapshot = observer.borrow_and_update().clone();
    assert_eq!(snapshot.view.status, JobStatus::FileSelected);
    assert_eq!(snapshot.view.file_name.as_deref(), Some("budget.xlsx"));

    h.controller.submit(params()).unwrap();
    let uploading_at = observer.borrow_and_update().observed_at;
    wait_for(&mut h.controller, JobStatus::Processing).await;
    let processing = observer.borrow_and_update().clone();
    assert_eq!(processing.view.status, JobStatus::Processing);
    assert!(processing.observed_at >= uploading_at);
}

#[tokio::test]
async fn load_catalog_keeps_the_provider_list() {
    let mut h = harness(UploadScript::Succeed("J1"));
    assert!(h.controller.catalog().is_empty());

    let catalog = h.controller.load_catalog().await.unwrap();
    assert_eq!(
        catalog.default_selection(),
        Some(("groq", Some("llama-3.3-70b-versatile")))
    );
    assert!(h
        .controller
        .catalog()
        .contains("groq", "llama-3.3-70b-versatile"));
}

#[test]
fn new_without_runtime_is_an_error() {
    let h = std::thread::spawn(|| {
        let transports = Transports::http(Default::default());
        matches!(
            JobController::new(transports),
            Err(ControllerError::NoRuntime)
        )
    });
    assert!(h.join().unwrap());
}
