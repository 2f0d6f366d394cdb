use std::sync::Arc;

use crate::view_model::JobView;

/// Fence value tagging every asynchronous event with the job instance it belongs to.
pub type Generation = u64;

/// File extensions accepted for translation, compared case-insensitively.
pub const SPREADSHEET_EXTENSIONS: &[&str] = &["xlsx", "xls"];

pub(crate) const MSG_STARTING: &str = "Starting translation...";
pub(crate) const MSG_UPLOADING: &str = "Uploading file...";
pub(crate) const MSG_PROCESSING: &str = "Processing translation...";
pub(crate) const MSG_COMPLETED: &str = "Translation completed!";
pub(crate) const MSG_FAILED: &str = "Translation failed";
pub(crate) const MSG_CANCELLED: &str = "Translation cancelled";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JobStatus {
    #[default]
    Idle,
    FileSelected,
    Uploading,
    Processing,
    Complete,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Complete | JobStatus::Failed | JobStatus::Cancelled
        )
    }

    /// Uploading or processing: a transport resource is outstanding.
    pub fn is_in_flight(self) -> bool {
        matches!(self, JobStatus::Uploading | JobStatus::Processing)
    }
}

/// A local spreadsheet selected for translation. Cloning shares the bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    name: String,
    bytes: Arc<[u8]>,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn shared_bytes(&self) -> Arc<[u8]> {
        Arc::clone(&self.bytes)
    }

    pub fn has_spreadsheet_extension(&self) -> bool {
        let Some((stem, ext)) = self.name.rsplit_once('.') else {
            return false;
        };
        !stem.is_empty()
            && SPREADSHEET_EXTENSIONS
                .iter()
                .any(|accepted| accepted.eq_ignore_ascii_case(ext))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SubmitParams {
    pub target_language: String,
    pub provider: String,
    pub model: String,
}

impl SubmitParams {
    pub fn new(
        target_language: impl Into<String>,
        provider: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            target_language: target_language.into(),
            provider: provider.into(),
            model: model.into(),
        }
    }
}

/// The single translation task tracked by a controller.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Job {
    id: Option<String>,
    source_file: Option<SourceFile>,
    params: Option<SubmitParams>,
    status: JobStatus,
    progress_percent: u8,
    status_message: Option<String>,
    result_artifact: Option<String>,
    error_detail: Option<String>,
    generation: Generation,
}

impl Job {
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn source_file(&self) -> Option<&SourceFile> {
        self.source_file.as_ref()
    }

    pub fn params(&self) -> Option<&SubmitParams> {
        self.params.as_ref()
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn progress_percent(&self) -> u8 {
        self.progress_percent
    }

    pub fn status_message(&self) -> Option<&str> {
        self.status_message.as_deref()
    }

    pub fn result_artifact(&self) -> Option<&str> {
        self.result_artifact.as_deref()
    }

    pub fn error_detail(&self) -> Option<&str> {
        self.error_detail.as_deref()
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }
}

/// Upload percent as `floor(sent * 100 / total)`, saturating at 100.
pub fn upload_percent(bytes_sent: u64, bytes_total: u64) -> u8 {
    if bytes_total == 0 || bytes_sent >= bytes_total {
        return 100;
    }
    // Widen to avoid overflow on very large uploads.
    ((u128::from(bytes_sent) * 100) / u128::from(bytes_total)) as u8
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppState {
    job: Job,
    dirty: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn job(&self) -> &Job {
        &self.job
    }

    pub fn view(&self) -> JobView {
        JobView::from_job(&self.job, self.dirty)
    }

    /// Returns whether anything changed since the last call and clears the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub fn is_current(&self, generation: Generation) -> bool {
        self.job.generation == generation
    }

    fn advance_generation(&mut self) -> Generation {
        self.job.generation += 1;
        self.job.generation
    }

    fn clear_outcome(&mut self) {
        self.job.id = None;
        self.job.progress_percent = 0;
        self.job.status_message = None;
        self.job.result_artifact = None;
        self.job.error_detail = None;
    }

    pub(crate) fn select_file(&mut self, file: SourceFile) -> Generation {
        let generation = self.advance_generation();
        self.clear_outcome();
        self.job.source_file = Some(file);
        self.job.status = JobStatus::FileSelected;
        self.dirty = true;
        generation
    }

    pub(crate) fn begin_submit(&mut self, params: SubmitParams) -> Generation {
        let generation = self.advance_generation();
        self.clear_outcome();
        self.job.params = Some(params);
        self.job.status = JobStatus::Uploading;
        self.job.status_message = Some(MSG_STARTING.to_string());
        self.dirty = true;
        generation
    }

    pub(crate) fn apply_upload_progress(&mut self, percent: u8) {
        self.job.progress_percent = percent;
        self.job.status_message = Some(MSG_UPLOADING.to_string());
        self.dirty = true;
    }

    pub(crate) fn begin_processing(&mut self, job_id: String) {
        self.job.id = Some(job_id);
        self.job.status = JobStatus::Processing;
        self.job.status_message = Some(MSG_PROCESSING.to_string());
        self.dirty = true;
    }

    pub(crate) fn apply_stream_progress(&mut self, percent: Option<u8>, message: Option<String>) {
        if let Some(percent) = percent {
            self.job.progress_percent = percent.min(100);
        }
        if let Some(message) = message {
            self.job.status_message = Some(message);
        }
        self.dirty = true;
    }

    pub(crate) fn complete(&mut self, artifact: String) {
        self.job.status = JobStatus::Complete;
        self.job.progress_percent = 100;
        self.job.status_message = Some(MSG_COMPLETED.to_string());
        self.job.result_artifact = Some(artifact);
        self.job.error_detail = None;
        self.dirty = true;
    }

    pub(crate) fn fail(&mut self, detail: String) {
        self.job.status = JobStatus::Failed;
        self.job.status_message = Some(MSG_FAILED.to_string());
        self.job.result_artifact = None;
        self.job.error_detail = Some(detail);
        self.dirty = true;
    }

    pub(crate) fn cancel(&mut self) -> Generation {
        let generation = self.advance_generation();
        self.job.status = JobStatus::Cancelled;
        self.job.progress_percent = 0;
        self.job.status_message = Some(MSG_CANCELLED.to_string());
        self.job.result_artifact = None;
        self.job.error_detail = None;
        self.dirty = true;
        generation
    }
}
