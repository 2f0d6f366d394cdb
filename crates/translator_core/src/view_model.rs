use crate::{Generation, Job, JobStatus};

/// Read-only snapshot of the job for observers.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct JobView {
    pub status: JobStatus,
    pub generation: Generation,
    pub job_id: Option<String>,
    pub file_name: Option<String>,
    pub file_size: Option<u64>,
    pub target_language: Option<String>,
    pub provider: Option<String>,
    pub model: Option<String>,
    pub progress_percent: u8,
    pub status_message: Option<String>,
    pub result_artifact: Option<String>,
    pub error_detail: Option<String>,
    pub can_submit: bool,
    pub can_cancel: bool,
    pub can_download: bool,
    pub dirty: bool,
}

impl JobView {
    pub(crate) fn from_job(job: &Job, dirty: bool) -> Self {
        let status = job.status();
        let file = job.source_file();
        let params = job.params();
        Self {
            status,
            generation: job.generation(),
            job_id: job.id().map(ToOwned::to_owned),
            file_name: file.map(|f| f.name().to_string()),
            file_size: file.map(|f| f.size()),
            target_language: params.map(|p| p.target_language.clone()),
            provider: params.map(|p| p.provider.clone()),
            model: params.map(|p| p.model.clone()),
            progress_percent: job.progress_percent(),
            status_message: job.status_message().map(ToOwned::to_owned),
            result_artifact: job.result_artifact().map(ToOwned::to_owned),
            error_detail: job.error_detail().map(ToOwned::to_owned),
            can_submit: file.is_some() && !status.is_in_flight(),
            can_cancel: status.is_in_flight(),
            can_download: status == JobStatus::Complete && job.result_artifact().is_some(),
            dirty,
        }
    }
}
