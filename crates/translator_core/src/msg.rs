use crate::{Generation, ProgressEvent, SourceFile, SubmitParams};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// User picked a local file; supersedes any job in flight.
    FileSelected(SourceFile),
    /// User asked to translate the held file.
    SubmitRequested(SubmitParams),
    /// User clicked Cancel.
    CancelRequested,
    /// Upload transport sent more bytes.
    UploadProgress {
        generation: Generation,
        bytes_sent: u64,
        bytes_total: u64,
    },
    /// Backend accepted the upload and assigned a job id.
    UploadSucceeded {
        generation: Generation,
        job_id: String,
    },
    /// Upload failed before the backend assigned a job id.
    UploadFailed {
        generation: Generation,
        detail: String,
    },
    /// Classified message from the progress channel.
    StreamEvent {
        generation: Generation,
        event: ProgressEvent,
    },
    /// Progress channel broke or delivered garbage before a terminal message.
    StreamFailed {
        generation: Generation,
        detail: String,
    },
}

impl Msg {
    /// Generation an asynchronous event was issued under; `None` for user commands.
    pub fn generation(&self) -> Option<Generation> {
        match self {
            Msg::UploadProgress { generation, .. }
            | Msg::UploadSucceeded { generation, .. }
            | Msg::UploadFailed { generation, .. }
            | Msg::StreamEvent { generation, .. }
            | Msg::StreamFailed { generation, .. } => Some(*generation),
            Msg::FileSelected(_) | Msg::SubmitRequested(_) | Msg::CancelRequested => None,
        }
    }
}
