use crate::{Generation, SourceFile, SubmitParams};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    StartUpload {
        generation: Generation,
        file: SourceFile,
        params: SubmitParams,
    },
    AbortUpload,
    OpenSubscription {
        generation: Generation,
        job_id: String,
    },
    CloseSubscription,
}
