/// Closed classification of a progress-channel message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    Progress {
        percent: Option<u8>,
        message: Option<String>,
    },
    Complete {
        artifact: String,
    },
    Failure {
        error_message: String,
    },
}

impl ProgressEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ProgressEvent::Progress { .. })
    }
}
