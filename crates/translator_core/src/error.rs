use thiserror::Error;

/// A command was rejected locally; the job is left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("unsupported file type: {name} (expected .xlsx or .xls)")]
    UnsupportedFileType { name: String },
    #[error("no file selected")]
    NoFileSelected,
    #[error("target language is required")]
    MissingTargetLanguage,
    #[error("provider is required")]
    MissingProvider,
    #[error("model is required")]
    MissingModel,
    #[error("a translation is already in progress")]
    JobInFlight,
}
