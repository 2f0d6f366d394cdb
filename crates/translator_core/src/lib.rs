//! Translator core: pure job state machine and view-model helpers.
mod catalog;
mod effect;
mod error;
mod event;
mod language;
mod msg;
mod state;
mod update;
mod view_model;

pub use catalog::{ProviderCatalog, ProviderOption};
pub use effect::Effect;
pub use error::ValidationError;
pub use event::ProgressEvent;
pub use language::{language_name, TargetLanguage, DEFAULT_TARGET_LANGUAGE, SUPPORTED_LANGUAGES};
pub use msg::Msg;
pub use state::{
    upload_percent, AppState, Generation, Job, JobStatus, SourceFile, SubmitParams,
    SPREADSHEET_EXTENSIONS,
};
pub use update::{update, validate};
pub use view_model::JobView;
