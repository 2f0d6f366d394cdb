use crate::{
    upload_percent, AppState, Effect, Job, JobStatus, Msg, ProgressEvent, SourceFile,
    SubmitParams, ValidationError,
};

/// Checks whether a user command may be applied to the current state.
///
/// Asynchronous events always validate; they are fenced by generation in `update`.
pub fn validate(state: &AppState, msg: &Msg) -> Result<(), ValidationError> {
    match msg {
        Msg::FileSelected(file) => validate_file(file),
        Msg::SubmitRequested(params) => validate_submit(state.job(), params),
        _ => Ok(()),
    }
}

/// Pure update function: applies a message to state and returns any effects.
///
/// Commands that fail `validate` and events from a superseded generation leave the
/// state untouched and produce no effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    if validate(&state, &msg).is_err() {
        return (state, Vec::new());
    }
    if let Some(generation) = msg.generation() {
        if !state.is_current(generation) {
            return (state, Vec::new());
        }
    }

    let status = state.job().status();
    let effects = match msg {
        Msg::FileSelected(file) => {
            let effects = release_effects(status);
            state.select_file(file);
            effects
        }
        Msg::SubmitRequested(params) => {
            let Some(file) = state.job().source_file().cloned() else {
                return (state, Vec::new());
            };
            let generation = state.begin_submit(params.clone());
            vec![Effect::StartUpload {
                generation,
                file,
                params,
            }]
        }
        Msg::CancelRequested => {
            if status.is_in_flight() {
                let effects = release_effects(status);
                state.cancel();
                effects
            } else {
                Vec::new()
            }
        }
        Msg::UploadProgress {
            bytes_sent,
            bytes_total,
            ..
        } => {
            if status == JobStatus::Uploading {
                state.apply_upload_progress(upload_percent(bytes_sent, bytes_total));
            }
            Vec::new()
        }
        Msg::UploadSucceeded { generation, job_id } => {
            if status == JobStatus::Uploading {
                state.begin_processing(job_id.clone());
                vec![Effect::OpenSubscription { generation, job_id }]
            } else {
                Vec::new()
            }
        }
        Msg::UploadFailed { detail, .. } => {
            if status == JobStatus::Uploading {
                state.fail(detail);
            }
            Vec::new()
        }
        Msg::StreamEvent { event, .. } => {
            // Terminal idempotence: once the job left Processing, the channel is closed.
            if status != JobStatus::Processing {
                return (state, Vec::new());
            }
            match event {
                ProgressEvent::Progress { percent, message } => {
                    state.apply_stream_progress(percent, message);
                    Vec::new()
                }
                ProgressEvent::Complete { artifact } => {
                    state.complete(artifact);
                    vec![Effect::CloseSubscription]
                }
                ProgressEvent::Failure { error_message } => {
                    state.fail(error_message);
                    vec![Effect::CloseSubscription]
                }
            }
        }
        Msg::StreamFailed { detail, .. } => {
            if status == JobStatus::Processing {
                state.fail(detail);
                vec![Effect::CloseSubscription]
            } else {
                Vec::new()
            }
        }
    };

    (state, effects)
}

fn release_effects(status: JobStatus) -> Vec<Effect> {
    match status {
        JobStatus::Uploading => vec![Effect::AbortUpload],
        JobStatus::Processing => vec![Effect::CloseSubscription],
        _ => Vec::new(),
    }
}

fn validate_file(file: &SourceFile) -> Result<(), ValidationError> {
    if file.has_spreadsheet_extension() {
        Ok(())
    } else {
        Err(ValidationError::UnsupportedFileType {
            name: file.name().to_string(),
        })
    }
}

fn validate_submit(job: &Job, params: &SubmitParams) -> Result<(), ValidationError> {
    if job.source_file().is_none() {
        return Err(ValidationError::NoFileSelected);
    }
    let status = job.status();
    if status != JobStatus::FileSelected && !status.is_terminal() {
        return Err(ValidationError::JobInFlight);
    }
    if params.target_language.trim().is_empty() {
        return Err(ValidationError::MissingTargetLanguage);
    }
    if params.provider.trim().is_empty() {
        return Err(ValidationError::MissingProvider);
    }
    if params.model.trim().is_empty() {
        return Err(ValidationError::MissingModel);
    }
    Ok(())
}
