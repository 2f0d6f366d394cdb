use serde::Deserialize;
use translator_core::ProgressEvent;

use crate::StreamError;

#[derive(Debug, Deserialize)]
struct WireMessage {
    #[serde(default)]
    progress: Option<f64>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    complete: Option<bool>,
    #[serde(default)]
    translated_file: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    heartbeat: Option<bool>,
}

/// Classifies one progress-channel payload.
///
/// Returns `Ok(None)` for keep-alive frames. An `error` wins over `complete`,
/// since the backend reports failures as `{error, complete: true}`.
pub fn parse_progress_message(payload: &str) -> Result<Option<ProgressEvent>, StreamError> {
    let wire: WireMessage = serde_json::from_str(payload)
        .map_err(|err| StreamError::Malformed(format!("{err}: {}", preview(payload))))?;

    if let Some(error_message) = non_empty(wire.error) {
        return Ok(Some(ProgressEvent::Failure { error_message }));
    }

    if wire.complete == Some(true) {
        return match non_empty(wire.translated_file) {
            Some(artifact) => Ok(Some(ProgressEvent::Complete { artifact })),
            None => Err(StreamError::Malformed(
                "completion without translated_file".to_string(),
            )),
        };
    }

    let percent = wire.progress.map(to_percent).transpose()?;
    let message = non_empty(wire.message);
    if percent.is_some() || message.is_some() {
        return Ok(Some(ProgressEvent::Progress { percent, message }));
    }

    if wire.heartbeat == Some(true) {
        return Ok(None);
    }

    Err(StreamError::Malformed(format!(
        "unrecognised message: {}",
        preview(payload)
    )))
}

fn to_percent(value: f64) -> Result<u8, StreamError> {
    if value.is_finite() && (0.0..=100.0).contains(&value) {
        Ok(value.floor() as u8)
    } else {
        Err(StreamError::Malformed(format!(
            "progress {value} outside 0-100"
        )))
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|text| !text.trim().is_empty())
}

fn preview(payload: &str) -> String {
    const MAX: usize = 120;
    if payload.len() <= MAX {
        return payload.to_string();
    }
    let mut end = MAX;
    while !payload.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &payload[..end])
}
