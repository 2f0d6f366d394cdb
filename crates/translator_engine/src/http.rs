use reqwest::StatusCode;
use serde::Deserialize;

use crate::TransportSettings;

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

pub(crate) fn build_client(
    settings: &TransportSettings,
    request_timeout: bool,
) -> Result<reqwest::Client, reqwest::Error> {
    let mut builder = reqwest::Client::builder().connect_timeout(settings.connect_timeout);
    if request_timeout {
        builder = builder.timeout(settings.request_timeout);
    }
    builder.build()
}

/// Status code and the backend's `{error}` text, falling back to the reason phrase.
pub(crate) async fn error_parts(response: reqwest::Response) -> (u16, String) {
    let status = response.status();
    let body = response.bytes().await.ok();
    let message = body
        .and_then(|bytes| serde_json::from_slice::<ErrorBody>(&bytes).ok())
        .and_then(|body| body.error)
        .filter(|message| !message.trim().is_empty())
        .unwrap_or_else(|| reason(status));
    (status.as_u16(), message)
}

fn reason(status: StatusCode) -> String {
    status
        .canonical_reason()
        .map(ToOwned::to_owned)
        .unwrap_or_else(|| status.to_string())
}

pub(crate) fn describe_reqwest_error(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        format!("request timed out: {err}")
    } else if err.is_connect() {
        format!("could not connect: {err}")
    } else {
        err.to_string()
    }
}
