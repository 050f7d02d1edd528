use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

use crate::session::SessionError;

/// Shown when a failed response carries no usable message.
pub const GENERIC_FAILURE_MESSAGE: &str = "Request failed, please try again.";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not signed in: {0}")]
    Unauthenticated(String),
    #[error("Session expired, please sign in again")]
    SessionExpired,
    #[error("Request failed ({status}): {message}")]
    RequestFailed { status: StatusCode, message: String },
    #[error("Network failure: {0}")]
    NetworkFailure(#[from] reqwest::Error),
    #[error("Unexpected response body: {0}")]
    InvalidResponse(String),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Failed to set up HTTP client: {0}")]
    ClientSetup(#[source] reqwest::Error),
}

impl ApiError {
    pub fn is_session_expired(&self) -> bool {
        matches!(self, ApiError::SessionExpired)
    }

    /// Text a screen can put straight into an alert.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Unauthenticated(_) => "Please sign in to continue.".into(),
            ApiError::SessionExpired => "Please log in again to continue.".into(),
            ApiError::RequestFailed { message, .. } => message.clone(),
            ApiError::NetworkFailure(_) => {
                "Could not reach the server. Check your connection and try again.".into()
            }
            ApiError::InvalidResponse(_)
            | ApiError::InvalidRequest(_)
            | ApiError::ClientSetup(_) => GENERIC_FAILURE_MESSAGE.into(),
        }
    }

    pub(crate) fn from_error_body(status: StatusCode, body: &[u8]) -> Self {
        ApiError::RequestFailed {
            status,
            message: extract_message(body).unwrap_or_else(|| GENERIC_FAILURE_MESSAGE.into()),
        }
    }
}

impl From<SessionError> for ApiError {
    fn from(value: SessionError) -> Self {
        ApiError::Unauthenticated(value.to_string())
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<serde_json::Value>,
    detail: Option<serde_json::Value>,
}

/// Endpoints disagree on `message` vs `detail`; `message` wins when both exist.
fn extract_message(body: &[u8]) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_slice(body).ok()?;
    [parsed.message, parsed.detail]
        .into_iter()
        .flatten()
        .find_map(|value| match value {
            serde_json::Value::String(text) if !text.trim().is_empty() => Some(text),
            _ => None,
        })
}
