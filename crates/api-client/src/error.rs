//! Error types for API calls
//!
//! `AuthExpired` and `RequestFailed` carry a message meant for the end user,
//! so their Display output is the bare message. Message extraction lives here
//! so the JSON and download variants classify error bodies the same way.

use reqwest::StatusCode;
use reqwest::header::{CONTENT_TYPE, HeaderMap};

use crate::transport::TransportError;

/// Shown when a session cannot be renewed and the server gave no message.
pub const SESSION_EXPIRED_MESSAGE: &str = "Sessão expirada. Por favor, faça login novamente.";

/// Errors from API calls.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// 401 on an auth-required call and the session refresh failed.
    #[error("{0}")]
    AuthExpired(String),

    /// Any other non-2xx response.
    #[error("{message}")]
    RequestFailed { status: StatusCode, message: String },

    /// No response was received at all.
    #[error("network failure: {0}")]
    Network(#[from] TransportError),

    /// 2xx response whose body does not match the expected type.
    #[error("invalid response body: {0}")]
    Decode(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl Error {
    /// HTTP status for `RequestFailed`, `None` otherwise.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::RequestFailed { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Error::AuthExpired(_))
    }
}

/// Result alias for API calls.
pub type Result<T> = std::result::Result<T, Error>;

/// Fallback message embedding the numeric status.
pub(crate) fn status_message(status: StatusCode) -> String {
    format!("HTTP error! status: {}", status.as_u16())
}

/// `message` field of a JSON error body, if the body parses and has one.
pub(crate) fn json_message(body: &[u8]) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(body).ok()?;
    value
        .get("message")
        .and_then(|m| m.as_str())
        .filter(|m| !m.is_empty())
        .map(str::to_owned)
}

/// Message for a failed JSON call.
pub(crate) fn request_failed(status: StatusCode, body: &[u8]) -> Error {
    let message = json_message(body).unwrap_or_else(|| status_message(status));
    Error::RequestFailed { status, message }
}

/// Message for a failed download. Non-JSON bodies are shown as text.
pub(crate) fn download_failed(status: StatusCode, headers: &HeaderMap, body: &[u8]) -> Error {
    let is_json = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.contains("application/json"));

    let message = if is_json {
        json_message(body)
    } else {
        std::str::from_utf8(body)
            .ok()
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(str::to_owned)
    };

    Error::RequestFailed {
        status,
        message: message.unwrap_or_else(|| status_message(status)),
    }
}

/// `AuthExpired` built from the original 401 body.
pub(crate) fn auth_expired(body: &[u8]) -> Error {
    Error::AuthExpired(json_message(body).unwrap_or_else(|| SESSION_EXPIRED_MESSAGE.to_owned()))
}
