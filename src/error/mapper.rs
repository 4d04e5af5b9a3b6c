//! Mapping of non-success HTTP responses to [`ApiError`].
//!
//! The service reports failures as JSON. Fields may appear at the top level
//! or nested under `"error"`; top-level values take precedence:
//!
//! ```json
//! {"error": {"code": 400, "message": "...", "status": "INVALID_ARGUMENT"}}
//! ```

use serde_json::{json, Value};
use std::fmt;

/// Broad class of an API error, derived from the status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    /// 4xx responses.
    Client,
    /// 5xx responses.
    Server,
    /// Anything else, including responses without a code.
    Unknown,
}

impl ApiErrorKind {
    /// Classifies a status code.
    pub fn from_code(code: Option<u16>) -> Self {
        match code {
            Some(400..=499) => Self::Client,
            Some(500..=599) => Self::Server,
            _ => Self::Unknown,
        }
    }
}

/// Error returned by the remote service.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiError {
    /// Error class.
    pub kind: ApiErrorKind,
    /// HTTP or RPC status code.
    pub code: Option<u16>,
    /// Canonical status string, e.g. `INVALID_ARGUMENT`.
    pub status: Option<String>,
    /// Human-readable message.
    pub message: Option<String>,
    /// The full error payload.
    pub details: Value,
}

impl ApiError {
    /// Builds an error from an optional explicit code and the JSON payload.
    pub fn new(code: Option<u16>, details: Value) -> Self {
        let code = code.or_else(|| {
            lookup(&details, "code")
                .and_then(Value::as_u64)
                .and_then(|c| u16::try_from(c).ok())
        });
        let status = lookup(&details, "status")
            .and_then(Value::as_str)
            .map(str::to_string);
        let message = lookup(&details, "message")
            .and_then(Value::as_str)
            .map(str::to_string);

        Self {
            kind: ApiErrorKind::from_code(code),
            code,
            status,
            message,
            details,
        }
    }

    /// Builds an error from an HTTP status and raw response body.
    ///
    /// A body that is not JSON becomes `{"message": <body>, "status": <reason>}`.
    pub fn from_response(status: u16, body: &[u8]) -> Self {
        let details = serde_json::from_slice::<Value>(body).unwrap_or_else(|_| {
            let reason = reqwest::StatusCode::from_u16(status)
                .ok()
                .and_then(|s| s.canonical_reason())
                .unwrap_or_default();
            json!({
                "message": String::from_utf8_lossy(body),
                "status": reason,
            })
        });
        Self::new(Some(status), details)
    }

    /// True for 4xx errors.
    pub fn is_client_error(&self) -> bool {
        self.kind == ApiErrorKind::Client
    }

    /// True for 5xx errors.
    pub fn is_server_error(&self) -> bool {
        self.kind == ApiErrorKind::Server
    }
}

fn lookup<'a>(details: &'a Value, key: &str) -> Option<&'a Value> {
    details
        .get(key)
        .or_else(|| details.get("error").and_then(|inner| inner.get(key)))
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "{code}")?,
            None => f.write_str("unknown")?,
        }
        if let Some(status) = &self.status {
            write!(f, " {status}")?;
        }
        write!(f, ". {}", self.message.as_deref().unwrap_or("no message"))
    }
}

impl std::error::Error for ApiError {}
