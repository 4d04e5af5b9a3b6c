//! HTTP configuration records shared by every request layer.
//!
//! `HttpOptions` is used both as a fully resolved base configuration (held by
//! the client) and as a sparse per-call patch. All fields are optional so a
//! patch only names what it overrides.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::time::Duration;

use crate::error::ConfigurationError;

/// Header mapping. Keys are kept exactly as supplied (case-sensitive).
pub type Headers = HashMap<String, String>;

/// Retry policy carried alongside a request.
///
/// This crate only plumbs the policy through to the effective request; the
/// layer that wraps whole operations decides whether and how to retry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HttpRetryOptions {
    /// Total number of attempts, including the first one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attempts: Option<u32>,
    /// Initial backoff delay in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_delay: Option<f64>,
    /// Upper bound for a single backoff delay in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_delay: Option<f64>,
    /// Exponential growth factor between attempts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp_base: Option<f64>,
    /// Random jitter added to each delay, in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jitter: Option<f64>,
    /// HTTP status codes that should be retried.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_status_codes: Option<Vec<u16>>,
}

impl HttpRetryOptions {
    /// Creates retry options with only the attempt count set.
    pub fn with_attempts(attempts: u32) -> Self {
        Self {
            attempts: Some(attempts),
            ..Self::default()
        }
    }

    /// Checks that the backoff parameters describe a usable policy.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.attempts == Some(0) {
            return Err(ConfigurationError::InvalidRetryOptions {
                message: "attempts must be at least 1".to_string(),
            });
        }

        let non_negative = [
            ("initial_delay", self.initial_delay),
            ("max_delay", self.max_delay),
            ("jitter", self.jitter),
        ];
        for (name, value) in non_negative {
            if let Some(value) = value {
                if !value.is_finite() || value < 0.0 {
                    return Err(ConfigurationError::InvalidRetryOptions {
                        message: format!("{name} must be a non-negative number, got {value}"),
                    });
                }
            }
        }

        if let Some(exp_base) = self.exp_base {
            if !exp_base.is_finite() || exp_base <= 0.0 {
                return Err(ConfigurationError::InvalidRetryOptions {
                    message: format!("exp_base must be positive, got {exp_base}"),
                });
            }
        }

        Ok(())
    }
}

/// HTTP options for a client or a single call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HttpOptions {
    /// Base URL of the service, e.g. `https://generativelanguage.googleapis.com/`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// API version segment inserted between the base URL and the path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    /// Additional request headers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<Headers>,
    /// Request timeout in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
    /// Arguments used to construct the HTTP client.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_args: Option<Map<String, Value>>,
    /// Arguments used to construct the async HTTP client. Take precedence over
    /// `client_args` when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub async_client_args: Option<Map<String, Value>>,
    /// Extra fields deep-merged into every JSON request body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra_body: Option<Map<String, Value>>,
    /// Retry policy. Absent means "do not retry".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_options: Option<HttpRetryOptions>,
}

impl HttpOptions {
    /// Parses options from a loosely typed JSON object.
    ///
    /// Unknown keys are rejected with an error naming the offending key.
    pub fn from_value(value: Value) -> Result<Self, ConfigurationError> {
        let options: Self = serde_json::from_value(value).map_err(|e| {
            ConfigurationError::InvalidHttpOptions {
                message: e.to_string(),
            }
        })?;
        options.validate()?;
        Ok(options)
    }

    /// Validates nested option records.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if let Some(retry) = &self.retry_options {
            retry.validate()?;
        }
        Ok(())
    }

    /// Sets the base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Sets the API version.
    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = Some(api_version.into());
        self
    }

    /// Adds a single header, creating the header map if needed.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .get_or_insert_with(Headers::new)
            .insert(name.into(), value.into());
        self
    }

    /// Replaces the header map.
    pub fn with_headers(mut self, headers: Headers) -> Self {
        self.headers = Some(headers);
        self
    }

    /// Sets the timeout in milliseconds.
    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout = Some(timeout_ms);
        self
    }

    /// Sets the client construction arguments.
    pub fn with_client_args(mut self, args: Map<String, Value>) -> Self {
        self.client_args = Some(args);
        self
    }

    /// Sets the async client construction arguments.
    pub fn with_async_client_args(mut self, args: Map<String, Value>) -> Self {
        self.async_client_args = Some(args);
        self
    }

    /// Sets the extra body fields.
    pub fn with_extra_body(mut self, extra_body: Map<String, Value>) -> Self {
        self.extra_body = Some(extra_body);
        self
    }

    /// Sets the retry policy.
    pub fn with_retry_options(mut self, retry_options: HttpRetryOptions) -> Self {
        self.retry_options = Some(retry_options);
        self
    }

    /// Configured timeout in milliseconds; zero means no timeout.
    pub fn effective_timeout(&self) -> Option<u64> {
        self.timeout.filter(|ms| *ms > 0)
    }

    /// Returns the configured timeout as a `Duration`, `None` for zero.
    pub fn timeout_duration(&self) -> Option<Duration> {
        self.effective_timeout().map(Duration::from_millis)
    }

    /// Looks up a header by its exact name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .as_ref()
            .and_then(|headers| headers.get(name))
            .map(String::as_str)
    }

    /// Client arguments effective for the async transport.
    pub fn effective_client_args(&self) -> Option<&Map<String, Value>> {
        self.async_client_args.as_ref().or(self.client_args.as_ref())
    }
}
