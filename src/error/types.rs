//! Main error type for the Gen AI transport layer.

use thiserror::Error;

use super::categories::*;
use super::mapper::ApiError;
use crate::transport::TransportError;

/// Result type alias for Gen AI operations.
pub type GenAiResult<T> = Result<T, GenAiError>;

/// Top-level error type for the Gen AI integration.
#[derive(Error, Debug, Clone)]
pub enum GenAiError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Request error: {0}")]
    Request(#[from] RequestError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Stream error: {0}")]
    Stream(#[from] StreamError),

    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("Response error: {0}")]
    Response(#[from] ResponseError),
}

impl GenAiError {
    /// Returns true if a caller-side retry policy may retry this error.
    ///
    /// This layer never retries on its own.
    pub fn is_retryable(&self) -> bool {
        match self {
            GenAiError::Transport(TransportError::Timeout | TransportError::Connection(_)) => true,
            GenAiError::Api(api) => api.is_server_error() || api.code == Some(429),
            _ => false,
        }
    }

    /// Returns the service status code, if the error came from the service.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            GenAiError::Api(api) => api.code,
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_error_is_retryable() {
        let timeout = GenAiError::Transport(TransportError::Timeout);
        assert!(timeout.is_retryable());

        let server = GenAiError::Api(ApiError::new(Some(503), json!({})));
        assert!(server.is_retryable());

        let throttled = GenAiError::Api(ApiError::new(Some(429), json!({})));
        assert!(throttled.is_retryable());

        let client = GenAiError::Api(ApiError::new(Some(400), json!({})));
        assert!(!client.is_retryable());

        let config = GenAiError::Configuration(ConfigurationError::MissingApiKey);
        assert!(!config.is_retryable());

        let stream = GenAiError::Stream(StreamError::UnsupportedStreamType);
        assert!(!stream.is_retryable());
    }

    #[test]
    fn test_status_code() {
        let error = GenAiError::Api(ApiError::new(Some(404), json!({})));
        assert_eq!(error.status_code(), Some(404));

        let error = GenAiError::Request(RequestError::InvalidBody {
            message: "bad".into(),
        });
        assert_eq!(error.status_code(), None);
    }
}
