//! Transport layer error types.

/// Transport error.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TransportError {
    /// The connection could not be established.
    #[error("Connection error: {0}")]
    Connection(String),
    /// The request or a body read timed out.
    #[error("Timeout")]
    Timeout,
    /// The request could not be sent.
    #[error("Request error: {0}")]
    Request(String),
    /// The response body failed mid-stream.
    #[error("Stream error: {0}")]
    Stream(String),
    /// A line was not valid UTF-8.
    #[error("Decode error: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout
        } else if err.is_connect() {
            TransportError::Connection(err.to_string())
        } else if err.is_body() || err.is_decode() {
            TransportError::Stream(err.to_string())
        } else {
            TransportError::Request(err.to_string())
        }
    }
}
