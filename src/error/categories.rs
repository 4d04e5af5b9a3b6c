//! Error category types for granular error handling.

use thiserror::Error;

/// Configuration-related errors.
///
/// Raised while resolving client configuration or merging/building request
/// options, never while a response stream is being consumed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    #[error("Missing API key. Set GOOGLE_API_KEY or GEMINI_API_KEY, or pass an API key")]
    MissingApiKey,

    #[error("Project and location are required for Vertex AI unless an API key or base URL is provided")]
    MissingProjectOrLocation,

    #[error("{message}")]
    MutuallyExclusiveOptions { message: String },

    #[error("Unsupported option: {message}")]
    UnsupportedOption { message: String },

    #[error("Invalid base URL: {url} ({message})")]
    InvalidBaseUrl { url: String, message: String },

    #[error("Invalid HTTP options: {message}")]
    InvalidHttpOptions { message: String },

    #[error("Invalid client args: {message}")]
    InvalidClientArgs { message: String },

    #[error("Invalid retry options: {message}")]
    InvalidRetryOptions { message: String },
}

/// Request construction errors, raised before any I/O.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RequestError {
    #[error("Invalid request path '{path}': {message}")]
    InvalidPath { path: String, message: String },

    #[error("Invalid request body: {message}")]
    InvalidBody { message: String },
}

/// Response stream handling errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StreamError {
    #[error(
        "Expected the response stream to be a line-iterator response (poll_next_line + close) \
         or a read-line response (poll_read_line + release)"
    )]
    UnsupportedStreamType,
}

/// Response decoding errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResponseError {
    #[error("Failed to deserialize response: {message}")]
    Deserialization { message: String, body: String },
}
