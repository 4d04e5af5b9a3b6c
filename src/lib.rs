//! # Google Generative AI transport client
//!
//! Rust client for the Gemini Developer API and Vertex AI. Both backends share
//! a request/response shape and differ in base URL, API version and
//! authentication.
//!
//! ## Features
//!
//! - Layered HTTP options: client-level defaults patched by per-call overrides
//! - Identification headers (`user-agent`, `x-goog-api-client`) accumulated
//!   across layers
//! - Server-side timeout header and wire timeout derived from one setting
//! - Streaming responses decoded into JSON units over two backend shapes,
//!   with guaranteed release of the underlying connection
//! - Configuration from code or the `GOOGLE_*` / `GEMINI_*` environment
//! - Secure credential handling with `SecretString`
//! - Mock transport and mock stream backends for testing
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use integrations_genai::{ApiClient, HttpMethod, HttpOptions};
//! use secrecy::SecretString;
//! use serde_json::Value;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = ApiClient::builder()
//!         .api_key(SecretString::new("your-api-key".into()))
//!         .http_options(HttpOptions::default().with_timeout(30_000))
//!         .build()?;
//!
//!     // Or create from environment variables
//!     // let client = ApiClient::from_env()?;
//!
//!     let model: Value = client
//!         .request::<Value, _>(HttpMethod::Get, "models/gemini-2.0-flash", None, None)
//!         .await?;
//!     println!("{model}");
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - `client` - Main client and builder
//! - `config` - Backend and credential resolution
//! - `auth` - API key injection
//! - `transport` - Options merging, request building, HTTP transport
//! - `streaming` - Backend dispatch and stream decoding
//! - `error` - Error types and taxonomy
//! - `types` - HTTP option records

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod streaming;
pub mod transport;
pub mod types;

// Development/testing modules - always available for integration tests
pub mod mocks;

pub use auth::{ApiKeyAuthManager, AuthManager, NoAuthManager};
pub use client::{ApiClient, ApiClientBuilder};
pub use config::{
    AuthMethod, Backend, BaseUrlDefaults, ClientConfig, ClientConfigBuilder, EnvSource,
    ProcessEnv, GEMINI_API_VERSION, GEMINI_BASE_URL, VERTEX_API_VERSION, VERTEX_GLOBAL_BASE_URL,
};
pub use error::{
    ApiError, ApiErrorKind, ConfigurationError, GenAiError, GenAiResult, RequestError,
    ResponseError, StreamError,
};
pub use streaming::{
    BackendCapabilities, BackendDispatcher, LineIterResponse, ReadLineResponse, ResponseStream,
    ResponseStreamDecoder,
};
pub use transport::{
    merge_headers, patch_http_options, ChunkedStream, HttpMethod, HttpRequest, HttpResponse,
    HttpTransport, ReqwestTransport, RequestBuilder, ResponseParser, StreamingResponse,
    TransportError,
};
pub use types::{Headers, HttpOptions, HttpRetryOptions};
