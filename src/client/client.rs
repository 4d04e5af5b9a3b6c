//! Main client implementation.

use bytes::BytesMut;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::any::Any;
use std::sync::Arc;

use crate::auth::auth_manager_for;
use crate::config::ClientConfig;
use crate::error::{GenAiError, GenAiResult};
use crate::streaming::{BackendDispatcher, ResponseStreamDecoder};
use crate::transport::{HttpMethod, HttpRequest, HttpTransport, RequestBuilder, ResponseParser};
use crate::types::HttpOptions;

use super::builder::ApiClientBuilder;

/// Client for the Gemini Developer API and Vertex AI.
///
/// Holds the resolved configuration, the transport and the streaming
/// backend dispatcher. Every call starts from the client's base HTTP
/// options, optionally patched by per-call overrides.
///
/// # Example
///
/// ```no_run
/// use integrations_genai::ApiClient;
/// use integrations_genai::transport::HttpMethod;
/// use futures::StreamExt;
/// use secrecy::SecretString;
/// use serde_json::json;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = ApiClient::builder()
///     .api_key(SecretString::new("your-api-key".into()))
///     .build()?;
///
/// let body = json!({"contents": [{"parts": [{"text": "Hello"}]}]});
/// let mut units = client
///     .request_streamed(
///         HttpMethod::Post,
///         "models/gemini-2.0-flash:streamGenerateContent",
///         Some(&body),
///         None,
///     )
///     .await?;
///
/// while let Some(unit) = units.next().await {
///     println!("{}", unit?);
/// }
/// # Ok(())
/// # }
/// ```
pub struct ApiClient {
    config: ClientConfig,
    transport: Arc<dyn HttpTransport>,
    request_builder: RequestBuilder,
    dispatcher: BackendDispatcher,
}

impl ApiClient {
    /// Creates a new client builder.
    pub fn builder() -> ApiClientBuilder {
        ApiClientBuilder::new()
    }

    /// Creates a client configured from environment variables.
    pub fn from_env() -> GenAiResult<Self> {
        Self::builder().build()
    }

    /// Creates a client from a resolved configuration.
    pub fn new(config: ClientConfig) -> GenAiResult<Self> {
        ApiClientBuilder::from_config(config).build()
    }

    pub(super) fn from_parts(
        config: ClientConfig,
        transport: Arc<dyn HttpTransport>,
        dispatcher: BackendDispatcher,
    ) -> Self {
        let mut request_builder =
            RequestBuilder::new(config.http_options.clone(), auth_manager_for(&config));
        if let Some((project, location)) = config.vertex_scope() {
            request_builder = request_builder.with_vertex_scope(project, location);
        }

        Self {
            config,
            transport,
            request_builder,
            dispatcher,
        }
    }

    /// Returns the client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Base HTTP options every request starts from.
    pub fn http_options(&self) -> &HttpOptions {
        self.request_builder.http_options()
    }

    /// True when the client talks to Vertex AI.
    pub fn is_vertexai(&self) -> bool {
        self.config.is_vertexai()
    }

    /// Streaming backend dispatcher.
    pub fn dispatcher(&self) -> &BackendDispatcher {
        &self.dispatcher
    }

    /// Builds the request a call would send, without sending it.
    pub fn build_request<B: Serialize>(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<&B>,
        overrides: Option<&HttpOptions>,
    ) -> GenAiResult<HttpRequest> {
        self.request_builder.build_request(method, path, body, overrides)
    }

    /// Sends a request and deserializes the JSON response.
    pub async fn request<B, R>(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<&B>,
        overrides: Option<&HttpOptions>,
    ) -> GenAiResult<R>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let request = self.build_request(method, path, body, overrides)?;
        let response = self.transport.send(request).await?;
        ResponseParser::parse_response(response)
    }

    /// Sends a streaming request and returns the decoded response units.
    ///
    /// An error status is read in full and returned as [`GenAiError::Api`]
    /// before any unit is decoded.
    pub async fn request_streamed<B>(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<&B>,
        overrides: Option<&HttpOptions>,
    ) -> GenAiResult<ResponseStreamDecoder>
    where
        B: Serialize + Sync,
    {
        let request = self
            .request_builder
            .build_streaming_request(method, path, body, overrides)?;
        let response = self.transport.send_streaming(request).await?;

        if !response.is_success() {
            let mut body = BytesMut::new();
            let mut chunks = response.chunks;
            while let Some(chunk) = chunks.next().await {
                body.extend_from_slice(&chunk?);
            }
            return Err(
                ResponseParser::error_from_parts(response.status, &response.headers, &body).into(),
            );
        }

        let stream = self.dispatcher.select(response.chunks);
        tracing::debug!(variant = stream.variant_name(), "Decoding response stream");
        Ok(ResponseStreamDecoder::new(stream))
    }

    /// Decodes a backend response produced outside this client.
    pub fn decode_stream(&self, raw: Box<dyn Any + Send>) -> GenAiResult<ResponseStreamDecoder> {
        Ok(ResponseStreamDecoder::from_raw(&self.dispatcher, raw)?)
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("backend", &self.config.backend)
            .field("base_url", &self.http_options().base_url)
            .field("dispatcher", &self.dispatcher)
            .finish_non_exhaustive()
    }
}
