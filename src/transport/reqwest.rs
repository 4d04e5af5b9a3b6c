//! Reqwest-based HTTP transport implementation.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde_json::{Map, Value};
use std::time::Duration;

use super::error::TransportError;
use super::http::{HttpMethod, HttpRequest, HttpResponse, HttpTransport, StreamingResponse};
use crate::error::ConfigurationError;
use crate::types::{Headers, HttpOptions};

/// Reqwest-based HTTP transport.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Create a transport with default client settings.
    pub fn new() -> Result<Self, ConfigurationError> {
        Self::from_client_args(None)
    }

    /// Wrap an already configured client.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Create a transport from the client arguments in `options`.
    ///
    /// `async_client_args` takes precedence over `client_args`.
    pub fn from_options(options: &HttpOptions) -> Result<Self, ConfigurationError> {
        Self::from_client_args(options.effective_client_args())
    }

    fn from_client_args(args: Option<&Map<String, Value>>) -> Result<Self, ConfigurationError> {
        let mut builder = Client::builder();

        for (key, value) in args.into_iter().flatten() {
            builder = match key.as_str() {
                "connect_timeout" => builder.connect_timeout(Duration::from_millis(as_u64(key, value)?)),
                "pool_max_idle_per_host" => {
                    let max = usize::try_from(as_u64(key, value)?).map_err(|e| {
                        ConfigurationError::InvalidClientArgs {
                            message: format!("{key}: {e}"),
                        }
                    })?;
                    builder.pool_max_idle_per_host(max)
                }
                "pool_idle_timeout" => {
                    builder.pool_idle_timeout(Duration::from_millis(as_u64(key, value)?))
                }
                "http2_prior_knowledge" => {
                    if as_bool(key, value)? {
                        builder.http2_prior_knowledge()
                    } else {
                        builder
                    }
                }
                "http1_only" => {
                    if as_bool(key, value)? {
                        builder.http1_only()
                    } else {
                        builder
                    }
                }
                "user_agent" => builder.user_agent(as_str(key, value)?),
                other => {
                    return Err(ConfigurationError::InvalidClientArgs {
                        message: format!("unknown client argument '{other}'"),
                    })
                }
            };
        }

        let client = builder
            .build()
            .map_err(|e| ConfigurationError::InvalidClientArgs {
                message: format!("Failed to create HTTP client: {e}"),
            })?;

        Ok(Self { client })
    }

    fn convert_method(method: HttpMethod) -> reqwest::Method {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }

    /// Keys that differ only in case collapse to one header; the key that
    /// sorts last (the lower-case spelling) wins.
    fn convert_headers(headers: &Headers) -> Result<reqwest::header::HeaderMap, TransportError> {
        let mut sorted: Vec<_> = headers.iter().collect();
        sorted.sort_unstable_by(|a, b| a.0.cmp(b.0));

        let mut header_map = reqwest::header::HeaderMap::new();
        for (key, value) in sorted {
            let name = reqwest::header::HeaderName::from_bytes(key.as_bytes())
                .map_err(|e| TransportError::Request(format!("invalid header name '{key}': {e}")))?;
            let value = reqwest::header::HeaderValue::from_str(value)
                .map_err(|e| TransportError::Request(format!("invalid value for header '{key}': {e}")))?;
            header_map.insert(name, value);
        }
        Ok(header_map)
    }

    fn extract_headers(headers: &reqwest::header::HeaderMap) -> Headers {
        headers
            .iter()
            .filter_map(|(name, value)| {
                value.to_str().ok().map(|v| (name.to_string(), v.to_string()))
            })
            .collect()
    }

    async fn execute(&self, request: HttpRequest) -> Result<reqwest::Response, TransportError> {
        let headers = Self::convert_headers(&request.headers)?;

        let mut req_builder = self
            .client
            .request(Self::convert_method(request.method), &request.url)
            .headers(headers);

        if let Some(timeout) = request.timeout {
            req_builder = req_builder.timeout(timeout);
        }
        if let Some(body) = request.body {
            req_builder = req_builder.body(body);
        }

        Ok(req_builder.send().await?)
    }
}

fn as_u64(key: &str, value: &Value) -> Result<u64, ConfigurationError> {
    value.as_u64().ok_or_else(|| ConfigurationError::InvalidClientArgs {
        message: format!("{key} must be a non-negative integer"),
    })
}

fn as_bool(key: &str, value: &Value) -> Result<bool, ConfigurationError> {
    value.as_bool().ok_or_else(|| ConfigurationError::InvalidClientArgs {
        message: format!("{key} must be a boolean"),
    })
}

fn as_str<'a>(key: &str, value: &'a Value) -> Result<&'a str, ConfigurationError> {
    value.as_str().ok_or_else(|| ConfigurationError::InvalidClientArgs {
        message: format!("{key} must be a string"),
    })
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let response = self.execute(request).await?;

        let status = response.status().as_u16();
        let headers = Self::extract_headers(response.headers());
        let body = response.bytes().await?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }

    async fn send_streaming(&self, request: HttpRequest) -> Result<StreamingResponse, TransportError> {
        let response = self.execute(request).await?;

        let status = response.status().as_u16();
        let headers = Self::extract_headers(response.headers());
        let chunks = Box::pin(response.bytes_stream().map(|result| {
            result.map_err(|e| {
                if e.is_timeout() {
                    TransportError::Timeout
                } else {
                    TransportError::Stream(e.to_string())
                }
            })
        }));

        Ok(StreamingResponse {
            status,
            headers,
            chunks,
        })
    }
}
