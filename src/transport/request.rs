//! HTTP request builder.
//!
//! Turns the client's base options, an optional per-call patch and the call
//! arguments into a ready-to-send [`HttpRequest`]. No I/O happens here.

use bytes::Bytes;
use serde::Serialize;
use serde_json::{Map, Value};
use std::mem;
use std::sync::Arc;
use url::Url;

use super::http::{HttpMethod, HttpRequest};
use super::merge::{append_library_version_headers, patch_http_options};
use crate::auth::{AuthManager, API_KEY_HEADER};
use crate::error::{ConfigurationError, GenAiError, RequestError};
use crate::types::{Headers, HttpOptions};

/// Header telling the server how long the client is willing to wait.
pub const SERVER_TIMEOUT_HEADER: &str = "X-Server-Timeout";

const CONTENT_TYPE_HEADER: &str = "Content-Type";

/// Builder for constructing HTTP requests.
///
/// The `RequestBuilder` handles:
/// - URL construction from base URL, API version and path
/// - Authentication via the configured auth manager
/// - Server timeout and content type headers
/// - Request body serialization and `extra_body` merging
#[derive(Clone)]
pub struct RequestBuilder {
    http_options: HttpOptions,
    auth_manager: Arc<dyn AuthManager>,
    vertex_scope: Option<(String, String)>,
}

impl RequestBuilder {
    /// Creates a request builder over resolved base options.
    pub fn new(http_options: HttpOptions, auth_manager: Arc<dyn AuthManager>) -> Self {
        Self {
            http_options,
            auth_manager,
            vertex_scope: None,
        }
    }

    /// Scopes relative paths under a Vertex AI project and location.
    pub fn with_vertex_scope(mut self, project: impl Into<String>, location: impl Into<String>) -> Self {
        self.vertex_scope = Some((project.into(), location.into()));
        self
    }

    /// Base options every request starts from.
    pub fn http_options(&self) -> &HttpOptions {
        &self.http_options
    }

    /// Options for one call: the base options patched with `overrides`.
    pub fn effective_options(&self, overrides: Option<&HttpOptions>) -> HttpOptions {
        match overrides {
            Some(patch) => patch_http_options(&self.http_options, patch),
            None => self.http_options.clone(),
        }
    }

    /// Builds the absolute URL for `path` under the given options.
    ///
    /// Adds the authentication query parameter when the auth manager uses one.
    pub fn build_url(&self, options: &HttpOptions, path: &str) -> Result<Url, GenAiError> {
        let base = options
            .base_url
            .as_deref()
            .filter(|url| !url.is_empty())
            .ok_or_else(|| ConfigurationError::InvalidBaseUrl {
                url: String::new(),
                message: "base URL is not set".to_string(),
            })?;

        Url::parse(base).map_err(|e| ConfigurationError::InvalidBaseUrl {
            url: base.to_string(),
            message: e.to_string(),
        })?;

        let path = self.scoped_path(path.trim_start_matches('/'));
        let mut joined = base.trim_end_matches('/').to_string();
        if let Some(version) = options.api_version.as_deref().filter(|v| !v.is_empty()) {
            joined.push('/');
            joined.push_str(version);
        }
        joined.push('/');
        joined.push_str(&path);

        let mut url = Url::parse(&joined).map_err(|e| RequestError::InvalidPath {
            path: path.clone(),
            message: e.to_string(),
        })?;

        if let Some((key, value)) = self.auth_manager.get_auth_query_param() {
            url.query_pairs_mut().append_pair(&key, &value);
        }

        Ok(url)
    }

    /// Builds an HTTP request.
    ///
    /// `overrides` is patched over the base options for this call only.
    pub fn build_request<T: Serialize>(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<&T>,
        overrides: Option<&HttpOptions>,
    ) -> Result<HttpRequest, GenAiError> {
        let options = self.effective_options(overrides);
        options.validate()?;

        let url = self.build_url(&options, path)?;
        let mut headers = options.headers.clone().unwrap_or_default();
        append_library_version_headers(&mut headers);

        if let Some(timeout_ms) = options.effective_timeout() {
            if !has_header(&headers, SERVER_TIMEOUT_HEADER) {
                headers.insert(
                    SERVER_TIMEOUT_HEADER.to_string(),
                    server_timeout_secs(timeout_ms).to_string(),
                );
            }
        }

        if let Some((key, value)) = self.auth_manager.get_auth_header() {
            if !has_header(&headers, API_KEY_HEADER) {
                headers.insert(key, value);
            }
        }

        let body = build_body(body, options.extra_body.as_ref())?;
        if body.is_some() && !has_header(&headers, CONTENT_TYPE_HEADER) {
            headers.insert(CONTENT_TYPE_HEADER.to_string(), "application/json".to_string());
        }

        let mut logged_url = url.clone();
        logged_url.set_query(None);
        tracing::debug!(method = %method, url = %logged_url, "Built request");

        Ok(HttpRequest {
            method,
            url: url.to_string(),
            headers,
            body,
            timeout: options.timeout_duration(),
            retry_options: options.retry_options,
        })
    }

    /// Builds a request for a server-sent events endpoint (`alt=sse`).
    pub fn build_streaming_request<T: Serialize>(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<&T>,
        overrides: Option<&HttpOptions>,
    ) -> Result<HttpRequest, GenAiError> {
        let mut request = self.build_request(method, path, body, overrides)?;

        let mut url = Url::parse(&request.url).map_err(|e| RequestError::InvalidPath {
            path: path.to_string(),
            message: e.to_string(),
        })?;
        url.query_pairs_mut().append_pair("alt", "sse");
        request.url = url.to_string();

        Ok(request)
    }

    fn scoped_path(&self, path: &str) -> String {
        match &self.vertex_scope {
            Some((project, location))
                if !path.starts_with("projects/") && !path.starts_with("publishers/") =>
            {
                format!("projects/{project}/locations/{location}/{path}")
            }
            _ => path.to_string(),
        }
    }
}

/// Whole seconds sent in [`SERVER_TIMEOUT_HEADER`] for a timeout in
/// milliseconds. Partial seconds round up.
pub fn server_timeout_secs(timeout_ms: u64) -> u64 {
    timeout_ms.div_ceil(1000)
}

fn has_header(headers: &Headers, name: &str) -> bool {
    headers.keys().any(|key| key.eq_ignore_ascii_case(name))
}

fn build_body<T: Serialize>(
    body: Option<&T>,
    extra_body: Option<&Map<String, Value>>,
) -> Result<Option<Bytes>, RequestError> {
    let value = match (body, extra_body) {
        (None, None) => return Ok(None),
        (None, Some(extra)) => Value::Object(extra.clone()),
        (Some(body), extra) => {
            let mut value = serde_json::to_value(body).map_err(|e| RequestError::InvalidBody {
                message: e.to_string(),
            })?;
            if let Some(extra) = extra {
                match &mut value {
                    Value::Object(target) => merge_extra_body(target, extra),
                    _ => {
                        return Err(RequestError::InvalidBody {
                            message: "extra_body requires a JSON object body".to_string(),
                        })
                    }
                }
            }
            value
        }
    };

    let bytes = serde_json::to_vec(&value).map_err(|e| RequestError::InvalidBody {
        message: e.to_string(),
    })?;
    Ok(Some(Bytes::from(bytes)))
}

/// Deep-merges `extra` into `target`. Nested objects merge key by key; any
/// other value replaces the target's.
pub(crate) fn merge_extra_body(target: &mut Map<String, Value>, extra: &Map<String, Value>) {
    for (key, value) in extra {
        match (target.get_mut(key), value) {
            (Some(Value::Object(existing)), Value::Object(nested)) => {
                merge_extra_body(existing, nested);
            }
            (Some(existing), _) => {
                if !existing.is_null() && mem::discriminant(existing) != mem::discriminant(value) {
                    tracing::warn!(
                        key = %key,
                        "extra_body value type differs from the request body; overwriting"
                    );
                }
                *existing = value.clone();
            }
            (None, _) => {
                target.insert(key.clone(), value.clone());
            }
        }
    }
}
