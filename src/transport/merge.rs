//! Layering of HTTP options.
//!
//! Two layers meet here: the client-level base options and a per-call patch.
//! Plain headers follow last-writer-wins. The identification headers in
//! [`RESERVED_HEADERS`] accumulate instead, so telemetry reflects every layer
//! that contributed to a call.

use once_cell::sync::Lazy;

use crate::types::{Headers, HttpOptions};

/// Identification header carrying the SDK user agent.
pub const USER_AGENT_HEADER: &str = "user-agent";

/// Identification header carrying the API client label.
pub const API_CLIENT_HEADER: &str = "x-goog-api-client";

/// Headers whose values are joined rather than overwritten on merge.
pub const RESERVED_HEADERS: [&str; 2] = [USER_AGENT_HEADER, API_CLIENT_HEADER];

static LIBRARY_LABEL: Lazy<String> =
    Lazy::new(|| format!("integrations-genai/{} gl-rust", env!("CARGO_PKG_VERSION")));

/// Label identifying this SDK in the identification headers.
pub fn library_label() -> &'static str {
    LIBRARY_LABEL.as_str()
}

/// Merges two header mappings.
///
/// For reserved keys present in both inputs the result is
/// `"<client>, <config>"`. For every other key the `config` value wins.
/// Keys present in only one input pass through unchanged, and two absent
/// inputs give an empty mapping.
pub fn merge_headers(client: Option<&Headers>, config: Option<&Headers>) -> Headers {
    let mut merged = client.cloned().unwrap_or_default();

    for (key, value) in config.into_iter().flatten() {
        match merged.get_mut(key) {
            Some(existing) if RESERVED_HEADERS.contains(&key.as_str()) => {
                *existing = format!("{existing}, {value}");
            }
            _ => {
                merged.insert(key.clone(), value.clone());
            }
        }
    }

    merged
}

/// Ensures both identification headers carry the library label.
///
/// The label is prepended to an existing value that lacks it and inserted
/// when the header is missing. Calling this twice changes nothing.
pub fn append_library_version_headers(headers: &mut Headers) {
    let label = library_label();
    for key in RESERVED_HEADERS {
        match headers.get_mut(key) {
            Some(value) if value.contains(label) => {}
            Some(value) => *value = format!("{label} {value}"),
            None => {
                headers.insert(key.to_string(), label.to_string());
            }
        }
    }
}

/// Applies `patch` on top of `base`, returning a new value.
///
/// Every field set in `patch` replaces the one in `base`; empty strings count
/// as unset. Headers are merged with [`merge_headers`] (base as the client
/// layer) and then stamped with the identification headers.
pub fn patch_http_options(base: &HttpOptions, patch: &HttpOptions) -> HttpOptions {
    let mut headers = merge_headers(base.headers.as_ref(), patch.headers.as_ref());
    append_library_version_headers(&mut headers);

    HttpOptions {
        base_url: non_empty(&patch.base_url).or_else(|| base.base_url.clone()),
        api_version: non_empty(&patch.api_version).or_else(|| base.api_version.clone()),
        headers: Some(headers),
        timeout: patch.timeout.or(base.timeout),
        client_args: patch.client_args.clone().or_else(|| base.client_args.clone()),
        async_client_args: patch
            .async_client_args
            .clone()
            .or_else(|| base.async_client_args.clone()),
        extra_body: patch.extra_body.clone().or_else(|| base.extra_body.clone()),
        retry_options: patch
            .retry_options
            .clone()
            .or_else(|| base.retry_options.clone()),
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|v| !v.is_empty()).cloned()
}
