//! HTTP response parser.
//!
//! Decodes successful buffered bodies and maps error responses to
//! [`ApiError`].

use serde::de::DeserializeOwned;

use super::http::HttpResponse;
use crate::error::{ApiError, GenAiError, ResponseError};
use crate::types::Headers;

/// Parser for buffered HTTP responses.
pub struct ResponseParser;

impl ResponseParser {
    /// Parses a successful HTTP response into the expected type.
    ///
    /// Non-2xx responses become [`GenAiError::Api`].
    pub fn parse_response<T: DeserializeOwned>(response: HttpResponse) -> Result<T, GenAiError> {
        if !response.is_success() {
            return Err(Self::parse_error_response(response).into());
        }

        serde_json::from_slice(&response.body).map_err(|e| {
            ResponseError::Deserialization {
                message: e.to_string(),
                body: String::from_utf8_lossy(&response.body).into_owned(),
            }
            .into()
        })
    }

    /// Maps an error response to an [`ApiError`].
    pub fn parse_error_response(response: HttpResponse) -> ApiError {
        Self::error_from_parts(response.status, &response.headers, &response.body)
    }

    /// Maps an error status, headers and body to an [`ApiError`].
    pub fn error_from_parts(status: u16, headers: &Headers, body: &[u8]) -> ApiError {
        let error = ApiError::from_response(status, body);

        match Self::extract_request_id(headers) {
            Some(id) => tracing::debug!(
                request_id = %id,
                status,
                error = %error,
                "API error occurred"
            ),
            None => tracing::debug!(status, error = %error, "API error occurred"),
        }

        error
    }

    /// Extracts the request ID from response headers for debugging.
    pub fn extract_request_id(headers: &Headers) -> Option<String> {
        let possible_headers = ["x-request-id", "x-goog-request-id", "request-id"];

        headers
            .iter()
            .find(|(key, _)| {
                possible_headers
                    .iter()
                    .any(|candidate| key.eq_ignore_ascii_case(candidate))
            })
            .map(|(_, value)| value.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiErrorKind;
    use bytes::Bytes;
    use serde::Deserialize;
    use std::collections::HashMap;

    #[derive(Deserialize, Debug, PartialEq)]
    struct TestResponse {
        name: String,
        value: i32,
    }

    fn create_response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: HashMap::new(),
            body: Bytes::from(body.to_string()),
        }
    }

    #[test]
    fn test_parse_successful_response() {
        let response = create_response(200, r#"{"name":"test","value":42}"#);
        let parsed: TestResponse = ResponseParser::parse_response(response).unwrap();

        assert_eq!(parsed.name, "test");
        assert_eq!(parsed.value, 42);
    }

    #[test]
    fn test_parse_malformed_success_body() {
        let response = create_response(200, r#"{"name":"test""#);
        let error = ResponseParser::parse_response::<TestResponse>(response).unwrap_err();

        assert!(matches!(
            error,
            GenAiError::Response(ResponseError::Deserialization { .. })
        ));
    }

    #[test]
    fn test_parse_400_client_error() {
        let response = create_response(
            400,
            r#"{"error":{"code":400,"message":"Invalid request","status":"INVALID_ARGUMENT"}}"#,
        );
        let error = ResponseParser::parse_response::<TestResponse>(response).unwrap_err();

        match error {
            GenAiError::Api(api) => {
                assert_eq!(api.kind, ApiErrorKind::Client);
                assert_eq!(api.code, Some(400));
                assert_eq!(api.status.as_deref(), Some("INVALID_ARGUMENT"));
                assert_eq!(api.message.as_deref(), Some("Invalid request"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_parse_500_non_json_body() {
        let response = create_response(500, "upstream exploded");
        let error = ResponseParser::parse_error_response(response);

        assert_eq!(error.kind, ApiErrorKind::Server);
        assert_eq!(error.message.as_deref(), Some("upstream exploded"));
        assert_eq!(error.status.as_deref(), Some("Internal Server Error"));
    }

    #[test]
    fn test_extract_request_id() {
        let mut headers = HashMap::new();
        headers.insert("X-Request-ID".to_string(), "xyz789".to_string());

        assert_eq!(
            ResponseParser::extract_request_id(&headers),
            Some("xyz789".to_string())
        );
    }

    #[test]
    fn test_extract_request_id_missing() {
        assert_eq!(ResponseParser::extract_request_id(&HashMap::new()), None);
    }
}
