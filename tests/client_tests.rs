//! Integration tests for client construction and end-to-end calls.

use async_trait::async_trait;
use bytes::Bytes;
use futures::{stream, StreamExt};
use integrations_genai::config::{ENV_CLOUD_LOCATION, ENV_CLOUD_PROJECT, ENV_USE_VERTEXAI};
use integrations_genai::transport::{
    HttpMethod, HttpRequest, HttpResponse, HttpTransport, StreamingResponse, TransportError,
};
use integrations_genai::{
    ApiClient, ApiErrorKind, BackendCapabilities, BaseUrlDefaults, ConfigurationError,
    GenAiError, HttpOptions,
};
use mockall::mock;
use pretty_assertions::assert_eq;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

mock! {
    pub Transport {}

    #[async_trait]
    impl HttpTransport for Transport {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
        async fn send_streaming(&self, request: HttpRequest) -> Result<StreamingResponse, TransportError>;
    }
}

fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}

fn key(value: &str) -> SecretString {
    SecretString::new(value.to_string())
}

fn base_url(client: &ApiClient) -> &str {
    client.http_options().base_url.as_deref().unwrap_or_default()
}

// Configuration resolution

#[test]
fn test_google_api_key_wins_over_gemini_api_key() {
    // Arrange
    let vars = env(&[("GOOGLE_API_KEY", "google_key"), ("GEMINI_API_KEY", "gemini_key")]);

    // Act
    let client = ApiClient::builder().env(vars).build().unwrap();

    // Assert
    let api_key = client.config().api_key.as_ref().unwrap();
    assert_eq!(api_key.expose_secret(), "google_key");
    assert!(!client.is_vertexai());
}

#[test]
fn test_gemini_api_key_used_as_fallback() {
    let client = ApiClient::builder()
        .env(env(&[("GEMINI_API_KEY", "gemini_key")]))
        .build()
        .unwrap();

    assert_eq!(
        client.config().api_key.as_ref().unwrap().expose_secret(),
        "gemini_key"
    );
}

#[test]
fn test_vertexai_selected_from_env() {
    for flag in ["1", "true", "TRUE"] {
        let client = ApiClient::builder()
            .env(env(&[
                (ENV_USE_VERTEXAI, flag),
                (ENV_CLOUD_PROJECT, "fake_project_id"),
                (ENV_CLOUD_LOCATION, "fake-location"),
            ]))
            .build()
            .unwrap();

        assert!(client.is_vertexai());
        assert_eq!(client.config().project.as_deref(), Some("fake_project_id"));
        assert_eq!(client.config().location.as_deref(), Some("fake-location"));
        assert_eq!(base_url(&client), "https://fake-location-aiplatform.googleapis.com/");
    }
}

#[test]
fn test_empty_vertexai_configuration_fails() {
    let result = ApiClient::builder()
        .vertexai(true)
        .env(env(&[
            (ENV_CLOUD_PROJECT, ""),
            (ENV_CLOUD_LOCATION, ""),
            ("GOOGLE_API_KEY", ""),
            ("GEMINI_API_KEY", ""),
        ]))
        .build();

    assert!(matches!(
        result,
        Err(GenAiError::Configuration(ConfigurationError::MissingProjectOrLocation))
    ));
}

#[test]
fn test_base_url_override_skips_credential_checks() {
    let client = ApiClient::builder()
        .vertexai(true)
        .http_options(HttpOptions::default().with_base_url("https://override.com/"))
        .env(HashMap::new())
        .build()
        .unwrap();

    assert!(client.config().custom_base_url);
    assert_eq!(base_url(&client), "https://override.com/");
}

#[test]
fn test_project_without_location_fails() {
    let result = ApiClient::builder()
        .vertexai(true)
        .project("fake_project_id")
        .env(HashMap::new())
        .build();

    assert!(matches!(result, Err(GenAiError::Configuration(_))));
}

#[test]
fn test_api_key_with_project_is_rejected_on_vertexai() {
    let result = ApiClient::builder()
        .vertexai(true)
        .api_key(key("vertexai_api_key"))
        .project("fake_project_id")
        .location("fake-location")
        .env(HashMap::new())
        .build();

    assert!(matches!(
        result,
        Err(GenAiError::Configuration(ConfigurationError::MutuallyExclusiveOptions { .. }))
    ));
}

#[test]
fn test_project_on_gemini_api_is_rejected() {
    let result = ApiClient::builder()
        .api_key(key("fake-api_key"))
        .project("fake_project_id")
        .env(HashMap::new())
        .build();

    assert!(matches!(result, Err(GenAiError::Configuration(_))));
}

#[test]
fn test_explicit_project_wins_over_env() {
    let client = ApiClient::builder()
        .vertexai(true)
        .project("constructor_project_id")
        .location("constructor-location")
        .env(env(&[
            (ENV_CLOUD_PROJECT, "env_project_id"),
            (ENV_CLOUD_LOCATION, "env_location"),
        ]))
        .build()
        .unwrap();

    assert_eq!(client.config().project.as_deref(), Some("constructor_project_id"));
    assert_eq!(client.config().location.as_deref(), Some("constructor-location"));
    assert!(client.config().api_key.is_none());
}

#[test]
fn test_explicit_api_key_selects_express_mode() {
    let client = ApiClient::builder()
        .vertexai(true)
        .api_key(key("vertexai_api_key"))
        .env(env(&[
            (ENV_CLOUD_PROJECT, "fake_project_id"),
            (ENV_CLOUD_LOCATION, "fake-location"),
        ]))
        .build()
        .unwrap();

    assert!(client.config().project.is_none());
    assert!(client.config().location.is_none());
    assert!(client.config().vertex_scope().is_none());
    assert!(base_url(&client).contains("aiplatform"));
}

#[test]
fn test_env_project_wins_over_env_api_key() {
    let client = ApiClient::builder()
        .vertexai(true)
        .env(env(&[
            (ENV_CLOUD_PROJECT, "fake_project_id"),
            (ENV_CLOUD_LOCATION, "fake-location"),
            ("GOOGLE_API_KEY", "vertexai_api_key"),
        ]))
        .build()
        .unwrap();

    assert!(client.config().api_key.is_none());
    assert_eq!(client.config().project.as_deref(), Some("fake_project_id"));
}

#[test]
fn test_env_api_key_used_when_no_project() {
    let client = ApiClient::builder()
        .vertexai(true)
        .env(env(&[("GOOGLE_API_KEY", "vertexai_api_key")]))
        .build()
        .unwrap();

    assert_eq!(
        client.config().api_key.as_ref().unwrap().expose_secret(),
        "vertexai_api_key"
    );
    assert_eq!(base_url(&client), "https://aiplatform.googleapis.com/");
}

#[test]
fn test_global_location_uses_global_endpoint() {
    let client = ApiClient::builder()
        .vertexai(true)
        .location("global")
        .env(env(&[(ENV_CLOUD_PROJECT, "fake_project_id")]))
        .build()
        .unwrap();

    assert_eq!(base_url(&client), "https://aiplatform.googleapis.com/");
}

#[test]
fn test_base_url_precedence() {
    let vars = env(&[
        ("GOOGLE_GEMINI_BASE_URL", "https://gemini-env-base-url.com/"),
        ("GOOGLE_VERTEX_BASE_URL", "https://vertex-env-base-url.com/"),
    ]);
    let defaults = BaseUrlDefaults {
        gemini: Some("https://gemini-base-url.com/".to_string()),
        vertex: Some("https://vertex-base-url.com/".to_string()),
    };

    let from_env = ApiClient::builder()
        .api_key(key("google_api_key"))
        .env(vars.clone())
        .build()
        .unwrap();
    let from_defaults = ApiClient::builder()
        .vertexai(true)
        .project("fake_project_id")
        .location("fake-location")
        .base_url_defaults(defaults.clone())
        .env(vars.clone())
        .build()
        .unwrap();
    let from_options = ApiClient::builder()
        .api_key(key("google_api_key"))
        .base_url_defaults(defaults)
        .http_options(HttpOptions::default().with_base_url("https://gemini-constructor-base-url.com/"))
        .env(vars)
        .build()
        .unwrap();

    assert_eq!(base_url(&from_env), "https://gemini-env-base-url.com/");
    assert_eq!(base_url(&from_defaults), "https://vertex-base-url.com/");
    assert_eq!(base_url(&from_options), "https://gemini-constructor-base-url.com/");
}

#[test]
fn test_invalid_client_args_rejected_at_build() {
    let mut args = serde_json::Map::new();
    args.insert("proxy".to_string(), json!("http://localhost"));

    let result = ApiClient::builder()
        .api_key(key("k"))
        .http_options(HttpOptions::default().with_client_args(args))
        .env(HashMap::new())
        .build();

    assert!(matches!(
        result,
        Err(GenAiError::Configuration(ConfigurationError::InvalidClientArgs { .. }))
    ));
}

// End to end over the reqwest transport

async fn wiremock_client(server: &MockServer, capabilities: BackendCapabilities) -> ApiClient {
    ApiClient::builder()
        .api_key(key("test-api-key"))
        .http_options(HttpOptions::default().with_base_url(server.uri()))
        .capabilities(capabilities)
        .env(HashMap::new())
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_streamed_request_over_http_both_backends() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini:streamGenerateContent"))
        .and(query_param("alt", "sse"))
        .and(header("x-goog-api-key", "test-api-key"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            "data: {\"text\": \"Hello\"}\r\n\r\ndata: {\"text\": \" world\"}\r\n\r\n",
            "text/event-stream",
        ))
        .expect(2)
        .mount(&server)
        .await;

    for capabilities in [
        BackendCapabilities::with_read_line(),
        BackendCapabilities::line_iter_only(),
    ] {
        let client = wiremock_client(&server, capabilities).await;

        let units: Vec<Value> = client
            .request_streamed(
                HttpMethod::Post,
                "models/gemini:streamGenerateContent",
                Some(&json!({"contents": []})),
                None,
            )
            .await
            .unwrap()
            .into_json::<Value>()
            .map(|unit| unit.unwrap())
            .collect()
            .await;

        assert_eq!(units, vec![json!({"text": "Hello"}), json!({"text": " world"})]);
    }
}

#[tokio::test]
async fn test_error_status_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini:generateContent"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {"code": 400, "message": "Invalid argument", "status": "INVALID_ARGUMENT"}
        })))
        .mount(&server)
        .await;
    let client = wiremock_client(&server, BackendCapabilities::detect()).await;

    let err = client
        .request::<Value, Value>(
            HttpMethod::Post,
            "models/gemini:generateContent",
            Some(&json!({})),
            None,
        )
        .await
        .unwrap_err();

    match err {
        GenAiError::Api(api) => {
            assert_eq!(api.kind, ApiErrorKind::Client);
            assert_eq!(api.code, Some(400));
            assert_eq!(api.status.as_deref(), Some("INVALID_ARGUMENT"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_server_timeout_header_sent_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1beta/models"))
        .and(header("x-server-timeout", "30"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"models": []})))
        .expect(1)
        .mount(&server)
        .await;
    let client = wiremock_client(&server, BackendCapabilities::detect()).await;
    let overrides = HttpOptions::default().with_timeout(30_000);

    let body: Value = client
        .request::<Value, _>(HttpMethod::Get, "models", None, Some(&overrides))
        .await
        .unwrap();

    assert_eq!(body, json!({"models": []}));
}

#[tokio::test]
async fn test_zero_timeout_request_succeeds_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1beta/models"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"models": []})))
        .expect(1)
        .mount(&server)
        .await;
    let client = wiremock_client(&server, BackendCapabilities::detect()).await;
    let overrides = HttpOptions::default().with_timeout(0);

    let body: Value = client
        .request::<Value, _>(HttpMethod::Get, "models", None, Some(&overrides))
        .await
        .unwrap();

    assert_eq!(body, json!({"models": []}));
    let received = server.received_requests().await.unwrap();
    assert!(received[0].headers.get(&"x-server-timeout".into()).is_none());
}

// Mock transport expectations

#[tokio::test]
async fn test_request_goes_through_transport_once() {
    let mut transport = MockTransport::new();
    transport
        .expect_send()
        .times(1)
        .withf(|request: &HttpRequest| {
            request.method == HttpMethod::Post
                && request.url.ends_with("/v1beta/models/gemini:countTokens")
                && request.headers.get("Content-Type").map(String::as_str) == Some("application/json")
        })
        .returning(|_| {
            Ok(HttpResponse {
                status: 200,
                headers: HashMap::new(),
                body: Bytes::from_static(b"{\"totalTokens\": 3}"),
            })
        });

    let client = ApiClient::builder()
        .api_key(key("test-api-key"))
        .transport(Arc::new(transport))
        .env(HashMap::new())
        .build()
        .unwrap();

    let body: Value = client
        .request(
            HttpMethod::Post,
            "models/gemini:countTokens",
            Some(&json!({"contents": []})),
            None,
        )
        .await
        .unwrap();

    assert_eq!(body["totalTokens"], 3);
}

#[tokio::test]
async fn test_streaming_transport_error_is_surfaced() {
    let mut transport = MockTransport::new();
    transport
        .expect_send_streaming()
        .times(1)
        .returning(|_| Err(TransportError::Connection("connection refused".to_string())));

    let client = ApiClient::builder()
        .api_key(key("test-api-key"))
        .transport(Arc::new(transport))
        .env(HashMap::new())
        .build()
        .unwrap();

    let err = client
        .request_streamed(HttpMethod::Post, "models/m:streamGenerateContent", Some(&json!({})), None)
        .await
        .unwrap_err();

    assert!(matches!(err, GenAiError::Transport(TransportError::Connection(_))));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_streaming_chunks_from_mock_transport() {
    let mut transport = MockTransport::new();
    transport.expect_send_streaming().times(1).returning(|_| {
        let chunks = vec![
            Ok(Bytes::from_static(b"data: {\"n\": 1}\n")),
            Ok(Bytes::from_static(b"\ndata: {\"n\": 2}\n\n")),
        ];
        Ok(StreamingResponse {
            status: 200,
            headers: HashMap::new(),
            chunks: Box::pin(stream::iter(chunks)),
        })
    });

    let client = ApiClient::builder()
        .api_key(key("test-api-key"))
        .transport(Arc::new(transport))
        .capabilities(BackendCapabilities::line_iter_only())
        .env(HashMap::new())
        .build()
        .unwrap();

    let units: Vec<String> = client
        .request_streamed(HttpMethod::Post, "models/m:streamGenerateContent", Some(&json!({})), None)
        .await
        .unwrap()
        .map(|unit| unit.unwrap())
        .collect()
        .await;

    assert_eq!(units, vec!["{\"n\": 1}", "{\"n\": 2}"]);
}
