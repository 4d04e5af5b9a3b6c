//! Builder for creating client instances.

use secrecy::SecretString;
use std::sync::Arc;

use crate::config::{AuthMethod, BaseUrlDefaults, ClientConfig, ClientConfigBuilder, EnvSource};
use crate::error::GenAiResult;
use crate::streaming::{BackendCapabilities, BackendDispatcher};
use crate::transport::{HttpTransport, ReqwestTransport};
use crate::types::HttpOptions;

use super::client::ApiClient;

/// Builder for creating an [`ApiClient`].
///
/// Configuration settings are resolved by [`ClientConfigBuilder`]; the
/// transport, streaming capabilities and environment source can be injected
/// for testing.
///
/// # Example
///
/// ```no_run
/// use integrations_genai::ApiClientBuilder;
/// use integrations_genai::types::HttpOptions;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = ApiClientBuilder::new()
///     .vertexai(true)
///     .project("my-project")
///     .location("us-central1")
///     .http_options(HttpOptions::default().with_timeout(30_000))
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct ApiClientBuilder {
    config_builder: ClientConfigBuilder,
    config: Option<ClientConfig>,
    env: Option<Box<dyn EnvSource>>,
    transport: Option<Arc<dyn HttpTransport>>,
    capabilities: Option<BackendCapabilities>,
}

impl ApiClientBuilder {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder from an already resolved configuration.
    pub fn from_config(config: ClientConfig) -> Self {
        Self {
            config: Some(config),
            ..Self::default()
        }
    }

    /// Selects Vertex AI (`true`) or the Gemini Developer API (`false`).
    pub fn vertexai(mut self, vertexai: bool) -> Self {
        self.config_builder = self.config_builder.vertexai(vertexai);
        self
    }

    /// Sets the API key.
    pub fn api_key(mut self, key: SecretString) -> Self {
        self.config_builder = self.config_builder.api_key(key);
        self
    }

    /// Sets the Vertex AI project.
    pub fn project(mut self, project: impl Into<String>) -> Self {
        self.config_builder = self.config_builder.project(project);
        self
    }

    /// Sets the Vertex AI location.
    pub fn location(mut self, location: impl Into<String>) -> Self {
        self.config_builder = self.config_builder.location(location);
        self
    }

    /// Sets client-level HTTP options.
    pub fn http_options(mut self, options: HttpOptions) -> Self {
        self.config_builder = self.config_builder.http_options(options);
        self
    }

    /// Sets default base URLs.
    pub fn base_url_defaults(mut self, defaults: BaseUrlDefaults) -> Self {
        self.config_builder = self.config_builder.base_url_defaults(defaults);
        self
    }

    /// Sets the authentication method.
    pub fn auth_method(mut self, method: AuthMethod) -> Self {
        self.config_builder = self.config_builder.auth_method(method);
        self
    }

    /// Reads environment variables from `env` instead of the process.
    pub fn env(mut self, env: impl EnvSource + 'static) -> Self {
        self.env = Some(Box::new(env));
        self
    }

    /// Sets a custom HTTP transport (for testing).
    pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Overrides the detected streaming backend capabilities.
    pub fn capabilities(mut self, capabilities: BackendCapabilities) -> Self {
        self.capabilities = Some(capabilities);
        self
    }

    /// Builds the client.
    pub fn build(self) -> GenAiResult<ApiClient> {
        let config = match (self.config, self.env) {
            (Some(config), _) => config,
            (None, Some(env)) => self.config_builder.build_with_env(env.as_ref())?,
            (None, None) => self.config_builder.build()?,
        };

        let transport: Arc<dyn HttpTransport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::from_options(&config.http_options)?),
        };

        let dispatcher = BackendDispatcher::new(self.capabilities.unwrap_or_default());

        Ok(ApiClient::from_parts(config, transport, dispatcher))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GEMINI_BASE_URL, VERTEX_API_VERSION};
    use std::collections::HashMap;

    #[test]
    fn test_builder_with_api_key() {
        let client = ApiClientBuilder::new()
            .api_key(SecretString::new("test-api-key".into()))
            .env(HashMap::new())
            .build()
            .unwrap();

        assert!(!client.is_vertexai());
        assert_eq!(client.http_options().base_url.as_deref(), Some(GEMINI_BASE_URL));
        assert_eq!(client.config().auth_method, AuthMethod::Header);
    }

    #[test]
    fn test_builder_from_config() {
        let config = ClientConfig::builder()
            .vertexai(true)
            .project("p")
            .location("europe-west4")
            .build_with_env(&HashMap::new())
            .unwrap();

        let client = ApiClientBuilder::from_config(config).build().unwrap();

        assert!(client.is_vertexai());
        assert_eq!(client.http_options().api_version.as_deref(), Some(VERTEX_API_VERSION));
    }

    #[test]
    fn test_capabilities_default_to_detected() {
        let client = ApiClientBuilder::new()
            .api_key(SecretString::new("k".into()))
            .env(HashMap::new())
            .build()
            .unwrap();

        assert_eq!(
            client.dispatcher().capabilities(),
            BackendCapabilities::detect()
        );
    }
}
