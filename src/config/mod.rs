//! Client configuration resolution.
//!
//! A client talks to one of two backends that share the request/response
//! shape: the Gemini Developer API (API key) or Vertex AI (project/location,
//! or an API key in express mode). Explicit builder values win over the
//! environment; see [`ClientConfigBuilder::build_with_env`] for the exact
//! precedence.

use secrecy::{ExposeSecret, SecretString};
use std::collections::HashMap;

use crate::error::{ConfigurationError, GenAiError};
use crate::transport::patch_http_options;
use crate::types::HttpOptions;

/// Default Gemini Developer API base URL.
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/";

/// Vertex AI global endpoint.
pub const VERTEX_GLOBAL_BASE_URL: &str = "https://aiplatform.googleapis.com/";

/// Default Gemini Developer API version.
pub const GEMINI_API_VERSION: &str = "v1beta";

/// Default Vertex AI API version.
pub const VERTEX_API_VERSION: &str = "v1beta1";

/// Environment variable selecting Vertex AI.
pub const ENV_USE_VERTEXAI: &str = "GOOGLE_GENAI_USE_VERTEXAI";
/// Preferred API key variable.
pub const ENV_GOOGLE_API_KEY: &str = "GOOGLE_API_KEY";
/// Fallback API key variable.
pub const ENV_GEMINI_API_KEY: &str = "GEMINI_API_KEY";
/// Vertex AI project variable.
pub const ENV_CLOUD_PROJECT: &str = "GOOGLE_CLOUD_PROJECT";
/// Vertex AI location variable.
pub const ENV_CLOUD_LOCATION: &str = "GOOGLE_CLOUD_LOCATION";
/// Gemini Developer API base URL override.
pub const ENV_GEMINI_BASE_URL: &str = "GOOGLE_GEMINI_BASE_URL";
/// Vertex AI base URL override.
pub const ENV_VERTEX_BASE_URL: &str = "GOOGLE_VERTEX_BASE_URL";

/// Authentication method for API key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum AuthMethod {
    /// Use x-goog-api-key header (recommended).
    #[default]
    Header,
    /// Use ?key= query parameter.
    QueryParam,
}

/// Deployment backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Backend {
    /// Gemini Developer API, authenticated by API key.
    GeminiApi,
    /// Vertex AI.
    VertexAi,
}

/// Source of environment variables.
pub trait EnvSource {
    /// Returns the raw value of `key`, if set.
    fn var(&self, key: &str) -> Option<String>;
}

/// Reads the process environment.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl EnvSource for HashMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

fn non_empty_var(env: &dyn EnvSource, key: &str) -> Option<String> {
    env.var(key).filter(|value| !value.trim().is_empty())
}

/// Process-independent default base URLs, consulted after explicit HTTP
/// options and before the environment.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BaseUrlDefaults {
    /// Default for the Gemini Developer API.
    pub gemini: Option<String>,
    /// Default for Vertex AI.
    pub vertex: Option<String>,
}

/// Resolved client configuration.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Selected backend.
    pub backend: Backend,
    /// API key, when the backend authenticates with one.
    pub api_key: Option<SecretString>,
    /// Vertex AI project.
    pub project: Option<String>,
    /// Vertex AI location.
    pub location: Option<String>,
    /// Base HTTP options for every request, identification headers included.
    pub http_options: HttpOptions,
    /// How the API key is attached.
    pub auth_method: AuthMethod,
    /// True when the caller supplied the base URL through HTTP options.
    pub custom_base_url: bool,
}

impl ClientConfig {
    /// Create a new configuration builder.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Create configuration from environment variables only.
    pub fn from_env() -> Result<Self, GenAiError> {
        Self::builder().build()
    }

    /// True when requests go to Vertex AI.
    pub fn is_vertexai(&self) -> bool {
        self.backend == Backend::VertexAi
    }

    /// Project and location used to scope Vertex AI paths.
    ///
    /// `None` for the Gemini Developer API and for Vertex AI express mode.
    pub fn vertex_scope(&self) -> Option<(&str, &str)> {
        if !self.is_vertexai() || self.api_key.is_some() {
            return None;
        }
        match (&self.project, &self.location) {
            (Some(project), Some(location)) => Some((project.as_str(), location.as_str())),
            _ => None,
        }
    }
}

/// Builder for [`ClientConfig`].
#[derive(Default)]
pub struct ClientConfigBuilder {
    vertexai: Option<bool>,
    api_key: Option<SecretString>,
    project: Option<String>,
    location: Option<String>,
    http_options: Option<HttpOptions>,
    base_url_defaults: BaseUrlDefaults,
    auth_method: Option<AuthMethod>,
}

impl ClientConfigBuilder {
    /// Select Vertex AI (`true`) or the Gemini Developer API (`false`).
    pub fn vertexai(mut self, vertexai: bool) -> Self {
        self.vertexai = Some(vertexai);
        self
    }

    /// Set the API key.
    pub fn api_key(mut self, api_key: SecretString) -> Self {
        self.api_key = Some(api_key);
        self
    }

    /// Set the Vertex AI project.
    pub fn project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    /// Set the Vertex AI location.
    pub fn location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Set caller HTTP options, layered over the backend defaults.
    pub fn http_options(mut self, options: HttpOptions) -> Self {
        self.http_options = Some(options);
        self
    }

    /// Set default base URLs.
    pub fn base_url_defaults(mut self, defaults: BaseUrlDefaults) -> Self {
        self.base_url_defaults = defaults;
        self
    }

    /// Set the authentication method.
    pub fn auth_method(mut self, method: AuthMethod) -> Self {
        self.auth_method = Some(method);
        self
    }

    /// Build the configuration against the process environment.
    pub fn build(self) -> Result<ClientConfig, GenAiError> {
        self.build_with_env(&ProcessEnv)
    }

    /// Build the configuration against the given environment.
    ///
    /// Precedence, highest first:
    /// - backend: explicit flag, then `GOOGLE_GENAI_USE_VERTEXAI`.
    /// - Vertex AI credentials: explicit API key, explicit project/location,
    ///   environment project/location, environment API key.
    /// - base URL: HTTP options, [`BaseUrlDefaults`], environment, built-in.
    pub fn build_with_env(self, env: &dyn EnvSource) -> Result<ClientConfig, GenAiError> {
        let user_options = self.http_options.unwrap_or_default();
        user_options.validate()?;

        let custom_base_url = user_options
            .base_url
            .as_ref()
            .is_some_and(|url| !url.is_empty());

        let backend = match self.vertexai {
            Some(true) => Backend::VertexAi,
            Some(false) => Backend::GeminiApi,
            None => {
                let flag = env.var(ENV_USE_VERTEXAI).unwrap_or_default();
                if flag == "1" || flag.eq_ignore_ascii_case("true") {
                    Backend::VertexAi
                } else {
                    Backend::GeminiApi
                }
            }
        };

        let explicit_key = self.api_key.map(|key| trimmed_secret(&key));
        let project = self.project.filter(|p| !p.is_empty());
        let location = self.location.filter(|l| !l.is_empty());

        let (api_key, project, location, default_base_url, default_version) = match backend {
            Backend::GeminiApi => {
                if project.is_some() || location.is_some() {
                    return Err(ConfigurationError::UnsupportedOption {
                        message: "project/location are only supported on Vertex AI".to_string(),
                    }
                    .into());
                }

                let api_key = explicit_key.or_else(|| env_api_key(env));
                if api_key.is_none() && !custom_base_url {
                    return Err(ConfigurationError::MissingApiKey.into());
                }

                let base_url = self
                    .base_url_defaults
                    .gemini
                    .clone()
                    .or_else(|| non_empty_var(env, ENV_GEMINI_BASE_URL))
                    .unwrap_or_else(|| GEMINI_BASE_URL.to_string());

                (api_key, None, None, base_url, GEMINI_API_VERSION)
            }
            Backend::VertexAi => {
                if explicit_key.is_some() && (project.is_some() || location.is_some()) {
                    return Err(ConfigurationError::MutuallyExclusiveOptions {
                        message: "Project/location and API key are mutually exclusive in the client initializer."
                            .to_string(),
                    }
                    .into());
                }

                let env_project = non_empty_var(env, ENV_CLOUD_PROJECT);
                let env_location = non_empty_var(env, ENV_CLOUD_LOCATION);

                let (api_key, project, location) = if explicit_key.is_some() {
                    (explicit_key, None, None)
                } else if project.is_some() || location.is_some() {
                    (None, project.or(env_project), location.or(env_location))
                } else if env_project.is_some() || env_location.is_some() {
                    (None, env_project, env_location)
                } else {
                    (env_api_key(env), None, None)
                };

                if api_key.is_none()
                    && (project.is_none() || location.is_none())
                    && !custom_base_url
                {
                    return Err(ConfigurationError::MissingProjectOrLocation.into());
                }

                let base_url = self
                    .base_url_defaults
                    .vertex
                    .clone()
                    .or_else(|| non_empty_var(env, ENV_VERTEX_BASE_URL))
                    .unwrap_or_else(|| vertex_base_url(api_key.is_some(), location.as_deref()));

                (api_key, project, location, base_url, VERTEX_API_VERSION)
            }
        };

        let defaults = HttpOptions::default()
            .with_base_url(default_base_url)
            .with_api_version(default_version)
            .with_header("Content-Type", "application/json");
        let http_options = patch_http_options(&defaults, &user_options);

        tracing::debug!(
            backend = ?backend,
            base_url = http_options.base_url.as_deref().unwrap_or_default(),
            api_version = http_options.api_version.as_deref().unwrap_or_default(),
            "Client configuration resolved"
        );

        Ok(ClientConfig {
            backend,
            api_key,
            project,
            location,
            http_options,
            auth_method: self.auth_method.unwrap_or_default(),
            custom_base_url,
        })
    }
}

fn trimmed_secret(key: &SecretString) -> SecretString {
    SecretString::new(key.expose_secret().trim().to_string())
}

/// API key from the environment. `GOOGLE_API_KEY` wins over `GEMINI_API_KEY`.
fn env_api_key(env: &dyn EnvSource) -> Option<SecretString> {
    let google = non_empty_var(env, ENV_GOOGLE_API_KEY);
    let gemini = non_empty_var(env, ENV_GEMINI_API_KEY);

    if google.is_some() && gemini.is_some() {
        tracing::warn!("Both GOOGLE_API_KEY and GEMINI_API_KEY are set. Using GOOGLE_API_KEY.");
    }

    google
        .or(gemini)
        .map(|key| SecretString::new(key.trim().to_string()))
}

fn vertex_base_url(express_mode: bool, location: Option<&str>) -> String {
    match location {
        Some(location) if !express_mode && location != "global" => {
            format!("https://{location}-aiplatform.googleapis.com/")
        }
        _ => VERTEX_GLOBAL_BASE_URL.to_string(),
    }
}
