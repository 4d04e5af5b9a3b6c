//! API key injection for outgoing requests.
//!
//! Only static API keys are handled here. Vertex AI project/location mode
//! relies on caller-supplied credentials (e.g. an `Authorization` header in
//! the HTTP options), so it gets [`NoAuthManager`].

use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;

use crate::config::{AuthMethod, ClientConfig};

/// Header carrying the API key.
pub const API_KEY_HEADER: &str = "x-goog-api-key";

/// Query parameter carrying the API key.
pub const API_KEY_QUERY_PARAM: &str = "key";

/// Authentication manager.
pub trait AuthManager: Send + Sync {
    /// Get the authentication header name and value.
    fn get_auth_header(&self) -> Option<(String, String)>;

    /// Get the authentication query parameter.
    fn get_auth_query_param(&self) -> Option<(String, String)>;
}

/// API key authentication manager.
pub struct ApiKeyAuthManager {
    api_key: SecretString,
    auth_method: AuthMethod,
}

impl ApiKeyAuthManager {
    /// Create a new API key auth manager.
    pub fn new(api_key: SecretString, auth_method: AuthMethod) -> Self {
        Self { api_key, auth_method }
    }
}

impl AuthManager for ApiKeyAuthManager {
    fn get_auth_header(&self) -> Option<(String, String)> {
        match self.auth_method {
            AuthMethod::Header => Some((
                API_KEY_HEADER.to_string(),
                self.api_key.expose_secret().to_string(),
            )),
            AuthMethod::QueryParam => None,
        }
    }

    fn get_auth_query_param(&self) -> Option<(String, String)> {
        match self.auth_method {
            AuthMethod::QueryParam => Some((
                API_KEY_QUERY_PARAM.to_string(),
                self.api_key.expose_secret().to_string(),
            )),
            AuthMethod::Header => None,
        }
    }
}

/// Adds no credentials.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoAuthManager;

impl AuthManager for NoAuthManager {
    fn get_auth_header(&self) -> Option<(String, String)> {
        None
    }

    fn get_auth_query_param(&self) -> Option<(String, String)> {
        None
    }
}

/// Picks the auth manager matching a resolved configuration.
pub fn auth_manager_for(config: &ClientConfig) -> Arc<dyn AuthManager> {
    match &config.api_key {
        Some(key) => Arc::new(ApiKeyAuthManager::new(key.clone(), config.auth_method)),
        None => Arc::new(NoAuthManager),
    }
}
