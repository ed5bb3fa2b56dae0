use crate::error::ResolveError;
use reqwest::Client;
use rustls::{ClientConfig, crypto::ring};
use rustls_platform_verifier::BuilderVerifierExt;
use std::sync::Arc;
use std::time::Duration;

pub(crate) const DEFAULT_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36";

#[derive(Debug, Clone)]
pub struct ProxyConfig {
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

pub fn default_client() -> Result<Client, ResolveError> {
    create_client(None)
}

/// Builds the per-viewer HTTP client: rustls with the platform verifier,
/// a persistent cookie jar and an optional proxy covering all requests.
pub fn create_client(proxy_config: Option<&ProxyConfig>) -> Result<Client, ResolveError> {
    let provider = Arc::new(ring::default_provider());
    let tls_config = ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| ResolveError::ClientSetup(e.to_string()))?
        .with_platform_verifier()
        .map_err(|e| ResolveError::ClientSetup(e.to_string()))?
        .with_no_client_auth();

    let mut builder = Client::builder()
        .use_preconfigured_tls(tls_config)
        .user_agent(DEFAULT_UA)
        .cookie_store(true)
        .timeout(Duration::from_secs(30));

    if let Some(config) = proxy_config {
        let mut proxy = reqwest::Proxy::all(&config.url)
            .map_err(|e| ResolveError::ClientSetup(format!("invalid proxy '{}': {e}", config.url)))?;
        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            proxy = proxy.basic_auth(username, password);
        }
        builder = builder.proxy(proxy);
    }

    builder
        .build()
        .map_err(|e| ResolveError::ClientSetup(e.to_string()))
}
