use std::time::Duration;

use crate::auth::TokenSource;
use crate::error::{Result, RouterError};

const DEFAULT_STORAGE_ENDPOINT: &str = "https://storage.googleapis.com";
const DEFAULT_METADATA_HOST: &str = "metadata.google.internal";
const DEFAULT_TIMEOUT_SECS: u64 = 60;
const MAX_DOCUMENT_BYTES: usize = 40 * 1024 * 1024; // 40MB
const USER_AGENT: &str = "form-router/0.1";

const ENV_STORAGE_ENDPOINT: &str = "FORM_ROUTER_STORAGE_ENDPOINT";
const ENV_DOCAI_ENDPOINT: &str = "FORM_ROUTER_DOCAI_ENDPOINT";
const ENV_TIMEOUT_SECS: &str = "FORM_ROUTER_TIMEOUT_SECS";
const ENV_MAX_DOCUMENT_BYTES: &str = "FORM_ROUTER_MAX_DOCUMENT_BYTES";
const ENV_ACCESS_TOKEN: &str = "GOOGLE_OAUTH_ACCESS_TOKEN";
const ENV_METADATA_HOST: &str = "GCE_METADATA_HOST";

/// Settings shared by the storage and Document AI clients.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    pub storage_endpoint: String,
    /// Overrides the regional `{location}-documentai.googleapis.com` host.
    pub docai_endpoint: Option<String>,
    pub timeout: Duration,
    pub max_document_bytes: usize,
    pub user_agent: String,
    pub token: TokenSource,
    /// `host[:port]` of the metadata server used by `TokenSource::Metadata`.
    pub metadata_host: String,
}

impl RouterConfig {
    pub fn new() -> Self {
        Self {
            storage_endpoint: DEFAULT_STORAGE_ENDPOINT.to_string(),
            docai_endpoint: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_document_bytes: MAX_DOCUMENT_BYTES,
            user_agent: USER_AGENT.to_string(),
            token: TokenSource::Metadata,
            metadata_host: DEFAULT_METADATA_HOST.to_string(),
        }
    }

    /// Build config from `FORM_ROUTER_*` variables, falling back to defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::new();

        if let Some(endpoint) = non_blank(lookup(ENV_STORAGE_ENDPOINT)) {
            config.storage_endpoint = endpoint;
        }
        config.docai_endpoint = non_blank(lookup(ENV_DOCAI_ENDPOINT));

        if let Some(raw) = non_blank(lookup(ENV_TIMEOUT_SECS)) {
            let secs = raw.parse::<u64>().map_err(|_| {
                RouterError::Config(format!(
                    "{} must be a whole number, got {:?}",
                    ENV_TIMEOUT_SECS, raw
                ))
            })?;
            config.timeout = Duration::from_secs(secs);
        }

        if let Some(raw) = non_blank(lookup(ENV_MAX_DOCUMENT_BYTES)) {
            config.max_document_bytes = raw.parse::<usize>().map_err(|_| {
                RouterError::Config(format!(
                    "{} must be a whole number, got {:?}",
                    ENV_MAX_DOCUMENT_BYTES, raw
                ))
            })?;
        }

        if let Some(token) = non_blank(lookup(ENV_ACCESS_TOKEN)) {
            config.token = TokenSource::Static(token);
        }

        if let Some(host) = non_blank(lookup(ENV_METADATA_HOST)) {
            config.metadata_host = host;
        }

        Ok(config)
    }

    pub fn with_storage_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.storage_endpoint = endpoint.into();
        self
    }

    pub fn with_docai_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.docai_endpoint = Some(endpoint.into());
        self
    }

    pub fn with_token(mut self, token: TokenSource) -> Self {
        self.token = token;
        self
    }

    /// Document AI requires the regional endpoint for non-`us` locations.
    pub fn docai_endpoint_for(&self, location: &str) -> String {
        match &self.docai_endpoint {
            Some(endpoint) => endpoint.trim_end_matches('/').to_string(),
            None => format!("https://{}-documentai.googleapis.com", location),
        }
    }

    pub(crate) fn http_client(&self) -> Result<reqwest::blocking::Client> {
        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .user_agent(self.user_agent.as_str())
            .build()?;
        Ok(client)
    }
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
