use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use reqwest::blocking::Client;
use serde::Deserialize;

use crate::config::RouterConfig;
use crate::error::{Result, RouterError};

const METADATA_TOKEN_PATH: &str = "/computeMetadata/v1/instance/service-accounts/default/token";
// Refresh a cached token this long before the server says it expires.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Where bearer tokens for Google APIs come from.
#[derive(Clone)]
pub enum TokenSource {
    /// No `Authorization` header; for emulators.
    Anonymous,
    Static(String),
    /// Default service account of the GCE/Cloud Run/GKE metadata server.
    Metadata,
}

// Tokens are never printed.
impl fmt::Debug for TokenSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenSource::Anonymous => write!(f, "Anonymous"),
            TokenSource::Static(_) => write!(f, "Static(<redacted>)"),
            TokenSource::Metadata => write!(f, "Metadata"),
        }
    }
}

#[derive(Deserialize)]
struct MetadataToken {
    access_token: String,
    #[serde(default)]
    expires_in: u64,
}

struct CachedToken {
    value: String,
    refresh_at: Instant,
}

/// Hands out bearer tokens. Metadata-server tokens are cached until shortly
/// before they expire; clones share the cache.
#[derive(Clone)]
pub struct Authorizer {
    source: TokenSource,
    metadata_url: String,
    cached: Arc<Mutex<Option<CachedToken>>>,
}

impl Authorizer {
    pub fn new(config: &RouterConfig) -> Self {
        Self {
            source: config.token.clone(),
            metadata_url: format!("http://{}", config.metadata_host.trim_end_matches('/')),
            cached: Arc::new(Mutex::new(None)),
        }
    }

    pub fn bearer(&self, client: &Client) -> Result<Option<String>> {
        match &self.source {
            TokenSource::Anonymous => Ok(None),
            TokenSource::Static(token) => Ok(Some(token.clone())),
            TokenSource::Metadata => self.metadata_token(client).map(Some),
        }
    }

    fn metadata_token(&self, client: &Client) -> Result<String> {
        let mut cached = self
            .cached
            .lock()
            .map_err(|_| RouterError::Auth("token cache poisoned".to_string()))?;

        if let Some(token) = cached.as_ref() {
            if Instant::now() < token.refresh_at {
                return Ok(token.value.clone());
            }
        }

        let fetched = fetch_metadata_token(client, &self.metadata_url)?;
        let lifetime = Duration::from_secs(fetched.expires_in).saturating_sub(EXPIRY_MARGIN);
        *cached = Some(CachedToken {
            value: fetched.access_token.clone(),
            refresh_at: Instant::now() + lifetime,
        });
        Ok(fetched.access_token)
    }
}

impl fmt::Debug for Authorizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Authorizer")
            .field("source", &self.source)
            .field("metadata_url", &self.metadata_url)
            .finish()
    }
}

fn fetch_metadata_token(client: &Client, base_url: &str) -> Result<MetadataToken> {
    let url = format!("{}{}", base_url, METADATA_TOKEN_PATH);
    let response = client
        .get(&url)
        .header("Metadata-Flavor", "Google")
        .send()
        .map_err(|e| RouterError::Auth(format!("metadata server unreachable: {}", e)))?;

    let status = response.status();
    if !status.is_success() {
        return Err(RouterError::Auth(format!(
            "metadata server returned {}",
            status
        )));
    }

    let token: MetadataToken = response
        .json()
        .map_err(|e| RouterError::Auth(format!("unreadable metadata token: {}", e)))?;
    tracing::debug!(
        "Fetched access token from metadata server (expires in {}s)",
        token.expires_in
    );
    Ok(token)
}
