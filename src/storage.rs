use reqwest::blocking::Client;
use serde::Deserialize;

use crate::auth::Authorizer;
use crate::config::RouterConfig;
use crate::error::{ensure_success, Result, RouterError};

const SERVICE: &str = "Cloud Storage";

/// Prefix listing and whole-object reads against an object store.
pub trait ObjectStore {
    /// Names of every object under `prefix`, in listing order.
    fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<String>>;

    fn download(&self, bucket: &str, path: &str) -> Result<Vec<u8>>;
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListPage {
    #[serde(default)]
    items: Vec<ObjectItem>,
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
struct ObjectItem {
    name: String,
}

/// Cloud Storage JSON API client.
pub struct GcsClient {
    client: Client,
    endpoint: String,
    auth: Authorizer,
    max_size: usize,
}

impl GcsClient {
    pub fn new(config: &RouterConfig) -> Result<Self> {
        Self::with_authorizer(config, Authorizer::new(config))
    }

    /// Share `auth` (and its cached token) with other clients.
    pub fn with_authorizer(config: &RouterConfig, auth: Authorizer) -> Result<Self> {
        Ok(Self {
            client: config.http_client()?,
            endpoint: config.storage_endpoint.trim_end_matches('/').to_string(),
            auth,
            max_size: config.max_document_bytes,
        })
    }

    fn objects_url(&self, bucket: &str) -> String {
        format!(
            "{}/storage/v1/b/{}/o",
            self.endpoint,
            urlencoding::encode(bucket)
        )
    }

    fn get(&self, url: &str) -> Result<reqwest::blocking::RequestBuilder> {
        let request = self.client.get(url);
        Ok(match self.auth.bearer(&self.client)? {
            Some(token) => request.bearer_auth(token),
            None => request,
        })
    }
}

impl ObjectStore for GcsClient {
    fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<String>> {
        let url = self.objects_url(bucket);
        let mut names = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query = vec![("prefix", prefix.to_string())];
            if let Some(token) = page_token.take() {
                query.push(("pageToken", token));
            }

            let response = self.get(&url)?.query(&query).send()?;
            let page: ListPage = serde_json::from_str(&ensure_success(SERVICE, response)?.text()?)?;
            names.extend(page.items.into_iter().map(|item| item.name));

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        tracing::debug!(
            "Listed {} objects under gs://{}/{}",
            names.len(),
            bucket,
            prefix
        );
        Ok(names)
    }

    fn download(&self, bucket: &str, path: &str) -> Result<Vec<u8>> {
        let url = format!("{}/{}", self.objects_url(bucket), urlencoding::encode(path));
        let response = self.get(&url)?.query(&[("alt", "media")]).send()?;
        let response = ensure_success(SERVICE, response)?;

        if let Some(content_length) = response.content_length() {
            check_size(content_length, self.max_size)?;
        }

        let bytes = response.bytes()?;
        if bytes.len() > self.max_size {
            return Err(RouterError::TooLarge(bytes.len()));
        }

        tracing::debug!("Downloaded gs://{}/{}: {} bytes", bucket, path, bytes.len());
        Ok(bytes.to_vec())
    }
}

fn check_size(content_length: u64, max_size: usize) -> Result<()> {
    match usize::try_from(content_length) {
        Ok(len) if len <= max_size => Ok(()),
        Ok(len) => Err(RouterError::TooLarge(len)),
        Err(_) => Err(RouterError::TooLarge(usize::MAX)),
    }
}
