use std::fmt;

use base64::Engine as _;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use crate::auth::Authorizer;
use crate::config::RouterConfig;
use crate::error::{ensure_success, Result};

const SERVICE: &str = "Document AI";
pub const DEFAULT_FIELD_MASK: &str = "entities";

/// Full resource name of a processor or one of its versions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessorName {
    pub project_id: String,
    pub location: String,
    pub processor_id: String,
    pub version_id: Option<String>,
}

impl ProcessorName {
    pub fn new(
        project_id: impl Into<String>,
        location: impl Into<String>,
        processor_id: impl Into<String>,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            location: location.into(),
            processor_id: processor_id.into(),
            version_id: None,
        }
    }

    pub fn with_version(mut self, version_id: Option<String>) -> Self {
        self.version_id = version_id;
        self
    }
}

impl fmt::Display for ProcessorName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "projects/{}/locations/{}/processors/{}",
            self.project_id, self.location, self.processor_id
        )?;
        if let Some(version) = &self.version_id {
            write!(f, "/processorVersions/{}", version)?;
        }
        Ok(())
    }
}

/// Raw document plus processing options for one `:process` call.
#[derive(Debug, Clone)]
pub struct ProcessRequest {
    pub content: Vec<u8>,
    pub mime_type: String,
    pub field_mask: Option<String>,
    /// 1-based page numbers; empty means every page.
    pub pages: Vec<u32>,
}

impl ProcessRequest {
    pub fn new(content: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            content,
            mime_type: mime_type.into(),
            field_mask: None,
            pages: Vec::new(),
        }
    }

    pub fn with_field_mask(mut self, field_mask: Option<String>) -> Self {
        self.field_mask = field_mask;
        self
    }

    pub fn with_pages(mut self, pages: impl IntoIterator<Item = u32>) -> Self {
        self.pages = pages.into_iter().collect();
        self
    }

    fn to_wire(&self) -> WireRequest<'_> {
        WireRequest {
            raw_document: WireRawDocument {
                content: base64::engine::general_purpose::STANDARD.encode(&self.content),
                mime_type: &self.mime_type,
            },
            field_mask: self.field_mask.as_deref(),
            process_options: (!self.pages.is_empty()).then(|| WireProcessOptions {
                individual_page_selector: WirePageSelector { pages: &self.pages },
            }),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireRequest<'a> {
    raw_document: WireRawDocument<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    field_mask: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    process_options: Option<WireProcessOptions<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireRawDocument<'a> {
    content: String,
    mime_type: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireProcessOptions<'a> {
    individual_page_selector: WirePageSelector<'a>,
}

#[derive(Serialize)]
struct WirePageSelector<'a> {
    pages: &'a [u32],
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Entity {
    #[serde(rename = "type", default)]
    pub entity_type: String,
    #[serde(default)]
    pub confidence: f64,
}

impl Entity {
    pub fn new(entity_type: impl Into<String>, confidence: f64) -> Self {
        Self {
            entity_type: entity_type.into(),
            confidence,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProcessedDocument {
    #[serde(default)]
    pub entities: Vec<Entity>,
}

#[derive(Deserialize)]
struct ProcessResponse {
    #[serde(default)]
    document: ProcessedDocument,
}

/// A remote document-understanding service.
pub trait DocumentProcessor {
    fn process(&self, processor: &ProcessorName, request: &ProcessRequest)
        -> Result<ProcessedDocument>;
}

/// Document AI v1 REST client.
pub struct DocumentAiClient {
    client: Client,
    config: RouterConfig,
    auth: Authorizer,
}

impl DocumentAiClient {
    pub fn new(config: &RouterConfig) -> Result<Self> {
        Self::with_authorizer(config, Authorizer::new(config))
    }

    pub fn with_authorizer(config: &RouterConfig, auth: Authorizer) -> Result<Self> {
        Ok(Self {
            client: config.http_client()?,
            config: config.clone(),
            auth,
        })
    }
}

impl DocumentProcessor for DocumentAiClient {
    fn process(
        &self,
        processor: &ProcessorName,
        request: &ProcessRequest,
    ) -> Result<ProcessedDocument> {
        let url = format!(
            "{}/v1/{}:process",
            self.config.docai_endpoint_for(&processor.location),
            processor
        );
        tracing::debug!(
            "Processing {} bytes ({}) with {}",
            request.content.len(),
            request.mime_type,
            processor
        );

        let mut builder = self.client.post(&url).json(&request.to_wire());
        if let Some(token) = self.auth.bearer(&self.client)? {
            builder = builder.bearer_auth(token);
        }

        let response = ensure_success(SERVICE, builder.send()?)?;
        let parsed: ProcessResponse = serde_json::from_str(&response.text()?)?;
        Ok(parsed.document)
    }
}
