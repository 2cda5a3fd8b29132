use crate::auth::Authorizer;
use crate::config::RouterConfig;
use crate::docai::{DocumentAiClient, DocumentProcessor, Entity, ProcessRequest, ProcessorName};
use crate::document::DocumentRef;
use crate::error::Result;
use crate::storage::{GcsClient, ObjectStore};

const FORM_ENTITY_TYPE: &str = "form";
const FORM_CONFIDENCE_THRESHOLD: f64 = 0.7;
// A form is recognisable from its first pages; later pages are not sent.
const MAX_SCAN_PAGES: u32 = 5;

pub struct FormClassifier<S, P> {
    pub(crate) store: S,
    pub(crate) processor: P,
}

impl FormClassifier<GcsClient, DocumentAiClient> {
    pub fn from_config(config: &RouterConfig) -> Result<Self> {
        // One token cache for both services.
        let auth = Authorizer::new(config);
        Ok(Self::new(
            GcsClient::with_authorizer(config, auth.clone())?,
            DocumentAiClient::with_authorizer(config, auth)?,
        ))
    }
}

impl<S: ObjectStore, P: DocumentProcessor> FormClassifier<S, P> {
    pub fn new(store: S, processor: P) -> Self {
        Self { store, processor }
    }

    /// Download one document and ask the processor whether it is a form.
    /// Errors from either service are returned as-is.
    pub fn is_form(
        &self,
        processor: &ProcessorName,
        document: &DocumentRef,
        field_mask: Option<&str>,
    ) -> Result<bool> {
        let content = self.store.download(&document.bucket, &document.path)?;

        let request = ProcessRequest::new(content, document.mime_type.as_str())
            .with_field_mask(field_mask.map(str::to_string))
            .with_pages(1..=MAX_SCAN_PAGES);
        let result = self.processor.process(processor, &request)?;

        let verdict = contains_form(&result.entities);
        tracing::debug!(
            "{}: {} entities, form={}",
            document.gcs_uri(),
            result.entities.len(),
            verdict
        );
        Ok(verdict)
    }

    /// `is_form` for a `gs://bucket/path` URI, read as a PDF.
    pub fn is_form_uri(
        &self,
        processor: &ProcessorName,
        uri: &str,
        field_mask: Option<&str>,
    ) -> Result<bool> {
        self.is_form(processor, &DocumentRef::from_gcs_uri(uri)?, field_mask)
    }
}

/// True when some entity is typed "form" (any case) with confidence above 0.7.
pub fn contains_form(entities: &[Entity]) -> bool {
    entities.iter().any(|entity| {
        entity.entity_type.to_lowercase() == FORM_ENTITY_TYPE
            && entity.confidence > FORM_CONFIDENCE_THRESHOLD
    })
}
