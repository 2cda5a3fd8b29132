mod auth;
mod config;
mod docai;
mod document;
mod error;
mod pdf;
mod storage;

#[cfg(feature = "python")]
mod python;

// Re-export main types
pub use auth::{Authorizer, TokenSource};
pub use config::RouterConfig;
pub use docai::{
    DocumentAiClient, DocumentProcessor, Entity, ProcessRequest, ProcessedDocument,
    ProcessorName, DEFAULT_FIELD_MASK,
};
pub use document::{DocumentRef, PDF_MIME_TYPE};
pub use error::{Result, RouterError};
pub use pdf::{contains_form, FormClassifier, RoutingRecord};
pub use storage::{GcsClient, ObjectStore};

/// Install the fmt subscriber once; `RUST_LOG` overrides the default `info` level.
pub fn init_tracing() {
    use std::sync::Once;
    use tracing_subscriber::EnvFilter;

    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        // Another subscriber may already be installed by the host process.
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .try_init();
    });
}

/// Classify one stored document with clients built from the environment.
#[allow(clippy::too_many_arguments)]
pub fn is_form(
    project_id: &str,
    location: &str,
    processor_id: &str,
    bucket: &str,
    path: &str,
    mime_type: &str,
    field_mask: Option<&str>,
    processor_version_id: Option<&str>,
) -> Result<bool> {
    let classifier = FormClassifier::from_config(&RouterConfig::from_env()?)?;
    let processor = ProcessorName::new(project_id, location, processor_id)
        .with_version(processor_version_id.map(str::to_string));
    classifier.is_form(&processor, &DocumentRef::new(bucket, path, mime_type), field_mask)
}

/// Classify the PDF at a `gs://bucket/path` URI with clients built from the environment.
pub fn is_form_uri(
    project_id: &str,
    location: &str,
    processor_id: &str,
    uri: &str,
    processor_version_id: Option<&str>,
) -> Result<bool> {
    let classifier = FormClassifier::from_config(&RouterConfig::from_env()?)?;
    let processor = ProcessorName::new(project_id, location, processor_id)
        .with_version(processor_version_id.map(str::to_string));
    classifier.is_form_uri(&processor, uri, Some(DEFAULT_FIELD_MASK))
}

/// Route the forms under `<folder>/pdf/` with clients built from the environment.
pub fn get_forms_list(
    processor_id: Option<&str>,
    project_id: &str,
    location: Option<&str>,
    bucket: &str,
    folder: &str,
) -> Result<Vec<RoutingRecord>> {
    let classifier = FormClassifier::from_config(&RouterConfig::from_env()?)?;
    classifier.get_forms_list(processor_id, project_id, location, bucket, folder)
}
