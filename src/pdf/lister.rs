use serde::{Deserialize, Serialize};

use super::classifier::FormClassifier;
use crate::docai::{DocumentProcessor, ProcessorName, DEFAULT_FIELD_MASK};
use crate::document::DocumentRef;
use crate::error::Result;
use crate::storage::ObjectStore;

/// Where a downstream stage should move a document classified as a form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingRecord {
    pub source_object: String,
    pub destination_bucket: String,
    pub destination_object: String,
}

impl<S: ObjectStore, P: DocumentProcessor> FormClassifier<S, P> {
    /// Classify every object under `<folder>/pdf/` and return routing records for the forms.
    ///
    /// Returns an empty list without touching storage when any processor
    /// identifier is missing or blank. The first classification error aborts.
    pub fn get_forms_list(
        &self,
        processor_id: Option<&str>,
        project_id: &str,
        location: Option<&str>,
        bucket: &str,
        folder: &str,
    ) -> Result<Vec<RoutingRecord>> {
        let (processor_id, location) = match (non_blank(processor_id), non_blank(location)) {
            (Some(processor_id), Some(location)) if !project_id.trim().is_empty() => {
                (processor_id, location)
            }
            _ => {
                tracing::warn!(
                    "Skipping form detection for gs://{}/{}: processor, project or location not configured",
                    bucket,
                    folder
                );
                return Ok(Vec::new());
            }
        };

        let processor = ProcessorName::new(project_id, location, processor_id);
        let destination_object = format!("{}/pdf-forms/input/", folder);
        let mut forms = Vec::new();

        for name in self.store.list(bucket, &format!("{}/pdf/", folder))? {
            let document = DocumentRef::pdf(bucket, name.as_str());
            if self.is_form(&processor, &document, Some(DEFAULT_FIELD_MASK))? {
                tracing::info!("Routing form {} to {}", document.gcs_uri(), destination_object);
                forms.push(RoutingRecord {
                    source_object: name,
                    destination_bucket: bucket.to_string(),
                    destination_object: destination_object.clone(),
                });
            }
        }

        tracing::info!(
            "Found {} forms under gs://{}/{}/pdf/",
            forms.len(),
            bucket,
            folder
        );
        Ok(forms)
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}
