use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Result, RouterError};

pub const PDF_MIME_TYPE: &str = "application/pdf";

// Bucket names: 3-222 chars of lowercase letters, digits, dashes, underscores and dots.
static GCS_URI: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^gs://([a-z0-9][a-z0-9._-]{1,220}[a-z0-9])/(.+)$").unwrap());

/// A stored binary object to classify.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRef {
    pub bucket: String,
    pub path: String,
    pub mime_type: String,
}

impl DocumentRef {
    pub fn new(
        bucket: impl Into<String>,
        path: impl Into<String>,
        mime_type: impl Into<String>,
    ) -> Self {
        Self {
            bucket: bucket.into(),
            path: path.into(),
            mime_type: mime_type.into(),
        }
    }

    pub fn pdf(bucket: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(bucket, path, PDF_MIME_TYPE)
    }

    /// Parse `gs://bucket/path/to/object.pdf`; the mime type defaults to PDF.
    pub fn from_gcs_uri(uri: &str) -> Result<Self> {
        let captures = GCS_URI
            .captures(uri.trim())
            .ok_or_else(|| RouterError::InvalidUri(uri.to_string()))?;
        Ok(Self::pdf(&captures[1], &captures[2]))
    }

    pub fn gcs_uri(&self) -> String {
        format!("gs://{}/{}", self.bucket, self.path)
    }
}
