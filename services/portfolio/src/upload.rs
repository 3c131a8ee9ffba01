use crate::catalog::CatalogService;
use crate::config::UploadConfig;
use crate::entry::{Entry, EntryMetadata, MediaKind};
use crate::error::{CatalogError, ValidationError};
use bytes::Bytes;
use chrono::Utc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Candidate entry as handed over by the file picker and upload form
#[derive(Debug, Clone, Default)]
pub struct UploadRequest {
    pub payload: Option<Bytes>,
    /// Declared MIME type of the payload
    pub media_type: Option<String>,
    pub title: String,
    pub description: Option<String>,
}

impl UploadRequest {
    pub fn new(payload: Bytes, media_type: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            payload: Some(payload),
            media_type: Some(media_type.into()),
            title: title.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Upload that passed validation
#[derive(Debug, Clone)]
struct ValidatedUpload {
    kind: MediaKind,
    title: String,
    description: Option<String>,
    payload: Bytes,
}

/// Validates and commits new entries into a catalog.
///
/// Keeps the last assigned timestamp so that uploads committed within the
/// same millisecond still get distinct, increasing `created_at` values.
#[derive(Debug)]
pub struct UploadTransaction {
    max_payload_bytes: usize,
    last_created_at: i64,
}

impl UploadTransaction {
    pub fn new(config: &UploadConfig) -> Self {
        Self {
            max_payload_bytes: config.max_payload_bytes,
            last_created_at: i64::MIN,
        }
    }

    /// Check a request without touching the catalog
    pub fn validate(&self, request: &UploadRequest) -> Result<(), ValidationError> {
        self.check(request.clone()).map(|_| ())
    }

    /// Validate `request` and add it to `catalog`.
    ///
    /// Rejected requests never reach the catalog. Any preview handle for the
    /// payload stays with the caller and is released when dropped.
    #[instrument(skip(self, catalog, request), fields(title = %request.title))]
    pub async fn commit(
        &mut self,
        catalog: &mut CatalogService,
        request: UploadRequest,
    ) -> Result<Entry, CatalogError> {
        let upload = match self.check(request) {
            Ok(upload) => upload,
            Err(e) => {
                warn!(error = %e, "Rejected upload");
                metrics::counter!("portfolio.uploads.rejected").increment(1);
                return Err(e.into());
            }
        };

        let metadata = EntryMetadata {
            id: Uuid::new_v4().to_string(),
            kind: upload.kind,
            title: upload.title,
            description: upload.description,
            created_at: self.next_created_at(),
        };

        debug!(id = %metadata.id, created_at = metadata.created_at, "Committing upload");

        let entry = catalog.add(metadata, upload.payload).await?;

        metrics::counter!("portfolio.uploads.committed").increment(1);
        info!(id = %entry.id(), kind = %entry.kind(), "Upload committed");

        Ok(entry)
    }

    fn check(&self, request: UploadRequest) -> Result<ValidatedUpload, ValidationError> {
        let payload = match request.payload {
            Some(payload) if !payload.is_empty() => payload,
            _ => return Err(ValidationError::MissingPayload),
        };

        if payload.len() > self.max_payload_bytes {
            return Err(ValidationError::PayloadTooLarge {
                size: payload.len(),
                limit: self.max_payload_bytes,
            });
        }

        let title = request.title.trim();
        if title.is_empty() {
            return Err(ValidationError::EmptyTitle);
        }

        let media_type = request.media_type.unwrap_or_default();
        let kind = MediaKind::from_mime(&media_type)
            .ok_or(ValidationError::UnsupportedMediaKind(media_type))?;

        let description = request
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());

        Ok(ValidatedUpload {
            kind,
            title: title.to_string(),
            description,
            payload,
        })
    }

    fn next_created_at(&mut self) -> i64 {
        let now = Utc::now().timestamp_millis();
        let created_at = now.max(self.last_created_at.saturating_add(1));
        self.last_created_at = created_at;
        created_at
    }
}
