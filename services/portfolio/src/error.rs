//! Error taxonomy for the portfolio store.
//!
//! Storage failures come from the blob store, protection failures from the
//! catalog, and validation failures from uploads and catalog inserts. The
//! catalog and upload surfaces return [`CatalogError`], which wraps all three.

use std::time::Duration;
use thiserror::Error;

/// Underlying device storage is unavailable, denied, or exhausted
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Storage permission denied: {0}")]
    PermissionDenied(String),

    #[error("Storage exhausted: {0}")]
    Exhausted(String),

    #[error("Storage operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Corrupt record {id}: {message}")]
    Corrupt { id: String, message: String },
}

// SQLite primary result codes
const SQLITE_PERM: i32 = 3;
const SQLITE_READONLY: i32 = 8;
const SQLITE_FULL: i32 = 13;
const SQLITE_CANTOPEN: i32 = 14;
const SQLITE_AUTH: i32 = 23;

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) => {
                // Extended codes carry the primary code in the low byte
                let primary = db
                    .code()
                    .and_then(|code| code.parse::<i32>().ok())
                    .map(|code| code & 0xff);

                match primary {
                    Some(SQLITE_FULL) => StorageError::Exhausted(db.message().to_string()),
                    Some(SQLITE_PERM) | Some(SQLITE_READONLY) | Some(SQLITE_AUTH) => {
                        StorageError::PermissionDenied(db.message().to_string())
                    }
                    Some(SQLITE_CANTOPEN) => StorageError::Unavailable(db.message().to_string()),
                    _ => StorageError::Unavailable(err.to_string()),
                }
            }
            sqlx::Error::Io(io) if io.kind() == std::io::ErrorKind::PermissionDenied => {
                StorageError::PermissionDenied(io.to_string())
            }
            _ => StorageError::Unavailable(err.to_string()),
        }
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::PermissionDenied => StorageError::PermissionDenied(err.to_string()),
            _ => StorageError::Unavailable(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for StorageError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        StorageError::Unavailable(format!("migration failed: {err}"))
    }
}

/// Attempted deletion of a delete-protected static entry
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Entry {id} is part of the static catalog and cannot be deleted")]
pub struct ProtectedEntryError {
    pub id: String,
}

/// Rejected upload or catalog insert. Raised before any mutation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("No payload provided")]
    MissingPayload,

    #[error("Title must not be empty")]
    EmptyTitle,

    #[error("Unsupported media type: {0}")]
    UnsupportedMediaKind(String),

    #[error("Payload of {size} bytes exceeds the {limit} byte limit")]
    PayloadTooLarge { size: usize, limit: usize },

    #[error("Entry id {0} already exists")]
    DuplicateId(String),

    #[error("Entry id {0} uses the reserved static prefix")]
    ReservedId(String),

    #[error("Static entry id {0} must start with 'static-'")]
    NotStaticId(String),
}

/// Invalid carousel geometry
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LayoutError {
    #[error("Item width must be a positive finite number, got {0}")]
    InvalidItemWidth(f64),

    #[error("Gap must be a non-negative finite number, got {0}")]
    InvalidGap(f64),
}

/// Errors surfaced by the catalog service and upload transaction
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Protected(#[from] ProtectedEntryError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The entry already left the in-memory list when the store failed
    #[error("Failed to delete {id} from storage: {source}")]
    DeleteFailed {
        id: String,
        #[source]
        source: StorageError,
    },

    #[error("Catalog is still loading")]
    NotReady,
}

impl CatalogError {
    /// Whether memory and storage may disagree, so the caller should
    /// recommend a reload. Only a failed delete leaves drift behind.
    pub fn needs_reconcile(&self) -> bool {
        matches!(self, CatalogError::DeleteFailed { .. })
    }
}
