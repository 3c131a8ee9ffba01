//! Portfolio Store
//!
//! Local media catalog behind the portfolio gallery. A fixed set of curated
//! static entries is merged with user uploads persisted on the device, and a
//! pure focus model tells the carousel how far each card sits from center.
//!
//! ## Features
//!
//! - **Static Catalog**: Built-in, delete-protected entries served from
//!   remote addresses, always shown ahead of uploads
//! - **Local Blob Store**: SQLite-backed `id -> (metadata, payload)` storage
//!   with one short-lived pooled connection per operation
//! - **Catalog Service**: Ordered merge of static and stored entries,
//!   persist-then-show adds and optimistic deletes with reconciliation
//! - **Upload Transaction**: Validation gate in front of the catalog
//! - **Focus Model**: Continuous per-card focus factor for the carousel
//!
//! ## Architecture
//!
//! ```text
//!   File Picker                                      Carousel
//! ┌──────────────┐                               ┌──────────────┐
//! │ Upload       │                               │ Focus        │
//! │ Transaction  │                               │ Model        │
//! └──────────────┘                               └──────────────┘
//!        │                                              ▲
//!        ▼                                              │
//! ┌──────────────┐           ┌──────────────┐          │
//! │ Catalog      │◀──────────│ Static       │          │
//! │ Service      │           │ Catalog      │          │
//! └──────────────┘           └──────────────┘          │
//!        │      │                                       │
//!        │      └──────────── entries ─────────────────┘
//!        ▼
//! ┌──────────────┐           ┌──────────────┐
//! │ SQLite       │──────────▶│ Locator      │
//! │ Blob Store   │           │ Registry     │
//! └──────────────┘           └──────────────┘
//! ```

pub mod blob_store;
pub mod catalog;
pub mod config;
pub mod entry;
pub mod error;
pub mod focus;
pub mod locator;
pub mod session;
pub mod static_catalog;
pub mod upload;

pub use blob_store::{BlobStore, SqliteBlobStore, StoreStats};
pub use catalog::{CatalogService, CatalogState};
pub use config::Config;
pub use entry::{is_static_id, Entry, EntryMetadata, MediaKind, STATIC_ID_PREFIX};
pub use error::{CatalogError, LayoutError, ProtectedEntryError, StorageError, ValidationError};
pub use focus::{CardStyle, CarouselLayout, ItemFocus, FOCUS_FACTOR_LIMIT};
pub use locator::{Locator, LocatorRegistry, PreviewHandle};
pub use session::GallerySession;
pub use static_catalog::{StaticCatalog, StaticEntrySpec};
pub use upload::{UploadRequest, UploadTransaction};
