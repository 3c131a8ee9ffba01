use crate::blob_store::{BlobStore, SqliteBlobStore, StoreStats};
use crate::catalog::CatalogService;
use crate::config::Config;
use crate::entry::Entry;
use crate::error::{CatalogError, LayoutError, StorageError};
use crate::focus::CarouselLayout;
use crate::locator::LocatorRegistry;
use crate::static_catalog::StaticCatalog;
use crate::upload::{UploadRequest, UploadTransaction};
use anyhow::{Context, Result};
use chrono::Utc;
use std::sync::Arc;
use tracing::info;

/// Everything one gallery session owns: the blob store, the locator
/// registry, the loaded catalog and the upload transaction.
pub struct GallerySession {
    config: Config,
    store: Arc<SqliteBlobStore>,
    locators: Arc<LocatorRegistry>,
    catalog: CatalogService,
    uploads: UploadTransaction,
}

impl GallerySession {
    /// Open the blob store, seed the static catalog and load the merged list
    pub async fn open(config: &Config) -> Result<Self> {
        let locators = Arc::new(LocatorRegistry::new());

        let store = Arc::new(
            SqliteBlobStore::new(&config.store, locators.clone())
                .await
                .context("Failed to open blob store")?,
        );

        if config.store.run_migrations {
            store
                .run_migrations()
                .await
                .context("Failed to run blob store migrations")?;
        }

        let statics = StaticCatalog::builtin(Utc::now().timestamp_millis());
        let shared: Arc<dyn BlobStore> = store.clone();
        let mut catalog = CatalogService::new(shared, locators.clone(), statics);
        catalog.load().await;

        info!(
            service = %config.service.name,
            entries = catalog.len(),
            "Gallery session opened"
        );

        Ok(Self {
            config: config.clone(),
            store,
            locators,
            catalog,
            uploads: UploadTransaction::new(&config.upload),
        })
    }

    /// Validate and commit an upload
    pub async fn upload(&mut self, request: UploadRequest) -> Result<Entry, CatalogError> {
        self.uploads.commit(&mut self.catalog, request).await
    }

    pub fn catalog(&self) -> &CatalogService {
        &self.catalog
    }

    pub fn catalog_mut(&mut self) -> &mut CatalogService {
        &mut self.catalog
    }

    pub fn locators(&self) -> &Arc<LocatorRegistry> {
        &self.locators
    }

    /// Carousel geometry for a viewport of the given width
    pub fn layout(&self, viewport_width: f64) -> Result<CarouselLayout, LayoutError> {
        CarouselLayout::from_viewport(viewport_width, &self.config.carousel)
    }

    pub async fn stats(&self) -> Result<StoreStats, StorageError> {
        self.store.stats().await
    }

    /// Release every locator and close the blob store
    pub async fn close(self) {
        let live = self.locators.revoke_all();
        self.store.close().await;
        info!(released_locators = live, "Gallery session closed");
    }
}
