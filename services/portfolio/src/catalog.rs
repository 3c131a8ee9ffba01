use crate::blob_store::BlobStore;
use crate::entry::{is_static_id, sort_newest_first, Entry, EntryMetadata};
use crate::error::{CatalogError, ProtectedEntryError, StorageError, ValidationError};
use crate::locator::{LocatorRegistry, PreviewHandle};
use crate::static_catalog::StaticCatalog;
use bytes::Bytes;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// Observable lifecycle of the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogState {
    /// `load()` has not resolved yet
    Loading,
    /// Loaded. `degraded` is set when the blob store failed and only the
    /// static entries are shown.
    Ready { degraded: bool },
}

/// Single source of truth for which entries exist and in what order.
///
/// Order is always: static entries (newest first), then stored entries
/// (newest first). Mutations take `&mut self`, so calls are serialized in
/// call order within a session.
pub struct CatalogService {
    store: Arc<dyn BlobStore>,
    locators: Arc<LocatorRegistry>,
    statics: StaticCatalog,
    entries: Vec<Entry>,
    state: CatalogState,
}

impl CatalogService {
    /// Create a catalog in the `Loading` state
    pub fn new(
        store: Arc<dyn BlobStore>,
        locators: Arc<LocatorRegistry>,
        statics: StaticCatalog,
    ) -> Self {
        Self {
            store,
            locators,
            statics,
            entries: Vec::new(),
            state: CatalogState::Loading,
        }
    }

    /// Fetch stored entries and merge them behind the static ones.
    ///
    /// A failing blob store degrades the catalog to the static entries
    /// instead of failing.
    #[instrument(skip(self))]
    pub async fn load(&mut self) -> &[Entry] {
        let (stored, degraded) = match self.store.list_all().await {
            Ok(stored) => (stored, false),
            Err(e) => {
                error!(error = %e, "Failed to load stored entries, showing static catalog only");
                metrics::counter!("portfolio.catalog.degraded_loads").increment(1);
                (Vec::new(), true)
            }
        };

        let merged = self.merge(stored);
        let previous = std::mem::replace(&mut self.entries, merged);
        self.revoke_entries(&previous);
        self.state = CatalogState::Ready { degraded };

        info!(
            total = self.entries.len(),
            static_count = self.statics.len(),
            degraded,
            "Catalog loaded"
        );

        &self.entries
    }

    /// Re-run `load()` to resolve drift between memory and storage, e.g.
    /// after a failed delete.
    pub async fn reconcile(&mut self) -> &[Entry] {
        info!("Reconciling catalog with blob store");
        self.load().await
    }

    /// Persist a new entry, then show it at the head of the stored entries.
    ///
    /// On storage failure the in-memory list is left untouched.
    #[instrument(skip(self, metadata, payload), fields(id = %metadata.id, size_bytes = payload.len()))]
    pub async fn add(&mut self, metadata: EntryMetadata, payload: Bytes) -> Result<Entry, CatalogError> {
        self.ensure_ready()?;

        if metadata.title.trim().is_empty() {
            return Err(ValidationError::EmptyTitle.into());
        }
        if is_static_id(&metadata.id) {
            return Err(ValidationError::ReservedId(metadata.id).into());
        }
        if self.contains(&metadata.id) {
            return Err(ValidationError::DuplicateId(metadata.id).into());
        }

        if let Err(e) = self.store.put(&metadata, payload.clone()).await {
            error!(id = %metadata.id, error = %e, "Failed to persist entry");
            metrics::counter!("portfolio.catalog.add_failures").increment(1);
            return Err(e.into());
        }

        let locator = self.locators.open(payload);
        let position = self.stored_start();
        self.entries.insert(position, Entry::new(metadata, locator));

        metrics::counter!("portfolio.entries.added").increment(1);

        let entry = self.entries[position].clone();
        info!(id = %entry.id(), kind = %entry.kind(), "Entry added");
        Ok(entry)
    }

    /// Delete a stored entry.
    ///
    /// Static entries are rejected without touching storage. Otherwise the
    /// entry leaves the in-memory list before the store is asked to delete
    /// it, and a storage failure is reported without restoring it; callers
    /// resolve the drift with [`CatalogService::reconcile`].
    #[instrument(skip(self))]
    pub async fn remove(&mut self, id: &str) -> Result<(), CatalogError> {
        if is_static_id(id) {
            warn!(id = %id, "Rejected deletion of static entry");
            return Err(ProtectedEntryError { id: id.to_string() }.into());
        }

        self.ensure_ready()?;

        if let Some(position) = self.entries.iter().position(|entry| entry.id() == id) {
            let removed = self.entries.remove(position);
            self.locators.revoke(&removed.locator);
        } else {
            debug!(id = %id, "Entry not in memory, deleting from store anyway");
        }

        if let Err(source) = self.store.delete(id).await {
            error!(id = %id, error = %source, "Failed to delete entry from storage");
            metrics::counter!("portfolio.catalog.remove_failures").increment(1);
            return Err(CatalogError::DeleteFailed {
                id: id.to_string(),
                source,
            });
        }

        metrics::counter!("portfolio.entries.removed").increment(1);
        info!(id = %id, "Entry removed");
        Ok(())
    }

    /// Resolve a payload locator for an entry.
    ///
    /// Static entries resolve to their remote address. Stored entries get a
    /// new local locator on every call, revoked when the returned handle is
    /// dropped.
    #[instrument(skip(self))]
    pub async fn resolve_locator(&self, id: &str) -> Result<Option<PreviewHandle>, StorageError> {
        if let Some(entry) = self.statics.get(id) {
            return Ok(Some(self.locators.scoped(entry.locator.clone())));
        }

        let resolved = self.store.get(id).await?;
        Ok(resolved.map(|entry| self.locators.scoped(entry.locator)))
    }

    /// Merged entries in display order
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn get(&self, id: &str) -> Option<&Entry> {
        self.entries.iter().find(|entry| entry.id() == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.statics.contains(id) || self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn state(&self) -> CatalogState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, CatalogState::Ready { .. })
    }

    pub fn statics(&self) -> &StaticCatalog {
        &self.statics
    }

    fn ensure_ready(&self) -> Result<(), CatalogError> {
        if self.is_ready() {
            Ok(())
        } else {
            Err(CatalogError::NotReady)
        }
    }

    /// Index of the first stored entry
    fn stored_start(&self) -> usize {
        self.entries
            .iter()
            .position(|entry| !entry.is_static())
            .unwrap_or(self.entries.len())
    }

    fn merge(&self, mut stored: Vec<Entry>) -> Vec<Entry> {
        let mut seen: HashSet<String> = self
            .statics
            .entries()
            .iter()
            .map(|entry| entry.id().to_string())
            .collect();

        stored.retain(|entry| {
            if seen.insert(entry.id().to_string()) {
                true
            } else {
                warn!(id = %entry.id(), "Skipping stored entry with a conflicting id");
                self.locators.revoke(&entry.locator);
                false
            }
        });
        sort_newest_first(&mut stored);

        let mut merged = Vec::with_capacity(self.statics.len() + stored.len());
        merged.extend(self.statics.entries().iter().cloned());
        merged.extend(stored);
        merged
    }

    fn revoke_entries(&self, entries: &[Entry]) {
        for entry in entries {
            self.locators.revoke(&entry.locator);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob_store::MockBlobStore;
    use crate::entry::MediaKind;
    use crate::locator::Locator;
    use crate::static_catalog::StaticEntrySpec;

    const NOW: i64 = 1_733_500_000_000;

    fn metadata(id: &str, created_at: i64) -> EntryMetadata {
        EntryMetadata {
            id: id.to_string(),
            kind: MediaKind::Image,
            title: format!("Entry {id}"),
            description: None,
            created_at,
        }
    }

    fn stored(registry: &LocatorRegistry, id: &str, created_at: i64) -> Entry {
        Entry::new(metadata(id, created_at), registry.open(Bytes::from_static(b"payload")))
    }

    fn statics(count: usize) -> StaticCatalog {
        let specs = (1..=count)
            .map(|n| StaticEntrySpec {
                id: format!("static-{n}"),
                kind: MediaKind::Video,
                title: format!("Curated {n}"),
                description: None,
                url: format!("https://cdn.example.com/{n}.mp4"),
            })
            .collect();
        StaticCatalog::new(specs, NOW).unwrap()
    }

    fn ids(entries: &[Entry]) -> Vec<&str> {
        entries.iter().map(|entry| entry.id()).collect()
    }

    async fn ready_catalog(mut store: MockBlobStore, registry: Arc<LocatorRegistry>) -> CatalogService {
        let seeded = vec![
            stored(&registry, "100", 100),
            stored(&registry, "300", 300),
            stored(&registry, "200", 200),
        ];
        store.expect_list_all().times(1).return_once(move || Ok(seeded));

        let mut catalog = CatalogService::new(Arc::new(store), registry, statics(2));
        catalog.load().await;
        catalog
    }

    #[tokio::test]
    async fn test_load_orders_static_first_then_stored_newest_first() {
        let registry = Arc::new(LocatorRegistry::new());
        let catalog = ready_catalog(MockBlobStore::new(), registry).await;

        assert_eq!(
            ids(catalog.entries()),
            vec!["static-1", "static-2", "300", "200", "100"]
        );
        assert_eq!(catalog.state(), CatalogState::Ready { degraded: false });
    }

    #[tokio::test]
    async fn test_load_degrades_to_static_catalog() {
        let mut store = MockBlobStore::new();
        store
            .expect_list_all()
            .returning(|| Err(StorageError::Unavailable("database is locked".to_string())));

        let registry = Arc::new(LocatorRegistry::new());
        let mut catalog = CatalogService::new(Arc::new(store), registry, statics(6));
        assert_eq!(catalog.state(), CatalogState::Loading);

        let loaded = catalog.load().await;
        assert_eq!(loaded.len(), 6);
        assert_eq!(catalog.state(), CatalogState::Ready { degraded: true });
    }

    #[tokio::test]
    async fn test_load_skips_stored_ids_that_collide_with_static() {
        let registry = Arc::new(LocatorRegistry::new());
        let clash = stored(&registry, "static-1", 10);
        let clash_locator = clash.locator.clone();

        let mut store = MockBlobStore::new();
        store
            .expect_list_all()
            .return_once(move || Ok(vec![clash]));

        let mut catalog = CatalogService::new(Arc::new(store), registry.clone(), statics(2));
        catalog.load().await;

        assert_eq!(ids(catalog.entries()), vec!["static-1", "static-2"]);
        assert!(!registry.is_live(&clash_locator));
    }

    #[tokio::test]
    async fn test_mutations_require_ready_state() {
        let mut store = MockBlobStore::new();
        store.expect_put().never();
        store.expect_delete().never();

        let registry = Arc::new(LocatorRegistry::new());
        let mut catalog = CatalogService::new(Arc::new(store), registry, statics(1));

        let added = catalog
            .add(metadata("1", NOW), Bytes::from_static(b"x"))
            .await;
        assert!(matches!(added, Err(CatalogError::NotReady)));

        let removed = catalog.remove("1").await;
        assert!(matches!(removed, Err(CatalogError::NotReady)));
    }

    #[tokio::test]
    async fn test_add_inserts_after_static_entries() {
        let mut store = MockBlobStore::new();
        store.expect_put().times(1).returning(|_, _| Ok(()));

        let registry = Arc::new(LocatorRegistry::new());
        let mut catalog = ready_catalog(store, registry.clone()).await;

        let entry = catalog
            .add(metadata("400", 400), Bytes::from_static(b"new payload"))
            .await
            .unwrap();
        assert_eq!(
            registry.read(&entry.locator),
            Some(Bytes::from_static(b"new payload"))
        );

        assert_eq!(
            ids(catalog.entries()),
            vec!["static-1", "static-2", "400", "300", "200", "100"]
        );
    }

    #[tokio::test]
    async fn test_add_rejects_duplicates_and_empty_titles() {
        let mut store = MockBlobStore::new();
        store.expect_put().never();

        let registry = Arc::new(LocatorRegistry::new());
        let mut catalog = ready_catalog(store, registry).await;

        let duplicate = catalog.add(metadata("300", NOW), Bytes::from_static(b"x")).await;
        assert!(matches!(
            duplicate,
            Err(CatalogError::Validation(ValidationError::DuplicateId(_)))
        ));

        let mut untitled = metadata("500", NOW);
        untitled.title = "   ".to_string();
        let untitled = catalog.add(untitled, Bytes::from_static(b"x")).await;
        assert!(matches!(
            untitled,
            Err(CatalogError::Validation(ValidationError::EmptyTitle))
        ));

        let reserved = catalog.add(metadata("static-9", NOW), Bytes::from_static(b"x")).await;
        assert!(matches!(
            reserved,
            Err(CatalogError::Validation(ValidationError::ReservedId(_)))
        ));

        assert_eq!(catalog.len(), 5);
    }

    #[tokio::test]
    async fn test_failed_put_leaves_catalog_unchanged() {
        let mut store = MockBlobStore::new();
        store
            .expect_put()
            .times(1)
            .returning(|_, _| Err(StorageError::Exhausted("quota exceeded".to_string())));

        let registry = Arc::new(LocatorRegistry::new());
        let mut catalog = ready_catalog(store, registry.clone()).await;
        let before = catalog.len();
        let live_before = registry.len();

        let result = catalog
            .add(metadata("400", 400), Bytes::from_static(b"too big"))
            .await;

        match result {
            Err(err @ CatalogError::Storage(StorageError::Exhausted(_))) => {
                assert!(!err.needs_reconcile());
            }
            other => panic!("Expected Storage(Exhausted), got {:?}", other),
        }
        assert_eq!(catalog.len(), before);
        assert!(catalog.get("400").is_none());
        assert_eq!(registry.len(), live_before);
    }

    #[tokio::test]
    async fn test_remove_static_never_reaches_store() {
        let mut store = MockBlobStore::new();
        store.expect_delete().never();

        let registry = Arc::new(LocatorRegistry::new());
        let mut catalog = ready_catalog(store, registry).await;

        for id in ["static-1", "static-2", "static-unknown"] {
            match catalog.remove(id).await {
                Err(CatalogError::Protected(err)) => assert_eq!(err.id, id),
                other => panic!("Expected Protected, got {:?}", other),
            }
        }
        assert_eq!(catalog.len(), 5);
    }

    #[tokio::test]
    async fn test_remove_is_optimistic_when_store_fails() {
        let mut store = MockBlobStore::new();
        store
            .expect_delete()
            .withf(|id| id == "200")
            .times(1)
            .returning(|_| Err(StorageError::PermissionDenied("read-only".to_string())));

        let registry = Arc::new(LocatorRegistry::new());
        let mut catalog = ready_catalog(store, registry.clone()).await;
        let locator = catalog.get("200").unwrap().locator.clone();

        let result = catalog.remove("200").await;

        match &result {
            Err(CatalogError::DeleteFailed { id, source }) => {
                assert_eq!(id, "200");
                assert!(matches!(source, StorageError::PermissionDenied(_)));
            }
            other => panic!("Expected DeleteFailed, got {:?}", other),
        }
        assert!(result.unwrap_err().needs_reconcile());
        assert!(catalog.get("200").is_none());
        assert_eq!(catalog.len(), 4);
        assert!(!registry.is_live(&locator));
    }

    #[tokio::test]
    async fn test_remove_unknown_id_is_idempotent() {
        let mut store = MockBlobStore::new();
        store.expect_delete().times(2).returning(|_| Ok(()));

        let registry = Arc::new(LocatorRegistry::new());
        let mut catalog = ready_catalog(store, registry).await;

        catalog.remove("does-not-exist").await.unwrap();
        catalog.remove("does-not-exist").await.unwrap();
        assert_eq!(catalog.len(), 5);
    }

    #[tokio::test]
    async fn test_reconcile_restores_entry_after_failed_delete() {
        let registry = Arc::new(LocatorRegistry::new());
        let first = vec![stored(&registry, "100", 100)];
        let second = vec![stored(&registry, "100", 100)];

        let mut store = MockBlobStore::new();
        let mut loads = vec![second, first];
        store
            .expect_list_all()
            .times(2)
            .returning(move || Ok(loads.pop().unwrap_or_default()));
        store
            .expect_delete()
            .returning(|_| Err(StorageError::Unavailable("disk detached".to_string())));

        let mut catalog = CatalogService::new(Arc::new(store), registry.clone(), statics(1));
        catalog.load().await;
        let stale = catalog.get("100").unwrap().locator.clone();

        assert!(catalog.remove("100").await.is_err());
        assert!(catalog.get("100").is_none());

        catalog.reconcile().await;
        let fresh = catalog.get("100").unwrap().locator.clone();

        assert_ne!(stale, fresh);
        assert!(registry.is_live(&fresh));
        assert!(!registry.is_live(&stale));
    }

    #[tokio::test]
    async fn test_resolve_locator() {
        let registry = Arc::new(LocatorRegistry::new());
        let fetched = stored(&registry, "300", 300);
        let fetched_locator = fetched.locator.clone();

        let mut store = MockBlobStore::new();
        store
            .expect_get()
            .withf(|id| id == "300")
            .return_once(move |_| Ok(Some(fetched)));
        store.expect_get().returning(|_| Ok(None));

        let catalog = ready_catalog(store, registry.clone()).await;

        let remote = catalog.resolve_locator("static-1").await.unwrap().unwrap();
        assert_eq!(
            remote.locator(),
            &Locator::Remote("https://cdn.example.com/1.mp4".to_string())
        );

        let local = catalog.resolve_locator("300").await.unwrap().unwrap();
        assert_eq!(local.locator(), &fetched_locator);
        assert!(registry.is_live(&fetched_locator));
        drop(local);
        assert!(!registry.is_live(&fetched_locator));

        assert!(catalog.resolve_locator("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_repeated_resolves_do_not_accumulate_locators() {
        let registry = Arc::new(LocatorRegistry::new());
        let minting = registry.clone();

        let mut store = MockBlobStore::new();
        store
            .expect_get()
            .returning(move |id| Ok(Some(stored(&minting, id, 100))));

        let catalog = ready_catalog(store, registry.clone()).await;
        let baseline = registry.len();

        for _ in 0..1000 {
            let handle = catalog.resolve_locator("abc").await.unwrap().unwrap();
            assert!(registry.is_live(handle.locator()));
        }

        assert_eq!(registry.len(), baseline);
    }
}
