use crate::entry::{is_static_id, sort_newest_first, Entry, EntryMetadata, MediaKind};
use crate::error::ValidationError;
use crate::locator::Locator;
use std::collections::HashSet;
use tracing::error;

/// Spacing between synthetic static timestamps
const STATIC_TIMESTAMP_STEP_MS: i64 = 1000;

const CLOUDINARY_BASE: &str = "https://res.cloudinary.com/dk28stjwf/video/upload";

/// Built-in curated entries, newest first: (id, title, path under the CDN base)
const BUILTIN_ENTRIES: &[(&str, &str, &str)] = &[
    (
        "static-1",
        "国风",
        "v1765126738/10%E6%9C%8829%E6%97%A5_hcir9n.mp4",
    ),
    (
        "static-2",
        "沈星回",
        "v1765126675/11%E6%9C%882%E6%97%A5_1_iqzfyu.mp4",
    ),
    ("static-3", "why not", "why_not_bagkb1.mp4"),
    (
        "static-4",
        "变形记",
        "v1765126985/%E5%8F%98%E5%BD%A2%E8%AE%B0__%E5%8E%8B%E7%BC%A9_hdq2cq.mp4",
    ),
    (
        "static-5",
        "工位越近，素质越低",
        "v1765126559/%E5%B7%A5%E4%BD%8D%E8%B6%8A%E8%BF%91_%E7%B4%A0%E8%B4%A8%E8%B6%8A%E4%BD%8E_ix2h30.mp4",
    ),
    (
        "static-6",
        "琉璃山",
        "v1765126344/%E7%8E%BB%E7%92%83%E5%B1%B1_hq2bai.mp4",
    ),
];

/// Definition of one static entry before timestamps are assigned
#[derive(Debug, Clone)]
pub struct StaticEntrySpec {
    pub id: String,
    pub kind: MediaKind,
    pub title: String,
    pub description: Option<String>,
    pub url: String,
}

fn builtin_specs() -> Vec<StaticEntrySpec> {
    BUILTIN_ENTRIES
        .iter()
        .map(|(id, title, path)| StaticEntrySpec {
            id: id.to_string(),
            kind: MediaKind::Video,
            title: title.to_string(),
            description: Some("AIGC Video Art".to_string()),
            url: format!("{CLOUDINARY_BASE}/{path}"),
        })
        .collect()
}

/// Immutable, delete-protected set of curated entries
#[derive(Debug, Clone)]
pub struct StaticCatalog {
    entries: Vec<Entry>,
}

impl StaticCatalog {
    /// Build the catalog from specs listed newest first.
    ///
    /// Timestamps are skewed into the future relative to `session_start_ms`
    /// so that static entries always sort ahead of real uploads.
    pub fn new(specs: Vec<StaticEntrySpec>, session_start_ms: i64) -> Result<Self, ValidationError> {
        let mut seen = HashSet::with_capacity(specs.len());
        let count = specs.len() as i64;
        let mut entries = Vec::with_capacity(specs.len());

        for (position, spec) in specs.into_iter().enumerate() {
            if !is_static_id(&spec.id) {
                return Err(ValidationError::NotStaticId(spec.id));
            }
            if !seen.insert(spec.id.clone()) {
                return Err(ValidationError::DuplicateId(spec.id));
            }
            if spec.title.trim().is_empty() {
                return Err(ValidationError::EmptyTitle);
            }

            let skew = (count - position as i64) * STATIC_TIMESTAMP_STEP_MS;
            let metadata = EntryMetadata {
                id: spec.id,
                kind: spec.kind,
                title: spec.title,
                description: spec.description,
                created_at: session_start_ms + skew,
            };
            entries.push(Entry::new(metadata, Locator::Remote(spec.url)));
        }

        sort_newest_first(&mut entries);
        Ok(Self { entries })
    }

    /// The gallery's built-in curated videos.
    ///
    /// An invalid built-in table is logged and yields an empty catalog.
    pub fn builtin(session_start_ms: i64) -> Self {
        match Self::new(builtin_specs(), session_start_ms) {
            Ok(catalog) => catalog,
            Err(e) => {
                error!(error = %e, "Built-in static catalog is invalid, starting without curated entries");
                metrics::counter!("portfolio.catalog.invalid_builtin").increment(1);
                Self::empty()
            }
        }
    }

    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Entries, newest first
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.iter().any(|entry| entry.id() == id)
    }

    pub fn get(&self, id: &str) -> Option<&Entry> {
        self.entries.iter().find(|entry| entry.id() == id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
