use crate::locator::Locator;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Id prefix reserved for entries of the static catalog
pub const STATIC_ID_PREFIX: &str = "static-";

/// Whether an id belongs to the static, delete-protected catalog
pub fn is_static_id(id: &str) -> bool {
    id.starts_with(STATIC_ID_PREFIX)
}

/// Kind of media carried by an entry
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Infer the kind from a declared MIME type (`image/*` or `video/*`)
    pub fn from_mime(mime: &str) -> Option<Self> {
        let top_level = mime.split('/').next()?.trim().to_ascii_lowercase();
        match top_level.as_str() {
            "image" if mime.contains('/') => Some(MediaKind::Image),
            "video" if mime.contains('/') => Some(MediaKind::Video),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "image" => Ok(MediaKind::Image),
            "video" => Ok(MediaKind::Video),
            other => Err(format!("unknown media kind '{other}'")),
        }
    }
}

/// Persisted part of an entry. Everything except the locator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EntryMetadata {
    /// Stable identity
    pub id: String,
    /// Image or video
    pub kind: MediaKind,
    /// Display title, never empty
    pub title: String,
    /// Optional display description
    pub description: Option<String>,
    /// Milliseconds since the Unix epoch, newest first in the carousel
    pub created_at: i64,
}

impl EntryMetadata {
    pub fn is_static(&self) -> bool {
        is_static_id(&self.id)
    }
}

/// A portfolio item as seen by presentation
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Entry {
    #[serde(flatten)]
    pub metadata: EntryMetadata,
    /// Payload reference. Ephemeral for stored entries; never compare it
    /// for identity, use `id`.
    pub locator: Locator,
}

impl Entry {
    pub fn new(metadata: EntryMetadata, locator: Locator) -> Self {
        Self { metadata, locator }
    }

    pub fn id(&self) -> &str {
        &self.metadata.id
    }

    pub fn kind(&self) -> MediaKind {
        self.metadata.kind
    }

    pub fn title(&self) -> &str {
        &self.metadata.title
    }

    pub fn created_at(&self) -> i64 {
        self.metadata.created_at
    }

    pub fn is_static(&self) -> bool {
        self.metadata.is_static()
    }
}

/// Sort entries newest first
pub(crate) fn sort_newest_first(entries: &mut [Entry]) {
    entries.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
}
