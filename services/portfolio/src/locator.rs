//! Payload locators.
//!
//! Static entries point at a remote address that never changes. Stored
//! entries get a local locator minted from the payload every time the
//! record is read; the locator lives in a [`LocatorRegistry`] until it is
//! revoked and is meaningless in any other process.

use bytes::Bytes;
use parking_lot::RwLock;
use serde::{Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::trace;
use uuid::Uuid;

/// Scheme prefix of rendered local locators
pub const LOCAL_LOCATOR_SCHEME: &str = "blob:portfolio/";

/// Resolvable reference to a media payload
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Locator {
    /// Remote address of a static entry
    Remote(String),
    /// Process-scoped handle registered in a [`LocatorRegistry`]
    Local(Uuid),
}

impl Locator {
    pub fn is_local(&self) -> bool {
        matches!(self, Locator::Local(_))
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Remote(url) => f.write_str(url),
            Locator::Local(handle) => write!(f, "{LOCAL_LOCATOR_SCHEME}{handle}"),
        }
    }
}

impl Serialize for Locator {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

/// Table of live local locators and the payloads they resolve to
#[derive(Debug, Default)]
pub struct LocatorRegistry {
    handles: RwLock<HashMap<Uuid, Bytes>>,
}

impl LocatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint a fresh local locator for a payload
    pub fn open(&self, payload: Bytes) -> Locator {
        let handle = Uuid::new_v4();
        self.handles.write().insert(handle, payload);
        trace!(handle = %handle, "Opened local locator");
        Locator::Local(handle)
    }

    /// Payload behind a live local locator. Remote locators resolve to `None`.
    pub fn read(&self, locator: &Locator) -> Option<Bytes> {
        match locator {
            Locator::Local(handle) => self.handles.read().get(handle).cloned(),
            Locator::Remote(_) => None,
        }
    }

    /// Release a local locator. Returns whether it was live.
    pub fn revoke(&self, locator: &Locator) -> bool {
        match locator {
            Locator::Local(handle) => {
                let removed = self.handles.write().remove(handle).is_some();
                if removed {
                    trace!(handle = %handle, "Revoked local locator");
                }
                removed
            }
            Locator::Remote(_) => false,
        }
    }

    pub fn is_live(&self, locator: &Locator) -> bool {
        match locator {
            Locator::Local(handle) => self.handles.read().contains_key(handle),
            Locator::Remote(_) => false,
        }
    }

    /// Release every live locator. Returns how many were live.
    pub fn revoke_all(&self) -> usize {
        let mut handles = self.handles.write();
        let live = handles.len();
        handles.clear();
        live
    }

    /// Number of live local locators
    pub fn len(&self) -> usize {
        self.handles.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.read().is_empty()
    }

    /// Mint a locator that is revoked when the returned handle is dropped
    pub fn preview(self: &Arc<Self>, payload: Bytes) -> PreviewHandle {
        let locator = self.open(payload);
        self.scoped(locator)
    }

    /// Tie an already minted locator to a handle that revokes it on drop.
    /// Remote locators pass through untouched.
    pub fn scoped(self: &Arc<Self>, locator: Locator) -> PreviewHandle {
        PreviewHandle {
            registry: Arc::clone(self),
            locator,
        }
    }
}

/// Scoped locator for a pending upload or a resolved payload.
///
/// Dropping the handle revokes the locator on every exit path.
#[derive(Debug)]
pub struct PreviewHandle {
    registry: Arc<LocatorRegistry>,
    locator: Locator,
}

impl PreviewHandle {
    pub fn locator(&self) -> &Locator {
        &self.locator
    }
}

impl Drop for PreviewHandle {
    fn drop(&mut self) {
        self.registry.revoke(&self.locator);
    }
}
