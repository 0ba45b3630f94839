//! Locally addressable video blobs.
//!
//! Downloaded videos are registered under a `blob:` URL that a player can
//! resolve later. Entries hold their bytes until revoked.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

const SCHEME_PREFIX: &str = "blob:veo-studio/";

/// A `blob:` URL referring to an entry in an [`ObjectUrlStore`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectUrl(String);

impl ObjectUrl {
    fn generate() -> Self {
        Self(format!("{SCHEME_PREFIX}{}", uuid::Uuid::new_v4()))
    }

    /// Returns the URL as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ObjectUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Bytes and MIME type behind an object URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    /// Content bytes.
    pub data: Bytes,
    /// MIME type.
    pub mime_type: String,
}

/// Shared registry of object URLs. Clones share the same entries.
#[derive(Debug, Clone, Default)]
pub struct ObjectUrlStore {
    entries: Arc<Mutex<HashMap<ObjectUrl, Blob>>>,
}

impl ObjectUrlStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ObjectUrl, Blob>> {
        // A poisoned map is still structurally valid.
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Registers bytes and returns a fresh URL for them.
    pub fn create(&self, data: Bytes, mime_type: impl Into<String>) -> ObjectUrl {
        let url = ObjectUrl::generate();
        self.lock().insert(
            url.clone(),
            Blob {
                data,
                mime_type: mime_type.into(),
            },
        );
        url
    }

    /// Looks up a live URL.
    pub fn get(&self, url: &ObjectUrl) -> Option<Blob> {
        self.lock().get(url).cloned()
    }

    /// Releases a URL and its bytes. Returns false if it was already revoked.
    pub fn revoke(&self, url: &ObjectUrl) -> bool {
        let removed = self.lock().remove(url).is_some();
        if removed {
            tracing::debug!(url = %url, "revoked object URL");
        }
        removed
    }

    /// Number of live URLs.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// True if no URLs are live.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
