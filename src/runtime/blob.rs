//! Transient object URLs backing downloads.
//!
//! `BlobStore::create_object_url` registers bytes and hands back an `ObjectUrl`
//! guard. Dropping the guard revokes the URL, so every exit path releases it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;
use uuid::Uuid;

const URL_PREFIX: &str = "blob:chat-printer/";

/// Registered document bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    pub mime_type: String,
    pub bytes: Arc<Vec<u8>>,
}

/// Shared registry of live object URLs.
#[derive(Debug, Clone, Default)]
pub struct BlobStore {
    inner: Arc<Mutex<HashMap<String, Blob>>>,
}

impl BlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Blob>> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register `bytes` and return a guard owning the new URL.
    pub fn create_object_url(&self, bytes: Vec<u8>, mime_type: &str) -> ObjectUrl {
        let url = format!("{}{}", URL_PREFIX, Uuid::new_v4());
        self.lock().insert(
            url.clone(),
            Blob {
                mime_type: mime_type.to_string(),
                bytes: Arc::new(bytes),
            },
        );
        debug!(url = %url, "Created object URL");

        ObjectUrl {
            url,
            store: self.clone(),
        }
    }

    /// Look up a live URL.
    pub fn resolve(&self, url: &str) -> Option<Blob> {
        self.lock().get(url).cloned()
    }

    /// Release a URL. Returns false if it was not live.
    pub fn revoke(&self, url: &str) -> bool {
        let removed = self.lock().remove(url).is_some();
        if removed {
            debug!(url = %url, "Revoked object URL");
        }
        removed
    }

    /// Number of URLs not yet revoked.
    pub fn live_count(&self) -> usize {
        self.lock().len()
    }
}

/// Owner of one live object URL. Revokes it on drop.
#[derive(Debug)]
pub struct ObjectUrl {
    url: String,
    store: BlobStore,
}

impl ObjectUrl {
    pub fn as_str(&self) -> &str {
        &self.url
    }
}

impl Drop for ObjectUrl {
    fn drop(&mut self) {
        self.store.revoke(&self.url);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_revokes_on_drop() {
        let store = BlobStore::new();
        let guard = store.create_object_url(b"<html></html>".to_vec(), "text/html");

        assert!(guard.as_str().starts_with(URL_PREFIX));
        assert_eq!(store.live_count(), 1);
        let blob = store.resolve(guard.as_str()).unwrap();
        assert_eq!(blob.mime_type, "text/html");
        assert_eq!(blob.bytes.as_slice(), b"<html></html>");

        let url = guard.as_str().to_string();
        drop(guard);
        assert_eq!(store.live_count(), 0);
        assert!(store.resolve(&url).is_none());
    }

    #[test]
    fn test_urls_are_unique() {
        let store = BlobStore::new();
        let a = store.create_object_url(Vec::new(), "text/plain");
        let b = store.create_object_url(Vec::new(), "text/plain");
        assert_ne!(a.as_str(), b.as_str());
        assert_eq!(store.live_count(), 2);
    }

    #[test]
    fn test_explicit_revoke_then_drop() {
        let store = BlobStore::new();
        let guard = store.create_object_url(Vec::new(), "text/plain");
        assert!(store.revoke(guard.as_str()));
        assert!(!store.revoke(guard.as_str()));
        drop(guard);
        assert_eq!(store.live_count(), 0);
    }
}
