use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use imagecast_backend::{BackendError, BlobStore};
use imagecast_core::BlobMetadata;

#[derive(Debug, Clone)]
struct StoredBlob {
    metadata: BlobMetadata,
    data: Bytes,
}

/// In-memory [`BlobStore`] backed by a [`DashMap`].
///
/// Objects are keyed by `{path}/{key}` and resolved with `memory://` URLs.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    objects: DashMap<String, StoredBlob>,
}

impl MemoryBlobStore {
    /// Create a new, empty blob store.
    pub fn new() -> Self {
        Self::default()
    }

    fn object_key(path: &str, key: &str) -> String {
        format!("{path}/{key}")
    }

    /// Whether an object exists at `(path, key)`.
    pub fn contains(&self, path: &str, key: &str) -> bool {
        self.objects.contains_key(&Self::object_key(path, key))
    }

    /// Metadata stored with the object at `(path, key)`.
    pub fn metadata(&self, path: &str, key: &str) -> Option<BlobMetadata> {
        self.objects
            .get(&Self::object_key(path, key))
            .map(|blob| blob.metadata.clone())
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(
        &self,
        path: &str,
        key: &str,
        metadata: &BlobMetadata,
        data: Bytes,
    ) -> Result<String, BackendError> {
        let url = self.url(path, key)?;
        match self.objects.entry(Self::object_key(path, key)) {
            Entry::Occupied(entry) => Err(BackendError::Conflict(format!(
                "object already exists: {}",
                entry.key()
            ))),
            Entry::Vacant(entry) => {
                entry.insert(StoredBlob {
                    metadata: metadata.clone(),
                    data,
                });
                Ok(url)
            }
        }
    }

    fn url(&self, path: &str, key: &str) -> Result<String, BackendError> {
        Ok(format!("memory://{}", Self::object_key(path, key)))
    }

    async fn get(&self, path: &str, key: &str) -> Result<Bytes, BackendError> {
        let object_key = Self::object_key(path, key);
        self.objects
            .get(&object_key)
            .map(|blob| blob.data.clone())
            .ok_or(BackendError::NotFound(object_key))
    }

    async fn delete(&self, path: &str, key: &str) -> Result<(), BackendError> {
        self.objects.remove(&Self::object_key(path, key));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_then_get_returns_same_bytes() {
        let store = MemoryBlobStore::new();
        let meta = BlobMetadata::new("image/png", 3);
        let url = store
            .put("photos/images", "a.png", &meta, Bytes::from_static(b"abc"))
            .await
            .unwrap();
        assert_eq!(url, "memory://photos/images/a.png");

        let data = store.get("photos/images", "a.png").await.unwrap();
        assert_eq!(&data[..], b"abc");
        assert_eq!(store.metadata("photos/images", "a.png"), Some(meta));
    }

    #[tokio::test]
    async fn put_never_overwrites_existing_key() {
        let store = MemoryBlobStore::new();
        let meta = BlobMetadata::new("image/png", 1);
        store
            .put("p", "k", &meta, Bytes::from_static(b"1"))
            .await
            .unwrap();
        let err = store
            .put("p", "k", &meta, Bytes::from_static(b"2"))
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Conflict(ref m) if m.contains("p/k")));
        assert_eq!(store.len(), 1);
        assert_eq!(&store.get("p", "k").await.unwrap()[..], b"1");
    }

    #[tokio::test]
    async fn put_after_delete_succeeds() {
        let store = MemoryBlobStore::new();
        let meta = BlobMetadata::new("image/png", 1);
        store
            .put("p", "k", &meta, Bytes::from_static(b"1"))
            .await
            .unwrap();
        store.delete("p", "k").await.unwrap();
        store
            .put("p", "k", &meta, Bytes::from_static(b"2"))
            .await
            .unwrap();
        assert_eq!(&store.get("p", "k").await.unwrap()[..], b"2");
        assert_eq!(store.url("p", "k").unwrap(), "memory://p/k");
    }

    #[tokio::test]
    async fn get_missing_is_not_found() {
        let store = MemoryBlobStore::new();
        let err = store.get("p", "missing.png").await.unwrap_err();
        assert!(matches!(err, BackendError::NotFound(_)));
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let store = MemoryBlobStore::new();
        let meta = BlobMetadata::new("image/gif", 1);
        store
            .put("p", "k.gif", &meta, Bytes::from_static(b"g"))
            .await
            .unwrap();
        store.delete("p", "k.gif").await.unwrap();
        assert!(!store.contains("p", "k.gif"));
        store.delete("p", "k.gif").await.unwrap();
        assert!(store.is_empty());
    }
}
