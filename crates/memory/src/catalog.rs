use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use imagecast_backend::{BackendError, Catalog};
use imagecast_core::{Image, NewImage};

/// In-memory [`Catalog`] keyed by file name.
///
/// Ids are assigned from a monotonically increasing counter starting at 1.
#[derive(Debug)]
pub struct MemoryCatalog {
    records: DashMap<String, Image>,
    next_id: AtomicI64,
}

impl Default for MemoryCatalog {
    fn default() -> Self {
        Self {
            records: DashMap::new(),
            next_id: AtomicI64::new(1),
        }
    }
}

impl MemoryCatalog {
    /// Create a new, empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl Catalog for MemoryCatalog {
    async fn save(&self, image: NewImage) -> Result<Image, BackendError> {
        match self.records.entry(image.image_file_name.clone()) {
            Entry::Occupied(occupied) => Err(BackendError::Conflict(format!(
                "image file name already exists: {}",
                occupied.key()
            ))),
            Entry::Vacant(vacant) => {
                let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                let stored = image.with_id(id);
                vacant.insert(stored.clone());
                Ok(stored)
            }
        }
    }

    async fn find_by_key(&self, file_name: &str) -> Result<Option<Image>, BackendError> {
        Ok(self.records.get(file_name).map(|r| r.value().clone()))
    }

    async fn delete_by_key(&self, file_name: &str) -> Result<u64, BackendError> {
        Ok(u64::from(self.records.remove(file_name).is_some()))
    }

    async fn find_all(&self) -> Result<Vec<Image>, BackendError> {
        let mut all: Vec<Image> = self.records.iter().map(|r| r.value().clone()).collect();
        all.sort_by_key(|image| image.id);
        Ok(all)
    }
}
