//! In-memory blob store, used by tests and as a reference backend.

use crate::{BlobObject, BlobStore};
use blobfs_common::{Error, Result, now_millis};
use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::BTreeMap;

struct StoredBlob {
    data: Bytes,
    last_modified: u64,
}

/// Blob store holding everything in a `BTreeMap` (ordered listing for
/// free).
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<BTreeMap<String, StoredBlob>>,
}

impl MemoryBlobStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.blobs.read().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl BlobStore for MemoryBlobStore {
    fn get(&self, key: &str) -> Result<Bytes> {
        self.blobs
            .read()
            .get(key)
            .map(|b| b.data.clone())
            .ok_or_else(|| Error::BlobNotFound(key.to_string()))
    }

    fn head(&self, key: &str) -> Result<Option<BlobObject>> {
        Ok(self.blobs.read().get(key).map(|b| BlobObject {
            key: key.to_string(),
            size: b.data.len() as u64,
            last_modified: b.last_modified,
        }))
    }

    fn put(&self, key: &str, data: &[u8]) -> Result<()> {
        self.blobs.write().insert(
            key.to_string(),
            StoredBlob {
                data: Bytes::copy_from_slice(data),
                last_modified: now_millis(),
            },
        );
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.blobs.write().remove(key);
        Ok(())
    }

    fn copy(&self, src: &str, dst: &str) -> Result<()> {
        let mut blobs = self.blobs.write();
        let data = blobs
            .get(src)
            .map(|b| b.data.clone())
            .ok_or_else(|| Error::BlobNotFound(src.to_string()))?;
        blobs.insert(
            dst.to_string(),
            StoredBlob {
                data,
                last_modified: now_millis(),
            },
        );
        Ok(())
    }

    fn list(&self, prefix: &str) -> Result<Vec<BlobObject>> {
        Ok(self
            .blobs
            .read()
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, b)| BlobObject {
                key: k.clone(),
                size: b.data.len() as u64,
                last_modified: b.last_modified,
            })
            .collect())
    }
}
