//! BlobFS filesystem-emulation engine
//!
//! Presents a hierarchical-filesystem view (directories, files, tree
//! move/delete, listing) over a blob store whose native namespace is a
//! flat set of keys. A persisted metadata cache (redb rows + lazily
//! built in-memory indices) makes the view fast and carries metadata
//! the blob store does not provide: image dimensions, thumbnails, tags,
//! most-recent ordering.
//!
//! The engine is synchronous and process-local. Every mutating tree
//! operation invalidates the in-memory cache before returning, so the
//! next read in the same process observes the mutation; no guarantee is
//! made across processes.

pub mod cache;
pub mod convert;
pub mod path;
pub mod sync;
pub mod tags;
pub mod thumb;
pub mod tree;
pub mod view;

use blobfs_common::{FsConfig, Timestamp};
use blobfs_meta_store::{MetaEntry, MetaStore};
use blobfs_storage::BlobStore;
use cache::FsCache;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

// Re-exports
pub use convert::ConvertReport;
pub use sync::{SaveOptions, SyncReport};

/// Name of the zero-size row that makes an otherwise-empty folder
/// visible.
pub(crate) const PLACEHOLDER_NAME: &str = "_";

/// The cache-backed filesystem view over a blob store.
pub struct CachedFs {
    config: FsConfig,
    meta: Arc<MetaStore>,
    blobs: Arc<dyn BlobStore>,
    cache: Mutex<FsCache>,
}

impl CachedFs {
    pub fn new(config: FsConfig, meta: Arc<MetaStore>, blobs: Arc<dyn BlobStore>) -> Self {
        Self {
            config,
            meta,
            blobs,
            cache: Mutex::new(FsCache::new()),
        }
    }

    pub fn config(&self) -> &FsConfig {
        &self.config
    }

    pub fn meta(&self) -> &MetaStore {
        &self.meta
    }

    /// Drop the in-memory indices; the next read rebuilds them from the
    /// metadata store. Called by every mutating operation.
    pub fn invalidate_cache(&self) {
        self.cache.lock().invalidate();
    }

    /// Run `f` with the cache locked.
    pub(crate) fn with_cache<R>(&self, f: impl FnOnce(&mut FsCache) -> R) -> R {
        f(&mut self.cache.lock())
    }

    /// The blob-store key for a canonical path, under the configured
    /// location prefix.
    pub(crate) fn blob_key(&self, name: &str) -> String {
        if self.config.location.is_empty() {
            name.to_string()
        } else {
            format!("{}/{}", self.config.location, name)
        }
    }

    /// Snapshot of the visible entry index (placeholder rows excluded).
    pub fn entries(&self) -> blobfs_common::Result<HashMap<String, MetaEntry>> {
        self.with_cache(|cache| {
            let raw = cache.raw_entries(&self.meta)?;
            Ok(raw
                .iter()
                .filter(|(_, e)| !e.is_placeholder())
                .map(|(k, e)| (k.clone(), e.clone()))
                .collect())
        })
    }

    /// Snapshot of the synthesized folder index.
    pub fn folders(&self) -> blobfs_common::Result<HashMap<String, Timestamp>> {
        self.with_cache(|cache| Ok(cache.folders(&self.meta)?.clone()))
    }
}
