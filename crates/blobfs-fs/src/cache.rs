//! Process-local metadata cache.
//!
//! Two lazily-built indices over the metadata store: `raw` (path ->
//! row, placeholders included) and `folders` (synthesized directory
//! path -> latest descendant mtime). Each index is tri-state via
//! `Option`: `None` means unloaded, `Some(empty)` means loaded from an
//! empty store — the two are never conflated.
//!
//! The cache has no persistence and no cross-process invalidation;
//! every mutation that changes the path set or timestamps must call
//! [`FsCache::invalidate`] (the engine does this), after which the next
//! read rebuilds lazily.

use crate::path;
use blobfs_common::Timestamp;
use blobfs_meta_store::{MetaEntry, MetaStore, MetaStoreResult};
use std::collections::HashMap;
use tracing::debug;

pub(crate) struct FsCache {
    raw: Option<HashMap<String, MetaEntry>>,
    folders: Option<HashMap<String, Timestamp>>,
    /// Image probes since the last reconciler pause
    pub(crate) update_calls: u32,
}

/// Fold one row's mtime into the folder index, for every ancestor
/// prefix of its path. A row with no timestamp folds as 0 ("very old"),
/// never an error.
fn fold_folder_times(folders: &mut HashMap<String, Timestamp>, entry: &MetaEntry) {
    let mtime = entry.last_modified.unwrap_or(0);
    for anc in path::ancestors(&entry.path) {
        folders
            .entry(anc)
            .and_modify(|t| *t = (*t).max(mtime))
            .or_insert(mtime);
    }
}

impl FsCache {
    pub(crate) fn new() -> Self {
        Self {
            raw: None,
            folders: None,
            update_calls: 0,
        }
    }

    /// Drop both indices. The probe counter survives; it tracks work
    /// done against the blob store, not cache contents.
    pub(crate) fn invalidate(&mut self) {
        debug!("metadata cache invalidated");
        self.raw = None;
        self.folders = None;
    }

    /// All rows, placeholders included, loading from the store on first
    /// access.
    pub(crate) fn raw_entries(
        &mut self,
        meta: &MetaStore,
    ) -> MetaStoreResult<&HashMap<String, MetaEntry>> {
        if self.raw.is_none() {
            let mut map = HashMap::new();
            for entry in meta.load_all()? {
                map.insert(entry.path.clone(), entry);
            }
            debug!("loaded {} cached entries", map.len());
            self.raw = Some(map);
        }
        Ok(self.raw.get_or_insert_with(HashMap::new))
    }

    /// The synthesized folder index, recomputed in full from `raw`
    /// whenever it is unloaded. Placeholder rows contribute their
    /// ancestors here even though they are invisible as files.
    pub(crate) fn folders(
        &mut self,
        meta: &MetaStore,
    ) -> MetaStoreResult<&HashMap<String, Timestamp>> {
        if self.folders.is_none() {
            let mut folders = HashMap::new();
            {
                let raw = self.raw_entries(meta)?;
                for entry in raw.values() {
                    fold_folder_times(&mut folders, entry);
                }
            }
            self.folders = Some(folders);
        }
        Ok(self.folders.get_or_insert_with(HashMap::new))
    }

    /// Single-entry fast path: patch whichever indices are loaded with a
    /// row the reconciler just wrote, without a full invalidation.
    pub(crate) fn note_entry(&mut self, entry: &MetaEntry) {
        if let Some(raw) = &mut self.raw {
            raw.insert(entry.path.clone(), entry.clone());
        }
        if let Some(folders) = &mut self.folders {
            fold_folder_times(folders, entry);
        }
    }

    #[cfg(test)]
    pub(crate) fn is_loaded(&self) -> bool {
        self.raw.is_some()
    }
}
