//! Persistent metadata store backed by redb.
//!
//! Provides typed upsert/get/delete/load methods over the cache tables.
//! All writes are synchronous (write txn + commit). The lazily-built
//! in-memory indices live in the engine crate — this module only handles
//! persistence.

use crate::tables;
use crate::types::MetaEntry;
use blobfs_common::EntryId;
use redb::{Database, ReadableTable};
use std::path::Path;
use tracing::error;

/// Error type for metadata store operations
#[derive(Debug, thiserror::Error)]
pub enum MetaStoreError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::DatabaseError),
    #[error("redb storage error: {0}")]
    Storage(#[from] redb::StorageError),
    #[error("redb table error: {0}")]
    Table(#[from] redb::TableError),
    #[error("redb transaction error: {0}")]
    Transaction(Box<redb::TransactionError>),
    #[error("redb commit error: {0}")]
    Commit(#[from] redb::CommitError),
    #[error("bincode error: {0}")]
    Bincode(#[from] bincode::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<redb::TransactionError> for MetaStoreError {
    fn from(e: redb::TransactionError) -> Self {
        Self::Transaction(Box::new(e))
    }
}

impl From<MetaStoreError> for blobfs_common::Error {
    fn from(e: MetaStoreError) -> Self {
        Self::Metadata(e.to_string())
    }
}

pub type MetaStoreResult<T> = Result<T, MetaStoreError>;

/// Value for marker-only rows (tags, associations).
const EMPTY_MARKER: &[u8] = &[];

/// Persistent metadata store backed by redb.
pub struct MetaStore {
    db: Database,
}

impl MetaStore {
    /// Open (or create) the redb database at the given path.
    pub fn open(path: impl AsRef<Path>) -> MetaStoreResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path)?;

        // Create all tables eagerly so later read txns don't fail
        let write_txn = db.begin_write()?;
        {
            let _t = write_txn.open_table(tables::ENTRIES)?;
            let _t = write_txn.open_table(tables::TAGS)?;
            let _t = write_txn.open_table(tables::ENTRY_TAGS)?;
            let _t = write_txn.open_table(tables::THUMBNAILS)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    // ---- Entries ----

    /// Get the row for a path.
    pub fn get(&self, path: &str) -> MetaStoreResult<Option<MetaEntry>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(tables::ENTRIES)?;
        table
            .get(path)?
            .map(|v| bincode::deserialize(v.value()).map_err(MetaStoreError::from))
            .transpose()
    }

    /// Find a row by its stable id. Full scan; only the thumbnail lookup
    /// path uses this.
    pub fn get_by_id(&self, id: EntryId) -> MetaStoreResult<Option<MetaEntry>> {
        for entry in self.load_all()? {
            if entry.id == id {
                return Ok(Some(entry));
            }
        }
        Ok(None)
    }

    /// Insert or replace the row at `entry.path`. The path is the table
    /// key, so concurrent create/update races collapse to last-write-wins
    /// instead of duplicate rows.
    pub fn upsert(&self, entry: &MetaEntry) -> MetaStoreResult<()> {
        let bytes = bincode::serialize(entry)?;
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(tables::ENTRIES)?;
            table.insert(entry.path.as_str(), bytes.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Delete the row for a path, along with its tag associations and
    /// thumbnail. Returns whether a row existed.
    pub fn delete(&self, path: &str) -> MetaStoreResult<bool> {
        let write_txn = self.db.begin_write()?;
        let removed: Option<MetaEntry> = {
            let mut table = write_txn.open_table(tables::ENTRY_TAGS)?;
            let suffix = format!("{}{}", tables::TAG_KEY_SEP, path);
            let stale: Vec<String> = {
                let mut keys = Vec::new();
                for entry in table.iter()? {
                    let entry = entry?;
                    let k = entry.0.value().to_string();
                    if k.ends_with(&suffix) {
                        keys.push(k);
                    }
                }
                keys
            };
            for key in &stale {
                table.remove(key.as_str())?;
            }

            let mut entries = write_txn.open_table(tables::ENTRIES)?;
            match entries.remove(path)? {
                Some(v) => Some(bincode::deserialize(v.value())?),
                None => None,
            }
        };
        if let Some(old) = &removed {
            let mut thumbs = write_txn.open_table(tables::THUMBNAILS)?;
            thumbs.remove(old.id.to_hex().as_str())?;
        }
        write_txn.commit()?;
        Ok(removed.is_some())
    }

    /// Move a row to a new path in one transaction, keeping its id and
    /// rewriting its tag associations. Thumbnails are keyed by id and
    /// need no touch-up. Returns the moved row, or `None` if the old
    /// path had no row.
    pub fn rename_row(&self, old_path: &str, new_path: &str) -> MetaStoreResult<Option<MetaEntry>> {
        let write_txn = self.db.begin_write()?;
        let moved = {
            let mut entries = write_txn.open_table(tables::ENTRIES)?;
            let existing = match entries.remove(old_path)? {
                Some(v) => Some(bincode::deserialize::<MetaEntry>(v.value())?),
                None => None,
            };
            match existing {
                Some(mut row) => {
                    row.path = new_path.to_string();
                    let bytes = bincode::serialize(&row)?;
                    entries.insert(new_path, bytes.as_slice())?;
                    Some(row)
                }
                None => None,
            }
        };
        if moved.is_some() {
            let mut links = write_txn.open_table(tables::ENTRY_TAGS)?;
            let suffix = format!("{}{}", tables::TAG_KEY_SEP, old_path);
            let stale: Vec<String> = {
                let mut keys = Vec::new();
                for entry in links.iter()? {
                    let entry = entry?;
                    let k = entry.0.value().to_string();
                    if k.ends_with(&suffix) {
                        keys.push(k);
                    }
                }
                keys
            };
            for key in &stale {
                links.remove(key.as_str())?;
                if let Some((tag, _)) = key.split_once(tables::TAG_KEY_SEP) {
                    links.insert(tables::tag_key(tag, new_path).as_str(), EMPTY_MARKER)?;
                }
            }
        }
        write_txn.commit()?;
        Ok(moved)
    }

    /// Load every row.
    pub fn load_all(&self) -> MetaStoreResult<Vec<MetaEntry>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(tables::ENTRIES)?;
        let mut result = Vec::new();
        for entry in table.iter()? {
            let entry = entry?;
            let key = entry.0.value().to_string();
            match bincode::deserialize::<MetaEntry>(entry.1.value()) {
                Ok(row) => result.push(row),
                Err(e) => error!("Failed to decode entry '{}': {}", key, e),
            }
        }
        Ok(result)
    }

    /// The most recently modified rows, descending by mtime, capped at
    /// `limit`. Optionally restricted to canonical uploads. Ordering is
    /// done here since redb has no secondary indices; the entry set is
    /// the same one the engine caches wholesale anyway.
    pub fn most_recent(&self, original_only: bool, limit: usize) -> MetaStoreResult<Vec<MetaEntry>> {
        let mut rows: Vec<MetaEntry> = self
            .load_all()?
            .into_iter()
            .filter(|e| !original_only || e.original)
            .collect();
        rows.sort_by(|a, b| {
            b.last_modified
                .unwrap_or(0)
                .cmp(&a.last_modified.unwrap_or(0))
                .then_with(|| a.path.cmp(&b.path))
        });
        rows.truncate(limit);
        Ok(rows)
    }

    /// Flip the canonical flag on one row. Returns the updated row, or
    /// `None` if the path has no row.
    pub fn set_original(&self, path: &str, original: bool) -> MetaStoreResult<Option<MetaEntry>> {
        let write_txn = self.db.begin_write()?;
        let updated = {
            let mut table = write_txn.open_table(tables::ENTRIES)?;
            let existing = table
                .get(path)?
                .map(|v| bincode::deserialize::<MetaEntry>(v.value()))
                .transpose()?;
            match existing {
                Some(mut row) => {
                    row.original = original;
                    let bytes = bincode::serialize(&row)?;
                    table.insert(path, bytes.as_slice())?;
                    Some(row)
                }
                None => None,
            }
        };
        write_txn.commit()?;
        Ok(updated)
    }

    /// Flip the canonical flag on many rows at once. Missing paths are
    /// skipped. Returns the number of rows updated.
    pub fn set_original_batch(&self, paths: &[String], original: bool) -> MetaStoreResult<usize> {
        let write_txn = self.db.begin_write()?;
        let mut updated = 0;
        {
            let mut table = write_txn.open_table(tables::ENTRIES)?;
            for path in paths {
                let existing = table
                    .get(path.as_str())?
                    .map(|v| bincode::deserialize::<MetaEntry>(v.value()))
                    .transpose()?;
                if let Some(mut row) = existing {
                    row.original = original;
                    let bytes = bincode::serialize(&row)?;
                    table.insert(path.as_str(), bytes.as_slice())?;
                    updated += 1;
                }
            }
        }
        write_txn.commit()?;
        Ok(updated)
    }

    // ---- Tags ----

    /// Create the tag if it does not exist (create-or-get).
    pub fn ensure_tag(&self, name: &str) -> MetaStoreResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(tables::TAGS)?;
            table.insert(name, EMPTY_MARKER)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Associate a path with a tag, creating the tag first if needed.
    /// Re-adding an existing association is a no-op.
    pub fn add_tag(&self, path: &str, tag: &str) -> MetaStoreResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut tags = write_txn.open_table(tables::TAGS)?;
            tags.insert(tag, EMPTY_MARKER)?;
            let mut links = write_txn.open_table(tables::ENTRY_TAGS)?;
            links.insert(tables::tag_key(tag, path).as_str(), EMPTY_MARKER)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Whether a tag with this name exists.
    pub fn has_tag(&self, name: &str) -> MetaStoreResult<bool> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(tables::TAGS)?;
        Ok(table.get(name)?.is_some())
    }

    /// Every known tag name.
    pub fn tag_names(&self) -> MetaStoreResult<Vec<String>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(tables::TAGS)?;
        let mut result = Vec::new();
        for entry in table.iter()? {
            let entry = entry?;
            result.push(entry.0.value().to_string());
        }
        Ok(result)
    }

    /// Paths associated with a tag.
    pub fn entries_with_tag(&self, tag: &str) -> MetaStoreResult<Vec<String>> {
        let prefix = format!("{}{}", tag, tables::TAG_KEY_SEP);
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(tables::ENTRY_TAGS)?;
        let mut result = Vec::new();
        for entry in table.iter()? {
            let entry = entry?;
            let k = entry.0.value();
            if let Some(path) = k.strip_prefix(prefix.as_str()) {
                result.push(path.to_string());
            }
        }
        Ok(result)
    }

    // ---- Thumbnails ----

    /// Store a thumbnail blob for an entry id, replacing any previous one.
    pub fn put_thumbnail(&self, id: EntryId, data: &[u8]) -> MetaStoreResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(tables::THUMBNAILS)?;
            table.insert(id.to_hex().as_str(), data)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Fetch the thumbnail blob for an entry id.
    pub fn get_thumbnail(&self, id: EntryId) -> MetaStoreResult<Option<Vec<u8>>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(tables::THUMBNAILS)?;
        Ok(table.get(id.to_hex().as_str())?.map(|v| v.value().to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blobfs_common::now_millis;

    fn open_store() -> (tempfile::TempDir, MetaStore) {
        let dir = tempfile::TempDir::new().unwrap();
        let store = MetaStore::open(dir.path().join("meta.redb")).unwrap();
        (dir, store)
    }

    fn entry(path: &str, mtime: u64, size: u64) -> MetaEntry {
        let mut e = MetaEntry::new(path);
        e.last_modified = Some(mtime);
        e.size = Some(size);
        e
    }

    #[test]
    fn test_upsert_get_roundtrip() {
        let (_dir, store) = open_store();
        let row = entry("photos/a.jpg", 100, 10);
        store.upsert(&row).unwrap();
        assert_eq!(store.get("photos/a.jpg").unwrap(), Some(row.clone()));

        // Upsert replaces, never duplicates
        let mut row2 = row.clone();
        row2.size = Some(20);
        store.upsert(&row2).unwrap();
        assert_eq!(store.load_all().unwrap().len(), 1);
        assert_eq!(store.get("photos/a.jpg").unwrap().unwrap().size, Some(20));
    }

    #[test]
    fn test_upsert_twice_is_idempotent() {
        let (_dir, store) = open_store();
        let row = entry("a", 1, 1);
        store.upsert(&row).unwrap();
        store.upsert(&row).unwrap();
        let all = store.load_all().unwrap();
        assert_eq!(all, vec![row]);
    }

    #[test]
    fn test_delete_missing_is_ok() {
        let (_dir, store) = open_store();
        assert!(!store.delete("no/such/path").unwrap());
    }

    #[test]
    fn test_delete_cascades_tags_and_thumbnail() {
        let (_dir, store) = open_store();
        let row = entry("photos/a.jpg", 100, 10);
        store.upsert(&row).unwrap();
        store.add_tag("photos/a.jpg", "holiday").unwrap();
        store.put_thumbnail(row.id, b"jpegbytes").unwrap();

        assert!(store.delete("photos/a.jpg").unwrap());
        assert_eq!(store.get("photos/a.jpg").unwrap(), None);
        assert!(store.entries_with_tag("holiday").unwrap().is_empty());
        assert_eq!(store.get_thumbnail(row.id).unwrap(), None);
        // The tag itself survives; only the association goes
        assert_eq!(store.tag_names().unwrap(), vec!["holiday".to_string()]);
    }

    #[test]
    fn test_most_recent_ordering_and_cap() {
        let (_dir, store) = open_store();
        for i in 0..100u64 {
            let mut row = entry(&format!("f{i:03}"), 1000 + i, 1);
            row.original = true;
            store.upsert(&row).unwrap();
        }
        let recent = store.most_recent(true, 75).unwrap();
        assert_eq!(recent.len(), 75);
        assert_eq!(recent[0].path, "f099");
        assert_eq!(recent[74].path, "f025");
        let mtimes: Vec<u64> = recent.iter().map(|e| e.last_modified.unwrap()).collect();
        assert!(mtimes.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn test_most_recent_filters_originals() {
        let (_dir, store) = open_store();
        let mut canonical = entry("canon", 10, 1);
        canonical.original = true;
        store.upsert(&canonical).unwrap();
        store.upsert(&entry("derived", 20, 1)).unwrap();

        let recent = store.most_recent(true, 75).unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].path, "canon");

        let all = store.most_recent(false, 75).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].path, "derived");
    }

    #[test]
    fn test_tags() {
        let (_dir, store) = open_store();
        store.upsert(&entry("a", 1, 1)).unwrap();
        store.upsert(&entry("b", 1, 1)).unwrap();
        store.add_tag("a", "red").unwrap();
        store.add_tag("b", "red").unwrap();
        store.add_tag("b", "red").unwrap(); // duplicate association ok
        store.ensure_tag("empty").unwrap();

        let mut names = store.tag_names().unwrap();
        names.sort();
        assert_eq!(names, vec!["empty".to_string(), "red".to_string()]);

        let mut tagged = store.entries_with_tag("red").unwrap();
        tagged.sort();
        assert_eq!(tagged, vec!["a".to_string(), "b".to_string()]);
        assert!(store.entries_with_tag("empty").unwrap().is_empty());
    }

    #[test]
    fn test_set_original_batch_skips_missing() {
        let (_dir, store) = open_store();
        store.upsert(&entry("a", 1, 1)).unwrap();
        store.upsert(&entry("b", 1, 1)).unwrap();
        let updated = store
            .set_original_batch(
                &["a".to_string(), "b".to_string(), "ghost".to_string()],
                true,
            )
            .unwrap();
        assert_eq!(updated, 2);
        assert!(store.get("a").unwrap().unwrap().original);
        assert!(store.get("b").unwrap().unwrap().original);
    }

    #[test]
    fn test_rename_row_keeps_id_tags_thumbnail() {
        let (_dir, store) = open_store();
        let row = entry("old/a.jpg", 100, 10);
        store.upsert(&row).unwrap();
        store.add_tag("old/a.jpg", "holiday").unwrap();
        store.put_thumbnail(row.id, b"jpeg").unwrap();

        let moved = store.rename_row("old/a.jpg", "new/a.jpg").unwrap().unwrap();
        assert_eq!(moved.id, row.id);
        assert_eq!(moved.path, "new/a.jpg");
        assert_eq!(store.get("old/a.jpg").unwrap(), None);
        assert_eq!(store.get("new/a.jpg").unwrap(), Some(moved));
        assert_eq!(
            store.entries_with_tag("holiday").unwrap(),
            vec!["new/a.jpg".to_string()]
        );
        assert!(store.get_thumbnail(row.id).unwrap().is_some());

        assert!(store.rename_row("ghost", "anywhere").unwrap().is_none());
    }

    #[test]
    fn test_get_by_id() {
        let (_dir, store) = open_store();
        let row = entry("x/y", now_millis(), 5);
        store.upsert(&row).unwrap();
        assert_eq!(store.get_by_id(row.id).unwrap(), Some(row));
        assert_eq!(store.get_by_id(EntryId::new()).unwrap(), None);
    }
}
