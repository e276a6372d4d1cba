//! Tree operations: makedirs, delete, rmtree, rename.
//!
//! Each operation composes single-key blob-store and metadata-store
//! primitives; the blob store offers no multi-object transactions, so
//! multi-step mutations are best-effort. Preconditions (existence,
//! overwrite permission) are checked before any mutation; a failure
//! partway through `mvtree` surfaces a progress cursor and must be
//! re-run idempotently rather than assumed rolled back.

use crate::sync::SaveOptions;
use crate::{CachedFs, PLACEHOLDER_NAME, path};
use blobfs_common::{Error, Result, now_millis};
use blobfs_meta_store::MetaEntry;
use blobfs_storage::BlobStore;
use tracing::{debug, warn};

impl CachedFs {
    /// Create a directory by writing a zero-size placeholder row at
    /// `name/_`. Idempotent: an existing placeholder is refreshed.
    pub fn makedirs(&self, name: &str) -> Result<()> {
        let name = path::clean(name);
        if name.is_empty() {
            return Ok(());
        }
        let marker = format!("{name}/{PLACEHOLDER_NAME}");
        let mut row = match self.meta.get(&marker)? {
            Some(existing) => existing,
            None => MetaEntry::new(&marker),
        };
        row.last_modified = Some(now_millis());
        row.size = Some(0);
        self.meta.upsert(&row)?;
        self.invalidate_cache();
        Ok(())
    }

    /// Delete one path. Deleting something that does not exist is
    /// silently ignored. Directories fall back to removing the
    /// placeholder row; only non-directories touch the blob store.
    pub fn delete(&self, name: &str, clean_cache: bool) -> Result<()> {
        let name = path::clean(name);
        let is_dir = self.isdir(&name)?;

        let removed = self.meta.delete(&name)?;
        if !removed && is_dir {
            self.meta
                .delete(&format!("{name}/{PLACEHOLDER_NAME}"))?;
        }
        if !is_dir {
            self.blobs.delete(&self.blob_key(&name))?;
        }
        if clean_cache {
            self.invalidate_cache();
        }
        Ok(())
    }

    /// Delete a whole subtree: every descendant key (placeholders
    /// included), then the path itself. The cache is invalidated once
    /// at the end rather than per key.
    pub fn rmtree(&self, name: &str) -> Result<()> {
        let name = path::clean(name);
        let (_, files) = self.listdir_recursive(&name, true, true)?;
        debug!("rmtree {}: {} descendant keys", name, files.len());
        for item in &files {
            self.delete(item, false)?;
        }
        self.delete(&name, true)
    }

    /// Move a file or a directory tree. Always invalidates the cache,
    /// even when the move failed partway.
    pub fn rename(&self, old: &str, new: &str, allow_overwrite: bool) -> Result<()> {
        let result = if self.isdir(old)? {
            self.mvtree(old, new)
        } else {
            self.mvfile(old, new, allow_overwrite)
        };
        self.invalidate_cache();
        result
    }

    /// Move a single file: server-side blob copy, move the metadata row
    /// (id, tags, and thumbnail ride along, keeping id-addressed
    /// references valid), reconcile the destination, delete the source
    /// blob. The destination must not exist unless `allow_overwrite` is
    /// set.
    pub fn mvfile(&self, old: &str, new: &str, allow_overwrite: bool) -> Result<()> {
        let old = path::clean(old);
        let new = path::clean(new);
        if self.exists(&new)? {
            if allow_overwrite {
                self.delete(&new, true)?;
            } else {
                return Err(Error::DestinationExists(new));
            }
        }

        if let Err(e) = self.blobs.copy(&self.blob_key(&old), &self.blob_key(&new)) {
            warn!("blob copy {} -> {} failed: {}", old, new, e);
            return Err(Error::CopyFailed { src: old, dst: new });
        }
        self.meta.rename_row(&old, &new)?;
        self.update_cache_entry(&new, None, &SaveOptions::default())?;
        // The stale source path stays in the in-memory indices until the
        // enclosing operation invalidates; `rename` always does.
        self.blobs.delete(&self.blob_key(&old))?;
        Ok(())
    }

    /// Move a directory tree. Fails fast if the destination exists (no
    /// merge semantics). Files are moved one by one before the source
    /// subtree is removed; a mid-plan failure leaves both partial trees
    /// and reports how far the plan got.
    pub fn mvtree(&self, old_dir: &str, new_dir: &str) -> Result<()> {
        let old_dir = path::clean(old_dir);
        let new_dir = path::clean(new_dir);
        if self.exists(&new_dir)? {
            return Err(Error::DirectoryExists(new_dir));
        }

        let (_, files) = self.listdir_recursive(&old_dir, false, true)?;
        let plan: Vec<(String, String)> = files
            .iter()
            .filter_map(|src| {
                path::relative_to(src, &old_dir)
                    .map(|rest| (src.clone(), format!("{new_dir}/{rest}")))
            })
            .collect();
        let total = plan.len();
        debug!("mvtree {} -> {}: {} files", old_dir, new_dir, total);

        for (completed, (src, dst)) in plan.into_iter().enumerate() {
            self.mvfile(&src, &dst, false)
                .map_err(|e| Error::TreeMoveInterrupted {
                    src: old_dir.clone(),
                    dst: new_dir.clone(),
                    completed,
                    total,
                    source: Box::new(e),
                })?;
        }
        self.makedirs(&new_dir)?;
        self.rmtree(&old_dir)
    }
}

#[cfg(test)]
mod tests {
    use crate::testutil::{fs, save};
    use blobfs_common::Error;

    #[test]
    fn test_makedirs_roundtrip() {
        let (_dir, fs) = fs();
        fs.makedirs("x/y").unwrap();
        assert!(fs.isdir("x/y").unwrap());
        assert!(fs.isdir("x").unwrap());
        let (folders, files) = fs.listdir("x").unwrap();
        assert_eq!(folders, vec!["y"]);
        assert!(files.is_empty());
        // Idempotent
        fs.makedirs("x/y").unwrap();
        assert!(fs.isdir("x/y").unwrap());
    }

    #[test]
    fn test_placeholder_is_invisible_as_file() {
        let (_dir, fs) = fs();
        fs.makedirs("x").unwrap();
        let (_, files) = fs.listdir("x").unwrap();
        assert!(files.is_empty());
        assert!(!fs.isfile("x/_").unwrap());
    }

    #[test]
    fn test_delete_missing_is_silent() {
        let (_dir, fs) = fs();
        fs.delete("no/such/file", true).unwrap();
    }

    #[test]
    fn test_delete_file_removes_row_and_blob() {
        let (_dir, fs) = fs();
        save(&fs, "a/b.bin", b"payload");
        fs.delete("a/b.bin", true).unwrap();
        assert!(!fs.exists("a/b.bin").unwrap());
        assert!(!fs.exists("a").unwrap());
    }

    #[test]
    fn test_delete_directory_removes_placeholder() {
        let (_dir, fs) = fs();
        fs.makedirs("empty").unwrap();
        assert!(fs.isdir("empty").unwrap());
        fs.delete("empty", true).unwrap();
        assert!(!fs.exists("empty").unwrap());
    }

    #[test]
    fn test_rmtree_removes_everything() {
        let (_dir, fs) = fs();
        save(&fs, "x/a", b"1");
        save(&fs, "x/b/c", b"2");
        fs.rmtree("x").unwrap();
        assert!(!fs.exists("x").unwrap());
        assert!(!fs.exists("x/a").unwrap());
        assert!(!fs.exists("x/b/c").unwrap());
    }

    #[test]
    fn test_rmtree_includes_empty_subfolders() {
        let (_dir, fs) = fs();
        save(&fs, "x/a", b"1");
        fs.makedirs("x/hollow").unwrap();
        fs.rmtree("x").unwrap();
        assert!(!fs.exists("x").unwrap());
        assert!(!fs.exists("x/hollow").unwrap());
        assert!(fs.meta().load_all().unwrap().is_empty());
    }

    #[test]
    fn test_mvfile_moves_bytes_and_row() {
        let (_dir, fs) = fs();
        save(&fs, "a/src.bin", b"payload");
        fs.rename("a/src.bin", "b/dst.bin", false).unwrap();
        assert!(!fs.exists("a/src.bin").unwrap());
        assert!(fs.isfile("b/dst.bin").unwrap());
    }

    #[test]
    fn test_mvfile_conflict_leaves_both_rows_unchanged() {
        let (_dir, fs) = fs();
        save(&fs, "src.bin", b"s");
        save(&fs, "dst.bin", b"d");
        let before_src = fs.meta().get("src.bin").unwrap();
        let before_dst = fs.meta().get("dst.bin").unwrap();

        let err = fs.rename("src.bin", "dst.bin", false).unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(fs.meta().get("src.bin").unwrap(), before_src);
        assert_eq!(fs.meta().get("dst.bin").unwrap(), before_dst);
    }

    #[test]
    fn test_mvfile_overwrite_replaces_destination() {
        let (_dir, fs) = fs();
        save(&fs, "src.bin", b"source-bytes");
        save(&fs, "dst.bin", b"old");
        fs.rename("src.bin", "dst.bin", true).unwrap();
        assert!(!fs.exists("src.bin").unwrap());
        let row = fs.meta().get("dst.bin").unwrap().unwrap();
        assert_eq!(row.size, Some(12));
    }

    #[test]
    fn test_mvfile_missing_source_is_copy_failure() {
        let (_dir, fs) = fs();
        let err = fs.mvfile("ghost.bin", "dst.bin", false).unwrap_err();
        assert!(matches!(err, Error::CopyFailed { .. }));
    }

    #[test]
    fn test_mvtree_moves_subtree() {
        let (_dir, fs) = fs();
        save(&fs, "old/a.bin", b"1");
        save(&fs, "old/sub/b.bin", b"2");
        fs.rename("old", "new", false).unwrap();

        assert!(!fs.exists("old").unwrap());
        assert!(!fs.exists("old/a.bin").unwrap());
        assert!(fs.isdir("new").unwrap());
        assert!(fs.isfile("new/a.bin").unwrap());
        assert!(fs.isfile("new/sub/b.bin").unwrap());
    }

    #[test]
    fn test_mvtree_rejects_existing_destination() {
        let (_dir, fs) = fs();
        save(&fs, "old/a.bin", b"1");
        fs.makedirs("taken").unwrap();
        let err = fs.rename("old", "taken", false).unwrap_err();
        assert!(err.is_conflict());
        // Nothing moved
        assert!(fs.isfile("old/a.bin").unwrap());
    }

    #[test]
    fn test_mvtree_into_substring_sibling_is_allowed() {
        let (_dir, fs) = fs();
        save(&fs, "photos/a.jpg", b"1");
        save(&fs, "old/b.jpg", b"2");
        // "photo" is a strict substring of "photos" yet does not exist
        fs.rename("old", "photo", false).unwrap();
        assert!(fs.isfile("photo/b.jpg").unwrap());
        assert!(fs.isfile("photos/a.jpg").unwrap());
    }

    #[test]
    fn test_mvfile_preserves_original_flag() {
        let (_dir, fs) = fs();
        save(&fs, "canon.bin", b"1");
        fs.set_original("canon.bin", true).unwrap();
        fs.rename("canon.bin", "moved.bin", false).unwrap();
        assert!(fs.meta().get("moved.bin").unwrap().unwrap().original);
    }
}
