//! Directory-tree blob store.
//!
//! Maps each key to a file under a root directory. Good enough for the
//! CLI and local development; a real deployment points the engine at an
//! object-store transport instead.

use crate::{BlobObject, BlobStore};
use blobfs_common::{Error, Result, Timestamp};
use bytes::Bytes;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Blob store backed by a local directory tree.
pub struct DirBlobStore {
    root: PathBuf,
}

impl DirBlobStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Resolve a key to a path under the root, rejecting escapes.
    fn key_path(&self, key: &str) -> Result<PathBuf> {
        if key.is_empty() || key.starts_with('/') {
            return Err(Error::InvalidPath(key.to_string()));
        }
        if key.split('/').any(|seg| seg.is_empty() || seg == "." || seg == "..") {
            return Err(Error::InvalidPath(key.to_string()));
        }
        Ok(self.root.join(key))
    }

    fn mtime_millis(meta: &std::fs::Metadata) -> Timestamp {
        meta.modified()
            .ok()
            .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

impl BlobStore for DirBlobStore {
    fn get(&self, key: &str) -> Result<Bytes> {
        let path = self.key_path(key)?;
        match std::fs::read(&path) {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(Error::BlobNotFound(key.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn head(&self, key: &str) -> Result<Option<BlobObject>> {
        let path = self.key_path(key)?;
        match std::fs::metadata(&path) {
            Ok(meta) if meta.is_file() => Ok(Some(BlobObject {
                key: key.to_string(),
                size: meta.len(),
                last_modified: Self::mtime_millis(&meta),
            })),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn put(&self, key: &str, data: &[u8]) -> Result<()> {
        let path = self.key_path(key)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, data)?;
        debug!("wrote {} bytes to {}", data.len(), key);
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        let path = self.key_path(key)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn copy(&self, src: &str, dst: &str) -> Result<()> {
        let src_path = self.key_path(src)?;
        let dst_path = self.key_path(dst)?;
        if let Some(parent) = dst_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        match std::fs::copy(&src_path, &dst_path) {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(Error::BlobNotFound(src.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn list(&self, prefix: &str) -> Result<Vec<BlobObject>> {
        let mut result = Vec::new();
        for item in WalkDir::new(&self.root).sort_by_file_name() {
            let item = item.map_err(|e| Error::storage(e.to_string()))?;
            if !item.file_type().is_file() {
                continue;
            }
            let Ok(rel) = item.path().strip_prefix(&self.root) else {
                continue;
            };
            // Keys always use forward slashes, whatever the platform
            let key = rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            if !key.starts_with(prefix) {
                continue;
            }
            let meta = item.metadata().map_err(|e| Error::storage(e.to_string()))?;
            result.push(BlobObject {
                key,
                size: meta.len(),
                last_modified: Self::mtime_millis(&meta),
            });
        }
        Ok(result)
    }
}
