//! BlobFS blob store abstraction
//!
//! The flat key/value object storage boundary. The engine only ever
//! talks to [`BlobStore`]; a production S3 transport implements the same
//! trait elsewhere. This crate ships two local backends: an in-memory
//! store for tests and a directory-tree store for the CLI.
//!
//! Contract notes:
//! - keys are canonical object paths, forward-slash separated
//! - `delete` of a missing key succeeds (delete is idempotent)
//! - `copy` happens inside the store, bytes are not re-transferred
//! - failures surface as store-level errors distinguishable from
//!   "not found"

pub mod dir;
pub mod memory;

use blobfs_common::{Result, Timestamp};
use bytes::Bytes;

// Re-exports
pub use dir::DirBlobStore;
pub use memory::MemoryBlobStore;

/// One listed object: key plus the metadata the store provides natively.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlobObject {
    pub key: String,
    pub size: u64,
    pub last_modified: Timestamp,
}

/// Flat key/value object storage.
pub trait BlobStore: Send + Sync {
    /// Fetch the bytes for a key. `BlobNotFound` if absent.
    fn get(&self, key: &str) -> Result<Bytes>;

    /// Size and mtime for a key, or `None` if absent.
    fn head(&self, key: &str) -> Result<Option<BlobObject>>;

    /// Store bytes under a key, replacing any previous object.
    fn put(&self, key: &str, data: &[u8]) -> Result<()>;

    /// Remove a key. Removing a missing key is not an error.
    fn delete(&self, key: &str) -> Result<()>;

    /// Server-side copy. `BlobNotFound` if the source is absent.
    fn copy(&self, src: &str, dst: &str) -> Result<()>;

    /// Every object whose key starts with `prefix`, in key order.
    fn list(&self, prefix: &str) -> Result<Vec<BlobObject>>;
}
