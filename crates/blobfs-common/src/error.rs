//! Error types for BlobFS
//!
//! One taxonomy across the engine: absence on read paths is data, not an
//! error, so `NotFound`-family variants only appear where an operation
//! explicitly requires the target to exist. Conflict variants are raised
//! before any mutation; transport variants may leave partial state.

use thiserror::Error;

/// Common result type for BlobFS operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for BlobFS
#[derive(Debug, Error)]
pub enum Error {
    // Metadata errors
    #[error("no cached entry for path: {0}")]
    EntryNotFound(String),

    #[error("no thumbnail available for path: {0}")]
    ThumbnailUnavailable(String),

    #[error("metadata store error: {0}")]
    Metadata(String),

    // Tree operation preconditions
    #[error("destination file already exists: {0}")]
    DestinationExists(String),

    #[error("destination folder already exists: {0}")]
    DirectoryExists(String),

    // Blob transport errors
    #[error("blob not found: {0}")]
    BlobNotFound(String),

    #[error("could not copy '{src}' to '{dst}'")]
    CopyFailed { src: String, dst: String },

    #[error("storage error: {0}")]
    Storage(String),

    #[error("disk I/O error: {0}")]
    DiskIo(#[from] std::io::Error),

    // Tree moves are not atomic; the cursor records how far the plan got
    // so the caller can re-run idempotently.
    #[error("tree move from '{src}' to '{dst}' interrupted after {completed} of {total} files")]
    TreeMoveInterrupted {
        src: String,
        dst: String,
        completed: usize,
        total: usize,
        #[source]
        source: Box<Error>,
    },

    #[error("invalid path: {0}")]
    InvalidPath(String),
}

impl Error {
    /// Create a metadata store error
    pub fn metadata(msg: impl Into<String>) -> Self {
        Self::Metadata(msg.into())
    }

    /// Create a storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Check if this is a not found error
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::EntryNotFound(_) | Self::BlobNotFound(_) | Self::ThumbnailUnavailable(_)
        )
    }

    /// Check if this is a precondition conflict
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::DestinationExists(_) | Self::DirectoryExists(_))
    }
}
