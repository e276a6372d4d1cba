//! BlobFS common types and utilities
//!
//! Shared identifier types, the cross-crate error taxonomy, and the
//! engine configuration surface.

pub mod config;
pub mod error;
pub mod types;

// Re-exports
pub use config::FsConfig;
pub use error::{Error, Result};
pub use types::{EntryId, Timestamp, now_millis};
