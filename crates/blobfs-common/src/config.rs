//! Configuration types for BlobFS
//!
//! The engine configuration surface. All fields have serde defaults so a
//! partial TOML file (or none at all) is valid.

use serde::{Deserialize, Serialize};

/// Filesystem-emulation engine configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct FsConfig {
    /// Key prefix inside the blob store under which all paths live
    /// (empty = bucket root)
    pub location: String,
    /// Interpret the last path segment of `listdir` as a tag name
    pub use_tag_directories: bool,
    /// Name of the virtual "most recent uploads" folder in tag mode
    pub recent_uploads_dir: String,
    /// Cap on the "most recent" listing
    pub recent_limit: usize,
    /// Number of image probes between reconciler pauses (tunable, not a
    /// contract)
    pub probe_batch: u32,
    /// Length of the reconciler pause, in seconds
    pub probe_pause_secs: u64,
    /// Longest edge of generated thumbnails, in pixels
    pub thumbnail_max_edge: u32,
}

impl Default for FsConfig {
    fn default() -> Self {
        Self {
            location: String::new(),
            use_tag_directories: false,
            recent_uploads_dir: "recent_uploads".to_string(),
            recent_limit: 75,
            probe_batch: 30,
            probe_pause_secs: 10,
            thumbnail_max_edge: 128,
        }
    }
}
