//! Stored row types for the metadata cache.
//!
//! These types are serialized to redb via bincode.

use blobfs_common::{EntryId, Timestamp};
use serde::{Deserialize, Serialize};

/// Cached metadata for one object path.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaEntry {
    /// Stable identifier, assigned at row creation
    pub id: EntryId,
    /// Canonical path (forward slashes, no leading slash)
    pub path: String,
    /// Millis since epoch; `None` until first reconciled
    pub last_modified: Option<Timestamp>,
    /// Object size in bytes; zero or absent marks a directory placeholder
    pub size: Option<u64>,
    /// Probed pixel width. `None` = never probed, `Some(0)` = not an image
    pub image_x: Option<u32>,
    /// Probed pixel height, same encoding as `image_x`
    pub image_y: Option<u32>,
    /// Canonical upload, as opposed to a derived/variant copy
    pub original: bool,
}

impl MetaEntry {
    /// Create a fresh row for `path` with nothing reconciled yet.
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            id: EntryId::new(),
            path: path.into(),
            last_modified: None,
            size: None,
            image_x: None,
            image_y: None,
            original: false,
        }
    }

    /// A placeholder row exists only to make an empty folder visible.
    /// The original writer left `size` NULL while the data model defines
    /// the marker as zero, so both encodings count.
    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        self.size.unwrap_or(0) == 0
    }

    /// Whether an image probe has ever run for this row.
    #[must_use]
    pub fn probed(&self) -> bool {
        self.image_x.is_some()
    }

    /// Probed dimensions, if this row decoded as an image.
    #[must_use]
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        match (self.image_x, self.image_y) {
            (Some(x), Some(y)) if x > 0 => Some((x, y)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_detection() {
        let mut entry = MetaEntry::new("photos/_");
        assert!(entry.is_placeholder());
        entry.size = Some(0);
        assert!(entry.is_placeholder());
        entry.size = Some(10);
        assert!(!entry.is_placeholder());
    }

    #[test]
    fn test_dimensions_encoding() {
        let mut entry = MetaEntry::new("photos/a.jpg");
        assert!(!entry.probed());
        assert_eq!(entry.dimensions(), None);

        // Probed, not an image: sticky zero marker
        entry.image_x = Some(0);
        entry.image_y = Some(0);
        assert!(entry.probed());
        assert_eq!(entry.dimensions(), None);

        entry.image_x = Some(640);
        entry.image_y = Some(480);
        assert_eq!(entry.dimensions(), Some((640, 480)));
    }
}
