//! Redb table definitions for the metadata cache.

use redb::TableDefinition;

// One row per object path. Key: canonical path, value: bincode MetaEntry.
// Path uniqueness is the table key itself, so create-or-update is a plain
// upsert with no race window.
pub const ENTRIES: TableDefinition<&str, &[u8]> = TableDefinition::new("entries");

// Known tag names. Key: tag name, value: empty marker.
pub const TAGS: TableDefinition<&str, &[u8]> = TableDefinition::new("tags");

// Tag <-> path associations. Key: "tag\x00path", value: empty marker.
pub const ENTRY_TAGS: TableDefinition<&str, &[u8]> = TableDefinition::new("entry_tags");

// Thumbnail blobs, keyed by entry id (hex) so renames never orphan them.
pub const THUMBNAILS: TableDefinition<&str, &[u8]> = TableDefinition::new("thumbnails");

/// Separator between the tag and path halves of an `ENTRY_TAGS` key.
pub const TAG_KEY_SEP: char = '\0';

/// Build an `ENTRY_TAGS` composite key.
#[must_use]
pub fn tag_key(tag: &str, path: &str) -> String {
    format!("{tag}{TAG_KEY_SEP}{path}")
}
