//! Core type definitions for BlobFS
//!
//! Identifier and timestamp types shared by the metadata store and the
//! filesystem engine.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Milliseconds since the Unix epoch.
///
/// Folder synthesis folds missing timestamps as 0 ("very old"), so the
/// zero value is reserved for "unknown" rather than a real mtime.
pub type Timestamp = u64;

/// Current wall-clock time as a [`Timestamp`].
#[must_use]
pub fn now_millis() -> Timestamp {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Unique identifier for a cached metadata entry.
///
/// Assigned once at row creation and never changed afterwards, so
/// id-addressed references (thumbnails) stay stable across renames.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntryId(Uuid);

impl EntryId {
    /// Generate a new random entry ID
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create from an existing UUID
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the underlying UUID
    #[must_use]
    pub const fn as_uuid(&self) -> Uuid {
        self.0
    }

    /// Compact lowercase-hex form, used as a persistence table key.
    #[must_use]
    pub fn to_hex(&self) -> String {
        self.0.simple().to_string()
    }

    /// Parse the compact hex form produced by [`Self::to_hex`].
    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        Uuid::parse_str(s).map(Self)
    }
}

impl Default for EntryId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntryId({})", self.0)
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_id_hex_roundtrip() {
        let id = EntryId::new();
        let parsed = EntryId::parse(&id.to_hex()).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_entry_ids_unique() {
        assert_ne!(EntryId::new(), EntryId::new());
    }
}
