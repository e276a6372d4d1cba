//! Read-only filesystem view over the cache layer.
//!
//! Absence is data here, never an error: `exists`/`isdir`/`isfile`
//! answer false, `dimensions` answers `None`, and `modified_time` falls
//! back to "now" rather than failing the caller.

use crate::{CachedFs, path};
use blobfs_common::{Result, Timestamp, now_millis};
use std::collections::BTreeSet;

fn last_segment(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or("")
}

impl CachedFs {
    /// Whether `name` is a known file or a synthesized folder.
    pub fn exists(&self, name: &str) -> Result<bool> {
        let name = path::clean(name);
        self.with_cache(|cache| {
            if cache.folders(&self.meta)?.contains_key(&name) {
                return Ok(true);
            }
            let raw = cache.raw_entries(&self.meta)?;
            Ok(raw.get(&name).is_some_and(|e| !e.is_placeholder()))
        })
    }

    /// Whether `name` is a directory. In tag mode any known tag name and
    /// the recent-uploads pseudo-folder also count, even though neither
    /// has a blob-store key.
    pub fn isdir(&self, name: &str) -> Result<bool> {
        let name = path::clean(name);
        let (is_entry, is_folder) = self.entry_folder_membership(&name)?;
        if self.config.use_tag_directories {
            if is_entry && !is_folder {
                return Ok(false);
            }
            if is_folder {
                return Ok(true);
            }
            let seg = last_segment(&name);
            return Ok(self.meta.has_tag(seg)? || seg == self.config.recent_uploads_dir);
        }
        Ok(is_folder)
    }

    /// Whether `name` is a file (a visible entry that is not also a
    /// folder).
    pub fn isfile(&self, name: &str) -> Result<bool> {
        let name = path::clean(name);
        let (is_entry, is_folder) = self.entry_folder_membership(&name)?;
        Ok(is_entry && !is_folder)
    }

    fn entry_folder_membership(&self, name: &str) -> Result<(bool, bool)> {
        self.with_cache(|cache| {
            let is_folder = cache.folders(&self.meta)?.contains_key(name);
            let raw = cache.raw_entries(&self.meta)?;
            let is_entry = raw.get(name).is_some_and(|e| !e.is_placeholder());
            Ok((is_entry, is_folder))
        })
    }

    /// Immediate children of `name`: `(folders, files)`, both as bare
    /// names one level below. In tag mode the last path segment is
    /// interpreted as a tag name instead (see `listdir_bytag`).
    pub fn listdir(&self, name: &str) -> Result<(Vec<String>, Vec<String>)> {
        if self.config.use_tag_directories {
            return self.listdir_bytag(name);
        }
        let name = path::clean(name);
        self.with_cache(|cache| {
            let candidates: Vec<(String, String)> = cache
                .raw_entries(&self.meta)?
                .values()
                .filter(|e| !e.is_placeholder())
                .filter_map(|e| {
                    path::relative_to(&e.path, &name)
                        .filter(|rest| path::is_single_segment(rest))
                        .map(|rest| (e.path.clone(), rest.to_string()))
                })
                .collect();

            let folder_index = cache.folders(&self.meta)?;
            let folders: BTreeSet<String> = folder_index
                .keys()
                .filter_map(|k| {
                    path::relative_to(k, &name)
                        .filter(|rest| path::is_single_segment(rest))
                        .map(String::from)
                })
                .collect();
            let mut files: Vec<String> = candidates
                .into_iter()
                .filter(|(full, _)| !folder_index.contains_key(full))
                .map(|(_, rest)| rest)
                .collect();
            files.sort();
            Ok((folders.into_iter().collect(), files))
        })
    }

    /// Every descendant of `name`: `(folders, files)`. With `raw`,
    /// placeholder rows are listed too (tree operations need them to
    /// clean up); with `full`, paths are absolute instead of relative to
    /// `name`.
    pub fn listdir_recursive(
        &self,
        name: &str,
        raw: bool,
        full: bool,
    ) -> Result<(Vec<String>, Vec<String>)> {
        let name = path::clean(name);
        self.with_cache(|cache| {
            let candidates: Vec<String> = cache
                .raw_entries(&self.meta)?
                .values()
                .filter(|e| raw || !e.is_placeholder())
                .filter(|e| path::relative_to(&e.path, &name).is_some())
                .map(|e| e.path.clone())
                .collect();

            let folder_index = cache.folders(&self.meta)?;
            let mut files: Vec<String> = candidates
                .into_iter()
                .filter(|p| !folder_index.contains_key(p))
                .collect();
            let mut folders: Vec<String> = folder_index
                .keys()
                .filter(|k| path::relative_to(k, &name).is_some())
                .cloned()
                .collect();

            if !full {
                let strip = |p: String| {
                    path::relative_to(&p, &name)
                        .map(String::from)
                        .unwrap_or(p)
                };
                files = files.into_iter().map(strip).collect();
                folders = folders.into_iter().map(strip).collect();
            }
            files.sort();
            folders.sort();
            Ok((folders, files))
        })
    }

    /// Probed pixel dimensions for `name`, or `None` when unknown or
    /// not an image. "Unknown" is data, not an error.
    pub fn dimensions(&self, name: &str) -> Result<Option<(u32, u32)>> {
        let name = path::clean(name);
        self.with_cache(|cache| {
            let raw = cache.raw_entries(&self.meta)?;
            Ok(raw
                .get(&name)
                .filter(|e| !e.is_placeholder())
                .and_then(|e| e.dimensions()))
        })
    }

    /// Modification time: the folder timestamp when `name` is a folder,
    /// else the entry's, else "now". The last resort keeps callers that
    /// render listings from ever failing on a half-reconciled row.
    pub fn modified_time(&self, name: &str) -> Result<Timestamp> {
        let name = path::clean(name);
        self.with_cache(|cache| {
            if let Some(ts) = cache.folders(&self.meta)?.get(&name) {
                return Ok(*ts);
            }
            let raw = cache.raw_entries(&self.meta)?;
            Ok(raw
                .get(&name)
                .filter(|e| !e.is_placeholder())
                .and_then(|e| e.last_modified)
                .unwrap_or_else(now_millis))
        })
    }

    /// The most recently modified paths, newest first, capped at the
    /// configured limit, in `listdir` result shape (no folders).
    pub fn listmostrecent(&self, filter_original: bool) -> Result<(Vec<String>, Vec<String>)> {
        let rows = self
            .meta
            .most_recent(filter_original, self.config.recent_limit)?;
        Ok((Vec::new(), rows.into_iter().map(|e| e.path).collect()))
    }
}
