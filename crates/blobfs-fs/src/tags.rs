//! Tag associations and the tag-based virtual directory view.
//!
//! In tag mode the last path segment of a `listdir` is a tag name, the
//! configured recent-uploads name is a pseudo-folder of the newest
//! canonical uploads, and anything else lists the browsable tag
//! universe.

use crate::{CachedFs, path};
use blobfs_common::{Error, Result};
use tracing::debug;

impl CachedFs {
    /// Tag-mode `listdir`. Resolution order: entries tagged with the
    /// last segment; the recent-uploads pseudo-folder; otherwise the
    /// set of browsable virtual folders (every tag name plus the
    /// pseudo-folder), with no files.
    pub(crate) fn listdir_bytag(&self, name: &str) -> Result<(Vec<String>, Vec<String>)> {
        let name = path::clean(name);
        let seg = name.rsplit('/').next().unwrap_or("");
        debug!("tag browsing {}", seg);

        let paths = self.meta.entries_with_tag(seg)?;
        if !paths.is_empty() {
            return Ok((Vec::new(), paths));
        }
        if seg == self.config.recent_uploads_dir {
            return self.listmostrecent(true);
        }
        let mut folders = self.meta.tag_names()?;
        folders.push(self.config.recent_uploads_dir.clone());
        Ok((folders, Vec::new()))
    }

    /// Associate `name` with each tag, creating tags as needed.
    /// Returns false when the path has no cached entry.
    pub fn tag_file(&self, name: &str, tags: &[&str]) -> Result<bool> {
        let name = path::clean(name);
        if self.meta.get(&name)?.is_none() {
            return Ok(false);
        }
        for tag in tags {
            self.meta.add_tag(&name, tag)?;
        }
        Ok(true)
    }

    /// Mark one path as a canonical upload (or not).
    pub fn set_original(&self, name: &str, original: bool) -> Result<()> {
        let name = path::clean(name);
        let updated = self
            .meta
            .set_original(&name, original)?
            .ok_or_else(|| Error::EntryNotFound(name.clone()))?;
        self.with_cache(|cache| cache.note_entry(&updated));
        Ok(())
    }

    /// Mark many paths at once; missing paths are skipped. Returns the
    /// number of rows updated.
    pub fn batch_set_original(&self, names: &[String], original: bool) -> Result<usize> {
        let cleaned: Vec<String> = names.iter().map(|n| path::clean(n)).collect();
        let updated = self.meta.set_original_batch(&cleaned, original)?;
        self.invalidate_cache();
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use crate::sync::SaveOptions;
    use crate::testutil::{fs, fs_with_config, save};
    use blobfs_common::FsConfig;

    fn tag_mode() -> FsConfig {
        FsConfig {
            use_tag_directories: true,
            ..FsConfig::default()
        }
    }

    #[test]
    fn test_tag_file_and_listing() {
        let (_dir, fs) = fs_with_config(tag_mode());
        save(&fs, "photos/a.jpg", b"x");
        save(&fs, "photos/b.jpg", b"y");
        assert!(fs.tag_file("photos/a.jpg", &["holiday"]).unwrap());
        assert!(fs.tag_file("photos/b.jpg", &["holiday"]).unwrap());
        assert!(!fs.tag_file("ghost.jpg", &["holiday"]).unwrap());

        let (folders, mut files) = fs.listdir("holiday").unwrap();
        files.sort();
        assert!(folders.is_empty());
        assert_eq!(files, vec!["photos/a.jpg", "photos/b.jpg"]);
    }

    #[test]
    fn test_unmatched_segment_lists_tag_universe() {
        let (_dir, fs) = fs_with_config(tag_mode());
        save(&fs, "a.jpg", b"x");
        fs.tag_file("a.jpg", &["red", "blue"]).unwrap();

        let (mut folders, files) = fs.listdir("nothing-here").unwrap();
        folders.sort();
        assert!(files.is_empty());
        assert_eq!(folders, vec!["blue", "recent_uploads", "red"]);
    }

    #[test]
    fn test_recent_uploads_pseudo_folder() {
        let (_dir, fs) = fs_with_config(tag_mode());
        save(&fs, "new.jpg", b"x");
        save(&fs, "derived.jpg", b"y");
        fs.set_original("derived.jpg", false).unwrap();

        let (folders, files) = fs.listdir("recent_uploads").unwrap();
        assert!(folders.is_empty());
        assert_eq!(files, vec!["new.jpg"]);
    }

    #[test]
    fn test_isdir_accepts_tags_and_recent_name() {
        let (_dir, fs) = fs_with_config(tag_mode());
        save(&fs, "photos/a.jpg", b"x");
        fs.tag_file("photos/a.jpg", &["holiday"]).unwrap();

        assert!(fs.isdir("holiday").unwrap());
        assert!(fs.isdir("recent_uploads").unwrap());
        assert!(fs.isdir("photos").unwrap());
        // A plain file is still a file, not a tag directory
        assert!(!fs.isdir("photos/a.jpg").unwrap());
        assert!(!fs.isdir("unknown-name").unwrap());
    }

    #[test]
    fn test_batch_set_original() {
        let (_dir, fs) = fs();
        save(&fs, "a.jpg", b"x");
        save(&fs, "b.jpg", b"y");
        let n = fs
            .batch_set_original(&["a.jpg".to_string(), "b.jpg".to_string()], false)
            .unwrap();
        assert_eq!(n, 2);
        let (_, recent) = fs.listmostrecent(true).unwrap();
        assert!(recent.is_empty());
    }

    #[test]
    fn test_set_original_missing_is_error() {
        let (_dir, fs) = fs();
        let err = fs.set_original("ghost", true).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_save_marks_original_by_default() {
        let (_dir, fs) = fs();
        fs.save("a.jpg", b"x", &SaveOptions::default()).unwrap();
        let (_, recent) = fs.listmostrecent(true).unwrap();
        assert_eq!(recent, vec!["a.jpg"]);
    }
}
