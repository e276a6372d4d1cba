//! Batch RGB normalization.
//!
//! Rewrites every cached image into 3-channel RGB, re-encoded in the
//! format its extension implies, overwriting the object through the
//! normal save path (which re-reconciles the row). Best effort: a row
//! that fails to decode or encode is logged and skipped, never aborting
//! the batch.

use crate::sync::SaveOptions;
use crate::{CachedFs, path};
use blobfs_common::Result;
use blobfs_storage::BlobStore;
use image::ImageFormat;
use std::io::Cursor;
use tracing::{info, warn};

/// Outcome counts for a conversion batch.
#[derive(Clone, Copy, Debug, Default)]
pub struct ConvertReport {
    /// Entries rewritten as RGB
    pub converted: usize,
    /// Entries left alone (not an image, unknown extension, or failed)
    pub skipped: usize,
}

impl CachedFs {
    /// Convert every non-placeholder cached entry to RGB in place.
    pub fn convert_all_to_rgb(&self) -> Result<ConvertReport> {
        let mut paths: Vec<String> = self.entries()?.into_keys().collect();
        paths.sort();

        let mut report = ConvertReport::default();
        for p in &paths {
            match self.convert_one(p) {
                Ok(true) => {
                    info!("saved {} as RGB", p);
                    report.converted += 1;
                }
                Ok(false) => report.skipped += 1,
                Err(e) => {
                    warn!("error converting {}: {}", p, e);
                    report.skipped += 1;
                }
            }
        }
        Ok(report)
    }

    /// Returns true when the entry was rewritten. Entries without a
    /// known image extension or that do not decode are skipped.
    fn convert_one(&self, name: &str) -> Result<bool> {
        let Some(format) = path::extension(name).and_then(|e| ImageFormat::from_extension(&e))
        else {
            return Ok(false);
        };
        let bytes = self.blobs.get(&self.blob_key(name))?;
        let Ok(img) = image::load_from_memory(&bytes) else {
            return Ok(false);
        };

        let mut buf = Cursor::new(Vec::new());
        img.to_rgb8()
            .write_to(&mut buf, format)
            .map_err(|e| blobfs_common::Error::storage(format!("re-encode failed: {e}")))?;
        self.save(name, buf.get_ref(), &SaveOptions::default())?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use crate::testutil::{fs, png_bytes, save};
    use blobfs_storage::BlobStore;

    #[test]
    fn test_converts_rgba_png_to_rgb() {
        let (_dir, fs) = fs();
        save(&fs, "pics/a.png", &png_bytes(4, 4));
        let before = fs.blobs.get("pics/a.png").unwrap();

        let report = fs.convert_all_to_rgb().unwrap();
        assert_eq!(report.converted, 1);

        let after = fs.blobs.get("pics/a.png").unwrap();
        assert_ne!(before, after);
        let img = image::load_from_memory(&after).unwrap();
        assert_eq!(img.color(), image::ColorType::Rgb8);
        // Row re-reconciled with the new size
        let row = fs.meta().get("pics/a.png").unwrap().unwrap();
        assert_eq!(row.size, Some(after.len() as u64));
    }

    #[test]
    fn test_non_images_are_skipped_not_fatal() {
        let (_dir, fs) = fs();
        save(&fs, "pics/ok.png", &png_bytes(2, 2));
        save(&fs, "notes.txt", b"plain text");
        save(&fs, "broken.png", b"not really a png");

        let report = fs.convert_all_to_rgb().unwrap();
        assert_eq!(report.converted, 1);
        assert_eq!(report.skipped, 2);
        // Untouched
        assert_eq!(
            fs.blobs.get("notes.txt").unwrap(),
            bytes::Bytes::from_static(b"plain text")
        );
    }

    #[test]
    fn test_placeholders_are_not_considered() {
        let (_dir, fs) = fs();
        fs.makedirs("hollow").unwrap();
        let report = fs.convert_all_to_rgb().unwrap();
        assert_eq!(report.converted, 0);
        assert_eq!(report.skipped, 0);
    }
}
