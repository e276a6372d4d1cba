//! Thumbnail generation and lookup.
//!
//! Thumbnails are addressed by entry id, not by path, so a rename never
//! invalidates the reference. Rendering is JPEG at a bounded longest
//! edge.

use crate::{CachedFs, path};
use blobfs_common::{EntryId, Error, Result};
use blobfs_storage::BlobStore;
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;
use tracing::debug;

/// Encode a bounded JPEG thumbnail of `img`.
pub(crate) fn render_thumbnail(img: &DynamicImage, max_edge: u32) -> Result<Vec<u8>> {
    let thumb = img.thumbnail(max_edge, max_edge);
    let mut buf = Cursor::new(Vec::new());
    // JPEG has no alpha; flatten before encoding
    thumb
        .to_rgb8()
        .write_to(&mut buf, ImageFormat::Jpeg)
        .map_err(|e| Error::storage(format!("thumbnail encode failed: {e}")))?;
    Ok(buf.into_inner())
}

impl CachedFs {
    /// Render and persist a thumbnail for `name` from the stored blob.
    /// Usable directly as the `thumbnail_ref` callback.
    pub fn generate_thumbnail(&self, name: &str) -> Result<()> {
        let name = path::clean(name);
        let row = self
            .meta
            .get(&name)?
            .ok_or_else(|| Error::EntryNotFound(name.clone()))?;
        let bytes = self.blobs.get(&self.blob_key(&name))?;
        let img = image::load_from_memory(&bytes)
            .map_err(|_| Error::ThumbnailUnavailable(name.clone()))?;
        let rendered = render_thumbnail(&img, self.config.thumbnail_max_edge)?;
        debug!("rendered {} byte thumbnail for {}", rendered.len(), name);
        self.meta.put_thumbnail(row.id, &rendered)?;
        Ok(())
    }

    /// The id-addressed thumbnail reference for `name`, invoking
    /// `generate` once if no thumbnail is cached yet. Fails when the
    /// path has no entry or the callback produced nothing.
    pub fn thumbnail_ref(
        &self,
        name: &str,
        generate: impl FnOnce(&Self) -> Result<()>,
    ) -> Result<EntryId> {
        let name = path::clean(name);
        let row = self
            .meta
            .get(&name)?
            .ok_or_else(|| Error::EntryNotFound(name.clone()))?;
        if self.meta.get_thumbnail(row.id)?.is_none() {
            generate(self)?;
        }
        if self.meta.get_thumbnail(row.id)?.is_some() {
            Ok(row.id)
        } else {
            Err(Error::ThumbnailUnavailable(name))
        }
    }

    /// Serve a stored thumbnail blob by entry id.
    pub fn thumbnail_bytes(&self, id: EntryId) -> Result<Option<Vec<u8>>> {
        Ok(self.meta.get_thumbnail(id)?)
    }
}

#[cfg(test)]
mod tests {
    use crate::sync::SaveOptions;
    use crate::testutil::{fs, png_bytes, save};

    #[test]
    fn test_save_with_thumbnail_renders_one() {
        let (_dir, fs) = fs();
        fs.save(
            "photos/a.png",
            &png_bytes(64, 32),
            &SaveOptions {
                original: true,
                thumbnail: true,
            },
        )
        .unwrap();
        let row = fs.meta().get("photos/a.png").unwrap().unwrap();
        let thumb = fs.thumbnail_bytes(row.id).unwrap().unwrap();
        assert!(!thumb.is_empty());
        // JPEG magic
        assert_eq!(&thumb[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn test_thumbnail_ref_generates_on_demand() {
        let (_dir, fs) = fs();
        save(&fs, "photos/b.png", &png_bytes(16, 16));
        let row = fs.meta().get("photos/b.png").unwrap().unwrap();
        assert!(fs.thumbnail_bytes(row.id).unwrap().is_none());

        let id = fs
            .thumbnail_ref("photos/b.png", |fs| fs.generate_thumbnail("photos/b.png"))
            .unwrap();
        assert_eq!(id, row.id);
        assert!(fs.thumbnail_bytes(id).unwrap().is_some());
    }

    #[test]
    fn test_thumbnail_ref_missing_entry() {
        let (_dir, fs) = fs();
        let err = fs
            .thumbnail_ref("ghost.png", |_| Ok(()))
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_reference_survives_rename() {
        let (_dir, fs) = fs();
        save(&fs, "old.png", &png_bytes(8, 8));
        let id = fs
            .thumbnail_ref("old.png", |fs| fs.generate_thumbnail("old.png"))
            .unwrap();

        fs.rename("old.png", "renamed.png", false).unwrap();
        let row = fs.meta().get("renamed.png").unwrap().unwrap();
        assert_eq!(row.id, id);
        assert!(fs.thumbnail_bytes(id).unwrap().is_some());
    }

    #[test]
    fn test_generate_on_non_image_is_unavailable() {
        let (_dir, fs) = fs();
        save(&fs, "notes.txt", b"words");
        let err = fs
            .thumbnail_ref("notes.txt", |fs| fs.generate_thumbnail("notes.txt"))
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
