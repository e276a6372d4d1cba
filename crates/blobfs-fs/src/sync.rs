//! Reconciliation between the blob store and the metadata cache.
//!
//! `update_cache_entry` is the single write path for metadata: normal
//! saves, file moves, and the bulk sync job all funnel through it, so
//! every write freshens size, mtime, and (once per path, ever) the
//! image probe. `sync_to_store` walks every key under the configured
//! location and applies it per key.

use crate::{CachedFs, path, thumb};
use blobfs_common::{Error, Result};
use blobfs_meta_store::MetaEntry;
use blobfs_storage::{BlobObject, BlobStore};
use image::GenericImageView;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Options carried by a save through to reconciliation.
#[derive(Clone, Copy, Debug)]
pub struct SaveOptions {
    /// Mark a newly created row as a canonical upload. Ignored for
    /// existing rows; their flag is only changed via `set_original`.
    pub original: bool,
    /// Render and persist a thumbnail if the probe decodes an image.
    pub thumbnail: bool,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self {
            original: true,
            thumbnail: false,
        }
    }
}

/// What happened when a key was probed as an image. Never an error for
/// the caller: "not an image" becomes a sticky zero-dimension marker,
/// a transport failure leaves the row unprobed for the next pass.
enum ProbeOutcome {
    Probed(image::DynamicImage),
    NotAnImage,
    TransportFailed(Error),
}

/// Result of a full bulk sync.
#[derive(Clone, Copy, Debug)]
pub struct SyncReport {
    /// Keys observed and reconciled
    pub scanned: usize,
}

impl CachedFs {
    /// Store bytes under `name` and reconcile its metadata row.
    /// Returns the cleaned path the object was stored at.
    pub fn save(&self, name: &str, data: &[u8], opts: &SaveOptions) -> Result<String> {
        let name = path::clean(name);
        debug!("saving file {}", name);
        self.blobs.put(&self.blob_key(&name), data)?;
        self.update_cache_entry(&name, None, opts)?;
        Ok(name)
    }

    /// Reconcile one path against the blob store: resolve live size and
    /// mtime (from `observed` if the caller already listed the key),
    /// probe image dimensions iff the row has never been probed, then
    /// upsert and patch the in-memory indices without a full
    /// invalidation.
    pub fn update_cache_entry(
        &self,
        name: &str,
        observed: Option<&BlobObject>,
        opts: &SaveOptions,
    ) -> Result<()> {
        let name = path::clean(name);
        let key = self.blob_key(&name);
        let observed = match observed {
            Some(o) => o.clone(),
            None => self
                .blobs
                .head(&key)?
                .ok_or_else(|| Error::BlobNotFound(key.clone()))?,
        };

        let mut row = match self.meta.get(&name)? {
            Some(existing) => existing,
            None => {
                let mut fresh = MetaEntry::new(&name);
                fresh.original = opts.original;
                fresh
            }
        };
        row.size = Some(observed.size);
        row.last_modified = Some(observed.last_modified);

        if !row.probed() {
            self.throttle_probe();
            match self.probe_image(&key) {
                ProbeOutcome::Probed(img) => {
                    let (w, h) = img.dimensions();
                    row.image_x = Some(w);
                    row.image_y = Some(h);
                    if opts.thumbnail {
                        debug!("saving thumbnail cache for {}", name);
                        let bytes =
                            thumb::render_thumbnail(&img, self.config.thumbnail_max_edge)?;
                        self.meta.put_thumbnail(row.id, &bytes)?;
                    }
                }
                ProbeOutcome::NotAnImage => {
                    // Sticky marker: never probed again
                    row.image_x = Some(0);
                    row.image_y = Some(0);
                }
                ProbeOutcome::TransportFailed(e) => {
                    warn!("image probe of {} failed, retrying next pass: {}", name, e);
                }
            }
        }

        self.meta.upsert(&row)?;
        self.with_cache(|cache| cache.note_entry(&row));
        Ok(())
    }

    /// Walk every key under the configured location and reconcile each
    /// one. Rows for keys that vanished from the store are not removed;
    /// deletion only happens through the tree operations.
    pub fn sync_to_store(&self) -> Result<SyncReport> {
        let prefix = if self.config.location.is_empty() {
            String::new()
        } else {
            format!("{}/", self.config.location)
        };
        let listed = self.blobs.list(&prefix)?;
        info!("syncing {} keys under '{}'", listed.len(), prefix);

        let mut scanned = 0;
        for obj in listed {
            let name = if self.config.location.is_empty() {
                obj.key.clone()
            } else {
                match path::relative_to(&obj.key, &self.config.location) {
                    Some(rest) => rest.to_string(),
                    None => continue,
                }
            };
            self.update_cache_entry(
                &name,
                Some(&obj),
                &SaveOptions {
                    original: false,
                    thumbnail: false,
                },
            )?;
            scanned += 1;
        }
        info!("sync complete: {} keys reconciled", scanned);
        Ok(SyncReport { scanned })
    }

    /// Probing decodes whole objects, so a full-bucket walk pauses
    /// every `probe_batch` probes for `probe_pause_secs`. Tunables, not
    /// contracts.
    fn throttle_probe(&self) {
        let pause = self.with_cache(|cache| {
            cache.update_calls += 1;
            if cache.update_calls > self.config.probe_batch {
                cache.update_calls = 0;
                true
            } else {
                false
            }
        });
        if pause {
            debug!(
                "probe budget exhausted, pausing {}s",
                self.config.probe_pause_secs
            );
            std::thread::sleep(Duration::from_secs(self.config.probe_pause_secs));
        }
    }

    fn probe_image(&self, key: &str) -> ProbeOutcome {
        let bytes = match self.blobs.get(key) {
            Ok(b) => b,
            Err(e) => return ProbeOutcome::TransportFailed(e),
        };
        match image::load_from_memory(&bytes) {
            Ok(img) => ProbeOutcome::Probed(img),
            Err(e) => {
                debug!("{} does not decode as an image: {}", key, e);
                ProbeOutcome::NotAnImage
            }
        }
    }
}
