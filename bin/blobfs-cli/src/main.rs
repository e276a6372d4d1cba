//! BlobFS command-line interface
//!
//! Operational entry points for the filesystem-emulation engine: the
//! bulk cache sync, the batch RGB converter, and day-to-day tree and
//! tag operations against a local blob directory.

use anyhow::{Context, Result};
use blobfs_common::FsConfig;
use blobfs_fs::{CachedFs, SaveOptions};
use blobfs_meta_store::MetaStore;
use blobfs_storage::DirBlobStore;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "blobfs")]
#[command(about = "Cache-backed filesystem view over a blob store")]
#[command(version)]
struct Args {
    /// Metadata database path
    #[arg(long, env = "BLOBFS_DATA", default_value = "blobfs-data/meta.redb")]
    data: PathBuf,

    /// Blob store root directory
    #[arg(long, env = "BLOBFS_BLOBS", default_value = "blobfs-data/blobs")]
    blobs: PathBuf,

    /// Optional TOML configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Reconcile the metadata cache against every key in the blob store
    Sync,
    /// Rewrite all cached images as 3-channel RGB
    RgbConvert,
    /// Upload a local file
    Put {
        /// Local file to read
        file: PathBuf,
        /// Destination path
        dest: String,
        /// Also render a thumbnail
        #[arg(long)]
        thumbnail: bool,
    },
    /// List one directory level
    Ls {
        #[arg(default_value = "")]
        path: String,
        /// List the whole subtree
        #[arg(short, long)]
        recursive: bool,
    },
    /// Move a file or directory tree
    Mv {
        old: String,
        new: String,
        /// Replace an existing destination file
        #[arg(long)]
        overwrite: bool,
    },
    /// Delete a path
    Rm {
        path: String,
        /// Delete a whole subtree
        #[arg(short, long)]
        recursive: bool,
    },
    /// Create a directory
    Mkdir { path: String },
    /// Associate tags with a path
    Tag {
        path: String,
        #[arg(required = true)]
        tags: Vec<String>,
    },
    /// Mark paths as canonical uploads (or not, with --off)
    SetOriginal {
        #[arg(required = true)]
        paths: Vec<String>,
        #[arg(long)]
        off: bool,
    },
}

fn load_config(path: Option<&str>) -> Result<FsConfig> {
    let mut builder = config::Config::builder();
    if let Some(p) = path {
        builder = builder.add_source(config::File::with_name(p));
    }
    let cfg = builder.build().context("failed to read configuration")?;
    cfg.try_deserialize()
        .context("failed to parse configuration")
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| args.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = load_config(args.config.as_deref())?;
    let meta = Arc::new(MetaStore::open(&args.data).context("failed to open metadata store")?);
    let blobs = Arc::new(DirBlobStore::open(&args.blobs).context("failed to open blob store")?);
    let fs = CachedFs::new(config, meta, blobs);

    match args.command {
        Command::Sync => {
            let report = fs.sync_to_store()?;
            info!("reconciled {} keys", report.scanned);
        }
        Command::RgbConvert => {
            let report = fs.convert_all_to_rgb()?;
            info!(
                "converted {} entries, skipped {}",
                report.converted, report.skipped
            );
        }
        Command::Put {
            file,
            dest,
            thumbnail,
        } => {
            let data = std::fs::read(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let opts = SaveOptions {
                original: true,
                thumbnail,
            };
            let stored = fs.save(&dest, &data, &opts)?;
            println!("{stored}");
        }
        Command::Ls { path, recursive } => {
            let (folders, files) = if recursive {
                fs.listdir_recursive(&path, false, false)?
            } else {
                fs.listdir(&path)?
            };
            for folder in folders {
                println!("{folder}/");
            }
            for file in files {
                println!("{file}");
            }
        }
        Command::Mv {
            old,
            new,
            overwrite,
        } => {
            fs.rename(&old, &new, overwrite)?;
        }
        Command::Rm { path, recursive } => {
            if recursive {
                fs.rmtree(&path)?;
            } else {
                fs.delete(&path, true)?;
            }
        }
        Command::Mkdir { path } => {
            fs.makedirs(&path)?;
        }
        Command::Tag { path, tags } => {
            let tag_refs: Vec<&str> = tags.iter().map(String::as_str).collect();
            if !fs.tag_file(&path, &tag_refs)? {
                anyhow::bail!("no cached entry for '{path}'");
            }
        }
        Command::SetOriginal { paths, off } => {
            let updated = fs.batch_set_original(&paths, !off)?;
            info!("updated {} entries", updated);
        }
    }
    Ok(())
}
