//! Artifact repository client
//!
//! Wraps an [`ArtifactStore`] with the single-fetch listing contract:
//! the release's asset names are read once when the repository is opened
//! and that snapshot answers every existence check for the rest of the run.

pub mod github;
pub mod store;
pub mod token;

pub use github::GithubReleaseStore;
pub use store::{ArtifactStore, ReleaseAsset};
pub use token::GithubToken;

use crate::error::{ToolsmithError, ToolsmithResult};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tracing::{debug, info};

/// Snapshot of a release's assets, taken once per run
#[derive(Debug, Clone, Default)]
pub struct AssetListing {
    assets: Vec<ReleaseAsset>,
}

impl AssetListing {
    pub fn new(assets: Vec<ReleaseAsset>) -> Self {
        Self { assets }
    }

    /// Find an asset by exact name
    pub fn find(&self, name: &str) -> Option<&ReleaseAsset> {
        self.assets.iter().find(|a| a.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }
}

/// An archive downloaded into a scratch directory.
///
/// The scratch directory and the file are deleted when this is dropped.
#[derive(Debug)]
pub struct DownloadedArchive {
    _dir: TempDir,
    path: PathBuf,
}

impl DownloadedArchive {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Release-backed artifact repository with a cached asset listing
pub struct ArtifactRepository {
    store: Arc<dyn ArtifactStore>,
    listing: AssetListing,
}

impl ArtifactRepository {
    /// Open the repository, fetching the asset listing exactly once
    pub async fn open(store: Arc<dyn ArtifactStore>) -> ToolsmithResult<Self> {
        let assets = store.list_assets().await?;
        debug!("Release {} holds {} assets", store.describe(), assets.len());
        Ok(Self {
            store,
            listing: AssetListing::new(assets),
        })
    }

    /// Whether an asset with this name was present when the repository was opened
    pub fn exists(&self, name: &str) -> bool {
        self.listing.contains(name)
    }

    pub fn describe(&self) -> String {
        self.store.describe()
    }

    /// Download a named asset into a fresh scratch directory under `scratch_root`.
    ///
    /// The file keeps the asset name so archive naming rules still apply to it.
    pub async fn fetch(&self, name: &str, scratch_root: &Path) -> ToolsmithResult<DownloadedArchive> {
        let asset = self
            .listing
            .find(name)
            .ok_or_else(|| ToolsmithError::AssetNotFound(name.to_string()))?;

        tokio::fs::create_dir_all(scratch_root)
            .await
            .map_err(|e| ToolsmithError::io(format!("creating {}", scratch_root.display()), e))?;
        let dir = tempfile::Builder::new()
            .prefix("toolsmith-download-")
            .tempdir_in(scratch_root)
            .map_err(|e| ToolsmithError::io("creating download directory", e))?;
        let path = dir.path().join(&asset.name);

        info!("Downloading '{}'...", asset.name);
        self.store.download_asset(asset, &path).await?;
        info!("'{}' successfully downloaded!", asset.name);

        Ok(DownloadedArchive { _dir: dir, path })
    }

    /// Upload a local archive; the asset name is the file name.
    pub async fn upload(&self, local_path: &Path, content_type: &str) -> ToolsmithResult<u64> {
        let name = local_path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| ToolsmithError::ArchiveName {
                name: local_path.display().to_string(),
                reason: "file name is missing or not UTF-8".to_string(),
            })?;

        info!("Uploading {} to {}", name, self.store.describe());
        let id = self.store.upload_asset(local_path, name, content_type).await?;
        info!("Asset {} successfully uploaded (id={})!", name, id);
        Ok(id)
    }
}
