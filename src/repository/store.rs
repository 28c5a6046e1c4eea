//! Artifact store abstraction
//!
//! A store is one versioned release: a flat, name-keyed set of binary
//! assets. Implementations only move bytes; caching of the listing and
//! the not-found/duplicate semantics live in [`super::ArtifactRepository`].

use crate::error::ToolsmithResult;
use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;

/// One asset attached to a release
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReleaseAsset {
    /// Store-assigned asset ID
    pub id: u64,
    /// Asset name, unique within the release
    pub name: String,
    /// API URL used to download the asset contents
    pub url: String,
    /// Size in bytes
    #[serde(default)]
    pub size: u64,
}

/// Remote release holding published archives
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// List every asset currently attached to the release
    async fn list_assets(&self) -> ToolsmithResult<Vec<ReleaseAsset>>;

    /// Download an asset's contents into `dest`
    async fn download_asset(&self, asset: &ReleaseAsset, dest: &Path) -> ToolsmithResult<()>;

    /// Upload a local file under `name`, returning the new asset ID.
    ///
    /// Fails with `DuplicateAsset` if the release already holds `name`.
    async fn upload_asset(&self, path: &Path, name: &str, content_type: &str)
        -> ToolsmithResult<u64>;

    /// Human-readable location, e.g. `owner/repo@v1.0`
    fn describe(&self) -> String;
}
