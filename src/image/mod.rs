//! Base image cache
//!
//! Base images are expensive to build, so CI jobs save them to a directory
//! that outlives the job and load them back in the next one.

use crate::error::{ToolsmithError, ToolsmithResult};
use crate::orchestration::{ContainerRuntime, ImageBuildRequest};
use crate::toolchain::BaseImageSet;
use crate::toolchain::build::run_stages;
use crate::ui::UiContext;
use std::path::{Path, PathBuf};
use tracing::info;

/// Direction of a cache operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOp {
    Load,
    Store,
}

/// Tarball holding one saved image
pub fn image_archive(cache_dir: &Path, tag: &str) -> PathBuf {
    cache_dir.join(format!("{}.tar", tag))
}

/// Build every base image of `set` and save each to the cache directory
pub async fn store(
    runtime: &dyn ContainerRuntime,
    set: BaseImageSet,
    build_root: &Path,
    cache_dir: &Path,
    ui: &UiContext,
) -> ToolsmithResult<Vec<PathBuf>> {
    let context_dir = build_root.join(set.context_dir());
    if !context_dir.is_dir() {
        return Err(ToolsmithError::config(format!(
            "build context {} does not exist",
            context_dir.display()
        )));
    }
    tokio::fs::create_dir_all(cache_dir)
        .await
        .map_err(|e| ToolsmithError::io(format!("creating {}", cache_dir.display()), e))?;
    runtime.ensure_ready().await?;

    let requests: Vec<ImageBuildRequest> = set
        .images()
        .iter()
        .map(|image| ImageBuildRequest::new(&context_dir, image.dockerfile, image.tag))
        .collect();
    run_stages(runtime, &requests, ui).await?;

    let mut saved = Vec::with_capacity(requests.len());
    for image in set.images() {
        let archive = image_archive(cache_dir, image.tag);
        info!("Saving {} to '{}'...", image.tag, archive.display());
        runtime.save_image(image.tag, &archive).await?;
        saved.push(archive);
    }
    Ok(saved)
}

/// Load every base image of `set` from the cache directory
pub async fn load(
    runtime: &dyn ContainerRuntime,
    set: BaseImageSet,
    cache_dir: &Path,
) -> ToolsmithResult<Vec<&'static str>> {
    runtime.ensure_ready().await?;

    let mut loaded = Vec::new();
    for image in set.images() {
        let archive = image_archive(cache_dir, image.tag);
        if !archive.is_file() {
            return Err(ToolsmithError::ImageMissing(format!(
                "{} (no cached archive at {})",
                image.tag,
                archive.display()
            )));
        }

        info!("Loading {} from '{}'...", image.tag, archive.display());
        runtime.load_image(&archive).await?;
        if !runtime.image_exists(image.tag).await? {
            return Err(ToolsmithError::ImageMissing(image.tag.to_string()));
        }
        loaded.push(image.tag);
    }
    Ok(loaded)
}
