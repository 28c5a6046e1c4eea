//! Extraction & publish stage
//!
//! Copies the install directory out of an ephemeral container, re-packs it
//! as `.tar.xz` and hands it to the sink. The container is removed on every
//! path; a removal failure only surfaces when nothing else failed.

use crate::archive::{check_top_level, compress_xz, sha256_file, Compression, INSTALL_BASE_DIR};
use crate::error::{ToolsmithError, ToolsmithResult};
use crate::orchestration::ContainerRuntime;
use crate::repository::ArtifactRepository;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Destination of a finished archive
pub enum ArtifactSink<'a> {
    Release(&'a ArtifactRepository),
    LocalFile(PathBuf),
}

/// Where an archive ended up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Published {
    Asset { name: String, id: u64 },
    File(PathBuf),
}

/// What the publish stage needs to know about the produced archive
#[derive(Debug, Clone)]
pub struct PublishRequest<'a> {
    /// Image holding the installed toolchain
    pub image: &'a str,
    /// Archive file name, `<prefix>.tar.xz`
    pub output_name: &'a str,
    /// Top-level directory of the archive
    pub prefix: &'a str,
    pub scratch_dir: &'a Path,
    pub compression_level: u32,
}

/// Prefer the primary failure; a cleanup failure is logged unless it is the only one
pub(crate) fn combine_cleanup<T>(
    result: ToolsmithResult<T>,
    cleanup: ToolsmithResult<()>,
) -> ToolsmithResult<T> {
    match (result, cleanup) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(cleanup_err)) => Err(cleanup_err),
        (Err(err), Ok(())) => Err(err),
        (Err(err), Err(cleanup_err)) => {
            warn!("{}", cleanup_err);
            Err(err)
        }
    }
}

/// Extract the install directory from `request.image` and publish it
pub async fn extract_and_publish(
    runtime: &dyn ContainerRuntime,
    request: &PublishRequest<'_>,
    sink: &ArtifactSink<'_>,
) -> ToolsmithResult<Published> {
    let name = format!(
        "toolsmith-extract-{}",
        &uuid::Uuid::new_v4().simple().to_string()[..12]
    );
    let container = runtime.create(request.image, &name).await?;

    let result = package_and_publish(runtime, &container, request, sink).await;
    let cleanup = runtime.remove(&container).await;
    combine_cleanup(result, cleanup)
}

async fn package_and_publish(
    runtime: &dyn ContainerRuntime,
    container: &str,
    request: &PublishRequest<'_>,
    sink: &ArtifactSink<'_>,
) -> ToolsmithResult<Published> {
    let compression = Compression::from_archive_path(Path::new(request.output_name))?;

    tokio::fs::create_dir_all(request.scratch_dir)
        .await
        .map_err(|e| ToolsmithError::io(format!("creating {}", request.scratch_dir.display()), e))?;
    let work = tempfile::Builder::new()
        .prefix("toolsmith-extract-")
        .tempdir_in(request.scratch_dir)
        .map_err(|e| ToolsmithError::io("creating extraction directory", e))?;

    let install_path = format!("{}/{}", INSTALL_BASE_DIR, request.prefix);
    let raw_tar = work.path().join("install.tar");
    info!("Extracting {} from {}...", install_path, request.image);
    runtime.copy_from(container, &install_path, &raw_tar).await?;

    match sink {
        ArtifactSink::Release(repository) => {
            let archive = work.path().join(request.output_name);
            pack(&raw_tar, &archive, request).await?;
            let id = repository.upload(&archive, compression.content_type()).await?;
            Ok(Published::Asset {
                name: request.output_name.to_string(),
                id,
            })
        }
        ArtifactSink::LocalFile(path) => store_local(&raw_tar, path, request).await,
    }
}

/// Check the raw tar layout, compress it and log its digest
async fn pack(raw_tar: &Path, archive: &Path, request: &PublishRequest<'_>) -> ToolsmithResult<()> {
    let raw_tar = raw_tar.to_path_buf();
    let archive_path = archive.to_path_buf();
    let prefix = request.prefix.to_string();
    let level = request.compression_level;

    let (size, digest) = tokio::task::spawn_blocking(move || {
        check_top_level(&raw_tar, &prefix)?;
        let size = compress_xz(&raw_tar, &archive_path, level)?;
        let digest = sha256_file(&archive_path)?;
        Ok::<_, ToolsmithError>((size, digest))
    })
    .await
    .map_err(|e| ToolsmithError::Internal(format!("compression task failed: {}", e)))??;

    info!(
        "Successfully extracted {} ({} bytes, sha256 {})",
        request.output_name, size, digest
    );
    Ok(())
}

/// Write the archive next to `destination` and atomically move it into place
async fn store_local(
    raw_tar: &Path,
    destination: &Path,
    request: &PublishRequest<'_>,
) -> ToolsmithResult<Published> {
    let parent = match destination.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    tokio::fs::create_dir_all(&parent)
        .await
        .map_err(|e| ToolsmithError::io(format!("creating {}", parent.display()), e))?;

    let staged = tempfile::Builder::new()
        .prefix(".toolsmith-")
        .suffix(".partial")
        .tempfile_in(&parent)
        .map_err(|e| ToolsmithError::io(format!("creating temp file in {}", parent.display()), e))?;

    info!("Storing {} to cache at '{}'...", request.output_name, destination.display());
    pack(raw_tar, staged.path(), request).await?;
    staged
        .persist(destination)
        .map_err(|e| ToolsmithError::io(format!("persisting {}", destination.display()), e.error))?;
    info!("{} stored to cache at '{}'!", request.output_name, destination.display());

    Ok(Published::File(destination.to_path_buf()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::orchestration::fakes::FakeRuntime;
    use crate::repository::fakes::FakeStore;
    use std::sync::Arc;

    fn runtime_with_image(image: &str) -> FakeRuntime {
        let runtime = FakeRuntime::default();
        runtime.images.lock().unwrap().insert(image.to_string());
        runtime
    }

    fn request<'a>(scratch: &'a Path) -> PublishRequest<'a> {
        PublishRequest {
            image: "libclang:17.0.6",
            output_name: "libclang-17.0.6-x86_64-linux-gnu.tar.xz",
            prefix: "libclang-17.0.6-x86_64-linux-gnu",
            scratch_dir: scratch,
            compression_level: 1,
        }
    }

    #[test]
    fn cleanup_error_only_surfaces_alone() {
        let cleanup = || {
            Err(ToolsmithError::ContainerCleanup {
                container: "c".to_string(),
                reason: "busy".to_string(),
            })
        };

        let err = combine_cleanup(Ok(1), cleanup()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ResourceCleanup);

        let err = combine_cleanup::<()>(Err(ToolsmithError::AssetNotFound("a".into())), cleanup())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        assert_eq!(combine_cleanup(Ok(1), Ok(())).unwrap(), 1);
    }

    #[tokio::test]
    async fn publishes_and_removes_container() {
        let temp = tempfile::TempDir::new().unwrap();
        let runtime = runtime_with_image("libclang:17.0.6");
        let store = Arc::new(FakeStore::default());
        let repository = ArtifactRepository::open(store.clone()).await.unwrap();

        let published = extract_and_publish(
            &runtime,
            &request(temp.path()),
            &ArtifactSink::Release(&repository),
        )
        .await
        .unwrap();

        assert!(matches!(published, Published::Asset { ref name, .. } if name == "libclang-17.0.6-x86_64-linux-gnu.tar.xz"));
        assert_eq!(
            runtime.copies.lock().unwrap().as_slice(),
            ["/var/buildlibs/libclang-17.0.6-x86_64-linux-gnu"]
        );
        assert_eq!(*runtime.created.lock().unwrap(), *runtime.removed.lock().unwrap());
        assert_eq!(store.uploads.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn copy_failure_still_removes_container() {
        let temp = tempfile::TempDir::new().unwrap();
        let runtime = FakeRuntime {
            fail_copy: true,
            fail_remove: true,
            ..runtime_with_image("libclang:17.0.6")
        };
        let store = Arc::new(FakeStore::default());
        let repository = ArtifactRepository::open(store.clone()).await.unwrap();

        let err = extract_and_publish(
            &runtime,
            &request(temp.path()),
            &ArtifactSink::Release(&repository),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ToolsmithError::ContainerCopy { .. }));
        assert_eq!(runtime.removed.lock().unwrap().len(), 1);
        assert!(store.uploads.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn cleanup_failure_alone_is_reported() {
        let temp = tempfile::TempDir::new().unwrap();
        let runtime = FakeRuntime {
            fail_remove: true,
            ..runtime_with_image("libclang:17.0.6")
        };
        let store = Arc::new(FakeStore::default());
        let repository = ArtifactRepository::open(store).await.unwrap();

        let err = extract_and_publish(
            &runtime,
            &request(temp.path()),
            &ArtifactSink::Release(&repository),
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ResourceCleanup);
    }

    #[tokio::test]
    async fn local_sink_persists_archive() {
        let temp = tempfile::TempDir::new().unwrap();
        let runtime = runtime_with_image("cmake:cmake-3.28.1");
        let destination = temp.path().join("cache").join("cmake-3.28.1.tar.xz");

        let published = extract_and_publish(
            &runtime,
            &PublishRequest {
                image: "cmake:cmake-3.28.1",
                output_name: "cmake-3.28.1.tar.xz",
                prefix: "cmake-3.28.1",
                scratch_dir: temp.path(),
                compression_level: 1,
            },
            &ArtifactSink::LocalFile(destination.clone()),
        )
        .await
        .unwrap();

        assert_eq!(published, Published::File(destination.clone()));
        let unpacked = temp.path().join("check");
        crate::archive::unpack(&destination, &unpacked).unwrap();
        assert!(unpacked.join("cmake-3.28.1/bin/tool").exists());

        let leftovers: Vec<_> = std::fs::read_dir(temp.path().join("cache"))
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".partial"))
            .collect();
        assert!(leftovers.is_empty());
    }
}
