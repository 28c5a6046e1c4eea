//! Container runtime abstraction
//!
//! Provides a trait for the container operations a toolchain build needs,
//! so the pipeline can run against docker, podman, or a test double.

use crate::error::ToolsmithResult;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// One `build` invocation: context directory, build file, tag and build args
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageBuildRequest {
    /// Build context root; every path argument is relative to it
    pub context_dir: PathBuf,
    /// Build description file name inside the context
    pub dockerfile: String,
    /// Tag for the resulting image
    pub tag: String,
    /// `--build-arg` values in insertion order
    pub build_args: Vec<(String, String)>,
}

impl ImageBuildRequest {
    pub fn new(context_dir: impl Into<PathBuf>, dockerfile: &str, tag: &str) -> Self {
        Self {
            context_dir: context_dir.into(),
            dockerfile: dockerfile.to_string(),
            tag: tag.to_string(),
            build_args: Vec::new(),
        }
    }

    pub fn arg(mut self, key: &str, value: impl Into<String>) -> Self {
        self.build_args.push((key.to_string(), value.into()));
        self
    }

    /// Look up a build argument by name
    pub fn build_arg(&self, key: &str) -> Option<&str> {
        self.build_args
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Abstract container runtime interface
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Fail early if the engine binary or daemon is unusable
    async fn ensure_ready(&self) -> ToolsmithResult<()>;

    /// Build an image, calling `on_output` for every output line.
    ///
    /// The first engine error line aborts the build and becomes the error.
    async fn build_image_streaming(
        &self,
        request: &ImageBuildRequest,
        on_output: &(dyn for<'s> Fn(&'s str) + Send + Sync),
    ) -> ToolsmithResult<()>;

    /// Create (but do not start) a container, returning its ID
    async fn create(&self, image: &str, name: &str) -> ToolsmithResult<String>;

    /// Copy `path` out of a container as an uncompressed tar stream into `dest`
    async fn copy_from(&self, container_id: &str, path: &str, dest: &Path) -> ToolsmithResult<()>;

    /// Remove a container; a container that no longer exists is not an error
    async fn remove(&self, container_id: &str) -> ToolsmithResult<()>;

    async fn image_exists(&self, image: &str) -> ToolsmithResult<bool>;

    /// Save an image to a tarball
    async fn save_image(&self, image: &str, dest: &Path) -> ToolsmithResult<()>;

    /// Load images from a tarball
    async fn load_image(&self, archive: &Path) -> ToolsmithResult<()>;

    /// Get the human-readable runtime name for display
    fn runtime_name(&self) -> &'static str;
}

#[cfg(test)]
pub(crate) mod fakes {
    use super::*;
    use crate::error::ToolsmithError;
    use std::collections::HashSet;
    use std::sync::Mutex;

    /// Records every call; `copy_from` writes a real tar whose single
    /// top-level directory is the last component of the copied path.
    #[derive(Default)]
    pub struct FakeRuntime {
        pub builds: Mutex<Vec<ImageBuildRequest>>,
        pub created: Mutex<Vec<String>>,
        pub removed: Mutex<Vec<String>>,
        pub copies: Mutex<Vec<String>>,
        pub images: Mutex<HashSet<String>>,
        pub saved: Mutex<Vec<String>>,
        pub loaded: Mutex<Vec<PathBuf>>,
        /// Fail the build whose tag starts with this
        pub fail_build: Option<String>,
        pub fail_copy: bool,
        pub fail_remove: bool,
    }

    impl FakeRuntime {
        pub fn build_count(&self) -> usize {
            self.builds.lock().unwrap().len()
        }

        pub fn dockerfiles(&self) -> Vec<String> {
            self.builds
                .lock()
                .unwrap()
                .iter()
                .map(|b| b.dockerfile.clone())
                .collect()
        }
    }

    #[async_trait]
    impl ContainerRuntime for FakeRuntime {
        async fn ensure_ready(&self) -> ToolsmithResult<()> {
            Ok(())
        }

        async fn build_image_streaming(
            &self,
            request: &ImageBuildRequest,
            on_output: &(dyn for<'s> Fn(&'s str) + Send + Sync),
        ) -> ToolsmithResult<()> {
            self.builds.lock().unwrap().push(request.clone());
            on_output("STEP 1/1: FROM base");
            if let Some(ref prefix) = self.fail_build {
                if request.tag.starts_with(prefix.as_str()) {
                    return Err(ToolsmithError::ImageBuild {
                        tag: request.tag.clone(),
                        reason: "ERROR: make failed".to_string(),
                    });
                }
            }
            self.images.lock().unwrap().insert(request.tag.clone());
            Ok(())
        }

        async fn create(&self, image: &str, name: &str) -> ToolsmithResult<String> {
            if !self.images.lock().unwrap().contains(image) {
                return Err(ToolsmithError::ContainerCreate {
                    image: image.to_string(),
                    reason: "image not known".to_string(),
                });
            }
            self.created.lock().unwrap().push(name.to_string());
            Ok(name.to_string())
        }

        async fn copy_from(
            &self,
            container_id: &str,
            path: &str,
            dest: &Path,
        ) -> ToolsmithResult<()> {
            self.copies.lock().unwrap().push(path.to_string());
            if self.fail_copy {
                return Err(ToolsmithError::ContainerCopy {
                    container: container_id.to_string(),
                    reason: "no such file or directory".to_string(),
                });
            }
            let top = Path::new(path)
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let file = std::fs::File::create(dest).unwrap();
            let mut builder = tar::Builder::new(file);
            let content = b"toolchain";
            let mut header = tar::Header::new_gnu();
            header.set_size(content.len() as u64);
            header.set_mode(0o755);
            builder
                .append_data(&mut header, format!("{}/bin/tool", top), &content[..])
                .unwrap();
            builder.finish().unwrap();
            Ok(())
        }

        async fn remove(&self, container_id: &str) -> ToolsmithResult<()> {
            self.removed.lock().unwrap().push(container_id.to_string());
            if self.fail_remove {
                return Err(ToolsmithError::ContainerCleanup {
                    container: container_id.to_string(),
                    reason: "device or resource busy".to_string(),
                });
            }
            Ok(())
        }

        async fn image_exists(&self, image: &str) -> ToolsmithResult<bool> {
            Ok(self.images.lock().unwrap().contains(image))
        }

        async fn save_image(&self, image: &str, dest: &Path) -> ToolsmithResult<()> {
            self.saved.lock().unwrap().push(image.to_string());
            std::fs::write(dest, image.as_bytes()).unwrap();
            Ok(())
        }

        async fn load_image(&self, archive: &Path) -> ToolsmithResult<()> {
            self.loaded.lock().unwrap().push(archive.to_path_buf());
            let tag = std::fs::read_to_string(archive)
                .map_err(|e| ToolsmithError::io("reading image archive", e))?;
            self.images.lock().unwrap().insert(tag);
            Ok(())
        }

        fn runtime_name(&self) -> &'static str {
            "Fake"
        }
    }
}
