//! Command-line container runtime
//!
//! Implements the ContainerRuntime trait by executing the docker or podman
//! binary directly.

use crate::error::{ToolsmithError, ToolsmithResult};
use crate::orchestration::factory::Engine;
use crate::orchestration::runtime::{ContainerRuntime, ImageBuildRequest};
use crate::orchestration::{build_error_output, stream_child_output, StreamEnd};
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

/// Container runtime driving an engine binary
pub struct CliRuntime {
    engine: Engine,
}

impl CliRuntime {
    pub fn new(engine: Engine) -> Self {
        Self { engine }
    }

    fn program(&self) -> &'static str {
        self.engine.program()
    }

    fn describe(&self, args: &[&str]) -> String {
        format!("{} {}", self.program(), args.first().copied().unwrap_or_default())
    }

    /// Execute an engine command and return the output
    async fn exec(&self, args: &[&str]) -> ToolsmithResult<std::process::Output> {
        debug!("Executing: {} {:?}", self.program(), args);

        Command::new(self.program())
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| self.spawn_error(args, e))
    }

    fn spawn_error(&self, args: &[&str], e: std::io::Error) -> ToolsmithError {
        if e.kind() == std::io::ErrorKind::NotFound {
            ToolsmithError::EngineNotFound(self.program().to_string())
        } else {
            ToolsmithError::command_failed(self.describe(args), e)
        }
    }

    /// Arguments for `build`
    fn build_args(&self, request: &ImageBuildRequest) -> Vec<String> {
        let context = request.context_dir.display().to_string();
        let dockerfile = request.context_dir.join(&request.dockerfile);

        let mut args = vec!["build".to_string()];
        if self.engine == Engine::Docker {
            // Line-oriented output even when attached to a terminal
            args.push("--progress=plain".to_string());
        }
        args.push("-f".to_string());
        args.push(dockerfile.display().to_string());
        args.push("-t".to_string());
        args.push(request.tag.clone());
        for (key, value) in &request.build_args {
            args.push("--build-arg".to_string());
            args.push(format!("{}={}", key, value));
        }
        args.push(context);
        args
    }
}

#[async_trait]
impl ContainerRuntime for CliRuntime {
    async fn ensure_ready(&self) -> ToolsmithResult<()> {
        let output = self.exec(&["version"]).await?;
        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(ToolsmithError::command_exec(
                format!("{} version", self.program()),
                stderr.trim(),
            ))
        }
    }

    async fn build_image_streaming(
        &self,
        request: &ImageBuildRequest,
        on_output: &(dyn for<'s> Fn(&'s str) + Send + Sync),
    ) -> ToolsmithResult<()> {
        let args = self.build_args(request);
        debug!("Building image: {} {:?}", self.program(), args);

        let mut child = Command::new(self.program())
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| self.spawn_error(&["build"], e))?;

        let end = stream_child_output(&mut child, on_output).await;

        let status = child
            .wait()
            .await
            .map_err(|e| ToolsmithError::command_failed(format!("{} build", self.program()), e))?;

        match end {
            StreamEnd::Aborted(line) => Err(ToolsmithError::ImageBuild {
                tag: request.tag.clone(),
                reason: line,
            }),
            StreamEnd::Drained(_) if status.success() => {
                info!("Image built: {}", request.tag);
                Ok(())
            }
            StreamEnd::Drained(tail) => Err(ToolsmithError::ImageBuild {
                tag: request.tag.clone(),
                reason: build_error_output(&tail.join("\n"), ""),
            }),
        }
    }

    async fn create(&self, image: &str, name: &str) -> ToolsmithResult<String> {
        // Never started; the command only keeps create from rejecting images without CMD
        let output = self
            .exec(&["create", "--name", name, image, "true"])
            .await?;

        if output.status.success() {
            let container_id = String::from_utf8_lossy(&output.stdout).trim().to_string();
            debug!(
                "Container created: {}",
                &container_id[..12.min(container_id.len())]
            );
            Ok(container_id)
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(ToolsmithError::ContainerCreate {
                image: image.to_string(),
                reason: stderr.trim().to_string(),
            })
        }
    }

    async fn copy_from(&self, container_id: &str, path: &str, dest: &Path) -> ToolsmithResult<()> {
        let source = format!("{}:{}", container_id, path);
        debug!("Copying {} to {}", source, dest.display());

        let file = std::fs::File::create(dest)
            .map_err(|e| ToolsmithError::io(format!("creating {}", dest.display()), e))?;

        let output = Command::new(self.program())
            .args(["cp", &source, "-"])
            .stdout(Stdio::from(file))
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| self.spawn_error(&["cp"], e))?;

        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(ToolsmithError::ContainerCopy {
                container: container_id.to_string(),
                reason: stderr.trim().to_string(),
            })
        }
    }

    async fn remove(&self, container_id: &str) -> ToolsmithResult<()> {
        debug!("Removing container: {}", container_id);

        let output = self.exec(&["rm", "-f", container_id]).await?;

        if output.status.success() {
            Ok(())
        } else {
            // Ignore error if container doesn't exist
            let stderr = String::from_utf8_lossy(&output.stderr);
            if stderr.to_ascii_lowercase().contains("no such container") {
                Ok(())
            } else {
                Err(ToolsmithError::ContainerCleanup {
                    container: container_id.to_string(),
                    reason: stderr.trim().to_string(),
                })
            }
        }
    }

    async fn image_exists(&self, image: &str) -> ToolsmithResult<bool> {
        let output = self.exec(&["image", "inspect", image]).await?;
        Ok(output.status.success())
    }

    async fn save_image(&self, image: &str, dest: &Path) -> ToolsmithResult<()> {
        let dest_str = dest.display().to_string();
        let output = self.exec(&["save", "-o", &dest_str, image]).await?;

        if output.status.success() {
            Ok(())
        } else {
            let stdout = String::from_utf8_lossy(&output.stdout);
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(ToolsmithError::command_exec(
                format!("{} save {}", self.program(), image),
                build_error_output(&stdout, &stderr),
            ))
        }
    }

    async fn load_image(&self, archive: &Path) -> ToolsmithResult<()> {
        let archive_str = archive.display().to_string();
        let output = self.exec(&["load", "-i", &archive_str]).await?;

        if output.status.success() {
            Ok(())
        } else {
            let stdout = String::from_utf8_lossy(&output.stdout);
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(ToolsmithError::command_exec(
                format!("{} load {}", self.program(), archive_str),
                build_error_output(&stdout, &stderr),
            ))
        }
    }

    fn runtime_name(&self) -> &'static str {
        self.engine.name()
    }
}
