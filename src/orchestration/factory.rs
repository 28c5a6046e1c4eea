//! Runtime factory: pick the container engine binary
//!
//! `auto` prefers podman and falls back to docker.

use crate::config::schema::EngineConfig;
use crate::error::{ToolsmithError, ToolsmithResult};
use crate::orchestration::cli_runtime::CliRuntime;
use crate::orchestration::runtime::ContainerRuntime;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Supported container engines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Engine {
    Docker,
    Podman,
}

impl Engine {
    /// Parse the configured engine; `None` means auto-detect
    pub fn from_config(program: &str) -> ToolsmithResult<Option<Self>> {
        match program.trim().to_ascii_lowercase().as_str() {
            "auto" | "" => Ok(None),
            "docker" => Ok(Some(Engine::Docker)),
            "podman" => Ok(Some(Engine::Podman)),
            other => Err(ToolsmithError::config(format!(
                "unknown container engine '{}' (expected auto, docker or podman)",
                other
            ))),
        }
    }

    pub fn program(&self) -> &'static str {
        match self {
            Engine::Docker => "docker",
            Engine::Podman => "podman",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Engine::Docker => "Docker",
            Engine::Podman => "Podman",
        }
    }

    async fn installed(&self) -> bool {
        Command::new(self.program())
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|s| s.success())
            .unwrap_or(false)
    }
}

/// Create the configured container runtime
pub async fn create_runtime(config: &EngineConfig) -> ToolsmithResult<Box<dyn ContainerRuntime>> {
    let engine = match Engine::from_config(&config.program)? {
        Some(engine) => engine,
        None => detect().await?,
    };
    debug!("Using container engine: {}", engine.program());
    Ok(Box::new(CliRuntime::new(engine)))
}

async fn detect() -> ToolsmithResult<Engine> {
    for engine in [Engine::Podman, Engine::Docker] {
        if engine.installed().await {
            return Ok(engine);
        }
    }
    Err(ToolsmithError::EngineNotFound("podman, docker".to_string()))
}
