//! Pipeline driver
//!
//! `CheckCache → {Skip | Unpack → Build → Extract & Publish}`. Strictly
//! sequential, no retries; the first failure aborts the run.

use super::build::{build_parameters, run_stages, stage_requests, HostResources};
use super::component::Sink;
use super::publish::{extract_and_publish, ArtifactSink, PublishRequest, Published};
use super::registry::DependencyKind;
use super::resolve::{context_relative, BuildPlan, HostStrategy};
use crate::archive::{install_dir, unpack_archive};
use crate::error::{ToolsmithError, ToolsmithResult};
use crate::orchestration::ContainerRuntime;
use crate::repository::ArtifactRepository;
use crate::ui::UiContext;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Directory inside a build context that receives unpacked dependencies
const DEPENDENCY_DIR: &str = "ci";

/// Filesystem and sizing settings for one run
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Holds one build context per toolchain
    pub build_root: PathBuf,
    pub scratch_dir: PathBuf,
    pub compression_level: u32,
    pub link_job_memory_gib: u64,
}

/// Everything a run needs besides the plan
pub struct RunContext<'a> {
    pub runtime: &'a dyn ContainerRuntime,
    /// `None` for components that never touch a release
    pub repository: Option<&'a ArtifactRepository>,
    pub settings: &'a PipelineSettings,
    pub ui: &'a UiContext,
    pub force_rebuild: bool,
}

/// How a run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    /// The artifact already existed and no rebuild was forced
    Skipped { name: String },
    Built(Published),
}

impl<'a> RunContext<'a> {
    fn require_repository(&self, purpose: &str) -> ToolsmithResult<&'a ArtifactRepository> {
        self.repository.ok_or_else(|| {
            ToolsmithError::config(format!("{} requires a release repository", purpose))
        })
    }

    fn sink(&self, plan: &BuildPlan) -> ToolsmithResult<ArtifactSink<'a>> {
        match plan.toolchain.sink {
            Sink::Release => Ok(ArtifactSink::Release(
                self.require_repository(&format!("publishing {}", plan.toolchain.kind))?,
            )),
            Sink::LocalFile(ref path) => Ok(ArtifactSink::LocalFile(path.clone())),
        }
    }
}

fn already_built(sink: &ArtifactSink<'_>, name: &str) -> bool {
    match sink {
        ArtifactSink::Release(repository) => repository.exists(name),
        ArtifactSink::LocalFile(path) => path.exists(),
    }
}

/// Drive one component from cache check to published archive
pub async fn execute(plan: &BuildPlan, ctx: &RunContext<'_>) -> ToolsmithResult<PipelineOutcome> {
    let toolchain = &plan.toolchain;
    let sink = ctx.sink(plan)?;

    if already_built(&sink, &toolchain.output_name) {
        if !ctx.force_rebuild {
            info!(
                "{} was already built, nothing to do (use --force-rebuild to build it again)",
                toolchain.output_name
            );
            return Ok(PipelineOutcome::Skipped {
                name: toolchain.output_name.clone(),
            });
        }
        warn!(
            "Forcing rebuild, discarding any already built {}",
            toolchain.output_name
        );
    }

    // A missing remote host must fail before anything is unpacked or built
    if let HostStrategy::RemoteArchive { ref asset_name } = plan.strategy {
        let repository = ctx.require_repository("a remote host compiler")?;
        if !repository.exists(asset_name) {
            return Err(ToolsmithError::AssetNotFound(asset_name.clone()));
        }
    }

    let context_dir = ctx.settings.build_root.join(toolchain.kind.context_dir());
    if !context_dir.is_dir() {
        return Err(ToolsmithError::config(format!(
            "build context {} does not exist",
            context_dir.display()
        )));
    }

    info!(
        "Building {} with {}",
        toolchain.output_name,
        plan.strategy.kind()
    );
    ctx.runtime.ensure_ready().await?;

    let unpacked = unpack_dependencies(plan, ctx, &context_dir).await?;

    let install = install_dir(&toolchain.output_name)?;
    let resources = HostResources::detect(ctx.settings.link_job_memory_gib);
    debug!(
        "Using {} compile jobs and {} link jobs",
        resources.compile_jobs, resources.link_jobs
    );
    let params = build_parameters(plan, &unpacked, &install, resources);
    let requests = stage_requests(plan, &context_dir, &params);
    let image = run_stages(ctx.runtime, &requests, ctx.ui).await?;

    let published = extract_and_publish(
        ctx.runtime,
        &PublishRequest {
            image: &image,
            output_name: &toolchain.output_name,
            prefix: &plan.output_prefix,
            scratch_dir: &ctx.settings.scratch_dir,
            compression_level: ctx.settings.compression_level,
        },
        &sink,
    )
    .await?;

    Ok(PipelineOutcome::Built(published))
}

/// Unpack fixed dependencies and the host compiler into the build context.
///
/// Returns each unpacked directory relative to the context root.
async fn unpack_dependencies(
    plan: &BuildPlan,
    ctx: &RunContext<'_>,
    context_dir: &Path,
) -> ToolsmithResult<Vec<(DependencyKind, String)>> {
    let mut unpacked = Vec::new();

    for (kind, archive) in &plan.toolchain.fixed {
        let path = unpack_into(context_dir, *kind, archive).await?;
        unpacked.push((*kind, path));
    }

    match plan.strategy {
        HostStrategy::LocalArchive(ref archive) => {
            let path = unpack_into(context_dir, DependencyKind::HostCompiler, archive).await?;
            unpacked.push((DependencyKind::HostCompiler, path));
        }
        HostStrategy::RemoteArchive { ref asset_name } => {
            let repository = ctx.require_repository("a remote host compiler")?;
            let downloaded = repository
                .fetch(asset_name, &ctx.settings.scratch_dir)
                .await?;
            let result =
                unpack_into(context_dir, DependencyKind::HostCompiler, downloaded.path()).await;
            drop(downloaded);
            unpacked.push((DependencyKind::HostCompiler, result?));
        }
        HostStrategy::Ambient | HostStrategy::TwoStage => {}
    }

    Ok(unpacked)
}

async fn unpack_into(
    context_dir: &Path,
    kind: DependencyKind,
    archive: &Path,
) -> ToolsmithResult<String> {
    let destination = context_dir.join(DEPENDENCY_DIR).join(kind.dir_name());
    let root = unpack_archive(archive, &destination).await?;
    context_relative(context_dir, &root)
}
