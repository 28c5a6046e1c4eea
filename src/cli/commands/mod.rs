//! CLI command implementations

pub mod base_image;
pub mod clang;
pub mod cmake;
pub mod config;
pub mod gcc;
pub mod libclang;
pub mod sysroot;

pub use base_image::execute as base_image;
pub use clang::execute as clang;
pub use cmake::execute as cmake;
pub use config::execute as config;
pub use gcc::execute as gcc;
pub use libclang::execute as libclang;
pub use sysroot::execute as sysroot;

use crate::cli::args::ReleaseArgs;
use crate::config::Config;
use crate::error::ToolsmithResult;
use crate::orchestration::create_runtime;
use crate::repository::{ArtifactRepository, GithubReleaseStore, GithubToken};
use crate::toolchain::{
    execute as execute_pipeline, BuildPlan, PipelineOutcome, PipelineSettings, Published,
    RunContext,
};
use crate::ui::{self, UiContext};
use std::sync::Arc;
use tracing::debug;

fn pipeline_settings(config: &Config) -> PipelineSettings {
    PipelineSettings {
        build_root: config.paths.build_root.clone(),
        scratch_dir: config.paths.scratch_dir.clone(),
        compression_level: config.archive.compression_level,
        link_job_memory_gib: config.engine.link_job_memory_gib,
    }
}

/// Run a planned build that publishes to a GitHub release
async fn run_release_pipeline(
    plan: BuildPlan,
    release: &ReleaseArgs,
    config: &Config,
) -> ToolsmithResult<()> {
    let ui = UiContext::detect();
    let runtime = create_runtime(&config.engine).await?;
    debug!("Using runtime: {}", runtime.runtime_name());

    let token = GithubToken::resolve(&config.github).await?;
    let store = GithubReleaseStore::connect(
        &config.github,
        &release.repository,
        &release.release_id,
        token,
        ui.clone(),
    )
    .await?;
    let repository = ArtifactRepository::open(Arc::new(store)).await?;

    let settings = pipeline_settings(config);
    let outcome = execute_pipeline(
        &plan,
        &RunContext {
            runtime: runtime.as_ref(),
            repository: Some(&repository),
            settings: &settings,
            ui: &ui,
            force_rebuild: release.force_rebuild.enabled(),
        },
    )
    .await?;

    report(&ui, &outcome);
    Ok(())
}

/// Run a planned build whose archive stays on the local filesystem
async fn run_local_pipeline(
    plan: BuildPlan,
    force_rebuild: bool,
    config: &Config,
) -> ToolsmithResult<()> {
    let ui = UiContext::detect();
    let runtime = create_runtime(&config.engine).await?;
    debug!("Using runtime: {}", runtime.runtime_name());

    let settings = pipeline_settings(config);
    let outcome = execute_pipeline(
        &plan,
        &RunContext {
            runtime: runtime.as_ref(),
            repository: None,
            settings: &settings,
            ui: &ui,
            force_rebuild,
        },
    )
    .await?;

    report(&ui, &outcome);
    Ok(())
}

fn report(ctx: &UiContext, outcome: &PipelineOutcome) {
    match outcome {
        PipelineOutcome::Skipped { name } => {
            ui::step_info(ctx, &format!("{} already built, skipped", name));
        }
        PipelineOutcome::Built(Published::Asset { name, id }) => {
            ui::step_ok_detail(ctx, &format!("Published {}", name), &format!("asset id {}", id));
            ui::outro_success(ctx, "Done");
        }
        PipelineOutcome::Built(Published::File(path)) => {
            ui::step_ok_detail(ctx, "Stored", &path.display().to_string());
            ui::outro_success(ctx, "Done");
        }
    }
}
