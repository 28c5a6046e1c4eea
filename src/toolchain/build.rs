//! Container build invocation
//!
//! Turns a build plan plus the unpacked dependency paths into one image
//! build request per stage and runs them in order.

use super::registry::{ComponentKind, DependencyKind};
use super::resolve::BuildPlan;
use crate::error::ToolsmithResult;
use crate::orchestration::{ContainerRuntime, ImageBuildRequest};
use crate::ui::{BuildProgress, UiContext};
use std::path::Path;
use tracing::{debug, info};

const GIB: u64 = 1024 * 1024 * 1024;

/// Host resources that size parallel compile and link jobs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostResources {
    pub compile_jobs: usize,
    pub link_jobs: u64,
}

impl HostResources {
    /// Probe CPU count and physical memory
    pub fn detect(link_job_memory_gib: u64) -> Self {
        let compile_jobs = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        Self::from_totals(compile_jobs, total_memory_bytes(), link_job_memory_gib)
    }

    fn from_totals(compile_jobs: usize, memory: Option<u64>, link_job_memory_gib: u64) -> Self {
        let per_job = link_job_memory_gib.max(1).saturating_mul(GIB);
        let link_jobs = memory.map(|m| m / per_job).unwrap_or(1).max(1);
        Self {
            compile_jobs: compile_jobs.max(1),
            link_jobs,
        }
    }
}

fn total_memory_bytes() -> Option<u64> {
    #[cfg(target_os = "linux")]
    {
        let meminfo = std::fs::read_to_string("/proc/meminfo").ok()?;
        for line in meminfo.lines() {
            if let Some(rest) = line.trim_start().strip_prefix("MemTotal:") {
                let kb = rest.split_whitespace().next()?.parse::<u64>().ok()?;
                return Some(kb.saturating_mul(1024));
            }
        }
        None
    }

    #[cfg(not(target_os = "linux"))]
    {
        None
    }
}

/// Build arguments shared by every stage of a plan.
///
/// `unpacked` holds the context-relative directory of each unpacked dependency.
pub fn build_parameters(
    plan: &BuildPlan,
    unpacked: &[(DependencyKind, String)],
    install_dir: &str,
    resources: HostResources,
) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = unpacked
        .iter()
        .map(|(kind, path)| (kind.build_arg().to_string(), path.clone()))
        .collect();

    params.push(("INSTALL_DIR".to_string(), install_dir.to_string()));
    params.extend(
        plan.toolchain
            .versions
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone())),
    );

    if plan.toolchain.kind == ComponentKind::Clang {
        params.push((
            "ENABLE_LIBCXX".to_string(),
            ComponentKind::libcxx_for_host(plan.strategy.kind()).to_string(),
        ));
        params.push((
            "PARALLEL_COMPILE_JOBS".to_string(),
            resources.compile_jobs.to_string(),
        ));
        params.push(("PARALLEL_LINK_JOBS".to_string(), resources.link_jobs.to_string()));
    }

    params
}

/// Docker tag component: `[A-Za-z0-9_.-]`, not starting with `.` or `-`, at most 128 chars
pub fn sanitize_tag(version: &str) -> String {
    let mut tag: String = version
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-') {
                c
            } else {
                '_'
            }
        })
        .take(128)
        .collect();
    if tag.starts_with(&['.', '-'][..]) {
        tag.replace_range(..1, "_");
    }
    if tag.is_empty() {
        tag.push_str("latest");
    }
    tag
}

/// One request per stage; later stages receive `PREVIOUS_STAGE_IMAGE`
pub fn stage_requests(
    plan: &BuildPlan,
    context_dir: &Path,
    params: &[(String, String)],
) -> Vec<ImageBuildRequest> {
    let version = sanitize_tag(&plan.toolchain.image_version);
    let mut requests: Vec<ImageBuildRequest> = Vec::with_capacity(plan.stages.len());

    for stage in plan.stages {
        let tag = format!("{}:{}", stage.image, version);
        let mut request = ImageBuildRequest::new(context_dir, stage.dockerfile, &tag);
        for (key, value) in params {
            request = request.arg(key, value.clone());
        }
        if let Some(previous) = requests.last() {
            request = request.arg("PREVIOUS_STAGE_IMAGE", previous.tag.clone());
        }
        requests.push(request);
    }

    requests
}

/// Run each stage in order; returns the final image tag
pub async fn run_stages(
    runtime: &dyn ContainerRuntime,
    requests: &[ImageBuildRequest],
    ui: &UiContext,
) -> ToolsmithResult<String> {
    let mut last_tag = String::new();
    for request in requests {
        debug!(
            "Build {} from {} with {} args",
            request.tag,
            request.dockerfile,
            request.build_args.len()
        );
        let progress = BuildProgress::new(ui, &request.tag);
        let on_output = |line: &str| progress.on_line(line);
        let result = runtime.build_image_streaming(request, &on_output).await;
        progress.finish();
        result?;

        info!("{} was successfully built!", request.tag);
        last_tag = request.tag.clone();
    }
    Ok(last_tag)
}
