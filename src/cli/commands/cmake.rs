//! Cmake command - build cmake into a local cache file

use super::run_local_pipeline;
use crate::cli::args::CmakeArgs;
use crate::config::Config;
use crate::error::ToolsmithResult;
use crate::toolchain::{plan, CmakeOptions, Toolchain};

/// Execute the cmake command
pub async fn execute(args: CmakeArgs, config: &Config) -> ToolsmithResult<()> {
    let toolchain = Toolchain::cmake(CmakeOptions {
        cache_path: args.cache_path,
        host_gcc: args.host_gcc_path,
    })?;
    let plan = plan(toolchain, &config.archive.target_triple)?;

    run_local_pipeline(plan, args.force_rebuild.enabled(), config).await
}
