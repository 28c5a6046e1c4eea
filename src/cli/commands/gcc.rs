//! Gcc command - bootstrap or hosted gcc cross compiler

use super::run_release_pipeline;
use crate::cli::args::GccArgs;
use crate::config::Config;
use crate::error::ToolsmithResult;
use crate::toolchain::{plan, GccOptions, HostSelection, Toolchain};

/// Execute the gcc command
pub async fn execute(args: GccArgs, config: &Config) -> ToolsmithResult<()> {
    let triple = &config.archive.target_triple;
    let toolchain = Toolchain::gcc(
        GccOptions {
            gcc_version: args.gcc_version,
            binutils_version: args.binutils_version,
            sysroot: args.sysroot_path,
            host: HostSelection {
                local_archive: args.host_gcc_path,
                remote_version: args.host_gcc_version,
                two_stage: args.two_stage,
            },
        },
        triple,
    );
    // Validated before anything touches the engine or the network
    let plan = plan(toolchain, triple)?;

    run_release_pipeline(plan, &args.release, config).await
}
