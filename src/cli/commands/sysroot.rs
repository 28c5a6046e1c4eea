//! Sysroot command - kernel headers and glibc

use super::run_release_pipeline;
use crate::cli::args::SysrootArgs;
use crate::config::Config;
use crate::error::ToolsmithResult;
use crate::toolchain::{plan, SysrootOptions, Toolchain};

/// Execute the sysroot command
pub async fn execute(args: SysrootArgs, config: &Config) -> ToolsmithResult<()> {
    let triple = &config.archive.target_triple;
    let toolchain = Toolchain::sysroot(
        SysrootOptions {
            linux_kernel_version: args.linux_kernel_version,
            glibc_version: args.glibc_version,
        },
        triple,
    );
    let plan = plan(toolchain, triple)?;

    run_release_pipeline(plan, &args.release, config).await
}
