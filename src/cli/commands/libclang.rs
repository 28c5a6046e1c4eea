//! Libclang command

use super::run_release_pipeline;
use crate::cli::args::LibclangArgs;
use crate::config::Config;
use crate::error::ToolsmithResult;
use crate::toolchain::{plan, LibclangOptions, Toolchain};

/// Execute the libclang command
pub async fn execute(args: LibclangArgs, config: &Config) -> ToolsmithResult<()> {
    let triple = &config.archive.target_triple;
    let toolchain = Toolchain::libclang(
        LibclangOptions {
            llvm_version: args.llvm_version,
            compiler: args.compiler,
        },
        triple,
    );
    let plan = plan(toolchain, triple)?;

    run_release_pipeline(plan, &args.release, config).await
}
