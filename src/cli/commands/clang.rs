//! Clang command - clang+llvm cross compiler

use super::run_release_pipeline;
use crate::cli::args::ClangArgs;
use crate::config::Config;
use crate::error::ToolsmithResult;
use crate::toolchain::{plan, ClangOptions, HostSelection, Toolchain};

/// Execute the clang command
pub async fn execute(args: ClangArgs, config: &Config) -> ToolsmithResult<()> {
    let triple = &config.archive.target_triple;
    let toolchain = Toolchain::clang(
        ClangOptions {
            llvm_version: args.llvm_version,
            enable_projects: args.llvm_enable_projects,
            enable_runtimes: args.llvm_enable_runtimes,
            sysroot: args.sysroot_path,
            cmake: args.cmake_path,
            host: HostSelection {
                local_archive: args.host_gcc_path,
                remote_version: args.host_clang_version,
                two_stage: false,
            },
        },
        triple,
    );
    let plan = plan(toolchain, triple)?;

    run_release_pipeline(plan, &args.release, config).await
}
