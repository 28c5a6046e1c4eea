//! CLI argument definitions using clap derive

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// toolsmith - staged cross-compilation toolchain builder
///
/// Builds sysroot, gcc, clang, libclang and cmake inside container images
/// and publishes each as a .tar.xz release asset.
#[derive(Parser, Debug)]
#[command(name = "toolsmith")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "TOOLSMITH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log output format (overrides general.log_format)
    #[arg(long, global = true)]
    pub log_format: Option<LogFormat>,

    /// Directory holding the per-toolchain build contexts (overrides paths.build_root)
    #[arg(long, global = true)]
    pub build_root: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build and publish a sysroot (kernel headers + glibc)
    Sysroot(SysrootArgs),

    /// Build and publish a gcc cross compiler
    Gcc(GccArgs),

    /// Build and publish a clang+llvm cross compiler
    Clang(ClangArgs),

    /// Build and publish libclang
    Libclang(LibclangArgs),

    /// Build cmake into a local cache file
    Cmake(CmakeArgs),

    /// Load or store cached base images
    BaseImage(BaseImageArgs),

    /// Show configuration
    Config(ConfigArgs),
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

/// Explicit yes/no switch
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Toggle {
    Yes,
    No,
}

impl Toggle {
    pub fn enabled(self) -> bool {
        self == Toggle::Yes
    }
}

/// Release the artifact is published to
#[derive(Args, Debug)]
pub struct ReleaseArgs {
    /// GitHub repository (owner/name)
    #[arg(long, env = "GITHUB_REPOSITORY")]
    pub repository: String,

    /// Release ID or tag
    #[arg(long)]
    pub release_id: String,

    /// Rebuild even if the asset is already published
    #[arg(
        long,
        value_enum,
        num_args = 0..=1,
        default_value = "no",
        default_missing_value = "yes"
    )]
    pub force_rebuild: Toggle,
}

/// Arguments for the sysroot command
#[derive(Parser, Debug)]
pub struct SysrootArgs {
    #[command(flatten)]
    pub release: ReleaseArgs,

    /// Linux kernel version for the headers
    #[arg(long)]
    pub linux_kernel_version: String,

    /// glibc version
    #[arg(long)]
    pub glibc_version: String,
}

/// Arguments for the gcc command
#[derive(Parser, Debug)]
pub struct GccArgs {
    #[command(flatten)]
    pub release: ReleaseArgs,

    /// Sysroot archive to build against
    #[arg(long)]
    pub sysroot_path: PathBuf,

    /// gcc version
    #[arg(long)]
    pub gcc_version: String,

    /// binutils version
    #[arg(long)]
    pub binutils_version: String,

    /// Local host gcc archive
    #[arg(long)]
    pub host_gcc_path: Option<PathBuf>,

    /// Published host gcc version to fetch from the release
    #[arg(long)]
    pub host_gcc_version: Option<String>,

    /// Build a bootstrap gcc first and build with it
    #[arg(long)]
    pub two_stage: bool,
}

/// Arguments for the clang command
#[derive(Parser, Debug)]
pub struct ClangArgs {
    #[command(flatten)]
    pub release: ReleaseArgs,

    /// Sysroot archive to build against
    #[arg(long)]
    pub sysroot_path: PathBuf,

    /// cmake archive used for the build
    #[arg(long)]
    pub cmake_path: PathBuf,

    /// LLVM version
    #[arg(long)]
    pub llvm_version: String,

    /// Semicolon separated LLVM projects
    #[arg(long, default_value = "clang;lld")]
    pub llvm_enable_projects: String,

    /// Semicolon separated LLVM runtimes
    #[arg(long, default_value = "")]
    pub llvm_enable_runtimes: String,

    /// Local host gcc archive
    #[arg(long)]
    pub host_gcc_path: Option<PathBuf>,

    /// Published host clang version to fetch from the release
    #[arg(long)]
    pub host_clang_version: Option<String>,
}

/// Arguments for the libclang command
#[derive(Parser, Debug)]
pub struct LibclangArgs {
    #[command(flatten)]
    pub release: ReleaseArgs,

    /// LLVM version
    #[arg(long)]
    pub llvm_version: String,

    /// Host clang archive
    #[arg(long)]
    pub compiler: PathBuf,
}

/// Arguments for the cmake command
#[derive(Parser, Debug)]
pub struct CmakeArgs {
    /// Output archive; its file name fixes the install prefix
    #[arg(long)]
    pub cache_path: PathBuf,

    /// Host gcc archive
    #[arg(long)]
    pub host_gcc_path: PathBuf,

    /// Rebuild even if the cache file exists
    #[arg(
        long,
        value_enum,
        num_args = 0..=1,
        default_value = "no",
        default_missing_value = "yes"
    )]
    pub force_rebuild: Toggle,
}

/// Toolchains with cacheable base images
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BaseImageToolchain {
    Sysroot,
    Gcc,
    Clang,
}

/// Base image cache direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BaseImageOp {
    /// Load images from the cache directory
    Load,
    /// Build images and save them to the cache directory
    Store,
}

/// Arguments for the base-image command
#[derive(Parser, Debug)]
pub struct BaseImageArgs {
    /// Toolchain whose base images are cached
    #[arg(long, value_enum)]
    pub toolchain: BaseImageToolchain,

    /// Cache directory
    #[arg(long)]
    pub cache_path: PathBuf,

    /// Operation
    #[arg(long, value_enum)]
    pub op: BaseImageOp,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show effective configuration
    Show,

    /// Show configuration file path
    Path,
}
