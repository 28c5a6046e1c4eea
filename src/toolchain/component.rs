//! Toolchain components as configured for one invocation

use super::registry::{ComponentKind, DependencyKind};
use crate::error::{ToolsmithError, ToolsmithResult};
use std::path::PathBuf;

/// Host compiler references given on the command line.
///
/// At most one may be set; which one decides the host strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostSelection {
    /// Local host compiler archive
    pub local_archive: Option<PathBuf>,
    /// Version of a published host compiler to fetch from the release
    pub remote_version: Option<String>,
    /// Build a bootstrap compiler first and chain into it
    pub two_stage: bool,
}

impl HostSelection {
    pub fn local(path: impl Into<PathBuf>) -> Self {
        Self {
            local_archive: Some(path.into()),
            ..Default::default()
        }
    }

    pub fn remote(version: impl Into<String>) -> Self {
        Self {
            remote_version: Some(version.into()),
            ..Default::default()
        }
    }

    pub fn two_stage() -> Self {
        Self {
            two_stage: true,
            ..Default::default()
        }
    }
}

/// Where the finished archive goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sink {
    /// Uploaded as a release asset
    Release,
    /// Written to a local path
    LocalFile(PathBuf),
}

#[derive(Debug, Clone)]
pub struct SysrootOptions {
    pub linux_kernel_version: String,
    pub glibc_version: String,
}

#[derive(Debug, Clone)]
pub struct GccOptions {
    pub gcc_version: String,
    pub binutils_version: String,
    pub sysroot: PathBuf,
    pub host: HostSelection,
}

#[derive(Debug, Clone)]
pub struct ClangOptions {
    pub llvm_version: String,
    /// Semicolon separated `LLVM_ENABLE_PROJECTS`
    pub enable_projects: String,
    /// Semicolon separated `LLVM_ENABLE_RUNTIMES`
    pub enable_runtimes: String,
    pub sysroot: PathBuf,
    pub cmake: PathBuf,
    pub host: HostSelection,
}

#[derive(Debug, Clone)]
pub struct LibclangOptions {
    pub llvm_version: String,
    /// Host clang archive
    pub compiler: PathBuf,
}

#[derive(Debug, Clone)]
pub struct CmakeOptions {
    /// Output archive path; its file name fixes the install prefix
    pub cache_path: PathBuf,
    pub host_gcc: PathBuf,
}

/// One component build request
#[derive(Debug, Clone)]
pub struct Toolchain {
    pub kind: ComponentKind,
    /// Version build arguments, e.g. `GCC_VERSION`
    pub versions: Vec<(&'static str, String)>,
    /// Version used in image tags
    pub image_version: String,
    /// Asset or file name of the produced archive
    pub output_name: String,
    /// Archives unpacked into fixed dependency directories
    pub fixed: Vec<(DependencyKind, PathBuf)>,
    pub host: HostSelection,
    pub sink: Sink,
}

impl Toolchain {
    pub fn sysroot(options: SysrootOptions, triple: &str) -> Self {
        let output_name = format!(
            "sysroot-linux-kernel-{}+glibc-{}-{}.tar.xz",
            options.linux_kernel_version, options.glibc_version, triple
        );
        Self {
            kind: ComponentKind::Sysroot,
            image_version: format!(
                "{}-glibc-{}",
                options.linux_kernel_version, options.glibc_version
            ),
            versions: vec![
                ("LINUX_KERNEL_VERSION", options.linux_kernel_version),
                ("GLIBC_VERSION", options.glibc_version),
            ],
            output_name,
            fixed: Vec::new(),
            host: HostSelection::default(),
            sink: Sink::Release,
        }
    }

    pub fn gcc(options: GccOptions, triple: &str) -> Self {
        Self {
            kind: ComponentKind::Gcc,
            output_name: ComponentKind::Gcc.asset_name(&options.gcc_version, triple),
            image_version: options.gcc_version.clone(),
            versions: vec![
                ("GCC_VERSION", options.gcc_version),
                ("BINUTILS_VERSION", options.binutils_version),
            ],
            fixed: vec![(DependencyKind::Sysroot, options.sysroot)],
            host: options.host,
            sink: Sink::Release,
        }
    }

    pub fn clang(options: ClangOptions, triple: &str) -> Self {
        Self {
            kind: ComponentKind::Clang,
            output_name: ComponentKind::Clang.asset_name(&options.llvm_version, triple),
            image_version: options.llvm_version.clone(),
            versions: vec![
                ("LLVM_VERSION", options.llvm_version),
                ("ENABLE_PROJECTS", options.enable_projects),
                ("ENABLE_RUNTIMES", options.enable_runtimes),
            ],
            fixed: vec![
                (DependencyKind::Sysroot, options.sysroot),
                (DependencyKind::Cmake, options.cmake),
            ],
            host: options.host,
            sink: Sink::Release,
        }
    }

    pub fn libclang(options: LibclangOptions, triple: &str) -> Self {
        Self {
            kind: ComponentKind::Libclang,
            output_name: ComponentKind::Libclang.asset_name(&options.llvm_version, triple),
            image_version: options.llvm_version.clone(),
            versions: vec![("LLVM_VERSION", options.llvm_version)],
            fixed: Vec::new(),
            host: HostSelection::local(options.compiler),
            sink: Sink::Release,
        }
    }

    pub fn cmake(options: CmakeOptions) -> ToolsmithResult<Self> {
        let output_name = options
            .cache_path
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .ok_or_else(|| ToolsmithError::ArchiveName {
                name: options.cache_path.display().to_string(),
                reason: "cache path has no UTF-8 file name".to_string(),
            })?;
        Ok(Self {
            kind: ComponentKind::Cmake,
            image_version: output_name
                .split(".tar.")
                .next()
                .unwrap_or(&output_name)
                .to_string(),
            output_name,
            versions: Vec::new(),
            fixed: Vec::new(),
            host: HostSelection::local(options.host_gcc),
            sink: Sink::LocalFile(options.cache_path),
        })
    }
}
