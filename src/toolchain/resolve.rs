//! Bootstrap resolution
//!
//! Decides which host strategy applies to a component and validates the
//! request. Everything here is pure so a bad request fails before any
//! container or network side effect.

use super::component::{HostSelection, Toolchain};
use super::registry::{ComponentKind, HostStrategyKind, Stage};
use crate::archive::{canonical_prefix, Compression};
use crate::error::{ToolsmithError, ToolsmithResult};
use std::path::{Component, Path, PathBuf};

/// Resolved host compiler strategy
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostStrategy {
    Ambient,
    LocalArchive(PathBuf),
    RemoteArchive { asset_name: String },
    TwoStage,
}

impl HostStrategy {
    pub fn kind(&self) -> HostStrategyKind {
        match self {
            HostStrategy::Ambient => HostStrategyKind::Ambient,
            HostStrategy::LocalArchive(_) => HostStrategyKind::LocalArchive,
            HostStrategy::RemoteArchive { .. } => HostStrategyKind::RemoteArchive,
            HostStrategy::TwoStage => HostStrategyKind::TwoStage,
        }
    }
}

/// Everything decided before the pipeline touches the outside world
#[derive(Debug, Clone)]
pub struct BuildPlan {
    pub toolchain: Toolchain,
    pub strategy: HostStrategy,
    pub stages: &'static [Stage],
    /// Top-level directory of the produced archive
    pub output_prefix: String,
}

/// Pick the host strategy from the supplied references
pub fn resolve_strategy(
    kind: ComponentKind,
    host: &HostSelection,
    triple: &str,
) -> ToolsmithResult<HostStrategy> {
    let supplied = [
        host.local_archive.is_some(),
        host.remote_version.is_some(),
        host.two_stage,
    ]
    .iter()
    .filter(|s| **s)
    .count();
    if supplied > 1 {
        return Err(ToolsmithError::config(format!(
            "{}: a local host archive, a remote host version and a two-stage build are mutually exclusive",
            kind
        )));
    }

    let strategy = if let Some(ref path) = host.local_archive {
        HostStrategy::LocalArchive(path.clone())
    } else if let Some(ref version) = host.remote_version {
        let host_kind = kind.remote_host().ok_or_else(|| {
            ToolsmithError::config(format!("{} cannot fetch a remote host compiler", kind))
        })?;
        if version.trim().is_empty() {
            return Err(ToolsmithError::config("host compiler version is empty"));
        }
        HostStrategy::RemoteArchive {
            asset_name: host_kind.asset_name(version, triple),
        }
    } else if host.two_stage {
        HostStrategy::TwoStage
    } else {
        HostStrategy::Ambient
    };

    if !kind.supports(strategy.kind()) {
        let supported: Vec<String> = kind
            .supported_strategies()
            .iter()
            .map(|s| s.to_string())
            .collect();
        return Err(ToolsmithError::config(format!(
            "{} does not support a {} (supported: {})",
            kind,
            strategy.kind(),
            supported.join(", ")
        )));
    }

    Ok(strategy)
}

/// Validate a toolchain request and fix its strategy and build stages
pub fn plan(toolchain: Toolchain, triple: &str) -> ToolsmithResult<BuildPlan> {
    for (name, value) in &toolchain.versions {
        // Runtimes may legitimately be empty
        if value.trim().is_empty() && *name != "ENABLE_RUNTIMES" {
            return Err(ToolsmithError::config(format!("{} must not be empty", name)));
        }
    }

    let strategy = resolve_strategy(toolchain.kind, &toolchain.host, triple)?;

    // Archive names determine unpacked paths, so malformed ones are rejected up front
    for (_, archive) in &toolchain.fixed {
        check_archive_name(archive)?;
    }
    match strategy {
        HostStrategy::LocalArchive(ref path) => check_archive_name(path)?,
        HostStrategy::RemoteArchive { ref asset_name } => {
            canonical_prefix(asset_name)?;
        }
        HostStrategy::Ambient | HostStrategy::TwoStage => {}
    }
    // The output is compressed after the build, so its format is checked first
    check_archive_name(Path::new(&toolchain.output_name))?;
    let output_prefix = canonical_prefix(&toolchain.output_name)?;

    Ok(BuildPlan {
        stages: toolchain.kind.stages(strategy.kind()),
        strategy,
        output_prefix,
        toolchain,
    })
}

fn check_archive_name(path: &Path) -> ToolsmithResult<()> {
    canonical_prefix(path)?;
    Compression::from_archive_path(path)?;
    Ok(())
}

/// Path of `path` relative to `context`, with `/` separators.
///
/// `path` must lie strictly inside `context`.
pub fn context_relative(context: &Path, path: &Path) -> ToolsmithResult<String> {
    let outside = || {
        ToolsmithError::config(format!(
            "{} is not inside build context {}",
            path.display(),
            context.display()
        ))
    };

    let relative = path.strip_prefix(context).map_err(|_| outside())?;
    let mut parts = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
            Component::CurDir => {}
            _ => return Err(outside()),
        }
    }
    if parts.is_empty() {
        return Err(outside());
    }
    Ok(parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::toolchain::component::{ClangOptions, CmakeOptions, GccOptions};

    const TRIPLE: &str = "x86_64-linux-gnu";

    fn gcc(host: HostSelection) -> Toolchain {
        Toolchain::gcc(
            GccOptions {
                gcc_version: "13.2.0".to_string(),
                binutils_version: "2.41".to_string(),
                sysroot: PathBuf::from("sysroot-linux-kernel-6.1+glibc-2.38-x86_64-linux-gnu.tar.xz"),
                host,
            },
            TRIPLE,
        )
    }

    #[test]
    fn no_host_reference_is_ambient() {
        let strategy =
            resolve_strategy(ComponentKind::Gcc, &HostSelection::default(), TRIPLE).unwrap();
        assert_eq!(strategy, HostStrategy::Ambient);
    }

    #[test]
    fn remote_version_names_host_asset() {
        let strategy =
            resolve_strategy(ComponentKind::Clang, &HostSelection::remote("16.0.6"), TRIPLE)
                .unwrap();
        assert_eq!(
            strategy,
            HostStrategy::RemoteArchive {
                asset_name: "clang+llvm-16.0.6-x86_64-linux-gnu.tar.xz".to_string()
            }
        );
    }

    #[test]
    fn local_and_remote_are_mutually_exclusive() {
        let host = HostSelection {
            local_archive: Some(PathBuf::from("gcc-12-x.tar.xz")),
            remote_version: Some("12".to_string()),
            two_stage: false,
        };
        let err = resolve_strategy(ComponentKind::Gcc, &host, TRIPLE).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn clang_requires_a_host() {
        let err =
            resolve_strategy(ComponentKind::Clang, &HostSelection::default(), TRIPLE).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(err.to_string().contains("system compiler"));
    }

    #[test]
    fn two_stage_only_for_gcc() {
        assert_eq!(
            resolve_strategy(ComponentKind::Gcc, &HostSelection::two_stage(), TRIPLE).unwrap(),
            HostStrategy::TwoStage
        );
        assert!(
            resolve_strategy(ComponentKind::Clang, &HostSelection::two_stage(), TRIPLE).is_err()
        );
    }

    #[test]
    fn plan_picks_stages_for_strategy() {
        let plan = plan(gcc(HostSelection::two_stage()), TRIPLE).unwrap();
        assert_eq!(plan.stages.len(), 2);
        assert_eq!(plan.output_prefix, "gcc-13.2.0-x86_64-linux-gnu");
    }

    #[test]
    fn plan_rejects_malformed_dependency_names() {
        let mut toolchain = gcc(HostSelection::default());
        toolchain.fixed[0].1 = PathBuf::from("/cache/sysroot.zip");
        assert_eq!(plan(toolchain, TRIPLE).unwrap_err().kind(), ErrorKind::Configuration);
    }

    #[test]
    fn plan_rejects_unsupported_host_compression() {
        let toolchain = gcc(HostSelection::local("/cache/gcc-12.3.0-x86_64-linux-gnu.tar.gz"));
        assert_eq!(plan(toolchain, TRIPLE).unwrap_err().kind(), ErrorKind::Configuration);
    }

    #[test]
    fn plan_rejects_unsupported_output_compression() {
        let toolchain = Toolchain::cmake(CmakeOptions {
            cache_path: PathBuf::from("/cache/cmake-3.28.1.tar.gz"),
            host_gcc: PathBuf::from("gcc-13.2.0-x86_64-linux-gnu.tar.xz"),
        })
        .unwrap();
        let err = plan(toolchain, TRIPLE).unwrap_err();
        assert!(matches!(err, ToolsmithError::UnsupportedCompression(_)));
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn plan_rejects_empty_versions_but_not_runtimes() {
        let clang = |projects: &str, runtimes: &str| {
            Toolchain::clang(
                ClangOptions {
                    llvm_version: "17.0.6".to_string(),
                    enable_projects: projects.to_string(),
                    enable_runtimes: runtimes.to_string(),
                    sysroot: PathBuf::from("sysroot-x.tar.xz"),
                    cmake: PathBuf::from("cmake-3.28.1.tar.xz"),
                    host: HostSelection::local("gcc-13.2.0-x86_64-linux-gnu.tar.xz"),
                },
                TRIPLE,
            )
        };
        assert!(plan(clang("clang;lld", ""), TRIPLE).is_ok());
        assert!(plan(clang("", ""), TRIPLE).is_err());
    }

    #[test]
    fn context_relative_paths() {
        let ctx = Path::new("/work/clang");
        assert_eq!(
            context_relative(ctx, Path::new("/work/clang/ci/sysroot/sysroot-x")).unwrap(),
            "ci/sysroot/sysroot-x"
        );
        assert!(context_relative(ctx, Path::new("/work/gcc/ci")).is_err());
        assert!(context_relative(ctx, Path::new("/work/clang")).is_err());
        assert!(context_relative(ctx, Path::new("/work/clang/../gcc")).is_err());
    }
}
