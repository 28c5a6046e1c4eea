//! Static registry of toolchain components
//!
//! Every per-component constant (build context, build files, image names,
//! supported host strategies, fixed dependencies) is answered by a `match`
//! on [`ComponentKind`].

use std::fmt;

/// Toolchain components this tool can build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    /// Linux kernel headers + glibc
    Sysroot,
    /// GCC cross compiler
    Gcc,
    /// Clang+LLVM cross compiler
    Clang,
    /// libclang for the python bindings
    Libclang,
    /// CMake used to build clang
    Cmake,
}

/// Ways to satisfy a component's build-time host compiler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostStrategyKind {
    /// The compiler shipped in the base build image
    Ambient,
    /// An archive supplied on the command line
    LocalArchive,
    /// A previously published archive fetched from the release
    RemoteArchive,
    /// Bootstrap compiler built in a first stage, used directly by a second
    TwoStage,
}

impl fmt::Display for HostStrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HostStrategyKind::Ambient => "system compiler",
            HostStrategyKind::LocalArchive => "local host archive",
            HostStrategyKind::RemoteArchive => "remote host archive",
            HostStrategyKind::TwoStage => "two-stage bootstrap",
        };
        f.write_str(name)
    }
}

/// Archives unpacked into a build context, each with a fixed directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DependencyKind {
    Sysroot,
    Cmake,
    HostCompiler,
}

impl DependencyKind {
    /// Directory under `<context>/ci/`
    pub fn dir_name(&self) -> &'static str {
        match self {
            DependencyKind::Sysroot => "sysroot",
            DependencyKind::Cmake => "cmake",
            DependencyKind::HostCompiler => "host-compiler",
        }
    }

    /// Build argument carrying the context-relative unpacked path
    pub fn build_arg(&self) -> &'static str {
        match self {
            DependencyKind::Sysroot => "SRC_SYSROOT_DIR",
            DependencyKind::Cmake => "SRC_CMAKE_DIR",
            DependencyKind::HostCompiler => "SRC_HOST_COMPILER_DIR",
        }
    }
}

/// One image build: build file and the image it produces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stage {
    pub dockerfile: &'static str,
    pub image: &'static str,
}

const fn stage(dockerfile: &'static str, image: &'static str) -> Stage {
    Stage { dockerfile, image }
}

const SYSROOT_STAGES: &[Stage] = &[
    stage("Dockerfile.kernel", "sysroot-linux-kernel"),
    stage("Dockerfile.glibc", "sysroot"),
];
const GCC_NO_HOST_STAGES: &[Stage] = &[stage("Dockerfile.gcc_no_host", "gcc")];
const GCC_HOSTED_STAGES: &[Stage] = &[stage("Dockerfile.gcc", "gcc")];
const GCC_TWO_STAGE_STAGES: &[Stage] = &[
    stage("Dockerfile.gcc_no_host", "gcc-bootstrap"),
    stage("Dockerfile.gcc_chained", "gcc"),
];
const CLANG_STAGES: &[Stage] = &[stage("Dockerfile.clang", "clang")];
const LIBCLANG_STAGES: &[Stage] = &[stage("Dockerfile.libclang", "libclang")];
const CMAKE_STAGES: &[Stage] = &[stage("Dockerfile.cmake", "cmake")];

/// Base image cached between CI jobs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BaseImage {
    pub dockerfile: &'static str,
    pub tag: &'static str,
}

impl ComponentKind {
    pub fn name(&self) -> &'static str {
        match self {
            ComponentKind::Sysroot => "sysroot",
            ComponentKind::Gcc => "gcc",
            ComponentKind::Clang => "clang",
            ComponentKind::Libclang => "libclang",
            ComponentKind::Cmake => "cmake",
        }
    }

    /// Build context directory under the build root
    pub fn context_dir(&self) -> &'static str {
        match self {
            ComponentKind::Sysroot => "sysroot",
            ComponentKind::Gcc => "gcc",
            ComponentKind::Clang | ComponentKind::Libclang | ComponentKind::Cmake => "clang",
        }
    }

    pub fn supported_strategies(&self) -> &'static [HostStrategyKind] {
        use HostStrategyKind::*;
        match self {
            ComponentKind::Sysroot => &[Ambient],
            ComponentKind::Gcc => &[Ambient, LocalArchive, RemoteArchive, TwoStage],
            ComponentKind::Clang => &[LocalArchive, RemoteArchive],
            ComponentKind::Libclang | ComponentKind::Cmake => &[LocalArchive],
        }
    }

    pub fn supports(&self, strategy: HostStrategyKind) -> bool {
        self.supported_strategies().contains(&strategy)
    }

    /// Component whose published archives serve as remote host compilers
    pub fn remote_host(&self) -> Option<ComponentKind> {
        match self {
            ComponentKind::Gcc => Some(ComponentKind::Gcc),
            ComponentKind::Clang => Some(ComponentKind::Clang),
            _ => None,
        }
    }

    /// Published asset name for a given version
    pub fn asset_name(&self, version: &str, triple: &str) -> String {
        match self {
            ComponentKind::Clang => format!("clang+llvm-{}-{}.tar.xz", version, triple),
            other => format!("{}-{}-{}.tar.xz", other.name(), version, triple),
        }
    }

    /// Image builds for a strategy, in order
    pub fn stages(&self, strategy: HostStrategyKind) -> &'static [Stage] {
        match (self, strategy) {
            (ComponentKind::Sysroot, _) => SYSROOT_STAGES,
            (ComponentKind::Gcc, HostStrategyKind::Ambient) => GCC_NO_HOST_STAGES,
            (ComponentKind::Gcc, HostStrategyKind::TwoStage) => GCC_TWO_STAGE_STAGES,
            (ComponentKind::Gcc, _) => GCC_HOSTED_STAGES,
            (ComponentKind::Clang, _) => CLANG_STAGES,
            (ComponentKind::Libclang, _) => LIBCLANG_STAGES,
            (ComponentKind::Cmake, _) => CMAKE_STAGES,
        }
    }

    /// Value of `ENABLE_LIBCXX` for clang builds
    pub fn libcxx_for_host(strategy: HostStrategyKind) -> &'static str {
        // A gcc host can't bootstrap libc++; only a clang host can
        match strategy {
            HostStrategyKind::RemoteArchive => "ON",
            _ => "OFF",
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Toolchains with cacheable base images
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BaseImageSet {
    Sysroot,
    Gcc,
    Clang,
}

impl BaseImageSet {
    pub fn context_dir(&self) -> &'static str {
        match self {
            BaseImageSet::Sysroot => "sysroot",
            BaseImageSet::Gcc => "gcc",
            BaseImageSet::Clang => "clang",
        }
    }

    pub fn images(&self) -> &'static [BaseImage] {
        match self {
            BaseImageSet::Sysroot => &[BaseImage {
                dockerfile: "Dockerfile.base",
                tag: "sysroot-toolchain-base",
            }],
            BaseImageSet::Gcc => &[
                BaseImage {
                    dockerfile: "Dockerfile.base",
                    tag: "gcc-toolchain-base",
                },
                BaseImage {
                    dockerfile: "Dockerfile.host_base",
                    tag: "gcc-toolchain-base-with-host-compiler",
                },
            ],
            BaseImageSet::Clang => &[BaseImage {
                dockerfile: "Dockerfile.base",
                tag: "clang-toolchain-base",
            }],
        }
    }
}
