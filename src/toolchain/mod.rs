//! Staged toolchain pipeline
//!
//! Components, host strategy resolution, container builds and publishing.

pub mod build;
pub mod component;
pub mod pipeline;
pub mod publish;
pub mod registry;
pub mod resolve;

pub use component::{
    ClangOptions, CmakeOptions, GccOptions, HostSelection, LibclangOptions, Sink, SysrootOptions,
    Toolchain,
};
pub use pipeline::{execute, PipelineOutcome, PipelineSettings, RunContext};
pub use publish::Published;
pub use registry::{BaseImageSet, ComponentKind, DependencyKind, HostStrategyKind};
pub use resolve::{plan, BuildPlan, HostStrategy};
