//! toolsmith - staged cross-compilation toolchain builder
//!
//! Builds toolchain components inside container images and publishes each
//! as a content-named `.tar.xz` archive to a GitHub release.

pub mod archive;
pub mod cli;
pub mod config;
pub mod error;
pub mod image;
pub mod orchestration;
pub mod repository;
pub mod toolchain;
pub mod ui;

pub use error::{ToolsmithError, ToolsmithResult};
