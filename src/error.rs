//! Error types for toolsmith
//!
//! All modules use `ToolsmithResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for toolsmith operations
pub type ToolsmithResult<T> = Result<T, ToolsmithError>;

/// Coarse classification of a failure, used by the pipeline driver
/// and for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    NotFound,
    Duplicate,
    BuildEngine,
    Transfer,
    ResourceCleanup,
    Io,
    Internal,
}

/// All errors that can occur in toolsmith
#[derive(Error, Debug)]
pub enum ToolsmithError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Malformed archive name '{name}': {reason}")]
    ArchiveName { name: String, reason: String },

    // Artifact repository errors
    #[error("Release '{release}' not found in {repository}")]
    ReleaseNotFound { repository: String, release: String },

    #[error("Release asset not found: {0}")]
    AssetNotFound(String),

    #[error("Release asset already exists: {0}")]
    DuplicateAsset(String),

    #[error("GitHub token not available. Set GITHUB_TOKEN or run: gh auth login")]
    GithubNotAuthenticated,

    #[error("Transfer failed while {context}: {reason}")]
    Transfer { context: String, reason: String },

    // Container engine errors
    #[error("No container engine found (tried: {0})")]
    EngineNotFound(String),

    #[error("Image build failed: {tag}: {reason}")]
    ImageBuild { tag: String, reason: String },

    #[error("Container create failed for image {image}: {reason}")]
    ContainerCreate { image: String, reason: String },

    #[error("Copy from container {container} failed: {reason}")]
    ContainerCopy { container: String, reason: String },

    #[error("Failed to remove container {container}: {reason}")]
    ContainerCleanup { container: String, reason: String },

    #[error("Image not found after load: {0}")]
    ImageMissing(String),

    // Archive errors
    #[error("Archive entry escapes destination directory: {entry}")]
    PathTraversal { entry: PathBuf },

    #[error("Archive {archive} does not contain top-level directory '{prefix}'")]
    ArchiveLayout { archive: PathBuf, prefix: String },

    #[error("Unsupported archive compression '{0}' (expected .tar.xz)")]
    UnsupportedCompression(String),

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Process errors
    #[error("Command failed: {command}")]
    CommandFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Command execution error: {command}, stderr: {stderr}")]
    CommandExecution { command: String, stderr: String },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ToolsmithError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Create a command failed error
    pub fn command_failed(command: impl Into<String>, source: std::io::Error) -> Self {
        Self::CommandFailed {
            command: command.into(),
            source,
        }
    }

    /// Create a command execution error
    pub fn command_exec(command: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self::CommandExecution {
            command: command.into(),
            stderr: stderr.into(),
        }
    }

    /// Create a transfer error
    pub fn transfer(context: impl Into<String>, reason: impl ToString) -> Self {
        Self::Transfer {
            context: context.into(),
            reason: reason.to_string(),
        }
    }

    /// Classify the error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration(_)
            | Self::ConfigInvalid { .. }
            | Self::ArchiveName { .. }
            | Self::UnsupportedCompression(_)
            | Self::GithubNotAuthenticated
            | Self::EngineNotFound(_)
            | Self::TomlParse(_) => ErrorKind::Configuration,
            Self::ReleaseNotFound { .. } | Self::AssetNotFound(_) | Self::ImageMissing(_) => {
                ErrorKind::NotFound
            }
            Self::DuplicateAsset(_) => ErrorKind::Duplicate,
            Self::ImageBuild { .. }
            | Self::ContainerCreate { .. }
            | Self::ContainerCopy { .. }
            | Self::CommandExecution { .. } => ErrorKind::BuildEngine,
            Self::Transfer { .. } | Self::Json(_) => ErrorKind::Transfer,
            Self::ContainerCleanup { .. } => ErrorKind::ResourceCleanup,
            Self::PathTraversal { .. }
            | Self::ArchiveLayout { .. }
            | Self::Io { .. }
            | Self::CommandFailed { .. } => ErrorKind::Io,
            Self::TomlSerialize(_) | Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::GithubNotAuthenticated => Some("Export GITHUB_TOKEN or run: gh auth login"),
            Self::DuplicateAsset(_) => {
                Some("Delete the existing asset from the release before forcing a rebuild")
            }
            Self::EngineNotFound(_) => Some("Install docker or podman, or set engine.program"),
            Self::ArchiveLayout { .. } => {
                Some("The archive's top-level directory must match its file name without .tar.<ext>")
            }
            _ => None,
        }
    }
}
