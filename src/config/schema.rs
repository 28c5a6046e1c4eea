//! Configuration schema for toolsmith
//!
//! Configuration is stored at `~/.config/toolsmith/config.toml`

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Container engine settings
    pub engine: EngineConfig,

    /// Local directory layout
    pub paths: PathsConfig,

    /// Produced archive settings
    pub archive: ArchiveConfig,

    /// GitHub release settings
    pub github: GithubConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
        }
    }
}

/// Container engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Engine binary: "auto", "docker" or "podman"
    pub program: String,

    /// Memory budget per parallel link job, in GiB
    pub link_job_memory_gib: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            program: "auto".to_string(),
            link_job_memory_gib: 15,
        }
    }
}

/// Directory layout
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Directory holding one build context per toolchain (`sysroot/`, `gcc/`, `clang/`)
    pub build_root: PathBuf,

    /// Scratch directory for downloads and extracted archives
    pub scratch_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            build_root: PathBuf::from("."),
            scratch_dir: std::env::temp_dir(),
        }
    }
}

/// Produced archive settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    /// Target triple embedded in every asset name
    pub target_triple: String,

    /// xz preset level (0-9)
    pub compression_level: u32,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            target_triple: "x86_64-linux-gnu".to_string(),
            compression_level: 6,
        }
    }
}

/// GitHub settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GithubConfig {
    /// REST API base URL (for GitHub Enterprise)
    pub api_url: String,

    /// Environment variable holding the API token
    pub token_env: String,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.github.com".to_string(),
            token_env: "GITHUB_TOKEN".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = Config::default();
        let toml = toml::to_string_pretty(&config).unwrap();
        assert!(toml.contains("[general]"));
        assert!(toml.contains("[engine]"));
        assert!(toml.contains("[archive]"));
    }

    #[test]
    fn config_deserializes_empty() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.engine.program, "auto");
        assert_eq!(config.archive.target_triple, "x86_64-linux-gnu");
    }

    #[test]
    fn config_deserializes_partial() {
        let toml = r#"
            [engine]
            program = "podman"
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.engine.program, "podman");
        assert_eq!(config.engine.link_job_memory_gib, 15); // default preserved
        assert_eq!(config.github.token_env, "GITHUB_TOKEN");
    }
}
