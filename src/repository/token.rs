//! GitHub token resolution
//!
//! The token comes from the configured environment variable, falling back
//! to the gh CLI's stored credentials.

use crate::config::schema::GithubConfig;
use crate::error::{ToolsmithError, ToolsmithResult};
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// GitHub token provider
pub struct GithubToken;

impl GithubToken {
    /// Resolve a token: `$<token_env>` first, then `gh auth token`
    pub async fn resolve(config: &GithubConfig) -> ToolsmithResult<String> {
        if let Some(token) = Self::from_env(&config.token_env) {
            debug!("Using GitHub token from ${}", config.token_env);
            return Ok(token);
        }
        Self::from_gh(config).await
    }

    fn from_env(var: &str) -> Option<String> {
        std::env::var(var)
            .ok()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
    }

    async fn from_gh(config: &GithubConfig) -> ToolsmithResult<String> {
        debug!("Getting GitHub token from gh CLI...");

        let mut cmd = Command::new("gh");
        cmd.args(["auth", "token"]);

        let host = gh_hostname(&config.api_url);
        if host != "github.com" {
            cmd.args(["--hostname", &host]);
        }

        cmd.stdout(Stdio::piped()).stderr(Stdio::piped());

        let output = match cmd.output().await {
            Ok(output) => output,
            // No gh installed means no fallback credentials
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ToolsmithError::GithubNotAuthenticated)
            }
            Err(e) => return Err(ToolsmithError::command_failed("gh auth token", e)),
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if stderr.contains("not logged in") || stderr.contains("gh auth login") {
                return Err(ToolsmithError::GithubNotAuthenticated);
            }
            return Err(ToolsmithError::command_exec("gh auth token", stderr.trim()));
        }

        let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if token.is_empty() {
            return Err(ToolsmithError::GithubNotAuthenticated);
        }

        Ok(token)
    }
}

/// Map an API base URL to the host gh stores credentials under
fn gh_hostname(api_url: &str) -> String {
    let host = url::Url::parse(api_url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_else(|| "github.com".to_string());
    match host.as_str() {
        "api.github.com" => "github.com".to_string(),
        _ => host,
    }
}
