//! toolsmith - staged cross-compilation toolchain builder
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use toolsmith::cli::{Cli, Commands, LogFormat};
use toolsmith::config::{Config, ConfigManager};
use toolsmith::error::ToolsmithResult;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> ToolsmithResult<()> {
    let cli = Cli::parse();

    let config_manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };
    let mut config = config_manager.load().await?;
    if let Some(ref root) = cli.build_root {
        config.paths.build_root = root.clone();
    }

    init_logging(&cli, &config);
    debug!("Loaded configuration from {}", config_manager.path().display());

    match cli.command {
        Commands::Sysroot(args) => toolsmith::cli::commands::sysroot(args, &config).await,
        Commands::Gcc(args) => toolsmith::cli::commands::gcc(args, &config).await,
        Commands::Clang(args) => toolsmith::cli::commands::clang(args, &config).await,
        Commands::Libclang(args) => toolsmith::cli::commands::libclang(args, &config).await,
        Commands::Cmake(args) => toolsmith::cli::commands::cmake(args, &config).await,
        Commands::BaseImage(args) => toolsmith::cli::commands::base_image(args, &config).await,
        Commands::Config(args) => {
            toolsmith::cli::commands::config(args, &config, &config_manager).await
        }
    }
}

/// 0 = info, 1 = debug, 2+ = trace; `RUST_LOG` wins when set
fn init_logging(cli: &Cli, config: &Config) {
    let default_level = match cli.verbose {
        0 => "toolsmith=info",
        1 => "toolsmith=debug",
        _ => "toolsmith=trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let json = match cli.log_format {
        Some(format) => format == LogFormat::Json,
        None => config.general.log_format.eq_ignore_ascii_case("json"),
    };

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }
}
