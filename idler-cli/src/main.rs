// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Idler CLI
//!
//! Command-line interface and daemon for the scale-to-zero idler.

use clap::builder::FalseyValueParser;
use clap::{Parser, Subcommand};
use idler_core::ConfigOverrides;
use tracing_subscriber::EnvFilter;

mod commands;
mod gateway;
mod metrics;
mod scrape;

/// Idler - scale idle serverless functions to zero
#[derive(Parser)]
#[command(name = "idler")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "idler.yaml")]
    pub config: String,

    /// Enable verbose logging
    #[arg(short, long, env = "write_debug", value_parser = FalseyValueParser::new())]
    pub verbose: bool,

    /// Gateway base URL, overrides gateway.url
    #[arg(long, global = true, env = "gateway_url")]
    pub gateway_url: Option<String>,

    /// Directory holding basic-auth-user and basic-auth-password
    #[arg(long, global = true, env = "secret_mount_path")]
    pub secret_mount_path: Option<String>,

    /// Inactivity window, e.g. 5m or 300
    #[arg(long, global = true, env = "inactivity_duration")]
    pub inactivity_duration: Option<String>,

    /// Pause between reconciliation rounds, e.g. 30s
    #[arg(long, global = true, env = "reconcile_interval")]
    pub reconcile_interval: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the reconciliation loop
    Run {
        /// Log scale requests instead of sending them
        #[arg(long)]
        dry_run: bool,

        /// Run a single round and exit
        #[arg(long)]
        once: bool,
    },

    /// List functions known to the gateway and whether they are managed
    List,

    /// Show the gateway version
    Info,

    /// Validate a configuration file
    Validate {
        /// Path to the configuration file
        file: String,
    },
}

impl Cli {
    /// Settings from flags or the environment that override the config file.
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            gateway_url: self.gateway_url.clone(),
            secret_mount_path: self.secret_mount_path.clone(),
            inactivity_duration: self.inactivity_duration.clone(),
            reconcile_interval: self.reconcile_interval.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging, RUST_LOG wins over the flag
    let log_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // Dispatch to command handlers
    let overrides = cli.overrides();
    match cli.command {
        Commands::Run { dry_run, once } => {
            commands::run::execute(&cli.config, &overrides, dry_run, once).await
        }
        Commands::List => commands::list::execute(&cli.config, &overrides).await,
        Commands::Info => commands::info::execute(&cli.config, &overrides).await,
        Commands::Validate { file } => commands::validate::execute(&file, &overrides).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run_flags() {
        let cli = Cli::try_parse_from(["idler", "-c", "/etc/idler.yaml", "run", "--dry-run", "--once"])
            .unwrap();
        assert_eq!(cli.config, "/etc/idler.yaml");
        assert!(matches!(
            cli.command,
            Commands::Run {
                dry_run: true,
                once: true
            }
        ));
    }

    #[test]
    fn test_override_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "idler",
            "run",
            "--gateway-url",
            "http://gateway:8080",
            "--inactivity-duration",
            "2m",
        ])
        .unwrap();

        let overrides = cli.overrides();
        assert_eq!(overrides.gateway_url.as_deref(), Some("http://gateway:8080"));
        assert_eq!(overrides.inactivity_duration.as_deref(), Some("2m"));
    }

    #[test]
    fn test_overrides_read_from_environment() {
        // Only this test touches this variable
        std::env::set_var("reconcile_interval", "45s");
        let cli = Cli::try_parse_from(["idler", "list"]).unwrap();
        std::env::remove_var("reconcile_interval");

        let config = idler_core::ConfigLoader::load_string_with(
            "gateway:\n  url: http://gateway:8080\n",
            &cli.overrides(),
        )
        .unwrap();
        assert_eq!(config.idler.reconcile_interval.as_secs(), 45);
    }
}
