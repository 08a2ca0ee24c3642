//! Switchyard operator CLI
//!
//! Diagnostic and operational surface for the routing pipeline: classify
//! request texts, dry-run the full pipeline against the echo backend,
//! inspect provider health and pricing, and manage configuration files.

mod args;
mod commands;

use args::{Cli, Commands};
use clap::Parser;
use switchyard_core::RouterConfig;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = commands::load_config(&cli.config_file)?;
    init_logging(&cli, &config);

    match cli.command {
        Commands::Classify { text } => commands::classify(config, &text),
        Commands::Route { text, user, module } => {
            commands::route(config, &text, &user, module.as_deref()).await
        }
        Commands::Status => commands::status(&config),
        Commands::Reset { provider } => commands::reset(&config, &provider),
        Commands::Models => commands::models(&config),
        Commands::Config { action } => commands::config(config, &action),
    }
}

/// `--verbose` wins, then `RUST_LOG`, then the configuration's logging
/// section.
fn init_logging(cli: &Cli, config: &RouterConfig) {
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else if std::env::var(EnvFilter::DEFAULT_ENV).is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::new(config.logging.level.clone())
    };

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if config.logging.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}
