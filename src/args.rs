//! CLI argument definitions using clap
//!
//! Operator and diagnostic surface for the routing pipeline:
//! - switchyard classify "text"     # routing verdict for a request
//! - switchyard route "text"        # full pipeline dry-run (echo backend)
//! - switchyard status              # provider health snapshot
//! - switchyard reset <provider>    # clear a provider's failure counter
//! - switchyard models              # pricing table
//! - switchyard config init/show    # configuration management

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Default configuration file name used across all CLI commands.
pub const DEFAULT_CONFIG_FILE: &str = "switchyard.toml";

#[derive(Parser)]
#[command(name = "switchyard")]
#[command(about = "Switchyard - classification, health-aware fallback, and quota admission for AI providers")]
#[command(version)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    pub config_file: PathBuf,

    /// Enable verbose output
    #[arg(long, short)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Classify a request text and print the routing verdict
    #[command(verbatim_doc_comment)]
    Classify {
        /// Request text to classify
        text: String,
    },

    /// Dry-run the full pipeline against the in-tree echo backend
    ///
    /// Exercises classification, quota admission, caching, and fallback
    /// dispatch without calling any real provider.
    #[command(verbatim_doc_comment)]
    Route {
        /// Request text to route
        text: String,

        /// Caller the request is billed to
        #[arg(long, default_value = "operator")]
        user: String,

        /// Calling module hint
        #[arg(long)]
        module: Option<String>,
    },

    /// Show the provider health snapshot for the configured providers
    Status,

    /// Reset a provider's failure counter
    Reset {
        /// Provider to reset (openai, google, anthropic, perplexity, ...)
        provider: String,
    },

    /// List the pricing table
    Models,

    /// Manage configuration files
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Create a configuration file with the default settings
    Init {
        /// Where to write it; defaults to the user config directory
        #[arg(long)]
        path: Option<PathBuf>,
    },

    /// Show the effective configuration after file and environment layers
    Show,
}
