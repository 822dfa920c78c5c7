//! artcache CLI - HTTP server and maintenance commands
//!
//! This binary serves the artwork HTTP API and exposes one-shot generation,
//! key derivation, cache and configuration commands.

mod commands;
mod error;
mod runner;
mod server;

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use commands::cache::CacheAction;
use commands::config::ConfigCommands;
use commands::generate::GenerateAction;
use commands::serve::ServeArgs;
use error::CliError;

#[derive(Parser)]
#[command(name = "artcache")]
#[command(version, about = "Cache and serve generated music artwork", long_about = None)]
struct Cli {
    /// Configuration file (default: ~/.artcache/config.ini)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server
    Serve {
        /// Listen address, overrides [server] bind
        #[arg(long)]
        bind: Option<SocketAddr>,
    },

    /// Generate one artifact and exit
    Generate {
        #[command(subcommand)]
        action: GenerateAction,
    },

    /// Print the cache key for one or more source URLs
    Key {
        /// Source URLs; more than one gives a composite key
        #[arg(required = true)]
        urls: Vec<String>,
    },

    /// Inspect or tidy the artifact cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        e.exit();
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Serve { bind } => commands::serve::run(ServeArgs { bind }, config_path).await,
        Commands::Generate { action } => commands::generate::run(action, config_path).await,
        Commands::Key { urls } => commands::key::run(urls),
        Commands::Cache { action } => commands::cache::run(action, config_path),
        Commands::Config { command } => commands::config::run(command, config_path),
    }
}
