//! Cache management CLI commands.

use std::path::Path;

use artcache::store::ArtifactStore;
use clap::Subcommand;

use crate::error::CliError;
use crate::runner::load_config;

/// Cache action subcommands.
#[derive(Debug, Subcommand)]
pub enum CacheAction {
    /// Show file counts and sizes per artifact class
    Stats,
    /// Remove temporary files left behind by an interrupted generation.
    ///
    /// Do not run this while a server is using the same cache directory.
    Sweep,
}

/// Run a cache subcommand.
pub fn run(action: CacheAction, config_path: Option<&Path>) -> Result<(), CliError> {
    let (_, config) = load_config(config_path)?;
    let store = ArtifactStore::new(config.cache.directory.clone());

    match action {
        CacheAction::Stats => {
            println!("Artifact cache: {}", store.root().display());

            let stats = store.stats().map_err(CliError::Cache)?;
            let mut total_files = 0;
            let mut total_bytes = 0;
            for entry in &stats {
                println!(
                    "  {:<16} {:>6} files  {:>10}",
                    entry.class.directory_name(),
                    entry.files,
                    format_size(entry.bytes)
                );
                total_files += entry.files;
                total_bytes += entry.bytes;
            }
            println!(
                "  {:<16} {:>6} files  {:>10}",
                "total",
                total_files,
                format_size(total_bytes)
            );
            Ok(())
        }
        CacheAction::Sweep => {
            println!("Sweeping temporary files in: {}", store.root().display());
            let removed = store.sweep_temp().map_err(CliError::Cache)?;
            println!("Removed {} temporary file(s)", removed);
            Ok(())
        }
    }
}

/// Formats a byte count with a binary unit suffix.
fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];

    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}
