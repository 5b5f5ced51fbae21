//! Cache management CLI commands.

use clap::Subcommand;
use mapcanvas::cache::{DiskTileStore, TileStore};
use mapcanvas::config::ConfigFile;

use super::format_size;
use crate::error::CliError;

/// Cache action subcommands.
#[derive(Debug, Subcommand)]
pub enum CacheAction {
    /// Remove every cached tile
    Clear,
    /// Show tile count and size of the disk cache
    Stats,
}

/// Run a cache subcommand.
pub fn run(action: CacheAction, config: &ConfigFile) -> Result<(), CliError> {
    let cache_dir = &config.cache.location;
    let store = DiskTileStore::new(cache_dir.clone());

    match action {
        CacheAction::Clear => {
            println!("Clearing tile cache at: {}", cache_dir.display());
            let removed = store.clear()?;
            println!(
                "Deleted {} tiles, freed {}",
                removed.entries,
                format_size(removed.bytes)
            );
        }
        CacheAction::Stats => {
            println!("Tile cache: {}", cache_dir.display());
            let usage = store.usage()?;
            println!("  Tiles: {}", usage.entries);
            println!("  Size:  {}", format_size(usage.bytes));
        }
    }

    Ok(())
}
