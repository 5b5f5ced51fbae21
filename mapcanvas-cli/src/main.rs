//! mapcanvas CLI - render raster map viewports from a tile server.
//!
//! ```text
//! mapcanvas render --zoom 12 --x 557000 --y 365000 --output map.png
//! mapcanvas cache stats
//! mapcanvas cache clear
//! ```

mod commands;
mod error;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use mapcanvas::config::ConfigFile;
use mapcanvas::logging::init_logging;

use commands::cache::CacheAction;
use commands::render::RenderArgs;
use error::CliError;

#[derive(Parser)]
#[command(name = "mapcanvas")]
#[command(version, about = "Render raster map viewports from a tile server", long_about = None)]
struct Cli {
    /// Config file (default: platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG is set
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a viewport to a PNG file
    Render(RenderArgs),

    /// Inspect or clear the tile cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        e.exit();
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config = match &cli.config {
        Some(path) => ConfigFile::load_from(path)?,
        None => ConfigFile::load()?,
    };

    let _logging = init_logging(
        &config.logging.directory,
        &config.logging.file,
        cli.verbose,
    )
    .map_err(|e| CliError::LoggingInit(e.to_string()))?;

    match cli.command {
        Commands::Render(args) => commands::render::run(args, &config),
        Commands::Cache { action } => commands::cache::run(action, &config),
    }
}
