//! Errors reported by the `mapcanvas` binary.
//!
//! Every failure ends in [`CliError::exit`], which prints the message and
//! any hint, then exits with status 1.

use std::fmt;
use std::path::PathBuf;
use std::process;

use mapcanvas::app::AppError;
use mapcanvas::cache::StorageError;
use mapcanvas::config::ConfigFileError;

/// Failures of a CLI command.
#[derive(Debug)]
pub enum CliError {
    LoggingInit(String),
    /// Configuration file could not be loaded
    Config(ConfigFileError),
    /// Invalid command-line arguments
    InvalidArgs(String),
    /// Failed to create the Tokio runtime
    Runtime(std::io::Error),
    /// Failed to open the tile layer
    Layer(AppError),
    /// Failed to write the rendered image
    ImageWrite {
        path: PathBuf,
        error: image::ImageError,
    },
    /// Failed to inspect or clear the tile cache
    Cache(StorageError),
}

impl CliError {
    /// Prints the error and terminates the process.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        if let CliError::Layer(AppError::Protocol(_)) = self {
            eprintln!();
            eprintln!("Check the [tileserver] section of your config file:");
            eprintln!("  url must contain {{z}}, {{x}} and {{y}}");
            eprintln!("  zmin must not exceed zmax, and parallel must be at least 1");
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Cannot set up logging: {}", msg),
            CliError::Config(e) => write!(f, "{}", e),
            CliError::InvalidArgs(msg) => write!(f, "Invalid arguments: {}", msg),
            CliError::Runtime(e) => write!(f, "Failed to create Tokio runtime: {}", e),
            CliError::Layer(e) => write!(f, "{}", e),
            CliError::ImageWrite { path, error } => {
                write!(f, "Failed to write image '{}': {}", path.display(), error)
            }
            CliError::Cache(e) => write!(f, "Tile cache error: {}", e),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Config(e) => Some(e),
            CliError::Runtime(e) => Some(e),
            CliError::Layer(e) => Some(e),
            CliError::ImageWrite { error, .. } => Some(error),
            CliError::Cache(e) => Some(e),
            CliError::LoggingInit(_) | CliError::InvalidArgs(_) => None,
        }
    }
}

impl From<AppError> for CliError {
    fn from(e: AppError) -> Self {
        CliError::Layer(e)
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::Config(e)
    }
}

impl From<StorageError> for CliError {
    fn from(e: StorageError) -> Self {
        CliError::Cache(e)
    }
}
