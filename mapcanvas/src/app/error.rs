//! Application error types.

use std::fmt;

use crate::cache::StorageError;
use crate::config::ConfigFileError;
use crate::provider::{FetchError, ProtocolError};

/// Errors that can occur while opening a tile layer.
#[derive(Debug)]
pub enum AppError {
    /// Invalid tile-server descriptor.
    Protocol(ProtocolError),

    /// Configuration file could not be loaded.
    Config(ConfigFileError),

    /// HTTP client could not be created.
    HttpClient(FetchError),

    /// Cache storage could not be inspected or cleared.
    Storage(StorageError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Protocol(e) => write!(f, "Invalid tile server: {}", e),
            AppError::Config(e) => write!(f, "Configuration error: {}", e),
            AppError::HttpClient(e) => write!(f, "Failed to create HTTP client: {}", e),
            AppError::Storage(e) => write!(f, "Tile cache error: {}", e),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Protocol(e) => Some(e),
            AppError::Config(e) => Some(e),
            AppError::HttpClient(e) => Some(e),
            AppError::Storage(e) => Some(e),
        }
    }
}

impl From<ProtocolError> for AppError {
    fn from(e: ProtocolError) -> Self {
        AppError::Protocol(e)
    }
}

impl From<ConfigFileError> for AppError {
    fn from(e: ConfigFileError) -> Self {
        AppError::Config(e)
    }
}

impl From<StorageError> for AppError {
    fn from(e: StorageError) -> Self {
        AppError::Storage(e)
    }
}
