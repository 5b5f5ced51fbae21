//! Locating and reading `config.ini`.
//!
//! The file lives at `~/.config/mapcanvas/config.ini` on Linux (the
//! platform config directory elsewhere). When it is absent every setting
//! takes its default.

use std::path::{Path, PathBuf};

use ini::Ini;
use thiserror::Error;

use super::parser::parse_ini;
use super::settings::ConfigFile;

#[derive(Debug, Error)]
pub enum ConfigFileError {
    /// The file exists but is not readable INI
    #[error("Cannot read configuration: {0}")]
    Unreadable(#[from] ini::Error),

    #[error("Bad setting [{section}] {key} = '{value}': {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },
}

impl ConfigFile {
    /// Reads the user's config file, see [`config_file_path`].
    pub fn load() -> Result<Self, ConfigFileError> {
        Self::load_from(&config_file_path())
    }

    /// Reads `path`, falling back to defaults when it does not exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigFileError> {
        match path.try_exists() {
            Ok(true) => parse_ini(&Ini::load_from_file(path)?),
            _ => Ok(Self::default()),
        }
    }
}

/// Directory holding `config.ini`.
pub fn config_directory() -> PathBuf {
    let base = dirs::config_dir().unwrap_or_default();
    base.join("mapcanvas")
}

pub fn config_file_path() -> PathBuf {
    config_directory().join("config.ini")
}
