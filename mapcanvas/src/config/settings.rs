//! Settings structs for each configuration section.
//!
//! Each struct represents one `[section]` of the INI config file.

use std::path::PathBuf;

use crate::download::DEFAULT_BACKLOG;
use crate::provider::{ImageType, DEFAULT_TIMEOUT_SECS, OPENSTREETMAP_URL};

/// Default tile server display name.
pub const DEFAULT_SERVER_NAME: &str = "OpenStreetMap";
/// Default lowest served zoom level.
pub const DEFAULT_MIN_ZOOM: u8 = 0;
/// Default highest served zoom level.
pub const DEFAULT_MAX_ZOOM: u8 = 19;
/// Default number of simultaneous downloads.
pub const DEFAULT_PARALLELISM: usize = 2;
/// Default log file name.
pub const DEFAULT_LOG_FILE: &str = "mapcanvas.log";

/// Complete configuration loaded from config.ini.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConfigFile {
    /// Tile server settings
    pub tileserver: TileServerSettings,
    /// Disk cache settings
    pub cache: CacheSettings,
    /// Download queue and HTTP settings
    pub download: DownloadSettings,
    /// Log file settings
    pub logging: LoggingSettings,
}

/// `[tileserver]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileServerSettings {
    pub name: String,
    /// URL template with `{z}`, `{x}` and `{y}` placeholders
    pub url: String,
    pub min_zoom: u8,
    pub max_zoom: u8,
    /// Maximum simultaneous downloads
    pub parallel: usize,
    pub image_type: ImageType,
}

impl Default for TileServerSettings {
    fn default() -> Self {
        Self {
            name: DEFAULT_SERVER_NAME.to_string(),
            url: OPENSTREETMAP_URL.to_string(),
            min_zoom: DEFAULT_MIN_ZOOM,
            max_zoom: DEFAULT_MAX_ZOOM,
            parallel: DEFAULT_PARALLELISM,
            image_type: ImageType::Png,
        }
    }
}

/// `[cache]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSettings {
    /// Root directory of the tile cache
    pub location: PathBuf,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            location: default_cache_location(),
        }
    }
}

/// `[download]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadSettings {
    /// Pending requests kept before the oldest is dropped
    pub backlog: usize,
    /// HTTP timeout in seconds
    pub timeout: u64,
}

impl Default for DownloadSettings {
    fn default() -> Self {
        Self {
            backlog: DEFAULT_BACKLOG,
            timeout: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingSettings {
    pub directory: PathBuf,
    pub file: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            directory: default_log_directory(),
            file: DEFAULT_LOG_FILE.to_string(),
        }
    }
}

/// Platform data directory for logs (e.g. `~/.local/share/mapcanvas/logs`).
///
/// Must not lie under the tile cache, which `cache clear` empties.
pub fn default_log_directory() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mapcanvas")
        .join("logs")
}

/// Platform cache directory for tiles (e.g. `~/.cache/mapcanvas`).
pub fn default_cache_location() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mapcanvas")
}
