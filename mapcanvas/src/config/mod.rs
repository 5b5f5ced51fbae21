//! INI configuration.
//!
//! ```ini
//! [tileserver]
//! name = OpenStreetMap
//! url = https://tile.openstreetmap.org/{z}/{x}/{y}.png
//! zmin = 0
//! zmax = 19
//! parallel = 2
//! image_type = png
//!
//! [cache]
//! location = ~/.cache/mapcanvas
//!
//! [download]
//! backlog = 150
//! timeout = 30
//!
//! [logging]
//! directory = ~/.local/share/mapcanvas/logs
//! file = mapcanvas.log
//! ```
//!
//! Every key is optional; missing keys keep their defaults.

mod file;
mod parser;
mod settings;

pub use file::{config_directory, config_file_path, ConfigFileError};
pub use settings::{
    default_cache_location, default_log_directory, CacheSettings, ConfigFile, DownloadSettings,
    LoggingSettings, TileServerSettings, DEFAULT_LOG_FILE, DEFAULT_MAX_ZOOM, DEFAULT_MIN_ZOOM,
    DEFAULT_PARALLELISM, DEFAULT_SERVER_NAME,
};
