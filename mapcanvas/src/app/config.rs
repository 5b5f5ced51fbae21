//! Layer configuration.
//!
//! `LayerConfig` gathers what a [`TileLayer`](super::TileLayer) needs: the
//! tile server, where tiles are stored, backlog size and HTTP timeout.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::cache::{DiskTileStore, MemoryTileStore, TileStore};
use crate::config::ConfigFile;
use crate::coord::DEFAULT_TILE_SIZE;
use crate::download::DownloadConfig;
use crate::provider::{TileServer, DEFAULT_TIMEOUT_SECS};

use super::error::AppError;

/// Default size bound of an in-memory tile store (256 MB).
pub const DEFAULT_MEMORY_STORE_BYTES: u64 = 256 * 1024 * 1024;

/// Where a layer keeps its tiles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheLocation {
    /// Persistent store under a directory.
    Disk(PathBuf),
    /// Size-bounded store that lives as long as the layer.
    Memory { max_size_bytes: u64 },
}

/// Everything needed to open a tile layer.
#[derive(Debug, Clone)]
pub struct LayerConfig {
    pub server: TileServer,
    pub cache: CacheLocation,
    pub download: DownloadConfig,
    /// Edge length of a tile in pixels.
    pub tile_size: u32,
    /// HTTP timeout in seconds.
    pub timeout_secs: u64,
}

impl LayerConfig {
    /// Layer backed by a disk cache under `cache_dir`.
    pub fn new(server: TileServer, cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            server,
            cache: CacheLocation::Disk(cache_dir.into()),
            download: DownloadConfig::default(),
            tile_size: DEFAULT_TILE_SIZE,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Layer backed by an in-memory cache.
    pub fn in_memory(server: TileServer) -> Self {
        Self {
            cache: CacheLocation::Memory {
                max_size_bytes: DEFAULT_MEMORY_STORE_BYTES,
            },
            ..Self::new(server, PathBuf::new())
        }
    }

    pub fn with_backlog(mut self, backlog: usize) -> Self {
        self.download.backlog = backlog;
        self
    }

    pub fn with_tile_size(mut self, tile_size: u32) -> Self {
        self.tile_size = tile_size;
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Builds a layer configuration from the INI config file.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Protocol` if the configured tile server is invalid.
    pub fn from_config_file(config: &ConfigFile) -> Result<Self, AppError> {
        let settings = &config.tileserver;
        let server = TileServer::new(
            settings.name.clone(),
            &settings.url,
            settings.min_zoom,
            settings.max_zoom,
            settings.parallel,
            settings.image_type,
        )?;

        Ok(Self::new(server, config.cache.location.clone())
            .with_backlog(config.download.backlog)
            .with_timeout_secs(config.download.timeout))
    }

    /// Cache directory, if the layer uses a disk cache.
    pub fn cache_dir(&self) -> Option<&Path> {
        match &self.cache {
            CacheLocation::Disk(path) => Some(path),
            CacheLocation::Memory { .. } => None,
        }
    }

    /// Creates the tile store described by [`cache`](Self::cache).
    pub fn open_store(&self) -> Arc<dyn TileStore> {
        match &self.cache {
            CacheLocation::Disk(path) => Arc::new(DiskTileStore::new(path.clone())),
            CacheLocation::Memory { max_size_bytes } => {
                Arc::new(MemoryTileStore::new(*max_size_bytes))
            }
        }
    }
}
