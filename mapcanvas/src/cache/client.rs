//! Tile cache client with expiry semantics.
//!
//! This client wraps a `TileStore` with:
//! - Freshness classification: FOUND / EXPIRED / NOTFOUND
//! - Failure degradation: storage errors are logged and treated as misses
//!
//! # Stale-While-Revalidate
//!
//! Expired entries still return their bytes so the compositor can draw
//! something immediately while a refresh is requested.

use std::sync::Arc;

use tracing::warn;

use crate::cache::traits::{
    status_for_expiry, CacheStatus, CacheUsage, StorageError, StoredTile, TileStore,
};
use crate::coord::TileKey;
use crate::time::unix_now;

/// Result of a cache lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileLookup {
    /// Freshness of the entry.
    pub status: CacheStatus,
    /// Encoded image bytes, present for FOUND and EXPIRED.
    pub data: Option<Vec<u8>>,
}

impl TileLookup {
    /// A lookup that found nothing.
    pub fn not_found() -> Self {
        Self {
            status: CacheStatus::NotFound,
            data: None,
        }
    }
}

/// Expiry-aware cache for encoded tiles.
///
/// All methods are infallible from the caller's point of view except
/// [`put`](Self::put), whose errors the caller decides how to report.
#[derive(Clone)]
pub struct TileCache {
    /// The underlying store.
    store: Arc<dyn TileStore>,
}

impl TileCache {
    /// Create a new tile cache over a store.
    pub fn new(store: Arc<dyn TileStore>) -> Self {
        Self { store }
    }

    /// Look up a tile, classifying it against the current time.
    pub fn get(&self, key: &TileKey) -> TileLookup {
        self.get_at(key, unix_now())
    }

    /// Look up a tile, classifying it against `now` (seconds since epoch).
    pub fn get_at(&self, key: &TileKey, now: i64) -> TileLookup {
        match self.store.load(key) {
            Ok(Some(tile)) => TileLookup {
                status: tile.status_at(now),
                data: Some(tile.data),
            },
            Ok(None) => TileLookup::not_found(),
            Err(e) => {
                warn!(error = %e, key = %key, "Tile cache read failed");
                TileLookup::not_found()
            }
        }
    }

    /// Store a tile, replacing any previous entry for the key.
    ///
    /// # Arguments
    ///
    /// * `key` - The tile key
    /// * `expiry` - Absolute expiry in seconds since epoch
    /// * `data` - Encoded image bytes
    pub fn put(&self, key: &TileKey, expiry: i64, data: Vec<u8>) -> Result<(), StorageError> {
        self.store.store(key, StoredTile::new(expiry, data))
    }

    /// Freshness of a tile without reading its bytes.
    pub fn status(&self, key: &TileKey) -> CacheStatus {
        self.status_at(key, unix_now())
    }

    /// Freshness of a tile at time `now`, without reading its bytes.
    pub fn status_at(&self, key: &TileKey, now: i64) -> CacheStatus {
        match self.store.expiry(key) {
            Ok(Some(expiry)) => status_for_expiry(expiry, now),
            Ok(None) => CacheStatus::NotFound,
            Err(e) => {
                warn!(error = %e, key = %key, "Tile cache status check failed");
                CacheStatus::NotFound
            }
        }
    }

    /// True if the cache holds the tile, fresh or expired.
    pub fn exists(&self, key: &TileKey) -> bool {
        self.status(key).has_data()
    }

    /// True if the cache holds an unexpired copy of the tile.
    pub fn is_fresh(&self, key: &TileKey) -> bool {
        self.status(key) == CacheStatus::Found
    }

    /// Current usage of the underlying store.
    pub fn usage(&self) -> Result<CacheUsage, StorageError> {
        self.store.usage()
    }

    /// Remove all tiles from the underlying store.
    pub fn clear(&self) -> Result<CacheUsage, StorageError> {
        self.store.clear()
    }
}

impl std::fmt::Debug for TileCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TileCache").finish_non_exhaustive()
    }
}
