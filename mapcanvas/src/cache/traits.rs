//! Core traits for tile storage.
//!
//! The `TileStore` trait is the persistence interface behind the
//! [`TileCache`](super::TileCache). Stores only move bytes and expiry
//! timestamps around; freshness is decided by the cache client.
//!
//! # Design Principles
//!
//! - **Session-scoped keys**: every key carries its tile-server session
//! - **Opaque values**: encoded image bytes, no decoding at this layer
//! - **Synchronous**: lookups happen on the render path and only touch
//!   local memory or disk
//! - **Dyn-compatible**: stores are shared as `Arc<dyn TileStore>`

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::coord::TileKey;

/// Freshness of a cached tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheStatus {
    /// Entry exists and has not expired.
    Found,
    /// Entry exists but has expired. Bytes are still usable.
    Expired,
    /// No entry for this key.
    NotFound,
}

impl CacheStatus {
    /// Returns true if the cache holds bytes for the tile, fresh or stale.
    pub fn has_data(&self) -> bool {
        !matches!(self, CacheStatus::NotFound)
    }
}

impl fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheStatus::Found => write!(f, "FOUND"),
            CacheStatus::Expired => write!(f, "EXPIRED"),
            CacheStatus::NotFound => write!(f, "NOTFOUND"),
        }
    }
}

/// A persisted tile: its expiry and encoded image bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredTile {
    /// Absolute expiry in seconds since the Unix epoch.
    pub expiry: i64,
    /// Encoded image bytes as received from the tile server.
    pub data: Vec<u8>,
}

impl StoredTile {
    pub fn new(expiry: i64, data: Vec<u8>) -> Self {
        Self { expiry, data }
    }

    /// Freshness of this entry at time `now`.
    ///
    /// An entry is fresh while `now < expiry`.
    #[inline]
    pub fn status_at(&self, now: i64) -> CacheStatus {
        status_for_expiry(self.expiry, now)
    }
}

/// Freshness for an entry with the given expiry at time `now`.
#[inline]
pub fn status_for_expiry(expiry: i64, now: i64) -> CacheStatus {
    if now < expiry {
        CacheStatus::Found
    } else {
        CacheStatus::Expired
    }
}

/// Disk usage of a tile store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheUsage {
    /// Number of stored tiles.
    pub entries: u64,
    /// Total bytes used.
    pub bytes: u64,
}

impl fmt::Display for CacheUsage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} tiles, {} bytes", self.entries, self.bytes)
    }
}

/// Errors raised by the persistence layer.
#[derive(Debug, Error)]
pub enum StorageError {
    /// I/O error reading or writing the store.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored entry could not be decoded.
    #[error("Corrupt cache entry for {key}: {reason}")]
    Corrupt { key: String, reason: String },

    /// An entry could not be encoded for storage.
    #[error("Failed to encode cache entry: {0}")]
    Encode(String),
}

/// Persistent key/value storage for tiles.
///
/// Implementations must be `Send + Sync`: the render thread reads while
/// fetch completions write. A write must never be observable half-done.
pub trait TileStore: Send + Sync {
    /// Load a tile, or `Ok(None)` if there is no entry.
    fn load(&self, key: &TileKey) -> Result<Option<StoredTile>, StorageError>;

    /// Insert or replace a tile.
    fn store(&self, key: &TileKey, tile: StoredTile) -> Result<(), StorageError>;

    /// Expiry of a tile without loading its bytes, or `Ok(None)` if absent.
    fn expiry(&self, key: &TileKey) -> Result<Option<i64>, StorageError>;

    /// Remove every entry from the store.
    fn clear(&self) -> Result<CacheUsage, StorageError>;

    /// Current usage of the store.
    fn usage(&self) -> Result<CacheUsage, StorageError>;
}
