//! Persistent tile cache.
//!
//! Maps `(session, z, x, y)` to encoded tile bytes plus an absolute expiry.
//! Lookups classify entries as FOUND, EXPIRED or NOTFOUND; expired entries
//! keep their bytes so stale tiles can be drawn while a refresh runs.
//!
//! # Layers
//!
//! - [`TileStore`]: persistence backends ([`DiskTileStore`], [`MemoryTileStore`])
//! - [`TileCache`]: expiry classification and failure degradation
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use mapcanvas::cache::{CacheStatus, MemoryTileStore, TileCache};
//! use mapcanvas::coord::TileKey;
//!
//! let cache = TileCache::new(Arc::new(MemoryTileStore::new(16 * 1024 * 1024)));
//! let key = TileKey::new("osm", 3, 4, 2);
//!
//! cache.put(&key, 2_000, vec![1, 2, 3]).unwrap();
//! assert_eq!(cache.get_at(&key, 1_000).status, CacheStatus::Found);
//! assert_eq!(cache.get_at(&key, 2_000).status, CacheStatus::Expired);
//! ```

mod client;
mod disk;
mod memory;
mod traits;

pub use client::{TileCache, TileLookup};
pub use disk::DiskTileStore;
pub use memory::MemoryTileStore;
pub use traits::{
    status_for_expiry, CacheStatus, CacheUsage, StorageError, StoredTile, TileStore,
};
