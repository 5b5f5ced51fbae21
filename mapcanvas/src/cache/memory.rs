//! In-memory tile store using moka.
//!
//! Useful when no persistent location is configured and in tests. Entries
//! are weighted by their byte size and evicted LRU once the configured
//! capacity is exceeded, so unlike the disk store this one is bounded.

use moka::sync::Cache as MokaCache;

use crate::cache::traits::{CacheUsage, StorageError, StoredTile, TileStore};
use crate::coord::TileKey;

/// In-memory tile store.
pub struct MemoryTileStore {
    cache: MokaCache<TileKey, StoredTile>,
}

impl MemoryTileStore {
    /// Create a new memory store.
    ///
    /// # Arguments
    ///
    /// * `max_size_bytes` - Maximum total size of stored tile bytes
    pub fn new(max_size_bytes: u64) -> Self {
        let cache = MokaCache::builder()
            .weigher(|_key: &TileKey, tile: &StoredTile| -> u32 {
                // moka uses u32 weights
                tile.data.len().min(u32::MAX as usize) as u32
            })
            .max_capacity(max_size_bytes)
            .build();

        Self { cache }
    }
}

impl std::fmt::Debug for MemoryTileStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryTileStore")
            .field("entries", &self.cache.entry_count())
            .field("bytes", &self.cache.weighted_size())
            .finish()
    }
}

impl TileStore for MemoryTileStore {
    fn load(&self, key: &TileKey) -> Result<Option<StoredTile>, StorageError> {
        Ok(self.cache.get(key))
    }

    fn store(&self, key: &TileKey, tile: StoredTile) -> Result<(), StorageError> {
        self.cache.insert(key.clone(), tile);
        Ok(())
    }

    fn expiry(&self, key: &TileKey) -> Result<Option<i64>, StorageError> {
        Ok(self.cache.get(key).map(|tile| tile.expiry))
    }

    fn clear(&self) -> Result<CacheUsage, StorageError> {
        let usage = self.usage()?;
        self.cache.invalidate_all();
        self.cache.run_pending_tasks();
        Ok(usage)
    }

    fn usage(&self) -> Result<CacheUsage, StorageError> {
        // Sync counters with pending inserts and evictions
        self.cache.run_pending_tasks();
        Ok(CacheUsage {
            entries: self.cache.entry_count(),
            bytes: self.cache.weighted_size(),
        })
    }
}
