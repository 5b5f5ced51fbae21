//! On-disk tile store.
//!
//! Each tile is one file under a per-session directory:
//!
//! ```text
//! {root}/{session digest}/{z}/{x}/{y}.tile
//! ```
//!
//! The session digest is the first 16 hex digits of the SHA-256 of the
//! session string, so arbitrary tile-server URLs map to safe directory names.
//!
//! # File Format
//!
//! A bincode-encoded [`TileHeader`] (expiry and payload length) followed by
//! the raw image bytes. Reading the expiry only touches the header.
//!
//! Writes go to a uniquely named temporary sibling that is renamed into
//! place, so a concurrent reader sees either the old entry or the new one.
//!
//! `usage` and `clear` only look inside session directories; anything else
//! under the root is left alone.

use std::ffi::OsStr;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::cache::traits::{CacheUsage, StorageError, StoredTile, TileStore};
use crate::coord::TileKey;

/// File extension for stored tiles.
const TILE_EXTENSION: &str = "tile";

/// Hex digits in a session directory name.
const SESSION_DIR_LEN: usize = 16;

/// Distinguishes temporary files of concurrent writes within one process.
static TMP_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Fixed-size header preceding the tile bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct TileHeader {
    expiry: i64,
    len: u64,
}

/// Tile store persisting each tile as a file below a root directory.
///
/// Construction never touches the filesystem; directories are created on
/// first write. Every failure is reported per operation so callers can
/// degrade instead of failing at startup.
#[derive(Debug, Clone)]
pub struct DiskTileStore {
    root: PathBuf,
}

impl DiskTileStore {
    /// Creates a store rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory name for a session.
    fn session_dir(session: &str) -> String {
        let digest = Sha256::digest(session.as_bytes());
        digest[..SESSION_DIR_LEN / 2]
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect()
    }

    /// Returns true if `name` could have been produced by [`session_dir`](Self::session_dir).
    fn is_session_dir(name: &OsStr) -> bool {
        name.to_str().is_some_and(|name| {
            name.len() == SESSION_DIR_LEN
                && name
                    .bytes()
                    .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
        })
    }

    /// Session directories currently under the root.
    fn session_dirs(&self) -> io::Result<Vec<PathBuf>> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let mut dirs = Vec::new();
        for entry in entries {
            let entry = entry?;
            if entry.file_type()?.is_dir() && Self::is_session_dir(&entry.file_name()) {
                dirs.push(entry.path());
            }
        }
        Ok(dirs)
    }

    fn write_tile(path: &Path, header: &TileHeader, data: &[u8]) -> Result<(), StorageError> {
        let mut file = io::BufWriter::new(fs::File::create(path)?);
        bincode::serialize_into(&mut file, header)
            .map_err(|e| StorageError::Encode(e.to_string()))?;
        file.write_all(data)?;
        file.flush()?;
        Ok(())
    }

    /// Constructs the path for a tile file.
    fn tile_path(&self, key: &TileKey) -> PathBuf {
        self.root
            .join(Self::session_dir(&key.session))
            .join(key.z.to_string())
            .join(key.x.to_string())
            .join(format!("{}.{}", key.y, TILE_EXTENSION))
    }

    fn decode(key: &TileKey, bytes: &[u8]) -> Result<StoredTile, StorageError> {
        let mut payload = bytes;
        let header: TileHeader =
            bincode::deserialize_from(&mut payload).map_err(|e| StorageError::Corrupt {
                key: key.to_string(),
                reason: e.to_string(),
            })?;

        if payload.len() as u64 != header.len {
            return Err(StorageError::Corrupt {
                key: key.to_string(),
                reason: format!(
                    "expected {} payload bytes, found {}",
                    header.len,
                    payload.len()
                ),
            });
        }

        Ok(StoredTile::new(header.expiry, payload.to_vec()))
    }
}

impl TileStore for DiskTileStore {
    fn load(&self, key: &TileKey) -> Result<Option<StoredTile>, StorageError> {
        let path = self.tile_path(key);
        match fs::read(&path) {
            Ok(bytes) => Self::decode(key, &bytes).map(Some),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn store(&self, key: &TileKey, tile: StoredTile) -> Result<(), StorageError> {
        let path = self.tile_path(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let header = TileHeader {
            expiry: tile.expiry,
            len: tile.data.len() as u64,
        };

        let tmp_path = path.with_file_name(format!(
            "{}.{}-{}.tmp",
            key.y,
            process::id(),
            TMP_SEQUENCE.fetch_add(1, Ordering::Relaxed)
        ));
        let written = Self::write_tile(&tmp_path, &header, &tile.data)
            .and_then(|()| fs::rename(&tmp_path, &path).map_err(StorageError::from));
        if let Err(e) = written {
            let _ = fs::remove_file(&tmp_path);
            return Err(e);
        }

        debug!(key = %key, bytes = tile.data.len(), "Stored tile on disk");
        Ok(())
    }

    fn expiry(&self, key: &TileKey) -> Result<Option<i64>, StorageError> {
        let path = self.tile_path(key);
        let file = match fs::File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let header: TileHeader =
            bincode::deserialize_from(file).map_err(|e| StorageError::Corrupt {
                key: key.to_string(),
                reason: e.to_string(),
            })?;
        Ok(Some(header.expiry))
    }

    fn clear(&self) -> Result<CacheUsage, StorageError> {
        let mut usage = CacheUsage::default();
        for dir in self.session_dirs()? {
            walk_usage(&dir, &mut usage)?;
            fs::remove_dir_all(&dir)?;
        }
        Ok(usage)
    }

    fn usage(&self) -> Result<CacheUsage, StorageError> {
        let mut usage = CacheUsage::default();
        for dir in self.session_dirs()? {
            walk_usage(&dir, &mut usage)?;
        }
        Ok(usage)
    }
}

fn walk_usage(dir: &Path, usage: &mut CacheUsage) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        let path = entry.path();
        if file_type.is_dir() {
            walk_usage(&path, usage)?;
        } else if path.extension().is_some_and(|ext| ext == TILE_EXTENSION) {
            usage.entries += 1;
            usage.bytes += entry.metadata()?.len();
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(session: &str, z: u8, x: u32, y: u32) -> TileKey {
        TileKey::new(session, z, x, y)
    }

    #[test]
    fn test_tile_path_construction() {
        let store = DiskTileStore::new("/cache");
        let path = store.tile_path(&key("https://tile.example/{z}/{x}/{y}.png", 3, 4, 5));

        let session = DiskTileStore::session_dir("https://tile.example/{z}/{x}/{y}.png");
        assert_eq!(session.len(), 16);
        assert_eq!(
            path,
            PathBuf::from(format!("/cache/{}/3/4/5.tile", session))
        );
    }

    #[test]
    fn test_sessions_use_distinct_directories() {
        assert_ne!(
            DiskTileStore::session_dir("server-a"),
            DiskTileStore::session_dir("server-b")
        );
    }

    #[test]
    fn test_roundtrip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = DiskTileStore::new(temp_dir.path());
        let k = key("osm", 3, 1, 2);

        assert!(store.load(&k).unwrap().is_none());
        assert!(store.expiry(&k).unwrap().is_none());

        store
            .store(&k, StoredTile::new(12_345, vec![0x89, b'P', b'N', b'G']))
            .unwrap();

        let loaded = store.load(&k).unwrap().unwrap();
        assert_eq!(loaded.expiry, 12_345);
        assert_eq!(loaded.data, vec![0x89, b'P', b'N', b'G']);
        assert_eq!(store.expiry(&k).unwrap(), Some(12_345));
    }

    #[test]
    fn test_store_replaces_existing_entry() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = DiskTileStore::new(temp_dir.path());
        let k = key("osm", 3, 1, 2);

        store.store(&k, StoredTile::new(1, vec![1; 10])).unwrap();
        store.store(&k, StoredTile::new(2, vec![2; 3])).unwrap();

        assert_eq!(store.load(&k).unwrap(), Some(StoredTile::new(2, vec![2; 3])));
        assert_eq!(store.usage().unwrap().entries, 1);
    }

    #[test]
    fn test_sessions_are_isolated() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = DiskTileStore::new(temp_dir.path());

        store
            .store(&key("a", 3, 1, 2), StoredTile::new(1, vec![1]))
            .unwrap();
        assert!(store.load(&key("b", 3, 1, 2)).unwrap().is_none());
    }

    #[test]
    fn test_truncated_file_is_corrupt() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = DiskTileStore::new(temp_dir.path());
        let k = key("osm", 3, 1, 2);

        store.store(&k, StoredTile::new(1, vec![7; 32])).unwrap();
        let path = store.tile_path(&k);
        let bytes = fs::read(&path).unwrap();
        fs::write(&path, &bytes[..bytes.len() - 4]).unwrap();

        let result = store.load(&k);
        assert!(matches!(result, Err(StorageError::Corrupt { .. })));
    }

    #[test]
    fn test_usage_and_clear() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = DiskTileStore::new(temp_dir.path());

        store
            .store(&key("a", 1, 0, 0), StoredTile::new(1, vec![0; 100]))
            .unwrap();
        store
            .store(&key("a", 1, 1, 0), StoredTile::new(1, vec![0; 200]))
            .unwrap();
        store
            .store(&key("b", 2, 0, 0), StoredTile::new(1, vec![0; 50]))
            .unwrap();

        let usage = store.usage().unwrap();
        assert_eq!(usage.entries, 3);
        assert!(usage.bytes >= 350);

        let cleared = store.clear().unwrap();
        assert_eq!(cleared, usage);
        assert_eq!(store.usage().unwrap(), CacheUsage::default());
        assert!(store.load(&key("a", 1, 0, 0)).unwrap().is_none());
    }

    #[test]
    fn test_clear_keeps_foreign_entries() {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path();
        let store = DiskTileStore::new(root);

        fs::create_dir_all(root.join("Documents")).unwrap();
        fs::write(root.join("Documents").join("thesis.txt"), b"draft").unwrap();
        // Right length but not hex
        fs::create_dir_all(root.join("notes-about-maps").join("1")).unwrap();
        fs::write(root.join("notes-about-maps").join("1").join("2.tile"), b"x").unwrap();
        fs::write(root.join("README"), b"keep").unwrap();

        store
            .store(&key("osm", 1, 0, 0), StoredTile::new(1, vec![0; 10]))
            .unwrap();
        assert_eq!(store.usage().unwrap().entries, 1);

        let cleared = store.clear().unwrap();
        assert_eq!(cleared.entries, 1);
        assert!(store.load(&key("osm", 1, 0, 0)).unwrap().is_none());
        assert!(root.join("Documents").join("thesis.txt").exists());
        assert!(root.join("notes-about-maps").join("1").join("2.tile").exists());
        assert!(root.join("README").exists());
    }

    #[test]
    fn test_session_dir_names_are_recognised() {
        let name = DiskTileStore::session_dir("osm");
        assert!(DiskTileStore::is_session_dir(OsStr::new(&name)));
        assert!(!DiskTileStore::is_session_dir(OsStr::new("Documents")));
        assert!(!DiskTileStore::is_session_dir(OsStr::new("0123456789ABCDEF")));
        assert!(!DiskTileStore::is_session_dir(OsStr::new("0123456789abcde")));
    }

    #[test]
    fn test_failed_write_leaves_no_temp_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = DiskTileStore::new(temp_dir.path());
        let k = key("osm", 2, 1, 3);

        // A directory in place of the tile file makes the final rename fail
        let path = store.tile_path(&k);
        fs::create_dir_all(path.join("occupied")).unwrap();

        let result = store.store(&k, StoredTile::new(1, vec![5; 16]));
        assert!(result.is_err());

        let leftovers: Vec<_> = fs::read_dir(path.parent().unwrap())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .filter(|name| name.to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty(), "left behind {:?}", leftovers);
    }

    #[test]
    fn test_missing_root_reports_empty_usage() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = DiskTileStore::new(temp_dir.path().join("not-created-yet"));

        assert_eq!(store.usage().unwrap(), CacheUsage::default());
        assert_eq!(store.clear().unwrap(), CacheUsage::default());
    }

    #[test]
    fn test_unwritable_root_reports_error() {
        let temp_dir = tempfile::tempdir().unwrap();
        // A regular file where the root directory should be
        let blocker = temp_dir.path().join("blocker");
        fs::write(&blocker, b"not a directory").unwrap();
        let store = DiskTileStore::new(&blocker);

        let result = store.store(&key("osm", 1, 0, 0), StoredTile::new(1, vec![1]));
        assert!(matches!(result, Err(StorageError::Io(_))));
    }
}
