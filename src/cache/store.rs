// Cache store for raw Conduit response bodies.
// Handles filesystem persistence, optional max-age checks and an in-memory variant.

use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, SystemTime};

use crate::error::Result;

use super::fingerprint::RequestFingerprint;
use super::paths::entry_path;

/// Storage for raw response bodies keyed by request fingerprint.
///
/// Implementations decide the staleness policy; the Conduit client only
/// asks for a body and stores new ones.
pub trait ResponseCache {
    /// Return the stored body, or `None` when nothing usable is cached.
    fn get(&self, fingerprint: &RequestFingerprint) -> Result<Option<Vec<u8>>>;

    /// Persist a body under its fingerprint.
    fn put(&self, fingerprint: &RequestFingerprint, body: &[u8]) -> Result<()>;
}

/// One file per fingerprint under a root directory.
#[derive(Debug, Clone)]
pub struct DiskCache {
    root: PathBuf,
    max_age: Option<Duration>,
}

impl DiskCache {
    /// Create a cache that keeps entries forever.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            max_age: None,
        }
    }

    /// Treat entries older than `max_age` as absent.
    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = Some(max_age);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn is_expired(&self, path: &Path) -> io::Result<bool> {
        let Some(max_age) = self.max_age else {
            return Ok(false);
        };

        let modified = fs::metadata(path)?.modified()?;
        let elapsed = SystemTime::now()
            .duration_since(modified)
            .unwrap_or(Duration::ZERO);

        Ok(elapsed > max_age)
    }
}

impl ResponseCache for DiskCache {
    fn get(&self, fingerprint: &RequestFingerprint) -> Result<Option<Vec<u8>>> {
        let path = entry_path(&self.root, fingerprint);
        if !path.exists() {
            return Ok(None);
        }

        if self.is_expired(&path)? {
            tracing::debug!(path = %path.display(), "cache entry expired");
            return Ok(None);
        }

        let contents = fs::read(&path)?;
        Ok(Some(contents))
    }

    fn put(&self, fingerprint: &RequestFingerprint, body: &[u8]) -> Result<()> {
        fs::create_dir_all(&self.root)?;
        let path = entry_path(&self.root, fingerprint);

        // Write atomically via temp file
        let temp_path = path.with_extension("tmp");
        let mut file = fs::File::create(&temp_path)?;
        file.write_all(body)?;
        file.sync_all()?;
        fs::rename(&temp_path, &path)?;

        Ok(())
    }
}

/// Process-local cache, used when the disk cache is disabled.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<RequestFingerprint, Vec<u8>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }
}

impl ResponseCache for MemoryCache {
    fn get(&self, fingerprint: &RequestFingerprint) -> Result<Option<Vec<u8>>> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| io::Error::other("memory cache lock poisoned"))?;
        Ok(entries.get(fingerprint).cloned())
    }

    fn put(&self, fingerprint: &RequestFingerprint, body: &[u8]) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| io::Error::other("memory cache lock poisoned"))?;
        entries.insert(fingerprint.clone(), body.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::fingerprint;
    use serde_json::json;
    use tempfile::TempDir;

    fn fp(n: u32) -> RequestFingerprint {
        fingerprint("https://phab.example.com/api/feed.query", &json!({ "n": n }))
    }

    #[test]
    fn test_disk_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let cache = DiskCache::new(temp_dir.path());
        let body = br#"{"result":[],"error_code":null,"error_info":null}"#;

        cache.put(&fp(1), body).unwrap();

        assert_eq!(cache.get(&fp(1)).unwrap(), Some(body.to_vec()));
    }

    #[test]
    fn test_put_creates_missing_directory() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("nested").join("conduit");
        let cache = DiskCache::new(&root);

        cache.put(&fp(2), b"{}").unwrap();

        assert!(root.is_dir());
        assert!(entry_path(&root, &fp(2)).is_file());
        assert!(!entry_path(&root, &fp(2)).with_extension("tmp").exists());
    }

    #[test]
    fn test_get_unknown_is_none() {
        let temp_dir = TempDir::new().unwrap();
        let cache = DiskCache::new(temp_dir.path().join("never-created"));

        assert_eq!(cache.get(&fp(3)).unwrap(), None);
    }

    #[test]
    fn test_max_age_expires_entries() {
        let temp_dir = TempDir::new().unwrap();
        let fresh = DiskCache::new(temp_dir.path()).with_max_age(Duration::from_secs(3600));
        fresh.put(&fp(4), b"{}").unwrap();
        assert!(fresh.get(&fp(4)).unwrap().is_some());

        let expired = DiskCache::new(temp_dir.path()).with_max_age(Duration::ZERO);
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(expired.get(&fp(4)).unwrap(), None);
    }

    #[test]
    fn test_memory_round_trip() {
        let cache = MemoryCache::new();
        assert_eq!(cache.get(&fp(5)).unwrap(), None);

        cache.put(&fp(5), b"first").unwrap();
        cache.put(&fp(6), b"second").unwrap();

        assert_eq!(cache.get(&fp(5)).unwrap(), Some(b"first".to_vec()));
        assert_eq!(cache.len(), 2);
    }
}
