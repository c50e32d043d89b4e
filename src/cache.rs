// src/cache.rs

//! Content-addressed memoization for expensive deterministic transforms.
//!
//! Keys combine the transform identity with a blake3 hash of the source
//! bytes, so two different transforms over identical input never collide.
//! Entries are immutable per key; `put` writes temp-then-rename, which gives
//! key-level atomicity under concurrent writers (last writer wins, and both
//! wrote the same bytes anyway).
//!
//! The cache is a performance optimization, not a correctness requirement:
//! `get` degrades to a miss on any read error and `put` failures are logged
//! without failing the owning task.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, warn};

/// Disambiguates temp files when parallel writers race on one key.
static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone)]
pub struct Cache {
    root: PathBuf,
}

impl Cache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Cache key for `content` under a named transform.
    pub fn key(transform: &str, content: &[u8]) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(transform.as_bytes());
        hasher.update(&[0]);
        hasher.update(content);
        hasher.finalize().to_hex().to_string()
    }

    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        let path = self.entry_path(key);
        if !path.exists() {
            return None;
        }
        match fs::read(&path) {
            Ok(bytes) => {
                debug!(key, "cache hit");
                Some(bytes)
            }
            Err(err) => {
                warn!(key, error = %err, "cache entry unreadable; treating as miss");
                None
            }
        }
    }

    pub fn put(&self, key: &str, bytes: &[u8]) {
        if let Err(err) = self.try_put(key, bytes) {
            warn!(key, error = %err, "cache write failed; continuing without caching");
        }
    }

    fn try_put(&self, key: &str, bytes: &[u8]) -> std::io::Result<()> {
        fs::create_dir_all(&self.root)?;
        let path = self.entry_path(key);
        let tmp = self.root.join(format!(
            "{key}.tmp.{}.{}",
            std::process::id(),
            TMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, &path)?;
        debug!(key, len = bytes.len(), "cache entry stored");
        Ok(())
    }

    /// Full clean: delete the backing store entirely. There is no partial
    /// invalidation.
    pub fn clear(&self) -> std::io::Result<()> {
        if self.root.exists() {
            fs::remove_dir_all(&self.root)?;
        }
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }
}
