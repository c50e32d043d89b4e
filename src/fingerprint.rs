// src/fingerprint.rs

//! Persisted per-file content hashes, used by the style stage to skip
//! re-transforming files that have not changed since the last invocation.
//!
//! The store is a line-based `relative-path <whitespace> hex-hash` text file
//! under the cache directory. Change detection is an optimization, not a
//! correctness gate, so any load/save failure degrades to "everything
//! changed" with a warning.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;

use tracing::warn;

pub fn content_hash(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}

#[derive(Debug)]
pub struct FingerprintStore {
    path: PathBuf,
    entries: HashMap<String, String>,
}

impl FingerprintStore {
    /// Load the store at `path`; missing or unreadable files yield an empty
    /// store.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match read_entries(&path) {
            Ok(entries) => entries,
            Err(err) => {
                warn!(?path, error = %err, "fingerprint store unreadable; treating all files as changed");
                HashMap::new()
            }
        };
        Self { path, entries }
    }

    pub fn is_unchanged(&self, rel: &str, hash: &str) -> bool {
        self.entries.get(rel).is_some_and(|h| h == hash)
    }

    pub fn record(&mut self, rel: impl Into<String>, hash: impl Into<String>) {
        self.entries.insert(rel.into(), hash.into());
    }

    /// Persist the store; failures are logged and swallowed.
    pub fn save(&self) {
        if let Err(err) = self.write_entries() {
            warn!(path = ?self.path, error = %err, "failed to persist fingerprints");
        }
    }

    fn write_entries(&self) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut writer = BufWriter::new(File::create(&self.path)?);
        let mut entries: Vec<_> = self.entries.iter().collect();
        entries.sort();
        for (rel, hash) in entries {
            writeln!(writer, "{rel} {hash}")?;
        }
        writer.flush()
    }
}

fn read_entries(path: &PathBuf) -> std::io::Result<HashMap<String, String>> {
    if !path.exists() {
        return Ok(HashMap::new());
    }
    let reader = BufReader::new(File::open(path)?);
    let mut map = HashMap::new();
    for line in reader.lines() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some((rel, hash)) = trimmed.split_once(char::is_whitespace) {
            map.insert(rel.to_string(), hash.trim().to_string());
        }
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_survive_a_save_load_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state/fingerprints");

        let mut store = FingerprintStore::load(&path);
        let hash = content_hash(b"body {}");
        assert!(!store.is_unchanged("styles/main.css", &hash));

        store.record("styles/main.css", &hash);
        store.save();

        let store = FingerprintStore::load(&path);
        assert!(store.is_unchanged("styles/main.css", &hash));
        assert!(!store.is_unchanged("styles/main.css", &content_hash(b"other")));
    }
}
