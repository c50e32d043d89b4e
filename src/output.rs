// src/output.rs

//! Output tree helpers.
//!
//! The pipeline writes into two roots: a transient root for intermediate dev
//! artifacts and a final root for deployable output. Everything user-visible
//! under the final root goes through [`atomic_write`]: bytes land in a
//! sibling temp file and are renamed into place, so a cancelled process never
//! leaves a partially written file visible.

use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::TransformError;

/// Write `bytes` to `path` atomically (temp file + rename), creating parent
/// directories as needed.
pub fn atomic_write(path: &Path, bytes: &[u8]) -> Result<(), TransformError> {
    ensure_parent(path)?;

    let tmp = temp_sibling(path);
    fs::write(&tmp, bytes).map_err(|e| TransformError::io(format!("writing {:?}", tmp), e))?;
    fs::rename(&tmp, path).map_err(|e| {
        let _ = fs::remove_file(&tmp);
        TransformError::io(format!("moving {:?} into place", path), e)
    })
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "out".into());
    name.push(".tmp-pipewright");
    path.with_file_name(name)
}

pub fn read(path: &Path) -> Result<Vec<u8>, TransformError> {
    fs::read(path).map_err(|e| TransformError::io(format!("reading {:?}", path), e))
}

pub fn read_to_string(path: &Path) -> Result<String, TransformError> {
    fs::read_to_string(path).map_err(|e| TransformError::io(format!("reading {:?}", path), e))
}

pub fn ensure_parent(path: &Path) -> Result<(), TransformError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| TransformError::io(format!("creating directory {:?}", parent), e))?;
    }
    Ok(())
}

/// Copy a single file, atomically on the destination side.
pub fn copy_file(src: &Path, dst: &Path) -> Result<u64, TransformError> {
    let bytes = read(src)?;
    let len = bytes.len() as u64;
    atomic_write(dst, &bytes)?;
    Ok(len)
}

/// Recursively collect every file under `root`, sorted for deterministic
/// iteration. A missing root yields an empty list.
pub fn walk_files(root: &Path) -> Result<Vec<PathBuf>, TransformError> {
    let mut files = Vec::new();
    if root.exists() {
        collect(root, &mut files)?;
        files.sort();
    }
    Ok(files)
}

fn collect(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), TransformError> {
    let entries =
        fs::read_dir(dir).map_err(|e| TransformError::io(format!("listing {:?}", dir), e))?;
    for entry in entries {
        let entry = entry.map_err(|e| TransformError::io(format!("listing {:?}", dir), e))?;
        let path = entry.path();
        if path.is_dir() {
            collect(&path, out)?;
        } else {
            out.push(path);
        }
    }
    Ok(())
}

/// Delete a file or directory tree if present.
pub fn remove_if_exists(path: &Path) -> Result<(), TransformError> {
    let result = if path.is_dir() {
        fs::remove_dir_all(path)
    } else if path.exists() {
        fs::remove_file(path)
    } else {
        Ok(())
    };
    result.map_err(|e| TransformError::io(format!("removing {:?}", path), e))
}

/// Path relative to `root`, with forward slashes. `None` if `path` is not
/// under `root`.
pub fn relative_str(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    Some(rel.to_string_lossy().replace('\\', "/"))
}
