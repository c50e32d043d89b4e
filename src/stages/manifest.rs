// src/stages/manifest.rs

//! Precache manifest generation: enumerate the final root restricted to a
//! fixed set of subdirectory globs and publish the matched paths, plus a few
//! always-present entries, as a flat JSON array for the offline cache.
//!
//! Failure to enumerate the final root fails the stage; an empty match set
//! does not — it just reduces the manifest to the fixed entries.

use std::collections::HashSet;
use std::sync::Arc;

use globset::{Glob, GlobSetBuilder};

use crate::errors::TransformError;
use crate::graph::task::StageReport;
use crate::output;
use crate::pipeline::PipelineContext;

pub async fn generate(ctx: Arc<PipelineContext>) -> Result<StageReport, TransformError> {
    let paths = &ctx.config.paths;
    let manifest = &ctx.config.manifest;

    let mut builder = GlobSetBuilder::new();
    for pattern in &manifest.globs {
        let glob =
            Glob::new(pattern).map_err(|_| TransformError::Pattern(pattern.clone()))?;
        builder.add(glob);
    }
    let globs = builder
        .build()
        .map_err(|e| TransformError::Pattern(e.to_string()))?;

    if !paths.final_root.is_dir() {
        return Err(TransformError::io(
            format!("enumerating final root {:?}", paths.final_root),
            std::io::Error::new(std::io::ErrorKind::NotFound, "final root missing"),
        ));
    }

    let mut entries: Vec<String> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    // walk_files is sorted, so the manifest order is stable across runs.
    for file in output::walk_files(&paths.final_root)? {
        let Some(rel) = output::relative_str(&paths.final_root, &file) else {
            continue;
        };
        if globs.is_match(&rel) && seen.insert(rel.clone()) {
            entries.push(rel);
        }
    }

    for fixed in &manifest.extra_entries {
        if seen.insert(fixed.clone()) {
            entries.push(fixed.clone());
        }
    }

    let json = serde_json::to_vec(&entries)
        .map_err(|e| TransformError::io("encoding manifest".to_string(), e.into()))?;

    let target = paths.final_root.join(&manifest.file);
    output::atomic_write(&target, &json)?;

    Ok(StageReport {
        files: entries.len(),
        bytes: json.len() as u64,
    })
}
