// src/config/validate.rs

use anyhow::{anyhow, Result};
use globset::Glob;

use crate::config::model::ProjectConfig;

/// Semantic validation of a loaded configuration.
///
/// Checks:
/// - the three roots are pairwise distinct (stages partition the namespace
///   by path; overlapping roots would let one stage clobber another's output)
/// - the manifest globs compile
/// - the bundle entry is non-empty
/// - the debounce window is non-zero
pub fn validate_config(cfg: &ProjectConfig) -> Result<()> {
    let roots = [
        ("paths.source_root", &cfg.paths.source_root),
        ("paths.transient_root", &cfg.paths.transient_root),
        ("paths.final_root", &cfg.paths.final_root),
    ];
    for (i, (name_a, a)) in roots.iter().enumerate() {
        for (name_b, b) in roots.iter().skip(i + 1) {
            if a == b {
                return Err(anyhow!("{name_a} and {name_b} must differ (both {a:?})"));
            }
        }
    }

    for pattern in &cfg.manifest.globs {
        Glob::new(pattern)
            .map_err(|e| anyhow!("invalid [manifest] glob '{pattern}': {e}"))?;
    }

    if cfg.bundle.entry.trim().is_empty() {
        return Err(anyhow!("[bundle].entry must not be empty"));
    }

    if cfg.watch.debounce_ms == 0 {
        return Err(anyhow!("[watch].debounce_ms must be >= 1 (got 0)"));
    }

    Ok(())
}
