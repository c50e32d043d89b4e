// src/stages/styles.rs

//! Style compilation: vendor-prefix to the transient root for fast dev
//! iteration, minify to the final root for deployment. The same stage runs
//! once over `styles/` and once over `components/`.

use std::sync::Arc;

use tracing::debug;

use crate::errors::TransformError;
use crate::fingerprint::{content_hash, FingerprintStore};
use crate::graph::task::StageReport;
use crate::output;
use crate::pipeline::PipelineContext;
use crate::stages::filters::{minify_styles, prefix_styles};

/// Compile every `*.css` under `<source>/<subdir>`.
///
/// Content-based change detection skips re-transforming unchanged files when
/// their outputs already exist; every input is still considered, so the
/// fingerprint store is an optimization and never a correctness gate.
pub async fn compile(
    ctx: Arc<PipelineContext>,
    subdir: &'static str,
) -> Result<StageReport, TransformError> {
    let paths = &ctx.config.paths;
    let root = paths.source_root.join(subdir);

    let mut store =
        FingerprintStore::load(paths.cache_dir.join(format!("fingerprints-{subdir}")));
    let mut report = StageReport::default();

    for file in output::walk_files(&root)? {
        if file.extension().and_then(|e| e.to_str()) != Some("css") {
            continue;
        }
        let Some(rel) = output::relative_str(&root, &file) else {
            continue;
        };

        let bytes = output::read(&file)?;
        let hash = content_hash(&bytes);

        let dev_out = paths.transient_root.join(subdir).join(&rel);
        let dist_out = paths.final_root.join(subdir).join(&rel);

        report.files += 1;

        if store.is_unchanged(&rel, &hash) && dev_out.exists() && dist_out.exists() {
            debug!(file = %rel, "style unchanged; skipping transform");
            continue;
        }

        let source = String::from_utf8_lossy(&bytes);
        let prefixed = prefix_styles(&source);
        let minified = minify_styles(&prefixed);

        output::atomic_write(&dev_out, prefixed.as_bytes())?;
        output::atomic_write(&dist_out, minified.as_bytes())?;
        report.bytes += (prefixed.len() + minified.len()) as u64;

        store.record(rel, hash);
    }

    store.save();
    Ok(report)
}
