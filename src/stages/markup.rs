// src/stages/markup.rs

//! Markup optimization for top-level documents: rewrite component references
//! to the inlined artifact, inline locally resolvable scripts and styles,
//! minify everything, and write the result into the final root.
//!
//! References that do not resolve locally (CDN URLs, dev-server-provided
//! paths) are left as-is; only the import-inline stage treats an unresolved
//! reference as fatal.

use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

use regex::Regex;
use tracing::debug;

use crate::errors::TransformError;
use crate::graph::task::StageReport;
use crate::output;
use crate::pipeline::PipelineContext;
use crate::stages::filters::{minify_markup, minify_scripts, minify_styles};
use crate::stages::{
    is_local_ref, rewrite_matches, COMPONENTS_DIR, COMPONENTS_FILE, INLINED_COMPONENTS_FILE,
};

static SCRIPT_SRC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<script\s+[^>]*src\s*=\s*["']([^"']+)["'][^>]*>\s*</script>"#).unwrap()
});
static STYLESHEET_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<link\s+[^>]*rel\s*=\s*["']stylesheet["'][^>]*href\s*=\s*["']([^"']+)["'][^>]*>"#)
        .unwrap()
});

/// Directories under the source root whose markup is handled elsewhere.
const EXCLUDED_DIRS: &[&str] = &[COMPONENTS_DIR, "test"];

pub async fn optimize(ctx: Arc<PipelineContext>) -> Result<StageReport, TransformError> {
    let paths = &ctx.config.paths;
    // Assets referenced from markup may live in the transient tree (compiled
    // styles), the source tree, or the final tree (bundled scripts copied
    // earlier), searched in that order.
    let search_roots = [
        paths.transient_root.clone(),
        paths.source_root.clone(),
        paths.final_root.clone(),
    ];

    let mut report = StageReport::default();

    for file in output::walk_files(&paths.source_root)? {
        let Some(rel) = output::relative_str(&paths.source_root, &file) else {
            continue;
        };
        if file.extension().and_then(|e| e.to_str()) != Some("html") {
            continue;
        }
        if EXCLUDED_DIRS
            .iter()
            .any(|dir| rel.starts_with(&format!("{dir}/")))
        {
            continue;
        }

        let source = output::read_to_string(&file)?;
        let doc_dir = Path::new(&rel).parent().unwrap_or(Path::new(""));

        let rewritten = source.replace(COMPONENTS_FILE, INLINED_COMPONENTS_FILE);
        let inlined = inline_references(&rewritten, doc_dir, &search_roots)?;
        let minified = minify_markup(&inlined);

        let target = paths.final_root.join(&rel);
        output::atomic_write(&target, minified.as_bytes())?;
        report.files += 1;
        report.bytes += minified.len() as u64;
    }

    Ok(report)
}

fn inline_references(
    html: &str,
    doc_dir: &Path,
    search_roots: &[PathBuf],
) -> Result<String, TransformError> {
    let scripts_done = rewrite_matches(html, &SCRIPT_SRC_RE, |caps| {
        let src = &caps[1];
        match find_asset(src, doc_dir, search_roots) {
            Some(path) => {
                debug!(src, ?path, "inlining script");
                let contents = output::read_to_string(&path)?;
                Ok(Some(format!("<script>{}</script>", minify_scripts(&contents))))
            }
            None => Ok(None),
        }
    })?;

    rewrite_matches(&scripts_done, &STYLESHEET_RE, |caps| {
        let href = &caps[1];
        match find_asset(href, doc_dir, search_roots) {
            Some(path) => {
                debug!(href, ?path, "inlining stylesheet");
                let contents = output::read_to_string(&path)?;
                Ok(Some(format!("<style>{}</style>", minify_styles(&contents))))
            }
            None => Ok(None),
        }
    })
}

/// Resolve a reference relative to the document's directory within each
/// search root; `/absolute` references resolve against the roots directly.
fn find_asset(href: &str, doc_dir: &Path, search_roots: &[PathBuf]) -> Option<PathBuf> {
    if !is_local_ref(href) {
        return None;
    }
    let rel: PathBuf = match href.strip_prefix('/') {
        Some(abs) => PathBuf::from(abs),
        None => doc_dir.join(href),
    };
    search_roots
        .iter()
        .map(|root| root.join(&rel))
        .find(|candidate| candidate.is_file())
}
