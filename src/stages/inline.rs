// src/stages/inline.rs

//! Import inlining ("vulcanize"): turn the aggregated components file into a
//! single self-contained document with every nested import, script, and
//! style inlined and comments stripped.
//!
//! Unlike the markup stage, a reference that cannot be resolved here is
//! fatal: the inlined artifact must be complete, or dependent pages would
//! silently lose components.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

use regex::Regex;
use tracing::debug;

use crate::errors::TransformError;
use crate::graph::task::StageReport;
use crate::output;
use crate::pipeline::PipelineContext;
use crate::stages::filters::strip_markup_comments;
use crate::stages::{is_local_ref, rewrite_matches, INLINED_COMPONENTS_FILE};

static IMPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<link\s+[^>]*rel\s*=\s*["']import["'][^>]*href\s*=\s*["']([^"']+)["'][^>]*>"#)
        .unwrap()
});
static SCRIPT_SRC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<script\s+[^>]*src\s*=\s*["']([^"']+)["'][^>]*>\s*</script>"#).unwrap()
});
static STYLESHEET_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<link\s+[^>]*rel\s*=\s*["']stylesheet["'][^>]*href\s*=\s*["']([^"']+)["'][^>]*>"#)
        .unwrap()
});

/// Inline the final root's seeded components file in place.
pub async fn inline(ctx: Arc<PipelineContext>) -> Result<StageReport, TransformError> {
    let target = ctx.config.paths.final_root.join(INLINED_COMPONENTS_FILE);
    if !target.is_file() {
        return Err(TransformError::MissingEntry(target));
    }

    let mut seen = HashSet::new();
    let inlined = inline_document(&target, &mut seen)?;
    output::atomic_write(&target, inlined.as_bytes())?;

    Ok(StageReport {
        files: seen.len(),
        bytes: inlined.len() as u64,
    })
}

fn inline_document(path: &Path, seen: &mut HashSet<PathBuf>) -> Result<String, TransformError> {
    seen.insert(path.to_path_buf());
    let source = output::read_to_string(path)?;
    let base = path.parent().map(Path::to_path_buf).unwrap_or_default();

    let imports_done = rewrite_matches(&source, &IMPORT_RE, |caps| {
        let href = caps[1].to_string();
        if !is_local_ref(&href) {
            return Ok(None);
        }
        let resolved = resolve(&base, &href, path)?;
        if seen.contains(&resolved) {
            // An import pulled in more than once collapses to nothing; the
            // first occurrence already contributed its content.
            debug!(href, "duplicate import elided");
            return Ok(Some(String::new()));
        }
        debug!(href, "inlining import");
        inline_document(&resolved, seen).map(Some)
    })?;

    let scripts_done = rewrite_matches(&imports_done, &SCRIPT_SRC_RE, |caps| {
        let src = caps[1].to_string();
        if !is_local_ref(&src) {
            return Ok(None);
        }
        let resolved = resolve(&base, &src, path)?;
        seen.insert(resolved.clone());
        let contents = output::read_to_string(&resolved)?;
        Ok(Some(format!("<script>{contents}</script>")))
    })?;

    let styles_done = rewrite_matches(&scripts_done, &STYLESHEET_RE, |caps| {
        let href = caps[1].to_string();
        if !is_local_ref(&href) {
            return Ok(None);
        }
        let resolved = resolve(&base, &href, path)?;
        seen.insert(resolved.clone());
        let contents = output::read_to_string(&resolved)?;
        Ok(Some(format!("<style>{contents}</style>")))
    })?;

    Ok(strip_markup_comments(&styles_done))
}

fn resolve(base: &Path, href: &str, from: &Path) -> Result<PathBuf, TransformError> {
    let candidate = base.join(href);
    if candidate.is_file() {
        Ok(candidate)
    } else {
        Err(TransformError::UnresolvedImport {
            href: href.to_string(),
            from: from.to_path_buf(),
        })
    }
}
