// src/stages/bundle.rs

//! Script bundling: starting from a single entry point, resolve every
//! statically required relative module and concatenate the lot into one
//! bundle, dependencies first.
//!
//! Bare specifiers (no `./` or `../` prefix) are treated as externals
//! provided by the runtime environment and left alone; a relative specifier
//! that cannot be resolved fails the whole stage.

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, LazyLock};

use regex::Regex;

use crate::errors::TransformError;
use crate::graph::task::StageReport;
use crate::output;
use crate::pipeline::PipelineContext;

static REQUIRE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"require\(\s*['"]([^'"]+)['"]\s*\)"#).unwrap());
static IMPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^\s*import\s+(?:[\w$*{},\s]+\s+from\s+)?['"]([^'"]+)['"]"#).unwrap()
});

pub async fn bundle(ctx: Arc<PipelineContext>) -> Result<StageReport, TransformError> {
    let paths = &ctx.config.paths;
    let entry = normalize(&paths.source_root.join(&ctx.config.bundle.entry));
    if !entry.is_file() {
        return Err(TransformError::MissingEntry(entry));
    }

    let mut visited = HashSet::new();
    let mut modules: Vec<(PathBuf, String)> = Vec::new();
    resolve_module(&paths.source_root, &entry, &mut visited, &mut modules)?;

    let mut out = String::new();
    for (path, source) in &modules {
        let label = output::relative_str(&paths.source_root, path)
            .unwrap_or_else(|| path.display().to_string());
        out.push_str(&format!("// module: {label}\n"));
        out.push_str(source);
        if !source.ends_with('\n') {
            out.push('\n');
        }
    }

    let target = paths.source_root.join(&ctx.config.bundle.output);
    output::atomic_write(&target, out.as_bytes())?;

    Ok(StageReport {
        files: modules.len(),
        bytes: out.len() as u64,
    })
}

/// Depth-first, post-order: a module's dependencies are emitted before it.
fn resolve_module(
    source_root: &Path,
    path: &Path,
    visited: &mut HashSet<PathBuf>,
    modules: &mut Vec<(PathBuf, String)>,
) -> Result<(), TransformError> {
    if !visited.insert(path.to_path_buf()) {
        return Ok(());
    }

    let source = output::read_to_string(path)?;

    for spec in specifiers(&source) {
        if !spec.starts_with("./") && !spec.starts_with("../") {
            continue;
        }
        let base = path.parent().unwrap_or(source_root);
        let resolved = resolve_specifier(base, &spec).ok_or_else(|| {
            TransformError::UnresolvedModule {
                spec: spec.clone(),
                from: path.to_path_buf(),
            }
        })?;
        resolve_module(source_root, &resolved, visited, modules)?;
    }

    modules.push((path.to_path_buf(), source));
    Ok(())
}

fn specifiers(source: &str) -> Vec<String> {
    let mut specs = Vec::new();
    for caps in REQUIRE_RE.captures_iter(source) {
        specs.push(caps[1].to_string());
    }
    for caps in IMPORT_RE.captures_iter(source) {
        specs.push(caps[1].to_string());
    }
    specs
}

/// Resolve a relative specifier with extension completion: `./x` tries `x`,
/// `x.js`, then `x/index.js`. The result is lexically normalized so aliased
/// specifiers (`./shared` vs `../app/shared`) map to one path in the visited
/// set and one module label.
fn resolve_specifier(base: &Path, spec: &str) -> Option<PathBuf> {
    let raw = base.join(spec);
    if raw.is_file() {
        return Some(normalize(&raw));
    }
    let with_ext = base.join(format!("{spec}.js"));
    if with_ext.is_file() {
        return Some(normalize(&with_ext));
    }
    let index = raw.join("index.js");
    if index.is_file() {
        return Some(normalize(&index));
    }
    None
}

/// Fold `.` and `..` path components without touching the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProjectConfig;

    fn fixture() -> (tempfile::TempDir, Arc<PipelineContext>) {
        let dir = tempfile::tempdir().unwrap();
        let cfg = ProjectConfig::default().resolve_against(dir.path());
        let ctx = Arc::new(PipelineContext::new(cfg));
        (dir, ctx)
    }

    fn write(dir: &tempfile::TempDir, rel: &str, contents: &str) {
        let path = dir.path().join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }

    #[tokio::test]
    async fn bundles_dependencies_before_dependents() {
        let (dir, ctx) = fixture();
        write(&dir, "client/app/main.js", "var util = require('./util');\nmain();\n");
        write(&dir, "client/app/util.js", "function util() {}\n");

        let report = bundle(Arc::clone(&ctx)).await.unwrap();
        assert_eq!(report.files, 2);

        let out = std::fs::read_to_string(dir.path().join("client/scripts/bundle.js")).unwrap();
        let util_pos = out.find("function util").unwrap();
        let main_pos = out.find("main();").unwrap();
        assert!(util_pos < main_pos);
        assert!(out.contains("// module: app/util.js"));
    }

    #[tokio::test]
    async fn shared_modules_are_emitted_once() {
        let (dir, ctx) = fixture();
        write(
            &dir,
            "client/app/main.js",
            "import './a';\nimport './b';\n",
        );
        write(&dir, "client/app/a.js", "import shared from './shared';\n");
        write(&dir, "client/app/b.js", "import shared from './shared';\n");
        write(&dir, "client/app/shared.js", "export default 1;\n");

        bundle(Arc::clone(&ctx)).await.unwrap();
        let out = std::fs::read_to_string(dir.path().join("client/scripts/bundle.js")).unwrap();
        assert_eq!(out.matches("// module: app/shared.js").count(), 1);
    }

    #[tokio::test]
    async fn aliased_specifiers_resolve_to_one_module() {
        let (dir, ctx) = fixture();
        write(&dir, "client/app/main.js", "import './a';\nimport './b';\n");
        write(&dir, "client/app/a.js", "var s = require('./shared');\n");
        write(&dir, "client/app/b.js", "var s = require('../app/shared');\n");
        write(&dir, "client/app/shared.js", "function shared() {}\n");

        bundle(Arc::clone(&ctx)).await.unwrap();
        let out = std::fs::read_to_string(dir.path().join("client/scripts/bundle.js")).unwrap();
        assert_eq!(out.matches("function shared").count(), 1);
        assert_eq!(out.matches("// module: app/shared.js").count(), 1);
        assert!(!out.contains("/./") && !out.contains("/../"));
    }

    #[tokio::test]
    async fn missing_entry_fails() {
        let (_dir, ctx) = fixture();
        let err = bundle(ctx).await.unwrap_err();
        assert!(matches!(err, TransformError::MissingEntry(_)));
    }

    #[tokio::test]
    async fn unresolved_relative_module_fails() {
        let (dir, ctx) = fixture();
        write(&dir, "client/app/main.js", "require('./missing');\n");

        let err = bundle(ctx).await.unwrap_err();
        assert!(matches!(
            err,
            TransformError::UnresolvedModule { spec, .. } if spec == "./missing"
        ));
    }

    #[tokio::test]
    async fn bare_specifiers_are_externals() {
        let (dir, ctx) = fixture();
        write(&dir, "client/app/main.js", "var fs = require('runtime-env');\n");
        bundle(ctx).await.unwrap();
    }
}
