// src/pipeline.rs

//! The wiring layer: shared context, the fixed task registry, and the watch
//! routes that map changed files back onto tasks.

use std::sync::Arc;

use crate::cache::Cache;
use crate::config::ProjectConfig;
use crate::errors::PipelineError;
use crate::graph::graph::TaskGraph;
use crate::graph::task::action;
use crate::stages;
use crate::stages::images::{CommandOptimizer, ImageOptimizer, PassthroughOptimizer};
use crate::watch::routes::RouteTable;

/// Everything a stage needs at run time. Built once per invocation and shared
/// by `Arc` into every task action.
#[derive(Debug)]
pub struct PipelineContext {
    pub config: ProjectConfig,
    pub cache: Cache,
}

impl PipelineContext {
    pub fn new(config: ProjectConfig) -> Self {
        let cache = Cache::new(&config.paths.cache_dir);
        Self { config, cache }
    }
}

/// Targets a full build runs, in request order. `manifest` pulls in the whole
/// markup chain through its dependencies; `images` and `fonts` are
/// independent branches.
pub const BUILD_TARGETS: &[&str] = &["manifest", "images", "fonts"];

/// Tasks run once before watching starts, so the first change event patches a
/// populated output tree instead of an empty one.
pub const WATCH_PREREQUISITES: &[&str] = &["styles", "component-styles", "bundle", "images"];

/// Build the fixed task registry over `ctx`.
///
/// Dependency edges exist only where one task consumes another's output:
/// `markup` inlines compiled styles and the bundle and rewrites paths that
/// `copy` established, `inline` operates on the seed `copy` placed (reached
/// through `markup`), and `manifest` enumerates what the others produced.
/// `clean` takes part in the graph so a full rebuild can order it first, but
/// nothing depends on it, which keeps watch-triggered re-runs of leaf tasks
/// from wiping the output tree.
pub fn registry(ctx: &Arc<PipelineContext>) -> Result<TaskGraph, PipelineError> {
    let mut graph = TaskGraph::new();

    let c = Arc::clone(ctx);
    graph.register("clean", &[], action(move || stages::assets::clean(Arc::clone(&c))))?;

    let c = Arc::clone(ctx);
    graph.register("copy", &[], action(move || stages::assets::copy_static(Arc::clone(&c))))?;

    let c = Arc::clone(ctx);
    graph.register("fonts", &[], action(move || stages::assets::copy_fonts(Arc::clone(&c))))?;

    let c = Arc::clone(ctx);
    graph.register(
        "styles",
        &[],
        action(move || stages::styles::compile(Arc::clone(&c), stages::STYLES_DIR)),
    )?;

    let c = Arc::clone(ctx);
    graph.register(
        "component-styles",
        &[],
        action(move || stages::styles::compile(Arc::clone(&c), stages::COMPONENTS_DIR)),
    )?;

    let c = Arc::clone(ctx);
    graph.register("bundle", &[], action(move || stages::bundle::bundle(Arc::clone(&c))))?;

    let c = Arc::clone(ctx);
    let optimizer = image_optimizer(&ctx.config);
    graph.register(
        "images",
        &[],
        action(move || stages::images::optimize(Arc::clone(&c), Arc::clone(&optimizer))),
    )?;

    let c = Arc::clone(ctx);
    graph.register(
        "markup",
        &["copy", "styles", "bundle"],
        action(move || stages::markup::optimize(Arc::clone(&c))),
    )?;

    let c = Arc::clone(ctx);
    graph.register(
        "inline",
        &["markup", "component-styles"],
        action(move || stages::inline::inline(Arc::clone(&c))),
    )?;

    let c = Arc::clone(ctx);
    graph.register(
        "manifest",
        &["inline", "component-styles"],
        action(move || stages::manifest::generate(Arc::clone(&c))),
    )?;

    Ok(graph)
}

fn image_optimizer(config: &ProjectConfig) -> Arc<dyn ImageOptimizer> {
    match &config.images.optimizer {
        Some(cmd) => Arc::new(CommandOptimizer::new(cmd.clone())),
        None => Arc::new(PassthroughOptimizer),
    }
}

/// Watch routes: source-relative glob patterns to the tasks a matching change
/// re-runs. Patterns are matched against paths relative to the source root.
pub fn routes(config: &ProjectConfig) -> Result<RouteTable, PipelineError> {
    let entry_dir = std::path::Path::new(&config.bundle.entry)
        .parent()
        .and_then(|p| p.to_str())
        .filter(|p| !p.is_empty())
        .unwrap_or("app");

    RouteTable::builder()
        .route(&[format!("{}/**/*.css", stages::STYLES_DIR)], &["styles"])
        .route(
            &[format!("{}/**/*.css", stages::COMPONENTS_DIR)],
            &["component-styles"],
        )
        .route(
            &[format!("{entry_dir}/**/*.js"), format!("{entry_dir}/**/*.json")],
            &["bundle"],
        )
        .route(&[format!("{}/**/*.*", stages::IMAGES_DIR)], &["images"])
        .route(
            &[
                "*.html".to_string(),
                format!("{}/**/*.html", stages::COMPONENTS_DIR),
            ],
            &["markup", "inline"],
        )
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn context() -> Arc<PipelineContext> {
        Arc::new(PipelineContext::new(ProjectConfig::default()))
    }

    #[test]
    fn registry_is_acyclic_and_complete() {
        let graph = registry(&context()).unwrap();
        graph.check_acyclic().unwrap();
        for target in BUILD_TARGETS.iter().chain(WATCH_PREREQUISITES) {
            assert!(graph.contains(target), "missing task {target}");
        }
        assert!(graph.contains("clean"));
    }

    #[test]
    fn full_build_does_not_pull_clean() {
        let graph = registry(&context()).unwrap();
        let members = graph.induced_subgraph(BUILD_TARGETS).unwrap();
        assert!(!members.contains("clean"));
        assert!(members.contains("copy"));
        assert!(members.contains("inline"));
    }

    #[test]
    fn routes_map_changed_paths_to_tasks() {
        let routes = routes(&ProjectConfig::default()).unwrap();
        assert_eq!(
            routes.matched_tasks(&[Path::new("styles/main.css")]),
            vec!["styles".to_string()]
        );
        assert_eq!(
            routes.matched_tasks(&[Path::new("app/services/auth.js")]),
            vec!["bundle".to_string()]
        );
        let markup = routes.matched_tasks(&[Path::new("index.html")]);
        assert!(markup.contains(&"markup".to_string()));
        assert!(routes.matched_tasks(&[Path::new("README.txt")]).is_empty());
    }
}
