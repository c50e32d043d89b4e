//! End-to-end build over a small but complete project tree, plus the
//! watch-style partial re-run and clean/rebuild determinism.

use std::path::Path;
use std::sync::Arc;

use pipewright::config::ProjectConfig;
use pipewright::graph::Scheduler;
use pipewright::pipeline::{registry, PipelineContext, BUILD_TARGETS};

fn project() -> (tempfile::TempDir, Arc<PipelineContext>, Scheduler) {
    let dir = tempfile::tempdir().unwrap();
    seed_project(dir.path());
    let cfg = ProjectConfig::default().resolve_against(dir.path());
    let ctx = Arc::new(PipelineContext::new(cfg));
    let scheduler = Scheduler::new(registry(&ctx).unwrap());
    (dir, ctx, scheduler)
}

fn write(root: &Path, rel: &str, contents: &str) {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, contents).unwrap();
}

fn seed_project(root: &Path) {
    write(
        root,
        "client/index.html",
        concat!(
            "<html><head>\n",
            "<!-- page shell -->\n",
            "<link rel=\"import\" href=\"components/components.html\">\n",
            "<link rel=\"stylesheet\" href=\"styles/main.css\">\n",
            "<script src=\"scripts/bundle.js\"></script>\n",
            "</head><body><h1>hello</h1></body></html>\n",
        ),
    );
    write(root, "client/styles/main.css", "body {\n  user-select: none;\n}\n");
    write(
        root,
        "client/components/components.html",
        "<link rel=\"import\" href=\"button.html\">\n",
    );
    write(
        root,
        "client/components/button.html",
        "<link rel=\"stylesheet\" href=\"button.css\"><template>button</template>",
    );
    write(root, "client/components/button.css", "button { color: red; }\n");
    write(root, "client/app/main.js", "var u = require('./util');\nboot();\n");
    write(root, "client/app/util.js", "function u() {}\n");
    write(root, "client/images/logo.png", "png-bytes");
    write(root, "client/fonts/body.woff", "font-bytes");
}

#[tokio::test]
async fn full_build_produces_a_complete_output_tree() {
    let (dir, _ctx, scheduler) = project();

    scheduler.run(BUILD_TARGETS).await.unwrap();
    let dist = dir.path().join("dist");

    // Markup: minified, components reference rewritten, assets inlined.
    let index = std::fs::read_to_string(dist.join("index.html")).unwrap();
    assert!(index.contains("components/components.inlined.html"));
    assert!(index.contains("<style>body{"));
    assert!(index.contains("-webkit-user-select"));
    assert!(index.contains("boot();"));
    assert!(!index.contains("page shell"));

    // Styles: dev copy in the transient root, minified copy in dist.
    assert!(dir.path().join(".tmp/styles/main.css").exists());
    assert!(dist.join("styles/main.css").exists());

    // Inline: seed fully self-contained, component styles pulled in.
    let inlined =
        std::fs::read_to_string(dist.join("components/components.inlined.html")).unwrap();
    assert!(inlined.contains("<template>button</template>"));
    assert!(inlined.contains("<style>button{color:red}</style>"));
    assert!(!inlined.contains("rel=\"import\""));

    // Bundle landed in the source tree for inlining.
    let bundle = std::fs::read_to_string(dir.path().join("client/scripts/bundle.js")).unwrap();
    assert!(bundle.find("function u").unwrap() < bundle.find("boot();").unwrap());

    // Independent branches.
    assert!(dist.join("images/logo.png").exists());
    assert!(dist.join("fonts/body.woff").exists());

    // Manifest last: names the inlined artifact and the fixed entries.
    let manifest: Vec<String> =
        serde_json::from_slice(&std::fs::read(dist.join("precache.json")).unwrap()).unwrap();
    assert!(manifest.contains(&"components/components.inlined.html".to_string()));
    assert!(manifest.contains(&"index.html".to_string()));
}

/// A watch-triggered styles run must touch styles only, leaving the rest of
/// the output tree alone.
#[tokio::test]
async fn partial_rerun_leaves_unrelated_outputs_untouched() {
    let (dir, _ctx, scheduler) = project();
    scheduler.run(BUILD_TARGETS).await.unwrap();

    let index_before =
        std::fs::read_to_string(dir.path().join("dist/index.html")).unwrap();

    write(dir.path(), "client/styles/main.css", "body { color: blue; }\n");
    scheduler.run(&["styles"]).await.unwrap();

    let css = std::fs::read_to_string(dir.path().join("dist/styles/main.css")).unwrap();
    assert!(css.contains("blue"));

    let index_after =
        std::fs::read_to_string(dir.path().join("dist/index.html")).unwrap();
    assert_eq!(index_before, index_after);
}

#[tokio::test]
async fn clean_then_rebuild_is_deterministic() {
    let (dir, _ctx, scheduler) = project();

    scheduler.run(BUILD_TARGETS).await.unwrap();
    let first = std::fs::read_to_string(dir.path().join("dist/index.html")).unwrap();
    let first_manifest = std::fs::read(dir.path().join("dist/precache.json")).unwrap();

    scheduler.run(&["clean"]).await.unwrap();
    assert!(!dir.path().join("dist").exists());

    scheduler.run(BUILD_TARGETS).await.unwrap();
    let second = std::fs::read_to_string(dir.path().join("dist/index.html")).unwrap();
    let second_manifest = std::fs::read(dir.path().join("dist/precache.json")).unwrap();

    assert_eq!(first, second);
    assert_eq!(first_manifest, second_manifest);
}
