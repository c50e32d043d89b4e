// src/lib.rs

pub mod cache;
pub mod cli;
pub mod config;
pub mod errors;
pub mod fingerprint;
pub mod graph;
pub mod logging;
pub mod output;
pub mod pipeline;
pub mod stages;
pub mod watch;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::{info, warn};

use crate::cli::{CliArgs, Command};
use crate::config::load_or_default;
use crate::graph::scheduler::Scheduler;
use crate::pipeline::{registry, routes, PipelineContext, BUILD_TARGETS, WATCH_PREREQUISITES};

/// High-level entry point used by `main.rs`.
///
/// Wires together config loading, the task registry, the scheduler, and
/// (for `watch`/`serve`) the file watcher with Ctrl-C handling.
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let config = load_or_default(&config_path)?;

    let ctx = Arc::new(PipelineContext::new(config.clone()));
    let scheduler = Scheduler::new(registry(&ctx)?);

    match args.command {
        Command::Build { dry_run } => {
            if dry_run {
                print_dry_run(&scheduler)?;
                return Ok(());
            }
            let summary = scheduler.run(BUILD_TARGETS).await?;
            info!(tasks = summary.statuses.len(), "build complete");
            Ok(())
        }

        Command::Clean => {
            scheduler.run(&["clean"]).await?;
            ctx.cache
                .clear()
                .map_err(|e| errors::PipelineError::Config(format!("clearing cache: {e}")))?;
            info!("outputs and cache removed");
            Ok(())
        }

        Command::Watch => watch_loop(&ctx, &scheduler).await,

        Command::Serve => {
            info!(
                root = ?ctx.config.paths.final_root,
                "point your dev server at the final root"
            );
            watch_loop(&ctx, &scheduler).await
        }
    }
}

/// Build the watched stages once, then watch the source tree until Ctrl-C.
///
/// A failing initial build is logged but does not abort: watch mode exists
/// precisely so the next save can fix the tree.
async fn watch_loop(ctx: &Arc<PipelineContext>, scheduler: &Scheduler) -> Result<()> {
    if let Err(err) = scheduler.run(WATCH_PREREQUISITES).await {
        warn!(error = %err, "initial build failed; watching anyway");
    }

    let table = routes(&ctx.config)?;
    let debounce = Duration::from_millis(ctx.config.watch.debounce_ms);
    let controller = watch::spawn_watcher(
        ctx.config.paths.source_root.clone(),
        table,
        scheduler.clone(),
        debounce,
    )?;

    info!("watching for changes; Ctrl-C to stop");
    tokio::signal::ctrl_c().await?;
    info!("shutting down watcher");
    drop(controller);
    Ok(())
}

/// Dry-run output: the dependency-ordered plan for a full build.
fn print_dry_run(scheduler: &Scheduler) -> Result<()> {
    let graph = scheduler.graph();
    let members = graph.induced_subgraph(BUILD_TARGETS)?;
    let plan = graph.plan()?;

    println!("pipewright dry-run");
    println!("plan ({} tasks):", members.len());
    for name in plan.iter().filter(|n| members.contains(n.as_str())) {
        let deps = graph.dependencies_of(name);
        if deps.is_empty() {
            println!("  - {name}");
        } else {
            println!("  - {name} (after {})", deps.join(", "));
        }
    }
    Ok(())
}
