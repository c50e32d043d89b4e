// src/watch/watcher.rs

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::errors::PipelineError;
use crate::graph::scheduler::Scheduler;
use crate::graph::task::TaskName;
use crate::watch::routes::RouteTable;

/// Handle for the filesystem watcher.
///
/// Keeps the underlying `RecommendedWatcher` alive; dropping the controller
/// stops event delivery, after which the drive loop drains and exits.
pub struct WatchController {
    _inner: RecommendedWatcher,
}

impl std::fmt::Debug for WatchController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchController").finish()
    }
}

/// Watch `root` recursively and re-run routed tasks on change.
///
/// Change events are coalesced: after the first routed event, further events
/// arriving within the debounce window merge into the same task set, and one
/// scheduler run covers the whole burst. Runs are strictly sequential; events
/// arriving during a run queue up for the next window.
///
/// A failing run is logged and watching continues, so a transient source
/// error (half-saved file, broken import) heals on the next write.
pub fn spawn_watcher(
    root: impl Into<PathBuf>,
    routes: RouteTable,
    scheduler: Scheduler,
    debounce: Duration,
) -> Result<WatchController, PipelineError> {
    let root = root.into();
    let root = root.canonicalize().unwrap_or(root);

    // Bridge from notify's blocking callback into the async world.
    let (event_tx, event_rx) = mpsc::unbounded_channel::<Event>();

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                // Send fails only when the drive loop is gone; nothing to do
                // but note it.
                if event_tx.send(event).is_err() {
                    warn!("watch loop gone; dropping event");
                }
            }
            Err(err) => {
                error!(error = %err, "file watch error");
            }
        },
        Config::default(),
    )
    .map_err(|e| PipelineError::Watch(format!("creating watcher: {e}")))?;

    watcher
        .watch(&root, RecursiveMode::Recursive)
        .map_err(|e| PipelineError::Watch(format!("watching {root:?}: {e}")))?;

    info!(?root, "file watcher started");

    tokio::spawn(drive(root, routes, scheduler, debounce, event_rx));

    Ok(WatchController { _inner: watcher })
}

/// The watch loop: route events to tasks, coalesce, run, repeat. Returns when
/// the event channel closes.
pub(crate) async fn drive(
    root: PathBuf,
    routes: RouteTable,
    scheduler: Scheduler,
    debounce: Duration,
    mut event_rx: mpsc::UnboundedReceiver<Event>,
) {
    let mut pending: BTreeSet<TaskName> = BTreeSet::new();
    let mut closed = false;

    while !closed {
        if pending.is_empty() {
            match event_rx.recv().await {
                Some(event) => collect(&root, &routes, &event, &mut pending),
                None => break,
            }
        }

        // Coalescing window: keep absorbing events until it stays quiet for
        // one debounce interval.
        loop {
            match tokio::time::timeout(debounce, event_rx.recv()).await {
                Ok(Some(event)) => collect(&root, &routes, &event, &mut pending),
                Ok(None) => {
                    closed = true;
                    break;
                }
                Err(_) => break,
            }
        }

        if pending.is_empty() {
            continue;
        }

        let tasks: Vec<TaskName> = std::mem::take(&mut pending).into_iter().collect();
        let targets: Vec<&str> = tasks.iter().map(|s| s.as_str()).collect();
        info!(tasks = ?targets, "change detected; re-running");
        match scheduler.run(&targets).await {
            Ok(_) => info!(tasks = ?targets, "re-run complete"),
            Err(err) => warn!(error = %err, "re-run failed; still watching"),
        }
    }

    debug!("watch loop ended");
}

fn collect(root: &Path, routes: &RouteTable, event: &Event, pending: &mut BTreeSet<TaskName>) {
    if event.kind.is_access() {
        return;
    }
    let rels: Vec<&Path> = event
        .paths
        .iter()
        .filter_map(|p| p.strip_prefix(root).ok())
        .collect();
    if rels.is_empty() {
        return;
    }
    for task in routes.matched_tasks(&rels) {
        debug!(task = %task, paths = ?rels, "watch match");
        pending.insert(task);
    }
}
