// src/graph/scheduler.rs

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::errors::{PipelineError, RunFailure, TaskFailure, TransformError};
use crate::graph::graph::TaskGraph;
use crate::graph::task::{StageReport, TaskName};

/// Per-run state of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    /// Part of this run, waiting on dependencies.
    Pending,
    /// Dispatched and currently executing.
    Running,
    /// Completed successfully.
    Done,
    /// The task's action failed.
    Failed,
    /// Never invoked: an upstream dependency failed.
    Skipped,
}

impl TaskStatus {
    fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Done | TaskStatus::Failed | TaskStatus::Skipped)
    }
}

/// Final statuses of a successful run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub statuses: BTreeMap<TaskName, TaskStatus>,
}

/// Executes induced sub-graphs of a [`TaskGraph`] in dependency order.
///
/// The scheduler itself is stateless across runs: each [`run`](Self::run)
/// call builds a fresh [`ExecutionRun`] and discards it on completion, so a
/// single scheduler can be shared between the CLI entry points and the watch
/// controller.
#[derive(Clone)]
pub struct Scheduler {
    graph: Arc<TaskGraph>,
}

impl Scheduler {
    pub fn new(graph: TaskGraph) -> Self {
        Self {
            graph: Arc::new(graph),
        }
    }

    pub fn graph(&self) -> &TaskGraph {
        &self.graph
    }

    /// Run `targets` plus all their transitive dependencies.
    ///
    /// Eligible tasks (all dependencies `Done`) execute concurrently with
    /// unbounded fan-out. A failure marks the task `Failed`, marks every
    /// not-yet-started transitive dependent `Skipped`, and lets independent
    /// branches run to completion; the aggregate error then names every
    /// failed task. Returns only once every task in the sub-graph is
    /// terminal.
    pub async fn run(&self, targets: &[&str]) -> Result<RunSummary, PipelineError> {
        // Cycles are rejected before any task executes.
        self.graph.check_acyclic()?;

        let members = self.graph.induced_subgraph(targets)?;
        info!(targets = ?targets, tasks = members.len(), "starting run");

        let mut run = ExecutionRun::new(members);
        let mut inflight: JoinSet<Result<StageReport, TransformError>> = JoinSet::new();
        let mut names: HashMap<tokio::task::Id, TaskName> = HashMap::new();

        self.dispatch(&mut run, &mut inflight, &mut names);

        while let Some(joined) = inflight.join_next_with_id().await {
            match joined {
                Ok((id, result)) => {
                    let name = names.remove(&id).unwrap_or_default();
                    match result {
                        Ok(report) => {
                            info!(
                                task = %name,
                                files = report.files,
                                bytes = report.bytes,
                                "task done"
                            );
                            run.mark_done(&name);
                        }
                        Err(error) => {
                            warn!(task = %name, error = %error, "task failed");
                            run.mark_failed(&self.graph, name, error);
                        }
                    }
                }
                Err(join_err) => {
                    let name = names.remove(&join_err.id()).unwrap_or_default();
                    warn!(task = %name, error = %join_err, "task aborted");
                    run.mark_failed(
                        &self.graph,
                        name,
                        TransformError::Panicked(join_err.to_string()),
                    );
                }
            }
            self.dispatch(&mut run, &mut inflight, &mut names);
        }

        debug_assert!(run.statuses.values().all(|s| s.is_terminal()));
        run.into_result()
    }

    /// Spawn every pending task whose dependencies are all `Done`.
    fn dispatch(
        &self,
        run: &mut ExecutionRun,
        inflight: &mut JoinSet<Result<StageReport, TransformError>>,
        names: &mut HashMap<tokio::task::Id, TaskName>,
    ) {
        // Registration order keeps dispatch deterministic for a fixed graph;
        // completion order among siblings stays unspecified.
        let ready: Vec<TaskName> = self
            .graph
            .names()
            .filter(|name| {
                run.status(name) == Some(TaskStatus::Pending) && self.deps_done(run, name)
            })
            .map(|s| s.to_string())
            .collect();

        for name in ready {
            debug!(task = %name, "dependencies satisfied; dispatching");
            run.set(&name, TaskStatus::Running);
            // Tasks are registered before they can be targeted, so the lookup
            // cannot miss here.
            if let Some(task) = self.graph.task(&name) {
                let future = (task.action)();
                let handle = inflight.spawn(future);
                names.insert(handle.id(), name);
            }
        }
    }

    fn deps_done(&self, run: &ExecutionRun, name: &str) -> bool {
        self.graph
            .dependencies_of(name)
            .iter()
            .all(|dep| run.status(dep) == Some(TaskStatus::Done))
    }
}

/// State of a single `run()` invocation; discarded on completion.
struct ExecutionRun {
    statuses: BTreeMap<TaskName, TaskStatus>,
    failures: Vec<TaskFailure>,
}

impl ExecutionRun {
    fn new(members: HashSet<TaskName>) -> Self {
        Self {
            statuses: members
                .into_iter()
                .map(|name| (name, TaskStatus::Pending))
                .collect(),
            failures: Vec::new(),
        }
    }

    fn status(&self, name: &str) -> Option<TaskStatus> {
        self.statuses.get(name).copied()
    }

    fn set(&mut self, name: &str, status: TaskStatus) {
        if let Some(slot) = self.statuses.get_mut(name) {
            *slot = status;
        }
    }

    fn mark_done(&mut self, name: &str) {
        self.set(name, TaskStatus::Done);
    }

    /// Mark `name` failed and cascade `Skipped` through every not-yet-started
    /// transitive dependent inside this run.
    fn mark_failed(&mut self, graph: &TaskGraph, name: TaskName, error: TransformError) {
        self.set(&name, TaskStatus::Failed);

        let mut stack: Vec<TaskName> = graph.dependents_of(&name).to_vec();
        while let Some(dependent) = stack.pop() {
            if self.status(&dependent) == Some(TaskStatus::Pending) {
                debug!(task = %dependent, failed = %name, "skipping dependent of failed task");
                self.set(&dependent, TaskStatus::Skipped);
                stack.extend(graph.dependents_of(&dependent).iter().cloned());
            }
        }

        self.failures.push(TaskFailure { task: name, error });
    }

    fn into_result(self) -> Result<RunSummary, PipelineError> {
        if self.failures.is_empty() {
            Ok(RunSummary {
                statuses: self.statuses,
            })
        } else {
            Err(RunFailure {
                failures: self.failures,
                statuses: self.statuses,
            }
            .into())
        }
    }
}
