// src/graph/task.rs

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::errors::TransformError;

/// Task names are plain strings throughout the crate.
pub type TaskName = String;

/// Advisory completion report: how many files a stage touched and how many
/// bytes it wrote. Logged for observability; not part of any contract.
#[derive(Debug, Clone, Copy, Default)]
pub struct StageReport {
    pub files: usize,
    pub bytes: u64,
}

impl StageReport {
    pub fn merge(self, other: StageReport) -> StageReport {
        StageReport {
            files: self.files + other.files,
            bytes: self.bytes + other.bytes,
        }
    }
}

pub type ActionFuture = Pin<Box<dyn Future<Output = Result<StageReport, TransformError>> + Send>>;

/// A task's action: a factory producing one stage invocation per run. Actions
/// capture their own context (paths, cache, options) at registration time;
/// the scheduler knows nothing about what they do.
pub type TaskAction = Arc<dyn Fn() -> ActionFuture + Send + Sync>;

/// Box an async closure into a [`TaskAction`].
pub fn action<F, Fut>(f: F) -> TaskAction
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<StageReport, TransformError>> + Send + 'static,
{
    Arc::new(move || Box::pin(f()))
}

/// A named unit of build work with declared dependencies. Registered once,
/// never mutated.
#[derive(Clone)]
pub struct Task {
    pub name: TaskName,
    pub deps: Vec<TaskName>,
    pub action: TaskAction,
}

impl Task {
    pub fn new(
        name: impl Into<TaskName>,
        deps: impl IntoIterator<Item = impl Into<TaskName>>,
        action: TaskAction,
    ) -> Self {
        Self {
            name: name.into(),
            deps: deps.into_iter().map(Into::into).collect(),
            action,
        }
    }
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name)
            .field("deps", &self.deps)
            .finish_non_exhaustive()
    }
}
