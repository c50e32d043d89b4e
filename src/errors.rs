// src/errors.rs

//! Crate-wide error taxonomy.
//!
//! Two layers:
//! - [`PipelineError`] covers graph registration, target resolution, cycle
//!   detection, configuration and watch setup, plus the aggregate failure of
//!   a whole run.
//! - [`TransformError`] covers what can go wrong inside a single stage. It
//!   marks the owning task as failed and cascades skips to dependents, but
//!   never aborts sibling branches.
//!
//! Cache problems are deliberately absent here: the cache degrades to a miss
//! on read errors and logs on write errors (see `cache.rs`).

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::graph::scheduler::TaskStatus;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("duplicate task '{0}'")]
    DuplicateTask(String),

    #[error("task '{task}' depends on unregistered task '{dependency}'")]
    UnknownDependency { task: String, dependency: String },

    #[error("unknown target task '{0}'")]
    UnknownTarget(String),

    #[error("cycle detected in task graph: {0}")]
    Cycle(String),

    #[error(transparent)]
    RunFailure(#[from] RunFailure),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("watch error: {0}")]
    Watch(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Failure of a single stage invocation.
#[derive(Error, Debug)]
pub enum TransformError {
    #[error("missing entry point {0}")]
    MissingEntry(PathBuf),

    #[error("unresolved module '{spec}' required from {from}")]
    UnresolvedModule { spec: String, from: PathBuf },

    #[error("unresolved import '{href}' referenced from {from}")]
    UnresolvedImport { href: String, from: PathBuf },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid glob pattern '{0}'")]
    Pattern(String),

    #[error("image optimizer '{cmd}' exited with status {status}")]
    Optimizer { cmd: String, status: i32 },

    #[error("task panicked: {0}")]
    Panicked(String),
}

impl TransformError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}

/// Aggregate result of a failed run: every failed task with its proximate
/// error, plus the final status of every task in the requested sub-graph.
#[derive(Debug)]
pub struct RunFailure {
    pub failures: Vec<TaskFailure>,
    pub statuses: std::collections::BTreeMap<String, TaskStatus>,
}

#[derive(Debug)]
pub struct TaskFailure {
    pub task: String,
    pub error: TransformError,
}

impl fmt::Display for RunFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} task(s) failed", self.failures.len())?;
        for failure in &self.failures {
            write!(f, "; '{}': {}", failure.task, failure.error)?;
        }
        Ok(())
    }
}

impl std::error::Error for RunFailure {}
