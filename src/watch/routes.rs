// src/watch/routes.rs

use std::fmt;
use std::path::Path;

use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::errors::PipelineError;
use crate::graph::task::TaskName;

/// One compiled route: a set of glob patterns and the tasks a match re-runs.
///
/// Patterns are evaluated against paths relative to the watched root, with
/// forward slashes.
#[derive(Clone)]
pub struct Route {
    globs: GlobSet,
    patterns: Vec<String>,
    tasks: Vec<TaskName>,
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("patterns", &self.patterns)
            .field("tasks", &self.tasks)
            .finish()
    }
}

/// The full routing table. A changed path may match several routes; the
/// union of their tasks is re-run.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn builder() -> RouteTableBuilder {
        RouteTableBuilder::default()
    }

    /// Tasks to re-run for a batch of changed paths, deduplicated and in
    /// route order. Unrouted paths contribute nothing.
    pub fn matched_tasks(&self, paths: &[&Path]) -> Vec<TaskName> {
        let mut tasks: Vec<TaskName> = Vec::new();
        for route in &self.routes {
            if paths
                .iter()
                .any(|path| route.globs.is_match(normalize(path)))
            {
                for task in &route.tasks {
                    if !tasks.contains(task) {
                        tasks.push(task.clone());
                    }
                }
            }
        }
        tasks
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

fn normalize(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

#[derive(Default)]
pub struct RouteTableBuilder {
    entries: Vec<(Vec<String>, Vec<TaskName>)>,
}

impl RouteTableBuilder {
    pub fn route(mut self, patterns: &[String], tasks: &[&str]) -> Self {
        self.entries.push((
            patterns.to_vec(),
            tasks.iter().map(|t| t.to_string()).collect(),
        ));
        self
    }

    pub fn build(self) -> Result<RouteTable, PipelineError> {
        let mut routes = Vec::with_capacity(self.entries.len());
        for (patterns, tasks) in self.entries {
            let mut builder = GlobSetBuilder::new();
            for pattern in &patterns {
                let glob = Glob::new(pattern)
                    .map_err(|e| PipelineError::Watch(format!("invalid route glob {pattern:?}: {e}")))?;
                builder.add(glob);
            }
            let globs = builder
                .build()
                .map_err(|e| PipelineError::Watch(format!("compiling route globs: {e}")))?;
            routes.push(Route {
                globs,
                patterns,
                tasks,
            });
        }
        Ok(RouteTable { routes })
    }
}
