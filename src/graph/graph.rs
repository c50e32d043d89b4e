// src/graph/graph.rs

use std::collections::{HashMap, HashSet};

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::errors::PipelineError;
use crate::graph::task::{Task, TaskAction, TaskName};

/// The set of registered tasks plus adjacency information.
///
/// Construction happens once at startup; the scheduler and watch controller
/// receive the finished graph by value or reference. There is no ambient
/// registry.
#[derive(Default)]
pub struct TaskGraph {
    tasks: HashMap<TaskName, Task>,
    /// Reverse adjacency: task -> tasks that list it as a dependency.
    dependents: HashMap<TaskName, Vec<TaskName>>,
    /// Registration order, for deterministic iteration.
    order: Vec<TaskName>,
}

impl TaskGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a task. Dependencies must already be registered — forward
    /// references are rejected, so incremental registration can never form a
    /// cycle.
    pub fn register(
        &mut self,
        name: impl Into<TaskName>,
        deps: &[&str],
        action: TaskAction,
    ) -> Result<(), PipelineError> {
        let name = name.into();
        if self.tasks.contains_key(&name) {
            return Err(PipelineError::DuplicateTask(name));
        }
        for dep in deps {
            if !self.tasks.contains_key(*dep) {
                return Err(PipelineError::UnknownDependency {
                    task: name,
                    dependency: dep.to_string(),
                });
            }
        }
        self.insert(Task::new(name, deps.iter().copied(), action));
        Ok(())
    }

    /// Build a graph from a batch of mutually referencing tasks. Unlike
    /// [`register`](Self::register), references within the batch may point in
    /// any direction, so the result can be cyclic; [`Scheduler::run`] detects
    /// that before executing anything.
    pub fn from_tasks(tasks: Vec<Task>) -> Result<Self, PipelineError> {
        let names: HashSet<TaskName> = tasks.iter().map(|t| t.name.clone()).collect();
        if names.len() != tasks.len() {
            let mut seen = HashSet::new();
            for task in &tasks {
                if !seen.insert(task.name.clone()) {
                    return Err(PipelineError::DuplicateTask(task.name.clone()));
                }
            }
        }
        for task in &tasks {
            for dep in &task.deps {
                if !names.contains(dep) {
                    return Err(PipelineError::UnknownDependency {
                        task: task.name.clone(),
                        dependency: dep.clone(),
                    });
                }
            }
        }

        let mut graph = Self::new();
        for task in tasks {
            graph.insert(task);
        }
        Ok(graph)
    }

    fn insert(&mut self, task: Task) {
        for dep in &task.deps {
            self.dependents
                .entry(dep.clone())
                .or_default()
                .push(task.name.clone());
        }
        self.order.push(task.name.clone());
        self.tasks.insert(task.name.clone(), task);
    }

    pub fn task(&self, name: &str) -> Option<&Task> {
        self.tasks.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tasks.contains_key(name)
    }

    /// Task names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(|s| s.as_str())
    }

    pub fn dependencies_of(&self, name: &str) -> &[TaskName] {
        self.tasks.get(name).map(|t| t.deps.as_slice()).unwrap_or(&[])
    }

    pub fn dependents_of(&self, name: &str) -> &[TaskName] {
        self.dependents.get(name).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// The requested targets plus all their transitive dependencies.
    pub fn induced_subgraph(&self, targets: &[&str]) -> Result<HashSet<TaskName>, PipelineError> {
        let mut members = HashSet::new();
        let mut stack: Vec<TaskName> = Vec::new();

        for target in targets {
            if !self.contains(target) {
                return Err(PipelineError::UnknownTarget(target.to_string()));
            }
            stack.push(target.to_string());
        }

        while let Some(name) = stack.pop() {
            if members.insert(name.clone()) {
                stack.extend(self.dependencies_of(&name).iter().cloned());
            }
        }
        Ok(members)
    }

    /// Topological plan over the whole graph (dependencies first). Fails with
    /// the offending cycle if the graph is not acyclic.
    pub fn plan(&self) -> Result<Vec<TaskName>, PipelineError> {
        self.check_acyclic()?;

        let mut petgraph: DiGraphMap<&str, ()> = DiGraphMap::new();
        for name in &self.order {
            petgraph.add_node(name.as_str());
        }
        for task in self.tasks.values() {
            for dep in &task.deps {
                petgraph.add_edge(dep.as_str(), task.name.as_str(), ());
            }
        }

        match toposort(&petgraph, None) {
            Ok(sorted) => Ok(sorted.into_iter().map(|s| s.to_string()).collect()),
            // check_acyclic ran first, so this arm is unreachable in practice.
            Err(cycle) => Err(PipelineError::Cycle(cycle.node_id().to_string())),
        }
    }

    /// Depth-first traversal with a recursion-stack check; reports the full
    /// cycle path (`a -> b -> a`) when one exists.
    pub fn check_acyclic(&self) -> Result<(), PipelineError> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Visiting,
            Done,
        }

        let mut marks: HashMap<&str, Mark> = HashMap::new();

        fn visit<'a>(
            graph: &'a TaskGraph,
            name: &'a str,
            marks: &mut HashMap<&'a str, Mark>,
            stack: &mut Vec<&'a str>,
        ) -> Option<Vec<String>> {
            match marks.get(name) {
                Some(Mark::Done) => return None,
                Some(Mark::Visiting) => {
                    let start = stack.iter().position(|n| *n == name).unwrap_or(0);
                    let mut cycle: Vec<String> =
                        stack[start..].iter().map(|s| s.to_string()).collect();
                    cycle.push(name.to_string());
                    return Some(cycle);
                }
                None => {}
            }

            marks.insert(name, Mark::Visiting);
            stack.push(name);
            for dep in graph.dependencies_of(name) {
                if let Some(cycle) = visit(graph, dep, marks, stack) {
                    return Some(cycle);
                }
            }
            stack.pop();
            marks.insert(name, Mark::Done);
            None
        }

        for name in &self.order {
            let mut stack = Vec::new();
            if let Some(cycle) = visit(self, name, &mut marks, &mut stack) {
                return Err(PipelineError::Cycle(cycle.join(" -> ")));
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for TaskGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskGraph")
            .field("tasks", &self.order)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::task::{action, StageReport};

    fn noop() -> TaskAction {
        action(|| async { Ok(StageReport::default()) })
    }

    fn graph_of(edges: &[(&str, &[&str])]) -> TaskGraph {
        let mut graph = TaskGraph::new();
        for (name, deps) in edges {
            graph.register(*name, deps, noop()).unwrap();
        }
        graph
    }

    #[test]
    fn duplicate_registration_fails() {
        let mut graph = graph_of(&[("a", &[])]);
        let err = graph.register("a", &[], noop()).unwrap_err();
        assert!(matches!(err, PipelineError::DuplicateTask(name) if name == "a"));
    }

    #[test]
    fn forward_reference_fails() {
        let mut graph = TaskGraph::new();
        let err = graph.register("b", &["a"], noop()).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::UnknownDependency { task, dependency }
                if task == "b" && dependency == "a"
        ));
    }

    #[test]
    fn induced_subgraph_pulls_transitive_deps_only() {
        let graph = graph_of(&[
            ("a", &[]),
            ("b", &["a"]),
            ("c", &["b"]),
            ("unrelated", &[]),
        ]);
        let members = graph.induced_subgraph(&["c"]).unwrap();
        assert_eq!(members.len(), 3);
        assert!(!members.contains("unrelated"));
    }

    #[test]
    fn unknown_target_is_reported() {
        let graph = graph_of(&[("a", &[])]);
        assert!(matches!(
            graph.induced_subgraph(&["nope"]),
            Err(PipelineError::UnknownTarget(name)) if name == "nope"
        ));
    }

    #[test]
    fn plan_orders_dependencies_first() {
        let graph = graph_of(&[("a", &[]), ("b", &["a"]), ("c", &["a", "b"])]);
        let plan = graph.plan().unwrap();
        let pos = |n: &str| plan.iter().position(|x| x == n).unwrap();
        assert!(pos("a") < pos("b"));
        assert!(pos("b") < pos("c"));
    }

    #[test]
    fn batch_construction_reports_full_cycle_path() {
        let graph = TaskGraph::from_tasks(vec![
            Task::new("a", ["b"], noop()),
            Task::new("b", ["a"], noop()),
        ])
        .unwrap();
        let err = graph.check_acyclic().unwrap_err();
        match err {
            PipelineError::Cycle(path) => {
                assert!(path.contains(" -> "), "cycle path was {path:?}");
            }
            other => panic!("expected cycle error, got {other:?}"),
        }
    }
}
