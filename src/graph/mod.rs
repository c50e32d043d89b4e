// src/graph/mod.rs

//! Task graph and scheduling.
//!
//! - [`task`] defines the named unit of build work and its boxed async action.
//! - [`graph`] owns the registered task set and its adjacency information.
//! - [`scheduler`] executes an induced sub-graph in dependency order,
//!   parallelizing independent tasks.

pub mod graph;
pub mod scheduler;
pub mod task;

pub use graph::TaskGraph;
pub use scheduler::{RunSummary, Scheduler, TaskStatus};
pub use task::{action, StageReport, Task, TaskAction, TaskName};
