// src/watch/mod.rs

//! Watch mode: map filesystem change events onto tasks and re-run them
//! through the shared scheduler, coalescing bursts of events into single
//! runs.

pub mod routes;
pub mod watcher;

pub use routes::{Route, RouteTable};
pub use watcher::{spawn_watcher, WatchController};
