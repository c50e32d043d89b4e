// src/config/mod.rs

//! Project configuration for pipewright.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk with defaults for everything (`loader.rs`).
//! - Validate basic invariants like root separation (`validate.rs`).
//!
//! The task registry itself is fixed in code (`pipeline.rs`); the config only
//! carries project paths, stage options, and the watch debounce window.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_or_default, DEFAULT_CONFIG_PATH};
pub use model::{
    BundleSection, ImagesSection, ManifestSection, PathsSection, ProjectConfig, WatchSection,
};
pub use validate::validate_config;
