// src/config/loader.rs

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

use crate::config::model::ProjectConfig;
use crate::config::validate::validate_config;

/// Default config path, relative to the current working directory.
pub const DEFAULT_CONFIG_PATH: &str = "Pipewright.toml";

/// Load a configuration file and validate it.
///
/// A missing file is not an error: the conventional layout (`client/` →
/// `.tmp/` + `dist/`) works out of the box, so the config only exists to
/// override it. Paths in the returned config are resolved against the
/// directory containing the config file (or the current directory when the
/// file does not exist).
pub fn load_or_default(path: impl AsRef<Path>) -> Result<ProjectConfig> {
    let path = path.as_ref();

    let config = if path.exists() {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("reading config file at {:?}", path))?;
        let config: ProjectConfig = toml::from_str(&contents)
            .with_context(|| format!("parsing TOML config from {:?}", path))?;
        config.resolve_against(&config_root_dir(path))
    } else {
        debug!(?path, "no config file; using defaults");
        ProjectConfig::default()
    };

    validate_config(&config)?;
    Ok(config)
}

/// Project root for resolving relative config paths: the directory containing
/// the config file, falling back to `.` for a bare filename.
fn config_root_dir(config_path: &Path) -> std::path::PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::path::PathBuf::from("."),
    }
}
