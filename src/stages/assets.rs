// src/stages/assets.rs

//! Plain copy actions and the clean action. These are side-effecting rather
//! than transforming, but they obey the same partitioning rule: each writes
//! only under its declared output subdirectories.

use std::sync::Arc;

use tracing::debug;

use crate::errors::TransformError;
use crate::graph::task::StageReport;
use crate::output;
use crate::pipeline::PipelineContext;
use crate::stages::{COMPONENTS_DIR, COMPONENTS_FILE, FONTS_DIR, INLINED_COMPONENTS_FILE};

/// Copy static input into the final root:
/// - root-level files of the source tree (dotfiles included)
/// - component markup, preserving structure
/// - the aggregated components file, seeded under its inlined name for the
///   import-inline stage to replace
/// - the vendor tree, when one exists
pub async fn copy_static(ctx: Arc<PipelineContext>) -> Result<StageReport, TransformError> {
    let paths = &ctx.config.paths;
    let mut report = StageReport::default();

    let entries = std::fs::read_dir(&paths.source_root).map_err(|e| {
        TransformError::io(format!("listing source root {:?}", paths.source_root), e)
    })?;
    for entry in entries {
        let entry = entry.map_err(|e| {
            TransformError::io(format!("listing source root {:?}", paths.source_root), e)
        })?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        report.files += 1;
        report.bytes += output::copy_file(&path, &paths.final_root.join(name))?;
    }

    let components_root = paths.source_root.join(COMPONENTS_DIR);
    for file in output::walk_files(&components_root)? {
        if file.extension().and_then(|e| e.to_str()) != Some("html") {
            continue;
        }
        let Some(rel) = output::relative_str(&components_root, &file) else {
            continue;
        };
        report.files += 1;
        report.bytes +=
            output::copy_file(&file, &paths.final_root.join(COMPONENTS_DIR).join(rel))?;
    }

    let aggregate = paths.source_root.join(COMPONENTS_FILE);
    if aggregate.is_file() {
        debug!(?aggregate, "seeding inlined components file");
        report.files += 1;
        report.bytes +=
            output::copy_file(&aggregate, &paths.final_root.join(INLINED_COMPONENTS_FILE))?;
    }

    if paths.vendor_root.is_dir() {
        let vendor_name = paths
            .vendor_root
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "vendor".into());
        for file in output::walk_files(&paths.vendor_root)? {
            let Some(rel) = output::relative_str(&paths.vendor_root, &file) else {
                continue;
            };
            report.files += 1;
            report.bytes +=
                output::copy_file(&file, &paths.final_root.join(&vendor_name).join(rel))?;
        }
    }

    Ok(report)
}

/// Copy web fonts into the final root.
pub async fn copy_fonts(ctx: Arc<PipelineContext>) -> Result<StageReport, TransformError> {
    let paths = &ctx.config.paths;
    let root = paths.source_root.join(FONTS_DIR);
    let mut report = StageReport::default();

    for file in output::walk_files(&root)? {
        let Some(rel) = output::relative_str(&root, &file) else {
            continue;
        };
        report.files += 1;
        report.bytes += output::copy_file(&file, &paths.final_root.join(FONTS_DIR).join(rel))?;
    }

    Ok(report)
}

/// Remove the transient root, the final root, and the bundle artifact.
/// The content-addressed cache survives; a full clean is the `clean`
/// subcommand's job.
pub async fn clean(ctx: Arc<PipelineContext>) -> Result<StageReport, TransformError> {
    let paths = &ctx.config.paths;
    output::remove_if_exists(&paths.transient_root)?;
    output::remove_if_exists(&paths.final_root)?;
    output::remove_if_exists(&paths.source_root.join(&ctx.config.bundle.output))?;
    Ok(StageReport::default())
}
