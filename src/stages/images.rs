// src/stages/images.rs

//! Image optimization with content-addressed caching.
//!
//! The optimization itself is opaque to the pipeline: an [`ImageOptimizer`]
//! maps bytes to bytes. Because that mapping is expensive and deterministic,
//! every successful result is written through the cache keyed by the original
//! content hash, and identical content never runs through the optimizer
//! twice — this is the one stage where caching is a performance requirement
//! rather than a nicety.

use std::future::Future;
use std::pin::Pin;
use std::process::Stdio;
use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::cache::Cache;
use crate::errors::TransformError;
use crate::graph::task::StageReport;
use crate::output;
use crate::pipeline::PipelineContext;
use crate::stages::{FileKind, IMAGES_DIR};

pub type OptimizeFuture<'a> = Pin<Box<dyn Future<Output = Result<Vec<u8>, TransformError>> + Send + 'a>>;

/// An opaque, pure `bytes -> bytes` image optimization.
///
/// `id` feeds the cache key, so two differently configured optimizers never
/// share entries.
pub trait ImageOptimizer: Send + Sync {
    fn id(&self) -> &str;
    fn optimize<'a>(&'a self, input: &'a [u8]) -> OptimizeFuture<'a>;
}

/// Identity optimizer, used when no external command is configured. Images
/// are still copied into the final root.
pub struct PassthroughOptimizer;

impl ImageOptimizer for PassthroughOptimizer {
    fn id(&self) -> &str {
        "passthrough"
    }

    fn optimize<'a>(&'a self, input: &'a [u8]) -> OptimizeFuture<'a> {
        Box::pin(async move { Ok(input.to_vec()) })
    }
}

/// Pipes image bytes through an external command (stdin → stdout), the way a
/// standalone `pngcrush`/`jpegtran`-style tool expects.
pub struct CommandOptimizer {
    cmd: String,
    id: String,
}

impl CommandOptimizer {
    pub fn new(cmd: impl Into<String>) -> Self {
        let cmd = cmd.into();
        let id = format!("cmd-{}", blake3::hash(cmd.as_bytes()).to_hex());
        Self { cmd, id }
    }
}

impl ImageOptimizer for CommandOptimizer {
    fn id(&self) -> &str {
        &self.id
    }

    fn optimize<'a>(&'a self, input: &'a [u8]) -> OptimizeFuture<'a> {
        Box::pin(async move {
            let mut child = Command::new("sh")
                .arg("-c")
                .arg(&self.cmd)
                .stdin(Stdio::piped())
                .stdout(Stdio::piped())
                .stderr(Stdio::null())
                .kill_on_drop(true)
                .spawn()
                .map_err(|e| {
                    TransformError::io(format!("spawning image optimizer '{}'", self.cmd), e)
                })?;

            if let Some(mut stdin) = child.stdin.take() {
                stdin.write_all(input).await.map_err(|e| {
                    TransformError::io(format!("feeding image optimizer '{}'", self.cmd), e)
                })?;
            }

            let out = child.wait_with_output().await.map_err(|e| {
                TransformError::io(format!("waiting for image optimizer '{}'", self.cmd), e)
            })?;

            if !out.status.success() {
                return Err(TransformError::Optimizer {
                    cmd: self.cmd.clone(),
                    status: out.status.code().unwrap_or(-1),
                });
            }
            Ok(out.stdout)
        })
    }
}

/// Optimize every image under `<source>/images` into `<final>/images`.
/// Non-image files in the tree are copied through untouched.
pub async fn optimize(
    ctx: Arc<PipelineContext>,
    optimizer: Arc<dyn ImageOptimizer>,
) -> Result<StageReport, TransformError> {
    let paths = &ctx.config.paths;
    let root = paths.source_root.join(IMAGES_DIR);
    let mut report = StageReport::default();

    for file in output::walk_files(&root)? {
        let Some(rel) = output::relative_str(&root, &file) else {
            continue;
        };
        let dst = paths.final_root.join(IMAGES_DIR).join(&rel);
        let bytes = output::read(&file)?;

        let optimized = if FileKind::from_path(&file) == FileKind::Image {
            cached_optimize(&ctx.cache, optimizer.as_ref(), &bytes).await?
        } else {
            bytes
        };

        report.files += 1;
        report.bytes += optimized.len() as u64;
        output::atomic_write(&dst, &optimized)?;
    }

    Ok(report)
}

async fn cached_optimize(
    cache: &Cache,
    optimizer: &dyn ImageOptimizer,
    bytes: &[u8],
) -> Result<Vec<u8>, TransformError> {
    let key = Cache::key(optimizer.id(), bytes);
    if let Some(hit) = cache.get(&key) {
        debug!(key = %key, "image served from cache");
        return Ok(hit);
    }
    let optimized = optimizer.optimize(bytes).await?;
    cache.put(&key, &optimized);
    Ok(optimized)
}
