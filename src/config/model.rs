// src/config/model.rs

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Top-level configuration as read from `Pipewright.toml`.
///
/// ```toml
/// [paths]
/// source_root = "client"
/// final_root = "dist"
///
/// [bundle]
/// entry = "app/main.js"
///
/// [images]
/// optimizer = "pngcrush -"
///
/// [watch]
/// debounce_ms = 50
/// ```
///
/// All sections are optional and have defaults matching the conventional
/// client-app layout.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub paths: PathsSection,

    #[serde(default)]
    pub bundle: BundleSection,

    #[serde(default)]
    pub images: ImagesSection,

    #[serde(default)]
    pub manifest: ManifestSection,

    #[serde(default)]
    pub watch: WatchSection,
}

impl ProjectConfig {
    /// Resolve every relative path in the config against `root`.
    ///
    /// The project root is the directory containing the config file, so a
    /// config checked into a subdirectory still addresses its own tree.
    pub fn resolve_against(mut self, root: &Path) -> Self {
        let join = |p: PathBuf| {
            if p.is_absolute() {
                p
            } else {
                root.join(p)
            }
        };
        self.paths.source_root = join(self.paths.source_root);
        self.paths.transient_root = join(self.paths.transient_root);
        self.paths.final_root = join(self.paths.final_root);
        self.paths.cache_dir = join(self.paths.cache_dir);
        self.paths.vendor_root = join(self.paths.vendor_root);
        self
    }
}

/// `[paths]` section: the filesystem namespace the pipeline reads and writes.
#[derive(Debug, Clone, Deserialize)]
pub struct PathsSection {
    /// Source tree the stages consume.
    #[serde(default = "default_source_root")]
    pub source_root: PathBuf,

    /// Transient root: intermediate dev artifacts (unminified styles).
    #[serde(default = "default_transient_root")]
    pub transient_root: PathBuf,

    /// Final root: the deployable output tree.
    #[serde(default = "default_final_root")]
    pub final_root: PathBuf,

    /// Backing store for the content-addressed cache and fingerprints.
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    /// Third-party vendor tree copied verbatim into the final root, if it
    /// exists.
    #[serde(default = "default_vendor_root")]
    pub vendor_root: PathBuf,
}

fn default_source_root() -> PathBuf {
    PathBuf::from("client")
}

fn default_transient_root() -> PathBuf {
    PathBuf::from(".tmp")
}

fn default_final_root() -> PathBuf {
    PathBuf::from("dist")
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from(".pipewright/cache")
}

fn default_vendor_root() -> PathBuf {
    PathBuf::from("vendor")
}

impl Default for PathsSection {
    fn default() -> Self {
        Self {
            source_root: default_source_root(),
            transient_root: default_transient_root(),
            final_root: default_final_root(),
            cache_dir: default_cache_dir(),
            vendor_root: default_vendor_root(),
        }
    }
}

/// `[bundle]` section: script bundling entry point and output, both relative
/// to the source root.
#[derive(Debug, Clone, Deserialize)]
pub struct BundleSection {
    #[serde(default = "default_bundle_entry")]
    pub entry: String,

    /// The bundle lands inside the source tree (it is inlined by the markup
    /// stage and removed by `clean`), mirroring the layout this tool grew out
    /// of.
    #[serde(default = "default_bundle_output")]
    pub output: String,
}

fn default_bundle_entry() -> String {
    "app/main.js".to_string()
}

fn default_bundle_output() -> String {
    "scripts/bundle.js".to_string()
}

impl Default for BundleSection {
    fn default() -> Self {
        Self {
            entry: default_bundle_entry(),
            output: default_bundle_output(),
        }
    }
}

/// `[images]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImagesSection {
    /// External optimizer command, fed image bytes on stdin and expected to
    /// write optimized bytes to stdout. When unset, images pass through
    /// untouched (still copied to the final root).
    #[serde(default)]
    pub optimizer: Option<String>,
}

/// `[manifest]` section: which parts of the final root are eligible for
/// offline precaching.
#[derive(Debug, Clone, Deserialize)]
pub struct ManifestSection {
    #[serde(default = "default_manifest_globs")]
    pub globs: Vec<String>,

    /// Entries always present in the manifest regardless of glob matches.
    #[serde(default = "default_manifest_entries")]
    pub extra_entries: Vec<String>,

    #[serde(default = "default_manifest_file")]
    pub file: String,
}

fn default_manifest_globs() -> Vec<String> {
    vec![
        "components/**/*.*".to_string(),
        "scripts/**/*.*".to_string(),
        "styles/**/*.*".to_string(),
    ]
}

fn default_manifest_entries() -> Vec<String> {
    vec!["index.html".to_string(), "./".to_string()]
}

fn default_manifest_file() -> String {
    "precache.json".to_string()
}

impl Default for ManifestSection {
    fn default() -> Self {
        Self {
            globs: default_manifest_globs(),
            extra_entries: default_manifest_entries(),
            file: default_manifest_file(),
        }
    }
}

/// `[watch]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct WatchSection {
    /// Coalescing window: change events arriving within this window merge
    /// into a single scheduler invocation.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

fn default_debounce_ms() -> u64 {
    50
}

impl Default for WatchSection {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
        }
    }
}
