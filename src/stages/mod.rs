// src/stages/mod.rs

//! Asset transformation stages.
//!
//! Each stage is a pure function from input files to output files: no hidden
//! global state, so stages are cacheable and safe to re-invoke. Stages write
//! only under their declared output subdirectories; the scheduler trusts that
//! partitioning rather than enforcing a lock.
//!
//! The actual byte-level transformations (prefixing, minification) are
//! deliberately conservative stand-ins with stable output; image optimization
//! delegates to an external command (see `images.rs`).

pub mod assets;
pub mod bundle;
pub mod images;
pub mod inline;
pub mod manifest;
pub mod markup;
pub mod styles;

pub mod filters;

use std::path::Path;

use regex::{Captures, Regex};

use crate::errors::TransformError;

/// Subdirectory names under the source root, fixed by convention.
pub const STYLES_DIR: &str = "styles";
pub const COMPONENTS_DIR: &str = "components";
pub const IMAGES_DIR: &str = "images";
pub const FONTS_DIR: &str = "fonts";

/// The aggregated components file and the name its self-contained, inlined
/// counterpart is published under.
pub const COMPONENTS_FILE: &str = "components/components.html";
pub const INLINED_COMPONENTS_FILE: &str = "components/components.inlined.html";

/// Logical type tag of a file, deciding which stage may consume it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Style,
    Script,
    Markup,
    Image,
    Other,
}

impl FileKind {
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("css") => FileKind::Style,
            Some("js" | "mjs") => FileKind::Script,
            Some("html" | "htm") => FileKind::Markup,
            Some("png" | "jpg" | "jpeg" | "gif" | "svg" | "webp" | "ico") => FileKind::Image,
            _ => FileKind::Other,
        }
    }
}

/// Replace every match of `re` in `input` via a fallible callback.
///
/// `replace` returns `Ok(None)` to keep the original text for that match.
/// This exists because `Regex::replace_all` cannot propagate errors, and the
/// inline/markup stages must fail on unresolved references.
pub fn rewrite_matches(
    input: &str,
    re: &Regex,
    mut replace: impl FnMut(&Captures<'_>) -> Result<Option<String>, TransformError>,
) -> Result<String, TransformError> {
    let mut out = String::with_capacity(input.len());
    let mut last = 0;
    for caps in re.captures_iter(input) {
        let m = caps.get(0).map(|m| (m.start(), m.end())).unwrap_or((0, 0));
        out.push_str(&input[last..m.0]);
        match replace(&caps)? {
            Some(replacement) => out.push_str(&replacement),
            None => out.push_str(&input[m.0..m.1]),
        }
        last = m.1;
    }
    out.push_str(&input[last..]);
    Ok(out)
}

/// True if a reference points at a local file rather than an external URL.
pub fn is_local_ref(href: &str) -> bool {
    !(href.contains("://") || href.starts_with("//") || href.starts_with("data:"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_kind_by_extension() {
        assert_eq!(FileKind::from_path(Path::new("a/b.CSS")), FileKind::Style);
        assert_eq!(FileKind::from_path(Path::new("x.mjs")), FileKind::Script);
        assert_eq!(FileKind::from_path(Path::new("x.webp")), FileKind::Image);
        assert_eq!(FileKind::from_path(Path::new("x.woff")), FileKind::Other);
        assert_eq!(FileKind::from_path(Path::new("noext")), FileKind::Other);
    }

    #[test]
    fn local_ref_detection() {
        assert!(is_local_ref("scripts/app.js"));
        assert!(is_local_ref("../shared.css"));
        assert!(!is_local_ref("https://cdn.example/x.js"));
        assert!(!is_local_ref("//cdn.example/x.js"));
        assert!(!is_local_ref("data:text/css,"));
    }

    #[test]
    fn rewrite_matches_propagates_errors() {
        let re = Regex::new("x").unwrap();
        let err = rewrite_matches("axb", &re, |_| {
            Err(TransformError::MissingEntry("x".into()))
        });
        assert!(err.is_err());

        let ok = rewrite_matches("axbxc", &re, |_| Ok(Some("y".to_string()))).unwrap();
        assert_eq!(ok, "aybyc");

        let kept = rewrite_matches("axb", &re, |_| Ok(None)).unwrap();
        assert_eq!(kept, "axb");
    }
}
