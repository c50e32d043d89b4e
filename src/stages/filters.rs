// src/stages/filters.rs

//! The opaque `bytes -> bytes` transforms the stages apply.
//!
//! All of these are deterministic and conservative: they only strip comments
//! and redundant whitespace, and the prefixer only duplicates a fixed set of
//! declarations. Anything smarter belongs in an external tool wired in the
//! way the image optimizer is.

use std::sync::LazyLock;

use regex::Regex;

/// Properties that still need a `-webkit-` twin in the supported browser
/// matrix.
const PREFIXED_PROPERTIES: &str = "user-select|appearance|text-size-adjust|backdrop-filter";

static PREFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"^(\s*)({PREFIXED_PROPERTIES})\s*:\s*([^;]+);\s*$"
    ))
    .unwrap()
});

/// Vendor-compatibility rewriting: emit a `-webkit-` duplicate ahead of each
/// declaration that needs one. A declaration whose twin is already present on
/// the previous line is left alone, so re-prefixing prefixed output is a
/// no-op.
pub fn prefix_styles(css: &str) -> String {
    let mut out: Vec<String> = Vec::new();
    for line in css.lines() {
        if let Some(caps) = PREFIX_RE.captures(line) {
            let twin = format!("{}-webkit-{}: {};", &caps[1], &caps[2], caps[3].trim());
            let already = out
                .last()
                .is_some_and(|prev| prev.trim() == twin.trim());
            if !already {
                out.push(twin);
            }
        }
        out.push(line.to_string());
    }
    let mut joined = out.join("\n");
    if css.ends_with('\n') {
        joined.push('\n');
    }
    joined
}

static CSS_COMMENT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)/\*.*?\*/").unwrap());
static WS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static CSS_PUNCT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s*([{};:,>])\s*").unwrap());

pub fn minify_styles(css: &str) -> String {
    let no_comments = CSS_COMMENT_RE.replace_all(css, "");
    let collapsed = WS_RE.replace_all(&no_comments, " ");
    let tight = CSS_PUNCT_RE.replace_all(&collapsed, "$1");
    tight.trim().replace(";}", "}")
}

/// Line-oriented script minification: drop whole-line comments and blank
/// lines, keep license comments (`//!`, `/*!`).
pub fn minify_scripts(js: &str) -> String {
    let mut out = Vec::new();
    let mut in_block_comment = false;
    for line in js.lines() {
        let trimmed = line.trim_end();
        let lead = trimmed.trim_start();

        if in_block_comment {
            if lead.contains("*/") {
                in_block_comment = false;
            }
            continue;
        }
        if lead.is_empty() {
            continue;
        }
        if lead.starts_with("//") && !lead.starts_with("//!") {
            continue;
        }
        if lead.starts_with("/*") && !lead.starts_with("/*!") {
            if !lead.contains("*/") {
                in_block_comment = true;
            }
            continue;
        }
        out.push(trimmed);
    }
    out.join("\n")
}

static HTML_COMMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--[^\[].*?-->|<!---->").unwrap());
static INTERTAG_WS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r">\s+<").unwrap());

/// Markup minification: strip comments (conditional comments survive) and
/// collapse inter-tag whitespace.
pub fn minify_markup(html: &str) -> String {
    let no_comments = HTML_COMMENT_RE.replace_all(html, "");
    INTERTAG_WS_RE
        .replace_all(&no_comments, "><")
        .trim()
        .to_string()
}

/// Comment stripping only, for the import-inline stage where whitespace still
/// matters inside inlined scripts.
pub fn strip_markup_comments(html: &str) -> String {
    HTML_COMMENT_RE.replace_all(html, "").into_owned()
}
