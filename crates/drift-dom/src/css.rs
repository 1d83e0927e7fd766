//! Custom property protocol
//!
//! Page stylesheets talk to the engine through custom properties:
//! `--base-bg-color` drives the backdrop and `--js-path` / `--js-path-N`
//! name the page's script modules.

use once_cell::sync::Lazy;
use regex::Regex;

/// Backdrop color property
pub const BASE_BG_COLOR: &str = "--base-bg-color";

static COMMENTS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)/\*.*?\*/").expect("static regex"));

static JS_PATH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"--js-path(?:-\d+)?\s*:\s*(?:"([^"]*)"|'([^']*)')"#).expect("static regex")
});

static DECLARATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:^|[\s;{])(--[A-Za-z0-9_-]+)\s*:\s*([^;}]+)").expect("static regex")
});

fn strip_comments(css: &str) -> std::borrow::Cow<'_, str> {
    COMMENTS.replace_all(css, "")
}

/// Script paths declared by a stylesheet, in declaration order
///
/// Duplicates keep their first position; empty paths are skipped.
pub fn script_paths(css: &str) -> Vec<String> {
    let css = strip_comments(css);
    let mut paths: Vec<String> = Vec::new();

    for caps in JS_PATH.captures_iter(&css) {
        let Some(path) = caps.get(1).or_else(|| caps.get(2)) else {
            continue;
        };
        let path = path.as_str().trim();
        if !path.is_empty() && !paths.iter().any(|p| p == path) {
            paths.push(path.to_string());
        }
    }

    paths
}

/// Last value declared for a custom property in a stylesheet
pub fn declared_value(css: &str, name: &str) -> Option<String> {
    let css = strip_comments(css);

    DECLARATION
        .captures_iter(&css)
        .filter(|caps| caps.get(1).is_some_and(|m| m.as_str() == name))
        .filter_map(|caps| caps.get(2))
        .map(|m| m.as_str().trim().trim_end_matches("!important").trim().to_string())
        .filter(|v| !v.is_empty())
        .last()
}
