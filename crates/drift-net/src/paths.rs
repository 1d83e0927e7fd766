//! Fragment Paths
//!
//! Deterministic locations of fragment resources in the store.

use crate::FetchError;
use drift_dom::ContentId;
use std::cell::Cell;
use std::time::{SystemTime, UNIX_EPOCH};
use url::Url;

/// Query parameter defeating intermediate caches
pub const CACHE_BUST_PARAM: &str = "rnd";

/// Kind of per-page resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Html,
    Css,
}

impl ResourceKind {
    /// Directory under the content root
    pub fn dir(&self) -> &'static str {
        match self {
            ResourceKind::Html => "html",
            ResourceKind::Css => "css",
        }
    }

    /// File extension
    pub fn extension(&self) -> &'static str {
        match self {
            ResourceKind::Html => "html",
            ResourceKind::Css => "css",
        }
    }
}

/// Resolves fragment and script locations against the store root
#[derive(Debug, Clone)]
pub struct FragmentPaths {
    base: Url,
    content_dir: String,
    script_dir: String,
}

impl FragmentPaths {
    /// Paths rooted at `base` with the default `content` layout
    pub fn new(base: &str) -> Result<Self, FetchError> {
        let mut base = Url::parse(base).map_err(|e| FetchError::InvalidUrl(format!("{base}: {e}")))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        Ok(Self {
            base,
            content_dir: "content".into(),
            script_dir: "content/js".into(),
        })
    }

    /// Override the content and script directories
    pub fn with_dirs(mut self, content_dir: &str, script_dir: &str) -> Self {
        self.content_dir = content_dir.trim_matches('/').to_string();
        self.script_dir = script_dir.trim_matches('/').to_string();
        self
    }

    /// Store root
    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Location of a page's HTML or CSS
    pub fn fragment_url(&self, id: &ContentId, kind: ResourceKind) -> Result<Url, FetchError> {
        let mut url = self.join(&format!("{}/{}/", self.content_dir, kind.dir()))?;
        // One encoded segment, so `?`, `#` and `/` in an id stay part of the file name
        url.path_segments_mut()
            .map_err(|_| FetchError::InvalidUrl(self.base.to_string()))?
            .pop_if_empty()
            .push(&format!("{id}.{}", kind.extension()));
        Ok(url)
    }

    /// Location of a script named by a stylesheet
    ///
    /// Absolute URLs and root-relative paths pass through; anything else is
    /// placed under the script directory.
    pub fn script_url(&self, path: &str) -> Result<Url, FetchError> {
        let path = path.trim();
        if path.is_empty() {
            return Err(FetchError::InvalidUrl("empty script path".into()));
        }
        if let Ok(absolute) = Url::parse(path) {
            return Ok(absolute);
        }
        if path.starts_with('/') {
            return self.join(path);
        }
        let relative = format!("{}/{}", self.script_dir, path.trim_start_matches("./"));
        self.join(&relative)
    }

    fn join(&self, relative: &str) -> Result<Url, FetchError> {
        self.base
            .join(relative)
            .map_err(|e| FetchError::InvalidUrl(format!("{relative}: {e}")))
    }
}

/// Appends a unique `rnd` query parameter to each request
#[derive(Debug, Default)]
pub struct CacheBuster {
    counter: Cell<u64>,
}

impl CacheBuster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of `url` with a fresh cache-busting parameter
    pub fn bust(&self, url: &Url) -> Url {
        let n = self.counter.get().wrapping_add(1);
        self.counter.set(n);

        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();

        let mut busted = url.clone();
        busted
            .query_pairs_mut()
            .append_pair(CACHE_BUST_PARAM, &format!("{millis}-{n}"));
        busted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: &str) -> ContentId {
        ContentId::parse(raw).unwrap()
    }

    #[test]
    fn test_fragment_urls() {
        let paths = FragmentPaths::new("https://hsrp.cc").unwrap();
        assert_eq!(
            paths.fragment_url(&id("projects"), ResourceKind::Html).unwrap().as_str(),
            "https://hsrp.cc/content/html/projects.html"
        );
        assert_eq!(
            paths.fragment_url(&id("projects"), ResourceKind::Css).unwrap().as_str(),
            "https://hsrp.cc/content/css/projects.css"
        );
    }

    #[test]
    fn test_fragment_url_keeps_id_in_one_segment() {
        let paths = FragmentPaths::new("file:///").unwrap();

        let url = paths.fragment_url(&id("a?b#c"), ResourceKind::Html).unwrap();
        assert_eq!(url.path(), "/content/html/a%3Fb%23c.html");
        assert_eq!(url.query(), None);
        assert_eq!(url.fragment(), None);

        let url = paths.fragment_url(&id("../../x"), ResourceKind::Css).unwrap();
        assert!(url.path().starts_with("/content/css/"));
        assert_eq!(url.path_segments().unwrap().count(), 3);

        let url = paths.fragment_url(&id("my page"), ResourceKind::Html).unwrap();
        assert_eq!(url.path(), "/content/html/my%20page.html");
    }

    #[test]
    fn test_base_with_subdirectory() {
        let paths = FragmentPaths::new("https://example.com/site").unwrap();
        assert_eq!(
            paths.fragment_url(&id("home"), ResourceKind::Html).unwrap().as_str(),
            "https://example.com/site/content/html/home.html"
        );
    }

    #[test]
    fn test_script_url_resolution() {
        let paths = FragmentPaths::new("https://hsrp.cc/").unwrap();
        assert_eq!(
            paths.script_url("var_binder.js").unwrap().as_str(),
            "https://hsrp.cc/content/js/var_binder.js"
        );
        assert_eq!(
            paths.script_url("./fx/snow.js").unwrap().as_str(),
            "https://hsrp.cc/content/js/fx/snow.js"
        );
        assert_eq!(
            paths.script_url("https://cdn.example.com/lib.js").unwrap().as_str(),
            "https://cdn.example.com/lib.js"
        );
        assert_eq!(
            paths.script_url("/static/app.js").unwrap().as_str(),
            "https://hsrp.cc/static/app.js"
        );
        assert!(paths.script_url("  ").is_err());
    }

    #[test]
    fn test_custom_dirs() {
        let paths = FragmentPaths::new("memory://site/")
            .unwrap()
            .with_dirs("/pages/", "scripts");
        assert_eq!(
            paths.fragment_url(&id("home"), ResourceKind::Html).unwrap().path(),
            "/pages/html/home.html"
        );
        assert_eq!(paths.script_url("a.js").unwrap().path(), "/scripts/a.js");
    }

    #[test]
    fn test_cache_buster_is_unique() {
        let buster = CacheBuster::new();
        let url = Url::parse("https://hsrp.cc/content/css/home.css").unwrap();
        let a = buster.bust(&url);
        let b = buster.bust(&url);

        assert_ne!(a, b);
        assert_eq!(a.path(), url.path());
        assert!(a.query_pairs().any(|(k, _)| k == CACHE_BUST_PARAM));
    }

    #[test]
    fn test_invalid_base() {
        assert!(matches!(FragmentPaths::new("not a url"), Err(FetchError::InvalidUrl(_))));
    }
}
