//! Resource Cache
//!
//! Session-lifetime cache of page HTML, page CSS and script sources.
//!
//! Entries are write-once: the first successful body for a key is kept for
//! the rest of the session. Failures are never cached, so a later request
//! for the same key goes back to the store.

use crate::{CacheBuster, FetchError, FragmentPaths, FragmentStore, ResourceKind};
use drift_dom::ContentId;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use url::Url;

/// Cache statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub failures: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

type Entries<K> = RefCell<HashMap<K, Rc<str>>>;

/// Fragment resource cache
pub struct ResourceCache {
    store: Rc<dyn FragmentStore>,
    paths: FragmentPaths,
    buster: CacheBuster,
    html: Entries<ContentId>,
    css: Entries<ContentId>,
    scripts: Entries<String>,
    stats: Cell<CacheStats>,
}

impl ResourceCache {
    pub fn new(store: Rc<dyn FragmentStore>, paths: FragmentPaths) -> Self {
        Self {
            store,
            paths,
            buster: CacheBuster::new(),
            html: RefCell::default(),
            css: RefCell::default(),
            scripts: RefCell::default(),
            stats: Cell::default(),
        }
    }

    pub fn paths(&self) -> &FragmentPaths {
        &self.paths
    }

    fn entries(&self, kind: ResourceKind) -> &Entries<ContentId> {
        match kind {
            ResourceKind::Html => &self.html,
            ResourceKind::Css => &self.css,
        }
    }

    fn record(&self, update: impl FnOnce(&mut CacheStats)) {
        let mut stats = self.stats.get();
        update(&mut stats);
        self.stats.set(stats);
    }

    /// Cached body, without touching the store
    pub fn get(&self, id: &ContentId, kind: ResourceKind) -> Option<Rc<str>> {
        self.entries(kind).borrow().get(id).cloned()
    }

    pub fn contains(&self, id: &ContentId, kind: ResourceKind) -> bool {
        self.entries(kind).borrow().contains_key(id)
    }

    /// Number of cached entries of a kind
    pub fn len(&self, kind: ResourceKind) -> usize {
        self.entries(kind).borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.html.borrow().is_empty() && self.css.borrow().is_empty() && self.scripts.borrow().is_empty()
    }

    /// Store a body obtained elsewhere; an existing entry is kept
    pub fn seed(&self, id: &ContentId, kind: ResourceKind, text: &str) {
        self.entries(kind)
            .borrow_mut()
            .entry(id.clone())
            .or_insert_with(|| Rc::from(text));
    }

    /// Cached body, fetching it from the store on a miss
    pub async fn get_or_fetch(&self, id: &ContentId, kind: ResourceKind) -> Result<Rc<str>, FetchError> {
        if let Some(text) = self.get(id, kind) {
            self.record(|s| s.hits += 1);
            tracing::trace!(content = %id, ?kind, "Cache hit");
            return Ok(text);
        }
        self.record(|s| s.misses += 1);

        let url = self.buster.bust(&self.paths.fragment_url(id, kind)?);
        tracing::debug!(content = %id, ?kind, url = %url, "Fetching fragment resource");

        match self.store.get(&url).await {
            Ok(body) => {
                // A concurrent fetch may have filled the slot first.
                let mut entries = self.entries(kind).borrow_mut();
                let text = entries.entry(id.clone()).or_insert_with(|| Rc::from(body));
                Ok(text.clone())
            }
            Err(err) => {
                self.record(|s| s.failures += 1);
                tracing::debug!(content = %id, ?kind, "Fetch failed: {}", err);
                Err(err)
            }
        }
    }

    /// Source of a script, keyed by its resolved URL
    pub async fn script_source(&self, url: &Url) -> Result<Rc<str>, FetchError> {
        let key = url.as_str().to_string();
        if let Some(text) = self.scripts.borrow().get(&key).cloned() {
            self.record(|s| s.hits += 1);
            return Ok(text);
        }
        self.record(|s| s.misses += 1);

        let busted = self.buster.bust(url);
        tracing::debug!(url = %busted, "Fetching script source");

        match self.store.get(&busted).await {
            Ok(body) => {
                let mut scripts = self.scripts.borrow_mut();
                Ok(scripts.entry(key).or_insert_with(|| Rc::from(body)).clone())
            }
            Err(err) => {
                self.record(|s| s.failures += 1);
                Err(err)
            }
        }
    }

    /// Warm both resources of a page; failures are only logged
    pub async fn preload(&self, id: &ContentId) {
        let (html, css) = smol::future::zip(
            self.get_or_fetch(id, ResourceKind::Html),
            self.get_or_fetch(id, ResourceKind::Css),
        )
        .await;

        if let Err(err) = html {
            tracing::debug!(content = %id, "Preload of HTML failed: {}", err);
        }
        if let Err(err) = css {
            tracing::debug!(content = %id, "Preload of CSS failed: {}", err);
        }
    }

    pub fn stats(&self) -> CacheStats {
        self.stats.get()
    }
}

impl std::fmt::Debug for ResourceCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceCache")
            .field("base", &self.paths.base().as_str())
            .field("html", &self.html.borrow().len())
            .field("css", &self.css.borrow().len())
            .field("scripts", &self.scripts.borrow().len())
            .field("stats", &self.stats.get())
            .finish()
    }
}
