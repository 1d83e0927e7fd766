//! Fragment stores
//!
//! Where fragment resources come from: an HTTP origin, a local directory,
//! or memory.

use crate::FetchError;
use async_trait::async_trait;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;
use url::Url;

/// User agent sent to HTTP origins
const USER_AGENT: &str = concat!("drift/", env!("CARGO_PKG_VERSION"));

/// Source of fragment resources
///
/// A store answers with the full text body or an error; it never caches.
#[async_trait(?Send)]
pub trait FragmentStore {
    async fn get(&self, url: &Url) -> Result<String, FetchError>;
}

/// Exponential backoff for transient network failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// A single attempt, no retries
    pub fn none() -> Self {
        Self {
            attempts: 1,
            ..Self::default()
        }
    }

    /// Delay before the retry following `attempt` (zero-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(1u32 << attempt.min(16))
            .min(self.max_delay)
    }
}

/// HTTP fragment store
///
/// Requests run on smol's blocking pool through reqwest's blocking client.
/// Only network-level failures are retried; HTTP status errors are final.
#[derive(Debug, Clone)]
pub struct HttpFragmentStore {
    client: reqwest::blocking::Client,
    retry: RetryPolicy,
}

impl HttpFragmentStore {
    pub fn new(retry: RetryPolicy) -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| FetchError::Network {
                url: String::new(),
                message: e.to_string(),
            })?;

        Ok(Self { client, retry })
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }
}

#[async_trait(?Send)]
impl FragmentStore for HttpFragmentStore {
    async fn get(&self, url: &Url) -> Result<String, FetchError> {
        let mut attempt = 0;
        loop {
            let client = self.client.clone();
            let target = url.clone();
            let result = smol::unblock(move || fetch_blocking(&client, target)).await;

            match result {
                Err(err) if err.is_retryable() && attempt + 1 < self.retry.attempts => {
                    let delay = self.retry.delay_for(attempt);
                    tracing::debug!(url = %url, attempt, ?delay, "Retrying after: {}", err);
                    smol::Timer::after(delay).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }
}

fn fetch_blocking(client: &reqwest::blocking::Client, url: Url) -> Result<String, FetchError> {
    let network = |e: reqwest::Error| FetchError::Network {
        url: url.to_string(),
        message: e.to_string(),
    };

    let response = client.get(url.clone()).send().map_err(network)?;
    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let body = response.bytes().map_err(network)?;
    String::from_utf8(body.to_vec()).map_err(|_| FetchError::InvalidEncoding {
        url: url.to_string(),
    })
}

/// Fragment store backed by a local directory
///
/// The URL path is resolved under the root; the host and query are ignored.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a URL path onto a file under the root
    ///
    /// Each segment is percent-decoded and must name a single plain component.
    fn resolve(&self, url: &Url) -> Result<PathBuf, FetchError> {
        let invalid = || FetchError::InvalidUrl(url.to_string());
        let mut path = self.root.clone();

        for segment in url.path_segments().ok_or_else(invalid)? {
            if segment.is_empty() {
                continue;
            }
            let decoded = urlencoding::decode(segment).map_err(|_| invalid())?;
            let decoded: &str = &decoded;
            if decoded.contains(['/', '\\']) {
                return Err(invalid());
            }
            let mut components = Path::new(decoded).components();
            match (components.next(), components.next()) {
                (Some(Component::Normal(part)), None) => path.push(part),
                _ => return Err(invalid()),
            }
        }
        Ok(path)
    }
}

#[async_trait(?Send)]
impl FragmentStore for DirectoryStore {
    async fn get(&self, url: &Url) -> Result<String, FetchError> {
        let path = self.resolve(url)?;
        tracing::trace!(path = %path.display(), "Reading fragment file");

        smol::fs::read_to_string(&path).await.map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => FetchError::Status {
                url: url.to_string(),
                status: 404,
            },
            io::ErrorKind::InvalidData => FetchError::InvalidEncoding {
                url: url.to_string(),
            },
            _ => FetchError::Network {
                url: url.to_string(),
                message: e.to_string(),
            },
        })
    }
}

/// In-memory fragment store keyed by URL path
///
/// Records every request so callers can count round trips.
#[derive(Debug, Default)]
pub struct MemoryStore {
    files: RefCell<HashMap<String, String>>,
    requests: RefCell<Vec<Url>>,
    offline: Cell<bool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file at a URL path such as `/content/html/home.html`
    pub fn with_file(self, path: &str, body: &str) -> Self {
        self.insert(path, body);
        self
    }

    /// Add a page's HTML under the default layout
    pub fn with_html(self, id: &str, html: &str) -> Self {
        self.with_file(&format!("/content/html/{id}.html"), html)
    }

    /// Add a page's CSS under the default layout
    pub fn with_css(self, id: &str, css: &str) -> Self {
        self.with_file(&format!("/content/css/{id}.css"), css)
    }

    /// Add a script under the default layout
    pub fn with_script(self, path: &str, source: &str) -> Self {
        self.with_file(&format!("/content/js/{path}"), source)
    }

    pub fn insert(&self, path: &str, body: &str) {
        self.files
            .borrow_mut()
            .insert(normalize(path), body.to_string());
    }

    pub fn remove(&self, path: &str) -> bool {
        self.files.borrow_mut().remove(&normalize(path)).is_some()
    }

    /// Fail every request with a network error
    pub fn set_offline(&self, offline: bool) {
        self.offline.set(offline);
    }

    /// Every URL requested so far, query included
    pub fn requests(&self) -> Vec<Url> {
        self.requests.borrow().clone()
    }

    /// Number of requests made for a URL path
    pub fn request_count(&self, path: &str) -> usize {
        let path = normalize(path);
        self.requests
            .borrow()
            .iter()
            .filter(|u| decoded_path(u) == path)
            .count()
    }
}

fn normalize(path: &str) -> String {
    format!("/{}", path.trim_start_matches('/'))
}

fn decoded_path(url: &Url) -> String {
    urlencoding::decode(url.path())
        .map(|path| path.into_owned())
        .unwrap_or_else(|_| url.path().to_string())
}

#[async_trait(?Send)]
impl FragmentStore for MemoryStore {
    async fn get(&self, url: &Url) -> Result<String, FetchError> {
        self.requests.borrow_mut().push(url.clone());

        if self.offline.get() {
            return Err(FetchError::Network {
                url: url.to_string(),
                message: "store offline".into(),
            });
        }

        self.files
            .borrow()
            .get(&decoded_path(url))
            .cloned()
            .ok_or_else(|| FetchError::Status {
                url: url.to_string(),
                status: 404,
            })
    }
}
