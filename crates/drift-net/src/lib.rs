//! Drift Networking
//!
//! Fragment store access and the in-memory resource cache.

mod paths;
mod store;
mod cache;

pub use paths::{CacheBuster, FragmentPaths, ResourceKind, CACHE_BUST_PARAM};
pub use store::{DirectoryStore, FragmentStore, HttpFragmentStore, MemoryStore, RetryPolicy};
pub use cache::{CacheStats, ResourceCache};
pub use url::Url;

/// Fetch error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("HTTP error {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Network error for {url}: {message}")]
    Network { url: String, message: String },

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid encoding for {url}")]
    InvalidEncoding { url: String },
}

impl FetchError {
    /// The store answered, but has no such resource
    pub fn is_not_found(&self) -> bool {
        matches!(self, FetchError::Status { status: 404, .. })
    }

    /// Transient failures worth retrying within a request
    pub fn is_retryable(&self) -> bool {
        matches!(self, FetchError::Network { .. })
    }
}
