//! Content Identifiers
//!
//! Case-normalized keys naming a page fragment.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;

/// Identifier of a navigable page fragment ("home", "projects", ...)
///
/// Always trimmed and lowercased, never empty. Every constructor yields the
/// [`ContentId::parse`] form, so two ids compare equal exactly when they
/// name the same fragment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentId(String);

/// Name of the landing page
const HOME: &str = "home";

/// Raised when an identifier is empty after normalization
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("content identifier is empty")]
pub struct EmptyContentId;

impl ContentId {
    /// Normalize `raw` into an identifier
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_lowercase();
        if normalized.is_empty() {
            None
        } else {
            Some(Self(normalized))
        }
    }

    /// The landing page
    pub fn home() -> Self {
        Self(HOME.to_string())
    }

    /// Get the normalized string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ContentId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ContentId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl FromStr for ContentId {
    type Err = EmptyContentId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or(EmptyContentId)
    }
}

impl TryFrom<String> for ContentId {
    type Error = EmptyContentId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or(EmptyContentId)
    }
}

impl TryFrom<&str> for ContentId {
    type Error = EmptyContentId;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value).ok_or(EmptyContentId)
    }
}

impl From<ContentId> for String {
    fn from(id: ContentId) -> Self {
        id.0
    }
}
