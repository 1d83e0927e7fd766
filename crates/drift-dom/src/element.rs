//! Element snapshots
//!
//! Lightweight views of shell and content elements.

use std::fmt;

/// Stable handle of an element on a surface
///
/// Keys are never reused: replacing the content subtree mints fresh keys,
/// so a handle taken before a swap can no longer reach the new subtree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementKey(pub u32);

impl fmt::Display for ElementKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Snapshot of an element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementInfo {
    /// Surface handle
    pub key: ElementKey,
    /// Lowercase tag name
    pub tag: String,
    /// `id` attribute
    pub id: Option<String>,
    /// `class` attribute, split
    pub classes: Vec<String>,
    /// All attributes in source order (including `id` and `class`)
    pub attrs: Vec<(String, String)>,
    /// Visible text, whitespace collapsed
    pub text: String,
}

impl ElementInfo {
    /// Create an element with no attributes
    pub fn new(key: ElementKey, tag: &str) -> Self {
        Self {
            key,
            tag: tag.to_ascii_lowercase(),
            id: None,
            classes: Vec::new(),
            attrs: Vec::new(),
            text: String::new(),
        }
    }

    /// Get an attribute value
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Check for an attribute
    pub fn has_attr(&self, name: &str) -> bool {
        self.attr(name).is_some()
    }

    /// Check for a class
    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    /// Current form value (the `value` attribute)
    pub fn value(&self) -> Option<&str> {
        self.attr("value")
    }

    /// Set or replace an attribute, keeping `id` and `classes` in sync
    pub fn set_attr(&mut self, name: &str, value: &str) {
        let name = name.to_ascii_lowercase();
        match self.attrs.iter_mut().find(|(n, _)| *n == name) {
            Some((_, v)) => *v = value.to_string(),
            None => self.attrs.push((name.clone(), value.to_string())),
        }

        if name == "id" {
            self.id = Some(value.to_string());
        } else if name == "class" {
            self.classes = value.split_whitespace().map(str::to_string).collect();
        }
    }

    /// Add a class; returns false if already present
    pub fn add_class(&mut self, class: &str) -> bool {
        if self.has_class(class) {
            return false;
        }
        self.classes.push(class.to_string());
        self.sync_class_attr();
        true
    }

    /// Remove a class; returns false if absent
    pub fn remove_class(&mut self, class: &str) -> bool {
        let before = self.classes.len();
        self.classes.retain(|c| c != class);
        if self.classes.len() == before {
            return false;
        }
        self.sync_class_attr();
        true
    }

    fn sync_class_attr(&mut self) {
        let joined = self.classes.join(" ");
        match self.attrs.iter_mut().find(|(n, _)| n == "class") {
            Some((_, v)) => *v = joined,
            None => self.attrs.push(("class".to_string(), joined)),
        }
    }
}
