//! Session history
//!
//! The browser history stack as seen by the engine: entries carry a JSON
//! `{ "content": id }` state.

use drift_dom::ContentId;
use serde::{Deserialize, Serialize};

/// State stored with every history entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryState {
    pub content: ContentId,
}

impl HistoryState {
    pub fn new(content: ContentId) -> Self {
        Self { content }
    }

    /// Serialize to the JSON form the browser stores
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("{{\"content\":\"{}\"}}", self.content))
    }
}

/// Parse a popped state; `None` for missing or malformed states
pub fn parse_state(json: &str) -> Option<HistoryState> {
    match serde_json::from_str(json) {
        Ok(state) => Some(state),
        Err(e) => {
            tracing::debug!("Ignoring history state {:?}: {}", json, e);
            None
        }
    }
}

/// History entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    /// JSON-serialized state
    pub state: String,
}

impl HistoryEntry {
    pub fn content(&self) -> Option<ContentId> {
        parse_state(&self.state).map(|s| s.content)
    }
}

/// History stack with a cursor
#[derive(Debug, Default)]
pub struct SessionHistory {
    entries: Vec<HistoryEntry>,
    current: usize,
}

impl SessionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a new entry, dropping forward history
    pub fn push(&mut self, content: &ContentId) {
        if !self.entries.is_empty() {
            self.entries.truncate(self.current + 1);
        }
        self.entries.push(HistoryEntry {
            state: HistoryState::new(content.clone()).to_json(),
        });
        self.current = self.entries.len() - 1;
    }

    /// Replace the current entry, or create it on an empty stack
    pub fn replace(&mut self, content: &ContentId) {
        let state = HistoryState::new(content.clone()).to_json();
        match self.entries.get_mut(self.current) {
            Some(entry) => entry.state = state,
            None => {
                self.entries.push(HistoryEntry { state });
                self.current = 0;
            }
        }
    }

    /// Go back
    pub fn back(&mut self) -> Option<&HistoryEntry> {
        if self.current > 0 {
            self.current -= 1;
            self.entries.get(self.current)
        } else {
            None
        }
    }

    /// Go forward
    pub fn forward(&mut self) -> Option<&HistoryEntry> {
        if self.current + 1 < self.entries.len() {
            self.current += 1;
            self.entries.get(self.current)
        } else {
            None
        }
    }

    pub fn current(&self) -> Option<&HistoryEntry> {
        self.entries.get(self.current)
    }

    /// Page of the current entry
    pub fn current_content(&self) -> Option<ContentId> {
        self.current().and_then(HistoryEntry::content)
    }

    /// Cursor position
    pub fn index(&self) -> usize {
        self.current
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }
}
