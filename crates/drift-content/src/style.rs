//! Style Injector
//!
//! Attaches each page's stylesheet as an identifiable head resource.

use drift_dom::{ContentId, Surface};
use std::collections::BTreeSet;

/// Head resource id for a page's stylesheet
pub fn style_id(content: &ContentId) -> String {
    format!("content-style-{}", content)
}

/// Tracks which page styles are attached
///
/// At most one style per page; both operations are idempotent.
#[derive(Debug, Default)]
pub struct StyleInjector {
    attached: BTreeSet<ContentId>,
}

impl StyleInjector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a page's stylesheet unless it is already attached
    ///
    /// Returns true if the surface was changed. A record whose element the
    /// surface lost is repaired by re-attaching.
    pub fn apply(&mut self, surface: &mut dyn Surface, content: &ContentId, css: &str) -> bool {
        let id = style_id(content);
        if self.attached.contains(content) {
            if surface.has_style(&id) {
                return false;
            }
            tracing::debug!(content = %content, "Style record without element; re-attaching");
        }

        surface.attach_style(&id, css);
        self.attached.insert(content.clone());
        tracing::debug!(content = %content, "Attached page style");
        true
    }

    /// Detach a page's stylesheet; returns true if one was attached
    pub fn remove(&mut self, surface: &mut dyn Surface, content: &ContentId) -> bool {
        let recorded = self.attached.remove(content);
        let detached = surface.detach_style(&style_id(content));
        if detached {
            tracing::debug!(content = %content, "Detached page style");
        }
        recorded || detached
    }

    /// Detach every page style except `keep`; returns the number removed
    pub fn retain_only(&mut self, surface: &mut dyn Surface, keep: Option<&ContentId>) -> usize {
        let leaving: Vec<ContentId> = self
            .attached
            .iter()
            .filter(|id| Some(*id) != keep)
            .cloned()
            .collect();

        leaving
            .iter()
            .filter(|id| self.remove(surface, id))
            .count()
    }

    pub fn is_applied(&self, content: &ContentId) -> bool {
        self.attached.contains(content)
    }

    /// Pages whose style is recorded as attached
    pub fn applied(&self) -> impl Iterator<Item = &ContentId> {
        self.attached.iter()
    }
}
