//! Breadcrumb Tracker
//!
//! Ordered trail of visited pages with back-navigation collapsing.

use drift_dom::{ContentId, CrumbState, CrumbView, Surface};

/// Visited-page stack and its rendered trail
#[derive(Debug, Default)]
pub struct BreadcrumbTracker {
    stack: Vec<ContentId>,
    rendered: Vec<CrumbView>,
}

impl BreadcrumbTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a visit
    ///
    /// Revisiting a page already on the trail truncates the trail to that
    /// occurrence; anything else is appended.
    pub fn update(&mut self, id: &ContentId) {
        match self.stack.iter().position(|c| c == id) {
            Some(index) => self.stack.truncate(index + 1),
            None => self.stack.push(id.clone()),
        }
    }

    pub fn stack(&self) -> &[ContentId] {
        &self.stack
    }

    /// Rendered crumbs, including ones still playing their exit animation
    pub fn rendered(&self) -> &[CrumbView] {
        &self.rendered
    }

    /// Diff the stack against the rendered trail and draw it
    ///
    /// The longest common prefix keeps its state, obsolete crumbs start
    /// exiting and new crumbs start entering. Crumbs already exiting stay
    /// until [`BreadcrumbTracker::settle`].
    pub fn render(&mut self, surface: &mut dyn Surface) {
        let (live, exiting): (Vec<CrumbView>, Vec<CrumbView>) = std::mem::take(&mut self.rendered)
            .into_iter()
            .partition(|c| c.state != CrumbState::Exiting);

        let shared = live
            .iter()
            .zip(&self.stack)
            .take_while(|(crumb, id)| crumb.id == **id)
            .count();

        let mut trail: Vec<CrumbView> = live[..shared].to_vec();
        trail.extend(self.stack[shared..].iter().map(|id| CrumbView {
            id: id.clone(),
            label: id.to_string(),
            state: CrumbState::Entering,
        }));
        trail.extend(exiting);
        trail.extend(live[shared..].iter().map(|crumb| CrumbView {
            state: CrumbState::Exiting,
            ..crumb.clone()
        }));

        tracing::debug!(
            kept = shared,
            entering = self.stack.len() - shared,
            exiting = live.len() - shared,
            "Rendered breadcrumbs"
        );
        surface.render_trail(&trail);
        self.rendered = trail;
    }

    /// Finish animations: drop exiting crumbs, settle entering ones
    pub fn settle(&mut self, surface: &mut dyn Surface) {
        self.rendered.retain(|c| c.state != CrumbState::Exiting);
        for crumb in &mut self.rendered {
            crumb.state = CrumbState::Visible;
        }
        surface.render_trail(&self.rendered);
    }

    /// Page a crumb navigates to
    pub fn crumb_target(&self, index: usize) -> Option<&ContentId> {
        self.stack.get(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drift_dom::MemorySurface;

    fn id(raw: &str) -> ContentId {
        ContentId::parse(raw).unwrap()
    }

    fn ids(tracker: &BreadcrumbTracker) -> Vec<&str> {
        tracker.stack().iter().map(ContentId::as_str).collect()
    }

    fn states(surface: &MemorySurface) -> Vec<(String, CrumbState)> {
        surface
            .trail()
            .iter()
            .map(|c| (c.label.clone(), c.state))
            .collect()
    }

    #[test]
    fn test_update_collapses_on_revisit() {
        let mut tracker = BreadcrumbTracker::new();
        for page in ["a", "b", "c"] {
            tracker.update(&id(page));
        }
        tracker.update(&id("b"));
        assert_eq!(ids(&tracker), vec!["a", "b"]);

        tracker.update(&id("d"));
        assert_eq!(ids(&tracker), vec!["a", "b", "d"]);
    }

    #[test]
    fn test_update_same_page_is_stable() {
        let mut tracker = BreadcrumbTracker::new();
        tracker.update(&id("home"));
        tracker.update(&id("home"));
        assert_eq!(ids(&tracker), vec!["home"]);
    }

    #[test]
    fn test_render_diffs_common_prefix() {
        let mut surface = MemorySurface::new();
        let mut tracker = BreadcrumbTracker::new();
        tracker.update(&id("a"));
        tracker.update(&id("b"));
        tracker.render(&mut surface);
        tracker.settle(&mut surface);

        tracker.update(&id("a"));
        tracker.update(&id("c"));
        tracker.render(&mut surface);

        assert_eq!(
            states(&surface),
            vec![
                ("a".into(), CrumbState::Visible),
                ("c".into(), CrumbState::Entering),
                ("b".into(), CrumbState::Exiting),
            ]
        );

        tracker.settle(&mut surface);
        assert_eq!(
            states(&surface),
            vec![("a".into(), CrumbState::Visible), ("c".into(), CrumbState::Visible)]
        );
    }

    #[test]
    fn test_exiting_crumbs_wait_for_settle() {
        let mut surface = MemorySurface::new();
        let mut tracker = BreadcrumbTracker::new();
        for page in ["a", "b", "c"] {
            tracker.update(&id(page));
        }
        tracker.render(&mut surface);
        tracker.settle(&mut surface);

        tracker.update(&id("b"));
        tracker.render(&mut surface);
        tracker.update(&id("a"));
        tracker.render(&mut surface);

        let exiting: Vec<_> = tracker
            .rendered()
            .iter()
            .filter(|c| c.state == CrumbState::Exiting)
            .map(|c| c.id.as_str())
            .collect();
        assert_eq!(exiting, vec!["c", "b"]);

        tracker.settle(&mut surface);
        assert_eq!(surface.trail().len(), 1);
    }

    #[test]
    fn test_crumb_target() {
        let mut tracker = BreadcrumbTracker::new();
        tracker.update(&id("home"));
        tracker.update(&id("projects"));
        assert_eq!(tracker.crumb_target(0), Some(&id("home")));
        assert_eq!(tracker.crumb_target(2), None);
    }
}
