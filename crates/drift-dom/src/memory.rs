//! In-memory surface
//!
//! A headless [`Surface`] for tests and the command-line driver.

use crate::css;
use crate::{CrumbView, ElementInfo, ElementKey, FragmentParser, Surface};
use std::collections::{BTreeSet, HashMap};
use std::time::Duration;

/// Headless page model
///
/// Counts every state-changing call in [`MemorySurface::mutations`], which
/// lets callers assert that an operation left the page untouched.
#[derive(Debug, Default)]
pub struct MemorySurface {
    parser: FragmentParser,
    shell: Vec<ElementInfo>,
    content: Vec<ElementInfo>,
    content_html: String,
    mount_classes: BTreeSet<String>,
    reveal_delays: HashMap<ElementKey, Duration>,
    styles: Vec<(String, String)>,
    background: Option<String>,
    layers: Vec<String>,
    trail: Vec<CrumbView>,
    mutations: u64,
}

impl MemorySurface {
    /// Create an empty surface
    pub fn new() -> Self {
        Self {
            parser: FragmentParser::new(),
            ..Default::default()
        }
    }

    /// Create a surface whose shell is parsed from `html`
    pub fn with_shell(html: &str) -> Self {
        let mut surface = Self::new();
        surface.shell = surface.parser.parse(html);
        surface
    }

    /// Number of state-changing calls so far
    pub fn mutations(&self) -> u64 {
        self.mutations
    }

    /// Ids of attached styles in attachment order
    pub fn style_ids(&self) -> Vec<&str> {
        self.styles.iter().map(|(id, _)| id.as_str()).collect()
    }

    /// Text of an attached style
    pub fn style_text(&self, id: &str) -> Option<&str> {
        self.styles
            .iter()
            .find(|(sid, _)| sid == id)
            .map(|(_, css)| css.as_str())
    }

    /// Reveal delay scheduled for an element
    pub fn reveal_delay(&self, key: ElementKey) -> Option<Duration> {
        self.reveal_delays.get(&key).copied()
    }

    /// Mount point classes, sorted
    pub fn mount_classes(&self) -> Vec<&str> {
        self.mount_classes.iter().map(String::as_str).collect()
    }

    /// Backdrop layers in insertion order
    pub fn layers(&self) -> &[String] {
        &self.layers
    }

    /// Last rendered breadcrumb trail
    pub fn trail(&self) -> &[CrumbView] {
        &self.trail
    }

    /// First content element with the given class
    pub fn find_content_by_class(&self, class: &str) -> Option<&ElementInfo> {
        self.content.iter().find(|e| e.has_class(class))
    }

    /// First element (either region) with the given id attribute
    pub fn find_by_id(&self, id: &str) -> Option<&ElementInfo> {
        self.shell
            .iter()
            .chain(self.content.iter())
            .find(|e| e.id.as_deref() == Some(id))
    }

    fn element_mut(&mut self, key: ElementKey) -> Option<&mut ElementInfo> {
        self.shell
            .iter_mut()
            .chain(self.content.iter_mut())
            .find(|e| e.key == key)
    }

    fn touch(&mut self) {
        self.mutations += 1;
    }
}

impl Surface for MemorySurface {
    fn set_content(&mut self, html: &str) {
        self.content = self.parser.parse(html);
        self.content_html = html.to_string();
        self.reveal_delays.clear();
        self.touch();
    }

    fn content_html(&self) -> String {
        self.content_html.clone()
    }

    fn add_mount_class(&mut self, class: &str) {
        if self.mount_classes.insert(class.to_string()) {
            self.touch();
        }
    }

    fn remove_mount_class(&mut self, class: &str) {
        if self.mount_classes.remove(class) {
            self.touch();
        }
    }

    fn has_mount_class(&self, class: &str) -> bool {
        self.mount_classes.contains(class)
    }

    fn shell_elements(&self) -> Vec<ElementInfo> {
        self.shell.clone()
    }

    fn content_elements(&self) -> Vec<ElementInfo> {
        self.content.clone()
    }

    fn element(&self, key: ElementKey) -> Option<ElementInfo> {
        self.shell
            .iter()
            .chain(self.content.iter())
            .find(|e| e.key == key)
            .cloned()
    }

    fn add_class(&mut self, key: ElementKey, class: &str) -> bool {
        let changed = self
            .element_mut(key)
            .map(|e| e.add_class(class))
            .unwrap_or(false);
        if changed {
            self.touch();
        }
        changed
    }

    fn remove_class(&mut self, key: ElementKey, class: &str) -> bool {
        let changed = self
            .element_mut(key)
            .map(|e| e.remove_class(class))
            .unwrap_or(false);
        if changed {
            self.touch();
        }
        changed
    }

    fn set_attribute(&mut self, key: ElementKey, name: &str, value: &str) -> bool {
        let Some(element) = self.element_mut(key) else {
            return false;
        };
        element.set_attr(name, value);
        self.touch();
        true
    }

    fn set_text(&mut self, key: ElementKey, text: &str) -> bool {
        let Some(element) = self.element_mut(key) else {
            return false;
        };
        element.text = text.to_string();
        self.touch();
        true
    }

    fn set_value(&mut self, key: ElementKey, value: &str) -> bool {
        self.set_attribute(key, "value", value)
    }

    fn set_reveal_delay(&mut self, key: ElementKey, delay: Duration) -> bool {
        if !self.content.iter().any(|e| e.key == key) {
            return false;
        }
        self.reveal_delays.insert(key, delay);
        self.touch();
        true
    }

    fn attach_style(&mut self, id: &str, css: &str) {
        self.styles.retain(|(sid, _)| sid != id);
        self.styles.push((id.to_string(), css.to_string()));
        self.touch();
    }

    fn detach_style(&mut self, id: &str) -> bool {
        let before = self.styles.len();
        self.styles.retain(|(sid, _)| sid != id);
        let removed = self.styles.len() != before;
        if removed {
            self.touch();
        }
        removed
    }

    fn has_style(&self, id: &str) -> bool {
        self.styles.iter().any(|(sid, _)| sid == id)
    }

    fn computed_property(&self, name: &str) -> Option<String> {
        self.styles
            .iter()
            .filter_map(|(_, text)| css::declared_value(text, name))
            .last()
    }

    fn set_background_color(&mut self, color: &str) {
        if self.background.as_deref() != Some(color) {
            self.background = Some(color.to_string());
            self.touch();
        }
    }

    fn background_color(&self) -> Option<String> {
        self.background.clone()
    }

    fn insert_layer(&mut self, name: &str) -> bool {
        if self.layers.iter().any(|l| l == name) {
            return false;
        }
        self.layers.push(name.to_string());
        self.touch();
        true
    }

    fn remove_layer(&mut self, name: &str) -> bool {
        let before = self.layers.len();
        self.layers.retain(|l| l != name);
        let removed = self.layers.len() != before;
        if removed {
            self.touch();
        }
        removed
    }

    fn render_trail(&mut self, crumbs: &[CrumbView]) {
        if self.trail != crumbs {
            self.trail = crumbs.to_vec();
            self.touch();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ContentId;
    use crate::CrumbState;

    #[test]
    fn test_set_content_replaces_subtree() {
        let mut surface = MemorySurface::new();
        surface.set_content("<div class=\"main__content\"><p>one</p></div>");
        let first = surface.content_elements();

        surface.set_content("<p>two</p>");
        let second = surface.content_elements();

        assert_eq!(second.len(), 1);
        assert_eq!(second[0].text, "two");
        assert!(surface.element(first[0].key).is_none());
        assert_eq!(surface.content_html(), "<p>two</p>");
    }

    #[test]
    fn test_computed_property_prefers_later_styles() {
        let mut surface = MemorySurface::new();
        surface.attach_style("content-style-a", ":root { --base-bg-color: #111; }");
        surface.attach_style("content-style-b", ":root { --base-bg-color: #222; }");
        assert_eq!(surface.computed_property("--base-bg-color").as_deref(), Some("#222"));

        assert!(surface.detach_style("content-style-b"));
        assert_eq!(surface.computed_property("--base-bg-color").as_deref(), Some("#111"));
        assert!(!surface.detach_style("content-style-b"));
    }

    #[test]
    fn test_attach_style_replaces_same_id() {
        let mut surface = MemorySurface::new();
        surface.attach_style("s", "a{}");
        surface.attach_style("s", "b{}");
        assert_eq!(surface.style_ids(), vec!["s"]);
        assert_eq!(surface.style_text("s"), Some("b{}"));
    }

    #[test]
    fn test_noop_calls_do_not_count_as_mutations() {
        let mut surface = MemorySurface::with_shell("<a id=\"navbar__logo\">logo</a>");
        surface.add_mount_class("content-fade-out");
        let count = surface.mutations();

        surface.add_mount_class("content-fade-out");
        surface.remove_mount_class("content-fade-in");
        surface.set_background_color("#000");
        let after_color = surface.mutations();
        surface.set_background_color("#000");

        assert_eq!(after_color, count + 1);
        assert_eq!(surface.mutations(), after_color);
    }

    #[test]
    fn test_reveal_delay_only_for_content() {
        let mut surface = MemorySurface::with_shell("<nav>menu</nav>");
        surface.set_content("<h1>title</h1>");
        let shell_key = surface.shell_elements()[0].key;
        let content_key = surface.content_elements()[0].key;

        assert!(!surface.set_reveal_delay(shell_key, Duration::from_millis(10)));
        assert!(surface.set_reveal_delay(content_key, Duration::from_millis(10)));
        assert_eq!(surface.reveal_delay(content_key), Some(Duration::from_millis(10)));
    }

    #[test]
    fn test_trail_rendering() {
        let mut surface = MemorySurface::new();
        let crumbs = vec![CrumbView {
            id: ContentId::parse("home").unwrap(),
            label: "home".into(),
            state: CrumbState::Visible,
        }];
        surface.render_trail(&crumbs);
        assert_eq!(surface.trail(), crumbs.as_slice());
    }
}
