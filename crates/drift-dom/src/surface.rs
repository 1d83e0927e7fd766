//! Surface contract
//!
//! The DOM operations consumed by the content engine.

use crate::{ContentId, ElementInfo, ElementKey};
use std::time::Duration;

/// Animation state of a rendered breadcrumb
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CrumbState {
    /// Playing its enter animation
    #[default]
    Entering,
    /// Settled
    Visible,
    /// Playing its exit animation; removed once settled
    Exiting,
}

/// A breadcrumb as handed to the surface for rendering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrumbView {
    pub id: ContentId,
    pub label: String,
    pub state: CrumbState,
}

/// The page the engine swaps content on
///
/// The surface has two element regions: the static *shell* (navigation,
/// logo, search box) and the *content* subtree under the mount point,
/// which is replaced wholesale by [`Surface::set_content`]. Element
/// mutators return `false` when the key no longer resolves.
pub trait Surface {
    /// Replace the markup under the mount point
    fn set_content(&mut self, html: &str);

    /// Current markup under the mount point
    fn content_html(&self) -> String;

    /// Add a class to the mount point
    fn add_mount_class(&mut self, class: &str);

    /// Remove a class from the mount point
    fn remove_mount_class(&mut self, class: &str);

    /// Check a class on the mount point
    fn has_mount_class(&self, class: &str) -> bool;

    /// Elements outside the mount point, in document order
    fn shell_elements(&self) -> Vec<ElementInfo>;

    /// Elements under the mount point, in document order
    fn content_elements(&self) -> Vec<ElementInfo>;

    /// Look up an element in either region
    fn element(&self, key: ElementKey) -> Option<ElementInfo>;

    fn add_class(&mut self, key: ElementKey, class: &str) -> bool;

    fn remove_class(&mut self, key: ElementKey, class: &str) -> bool;

    fn set_attribute(&mut self, key: ElementKey, name: &str, value: &str) -> bool;

    fn set_text(&mut self, key: ElementKey, text: &str) -> bool;

    /// Set the form value of an input-like element
    fn set_value(&mut self, key: ElementKey, value: &str) -> bool;

    /// Delay before the element's reveal animation starts
    fn set_reveal_delay(&mut self, key: ElementKey, delay: Duration) -> bool;

    /// Attach a head style resource; replaces one with the same id
    fn attach_style(&mut self, id: &str, css: &str);

    /// Detach a head style resource; returns false if it was not attached
    fn detach_style(&mut self, id: &str) -> bool;

    fn has_style(&self, id: &str) -> bool;

    /// Resolve a custom property against the attached styles
    ///
    /// Later style resources win over earlier ones.
    fn computed_property(&self, name: &str) -> Option<String>;

    /// Set the backdrop color
    fn set_background_color(&mut self, color: &str);

    fn background_color(&self) -> Option<String>;

    /// Insert a named layer into the backdrop container
    fn insert_layer(&mut self, name: &str) -> bool;

    /// Remove a named backdrop layer
    fn remove_layer(&mut self, name: &str) -> bool;

    /// Render the breadcrumb trail
    fn render_trail(&mut self, crumbs: &[CrumbView]);
}
