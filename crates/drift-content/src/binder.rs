//! Navigation Binder
//!
//! Maps interactive elements to the pages they open, following an ordered
//! trigger manifest. Shell triggers are bound once; content triggers are
//! re-bound after every swap since the content subtree is replaced.

use drift_dom::{ContentId, ElementInfo, ElementKey, Surface};
use serde::{Deserialize, Serialize};

/// Rejected trigger
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BindError {
    #[error("Trigger {element} names no page")]
    EmptyTarget { element: ElementKey },

    #[error("Page '{id}' is not in the allow-list")]
    NotAllowed { id: ContentId },
}

/// Which elements a rule applies to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Matcher {
    /// Elements carrying the attribute
    Attribute(String),
    Class(String),
    Id(String),
}

impl Matcher {
    pub fn matches(&self, element: &ElementInfo) -> bool {
        match self {
            Matcher::Attribute(name) => element.has_attr(name),
            Matcher::Class(class) => element.has_class(class),
            Matcher::Id(id) => element.id.as_deref() == Some(id.as_str()),
        }
    }
}

/// Where a matched element's target page comes from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Attribute(String),
    Fixed(ContentId),
    /// Visible text
    Text,
    /// The attribute if present and non-empty, else the visible text
    AttributeOrText(String),
}

impl Source {
    fn extract(&self, element: &ElementInfo) -> Option<ContentId> {
        match self {
            Source::Attribute(name) => element.attr(name).and_then(ContentId::parse),
            Source::Fixed(id) => Some(id.clone()),
            Source::Text => ContentId::parse(&element.text),
            Source::AttributeOrText(name) => element
                .attr(name)
                .and_then(ContentId::parse)
                .or_else(|| ContentId::parse(&element.text)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerRule {
    pub matcher: Matcher,
    pub source: Source,
}

impl TriggerRule {
    pub fn new(matcher: Matcher, source: Source) -> Self {
        Self { matcher, source }
    }
}

/// Ordered trigger rules; the first matching rule wins
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriggerManifest {
    pub rules: Vec<TriggerRule>,
    /// Pages triggers may open; `None` allows any
    pub allow: Option<Vec<ContentId>>,
}

impl Default for TriggerManifest {
    fn default() -> Self {
        let home = ContentId::home();
        Self {
            rules: vec![
                TriggerRule::new(
                    Matcher::Attribute("data-dialog".into()),
                    Source::Attribute("data-dialog".into()),
                ),
                TriggerRule::new(Matcher::Id("navbar__logo".into()), Source::Fixed(home)),
                TriggerRule::new(
                    Matcher::Class("hidden-link".into()),
                    Source::AttributeOrText("data-dialog".into()),
                ),
                TriggerRule::new(
                    Matcher::Class("hidden-link-red".into()),
                    Source::Attribute("data-dialog".into()),
                ),
            ],
            allow: None,
        }
    }
}

impl TriggerManifest {
    /// Target page of an element, if any rule matches it
    pub fn resolve(&self, element: &ElementInfo) -> Option<Result<ContentId, BindError>> {
        let rule = self.rules.iter().find(|r| r.matcher.matches(element))?;
        let result = match rule.source.extract(element) {
            Some(id) => self.validate(&id).map(|()| id),
            None => Err(BindError::EmptyTarget { element: element.key }),
        };
        Some(result)
    }

    pub fn validate(&self, id: &ContentId) -> Result<(), BindError> {
        match &self.allow {
            Some(allowed) if !allowed.contains(id) => Err(BindError::NotAllowed { id: id.clone() }),
            _ => Ok(()),
        }
    }
}

/// A bound trigger
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub key: ElementKey,
    pub target: ContentId,
}

/// Element-to-page bindings for the shell and the current content
#[derive(Debug)]
pub struct NavigationBinder {
    manifest: TriggerManifest,
    search_class: String,
    shell: Vec<Binding>,
    content: Vec<Binding>,
    search_input: Option<ElementKey>,
}

impl NavigationBinder {
    pub fn new(manifest: TriggerManifest, search_class: &str) -> Self {
        Self {
            manifest,
            search_class: search_class.to_string(),
            shell: Vec::new(),
            content: Vec::new(),
            search_input: None,
        }
    }

    pub fn manifest(&self) -> &TriggerManifest {
        &self.manifest
    }

    /// Bind shell triggers and locate the search input
    ///
    /// Returns the rejected triggers.
    pub fn bind_shell(&mut self, surface: &dyn Surface) -> Vec<BindError> {
        let elements = surface.shell_elements();
        self.search_input = elements
            .iter()
            .find(|e| e.has_class(&self.search_class))
            .map(|e| e.key);

        let (bindings, rejected) = self.bind(&elements);
        tracing::debug!(
            bound = bindings.len(),
            rejected = rejected.len(),
            search = self.search_input.is_some(),
            "Bound shell triggers"
        );
        self.shell = bindings;
        rejected
    }

    /// Replace the content bindings with triggers in the current subtree
    pub fn rebind_content(&mut self, surface: &dyn Surface) -> Vec<BindError> {
        let (bindings, rejected) = self.bind(&surface.content_elements());
        tracing::debug!(bound = bindings.len(), rejected = rejected.len(), "Bound content triggers");
        self.content = bindings;
        rejected
    }

    fn bind(&self, elements: &[ElementInfo]) -> (Vec<Binding>, Vec<BindError>) {
        let mut bindings = Vec::new();
        let mut rejected = Vec::new();

        for element in elements {
            match self.manifest.resolve(element) {
                Some(Ok(target)) => bindings.push(Binding {
                    key: element.key,
                    target,
                }),
                Some(Err(err)) => {
                    tracing::warn!(element = %element.key, tag = %element.tag, "Rejected trigger: {}", err);
                    rejected.push(err);
                }
                None => {}
            }
        }
        (bindings, rejected)
    }

    /// Page an activated element opens
    pub fn resolve(&self, key: ElementKey) -> Option<&ContentId> {
        self.content
            .iter()
            .chain(self.shell.iter())
            .find(|b| b.key == key)
            .map(|b| &b.target)
    }

    pub fn validate(&self, id: &ContentId) -> Result<(), BindError> {
        self.manifest.validate(id)
    }

    /// Distinct pages reachable from bound triggers, shell first
    pub fn targets(&self) -> Vec<ContentId> {
        let mut targets: Vec<ContentId> = Vec::new();
        for binding in self.shell.iter().chain(self.content.iter()) {
            if !targets.contains(&binding.target) {
                targets.push(binding.target.clone());
            }
        }
        targets
    }

    pub fn bindings(&self) -> impl Iterator<Item = &Binding> {
        self.shell.iter().chain(self.content.iter())
    }

    pub fn search_input(&self) -> Option<ElementKey> {
        self.search_input
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drift_dom::MemorySurface;

    const SHELL: &str = r#"
        <a id="navbar__logo">drift</a>
        <a data-dialog="Projects">projects</a>
        <a class="hidden-link">Timeline</a>
        <a class="hidden-link-red"></a>
        <input class="search-input" type="text">
    "#;

    fn id(raw: &str) -> ContentId {
        ContentId::parse(raw).unwrap()
    }

    fn binder() -> NavigationBinder {
        NavigationBinder::new(TriggerManifest::default(), "search-input")
    }

    #[test]
    fn test_bind_shell_with_default_rules() {
        let surface = MemorySurface::with_shell(SHELL);
        let mut binder = binder();
        let rejected = binder.bind_shell(&surface);

        assert_eq!(binder.targets(), vec![id("home"), id("projects"), id("timeline")]);
        assert_eq!(rejected.len(), 1);
        assert!(matches!(rejected[0], BindError::EmptyTarget { .. }));
        assert!(binder.search_input().is_some());
    }

    #[test]
    fn test_resolve_element() {
        let surface = MemorySurface::with_shell(SHELL);
        let mut binder = binder();
        binder.bind_shell(&surface);

        let logo = surface.find_by_id("navbar__logo").unwrap().key;
        assert_eq!(binder.resolve(logo), Some(&id("home")));
        let search = binder.search_input().unwrap();
        assert_eq!(binder.resolve(search), None);
    }

    #[test]
    fn test_rebind_content_drops_stale_keys() {
        let mut surface = MemorySurface::new();
        let mut binder = binder();
        surface.set_content(r#"<a data-dialog="about">about</a>"#);
        binder.rebind_content(&surface);
        let stale = surface.content_elements()[0].key;
        assert_eq!(binder.resolve(stale), Some(&id("about")));

        surface.set_content(r#"<a data-dialog="contact">contact</a>"#);
        binder.rebind_content(&surface);
        assert_eq!(binder.resolve(stale), None);
        assert_eq!(binder.targets(), vec![id("contact")]);
    }

    #[test]
    fn test_allow_list_rejects_unknown_pages() {
        let manifest = TriggerManifest {
            allow: Some(vec![id("home"), id("projects")]),
            ..TriggerManifest::default()
        };
        let mut binder = NavigationBinder::new(manifest, "search-input");
        let surface = MemorySurface::with_shell(SHELL);
        let rejected = binder.bind_shell(&surface);

        assert!(rejected.contains(&BindError::NotAllowed { id: id("timeline") }));
        assert_eq!(binder.targets(), vec![id("home"), id("projects")]);
        assert!(binder.validate(&id("secret")).is_err());
    }

    #[test]
    fn test_manifest_from_toml() {
        let manifest: TriggerManifest = toml::from_str(
            r#"
            [[rules]]
            matcher = { class = "menu-item" }
            source = "text"
            "#,
        )
        .unwrap();

        assert_eq!(manifest.rules, vec![TriggerRule::new(Matcher::Class("menu-item".into()), Source::Text)]);
        assert!(manifest.allow.is_none());
    }
}
