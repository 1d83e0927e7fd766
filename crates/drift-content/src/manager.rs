//! Content Lifecycle Manager
//!
//! Drives a navigation through its phases:
//!
//! ```text
//! Idle ── navigate ──> FadingOut ──(fade-out ∥ prepare)──> Swapping ──> FadingIn ──> Idle
//! ```
//!
//! Preparation (HTML, CSS and script modules) runs concurrently with the
//! fade-out wait. Only the navigation holding the latest generation token
//! swaps; an older one abandons without touching the page.

use crate::backdrop::{Backdrop, BackdropEffect};
use crate::binder::NavigationBinder;
use crate::breadcrumbs::BreadcrumbTracker;
use crate::config::LoaderConfig;
use crate::history::{parse_state, SessionHistory};
use crate::style::StyleInjector;
use crate::transition::{Phase, PhaseTimings, RevealPolicy};
use drift_dom::{css, ContentId, ElementKey, Surface};
use drift_net::{FetchError, ResourceCache, ResourceKind};
use drift_script::ScriptSandbox;
use smol::Timer;
use std::cell::{Cell, Ref, RefCell};
use std::rc::Rc;

/// How a navigation request ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationOutcome {
    /// The target page is shown
    Completed(ContentId),
    /// Already at (or heading to) the target
    Unchanged,
    /// A later navigation took over before the swap
    Superseded,
    /// The target's HTML could not be fetched; the fallback is shown
    Failed { target: ContentId, error: FetchError },
    /// The request named no usable page
    Rejected(String),
}

impl NavigationOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, NavigationOutcome::Completed(_))
    }
}

/// Content lifecycle manager
///
/// Owns the surface and every per-page resource. The cache and the
/// sandbox (with its variable registry) are handed in and outlive any
/// single page.
pub struct LifecycleManager<S: Surface + 'static> {
    config: LoaderConfig,
    timings: PhaseTimings,
    reveal: RevealPolicy,
    surface: RefCell<S>,
    cache: Rc<ResourceCache>,
    sandbox: ScriptSandbox,
    styles: RefCell<StyleInjector>,
    crumbs: RefCell<BreadcrumbTracker>,
    history: RefCell<SessionHistory>,
    binder: RefCell<NavigationBinder>,
    backdrop: RefCell<Backdrop>,
    phase: Cell<Phase>,
    current: RefCell<Option<ContentId>>,
    pending: RefCell<Option<ContentId>>,
    generation: Cell<u64>,
}

impl<S: Surface + 'static> LifecycleManager<S> {
    pub fn new(config: LoaderConfig, surface: S, cache: Rc<ResourceCache>, sandbox: ScriptSandbox) -> Self {
        let binder = NavigationBinder::new(config.triggers.clone(), &config.search.input_class);
        let backdrop = Backdrop::new(&config.backdrop);
        Self {
            timings: config.timings(),
            reveal: config.reveal_policy(),
            surface: RefCell::new(surface),
            cache,
            sandbox,
            styles: RefCell::default(),
            crumbs: RefCell::default(),
            history: RefCell::default(),
            binder: RefCell::new(binder),
            backdrop: RefCell::new(backdrop),
            phase: Cell::new(Phase::Idle),
            current: RefCell::new(None),
            pending: RefCell::new(None),
            generation: Cell::new(0),
            config,
        }
    }

    /// Add a background effect plug-in; attached on [`LifecycleManager::start`]
    pub fn with_effect(self, effect: Box<dyn BackdropEffect>) -> Self {
        self.backdrop.borrow_mut().add_effect(effect);
        self
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    pub fn phase(&self) -> Phase {
        self.phase.get()
    }

    /// Page currently shown; `None` before start and after a failed load
    pub fn current(&self) -> Option<ContentId> {
        self.current.borrow().clone()
    }

    /// Target of the transition in flight
    pub fn pending(&self) -> Option<ContentId> {
        self.pending.borrow().clone()
    }

    pub fn surface(&self) -> Ref<'_, S> {
        self.surface.borrow()
    }

    pub fn cache(&self) -> &Rc<ResourceCache> {
        &self.cache
    }

    pub fn sandbox(&self) -> &ScriptSandbox {
        &self.sandbox
    }

    pub fn history(&self) -> Ref<'_, SessionHistory> {
        self.history.borrow()
    }

    pub fn breadcrumbs(&self) -> Ref<'_, BreadcrumbTracker> {
        self.crumbs.borrow()
    }

    pub fn styles(&self) -> Ref<'_, StyleInjector> {
        self.styles.borrow()
    }

    pub fn binder(&self) -> Ref<'_, NavigationBinder> {
        self.binder.borrow()
    }

    pub fn backdrop(&self) -> Ref<'_, Backdrop> {
        self.backdrop.borrow()
    }

    // ------------------------------------------------------------------
    // Entry points
    // ------------------------------------------------------------------

    /// Attach effects, bind the shell, and load the home page
    pub async fn start(&self) -> NavigationOutcome {
        let home = self.config.home.clone();
        {
            let mut surface = self.surface.borrow_mut();
            let mut backdrop = self.backdrop.borrow_mut();
            backdrop.attach_effects(&mut *surface);
            backdrop.reset(&mut *surface);

            let mut binder = self.binder.borrow_mut();
            binder.bind_shell(&*surface);
            binder.rebind_content(&*surface);

            if self.config.preload.seed_home {
                let html = surface.content_html();
                if !html.trim().is_empty() {
                    self.cache.seed(&home, ResourceKind::Html, &html);
                }
            }
        }
        self.history.borrow_mut().replace(&home);
        tracing::info!(home = %home, "Starting content engine");

        if self.config.preload.links_on_start {
            self.preload_links().await;
        }
        self.navigate(&home, false).await
    }

    /// Navigate to `target`, recording a history entry if `record` is set
    pub async fn navigate(&self, target: &ContentId, record: bool) -> NavigationOutcome {
        if self.latest_target().as_ref() == Some(target) {
            tracing::debug!(content = %target, "Already at target; ignoring");
            return NavigationOutcome::Unchanged;
        }

        let token = self.generation.get() + 1;
        self.generation.set(token);
        *self.pending.borrow_mut() = Some(target.clone());
        self.phase.set(Phase::FadingOut);
        {
            let mut surface = self.surface.borrow_mut();
            surface.remove_mount_class(&self.config.classes.fade_in);
            surface.add_mount_class(&self.config.classes.fade_out);
        }
        tracing::info!(content = %target, token, "Navigating");

        let (html, _) = smol::future::zip(self.prepare(target, token), Timer::after(self.timings.fade_out)).await;

        if !self.holds(token) {
            tracing::debug!(content = %target, token, "Navigation superseded");
            return NavigationOutcome::Superseded;
        }

        match html {
            Ok(html) => self.swap(target, &html, record, token).await,
            Err(error) => self.fail(target, error, token).await,
        }
    }

    /// Stop the engine
    ///
    /// Supersedes any navigation in flight, fires the current page's
    /// cleanups and detaches the backdrop effects.
    pub fn shutdown(&self) {
        self.generation.set(self.generation.get() + 1);
        let mut surface = self.surface.borrow_mut();
        let surface: &mut S = &mut surface;

        self.teardown(surface);
        self.backdrop.borrow_mut().detach_effects(surface);
        surface.remove_mount_class(&self.config.classes.fade_out);
        surface.remove_mount_class(&self.config.classes.fade_in);
        self.settle_idle();
        tracing::info!("Content engine stopped");
    }

    /// Follow an activated trigger
    pub async fn activate(&self, key: ElementKey) -> NavigationOutcome {
        let target = self.binder.borrow().resolve(key).cloned();
        match target {
            Some(target) => self.navigate(&target, true).await,
            None => NavigationOutcome::Rejected(format!("element {key} is not a trigger")),
        }
    }

    /// Follow breadcrumb `index`
    pub async fn activate_crumb(&self, index: usize) -> NavigationOutcome {
        let target = self.crumbs.borrow().crumb_target(index).cloned();
        match target {
            Some(target) => self.navigate(&target, true).await,
            None => NavigationOutcome::Rejected(format!("no breadcrumb at {index}")),
        }
    }

    /// Warm the resources of the page a hovered trigger opens
    pub async fn hover(&self, key: ElementKey) {
        if !self.config.preload.on_hover {
            return;
        }
        let target = self.binder.borrow().resolve(key).cloned();
        if let Some(target) = target {
            tracing::trace!(content = %target, "Preloading hovered target");
            self.cache.preload(&target).await;
        }
    }

    /// Warm every page reachable from a bound trigger
    pub async fn preload_links(&self) {
        let targets = self.binder.borrow().targets();
        tracing::debug!(count = targets.len(), "Preloading linked pages");
        for target in &targets {
            self.cache.preload(target).await;
        }
    }

    pub async fn back(&self) -> NavigationOutcome {
        let state = self.history.borrow_mut().back().map(|e| e.state.clone());
        match state {
            Some(state) => self.pop_state(Some(&state)).await,
            None => NavigationOutcome::Unchanged,
        }
    }

    pub async fn forward(&self) -> NavigationOutcome {
        let state = self.history.borrow_mut().forward().map(|e| e.state.clone());
        match state {
            Some(state) => self.pop_state(Some(&state)).await,
            None => NavigationOutcome::Unchanged,
        }
    }

    /// Restore the page of a popped history state; no state means home
    pub async fn pop_state(&self, state: Option<&str>) -> NavigationOutcome {
        let target = state
            .and_then(parse_state)
            .map(|s| s.content)
            .unwrap_or_else(|| self.config.home.clone());
        self.navigate(&target, false).await
    }

    /// Navigate to a typed page name once the store confirms it exists
    pub async fn search(&self, query: &str) -> NavigationOutcome {
        let Some(target) = ContentId::parse(query) else {
            return NavigationOutcome::Unchanged;
        };

        let allowed = self.binder.borrow().validate(&target);
        if let Err(err) = allowed {
            tracing::info!(query, "Search rejected: {}", err);
            self.flash_search_error().await;
            return NavigationOutcome::Rejected(err.to_string());
        }

        match self.cache.get_or_fetch(&target, ResourceKind::Html).await {
            Ok(_) => {
                let input = self.binder.borrow().search_input();
                if let Some(input) = input {
                    self.surface.borrow_mut().set_value(input, "");
                }
                self.navigate(&target, true).await
            }
            Err(err) => {
                tracing::info!(query, "Search found no page: {}", err);
                self.flash_search_error().await;
                NavigationOutcome::Rejected(err.to_string())
            }
        }
    }

    /// Deliver an input event to the attached page modules
    pub fn input(&self, key: ElementKey, value: &str) -> bool {
        let mut surface = self.surface.borrow_mut();
        self.sandbox.dispatch_input(&mut *surface, key, value)
    }

    // ------------------------------------------------------------------
    // Phases
    // ------------------------------------------------------------------

    fn holds(&self, token: u64) -> bool {
        self.generation.get() == token
    }

    fn latest_target(&self) -> Option<ContentId> {
        match self.pending.borrow().as_ref() {
            Some(pending) => Some(pending.clone()),
            None => self.current.borrow().clone(),
        }
    }

    /// Fetch the target's resources and load its modules
    ///
    /// The style goes on as soon as the CSS is in, so the backdrop color
    /// can follow during the fade-out.
    async fn prepare(&self, target: &ContentId, token: u64) -> Result<Rc<str>, FetchError> {
        let (html, css) = smol::future::zip(
            self.cache.get_or_fetch(target, ResourceKind::Html),
            self.cache.get_or_fetch(target, ResourceKind::Css),
        )
        .await;

        let css = match css {
            Ok(css) => Some(css),
            Err(err) => {
                tracing::debug!(content = %target, "No stylesheet: {}", err);
                None
            }
        };

        if let Some(css) = &css {
            if self.holds(token) {
                let mut surface = self.surface.borrow_mut();
                self.styles.borrow_mut().apply(&mut *surface, target, css);
                self.backdrop.borrow().pull_color(&mut *surface);
            }
        }

        let html = html?;
        if let Some(css) = css {
            for path in css::script_paths(&css) {
                self.sandbox.load(&self.cache, target, &path).await;
            }
        }
        Ok(html)
    }

    async fn swap(&self, target: &ContentId, html: &str, record: bool, token: u64) -> NavigationOutcome {
        self.phase.set(Phase::Swapping);
        let classes = &self.config.classes;
        {
            let mut surface = self.surface.borrow_mut();
            let surface: &mut S = &mut surface;

            self.teardown(surface);

            {
                let mut styles = self.styles.borrow_mut();
                styles.retain_only(surface, Some(target));
                if let Some(css) = self.cache.get(target, ResourceKind::Css) {
                    styles.apply(surface, target, &css);
                }
            }
            self.backdrop.borrow().pull_color(surface);

            surface.set_content(html);
            self.schedule_reveal(surface);
            surface.remove_mount_class(&classes.fade_out);
            surface.add_mount_class(&classes.fade_in);

            {
                let mut crumbs = self.crumbs.borrow_mut();
                crumbs.update(target);
                crumbs.render(surface);
            }
            self.binder.borrow_mut().rebind_content(&*surface);
            *self.current.borrow_mut() = Some(target.clone());

            if record {
                let mut history = self.history.borrow_mut();
                if history.current_content().as_ref() != Some(target) {
                    history.push(target);
                }
            }

            let attached = self.sandbox.attach_all(target, surface);
            tracing::debug!(content = %target, modules = attached, "Swapped in content");
        }

        self.phase.set(Phase::FadingIn);
        Timer::after(self.timings.fade_in).await;

        if self.holds(token) {
            let mut surface = self.surface.borrow_mut();
            surface.remove_mount_class(&classes.fade_in);
            self.crumbs.borrow_mut().settle(&mut *surface);
            self.settle_idle();
        }
        tracing::info!(content = %target, "Navigation complete");
        NavigationOutcome::Completed(target.clone())
    }

    /// Show the fallback after the target's HTML failed
    ///
    /// History and breadcrumbs keep their state; with no current page, any
    /// later navigation proceeds.
    async fn fail(&self, target: &ContentId, error: FetchError, token: u64) -> NavigationOutcome {
        tracing::warn!(content = %target, "Failed to load content: {}", error);
        self.phase.set(Phase::Swapping);
        let classes = &self.config.classes;
        {
            let mut surface = self.surface.borrow_mut();
            let surface: &mut S = &mut surface;

            self.teardown(surface);
            self.styles.borrow_mut().retain_only(surface, None);
            surface.set_content(&self.config.fallback_html);
            surface.remove_mount_class(&classes.fade_out);
            surface.add_mount_class(&classes.fade_in);
            self.binder.borrow_mut().rebind_content(&*surface);
            self.backdrop.borrow().flash_error(surface);
        }

        self.phase.set(Phase::FadingIn);
        Timer::after(self.timings.error_flash).await;
        if self.holds(token) {
            self.backdrop.borrow().pull_color(&mut *self.surface.borrow_mut());
        }

        // The fade-in started with the flash and runs on its own clock.
        Timer::after(self.timings.fade_in.saturating_sub(self.timings.error_flash)).await;
        if self.holds(token) {
            self.surface.borrow_mut().remove_mount_class(&classes.fade_in);
            self.settle_idle();
        }
        NavigationOutcome::Failed {
            target: target.clone(),
            error,
        }
    }

    /// Fire the outgoing page's cleanups and forget it
    fn teardown(&self, surface: &mut S) {
        let Some(outgoing) = self.current.borrow_mut().take() else {
            return;
        };
        let failures = self.sandbox.cleanup(&outgoing, surface);
        if !failures.is_empty() {
            tracing::warn!(content = %outgoing, failures = failures.len(), "Page cleanup reported errors");
        }
    }

    fn schedule_reveal(&self, surface: &mut S) {
        let classes = &self.config.classes;
        let elements = surface.content_elements();

        if let Some(main) = elements.iter().find(|e| e.has_class(&classes.main_content)) {
            surface.add_class(main.key, &classes.animated);
        }

        let revealed: Vec<ElementKey> = elements
            .iter()
            .filter(|e| !e.has_class(&classes.main_content))
            .map(|e| e.key)
            .collect();
        for (key, delay) in revealed.iter().zip(self.reveal.delays(revealed.len())) {
            surface.set_reveal_delay(*key, delay);
        }
    }

    fn settle_idle(&self) {
        self.phase.set(Phase::Idle);
        *self.pending.borrow_mut() = None;
    }

    async fn flash_search_error(&self) {
        let Some(input) = self.binder.borrow().search_input() else {
            return;
        };
        let class = &self.config.search.error_class;
        self.surface.borrow_mut().add_class(input, class);
        Timer::after(self.timings.search_error).await;
        self.surface.borrow_mut().remove_class(input, class);
    }
}

impl<S: Surface + 'static> std::fmt::Debug for LifecycleManager<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleManager")
            .field("phase", &self.phase.get())
            .field("current", &self.current.borrow())
            .field("pending", &self.pending.borrow())
            .field("generation", &self.generation.get())
            .finish()
    }
}
