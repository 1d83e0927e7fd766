//! Script Sandbox
//!
//! Tracks which page modules are loaded, which are attached, and the
//! cleanup each attachment registered.

use crate::{Cleanup, InputHook, ModuleContext, ModuleRegistry, PageModule, ScriptError, ScriptId};
use crate::VariableRegistry;
use drift_dom::{ContentId, ElementKey, Surface};
use drift_net::ResourceCache;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Characters of source shown in execution failure logs
const SOURCE_PREVIEW: usize = 80;

/// Evaluates fetched script text into modules
pub trait ScriptEngine {
    fn instantiate(&mut self, script_id: &ScriptId, source: &str) -> Result<Box<dyn PageModule>, ScriptError>;
}

/// Result of [`ScriptSandbox::load`]
#[derive(Debug)]
pub enum LoadOutcome {
    /// Instantiated by this call
    Loaded(ScriptId),
    /// Instantiated earlier; nothing ran
    AlreadyLoaded(ScriptId),
    /// No registered module and no engine to evaluate the source
    Skipped(ScriptId),
    Failed(ScriptId, ScriptError),
}

impl LoadOutcome {
    pub fn script_id(&self) -> &ScriptId {
        match self {
            LoadOutcome::Loaded(id)
            | LoadOutcome::AlreadyLoaded(id)
            | LoadOutcome::Skipped(id)
            | LoadOutcome::Failed(id, _) => id,
        }
    }

    /// The module is available for attachment
    pub fn is_ready(&self) -> bool {
        matches!(self, LoadOutcome::Loaded(_) | LoadOutcome::AlreadyLoaded(_))
    }
}

struct LoadedModule {
    script_id: ScriptId,
    owner: ContentId,
    module: Box<dyn PageModule>,
}

struct Attachment {
    script_id: ScriptId,
    owner: ContentId,
    cleanup: Option<Cleanup>,
    input: Option<InputHook>,
}

/// Page module sandbox
///
/// Modules are matched to their page by owner identity, never by id prefix.
pub struct ScriptSandbox {
    registry: ModuleRegistry,
    engine: RefCell<Option<Box<dyn ScriptEngine>>>,
    vars: Rc<VariableRegistry>,
    loaded: RefCell<Vec<LoadedModule>>,
    active: RefCell<Vec<Attachment>>,
    instantiations: Cell<u64>,
}

impl ScriptSandbox {
    pub fn new(registry: ModuleRegistry, vars: Rc<VariableRegistry>) -> Self {
        Self {
            registry,
            engine: RefCell::new(None),
            vars,
            loaded: RefCell::default(),
            active: RefCell::default(),
            instantiations: Cell::new(0),
        }
    }

    /// Install an engine for scripts with no registered module
    pub fn with_engine(self, engine: Box<dyn ScriptEngine>) -> Self {
        *self.engine.borrow_mut() = Some(engine);
        self
    }

    pub fn vars(&self) -> &Rc<VariableRegistry> {
        &self.vars
    }

    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    pub fn is_loaded(&self, script_id: &ScriptId) -> bool {
        self.loaded.borrow().iter().any(|m| &m.script_id == script_id)
    }

    pub fn is_attached(&self, script_id: &ScriptId) -> bool {
        self.active.borrow().iter().any(|a| &a.script_id == script_id)
    }

    /// Attached modules of a page, in attachment order
    pub fn active_scripts(&self, content: &ContentId) -> Vec<ScriptId> {
        self.active
            .borrow()
            .iter()
            .filter(|a| &a.owner == content)
            .map(|a| a.script_id.clone())
            .collect()
    }

    /// Total module instantiations this session
    pub fn instantiations(&self) -> u64 {
        self.instantiations.get()
    }

    /// Instantiate the module a page names at `path`, once
    pub async fn load(&self, cache: &ResourceCache, content: &ContentId, path: &str) -> LoadOutcome {
        let script_id = ScriptId::for_module(content, path);
        if self.is_loaded(&script_id) {
            tracing::trace!(script = %script_id, "Script already loaded");
            return LoadOutcome::AlreadyLoaded(script_id);
        }

        let module = match self.registry.instantiate(path) {
            Some(module) => Ok(module),
            None => {
                if self.engine.borrow().is_none() {
                    tracing::warn!(content = %content, script = %script_id, path, "No module registered for script; skipping");
                    return LoadOutcome::Skipped(script_id);
                }
                match self.fetch_and_evaluate(cache, &script_id, path).await {
                    Some(result) => result,
                    None => return LoadOutcome::Skipped(script_id),
                }
            }
        };

        match module {
            Ok(module) => {
                let mut loaded = self.loaded.borrow_mut();
                // A concurrent load of the same page may have finished first.
                if loaded.iter().any(|m| m.script_id == script_id) {
                    return LoadOutcome::AlreadyLoaded(script_id);
                }
                loaded.push(LoadedModule {
                    script_id: script_id.clone(),
                    owner: content.clone(),
                    module,
                });
                self.instantiations.set(self.instantiations.get() + 1);
                tracing::debug!(content = %content, script = %script_id, "Loaded script module");
                LoadOutcome::Loaded(script_id)
            }
            Err(err) => {
                tracing::error!(content = %content, script = %script_id, "Script failed to load: {}", err);
                LoadOutcome::Failed(script_id, err)
            }
        }
    }

    async fn fetch_and_evaluate(
        &self,
        cache: &ResourceCache,
        script_id: &ScriptId,
        path: &str,
    ) -> Option<Result<Box<dyn PageModule>, ScriptError>> {
        let url = match cache.paths().script_url(path) {
            Ok(url) => url,
            Err(err) => return Some(Err(err.into())),
        };
        let source = match cache.script_source(&url).await {
            Ok(source) => source,
            Err(err) => return Some(Err(err.into())),
        };

        let mut engine = self.engine.borrow_mut();
        let engine = engine.as_mut()?;
        let result = engine.instantiate(script_id, &source);
        if let Err(err) = &result {
            tracing::error!(
                script = %script_id,
                url = %url,
                preview = %preview(&source),
                "Script evaluation failed: {}",
                err
            );
        }
        Some(result)
    }

    /// Attach every loaded module of a page that is not yet attached
    ///
    /// Returns the number of modules attached. A module whose attach fails
    /// stays loaded but gets no cleanup.
    pub fn attach_all(&self, content: &ContentId, surface: &mut dyn Surface) -> usize {
        let mut loaded = self.loaded.borrow_mut();
        let mut attached = 0;

        for entry in loaded.iter_mut().filter(|m| &m.owner == content) {
            if self.is_attached(&entry.script_id) {
                continue;
            }

            let mut ctx = ModuleContext::new(&entry.owner, &entry.script_id, &self.vars, &mut *surface);
            match entry.module.attach(&mut ctx) {
                Ok(cleanup) => {
                    let input = ctx.take_input();
                    self.active.borrow_mut().push(Attachment {
                        script_id: entry.script_id.clone(),
                        owner: entry.owner.clone(),
                        cleanup,
                        input,
                    });
                    attached += 1;
                    tracing::debug!(content = %content, script = %entry.script_id, "Attached script module");
                }
                Err(err) => {
                    tracing::error!(content = %content, script = %entry.script_id, "Script failed to attach: {}", err);
                }
            }
        }

        attached
    }

    /// Fire and forget every cleanup registered for a page
    ///
    /// Each cleanup runs exactly once. Failures are logged and returned.
    pub fn cleanup(&self, content: &ContentId, surface: &mut dyn Surface) -> Vec<ScriptError> {
        let attachments: Vec<Attachment> = {
            let mut active = self.active.borrow_mut();
            let (leaving, staying): (Vec<_>, Vec<_>) =
                active.drain(..).partition(|a| &a.owner == content);
            *active = staying;
            leaving
        };

        let mut failures = Vec::new();
        for attachment in attachments {
            let Some(cleanup) = attachment.cleanup else {
                continue;
            };
            match cleanup.run(surface) {
                Ok(()) => {
                    tracing::debug!(content = %content, script = %attachment.script_id, "Cleaned up script module");
                }
                Err(err) => {
                    tracing::warn!(content = %content, script = %attachment.script_id, "Script cleanup failed: {}", err);
                    failures.push(ScriptError::Cleanup {
                        script: attachment.script_id.to_string(),
                        message: err.to_string(),
                    });
                }
            }
        }
        failures
    }

    /// Deliver an input event to attached modules
    ///
    /// Returns true if any module had an input hook.
    pub fn dispatch_input(&self, surface: &mut dyn Surface, key: ElementKey, value: &str) -> bool {
        let mut active = self.active.borrow_mut();
        let mut delivered = false;
        for attachment in active.iter_mut() {
            if let Some(hook) = attachment.input.as_mut() {
                hook(&mut *surface, key, value);
                delivered = true;
            }
        }
        delivered
    }
}

impl std::fmt::Debug for ScriptSandbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptSandbox")
            .field("registry", &self.registry)
            .field("engine", &self.engine.borrow().is_some())
            .field("loaded", &self.loaded.borrow().len())
            .field("active", &self.active.borrow().len())
            .finish()
    }
}

fn preview(source: &str) -> String {
    let flat: String = source.split_whitespace().collect::<Vec<_>>().join(" ");
    match flat.char_indices().nth(SOURCE_PREVIEW) {
        Some((index, _)) => format!("{}...", &flat[..index]),
        None => flat,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drift_dom::MemorySurface;
    use drift_net::{FragmentPaths, MemoryStore};

    #[derive(Default)]
    struct Counters {
        attaches: Cell<u32>,
        cleanups: Cell<u32>,
    }

    struct Counting(Rc<Counters>);

    impl PageModule for Counting {
        fn attach(&mut self, _ctx: &mut ModuleContext<'_>) -> Result<Option<Cleanup>, ScriptError> {
            self.0.attaches.set(self.0.attaches.get() + 1);
            let counters = self.0.clone();
            Ok(Some(Cleanup::from_fn(move || counters.cleanups.set(counters.cleanups.get() + 1))))
        }
    }

    struct Broken;

    impl PageModule for Broken {
        fn attach(&mut self, ctx: &mut ModuleContext<'_>) -> Result<Option<Cleanup>, ScriptError> {
            Err(ScriptError::Execution {
                script: ctx.script_id().to_string(),
                message: "boom".into(),
            })
        }
    }

    fn id(raw: &str) -> ContentId {
        ContentId::parse(raw).unwrap()
    }

    fn cache() -> ResourceCache {
        ResourceCache::new(Rc::new(MemoryStore::new()), FragmentPaths::new("memory://site/").unwrap())
    }

    fn sandbox(counters: &Rc<Counters>) -> ScriptSandbox {
        let mut registry = ModuleRegistry::new();
        let shared = counters.clone();
        registry.register("count.js", move || Box::new(Counting(shared.clone())));
        registry.register("broken.js", || Box::new(Broken));
        ScriptSandbox::new(registry, Rc::new(VariableRegistry::new()))
    }

    #[test]
    fn test_load_once_attach_each_entry() {
        let counters = Rc::new(Counters::default());
        let sandbox = sandbox(&counters);
        let cache = cache();
        let mut surface = MemorySurface::new();
        let page = id("projects");

        smol::block_on(async {
            assert!(matches!(sandbox.load(&cache, &page, "count.js").await, LoadOutcome::Loaded(_)));
            assert!(matches!(sandbox.load(&cache, &page, "count.js").await, LoadOutcome::AlreadyLoaded(_)));
        });

        assert_eq!(sandbox.attach_all(&page, &mut surface), 1);
        assert_eq!(sandbox.attach_all(&page, &mut surface), 0);
        assert!(sandbox.cleanup(&page, &mut surface).is_empty());
        assert_eq!(sandbox.attach_all(&page, &mut surface), 1);
        sandbox.cleanup(&page, &mut surface);

        assert_eq!(sandbox.instantiations(), 1);
        assert_eq!(counters.attaches.get(), 2);
        assert_eq!(counters.cleanups.get(), 2);
    }

    #[test]
    fn test_cleanup_matches_owner_exactly() {
        let counters = Rc::new(Counters::default());
        let sandbox = sandbox(&counters);
        let cache = cache();
        let mut surface = MemorySurface::new();

        smol::block_on(async {
            sandbox.load(&cache, &id("a"), "count.js").await;
            sandbox.load(&cache, &id("a-b"), "count.js").await;
        });
        sandbox.attach_all(&id("a"), &mut surface);
        sandbox.attach_all(&id("a-b"), &mut surface);

        sandbox.cleanup(&id("a"), &mut surface);
        assert_eq!(counters.cleanups.get(), 1);
        assert_eq!(sandbox.active_scripts(&id("a-b")).len(), 1);
    }

    #[test]
    fn test_failing_attach_gets_no_cleanup() {
        let counters = Rc::new(Counters::default());
        let sandbox = sandbox(&counters);
        let cache = cache();
        let mut surface = MemorySurface::new();
        let page = id("home");

        smol::block_on(sandbox.load(&cache, &page, "broken.js"));
        assert_eq!(sandbox.attach_all(&page, &mut surface), 0);
        assert!(sandbox.active_scripts(&page).is_empty());
        assert!(sandbox.cleanup(&page, &mut surface).is_empty());
    }

    #[test]
    fn test_unregistered_without_engine_is_skipped() {
        let counters = Rc::new(Counters::default());
        let sandbox = sandbox(&counters);
        let cache = cache();

        let outcome = smol::block_on(sandbox.load(&cache, &id("home"), "snow.js"));
        assert!(matches!(outcome, LoadOutcome::Skipped(_)));
        assert!(!sandbox.is_loaded(outcome.script_id()));
    }

    #[test]
    fn test_cleanup_failures_are_reported() {
        struct FailingCleanup;
        impl PageModule for FailingCleanup {
            fn attach(&mut self, _ctx: &mut ModuleContext<'_>) -> Result<Option<Cleanup>, ScriptError> {
                Ok(Some(Cleanup::new(|_| {
                    Err(ScriptError::Execution { script: "x".into(), message: "nope".into() })
                })))
            }
        }

        let mut registry = ModuleRegistry::new();
        registry.register("fail.js", || Box::new(FailingCleanup));
        let sandbox = ScriptSandbox::new(registry, Rc::new(VariableRegistry::new()));
        let mut surface = MemorySurface::new();
        let page = id("home");

        smol::block_on(sandbox.load(&cache(), &page, "fail.js"));
        sandbox.attach_all(&page, &mut surface);
        let failures = sandbox.cleanup(&page, &mut surface);

        assert_eq!(failures.len(), 1);
        assert!(matches!(failures[0], ScriptError::Cleanup { .. }));
        assert!(sandbox.cleanup(&page, &mut surface).is_empty());
    }

    #[test]
    fn test_preview_truncates() {
        let source = "x".repeat(200);
        assert_eq!(preview(&source).len(), SOURCE_PREVIEW + 3);
        assert_eq!(preview("a\n  b"), "a b");
    }
}
