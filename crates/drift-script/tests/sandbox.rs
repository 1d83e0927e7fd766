//! Sandbox integration tests

use drift_dom::{ContentId, MemorySurface, Surface};
use drift_net::{FragmentPaths, MemoryStore, ResourceCache};
use drift_script::{
    LoadOutcome, ModuleRegistry, ScriptSandbox, VarOptions, VarValue, VariableRegistry, VAR_BINDER_PATH,
};
use std::cell::RefCell;
use std::rc::Rc;

fn id(raw: &str) -> ContentId {
    ContentId::parse(raw).unwrap()
}

fn cache() -> ResourceCache {
    ResourceCache::new(Rc::new(MemoryStore::new()), FragmentPaths::new("memory://site/").unwrap())
}

// ============================================================================
// Variable binder through the sandbox
// ============================================================================

#[test]
fn test_binder_routes_input_events() {
    let vars = Rc::new(VariableRegistry::new());
    let density = Rc::new(RefCell::new(VarValue::Number(10.0)));
    vars.expose_cell("particle_density", density.clone(), VarOptions::number(0.0, 100.0, 1.0));

    let sandbox = ScriptSandbox::new(ModuleRegistry::with_builtins(), vars.clone());
    let cache = cache();
    let mut surface = MemorySurface::new();
    surface.set_content(r#"<input name="particle-density" type="number"><b data-var="particle-density"></b>"#);

    let page = id("cfg");
    let outcome = smol::block_on(sandbox.load(&cache, &page, VAR_BINDER_PATH));
    assert!(matches!(outcome, LoadOutcome::Loaded(_)));
    assert_eq!(sandbox.attach_all(&page, &mut surface), 1);

    let input = surface.content_elements()[0].clone();
    assert_eq!(input.attr("data-bound"), Some("particle_density"));
    assert_eq!(input.attr("min"), Some("0"));

    assert!(sandbox.dispatch_input(&mut surface, input.key, "42"));
    assert_eq!(*density.borrow(), VarValue::Number(42.0));
    assert_eq!(surface.content_elements()[1].text, "42.00");
}

#[test]
fn test_input_hooks_dropped_on_cleanup() {
    let vars = Rc::new(VariableRegistry::new());
    vars.expose_cell("x", Rc::new(RefCell::new(VarValue::Number(0.0))), VarOptions::default());

    let sandbox = ScriptSandbox::new(ModuleRegistry::with_builtins(), vars.clone());
    let mut surface = MemorySurface::new();
    surface.set_content(r#"<input id="x">"#);
    let page = id("cfg");

    smol::block_on(sandbox.load(&cache(), &page, VAR_BINDER_PATH));
    sandbox.attach_all(&page, &mut surface);
    sandbox.cleanup(&page, &mut surface);

    let key = surface.content_elements()[0].key;
    assert!(!sandbox.dispatch_input(&mut surface, key, "5"));
    assert_eq!(vars.read("x"), Some(VarValue::Number(0.0)));
}

// ============================================================================
// Registry persistence
// ============================================================================

#[test]
fn test_exposed_variables_survive_cleanup() {
    let vars = Rc::new(VariableRegistry::new());
    vars.expose_cell("theme", Rc::new(RefCell::new(VarValue::Text("dark".into()))), VarOptions::default());

    let sandbox = ScriptSandbox::new(ModuleRegistry::with_builtins(), vars.clone());
    let mut surface = MemorySurface::new();
    let page = id("cfg");

    smol::block_on(sandbox.load(&cache(), &page, VAR_BINDER_PATH));
    sandbox.attach_all(&page, &mut surface);
    sandbox.cleanup(&page, &mut surface);

    assert_eq!(vars.read("theme"), Some(VarValue::Text("dark".into())));
}

// ============================================================================
// Fetched script text through the engine
// ============================================================================

#[cfg(feature = "quickjs")]
mod fetched_scripts {
    use super::*;
    use drift_script::{QuickJsEngine, ScriptError};

    fn store() -> Rc<MemoryStore> {
        Rc::new(
            MemoryStore::new()
                .with_script("shared.js", "onCleanup(function () {});")
                .with_script("broken.js", "function ("),
        )
    }

    fn sandbox(vars: &Rc<VariableRegistry>) -> ScriptSandbox {
        ScriptSandbox::new(ModuleRegistry::new(), vars.clone())
            .with_engine(Box::new(QuickJsEngine::new(vars.clone()).unwrap()))
    }

    #[test]
    fn test_failed_evaluation_is_not_loaded() {
        let vars = Rc::new(VariableRegistry::new());
        let sandbox = sandbox(&vars);
        let cache = ResourceCache::new(store(), FragmentPaths::new("memory://site/").unwrap());
        let page = id("broken");

        for _ in 0..2 {
            let outcome = smol::block_on(sandbox.load(&cache, &page, "broken.js"));
            let LoadOutcome::Failed(script_id, err) = outcome else {
                panic!("broken script should fail");
            };
            assert!(matches!(err, ScriptError::Execution { .. }));
            assert!(!sandbox.is_loaded(&script_id));
        }
        assert_eq!(sandbox.instantiations(), 0);
    }

    #[test]
    fn test_shared_script_fetched_once_per_path() {
        let vars = Rc::new(VariableRegistry::new());
        let sandbox = sandbox(&vars);
        let store = store();
        let cache = ResourceCache::new(store.clone(), FragmentPaths::new("memory://site/").unwrap());

        let first = smol::block_on(sandbox.load(&cache, &id("a"), "shared.js"));
        let second = smol::block_on(sandbox.load(&cache, &id("b"), "shared.js"));

        assert!(matches!(first, LoadOutcome::Loaded(_)));
        assert!(matches!(second, LoadOutcome::Loaded(_)));
        assert_ne!(first.script_id(), second.script_id());
        assert_eq!(store.request_count("/content/js/shared.js"), 1);
        assert_eq!(sandbox.instantiations(), 2);
    }

    #[test]
    fn test_missing_script_reports_fetch_failure() {
        let vars = Rc::new(VariableRegistry::new());
        let sandbox = sandbox(&vars);
        let cache = ResourceCache::new(store(), FragmentPaths::new("memory://site/").unwrap());

        let outcome = smol::block_on(sandbox.load(&cache, &id("a"), "absent.js"));
        let LoadOutcome::Failed(script_id, err) = outcome else {
            panic!("missing script should fail");
        };
        assert!(matches!(err, ScriptError::Fetch(ref fetch) if fetch.is_not_found()));
        assert!(!sandbox.is_loaded(&script_id));
    }
}
