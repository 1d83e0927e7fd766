//! Page modules
//!
//! The capability contract page scripts implement, and the registry that
//! maps script paths to compiled modules.

use crate::{ScriptError, VarOptions, VariableRegistry};
use crate::vars::{Getter, Setter};
use drift_dom::{ContentId, ElementKey, Surface};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// Identifier of a script module: `content-js-{content}-{sanitized path}`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScriptId(String);

impl ScriptId {
    pub fn for_module(content: &ContentId, path: &str) -> Self {
        let sanitized: String = path
            .trim()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
            .collect();
        Self(format!("content-js-{}-{}", content, sanitized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScriptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Teardown registered by an attached module
///
/// Runs exactly once, when the owning page unloads.
pub struct Cleanup(Box<dyn FnOnce(&mut dyn Surface) -> Result<(), ScriptError>>);

impl Cleanup {
    pub fn new(f: impl FnOnce(&mut dyn Surface) -> Result<(), ScriptError> + 'static) -> Self {
        Self(Box::new(f))
    }

    /// Cleanup that needs no surface access and cannot fail
    pub fn from_fn(f: impl FnOnce() + 'static) -> Self {
        Self::new(move |_| {
            f();
            Ok(())
        })
    }

    pub fn run(self, surface: &mut dyn Surface) -> Result<(), ScriptError> {
        (self.0)(surface)
    }
}

impl fmt::Debug for Cleanup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Cleanup")
    }
}

/// Handler for input events on content elements
pub type InputHook = Box<dyn FnMut(&mut dyn Surface, ElementKey, &str)>;

/// What an attaching module can reach
pub struct ModuleContext<'a> {
    content_id: &'a ContentId,
    script_id: &'a ScriptId,
    vars: &'a Rc<VariableRegistry>,
    surface: &'a mut dyn Surface,
    input: Option<InputHook>,
}

impl<'a> ModuleContext<'a> {
    pub fn new(
        content_id: &'a ContentId,
        script_id: &'a ScriptId,
        vars: &'a Rc<VariableRegistry>,
        surface: &'a mut dyn Surface,
    ) -> Self {
        Self {
            content_id,
            script_id,
            vars,
            surface,
            input: None,
        }
    }

    /// Page this module is attached to
    pub fn content_id(&self) -> &ContentId {
        self.content_id
    }

    pub fn script_id(&self) -> &ScriptId {
        self.script_id
    }

    pub fn vars(&self) -> &Rc<VariableRegistry> {
        self.vars
    }

    pub fn surface(&mut self) -> &mut dyn Surface {
        &mut *self.surface
    }

    /// Publish a variable in the process-wide registry
    pub fn expose_var(&self, key: &str, getter: Getter, setter: Setter, options: VarOptions) {
        self.vars.expose(key, getter, setter, options);
    }

    /// Receive input events while attached; a later call replaces the hook
    pub fn on_input(&mut self, hook: InputHook) {
        self.input = Some(hook);
    }

    pub(crate) fn take_input(&mut self) -> Option<InputHook> {
        self.input.take()
    }
}

/// A page script module
///
/// A module is instantiated once per [`ScriptId`] and attached on every
/// entry into its page. The returned [`Cleanup`] runs when the page
/// unloads.
pub trait PageModule {
    fn attach(&mut self, ctx: &mut ModuleContext<'_>) -> Result<Option<Cleanup>, ScriptError>;
}

/// Factory producing a fresh module instance
pub type ModuleFactory = Box<dyn Fn() -> Box<dyn PageModule>>;

/// Modules compiled into the host, keyed by script path
#[derive(Default)]
pub struct ModuleRegistry {
    factories: HashMap<String, ModuleFactory>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in modules
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(crate::binder::VAR_BINDER_PATH, || {
            Box::new(crate::binder::VarBinderModule::new())
        });
        registry
    }

    /// Register a module under a script path; replaces an earlier one
    pub fn register<F>(&mut self, path: &str, factory: F)
    where
        F: Fn() -> Box<dyn PageModule> + 'static,
    {
        self.factories.insert(normalize(path), Box::new(factory));
    }

    pub fn contains(&self, path: &str) -> bool {
        self.factories.contains_key(&normalize(path))
    }

    /// Fresh instance of the module registered for `path`
    pub fn instantiate(&self, path: &str) -> Option<Box<dyn PageModule>> {
        self.factories.get(&normalize(path)).map(|factory| factory())
    }

    /// Registered paths, sorted
    pub fn paths(&self) -> Vec<&str> {
        let mut paths: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        paths.sort_unstable();
        paths
    }
}

impl fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleRegistry")
            .field("paths", &self.paths())
            .finish()
    }
}

fn normalize(path: &str) -> String {
    path.trim().trim_start_matches("./").to_string()
}
