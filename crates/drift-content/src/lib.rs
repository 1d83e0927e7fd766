//! Drift Content
//!
//! The content lifecycle engine: fetch-or-cache, style and script setup,
//! animated swaps, breadcrumbs and history, with symmetric teardown of the
//! page being left.
//!
//! # Example
//! ```rust,no_run
//! use drift_content::{LifecycleManager, LoaderConfig};
//! use drift_dom::MemorySurface;
//! use drift_net::{FragmentPaths, HttpFragmentStore, ResourceCache, RetryPolicy};
//! use drift_script::{ModuleRegistry, ScriptSandbox, VariableRegistry};
//! use std::rc::Rc;
//!
//! let config = LoaderConfig::default();
//! let store = HttpFragmentStore::new(RetryPolicy::default()).unwrap();
//! let paths = FragmentPaths::new(&config.store.base_url).unwrap();
//! let cache = Rc::new(ResourceCache::new(Rc::new(store), paths));
//! let sandbox = ScriptSandbox::new(ModuleRegistry::with_builtins(), Rc::new(VariableRegistry::new()));
//!
//! let manager = LifecycleManager::new(config, MemorySurface::new(), cache, sandbox);
//! smol::block_on(manager.start());
//! ```

mod config;
mod transition;
mod style;
mod breadcrumbs;
mod history;
mod backdrop;
pub mod binder;
mod manager;

pub use config::{
    BackdropConfig, ClassNames, ConfigError, LoaderConfig, PreloadConfig, RetryConfig, RevealConfig,
    SearchConfig, StoreConfig, TimingConfig, FALLBACK_HTML,
};
pub use transition::{Phase, PhaseTimings, RevealPolicy};
pub use style::{style_id, StyleInjector};
pub use breadcrumbs::BreadcrumbTracker;
pub use history::{parse_state, HistoryEntry, HistoryState, SessionHistory};
pub use backdrop::{Backdrop, BackdropEffect, EffectError, LayerEffect};
pub use binder::{BindError, Binding, NavigationBinder, TriggerManifest, TriggerRule};
pub use manager::{LifecycleManager, NavigationOutcome};
