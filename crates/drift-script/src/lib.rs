//! Drift Script
//!
//! Page script modules and the contract they run under.
//!
//! Features:
//! - `PageModule` capability contract with a one-shot `Cleanup`
//! - Per-page module sandbox (load once, attach per visit)
//! - Process-wide exposed variables and the built-in variable binder
//! - Optional QuickJS engine for fetched script text (`quickjs` feature)

mod vars;
mod module;
mod sandbox;
pub mod binder;
#[cfg(feature = "quickjs")]
mod quickjs;

pub use vars::{ExposedVariable, Getter, Setter, VarOptions, VarType, VarValue, VariableRegistry};
pub use module::{Cleanup, InputHook, ModuleContext, ModuleFactory, ModuleRegistry, PageModule, ScriptId};
pub use sandbox::{LoadOutcome, ScriptEngine, ScriptSandbox};
pub use binder::{VarBinderModule, VAR_BINDER_PATH};
#[cfg(feature = "quickjs")]
pub use quickjs::QuickJsEngine;

use drift_net::FetchError;

/// Script error
#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    #[error("Script {script} failed: {message}")]
    Execution { script: String, message: String },

    #[error("Cleanup of {script} failed: {message}")]
    Cleanup { script: String, message: String },

    #[error("Script source unavailable: {0}")]
    Fetch(#[from] FetchError),

    #[error("Script engine error: {0}")]
    Engine(String),
}
