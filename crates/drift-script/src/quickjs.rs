//! QuickJS engine
//!
//! Evaluates fetched script text as a page module. The body runs inside
//! `(function(contentId, onCleanup, exposeVar) { ... })`, compiled once and
//! called on every attach.

use crate::{Cleanup, ModuleContext, PageModule, ScriptEngine, ScriptError, ScriptId};
use crate::{VarOptions, VarType, VarValue, VariableRegistry};
use rquickjs::function::{Opt, Rest};
use rquickjs::{Context, Ctx, Function, Object, Persistent, Runtime, Value};
use std::cell::RefCell;
use std::fmt::Write;
use std::rc::Rc;

type JsFunction = Persistent<Function<'static>>;

/// QuickJS-backed [`ScriptEngine`]
///
/// The context lives for the session: accessor closures handed to the
/// variable registry keep it alive.
pub struct QuickJsEngine {
    _runtime: Runtime,
    context: Context,
}

impl QuickJsEngine {
    pub fn new(vars: Rc<VariableRegistry>) -> Result<Self, ScriptError> {
        let runtime = Runtime::new().map_err(|e| ScriptError::Engine(e.to_string()))?;
        runtime.set_memory_limit(32 * 1024 * 1024);
        let context = Context::full(&runtime).map_err(|e| ScriptError::Engine(e.to_string()))?;

        let handle = context.clone();
        context
            .with(|ctx| install_globals(ctx, handle, vars))
            .map_err(|e| ScriptError::Engine(e.to_string()))?;

        tracing::info!("QuickJS script engine ready");
        Ok(Self {
            _runtime: runtime,
            context,
        })
    }
}

impl ScriptEngine for QuickJsEngine {
    fn instantiate(&mut self, script_id: &ScriptId, source: &str) -> Result<Box<dyn PageModule>, ScriptError> {
        let wrapped = format!("(function(contentId, onCleanup, exposeVar) {{\n{}\n}})", source);
        let (function, expose) = self
            .context
            .with(|ctx| compile(ctx, &wrapped))
            .map_err(|message| ScriptError::Execution {
                script: script_id.to_string(),
                message,
            })?;

        Ok(Box::new(QuickJsModule {
            context: self.context.clone(),
            script_id: script_id.clone(),
            function,
            expose,
        }))
    }
}

struct QuickJsModule {
    context: Context,
    script_id: ScriptId,
    function: JsFunction,
    expose: JsFunction,
}

impl PageModule for QuickJsModule {
    fn attach(&mut self, ctx: &mut ModuleContext<'_>) -> Result<Option<Cleanup>, ScriptError> {
        let content = ctx.content_id().to_string();
        let slot: Rc<RefCell<Option<JsFunction>>> = Rc::default();

        let function = self.function.clone();
        let expose = self.expose.clone();
        let sink = slot.clone();
        self.context
            .with(|js| run_body(js, function, expose, content, sink))
            .map_err(|message| ScriptError::Execution {
                script: self.script_id.to_string(),
                message,
            })?;

        // Last registration wins.
        let Some(callback) = slot.borrow_mut().take() else {
            return Ok(None);
        };
        let context = self.context.clone();
        let script = self.script_id.to_string();
        Ok(Some(Cleanup::new(move |_| {
            context
                .with(|js| call_cleanup(js, callback))
                .map_err(|message| ScriptError::Cleanup { script, message })
        })))
    }
}

fn install_globals<'js>(ctx: Ctx<'js>, context: Context, vars: Rc<VariableRegistry>) -> rquickjs::Result<()> {
    install_console(&ctx)?;

    let globals = ctx.globals();
    globals.set("window", globals.clone())?;

    let expose = Function::new(
        ctx.clone(),
        move |ctx: Ctx<'js>, key: String, get: Function<'js>, set: Function<'js>, options: Opt<Object<'js>>| -> rquickjs::Result<()> {
            let options = match options.0 {
                Some(object) => read_options(&object)?,
                None => VarOptions::default(),
            };
            let getter = Persistent::save(&ctx, get);
            let setter = Persistent::save(&ctx, set);
            let get_ctx = context.clone();
            let set_ctx = context.clone();
            vars.expose(
                &key,
                Box::new(move || call_getter(&get_ctx, &getter)),
                Box::new(move |value| call_setter(&set_ctx, &setter, value)),
                options,
            );
            Ok(())
        },
    )?;
    globals.set("exposeVar", expose)?;
    Ok(())
}

fn compile<'js>(ctx: Ctx<'js>, wrapped: &str) -> Result<(JsFunction, JsFunction), String> {
    let result = (|| -> rquickjs::Result<(JsFunction, JsFunction)> {
        let function: Function = ctx.eval(wrapped)?;
        let expose: Function = ctx.globals().get("exposeVar")?;
        Ok((Persistent::save(&ctx, function), Persistent::save(&ctx, expose)))
    })();
    result.map_err(|e| describe(&ctx, e))
}

fn run_body<'js>(
    ctx: Ctx<'js>,
    function: JsFunction,
    expose: JsFunction,
    content: String,
    slot: Rc<RefCell<Option<JsFunction>>>,
) -> Result<(), String> {
    let result = (|| -> rquickjs::Result<()> {
        let function = function.restore(&ctx)?;
        let expose = expose.restore(&ctx)?;
        let on_cleanup = Function::new(ctx.clone(), move |ctx: Ctx<'js>, callback: Function<'js>| {
            *slot.borrow_mut() = Some(Persistent::save(&ctx, callback));
        })?;
        function.call::<_, ()>((content, on_cleanup, expose))
    })();
    result.map_err(|e| describe(&ctx, e))
}

fn call_cleanup<'js>(ctx: Ctx<'js>, callback: JsFunction) -> Result<(), String> {
    let result = callback.restore(&ctx).and_then(|f| f.call::<_, ()>(()));
    result.map_err(|e| describe(&ctx, e))
}

fn call_getter(context: &Context, getter: &JsFunction) -> VarValue {
    context.with(|ctx| {
        match getter.clone().restore(&ctx).and_then(|f| f.call::<_, Value>(())) {
            Ok(value) => from_js(&value),
            Err(err) => {
                tracing::warn!("Exposed getter failed: {}", describe(&ctx, err));
                VarValue::Text(String::new())
            }
        }
    })
}

fn call_setter(context: &Context, setter: &JsFunction, value: VarValue) {
    context.with(|ctx| {
        let result = setter.clone().restore(&ctx).and_then(|f| match value {
            VarValue::Number(n) => f.call::<_, ()>((n,)),
            VarValue::Bool(b) => f.call::<_, ()>((b,)),
            VarValue::Text(s) => f.call::<_, ()>((s,)),
        });
        if let Err(err) = result {
            tracing::warn!("Exposed setter failed: {}", describe(&ctx, err));
        }
    })
}

fn read_options(object: &Object<'_>) -> rquickjs::Result<VarOptions> {
    let var_type: Option<String> = object.get("type")?;
    Ok(VarOptions {
        var_type: var_type.as_deref().map(VarType::parse).unwrap_or_default(),
        min: object.get("min")?,
        max: object.get("max")?,
        step: object.get("step")?,
    })
}

fn from_js(value: &Value<'_>) -> VarValue {
    if let Some(b) = value.as_bool() {
        VarValue::Bool(b)
    } else if let Some(n) = value.as_int() {
        VarValue::Number(n as f64)
    } else if let Some(n) = value.as_float() {
        VarValue::Number(n)
    } else {
        let mut out = String::new();
        format_value(&mut out, value);
        VarValue::Text(out)
    }
}

/// Message of a pending exception, or the error itself
fn describe(ctx: &Ctx<'_>, err: rquickjs::Error) -> String {
    if !err.is_exception() {
        return err.to_string();
    }
    let caught = ctx.catch();
    if let Some(exception) = caught.as_exception() {
        return exception.message().unwrap_or_else(|| "exception".into());
    }
    let mut out = String::new();
    format_value(&mut out, &caught);
    out
}

fn install_console(ctx: &Ctx<'_>) -> rquickjs::Result<()> {
    let console = Object::new(ctx.clone())?;
    for level in ["log", "info", "warn", "error", "debug"] {
        console.set(
            level,
            Function::new(ctx.clone(), move |args: Rest<Value>| {
                log_with_level(level, &args.0);
            })?,
        )?;
    }
    ctx.globals().set("console", console)?;
    Ok(())
}

fn log_with_level(level: &str, values: &[Value<'_>]) {
    let mut output = String::new();
    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            output.push(' ');
        }
        format_value(&mut output, value);
    }

    match level {
        "error" => tracing::error!("[JS] {}", output),
        "warn" => tracing::warn!("[JS] {}", output),
        "debug" => tracing::debug!("[JS] {}", output),
        _ => tracing::info!("[JS] {}", output),
    }
}

fn format_value(out: &mut String, value: &Value<'_>) {
    if value.is_undefined() {
        out.push_str("undefined");
    } else if value.is_null() {
        out.push_str("null");
    } else if let Some(b) = value.as_bool() {
        write!(out, "{}", b).ok();
    } else if let Some(n) = value.as_int() {
        write!(out, "{}", n).ok();
    } else if let Some(n) = value.as_float() {
        write!(out, "{}", n).ok();
    } else if let Some(s) = value.as_string() {
        if let Ok(s) = s.to_string() {
            out.push_str(&s);
        }
    } else if value.is_function() {
        out.push_str("[Function]");
    } else if value.is_object() {
        out.push_str("[Object]");
    } else {
        out.push_str("[unknown]");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drift_dom::{ContentId, MemorySurface};

    fn attach(engine: &mut QuickJsEngine, vars: &Rc<VariableRegistry>, source: &str) -> Option<Cleanup> {
        let content = ContentId::parse("cfg").unwrap();
        let script = ScriptId::for_module(&content, "inline.js");
        let mut module = engine.instantiate(&script, source).unwrap();
        let mut surface = MemorySurface::new();
        let mut ctx = ModuleContext::new(&content, &script, vars, &mut surface);
        module.attach(&mut ctx).unwrap()
    }

    #[test]
    fn test_script_exposes_variable() {
        let vars = Rc::new(VariableRegistry::new());
        let mut engine = QuickJsEngine::new(vars.clone()).unwrap();
        attach(
            &mut engine,
            &vars,
            "let speed = 2; exposeVar('snowSpeed', () => speed, (v) => { speed = v; }, { type: 'number', max: 5 });",
        );

        assert_eq!(vars.read("snowSpeed"), Some(VarValue::Number(2.0)));
        assert!(vars.write("snowSpeed", VarValue::Number(4.5)));
        assert_eq!(vars.read("snowSpeed"), Some(VarValue::Number(4.5)));
        assert_eq!(vars.get("snowSpeed").unwrap().options().max, Some(5.0));
    }

    #[test]
    fn test_cleanup_registration() {
        let vars = Rc::new(VariableRegistry::new());
        let mut engine = QuickJsEngine::new(vars.clone()).unwrap();
        let cleanup = attach(
            &mut engine,
            &vars,
            "let done = false; exposeVar('done', () => done, () => {}); onCleanup(() => { done = true; });",
        );

        assert_eq!(vars.read("done"), Some(VarValue::Bool(false)));
        cleanup.unwrap().run(&mut MemorySurface::new()).unwrap();
        assert_eq!(vars.read("done"), Some(VarValue::Bool(true)));
    }

    #[test]
    fn test_syntax_error_fails_instantiation() {
        let vars = Rc::new(VariableRegistry::new());
        let mut engine = QuickJsEngine::new(vars).unwrap();
        let content = ContentId::parse("cfg").unwrap();
        let script = ScriptId::for_module(&content, "bad.js");

        let err = engine.instantiate(&script, "function (").err().unwrap();
        assert!(matches!(err, ScriptError::Execution { .. }));
    }
}
