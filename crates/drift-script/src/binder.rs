//! Variable binder
//!
//! Built-in page module that wires content inputs and display elements to
//! exposed variables.

use crate::{Cleanup, ModuleContext, PageModule, ScriptError, VarType, VarValue, VariableRegistry};
use drift_dom::{ElementInfo, ElementKey, Surface};
use std::cell::RefCell;
use std::rc::Rc;

/// Script path the binder is registered under
pub const VAR_BINDER_PATH: &str = "var_binder.js";

const INPUT_TAGS: [&str; 3] = ["input", "select", "textarea"];

/// Name variants tried when resolving a variable key
///
/// The name itself, its camelCase and kebab-case forms, and the
/// underscore/hyphen swaps, without duplicates.
pub fn candidate_names(base: &str) -> Vec<String> {
    if base.is_empty() {
        return Vec::new();
    }

    let mut variants = vec![base.to_string()];

    if base.contains('-') {
        let mut camel = String::with_capacity(base.len());
        let mut chars = base.chars().peekable();
        while let Some(c) = chars.next() {
            match chars.peek() {
                Some(next) if c == '-' && next.is_ascii_lowercase() => {
                    let upper = next.to_ascii_uppercase();
                    chars.next();
                    camel.push(upper);
                }
                _ => camel.push(c),
            }
        }
        variants.push(camel);
    }

    if base.chars().any(|c| c.is_ascii_uppercase()) {
        let mut kebab = String::with_capacity(base.len() + 4);
        for c in base.chars() {
            if c.is_ascii_uppercase() {
                kebab.push('-');
                kebab.push(c.to_ascii_lowercase());
            } else {
                kebab.push(c);
            }
        }
        variants.push(kebab);
    }

    variants.push(base.replace('-', "_"));
    variants.push(base.replace('_', "-"));

    let mut unique: Vec<String> = Vec::with_capacity(variants.len());
    for v in variants {
        if !unique.contains(&v) {
            unique.push(v);
        }
    }
    unique
}

/// First candidate of `base` that is a registered variable
pub fn resolve_key(vars: &VariableRegistry, base: &str) -> Option<String> {
    candidate_names(base).into_iter().find(|name| vars.contains(name))
}

/// Text shown in a display element for a value
pub fn format_display(value: &VarValue, var_type: VarType) -> String {
    match var_type {
        VarType::Number => format!("{:.2}", value.as_number().unwrap_or(f64::NAN)),
        VarType::Boolean => if value.is_truthy() { "Enabled" } else { "Disabled" }.to_string(),
        _ => value.to_string(),
    }
}

/// How an input element's value is read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Checkbox,
    Numeric,
    Color,
    Text,
}

impl InputKind {
    pub fn of(element: &ElementInfo) -> Self {
        let input_type = element.attr("type").unwrap_or("text").to_ascii_lowercase();
        match (element.tag.as_str(), input_type.as_str()) {
            ("input", "checkbox") => InputKind::Checkbox,
            ("input", "range") | ("input", "number") => InputKind::Numeric,
            ("input", "color") => InputKind::Color,
            _ => InputKind::Text,
        }
    }

    /// Coerce a raw input value for a variable of `var_type`
    pub fn coerce(&self, raw: &str, var_type: VarType) -> VarValue {
        match self {
            InputKind::Checkbox => VarValue::Bool(matches!(raw.trim(), "true" | "on" | "1" | "checked")),
            InputKind::Numeric => VarValue::Number(raw.trim().parse().unwrap_or(f64::NAN)),
            InputKind::Color => VarValue::Text(raw.to_string()),
            InputKind::Text => match raw.trim().parse::<f64>() {
                Ok(n) => VarValue::Number(n),
                Err(_) if var_type == VarType::Number => VarValue::Number(f64::NAN),
                Err(_) => VarValue::Text(raw.to_string()),
            },
        }
    }
}

#[derive(Debug, Clone)]
struct InputBinding {
    key: ElementKey,
    var: String,
    kind: InputKind,
}

#[derive(Debug, Default)]
struct Bindings {
    inputs: Vec<InputBinding>,
    displays: Vec<(ElementKey, String)>,
}

/// The `var_binder.js` page module
#[derive(Debug, Default)]
pub struct VarBinderModule {
    bindings: Rc<RefCell<Bindings>>,
}

impl VarBinderModule {
    pub fn new() -> Self {
        Self::default()
    }

    fn bind_input(vars: &VariableRegistry, surface: &mut dyn Surface, element: &ElementInfo, name: &str) -> Option<InputBinding> {
        let var = resolve_key(vars, name)?;
        let variable = vars.get(&var)?;
        let kind = InputKind::of(element);
        let value = variable.get();

        match kind {
            InputKind::Checkbox => {
                surface.set_attribute(element.key, "checked", if value.is_truthy() { "true" } else { "false" });
            }
            InputKind::Numeric => {
                let number = value.as_number().unwrap_or(f64::NAN);
                surface.set_value(element.key, &number.to_string());
                let options = variable.options();
                for (attr, bound) in [("min", options.min), ("max", options.max), ("step", options.step)] {
                    if let Some(bound) = bound {
                        surface.set_attribute(element.key, attr, &bound.to_string());
                    }
                }
            }
            InputKind::Color | InputKind::Text => {
                surface.set_value(element.key, &value.to_string());
            }
        }

        surface.set_attribute(element.key, "data-bound", &var);
        tracing::debug!(element = %element.key, var = %var, "Bound input");
        Some(InputBinding { key: element.key, var, kind })
    }

    fn bind_display(vars: &VariableRegistry, surface: &mut dyn Surface, element: &ElementInfo, name: &str) -> Option<String> {
        let var = resolve_key(vars, name)?;
        let variable = vars.get(&var)?;
        surface.set_text(element.key, &format_display(&variable.get(), variable.var_type()));
        surface.set_attribute(element.key, "data-bound-display", &var);
        Some(var)
    }
}

impl PageModule for VarBinderModule {
    fn attach(&mut self, ctx: &mut ModuleContext<'_>) -> Result<Option<Cleanup>, ScriptError> {
        let vars = ctx.vars().clone();
        let content = ctx.content_id().clone();
        tracing::debug!(content = %content, "Variable binder attached");

        if vars.is_empty() {
            tracing::debug!("No exposed variables found");
        }

        let mut bindings = Bindings::default();
        let surface = ctx.surface();

        for element in surface.content_elements() {
            let is_input = INPUT_TAGS.contains(&element.tag.as_str());
            if is_input {
                let name = element
                    .attr("data-var")
                    .or_else(|| element.attr("name"))
                    .or(element.id.as_deref())
                    .map(str::to_string);
                if let Some(name) = name {
                    if let Some(binding) = Self::bind_input(&vars, surface, &element, &name) {
                        bindings.inputs.push(binding);
                    }
                }
                continue;
            }

            for attr in ["data-display", "data-var"] {
                let Some(name) = element.attr(attr).map(str::to_string) else {
                    continue;
                };
                if let Some(var) = Self::bind_display(&vars, surface, &element, &name) {
                    bindings.displays.push((element.key, var));
                    break;
                }
            }
        }

        tracing::debug!(
            content = %content,
            inputs = bindings.inputs.len(),
            displays = bindings.displays.len(),
            "Bound variables"
        );
        *self.bindings.borrow_mut() = bindings;

        let state = self.bindings.clone();
        ctx.on_input(Box::new(move |surface, key, raw| {
            let binding = state.borrow().inputs.iter().find(|b| b.key == key).cloned();
            let Some(binding) = binding else {
                return;
            };
            let Some(variable) = vars.get(&binding.var) else {
                return;
            };

            let value = binding.kind.coerce(raw, variable.var_type());
            variable.set(value.clone());
            tracing::debug!(var = %binding.var, value = %value, "Set variable from input");

            let text = format_display(&value, variable.var_type());
            for (display, var) in state.borrow().displays.iter() {
                if var == &binding.var {
                    surface.set_text(*display, &text);
                }
            }
        }));

        let state = self.bindings.clone();
        Ok(Some(Cleanup::from_fn(move || {
            *state.borrow_mut() = Bindings::default();
            tracing::debug!(content = %content, "Variable binder cleanup");
        })))
    }
}
