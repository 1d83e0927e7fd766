//! Variable Exposure Registry
//!
//! Named accessor pairs that page modules publish so the page can bind
//! inputs and displays to live state. Bindings outlive navigation.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

/// Value carried by an exposed variable
#[derive(Debug, Clone, PartialEq)]
pub enum VarValue {
    Number(f64),
    Text(String),
    Bool(bool),
}

impl VarValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            VarValue::Number(n) => Some(*n),
            VarValue::Text(s) => s.trim().parse().ok(),
            VarValue::Bool(_) => None,
        }
    }

    /// Truthiness, as a checkbox would see it
    pub fn is_truthy(&self) -> bool {
        match self {
            VarValue::Bool(b) => *b,
            VarValue::Number(n) => *n != 0.0 && !n.is_nan(),
            VarValue::Text(s) => !s.is_empty(),
        }
    }
}

impl fmt::Display for VarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VarValue::Number(n) => write!(f, "{}", n),
            VarValue::Text(s) => f.write_str(s),
            VarValue::Bool(b) => write!(f, "{}", b),
        }
    }
}

impl From<f64> for VarValue {
    fn from(n: f64) -> Self {
        VarValue::Number(n)
    }
}

impl From<bool> for VarValue {
    fn from(b: bool) -> Self {
        VarValue::Bool(b)
    }
}

impl From<&str> for VarValue {
    fn from(s: &str) -> Self {
        VarValue::Text(s.to_string())
    }
}

impl From<String> for VarValue {
    fn from(s: String) -> Self {
        VarValue::Text(s)
    }
}

/// Declared type of an exposed variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VarType {
    Number,
    String,
    Boolean,
    Color,
    #[default]
    Auto,
}

impl VarType {
    /// Parse a type name; unknown names are `Auto`
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "number" => VarType::Number,
            "string" => VarType::String,
            "boolean" | "bool" => VarType::Boolean,
            "color" => VarType::Color,
            _ => VarType::Auto,
        }
    }
}

/// Binding options; the numeric bounds are advisory
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VarOptions {
    pub var_type: VarType,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub step: Option<f64>,
}

impl VarOptions {
    pub fn typed(var_type: VarType) -> Self {
        Self {
            var_type,
            ..Self::default()
        }
    }

    pub fn number(min: f64, max: f64, step: f64) -> Self {
        Self {
            var_type: VarType::Number,
            min: Some(min),
            max: Some(max),
            step: Some(step),
        }
    }
}

pub type Getter = Box<dyn Fn() -> VarValue>;
pub type Setter = Box<dyn Fn(VarValue)>;

/// An accessor pair with its options
pub struct ExposedVariable {
    getter: Getter,
    setter: Setter,
    options: VarOptions,
}

impl ExposedVariable {
    pub fn new(getter: Getter, setter: Setter, options: VarOptions) -> Self {
        Self { getter, setter, options }
    }

    pub fn get(&self) -> VarValue {
        (self.getter)()
    }

    pub fn set(&self, value: VarValue) {
        (self.setter)(value)
    }

    pub fn options(&self) -> &VarOptions {
        &self.options
    }

    pub fn var_type(&self) -> VarType {
        self.options.var_type
    }
}

impl fmt::Debug for ExposedVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExposedVariable")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// Process-wide registry of exposed variables
///
/// Last writer wins; keys are not namespaced by page.
#[derive(Debug, Default)]
pub struct VariableRegistry {
    vars: RefCell<BTreeMap<String, Rc<ExposedVariable>>>,
}

impl VariableRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or overwrite a binding
    pub fn expose(&self, key: &str, getter: Getter, setter: Setter, options: VarOptions) {
        let variable = Rc::new(ExposedVariable::new(getter, setter, options));
        if self.vars.borrow_mut().insert(key.to_string(), variable).is_some() {
            tracing::debug!(key, "Replaced exposed variable");
        } else {
            tracing::debug!(key, var_type = ?options.var_type, "Exposed variable");
        }
    }

    /// Expose a shared cell as a variable
    pub fn expose_cell(&self, key: &str, cell: Rc<RefCell<VarValue>>, options: VarOptions) {
        let reader = cell.clone();
        self.expose(
            key,
            Box::new(move || reader.borrow().clone()),
            Box::new(move |value| *cell.borrow_mut() = value),
            options,
        );
    }

    pub fn get(&self, key: &str) -> Option<Rc<ExposedVariable>> {
        self.vars.borrow().get(key).cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.vars.borrow().contains_key(key)
    }

    /// Registered keys, sorted
    pub fn keys(&self) -> Vec<String> {
        self.vars.borrow().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.vars.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.borrow().is_empty()
    }

    /// Current value of a variable
    pub fn read(&self, key: &str) -> Option<VarValue> {
        // The accessor may itself touch the registry.
        let variable = self.get(key)?;
        Some(variable.get())
    }

    /// Write a variable; returns false for unknown keys
    pub fn write(&self, key: &str, value: VarValue) -> bool {
        match self.get(key) {
            Some(variable) => {
                variable.set(value);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expose_and_roundtrip_through_accessors() {
        let registry = VariableRegistry::new();
        let speed = Rc::new(RefCell::new(VarValue::Number(1.5)));
        registry.expose_cell("snowSpeed", speed.clone(), VarOptions::number(0.0, 5.0, 0.1));

        assert_eq!(registry.read("snowSpeed"), Some(VarValue::Number(1.5)));
        assert!(registry.write("snowSpeed", VarValue::Number(3.0)));
        assert_eq!(*speed.borrow(), VarValue::Number(3.0));
        assert_eq!(registry.get("snowSpeed").unwrap().options().max, Some(5.0));
    }

    #[test]
    fn test_last_writer_wins() {
        let registry = VariableRegistry::new();
        registry.expose("mode", Box::new(|| "a".into()), Box::new(|_| {}), VarOptions::default());
        registry.expose("mode", Box::new(|| "b".into()), Box::new(|_| {}), VarOptions::default());

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.read("mode"), Some(VarValue::Text("b".into())));
    }

    #[test]
    fn test_unknown_keys() {
        let registry = VariableRegistry::new();
        assert_eq!(registry.read("missing"), None);
        assert!(!registry.write("missing", VarValue::Bool(true)));
    }

    #[test]
    fn test_var_type_parse() {
        assert_eq!(VarType::parse("Number"), VarType::Number);
        assert_eq!(VarType::parse("bool"), VarType::Boolean);
        assert_eq!(VarType::parse("vector"), VarType::Auto);
    }

    #[test]
    fn test_value_helpers() {
        assert_eq!(VarValue::Text(" 2.5 ".into()).as_number(), Some(2.5));
        assert!(!VarValue::Number(0.0).is_truthy());
        assert_eq!(VarValue::Number(3.0).to_string(), "3");
        assert_eq!(VarValue::Bool(true).to_string(), "true");
    }
}
