//! Custom rule methods and method dispatch
//!
//! User predicates implement [`RuleMethod`] (or are plain closures wrapped in
//! [`FnRuleMethod`]). They live in a per-engine [`MethodRegistry`] or in the
//! process-wide global registry. [`lookup`] resolves a method name against
//! the registry, then the built-in predicates, then the global registry.
//!
//! # Example
//!
//! ```rust
//! use ouroboros_rules::{MethodOutput, Validator, Value};
//! use serde_json::json;
//!
//! let validator = Validator::new()
//!     .add_method("even", |params: &[Value]| match params.first() {
//!         Some(Value::Int(n)) => (n % 2 == 0).into(),
//!         _ => MethodOutput::message("@this must be an even integer"),
//!     })
//!     .set_rules(json!({"count": "required|even"}));
//!
//! assert!(validator.validate(&json!({"count": 4}).into()).is_valid());
//! ```

use crate::predicates::{self, BuiltinFn};
use crate::types::Value;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

// ============================================================================
// Method Output
// ============================================================================

/// Verdict returned by a rule method
#[derive(Debug, Clone, PartialEq)]
pub enum MethodOutput {
    /// The check holds
    Pass,
    /// The check failed; the message comes from the templates
    Fail,
    /// The check failed with this message
    Message(String),
    /// The check failed with a structured error
    Detail {
        error_type: String,
        message: Option<String>,
        extra: Vec<(String, Value)>,
    },
}

impl MethodOutput {
    pub fn is_pass(&self) -> bool {
        matches!(self, Self::Pass)
    }

    /// Failure carrying a message
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }

    /// Failure carrying a custom error type
    pub fn detail(error_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Detail {
            error_type: error_type.into(),
            message: Some(message.into()),
            extra: Vec::new(),
        }
    }

    /// Add an extra field to a [`MethodOutput::Detail`]
    pub fn with_extra(self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        match self {
            Self::Detail {
                error_type,
                message,
                mut extra,
            } => {
                extra.push((key.into(), value.into()));
                Self::Detail {
                    error_type,
                    message,
                    extra,
                }
            }
            other => other,
        }
    }
}

impl From<bool> for MethodOutput {
    fn from(ok: bool) -> Self {
        if ok {
            Self::Pass
        } else {
            Self::Fail
        }
    }
}

impl From<String> for MethodOutput {
    fn from(message: String) -> Self {
        Self::Message(message)
    }
}

impl From<&str> for MethodOutput {
    fn from(message: &str) -> Self {
        Self::Message(message.to_string())
    }
}

/// `true` passes, a string is a message, an object is a structured error
/// (`error_type`, `message`, anything else is extra); everything else fails.
impl From<Value> for MethodOutput {
    fn from(value: Value) -> Self {
        match value {
            Value::Bool(true) => Self::Pass,
            Value::String(message) => Self::Message(message),
            Value::Object(pairs) => {
                let mut error_type = "validation".to_string();
                let mut message = None;
                let mut extra = Vec::new();
                for (key, value) in pairs {
                    match (key.as_str(), value) {
                        ("error_type", Value::String(s)) => error_type = s,
                        ("message", Value::String(s)) => message = Some(s),
                        (_, value) => extra.push((key, value)),
                    }
                }
                Self::Detail {
                    error_type,
                    message,
                    extra,
                }
            }
            _ => Self::Fail,
        }
    }
}

// ============================================================================
// Rule Method Trait
// ============================================================================

/// A named predicate callable from rule strings.
///
/// `params` are already resolved: for `name` alone it is `[value]`, for
/// `name[a,b]` it is `[value, "a", "b"]`, for `name(a,b)` it is `["a", "b"]`.
pub trait RuleMethod: Send + Sync {
    fn call(&self, params: &[Value]) -> MethodOutput;
}

/// Type alias for a shared rule method
pub type BoxedRuleMethod = Arc<dyn RuleMethod>;

/// Wrap a closure as a [`RuleMethod`]
pub struct FnRuleMethod<F>
where
    F: Fn(&[Value]) -> MethodOutput + Send + Sync,
{
    method_fn: F,
}

impl<F> FnRuleMethod<F>
where
    F: Fn(&[Value]) -> MethodOutput + Send + Sync,
{
    pub fn new(method_fn: F) -> Self {
        Self { method_fn }
    }
}

impl<F> RuleMethod for FnRuleMethod<F>
where
    F: Fn(&[Value]) -> MethodOutput + Send + Sync,
{
    fn call(&self, params: &[Value]) -> MethodOutput {
        (self.method_fn)(params)
    }
}

// ============================================================================
// Method Registry
// ============================================================================

/// Per-engine collection of custom methods
#[derive(Default, Clone)]
pub struct MethodRegistry {
    methods: HashMap<String, BoxedRuleMethod>,
}

impl MethodRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or overwrite) a method
    pub fn add(&mut self, name: impl Into<String>, method: impl RuleMethod + 'static) {
        self.methods.insert(name.into(), Arc::new(method));
    }

    pub fn get(&self, name: &str) -> Option<&BoxedRuleMethod> {
        self.methods.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }
}

impl std::fmt::Debug for MethodRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MethodRegistry")
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .finish()
    }
}

// ============================================================================
// Global Registry
// ============================================================================

static GLOBAL_METHODS: Lazy<RwLock<HashMap<String, BoxedRuleMethod>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// Register a method visible to every engine in the process.
///
/// Engine-local methods and built-ins take precedence over global ones.
pub fn register_global_method(name: impl Into<String>, method: impl RuleMethod + 'static) {
    GLOBAL_METHODS.write().insert(name.into(), Arc::new(method));
}

/// Closure form of [`register_global_method`]
pub fn register_global_fn<F>(name: impl Into<String>, method_fn: F)
where
    F: Fn(&[Value]) -> MethodOutput + Send + Sync + 'static,
{
    register_global_method(name, FnRuleMethod::new(method_fn));
}

/// Remove a global method; returns whether one was registered
pub fn unregister_global_method(name: &str) -> bool {
    GLOBAL_METHODS.write().remove(name).is_some()
}

pub fn global_method(name: &str) -> Option<BoxedRuleMethod> {
    GLOBAL_METHODS.read().get(name).cloned()
}

// ============================================================================
// Dispatch
// ============================================================================

/// Something that can be invoked with resolved parameters
#[derive(Clone)]
pub enum Callable {
    Custom(BoxedRuleMethod),
    Builtin(BuiltinFn),
}

impl Callable {
    pub fn call(&self, params: &[Value]) -> MethodOutput {
        match self {
            Self::Custom(method) => method.call(params),
            Self::Builtin(method_fn) => method_fn(params),
        }
    }
}

/// Outcome of resolving a method name
#[derive(Clone)]
pub enum Dispatch {
    Found(Callable),
    NotFound,
}

/// Resolve `name`: engine registry, then built-ins, then the global registry.
pub fn lookup(registry: &MethodRegistry, name: &str) -> Dispatch {
    if let Some(method) = registry.get(name) {
        return Dispatch::Found(Callable::Custom(Arc::clone(method)));
    }
    if let Some(method_fn) = predicates::builtin(name) {
        return Dispatch::Found(Callable::Builtin(method_fn));
    }
    match global_method(name) {
        Some(method) => Dispatch::Found(Callable::Custom(method)),
        None => Dispatch::NotFound,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn call(dispatch: Dispatch, params: &[Value]) -> Option<MethodOutput> {
        match dispatch {
            Dispatch::Found(callable) => Some(callable.call(params)),
            Dispatch::NotFound => None,
        }
    }

    #[test]
    fn test_method_output_conversions() {
        assert_eq!(MethodOutput::from(true), MethodOutput::Pass);
        assert_eq!(MethodOutput::from(false), MethodOutput::Fail);
        assert_eq!(MethodOutput::from("bad"), MethodOutput::Message("bad".into()));

        let detail = MethodOutput::from(Value::Object(vec![
            ("error_type".into(), Value::from("too_young")),
            ("message".into(), Value::from("@this too young")),
            ("min".into(), Value::Int(18)),
        ]));
        assert_eq!(
            detail,
            MethodOutput::detail("too_young", "@this too young").with_extra("min", 18i64)
        );
        assert_eq!(MethodOutput::from(Value::Int(1)), MethodOutput::Fail);
    }

    #[test]
    fn test_registry_takes_precedence_over_builtin() {
        let mut registry = MethodRegistry::new();
        registry.add("int", FnRuleMethod::new(|_: &[Value]| MethodOutput::Pass));

        let out = call(lookup(&registry, "int"), &[Value::from("not an int")]);
        assert_eq!(out, Some(MethodOutput::Pass));
    }

    #[test]
    fn test_builtin_found() {
        let registry = MethodRegistry::new();
        let out = call(lookup(&registry, "int"), &[Value::Int(3)]);
        assert_eq!(out, Some(MethodOutput::Pass));
    }

    #[test]
    fn test_global_fallback() {
        let registry = MethodRegistry::new();
        assert!(call(lookup(&registry, "registry_test_global"), &[]).is_none());

        register_global_fn("registry_test_global", |_: &[Value]| MethodOutput::Pass);
        let out = call(lookup(&registry, "registry_test_global"), &[]);
        assert_eq!(out, Some(MethodOutput::Pass));

        assert!(unregister_global_method("registry_test_global"));
        assert!(!unregister_global_method("registry_test_global"));
    }

    #[test]
    fn test_registry_debug_lists_names() {
        let mut registry = MethodRegistry::new();
        registry.add("check", FnRuleMethod::new(|_: &[Value]| MethodOutput::Pass));
        assert!(format!("{:?}", registry).contains("check"));
        assert_eq!(registry.len(), 1);
        assert!(registry.contains("check"));
    }
}
