//! Runtime value model
//!
//! Payloads, rule parameters, the result mirror and the error views are all
//! expressed as [`Value`]. Objects keep insertion order so error views and
//! the result mirror come out in the same order as the input.

use std::fmt;

// ============================================================================
// Value Enum - Runtime values to be validated
// ============================================================================

/// Runtime value that can be validated
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Null value (also stands in for a missing field or reference)
    #[default]
    Null,
    /// Boolean value
    Bool(bool),
    /// Integer value (i64)
    Int(i64),
    /// Float value (f64)
    Float(f64),
    /// String value
    String(String),
    /// List/Array of values
    List(Vec<Value>),
    /// Object/Dictionary (ordered key-value pairs)
    Object(Vec<(String, Value)>),
}

impl Value {
    /// Get human-readable type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Int(_) => "integer",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::List(_) => "array",
            Self::Object(_) => "object",
        }
    }

    /// Check if value is null
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Create an empty object
    pub fn object() -> Self {
        Self::Object(Vec::new())
    }

    /// Whether the value counts as present for `required`.
    ///
    /// `0`, `"0"` and `false` are present; null, `""` and empty
    /// collections are not.
    pub fn is_present(&self) -> bool {
        match self {
            Self::Null => false,
            Self::String(s) => !s.is_empty(),
            Self::List(items) => !items.is_empty(),
            Self::Object(pairs) => !pairs.is_empty(),
            Self::Bool(_) | Self::Int(_) | Self::Float(_) => true,
        }
    }

    /// Look up a direct child by key.
    ///
    /// Objects are looked up by name, lists by decimal index.
    pub fn child(&self, key: &str) -> Option<&Value> {
        match self {
            Self::Object(pairs) => pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            Self::List(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        }
    }

    /// Mutable variant of [`Value::child`]
    pub fn child_mut(&mut self, key: &str) -> Option<&mut Value> {
        match self {
            Self::Object(pairs) => pairs.iter_mut().find(|(k, _)| k == key).map(|(_, v)| v),
            Self::List(items) => key
                .parse::<usize>()
                .ok()
                .and_then(move |i| items.get_mut(i)),
            _ => None,
        }
    }

    /// Whether `key` exists as a direct child, regardless of its value
    pub fn has_child(&self, key: &str) -> bool {
        self.child(key).is_some()
    }

    /// Insert or replace a field on an object. No-op for other variants.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        if let Self::Object(pairs) = self {
            let key = key.into();
            match pairs.iter_mut().find(|(k, _)| *k == key) {
                Some((_, slot)) => *slot = value,
                None => pairs.push((key, value)),
            }
        }
    }

    /// Remove a field from an object (or an element from a list)
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        match self {
            Self::Object(pairs) => {
                let idx = pairs.iter().position(|(k, _)| k == key)?;
                Some(pairs.remove(idx).1)
            }
            Self::List(items) => {
                let idx = key.parse::<usize>().ok().filter(|i| *i < items.len())?;
                Some(items.remove(idx))
            }
            _ => None,
        }
    }

    /// Numeric view of the value; numeric strings are accepted.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            Self::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
            _ => None,
        }
    }

    /// String view of the value, if it is a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Number of characters (strings) or items (collections)
    pub fn length(&self) -> Option<usize> {
        match self {
            Self::String(s) => Some(s.chars().count()),
            Self::List(items) => Some(items.len()),
            Self::Object(pairs) => Some(pairs.len()),
            _ => None,
        }
    }
}

/// Renders values the way they appear inside error messages.
///
/// Strings are written bare; lists render as `[a,b,c]`.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Int(i) => write!(f, "{}", i),
            Self::Float(x) => write!(f, "{}", x),
            Self::String(s) => write!(f, "{}", s),
            Self::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Self::Object(_) => {
                let json: serde_json::Value = self.clone().into();
                write!(f, "{}", json)
            }
        }
    }
}

// ============================================================================
// Conversions
// ============================================================================

impl From<Value> for serde_json::Value {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(b),
            Value::Int(i) => serde_json::Value::Number(i.into()),
            Value::Float(f) => serde_json::Number::from_f64(f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s),
            Value::List(items) => {
                serde_json::Value::Array(items.into_iter().map(Into::into).collect())
            }
            Value::Object(fields) => serde_json::Value::Object(
                fields.into_iter().map(|(k, v)| (k, v.into())).collect(),
            ),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Into::into).collect())
            }
            serde_json::Value::Object(map) => {
                Value::Object(map.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_value_type_name() {
        assert_eq!(Value::Null.type_name(), "null");
        assert_eq!(Value::Bool(true).type_name(), "boolean");
        assert_eq!(Value::Int(42).type_name(), "integer");
        assert_eq!(Value::Float(3.5).type_name(), "float");
        assert_eq!(Value::from("test").type_name(), "string");
        assert_eq!(Value::List(vec![]).type_name(), "array");
        assert_eq!(Value::object().type_name(), "object");
    }

    #[test]
    fn test_is_present() {
        assert!(Value::Int(0).is_present());
        assert!(Value::from("0").is_present());
        assert!(Value::Bool(false).is_present());

        assert!(!Value::Null.is_present());
        assert!(!Value::from("").is_present());
        assert!(!Value::List(vec![]).is_present());
        assert!(!Value::object().is_present());
    }

    #[test]
    fn test_child_lookup() {
        let value: Value = json!({"a": {"b": [10, 20]}}).into();
        let list = value.child("a").and_then(|a| a.child("b")).unwrap();
        assert_eq!(list.child("1"), Some(&Value::Int(20)));
        assert_eq!(list.child("2"), None);
        assert_eq!(list.child("x"), None);
        assert!(value.has_child("a"));
        assert!(!value.has_child("b"));
    }

    #[test]
    fn test_insert_keeps_order() {
        let mut obj = Value::object();
        obj.insert("z", Value::Int(1));
        obj.insert("a", Value::Int(2));
        obj.insert("z", Value::Int(3));
        assert_eq!(
            obj,
            Value::Object(vec![("z".into(), Value::Int(3)), ("a".into(), Value::Int(2))])
        );
    }

    #[test]
    fn test_as_f64() {
        assert_eq!(Value::Int(3).as_f64(), Some(3.0));
        assert_eq!(Value::from(" 2.5 ").as_f64(), Some(2.5));
        assert_eq!(Value::from("abc").as_f64(), None);
        assert_eq!(Value::Bool(true).as_f64(), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::from(vec!["a", "b"]).to_string(), "[a,b]");
        assert_eq!(Value::Int(7).to_string(), "7");
    }

    #[test]
    fn test_json_conversion() {
        let original = json!({"name": "x", "tags": [1, 2.5, null, true]});
        let value: Value = original.clone().into();
        let back: serde_json::Value = value.into();
        assert_eq!(back, original);
    }
}
