//! Rule trees
//!
//! A rule tree mirrors the shape of the data it checks:
//!
//! ```text
//! {
//!     "name": "required|string|len<=[32]",
//!     "height": ["required|>[100]", "required|string"],   // OR group
//!     "tags[optional].*": "string",                         // optional numeric array
//!     "address": {"city": "required", "zip": "optional|len=[5]"}
//! }
//! ```
//!
//! System symbols (OR, array-optional, numeric-array) may be written as a
//! field-name suffix or as the only key of a nested object. Both forms are
//! kept verbatim here; the executor reads them through [`split_field_key`]
//! and [`symbol_node`] with the active grammar, so changing the grammar
//! never requires rebuilding the tree.

use crate::config::GrammarConfig;
use crate::types::Value;

/// One node of a rule tree
#[derive(Debug, Clone, PartialEq)]
pub enum RuleNode {
    /// A leaf rule string of separator-joined method tokens
    Leaf(String),
    /// Alternatives, the first one that passes wins
    Or(Vec<RuleNode>),
    /// Field name (possibly with symbol suffixes) to nested rule
    Object(Vec<(String, RuleNode)>),
}

impl RuleNode {
    /// Whether the node carries no rule at all
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Leaf(rule) => rule.trim().is_empty(),
            Self::Or(alternatives) => alternatives.is_empty(),
            Self::Object(children) => children.is_empty(),
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Self::Leaf(_))
    }
}

impl From<&str> for RuleNode {
    fn from(rule: &str) -> Self {
        Self::Leaf(rule.to_string())
    }
}

impl From<String> for RuleNode {
    fn from(rule: String) -> Self {
        Self::Leaf(rule)
    }
}

impl<T: Into<RuleNode>> From<Vec<T>> for RuleNode {
    fn from(alternatives: Vec<T>) -> Self {
        Self::Or(alternatives.into_iter().map(Into::into).collect())
    }
}

/// Strings are leaves, arrays are OR groups, objects descend.
/// Other scalars become leaves holding their text; `null` is an empty leaf.
impl From<serde_json::Value> for RuleNode {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Leaf(String::new()),
            serde_json::Value::String(rule) => Self::Leaf(rule),
            serde_json::Value::Array(items) => Self::Or(items.into_iter().map(Into::into).collect()),
            serde_json::Value::Object(map) => {
                Self::Object(map.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
            other => Self::Leaf(other.to_string()),
        }
    }
}

impl From<Value> for RuleNode {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Leaf(String::new()),
            Value::String(rule) => Self::Leaf(rule),
            Value::List(items) => Self::Or(items.into_iter().map(Into::into).collect()),
            Value::Object(pairs) => {
                Self::Object(pairs.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
            other => Self::Leaf(other.to_string()),
        }
    }
}

// ============================================================================
// System Symbols
// ============================================================================

/// System symbols attached to a field
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SymbolFlags {
    pub array_optional: bool,
    /// Stacked numeric-array suffixes; `.*.*` is 2
    pub numeric_depth: usize,
    pub or: bool,
}

impl SymbolFlags {
    pub fn is_empty(&self) -> bool {
        !(self.array_optional || self.numeric_depth > 0 || self.or)
    }
}

/// Strip system-symbol suffixes off a field key.
///
/// Suffixes may be stacked in any order: `items[optional].*`,
/// `tags.*[or]`. Each numeric-array suffix adds one level of nesting. The remaining text is the field name; it is empty when the
/// key consists of symbols only.
pub fn split_field_key<'a>(key: &'a str, grammar: &GrammarConfig) -> (&'a str, SymbolFlags) {
    let mut flags = SymbolFlags::default();
    let mut name = key;
    loop {
        if let Some(rest) = strip_either(name, &grammar.array_optional, &grammar.array_optional_short) {
            flags.array_optional = true;
            name = rest;
        } else if let Some(rest) = name.strip_suffix(grammar.numeric_array.as_str()) {
            flags.numeric_depth += 1;
            name = rest;
        } else if let Some(rest) = strip_either(name, &grammar.or, &grammar.or_short) {
            flags.or = true;
            name = rest;
        } else {
            return (name, flags);
        }
    }
}

fn strip_either<'a>(text: &'a str, long: &str, short: &str) -> Option<&'a str> {
    text.strip_suffix(long).or_else(|| text.strip_suffix(short))
}

/// A single-key object whose key is made of system symbols only, e.g.
/// `{".*": "int"}` or `{"[or]": ["int", "string"]}`.
pub fn symbol_node<'a>(
    children: &'a [(String, RuleNode)],
    grammar: &GrammarConfig,
) -> Option<(&'a RuleNode, SymbolFlags)> {
    let [(key, node)] = children else {
        return None;
    };
    match split_field_key(key, grammar) {
        ("", flags) if !flags.is_empty() => Some((node, flags)),
        _ => None,
    }
}

/// Whether a top-level rule must be applied to the input as a whole
pub fn wraps_root(rules: &RuleNode, grammar: &GrammarConfig) -> bool {
    match rules {
        RuleNode::Leaf(_) | RuleNode::Or(_) => true,
        RuleNode::Object(children) => symbol_node(children, grammar).is_some(),
    }
}
