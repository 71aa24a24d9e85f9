//! Error types
//!
//! Two families live here:
//! - [`RuleError`]: engine faults (undefined methods, bad patterns, bad
//!   configuration). These abort a validation pass.
//! - [`ErrorDetail`] / [`ErrorStore`]: ordinary validation failures, kept in
//!   a flat ("classic") and a nested ("standard") store.

use crate::tree::{self, PathTree};
use crate::types::Value;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

// ============================================================================
// Engine Faults
// ============================================================================

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, RuleError>;

/// Faults that cannot be expressed as a validation verdict
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RuleError {
    #[error("Method undefined: {method} (field {field})")]
    MethodUndefined { method: String, field: String },

    #[error("Invalid pattern {pattern}: {reason}")]
    Pattern { pattern: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Rule nesting exceeds maximum depth of {0}")]
    RecursionLimit(usize),

    #[error("Language error: {0}")]
    Language(String),
}

impl From<regex::Error> for RuleError {
    fn from(err: regex::Error) -> Self {
        RuleError::Pattern {
            pattern: String::new(),
            reason: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for RuleError {
    fn from(err: serde_json::Error) -> Self {
        RuleError::Language(err.to_string())
    }
}

// ============================================================================
// Error Kind Classification
// ============================================================================

/// Classification of validation failures (`error_type` in complex views)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Required marker failed
    RequiredField,
    /// Unset-required marker failed
    UnsetRequiredField,
    /// Any predicate or regex failure
    Validation,
    /// Method could not be resolved
    InternalServerError,
    /// Error type chosen by a custom method
    Custom(String),
}

impl ErrorKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::RequiredField => "required_field",
            Self::UnsetRequiredField => "unset_required_field",
            Self::Validation => "validation",
            Self::InternalServerError => "internal_server_error",
            Self::Custom(name) => name,
        }
    }
}

impl From<&str> for ErrorKind {
    fn from(name: &str) -> Self {
        match name {
            "required_field" => Self::RequiredField,
            "unset_required_field" => Self::UnsetRequiredField,
            "validation" => Self::Validation,
            "internal_server_error" => Self::InternalServerError,
            other => Self::Custom(other.to_string()),
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Error Detail
// ============================================================================

/// One recorded failure: `{error_type, message, ...extra}`
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorDetail {
    pub error_type: ErrorKind,
    pub message: String,
    /// Additional fields supplied by custom methods
    pub extra: Vec<(String, Value)>,
}

impl ErrorDetail {
    pub fn new(error_type: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            error_type,
            message: message.into(),
            extra: Vec::new(),
        }
    }

    /// Attach an extra field, replacing one with the same name
    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        let key = key.into();
        match self.extra.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => *slot = value,
            None => self.extra.push((key, value)),
        }
        self
    }

    /// Complex representation
    pub fn to_value(&self) -> Value {
        let mut pairs = vec![
            ("error_type".to_string(), Value::String(self.error_type.to_string())),
            ("message".to_string(), Value::String(self.message.clone())),
        ];
        pairs.extend(self.extra.iter().cloned());
        Value::Object(pairs)
    }
}

impl fmt::Display for ErrorDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.message, self.error_type)
    }
}

// ============================================================================
// Error Views
// ============================================================================

/// The four error representations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorFormat {
    /// `{"a.b": "message"}`
    ClassicSimple,
    /// `{"a.b": {"error_type": .., "message": ..}}`
    ClassicComplex,
    /// `{"a": {"b": "message"}}`
    StandardSimple,
    /// `{"a": {"b": {"error_type": .., "message": ..}}}`
    StandardComplex,
}

impl ErrorFormat {
    pub fn new(standard: bool, simple: bool) -> Self {
        match (standard, simple) {
            (false, true) => Self::ClassicSimple,
            (false, false) => Self::ClassicComplex,
            (true, true) => Self::StandardSimple,
            (true, false) => Self::StandardComplex,
        }
    }

    pub fn is_simple(self) -> bool {
        matches!(self, Self::ClassicSimple | Self::StandardSimple)
    }

    pub fn is_standard(self) -> bool {
        matches!(self, Self::StandardSimple | Self::StandardComplex)
    }
}

// ============================================================================
// Error Store
// ============================================================================

/// Ordered children of a standard-store branch, indexed by key.
///
/// Removal leaves an empty slot so positions stay valid.
#[derive(Debug, Clone, Default)]
struct Children {
    slots: Vec<Option<(String, ErrorNode)>>,
    index: HashMap<String, usize>,
}

impl Children {
    fn get(&self, key: &str) -> Option<&ErrorNode> {
        let pos = *self.index.get(key)?;
        self.slots[pos].as_ref().map(|(_, node)| node)
    }

    fn get_mut(&mut self, key: &str) -> Option<&mut ErrorNode> {
        let pos = *self.index.get(key)?;
        self.slots[pos].as_mut().map(|(_, node)| node)
    }

    fn put(&mut self, key: &str, node: ErrorNode) {
        match self.index.get(key) {
            Some(&pos) => self.slots[pos] = Some((key.to_string(), node)),
            None => {
                self.index.insert(key.to_string(), self.slots.len());
                self.slots.push(Some((key.to_string(), node)));
            }
        }
    }

    fn take(&mut self, key: &str) -> Option<ErrorNode> {
        let pos = self.index.remove(key)?;
        self.slots[pos].take().map(|(_, node)| node)
    }

    fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    fn iter(&self) -> impl Iterator<Item = &(String, ErrorNode)> {
        self.slots.iter().flatten()
    }
}

/// Node of the nested ("standard") store. Leaves hold the classic key, so
/// both views read the same detail.
#[derive(Debug, Clone)]
enum ErrorNode {
    Leaf(String),
    Branch(Children),
}

impl ErrorNode {
    /// Classic keys of every leaf at or below this node
    fn collect_keys(&self, out: &mut Vec<String>) {
        match self {
            Self::Leaf(key) => out.push(key.clone()),
            Self::Branch(children) => {
                for (_, node) in children.iter() {
                    node.collect_keys(out);
                }
            }
        }
    }
}

impl PathTree for ErrorNode {
    fn branch() -> Self {
        Self::Branch(Children::default())
    }

    fn is_branch(&self) -> bool {
        matches!(self, Self::Branch(_))
    }

    fn is_empty_branch(&self) -> bool {
        matches!(self, Self::Branch(children) if children.is_empty())
    }

    fn get_child(&self, key: &str) -> Option<&Self> {
        match self {
            Self::Branch(children) => children.get(key),
            Self::Leaf(_) => None,
        }
    }

    fn get_child_mut(&mut self, key: &str) -> Option<&mut Self> {
        match self {
            Self::Branch(children) => children.get_mut(key),
            Self::Leaf(_) => None,
        }
    }

    fn put_child(&mut self, key: &str, node: Self) {
        if let Self::Branch(children) = self {
            children.put(key, node);
        }
    }

    fn take_child(&mut self, key: &str) -> Option<Self> {
        match self {
            Self::Branch(children) => children.take(key),
            Self::Leaf(_) => None,
        }
    }
}

#[derive(Debug, Clone)]
struct ClassicEntry {
    path: Vec<String>,
    key: String,
    detail: ErrorDetail,
    /// Distinct messages joined into `detail.message`, in recording order
    messages: Vec<String>,
}

impl ClassicEntry {
    fn new(path: &[String], key: &str, detail: ErrorDetail) -> Self {
        let messages = vec![detail.message.clone()];
        Self {
            path: path.to_vec(),
            key: key.to_string(),
            detail,
            messages,
        }
    }

    /// Append messages with `" or "`, skipping one identical to the last.
    fn absorb(&mut self, messages: Vec<String>, extra: Vec<(String, Value)>) {
        for message in messages {
            if self.messages.last() != Some(&message) {
                self.messages.push(message);
            }
        }
        self.detail.message = self.messages.join(" or ");
        for (key, value) in extra {
            if !self.detail.extra.iter().any(|(k, _)| *k == key) {
                self.detail.extra.push((key, value));
            }
        }
    }
}

/// Flat and nested error stores, written together so they never diverge.
///
/// Every standard leaf names exactly one live classic entry. No entry's path
/// is a prefix of another's.
#[derive(Debug, Clone)]
pub struct ErrorStore {
    classic: Vec<Option<ClassicEntry>>,
    index: HashMap<String, usize>,
    standard: ErrorNode,
}

impl Default for ErrorStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ErrorStore {
    pub fn new() -> Self {
        Self {
            classic: Vec::new(),
            index: HashMap::new(),
            standard: ErrorNode::branch(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Record a failure at `path`; `key` is the dotted form of the path.
    ///
    /// An existing message at the same path is extended with `" or "`. A
    /// failure above or below recorded ones folds them all into one entry at
    /// the shallowest path. Returns the path and detail now holding it.
    pub fn record(
        &mut self,
        path: &[String],
        key: &str,
        detail: ErrorDetail,
    ) -> Option<(&[String], &ErrorDetail)> {
        if let Some(&pos) = self.index.get(key) {
            if let Some(entry) = self.classic[pos].as_mut() {
                entry.absorb(vec![detail.message], detail.extra);
            }
            return self.entry_at(pos);
        }

        let incoming = ClassicEntry::new(path, key, detail);
        let mut positions: Vec<usize> = self
            .overlapping(path)
            .iter()
            .filter_map(|k| self.index.get(k).copied())
            .collect();
        if positions.is_empty() {
            let pos = self.insert(incoming, None);
            return self.entry_at(pos);
        }

        positions.sort_unstable();
        let mut folded: Option<ClassicEntry> = None;
        for &pos in &positions {
            let Some(entry) = self.classic[pos].take() else {
                continue;
            };
            self.index.remove(&entry.key);
            match folded.as_mut() {
                Some(acc) => acc.absorb(entry.messages, entry.detail.extra),
                None => folded = Some(entry),
            }
        }

        let merged = match folded {
            Some(mut acc) => {
                if incoming.path.len() < acc.path.len() {
                    acc.path = incoming.path.clone();
                    acc.key = incoming.key.clone();
                }
                acc.absorb(incoming.messages, incoming.detail.extra);
                acc
            }
            None => incoming,
        };
        tracing::debug!("Folded {} overlapping errors into {}", positions.len(), merged.key);
        let pos = self.insert(merged, positions.first().copied());
        self.entry_at(pos)
    }

    /// Drop every error at `path` or below it.
    pub fn rollback(&mut self, path: &[String]) {
        let Some(removed) = tree::remove_at_path(&mut self.standard, path) else {
            return;
        };
        let mut keys = Vec::new();
        removed.collect_keys(&mut keys);
        for key in keys {
            if let Some(pos) = self.index.remove(&key) {
                self.classic[pos] = None;
            }
        }
    }

    /// Detail recorded at exactly `key`
    pub fn get(&self, key: &str) -> Option<&ErrorDetail> {
        let pos = *self.index.get(key)?;
        self.classic[pos].as_ref().map(|e| &e.detail)
    }

    /// Iterate `(dotted path, detail)` in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ErrorDetail)> {
        self.entries().map(|e| (e.key.as_str(), &e.detail))
    }

    /// Render one of the four views
    pub fn render(&self, format: ErrorFormat) -> Value {
        if format.is_standard() {
            self.render_node(&self.standard, format.is_simple())
        } else {
            self.render_classic(self.len(), format.is_simple())
        }
    }

    /// Classic view holding only the first recorded error
    pub fn render_first(&self, simple: bool) -> Value {
        self.render_classic(1, simple)
    }

    fn entries(&self) -> impl Iterator<Item = &ClassicEntry> {
        self.classic.iter().flatten()
    }

    fn entry_at(&self, pos: usize) -> Option<(&[String], &ErrorDetail)> {
        self.classic[pos]
            .as_ref()
            .map(|e| (e.path.as_slice(), &e.detail))
    }

    /// Keys of recorded errors on an ancestor of `path`, at it, or below it
    fn overlapping(&self, path: &[String]) -> Vec<String> {
        let mut node = &self.standard;
        for seg in path {
            match node {
                ErrorNode::Leaf(key) => return vec![key.clone()],
                ErrorNode::Branch(children) => match children.get(seg) {
                    Some(child) => node = child,
                    None => return Vec::new(),
                },
            }
        }
        let mut keys = Vec::new();
        node.collect_keys(&mut keys);
        keys
    }

    /// Store `entry` in `slot` (or at the end) and point the standard tree at it.
    fn insert(&mut self, entry: ClassicEntry, slot: Option<usize>) -> usize {
        tree::set_at_path(&mut self.standard, &entry.path, ErrorNode::Leaf(entry.key.clone()));
        let key = entry.key.clone();
        let pos = match slot {
            Some(pos) => {
                self.classic[pos] = Some(entry);
                pos
            }
            None => {
                self.classic.push(Some(entry));
                self.classic.len() - 1
            }
        };
        self.index.insert(key, pos);
        pos
    }

    fn render_node(&self, node: &ErrorNode, simple: bool) -> Value {
        match node {
            ErrorNode::Leaf(key) => self
                .get(key)
                .map(|detail| render_detail(detail, simple))
                .unwrap_or_default(),
            ErrorNode::Branch(children) => Value::Object(
                children
                    .iter()
                    .map(|(k, child)| (k.clone(), self.render_node(child, simple)))
                    .collect(),
            ),
        }
    }

    fn render_classic(&self, limit: usize, simple: bool) -> Value {
        Value::Object(
            self.entries()
                .take(limit)
                .map(|e| (e.key.clone(), render_detail(&e.detail, simple)))
                .collect(),
        )
    }
}

fn render_detail(detail: &ErrorDetail, simple: bool) -> Value {
    if simple {
        Value::String(detail.message.clone())
    } else {
        detail.to_value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn path(p: &str) -> Vec<String> {
        p.split('.').map(str::to_string).collect()
    }

    #[test]
    fn test_error_kind_display() {
        assert_eq!(ErrorKind::RequiredField.to_string(), "required_field");
        assert_eq!(ErrorKind::UnsetRequiredField.to_string(), "unset_required_field");
        assert_eq!(ErrorKind::Validation.to_string(), "validation");
        assert_eq!(ErrorKind::InternalServerError.to_string(), "internal_server_error");
        assert_eq!(ErrorKind::from("too_young").to_string(), "too_young");
        assert_eq!(ErrorKind::from("validation"), ErrorKind::Validation);
    }

    #[test]
    fn test_record_keeps_views_in_sync() {
        let mut store = ErrorStore::new();
        store.record(
            &path("user.age"),
            "user.age",
            ErrorDetail::new(ErrorKind::Validation, "user.age must be integer"),
        );

        let classic: Value = json!({"user.age": "user.age must be integer"}).into();
        let standard: Value = json!({"user": {"age": "user.age must be integer"}}).into();
        assert_eq!(store.render(ErrorFormat::ClassicSimple), classic);
        assert_eq!(store.render(ErrorFormat::StandardSimple), standard);

        let complex: Value = json!({"user": {"age": {
            "error_type": "validation",
            "message": "user.age must be integer"
        }}})
        .into();
        assert_eq!(store.render(ErrorFormat::StandardComplex), complex);
    }

    #[test]
    fn test_record_appends_with_or() {
        let mut store = ErrorStore::new();
        let p = path("h");
        store.record(&p, "h", ErrorDetail::new(ErrorKind::Validation, "a"));
        store.record(&p, "h", ErrorDetail::new(ErrorKind::Validation, "b"));
        store.record(&p, "h", ErrorDetail::new(ErrorKind::Validation, "b"));
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("h").map(|d| d.message.as_str()), Some("a or b"));
    }

    #[test]
    fn test_or_inside_message_is_not_a_separator() {
        let mut store = ErrorStore::new();
        let p = path("h");
        store.record(&p, "h", ErrorDetail::new(ErrorKind::Validation, "h must be greater than or equal to 100"));
        store.record(&p, "h", ErrorDetail::new(ErrorKind::Validation, "equal to 100"));
        store.record(&p, "h", ErrorDetail::new(ErrorKind::Validation, "equal to 100"));
        assert_eq!(
            store.get("h").map(|d| d.message.as_str()),
            Some("h must be greater than or equal to 100 or equal to 100")
        );
    }

    #[test]
    fn test_leaf_over_branch_folds_into_one_entry() {
        let mut store = ErrorStore::new();
        store.record(&path("h.x"), "h.x", ErrorDetail::new(ErrorKind::RequiredField, "h.x can not be empty"));
        store.record(&path("h.z"), "h.z", ErrorDetail::new(ErrorKind::RequiredField, "h.z can not be empty"));
        let (anchor, detail) = store
            .record(&path("h"), "h", ErrorDetail::new(ErrorKind::Validation, "h must be integer"))
            .unwrap();
        assert_eq!(anchor, path("h").as_slice());
        assert_eq!(detail.error_type, ErrorKind::RequiredField);

        let message = "h.x can not be empty or h.z can not be empty or h must be integer";
        let classic: Value = json!({"h": message}).into();
        let standard: Value = json!({"h": message}).into();
        assert_eq!(store.len(), 1);
        assert_eq!(store.render(ErrorFormat::ClassicSimple), classic);
        assert_eq!(store.render(ErrorFormat::StandardSimple), standard);
    }

    #[test]
    fn test_branch_under_leaf_folds_into_leaf() {
        let mut store = ErrorStore::new();
        store.record(&path("a"), "a", ErrorDetail::new(ErrorKind::Validation, "a must be integer"));
        store.record(&path("b"), "b", ErrorDetail::new(ErrorKind::Validation, "b must be integer"));
        let (anchor, _) = store
            .record(&path("a.x"), "a.x", ErrorDetail::new(ErrorKind::Validation, "a.x must be string"))
            .unwrap();
        assert_eq!(anchor, path("a").as_slice());

        let classic: Value = json!({
            "a": "a must be integer or a.x must be string",
            "b": "b must be integer"
        })
        .into();
        assert_eq!(store.render(ErrorFormat::ClassicSimple), classic);
        assert_eq!(store.render(ErrorFormat::StandardSimple), classic);
        assert!(store.get("a.x").is_none());
    }

    #[test]
    fn test_many_siblings_stay_indexed() {
        let mut store = ErrorStore::new();
        for i in 0..1000 {
            let key = format!("items.{}", i);
            store.record(&path(&key), &key, ErrorDetail::new(ErrorKind::Validation, "bad"));
        }
        store.rollback(&path("items.500"));
        assert_eq!(store.len(), 999);
        assert!(store.get("items.500").is_none());
        assert_eq!(store.get("items.999").map(|d| d.message.as_str()), Some("bad"));

        store.record(&path("items.500"), "items.500", ErrorDetail::new(ErrorKind::Validation, "again"));
        let keys: Vec<&str> = store.iter().map(|(k, _)| k).collect();
        assert_eq!(keys.last(), Some(&"items.500"));
    }

    #[test]
    fn test_rollback_removes_subtree() {
        let mut store = ErrorStore::new();
        store.record(&path("a.b"), "a.b", ErrorDetail::new(ErrorKind::Validation, "x"));
        store.record(&path("a.c"), "a.c", ErrorDetail::new(ErrorKind::Validation, "y"));
        store.record(&path("d"), "d", ErrorDetail::new(ErrorKind::Validation, "z"));

        store.rollback(&path("a"));
        assert_eq!(store.len(), 1);
        let standard: Value = json!({"d": "z"}).into();
        assert_eq!(store.render(ErrorFormat::StandardSimple), standard);
    }

    #[test]
    fn test_render_first() {
        let mut store = ErrorStore::new();
        store.record(&path("a"), "a", ErrorDetail::new(ErrorKind::Validation, "first"));
        store.record(&path("b"), "b", ErrorDetail::new(ErrorKind::Validation, "second"));
        let first: Value = json!({"a": "first"}).into();
        assert_eq!(store.render_first(true), first);
    }

    #[test]
    fn test_detail_extra_fields() {
        let detail = ErrorDetail::new(ErrorKind::Custom("age_limit".into()), "too young")
            .with_extra("min", Value::Int(18));
        let expected: Value =
            json!({"error_type": "age_limit", "message": "too young", "min": 18}).into();
        assert_eq!(detail.to_value(), expected);
    }

    #[test]
    fn test_error_format_selection() {
        assert_eq!(ErrorFormat::new(false, true), ErrorFormat::ClassicSimple);
        assert_eq!(ErrorFormat::new(true, false), ErrorFormat::StandardComplex);
        assert!(ErrorFormat::StandardSimple.is_standard());
        assert!(!ErrorFormat::ClassicComplex.is_simple());
    }
}
