//! Per-pass validation state
//!
//! A [`ValidationSession`] is created fresh by every `Validator::validate`
//! call and returned to the caller, so the engine itself stays read-only
//! after setup. It holds the verdict, the result mirror and the error views.

use crate::errors::{ErrorDetail, ErrorFormat, ErrorStore, RuleError};
use crate::tree::{self, PathTree};
use crate::types::Value;

/// Outcome of one validation pass
#[derive(Debug, Clone)]
pub struct ValidationSession {
    valid: bool,
    validate_all: bool,
    result: Value,
    errors: ErrorStore,
    fault: Option<RuleError>,
}

impl ValidationSession {
    /// Start a pass over `data`; the mirror begins as a copy of the input.
    pub(crate) fn new(data: Value, validate_all: bool) -> Self {
        Self {
            valid: true,
            validate_all,
            result: data,
            errors: ErrorStore::new(),
            fault: None,
        }
    }

    /// Overall verdict
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// The result mirror: the input with every checked field replaced by
    /// `true` or by its complex error detail.
    pub fn result(&self) -> &Value {
        &self.result
    }

    pub fn into_result(self) -> Value {
        self.result
    }

    /// Error view selected by the two flags.
    ///
    /// When the pass stopped at the first failure only that entry is
    /// returned, always in classic form.
    pub fn error(&self, standard: bool, simple: bool) -> Value {
        self.error_as(ErrorFormat::new(standard, simple))
    }

    pub fn error_as(&self, format: ErrorFormat) -> Value {
        if self.validate_all {
            self.errors.render(format)
        } else {
            self.errors.render_first(format.is_simple())
        }
    }

    /// Both stores, for callers that want to iterate failures
    pub fn errors(&self) -> &ErrorStore {
        &self.errors
    }

    /// Engine fault that aborted the pass, if any
    pub fn fault(&self) -> Option<&RuleError> {
        self.fault.as_ref()
    }

    pub(crate) fn validate_all(&self) -> bool {
        self.validate_all
    }

    // ========================================================================
    // Recording
    // ========================================================================

    /// Mark `path` as passed in the mirror
    pub(crate) fn set_passed(&mut self, path: &[String]) {
        tree::set_at_path(&mut self.result, path, Value::Bool(true));
    }

    /// Record a failure at `path`.
    ///
    /// OR-branch failures are stored (and merged with `" or "`) without
    /// touching the verdict; the group decides once it runs out of branches.
    pub(crate) fn set_error(&mut self, path: &[String], key: &str, detail: ErrorDetail, or_branch: bool) {
        if !or_branch {
            self.valid = false;
        }
        // The store may fold the failure into an entry on an ancestor path.
        if let Some((anchor, merged)) = self.errors.record(path, key, detail) {
            tree::set_at_path(&mut self.result, anchor, merged.to_value());
        }
    }

    /// Drop whatever the mirror holds at `path` (used for absent fields)
    pub(crate) fn forget_result(&mut self, path: &[String]) {
        if let Some((last, parents)) = path.split_last() {
            if let Some(parent) = tree::get_at_path_mut(&mut self.result, parents) {
                parent.take_child(last);
            }
        }
    }

    /// Write the stored detail for `key` into the mirror at `path`
    pub(crate) fn mirror_error(&mut self, path: &[String], key: &str) {
        if let Some(detail) = self.errors.get(key) {
            let rendered = detail.to_value();
            tree::set_at_path(&mut self.result, path, rendered);
        }
    }

    /// Flip the verdict without recording a new entry
    pub(crate) fn invalidate(&mut self) {
        self.valid = false;
    }

    /// Forget every error at `path` or below it
    pub(crate) fn rollback(&mut self, path: &[String]) {
        self.errors.rollback(path);
    }

    pub(crate) fn set_fault(&mut self, fault: RuleError) {
        self.valid = false;
        self.fault = Some(fault);
    }

    /// Replace the mirror with the value found under `field`
    pub(crate) fn unwrap_result(&mut self, field: &str) {
        self.result = self.result.remove(field).unwrap_or_default();
    }
}
