//! Validation engine
//!
//! [`Validator`] owns everything that persists between passes: the
//! configuration, the active error template, the rule tree and the custom
//! methods. Each call to [`Validator::validate`] walks the rule tree against
//! the data and returns a fresh [`ValidationSession`].
//!
//! # Example
//!
//! ```rust
//! use ouroboros_rules::Validator;
//! use serde_json::json;
//!
//! let validator = Validator::new()
//!     .set_validation_global(true)
//!     .set_rules(json!({
//!         "name": "required|string|len<=[16]",
//!         "age": "required|int|>=[18]",
//!         "tags[optional].*": "string",
//!     }));
//!
//! let session = validator.validate(&json!({"name": "Ada", "age": "17"}).into());
//! assert!(!session.is_valid());
//!
//! let errors: serde_json::Value = session.error(false, true).into();
//! assert_eq!(errors, json!({"age": "age must be integer"}));
//! ```

use crate::config::{CompiledGrammar, ConfigPatch, GrammarConfig, ValidatorConfig};
use crate::errors::{ErrorDetail, ErrorKind, Result, RuleError};
use crate::language::{self, ErrorTemplate, DEFAULT_TAG};
use crate::parser::{self, ErrorMessage};
use crate::registry::{self, Dispatch, FnRuleMethod, MethodOutput, MethodRegistry, RuleMethod};
use crate::resolver::{self, MethodInvocation, RefContext};
use crate::rules::{self, RuleNode, SymbolFlags};
use crate::session::ValidationSession;
use crate::types::Value;
use regex::Regex;
use std::collections::HashMap;

/// Message used when the active template has no `default` entry
const FALLBACK_MESSAGE: &str = "@this validation failed";

// ============================================================================
// Validator
// ============================================================================

/// Rule-string validation engine
///
/// Setup methods consume and return the validator so they chain. After
/// setup the validator is only read, so it can be shared across threads
/// and used for any number of passes.
#[derive(Debug, Clone)]
pub struct Validator {
    config: ValidatorConfig,
    compiled: CompiledGrammar,
    initial_config: ValidatorConfig,
    initial_compiled: CompiledGrammar,
    template: ErrorTemplate,
    languages: HashMap<String, ErrorTemplate>,
    rules: Option<RuleNode>,
    methods: MethodRegistry,
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

impl Validator {
    /// Engine with the default grammar and English messages
    pub fn new() -> Self {
        let config = ValidatorConfig::default();
        Self {
            template: ErrorTemplate::builtin(&config.language).unwrap_or_default(),
            compiled: CompiledGrammar::default(),
            initial_compiled: CompiledGrammar::default(),
            initial_config: config.clone(),
            config,
            languages: HashMap::new(),
            rules: None,
            methods: MethodRegistry::new(),
        }
    }

    /// Engine with a custom configuration; fails on an ambiguous grammar
    /// or a pattern that does not compile.
    pub fn with_config(config: ValidatorConfig) -> Result<Self> {
        let compiled = config.grammar.compile()?;
        let language = config.language.clone();
        let validator = Self {
            config: config.clone(),
            initial_compiled: compiled.clone(),
            compiled,
            initial_config: config,
            template: ErrorTemplate::builtin("en").unwrap_or_default(),
            languages: HashMap::new(),
            rules: None,
            methods: MethodRegistry::new(),
        };
        Ok(validator.set_language(&language))
    }

    // ========================================================================
    // Configuration
    // ========================================================================

    /// Merge a partial configuration.
    ///
    /// The patch is compiled before anything changes, so a rejected patch
    /// leaves the validator as it was. The template is re-derived when the
    /// language changes.
    pub fn set_config(&mut self, patch: ConfigPatch) -> Result<()> {
        let mut config = self.config.clone();
        config.apply(patch);
        let compiled = match config.grammar.compile() {
            Ok(compiled) => compiled,
            Err(e) => {
                tracing::warn!("Rejected configuration patch: {}", e);
                return Err(e);
            }
        };

        let language = std::mem::replace(&mut config.language, self.config.language.clone());
        self.config = config;
        self.compiled = compiled;
        if language != self.config.language {
            self.switch_language(&language);
        }
        Ok(())
    }

    /// Restore the configuration the validator was built with
    pub fn reset_config(mut self) -> Self {
        self.config = self.initial_config.clone();
        self.compiled = self.initial_compiled.clone();
        let language = self.config.language.clone();
        if let Some(template) = self.find_template(&language) {
            self.template = template;
        }
        self
    }

    /// Switch the active error template.
    ///
    /// Looks in templates registered through [`Validator::custom_language`],
    /// then `<lang_path>/<tag>.json`, then the built-in tables. An unknown
    /// tag keeps the current template.
    pub fn set_language(mut self, tag: &str) -> Self {
        self.switch_language(tag);
        self
    }

    fn switch_language(&mut self, tag: &str) {
        match self.find_template(tag) {
            Some(template) => {
                tracing::debug!("Switched error template to '{}'", tag);
                self.template = template;
                self.config.language = tag.to_string();
            }
            None => tracing::warn!(
                "Unknown language '{}', keeping '{}'",
                tag,
                self.config.language
            ),
        }
    }

    /// Merge `template` into the active one; with a `name`, the merged
    /// template can later be selected through [`Validator::set_language`].
    pub fn custom_language(mut self, template: ErrorTemplate, name: Option<&str>) -> Self {
        self.template.merge(&template);
        if let Some(name) = name {
            self.languages.insert(name.to_string(), self.template.clone());
            self.config.language = name.to_string();
        }
        self
    }

    fn find_template(&self, tag: &str) -> Option<ErrorTemplate> {
        if let Some(template) = self.languages.get(tag) {
            return Some(template.clone());
        }
        if let Some(dir) = &self.config.lang_path {
            match ErrorTemplate::load(dir, tag) {
                Ok(Some(template)) => return Some(template),
                Ok(None) => {}
                Err(e) => tracing::warn!("Failed to load language '{}': {}", tag, e),
            }
        }
        ErrorTemplate::builtin(tag)
    }

    /// Replace the rule tree; an empty tree is ignored.
    pub fn set_rules(mut self, rules: impl Into<RuleNode>) -> Self {
        let rules = rules.into();
        if rules.is_empty() {
            tracing::debug!("Ignoring empty rule tree");
            return self;
        }
        self.rules = Some(rules);
        self
    }

    /// Collect every failure (`true`) or stop at the first one (`false`)
    pub fn set_validation_global(mut self, validate_all: bool) -> Self {
        self.config.validate_all = validate_all;
        self
    }

    /// Register (or overwrite) a custom method backed by a closure
    pub fn add_method<F>(mut self, name: impl Into<String>, method_fn: F) -> Self
    where
        F: Fn(&[Value]) -> MethodOutput + Send + Sync + 'static,
    {
        self.methods.add(name, FnRuleMethod::new(method_fn));
        self
    }

    /// Register (or overwrite) a custom [`RuleMethod`]
    pub fn add_rule_method(mut self, name: impl Into<String>, method: impl RuleMethod + 'static) -> Self {
        self.methods.add(name, method);
        self
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    pub fn rules(&self) -> Option<&RuleNode> {
        self.rules.as_ref()
    }

    /// Message of the active template for `tag`
    pub fn error_template(&self, tag: &str) -> Option<&str> {
        self.template.get(tag)
    }

    /// The whole active template
    pub fn template(&self) -> &ErrorTemplate {
        &self.template
    }

    // ========================================================================
    // Validation
    // ========================================================================

    /// Run one pass over `data`.
    ///
    /// Invalid data is reported through the returned session, never as an
    /// error. Engine faults abort the pass and show up in
    /// [`ValidationSession::fault`].
    pub fn validate(&self, data: &Value) -> ValidationSession {
        let validate_all = self.config.validate_all;
        let Some(rules) = &self.rules else {
            tracing::debug!("No rules set, nothing to validate");
            return ValidationSession::new(data.clone(), validate_all);
        };

        let grammar = &self.config.grammar;
        let wrapped = rules::wraps_root(rules, grammar);
        let top = if wrapped {
            Value::Object(vec![(grammar.auto_field.clone(), data.clone())])
        } else {
            data.clone()
        };
        tracing::debug!(
            "Validation pass started (validate_all: {}, wrapped: {})",
            validate_all,
            wrapped
        );

        let mut session = ValidationSession::new(top.clone(), validate_all);
        let outcome = {
            let mut executor = Executor {
                validator: self,
                root: data,
                session: &mut session,
            };
            match rules {
                _ if wrapped => {
                    let path = vec![grammar.auto_field.clone()];
                    executor.check_field(
                        &top,
                        &grammar.auto_field,
                        &path,
                        rules,
                        SymbolFlags::default(),
                        Scope::default(),
                    )
                }
                RuleNode::Object(children) => executor.walk_object(&top, children, &[], Scope::default()),
                _ => Ok(true),
            }
        };

        match outcome {
            Ok(_) => {}
            Err(Halt::FirstFailure) => tracing::debug!("Stopped at first failure"),
            Err(Halt::Fatal(fault)) => session.set_fault(fault),
        }
        if wrapped {
            session.unwrap_result(&grammar.auto_field);
        }

        tracing::debug!(
            "Validation pass finished (valid: {}, errors: {})",
            session.is_valid(),
            session.errors().len()
        );
        session
    }

    /// [`Validator::validate`], with an engine fault surfaced as `Err`
    pub fn try_validate(&self, data: &Value) -> Result<ValidationSession> {
        let session = self.validate(data);
        match session.fault() {
            Some(fault) => Err(fault.clone()),
            None => Ok(session),
        }
    }
}

// ============================================================================
// Tree Executor
// ============================================================================

/// Why a walk stopped early
enum Halt {
    /// A failure with `validate_all` off
    FirstFailure,
    /// An engine fault
    Fatal(RuleError),
}

type Step = std::result::Result<bool, Halt>;

#[derive(Debug, Clone, Copy, Default)]
struct Scope {
    depth: usize,
    /// Inside an OR alternative: failures are recorded but do not decide
    or_branch: bool,
}

impl Scope {
    fn deeper(self) -> Self {
        Self {
            depth: self.depth + 1,
            ..self
        }
    }

    fn in_or(self) -> Self {
        Self {
            or_branch: true,
            ..self
        }
    }
}

/// Result of one leaf token
enum TokenOutcome {
    /// Check the next token
    Pass,
    /// The leaf holds; skip its remaining tokens
    Done,
    Fail(ErrorDetail),
}

struct Executor<'v, 's> {
    validator: &'v Validator,
    root: &'v Value,
    session: &'s mut ValidationSession,
}

impl<'v, 's> Executor<'v, 's> {
    fn grammar(&self) -> &'v GrammarConfig {
        let validator: &'v Validator = self.validator;
        &validator.config.grammar
    }

    fn key(&self, path: &[String]) -> String {
        path.join(&self.grammar().field_separator)
    }

    fn walk_object(
        &mut self,
        parent: &Value,
        children: &[(String, RuleNode)],
        path: &[String],
        scope: Scope,
    ) -> Step {
        let grammar = self.grammar();
        let mut valid = true;
        for (key, node) in children {
            let (name, flags) = rules::split_field_key(key, grammar);
            let mut child_path = path.to_vec();
            child_path.push(name.to_string());
            valid &= self.check_field(parent, name, &child_path, node, flags, scope.deeper())?;
        }
        Ok(valid)
    }

    /// Apply `node` to the field `name` of `parent`.
    ///
    /// Symbol flags apply in the order array-optional, numeric-array, OR.
    fn check_field(
        &mut self,
        parent: &Value,
        name: &str,
        path: &[String],
        node: &RuleNode,
        flags: SymbolFlags,
        scope: Scope,
    ) -> Step {
        let max_depth = self.validator.config.max_depth;
        if scope.depth > max_depth {
            return Err(Halt::Fatal(RuleError::RecursionLimit(max_depth)));
        }
        let value = parent.child(name);

        if flags.array_optional && !value.is_some_and(Value::is_present) {
            tracing::debug!("Optional array '{}' is empty, skipping", self.key(path));
            if value.is_some() {
                self.session.set_passed(path);
            }
            return Ok(true);
        }

        if flags.numeric_depth > 0 {
            let inner = SymbolFlags {
                numeric_depth: flags.numeric_depth - 1,
                or: flags.or,
                ..SymbolFlags::default()
            };
            return self.check_elements(value, path, node, inner, scope);
        }

        if flags.or {
            let alternatives = match node {
                RuleNode::Or(alternatives) => alternatives.as_slice(),
                other => std::slice::from_ref(other),
            };
            return self.check_or(parent, name, path, alternatives, scope);
        }

        match node {
            RuleNode::Leaf(rule) => self.check_leaf(parent, name, path, rule, scope),
            RuleNode::Or(alternatives) => self.check_or(parent, name, path, alternatives, scope),
            RuleNode::Object(children) => match rules::symbol_node(children, self.grammar()) {
                Some((inner, flags)) => self.check_field(parent, name, path, inner, flags, scope.deeper()),
                None => {
                    let absent = Value::Null;
                    self.walk_object(value.unwrap_or(&absent), children, path, scope)
                }
            },
        }
    }

    fn check_elements(
        &mut self,
        value: Option<&Value>,
        path: &[String],
        node: &RuleNode,
        flags: SymbolFlags,
        scope: Scope,
    ) -> Step {
        let Some(list) = value.filter(|v| matches!(v, Value::List(_))) else {
            let detail = self.system_error(path, "numeric_array");
            self.fail(path, detail, scope)?;
            return Ok(false);
        };

        let len = list.length().unwrap_or_default();
        tracing::debug!("Descending into numeric array '{}' ({} items)", self.key(path), len);
        let mut valid = true;
        for idx in 0..len {
            let name = idx.to_string();
            let mut child_path = path.to_vec();
            child_path.push(name.clone());
            valid &= self.check_field(list, &name, &child_path, node, flags, scope.deeper())?;
        }
        Ok(valid)
    }

    /// Try alternatives in order; the first that passes clears the field.
    fn check_or(
        &mut self,
        parent: &Value,
        name: &str,
        path: &[String],
        alternatives: &[RuleNode],
        scope: Scope,
    ) -> Step {
        let branch = scope.in_or();
        for (idx, alternative) in alternatives.iter().enumerate() {
            let passed = self.check_field(
                parent,
                name,
                path,
                alternative,
                SymbolFlags::default(),
                branch.deeper(),
            )?;
            if passed {
                tracing::debug!("OR group '{}' satisfied by alternative {}", self.key(path), idx);
                self.session.rollback(path);
                if parent.has_child(name) {
                    self.session.set_passed(path);
                } else {
                    self.session.forget_result(path);
                }
                return Ok(true);
            }
        }

        let key = self.key(path);
        tracing::debug!("OR group '{}' exhausted", key);
        self.session.mirror_error(path, &key);
        if !scope.or_branch {
            self.session.invalidate();
            if !self.session.validate_all() {
                return Err(Halt::FirstFailure);
            }
        }
        Ok(false)
    }

    fn check_leaf(
        &mut self,
        parent: &Value,
        name: &str,
        path: &[String],
        rule: &str,
        scope: Scope,
    ) -> Step {
        let parsed = parser::parse_rule(rule, self.grammar(), &self.validator.compiled);
        let present = parent.child(name);
        let absent = Value::Null;
        let ctx = RefContext {
            value: present.unwrap_or(&absent),
            parent,
            root: self.root,
        };
        let key = self.key(path);

        for token in &parsed.tokens {
            tracing::trace!("Checking '{}' against '{}'", key, token);
            match self.eval_token(token, &ctx, present.is_some(), &parsed.error_message, path, &key)? {
                TokenOutcome::Pass => {}
                TokenOutcome::Done => break,
                TokenOutcome::Fail(detail) => {
                    self.fail(path, detail, scope)?;
                    return Ok(false);
                }
            }
        }

        if present.is_some() {
            self.session.set_passed(path);
        }
        Ok(true)
    }

    fn eval_token(
        &mut self,
        token: &str,
        ctx: &RefContext<'_>,
        exists: bool,
        messages: &ErrorMessage,
        path: &[String],
        key: &str,
    ) -> std::result::Result<TokenOutcome, Halt> {
        let grammar = self.grammar();

        if let Some((condition, expected)) = split_condition(token, grammar) {
            let (_, output) = self.invoke(condition, ctx, path, key)?;
            if output.is_pass() != expected && !ctx.value.is_present() {
                return Ok(TokenOutcome::Done);
            }
            return Ok(TokenOutcome::Pass);
        }

        if grammar.is_required(token) {
            if ctx.value.is_present() {
                return Ok(TokenOutcome::Pass);
            }
            let message = self.message(messages, &["required"], None);
            let message = language::render(&message, key, &[], &[]);
            return Ok(TokenOutcome::Fail(ErrorDetail::new(ErrorKind::RequiredField, message)));
        }

        if grammar.is_optional(token) {
            return Ok(if ctx.value.is_present() {
                TokenOutcome::Pass
            } else {
                TokenOutcome::Done
            });
        }

        if grammar.is_unset_required(token) {
            if !exists {
                return Ok(TokenOutcome::Done);
            }
            if ctx.value.is_present() {
                return Ok(TokenOutcome::Pass);
            }
            let message = self.message(messages, &["unset_required"], None);
            let message = language::render(&message, key, &[], &[]);
            return Ok(TokenOutcome::Fail(ErrorDetail::new(
                ErrorKind::UnsetRequiredField,
                message,
            )));
        }

        if self.validator.compiled.regex_literal.is_match(token) {
            return self.eval_pattern(token, ctx.value, messages, path, key);
        }

        let (invocation, output) = self.invoke(token, ctx, path, key)?;
        Ok(self.method_outcome(invocation, output, messages, key))
    }

    fn eval_pattern(
        &mut self,
        token: &str,
        value: &Value,
        messages: &ErrorMessage,
        path: &[String],
        key: &str,
    ) -> std::result::Result<TokenOutcome, Halt> {
        let regex = match compile_literal(token) {
            Ok(regex) => regex,
            Err(fault) => {
                tracing::error!("Invalid pattern in rule for '{}': {}", key, fault);
                let detail = ErrorDetail::new(ErrorKind::InternalServerError, fault.to_string());
                self.session.set_error(path, key, detail, false);
                return Err(Halt::Fatal(fault));
            }
        };

        let text = match value {
            Value::String(s) => Some(s.clone()),
            Value::Int(_) | Value::Float(_) | Value::Bool(_) => Some(value.to_string()),
            _ => None,
        };
        if text.is_some_and(|t| regex.is_match(&t)) {
            return Ok(TokenOutcome::Pass);
        }

        let message = self.message(messages, &["preg"], None);
        let message = language::render(&message, key, &[], &[("@preg", token)]);
        Ok(TokenOutcome::Fail(ErrorDetail::new(ErrorKind::Validation, message)))
    }

    /// Resolve and call a method token; an unknown method aborts the pass.
    fn invoke(
        &mut self,
        token: &str,
        ctx: &RefContext<'_>,
        path: &[String],
        key: &str,
    ) -> std::result::Result<(MethodInvocation, MethodOutput), Halt> {
        let invocation = resolver::resolve(token, ctx, self.grammar());
        match registry::lookup(&self.validator.methods, &invocation.method_name) {
            Dispatch::Found(callable) => {
                let output = callable.call(&invocation.params);
                Ok((invocation, output))
            }
            Dispatch::NotFound => {
                tracing::error!(
                    "Method '{}' is undefined (field '{}')",
                    invocation.method_name,
                    key
                );
                let template = self.template_message(&["method_undefined"]);
                let message = language::render(template, key, &[], &[("@method", invocation.symbol.as_str())]);
                let detail = ErrorDetail::new(ErrorKind::InternalServerError, message);
                self.session.set_error(path, key, detail, false);
                Err(Halt::Fatal(RuleError::MethodUndefined {
                    method: invocation.method_name,
                    field: key.to_string(),
                }))
            }
        }
    }

    fn method_outcome(
        &self,
        invocation: MethodInvocation,
        output: MethodOutput,
        messages: &ErrorMessage,
        key: &str,
    ) -> TokenOutcome {
        let (error_type, returned, extra) = match output {
            MethodOutput::Pass => return TokenOutcome::Pass,
            MethodOutput::Fail => (ErrorKind::Validation, None, Vec::new()),
            MethodOutput::Message(message) => (ErrorKind::Validation, Some(message), Vec::new()),
            MethodOutput::Detail {
                error_type,
                message,
                extra,
            } => (ErrorKind::from(error_type.as_str()), message, extra),
        };

        let tags = [invocation.symbol.as_str(), invocation.method_name.as_str()];
        let message = self.message(messages, &tags, returned);
        let message = language::render(
            &message,
            key,
            &invocation.display_params,
            &[("@method", invocation.symbol.as_str())],
        );
        TokenOutcome::Fail(ErrorDetail {
            error_type,
            message,
            extra,
        })
    }

    /// Rule message for `tags`, then the method's own message, then the template.
    fn message(&self, messages: &ErrorMessage, tags: &[&str], returned: Option<String>) -> String {
        tags.iter()
            .find_map(|tag| messages.lookup(tag))
            .map(str::to_string)
            .or(returned)
            .unwrap_or_else(|| self.template_message(tags).to_string())
    }

    fn template_message(&self, tags: &[&str]) -> &'v str {
        let validator: &'v Validator = self.validator;
        let template = &validator.template;
        tags.iter()
            .find_map(|tag| template.get(tag))
            .or_else(|| template.get(DEFAULT_TAG))
            .unwrap_or(FALLBACK_MESSAGE)
    }

    fn system_error(&self, path: &[String], tag: &str) -> ErrorDetail {
        let message = language::render(self.template_message(&[tag]), &self.key(path), &[], &[]);
        ErrorDetail::new(ErrorKind::Validation, message)
    }

    /// Record a failure; with `validate_all` off a decisive failure ends the walk.
    fn fail(&mut self, path: &[String], detail: ErrorDetail, scope: Scope) -> std::result::Result<(), Halt> {
        let key = self.key(path);
        self.session.set_error(path, &key, detail, scope.or_branch);
        if !scope.or_branch && !self.session.validate_all() {
            return Err(Halt::FirstFailure);
        }
        Ok(())
    }
}

/// `if?cond`, `if1?cond` and `if0?cond`: the condition token and whether it
/// is expected to hold.
fn split_condition<'a>(token: &'a str, grammar: &GrammarConfig) -> Option<(&'a str, bool)> {
    [
        (grammar.if_true_explicit.as_str(), true),
        (grammar.if_false.as_str(), false),
        (grammar.if_true.as_str(), true),
    ]
    .into_iter()
    .find_map(|(prefix, expected)| token.strip_prefix(prefix).map(|rest| (rest, expected)))
}

/// Compile `/pattern/flags`; flags the regex engine does not know are dropped.
fn compile_literal(token: &str) -> Result<Regex> {
    let invalid = |reason: &str| RuleError::Pattern {
        pattern: token.to_string(),
        reason: reason.to_string(),
    };
    let end = token.rfind('/').filter(|&end| end > 0).ok_or_else(|| invalid("missing closing '/'"))?;
    let pattern = token.get(1..end).ok_or_else(|| invalid("empty pattern"))?;
    let flags: String = token[end + 1..].chars().filter(|c| "imsxU".contains(*c)).collect();

    let source = if flags.is_empty() {
        pattern.to_string()
    } else {
        format!("(?{}){}", flags, pattern)
    };
    Regex::new(&source).map_err(|e| invalid(&e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn check(validator: &Validator, data: serde_json::Value) -> ValidationSession {
        validator.validate(&data.into())
    }

    fn simple_errors(session: &ValidationSession) -> serde_json::Value {
        session.error(false, true).into()
    }

    #[test]
    fn test_type_failure_message() {
        let validator = Validator::new().set_rules(json!({"age": "required|int"}));
        let session = check(&validator, json!({"age": "30"}));
        assert!(!session.is_valid());
        assert_eq!(simple_errors(&session), json!({"age": "age must be integer"}));
    }

    #[test]
    fn test_conditional_if_true() {
        let validator = Validator::new()
            .set_validation_global(true)
            .set_rules(json!({"type": "required", "code": "if?=(@type,1)|required|int"}));

        let session = check(&validator, json!({"type": 1}));
        assert_eq!(simple_errors(&session), json!({"code": "code can not be empty"}));

        let session = check(&validator, json!({"type": 2}));
        assert!(session.is_valid());
        let result: serde_json::Value = session.result().clone().into();
        assert_eq!(result, json!({"type": true}));

        let session = check(&validator, json!({"type": 2, "code": "x"}));
        assert_eq!(simple_errors(&session), json!({"code": "code must be integer"}));
    }

    #[test]
    fn test_conditional_if_false() {
        let validator = Validator::new().set_rules(json!({"code": "if0?=(@type,1)|required"}));
        assert!(check(&validator, json!({"type": 1})).is_valid());
        assert!(!check(&validator, json!({"type": 2})).is_valid());
    }

    #[test]
    fn test_conditional_with_undefined_method_is_fatal() {
        let validator = Validator::new().set_rules(json!({"code": "if?nope|required"}));
        let session = check(&validator, json!({}));
        assert!(matches!(session.fault(), Some(RuleError::MethodUndefined { .. })));
    }

    #[test]
    fn test_regex_literal() {
        let validator = Validator::new().set_rules(json!({"name": "required|/^[a-z]+$/i"}));
        assert!(check(&validator, json!({"name": "Bob"})).is_valid());

        let session = check(&validator, json!({"name": "b0b"}));
        assert_eq!(
            simple_errors(&session),
            json!({"name": "name format is invalid, should be /^[a-z]+$/i"})
        );
    }

    #[test]
    fn test_regex_literal_with_separator() {
        let validator = Validator::new().set_rules(json!({"pet": "required|/^(cat|dog)$/"}));
        assert!(check(&validator, json!({"pet": "dog"})).is_valid());
        assert!(!check(&validator, json!({"pet": "cow"})).is_valid());
    }

    #[test]
    fn test_invalid_regex_is_fatal() {
        let validator = Validator::new().set_rules(json!({"name": "/(/"}));
        let session = check(&validator, json!({"name": "x"}));
        assert!(matches!(session.fault(), Some(RuleError::Pattern { .. })));
        assert!(!session.is_valid());
    }

    #[test]
    fn test_method_undefined() {
        let validator = Validator::new()
            .set_validation_global(true)
            .set_rules(json!({"x": "required|nope", "y": "required"}));
        let data: Value = json!({"x": 1}).into();

        let session = validator.validate(&data);
        assert!(!session.is_valid());
        assert_eq!(
            session.fault(),
            Some(&RuleError::MethodUndefined {
                method: "nope".into(),
                field: "x".into()
            })
        );
        let errors: serde_json::Value = session.error(false, false).into();
        assert_eq!(
            errors,
            json!({"x": {"error_type": "internal_server_error", "message": "nope method is undefined"}})
        );
        assert!(validator.try_validate(&data).is_err());
    }

    #[test]
    fn test_unset_required() {
        let validator = Validator::new().set_rules(json!({"nick": "optional_unset|string"}));
        assert!(check(&validator, json!({})).is_valid());
        assert!(check(&validator, json!({"nick": "neo"})).is_valid());

        let session = check(&validator, json!({"nick": ""}));
        let errors: serde_json::Value = session.error(false, false).into();
        assert_eq!(
            errors,
            json!({"nick": {
                "error_type": "unset_required_field",
                "message": "nick must be unset or not empty"
            }})
        );
    }

    #[test]
    fn test_optional_skips_remaining_tokens() {
        let validator = Validator::new().set_rules(json!({"nick": "optional|int"}));
        let session = check(&validator, json!({"nick": ""}));
        assert!(session.is_valid());
        assert!(!check(&validator, json!({"nick": "x"})).is_valid());
    }

    #[test]
    fn test_custom_messages() {
        let validator = Validator::new().set_rules(json!({
            "age": "required|int >> age is bad",
            "name": "required|len<=[5] >> [len<=]=> @this takes at most @p1 chars",
        }));

        let session = check(&validator, json!({"age": "x", "name": "ok"}));
        assert_eq!(simple_errors(&session), json!({"age": "age is bad"}));

        let session = check(&validator, json!({"age": 1, "name": "abcdefg"}));
        assert_eq!(simple_errors(&session), json!({"name": "name takes at most 5 chars"}));
    }

    #[test]
    fn test_method_message_and_detail() {
        let validator = Validator::new()
            .set_validation_global(true)
            .add_method("adult", |params: &[Value]| match params.first().and_then(Value::as_f64) {
                Some(age) if age >= 18.0 => MethodOutput::Pass,
                _ => MethodOutput::detail("too_young", "@this must be at least 18").with_extra("min", 18i64),
            })
            .add_method("even", |params: &[Value]| match params.first() {
                Some(Value::Int(n)) if n % 2 == 0 => MethodOutput::Pass,
                _ => "@this must be even".into(),
            })
            .set_rules(json!({"age": "adult", "count": "even"}));

        let session = check(&validator, json!({"age": 12, "count": 3}));
        let errors: serde_json::Value = session.error(false, false).into();
        assert_eq!(
            errors,
            json!({
                "age": {"error_type": "too_young", "message": "age must be at least 18", "min": 18},
                "count": {"error_type": "validation", "message": "count must be even"}
            })
        );
    }

    #[test]
    fn test_root_wrap() {
        let validator = Validator::new().set_rules("required|int");
        let session = validator.validate(&Value::Int(3));
        assert!(session.is_valid());
        assert_eq!(session.result(), &Value::Bool(true));

        let session = validator.validate(&Value::from("x"));
        assert_eq!(simple_errors(&session), json!({"data": "data must be integer"}));
    }

    #[test]
    fn test_root_or_group() {
        let validator = Validator::new().set_rules(vec!["int", "string"]);
        assert!(validator.validate(&Value::from("x")).is_valid());
        assert!(!validator.validate(&Value::Bool(true)).is_valid());
    }

    #[test]
    fn test_recursion_limit() {
        let config = ValidatorConfig::new().max_depth(2);
        let validator = Validator::with_config(config)
            .unwrap()
            .set_rules(json!({"a": {"b": {"c": "required"}}}));
        let session = check(&validator, json!({}));
        assert_eq!(session.fault(), Some(&RuleError::RecursionLimit(2)));
    }

    #[test]
    fn test_language_switch() {
        let validator = Validator::new()
            .set_language("zh-cn")
            .set_rules(json!({"age": "int"}));
        let session = check(&validator, json!({"age": "x"}));
        assert_eq!(simple_errors(&session), json!({"age": "age 必须是整型"}));

        let validator = validator.set_language("xx");
        assert_eq!(validator.config().language, "zh-cn");
        assert_eq!(validator.error_template("int"), Some("@this 必须是整型"));
    }

    #[test]
    fn test_custom_language_cached_by_name() {
        let validator = Validator::new()
            .custom_language(ErrorTemplate::from_pairs([("int", "@this should be whole")]), Some("mine"))
            .set_language("en");
        assert_eq!(validator.error_template("int"), Some("@this must be integer"));

        let validator = validator.set_language("mine");
        assert_eq!(validator.error_template("int"), Some("@this should be whole"));
        assert_eq!(validator.error_template("string"), Some("@this must be string"));
    }

    #[test]
    fn test_set_and_reset_config() {
        let grammar = GrammarConfig {
            rule_separator: ";".to_string(),
            ..Default::default()
        };
        let mut validator = Validator::new();
        validator
            .set_config(ConfigPatch::new().grammar(grammar).language("zh-cn"))
            .unwrap();
        let validator = validator.set_rules(json!({"age": "required;int"}));
        assert_eq!(validator.config().language, "zh-cn");
        assert!(check(&validator, json!({"age": 3})).is_valid());

        let validator = validator.reset_config();
        assert_eq!(validator.config().grammar.rule_separator, "|");
        assert_eq!(validator.error_template("int"), Some("@this must be integer"));
    }

    #[test]
    fn test_set_config_rejects_ambiguous_grammar() {
        let grammar = GrammarConfig {
            optional: "required".to_string(),
            ..Default::default()
        };
        let result = Validator::new().set_config(ConfigPatch::new().grammar(grammar));
        assert!(matches!(result, Err(RuleError::Config(_))));
    }

    #[test]
    fn test_rejected_config_keeps_validator_usable() {
        let mut validator = Validator::new()
            .set_language("zh-cn")
            .add_method("even", |params: &[Value]| match params.first() {
                Some(Value::Int(n)) if n % 2 == 0 => MethodOutput::Pass,
                _ => "@this must be even".into(),
            })
            .set_rules(json!({"count": "required|even"}));

        let grammar = GrammarConfig {
            optional: "required".to_string(),
            ..Default::default()
        };
        let result = validator.set_config(ConfigPatch::new().grammar(grammar).language("en"));
        assert!(matches!(result, Err(RuleError::Config(_))));

        assert_eq!(validator.config().language, "zh-cn");
        assert_eq!(validator.config().grammar.optional, "optional");
        assert_eq!(validator.error_template("required"), Some("@this 不能为空"));
        assert!(validator.rules().is_some());
        assert!(check(&validator, json!({"count": 4})).is_valid());
        assert_eq!(
            simple_errors(&check(&validator, json!({"count": 3}))),
            json!({"count": "count must be even"})
        );
    }

    #[test]
    fn test_empty_rules_ignored() {
        let validator = Validator::new()
            .set_rules(json!({"a": "required"}))
            .set_rules(json!({}));
        assert!(validator.rules().is_some());
        assert!(!check(&validator, json!({})).is_valid());
    }

    #[test]
    fn test_compile_literal_flags() {
        assert!(compile_literal("/abc/i").unwrap().is_match("ABC"));
        assert!(compile_literal("/abc/gu").unwrap().is_match("abc"));
        assert!(compile_literal("/(/").is_err());
    }
}
