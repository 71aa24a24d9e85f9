//! Configuration for the rule grammar and engine behavior
//!
//! [`GrammarConfig`] holds every symbol of the rule DSL. [`ValidatorConfig`]
//! wraps it together with the engine switches. Both deserialize from JSON
//! with missing keys falling back to the defaults, and [`ConfigPatch`] is
//! the partial form merged in by `Validator::set_config`.

use crate::errors::{Result, RuleError};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::path::PathBuf;

// ============================================================================
// Grammar Config
// ============================================================================

/// Symbols, separators and patterns of the rule grammar
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct GrammarConfig {
    /// Separator between field names in error paths (`user.name`)
    pub field_separator: String,
    /// Separator between tokens of a leaf rule
    pub rule_separator: String,

    /// Required marker, long and short form
    pub required: String,
    pub required_short: String,
    /// Optional marker, long and short form
    pub optional: String,
    pub optional_short: String,
    /// Unset-required marker, long and short form
    pub unset_required: String,
    pub unset_required_short: String,

    /// OR-group system symbol, long and short form
    pub or: String,
    pub or_short: String,
    /// Array-optional system symbol, long and short form
    pub array_optional: String,
    pub array_optional_short: String,
    /// Numeric-array system symbol
    pub numeric_array: String,

    /// "Classic" parameter binding: self value prepended unless referenced
    pub param_classic: (char, char),
    /// "Force" parameter binding: parameters used exactly as written
    pub param_force: (char, char),
    pub param_separator: String,

    /// Cross-reference sigil
    pub param_prefix: String,
    pub param_self: String,
    pub param_parent: String,
    pub param_root: String,

    /// Conditional prefixes
    pub if_true: String,
    pub if_true_explicit: String,
    pub if_false: String,

    /// Regex locating a trailing custom message (first capture group)
    pub message_pattern: String,
    /// Regex recognizing a `/pattern/flags` token
    pub regex_literal: String,

    /// Field name used to wrap scalar or symbol-tagged roots
    pub auto_field: String,
}

impl Default for GrammarConfig {
    fn default() -> Self {
        Self {
            field_separator: ".".to_string(),
            rule_separator: "|".to_string(),
            required: "required".to_string(),
            required_short: "*".to_string(),
            optional: "optional".to_string(),
            optional_short: "O".to_string(),
            unset_required: "optional_unset".to_string(),
            unset_required_short: "O!".to_string(),
            or: "[or]".to_string(),
            or_short: "[||]".to_string(),
            array_optional: "[optional]".to_string(),
            array_optional_short: "[O]".to_string(),
            numeric_array: ".*".to_string(),
            param_classic: ('[', ']'),
            param_force: ('(', ')'),
            param_separator: ",".to_string(),
            param_prefix: "@".to_string(),
            param_self: "@this".to_string(),
            param_parent: "@parent".to_string(),
            param_root: "@root".to_string(),
            if_true: "if?".to_string(),
            if_true_explicit: "if1?".to_string(),
            if_false: "if0?".to_string(),
            message_pattern: r" >> (.*)$".to_string(),
            regex_literal: r"^/.+/[a-zA-Z]*$".to_string(),
            auto_field: "data".to_string(),
        }
    }
}

impl GrammarConfig {
    /// Create the default grammar
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `token` is the required marker
    pub fn is_required(&self, token: &str) -> bool {
        token == self.required || token == self.required_short
    }

    /// Whether `token` is the optional marker
    pub fn is_optional(&self, token: &str) -> bool {
        token == self.optional || token == self.optional_short
    }

    /// Whether `token` is the unset-required marker
    pub fn is_unset_required(&self, token: &str) -> bool {
        token == self.unset_required || token == self.unset_required_short
    }

    /// Whether `text` refers to the field's own value
    pub fn is_self_ref(&self, text: &str) -> bool {
        text == self.param_self || text == self.param_prefix
    }

    fn symbols(&self) -> Vec<(&'static str, &str)> {
        vec![
            ("rule_separator", self.rule_separator.as_str()),
            ("required", self.required.as_str()),
            ("required_short", self.required_short.as_str()),
            ("optional", self.optional.as_str()),
            ("optional_short", self.optional_short.as_str()),
            ("unset_required", self.unset_required.as_str()),
            ("unset_required_short", self.unset_required_short.as_str()),
            ("or", self.or.as_str()),
            ("or_short", self.or_short.as_str()),
            ("array_optional", self.array_optional.as_str()),
            ("array_optional_short", self.array_optional_short.as_str()),
            ("numeric_array", self.numeric_array.as_str()),
            ("param_self", self.param_self.as_str()),
            ("param_parent", self.param_parent.as_str()),
            ("param_root", self.param_root.as_str()),
            ("if_true", self.if_true.as_str()),
            ("if_true_explicit", self.if_true_explicit.as_str()),
            ("if_false", self.if_false.as_str()),
        ]
    }

    /// Reject empty or duplicated symbols
    pub fn check(&self) -> Result<()> {
        let symbols = self.symbols();
        for (i, (name, symbol)) in symbols.iter().enumerate() {
            if symbol.is_empty() {
                return Err(RuleError::Config(format!("symbol {} is empty", name)));
            }
            if let Some((other, _)) = symbols[i + 1..].iter().find(|(_, s)| s == symbol) {
                return Err(RuleError::Config(format!(
                    "symbols {} and {} are both {:?}",
                    name, other, symbol
                )));
            }
        }
        for (name, value) in [
            ("field_separator", &self.field_separator),
            ("param_separator", &self.param_separator),
            ("param_prefix", &self.param_prefix),
            ("auto_field", &self.auto_field),
        ] {
            if value.is_empty() {
                return Err(RuleError::Config(format!("{} is empty", name)));
            }
        }
        Ok(())
    }

    /// Validate the symbols and compile both patterns
    pub fn compile(&self) -> Result<CompiledGrammar> {
        self.check()?;
        Ok(CompiledGrammar {
            message: compile_pattern(&self.message_pattern)?,
            regex_literal: compile_pattern(&self.regex_literal)?,
        })
    }
}

fn compile_pattern(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| RuleError::Pattern {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })
}

/// Compiled regex settings of a [`GrammarConfig`]
#[derive(Debug, Clone)]
pub struct CompiledGrammar {
    pub message: Regex,
    pub regex_literal: Regex,
}

static DEFAULT_COMPILED: Lazy<CompiledGrammar> =
    Lazy::new(|| GrammarConfig::default().compile().unwrap());

/// Patterns of the default grammar
impl Default for CompiledGrammar {
    fn default() -> Self {
        DEFAULT_COMPILED.clone()
    }
}

// ============================================================================
// Validator Config
// ============================================================================

/// Default maximum nesting depth of a rule walk
pub const DEFAULT_MAX_DEPTH: usize = 128;

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    pub grammar: GrammarConfig,
    /// Active error-template language tag
    pub language: String,
    /// Collect every failure instead of stopping at the first one
    pub validate_all: bool,
    /// Directory searched for `<language>.json` templates
    pub lang_path: Option<PathBuf>,
    /// Maximum nesting depth of a rule walk
    pub max_depth: usize,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            grammar: GrammarConfig::default(),
            language: "en".to_string(),
            validate_all: false,
            lang_path: None,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl ValidatorConfig {
    /// Create a new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the grammar
    pub fn grammar(mut self, grammar: GrammarConfig) -> Self {
        self.grammar = grammar;
        self
    }

    /// Set the template language
    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Collect all failures
    pub fn validate_all(mut self, validate_all: bool) -> Self {
        self.validate_all = validate_all;
        self
    }

    /// Directory holding custom `<language>.json` templates
    pub fn lang_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.lang_path = Some(path.into());
        self
    }

    /// Limit nesting depth
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Parse a config from JSON; absent keys keep their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| RuleError::Config(e.to_string()))
    }

    /// Merge a partial config into this one
    pub fn apply(&mut self, patch: ConfigPatch) {
        if let Some(grammar) = patch.grammar {
            self.grammar = grammar;
        }
        if let Some(language) = patch.language {
            self.language = language;
        }
        if let Some(validate_all) = patch.validate_all {
            self.validate_all = validate_all;
        }
        if let Some(lang_path) = patch.lang_path {
            self.lang_path = Some(lang_path);
        }
        if let Some(max_depth) = patch.max_depth {
            self.max_depth = max_depth;
        }
    }
}

/// Partial configuration accepted by `Validator::set_config`
///
/// The grammar is replaced as a whole; since [`GrammarConfig`] deserializes
/// with defaults, a JSON patch only needs to name the symbols it changes.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConfigPatch {
    pub grammar: Option<GrammarConfig>,
    pub language: Option<String>,
    pub validate_all: Option<bool>,
    pub lang_path: Option<PathBuf>,
    pub max_depth: Option<usize>,
}

impl ConfigPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grammar(mut self, grammar: GrammarConfig) -> Self {
        self.grammar = Some(grammar);
        self
    }

    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn validate_all(mut self, validate_all: bool) -> Self {
        self.validate_all = Some(validate_all);
        self
    }

    pub fn lang_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.lang_path = Some(path.into());
        self
    }

    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Parse a patch from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| RuleError::Config(e.to_string()))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ValidatorConfig::default();
        assert_eq!(config.language, "en");
        assert!(!config.validate_all);
        assert_eq!(config.max_depth, DEFAULT_MAX_DEPTH);
        assert_eq!(config.grammar.rule_separator, "|");
    }

    #[test]
    fn test_config_builder() {
        let config = ValidatorConfig::new()
            .language("zh-cn")
            .validate_all(true)
            .max_depth(8);

        assert_eq!(config.language, "zh-cn");
        assert!(config.validate_all);
        assert_eq!(config.max_depth, 8);
    }

    #[test]
    fn test_default_grammar_compiles() {
        let compiled = GrammarConfig::default().compile().unwrap();
        let caps = compiled.message.captures("required|int >> oops").unwrap();
        assert_eq!(&caps[1], "oops");
        assert!(compiled.regex_literal.is_match("/^\\d+$/i"));
        assert!(!compiled.regex_literal.is_match("int"));
    }

    #[test]
    fn test_duplicate_symbols_rejected() {
        let grammar = GrammarConfig {
            optional_short: "*".to_string(),
            ..Default::default()
        };
        assert!(matches!(grammar.check(), Err(RuleError::Config(_))));
    }

    #[test]
    fn test_bad_pattern_rejected() {
        let grammar = GrammarConfig {
            message_pattern: "(".to_string(),
            ..Default::default()
        };
        assert!(matches!(grammar.compile(), Err(RuleError::Pattern { .. })));
    }

    #[test]
    fn test_markers() {
        let grammar = GrammarConfig::default();
        assert!(grammar.is_required("*"));
        assert!(grammar.is_required("required"));
        assert!(grammar.is_optional("O"));
        assert!(grammar.is_unset_required("O!"));
        assert!(grammar.is_self_ref("@this"));
        assert!(grammar.is_self_ref("@"));
        assert!(!grammar.is_self_ref("@name"));
    }

    #[test]
    fn test_from_json_partial() {
        let config =
            ValidatorConfig::from_json(r#"{"validate_all": true, "grammar": {"rule_separator": ";"}}"#)
                .unwrap();
        assert!(config.validate_all);
        assert_eq!(config.grammar.rule_separator, ";");
        assert_eq!(config.grammar.required, "required");
        assert_eq!(config.language, "en");
    }

    #[test]
    fn test_apply_patch() {
        let mut config = ValidatorConfig::default();
        config.apply(ConfigPatch::new().validate_all(true).language("zh-cn"));
        assert!(config.validate_all);
        assert_eq!(config.language, "zh-cn");
        assert_eq!(config.max_depth, DEFAULT_MAX_DEPTH);
    }
}
