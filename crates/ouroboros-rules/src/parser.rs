//! Leaf rule parser
//!
//! Turns one leaf rule string such as
//! `required|=(@unit,cm)|<=>=[100,200] >> custom msg` into its ordered
//! method tokens plus the custom-message lookup.
//!
//! Parsing runs in three passes:
//! 1. split off the trailing custom message (`message_pattern`);
//! 2. tokenize on the rule separator, keeping `/pattern/flags` literals whole
//!    even when they contain the separator;
//! 3. interpret the custom message as JSON, then as the bracket-tag format
//!    `[tagA]=> msgA [tagB]=> msgB`, then as one flat fallback message.

use crate::config::{CompiledGrammar, GrammarConfig};

// ============================================================================
// Parsed Rule
// ============================================================================

/// Custom error messages attached to a leaf rule
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ErrorMessage {
    /// No custom message
    #[default]
    None,
    /// One message used for whichever token fails
    Single(String),
    /// Message per method symbol (or synthetic tag such as `required`)
    ByTag(Vec<(String, String)>),
}

impl ErrorMessage {
    /// Message to use when the token tagged `tag` fails
    pub fn lookup(&self, tag: &str) -> Option<&str> {
        match self {
            Self::None => None,
            Self::Single(message) => Some(message),
            Self::ByTag(pairs) => pairs
                .iter()
                .find(|(k, _)| k == tag)
                .map(|(_, v)| v.as_str()),
        }
    }
}

/// Output of [`parse_rule`]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParsedRule {
    /// Raw method tokens in declared order
    pub tokens: Vec<String>,
    pub error_message: ErrorMessage,
}

// ============================================================================
// Public API
// ============================================================================

/// Parse one leaf rule string. Pure: the same input always yields the same output.
pub fn parse_rule(rule: &str, grammar: &GrammarConfig, compiled: &CompiledGrammar) -> ParsedRule {
    let (body, message) = split_message(rule, compiled);
    ParsedRule {
        tokens: tokenize(body, &grammar.rule_separator),
        error_message: message.map(parse_message).unwrap_or_default(),
    }
}

/// Split `rule` into its token part and the custom message, if any.
pub fn split_message<'a>(rule: &'a str, compiled: &CompiledGrammar) -> (&'a str, Option<&'a str>) {
    match compiled.message.captures(rule) {
        Some(caps) => {
            let whole = caps.get(0).map(|m| m.start()).unwrap_or(rule.len());
            let message = caps.get(1).or_else(|| caps.get(0)).map(|m| m.as_str());
            (&rule[..whole], message)
        }
        None => (rule, None),
    }
}

/// Split on `separator`, keeping regex literals intact. Empty tokens are dropped.
pub fn tokenize(rule: &str, separator: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut rest = rule;

    while !rest.is_empty() {
        if rest.starts_with('/') {
            if let Some(end) = regex_literal_end(rest, separator) {
                tokens.push(rest[..end].to_string());
                rest = rest[end..].strip_prefix(separator).unwrap_or(&rest[end..]);
                continue;
            }
        }
        match rest.find(separator) {
            Some(idx) => {
                tokens.push(rest[..idx].to_string());
                rest = &rest[idx + separator.len()..];
            }
            None => {
                tokens.push(rest.to_string());
                break;
            }
        }
    }

    tokens.retain(|t| !t.is_empty());
    tokens
}

/// End offset of a `/pattern/flags` literal at the start of `text`.
///
/// The literal closes at the first unescaped `/` whose flags are followed by
/// the separator or the end of the input.
fn regex_literal_end(text: &str, separator: &str) -> Option<usize> {
    let mut escaped = false;
    for (idx, ch) in text.char_indices().skip(1) {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' => escaped = true,
            '/' => {
                let after = &text[idx + 1..];
                let flags = after
                    .find(|c: char| !c.is_ascii_alphabetic())
                    .unwrap_or(after.len());
                let tail = &after[flags..];
                if idx > 1 && (tail.is_empty() || tail.starts_with(separator)) {
                    return Some(idx + 1 + flags);
                }
            }
            _ => {}
        }
    }
    None
}

/// Interpret a custom message: JSON object, bracket tags, or flat text.
pub fn parse_message(text: &str) -> ErrorMessage {
    if let Some(pairs) = parse_json_message(text) {
        return ErrorMessage::ByTag(pairs);
    }
    if let Some(pairs) = parse_tagged_message(text) {
        return ErrorMessage::ByTag(pairs);
    }
    ErrorMessage::Single(text.to_string())
}

fn parse_json_message(text: &str) -> Option<Vec<(String, String)>> {
    let serde_json::Value::Object(map) = serde_json::from_str::<serde_json::Value>(text.trim()).ok()? else {
        return None;
    };
    map.into_iter()
        .map(|(k, v)| match v {
            serde_json::Value::String(s) => Some((k, s)),
            _ => None,
        })
        .collect()
}

/// `[tagA]=> msgA [tagB]=> msgB`, scanned one tag at a time.
fn parse_tagged_message(text: &str) -> Option<Vec<(String, String)>> {
    let rest = text.trim_start().strip_prefix('[')?;
    let close = rest.find("]=>")?;
    let tag = &rest[..close];
    if !is_tag(tag) {
        return None;
    }

    let body = &rest[close + 3..];
    let mut pairs = Vec::new();
    match next_tag_start(body) {
        Some(idx) => {
            pairs.push((tag.to_string(), body[..idx].trim().to_string()));
            pairs.extend(parse_tagged_message(&body[idx..])?);
        }
        None => pairs.push((tag.to_string(), body.trim().to_string())),
    }
    Some(pairs)
}

fn next_tag_start(body: &str) -> Option<usize> {
    body.match_indices('[').map(|(idx, _)| idx).find(|&idx| {
        let after = &body[idx + 1..];
        after.find("]=>").is_some_and(|close| is_tag(&after[..close]))
    })
}

fn is_tag(tag: &str) -> bool {
    !tag.is_empty() && !tag.contains(|c: char| c.is_whitespace() || c == '[' || c == ']')
}
