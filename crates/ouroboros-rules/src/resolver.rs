//! Method token resolution
//!
//! A method token is a method symbol optionally followed by a parameter
//! group: `name` (the field value is the only parameter), `name[a,b]`
//! (classic binding: the field value is prepended unless a parameter already
//! refers to it) or `name(a,b)` (force binding: parameters exactly as
//! written). Parameters starting with the reference sigil are looked up in
//! the data; everything else is a string literal.

use crate::config::GrammarConfig;
use crate::predicates;
use crate::types::Value;

/// Data a token's references are resolved against
#[derive(Debug, Clone, Copy)]
pub struct RefContext<'a> {
    /// The field's own value (`Null` when absent)
    pub value: &'a Value,
    /// The object or list holding the field
    pub parent: &'a Value,
    /// The whole input
    pub root: &'a Value,
}

/// A resolved method token
#[derive(Debug, Clone, PartialEq)]
pub struct MethodInvocation {
    /// Name used for dispatch, after alias resolution
    pub method_name: String,
    /// Token text before the parameter group; used for template lookup
    pub symbol: String,
    /// Parameters handed to the method
    pub params: Vec<Value>,
    /// Written parameters for `@p1..@pN`, self references excluded
    pub display_params: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Binding {
    None,
    Classic,
    Force,
}

/// Resolve one method token against `ctx`.
///
/// Never fails: unknown method names are left to dispatch and unresolved
/// references become `Value::Null`.
pub fn resolve(token: &str, ctx: &RefContext<'_>, grammar: &GrammarConfig) -> MethodInvocation {
    let (symbol, binding, group) = split_binding(token, grammar);
    let method_name = predicates::resolve_alias(symbol).to_string();

    let written = group
        .map(|g| split_params(g, &grammar.param_separator))
        .unwrap_or_default();
    let mut display_params: Vec<String> = written
        .iter()
        .filter(|p| !grammar.is_self_ref(p))
        .map(|p| p.to_string())
        .collect();

    let mut params: Vec<Value> = match binding {
        Binding::None => vec![ctx.value.clone()],
        Binding::Classic | Binding::Force => written
            .iter()
            .map(|p| resolve_param(p, ctx, grammar))
            .collect(),
    };
    if binding == Binding::Classic && !written.iter().any(|p| grammar.is_self_ref(p)) {
        params.insert(0, ctx.value.clone());
    }

    if predicates::is_membership(&method_name) {
        let mut rest = params.into_iter();
        let value = rest.next().unwrap_or_default();
        params = vec![value, Value::List(rest.collect())];
        display_params = vec![format!("[{}]", display_params.join(","))];
    }

    MethodInvocation {
        method_name,
        symbol: symbol.to_string(),
        params,
        display_params,
    }
}

/// Split `token` into symbol, binding and the text inside the parameter group.
fn split_binding<'a>(token: &'a str, grammar: &GrammarConfig) -> (&'a str, Binding, Option<&'a str>) {
    // `(n)`, `!(s)` and friends look like groups but are whole symbols
    if predicates::is_alias(token) || predicates::builtin(token).is_some() {
        return (token, Binding::None, None);
    }

    let groups = [
        (grammar.param_classic, Binding::Classic),
        (grammar.param_force, Binding::Force),
    ];
    for ((open, close), binding) in groups {
        if !token.ends_with(close) {
            continue;
        }
        if let Some(start) = group_start(token, open, close) {
            let inner = &token[start + open.len_utf8()..token.len() - close.len_utf8()];
            return (&token[..start], binding, Some(inner));
        }
    }
    (token, Binding::None, None)
}

/// Offset of the first `open` (past position 0) whose matching `close` is
/// the last character of `token`.
fn group_start(token: &str, open: char, close: char) -> Option<usize> {
    let last = token.char_indices().last().map(|(i, _)| i)?;
    token
        .char_indices()
        .filter(|&(idx, ch)| idx > 0 && ch == open)
        .map(|(idx, _)| idx)
        .find(|&start| matching_close(&token[start..], open, close) == Some(last - start))
}

fn matching_close(text: &str, open: char, close: char) -> Option<usize> {
    let mut depth = 0usize;
    for (idx, ch) in text.char_indices() {
        if ch == open {
            depth += 1;
        } else if ch == close {
            depth = depth.checked_sub(1)?;
            if depth == 0 {
                return Some(idx);
            }
        }
    }
    None
}

fn split_params<'a>(group: &'a str, separator: &str) -> Vec<&'a str> {
    if group.trim().is_empty() {
        return Vec::new();
    }
    group.split(separator).map(str::trim).collect()
}

fn resolve_param(param: &str, ctx: &RefContext<'_>, grammar: &GrammarConfig) -> Value {
    if grammar.is_self_ref(param) {
        return ctx.value.clone();
    }
    if param == grammar.param_parent {
        return ctx.parent.clone();
    }
    if param == grammar.param_root {
        return ctx.root.clone();
    }
    match param.strip_prefix(grammar.param_prefix.as_str()) {
        Some(name) if !name.is_empty() => ctx
            .parent
            .child(name)
            .or_else(|| ctx.root.child(name))
            .cloned()
            .unwrap_or_default(),
        _ => Value::String(param.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn resolve_in(token: &str, value: &Value, parent: &Value, root: &Value) -> MethodInvocation {
        let grammar = GrammarConfig::default();
        let ctx = RefContext {
            value,
            parent,
            root,
        };
        resolve(token, &ctx, &grammar)
    }

    fn simple(token: &str, value: Value) -> MethodInvocation {
        resolve_in(token, &value, &Value::object(), &Value::object())
    }

    #[test]
    fn test_no_binding() {
        let inv = simple("int", Value::Int(3));
        assert_eq!(inv.method_name, "int");
        assert_eq!(inv.symbol, "int");
        assert_eq!(inv.params, vec![Value::Int(3)]);
        assert!(inv.display_params.is_empty());
    }

    #[test]
    fn test_classic_binding_prepends_self() {
        let inv = simple("<=>=[100,200]", Value::Int(150));
        assert_eq!(inv.method_name, "greaterequal_lessequal");
        assert_eq!(inv.symbol, "<=>=");
        assert_eq!(
            inv.params,
            vec![Value::Int(150), Value::from("100"), Value::from("200")]
        );
        assert_eq!(inv.display_params, vec!["100", "200"]);
    }

    #[test]
    fn test_classic_binding_with_explicit_self() {
        let inv = simple("<[10,@this]", Value::Int(3));
        assert_eq!(inv.params, vec![Value::from("10"), Value::Int(3)]);
        assert_eq!(inv.display_params, vec!["10"]);
    }

    #[test]
    fn test_force_binding_with_references() {
        let data: Value = json!({"unit": "cm", "height": 180}).into();
        let inv = resolve_in("=(@unit,cm)", &Value::Int(180), &data, &data);
        assert_eq!(inv.method_name, "equal");
        assert_eq!(inv.params, vec![Value::from("cm"), Value::from("cm")]);
        assert_eq!(inv.display_params, vec!["@unit", "cm"]);
    }

    #[test]
    fn test_reference_falls_back_to_root() {
        let root: Value = json!({"mode": "strict", "user": {"name": "x"}}).into();
        let parent = root.child("user").cloned().unwrap();
        let inv = resolve_in("check(@mode,@name,@missing)", &Value::from("x"), &parent, &root);
        assert_eq!(
            inv.params,
            vec![Value::from("strict"), Value::from("x"), Value::Null]
        );
    }

    #[test]
    fn test_parent_and_root_references() {
        let root: Value = json!({"user": {"name": "x"}}).into();
        let parent = root.child("user").cloned().unwrap();
        let inv = resolve_in("check(@parent,@root)", &Value::from("x"), &parent, &root);
        assert_eq!(inv.params, vec![parent.clone(), root.clone()]);
    }

    #[test]
    fn test_membership_repacked() {
        let inv = simple("in[a,b,c]", Value::from("b"));
        assert_eq!(inv.method_name, "in");
        assert_eq!(
            inv.params,
            vec![Value::from("b"), Value::from(vec!["a", "b", "c"])]
        );
        assert_eq!(inv.display_params, vec!["[a,b,c]"]);
    }

    #[test]
    fn test_membership_symbol_with_group() {
        let inv = simple("!(n)[1,2]", Value::Int(3));
        assert_eq!(inv.symbol, "!(n)");
        assert_eq!(inv.method_name, "not_in_number");
        assert_eq!(inv.params[1], Value::from(vec!["1", "2"]));

        let inv = simple("(s)(@this,x,y)", Value::from("x"));
        assert_eq!(inv.symbol, "(s)");
        assert_eq!(inv.params, vec![Value::from("x"), Value::from(vec!["x", "y"])]);
    }

    #[test]
    fn test_bare_alias_symbol() {
        let inv = simple("(n)", Value::Int(1));
        assert_eq!(inv.symbol, "(n)");
        assert_eq!(inv.method_name, "in_number");
    }

    #[test]
    fn test_empty_group() {
        let inv = simple("custom()", Value::Int(1));
        assert_eq!(inv.method_name, "custom");
        assert!(inv.params.is_empty());
    }

    #[test]
    fn test_unbalanced_group_is_plain_name() {
        let inv = simple("odd]", Value::Int(1));
        assert_eq!(inv.method_name, "odd]");
        assert_eq!(inv.params, vec![Value::Int(1)]);
    }
}
