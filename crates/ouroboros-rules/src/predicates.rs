//! Built-in rule methods
//!
//! Every built-in takes the resolved parameter list and returns a
//! [`MethodOutput`]. With classic binding the checked value is `params[0]`;
//! membership methods receive `[value, [candidates…]]`.
//!
//! Rule strings usually name built-ins by symbol (`>`, `len<=`, `(n)`).
//! [`resolve_alias`] maps a symbol to the method name used for dispatch.

use crate::formats;
use crate::registry::MethodOutput;
use crate::types::Value;
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Signature of a built-in method
pub type BuiltinFn = fn(&[Value]) -> MethodOutput;

// ============================================================================
// Alias Table
// ============================================================================

const ALIASES: &[(&str, &str)] = &[
    ("=", "equal"),
    ("!=", "not_equal"),
    ("==", "strictly_equal"),
    ("!==", "not_strictly_equal"),
    (">", "greater_than"),
    ("<", "less_than"),
    (">=", "greater_equal"),
    ("<=", "less_equal"),
    ("<>", "greater_less"),
    ("<=>", "greaterequal_less"),
    ("<>=", "greater_lessequal"),
    ("<=>=", "greaterequal_lessequal"),
    ("!in", "not_in"),
    ("(n)", "in_number"),
    ("!(n)", "not_in_number"),
    ("(s)", "in_string"),
    ("!(s)", "not_in_string"),
    ("len=", "length_equal"),
    ("len!=", "length_not_equal"),
    ("len>", "length_greater_than"),
    ("len<", "length_less_than"),
    ("len>=", "length_greater_equal"),
    ("len<=", "length_less_equal"),
    ("len<>", "length_greater_less"),
    ("len<=>", "length_greaterequal_less"),
    ("len<>=", "length_greater_lessequal"),
    ("len<=>=", "length_greaterequal_lessequal"),
];

/// Method name for a rule symbol; unknown symbols map to themselves.
pub fn resolve_alias(symbol: &str) -> &str {
    ALIASES
        .iter()
        .find(|(alias, _)| *alias == symbol)
        .map(|(_, name)| *name)
        .unwrap_or(symbol)
}

/// Whether `symbol` is a key of the alias table
pub fn is_alias(symbol: &str) -> bool {
    ALIASES.iter().any(|(alias, _)| *alias == symbol)
}

/// Membership methods get their parameters packed as `[value, [list…]]`
pub fn is_membership(method: &str) -> bool {
    let rest = method.strip_prefix("not_").unwrap_or(method);
    matches!(rest, "in" | "in_number" | "in_string")
}

// ============================================================================
// Built-in Table
// ============================================================================

static BUILTINS: Lazy<HashMap<&'static str, BuiltinFn>> = Lazy::new(|| {
    let table: &[(&'static str, BuiltinFn)] = &[
        // Comparison
        ("equal", equal),
        ("not_equal", not_equal),
        ("strictly_equal", strictly_equal),
        ("not_strictly_equal", not_strictly_equal),
        ("greater_than", greater_than),
        ("less_than", less_than),
        ("greater_equal", greater_equal),
        ("less_equal", less_equal),
        ("greater_less", greater_less),
        ("greaterequal_less", greaterequal_less),
        ("greater_lessequal", greater_lessequal),
        ("greaterequal_lessequal", greaterequal_lessequal),
        // Membership
        ("in", in_list),
        ("not_in", not_in_list),
        ("in_number", in_number),
        ("not_in_number", not_in_number),
        ("in_string", in_string),
        ("not_in_string", not_in_string),
        // Length
        ("length_equal", length_equal),
        ("length_not_equal", length_not_equal),
        ("length_greater_than", length_greater_than),
        ("length_less_than", length_less_than),
        ("length_greater_equal", length_greater_equal),
        ("length_less_equal", length_less_equal),
        ("length_greater_less", length_greater_less),
        ("length_greaterequal_less", length_greaterequal_less),
        ("length_greater_lessequal", length_greater_lessequal),
        ("length_greaterequal_lessequal", length_greaterequal_lessequal),
        // Type
        ("int", is_int),
        ("float", is_float),
        ("number", is_number),
        ("string", is_string),
        ("bool", is_bool),
        ("bool_str", is_bool_str),
        ("array", is_array),
        ("list", is_list),
        ("object", is_object),
        // Format
        ("email", email),
        ("url", url),
        ("ip", ip),
        ("ipv4", ipv4),
        ("ipv6", ipv6),
        ("mac", mac),
        ("uuid", uuid),
        ("base64", base64),
        ("date", date),
        ("datetime", datetime),
        ("time", time),
        ("dob", dob),
        ("alpha", alpha),
        ("alpha_num", alpha_num),
    ];
    table.iter().copied().collect()
});

/// Look up a built-in by resolved method name
pub fn builtin(name: &str) -> Option<BuiltinFn> {
    BUILTINS.get(name).copied()
}

// ============================================================================
// Parameter Helpers
// ============================================================================

static NULL: Value = Value::Null;

fn arg(params: &[Value], idx: usize) -> &Value {
    params.get(idx).unwrap_or(&NULL)
}

fn num(params: &[Value], idx: usize) -> Option<f64> {
    arg(params, idx).as_f64()
}

/// Loose equality: numerically when both sides are numeric, else textually
fn loose_eq(a: &Value, b: &Value) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => match (a, b) {
            (Value::Null, Value::Null) => true,
            (Value::Null, _) | (_, Value::Null) => false,
            _ => a.to_string() == b.to_string(),
        },
    }
}

/// Compare `params[0]` against `params[1]` (and `params[2]`) numerically
fn compare(params: &[Value], check: impl Fn(f64, &[f64]) -> bool, bounds: usize) -> MethodOutput {
    let Some(value) = num(params, 0) else {
        return MethodOutput::Fail;
    };
    let limits: Option<Vec<f64>> = (1..=bounds).map(|i| num(params, i)).collect();
    match limits {
        Some(limits) => check(value, &limits).into(),
        None => MethodOutput::Fail,
    }
}

/// Compare the length of `params[0]` against `params[1]` (and `params[2]`)
fn compare_length(
    params: &[Value],
    check: impl Fn(f64, &[f64]) -> bool,
    bounds: usize,
) -> MethodOutput {
    let Some(len) = arg(params, 0).length() else {
        return MethodOutput::Fail;
    };
    let limits: Option<Vec<f64>> = (1..=bounds).map(|i| num(params, i)).collect();
    match limits {
        Some(limits) => check(len as f64, &limits).into(),
        None => MethodOutput::Fail,
    }
}

fn candidates(params: &[Value]) -> &[Value] {
    match arg(params, 1) {
        Value::List(items) => items,
        _ => params.get(1..).unwrap_or_default(),
    }
}

fn with_str(params: &[Value], check: fn(&str) -> bool) -> MethodOutput {
    match arg(params, 0) {
        Value::String(s) => check(s).into(),
        _ => MethodOutput::Fail,
    }
}

// ============================================================================
// Comparison
// ============================================================================

fn equal(params: &[Value]) -> MethodOutput {
    loose_eq(arg(params, 0), arg(params, 1)).into()
}

fn not_equal(params: &[Value]) -> MethodOutput {
    (!loose_eq(arg(params, 0), arg(params, 1))).into()
}

fn strictly_equal(params: &[Value]) -> MethodOutput {
    (arg(params, 0) == arg(params, 1)).into()
}

fn not_strictly_equal(params: &[Value]) -> MethodOutput {
    (arg(params, 0) != arg(params, 1)).into()
}

fn greater_than(params: &[Value]) -> MethodOutput {
    compare(params, |v, l| v > l[0], 1)
}

fn less_than(params: &[Value]) -> MethodOutput {
    compare(params, |v, l| v < l[0], 1)
}

fn greater_equal(params: &[Value]) -> MethodOutput {
    compare(params, |v, l| v >= l[0], 1)
}

fn less_equal(params: &[Value]) -> MethodOutput {
    compare(params, |v, l| v <= l[0], 1)
}

fn greater_less(params: &[Value]) -> MethodOutput {
    compare(params, |v, l| v > l[0] && v < l[1], 2)
}

fn greaterequal_less(params: &[Value]) -> MethodOutput {
    compare(params, |v, l| v >= l[0] && v < l[1], 2)
}

fn greater_lessequal(params: &[Value]) -> MethodOutput {
    compare(params, |v, l| v > l[0] && v <= l[1], 2)
}

fn greaterequal_lessequal(params: &[Value]) -> MethodOutput {
    compare(params, |v, l| v >= l[0] && v <= l[1], 2)
}

// ============================================================================
// Membership
// ============================================================================

fn in_list(params: &[Value]) -> MethodOutput {
    let value = arg(params, 0);
    candidates(params).iter().any(|c| loose_eq(value, c)).into()
}

fn not_in_list(params: &[Value]) -> MethodOutput {
    let value = arg(params, 0);
    (!candidates(params).iter().any(|c| loose_eq(value, c))).into()
}

fn number_in(params: &[Value]) -> Option<bool> {
    let value = match arg(params, 0) {
        Value::Int(i) => *i as f64,
        Value::Float(f) => *f,
        _ => return None,
    };
    Some(candidates(params).iter().any(|c| c.as_f64() == Some(value)))
}

fn in_number(params: &[Value]) -> MethodOutput {
    (number_in(params) == Some(true)).into()
}

fn not_in_number(params: &[Value]) -> MethodOutput {
    (number_in(params) == Some(false)).into()
}

fn string_in(params: &[Value]) -> Option<bool> {
    let value = arg(params, 0).as_str()?;
    Some(candidates(params).iter().any(|c| c.as_str() == Some(value)))
}

fn in_string(params: &[Value]) -> MethodOutput {
    (string_in(params) == Some(true)).into()
}

fn not_in_string(params: &[Value]) -> MethodOutput {
    (string_in(params) == Some(false)).into()
}

// ============================================================================
// Length
// ============================================================================

fn length_equal(params: &[Value]) -> MethodOutput {
    compare_length(params, |v, l| v == l[0], 1)
}

fn length_not_equal(params: &[Value]) -> MethodOutput {
    compare_length(params, |v, l| v != l[0], 1)
}

fn length_greater_than(params: &[Value]) -> MethodOutput {
    compare_length(params, |v, l| v > l[0], 1)
}

fn length_less_than(params: &[Value]) -> MethodOutput {
    compare_length(params, |v, l| v < l[0], 1)
}

fn length_greater_equal(params: &[Value]) -> MethodOutput {
    compare_length(params, |v, l| v >= l[0], 1)
}

fn length_less_equal(params: &[Value]) -> MethodOutput {
    compare_length(params, |v, l| v <= l[0], 1)
}

fn length_greater_less(params: &[Value]) -> MethodOutput {
    compare_length(params, |v, l| v > l[0] && v < l[1], 2)
}

fn length_greaterequal_less(params: &[Value]) -> MethodOutput {
    compare_length(params, |v, l| v >= l[0] && v < l[1], 2)
}

fn length_greater_lessequal(params: &[Value]) -> MethodOutput {
    compare_length(params, |v, l| v > l[0] && v <= l[1], 2)
}

fn length_greaterequal_lessequal(params: &[Value]) -> MethodOutput {
    compare_length(params, |v, l| v >= l[0] && v <= l[1], 2)
}

// ============================================================================
// Type
// ============================================================================

fn is_int(params: &[Value]) -> MethodOutput {
    matches!(arg(params, 0), Value::Int(_)).into()
}

fn is_float(params: &[Value]) -> MethodOutput {
    matches!(arg(params, 0), Value::Float(_)).into()
}

fn is_number(params: &[Value]) -> MethodOutput {
    matches!(arg(params, 0), Value::Int(_) | Value::Float(_)).into()
}

fn is_string(params: &[Value]) -> MethodOutput {
    matches!(arg(params, 0), Value::String(_)).into()
}

fn is_bool(params: &[Value]) -> MethodOutput {
    matches!(arg(params, 0), Value::Bool(_)).into()
}

fn is_bool_str(params: &[Value]) -> MethodOutput {
    with_str(params, |s| s.eq_ignore_ascii_case("true") || s.eq_ignore_ascii_case("false"))
}

fn is_array(params: &[Value]) -> MethodOutput {
    matches!(arg(params, 0), Value::List(_) | Value::Object(_)).into()
}

fn is_list(params: &[Value]) -> MethodOutput {
    matches!(arg(params, 0), Value::List(_)).into()
}

fn is_object(params: &[Value]) -> MethodOutput {
    matches!(arg(params, 0), Value::Object(_)).into()
}

// ============================================================================
// Format
// ============================================================================

fn email(params: &[Value]) -> MethodOutput {
    with_str(params, formats::validate_email)
}

fn url(params: &[Value]) -> MethodOutput {
    with_str(params, formats::validate_url)
}

fn ip(params: &[Value]) -> MethodOutput {
    with_str(params, formats::validate_ip)
}

fn ipv4(params: &[Value]) -> MethodOutput {
    with_str(params, formats::validate_ipv4)
}

fn ipv6(params: &[Value]) -> MethodOutput {
    with_str(params, formats::validate_ipv6)
}

fn mac(params: &[Value]) -> MethodOutput {
    with_str(params, formats::validate_mac)
}

fn uuid(params: &[Value]) -> MethodOutput {
    with_str(params, formats::validate_uuid)
}

fn base64(params: &[Value]) -> MethodOutput {
    with_str(params, formats::validate_base64)
}

fn date(params: &[Value]) -> MethodOutput {
    with_str(params, formats::validate_date)
}

fn datetime(params: &[Value]) -> MethodOutput {
    with_str(params, formats::validate_datetime)
}

fn time(params: &[Value]) -> MethodOutput {
    with_str(params, formats::validate_time)
}

fn dob(params: &[Value]) -> MethodOutput {
    with_str(params, formats::validate_dob)
}

fn alpha(params: &[Value]) -> MethodOutput {
    with_str(params, formats::validate_alpha)
}

fn alpha_num(params: &[Value]) -> MethodOutput {
    with_str(params, formats::validate_alpha_num)
}
