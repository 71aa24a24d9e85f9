//! Error-message templates
//!
//! A template maps a tag (a method symbol such as `>` or `len<=`, a method
//! name, or a synthetic tag such as `required`) to a message. Messages carry
//! placeholders: `@this` for the field path, `@p1..@pN` for parameters,
//! `@preg` for a regex literal and `@method` for a method symbol.

use crate::errors::{Result, RuleError};
use std::collections::HashMap;
use std::path::Path;

/// Tag used when nothing more specific matches
pub const DEFAULT_TAG: &str = "default";

const EN: &[(&str, &str)] = &[
    ("default", "@this validation failed"),
    ("required", "@this can not be empty"),
    ("unset_required", "@this must be unset or not empty"),
    ("preg", "@this format is invalid, should be @preg"),
    ("numeric_array", "@this must be a numeric array"),
    ("method_undefined", "@method method is undefined"),
    ("=", "@this must be equal to @p1"),
    ("!=", "@this must be not equal to @p1"),
    ("==", "@this must be strictly equal to @p1"),
    ("!==", "@this must not be strictly equal to @p1"),
    (">", "@this must be greater than @p1"),
    ("<", "@this must be less than @p1"),
    (">=", "@this must be greater than or equal to @p1"),
    ("<=", "@this must be less than or equal to @p1"),
    ("<>", "@this must be greater than @p1 and less than @p2"),
    ("<=>", "@this must be greater than or equal to @p1 and less than @p2"),
    ("<>=", "@this must be greater than @p1 and less than or equal to @p2"),
    ("<=>=", "@this must be greater than or equal to @p1 and less than or equal to @p2"),
    ("in", "@this must be in @p1"),
    ("!in", "@this must not be in @p1"),
    ("(n)", "@this must be numeric and in @p1"),
    ("!(n)", "@this must be numeric and not in @p1"),
    ("(s)", "@this must be string and in @p1"),
    ("!(s)", "@this must be string and not in @p1"),
    ("len=", "@this length must be equal to @p1"),
    ("len!=", "@this length must be not equal to @p1"),
    ("len>", "@this length must be greater than @p1"),
    ("len<", "@this length must be less than @p1"),
    ("len>=", "@this length must be greater than or equal to @p1"),
    ("len<=", "@this length must be less than or equal to @p1"),
    ("len<>", "@this length must be greater than @p1 and less than @p2"),
    ("len<=>", "@this length must be greater than or equal to @p1 and less than @p2"),
    ("len<>=", "@this length must be greater than @p1 and less than or equal to @p2"),
    ("len<=>=", "@this length must be greater than or equal to @p1 and less than or equal to @p2"),
    ("int", "@this must be integer"),
    ("float", "@this must be float"),
    ("number", "@this must be number"),
    ("string", "@this must be string"),
    ("bool", "@this must be boolean"),
    ("bool_str", "@this must be boolean string"),
    ("array", "@this must be array"),
    ("list", "@this must be list"),
    ("object", "@this must be object"),
    ("email", "@this must be email"),
    ("url", "@this must be url"),
    ("ip", "@this must be IP address"),
    ("ipv4", "@this must be IPv4 address"),
    ("ipv6", "@this must be IPv6 address"),
    ("mac", "@this must be MAC address"),
    ("uuid", "@this must be UUID"),
    ("base64", "@this must be base64 encoded"),
    ("date", "@this must be date (YYYY-MM-DD)"),
    ("datetime", "@this must be datetime (ISO 8601)"),
    ("time", "@this must be time (HH:MM:SS)"),
    ("dob", "@this must be a valid date of birth"),
    ("alpha", "@this must only contain letters"),
    ("alpha_num", "@this must only contain letters and numbers"),
];

const ZH_CN: &[(&str, &str)] = &[
    ("default", "@this 验证错误"),
    ("required", "@this 不能为空"),
    ("unset_required", "@this 允许不设置，一旦设置则不能为空"),
    ("preg", "@this 格式错误，必须是 @preg"),
    ("numeric_array", "@this 必须是索引数组"),
    ("method_undefined", "@method 方法未定义"),
    ("=", "@this 必须等于 @p1"),
    ("!=", "@this 必须不等于 @p1"),
    ("==", "@this 必须严格等于 @p1"),
    ("!==", "@this 必须严格不等于 @p1"),
    (">", "@this 必须大于 @p1"),
    ("<", "@this 必须小于 @p1"),
    (">=", "@this 必须大于等于 @p1"),
    ("<=", "@this 必须小于等于 @p1"),
    ("<>", "@this 必须大于 @p1 且小于 @p2"),
    ("<=>", "@this 必须大于等于 @p1 且小于 @p2"),
    ("<>=", "@this 必须大于 @p1 且小于等于 @p2"),
    ("<=>=", "@this 必须大于等于 @p1 且小于等于 @p2"),
    ("in", "@this 必须是 @p1 其中之一"),
    ("!in", "@this 必须不是 @p1 其中之一"),
    ("(n)", "@this 必须是数字且在 @p1 之内"),
    ("!(n)", "@this 必须是数字且不在 @p1 之内"),
    ("(s)", "@this 必须是字符串且在 @p1 之内"),
    ("!(s)", "@this 必须是字符串且不在 @p1 之内"),
    ("len=", "@this 长度必须等于 @p1"),
    ("len!=", "@this 长度必须不等于 @p1"),
    ("len>", "@this 长度必须大于 @p1"),
    ("len<", "@this 长度必须小于 @p1"),
    ("len>=", "@this 长度必须大于等于 @p1"),
    ("len<=", "@this 长度必须小于等于 @p1"),
    ("len<>", "@this 长度必须大于 @p1 且小于 @p2"),
    ("len<=>", "@this 长度必须大于等于 @p1 且小于 @p2"),
    ("len<>=", "@this 长度必须大于 @p1 且小于等于 @p2"),
    ("len<=>=", "@this 长度必须大于等于 @p1 且小于等于 @p2"),
    ("int", "@this 必须是整型"),
    ("float", "@this 必须是小数"),
    ("number", "@this 必须是数字"),
    ("string", "@this 必须是字符串"),
    ("bool", "@this 必须是布尔型"),
    ("bool_str", "@this 必须是布尔型字符串"),
    ("array", "@this 必须是数组"),
    ("list", "@this 必须是列表"),
    ("object", "@this 必须是对象"),
    ("email", "@this 必须是邮箱"),
    ("url", "@this 必须是网址"),
    ("ip", "@this 必须是IP地址"),
    ("ipv4", "@this 必须是IPv4地址"),
    ("ipv6", "@this 必须是IPv6地址"),
    ("mac", "@this 必须是MAC地址"),
    ("uuid", "@this 必须是UUID"),
    ("base64", "@this 必须是base64编码"),
    ("date", "@this 必须是日期 (YYYY-MM-DD)"),
    ("datetime", "@this 必须是日期时间 (ISO 8601)"),
    ("time", "@this 必须是时间 (HH:MM:SS)"),
    ("dob", "@this 必须是有效的出生日期"),
    ("alpha", "@this 只能包含字母"),
    ("alpha_num", "@this 只能包含字母和数字"),
];

/// Tag → message table
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ErrorTemplate {
    messages: HashMap<String, String>,
}

impl ErrorTemplate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Built-in table for `language`, if one ships with the crate
    pub fn builtin(language: &str) -> Option<Self> {
        let table = match language.to_ascii_lowercase().as_str() {
            "en" | "en-us" => EN,
            "zh-cn" | "zh" => ZH_CN,
            _ => return None,
        };
        Some(Self::from_pairs(table.iter().copied()))
    }

    /// Load `<dir>/<language>.json`, a flat object of tag → message.
    ///
    /// Returns `Ok(None)` when the file does not exist.
    pub fn load(dir: &Path, language: &str) -> Result<Option<Self>> {
        let path = dir.join(format!("{}.json", language));
        if !path.is_file() {
            return Ok(None);
        }
        let text = std::fs::read_to_string(&path)
            .map_err(|e| RuleError::Language(format!("{}: {}", path.display(), e)))?;
        let messages: HashMap<String, String> = serde_json::from_str(&text)
            .map_err(|e| RuleError::Language(format!("{}: {}", path.display(), e)))?;
        Ok(Some(Self { messages }))
    }

    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            messages: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn get(&self, tag: &str) -> Option<&str> {
        self.messages.get(tag).map(String::as_str)
    }

    /// Overlay `other` onto this template; its tags win.
    pub fn merge(&mut self, other: &ErrorTemplate) {
        for (tag, message) in &other.messages {
            self.messages.insert(tag.clone(), message.clone());
        }
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Replace `@this`, `@p1..@pN` and any extra named placeholders.
///
/// One left-to-right pass: substituted text is never scanned again, and
/// `@p` takes every digit that follows it.
pub fn render(message: &str, field: &str, params: &[String], named: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(message.len());
    let mut rest = message;
    while let Some(at) = rest.find('@') {
        out.push_str(&rest[..at]);
        let tail = &rest[at..];
        match placeholder(tail, field, params, named) {
            Some((value, len)) => {
                out.push_str(value);
                rest = &tail[len..];
            }
            None => {
                out.push('@');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Placeholder at the start of `tail`: its replacement and its length.
fn placeholder<'a>(
    tail: &str,
    field: &'a str,
    params: &'a [String],
    named: &[(&str, &'a str)],
) -> Option<(&'a str, usize)> {
    let longest = named
        .iter()
        .filter(|(name, _)| !name.is_empty() && tail.starts_with(*name))
        .max_by_key(|(name, _)| name.len());
    if let Some((name, value)) = longest {
        return Some((*value, name.len()));
    }
    if tail.starts_with("@this") {
        return Some((field, "@this".len()));
    }

    let digits = tail.strip_prefix("@p")?;
    let len = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    let n: usize = digits[..len].parse().ok()?;
    let param = params.get(n.checked_sub(1)?)?;
    Some((param.as_str(), 2 + len))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_languages() {
        let en = ErrorTemplate::builtin("en").unwrap();
        assert_eq!(en.get("required"), Some("@this can not be empty"));
        assert_eq!(en.get("int"), Some("@this must be integer"));

        let zh = ErrorTemplate::builtin("zh-cn").unwrap();
        assert_eq!(zh.get("required"), Some("@this 不能为空"));
        assert_eq!(zh.len(), en.len());

        assert!(ErrorTemplate::builtin("xx").is_none());
    }

    #[test]
    fn test_merge_overrides() {
        let mut template = ErrorTemplate::builtin("en").unwrap();
        let size = template.len();
        template.merge(&ErrorTemplate::from_pairs([
            ("int", "@this should be a whole number"),
            ("my_check", "@this failed my check"),
        ]));
        assert_eq!(template.get("int"), Some("@this should be a whole number"));
        assert_eq!(template.get("string"), Some("@this must be string"));
        assert_eq!(template.len(), size + 1);
    }

    #[test]
    fn test_render_placeholders() {
        let params: Vec<String> = (1..=10).map(|i| format!("v{}", i)).collect();
        let out = render("@this: @p1 @p10", "age", &params, &[]);
        assert_eq!(out, "age: v1 v10");

        let out = render("@this should be @preg", "name", &[], &[("@preg", "/^a/")]);
        assert_eq!(out, "name should be /^a/");
    }

    #[test]
    fn test_render_does_not_rescan_substitutions() {
        let params = vec!["@thisField".to_string()];
        assert_eq!(
            render("@this must be equal to @p1", "user.name", &params, &[]),
            "user.name must be equal to @thisField"
        );

        let params = vec!["x".to_string()];
        assert_eq!(
            render("@this should be @preg", "code", &params, &[("@preg", "/^@p1$/")]),
            "code should be /^@p1$/"
        );
    }

    #[test]
    fn test_render_leaves_unknown_placeholders() {
        let params = vec!["v1".to_string()];
        assert_eq!(
            render("@p10 @p0 @p @ user@host @p1", "f", &params, &[]),
            "@p10 @p0 @p @ user@host v1"
        );
    }

    #[test]
    fn test_load_missing_file() {
        let dir = std::env::temp_dir();
        let loaded = ErrorTemplate::load(&dir, "no-such-language-for-rules").unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_load_file() {
        let dir = std::env::temp_dir().join("ouroboros-rules-lang-test");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("fr.json"), r#"{"required": "@this est obligatoire"}"#).unwrap();

        let loaded = ErrorTemplate::load(&dir, "fr").unwrap().unwrap();
        assert_eq!(loaded.get("required"), Some("@this est obligatoire"));

        std::fs::write(dir.join("bad.json"), "not json").unwrap();
        assert!(matches!(
            ErrorTemplate::load(&dir, "bad"),
            Err(RuleError::Language(_))
        ));
    }
}
