//! Format checks for common string patterns
//!
//! Pre-compiled regexes (and a few std/chrono parses) behind the format
//! predicates: email, URL, IP, MAC, UUID, base64, dates and times.

use chrono::{Local, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

// ============================================================================
// Pre-compiled Regex Patterns
// ============================================================================

/// Email regex pattern (RFC 5322 simplified)
static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap()
});

/// URL regex pattern (http/https)
static URL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^https?://[^\s/$.?#].[^\s]*$").unwrap()
});

/// UUID regex pattern (any version, hyphenated)
static UUID_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$")
        .unwrap()
});

/// MAC address, `:` or `-` separated
static MAC_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[0-9a-fA-F]{2}:){5}[0-9a-fA-F]{2}$|^(?:[0-9a-fA-F]{2}-){5}[0-9a-fA-F]{2}$")
        .unwrap()
});

/// Standard base64 alphabet with padding
static BASE64_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[A-Za-z0-9+/]{4})*(?:[A-Za-z0-9+/]{2}==|[A-Za-z0-9+/]{3}=)?$").unwrap()
});

/// ISO 8601 DateTime regex pattern
static DATETIME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(\.\d{1,9})?(Z|[+-]\d{2}:\d{2})$").unwrap()
});

/// Time regex pattern (HH:MM:SS with optional fractional seconds)
static TIME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([01]\d|2[0-3]):([0-5]\d):([0-5]\d)(\.\d{1,9})?$").unwrap()
});

// ============================================================================
// Format Checks
// ============================================================================

/// Validate email format
///
/// # Example
/// ```
/// use ouroboros_rules::formats::validate_email;
///
/// assert!(validate_email("user@example.com"));
/// assert!(!validate_email("invalid-email"));
/// ```
pub fn validate_email(value: &str) -> bool {
    EMAIL_REGEX.is_match(value)
}

/// Validate URL format (http/https)
pub fn validate_url(value: &str) -> bool {
    URL_REGEX.is_match(value)
}

/// IPv4 or IPv6 address
pub fn validate_ip(value: &str) -> bool {
    value.parse::<IpAddr>().is_ok()
}

pub fn validate_ipv4(value: &str) -> bool {
    value.parse::<Ipv4Addr>().is_ok()
}

pub fn validate_ipv6(value: &str) -> bool {
    value.parse::<Ipv6Addr>().is_ok()
}

pub fn validate_mac(value: &str) -> bool {
    MAC_REGEX.is_match(value)
}

/// Validate UUID format
///
/// # Example
/// ```
/// use ouroboros_rules::formats::validate_uuid;
///
/// assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000"));
/// assert!(!validate_uuid("not-a-uuid"));
/// ```
pub fn validate_uuid(value: &str) -> bool {
    UUID_REGEX.is_match(value)
}

/// Non-empty standard base64
pub fn validate_base64(value: &str) -> bool {
    !value.is_empty() && BASE64_REGEX.is_match(value)
}

/// Validate ISO 8601 DateTime format
pub fn validate_datetime(value: &str) -> bool {
    DATETIME_REGEX.is_match(value)
}

/// Calendar date in `YYYY-MM-DD`
pub fn validate_date(value: &str) -> bool {
    parse_date(value).is_some()
}

/// Validate time format (HH:MM:SS with optional fractional seconds)
pub fn validate_time(value: &str) -> bool {
    TIME_REGEX.is_match(value)
}

/// Date of birth: a real `YYYY-MM-DD` date that is not in the future
pub fn validate_dob(value: &str) -> bool {
    parse_date(value).is_some_and(|date| date <= Local::now().date_naive())
}

/// Letters only (Unicode aware)
pub fn validate_alpha(value: &str) -> bool {
    !value.is_empty() && value.chars().all(char::is_alphabetic)
}

/// Letters and digits only (Unicode aware)
pub fn validate_alpha_num(value: &str) -> bool {
    !value.is_empty() && value.chars().all(char::is_alphanumeric)
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    if value.len() != 10 {
        return None;
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}
