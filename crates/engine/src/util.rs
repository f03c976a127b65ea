//! Internal helpers for input validation and normalization.
//!
//! These utilities are **not** part of the public API. They centralize
//! validation so every service enforces the same invariants.

use unicode_normalization::UnicodeNormalization;

use crate::{EngineError, ResultEngine};

pub(crate) const MAX_NAME_LEN: usize = 64;

/// Trim a required display name and reject empty or oversized values.
pub(crate) fn normalize_required_name(value: &str, label: &str) -> ResultEngine<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EngineError::InvalidName(format!(
            "{label} name must not be empty"
        )));
    }
    if trimmed.chars().count() > MAX_NAME_LEN {
        return Err(EngineError::InvalidName(format!(
            "{label} name must be at most {MAX_NAME_LEN} characters"
        )));
    }
    Ok(trimmed.to_string())
}

pub(crate) fn normalize_optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

/// Lowercase and trim an email address; requires a single `@` with a
/// non-empty local part and domain.
pub(crate) fn normalize_email(value: &str) -> ResultEngine<String> {
    let email = value.trim().to_lowercase();
    let mut parts = email.split('@');
    let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(EngineError::InvalidName(format!("invalid email: {value}")));
    };
    if local.is_empty() || domain.is_empty() || email.chars().any(char::is_whitespace) {
        return Err(EngineError::InvalidName(format!("invalid email: {value}")));
    }
    Ok(email)
}

/// Comparison key for category names: NFKC, lowercase, single spaces.
pub(crate) fn normalize_category_key(value: &str) -> ResultEngine<String> {
    let folded: String = value.nfkc().collect::<String>().to_lowercase();
    let key = folded.split_whitespace().collect::<Vec<_>>().join(" ");
    if key.is_empty() {
        return Err(EngineError::InvalidName(
            "category name must not be empty".to_string(),
        ));
    }
    Ok(key)
}

/// Accepts `#RRGGBB` (any case) and returns it upper-cased.
pub(crate) fn normalize_color(value: &str) -> ResultEngine<String> {
    let trimmed = value.trim();
    let valid = trimmed.len() == 7
        && trimmed.starts_with('#')
        && trimmed[1..].chars().all(|c| c.is_ascii_hexdigit());
    if !valid {
        return Err(EngineError::InvalidName(format!(
            "invalid color: {value} (expected #RRGGBB)"
        )));
    }
    Ok(trimmed.to_ascii_uppercase())
}

pub(crate) fn require_positive_amount(amount_minor: i64, label: &str) -> ResultEngine<i64> {
    if amount_minor <= 0 {
        return Err(EngineError::InvalidAmount(format!("{label} must be > 0")));
    }
    Ok(amount_minor)
}

/// Settings must be a JSON object; `None` becomes `{}`.
pub(crate) fn settings_to_text(settings: Option<&serde_json::Value>) -> ResultEngine<String> {
    match settings {
        None => Ok("{}".to_string()),
        Some(value @ serde_json::Value::Object(_)) => Ok(value.to_string()),
        Some(_) => Err(EngineError::InvalidSettings(
            "settings must be a JSON object".to_string(),
        )),
    }
}

pub(crate) fn settings_from_text(value: &str) -> ResultEngine<serde_json::Value> {
    serde_json::from_str(value)
        .map_err(|_| EngineError::InvalidSettings("stored settings are not valid JSON".to_string()))
}
