//! Name validation for devices and commands

use crate::error::CoreError;
use serde::Deserialize;

/// Maximum length of a normalized name
pub const MAX_NAME_LEN: usize = 100;

/// Validate and normalize a device or command name.
///
/// Trims the input, collapses whitespace runs to single spaces, and accepts
/// only letters, digits, spaces, hyphens and underscores, 1 to 100
/// characters after collapsing. The returned form is the storage key, so
/// every lookup and insert goes through here.
pub fn validate_name(raw: &str) -> Result<String, CoreError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(CoreError::InvalidName(raw.to_string()));
    }

    if !trimmed
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c.is_whitespace() || c == '-' || c == '_')
    {
        return Err(CoreError::InvalidName(raw.to_string()));
    }

    let normalized = trimmed.split_whitespace().collect::<Vec<_>>().join(" ");
    if normalized.len() > MAX_NAME_LEN {
        return Err(CoreError::InvalidName(raw.to_string()));
    }

    Ok(normalized)
}

/// Caller-supplied name that may arrive as a JSON string or number.
///
/// Remote controls get numbered freely, so `123` and `"123"` must address
/// the same entry. The numeric form is coerced to its decimal string before
/// validation.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum NameValue {
    Text(String),
    Number(i64),
}

impl NameValue {
    /// The string form handed to [`validate_name`].
    #[must_use] pub fn into_string(self) -> String {
        match self {
            NameValue::Text(text) => text,
            NameValue::Number(number) => number.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_and_normalizes_valid_names() {
        assert_eq!(validate_name("TV").unwrap(), "TV");
        assert_eq!(validate_name("  Living  Room   TV  ").unwrap(), "Living Room TV");
        assert_eq!(validate_name("vol_up-2").unwrap(), "vol_up-2");
        assert_eq!(validate_name("tv\tpower").unwrap(), "tv power");
    }

    #[test]
    fn rejects_empty_and_whitespace_only() {
        assert!(validate_name("").is_err());
        assert!(validate_name("   ").is_err());
        assert!(validate_name("\t\n").is_err());
    }

    #[test]
    fn rejects_forbidden_characters() {
        assert!(validate_name("tv!power").is_err());
        assert!(validate_name("tv/power").is_err());
        assert!(validate_name("tv.power").is_err());
        assert!(validate_name("téléviseur").is_err());
    }

    #[test]
    fn enforces_length_after_collapsing() {
        let exact = "a".repeat(100);
        assert_eq!(validate_name(&exact).unwrap(), exact);

        let too_long = "a".repeat(101);
        assert!(validate_name(&too_long).is_err());

        // 101 raw characters that collapse to under the limit
        let padded = format!("a{}b", " ".repeat(99));
        assert_eq!(validate_name(&padded).unwrap(), "a b");
    }

    #[test]
    fn numeric_names_coerce_to_strings() {
        let value: NameValue = serde_json::from_value(json!(123)).unwrap();
        assert_eq!(value.into_string(), "123");

        let value: NameValue = serde_json::from_value(json!("123")).unwrap();
        assert_eq!(value.into_string(), "123");

        let value: NameValue = serde_json::from_value(json!(-7)).unwrap();
        assert_eq!(validate_name(&value.into_string()).unwrap(), "-7");
    }
}
