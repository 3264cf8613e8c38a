//! Form field validators
//!
//! A validator inspects the JSON value of one form field and returns a
//! message when the value is rejected.

use std::sync::Arc;

use serde_json::Value;
use validator::ValidateLength;

use crate::notification::MessageKey;

/// Per-field validation function
pub type Validator = Arc<dyn Fn(&Value) -> Option<MessageKey> + Send + Sync>;

/// Require a string of `min..=max` characters.
///
/// With `allow_empty`, a missing value, `null` or `""` passes.
pub fn limited_string(min: usize, max: usize, allow_empty: bool) -> Validator {
    Arc::new(move |value| {
        let text = value.as_str().unwrap_or_default();
        if allow_empty && text.is_empty() {
            return None;
        }
        if !text.is_empty() && text.validate_length(Some(min as u64), Some(max as u64), None) {
            None
        } else {
            Some(MessageKey::LimitedString { min, max })
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_limited_string_bounds() {
        let validate = limited_string(2, 5, false);

        assert_eq!(validate(&json!("ab")), None);
        assert_eq!(validate(&json!("abcde")), None);
        assert_eq!(
            validate(&json!("a")),
            Some(MessageKey::LimitedString { min: 2, max: 5 })
        );
        assert!(validate(&json!("abcdef")).is_some());
    }

    #[test]
    fn test_limited_string_empty_values() {
        let strict = limited_string(0, 5, false);
        assert!(strict(&json!("")).is_some());
        assert!(strict(&Value::Null).is_some());

        let lenient = limited_string(2, 5, true);
        assert_eq!(lenient(&json!("")), None);
        assert_eq!(lenient(&Value::Null), None);
        assert!(lenient(&json!("a")).is_some());
    }

    #[test]
    fn test_limited_string_counts_characters() {
        let validate = limited_string(1, 3, false);
        assert_eq!(validate(&json!("äöü")), None);
    }
}
