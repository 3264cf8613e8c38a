//! Validation error body returned by the catalog API
//!
//! A rejected create/patch answers HTTP 400 with
//!
//! ```json
//! { "errors": { "[0].Name": ["must not be empty"], "[2].MaxValue": ["..."] } }
//! ```
//!
//! Keys address the submitted entity by position and the property by its
//! server-side (PascalCase) name.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::util::decapitalize_first_letter;

static ERROR_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[(\d+)\]\.(\w+)").expect("error key pattern is valid")
});

/// Per-property messages for one submitted entity
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Field errors keyed by submitted entity position
pub type IndexedFieldErrors = BTreeMap<usize, FieldErrors>;

/// HTTP 400 response body
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponseBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<BTreeMap<String, Vec<String>>>,
}

impl ErrorResponseBody {
    /// Whether the body carries structured field errors
    pub fn has_field_errors(&self) -> bool {
        self.errors.is_some()
    }

    /// Demultiplex `"[index].Property"` keys by entity position, property
    /// names decapitalized. Positions without errors are absent; keys not
    /// matching the pattern or with an unparsable index are skipped.
    pub fn indexed_field_errors(&self) -> IndexedFieldErrors {
        let mut indexed = IndexedFieldErrors::new();
        let Some(errors) = &self.errors else {
            return indexed;
        };

        for (key, messages) in errors {
            let Some(captures) = ERROR_KEY.captures(key) else {
                continue;
            };
            let Ok(index) = captures[1].parse::<usize>() else {
                continue;
            };
            indexed
                .entry(index)
                .or_default()
                .insert(decapitalize_first_letter(&captures[2]), messages.clone());
        }
        indexed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indexed_field_errors() {
        let body: ErrorResponseBody = serde_json::from_str(
            r#"{"errors":{"[0].Name":["too short"],"[2].MaxValue":["below min","not a number"]}}"#,
        )
        .unwrap();

        let indexed = body.indexed_field_errors();
        assert_eq!(indexed.len(), 2);
        assert_eq!(indexed[&0]["name"], vec!["too short"]);
        assert!(!indexed.contains_key(&1));
        assert_eq!(indexed[&2]["maxValue"], vec!["below min", "not a number"]);
    }

    #[test]
    fn test_huge_indices_do_not_allocate_or_overflow() {
        let body: ErrorResponseBody = serde_json::from_str(
            r#"{"errors":{
                "[50000000].Name":["too short"],
                "[18446744073709551615].MinValue":["invalid"],
                "[99999999999999999999999].MaxValue":["unparsable"]
            }}"#,
        )
        .unwrap();

        let indexed = body.indexed_field_errors();
        assert_eq!(indexed.len(), 2);
        assert_eq!(indexed[&50_000_000]["name"], vec!["too short"]);
        assert_eq!(indexed[&usize::MAX]["minValue"], vec!["invalid"]);
    }

    #[test]
    fn test_unmatched_keys_are_skipped() {
        let body: ErrorResponseBody =
            serde_json::from_str(r#"{"errors":{"Name":["required"]}}"#).unwrap();

        assert!(body.has_field_errors());
        assert!(body.indexed_field_errors().is_empty());
    }

    #[test]
    fn test_body_without_errors() {
        let body: ErrorResponseBody = serde_json::from_str(r#"{"title":"Bad Request"}"#).unwrap();
        assert!(!body.has_field_errors());
    }
}
