use std::collections::HashSet;
use std::hash::Hash;

/// Lower-case the first character, leave the rest untouched
/// (`"Name"` -> `"name"`, `"MinValue"` -> `"minValue"`).
pub fn decapitalize_first_letter(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Drop duplicates, keeping the first occurrence order.
pub fn unique<T: Eq + Hash + Clone>(values: impl IntoIterator<Item = T>) -> Vec<T> {
    let mut seen = HashSet::new();
    values
        .into_iter()
        .filter(|value| seen.insert(value.clone()))
        .collect()
}
