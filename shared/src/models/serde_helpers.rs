//! Serde helpers for patch payloads
//!
//! Nullable patch fields are `Option<Option<T>>`: `None` leaves the field
//! out of the body, `Some(None)` sends `null` and clears the stored value.
//! Use together with `#[serde(default, skip_serializing_if = "Option::is_none")]`.

use serde::{Deserialize, Deserializer};

/// Deserialize a present field (including `null`) as `Some(..)`
pub fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
