//! Request types for the shared crate
//!
//! Query parameters accepted by every list endpoint of the catalog API.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Page size meaning "return every record"
pub const UNBOUNDED_PAGE_SIZE: i32 = -1;

/// Additional endpoint-specific filters (e.g. `productVariantIds`)
pub type Filters = BTreeMap<String, String>;

/// Sort direction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

impl std::fmt::Display for SortDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// List query parameters
///
/// Serialized as a flat query string; `filters` are merged in next to the
/// standard fields. Endpoints ignore parameters they cannot use.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParameters {
    /// Free-text search
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_query: Option<String>,

    /// Page number (1-based)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,

    /// Items per page (`-1` = unbounded)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<i32>,

    /// Ordering as `"<field> <asc|desc>"`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_by: Option<String>,

    #[serde(flatten)]
    pub filters: Filters,
}

impl SearchParameters {
    /// Parameters returning every record
    pub fn unbounded() -> Self {
        Self {
            page_size: Some(UNBOUNDED_PAGE_SIZE),
            ..Self::default()
        }
    }

    pub fn with_filter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.insert(key.into(), value.into());
        self
    }

    pub fn order_by(mut self, field: &str, direction: SortDirection) -> Self {
        self.order_by = Some(format!("{} {}", field, direction));
        self
    }
}
