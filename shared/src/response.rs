//! API Response types
//!
//! List endpoints return the records as the JSON body and report pagination
//! through four response headers. The server is authoritative for all four.

use http::HeaderMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Current page header
pub const HEADER_PAGE: &str = "pagination.page";
/// Total pages header
pub const HEADER_TOTAL_PAGES: &str = "pagination.totalpages";
/// Page size header
pub const HEADER_PAGE_SIZE: &str = "pagination.pagesize";
/// Total record count header
pub const HEADER_TOTAL_COUNT: &str = "pagination.totalcount";

/// Pagination header parse failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaginationError {
    #[error("missing pagination header: {0}")]
    Missing(&'static str),

    #[error("invalid pagination header {header}: {value:?}")]
    Invalid { header: &'static str, value: String },
}

/// Pagination metadata
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    /// Current page number (1-based)
    pub page: u32,
    /// Total number of pages
    pub total_pages: u32,
    /// Items per page (`-1` = unbounded)
    pub page_size: i32,
    /// Total number of items
    pub total_count: u64,
}

impl Pagination {
    /// Read the four pagination headers. Header names are case-insensitive.
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, PaginationError> {
        Ok(Self {
            page: parse_header(headers, HEADER_PAGE)?,
            total_pages: parse_header(headers, HEADER_TOTAL_PAGES)?,
            page_size: parse_header(headers, HEADER_PAGE_SIZE)?,
            total_count: parse_header(headers, HEADER_TOTAL_COUNT)?,
        })
    }

    /// Write the four pagination headers (used by test servers)
    pub fn to_header_pairs(&self) -> [(&'static str, String); 4] {
        [
            (HEADER_PAGE, self.page.to_string()),
            (HEADER_TOTAL_PAGES, self.total_pages.to_string()),
            (HEADER_PAGE_SIZE, self.page_size.to_string()),
            (HEADER_TOTAL_COUNT, self.total_count.to_string()),
        ]
    }
}

fn parse_header<T: std::str::FromStr>(
    headers: &HeaderMap,
    name: &'static str,
) -> Result<T, PaginationError> {
    let raw = headers.get(name).ok_or(PaginationError::Missing(name))?;
    let text = raw.to_str().map_err(|_| PaginationError::Invalid {
        header: name,
        value: String::from_utf8_lossy(raw.as_bytes()).into_owned(),
    })?;
    text.trim().parse().map_err(|_| PaginationError::Invalid {
        header: name,
        value: text.to_string(),
    })
}

/// One page of records plus its pagination headers
#[derive(Debug, Clone, PartialEq)]
pub struct PaginatedList<T> {
    pub data: Vec<T>,
    pub pagination: Pagination,
}

impl<T> PaginatedList<T> {
    pub fn new(data: Vec<T>, pagination: Pagination) -> Self {
        Self { data, pagination }
    }
}
