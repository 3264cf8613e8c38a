//! Shared types for the PIM admin client
//!
//! Wire contracts consumed from the catalog REST backend: entity models,
//! search parameters, pagination headers and the validation error body.

pub mod error;
pub mod models;
pub mod request;
pub mod response;
pub mod util;

// Re-exports
pub use http;
pub use serde::{Deserialize, Serialize};

pub use error::{ErrorResponseBody, IndexedFieldErrors};
pub use models::Entity;
pub use request::{Filters, SearchParameters, SortDirection, UNBOUNDED_PAGE_SIZE};
pub use response::{PaginatedList, Pagination};
