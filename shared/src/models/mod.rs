//! Data models
//!
//! Catalog entities as the REST backend serializes them (camelCase JSON).
//! All IDs are opaque strings (UUIDs on the server side).

pub mod product_variant;
pub mod property;
pub mod relation;
pub mod serde_helpers;

// Re-exports
pub use product_variant::*;
pub use property::*;
pub use relation::*;

/// Any record carrying a stable unique identifier.
pub trait Entity {
    fn id(&self) -> &str;
}
