//! PIM Client - catalog admin client core
//!
//! Stateful building blocks for a product information admin UI, talking to
//! the catalog REST backend:
//!
//! - [`Searchable`]: paginated, sorted, filterable collections
//! - [`FormEditor`]: create/edit forms with diffing and validation
//! - [`ProductVariantFactory`]: property hydration of product variants
//! - [`RelationManager`]: pending relation edits and their batch save
//!
//! Outcomes are reported through an injected [`NotificationSink`];
//! credentials come from a [`SessionProvider`].

pub mod abort;
pub mod config;
pub mod editable;
pub mod error;
pub mod form;
pub mod hydration;
pub mod logger;
pub mod notification;
pub mod relations;
pub mod searchable;
pub mod service;
pub mod session;
pub mod validation;

pub use abort::{AbortSlot, AbortSlots, RequestToken};
pub use config::ClientConfig;
pub use editable::CreateEditToggle;
pub use error::{ClientError, ClientResult, LoadStatus};
pub use form::{FormEditor, FormEvent, Saved};
pub use hydration::{
    HydratedProductVariant, HydratedProperty, PoolKey, ProductVariantFactory, PropertyServices,
};
pub use notification::{
    MessageKey, Notification, NotificationKind, NotificationSink, NotificationStore,
};
pub use relations::{DataTableActionEvent, PendingChanges, RelationManager, RelationRow, SelectOption};
pub use searchable::{LoadHook, SearchState, Searchable};
pub use service::{DeletableService, DynReadService, EntityService, ReadService, RestService};
pub use session::{SessionProvider, TokenSession};
pub use validation::{Validator, limited_string};

// Re-export shared types for convenience
pub use shared::models;
pub use shared::{Filters, PaginatedList, Pagination, SearchParameters, SortDirection};
