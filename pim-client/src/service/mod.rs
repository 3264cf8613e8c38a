//! Entity service contract
//!
//! One service per entity kind. The read side is all a searchable collection
//! or the hydration engine needs; forms add create/patch and the relation
//! editor also deletes.

pub mod rest;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use shared::{PaginatedList, SearchParameters};
use tokio_util::sync::CancellationToken;

use crate::error::ClientResult;

pub use rest::RestService;

/// Read operations of an entity endpoint
#[async_trait]
pub trait ReadService: Send + Sync {
    type View: Clone + Send + Sync + 'static;

    /// One page of records plus the server's pagination headers
    async fn get_multiple(
        &self,
        params: &SearchParameters,
        signal: &CancellationToken,
    ) -> ClientResult<PaginatedList<Self::View>>;

    /// Exactly the listed records, pagination ignored
    async fn get_multiple_by_ids(
        &self,
        ids: &[String],
        params: Option<&SearchParameters>,
        signal: &CancellationToken,
    ) -> ClientResult<Vec<Self::View>>;

    /// The record with `id`, or the server's default record for it
    async fn get_one_or_default(&self, id: &str) -> ClientResult<Self::View>;
}

/// Read/create/patch operations of an entity endpoint
#[async_trait]
pub trait EntityService: ReadService {
    type Create: Send + Sync + 'static;
    type Patch: Send + Sync + 'static;

    async fn create(&self, entities: &[Self::Create]) -> ClientResult<Vec<Self::View>>;

    /// Patch several records at once, keyed by id
    async fn patch(
        &self,
        patches: &BTreeMap<String, Self::Patch>,
    ) -> ClientResult<BTreeMap<String, Self::View>>;
}

/// Entity endpoint that also supports deletion
#[async_trait]
pub trait DeletableService: EntityService {
    async fn delete(&self, ids: &[String]) -> ClientResult<()>;
}

/// Shared read-only service handle
pub type DynReadService<V> = Arc<dyn ReadService<View = V>>;
