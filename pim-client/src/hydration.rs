//! Property hydration
//!
//! Joins product variants with their typed property relations and the
//! referenced property definitions. Two fetch phases run per hydration:
//!
//! 1. all relations of the current parents, one request per kind
//! 2. the definitions those relations reference, one request per kind
//!
//! Kinds within a phase run concurrently, each through its own request slot.
//! A failed fetch leaves its pool as it was and the other kinds continue, so
//! a hydration may be partial.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use shared::models::{
    BooleanConstraints, BooleanProperty, NumericConstraints, NumericProperty,
    ProductVariant, ProductVariantBooleanProperty, ProductVariantNumericProperty,
    ProductVariantRelation, ProductVariantStringProperty, PropertyDefinition, StringConstraints,
    StringProperty,
};
use shared::util::unique;
use shared::{Entity, SearchParameters};

use crate::abort::{AbortSlots, RequestToken};
use crate::error::ClientResult;
use crate::notification::{MessageKey, NotificationSink};
use crate::service::DynReadService;

/// Filter selecting relations by comma-separated product variant ids
pub const PRODUCT_VARIANT_IDS_FILTER: &str = "productVariantIds";

/// Request slot of one pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PoolKey {
    BooleanProperties,
    NumericProperties,
    StringProperties,
    ProductVariantBooleanProperties,
    ProductVariantNumericProperties,
    ProductVariantStringProperties,
}

/// A relation value joined with its property definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HydratedProperty<T, C> {
    /// Property definition id
    pub id: String,
    pub name: String,
    pub value: T,
    pub relation_id: String,
    #[serde(flatten)]
    pub constraints: C,
}

pub type HydratedBooleanProperty = HydratedProperty<bool, BooleanConstraints>;
pub type HydratedNumericProperty = HydratedProperty<f64, NumericConstraints>;
pub type HydratedStringProperty = HydratedProperty<String, StringConstraints>;

/// Parent entity with its properties keyed by property name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HydratedProductVariant<P = ProductVariant> {
    #[serde(flatten)]
    pub parent: P,
    pub boolean_properties: BTreeMap<String, HydratedBooleanProperty>,
    pub numeric_properties: BTreeMap<String, HydratedNumericProperty>,
    pub string_properties: BTreeMap<String, HydratedStringProperty>,
}

/// Read services of the six pools
#[derive(Clone)]
pub struct PropertyServices {
    pub boolean_properties: DynReadService<BooleanProperty>,
    pub numeric_properties: DynReadService<NumericProperty>,
    pub string_properties: DynReadService<StringProperty>,
    pub product_variant_boolean_properties: DynReadService<ProductVariantBooleanProperty>,
    pub product_variant_numeric_properties: DynReadService<ProductVariantNumericProperty>,
    pub product_variant_string_properties: DynReadService<ProductVariantStringProperty>,
}

#[derive(Default)]
struct Pools {
    boolean_properties: Vec<BooleanProperty>,
    numeric_properties: Vec<NumericProperty>,
    string_properties: Vec<StringProperty>,
    product_variant_boolean_properties: Vec<ProductVariantBooleanProperty>,
    product_variant_numeric_properties: Vec<ProductVariantNumericProperty>,
    product_variant_string_properties: Vec<ProductVariantStringProperty>,
}

/// Index definitions by id
fn index_by_id<D: Entity>(definitions: &[D]) -> HashMap<&str, &D> {
    definitions.iter().map(|d| (d.id(), d)).collect()
}

/// Join the relations of `parent_id` with their definitions, keyed by
/// property name.
///
/// Relations of other parents or with an unknown definition are skipped. If
/// two relations resolve to the same name the later one wins.
pub fn hydrate_properties<T: Clone, D: PropertyDefinition>(
    parent_id: &str,
    relations: &[ProductVariantRelation<T>],
    definitions: &HashMap<&str, &D>,
) -> BTreeMap<String, HydratedProperty<T, D::Constraints>> {
    relations
        .iter()
        .filter(|relation| relation.product_variant_id == parent_id)
        .filter_map(|relation| {
            let definition = definitions.get(relation.property_id.as_str())?;
            let hydrated = HydratedProperty {
                id: definition.id().to_string(),
                name: definition.name().to_string(),
                value: relation.value.clone(),
                relation_id: relation.id.clone(),
                constraints: definition.constraints(),
            };
            Some((hydrated.name.clone(), hydrated))
        })
        .collect()
}

/// Hydration engine for a set of parent entities
pub struct ProductVariantFactory<P = ProductVariant> {
    services: PropertyServices,
    notifications: Arc<dyn NotificationSink>,
    requests: AbortSlots<PoolKey>,
    parents: RwLock<Vec<P>>,
    pools: RwLock<Pools>,
    hydrated: RwLock<Vec<HydratedProductVariant<P>>>,
    /// Bumped by every `hydrate()`; only the latest call publishes
    generation: AtomicU64,
}

impl<P> ProductVariantFactory<P>
where
    P: Entity + Clone + Send + Sync + 'static,
{
    pub fn new(services: PropertyServices, notifications: Arc<dyn NotificationSink>) -> Self {
        Self {
            services,
            notifications,
            requests: AbortSlots::new(),
            parents: RwLock::new(Vec::new()),
            pools: RwLock::new(Pools::default()),
            hydrated: RwLock::new(Vec::new()),
            generation: AtomicU64::new(0),
        }
    }

    pub fn set_parents(&self, parents: Vec<P>) {
        *self.parents.write() = parents;
    }

    pub fn parents(&self) -> Vec<P> {
        self.parents.read().clone()
    }

    pub fn hydrated(&self) -> Vec<HydratedProductVariant<P>> {
        self.hydrated.read().clone()
    }

    pub fn boolean_properties(&self) -> Vec<BooleanProperty> {
        self.pools.read().boolean_properties.clone()
    }

    pub fn numeric_properties(&self) -> Vec<NumericProperty> {
        self.pools.read().numeric_properties.clone()
    }

    pub fn string_properties(&self) -> Vec<StringProperty> {
        self.pools.read().string_properties.clone()
    }

    pub fn product_variant_boolean_properties(&self) -> Vec<ProductVariantBooleanProperty> {
        self.pools.read().product_variant_boolean_properties.clone()
    }

    pub fn product_variant_numeric_properties(&self) -> Vec<ProductVariantNumericProperty> {
        self.pools.read().product_variant_numeric_properties.clone()
    }

    pub fn product_variant_string_properties(&self) -> Vec<ProductVariantStringProperty> {
        self.pools.read().product_variant_string_properties.clone()
    }

    /// Refetch relations and definitions for the current parents and
    /// rebuild the hydrated records.
    ///
    /// A call overtaken by a newer `hydrate()` publishes nothing and returns
    /// the currently published records.
    pub async fn hydrate(&self) -> Vec<HydratedProductVariant<P>> {
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        self.load_relations().await;
        self.load_definitions().await;
        if self.generation.load(Ordering::Acquire) != generation {
            tracing::debug!("Superseded hydration discarded");
            return self.hydrated();
        }

        let hydrated = {
            let pools = self.pools.read();
            let boolean_index = index_by_id(&pools.boolean_properties);
            let numeric_index = index_by_id(&pools.numeric_properties);
            let string_index = index_by_id(&pools.string_properties);

            self.parents
                .read()
                .iter()
                .map(|parent| HydratedProductVariant {
                    boolean_properties: hydrate_properties(
                        parent.id(),
                        &pools.product_variant_boolean_properties,
                        &boolean_index,
                    ),
                    numeric_properties: hydrate_properties(
                        parent.id(),
                        &pools.product_variant_numeric_properties,
                        &numeric_index,
                    ),
                    string_properties: hydrate_properties(
                        parent.id(),
                        &pools.product_variant_string_properties,
                        &string_index,
                    ),
                    parent: parent.clone(),
                })
                .collect::<Vec<_>>()
        };

        tracing::debug!(parents = hydrated.len(), "Product variants hydrated");
        *self.hydrated.write() = hydrated.clone();
        hydrated
    }

    async fn load_relations(&self) {
        let parent_ids = self
            .parents
            .read()
            .iter()
            .map(|parent| parent.id().to_string())
            .collect::<Vec<_>>()
            .join(",");
        let params = SearchParameters::unbounded().with_filter(PRODUCT_VARIANT_IDS_FILTER, parent_ids);

        let (boolean, numeric, string) = tokio::join!(
            self.load_relation_pool(
                PoolKey::ProductVariantBooleanProperties,
                &self.services.product_variant_boolean_properties,
                &params,
            ),
            self.load_relation_pool(
                PoolKey::ProductVariantNumericProperties,
                &self.services.product_variant_numeric_properties,
                &params,
            ),
            self.load_relation_pool(
                PoolKey::ProductVariantStringProperties,
                &self.services.product_variant_string_properties,
                &params,
            ),
        );

        let mut pools = self.pools.write();
        if let Some(relations) = boolean {
            pools.product_variant_boolean_properties = relations;
        }
        if let Some(relations) = numeric {
            pools.product_variant_numeric_properties = relations;
        }
        if let Some(relations) = string {
            pools.product_variant_string_properties = relations;
        }
    }

    async fn load_definitions(&self) {
        let (boolean_ids, numeric_ids, string_ids) = {
            let pools = self.pools.read();
            (
                unique(pools.product_variant_boolean_properties.iter().map(|r| r.property_id.clone())),
                unique(pools.product_variant_numeric_properties.iter().map(|r| r.property_id.clone())),
                unique(pools.product_variant_string_properties.iter().map(|r| r.property_id.clone())),
            )
        };

        let (boolean, numeric, string) = tokio::join!(
            self.load_definition_pool(
                PoolKey::BooleanProperties,
                &self.services.boolean_properties,
                boolean_ids,
            ),
            self.load_definition_pool(
                PoolKey::NumericProperties,
                &self.services.numeric_properties,
                numeric_ids,
            ),
            self.load_definition_pool(
                PoolKey::StringProperties,
                &self.services.string_properties,
                string_ids,
            ),
        );

        let mut pools = self.pools.write();
        if let Some(definitions) = boolean {
            pools.boolean_properties = definitions;
        }
        if let Some(definitions) = numeric {
            pools.numeric_properties = definitions;
        }
        if let Some(definitions) = string {
            pools.string_properties = definitions;
        }
    }

    async fn load_relation_pool<T>(
        &self,
        key: PoolKey,
        service: &DynReadService<ProductVariantRelation<T>>,
        params: &SearchParameters,
    ) -> Option<Vec<ProductVariantRelation<T>>>
    where
        T: Clone + Send + Sync + 'static,
    {
        let token = self.requests.start(key);
        let result = token
            .run(service.get_multiple(params, token.signal()))
            .await
            .map(|page| page.data);
        self.finish(key, &token, result)
    }

    /// Fetch definitions by id, sorted by name. No ids means no request.
    async fn load_definition_pool<D>(
        &self,
        key: PoolKey,
        service: &DynReadService<D>,
        ids: Vec<String>,
    ) -> Option<Vec<D>>
    where
        D: PropertyDefinition + Clone + Send + Sync + 'static,
    {
        if ids.is_empty() {
            self.requests.cancel(&key);
            return None;
        }

        let token = self.requests.start(key);
        let result = token
            .run(service.get_multiple_by_ids(&ids, None, token.signal()))
            .await;
        let mut definitions = self.finish(key, &token, result)?;
        definitions.sort_by(|a, b| a.name().cmp(b.name()));
        Some(definitions)
    }

    fn finish<V>(
        &self,
        key: PoolKey,
        token: &RequestToken,
        result: ClientResult<Vec<V>>,
    ) -> Option<Vec<V>> {
        self.requests.clear(&key, token);
        match result {
            Ok(data) => Some(data),
            Err(e) if e.is_cancelled() => {
                tracing::debug!(pool = ?key, "Superseded pool load discarded");
                None
            }
            Err(e) => {
                tracing::warn!(pool = ?key, error = %e, "Failed to load pool");
                self.notifications.error(MessageKey::DataNotLoaded);
                None
            }
        }
    }
}
