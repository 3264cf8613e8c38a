//! Relation editor
//!
//! Edits the property relations of one product variant for a single
//! property kind. Edits are collected in caller-owned [`PendingChanges`]
//! and written back by [`RelationManager::save`]:
//!
//! - drafts in `to_create` become new relations
//! - loaded relations in `to_patch` get their value patched
//! - property ids in `to_delete` have their relations deleted
//!
//! Pending sets are only ever replaced as a whole, so subscribers observe
//! every change.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use shared::Entity;
use shared::models::{
    CreateProductVariantRelation, PatchProductVariantRelation, ProductVariantRelation,
    PropertyDefinition,
};
use tokio::sync::watch;

use crate::error::LoadStatus;
use crate::hydration::{HydratedProperty, PRODUCT_VARIANT_IDS_FILTER};
use crate::notification::{MessageKey, NotificationSink};
use crate::searchable::Searchable;
use crate::service::{DeletableService, ReadService};

pub const ACTION_DELETE: &str = "delete";
pub const ACTION_RESTORE: &str = "restore";

/// Choice in a select input; `None` is the placeholder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    pub value: Option<String>,
    /// Display text, or a translation key for the placeholder
    pub label: String,
}

/// Row action offered by a data table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataTableAction {
    pub name: &'static str,
    /// Translation key
    pub label: &'static str,
}

/// Row action triggered in a data table; `value` is a property id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataTableActionEvent {
    pub name: String,
    #[serde(default)]
    pub value: Option<String>,
}

/// Row of the relation table
#[derive(Debug, Clone, PartialEq)]
pub enum RelationRow<T> {
    Existing(ProductVariantRelation<T>),
    New(CreateProductVariantRelation<T>),
}

impl<T> RelationRow<T> {
    pub fn property_id(&self) -> &str {
        match self {
            RelationRow::Existing(relation) => &relation.property_id,
            RelationRow::New(draft) => &draft.property_id,
        }
    }

    pub fn value(&self) -> &T {
        match self {
            RelationRow::Existing(relation) => &relation.value,
            RelationRow::New(draft) => &draft.value,
        }
    }

    pub fn is_new(&self) -> bool {
        matches!(self, RelationRow::New(_))
    }
}

/// Pending relation edits, shared between the editor and its owner
pub struct PendingChanges<T> {
    to_create: watch::Sender<Vec<CreateProductVariantRelation<T>>>,
    to_patch: watch::Sender<Vec<ProductVariantRelation<T>>>,
    to_delete: watch::Sender<Vec<String>>,
}

impl<T: Clone> PendingChanges<T> {
    pub fn new() -> Self {
        let (to_create, _) = watch::channel(Vec::new());
        let (to_patch, _) = watch::channel(Vec::new());
        let (to_delete, _) = watch::channel(Vec::new());
        Self {
            to_create,
            to_patch,
            to_delete,
        }
    }

    pub fn to_create(&self) -> Vec<CreateProductVariantRelation<T>> {
        self.to_create.borrow().clone()
    }

    pub fn to_patch(&self) -> Vec<ProductVariantRelation<T>> {
        self.to_patch.borrow().clone()
    }

    /// Property ids whose relations are to be deleted
    pub fn to_delete(&self) -> Vec<String> {
        self.to_delete.borrow().clone()
    }

    pub fn replace_to_create(&self, drafts: Vec<CreateProductVariantRelation<T>>) {
        self.to_create.send_replace(drafts);
    }

    pub fn replace_to_patch(&self, relations: Vec<ProductVariantRelation<T>>) {
        self.to_patch.send_replace(relations);
    }

    pub fn replace_to_delete(&self, property_ids: Vec<String>) {
        self.to_delete.send_replace(property_ids);
    }

    pub fn subscribe_to_create(&self) -> watch::Receiver<Vec<CreateProductVariantRelation<T>>> {
        self.to_create.subscribe()
    }

    pub fn subscribe_to_patch(&self) -> watch::Receiver<Vec<ProductVariantRelation<T>>> {
        self.to_patch.subscribe()
    }

    pub fn subscribe_to_delete(&self) -> watch::Receiver<Vec<String>> {
        self.to_delete.subscribe()
    }

    pub fn is_empty(&self) -> bool {
        self.to_create.borrow().is_empty()
            && self.to_patch.borrow().is_empty()
            && self.to_delete.borrow().is_empty()
    }
}

impl<T: Clone> Default for PendingChanges<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Default)]
struct SavingFlags {
    create: AtomicBool,
    patch: AtomicBool,
    delete: AtomicBool,
}

/// Value given to a new relation for a property
pub type NewValueFn<D, T> = Arc<dyn Fn(&D) -> T + Send + Sync>;

/// Relation editor of one product variant and one property kind
///
/// `R` serves the relations, `P` the property definitions of the kind.
pub struct RelationManager<T, R, P>
where
    R: ReadService + ?Sized,
    P: ReadService + ?Sized,
{
    product_variant_id: String,
    relation_service: Arc<R>,
    relations: Arc<Searchable<R>>,
    properties: Arc<Searchable<P>>,
    notifications: Arc<dyn NotificationSink>,
    new_value: NewValueFn<P::View, T>,
    pending: Arc<PendingChanges<T>>,
    selected: Mutex<Option<String>>,
    /// Hydrated values by property name, the baseline for value changes
    snapshot: RwLock<Option<BTreeMap<String, T>>>,
    saving: SavingFlags,
}

impl<T, R, P> RelationManager<T, R, P>
where
    T: Clone + PartialEq + Send + Sync + 'static,
    R: DeletableService<
            View = ProductVariantRelation<T>,
            Create = CreateProductVariantRelation<T>,
            Patch = PatchProductVariantRelation<T>,
        > + ?Sized
        + 'static,
    P: ReadService + ?Sized + 'static,
    P::View: PropertyDefinition,
{
    pub fn new(
        product_variant_id: impl Into<String>,
        relation_service: Arc<R>,
        property_service: Arc<P>,
        notifications: Arc<dyn NotificationSink>,
        new_value: NewValueFn<P::View, T>,
        pending: Arc<PendingChanges<T>>,
    ) -> Self {
        let product_variant_id = product_variant_id.into();
        let relations = Searchable::builder(Arc::clone(&relation_service), Arc::clone(&notifications))
            .page_size(shared::UNBOUNDED_PAGE_SIZE)
            .filter(PRODUCT_VARIANT_IDS_FILTER, product_variant_id.clone())
            .build();
        let properties = Searchable::builder(property_service, Arc::clone(&notifications))
            .page_size(shared::UNBOUNDED_PAGE_SIZE)
            .build();

        Self {
            product_variant_id,
            relation_service,
            relations: Arc::new(relations),
            properties: Arc::new(properties),
            notifications,
            new_value,
            pending,
            selected: Mutex::new(None),
            snapshot: RwLock::new(None),
            saving: SavingFlags::default(),
        }
    }

    pub fn product_variant_id(&self) -> &str {
        &self.product_variant_id
    }

    pub fn relations(&self) -> &Arc<Searchable<R>> {
        &self.relations
    }

    pub fn properties(&self) -> &Arc<Searchable<P>> {
        &self.properties
    }

    pub fn pending(&self) -> &Arc<PendingChanges<T>> {
        &self.pending
    }

    /// Load relations and property definitions
    pub async fn init(&self) -> (LoadStatus, LoadStatus) {
        let statuses = tokio::join!(self.relations.load(), self.properties.load());
        self.sync_to_patch();
        statuses
    }

    // ========== Selection ==========

    pub fn select_property(&self, property_id: Option<String>) {
        *self.selected.lock() = property_id;
    }

    pub fn selected_property(&self) -> Option<String> {
        self.selected.lock().clone()
    }

    /// Add a draft for the selected property.
    ///
    /// Does nothing without a selection or when the selected property is
    /// already related. Returns whether a draft was added.
    pub fn add_new_relation(&self) -> bool {
        let Some(property_id) = self.selected_property() else {
            return false;
        };
        let Some(property) = self
            .available_properties()
            .into_iter()
            .find(|property| property.id() == property_id)
        else {
            tracing::debug!(property_id = %property_id, "Property not available for a new relation");
            return false;
        };

        let mut drafts = self.pending.to_create();
        drafts.push(CreateProductVariantRelation {
            product_variant_id: self.product_variant_id.clone(),
            property_id,
            value: (self.new_value)(&property),
        });
        self.pending.replace_to_create(drafts);
        *self.selected.lock() = None;
        true
    }

    // ========== Derived views ==========

    /// Definitions neither related yet nor pending as a draft
    pub fn available_properties(&self) -> Vec<P::View> {
        let mut used: HashSet<String> = self
            .relations
            .with_records(|relations| relations.iter().map(|r| r.property_id.clone()).collect());
        used.extend(self.pending.to_create().into_iter().map(|draft| draft.property_id));

        self.properties.with_records(|properties| {
            properties
                .iter()
                .filter(|property| !used.contains(property.id()))
                .cloned()
                .collect()
        })
    }

    pub fn properties_select_options(&self) -> Vec<SelectOption> {
        let placeholder = SelectOption {
            value: None,
            label: MessageKey::PleaseChoose.to_string(),
        };
        std::iter::once(placeholder)
            .chain(self.available_properties().iter().map(|property| SelectOption {
                value: Some(property.id().to_string()),
                label: property.name().to_string(),
            }))
            .collect()
    }

    /// Loaded relations followed by drafts
    pub fn existing_and_new(&self) -> Vec<RelationRow<T>> {
        let mut rows: Vec<RelationRow<T>> = self
            .relations
            .records()
            .into_iter()
            .map(RelationRow::Existing)
            .collect();
        rows.extend(self.pending.to_create().into_iter().map(RelationRow::New));
        rows
    }

    /// Actions offered for the row of `property_id`
    pub fn data_table_actions(&self, property_id: Option<&str>) -> Vec<DataTableAction> {
        let Some(property_id) = property_id.filter(|id| !id.is_empty()) else {
            return Vec::new();
        };
        let pending_delete = self
            .pending
            .to_delete
            .borrow()
            .iter()
            .any(|id| id == property_id);

        if pending_delete {
            vec![DataTableAction {
                name: ACTION_RESTORE,
                label: "restore",
            }]
        } else {
            vec![DataTableAction {
                name: ACTION_DELETE,
                label: "delete",
            }]
        }
    }

    pub fn handle_data_table_action(&self, event: &DataTableActionEvent) {
        let Some(property_id) = event.value.as_deref().filter(|id| !id.is_empty()) else {
            return;
        };

        match event.name.as_str() {
            ACTION_DELETE => {
                let drafts = self.pending.to_create();
                if drafts.iter().any(|draft| draft.property_id == property_id) {
                    self.pending.replace_to_create(
                        drafts
                            .into_iter()
                            .filter(|draft| draft.property_id != property_id)
                            .collect(),
                    );
                    return;
                }
                let mut to_delete = self.pending.to_delete();
                to_delete.push(property_id.to_string());
                self.pending.replace_to_delete(to_delete);
                self.sync_to_patch();
            }
            ACTION_RESTORE => {
                let to_delete = self
                    .pending
                    .to_delete()
                    .into_iter()
                    .filter(|id| id != property_id)
                    .collect();
                self.pending.replace_to_delete(to_delete);
                self.sync_to_patch();
            }
            other => tracing::debug!(action = %other, "Ignoring unknown table action"),
        }
    }

    // ========== Change tracking ==========

    /// Set the hydrated values used as the change baseline; `None` treats
    /// every loaded relation as changed.
    pub fn set_hydrated_snapshot(&self, snapshot: Option<BTreeMap<String, T>>) {
        *self.snapshot.write() = snapshot;
        self.sync_to_patch();
    }

    /// Use the hydrated properties of one kind as the change baseline
    pub fn set_hydrated_properties<C>(&self, hydrated: &BTreeMap<String, HydratedProperty<T, C>>) {
        self.set_hydrated_snapshot(Some(
            hydrated
                .iter()
                .map(|(name, property)| (name.clone(), property.value.clone()))
                .collect(),
        ));
    }

    /// Loaded relations whose value differs from the hydrated value of the
    /// same property name.
    pub fn changed_relations(&self) -> Vec<ProductVariantRelation<T>> {
        let relations = self.relations.records();
        let snapshot = self.snapshot.read();
        let Some(snapshot) = snapshot.as_ref() else {
            return relations;
        };

        let names: HashMap<String, String> = self.properties.with_records(|properties| {
            properties
                .iter()
                .map(|property| (property.id().to_string(), property.name().to_string()))
                .collect()
        });

        relations
            .into_iter()
            .filter(|relation| {
                names
                    .get(&relation.property_id)
                    .and_then(|name| snapshot.get(name))
                    .is_some_and(|hydrated| *hydrated != relation.value)
            })
            .collect()
    }

    /// Recompute `to_patch`; relations pending deletion are never patched.
    fn sync_to_patch(&self) {
        let to_delete: HashSet<String> = self.pending.to_delete().into_iter().collect();
        let to_patch = self
            .changed_relations()
            .into_iter()
            .filter(|relation| !to_delete.contains(&relation.property_id))
            .collect();
        self.pending.replace_to_patch(to_patch);
    }

    /// Edit the value of a loaded relation. Returns `false` when the
    /// property has no loaded relation.
    pub fn set_relation_value(&self, property_id: &str, value: T) -> bool {
        let mut found = false;
        self.relations.update_records(|relations| {
            if let Some(relation) = relations.iter_mut().find(|r| r.property_id == property_id) {
                relation.value = value;
                found = true;
            }
        });
        if found {
            self.sync_to_patch();
        }
        found
    }

    /// Edit the value of a draft. Returns `false` when no draft exists for
    /// the property.
    pub fn set_draft_value(&self, property_id: &str, value: T) -> bool {
        let mut drafts = self.pending.to_create();
        let Some(draft) = drafts.iter_mut().find(|d| d.property_id == property_id) else {
            return false;
        };
        draft.value = value;
        self.pending.replace_to_create(drafts);
        true
    }

    // ========== Saving ==========

    pub fn is_saving_something(&self) -> bool {
        self.saving.create.load(Ordering::Acquire)
            || self.saving.patch.load(Ordering::Acquire)
            || self.saving.delete.load(Ordering::Acquire)
    }

    /// Write all pending changes, reload the relations and reset the
    /// pending sets.
    ///
    /// The three writes run concurrently and fail independently. Pending
    /// sets are reset even when a write failed.
    pub async fn save(&self) {
        // Records may have been reloaded through `relations()` since the last sync
        self.sync_to_patch();
        tokio::join!(self.save_deleted(), self.save_patched(), self.save_created());
        self.relations.load().await;

        self.pending.replace_to_create(Vec::new());
        self.pending.replace_to_delete(Vec::new());
        self.sync_to_patch();
        tracing::info!(product_variant_id = %self.product_variant_id, "Relations saved");
    }

    async fn save_deleted(&self) {
        let property_ids: HashSet<String> = self.pending.to_delete().into_iter().collect();
        if property_ids.is_empty() {
            return;
        }
        let relation_ids: Vec<String> = self.relations.with_records(|relations| {
            relations
                .iter()
                .filter(|relation| property_ids.contains(&relation.property_id))
                .map(|relation| relation.id.clone())
                .collect()
        });
        if relation_ids.is_empty() {
            return;
        }

        self.saving.delete.store(true, Ordering::Release);
        if let Err(e) = self.relation_service.delete(&relation_ids).await {
            tracing::warn!(error = %e, "Failed to delete relations");
            self.notifications.error(MessageKey::SavingFailed);
        }
        self.saving.delete.store(false, Ordering::Release);
    }

    async fn save_patched(&self) {
        let to_patch = self.pending.to_patch();
        if to_patch.is_empty() {
            return;
        }
        let patches: BTreeMap<String, PatchProductVariantRelation<T>> = to_patch
            .into_iter()
            .map(|relation| {
                (
                    relation.id,
                    PatchProductVariantRelation {
                        value: Some(relation.value),
                    },
                )
            })
            .collect();

        self.saving.patch.store(true, Ordering::Release);
        if let Err(e) = self.relation_service.patch(&patches).await {
            tracing::warn!(error = %e, "Failed to patch relations");
            self.notifications.error(MessageKey::SavingFailed);
        }
        self.saving.patch.store(false, Ordering::Release);
    }

    async fn save_created(&self) {
        let to_create = self.pending.to_create();
        if to_create.is_empty() {
            return;
        }

        self.saving.create.store(true, Ordering::Release);
        if let Err(e) = self.relation_service.create(&to_create).await {
            tracing::warn!(error = %e, "Failed to create relations");
            self.notifications.error(MessageKey::SavingFailed);
        }
        self.saving.create.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(property_id: &str) -> CreateProductVariantRelation<bool> {
        CreateProductVariantRelation {
            product_variant_id: "p1".to_string(),
            property_id: property_id.to_string(),
            value: false,
        }
    }

    #[test]
    fn test_pending_changes_notify_subscribers() {
        let pending = PendingChanges::<bool>::new();
        let mut rx = pending.subscribe_to_create();
        assert!(!rx.has_changed().unwrap());

        pending.replace_to_create(vec![draft("b1")]);
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().len(), 1);
        assert!(!pending.is_empty());
    }

    #[test]
    fn test_relation_row_accessors() {
        let row = RelationRow::New(draft("b1"));
        assert!(row.is_new());
        assert_eq!(row.property_id(), "b1");
        assert!(!*row.value());
    }

    #[test]
    fn test_action_event_without_value() {
        let event: DataTableActionEvent = serde_json::from_str(r#"{"name":"delete"}"#).unwrap();
        assert_eq!(event.value, None);
    }
}
