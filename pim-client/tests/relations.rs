// pim-client/tests/relations.rs
// Relation editor: drafts, table actions, change tracking, batch save

mod common;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use common::{Call, MockService, Op, RecordingSink};
use pim_client::relations::{ACTION_DELETE, ACTION_RESTORE};
use pim_client::{
    DataTableActionEvent, LoadStatus, MessageKey, PendingChanges, RelationManager, RelationRow,
};
use shared::models::{
    BooleanProperty, CreateProductVariantBooleanProperty, PatchProductVariantBooleanProperty,
    ProductVariantBooleanProperty, ProductVariantRelation,
};

type RelationService = MockService<
    ProductVariantBooleanProperty,
    CreateProductVariantBooleanProperty,
    PatchProductVariantBooleanProperty,
>;
type PropertyService = MockService<BooleanProperty>;
type Manager = RelationManager<bool, RelationService, PropertyService>;

struct Fixture {
    relations: Arc<RelationService>,
    properties: Arc<PropertyService>,
    sink: Arc<RecordingSink>,
    pending: Arc<PendingChanges<bool>>,
    manager: Manager,
}

fn property(id: &str, name: &str) -> BooleanProperty {
    BooleanProperty {
        id: id.to_string(),
        name: name.to_string(),
    }
}

fn relation(id: &str, property_id: &str, value: bool) -> ProductVariantBooleanProperty {
    ProductVariantRelation {
        id: id.to_string(),
        product_variant_id: "p1".to_string(),
        property_id: property_id.to_string(),
        value,
    }
}

async fn setup() -> Fixture {
    pim_client::logger::init_test_logger();
    let relations = MockService::new(vec![relation("r1", "b1", true), relation("r2", "b2", false)])
        .with_create(|draft: &CreateProductVariantBooleanProperty| ProductVariantRelation {
            id: format!("r-{}", draft.property_id),
            product_variant_id: draft.product_variant_id.clone(),
            property_id: draft.property_id.clone(),
            value: draft.value,
        })
        .shared();
    let properties = MockService::new(vec![
        property("b1", "fragile"),
        property("b2", "heavy"),
        property("b3", "liquid"),
    ])
    .shared();
    let sink = RecordingSink::new();
    let pending = Arc::new(PendingChanges::new());

    let manager = RelationManager::new(
        "p1",
        relations.clone(),
        properties.clone(),
        sink.clone(),
        Arc::new(|_: &BooleanProperty| true),
        pending.clone(),
    );
    let (relation_status, property_status) = manager.init().await;
    assert_eq!(relation_status, LoadStatus::Loaded);
    assert_eq!(property_status, LoadStatus::Loaded);

    Fixture {
        relations,
        properties,
        sink,
        pending,
        manager,
    }
}

fn action(name: &str, value: Option<&str>) -> DataTableActionEvent {
    DataTableActionEvent {
        name: name.to_string(),
        value: value.map(str::to_string),
    }
}

fn snapshot(pairs: &[(&str, bool)]) -> Option<BTreeMap<String, bool>> {
    Some(pairs.iter().map(|(name, value)| (name.to_string(), *value)).collect())
}

#[tokio::test]
async fn test_init_loads_unbounded_relations_of_parent() {
    let fixture = setup().await;

    let Call::GetMultiple(params) = &fixture.relations.calls()[0] else {
        panic!("expected a relation load");
    };
    assert_eq!(params.page_size, Some(-1));
    assert_eq!(
        params.filters.get("productVariantIds").map(String::as_str),
        Some("p1")
    );
    assert_eq!(fixture.properties.count(Op::GetMultiple), 1);
}

#[tokio::test]
async fn test_available_properties_and_options() {
    let fixture = setup().await;

    let available: Vec<String> = fixture
        .manager
        .available_properties()
        .into_iter()
        .map(|p| p.id)
        .collect();
    assert_eq!(available, vec!["b3".to_string()]);

    let options = fixture.manager.properties_select_options();
    assert_eq!(options.len(), 2);
    assert_eq!(options[0].value, None);
    assert_eq!(options[0].label, MessageKey::PleaseChoose.to_string());
    assert_eq!(options[1].value.as_deref(), Some("b3"));
    assert_eq!(options[1].label, "liquid");
}

#[tokio::test]
async fn test_add_new_relation() {
    let fixture = setup().await;
    let manager = &fixture.manager;

    // Nothing selected
    assert!(!manager.add_new_relation());
    assert!(fixture.pending.to_create().is_empty());

    // Already related
    manager.select_property(Some("b1".to_string()));
    assert!(!manager.add_new_relation());
    assert!(fixture.pending.to_create().is_empty());

    manager.select_property(Some("b3".to_string()));
    assert!(manager.add_new_relation());

    let drafts = fixture.pending.to_create();
    assert_eq!(drafts.len(), 1);
    assert_eq!(drafts[0].property_id, "b3");
    assert_eq!(drafts[0].product_variant_id, "p1");
    assert!(drafts[0].value);
    assert_eq!(manager.selected_property(), None);
    assert!(manager.available_properties().is_empty());

    let rows = manager.existing_and_new();
    assert_eq!(rows.len(), 3);
    assert!(matches!(rows[0], RelationRow::Existing(_)));
    assert!(rows[2].is_new());
    assert_eq!(rows[2].property_id(), "b3");
}

#[tokio::test]
async fn test_table_actions() {
    let fixture = setup().await;
    let manager = &fixture.manager;
    manager.select_property(Some("b3".to_string()));
    manager.add_new_relation();

    // Deleting a draft drops it instead of scheduling a delete
    manager.handle_data_table_action(&action(ACTION_DELETE, Some("b3")));
    assert!(fixture.pending.to_create().is_empty());
    assert!(fixture.pending.to_delete().is_empty());

    manager.handle_data_table_action(&action(ACTION_DELETE, Some("b1")));
    assert_eq!(fixture.pending.to_delete(), vec!["b1".to_string()]);

    let actions = manager.data_table_actions(Some("b1"));
    assert_eq!(actions.len(), 1);
    assert_eq!(actions[0].name, ACTION_RESTORE);
    assert_eq!(manager.data_table_actions(Some("b2"))[0].name, ACTION_DELETE);
    assert!(manager.data_table_actions(None).is_empty());

    // Missing value and unknown actions are ignored
    manager.handle_data_table_action(&action(ACTION_RESTORE, None));
    manager.handle_data_table_action(&action("archive", Some("b1")));
    assert_eq!(fixture.pending.to_delete(), vec!["b1".to_string()]);

    manager.handle_data_table_action(&action(ACTION_RESTORE, Some("b1")));
    assert!(fixture.pending.to_delete().is_empty());
}

#[tokio::test]
async fn test_changed_relations_against_snapshot() {
    let fixture = setup().await;
    let manager = &fixture.manager;

    // Without a snapshot every loaded relation counts as changed
    assert_eq!(manager.changed_relations().len(), 2);
    assert_eq!(fixture.pending.to_patch().len(), 2);

    manager.set_hydrated_snapshot(snapshot(&[("fragile", true), ("heavy", true)]));
    let changed = manager.changed_relations();
    assert_eq!(changed, vec![relation("r2", "b2", false)]);
    assert_eq!(fixture.pending.to_patch(), changed);

    // Pending deletion excludes a relation from patching
    manager.handle_data_table_action(&action(ACTION_DELETE, Some("b2")));
    assert!(fixture.pending.to_patch().is_empty());

    // Editing a value makes it a patch candidate
    assert!(manager.set_relation_value("b1", false));
    assert_eq!(fixture.pending.to_patch(), vec![relation("r1", "b1", false)]);
    assert!(!manager.set_relation_value("b3", false));
}

#[tokio::test]
async fn test_set_draft_value() {
    let fixture = setup().await;
    let manager = &fixture.manager;
    manager.select_property(Some("b3".to_string()));
    manager.add_new_relation();

    let mut rx = fixture.pending.subscribe_to_create();
    assert!(manager.set_draft_value("b3", false));
    assert!(rx.has_changed().unwrap());
    assert!(!rx.borrow_and_update()[0].value);
    assert!(!manager.set_draft_value("b1", false));
}

#[tokio::test]
async fn test_save_writes_and_resets_pending() {
    let fixture = setup().await;
    let manager = &fixture.manager;
    manager.set_hydrated_snapshot(snapshot(&[("fragile", true), ("heavy", true)]));
    manager.handle_data_table_action(&action(ACTION_DELETE, Some("b1")));
    manager.select_property(Some("b3".to_string()));
    manager.add_new_relation();

    manager.save().await;

    let calls = fixture.relations.calls();
    assert!(calls.contains(&Call::Delete(vec!["r1".to_string()])));
    assert!(calls.contains(&Call::Patch(vec!["r2".to_string()])));
    assert!(calls.contains(&Call::Create(1)));
    assert_eq!(fixture.relations.patched()[0]["r2"].value, Some(false));
    assert_eq!(fixture.relations.created()[0].property_id, "b3");

    // Relations reloaded after the writes
    assert_eq!(fixture.relations.count(Op::GetMultiple), 2);
    let ids: Vec<String> = manager.relations().records().into_iter().map(|r| r.id).collect();
    assert_eq!(ids, vec!["r2".to_string(), "r-b3".to_string()]);

    assert!(fixture.pending.to_create().is_empty());
    assert!(fixture.pending.to_delete().is_empty());
    assert_eq!(fixture.pending.to_patch(), manager.changed_relations());
    assert!(!manager.is_saving_something());
    assert!(fixture.sink.messages().is_empty());
}

#[tokio::test]
async fn test_save_after_external_reload_patches_current_values() {
    let fixture = setup().await;
    let manager = &fixture.manager;
    manager.set_hydrated_snapshot(snapshot(&[("fragile", true), ("heavy", true)]));
    assert_eq!(fixture.pending.to_patch(), vec![relation("r2", "b2", false)]);

    // Someone else changed both relations on the server
    fixture
        .relations
        .set_records(vec![relation("r1", "b1", false), relation("r2", "b2", true)]);
    assert_eq!(manager.relations().load().await, LoadStatus::Loaded);

    manager.save().await;

    let patches: Vec<Call> = fixture
        .relations
        .calls()
        .into_iter()
        .filter(|call| matches!(call, Call::Patch(_)))
        .collect();
    assert_eq!(patches, vec![Call::Patch(vec!["r1".to_string()])]);
    assert_eq!(fixture.relations.patched()[0]["r1"].value, Some(false));
}

#[tokio::test]
async fn test_save_failure_still_resets_pending() {
    let fixture = setup().await;
    fixture.relations.fail(Op::Delete);
    let manager = &fixture.manager;
    manager.set_hydrated_snapshot(snapshot(&[("fragile", true), ("heavy", false)]));
    manager.handle_data_table_action(&action(ACTION_DELETE, Some("b1")));
    manager.select_property(Some("b3".to_string()));
    manager.add_new_relation();

    manager.save().await;

    assert_eq!(fixture.sink.messages(), vec![MessageKey::SavingFailed]);
    assert_eq!(fixture.relations.count(Op::Create), 1);
    assert!(fixture.pending.to_create().is_empty());
    assert!(fixture.pending.to_delete().is_empty());
    assert!(fixture.pending.to_patch().is_empty());
}

#[tokio::test]
async fn test_save_without_changes_only_reloads() {
    let fixture = setup().await;
    let manager = &fixture.manager;
    manager.set_hydrated_snapshot(snapshot(&[("fragile", true), ("heavy", false)]));

    manager.save().await;

    let writes = fixture
        .relations
        .calls()
        .iter()
        .filter(|call| !matches!(call, Call::GetMultiple(_)))
        .count();
    assert_eq!(writes, 0);
    assert_eq!(fixture.relations.count(Op::GetMultiple), 2);
}

#[tokio::test(start_paused = true)]
async fn test_is_saving_while_writing() {
    let fixture = setup().await;
    fixture.relations.push_delay(Op::Create, Duration::from_millis(100));
    let manager = &fixture.manager;
    manager.select_property(Some("b3".to_string()));
    manager.add_new_relation();

    let ((), saving) = tokio::join!(manager.save(), async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        manager.is_saving_something()
    });

    assert!(saving);
    assert!(!manager.is_saving_something());
}
