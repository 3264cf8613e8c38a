//! Form editor
//!
//! Edits one entity. Without an edit id the form creates a new record from
//! its model; with an edit id it loads the record as origin and patches only
//! the fields that differ from it.
//!
//! Field-level work (diffing, validation, copying from the origin) happens on
//! the JSON representation of the model, so any serde model works without
//! per-type glue.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use shared::IndexedFieldErrors;
use tokio::sync::broadcast;

use crate::abort::AbortSlot;
use crate::error::{ClientError, ClientResult, LoadStatus};
use crate::notification::{MessageKey, NotificationSink};
use crate::service::EntityService;
use crate::validation::Validator;

const EVENT_CHANNEL_CAPACITY: usize = 16;

/// Result of a successful save
#[derive(Debug, Clone, PartialEq)]
pub enum Saved<V> {
    Created(Vec<V>),
    Patched(BTreeMap<String, V>),
}

/// Events emitted after a successful save
#[derive(Debug, Clone, PartialEq)]
pub enum FormEvent<V> {
    Created(Vec<V>),
    Patched(BTreeMap<String, V>),
    /// Follows `Created` or `Patched`
    Saved(Saved<V>),
}

/// Field name to validation messages
pub type FormErrors = BTreeMap<String, Vec<MessageKey>>;

struct FormState<M, V> {
    edit_id: Option<String>,
    edit_model: M,
    origin: Option<V>,
    errors: FormErrors,
    res_errors: IndexedFieldErrors,
    is_saving: bool,
    is_loading: bool,
    saving_failed: bool,
    loading_origin_failed: bool,
}

/// Serialize into a field map; non-object values yield no fields.
fn to_fields<T: Serialize>(value: &T) -> Map<String, Value> {
    match serde_json::to_value(value) {
        Ok(Value::Object(fields)) => fields,
        Ok(_) => Map::new(),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to serialize form model");
            Map::new()
        }
    }
}

/// Fields of `model` whose value differs from the same field of `origin`
fn diff_fields(model: Map<String, Value>, origin: Option<&Map<String, Value>>) -> Map<String, Value> {
    let Some(origin) = origin else {
        return model;
    };
    model
        .into_iter()
        .filter(|(key, value)| origin.get(key) != Some(value))
        .collect()
}

/// Builder for [`FormEditor`]
pub struct FormEditorBuilder<S: EntityService + ?Sized> {
    service: Arc<S>,
    notifications: Arc<dyn NotificationSink>,
    defaults: Arc<dyn Fn() -> S::Create + Send + Sync>,
    validators: BTreeMap<String, Vec<Validator>>,
    edit_id: Option<String>,
}

impl<S: EntityService + ?Sized> FormEditorBuilder<S> {
    /// Add a validator for `field`; validators of a field run in insertion
    /// order.
    pub fn validator(mut self, field: impl Into<String>, validator: Validator) -> Self {
        self.validators
            .entry(field.into())
            .or_default()
            .push(validator);
        self
    }

    /// Start in edit mode for `id`
    pub fn edit_id(mut self, id: impl Into<String>) -> Self {
        self.edit_id = Some(id.into());
        self
    }

    pub fn build(self) -> FormEditor<S> {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        FormEditor {
            state: Mutex::new(FormState {
                edit_id: self.edit_id,
                edit_model: (self.defaults)(),
                origin: None,
                errors: FormErrors::new(),
                res_errors: IndexedFieldErrors::new(),
                is_saving: false,
                is_loading: false,
                saving_failed: false,
                loading_origin_failed: false,
            }),
            service: self.service,
            notifications: self.notifications,
            defaults: self.defaults,
            validators: self.validators,
            loads: AbortSlot::new(),
            events,
        }
    }
}

/// Create/edit form bound to an entity service
///
/// The model type is the service's create payload.
pub struct FormEditor<S: EntityService + ?Sized> {
    service: Arc<S>,
    notifications: Arc<dyn NotificationSink>,
    defaults: Arc<dyn Fn() -> S::Create + Send + Sync>,
    validators: BTreeMap<String, Vec<Validator>>,
    state: Mutex<FormState<S::Create, S::View>>,
    loads: AbortSlot,
    events: broadcast::Sender<FormEvent<S::View>>,
}

impl<S> FormEditor<S>
where
    S: EntityService + ?Sized,
    S::Create: Serialize + DeserializeOwned + Clone,
    S::Patch: DeserializeOwned,
    S::View: Serialize,
{
    pub fn builder(
        service: Arc<S>,
        notifications: Arc<dyn NotificationSink>,
        defaults: impl Fn() -> S::Create + Send + Sync + 'static,
    ) -> FormEditorBuilder<S> {
        FormEditorBuilder {
            service,
            notifications,
            defaults: Arc::new(defaults),
            validators: BTreeMap::new(),
            edit_id: None,
        }
    }

    // ========== State ==========

    pub fn edit_id(&self) -> Option<String> {
        self.state.lock().edit_id.clone()
    }

    pub fn edit_model(&self) -> S::Create {
        self.state.lock().edit_model.clone()
    }

    pub fn set_edit_model(&self, model: S::Create) {
        self.state.lock().edit_model = model;
    }

    /// Edit the model in place
    pub fn update_model(&self, f: impl FnOnce(&mut S::Create)) {
        f(&mut self.state.lock().edit_model);
    }

    pub fn origin(&self) -> Option<S::View> {
        self.state.lock().origin.clone()
    }

    pub fn errors(&self) -> FormErrors {
        self.state.lock().errors.clone()
    }

    /// Server-side field errors of the last failed save, by entity position
    pub fn res_errors(&self) -> IndexedFieldErrors {
        self.state.lock().res_errors.clone()
    }

    pub fn is_saving(&self) -> bool {
        self.state.lock().is_saving
    }

    pub fn is_loading(&self) -> bool {
        self.state.lock().is_loading
    }

    pub fn saving_failed(&self) -> bool {
        self.state.lock().saving_failed
    }

    pub fn loading_origin_failed(&self) -> bool {
        self.state.lock().loading_origin_failed
    }

    pub fn subscribe(&self) -> broadcast::Receiver<FormEvent<S::View>> {
        self.events.subscribe()
    }

    // ========== Derived ==========

    /// Model fields whose value differs from the origin; the whole model
    /// when there is no origin.
    pub fn changed_patch(&self) -> Map<String, Value> {
        let state = self.state.lock();
        self.changed_fields(&state.edit_model, state.origin.as_ref())
    }

    fn changed_fields(&self, model: &S::Create, origin: Option<&S::View>) -> Map<String, Value> {
        let origin = origin.map(to_fields);
        diff_fields(to_fields(model), origin.as_ref())
    }

    pub fn has_changes(&self) -> bool {
        !self.changed_patch().is_empty()
    }

    pub fn can_save(&self) -> bool {
        self.has_changes()
    }

    pub fn has_errors(&self) -> bool {
        !self.state.lock().errors.is_empty()
    }

    // ========== Operations ==========

    /// Run every field validator against the current model.
    ///
    /// Clears previous errors and the failed-save flag first.
    pub fn validate_form(&self) -> bool {
        let mut state = self.state.lock();
        state.saving_failed = false;

        let fields = to_fields(&state.edit_model);
        let mut errors = FormErrors::new();
        for (field, validators) in &self.validators {
            let value = fields.get(field).unwrap_or(&Value::Null);
            let messages: Vec<MessageKey> = validators
                .iter()
                .filter_map(|validate| validate(value))
                .collect();
            if !messages.is_empty() {
                errors.insert(field.clone(), messages);
            }
        }

        let valid = errors.is_empty();
        state.errors = errors;
        valid
    }

    /// Copy every model field that the origin also has from the origin.
    pub fn map_to_form_properties(&self) {
        let mut state = self.state.lock();
        let Some(origin) = state.origin.as_ref().map(to_fields) else {
            return;
        };

        let mut fields = to_fields(&state.edit_model);
        for (key, value) in fields.iter_mut() {
            if let Some(origin_value) = origin.get(key) {
                *value = origin_value.clone();
            }
        }

        match serde_json::from_value(Value::Object(fields)) {
            Ok(model) => state.edit_model = model,
            Err(e) => tracing::warn!(error = %e, "Origin does not fit the form model"),
        }
    }

    /// Validate and save.
    ///
    /// Edit mode patches the bound record with the changed fields of
    /// `prepared` (or of the edit model); create mode creates `prepared`
    /// (or the edit model). Returns `None` when validation or the request
    /// failed.
    pub async fn save(&self, prepared: Option<S::Create>) -> Option<Saved<S::View>> {
        if !self.validate_form() {
            tracing::debug!("Form has validation errors, not saving");
            self.notifications.error(MessageKey::ValidationErrorsOccured);
            return None;
        }

        let edit_id = {
            let mut state = self.state.lock();
            state.is_saving = true;
            state.saving_failed = false;
            state.res_errors.clear();
            state.edit_id.clone()
        };

        let result = match edit_id {
            Some(id) => self.patch(id, prepared).await,
            None => self.create(prepared).await,
        };

        let saved = match result {
            Ok(saved) => {
                tracing::info!("Form saved");
                let event = match &saved {
                    Saved::Created(created) => FormEvent::Created(created.clone()),
                    Saved::Patched(patched) => FormEvent::Patched(patched.clone()),
                };
                // No subscribers is fine
                let _ = self.events.send(event);
                let _ = self.events.send(FormEvent::Saved(saved.clone()));
                self.notifications.success(MessageKey::Saved);
                Some(saved)
            }
            Err(e) => {
                let mut state = self.state.lock();
                state.saving_failed = true;
                match e.field_errors() {
                    Some(body) => {
                        tracing::debug!("Save rejected with field errors");
                        state.res_errors = body.indexed_field_errors();
                    }
                    None => {
                        tracing::warn!(error = %e, "Failed to save form");
                        self.notifications.error(MessageKey::SavingFailed);
                    }
                }
                None
            }
        };

        self.state.lock().is_saving = false;
        saved
    }

    async fn patch(&self, id: String, prepared: Option<S::Create>) -> ClientResult<Saved<S::View>> {
        let changes = {
            let state = self.state.lock();
            let model = prepared.as_ref().unwrap_or(&state.edit_model);
            self.changed_fields(model, state.origin.as_ref())
        };
        let patch: S::Patch = serde_json::from_value(Value::Object(changes))?;
        let patches = BTreeMap::from([(id, patch)]);
        self.service.patch(&patches).await.map(Saved::Patched)
    }

    async fn create(&self, prepared: Option<S::Create>) -> ClientResult<Saved<S::View>> {
        let model = match prepared {
            Some(model) => model,
            None => self.state.lock().edit_model.clone(),
        };
        self.service
            .create(std::slice::from_ref(&model))
            .await
            .map(Saved::Created)
    }

    /// Load the origin of the bound record and copy it into the model.
    ///
    /// Without an edit id the model is reset to its defaults. When the edit
    /// id changes while loading, the superseded load leaves the form alone.
    pub async fn load(&self) -> LoadStatus {
        let Some(id) = self.edit_id() else {
            self.loads.cancel(&());
            let mut state = self.state.lock();
            state.edit_model = (self.defaults)();
            state.origin = None;
            state.is_loading = false;
            return LoadStatus::Loaded;
        };

        let token = self.loads.start(());
        {
            let mut state = self.state.lock();
            state.loading_origin_failed = false;
            state.is_loading = true;
        }

        let result = token.run(self.service.get_one_or_default(&id)).await;
        let status = match result {
            Ok(origin) => {
                self.state.lock().origin = Some(origin);
                self.map_to_form_properties();
                LoadStatus::Loaded
            }
            Err(ClientError::Cancelled) => {
                tracing::debug!(id = %id, "Superseded origin load discarded");
                LoadStatus::Cancelled
            }
            Err(e) => {
                tracing::warn!(id = %id, error = %e, "Failed to load form origin");
                self.state.lock().loading_origin_failed = true;
                LoadStatus::NotLoaded
            }
        };

        if self.loads.clear(&(), &token) {
            self.state.lock().is_loading = false;
        }
        status
    }

    /// Bind the form to another record (or to none), reloading when the id
    /// changed.
    pub async fn set_edit_id(&self, id: Option<String>) -> Option<LoadStatus> {
        {
            let mut state = self.state.lock();
            if state.edit_id == id {
                return None;
            }
            state.edit_id = id;
        }
        Some(self.load().await)
    }
}
