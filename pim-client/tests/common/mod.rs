// pim-client/tests/common/mod.rs
// In-memory services and notification sink shared by the integration tests

#![allow(dead_code)]

use std::collections::{BTreeMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use pim_client::service::{DeletableService, EntityService, ReadService};
use pim_client::{ClientError, ClientResult, MessageKey, Notification, NotificationSink};
use shared::{Entity, ErrorResponseBody, PaginatedList, Pagination, SearchParameters};
use tokio_util::sync::CancellationToken;

/// Service operation, used to inject failures and inspect calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    GetMultiple,
    GetByIds,
    GetOne,
    Create,
    Patch,
    Delete,
}

/// Recorded service call
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    GetMultiple(SearchParameters),
    GetByIds(Vec<String>),
    GetOne(String),
    Create(usize),
    Patch(Vec<String>),
    Delete(Vec<String>),
}

impl Call {
    pub fn op(&self) -> Op {
        match self {
            Call::GetMultiple(_) => Op::GetMultiple,
            Call::GetByIds(_) => Op::GetByIds,
            Call::GetOne(_) => Op::GetOne,
            Call::Create(_) => Op::Create,
            Call::Patch(_) => Op::Patch,
            Call::Delete(_) => Op::Delete,
        }
    }
}

type CreateFn<V, C> = Box<dyn Fn(&C) -> V + Send + Sync>;

/// In-memory entity service
///
/// Reads answer from a snapshot taken when the call starts, then sleep for
/// the next queued delay of that operation.
pub struct MockService<V, C = (), P = ()> {
    records: Mutex<Vec<V>>,
    pagination: Mutex<Option<Pagination>>,
    delays: Mutex<BTreeMap<String, VecDeque<Duration>>>,
    failing: Mutex<HashSet<Op>>,
    bad_request: Mutex<Option<ErrorResponseBody>>,
    calls: Mutex<Vec<Call>>,
    created: Mutex<Vec<C>>,
    patched: Mutex<Vec<BTreeMap<String, P>>>,
    on_create: Option<CreateFn<V, C>>,
}

impl<V, C, P> MockService<V, C, P>
where
    V: Entity + Clone + Send + Sync + 'static,
    C: Clone + Send + Sync + 'static,
    P: Clone + Send + Sync + 'static,
{
    pub fn new(records: Vec<V>) -> Self {
        Self {
            records: Mutex::new(records),
            pagination: Mutex::new(None),
            delays: Mutex::new(BTreeMap::new()),
            failing: Mutex::new(HashSet::new()),
            bad_request: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
            created: Mutex::new(Vec::new()),
            patched: Mutex::new(Vec::new()),
            on_create: None,
        }
    }

    /// Created payloads are also stored as records, converted by `f`
    pub fn with_create(mut self, f: impl Fn(&C) -> V + Send + Sync + 'static) -> Self {
        self.on_create = Some(Box::new(f));
        self
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn set_records(&self, records: Vec<V>) {
        *self.records.lock() = records;
    }

    pub fn records(&self) -> Vec<V> {
        self.records.lock().clone()
    }

    pub fn set_pagination(&self, pagination: Pagination) {
        *self.pagination.lock() = Some(pagination);
    }

    pub fn push_delay(&self, op: Op, delay: Duration) {
        self.delays
            .lock()
            .entry(format!("{:?}", op))
            .or_default()
            .push_back(delay);
    }

    pub fn fail(&self, op: Op) {
        self.failing.lock().insert(op);
    }

    pub fn recover(&self, op: Op) {
        self.failing.lock().remove(&op);
    }

    /// Answer create and patch with HTTP 400 and this body
    pub fn reject_with(&self, body: ErrorResponseBody) {
        *self.bad_request.lock() = Some(body);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn count(&self, op: Op) -> usize {
        self.calls.lock().iter().filter(|c| c.op() == op).count()
    }

    pub fn created(&self) -> Vec<C> {
        self.created.lock().clone()
    }

    pub fn patched(&self) -> Vec<BTreeMap<String, P>> {
        self.patched.lock().clone()
    }

    async fn enter(&self, call: Call) -> ClientResult<()> {
        let op = call.op();
        self.calls.lock().push(call);

        let delay = self
            .delays
            .lock()
            .get_mut(&format!("{:?}", op))
            .and_then(|queue| queue.pop_front());
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.failing.lock().contains(&op) {
            return Err(ClientError::Internal(format!("{:?} failed", op)));
        }
        let rejection = match op {
            Op::Create | Op::Patch => self.bad_request.lock().clone(),
            _ => None,
        };
        if let Some(body) = rejection {
            return Err(ClientError::BadRequest {
                message: "validation failed".to_string(),
                body: Some(body),
            });
        }
        Ok(())
    }
}

async fn cancellable<T>(
    signal: &CancellationToken,
    request: impl std::future::Future<Output = ClientResult<T>>,
) -> ClientResult<T> {
    tokio::select! {
        biased;
        _ = signal.cancelled() => Err(ClientError::Cancelled),
        result = request => result,
    }
}

#[async_trait]
impl<V, C, P> ReadService for MockService<V, C, P>
where
    V: Entity + Clone + Send + Sync + 'static,
    C: Clone + Send + Sync + 'static,
    P: Clone + Send + Sync + 'static,
{
    type View = V;

    async fn get_multiple(
        &self,
        params: &SearchParameters,
        signal: &CancellationToken,
    ) -> ClientResult<PaginatedList<V>> {
        let data = self.records();
        let fixed = *self.pagination.lock();
        let pagination = fixed.unwrap_or_else(|| {
            let page = params.page.unwrap_or(1);
            Pagination {
                page,
                total_pages: page.max(1),
                page_size: params.page_size.unwrap_or(-1),
                total_count: data.len() as u64,
            }
        });
        cancellable(signal, async {
            self.enter(Call::GetMultiple(params.clone())).await?;
            Ok(PaginatedList::new(data, pagination))
        })
        .await
    }

    async fn get_multiple_by_ids(
        &self,
        ids: &[String],
        _params: Option<&SearchParameters>,
        signal: &CancellationToken,
    ) -> ClientResult<Vec<V>> {
        let data: Vec<V> = self
            .records()
            .into_iter()
            .filter(|record| ids.iter().any(|id| id == record.id()))
            .collect();
        cancellable(signal, async {
            self.enter(Call::GetByIds(ids.to_vec())).await?;
            Ok(data)
        })
        .await
    }

    async fn get_one_or_default(&self, id: &str) -> ClientResult<V> {
        let record = self.records().into_iter().find(|record| record.id() == id);
        self.enter(Call::GetOne(id.to_string())).await?;
        record.ok_or_else(|| ClientError::NotFound(id.to_string()))
    }
}

#[async_trait]
impl<V, C, P> EntityService for MockService<V, C, P>
where
    V: Entity + Clone + Send + Sync + 'static,
    C: Clone + Send + Sync + 'static,
    P: Clone + Send + Sync + 'static,
{
    type Create = C;
    type Patch = P;

    async fn create(&self, entities: &[C]) -> ClientResult<Vec<V>> {
        self.enter(Call::Create(entities.len())).await?;
        self.created.lock().extend(entities.iter().cloned());

        let Some(convert) = &self.on_create else {
            return Ok(Vec::new());
        };
        let views: Vec<V> = entities.iter().map(|entity| convert(entity)).collect();
        self.records.lock().extend(views.iter().cloned());
        Ok(views)
    }

    async fn patch(&self, patches: &BTreeMap<String, P>) -> ClientResult<BTreeMap<String, V>> {
        self.enter(Call::Patch(patches.keys().cloned().collect())).await?;
        self.patched.lock().push(patches.clone());

        Ok(self
            .records()
            .into_iter()
            .filter(|record| patches.contains_key(record.id()))
            .map(|record| (record.id().to_string(), record))
            .collect())
    }
}

#[async_trait]
impl<V, C, P> DeletableService for MockService<V, C, P>
where
    V: Entity + Clone + Send + Sync + 'static,
    C: Clone + Send + Sync + 'static,
    P: Clone + Send + Sync + 'static,
{
    async fn delete(&self, ids: &[String]) -> ClientResult<()> {
        self.enter(Call::Delete(ids.to_vec())).await?;
        self.records
            .lock()
            .retain(|record| !ids.iter().any(|id| id == record.id()));
        Ok(())
    }
}

/// Sink recording every notification
#[derive(Default)]
pub struct RecordingSink {
    notifications: Mutex<Vec<Notification>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn messages(&self) -> Vec<MessageKey> {
        self.notifications
            .lock()
            .iter()
            .map(|n| n.message.clone())
            .collect()
    }

    pub fn count(&self, message: &MessageKey) -> usize {
        self.notifications
            .lock()
            .iter()
            .filter(|n| &n.message == message)
            .count()
    }
}

impl NotificationSink for RecordingSink {
    fn notify(&self, notification: Notification) {
        self.notifications.lock().push(notification);
    }
}
