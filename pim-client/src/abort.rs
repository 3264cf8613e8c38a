//! Abortable request slots
//!
//! A slot holds the single in-flight request of one logical resource.
//! Starting a request cancels whatever the slot held before, so at most one
//! request per key is ever live. Completion clears the slot only if it still
//! holds the finishing request's token; a stale completion never clears a
//! newer request.

use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use tokio_util::sync::CancellationToken;

use crate::error::{ClientError, ClientResult};

/// Cancellation handle of one request
#[derive(Debug, Clone)]
pub struct RequestToken {
    id: u64,
    token: CancellationToken,
}

impl RequestToken {
    /// Signal handed to the transport
    pub fn signal(&self) -> &CancellationToken {
        &self.token
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Drive `request` unless this token is cancelled first.
    ///
    /// A result that arrives after cancellation is discarded.
    pub async fn run<T, F>(&self, request: F) -> ClientResult<T>
    where
        F: Future<Output = ClientResult<T>>,
    {
        let result = tokio::select! {
            biased;
            _ = self.token.cancelled() => return Err(ClientError::Cancelled),
            result = request => result,
        };
        if self.token.is_cancelled() {
            return Err(ClientError::Cancelled);
        }
        result
    }
}

/// Request slots keyed by logical resource
#[derive(Debug)]
pub struct AbortSlots<K: Eq + Hash> {
    slots: DashMap<K, RequestToken>,
    next_id: AtomicU64,
}

/// Single-resource slot
pub type AbortSlot = AbortSlots<()>;

impl<K: Eq + Hash + Clone> AbortSlots<K> {
    pub fn new() -> Self {
        Self {
            slots: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Cancel the request in flight for `key`, then register a new one.
    pub fn start(&self, key: K) -> RequestToken {
        let token = RequestToken {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            token: CancellationToken::new(),
        };
        if let Some(previous) = self.slots.insert(key, token.clone()) {
            previous.cancel();
        }
        token
    }

    /// Remove `token` from the slot if it is still the current request.
    ///
    /// Returns `true` when the slot was cleared.
    pub fn clear(&self, key: &K, token: &RequestToken) -> bool {
        self.slots
            .remove_if(key, |_, current| current.id == token.id)
            .is_some()
    }

    /// Cancel and forget the request in flight for `key`
    pub fn cancel(&self, key: &K) {
        if let Some((_, token)) = self.slots.remove(key) {
            token.cancel();
        }
    }

    pub fn cancel_all(&self) {
        self.slots.retain(|_, token| {
            token.cancel();
            false
        });
    }

    pub fn is_in_flight(&self, key: &K) -> bool {
        self.slots.contains_key(key)
    }
}

impl<K: Eq + Hash + Clone> Default for AbortSlots<K> {
    fn default() -> Self {
        Self::new()
    }
}
