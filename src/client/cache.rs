//! Keyed read cache for view queries.
//!
//! Each logical query owns one slot. Slots are only ever replaced by a full refetch;
//! invalidation marks a slot stale and tells subscribers, it never patches data in place.

use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::broadcast;

use super::ClientError;

/// Logical identity of a cached query.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryKey {
    Debates,
    Debate(String),
    Arguments(String),
    Votes(String),
    /// Public profile page, by username.
    Profile(String),
    /// The signed-in user's own profile, by user id.
    CurrentProfile(String),
    Search(String),
}

impl QueryKey {
    /// The debate this key belongs to, if any.
    pub fn debate_id(&self) -> Option<&str> {
        match self {
            QueryKey::Debate(id) | QueryKey::Arguments(id) | QueryKey::Votes(id) => Some(id),
            _ => None,
        }
    }

    pub fn is_search(&self) -> bool {
        matches!(self, QueryKey::Search(_))
    }
}

/// Snapshot of one slot as a view would render it.
#[derive(Debug, Clone)]
pub struct QueryState<T> {
    pub data: Option<Arc<T>>,
    pub error: Option<String>,
    pub loading: bool,
    pub stale: bool,
}

impl<T> Default for QueryState<T> {
    fn default() -> Self {
        Self {
            data: None,
            error: None,
            loading: false,
            stale: false,
        }
    }
}

#[derive(Default)]
struct Slot {
    data: Option<Arc<dyn Any + Send + Sync>>,
    error: Option<String>,
    loading: bool,
    stale: bool,
    /// Bumped on every invalidation; a fetch started under an older generation lands stale.
    generation: u64,
}

pub struct QueryCache {
    slots: Mutex<HashMap<QueryKey, Slot>>,
    invalidations: broadcast::Sender<QueryKey>,
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryCache {
    pub fn new() -> Self {
        let (invalidations, _) = broadcast::channel(64);
        Self {
            slots: Mutex::new(HashMap::new()),
            invalidations,
        }
    }

    fn slots(&self) -> MutexGuard<'_, HashMap<QueryKey, Slot>> {
        self.slots.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Return the cached value for `key` when fresh, otherwise run `fetcher` and store its result.
    ///
    /// A failed fetch keeps the previous data (if any) and records the error.
    pub async fn fetch<T, F, Fut>(&self, key: QueryKey, fetcher: F) -> Result<Arc<T>, ClientError>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ClientError>>,
    {
        let generation = {
            let mut slots = self.slots();
            let slot = slots.entry(key.clone()).or_default();
            if !slot.stale {
                if let Some(hit) = slot.data.clone().and_then(|d| d.downcast::<T>().ok()) {
                    return Ok(hit);
                }
            }
            slot.loading = true;
            slot.generation
        };

        tracing::debug!(?key, "Cache miss, fetching");
        let result = fetcher().await;

        let mut slots = self.slots();
        let slot = slots.entry(key.clone()).or_default();
        slot.loading = false;
        match result {
            Ok(value) => {
                let value = Arc::new(value);
                slot.data = Some(value.clone() as Arc<dyn Any + Send + Sync>);
                slot.error = None;
                slot.stale = slot.generation != generation;
                Ok(value)
            }
            Err(err) => {
                tracing::warn!(?key, error = %err, "Query failed");
                slot.error = Some(err.to_string());
                Err(err)
            }
        }
    }

    /// Current state of a slot without fetching.
    pub fn state<T: Send + Sync + 'static>(&self, key: &QueryKey) -> QueryState<T> {
        let slots = self.slots();
        match slots.get(key) {
            Some(slot) => QueryState {
                data: slot.data.clone().and_then(|d| d.downcast::<T>().ok()),
                error: slot.error.clone(),
                loading: slot.loading,
                stale: slot.stale,
            },
            None => QueryState::default(),
        }
    }

    /// Mark one slot stale so the next read refetches.
    pub fn invalidate(&self, key: &QueryKey) {
        self.invalidate_where(|k| k == key);
    }

    /// Mark every slot matching `predicate` stale.
    pub fn invalidate_where(&self, predicate: impl Fn(&QueryKey) -> bool) {
        let mut invalidated = Vec::new();
        {
            let mut slots = self.slots();
            for (key, slot) in slots.iter_mut().filter(|(k, _)| predicate(k)) {
                slot.stale = true;
                slot.generation += 1;
                invalidated.push(key.clone());
            }
        }
        for key in invalidated {
            tracing::debug!(?key, "Invalidated");
            let _ = self.invalidations.send(key);
        }
    }

    /// Stream of invalidated keys, for views that want to refetch eagerly.
    pub fn subscribe(&self) -> broadcast::Receiver<QueryKey> {
        self.invalidations.subscribe()
    }
}
