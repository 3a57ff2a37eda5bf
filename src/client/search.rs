//! Command palette search over debates and profiles.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::{ClientContext, ClientError, QueryKey, Route};
use crate::models::{DebateHit, ProfileHit};

/// Idle time after the last keystroke before a lookup is issued.
pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);
pub const MIN_QUERY_CHARS: usize = 2;
pub const RESULT_LIMIT: i64 = 5;

#[derive(Debug, Clone, PartialEq)]
pub enum SearchResult {
    Debate {
        id: String,
        title: String,
        description: String,
    },
    Profile {
        id: String,
        /// Full name when set, otherwise the username.
        title: String,
        username: String,
    },
}

impl SearchResult {
    pub fn route(&self) -> Route {
        match self {
            SearchResult::Debate { id, .. } => Route::Debate(id.clone()),
            SearchResult::Profile { username, .. } => Route::Profile(username.clone()),
        }
    }

    pub fn title(&self) -> &str {
        match self {
            SearchResult::Debate { title, .. } | SearchResult::Profile { title, .. } => title,
        }
    }
}

/// Debates first, then profiles, each in backend order.
pub fn merge_results(debates: Vec<DebateHit>, profiles: Vec<ProfileHit>) -> Vec<SearchResult> {
    debates
        .into_iter()
        .map(|d| SearchResult::Debate {
            id: d.id,
            title: d.title,
            description: d.description,
        })
        .chain(profiles.into_iter().map(|p| SearchResult::Profile {
            id: p.id,
            title: p.full_name.unwrap_or_else(|| p.username.clone()),
            username: p.username,
        }))
        .collect()
}

#[derive(Default)]
struct QueryState {
    query: String,
    /// Bumped on every keystroke; only the holder of the latest value may publish.
    seq: u64,
    pending: Option<JoinHandle<()>>,
}

/// Debounced search box. Only the most recent query's results are ever published.
pub struct CommandSearch {
    ctx: ClientContext,
    state: Arc<Mutex<QueryState>>,
    results: Arc<watch::Sender<Vec<SearchResult>>>,
}

impl CommandSearch {
    pub fn new(ctx: ClientContext) -> Self {
        let (results, _) = watch::channel(Vec::new());
        Self {
            ctx,
            state: Arc::new(Mutex::new(QueryState::default())),
            results: Arc::new(results),
        }
    }

    fn state(&self) -> MutexGuard<'_, QueryState> {
        lock(&self.state)
    }

    pub fn query(&self) -> String {
        self.state().query.clone()
    }

    pub fn results(&self) -> Vec<SearchResult> {
        self.results.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<Vec<SearchResult>> {
        self.results.subscribe()
    }

    /// Record a keystroke and schedule a lookup once typing pauses.
    pub fn set_query(&self, query: &str) {
        let mut state = self.state();
        state.query = query.to_string();
        state.seq += 1;
        let token = state.seq;

        let term = query.trim().to_string();
        if term.chars().count() < MIN_QUERY_CHARS {
            self.results.send_replace(Vec::new());
            return;
        }

        let ctx = self.ctx.clone();
        let shared = self.state.clone();
        let results = self.results.clone();
        state.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(SEARCH_DEBOUNCE).await;
            if lock(&shared).seq != token {
                return;
            }

            let found = lookup(&ctx, &term).await;

            // A newer keystroke makes this response stale
            if lock(&shared).seq != token {
                tracing::debug!(%term, "Discarding stale search response");
                return;
            }
            match found {
                Ok(found) => {
                    results.send_replace(found);
                }
                Err(e) => ctx.notifier.report("search", &e),
            }
        }));
    }

    /// Clear the box and return where the chosen result lives.
    pub fn select(&self, result: &SearchResult) -> Route {
        self.set_query("");
        result.route()
    }
}

impl Drop for CommandSearch {
    fn drop(&mut self) {
        if let Some(pending) = self.state().pending.take() {
            pending.abort();
        }
    }
}

fn lock(state: &Mutex<QueryState>) -> MutexGuard<'_, QueryState> {
    state.lock().unwrap_or_else(|e| e.into_inner())
}

async fn lookup(ctx: &ClientContext, term: &str) -> Result<Vec<SearchResult>, ClientError> {
    let remote = ctx.remote.clone();
    let owned = term.to_string();
    let found = ctx
        .cache
        .fetch(QueryKey::Search(owned.clone()), || async move {
            let (debates, profiles) = tokio::try_join!(
                remote.search_debates(&owned, RESULT_LIMIT),
                remote.search_profiles(&owned, RESULT_LIMIT),
            )?;
            Ok(merge_results(debates, profiles))
        })
        .await?;
    Ok((*found).clone())
}
