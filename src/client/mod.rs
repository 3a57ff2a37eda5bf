//! View-side core of EliteMinds.
//!
//! Views never hold authoritative data. They read through the [`QueryCache`], write
//! through [`RemoteClient`], and refetch whenever a mutation or a realtime event
//! invalidates a cache key. Every failure is turned into a [`ClientError`], logged, and
//! shown as a transient [`Notification`].

mod arguments;
mod cache;
mod debates;
mod notify;
mod profile;
mod remote;
mod routes;
mod search;
mod session;
mod sync;

#[cfg(test)]
pub(crate) mod testing;

pub use arguments::*;
pub use cache::*;
pub use debates::*;
pub use notify::*;
pub use profile::*;
pub use remote::*;
pub use routes::*;
pub use search::*;
pub use session::*;
pub use sync::*;

use std::sync::Arc;

use crate::errors::AppError;

/// Shared handles every view action works through.
#[derive(Clone)]
pub struct ClientContext {
    pub remote: Arc<dyn RemoteClient>,
    pub cache: Arc<QueryCache>,
    pub session: SessionStore,
    pub notifier: Arc<Notifier>,
}

impl ClientContext {
    pub fn new(remote: Arc<dyn RemoteClient>) -> Self {
        Self {
            remote,
            cache: Arc::new(QueryCache::new()),
            session: SessionStore::new(),
            notifier: Arc::new(Notifier::new()),
        }
    }

    /// Surface a failed action as a notification and pass the result through.
    pub(crate) fn reported<T>(&self, action: &str, result: Result<T, ClientError>) -> Result<T, ClientError> {
        if let Err(err) = &result {
            self.notifier.report(action, err);
        }
        result
    }
}

/// Everything that can go wrong in a view action.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    /// Blocked before any network call because nobody is signed in.
    #[error("{0}")]
    AuthRequired(String),

    /// A form field failed a presence check; nothing was sent.
    #[error("{0}")]
    Validation(String),

    /// The backend rejected or failed the call; the message is shown verbatim.
    #[error("{0}")]
    Backend(String),

    /// The requested row does not exist.
    #[error("{0}")]
    NotFound(String),
}

impl From<AppError> for ClientError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::NotFound(msg) => ClientError::NotFound(msg),
            other => ClientError::Backend(other.message()),
        }
    }
}
