//! Process-wide "who is signed in" state.

use std::sync::Arc;

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use super::{ClientError, RemoteClient};
use crate::models::{AuthEvent, Session};

/// What views need to know about the signed-in user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    pub user_id: String,
    pub username: String,
}

impl From<&Session> for SessionInfo {
    fn from(session: &Session) -> Self {
        Self {
            user_id: session.user_id.clone(),
            username: session.username.clone(),
        }
    }
}

/// Single shared observable for the current session.
#[derive(Clone)]
pub struct SessionStore {
    tx: Arc<watch::Sender<Option<SessionInfo>>>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    pub fn current(&self) -> Option<SessionInfo> {
        self.tx.borrow().clone()
    }

    pub fn is_logged_in(&self) -> bool {
        self.tx.borrow().is_some()
    }

    pub fn watch(&self) -> watch::Receiver<Option<SessionInfo>> {
        self.tx.subscribe()
    }

    pub fn set(&self, session: Option<SessionInfo>) {
        self.tx.send_if_modified(|current| {
            if *current == session {
                return false;
            }
            *current = session;
            true
        });
    }

    /// Load the current session and keep following auth changes until the guard drops.
    pub async fn attach(&self, client: Arc<dyn RemoteClient>) -> Result<SessionGuard, ClientError> {
        // Subscribe before reading so a sign-in racing the read is not lost
        let mut events = client.auth_events();
        let session = client.current_session().await?;
        self.set(session.as_ref().map(SessionInfo::from));

        let store = self.clone();
        let task = tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(AuthEvent::SignedIn(session)) => {
                        tracing::info!(user_id = %session.user_id, "Signed in");
                        store.set(Some(SessionInfo::from(&session)));
                    }
                    Ok(AuthEvent::SignedOut) => {
                        tracing::info!("Signed out");
                        store.set(None);
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(missed = n, "Auth events lagged, reloading session");
                        match client.current_session().await {
                            Ok(session) => store.set(session.as_ref().map(SessionInfo::from)),
                            Err(e) => tracing::error!("Failed to reload session: {}", e),
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        Ok(SessionGuard { task })
    }
}

/// Stops following auth changes when dropped.
pub struct SessionGuard {
    task: JoinHandle<()>,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.task.abort();
    }
}
