//! The remote data client: the only door from the view layer to the backend.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Duration;
use tokio::sync::broadcast;

use crate::auth;
use crate::db::Repository;
use crate::errors::AppError;
use crate::models::{
    Argument, ArgumentWithAuthor, AuthEvent, CastVoteRequest, ChannelFilter,
    CreateArgumentRequest, CreateDebateRequest, Debate, DebateFilter, DebateHit, Profile,
    ProfileHit, Session, SignInRequest, SignUpRequest, UpdateProfileRequest, UserStats, Vote,
};
use crate::realtime::Subscription;
use crate::storage::Storage;

/// Backend surface consumed by views: row reads and writes, auth, storage and realtime.
///
/// Writes act as the currently signed-in caller and fail with
/// [`AppError::Unauthorized`] when there is none.
#[async_trait]
pub trait RemoteClient: Send + Sync {
    async fn current_session(&self) -> Result<Option<Session>, AppError>;
    async fn sign_up(&self, request: &SignUpRequest) -> Result<Session, AppError>;
    async fn sign_in(&self, request: &SignInRequest) -> Result<Session, AppError>;
    async fn sign_out(&self) -> Result<(), AppError>;
    /// Subscribe to sign-in / sign-out notifications.
    fn auth_events(&self) -> broadcast::Receiver<AuthEvent>;

    async fn list_debates(&self, filter: &DebateFilter) -> Result<Vec<Debate>, AppError>;
    async fn get_debate(&self, id: &str) -> Result<Option<Debate>, AppError>;
    async fn list_arguments(&self, debate_id: &str) -> Result<Vec<ArgumentWithAuthor>, AppError>;
    async fn list_votes(&self, argument_ids: &[String]) -> Result<Vec<Vote>, AppError>;
    async fn get_profile(&self, user_id: &str) -> Result<Option<Profile>, AppError>;
    async fn get_profile_by_username(&self, username: &str) -> Result<Option<Profile>, AppError>;
    async fn user_stats(&self, user_id: &str) -> Result<UserStats, AppError>;
    /// A user's arguments across all debates, newest first.
    async fn list_arguments_by_user(&self, user_id: &str) -> Result<Vec<Argument>, AppError>;
    async fn username_taken(
        &self,
        username: &str,
        exclude_id: Option<&str>,
    ) -> Result<bool, AppError>;
    async fn search_debates(&self, term: &str, limit: i64) -> Result<Vec<DebateHit>, AppError>;
    async fn search_profiles(&self, term: &str, limit: i64) -> Result<Vec<ProfileHit>, AppError>;

    async fn insert_debate(&self, request: &CreateDebateRequest) -> Result<Debate, AppError>;
    async fn insert_argument(
        &self,
        debate_id: &str,
        request: &CreateArgumentRequest,
    ) -> Result<Argument, AppError>;
    async fn insert_vote(&self, request: &CastVoteRequest) -> Result<Vote, AppError>;
    async fn update_vote(&self, vote_id: &str, vote_type: bool) -> Result<Vote, AppError>;
    async fn delete_vote(&self, vote_id: &str) -> Result<(), AppError>;
    /// Update the caller's own profile row.
    async fn update_profile(&self, request: &UpdateProfileRequest) -> Result<Profile, AppError>;

    /// Store an object and return its public URL.
    async fn upload(&self, bucket: &str, path: &str, bytes: &[u8]) -> Result<String, AppError>;

    /// Open a realtime channel. Dropping the subscription closes it.
    fn subscribe(&self, filter: ChannelFilter) -> Subscription;
}

/// In-process [`RemoteClient`] over the repository, storage and realtime hub.
///
/// Holds at most one signed-in session, like a browser tab.
pub struct EmbeddedClient {
    repo: Arc<Repository>,
    storage: Arc<Storage>,
    session_ttl: Duration,
    session: Mutex<Option<Session>>,
    auth_tx: broadcast::Sender<AuthEvent>,
}

impl EmbeddedClient {
    pub fn new(repo: Arc<Repository>, storage: Arc<Storage>) -> Self {
        let (auth_tx, _) = broadcast::channel(16);
        Self {
            repo,
            storage,
            session_ttl: Duration::days(30),
            session: Mutex::new(None),
            auth_tx,
        }
    }

    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    fn slot(&self) -> MutexGuard<'_, Option<Session>> {
        self.session.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn caller(&self) -> Result<Session, AppError> {
        self.slot()
            .clone()
            .ok_or_else(|| AppError::Unauthorized("You must be logged in".to_string()))
    }

    fn replace_session(&self, session: Option<Session>) {
        *self.slot() = session.clone();
        let event = match session {
            Some(session) => AuthEvent::SignedIn(session),
            None => AuthEvent::SignedOut,
        };
        let _ = self.auth_tx.send(event);
    }
}

#[async_trait]
impl RemoteClient for EmbeddedClient {
    async fn current_session(&self) -> Result<Option<Session>, AppError> {
        let Some(local) = self.slot().clone() else {
            return Ok(None);
        };
        match self.repo.get_session(&local.token).await? {
            Some(session) => Ok(Some(session)),
            None => {
                tracing::info!(user_id = %local.user_id, "Session expired");
                self.replace_session(None);
                Ok(None)
            }
        }
    }

    async fn sign_up(&self, request: &SignUpRequest) -> Result<Session, AppError> {
        let session = auth::sign_up(&self.repo, request, self.session_ttl).await?;
        self.replace_session(Some(session.clone()));
        Ok(session)
    }

    async fn sign_in(&self, request: &SignInRequest) -> Result<Session, AppError> {
        let session = auth::sign_in(&self.repo, request, self.session_ttl).await?;
        self.replace_session(Some(session.clone()));
        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), AppError> {
        let token = self.slot().as_ref().map(|s| s.token.clone());
        if let Some(token) = token {
            auth::sign_out(&self.repo, &token).await?;
        }
        self.replace_session(None);
        Ok(())
    }

    fn auth_events(&self) -> broadcast::Receiver<AuthEvent> {
        self.auth_tx.subscribe()
    }

    async fn list_debates(&self, filter: &DebateFilter) -> Result<Vec<Debate>, AppError> {
        self.repo.list_debates(filter).await
    }

    async fn get_debate(&self, id: &str) -> Result<Option<Debate>, AppError> {
        self.repo.get_debate(id).await
    }

    async fn list_arguments(&self, debate_id: &str) -> Result<Vec<ArgumentWithAuthor>, AppError> {
        self.repo.list_arguments(debate_id).await
    }

    async fn list_votes(&self, argument_ids: &[String]) -> Result<Vec<Vote>, AppError> {
        self.repo.list_votes(argument_ids).await
    }

    async fn get_profile(&self, user_id: &str) -> Result<Option<Profile>, AppError> {
        self.repo.get_profile(user_id).await
    }

    async fn get_profile_by_username(&self, username: &str) -> Result<Option<Profile>, AppError> {
        self.repo.get_profile_by_username(username).await
    }

    async fn user_stats(&self, user_id: &str) -> Result<UserStats, AppError> {
        self.repo.user_stats(user_id).await
    }

    async fn list_arguments_by_user(&self, user_id: &str) -> Result<Vec<Argument>, AppError> {
        self.repo.list_arguments_by_user(user_id).await
    }

    async fn username_taken(
        &self,
        username: &str,
        exclude_id: Option<&str>,
    ) -> Result<bool, AppError> {
        self.repo.username_taken(username, exclude_id).await
    }

    async fn search_debates(&self, term: &str, limit: i64) -> Result<Vec<DebateHit>, AppError> {
        self.repo.search_debates(term, limit).await
    }

    async fn search_profiles(&self, term: &str, limit: i64) -> Result<Vec<ProfileHit>, AppError> {
        self.repo.search_profiles(term, limit).await
    }

    async fn insert_debate(&self, request: &CreateDebateRequest) -> Result<Debate, AppError> {
        let caller = self.caller()?;
        self.repo.create_debate(&caller.user_id, request).await
    }

    async fn insert_argument(
        &self,
        debate_id: &str,
        request: &CreateArgumentRequest,
    ) -> Result<Argument, AppError> {
        let caller = self.caller()?;
        self.repo
            .create_argument(debate_id, &caller.user_id, request)
            .await
    }

    async fn insert_vote(&self, request: &CastVoteRequest) -> Result<Vote, AppError> {
        let caller = self.caller()?;
        self.repo.insert_vote(&caller.user_id, request).await
    }

    async fn update_vote(&self, vote_id: &str, vote_type: bool) -> Result<Vote, AppError> {
        let caller = self.caller()?;
        self.repo
            .update_vote(vote_id, &caller.user_id, vote_type)
            .await
    }

    async fn delete_vote(&self, vote_id: &str) -> Result<(), AppError> {
        let caller = self.caller()?;
        self.repo.delete_vote(vote_id, &caller.user_id).await
    }

    async fn update_profile(&self, request: &UpdateProfileRequest) -> Result<Profile, AppError> {
        let caller = self.caller()?;
        let profile = self.repo.update_profile(&caller.user_id, request).await?;

        // Keep the cached username on the session in step with the profile.
        if profile.username != caller.username {
            let mut slot = self.slot();
            if let Some(session) = slot.as_mut() {
                session.username = profile.username.clone();
            }
        }
        Ok(profile)
    }

    async fn upload(&self, bucket: &str, path: &str, bytes: &[u8]) -> Result<String, AppError> {
        let caller = self.caller()?;
        if crate::storage::owner_segment(path) != Some(caller.user_id.as_str()) {
            return Err(AppError::Forbidden(
                "Objects must be stored under your own user id".to_string(),
            ));
        }
        self.storage.upload(bucket, path, bytes).await
    }

    fn subscribe(&self, filter: ChannelFilter) -> Subscription {
        self.repo.realtime().subscribe(filter)
    }
}
