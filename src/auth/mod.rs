//! Account authentication.
//!
//! Passwords are stored as Argon2id hashes. A successful sign-in issues an opaque bearer
//! token that handlers resolve through the [`CurrentUser`] extractor.

use argon2::{
    password_hash::{rand_core::OsRng, SaltString},
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
};
use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};
use chrono::Duration;

use crate::db::Repository;
use crate::errors::AppError;
use crate::models::{Session, SignInRequest, SignUpRequest};
use crate::AppState;

const MIN_PASSWORD_LEN: usize = 8;
const USERNAME_LEN: std::ops::RangeInclusive<usize> = 3..=32;

/// Register an account, create its profile, and sign it in.
pub async fn sign_up(
    repo: &Repository,
    request: &SignUpRequest,
    ttl: Duration,
) -> Result<Session, AppError> {
    let email = normalize_email(&request.email);
    let username = request.username.trim();

    if !email.contains('@') {
        return Err(AppError::Validation("A valid email is required".to_string()));
    }
    if request.password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    if !USERNAME_LEN.contains(&username.chars().count()) {
        return Err(AppError::Validation(format!(
            "Username must be between {} and {} characters",
            USERNAME_LEN.start(),
            USERNAME_LEN.end()
        )));
    }

    if repo.email_registered(&email).await? {
        return Err(AppError::Conflict("Email is already registered".to_string()));
    }
    if repo.username_taken(username, None).await? {
        return Err(AppError::Conflict("Username is already taken".to_string()));
    }

    let password_hash = hash_password(&request.password).await?;
    let full_name = request
        .full_name
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());

    let profile = repo
        .create_account(&email, &password_hash, username, full_name)
        .await?;
    tracing::info!(user_id = %profile.id, username = %profile.username, "Account created");

    repo.create_session(&profile.id, ttl).await
}

/// Verify credentials and issue a session.
pub async fn sign_in(
    repo: &Repository,
    request: &SignInRequest,
    ttl: Duration,
) -> Result<Session, AppError> {
    let email = normalize_email(&request.email);
    let rejected = || AppError::Unauthorized("Invalid email or password".to_string());

    let (user_id, password_hash) = repo.find_credentials(&email).await?.ok_or_else(rejected)?;
    if !verify_password(&request.password, &password_hash).await? {
        tracing::debug!(user_id = %user_id, "Password rejected");
        return Err(rejected());
    }

    repo.create_session(&user_id, ttl).await
}

/// Revoke a session token. Unknown tokens are not an error.
pub async fn sign_out(repo: &Repository, token: &str) -> Result<(), AppError> {
    if !repo.delete_session(token).await? {
        tracing::debug!("Sign-out for unknown session token");
    }
    Ok(())
}

/// Hash a password with Argon2 on the blocking pool.
pub async fn hash_password(password: &str) -> Result<String, AppError> {
    let password = password.to_owned();
    run_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
    })
    .await
}

pub async fn verify_password(password: &str, stored_hash: &str) -> Result<bool, AppError> {
    let password = password.to_owned();
    let stored_hash = stored_hash.to_owned();
    run_blocking(move || {
        let parsed = PasswordHash::new(&stored_hash)
            .map_err(|e| AppError::Internal(format!("Stored password hash is invalid: {}", e)))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    })
    .await
}

async fn run_blocking<T, F>(work: F) -> Result<T, AppError>
where
    F: FnOnce() -> Result<T, AppError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| AppError::Internal(format!("Password task failed: {}", e)))?
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Extract the token from an `Authorization: Bearer ...` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// The signed-in caller of a request. Rejects with 401 when absent or expired.
pub struct CurrentUser(pub Session);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)
            .ok_or_else(|| AppError::Unauthorized("Missing bearer token".to_string()))?;

        state
            .repo
            .get_session(token)
            .await?
            .map(CurrentUser)
            .ok_or_else(|| AppError::Unauthorized("Session is invalid or expired".to_string()))
    }
}
