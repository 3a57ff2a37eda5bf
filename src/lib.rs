//! EliteMinds: debate discussions with for/against arguments and votes.
//!
//! The crate has two halves. The service half ([`api`], [`auth`], [`db`], [`realtime`],
//! [`storage`]) owns persistence, sessions, uploads and change fan-out behind a REST and
//! websocket surface. The [`client`] half is the view-side core that consumes that surface
//! through [`client::RemoteClient`]: a keyed read cache, the shared session, voting rules,
//! debounced search and realtime invalidation.

pub mod api;
pub mod auth;
pub mod client;
pub mod config;
pub mod db;
pub mod errors;
pub mod models;
pub mod realtime;
pub mod seed;
pub mod storage;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use config::Config;
use db::Repository;
use storage::Storage;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub storage: Arc<Storage>,
    pub config: Arc<Config>,
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        // Auth
        .route("/auth/signup", post(api::sign_up))
        .route("/auth/signin", post(api::sign_in))
        .route("/auth/signout", post(api::sign_out))
        .route("/auth/session", get(api::get_session))
        // Debates
        .route("/debates", get(api::list_debates))
        .route("/debates", post(api::create_debate))
        .route("/debates/{id}", get(api::get_debate))
        .route("/debates/{id}/arguments", get(api::list_arguments))
        .route("/debates/{id}/arguments", post(api::create_argument))
        .route("/debates/{id}/votes", get(api::list_debate_votes))
        // Votes
        .route("/votes", get(api::list_votes))
        .route("/votes", post(api::cast_vote))
        .route("/votes/{id}", put(api::update_vote))
        .route("/votes/{id}", delete(api::delete_vote))
        // Profiles
        .route("/profiles/me", get(api::get_my_profile))
        .route("/profiles/me", put(api::update_my_profile))
        .route("/profiles/availability", get(api::check_username))
        .route("/profiles/{username}", get(api::get_profile))
        // Search
        .route("/search", get(api::search))
        // Storage
        .route(
            "/storage/{bucket}/{*path}",
            put(api::upload_object)
                .layer(DefaultBodyLimit::max(storage::MAX_OBJECT_BYTES + 1024)),
        )
        // Realtime
        .route("/realtime", get(api::realtime_ws));

    // Health check and public objects
    let public_routes = Router::new()
        .route("/health", get(health_check))
        .nest_service("/storage", ServeDir::new(state.storage.root()));

    Router::new()
        .nest("/api", api_routes)
        .merge(public_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}
