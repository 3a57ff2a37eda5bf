//! EliteMinds server
//!
//! REST + websocket backend with SQLite persistence and on-disk object storage.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use eliteminds::config::Config;
use eliteminds::db::{self, Repository};
use eliteminds::realtime::RealtimeHub;
use eliteminds::storage::Storage;
use eliteminds::{create_router, seed, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env();

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let registry = tracing_subscriber::registry().with(env_filter);
    if config.log_json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::info!("Starting EliteMinds");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Storage path: {:?}", config.storage_path);
    tracing::info!("Public URL: {}", config.public_url);
    tracing::info!("Bind address: {}", config.bind_addr);

    // Initialize database
    let pool = db::init_database(&config.db_path).await?;
    let repo = Arc::new(Repository::new(pool, RealtimeHub::new()));

    if config.seed {
        match seed::seed_if_empty(&repo).await {
            Ok(true) => tracing::info!("Loaded development seed data"),
            Ok(false) => tracing::info!("Database not empty, skipping seed data"),
            Err(e) => tracing::warn!("Failed to load seed data: {}", e),
        }
    }

    tokio::fs::create_dir_all(&config.storage_path).await?;
    let storage = Arc::new(Storage::new(&config.storage_path, config.public_url.clone()));

    // Create application state
    let state = AppState {
        repo,
        storage,
        config: Arc::new(config.clone()),
    };

    // Build router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
