//! Configuration module for the EliteMinds service.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";
const DEFAULT_SESSION_TTL_DAYS: i64 = 30;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Root directory for uploaded objects (avatars)
    pub storage_path: PathBuf,
    /// Public base URL used to build object URLs
    pub public_url: String,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Emit logs as JSON lines instead of human-readable text
    pub log_json: bool,
    /// Load mock development data into an empty database
    pub seed: bool,
    /// Lifetime of a session token in days
    pub session_ttl_days: i64,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let db_path = env::var("ELITEMINDS_DB_PATH")
            .unwrap_or_else(|_| "./data/eliteminds.sqlite".to_string())
            .into();

        let storage_path = env::var("ELITEMINDS_STORAGE_PATH")
            .unwrap_or_else(|_| "./data/storage".to_string())
            .into();

        let bind_addr = env::var("ELITEMINDS_BIND_ADDR")
            .ok()
            .and_then(|raw| match raw.parse() {
                Ok(addr) => Some(addr),
                Err(_) => {
                    tracing::warn!("Invalid ELITEMINDS_BIND_ADDR {:?}, using default", raw);
                    None
                }
            })
            .unwrap_or_else(default_bind_addr);

        let public_url = env::var("ELITEMINDS_PUBLIC_URL")
            .unwrap_or_else(|_| format!("http://{}", bind_addr))
            .trim_end_matches('/')
            .to_string();

        let log_level = env::var("ELITEMINDS_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let log_json = env::var("ELITEMINDS_LOG_FORMAT")
            .map(|v| v.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        let seed = env::var("ELITEMINDS_SEED")
            .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        let session_ttl_days = env::var("ELITEMINDS_SESSION_TTL_DAYS")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .filter(|days| *days > 0)
            .unwrap_or(DEFAULT_SESSION_TTL_DAYS);

        Self {
            db_path,
            storage_path,
            public_url,
            bind_addr,
            log_level,
            log_json,
            seed,
            session_ttl_days,
        }
    }
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8080))
}
