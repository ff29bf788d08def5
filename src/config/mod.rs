use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::error::AppError;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub tracker: TrackerConfig,
    pub roblox: RobloxConfig,
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub request: RequestConfig,
}

/// Milestone tracking configuration
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// The Roblox place to track.
    pub place_id: u64,
    /// Seconds between collection cycles.
    pub poll_interval_secs: u64,
    /// Spacing between consecutive milestone targets, in visits.
    pub milestone_step: i64,
}

/// Roblox API endpoint configuration
#[derive(Debug, Clone)]
pub struct RobloxConfig {
    /// Base URL for apis.roblox.com (universe lookup).
    pub apis_base_url: String,
    /// Base URL for games.roblox.com (details and votes).
    pub games_base_url: String,
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub path: PathBuf,
    pub max_connections: u32,
}

/// HTTP server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

/// Log output format
#[derive(Debug, Clone, PartialEq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// HTTP request configuration
#[derive(Debug, Clone)]
pub struct RequestConfig {
    pub timeout_ms: u64,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, AppError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let tracker = TrackerConfig {
            place_id: env::var("PLACE_ID")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(696_347_899),
            poll_interval_secs: env::var("POLL_INTERVAL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(300),
            milestone_step: env::var("MILESTONE_STEP")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5_000_000),
        };

        if tracker.milestone_step <= 0 {
            return Err(AppError::Config {
                message: "MILESTONE_STEP must be a positive integer".to_string(),
            });
        }
        if tracker.poll_interval_secs == 0 {
            return Err(AppError::Config {
                message: "POLL_INTERVAL_SECS must be a positive integer".to_string(),
            });
        }

        let roblox = RobloxConfig {
            apis_base_url: env::var("ROBLOX_APIS_BASE_URL")
                .unwrap_or_else(|_| "https://apis.roblox.com".to_string()),
            games_base_url: env::var("ROBLOX_GAMES_BASE_URL")
                .unwrap_or_else(|_| "https://games.roblox.com".to_string()),
        };

        let database = DatabaseConfig {
            path: PathBuf::from(
                env::var("DATABASE_PATH").unwrap_or_else(|_| "./data/visits.db".to_string()),
            ),
            max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5),
        };

        let server = ServerConfig {
            listen_addr: env::var("LISTEN_ADDR")
                .unwrap_or_else(|_| "127.0.0.1:8374".to_string())
                .parse()
                .map_err(|_| AppError::Config {
                    message: "LISTEN_ADDR must be a valid socket address".to_string(),
                })?,
        };

        let logging = LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            format: match env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "pretty".to_string())
                .to_lowercase()
                .as_str()
            {
                "json" => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
        };

        let request = RequestConfig {
            timeout_ms: env::var("REQUEST_TIMEOUT_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10_000),
            max_retries: env::var("MAX_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3),
            retry_delay_ms: env::var("RETRY_DELAY_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1000),
        };

        Ok(Config {
            tracker,
            roblox,
            database,
            server,
            logging,
            request,
        })
    }
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            max_retries: 3,
            retry_delay_ms: 1000,
        }
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            place_id: 696_347_899,
            poll_interval_secs: 300,
            milestone_step: 5_000_000,
        }
    }
}
