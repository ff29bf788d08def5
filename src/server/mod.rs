//! Read-only HTTP API.
//!
//! Serves the latest snapshot, the milestone ladder, the current forecast,
//! and the detected version history. All routes are reads; the collection
//! loop is the only writer and runs independently.

mod routes;

pub use routes::{api_routes, health_routes};

use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::Config;
use crate::storage::SqliteStorage;
use crate::tracker::Tracker;

/// Application state shared across handlers.
pub struct AppState {
    /// SQLite storage backend.
    pub storage: SqliteStorage,
    /// Tracker, used for on-demand forecast computation.
    pub tracker: Arc<Tracker>,
}

impl AppState {
    /// Create new application state
    pub fn new(storage: SqliteStorage, tracker: Arc<Tracker>) -> Self {
        Self { storage, tracker }
    }
}

/// Build the application router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(api_routes())
        .merge(health_routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Run the HTTP server until shutdown.
pub async fn run(state: AppState, config: &Config) -> Result<()> {
    let app = router(Arc::new(state));

    let addr = config.server.listen_addr;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
