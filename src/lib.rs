//! # Visitfall
//!
//! A service that tracks cumulative visit counts for a Roblox place and
//! forecasts when the next visit milestone will be reached.
//!
//! ## Features
//!
//! - **Collection**: polls the Roblox universe, game-details, and votes
//!   endpoints on a fixed interval and records immutable snapshots
//! - **Milestone Ladder**: a gapless sequence of visit-count targets
//!   (fixed step) advanced and achieved as snapshots arrive
//! - **Trend Forecast**: an ordinary-least-squares fit over the full visit
//!   history predicting when the pending milestone will be crossed
//! - **Version History**: game versions parsed from the title, recorded on
//!   change
//! - **Read API**: latest snapshot, milestones, forecast, and versions over
//!   a small HTTP surface
//!
//! ## Architecture
//!
//! ```text
//! Roblox APIs → Collector → Tracker → SQLite
//!                              ↓
//!                     Milestone Ladder + OLS Forecast
//!                              ↓
//!                      HTTP read API (axum)
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use visitfall::{Config, RobloxClient, SqliteStorage, Tracker};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let storage = SqliteStorage::new(&config.database).await?;
//!     let client = RobloxClient::new(
//!         config.tracker.place_id,
//!         &config.roblox,
//!         config.request.clone(),
//!     )?;
//!     let tracker = Arc::new(Tracker::new(storage.clone(), &config.tracker));
//!     visitfall::tracker::spawn_collection_loop(
//!         client,
//!         tracker.clone(),
//!         config.tracker.poll_interval_secs,
//!     );
//!     let state = visitfall::server::AppState::new(storage, tracker);
//!     visitfall::server::run(state, &config).await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]

/// Configuration management for the service.
pub mod config;
/// Error types and result aliases for the application.
pub mod error;
/// Trend fitting and milestone crossing forecasts.
pub mod forecast;
/// Milestone ladder maintenance.
pub mod milestones;
/// Roblox API client and wire types.
pub mod roblox;
/// HTTP read API.
pub mod server;
/// SQLite storage layer for persistence.
pub mod storage;
/// Per-cycle update orchestration and the collection loop.
pub mod tracker;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use forecast::{predict_crossing, Forecast};
pub use milestones::MilestoneLadder;
pub use roblox::RobloxClient;
pub use storage::{Milestone, MilestoneStatus, Snapshot, SqliteStorage, Storage};
pub use tracker::{PredictionReport, Tracker};
