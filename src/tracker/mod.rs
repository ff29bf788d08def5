//! Per-cycle update orchestration.
//!
//! One collection cycle takes a freshly fetched snapshot and, in order:
//! persists it, records a game-version change if any, advances the milestone
//! ladder, and refits the trend to write a forecast onto whichever milestone
//! is now pending. Cycles run strictly one at a time; any storage error
//! aborts the cycle and the next scheduled cycle retries wholesale.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{error, info, warn};

use crate::config::TrackerConfig;
use crate::error::AppResult;
use crate::forecast::predict_crossing;
use crate::milestones::MilestoneLadder;
use crate::roblox::RobloxClient;
use crate::storage::{Snapshot, SqliteStorage, Storage};

/// The current forecast state, as served by the read API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionReport {
    /// Target of the pending milestone, or 0 if no milestone exists yet.
    pub target_visits: i64,
    /// Expected crossing time, absent when no line could be fit.
    pub predicted_at: Option<DateTime<Utc>>,
    /// Fitted growth in visits per day, absent when no line could be fit.
    pub daily_growth: Option<f64>,
}

/// Orchestrates one update cycle per collected snapshot.
pub struct Tracker {
    storage: SqliteStorage,
    ladder: MilestoneLadder,
}

impl Tracker {
    /// Create a new tracker over the given storage.
    pub fn new(storage: SqliteStorage, config: &TrackerConfig) -> Self {
        let ladder = MilestoneLadder::new(storage.clone(), config);
        Self { storage, ladder }
    }

    /// Apply one newly collected snapshot.
    ///
    /// The snapshot is persisted first so the trend refit sees it; then the
    /// ladder advances, and the forecast is recomputed for whichever
    /// milestone is pending afterwards. A degenerate fit overwrites any
    /// previous forecast with nothing, so a stale prediction cannot linger
    /// once the trend turns flat.
    pub async fn apply_snapshot(&self, snapshot: &Snapshot) -> AppResult<()> {
        self.storage.append_snapshot(snapshot).await?;
        self.record_version_change(snapshot).await?;
        self.ladder.advance(snapshot.visits).await?;
        self.refresh_forecast().await?;

        info!(
            visits = snapshot.visits,
            playing = snapshot.playing,
            "Snapshot applied"
        );
        Ok(())
    }

    /// Compute the current forecast from stored state.
    ///
    /// Used both at the end of a cycle and on demand by the read API.
    pub async fn current_prediction(&self) -> AppResult<PredictionReport> {
        let Some(pending) = self.storage.pending_milestone().await? else {
            return Ok(PredictionReport {
                target_visits: 0,
                predicted_at: None,
                daily_growth: None,
            });
        };

        let history = self.storage.visit_history().await?;
        let forecast = predict_crossing(&history, pending.target_visits);

        Ok(PredictionReport {
            target_visits: pending.target_visits,
            predicted_at: forecast.predicted_at,
            daily_growth: forecast.daily_growth,
        })
    }

    /// Refit the trend and write the result onto the pending milestone.
    async fn refresh_forecast(&self) -> AppResult<()> {
        let Some(pending) = self.storage.pending_milestone().await? else {
            return Ok(());
        };

        let history = self.storage.visit_history().await?;
        let forecast = predict_crossing(&history, pending.target_visits);

        self.storage
            .set_pending_prediction(forecast.predicted_at)
            .await?;

        if let Some(predicted_at) = forecast.predicted_at {
            info!(
                target_visits = pending.target_visits,
                predicted_at = %predicted_at,
                "Forecast updated"
            );
        }

        Ok(())
    }

    /// Append a version row when the parsed game version changed.
    async fn record_version_change(&self, snapshot: &Snapshot) -> AppResult<()> {
        let Some(version) = &snapshot.version else {
            return Ok(());
        };

        let last = self.storage.latest_version().await?;
        if last.map_or(true, |v| v.version != *version) {
            self.storage
                .record_version(version, snapshot.collected_at)
                .await?;
            info!(version = %version, "New game version detected");
        }

        Ok(())
    }
}

/// Spawn the periodic collection loop.
///
/// The first tick fires immediately, so one cycle runs at startup. A failed
/// fetch or a failed cycle is logged and skipped; the loop itself never
/// stops. Cycles cannot overlap: the next tick is not awaited until the
/// current cycle completes.
pub fn spawn_collection_loop(
    client: RobloxClient,
    tracker: Arc<Tracker>,
    poll_interval_secs: u64,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(Duration::from_secs(poll_interval_secs));

        loop {
            ticker.tick().await;

            let snapshot = match client.fetch_snapshot().await {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    warn!(error = %e, "Failed to fetch game snapshot, skipping cycle");
                    continue;
                }
            };

            if let Err(e) = tracker.apply_snapshot(&snapshot).await {
                error!(error = %e, "Update cycle failed");
            }
        }
    })
}
