//! API routes for the read surface.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::error;

use crate::server::AppState;
use crate::storage::{Milestone, Snapshot, Storage};

type AppStateArc = Arc<AppState>;

/// Read API routes.
pub fn api_routes() -> Router<AppStateArc> {
    Router::new()
        .route("/api/latest", get(latest_snapshot))
        .route("/api/milestones", get(list_milestones))
        .route("/api/prediction", get(current_prediction))
        .route("/api/versions", get(list_versions))
}

/// Liveness routes.
pub fn health_routes() -> Router<AppStateArc> {
    Router::new().route("/health", get(health))
}

/// Latest snapshot, or a distinct no-data marker on an empty store.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum LatestResponse {
    Data(SnapshotView),
    NoData { status: &'static str },
}

/// Snapshot shape served by `/api/latest`.
#[derive(Debug, Serialize)]
pub struct SnapshotView {
    pub collected_at: DateTime<Utc>,
    pub name: String,
    pub visits: i64,
    pub playing: i64,
    pub favorites: i64,
    pub up_votes: i64,
    pub down_votes: i64,
    pub version: Option<String>,
}

impl From<Snapshot> for SnapshotView {
    fn from(snapshot: Snapshot) -> Self {
        Self {
            collected_at: snapshot.collected_at,
            name: snapshot.name,
            visits: snapshot.visits,
            playing: snapshot.playing,
            favorites: snapshot.favorites,
            up_votes: snapshot.up_votes,
            down_votes: snapshot.down_votes,
            version: snapshot.version,
        }
    }
}

/// Milestone shape served by `/api/milestones`.
#[derive(Debug, Serialize)]
pub struct MilestoneView {
    pub target_visits: i64,
    pub achieved_at: Option<DateTime<Utc>>,
    pub predicted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<Milestone> for MilestoneView {
    fn from(milestone: Milestone) -> Self {
        Self {
            target_visits: milestone.target_visits,
            achieved_at: milestone.achieved_at(),
            predicted_at: milestone.predicted_at(),
            created_at: milestone.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MilestonesResponse {
    pub milestones: Vec<MilestoneView>,
}

#[derive(Debug, Serialize)]
pub struct PredictionResponse {
    pub target_visits: i64,
    pub predicted_at: Option<DateTime<Utc>>,
    pub daily_growth: Option<f64>,
    pub calculated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct VersionView {
    pub version: String,
    pub detected_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct VersionsResponse {
    pub versions: Vec<VersionView>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

async fn latest_snapshot(
    State(state): State<AppStateArc>,
) -> Result<Json<LatestResponse>, (StatusCode, String)> {
    let snapshot = state.storage.latest_snapshot().await.map_err(|e| {
        error!(error = %e, "Failed to load latest snapshot");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;

    // An empty store is a valid state, not an error.
    let response = match snapshot {
        Some(snapshot) => LatestResponse::Data(snapshot.into()),
        None => LatestResponse::NoData { status: "no_data" },
    };

    Ok(Json(response))
}

async fn list_milestones(
    State(state): State<AppStateArc>,
) -> Result<Json<MilestonesResponse>, (StatusCode, String)> {
    let milestones = state.storage.list_milestones().await.map_err(|e| {
        error!(error = %e, "Failed to list milestones");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;

    Ok(Json(MilestonesResponse {
        milestones: milestones.into_iter().map(MilestoneView::from).collect(),
    }))
}

async fn current_prediction(
    State(state): State<AppStateArc>,
) -> Result<Json<PredictionResponse>, (StatusCode, String)> {
    let report = state.tracker.current_prediction().await.map_err(|e| {
        error!(error = %e, "Failed to compute prediction");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;

    Ok(Json(PredictionResponse {
        target_visits: report.target_visits,
        predicted_at: report.predicted_at,
        daily_growth: report.daily_growth,
        calculated_at: Utc::now(),
    }))
}

async fn list_versions(
    State(state): State<AppStateArc>,
) -> Result<Json<VersionsResponse>, (StatusCode, String)> {
    let versions = state.storage.list_versions().await.map_err(|e| {
        error!(error = %e, "Failed to list versions");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;

    Ok(Json(VersionsResponse {
        versions: versions
            .into_iter()
            .map(|v| VersionView {
                version: v.version,
                detected_at: v.detected_at,
            })
            .collect(),
    }))
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}
