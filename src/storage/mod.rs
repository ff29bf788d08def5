//! Storage layer for snapshot and milestone persistence.
//!
//! This module provides SQLite-based storage for collected game snapshots,
//! the milestone ladder, and detected game-version history.

mod sqlite;

pub use sqlite::SqliteStorage;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StorageResult;

/// A single collected game snapshot.
///
/// Snapshots are immutable once written and are retrieved in ascending
/// `collected_at` order. Visit counts are not guaranteed to be strictly
/// increasing between snapshots; the upstream API may plateau or briefly
/// report a lower count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// When the snapshot was collected.
    pub collected_at: DateTime<Utc>,
    /// Roblox universe identifier.
    pub universe_id: i64,
    /// Game name at collection time.
    pub name: String,
    /// Cumulative visit count.
    pub visits: i64,
    /// Concurrent player count.
    pub playing: i64,
    /// Favorite count.
    pub favorites: i64,
    /// Upvote count.
    pub up_votes: i64,
    /// Downvote count.
    pub down_votes: i64,
    /// Version parsed from the game title, if any.
    pub version: Option<String>,
}

/// A `(time, visits)` observation used by the trend fit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisitPoint {
    /// When the observation was collected.
    pub collected_at: DateTime<Utc>,
    /// Cumulative visit count at that instant.
    pub visits: i64,
}

/// A visit-count milestone on the ladder.
///
/// Targets are strictly increasing multiples of the configured step with no
/// gaps. Exactly one milestone is pending at any time: the smallest target
/// whose status is [`MilestoneStatus::Pending`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Milestone {
    /// The visit count this milestone tracks.
    pub target_visits: i64,
    /// Achievement state, including the current forecast while pending.
    pub status: MilestoneStatus,
    /// When the milestone row was created.
    pub created_at: DateTime<Utc>,
}

/// Achievement state of a milestone.
///
/// The transition from `Pending` to `Achieved` is one-way: once achieved,
/// a milestone never reverts, even if the upstream visit count regresses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum MilestoneStatus {
    /// Not yet reached; carries the latest forecast, if one could be fit.
    Pending {
        predicted_at: Option<DateTime<Utc>>,
    },
    /// Reached at the recorded instant.
    Achieved { at: DateTime<Utc> },
}

impl Milestone {
    /// When this milestone was achieved, if it has been.
    pub fn achieved_at(&self) -> Option<DateTime<Utc>> {
        match self.status {
            MilestoneStatus::Achieved { at } => Some(at),
            MilestoneStatus::Pending { .. } => None,
        }
    }

    /// The forecast crossing time, meaningful only while pending.
    pub fn predicted_at(&self) -> Option<DateTime<Utc>> {
        match self.status {
            MilestoneStatus::Pending { predicted_at } => predicted_at,
            MilestoneStatus::Achieved { .. } => None,
        }
    }

    /// Whether this milestone is still pending.
    pub fn is_pending(&self) -> bool {
        matches!(self.status, MilestoneStatus::Pending { .. })
    }
}

/// A detected game version, recorded when the title's version changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameVersion {
    /// Semantic version parsed from the game title.
    pub version: String,
    /// When the change was first observed.
    pub detected_at: DateTime<Utc>,
}

/// Persistence operations required by the tracker and the read API.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Append one snapshot row.
    async fn append_snapshot(&self, snapshot: &Snapshot) -> StorageResult<()>;

    /// The most recently collected snapshot.
    async fn latest_snapshot(&self) -> StorageResult<Option<Snapshot>>;

    /// All `(collected_at, visits)` points, ascending by collection time.
    async fn visit_history(&self) -> StorageResult<Vec<VisitPoint>>;

    /// Insert a new milestone with the given target, unachieved.
    async fn insert_milestone(
        &self,
        target_visits: i64,
        created_at: DateTime<Utc>,
    ) -> StorageResult<()>;

    /// The milestone with the largest target, if any.
    async fn frontier_milestone(&self) -> StorageResult<Option<Milestone>>;

    /// The smallest-target unachieved milestone, if any.
    async fn pending_milestone(&self) -> StorageResult<Option<Milestone>>;

    /// All milestones, ascending by target.
    async fn list_milestones(&self) -> StorageResult<Vec<Milestone>>;

    /// Set `achieved_at` on the milestone with the given target.
    ///
    /// Errors with [`crate::error::StorageError::MilestoneNotFound`] if no
    /// such target exists.
    async fn mark_achieved(&self, target_visits: i64, at: DateTime<Utc>) -> StorageResult<()>;

    /// Write the forecast onto the current pending milestone.
    ///
    /// `None` clears any previous forecast; a stale prediction must not
    /// survive a degenerate fit. A no-op when no milestone is pending.
    async fn set_pending_prediction(
        &self,
        predicted_at: Option<DateTime<Utc>>,
    ) -> StorageResult<()>;

    /// The most recently detected game version.
    async fn latest_version(&self) -> StorageResult<Option<GameVersion>>;

    /// Record a newly detected game version.
    async fn record_version(&self, version: &str, detected_at: DateTime<Utc>)
        -> StorageResult<()>;

    /// All detected versions, newest first.
    async fn list_versions(&self) -> StorageResult<Vec<GameVersion>>;
}
