use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use tracing::info;

use super::{GameVersion, Milestone, MilestoneStatus, Snapshot, Storage, VisitPoint};
use crate::config::DatabaseConfig;
use crate::error::{StorageError, StorageResult};

/// Static migrator that embeds migrations at compile time
static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// SQLite-backed storage implementation
#[derive(Clone)]
pub struct SqliteStorage {
    pool: SqlitePool,
}

impl SqliteStorage {
    /// Create a new SQLite storage instance
    pub async fn new(config: &DatabaseConfig) -> StorageResult<Self> {
        // Ensure parent directory exists
        if let Some(parent) = config.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StorageError::Connection {
                message: format!("Failed to create database directory: {}", e),
            })?;
        }

        let database_url = format!("sqlite://{}?mode=rwc", config.path.display());

        let options = SqliteConnectOptions::from_str(&database_url)
            .map_err(|e| StorageError::Connection {
                message: format!("Invalid database URL: {}", e),
            })?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await
            .map_err(|e| StorageError::Connection {
                message: format!("Failed to connect to database: {}", e),
            })?;

        let storage = Self { pool };
        storage.run_migrations().await?;

        Ok(storage)
    }

    /// Create an in-memory storage instance, used by tests
    pub async fn new_in_memory() -> StorageResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:").map_err(|e| {
            StorageError::Connection {
                message: format!("Invalid database URL: {}", e),
            }
        })?;

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| StorageError::Connection {
                message: format!("Failed to connect to database: {}", e),
            })?;

        let storage = Self { pool };
        storage.run_migrations().await?;

        Ok(storage)
    }

    /// Run database migrations using embedded sqlx migrations
    async fn run_migrations(&self) -> StorageResult<()> {
        info!("Running database migrations...");

        MIGRATOR
            .run(&self.pool)
            .await
            .map_err(|e| StorageError::Migration {
                message: format!("Failed to run migrations: {}", e),
            })?;

        info!("Database migrations completed successfully");
        Ok(())
    }

    /// Get the underlying pool for advanced queries
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl Storage for SqliteStorage {
    async fn append_snapshot(&self, snapshot: &Snapshot) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO snapshots (
                collected_at, universe_id, name, visits, playing, favorites,
                up_votes, down_votes, version
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(snapshot.collected_at.to_rfc3339())
        .bind(snapshot.universe_id)
        .bind(&snapshot.name)
        .bind(snapshot.visits)
        .bind(snapshot.playing)
        .bind(snapshot.favorites)
        .bind(snapshot.up_votes)
        .bind(snapshot.down_votes)
        .bind(&snapshot.version)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn latest_snapshot(&self) -> StorageResult<Option<Snapshot>> {
        let row: Option<SnapshotRow> = sqlx::query_as(
            r#"
            SELECT collected_at, universe_id, name, visits, playing, favorites,
                   up_votes, down_votes, version
            FROM snapshots
            ORDER BY collected_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;

        row.map(Snapshot::try_from).transpose()
    }

    async fn visit_history(&self) -> StorageResult<Vec<VisitPoint>> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            r#"
            SELECT collected_at, visits
            FROM snapshots
            ORDER BY collected_at ASC, id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(collected_at, visits)| {
                Ok(VisitPoint {
                    collected_at: parse_timestamp(&collected_at)?,
                    visits,
                })
            })
            .collect()
    }

    async fn insert_milestone(
        &self,
        target_visits: i64,
        created_at: DateTime<Utc>,
    ) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO milestones (target_visits, created_at)
            VALUES (?, ?)
            "#,
        )
        .bind(target_visits)
        .bind(created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn frontier_milestone(&self) -> StorageResult<Option<Milestone>> {
        let row: Option<MilestoneRow> = sqlx::query_as(
            r#"
            SELECT target_visits, achieved_at, predicted_at, created_at
            FROM milestones
            ORDER BY target_visits DESC
            LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;

        row.map(Milestone::try_from).transpose()
    }

    async fn pending_milestone(&self) -> StorageResult<Option<Milestone>> {
        let row: Option<MilestoneRow> = sqlx::query_as(
            r#"
            SELECT target_visits, achieved_at, predicted_at, created_at
            FROM milestones
            WHERE achieved_at IS NULL
            ORDER BY target_visits ASC
            LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;

        row.map(Milestone::try_from).transpose()
    }

    async fn list_milestones(&self) -> StorageResult<Vec<Milestone>> {
        let rows: Vec<MilestoneRow> = sqlx::query_as(
            r#"
            SELECT target_visits, achieved_at, predicted_at, created_at
            FROM milestones
            ORDER BY target_visits ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Milestone::try_from).collect()
    }

    async fn mark_achieved(&self, target_visits: i64, at: DateTime<Utc>) -> StorageResult<()> {
        // Achievement is one-way: never overwrite an existing timestamp.
        let result = sqlx::query(
            r#"
            UPDATE milestones
            SET achieved_at = ?
            WHERE target_visits = ? AND achieved_at IS NULL
            "#,
        )
        .bind(at.to_rfc3339())
        .bind(target_visits)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            let exists: Option<(i64,)> =
                sqlx::query_as("SELECT target_visits FROM milestones WHERE target_visits = ?")
                    .bind(target_visits)
                    .fetch_optional(&self.pool)
                    .await?;
            if exists.is_none() {
                return Err(StorageError::MilestoneNotFound { target_visits });
            }
        }

        Ok(())
    }

    async fn set_pending_prediction(
        &self,
        predicted_at: Option<DateTime<Utc>>,
    ) -> StorageResult<()> {
        sqlx::query(
            r#"
            UPDATE milestones
            SET predicted_at = ?
            WHERE id = (
                SELECT id FROM milestones
                WHERE achieved_at IS NULL
                ORDER BY target_visits ASC
                LIMIT 1
            )
            "#,
        )
        .bind(predicted_at.map(|ts| ts.to_rfc3339()))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn latest_version(&self) -> StorageResult<Option<GameVersion>> {
        let row: Option<VersionRow> = sqlx::query_as(
            r#"
            SELECT version, detected_at
            FROM versions
            ORDER BY id DESC
            LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;

        row.map(GameVersion::try_from).transpose()
    }

    async fn record_version(
        &self,
        version: &str,
        detected_at: DateTime<Utc>,
    ) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO versions (version, detected_at)
            VALUES (?, ?)
            "#,
        )
        .bind(version)
        .bind(detected_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_versions(&self) -> StorageResult<Vec<GameVersion>> {
        let rows: Vec<VersionRow> = sqlx::query_as(
            r#"
            SELECT version, detected_at
            FROM versions
            ORDER BY detected_at DESC, id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(GameVersion::try_from).collect()
    }
}

// A stored timestamp that fails to parse indicates corruption; surfacing it
// beats fabricating a point the regression would silently absorb.
fn parse_timestamp(raw: &str) -> StorageResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StorageError::Query {
            message: format!("Invalid stored timestamp {:?}: {}", raw, e),
        })
}

// Internal row types for SQLx mapping
#[derive(sqlx::FromRow)]
struct SnapshotRow {
    collected_at: String,
    universe_id: i64,
    name: String,
    visits: i64,
    playing: i64,
    favorites: i64,
    up_votes: i64,
    down_votes: i64,
    version: Option<String>,
}

impl TryFrom<SnapshotRow> for Snapshot {
    type Error = StorageError;

    fn try_from(row: SnapshotRow) -> Result<Self, Self::Error> {
        Ok(Self {
            collected_at: parse_timestamp(&row.collected_at)?,
            universe_id: row.universe_id,
            name: row.name,
            visits: row.visits,
            playing: row.playing,
            favorites: row.favorites,
            up_votes: row.up_votes,
            down_votes: row.down_votes,
            version: row.version,
        })
    }
}

#[derive(sqlx::FromRow)]
struct MilestoneRow {
    target_visits: i64,
    achieved_at: Option<String>,
    predicted_at: Option<String>,
    created_at: String,
}

impl TryFrom<MilestoneRow> for Milestone {
    type Error = StorageError;

    fn try_from(row: MilestoneRow) -> Result<Self, Self::Error> {
        let status = match row.achieved_at {
            Some(at) => MilestoneStatus::Achieved {
                at: parse_timestamp(&at)?,
            },
            None => MilestoneStatus::Pending {
                predicted_at: row
                    .predicted_at
                    .as_deref()
                    .map(parse_timestamp)
                    .transpose()?,
            },
        };

        Ok(Self {
            target_visits: row.target_visits,
            status,
            created_at: parse_timestamp(&row.created_at)?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct VersionRow {
    version: String,
    detected_at: String,
}

impl TryFrom<VersionRow> for GameVersion {
    type Error = StorageError;

    fn try_from(row: VersionRow) -> Result<Self, Self::Error> {
        Ok(Self {
            version: row.version,
            detected_at: parse_timestamp(&row.detected_at)?,
        })
    }
}
