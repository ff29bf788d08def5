//! Milestone ladder maintenance.
//!
//! The ladder is the ordered, gapless sequence of visit-count targets spaced
//! by the configured step. [`MilestoneLadder::advance`] is called once per
//! collection cycle with the current cumulative visit count and moves the
//! ladder forward: achieving reached targets and creating new ones until the
//! frontier target exceeds the current count.

use chrono::Utc;
use tracing::{debug, info};

use crate::config::TrackerConfig;
use crate::error::StorageResult;
use crate::storage::{SqliteStorage, Storage};

/// Maintains the milestone ladder against the store.
pub struct MilestoneLadder {
    storage: SqliteStorage,
    step: i64,
}

impl MilestoneLadder {
    /// Create a new ladder over the given storage.
    pub fn new(storage: SqliteStorage, config: &TrackerConfig) -> Self {
        Self {
            storage,
            step: config.milestone_step,
        }
    }

    /// Advance the ladder for the given cumulative visit count.
    ///
    /// Creates the first milestone (`target = step`) on an empty ladder,
    /// marks every reached target achieved, and extends the ladder until the
    /// frontier target exceeds `current_visits`. A count that jumps past
    /// several targets in one cycle (collector offline for a while) still
    /// produces a gapless ladder with each passed target achieved.
    ///
    /// Idempotent: repeating a call with the same or a smaller count changes
    /// nothing. Achievement is one-way; a transient upstream drop in the
    /// visit count never retracts an achieved milestone.
    pub async fn advance(&self, current_visits: i64) -> StorageResult<()> {
        let now = Utc::now();

        let mut frontier_target = match self.storage.frontier_milestone().await? {
            Some(frontier) => {
                if frontier.is_pending() && current_visits >= frontier.target_visits {
                    self.storage.mark_achieved(frontier.target_visits, now).await?;
                    info!(
                        target_visits = frontier.target_visits,
                        current_visits, "Milestone achieved"
                    );
                }
                frontier.target_visits
            }
            None => {
                // Lazy bootstrap: first observation seeds the ladder.
                self.storage.insert_milestone(self.step, now).await?;
                debug!(target_visits = self.step, "Milestone ladder bootstrapped");
                if current_visits >= self.step {
                    self.storage.mark_achieved(self.step, now).await?;
                    info!(
                        target_visits = self.step,
                        current_visits, "Milestone achieved"
                    );
                }
                self.step
            }
        };

        // Extend until the frontier is strictly ahead of the current count.
        while frontier_target <= current_visits {
            let next_target = frontier_target + self.step;
            self.storage.insert_milestone(next_target, now).await?;
            debug!(target_visits = next_target, "Milestone created");

            if next_target <= current_visits {
                self.storage.mark_achieved(next_target, now).await?;
                info!(
                    target_visits = next_target,
                    current_visits, "Milestone achieved"
                );
            }

            frontier_target = next_target;
        }

        Ok(())
    }

    /// The configured target spacing.
    pub fn step(&self) -> i64 {
        self.step
    }
}
