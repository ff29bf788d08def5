//! Integration tests for the milestone ladder
//!
//! Exercises ladder advancement against an in-memory store and checks the
//! structural invariants: gapless targets, one-way achievement, idempotent
//! re-application.

use visitfall::config::TrackerConfig;
use visitfall::milestones::MilestoneLadder;
use visitfall::storage::{Milestone, SqliteStorage, Storage};

const STEP: i64 = 5_000_000;

async fn create_test_ladder() -> (MilestoneLadder, SqliteStorage) {
    let storage = SqliteStorage::new_in_memory()
        .await
        .expect("Failed to create in-memory storage");
    let config = TrackerConfig {
        milestone_step: STEP,
        ..TrackerConfig::default()
    };
    (MilestoneLadder::new(storage.clone(), &config), storage)
}

fn targets(milestones: &[Milestone]) -> Vec<i64> {
    milestones.iter().map(|m| m.target_visits).collect()
}

#[tokio::test]
async fn test_first_advance_bootstraps_ladder() {
    let (ladder, storage) = create_test_ladder().await;

    ladder.advance(1_000).await.unwrap();

    let milestones = storage.list_milestones().await.unwrap();
    assert_eq!(targets(&milestones), vec![STEP]);
    assert!(milestones[0].is_pending());
}

#[tokio::test]
async fn test_advance_achieves_reached_target() {
    let (ladder, storage) = create_test_ladder().await;

    ladder.advance(1_000).await.unwrap();
    ladder.advance(STEP).await.unwrap();

    let milestones = storage.list_milestones().await.unwrap();
    assert_eq!(targets(&milestones), vec![STEP, 2 * STEP]);
    assert!(milestones[0].achieved_at().is_some());
    assert!(milestones[1].is_pending());
}

#[tokio::test]
async fn test_jump_ahead_creates_gapless_ladder_in_one_call() {
    let (ladder, storage) = create_test_ladder().await;

    // 12M with a 5M step: 5M and 10M both crossed, 15M pending.
    ladder.advance(12_000_000).await.unwrap();

    let milestones = storage.list_milestones().await.unwrap();
    assert_eq!(targets(&milestones), vec![STEP, 2 * STEP, 3 * STEP]);
    assert!(milestones[0].achieved_at().is_some());
    assert!(milestones[1].achieved_at().is_some());
    assert!(milestones[2].is_pending());
}

#[tokio::test]
async fn test_idempotent_reapply() {
    let (ladder, storage) = create_test_ladder().await;

    ladder.advance(12_000_000).await.unwrap();
    let before = storage.list_milestones().await.unwrap();

    ladder.advance(12_000_000).await.unwrap();
    let after = storage.list_milestones().await.unwrap();

    assert_eq!(before, after, "Re-applying the same count must change nothing");
}

#[tokio::test]
async fn test_achievement_is_monotone_under_count_regression() {
    let (ladder, storage) = create_test_ladder().await;

    ladder.advance(6_000_000).await.unwrap();
    let achieved_at = storage.list_milestones().await.unwrap()[0]
        .achieved_at()
        .expect("5M should be achieved");

    // Upstream count drops below the achieved target; achievement stays.
    ladder.advance(4_000_000).await.unwrap();

    let milestones = storage.list_milestones().await.unwrap();
    assert_eq!(milestones[0].achieved_at(), Some(achieved_at));
    assert_eq!(targets(&milestones), vec![STEP, 2 * STEP]);
}

#[tokio::test]
async fn test_gapless_over_arbitrary_sequence() {
    let (ladder, storage) = create_test_ladder().await;

    let counts = [1_000, 4_999_999, 5_000_000, 3_000_000, 17_500_000, 17_500_000];
    for count in counts {
        ladder.advance(count).await.unwrap();
    }

    // Smallest k with k*step > max(counts) is 4: ladder is {5M..20M}.
    let milestones = storage.list_milestones().await.unwrap();
    assert_eq!(
        targets(&milestones),
        vec![STEP, 2 * STEP, 3 * STEP, 4 * STEP]
    );

    // Everything below the frontier is achieved; the frontier is pending.
    for milestone in &milestones[..3] {
        assert!(milestone.achieved_at().is_some());
    }
    assert!(milestones[3].is_pending());
}

#[tokio::test]
async fn test_exact_threshold_achieves_and_extends() {
    let (ladder, storage) = create_test_ladder().await;

    // Exactly on the first target: achieved, and the next target created.
    ladder.advance(STEP).await.unwrap();

    let milestones = storage.list_milestones().await.unwrap();
    assert_eq!(targets(&milestones), vec![STEP, 2 * STEP]);
    assert!(milestones[0].achieved_at().is_some());
    assert!(milestones[1].is_pending());
}

#[tokio::test]
async fn test_exactly_one_pending_milestone() {
    let (ladder, storage) = create_test_ladder().await;

    for count in [2_000_000, 8_000_000, 23_000_000] {
        ladder.advance(count).await.unwrap();

        let pending: Vec<Milestone> = storage
            .list_milestones()
            .await
            .unwrap()
            .into_iter()
            .filter(Milestone::is_pending)
            .collect();
        assert_eq!(pending.len(), 1, "Exactly one milestone is pending");
    }
}
