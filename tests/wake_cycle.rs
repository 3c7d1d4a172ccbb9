//! Full wake-cycle integration tests
//!
//! Drives complete cycles through in-memory collaborators:
//! - static feed, fixed test runner and fixed health
//! - in-memory state store (with simulated write failures)
//! - the interval daemon, cancelled while a wake is running
//! - real artifact, daily-log and journal files under a temp home

use chrono::{Duration as ChronoDuration, Utc};
use clawgotchi::agent::WakeCycle;
use clawgotchi::config::ClawConfig;
use clawgotchi::error::{CycleError, PersistenceError};
use clawgotchi::executors::{ActionExecutors, ExecutorSettings};
use clawgotchi::feed::StaticFeed;
use clawgotchi::health::FixedHealth;
use clawgotchi::memory::DailyLog;
use clawgotchi::heartbeat::WakeDaemon;
use clawgotchi::runner::FixedTestRunner;
use clawgotchi::scoring::RelevanceScorer;
use clawgotchi::skills::{artifact_dir, ACCEPTED_MARKER};
use clawgotchi::state::{CycleJournal, MemoryStore, Snapshot};
use clawgotchi::types::{ActionKind, FeedPost, IdeaStatus, IdeaSubmission};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

// =============================================================================
// Harness
// =============================================================================

fn config_for(home: &Path) -> ClawConfig {
    ClawConfig::default().with_home(home)
}

fn wake_cycle(
    config: ClawConfig,
    store: Arc<MemoryStore>,
    feed: StaticFeed,
    runner: FixedTestRunner,
) -> WakeCycle {
    let executors = ActionExecutors::new(
        Arc::new(feed),
        Arc::new(runner),
        RelevanceScorer::new(config.scoring.clone()),
        ExecutorSettings::from_config(&config),
    );
    WakeCycle::new(config, store, Arc::new(FixedHealth(90)), executors)
}

/// Seed the store with a cycle index and optionally a mature "X" candidate.
fn seed(store: &MemoryStore, cycle_index: u64, with_x: bool, x_rejected: bool) -> Snapshot {
    let mut snapshot = Snapshot::default();
    snapshot.cycle.cycle_index = cycle_index;
    if with_x {
        let now = Utc::now();
        for source in ["feed:1", "feed:2", "feed:3"] {
            snapshot.queue.add(
                IdeaSubmission {
                    topic: "X".into(),
                    source: source.into(),
                    categories: ["memory_systems".to_string(), "identity".to_string()]
                        .into_iter()
                        .collect(),
                    score: 0.8,
                },
                now,
            );
        }
    }
    if x_rejected {
        snapshot
            .ledger
            .record_rejection("X", "not interesting", "scope")
            .unwrap();
    }
    snapshot.save(store).unwrap();
    snapshot
}

fn load(store: &MemoryStore) -> Snapshot {
    Snapshot::load(store).unwrap()
}

fn post(id: &str, title: &str, body: &str) -> FeedPost {
    FeedPost {
        id: id.into(),
        title: title.into(),
        body: body.into(),
        author: "molty".into(),
        timestamp: None,
    }
}

/// Ten posts, exactly three of which qualify.
fn mixed_feed() -> Vec<FeedPost> {
    vec![
        post("1", "Memory decay for assumption tracking", ""),
        post("2", "Taste fingerprint of rejection and memory archive", ""),
        post("3", "Heartbeat health monitor that can verify belief", ""),
        post("4", "Memory palace tips", "Chapter 1: once upon a time"),
        post("5", "Free SOL airdrop", "memory and taste for everyone"),
        post("6", "Cooking pasta", "boil water"),
        post("7", "Memory retention tricks", "forget less"),
        post("8", "", ""),
        post("9", "Identity persona taste", ""),
        post("10", "Subscribe for memory and belief updates", ""),
    ]
}

// =============================================================================
// Decision scenarios
// =============================================================================

#[tokio::test]
async fn test_cycle_three_verifies_regardless_of_queue() {
    let home = TempDir::new().unwrap();
    let store = Arc::new(MemoryStore::new());
    seed(&store, 3, true, false);

    let cycle = wake_cycle(
        config_for(home.path()),
        store.clone(),
        StaticFeed::default(),
        FixedTestRunner::passing(),
    );
    let report = cycle.run_once().await.unwrap();

    assert_eq!(report.cycle_index, 3);
    assert_eq!(report.chosen, ActionKind::Verify);
    assert!(report.success);

    let after = load(&store);
    assert_eq!(after.cycle.cycle_index, 4);
    assert_eq!(after.cycle.last_action, ActionKind::Verify);
    assert_eq!(after.queue.entries()[0].status, IdeaStatus::Mature);
}

#[tokio::test]
async fn test_cycle_seven_builds_mature_candidate() {
    let home = TempDir::new().unwrap();
    let store = Arc::new(MemoryStore::new());
    seed(&store, 7, true, false);

    let config = config_for(home.path());
    let artifacts = config.resolved_artifacts_dir();
    let cycle = wake_cycle(
        config,
        store.clone(),
        StaticFeed::default(),
        FixedTestRunner::passing(),
    );
    let report = cycle.run_once().await.unwrap();

    assert_eq!(report.chosen, ActionKind::Build);
    assert_eq!(report.recorded, ActionKind::Build);
    assert!(report.description.contains('X'));

    let after = load(&store);
    let x = &after.queue.entries()[0];
    assert_eq!(x.status, IdeaStatus::Built);
    assert!(after.ledger.is_empty());
    let dir = artifact_dir(&artifacts, x);
    assert!(dir.join("SKILL.md").is_file());
    assert!(dir.join(ACCEPTED_MARKER).is_file());
}

#[tokio::test]
async fn test_rejected_candidate_rests() {
    let home = TempDir::new().unwrap();
    let store = Arc::new(MemoryStore::new());
    seed(&store, 7, true, true);

    let cycle = wake_cycle(
        config_for(home.path()),
        store.clone(),
        StaticFeed::default(),
        FixedTestRunner::passing(),
    );
    let report = cycle.run_once().await.unwrap();

    assert_eq!(report.chosen, ActionKind::Rest);
    let after = load(&store);
    assert_eq!(after.cycle.cycle_index, 8);
    assert_eq!(after.ledger.len(), 1);
    assert_eq!(after.queue.entries()[0].status, IdeaStatus::Mature);
}

#[tokio::test]
async fn test_old_single_sighting_matures_by_age() {
    let home = TempDir::new().unwrap();
    let store = Arc::new(MemoryStore::new());
    let mut snapshot = Snapshot::default();
    snapshot.cycle.cycle_index = 1;
    snapshot.queue.add(
        IdeaSubmission {
            topic: "Assumption tracker".into(),
            source: "feed:9".into(),
            categories: Default::default(),
            score: 0.3,
        },
        Utc::now(),
    );
    snapshot.save(store.as_ref()).unwrap();

    let cycle = wake_cycle(
        config_for(home.path()),
        store.clone(),
        StaticFeed::default(),
        FixedTestRunner::passing(),
    );

    let report = cycle.run_at(Utc::now()).await.unwrap();
    assert_eq!(report.chosen, ActionKind::Rest);

    // index 2 now; 13 hours later the idea is old enough
    let report = cycle
        .run_at(Utc::now() + ChronoDuration::hours(13))
        .await
        .unwrap();
    assert_eq!(report.chosen, ActionKind::Build);
}

// =============================================================================
// EXPLORE
// =============================================================================

#[tokio::test]
async fn test_explore_queues_exactly_the_qualifying_posts() {
    let home = TempDir::new().unwrap();
    let store = Arc::new(MemoryStore::new());
    seed(&store, 4, false, false);

    let cycle = wake_cycle(
        config_for(home.path()),
        store.clone(),
        StaticFeed::new(mixed_feed()),
        FixedTestRunner::passing(),
    );
    let report = cycle.run_once().await.unwrap();

    assert_eq!(report.chosen, ActionKind::Explore);
    assert!(report.success);

    let after = load(&store);
    assert_eq!(after.queue.size(), 3);
    assert_eq!(after.queue.total_discovered(), 3);
    assert!(after
        .queue
        .entries()
        .iter()
        .all(|e| e.status == IdeaStatus::Pending && e.seen_count == 1));
    assert!(after.ledger.is_empty());
}

#[tokio::test]
async fn test_explore_with_unavailable_feed_succeeds_empty() {
    let home = TempDir::new().unwrap();
    let store = Arc::new(MemoryStore::new());
    seed(&store, 4, false, false);

    let cycle = wake_cycle(
        config_for(home.path()),
        store.clone(),
        StaticFeed::unavailable(),
        FixedTestRunner::passing(),
    );
    let report = cycle.run_once().await.unwrap();

    assert_eq!(report.recorded, ActionKind::Explore);
    assert!(report.success);
    assert!(load(&store).queue.is_empty());
}

#[tokio::test]
async fn test_explore_timeout_falls_back_to_rest_without_ledger_write() {
    let home = TempDir::new().unwrap();
    let store = Arc::new(MemoryStore::new());
    seed(&store, 4, false, false);

    let mut config = config_for(home.path());
    config.wake.explore_timeout_secs = 1;
    let feed = StaticFeed::new(mixed_feed()).with_delay(Duration::from_secs(5));
    let cycle = wake_cycle(config, store.clone(), feed, FixedTestRunner::passing());
    let report = cycle.run_once().await.unwrap();

    assert_eq!(report.chosen, ActionKind::Explore);
    assert_eq!(report.recorded, ActionKind::Rest);
    assert!(!report.success);

    let after = load(&store);
    assert_eq!(after.cycle.cycle_index, 5);
    assert!(after.queue.is_empty());
    assert!(after.ledger.is_empty());
    assert!(after.cycle.last_failure.is_some());
}

// =============================================================================
// BUILD failure
// =============================================================================

#[tokio::test]
async fn test_failed_tests_reject_candidate_with_one_ledger_record() {
    let home = TempDir::new().unwrap();
    let store = Arc::new(MemoryStore::new());
    seed(&store, 7, true, false);

    let config = config_for(home.path());
    let artifacts = config.resolved_artifacts_dir();
    let cycle = wake_cycle(
        config,
        store.clone(),
        StaticFeed::default(),
        FixedTestRunner::failing("2 failed"),
    );
    let report = cycle.run_once().await.unwrap();

    assert_eq!(report.chosen, ActionKind::Build);
    assert_eq!(report.recorded, ActionKind::Rest);
    assert!(!report.success);

    let after = load(&store);
    assert_eq!(after.cycle.cycle_index, 8);
    assert_eq!(after.cycle.last_action, ActionKind::Rest);
    assert_eq!(after.queue.entries()[0].status, IdeaStatus::Rejected);
    assert_eq!(after.ledger.len(), 1);
    assert_eq!(after.ledger.records()[0].category, "build_failure");
    assert_eq!(after.ledger.records()[0].subject, "X");
    assert!(!artifact_dir(&artifacts, &after.queue.entries()[0]).exists());

    // The next free cycle will not try X again.
    let mut snapshot = load(&store);
    snapshot.cycle.cycle_index = 11;
    snapshot.save(store.as_ref()).unwrap();
    let report = cycle.run_once().await.unwrap();
    assert_eq!(report.chosen, ActionKind::Rest);
    assert_eq!(load(&store).ledger.len(), 1);
}

#[tokio::test]
async fn test_interrupted_build_is_tested_again() {
    let home = TempDir::new().unwrap();
    let store = Arc::new(MemoryStore::new());
    seed(&store, 7, true, false);
    let artifacts = config_for(home.path()).resolved_artifacts_dir();

    // The wake is dropped while its tests are still running.
    let hanging = wake_cycle(
        config_for(home.path()),
        store.clone(),
        StaticFeed::default(),
        FixedTestRunner::passing().with_delay(Duration::from_secs(3600)),
    );
    assert!(
        tokio::time::timeout(Duration::from_millis(200), hanging.run_once())
            .await
            .is_err()
    );
    let x = load(&store).queue.entries()[0].clone();
    assert_eq!(load(&store).cycle.cycle_index, 7);
    assert!(!artifact_dir(&artifacts, &x).join(ACCEPTED_MARKER).exists());

    let failing = wake_cycle(
        config_for(home.path()),
        store.clone(),
        StaticFeed::default(),
        FixedTestRunner::failing("3 failed"),
    );
    let report = failing.run_once().await.unwrap();

    assert_eq!(report.chosen, ActionKind::Build);
    assert_eq!(report.recorded, ActionKind::Rest);
    let after = load(&store);
    assert_eq!(after.queue.entries()[0].status, IdeaStatus::Rejected);
    assert_eq!(after.ledger.len(), 1);
    assert_eq!(after.ledger.records()[0].category, "build_failure");
    assert!(!artifact_dir(&artifacts, &x).exists());
}

#[tokio::test]
async fn test_topics_sharing_a_long_prefix_are_built_separately() {
    let home = TempDir::new().unwrap();
    let store = Arc::new(MemoryStore::new());
    let prefix = "Memory decay engine with tiered consolidation and";
    let now = Utc::now();
    let mut snapshot = Snapshot::default();
    snapshot.cycle.cycle_index = 7;
    for (suffix, score) in [("version one", 0.9), ("version two", 0.7)] {
        for source in ["feed:1", "feed:2", "feed:3"] {
            snapshot.queue.add(
                IdeaSubmission {
                    topic: format!("{prefix} {suffix}"),
                    source: source.into(),
                    categories: ["memory_systems".to_string(), "identity".to_string()]
                        .into_iter()
                        .collect(),
                    score,
                },
                now,
            );
        }
    }
    snapshot.save(store.as_ref()).unwrap();

    let passing = wake_cycle(
        config_for(home.path()),
        store.clone(),
        StaticFeed::default(),
        FixedTestRunner::passing(),
    );
    assert!(passing.run_once().await.unwrap().description.contains("version one"));

    let mut snapshot = load(&store);
    snapshot.cycle.cycle_index = 11;
    snapshot.save(store.as_ref()).unwrap();

    let failing = wake_cycle(
        config_for(home.path()),
        store.clone(),
        StaticFeed::default(),
        FixedTestRunner::failing("1 failed"),
    );
    let report = failing.run_once().await.unwrap();
    assert_eq!(report.chosen, ActionKind::Build);
    assert_eq!(report.recorded, ActionKind::Rest);

    let statuses: Vec<IdeaStatus> = load(&store)
        .queue
        .entries()
        .iter()
        .map(|e| e.status)
        .collect();
    assert_eq!(statuses, vec![IdeaStatus::Built, IdeaStatus::Rejected]);
    assert_eq!(load(&store).ledger.len(), 1);
}

// =============================================================================
// Daemon shutdown
// =============================================================================

#[tokio::test]
async fn test_daemon_finishes_running_wake_before_stopping() {
    let home = TempDir::new().unwrap();
    let store = Arc::new(MemoryStore::new());
    seed(&store, 4, false, false);

    let feed = StaticFeed::new(mixed_feed()).with_delay(Duration::from_millis(300));
    let cycle = wake_cycle(
        config_for(home.path()),
        store.clone(),
        feed,
        FixedTestRunner::passing(),
    );
    let mut daemon = WakeDaemon::new(cycle, Duration::from_secs(3600));

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });
    daemon.run(cancel).await.unwrap();

    assert_eq!(daemon.wakes(), 1);
    let after = load(&store);
    assert_eq!(after.cycle.cycle_index, 5);
    assert_eq!(after.queue.size(), 3);
}

// =============================================================================
// Index bookkeeping and persistence
// =============================================================================

#[tokio::test]
async fn test_n_wakes_advance_index_by_n() {
    let home = TempDir::new().unwrap();
    let store = Arc::new(MemoryStore::new());

    let cycle = wake_cycle(
        config_for(home.path()),
        store.clone(),
        StaticFeed::default(),
        FixedTestRunner::passing(),
    );
    let mut chosen = Vec::new();
    for _ in 0..6 {
        chosen.push(cycle.run_once().await.unwrap().chosen);
    }

    assert_eq!(load(&store).cycle.cycle_index, 6);
    assert_eq!(
        chosen,
        vec![
            ActionKind::Verify,
            ActionKind::Rest,
            ActionKind::Rest,
            ActionKind::Verify,
            ActionKind::Explore,
            ActionKind::Curate,
        ]
    );
    assert_eq!(load(&store).cycle.health_history.len(), 6);
}

#[tokio::test]
async fn test_persistence_failure_does_not_advance_index() {
    let home = TempDir::new().unwrap();
    let store = Arc::new(MemoryStore::new());
    seed(&store, 7, true, false);

    let cycle = wake_cycle(
        config_for(home.path()),
        store.clone(),
        StaticFeed::default(),
        FixedTestRunner::failing("boom"),
    );

    store.fail_saves(true);
    match cycle.run_once().await {
        Err(CycleError::Persistence(PersistenceError::Io { .. })) => {}
        other => panic!("expected persistence failure, got {other:?}"),
    }
    store.fail_saves(false);

    let after = load(&store);
    assert_eq!(after.cycle.cycle_index, 7);
    assert!(after.ledger.is_empty());
    assert_eq!(after.queue.entries()[0].status, IdeaStatus::Pending);
}

#[tokio::test]
async fn test_held_lock_blocks_wake() {
    let home = TempDir::new().unwrap();
    let store = Arc::new(MemoryStore::new());
    let lock_path = home.path().join("wake.lock");
    std::fs::write(&lock_path, "4242 2026-01-01T00:00:00Z").unwrap();

    let cycle = wake_cycle(
        config_for(home.path()),
        store.clone(),
        StaticFeed::default(),
        FixedTestRunner::passing(),
    )
    .with_lock(lock_path.clone(), Duration::from_secs(3600));

    assert!(matches!(
        cycle.run_once().await,
        Err(CycleError::WakeInProgress(_))
    ));
    assert_eq!(load(&store).cycle.cycle_index, 0);
    assert!(lock_path.exists());
}

// =============================================================================
// Reflection and journal
// =============================================================================

#[tokio::test]
async fn test_cycles_are_logged_and_journaled() {
    let home = TempDir::new().unwrap();
    let store = Arc::new(MemoryStore::new());
    let config = config_for(home.path());
    let log = DailyLog::new(config.resolved_memory_dir());
    let journal = Arc::new(Mutex::new(CycleJournal::open_memory().unwrap()));

    let cycle = wake_cycle(
        config,
        store.clone(),
        StaticFeed::default(),
        FixedTestRunner::passing(),
    )
    .with_daily_log(log.clone())
    .with_journal(journal.clone());

    cycle.run_once().await.unwrap();
    cycle.run_once().await.unwrap();

    let journal = journal.lock().await;
    assert_eq!(journal.count().unwrap(), 2);
    assert_eq!(journal.count_recorded(ActionKind::Verify).unwrap(), 1);
    let recent = journal.recent(1).unwrap();
    assert_eq!(recent[0].cycle_index, 1);

    let today = std::fs::read_to_string(log.path_for(Utc::now().date_naive())).unwrap();
    assert!(today.contains("[cycle 0] VERIFY"));
    assert!(today.contains("[cycle 1] REST"));
}
