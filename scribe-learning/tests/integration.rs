//! Integration tests for the learning engine.
//!
//! These drive the public API end to end against the in-memory backend:
//! - Pattern upserts and confidence growth
//! - Preference folding and clamping
//! - Feedback decisions
//! - Offline queueing, replay and the retry cap
//! - Reset

use std::sync::Arc;
use std::time::Duration;

use scribe_learning::{
    Decision, LearnedPattern, LearningBackend, LearningConfig, LearningEngine, MemoryBackend,
    OperationType, PhraseChange, RefinementMode, extract_changes, significant_changes,
};
use tempfile::TempDir;

// --- Helpers ---

fn config(dir: &TempDir) -> LearningConfig {
    LearningConfig::default()
        .with_user("alex")
        .with_device("test-device")
        .with_data_dir(dir.path())
}

async fn online_engine(dir: &TempDir) -> (LearningEngine, Arc<MemoryBackend>) {
    let backend = Arc::new(MemoryBackend::new());
    let engine = LearningEngine::open(config(dir), Some(backend.clone())).await;
    (engine, backend)
}

fn seeded_pattern(original: &str, corrected: &str, confidence: f64, occurrences: u32) -> LearnedPattern {
    let mut pattern = LearnedPattern::new(
        Some("alex".into()),
        &PhraseChange::new(original, corrected),
        RefinementMode::Cleanup,
    );
    pattern.confidence = confidence;
    pattern.occurrence_count = occurrences;
    pattern
}

// --- Pattern store ---

#[tokio::test]
async fn upsert_twice_yields_one_row() {
    let dir = TempDir::new().unwrap();
    let (engine, backend) = online_engine(&dir).await;
    let change = PhraseChange::new("gonna", "going to");

    let store = engine.patterns_store();
    store.upsert_pattern(&change, RefinementMode::Email).await;
    store.upsert_pattern(&change, RefinementMode::Email).await;

    let local = engine.patterns().await;
    assert_eq!(local.len(), 1);
    assert_eq!(local[0].occurrence_count, 2);
    assert_eq!(local[0].confidence, 0.4);

    let remote = backend.patterns().await;
    assert_eq!(remote.len(), 1);
    assert_eq!(remote[0].occurrence_count, 2);
}

#[tokio::test]
async fn confidence_is_monotonic_and_capped() {
    let dir = TempDir::new().unwrap();
    let (engine, _backend) = online_engine(&dir).await;
    let change = PhraseChange::new("wanna", "want to");

    let mut previous = 0.0;
    for i in 0..10 {
        let row = engine
            .patterns_store()
            .upsert_pattern(&change, RefinementMode::Raw)
            .await;
        assert!(row.confidence >= previous);
        if i >= 7 {
            assert_eq!(row.confidence, 1.0);
        }
        previous = row.confidence;
    }
}

#[tokio::test]
async fn ready_pattern_is_applied() {
    let dir = TempDir::new().unwrap();
    let backend = Arc::new(MemoryBackend::new());
    backend
        .save_pattern(&seeded_pattern("gonna", "going to", 0.8, 4))
        .await
        .unwrap();

    let engine = LearningEngine::open(config(&dir), Some(backend.clone())).await;
    assert_eq!(
        engine
            .apply_learned_adjustments("I'm gonna go", RefinementMode::Email)
            .await,
        "I'm going to go"
    );
}

#[tokio::test]
async fn patterns_are_learned_from_repeated_edits() {
    let dir = TempDir::new().unwrap();
    let (engine, backend) = online_engine(&dir).await;

    for _ in 0..3 {
        engine
            .record_edit_review(
                "i wanna check the numbers",
                "I wanna check the numbers today",
                "I want to check the numbers today",
                RefinementMode::Email,
                false,
            )
            .await;
    }

    let active = engine.active_patterns().await;
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].original_phrase, "wanna");
    assert_eq!(active[0].corrected_phrase, "want to");
    assert_eq!(active[0].occurrence_count, 3);
    assert_eq!(backend.sessions().await.len(), 3);

    assert_eq!(
        engine
            .apply_learned_adjustments("We wanna ship", RefinementMode::Email)
            .await,
        "We want to ship"
    );
}

#[tokio::test]
async fn deactivated_pattern_stops_applying() {
    let dir = TempDir::new().unwrap();
    let backend = Arc::new(MemoryBackend::new());
    let pattern = seeded_pattern("gonna", "going to", 0.9, 5);
    backend.save_pattern(&pattern).await.unwrap();
    let engine = LearningEngine::open(config(&dir), Some(backend.clone())).await;

    assert!(engine.deactivate_pattern(pattern.id).await);
    assert_eq!(
        engine
            .apply_learned_adjustments("gonna go", RefinementMode::Cleanup)
            .await,
        "gonna go"
    );

    let remote = backend.patterns().await;
    assert_eq!(remote.len(), 1);
    assert!(!remote[0].is_active);
}

#[tokio::test]
async fn concurrent_reviews_do_not_lose_updates() {
    let dir = TempDir::new().unwrap();
    let (engine, backend) = online_engine(&dir).await;

    let mut handles = Vec::new();
    for _ in 0..10 {
        let engine = engine.clone();
        handles.push(tokio::spawn(async move {
            engine
                .record_edit_review(
                    "raw",
                    "we gotta leave soon",
                    "we have to leave soon",
                    RefinementMode::Messaging,
                    false,
                )
                .await;
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(engine.session_count(), 10);
    let patterns = engine.patterns().await;
    assert_eq!(patterns.len(), 1);
    assert_eq!(patterns[0].occurrence_count, 10);
    assert_eq!(backend.sessions().await.len(), 10);

    let stats = engine.stats().await;
    assert!(stats.preferences.iter().all(|p| p.sample_count == 10));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_local_reviews_survive_reopen() {
    let dir = TempDir::new().unwrap();
    let engine = LearningEngine::open(config(&dir), None).await;

    let mut handles = Vec::new();
    for _ in 0..40 {
        let engine = engine.clone();
        handles.push(tokio::spawn(async move {
            engine
                .record_edit_review(
                    "raw",
                    "we gotta leave soon",
                    "we have to leave soon",
                    RefinementMode::Messaging,
                    false,
                )
                .await;
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }
    assert_eq!(engine.session_count(), 40);
    drop(engine);

    let reopened = LearningEngine::open(config(&dir), None).await;
    assert_eq!(reopened.session_count(), 40);
    let patterns = reopened.patterns().await;
    assert_eq!(patterns.len(), 1);
    assert_eq!(patterns[0].occurrence_count, 40);
    let stats = reopened.stats().await;
    assert!(stats.preferences.iter().all(|p| p.sample_count == 40));
}

// --- Preferences ---

#[tokio::test]
async fn preferences_stay_within_bounds() {
    let dir = TempDir::new().unwrap();
    let (engine, _backend) = online_engine(&dir).await;

    let edits = [
        ("We are basically done here", "Done!!!"),
        ("Done.", "However, we are therefore not finished; moreover, we continue"),
        ("I'm sure it's fine", "I am sure it is fine"),
        ("", "Something appeared out of nothing?!"),
    ];
    for _ in 0..25 {
        for (ai, user) in edits {
            engine
                .record_edit_review("raw", ai, user, RefinementMode::Cleanup, false)
                .await;
            for pref in engine.stats().await.preferences {
                assert!((-1.0..=1.0).contains(&pref.value), "{pref:?}");
            }
        }
    }
}

// --- Decisions ---

#[tokio::test]
async fn decisions_follow_session_counts() {
    let dir = TempDir::new().unwrap();
    let (engine, _backend) = online_engine(&dir).await;

    for _ in 0..1000 {
        assert_eq!(engine.decide(25, 5), Decision::EditReview);
    }
    assert_eq!(engine.decide(10, 60), Decision::None);
    assert_eq!(engine.decide(10, 3), Decision::AbTesting);
}

// --- Offline queue ---

#[tokio::test]
async fn offline_review_is_queued_then_replayed() {
    let dir = TempDir::new().unwrap();
    let (engine, backend) = online_engine(&dir).await;
    backend.set_reachable(false);

    engine
        .record_edit_review(
            "raw",
            "I'm gonna go home",
            "I'm going to go home",
            RefinementMode::Messaging,
            false,
        )
        .await;

    let pending = engine.pending_operations().await;
    let sessions: Vec<_> = pending
        .iter()
        .filter(|op| op.operation_type() == OperationType::SaveSession)
        .collect();
    assert_eq!(sessions.len(), 1);
    assert!(backend.sessions().await.is_empty());

    backend.set_reachable(true);
    let report = engine.sync_now().await;
    assert_eq!(report.remaining, 0);
    assert_eq!(report.applied, pending.len());
    assert!(engine.pending_operations().await.is_empty());

    let stored = backend.sessions().await;
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].user_final_text, "I'm going to go home");
    assert_eq!(stored[0].device_id, "test-device");
    assert_eq!(backend.patterns().await.len(), 1);
    assert_eq!(backend.preferences().await.len(), 4);
}

#[tokio::test]
async fn queued_writes_survive_restart() {
    let dir = TempDir::new().unwrap();
    let backend = Arc::new(MemoryBackend::new());
    backend.set_reachable(false);

    {
        let engine = LearningEngine::open(config(&dir), Some(backend.clone())).await;
        engine
            .record_edit_review("raw", "ai text", "final", RefinementMode::Raw, true)
            .await;
        assert_eq!(engine.pending_operations().await.len(), 1);
    }

    backend.set_reachable(true);
    let engine = LearningEngine::open(config(&dir), Some(backend.clone())).await;
    let pending = engine.pending_operations().await;
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].operation_type(), OperationType::SaveSession);

    engine.sync_now().await;
    assert_eq!(backend.sessions().await.len(), 1);
    assert!(backend.sessions().await[0].was_skipped);
}

#[tokio::test]
async fn failing_operation_is_dropped_after_five_attempts() {
    let dir = TempDir::new().unwrap();
    let (engine, backend) = online_engine(&dir).await;
    backend.set_reachable(false);
    engine
        .record_edit_review("raw", "ai text", "final", RefinementMode::Raw, true)
        .await;

    backend.set_reachable(true);
    backend.set_reject_writes(true);

    for attempt in 1..5 {
        let report = engine.sync_now().await;
        assert_eq!(report.failed, 1);
        let pending = engine.pending_operations().await;
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].attempt_count, attempt);
    }

    let report = engine.sync_now().await;
    assert_eq!(report.abandoned, 1);
    assert!(engine.pending_operations().await.is_empty());

    let report = engine.sync_now().await;
    assert_eq!(report.failed + report.abandoned + report.applied, 0);
    assert!(backend.sessions().await.is_empty());
}

#[tokio::test]
async fn signed_out_writes_wait_for_a_user() {
    let dir = TempDir::new().unwrap();
    let backend = Arc::new(MemoryBackend::new());
    let config = LearningConfig::default()
        .with_device("test-device")
        .with_data_dir(dir.path());
    let engine = LearningEngine::open(config, Some(backend.clone())).await;

    engine
        .record_edit_review("raw", "ai text", "final", RefinementMode::Raw, true)
        .await;

    let report = engine.sync_now().await;
    assert!(report.skipped);
    assert_eq!(report.remaining, 1);
    assert!(backend.sessions().await.is_empty());
}

#[tokio::test]
async fn replay_loop_drains_queue() {
    let dir = TempDir::new().unwrap();
    let backend = Arc::new(MemoryBackend::new());
    let engine = LearningEngine::open(
        config(&dir).with_replay_interval(Duration::from_millis(20)),
        Some(backend.clone()),
    )
    .await;

    backend.set_reachable(false);
    engine
        .record_edit_review("raw", "ai text", "final", RefinementMode::Raw, true)
        .await;
    backend.set_reachable(true);

    let handle = engine.spawn_replay_loop();
    let mut drained = false;
    for _ in 0..100 {
        if engine.pending_operations().await.is_empty() {
            drained = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    handle.shutdown().await;

    assert!(drained);
    assert_eq!(backend.sessions().await.len(), 1);
}

// --- Reset ---

#[tokio::test]
async fn reset_clears_everything() {
    let dir = TempDir::new().unwrap();
    let (engine, backend) = online_engine(&dir).await;
    for _ in 0..3 {
        engine
            .record_edit_review(
                "raw",
                "I'm gonna go home",
                "I'm going to go home",
                RefinementMode::Messaging,
                false,
            )
            .await;
    }
    assert_eq!(engine.session_count(), 3);

    engine.reset_all_learning().await.unwrap();

    assert_eq!(engine.session_count(), 0);
    assert!(engine.patterns().await.is_empty());
    assert!(engine.stats().await.preferences.is_empty());
    assert_eq!(backend.count_sessions("alex").await.unwrap(), 0);
    assert!(backend.fetch_patterns("alex").await.unwrap().is_empty());

    // Nothing comes back on restart
    drop(engine);
    let engine = LearningEngine::open(config(&dir), Some(backend.clone())).await;
    assert_eq!(engine.session_count(), 0);
    assert!(engine.patterns().await.is_empty());
}

#[tokio::test]
async fn failed_reset_leaves_local_state() {
    let dir = TempDir::new().unwrap();
    let (engine, backend) = online_engine(&dir).await;
    engine
        .record_edit_review(
            "raw",
            "I'm gonna go home",
            "I'm going to go home",
            RefinementMode::Messaging,
            false,
        )
        .await;

    backend.set_reachable(false);
    assert!(engine.reset_all_learning().await.is_err());

    assert_eq!(engine.session_count(), 1);
    assert_eq!(engine.patterns().await.len(), 1);
}

// --- Change extraction ---

#[test]
fn significant_change_filter() {
    // Punctuation-only edits align as equal words
    assert_eq!(extract_changes("Hi.", "Hi!").len(), 0);
    assert!(significant_changes("Hi.", "Hi!").is_empty());
    assert!(!significant_changes("I think we should go", "We should go").is_empty());
}
