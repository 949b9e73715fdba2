//! Tests for the historical learner and its persistence
//!
//! Tests cover:
//! - Log / save / load round trips
//! - Eviction at capacity
//! - Outcome grading and statistics
//! - Failure and conflict handling

use async_trait::async_trait;
use omen::services::signals::learner::{MAX_SIGNALS, MIN_GRADED_SAMPLES};
use omen::services::store::{MemoryDocumentStore, StoredDocument};
use omen::types::*;
use omen::{DocumentStore, Error, HistoricalLearner, Precondition, StoreError};

const HOUR: i64 = 3_600_000;
const KEY: &str = "learning-data";

/// A store whose backend is unreachable.
struct FailingStore;

#[async_trait]
impl DocumentStore for FailingStore {
    async fn load(&self, _key: &str) -> Result<Option<StoredDocument>, StoreError> {
        Err(StoreError::Io(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "backend down",
        )))
    }

    async fn save(&self, _key: &str, _body: String, _precondition: Precondition) -> Result<String, StoreError> {
        Err(StoreError::Io(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "backend down",
        )))
    }
}

fn up_call(price: f64) -> NewSignal {
    NewSignal::new(price, Direction::Up, 0.7)
        .with_patterns(["Bull Flag", "Higher Lows"])
        .with_target(Some(price * 1.04))
}

#[tokio::test]
async fn test_log_save_load_round_trip() {
    let store = MemoryDocumentStore::new();
    let mut learner = HistoricalLearner::load(&store, KEY).await.unwrap();
    assert!(learner.version().is_none());

    let id = learner.log_signal_at(up_call(100.0), 1_000);
    assert!(learner.is_dirty());
    learner.save(&store).await.unwrap();
    assert!(!learner.is_dirty());

    let reloaded = HistoricalLearner::load(&store, KEY).await.unwrap();
    assert_eq!(reloaded.version(), learner.version());
    assert_eq!(reloaded.signals().len(), 1);

    let signal = &reloaded.signals()[0];
    assert_eq!(signal.id, id);
    assert_eq!(signal.timestamp, 1_000);
    assert_eq!(signal.patterns, vec!["Bull Flag", "Higher Lows"]);
    assert_eq!(signal.target_24h, Some(104.0));
    assert!(!signal.is_checked());
    for horizon in Horizon::ALL {
        assert!(signal.outcome(horizon).is_none());
        assert!(signal.price_after(horizon).is_none());
    }
    assert!(signal.checked_at.is_none());
}

#[test]
fn test_oldest_signal_evicted_at_capacity() {
    let mut learner = HistoricalLearner::new(KEY);
    for i in 0..MAX_SIGNALS {
        learner.log_signal_at(NewSignal::new(100.0, Direction::Up, 0.6), i as i64);
    }
    assert_eq!(learner.signals().len(), 500);
    let oldest = learner.signals()[0].id;

    learner.log_signal_at(NewSignal::new(100.0, Direction::Down, 0.6), 10_000);

    assert_eq!(learner.signals().len(), 500);
    assert!(learner.signals().iter().all(|s| s.id != oldest));
    assert_eq!(learner.signals()[0].timestamp, 1);
    assert_eq!(learner.signals()[499].direction, Direction::Down);
}

#[test]
fn test_horizons_graded_as_they_elapse() {
    let mut learner = HistoricalLearner::new(KEY);
    learner.log_signal_at(up_call(100.0), 0);

    assert_eq!(learner.check_outcomes_at(101.0, 23 * HOUR), 0);
    assert_eq!(learner.check_outcomes_at(101.0, 24 * HOUR), 1);
    assert_eq!(learner.check_outcomes_at(99.0, 50 * HOUR), 1);
    assert_eq!(learner.check_outcomes_at(100.2, 72 * HOUR), 1);
    assert_eq!(learner.check_outcomes_at(100.2, 100 * HOUR), 0);

    let signal = &learner.signals()[0];
    assert_eq!(signal.outcome_24h, Some(Outcome::Correct));
    assert_eq!(signal.outcome_48h, Some(Outcome::Incorrect));
    assert_eq!(signal.outcome_72h, Some(Outcome::Neutral));
    assert!(signal.is_complete());

    let stats = learner.overall_stats();
    assert_eq!(stats.total_signals, 1);
    assert_eq!(stats.h24.accuracy, 1.0);
    assert_eq!(stats.h48.accuracy, 0.0);
    assert_eq!(stats.h72.graded, 1);
    assert_eq!(stats.h72.decisive(), 0);
}

#[test]
fn test_multiplier_needs_enough_graded_samples() {
    let mut learner = HistoricalLearner::new(KEY);
    for i in 0..(MIN_GRADED_SAMPLES - 1) {
        learner.log_signal_at(up_call(100.0), i64::from(i));
    }
    learner.check_outcomes_at(90.0, 30 * HOUR);
    // Four wrong calls are still too few to judge.
    assert_eq!(learner.pattern_accuracy_multiplier("Bull Flag", Horizon::H24), 1.0);

    learner.log_signal_at(up_call(100.0), 31 * HOUR);
    learner.check_outcomes_at(110.0, 60 * HOUR);

    let stats = learner.pattern_stats("Bull Flag").unwrap();
    assert_eq!(stats.h24.graded, 5);
    assert_eq!(stats.h24.correct, 1);
    assert!((learner.pattern_accuracy_multiplier("Bull Flag", Horizon::H24) - 0.4).abs() < 1e-12);
}

#[test]
fn test_streaks_follow_24h_outcomes() {
    let mut learner = HistoricalLearner::new(KEY);
    learner.log_signal_at(NewSignal::new(100.0, Direction::Up, 0.6), 0);
    learner.check_outcomes_at(90.0, 24 * HOUR);
    for i in 0..3 {
        learner.log_signal_at(NewSignal::new(100.0, Direction::Up, 0.6), 25 * HOUR + i);
    }
    learner.check_outcomes_at(105.0, 50 * HOUR);

    let stats = learner.overall_stats();
    assert_eq!(stats.current_streak, 3);
    assert_eq!(stats.best_streak, 3);
}

#[tokio::test]
async fn test_failed_load_is_an_error() {
    let result = HistoricalLearner::load(&FailingStore, KEY).await;
    assert!(matches!(result, Err(Error::Store(StoreError::Io(_)))));
}

#[tokio::test]
async fn test_corrupt_document_is_an_error() {
    let store = MemoryDocumentStore::new();
    store
        .save(KEY, "not json".to_string(), Precondition::None)
        .await
        .unwrap();

    let result = HistoricalLearner::load(&store, KEY).await;
    assert!(matches!(result, Err(Error::Store(StoreError::Corrupt { .. }))));
}

#[tokio::test]
async fn test_failed_save_keeps_state() {
    let mut learner = HistoricalLearner::new(KEY);
    learner.log_signal_at(up_call(100.0), 0);
    let before = learner.data().clone();

    let result = learner.save(&FailingStore).await;

    assert!(result.is_err());
    assert!(!result.unwrap_err().is_conflict());
    assert!(learner.is_dirty());
    assert!(learner.version().is_none());
    assert_eq!(learner.data(), &before);
}

#[test]
fn test_concurrent_writers_conflict() {
    tokio_test::block_on(async {
        let store = MemoryDocumentStore::new();
        let mut first = HistoricalLearner::load(&store, KEY).await.unwrap();
        let mut second = HistoricalLearner::load(&store, KEY).await.unwrap();

        first.log_signal_at(up_call(100.0), 0);
        second.log_signal_at(up_call(200.0), 1);

        first.save(&store).await.unwrap();
        let err = second.save(&store).await.unwrap_err();
        assert!(err.is_conflict());
        assert!(second.is_dirty());

        // Retry the way a caller would: reload, then reapply.
        let mut retry = HistoricalLearner::load(&store, KEY).await.unwrap();
        retry.log_signal_at(up_call(200.0), 1);
        retry.save(&store).await.unwrap();

        let merged = HistoricalLearner::load(&store, KEY).await.unwrap();
        let prices: Vec<f64> = merged.signals().iter().map(|s| s.price_at_signal).collect();
        assert_eq!(prices, vec![100.0, 200.0]);
    });
}

#[tokio::test]
async fn test_clean_learner_skips_save() {
    let mut learner = HistoricalLearner::new(KEY);
    learner.save(&FailingStore).await.unwrap();
    assert!(learner.version().is_none());
}
