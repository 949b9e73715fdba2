//! Outcome tracking and pattern accuracy feedback.
//!
//! Logged calls are graded 24h, 48h and 72h after they were made. After any
//! grading the overall and per-pattern statistics are rebuilt from the full
//! signal list, and the per-pattern accuracy is exposed as a confidence
//! multiplier for the next recognition cycle.
//!
//! The learner owns one document. It remembers the version it loaded and
//! writes back with that version as precondition, so two concurrent graders
//! cannot silently drop each other's outcomes.

use super::patterns::PatternAccuracy;
use crate::error::Result;
use crate::services::store::{load_json, save_json, DocumentStore, Precondition};
use crate::types::{
    Horizon, HorizonStats, LearningData, NewSignal, Outcome, OverallStats, PatternStats,
    SignalOutcome,
};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Most recent signals retained; older ones are evicted first.
pub const MAX_SIGNALS: usize = 500;

/// Graded observations a pattern needs before its accuracy is trusted.
pub const MIN_GRADED_SAMPLES: u32 = 5;

/// Adaptive accuracy tracker over one persisted [`LearningData`] document.
#[derive(Debug, Clone)]
pub struct HistoricalLearner {
    key: String,
    data: LearningData,
    /// Version loaded from (or last saved to) the store.
    version: Option<String>,
    dirty: bool,
}

impl HistoricalLearner {
    /// An empty learner for a document that does not exist yet.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            data: LearningData::default(),
            version: None,
            dirty: false,
        }
    }

    /// Load the document under `key`. A missing document starts empty;
    /// any store error is returned, never treated as empty.
    pub async fn load<S: DocumentStore + ?Sized>(store: &S, key: &str) -> Result<Self> {
        match load_json::<LearningData, S>(store, key).await? {
            Some((data, version)) => {
                info!(
                    "Loaded {} signals ({} pattern stats) from {}",
                    data.signals.len(),
                    data.pattern_stats.len(),
                    key
                );
                Ok(Self {
                    key: key.to_string(),
                    data,
                    version: Some(version),
                    dirty: false,
                })
            }
            None => {
                info!("No learning data at {}, starting fresh", key);
                Ok(Self::new(key))
            }
        }
    }

    /// Write back if anything changed. On failure the in-memory document,
    /// version and dirty flag are untouched so the caller can retry.
    pub async fn save<S: DocumentStore + ?Sized>(&mut self, store: &S) -> Result<()> {
        if !self.dirty {
            debug!("Learning data unchanged, skipping save");
            return Ok(());
        }
        let precondition = Precondition::from_loaded(self.version.as_deref());
        match save_json(store, &self.key, &self.data, precondition).await {
            Ok(version) => {
                info!(
                    "Saved {} signals to {} (version {})",
                    self.data.signals.len(),
                    self.key,
                    &version[..version.len().min(12)]
                );
                self.version = Some(version);
                self.dirty = false;
                Ok(())
            }
            Err(e) => {
                warn!("Failed to save learning data to {}: {}", self.key, e);
                Err(e.into())
            }
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn data(&self) -> &LearningData {
        &self.data
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Whether there are unsaved changes.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn signals(&self) -> &[SignalOutcome] {
        &self.data.signals
    }

    pub fn overall_stats(&self) -> &OverallStats {
        &self.data.overall_stats
    }

    pub fn pattern_stats(&self, pattern: &str) -> Option<&PatternStats> {
        self.data.pattern_stats(pattern)
    }

    /// Log a call made now.
    pub fn log_signal(&mut self, signal: NewSignal) -> Uuid {
        self.log_signal_at(signal, chrono::Utc::now().timestamp_millis())
    }

    /// Log a call made at `timestamp` (Unix ms). Always succeeds; the oldest
    /// entries beyond [`MAX_SIGNALS`] are evicted.
    pub fn log_signal_at(&mut self, signal: NewSignal, timestamp: i64) -> Uuid {
        let id = Uuid::new_v4();
        debug!(
            "Logging {} signal at {:.2} with {} patterns",
            signal.direction,
            signal.price,
            signal.patterns.len()
        );
        self.data.signals.push(SignalOutcome::new(id, timestamp, signal));

        if self.data.signals.len() > MAX_SIGNALS {
            let excess = self.data.signals.len() - MAX_SIGNALS;
            self.data.signals.drain(..excess);
            info!("Evicted {} oldest signals", excess);
        }

        self.recalculate_stats();
        self.touch(timestamp);
        id
    }

    /// Grade every horizon that has elapsed since its signal was logged.
    pub fn check_outcomes(&mut self, current_price: f64) -> usize {
        self.check_outcomes_at(current_price, chrono::Utc::now().timestamp_millis())
    }

    /// Same as [`check_outcomes`](Self::check_outcomes) at a given time.
    /// Returns the number of horizon outcomes newly graded.
    pub fn check_outcomes_at(&mut self, current_price: f64, now: i64) -> usize {
        let mut graded = 0;
        for signal in &mut self.data.signals {
            for horizon in Horizon::ALL {
                if signal.outcome(horizon).is_none() && now - signal.timestamp >= horizon.millis() {
                    signal.grade(horizon, current_price, now);
                    graded += 1;
                }
            }
        }

        if graded > 0 {
            info!("Graded {} outcomes at price {:.2}", graded, current_price);
            self.recalculate_stats();
            self.touch(now);
        }
        graded
    }

    /// Rebuild overall and per-pattern statistics from the signal list.
    pub fn recalculate_stats(&mut self) {
        let signals = &self.data.signals;
        self.data.overall_stats = overall_stats(signals);
        self.data.pattern_stats = pattern_stats(signals);
    }

    /// `accuracy × 2` for a pattern with enough graded calls, 1.0 otherwise.
    pub fn pattern_accuracy_multiplier(&self, pattern: &str, horizon: Horizon) -> f64 {
        self.data.accuracy_multiplier(pattern, horizon)
    }

    fn touch(&mut self, now: i64) {
        self.data.last_updated = Some(now);
        self.dirty = true;
    }
}

impl LearningData {
    pub fn pattern_stats(&self, pattern: &str) -> Option<&PatternStats> {
        self.pattern_stats.iter().find(|p| p.pattern == pattern)
    }

    /// Horizon stats for `pattern` when the sample is large enough to trust.
    fn trusted(&self, pattern: &str, horizon: Horizon) -> Option<&HorizonStats> {
        let stats = self.pattern_stats(pattern)?.horizon(horizon);
        (stats.graded >= MIN_GRADED_SAMPLES && stats.decisive() > 0).then_some(stats)
    }
}

impl PatternAccuracy for LearningData {
    fn learned_accuracy(&self, pattern: &str, horizon: Horizon) -> Option<f64> {
        self.trusted(pattern, horizon).map(|s| s.accuracy)
    }

    fn accuracy_multiplier(&self, pattern: &str, horizon: Horizon) -> f64 {
        self.trusted(pattern, horizon)
            .map(|s| s.accuracy * 2.0)
            .unwrap_or(1.0)
    }
}

impl PatternAccuracy for HistoricalLearner {
    fn learned_accuracy(&self, pattern: &str, horizon: Horizon) -> Option<f64> {
        self.data.learned_accuracy(pattern, horizon)
    }

    fn accuracy_multiplier(&self, pattern: &str, horizon: Horizon) -> f64 {
        self.data.accuracy_multiplier(pattern, horizon)
    }
}

fn horizon_stats<'a>(signals: impl IntoIterator<Item = &'a SignalOutcome>, horizon: Horizon) -> HorizonStats {
    let mut stats = HorizonStats::default();
    let mut return_sum: f64 = 0.0;
    let mut returns = 0u32;
    for signal in signals {
        let Some(outcome) = signal.outcome(horizon) else {
            continue;
        };
        stats.graded += 1;
        match outcome {
            Outcome::Correct => stats.correct += 1,
            Outcome::Incorrect => stats.incorrect += 1,
            Outcome::Neutral => {}
        }
        if let Some(price) = signal.price_after(horizon) {
            return_sum += signal.directional_return(price);
            returns += 1;
        }
    }
    if stats.decisive() > 0 {
        stats.accuracy = f64::from(stats.correct) / f64::from(stats.decisive());
    }
    if returns > 0 {
        stats.avg_return = return_sum / f64::from(returns);
    }
    stats
}

fn overall_stats(signals: &[SignalOutcome]) -> OverallStats {
    let avg_confidence = if signals.is_empty() {
        0.0
    } else {
        signals.iter().map(|s| s.confidence).sum::<f64>() / signals.len() as f64
    };

    // Decisive 24h outcomes, oldest first.
    let decided: Vec<bool> = signals
        .iter()
        .filter_map(|s| s.outcome_24h)
        .filter(Outcome::is_decisive)
        .map(|o| o == Outcome::Correct)
        .collect();

    let current_streak = decided.iter().rev().take_while(|c| **c).count() as u32;
    let mut best_streak = 0u32;
    let mut run = 0u32;
    for correct in &decided {
        if *correct {
            run += 1;
            best_streak = best_streak.max(run);
        } else {
            run = 0;
        }
    }

    OverallStats {
        total_signals: signals.len() as u32,
        h24: horizon_stats(signals, Horizon::H24),
        h48: horizon_stats(signals, Horizon::H48),
        h72: horizon_stats(signals, Horizon::H72),
        avg_confidence,
        current_streak,
        best_streak,
    }
}

fn pattern_stats(signals: &[SignalOutcome]) -> Vec<PatternStats> {
    let mut by_pattern: BTreeMap<&str, Vec<&SignalOutcome>> = BTreeMap::new();
    for signal in signals {
        let mut seen: Vec<&str> = Vec::new();
        for pattern in &signal.patterns {
            if !seen.contains(&pattern.as_str()) {
                seen.push(pattern);
                by_pattern.entry(pattern).or_default().push(signal);
            }
        }
    }

    by_pattern
        .into_iter()
        .map(|(pattern, group)| PatternStats {
            pattern: pattern.to_string(),
            total_signals: group.len() as u32,
            h24: horizon_stats(group.iter().copied(), Horizon::H24),
            h48: horizon_stats(group.iter().copied(), Horizon::H48),
            h72: horizon_stats(group.iter().copied(), Horizon::H72),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Direction;

    const HOUR: i64 = 3_600_000;

    fn up(price: f64, pattern: &str) -> NewSignal {
        NewSignal::new(price, Direction::Up, 0.7).with_patterns([pattern])
    }

    #[test]
    fn test_new_signal_is_pending() {
        let mut learner = HistoricalLearner::new("k");
        learner.log_signal_at(up(100.0, "Bull Flag"), 0);
        let signal = &learner.signals()[0];
        assert!(!signal.is_checked());
        assert!(signal.price_24h.is_none());
        assert!(learner.is_dirty());
    }

    #[test]
    fn test_grades_only_elapsed_horizons() {
        let mut learner = HistoricalLearner::new("k");
        learner.log_signal_at(up(100.0, "Bull Flag"), 0);

        assert_eq!(learner.check_outcomes_at(101.0, 23 * HOUR), 0);
        assert_eq!(learner.check_outcomes_at(101.0, 24 * HOUR), 1);
        assert_eq!(learner.check_outcomes_at(99.0, 24 * HOUR), 0);
        assert_eq!(learner.check_outcomes_at(99.0, 72 * HOUR), 2);

        let signal = &learner.signals()[0];
        assert_eq!(signal.outcome_24h, Some(Outcome::Correct));
        assert_eq!(signal.outcome_48h, Some(Outcome::Incorrect));
        assert_eq!(signal.outcome_72h, Some(Outcome::Incorrect));
        assert_eq!(signal.checked_at, Some(72 * HOUR));
        assert!(signal.is_complete());
    }

    #[test]
    fn test_multiplier_needs_five_graded() {
        let mut learner = HistoricalLearner::new("k");
        for i in 0..4 {
            learner.log_signal_at(up(100.0, "Breakout"), i);
        }
        learner.check_outcomes_at(110.0, 100 * HOUR);
        assert_eq!(learner.pattern_accuracy_multiplier("Breakout", Horizon::H24), 1.0);

        learner.log_signal_at(up(100.0, "Breakout"), 5);
        learner.check_outcomes_at(110.0, 100 * HOUR);
        assert_eq!(learner.pattern_accuracy_multiplier("Breakout", Horizon::H24), 2.0);
        assert_eq!(learner.learned_accuracy("Breakout", Horizon::H24), Some(1.0));
        assert_eq!(learner.pattern_accuracy_multiplier("Unknown", Horizon::H24), 1.0);
    }

    #[test]
    fn test_all_neutral_is_untrusted() {
        let mut learner = HistoricalLearner::new("k");
        for i in 0..6 {
            learner.log_signal_at(up(100.0, "Breakout"), i);
        }
        learner.check_outcomes_at(100.1, 100 * HOUR);
        let stats = learner.pattern_stats("Breakout").unwrap();
        assert_eq!(stats.h24.graded, 6);
        assert_eq!(stats.h24.decisive(), 0);
        assert_eq!(learner.pattern_accuracy_multiplier("Breakout", Horizon::H24), 1.0);
    }

    #[test]
    fn test_streaks_skip_neutral() {
        let mut learner = HistoricalLearner::new("k");
        // correct, incorrect, correct, neutral, correct
        let prices = [100.0, 120.0, 100.0, 110.0, 100.0];
        for (i, p) in prices.iter().enumerate() {
            learner.log_signal_at(up(*p, "x"), i as i64);
        }
        // Grade everything at 110: +10%, -8.3%, +10%, 0%, +10%.
        learner.check_outcomes_at(110.0, 100 * HOUR);
        let stats = learner.overall_stats();
        assert_eq!(stats.current_streak, 2);
        assert_eq!(stats.best_streak, 2);
        assert_eq!(stats.h24.correct, 3);
        assert_eq!(stats.h24.incorrect, 1);
        assert!((stats.h24.accuracy - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_down_call_return_is_flipped() {
        let mut learner = HistoricalLearner::new("k");
        learner.log_signal_at(NewSignal::new(100.0, Direction::Down, 0.6), 0);
        learner.check_outcomes_at(95.0, 24 * HOUR);
        let stats = learner.overall_stats();
        assert_eq!(stats.h24.correct, 1);
        assert!((stats.h24.avg_return - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_fifo_cap() {
        let mut learner = HistoricalLearner::new("k");
        for i in 0..MAX_SIGNALS as i64 {
            learner.log_signal_at(up(100.0, "x"), i);
        }
        let first = learner.signals()[0].id;
        let second = learner.signals()[1].id;
        learner.log_signal_at(up(100.0, "x"), MAX_SIGNALS as i64);
        assert_eq!(learner.signals().len(), MAX_SIGNALS);
        assert!(learner.signals().iter().all(|s| s.id != first));
        assert_eq!(learner.signals()[0].id, second);
    }

    #[test]
    fn test_duplicate_pattern_names_count_once() {
        let mut learner = HistoricalLearner::new("k");
        learner.log_signal_at(
            NewSignal::new(100.0, Direction::Up, 0.7).with_patterns(["A", "A", "B"]),
            0,
        );
        assert_eq!(learner.pattern_stats("A").unwrap().total_signals, 1);
        assert_eq!(learner.data().pattern_stats.len(), 2);
    }
}
