//! Tests for pattern recognition with learner feedback

use omen::services::signals::patterns::{pattern_names, MAX_PATTERN_CONFIDENCE};
use omen::types::*;
use omen::{HistoricalLearner, PatternAccuracy, PatternRecognizer};

const HOUR: i64 = 3_600_000;

fn context(prices: &[f64]) -> MarketContext {
    let bars: Vec<OhlcPoint> = prices
        .iter()
        .enumerate()
        .map(|(i, p)| OhlcPoint {
            time: i as i64 * HOUR,
            open: *p,
            high: *p,
            low: *p,
            close: *p,
            volume: 0.0,
        })
        .collect();
    MarketContext::from_bars(&bars)
}

fn breakout_context() -> MarketContext {
    let mut prices = vec![100.0; 20];
    prices.push(103.0);
    context(&prices)
}

/// A learner with `n` graded Breakout calls, each moving `change_pct`.
fn learner_with_breakouts(n: usize, change_pct: f64) -> HistoricalLearner {
    let mut learner = HistoricalLearner::new("patterns-test");
    for i in 0..n {
        learner.log_signal_at(
            NewSignal::new(100.0, Direction::Up, 0.6).with_patterns(["Breakout"]),
            i as i64,
        );
    }
    learner.check_outcomes_at(100.0 + change_pct, 24 * HOUR + n as i64);
    learner
}

fn breakout(matches: &[PatternMatch]) -> &PatternMatch {
    matches.iter().find(|m| m.pattern == "Breakout").expect("breakout match")
}

#[test]
fn test_every_match_is_a_known_pattern() {
    let known: Vec<&str> = pattern_names().collect();
    let matches = PatternRecognizer::new().recognize(&breakout_context());

    assert!(!matches.is_empty());
    for m in &matches {
        assert!(known.contains(&m.pattern.as_str()), "unknown pattern {}", m.pattern);
        assert!(m.confidence >= 0.0 && m.confidence <= MAX_PATTERN_CONFIDENCE);
        assert!(!m.description.is_empty());
    }
}

#[test]
fn test_short_history_yields_nothing() {
    let matches = PatternRecognizer::new().recognize(&context(&[100.0; 11]));
    assert!(matches.is_empty());
}

#[test]
fn test_few_samples_keep_baseline() {
    let learner = learner_with_breakouts(4, 2.0);
    assert_eq!(learner.accuracy_multiplier("Breakout", Horizon::H24), 1.0);

    let plain = PatternRecognizer::new().recognize(&breakout_context());
    let fed = PatternRecognizer::with_accuracy(&learner).recognize(&breakout_context());

    assert_eq!(breakout(&fed).confidence, breakout(&plain).confidence);
    assert_eq!(breakout(&fed).historical_accuracy, breakout(&plain).historical_accuracy);
}

#[test]
fn test_reliable_pattern_is_boosted() {
    let learner = learner_with_breakouts(5, 2.0);
    assert_eq!(learner.accuracy_multiplier("Breakout", Horizon::H24), 2.0);

    let plain = PatternRecognizer::new().recognize(&breakout_context());
    let fed = PatternRecognizer::with_accuracy(&learner).recognize(&breakout_context());

    let expected = (breakout(&plain).confidence * 2.0).min(MAX_PATTERN_CONFIDENCE);
    assert!((breakout(&fed).confidence - expected).abs() < 1e-12);
    assert_eq!(breakout(&fed).historical_accuracy, Some(1.0));
}

#[test]
fn test_unreliable_pattern_is_suppressed() {
    let learner = learner_with_breakouts(5, -2.0);
    assert_eq!(learner.learned_accuracy("Breakout", Horizon::H24), Some(0.0));

    let fed = PatternRecognizer::with_accuracy(&learner).recognize(&breakout_context());

    assert_eq!(breakout(&fed).confidence, 0.0);
    assert_eq!(breakout(&fed).historical_accuracy, Some(0.0));
}

#[test]
fn test_other_patterns_unaffected_by_feedback() {
    let learner = learner_with_breakouts(5, 2.0);
    assert_eq!(learner.accuracy_multiplier("Bull Flag", Horizon::H24), 1.0);
    assert_eq!(learner.learned_accuracy("Bull Flag", Horizon::H24), None);
}

#[test]
fn test_aggregate_bias_of_breakout_is_bullish() {
    let matches = PatternRecognizer::new().recognize(&breakout_context());
    let bias = PatternRecognizer::aggregate_bias(&matches);
    assert_eq!(bias.bias, SignalBias::Bullish);
    assert!(bias.confidence > 0.5);
}
