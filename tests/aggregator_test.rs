//! Tests for the multi-category aggregate report
//!
//! Tests cover:
//! - Category weights
//! - Empty and partial input
//! - Factor ranking
//! - Funding extremes

use omen::services::signals::aggregator::CATEGORY_WEIGHTS;
use omen::types::*;
use omen::SignalAggregator;

fn capitulation_input() -> SignalInput {
    SignalInput {
        technical: TechnicalMetrics {
            rsi: Some(25.0),
            macd_histogram: Some(50.0),
            bollinger_percent_b: Some(-0.1),
            ..Default::default()
        },
        on_chain: OnChainMetrics {
            mvrv: Some(0.8),
            sopr: Some(0.9),
            nupl: Some(-0.1),
            ..Default::default()
        },
        derivatives: DerivativesMetrics {
            funding_rate: Some(-0.002),
            long_short_ratio: Some(0.4),
            ..Default::default()
        },
        price_models: PriceModelMetrics {
            price_to_realized_ratio: Some(0.8),
            price_to_200w_ma_ratio: Some(0.9),
            ..Default::default()
        },
        sentiment: SentimentMetrics {
            fear_greed: Some(10.0),
            ..Default::default()
        },
        ..Default::default()
    }
}

#[test]
fn test_weights_sum_to_exactly_100() {
    assert_eq!(CATEGORY_WEIGHTS.iter().sum::<f64>(), 100.0);
}

#[test]
fn test_empty_categories_are_neutral() {
    let input: SignalInput = serde_json::from_str(
        r#"{"technical":{},"onChain":{},"derivatives":{},"priceModels":{},"sentiment":{}}"#,
    )
    .unwrap();
    let result = SignalAggregator::aggregate(&input);

    assert_eq!(result.overall, OverallSignal::Neutral);
    assert_eq!(result.confidence, 0.0);
    assert_eq!(result.score, 0.0);
    assert!(result.bullish_factors.is_empty());
    assert!(result.bearish_factors.is_empty());
    assert!(result.neutral_factors.is_empty());
}

#[test]
fn test_capitulation_is_bullish() {
    let result = SignalAggregator::aggregate_at(&capitulation_input(), 1_700_000_000_000);

    assert_eq!(result.overall, OverallSignal::Bullish);
    assert!(result.score > 20.0);
    assert!((result.confidence - result.score).abs() < 1e-9);
    assert_eq!(result.timestamp, 1_700_000_000_000);
    assert!(result.bearish_factors.is_empty());
    assert!((result.category_scores.on_chain - 100.0 / 3.0).abs() < 1e-9);
    assert_eq!(result.category_scores.price_models, 37.5);
}

#[test]
fn test_top_factors_ranked_by_weight() {
    let result = SignalAggregator::aggregate(&capitulation_input());

    assert_eq!(result.bullish_factors.len(), 5);
    let weights: Vec<u8> = result.bullish_factors.iter().map(|f| f.weight).collect();
    assert!(weights.windows(2).all(|w| w[0] >= w[1]));

    let names: Vec<&str> = result.bullish_factors.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "MVRV Undervalued",
            "Below 200-Week MA",
            "NUPL Capitulation",
            "Below Realized Price",
            "RSI Oversold",
        ]
    );
}

#[test]
fn test_extreme_funding_is_bearish_factor() {
    let input = SignalInput {
        derivatives: DerivativesMetrics {
            funding_rate: Some(0.015),
            ..Default::default()
        },
        ..Default::default()
    };
    let result = SignalAggregator::aggregate(&input);

    let funding = result
        .bearish_factors
        .iter()
        .find(|f| f.name == "Extreme Positive Funding")
        .expect("funding factor");
    assert_eq!(funding.category, FactorCategory::Derivatives);
    assert!(funding.explanation.contains("overleveraged longs"));
    assert!(result.category_scores.derivatives < 0.0);
}

#[test]
fn test_cohorts_count_toward_on_chain() {
    let input = SignalInput {
        cohorts: CohortMetrics {
            lth_supply_change_30d_pct: Some(2.5),
            ..Default::default()
        },
        ..Default::default()
    };
    let result = SignalAggregator::aggregate(&input);

    assert_eq!(result.category_scores.on_chain, 20.0);
    assert_eq!(result.bullish_factors[0].category, FactorCategory::Cohort);
}

#[test]
fn test_report_serializes_camel_case() {
    let result = SignalAggregator::aggregate(&capitulation_input());
    let json = serde_json::to_value(&result).unwrap();

    assert_eq!(json["overall"], "BULLISH");
    assert!(json["categoryScores"]["onChain"].is_number());
    assert!(json["bullishFactors"].is_array());
}
