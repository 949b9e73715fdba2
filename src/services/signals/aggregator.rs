//! Weighted combination of category scores into one market call.

use super::analyzers::{
    CategoryAnalysis, CategoryAnalyzer, CohortAnalyzer, DerivativesAnalyzer, OnChainAnalyzer,
    PriceModelAnalyzer, SentimentAnalyzer, TechnicalAnalyzer,
};
use crate::types::{AggregatedSignal, CategoryScores, Factor, OverallSignal, SignalBias, SignalInput};
use tracing::debug;

/// Fixed category weights. Must sum to 100.
pub const TECHNICAL_WEIGHT: f64 = 25.0;
pub const ON_CHAIN_WEIGHT: f64 = 30.0;
pub const DERIVATIVES_WEIGHT: f64 = 20.0;
pub const PRICE_MODELS_WEIGHT: f64 = 15.0;
pub const SENTIMENT_WEIGHT: f64 = 10.0;

pub const CATEGORY_WEIGHTS: [f64; 5] = [
    TECHNICAL_WEIGHT,
    ON_CHAIN_WEIGHT,
    DERIVATIVES_WEIGHT,
    PRICE_MODELS_WEIGHT,
    SENTIMENT_WEIGHT,
];

/// Maximum bullish or bearish factors reported.
pub const TOP_FACTORS: usize = 5;

/// Combines the category analyzers into an [`AggregatedSignal`].
pub struct SignalAggregator;

impl SignalAggregator {
    pub fn aggregate(input: &SignalInput) -> AggregatedSignal {
        Self::aggregate_at(input, chrono::Utc::now().timestamp_millis())
    }

    /// Same as [`aggregate`](Self::aggregate) with a caller-supplied timestamp.
    pub fn aggregate_at(input: &SignalInput, timestamp: i64) -> AggregatedSignal {
        let technical = TechnicalAnalyzer::analyze(&input.technical);
        let on_chain = OnChainAnalyzer::analyze(&input.on_chain)
            .merge(CohortAnalyzer::analyze(&input.cohorts));
        let derivatives = DerivativesAnalyzer::analyze(&input.derivatives);
        let price_models = PriceModelAnalyzer::analyze(&input.price_models);
        let sentiment = SentimentAnalyzer::analyze(&input.sentiment);

        let category_scores = CategoryScores {
            technical: technical.score,
            on_chain: on_chain.score,
            derivatives: derivatives.score,
            price_models: price_models.score,
            sentiment: sentiment.score,
        };

        let score = weighted_score(&category_scores);
        let overall = OverallSignal::from_score(score);
        let confidence = score.abs().min(100.0);

        let factors: Vec<Factor> = [technical, on_chain, derivatives, price_models, sentiment]
            .into_iter()
            .flat_map(|c: CategoryAnalysis| c.factors)
            .collect();
        let (bullish_factors, bearish_factors, neutral_factors) = split_factors(factors);

        debug!(
            "Aggregated {} bullish / {} bearish / {} neutral factors, score {:.1} ({})",
            bullish_factors.len(),
            bearish_factors.len(),
            neutral_factors.len(),
            score,
            overall.label()
        );

        AggregatedSignal {
            overall,
            score,
            confidence,
            category_scores,
            bullish_factors,
            bearish_factors,
            neutral_factors,
            timestamp,
        }
    }
}

/// Σ(score × weight) / 100.
pub fn weighted_score(scores: &CategoryScores) -> f64 {
    (scores.technical * TECHNICAL_WEIGHT
        + scores.on_chain * ON_CHAIN_WEIGHT
        + scores.derivatives * DERIVATIVES_WEIGHT
        + scores.price_models * PRICE_MODELS_WEIGHT
        + scores.sentiment * SENTIMENT_WEIGHT)
        / 100.0
}

/// Partition by bias; directional lists keep the top entries by weight.
/// `sort_by` is stable, so equal weights keep insertion order.
fn split_factors(factors: Vec<Factor>) -> (Vec<Factor>, Vec<Factor>, Vec<Factor>) {
    let mut bullish = Vec::new();
    let mut bearish = Vec::new();
    let mut neutral = Vec::new();
    for factor in factors {
        match factor.signal {
            SignalBias::Bullish => bullish.push(factor),
            SignalBias::Bearish => bearish.push(factor),
            SignalBias::Neutral => neutral.push(factor),
        }
    }
    for list in [&mut bullish, &mut bearish] {
        list.sort_by(|a, b| b.weight.cmp(&a.weight));
        list.truncate(TOP_FACTORS);
    }
    (bullish, bearish, neutral)
}
