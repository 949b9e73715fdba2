//! Category analyzers.
//!
//! Each analyzer turns one bag of optional metrics into a category score in
//! [-100, 100] plus the factors that explain it. Analyzers are pure; absent
//! metrics are skipped rather than scored as zero.

pub mod cohort;
pub mod derivatives;
pub mod exchange_flow;
pub mod onchain;
pub mod price_models;
pub mod rules;
pub mod sentiment;
pub mod technical;

pub use cohort::CohortAnalyzer;
pub use derivatives::DerivativesAnalyzer;
pub use exchange_flow::{ExchangeFlowAnalysis, ExchangeFlowAnalyzer};
pub use onchain::OnChainAnalyzer;
pub use price_models::PriceModelAnalyzer;
pub use rules::{score_metrics, CategoryAnalysis, MetricLadder, MetricReading, MetricRule, Threshold};
pub use sentiment::SentimentAnalyzer;
pub use technical::TechnicalAnalyzer;

/// Trait for a category scorer backed by metric ladders.
pub trait CategoryAnalyzer {
    /// Metric bag this analyzer reads.
    type Metrics;

    /// Each metric value paired with the ladder that scores it.
    fn readings(metrics: &Self::Metrics) -> Vec<(Option<f64>, &'static MetricLadder)>;

    /// Score the present metrics.
    fn analyze(metrics: &Self::Metrics) -> CategoryAnalysis {
        score_metrics(&Self::readings(metrics))
    }
}
