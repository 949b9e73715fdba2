//! Market signal service module.
//!
//! Category scoring, the weighted aggregate report, the per-asset
//! prediction pipeline, chart pattern recognition and the outcome learner
//! that feeds pattern accuracy back into the next cycle.

pub mod aggregator;
pub mod analyzers;
pub mod learner;
pub mod patterns;
pub mod predictions;

pub use aggregator::SignalAggregator;
pub use analyzers::{CategoryAnalysis, CategoryAnalyzer, ExchangeFlowAnalysis};
pub use learner::HistoricalLearner;
pub use patterns::{PatternAccuracy, PatternBias, PatternRecognizer};
pub use predictions::{EvidenceBalance, PredictionEngine};
