//! Omen - explainable market calls with an adaptive accuracy feedback loop

pub mod config;
pub mod error;
pub mod services;
pub mod types;

pub use config::{Config, LogFormat, StoreBackend};
pub use error::{Error, Result};
pub use services::signals::{
    HistoricalLearner, PatternAccuracy, PatternRecognizer, PredictionEngine, SignalAggregator,
};
pub use services::store::{DocumentStore, Precondition, StoreError};
pub use services::tracker::CallTracker;
