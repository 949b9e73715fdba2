pub mod signals;
pub mod store;
pub mod tracker;

pub use signals::{HistoricalLearner, PatternRecognizer, PredictionEngine, SignalAggregator};
pub use store::{
    DocumentStore, FileDocumentStore, MemoryDocumentStore, Precondition, RedisDocumentStore,
    StoreError, StoredDocument,
};
pub use tracker::CallTracker;
