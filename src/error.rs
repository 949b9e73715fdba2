use crate::services::store::StoreError;
use thiserror::Error;

/// Application error types.
#[derive(Error, Debug)]
pub enum Error {
    /// A bar series was empty where at least one bar is required.
    #[error("Empty price series")]
    EmptySeries,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
}

impl Error {
    /// Whether retrying after reloading the document may succeed.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::Store(StoreError::Conflict { .. }))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
