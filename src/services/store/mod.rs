//! Whole-document persistence with optimistic concurrency.
//!
//! Stores hold opaque JSON documents under string keys. Every stored
//! document carries a version token (a content hash, ETag style); writers
//! pass the token they loaded as a precondition so a concurrent writer's
//! update is rejected instead of silently overwritten.

pub mod file;
pub mod memory;
pub mod redis_store;

pub use file::FileDocumentStore;
pub use memory::MemoryDocumentStore;
pub use redis_store::RedisDocumentStore;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Document store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Version conflict on document {key}")]
    Conflict { key: String },
    #[error("Corrupt document {key}: {reason}")]
    Corrupt { key: String, reason: String },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

/// A document body together with its version token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredDocument {
    pub body: String,
    pub version: String,
}

impl StoredDocument {
    pub fn new(body: String) -> Self {
        let version = content_version(&body);
        Self { body, version }
    }
}

/// Write precondition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Precondition {
    /// Write unconditionally.
    None,
    /// Only create; fail if the document exists.
    Absent,
    /// Only replace the document at exactly this version.
    Version(String),
}

impl Precondition {
    /// Precondition matching a version observed at load time.
    pub fn from_loaded(version: Option<&str>) -> Self {
        match version {
            Some(v) => Precondition::Version(v.to_string()),
            None => Precondition::Absent,
        }
    }

    /// Check against the version currently stored (`None` if absent).
    pub fn holds(&self, current: Option<&str>) -> bool {
        match (self, current) {
            (Precondition::None, _) => true,
            (Precondition::Absent, None) => true,
            (Precondition::Absent, Some(_)) => false,
            (Precondition::Version(expected), Some(actual)) => expected == actual,
            (Precondition::Version(_), None) => false,
        }
    }
}

/// Key-value store of whole documents.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Load a document, or `None` if it was never written.
    async fn load(&self, key: &str) -> Result<Option<StoredDocument>, StoreError>;

    /// Replace a document. Returns the new version token.
    async fn save(
        &self,
        key: &str,
        body: String,
        precondition: Precondition,
    ) -> Result<String, StoreError>;
}

/// Version token for a document body: hex SHA-256 of its bytes.
pub fn content_version(body: &str) -> String {
    hex::encode(Sha256::digest(body.as_bytes()))
}

/// Load and decode a JSON document.
pub async fn load_json<T, S>(store: &S, key: &str) -> Result<Option<(T, String)>, StoreError>
where
    T: DeserializeOwned,
    S: DocumentStore + ?Sized,
{
    let Some(doc) = store.load(key).await? else {
        return Ok(None);
    };
    let value = serde_json::from_str(&doc.body).map_err(|e| StoreError::Corrupt {
        key: key.to_string(),
        reason: e.to_string(),
    })?;
    Ok(Some((value, doc.version)))
}

/// Encode and save a JSON document.
pub async fn save_json<T, S>(
    store: &S,
    key: &str,
    value: &T,
    precondition: Precondition,
) -> Result<String, StoreError>
where
    T: Serialize,
    S: DocumentStore + ?Sized,
{
    let body = serde_json::to_string(value).map_err(|e| StoreError::Corrupt {
        key: key.to_string(),
        reason: e.to_string(),
    })?;
    store.save(key, body, precondition).await
}
