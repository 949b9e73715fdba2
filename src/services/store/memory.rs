//! In-process document store.

use super::{DocumentStore, Precondition, StoreError, StoredDocument};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

/// Document store held in memory; contents are lost on exit.
#[derive(Default)]
pub struct MemoryDocumentStore {
    documents: RwLock<HashMap<String, StoredDocument>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored documents.
    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn load(&self, key: &str) -> Result<Option<StoredDocument>, StoreError> {
        Ok(self.documents.read().await.get(key).cloned())
    }

    async fn save(
        &self,
        key: &str,
        body: String,
        precondition: Precondition,
    ) -> Result<String, StoreError> {
        let mut documents = self.documents.write().await;
        let current = documents.get(key).map(|d| d.version.as_str());
        if !precondition.holds(current) {
            return Err(StoreError::Conflict {
                key: key.to_string(),
            });
        }

        let doc = StoredDocument::new(body);
        let version = doc.version.clone();
        documents.insert(key.to_string(), doc);
        debug!("Saved document {} at version {}", key, &version[..12]);
        Ok(version)
    }
}
