use crate::error::{Error, Result};
use crate::services::store::{DocumentStore, FileDocumentStore, MemoryDocumentStore, RedisDocumentStore};
use std::env;
use std::path::PathBuf;
use tracing::info;

/// Where learning and tracker documents live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    /// Process memory only; lost on exit.
    Memory,
    /// One JSON file per document under `data_dir`.
    File,
    /// Redis, shared between processes.
    Redis,
}

impl StoreBackend {
    /// Parse from string.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "memory" | "mem" => Some(StoreBackend::Memory),
            "file" | "fs" => Some(StoreBackend::File),
            "redis" => Some(StoreBackend::Redis),
            _ => None,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub store: StoreBackend,
    /// Directory for the file backend.
    pub data_dir: PathBuf,
    pub redis_url: Option<String>,
    /// Document key of the learning data.
    pub learning_key: String,
    /// Document key of the tracked calls.
    pub tracker_key: String,
    /// Attempts after a version conflict before giving up.
    pub save_retries: u32,
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store: StoreBackend::File,
            data_dir: PathBuf::from(".omen_data"),
            redis_url: None,
            learning_key: "learning-data".to_string(),
            tracker_key: "tracked-calls".to_string(),
            save_retries: 3,
            log_format: LogFormat::Pretty,
        }
    }
}

impl Config {
    /// Load configuration from environment variables. Unparseable values
    /// fall back to their defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let store = env::var("OMEN_STORE")
            .ok()
            .and_then(|s| StoreBackend::from_str(&s))
            .unwrap_or(defaults.store);

        let log_format = match env::var("LOG_FORMAT").ok().as_deref() {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        Self {
            store,
            data_dir: env::var("OMEN_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            redis_url: env::var("REDIS_URL").ok().filter(|s| !s.is_empty()),
            learning_key: env::var("OMEN_LEARNING_KEY").unwrap_or(defaults.learning_key),
            tracker_key: env::var("OMEN_TRACKER_KEY").unwrap_or(defaults.tracker_key),
            save_retries: env::var("OMEN_SAVE_RETRIES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.save_retries),
            log_format,
        }
    }

    /// Open the configured document store.
    pub async fn build_store(&self) -> Result<Box<dyn DocumentStore>> {
        match self.store {
            StoreBackend::Memory => {
                info!("Using in-memory document store");
                Ok(Box::new(MemoryDocumentStore::new()))
            }
            StoreBackend::File => Ok(Box::new(FileDocumentStore::open(self.data_dir.clone()).await?)),
            StoreBackend::Redis => {
                let url = self
                    .redis_url
                    .as_deref()
                    .ok_or_else(|| Error::Config("REDIS_URL is required for the redis store".to_string()))?;
                Ok(Box::new(RedisDocumentStore::connect(url).await?))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_from_str() {
        assert_eq!(StoreBackend::from_str("Redis"), Some(StoreBackend::Redis));
        assert_eq!(StoreBackend::from_str(" memory "), Some(StoreBackend::Memory));
        assert_eq!(StoreBackend::from_str("sqlite"), None);
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.store, StoreBackend::File);
        assert_eq!(config.learning_key, "learning-data");
        assert_eq!(config.save_retries, 3);
    }

    #[tokio::test]
    async fn test_redis_without_url_is_config_error() {
        let config = Config {
            store: StoreBackend::Redis,
            ..Default::default()
        };
        let result = config.build_store().await;
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
