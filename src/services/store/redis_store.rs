//! Redis-backed document store.
//!
//! Each document is a hash at `{prefix}{key}` with a `body` and a `version`
//! field, so the two are written, expired and evicted together. The
//! compare-and-set runs as a Lua script so the check and the write are
//! atomic on the server.
//!
//! A hash that has a body but no version (seeded by hand, or written by an
//! older layout) gets its version filled in on load. Without that, no
//! versioned save could ever match it.

use super::{content_version, DocumentStore, Precondition, StoreError, StoredDocument};
use async_trait::async_trait;
use redis::{aio::ConnectionManager, RedisResult, Script};
use tracing::{debug, info, warn};

/// Redis key prefix for documents.
const REDIS_DOCUMENT_PREFIX: &str = "omen:doc:";

const BODY_FIELD: &str = "body";
const VERSION_FIELD: &str = "version";

/// Reads before giving up when the body keeps changing under a backfill.
const LOAD_ATTEMPTS: usize = 3;

const COMPARE_AND_SET: &str = r#"
local current = redis.call('HGET', KEYS[1], 'version')
local mode = ARGV[1]
if mode == 'absent' then
  if redis.call('HEXISTS', KEYS[1], 'body') == 1 then return 0 end
elseif mode == 'version' then
  if (not current) or current ~= ARGV[2] then return 0 end
end
redis.call('HSET', KEYS[1], 'body', ARGV[3], 'version', ARGV[4])
return 1
"#;

/// Sets the version of an unversioned body, if the body is still the one read.
const BACKFILL_VERSION: &str = r#"
if redis.call('HGET', KEYS[1], 'body') ~= ARGV[1] then return 0 end
redis.call('HSETNX', KEYS[1], 'version', ARGV[2])
if redis.call('HGET', KEYS[1], 'version') == ARGV[2] then return 1 end
return 0
"#;

/// What a read of the `body` and `version` fields found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum LoadedFields {
    Missing,
    Versioned(StoredDocument),
    /// Body present, version field absent.
    Unversioned(StoredDocument),
}

impl LoadedFields {
    pub(crate) fn from_fields(body: Option<String>, version: Option<String>) -> Self {
        match (body, version) {
            (None, _) => LoadedFields::Missing,
            (Some(body), Some(version)) => LoadedFields::Versioned(StoredDocument { body, version }),
            (Some(body), None) => LoadedFields::Unversioned(StoredDocument::new(body)),
        }
    }
}

/// Whether the compare-and-set script would apply a write.
pub(crate) fn write_allowed(precondition: &Precondition, body_exists: bool, current: Option<&str>) -> bool {
    match precondition {
        Precondition::Absent => !body_exists,
        _ => precondition.holds(current),
    }
}

/// Document store on a shared Redis instance.
#[derive(Clone)]
pub struct RedisDocumentStore {
    conn: ConnectionManager,
    prefix: String,
}

impl RedisDocumentStore {
    /// Connect to Redis at the given URL.
    pub async fn connect(redis_url: &str) -> Result<Self, StoreError> {
        let conn = Self::connect_manager(redis_url).await?;
        info!("Document store connected to Redis");
        Ok(Self {
            conn,
            prefix: REDIS_DOCUMENT_PREFIX.to_string(),
        })
    }

    /// Use a custom key prefix (for sharing one Redis across deployments).
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    async fn connect_manager(redis_url: &str) -> RedisResult<ConnectionManager> {
        let client = redis::Client::open(redis_url)?;
        ConnectionManager::new(client).await
    }

    fn redis_key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    async fn read_fields(&self, redis_key: &str) -> Result<LoadedFields, StoreError> {
        let mut conn = self.conn.clone();
        let (body, version): (Option<String>, Option<String>) = redis::cmd("HMGET")
            .arg(redis_key)
            .arg(BODY_FIELD)
            .arg(VERSION_FIELD)
            .query_async(&mut conn)
            .await?;
        Ok(LoadedFields::from_fields(body, version))
    }

    async fn backfill_version(&self, redis_key: &str, doc: &StoredDocument) -> Result<bool, StoreError> {
        let mut conn = self.conn.clone();
        let applied: i32 = Script::new(BACKFILL_VERSION)
            .key(redis_key)
            .arg(&doc.body)
            .arg(&doc.version)
            .invoke_async(&mut conn)
            .await?;
        Ok(applied == 1)
    }
}

#[async_trait]
impl DocumentStore for RedisDocumentStore {
    async fn load(&self, key: &str) -> Result<Option<StoredDocument>, StoreError> {
        let redis_key = self.redis_key(key);

        for _ in 0..LOAD_ATTEMPTS {
            match self.read_fields(&redis_key).await? {
                LoadedFields::Missing => return Ok(None),
                LoadedFields::Versioned(doc) => return Ok(Some(doc)),
                LoadedFields::Unversioned(doc) => {
                    if self.backfill_version(&redis_key, &doc).await? {
                        warn!("Document {} had no version, set to {}", redis_key, doc.version);
                        return Ok(Some(doc));
                    }
                }
            }
        }

        Err(StoreError::Conflict {
            key: key.to_string(),
        })
    }

    async fn save(
        &self,
        key: &str,
        body: String,
        precondition: Precondition,
    ) -> Result<String, StoreError> {
        let redis_key = self.redis_key(key);
        let version = content_version(&body);
        let (mode, expected) = match &precondition {
            Precondition::None => ("none", String::new()),
            Precondition::Absent => ("absent", String::new()),
            Precondition::Version(v) => ("version", v.clone()),
        };

        let mut conn = self.conn.clone();
        let applied: i32 = Script::new(COMPARE_AND_SET)
            .key(&redis_key)
            .arg(mode)
            .arg(&expected)
            .arg(&body)
            .arg(&version)
            .invoke_async(&mut conn)
            .await?;

        if applied == 0 {
            return Err(StoreError::Conflict {
                key: key.to_string(),
            });
        }

        debug!("Saved {} to Redis ({} bytes)", redis_key, body.len());
        Ok(version)
    }
}
