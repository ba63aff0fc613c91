use anyhow::{Context as _, anyhow};
use chrono::{DateTime, Duration, Utc};
use deadpool_redis::Pool;
use deadpool_redis::redis::{self, AsyncCommands};

use crate::domain::repository::CodeStorage;
use crate::domain::types::CodeRecord;
use crate::error::StorageError;

/// Default key namespace for code records.
pub const DEFAULT_KEY_PREFIX: &str = "onetime_code";

/// Redis-backed code storage.
///
/// Each record is one key holding `created_at` in Unix milliseconds. Keys are
/// written with `SET NX PX`, so uniqueness and physical expiry are both native
/// and `purge_expired` has nothing to do. Expiry is set in milliseconds so the
/// key never disappears before the logical validity window closes.
#[derive(Clone)]
pub struct RedisCodeStorage {
    pub pool: Pool,
    pub prefix: String,
}

impl RedisCodeStorage {
    pub fn new(pool: Pool) -> Self {
        Self {
            pool,
            prefix: DEFAULT_KEY_PREFIX.to_owned(),
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    async fn conn(&self) -> Result<deadpool_redis::Connection, StorageError> {
        let conn = self.pool.get().await.context("get redis connection")?;
        Ok(conn)
    }
}

/// Owner and type are opaque and may contain `:`, so the triple is encoded as a
/// JSON array to keep keys unambiguous.
fn code_key(prefix: &str, owner: &str, code_type: &str, code: &str) -> String {
    let triple = serde_json::json!([owner, code_type, code]);
    format!("{prefix}:{triple}")
}

fn expiry_millis(ttl: Duration) -> u64 {
    ttl.num_milliseconds().max(1) as u64
}

/// `SET NX` replies nil when the key already exists.
fn insert_reply(reply: Option<String>) -> Result<(), StorageError> {
    match reply {
        Some(_) => Ok(()),
        None => Err(StorageError::UniqueViolation),
    }
}

/// Decode a `GET`/`GETDEL` reply; nil means no live record.
fn decode_reply(
    owner: &str,
    code_type: &str,
    code: &str,
    millis: Option<i64>,
) -> Result<Option<CodeRecord>, StorageError> {
    millis
        .map(|m| record_from_millis(owner, code_type, code, m))
        .transpose()
}

fn record_from_millis(
    owner: &str,
    code_type: &str,
    code: &str,
    millis: i64,
) -> Result<CodeRecord, StorageError> {
    let created_at = DateTime::<Utc>::from_timestamp_millis(millis)
        .ok_or_else(|| anyhow!("invalid created_at timestamp {millis} in redis"))?;
    Ok(CodeRecord::new(owner, code_type, code, created_at))
}

impl CodeStorage for RedisCodeStorage {
    async fn build_index(&self, _ttl: Duration) -> Result<(), StorageError> {
        Ok(())
    }

    async fn insert(&self, record: &CodeRecord, ttl: Duration) -> Result<(), StorageError> {
        let mut conn = self.conn().await?;
        let key = code_key(&self.prefix, &record.owner, &record.code_type, &record.code);
        let reply: Option<String> = redis::cmd("SET")
            .arg(&key)
            .arg(record.created_at.timestamp_millis())
            .arg("NX")
            .arg("PX")
            .arg(expiry_millis(ttl))
            .query_async(&mut conn)
            .await
            .context("insert onetime code")?;
        insert_reply(reply)
    }

    async fn find(
        &self,
        owner: &str,
        code_type: &str,
        code: &str,
    ) -> Result<Option<CodeRecord>, StorageError> {
        let mut conn = self.conn().await?;
        let key = code_key(&self.prefix, owner, code_type, code);
        let millis: Option<i64> = conn.get(&key).await.context("find onetime code")?;
        decode_reply(owner, code_type, code, millis)
    }

    async fn take(
        &self,
        owner: &str,
        code_type: &str,
        code: &str,
    ) -> Result<Option<CodeRecord>, StorageError> {
        let mut conn = self.conn().await?;
        let key = code_key(&self.prefix, owner, code_type, code);
        let millis: Option<i64> = conn.get_del(&key).await.context("take onetime code")?;
        decode_reply(owner, code_type, code, millis)
    }

    async fn purge_expired(&self, _cutoff: DateTime<Utc>) -> Result<u64, StorageError> {
        Ok(0)
    }
}
