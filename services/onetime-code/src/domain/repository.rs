#![allow(async_fn_in_trait)]

use chrono::{DateTime, Duration, Utc};

use crate::domain::types::CodeRecord;
use crate::error::StorageError;

/// Persistent collection of one-time code records.
///
/// Backends must enforce uniqueness over (owner, type, code) on insert and
/// make `take` an indivisible find-and-delete.
pub trait CodeStorage: Send + Sync {
    /// Establish the uniqueness constraint and whatever the backend needs for expiry.
    /// Must be idempotent.
    async fn build_index(&self, ttl: Duration) -> Result<(), StorageError>;

    /// Persist a new record. Fails with [`StorageError::UniqueViolation`] when the
    /// composite key is already taken; nothing is written in that case.
    ///
    /// `ttl` lets backends with native expiry schedule the physical delete.
    async fn insert(&self, record: &CodeRecord, ttl: Duration) -> Result<(), StorageError>;

    async fn find(
        &self,
        owner: &str,
        code_type: &str,
        code: &str,
    ) -> Result<Option<CodeRecord>, StorageError>;

    /// Atomically remove and return the matching record.
    async fn take(
        &self,
        owner: &str,
        code_type: &str,
        code: &str,
    ) -> Result<Option<CodeRecord>, StorageError>;

    /// Physically delete every record created at or before `cutoff`.
    /// Returns the number of records removed.
    async fn purge_expired(&self, cutoff: DateTime<Utc>) -> Result<u64, StorageError>;
}
