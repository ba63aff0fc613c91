use std::future::Future;

use chrono::{Duration, Utc};
use tracing::{debug, error, info};

use crate::domain::generator::{CodeGenerator, SecureHexGenerator};
use crate::domain::repository::CodeStorage;
use crate::domain::types::{CodeRecord, DEFAULT_TTL_SECS, MAX_ISSUE_ATTEMPTS};
use crate::error::{CodeStoreError, StorageError};
use crate::reaper;

/// Issues, verifies and consumes one-time codes scoped to (owner, type).
///
/// The store holds no mutable state of its own; concurrency guarantees come
/// from the backend's unique insert and atomic `take`.
pub struct OnetimeCodeStore<S, G = SecureHexGenerator>
where
    S: CodeStorage,
    G: CodeGenerator,
{
    storage: S,
    generator: G,
    ttl: Duration,
}

impl<S> OnetimeCodeStore<S>
where
    S: CodeStorage,
{
    /// Store with the default 10 minute TTL and a 32-char hex generator.
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            generator: SecureHexGenerator::default(),
            ttl: Duration::seconds(DEFAULT_TTL_SECS),
        }
    }
}

impl<S, G> OnetimeCodeStore<S, G>
where
    S: CodeStorage,
    G: CodeGenerator,
{
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_generator<G2: CodeGenerator>(self, generator: G2) -> OnetimeCodeStore<S, G2> {
        OnetimeCodeStore {
            storage: self.storage,
            generator,
            ttl: self.ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Set up the uniqueness constraint and expiry rule. Safe to call on every start.
    ///
    /// Only backends with native key expiry (Redis) delete records on their own.
    /// Postgres and memory storage need [`run_reaper`](Self::run_reaper) running
    /// alongside; `verify` rejects stale records either way.
    pub async fn build_index(&self) -> Result<(), CodeStoreError> {
        self.storage.build_index(self.ttl).await?;
        info!(ttl_secs = self.ttl.num_seconds(), "onetime code index ready");
        Ok(())
    }

    /// Generate and persist a fresh code for `(owner, code_type)`.
    ///
    /// Collisions on the composite key are retried with a new code, up to
    /// [`MAX_ISSUE_ATTEMPTS`] inserts in total. Any other storage failure is
    /// returned immediately.
    pub async fn issue(&self, owner: &str, code_type: &str) -> Result<String, CodeStoreError> {
        for attempt in 1..=MAX_ISSUE_ATTEMPTS {
            let code = self.generator.generate();
            let record = CodeRecord::new(owner, code_type, &code, Utc::now());

            match self.storage.insert(&record, self.ttl).await {
                Ok(()) => {
                    debug!(owner, code_type, attempt, "onetime code issued");
                    return Ok(code);
                }
                Err(StorageError::UniqueViolation) => {
                    debug!(owner, code_type, attempt, "onetime code collision, retrying");
                }
                Err(e) => {
                    let err = CodeStoreError::from(e);
                    error!(
                        owner,
                        code_type,
                        attempt,
                        kind = err.kind(),
                        error = ?err,
                        "failed to persist onetime code"
                    );
                    return Err(err);
                }
            }
        }

        let err = CodeStoreError::CodeGenerationExhausted {
            attempts: MAX_ISSUE_ATTEMPTS,
        };
        error!(owner, code_type, kind = err.kind(), "{err}");
        Err(err)
    }

    /// Physically purge expired records every `interval` until `shutdown` resolves.
    pub async fn run_reaper<F>(&self, interval: std::time::Duration, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        reaper::run_reaper(&self.storage, self.ttl, interval, shutdown).await;
    }

    /// Non-destructive check. A record still present past its TTL is rejected
    /// without waiting for the reaper.
    pub async fn verify(
        &self,
        owner: &str,
        code_type: &str,
        code: &str,
    ) -> Result<bool, CodeStoreError> {
        let Some(record) = self.storage.find(owner, code_type, code).await? else {
            return Ok(false);
        };
        if record.is_expired_at(Utc::now(), self.ttl) {
            debug!(owner, code_type, "onetime code expired");
            return Ok(false);
        }
        Ok(true)
    }

    /// Atomically delete the matching record. Returns `true` for exactly one caller.
    ///
    /// Presence alone gates consumption: a logically expired record that the
    /// reaper has not removed yet is still consumed.
    pub async fn consume(
        &self,
        owner: &str,
        code_type: &str,
        code: &str,
    ) -> Result<bool, CodeStoreError> {
        let taken = self.storage.take(owner, code_type, code).await?;
        if taken.is_some() {
            debug!(owner, code_type, "onetime code consumed");
        }
        Ok(taken.is_some())
    }
}
