use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};

use onetime_code::domain::generator::CodeGenerator;
use onetime_code::domain::repository::CodeStorage;
use onetime_code::domain::types::CodeRecord;
use onetime_code::error::StorageError;
use onetime_code::infra::memory::MemoryCodeStorage;

// ── SequenceGenerator ────────────────────────────────────────────────────────

/// Hands out a scripted list of codes in order.
pub struct SequenceGenerator {
    codes: Mutex<VecDeque<String>>,
}

impl SequenceGenerator {
    pub fn new(codes: &[&str]) -> Self {
        Self {
            codes: Mutex::new(codes.iter().map(|c| (*c).to_owned()).collect()),
        }
    }
}

impl CodeGenerator for SequenceGenerator {
    fn generate(&self) -> String {
        self.codes
            .lock()
            .unwrap()
            .pop_front()
            .expect("generator sequence exhausted")
    }
}

// ── InstrumentedStorage ──────────────────────────────────────────────────────

/// Memory storage that counts insert attempts and can fail them with a
/// non-constraint backend error.
pub struct InstrumentedStorage {
    pub inner: MemoryCodeStorage,
    pub insert_calls: Arc<AtomicU32>,
    pub fail_inserts: bool,
}

impl Default for InstrumentedStorage {
    fn default() -> Self {
        Self {
            inner: MemoryCodeStorage::new(),
            insert_calls: Arc::new(AtomicU32::new(0)),
            fail_inserts: false,
        }
    }
}

impl InstrumentedStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail_inserts: true,
            ..Self::new()
        }
    }

    /// Returns a shared handle to the insert counter for post-execution inspection.
    pub fn insert_calls_handle(&self) -> Arc<AtomicU32> {
        Arc::clone(&self.insert_calls)
    }
}

impl CodeStorage for InstrumentedStorage {
    async fn build_index(&self, ttl: Duration) -> Result<(), StorageError> {
        self.inner.build_index(ttl).await
    }

    async fn insert(&self, record: &CodeRecord, ttl: Duration) -> Result<(), StorageError> {
        self.insert_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_inserts {
            return Err(StorageError::Backend(anyhow::anyhow!("connection refused")));
        }
        self.inner.insert(record, ttl).await
    }

    async fn find(
        &self,
        owner: &str,
        code_type: &str,
        code: &str,
    ) -> Result<Option<CodeRecord>, StorageError> {
        self.inner.find(owner, code_type, code).await
    }

    async fn take(
        &self,
        owner: &str,
        code_type: &str,
        code: &str,
    ) -> Result<Option<CodeRecord>, StorageError> {
        self.inner.take(owner, code_type, code).await
    }

    async fn purge_expired(&self, cutoff: DateTime<Utc>) -> Result<u64, StorageError> {
        self.inner.purge_expired(cutoff).await
    }
}

// ── Test fixture helpers ─────────────────────────────────────────────────────

pub const TEST_OWNER: &str = "test_user";
pub const TEST_TYPE: &str = "verification";

pub fn test_ttl() -> Duration {
    Duration::seconds(600)
}

/// Insert a record directly, as if it had been issued `age` ago.
pub async fn insert_aged(storage: &MemoryCodeStorage, code: &str, age: Duration) {
    let record = CodeRecord::new(TEST_OWNER, TEST_TYPE, code, Utc::now() - age);
    storage.insert(&record, test_ttl()).await.unwrap();
}
