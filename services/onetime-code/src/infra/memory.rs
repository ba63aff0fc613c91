use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::anyhow;
use chrono::{DateTime, Duration, Utc};

use crate::domain::repository::CodeStorage;
use crate::domain::types::CodeRecord;
use crate::error::StorageError;

type CodeKey = (String, String, String);

/// In-process code storage. Each operation holds the lock for a single map
/// access, which gives unique insert and atomic take. Expired records are only
/// removed by `purge_expired`.
#[derive(Clone, Default)]
pub struct MemoryCodeStorage {
    records: Arc<Mutex<HashMap<CodeKey, DateTime<Utc>>>>,
}

impl MemoryCodeStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every stored record, live or not.
    pub fn snapshot(&self) -> Result<Vec<CodeRecord>, StorageError> {
        let records = self.lock()?;
        Ok(records
            .iter()
            .map(|((owner, code_type, code), created_at)| {
                CodeRecord::new(owner, code_type, code, *created_at)
            })
            .collect())
    }

    pub fn len(&self) -> Result<usize, StorageError> {
        Ok(self.lock()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, StorageError> {
        Ok(self.lock()?.is_empty())
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<CodeKey, DateTime<Utc>>>, StorageError> {
        self.records
            .lock()
            .map_err(|_| StorageError::Backend(anyhow!("memory code storage lock poisoned")))
    }
}

fn key(owner: &str, code_type: &str, code: &str) -> CodeKey {
    (owner.to_owned(), code_type.to_owned(), code.to_owned())
}

impl CodeStorage for MemoryCodeStorage {
    async fn build_index(&self, _ttl: Duration) -> Result<(), StorageError> {
        Ok(())
    }

    async fn insert(&self, record: &CodeRecord, _ttl: Duration) -> Result<(), StorageError> {
        let mut records = self.lock()?;
        match records.entry(key(&record.owner, &record.code_type, &record.code)) {
            Entry::Occupied(_) => Err(StorageError::UniqueViolation),
            Entry::Vacant(slot) => {
                slot.insert(record.created_at);
                Ok(())
            }
        }
    }

    async fn find(
        &self,
        owner: &str,
        code_type: &str,
        code: &str,
    ) -> Result<Option<CodeRecord>, StorageError> {
        let records = self.lock()?;
        Ok(records
            .get(&key(owner, code_type, code))
            .map(|created_at| CodeRecord::new(owner, code_type, code, *created_at)))
    }

    async fn take(
        &self,
        owner: &str,
        code_type: &str,
        code: &str,
    ) -> Result<Option<CodeRecord>, StorageError> {
        let mut records = self.lock()?;
        Ok(records
            .remove(&key(owner, code_type, code))
            .map(|created_at| CodeRecord::new(owner, code_type, code, created_at)))
    }

    async fn purge_expired(&self, cutoff: DateTime<Utc>) -> Result<u64, StorageError> {
        let mut records = self.lock()?;
        let before = records.len();
        records.retain(|_, created_at| *created_at > cutoff);
        Ok((before - records.len()) as u64)
    }
}
