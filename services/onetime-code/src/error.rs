/// Failure reported by a [`CodeStorage`](crate::domain::repository::CodeStorage) backend.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The (owner, type, code) key is already taken by a live record.
    #[error("unique constraint violation")]
    UniqueViolation,
    #[error("storage backend error")]
    Backend(#[from] anyhow::Error),
}

/// Errors surfaced by the one-time code store.
#[derive(Debug, thiserror::Error)]
pub enum CodeStoreError {
    #[error("failed to generate unique code after {attempts} attempts")]
    CodeGenerationExhausted { attempts: u32 },
    #[error("storage error")]
    Storage(#[from] StorageError),
}

impl CodeStoreError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CodeGenerationExhausted { .. } => "CODE_GENERATION_EXHAUSTED",
            Self::Storage(_) => "STORAGE",
        }
    }
}
