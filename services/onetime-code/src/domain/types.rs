use chrono::{DateTime, Duration, Utc};

/// A live one-time code scoped to an (owner, type) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeRecord {
    pub owner: String,
    pub code_type: String,
    pub code: String,
    pub created_at: DateTime<Utc>,
}

impl CodeRecord {
    pub fn new(owner: &str, code_type: &str, code: &str, created_at: DateTime<Utc>) -> Self {
        Self {
            owner: owner.to_owned(),
            code_type: code_type.to_owned(),
            code: code.to_owned(),
            created_at,
        }
    }

    /// A record is valid over `[created_at, created_at + ttl)`.
    pub fn is_expired_at(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.created_at >= ttl
    }
}

/// Default validity window in seconds (10 minutes).
pub const DEFAULT_TTL_SECS: i64 = 600;

/// Total insert attempts `issue` makes before giving up on collisions.
pub const MAX_ISSUE_ATTEMPTS: u32 = 3;

/// Random bytes drawn by the default generator (hex-encoded to twice as many chars).
pub const DEFAULT_CODE_BYTES: usize = 16;
