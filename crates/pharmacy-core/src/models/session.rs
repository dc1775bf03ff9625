//! Admin session model.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Persisted admin flag. Carries no identity beyond the flag itself.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AdminSession {
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

impl AdminSession {
    /// Start a session at the given instant.
    pub fn start(now: DateTime<Utc>) -> Self {
        Self {
            is_admin: true,
            created_at: now,
        }
    }

    /// Check whether the session has outlived its time-to-live.
    pub fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.created_at > ttl
    }
}
