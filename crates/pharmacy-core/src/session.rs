//! Admin session manager.
//!
//! A single shared password unlocks mutations. The session is a flag plus
//! timestamp kept in the cache store and re-checked against its time-to-live
//! on every read.

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

use crate::cache::{CacheStore, SESSION_KEY};
use crate::clock::Clock;
use crate::models::AdminSession;

/// Default session lifetime.
pub const DEFAULT_SESSION_TTL_SECS: i64 = 3600;

pub struct SessionManager {
    cache: Arc<dyn CacheStore>,
    clock: Arc<dyn Clock>,
    password: String,
    ttl: Duration,
}

impl SessionManager {
    pub fn new(cache: Arc<dyn CacheStore>, clock: Arc<dyn Clock>, password: impl Into<String>) -> Self {
        Self {
            cache,
            clock,
            password: password.into(),
            ttl: Duration::seconds(DEFAULT_SESSION_TTL_SECS),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Start a session if the password matches.
    pub fn login(&self, password: &str) -> bool {
        if password != self.password {
            tracing::warn!("Admin login rejected");
            return false;
        }

        let session = AdminSession::start(self.clock.now());
        let stored = serde_json::to_string(&session)
            .map_err(crate::cache::CacheError::from)
            .and_then(|raw| self.cache.set(SESSION_KEY, &raw));
        match stored {
            Ok(()) => {
                tracing::info!("Admin session started");
                true
            }
            Err(e) => {
                tracing::error!("Could not persist admin session: {}", e);
                false
            }
        }
    }

    pub fn logout(&self) {
        self.clear();
        tracing::info!("Admin session ended");
    }

    /// The live session, if any. Expired or unreadable sessions are cleared.
    pub fn current(&self) -> Option<AdminSession> {
        let raw = match self.cache.get(SESSION_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!("Session read failed: {}", e);
                return None;
            }
        };

        let session: AdminSession = match serde_json::from_str(&raw) {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!("Discarding unreadable admin session: {}", e);
                self.clear();
                return None;
            }
        };

        if !session.is_admin || session.is_expired(self.clock.now(), self.ttl) {
            tracing::info!("Admin session expired");
            self.clear();
            return None;
        }
        Some(session)
    }

    pub fn is_admin(&self) -> bool {
        self.current().is_some()
    }

    /// When the live session stops being valid.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.current().map(|s| {
            s.created_at
                .checked_add_signed(self.ttl)
                .unwrap_or(DateTime::<Utc>::MAX_UTC)
        })
    }

    fn clear(&self) {
        if let Err(e) = self.cache.clear(SESSION_KEY) {
            tracing::warn!("Could not clear admin session: {}", e);
        }
    }
}
