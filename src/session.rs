use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::error::GateError;
use crate::rate_limit::RateLimiter;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKey {
    pub session: String,
    pub feature: String,
}

impl SessionKey {
    pub fn new(session: impl Into<String>, feature: impl Into<String>) -> Self {
        Self {
            session: session.into(),
            feature: feature.into(),
        }
    }
}

// left by /start for the next /stream
#[derive(Debug, Clone, PartialEq)]
pub struct SessionGrant {
    pub payload: String,
    pub issued_at: DateTime<Utc>,
}

// A grant is used at most once and lapses after the TTL
pub struct SessionGate {
    limiter: Arc<RateLimiter>,
    grants: DashMap<SessionKey, SessionGrant>,
    ttl: chrono::Duration,
}

impl SessionGate {
    pub fn new(limiter: Arc<RateLimiter>, ttl: Duration) -> Self {
        Self {
            limiter,
            grants: DashMap::new(),
            ttl: chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX),
        }
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub fn authorize(
        &self,
        key: SessionKey,
        identity: &str,
        payload: String,
        now: DateTime<Utc>,
    ) -> Result<(), GateError> {
        if !self.limiter.admit(identity, now) {
            return Err(GateError::RateLimited);
        }

        // a newer start replaces an unused grant
        self.grants.insert(
            key,
            SessionGrant {
                payload,
                issued_at: now,
            },
        );
        Ok(())
    }

    pub fn consume(&self, key: &SessionKey, now: DateTime<Utc>) -> Option<SessionGrant> {
        let (_, grant) = self.grants.remove(key)?;
        if self.is_expired(&grant, now) {
            return None;
        }
        Some(grant)
    }

    pub fn check_authorized(&self, key: &SessionKey, now: DateTime<Utc>) -> bool {
        self.consume(key, now).is_some()
    }

    fn is_expired(&self, grant: &SessionGrant, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(grant.issued_at) > self.ttl
    }

    pub fn sweep(&self, now: DateTime<Utc>) -> usize {
        let before = self.grants.len();
        self.grants.retain(|_, grant| !self.is_expired(grant, now));
        before.saturating_sub(self.grants.len())
    }

    pub fn pending(&self) -> usize {
        self.grants.len()
    }
}
