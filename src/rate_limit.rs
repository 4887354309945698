use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::time::Duration;

use crate::identity::UNKNOWN_IDENTITY;

// Bucket key - one counter per identity per fixed window
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct BucketKey {
    identity: String,
    window: i64,
}

// Fixed-window counter per identity, updated under the DashMap shard lock
pub struct RateLimiter {
    buckets: DashMap<BucketKey, u32>,
    quota: u32,       // max admissions per window
    window_secs: i64, // window length
}

impl RateLimiter {
    pub fn new(quota: u32, window: Duration) -> Self {
        Self {
            buckets: DashMap::new(),
            quota,
            window_secs: window.as_secs().max(1) as i64,
        }
    }

    pub fn window_index(&self, now: DateTime<Utc>) -> i64 {
        now.timestamp().div_euclid(self.window_secs)
    }

    fn key(&self, identity: &str, now: DateTime<Utc>) -> BucketKey {
        let identity = match identity.trim() {
            "" => UNKNOWN_IDENTITY,
            trimmed => trimmed,
        };
        BucketKey {
            identity: identity.to_string(),
            window: self.window_index(now),
        }
    }

    // rejected requests are not counted
    pub fn admit(&self, identity: &str, now: DateTime<Utc>) -> bool {
        let mut count = self.buckets.entry(self.key(identity, now)).or_insert(0);

        // over limit
        if *count >= self.quota {
            return false;
        }

        *count += 1;
        true
    }

    // Admissions recorded for identity in the window containing `now`
    pub fn count(&self, identity: &str, now: DateTime<Utc>) -> u32 {
        self.buckets
            .get(&self.key(identity, now))
            .map(|count| *count)
            .unwrap_or(0)
    }

    pub fn sweep(&self, now: DateTime<Utc>) -> usize {
        let current = self.window_index(now);
        let before = self.buckets.len();
        self.buckets.retain(|key, _| key.window >= current);
        before.saturating_sub(self.buckets.len())
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }
}

// Minimum gap per identity, measured from the last accepted request
pub struct Cooldown {
    last: DashMap<String, DateTime<Utc>>,
    gap: chrono::Duration,
}

impl Cooldown {
    pub fn new(gap: Duration) -> Self {
        Self {
            last: DashMap::new(),
            gap: chrono::Duration::from_std(gap).unwrap_or(chrono::Duration::MAX),
        }
    }

    // Rejections do not restart the wait
    pub fn admit(&self, identity: &str, now: DateTime<Utc>) -> bool {
        let identity = match identity.trim() {
            "" => UNKNOWN_IDENTITY,
            trimmed => trimmed,
        };
        let mut last = match self.last.entry(identity.to_string()) {
            Entry::Vacant(slot) => {
                slot.insert(now);
                return true;
            }
            Entry::Occupied(slot) => slot.into_ref(),
        };

        if now.signed_duration_since(*last) < self.gap {
            return false;
        }
        *last = now;
        true
    }

    pub fn sweep(&self, now: DateTime<Utc>) -> usize {
        let before = self.last.len();
        self.last
            .retain(|_, last| now.signed_duration_since(*last) < self.gap);
        before.saturating_sub(self.last.len())
    }

    pub fn len(&self) -> usize {
        self.last.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last.is_empty()
    }
}
