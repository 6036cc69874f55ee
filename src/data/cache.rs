//! In-memory payload caching
//!
//! Caches serialized payloads keyed by request signature (e.g. `rates:90d`)
//! to avoid redundant upstream fetches.
//!
//! Expiry is TTL only; there is no size bound, so keys must come from a
//! small enumerable parameter set. Expired entries are not swept: a lookup
//! past `created_at + ttl` is a miss, and the entry is either overwritten by
//! the next `set` or dropped once it is also past the stale grace period.
//!
//! Each process holds its own cache. With several workers the caches are
//! independent and may disagree for up to one TTL; that is expected.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::core::RateResult;

/// Source of "now" for expiry checks
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now = *now + by;
    }

    pub fn set(&self, to: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A cached serialized payload
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub key: String,
    pub payload: String,
    pub created_at: DateTime<Utc>,
    pub ttl_seconds: u64,
}

impl CacheEntry {
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.created_at + seconds(self.ttl_seconds)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at()
    }

    /// Past expiry and past the grace period as well
    fn is_dead(&self, now: DateTime<Utc>, grace: Duration) -> bool {
        now >= self.expires_at() + grace
    }
}

/// Process-wide TTL cache for serialized payloads
pub struct PayloadCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    clock: Arc<dyn Clock>,
    stale_grace: Duration,
}

impl PayloadCache {
    /// Cache on the wall clock
    pub fn new(stale_grace_seconds: u64) -> Self {
        Self::with_clock(Arc::new(SystemClock), stale_grace_seconds)
    }

    pub fn with_clock(clock: Arc<dyn Clock>, stale_grace_seconds: u64) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
            stale_grace: seconds(stale_grace_seconds),
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
        // A panic mid-insert cannot leave a HashMap half-written
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current time according to the cache's clock
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Fresh payload for `key`, or `None` on miss or expiry
    pub fn get(&self, key: &str) -> Option<String> {
        let now = self.clock.now();
        let mut entries = self.entries();

        match entries.get(key) {
            Some(entry) if !entry.is_expired(now) => {
                tracing::debug!("Cache hit for {}", key);
                Some(entry.payload.clone())
            }
            Some(entry) => {
                if entry.is_dead(now, self.stale_grace) {
                    entries.remove(key);
                    tracing::debug!("Evicted expired entry {}", key);
                }
                None
            }
            None => None,
        }
    }

    /// Expired payload still inside the grace period.
    ///
    /// Only meant as a fallback when the upstream is unavailable.
    pub fn get_stale(&self, key: &str) -> Option<String> {
        let now = self.clock.now();
        self.entries()
            .get(key)
            .filter(|entry| !entry.is_dead(now, self.stale_grace))
            .map(|entry| entry.payload.clone())
    }

    /// Store a payload, replacing any previous entry for `key`
    pub fn set(&self, key: &str, payload: impl Into<String>, ttl_seconds: u64) {
        let entry = CacheEntry {
            key: key.to_string(),
            payload: payload.into(),
            created_at: self.clock.now(),
            ttl_seconds,
        };
        self.entries().insert(key.to_string(), entry);
    }

    /// Drop the entry for `key`; returns whether one existed
    pub fn invalidate(&self, key: &str) -> bool {
        self.entries().remove(key).is_some()
    }

    /// Drop everything
    pub fn clear(&self) {
        self.entries().clear();
    }

    /// Number of entries held, expired ones included
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keys currently held, sorted
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Serialize and store
    pub fn set_json<T: Serialize>(&self, key: &str, value: &T, ttl_seconds: u64) -> RateResult<String> {
        let json = serde_json::to_string(value)?;
        self.set(key, json.clone(), ttl_seconds);
        Ok(json)
    }

    /// Fetch and deserialize a fresh entry
    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> RateResult<Option<T>> {
        match self.get(key) {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }
}

/// Upper bound on any TTL or grace period (ten years)
const MAX_SECONDS: i64 = 10 * 365 * 24 * 3600;

fn seconds(s: u64) -> Duration {
    Duration::seconds(i64::try_from(s).unwrap_or(MAX_SECONDS).min(MAX_SECONDS))
}
