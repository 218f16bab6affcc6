//! Short-lived decision memoization.
//!
//! Keyed by a truncated message prefix plus the session id, with a fixed
//! capacity and a short TTL as the only invalidation mechanism: every
//! Decision is a pure function of (message, session state) at computation
//! time, so stale entries simply age out. The explicit bound keeps
//! adversarial streams of unique messages from growing the map.

use crate::config::CacheLimits;
use crate::message::NormalizedText;
use crate::policy::decision::Decision;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use tokio::sync::Mutex;

/// Cache key: truncated normalized message + session id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    prefix: String,
    session_id: String,
}

struct CacheEntry {
    decision: Decision,
    inserted_at: DateTime<Utc>,
    seq: u64,
}

/// Bounded read-through cache for recent Decisions.
pub struct DecisionCache {
    limits: CacheLimits,
    inner: Mutex<CacheInner>,
}

struct CacheInner {
    entries: HashMap<CacheKey, CacheEntry>,
    next_seq: u64,
}

impl DecisionCache {
    pub fn new(limits: CacheLimits) -> Self {
        Self {
            limits,
            inner: Mutex::new(CacheInner {
                entries: HashMap::new(),
                next_seq: 0,
            }),
        }
    }

    fn ttl(&self) -> Duration {
        Duration::seconds(self.limits.ttl_secs as i64)
    }

    /// Build the key for a message within a session.
    pub fn key(&self, text: &NormalizedText, session_id: &str) -> CacheKey {
        CacheKey {
            prefix: text.prefix(self.limits.key_prefix_chars),
            session_id: session_id.to_string(),
        }
    }

    pub async fn get(&self, key: &CacheKey) -> Option<Decision> {
        self.get_at(key, Utc::now()).await
    }

    /// Clock-explicit variant of [`get`](Self::get).
    pub async fn get_at(&self, key: &CacheKey, now: DateTime<Utc>) -> Option<Decision> {
        let inner = self.inner.lock().await;
        let entry = inner.entries.get(key)?;
        if now.signed_duration_since(entry.inserted_at) > self.ttl() {
            return None;
        }
        Some(entry.decision.clone())
    }

    pub async fn insert(&self, key: CacheKey, decision: Decision) {
        self.insert_at(key, decision, Utc::now()).await
    }

    /// Clock-explicit variant of [`insert`](Self::insert). At capacity the
    /// oldest-inserted entry is evicted first.
    pub async fn insert_at(&self, key: CacheKey, decision: Decision, now: DateTime<Utc>) {
        if self.limits.capacity == 0 {
            return;
        }
        let mut inner = self.inner.lock().await;

        if !inner.entries.contains_key(&key) && inner.entries.len() >= self.limits.capacity {
            let oldest = inner
                .entries
                .iter()
                .min_by_key(|(_, e)| e.seq)
                .map(|(k, _)| k.clone());
            if let Some(oldest) = oldest {
                inner.entries.remove(&oldest);
            }
        }

        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.entries.insert(
            key,
            CacheEntry {
                decision,
                inserted_at: now,
                seq,
            },
        );
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.entries.is_empty()
    }
}
