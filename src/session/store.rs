//! Bounded, time-expiring session store.
//!
//! The store is the only shared mutable resource in the engine. Each entry
//! carries its own `tokio::sync::Mutex` so requests for the same session
//! serialize their read-decide-record sequence while unrelated sessions
//! stay fully parallel; the store's internal map lock is held only for
//! checkout bookkeeping, never across a decision.
//!
//! Reclamation is time-based: there is no destroy call. A session idle
//! past the TTL reads as if it never existed, and the store-wide cap
//! evicts the oldest-idle session rather than rejecting new ones.

use crate::config::SessionLimits;
use crate::session::state::SessionState;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

struct SessionHandle {
    state: Arc<Mutex<SessionState>>,
    last_seen: DateTime<Utc>,
}

/// Session memory shared by all requests.
pub struct SessionStore {
    limits: SessionLimits,
    inner: Mutex<HashMap<String, SessionHandle>>,
}

impl SessionStore {
    pub fn new(limits: SessionLimits) -> Self {
        Self {
            limits,
            inner: Mutex::new(HashMap::new()),
        }
    }

    fn ttl(&self) -> Duration {
        Duration::seconds(self.limits.idle_ttl_secs as i64)
    }

    /// Get-or-create the session and hand out its lock. The caller holds
    /// the returned mutex across the whole decision sequence.
    pub async fn checkout(&self, session_id: &str) -> Arc<Mutex<SessionState>> {
        self.checkout_at(session_id, Utc::now()).await
    }

    /// Clock-explicit variant of [`checkout`](Self::checkout).
    pub async fn checkout_at(
        &self,
        session_id: &str,
        now: DateTime<Utc>,
    ) -> Arc<Mutex<SessionState>> {
        if self.limits.max_sessions == 0 {
            // Degenerate cap: hand out untracked state.
            return Arc::new(Mutex::new(SessionState::new(
                session_id,
                self.limits.max_turns,
                now,
            )));
        }

        let mut map = self.inner.lock().await;

        let reusable = map
            .get(session_id)
            .is_some_and(|h| now.signed_duration_since(h.last_seen) <= self.ttl());
        if reusable {
            if let Some(handle) = map.get_mut(session_id) {
                handle.last_seen = now;
                return handle.state.clone();
            }
        }

        // Expired entries read as if the session never existed.
        if map.remove(session_id).is_some() {
            tracing::debug!(session = %session_id, "idle session expired, starting fresh");
        }

        if map.len() >= self.limits.max_sessions {
            let oldest = map
                .iter()
                .min_by_key(|(_, h)| h.last_seen)
                .map(|(id, _)| id.clone());
            if let Some(oldest) = oldest {
                map.remove(&oldest);
                tracing::debug!(session = %oldest, "store at capacity, evicted oldest-idle session");
            }
        }

        let state = Arc::new(Mutex::new(SessionState::new(
            session_id,
            self.limits.max_turns,
            now,
        )));
        map.insert(
            session_id.to_string(),
            SessionHandle {
                state: state.clone(),
                last_seen: now,
            },
        );
        state
    }

    /// Drop every session idle past the TTL; returns how many were removed.
    pub async fn evict_expired(&self) -> usize {
        self.evict_expired_at(Utc::now()).await
    }

    /// Clock-explicit variant of [`evict_expired`](Self::evict_expired).
    pub async fn evict_expired_at(&self, now: DateTime<Utc>) -> usize {
        let ttl = self.ttl();
        let mut map = self.inner.lock().await;
        let before = map.len();
        map.retain(|_, h| now.signed_duration_since(h.last_seen) <= ttl);
        before - map.len()
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_empty()
    }
}
