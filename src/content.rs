//! Collaborator contracts.
//!
//! The engine never owns content or audit storage; it calls out through
//! these traits and treats every failure as non-fatal. Null
//! implementations let the engine run standalone and back the tests.

use crate::session::state::Role;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A pre-authored canned-response fragment from the external store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentBlock {
    pub id: String,
    pub category: String,
    pub body: String,
}

/// External content store. On error or empty result the engine proceeds
/// with its own generated instructions.
#[async_trait]
pub trait ContentLookup: Send + Sync {
    async fn find_blocks(
        &self,
        category: &str,
        context_hint: &str,
        limit: usize,
    ) -> anyhow::Result<Vec<ContentBlock>>;

    async fn find_block_by_id(&self, id: &str) -> anyhow::Result<Option<ContentBlock>>;
}

/// External audit trail, fire-and-forget. Failures never affect the
/// returned Decision.
#[async_trait]
pub trait TurnSink: Send + Sync {
    async fn record(&self, session_id: &str, role: Role, content: &str) -> anyhow::Result<()>;
}

/// Content store that never has anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullContentLookup;

#[async_trait]
impl ContentLookup for NullContentLookup {
    async fn find_blocks(
        &self,
        _category: &str,
        _context_hint: &str,
        _limit: usize,
    ) -> anyhow::Result<Vec<ContentBlock>> {
        Ok(Vec::new())
    }

    async fn find_block_by_id(&self, _id: &str) -> anyhow::Result<Option<ContentBlock>> {
        Ok(None)
    }
}

/// Audit sink that drops everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullTurnSink;

#[async_trait]
impl TurnSink for NullTurnSink {
    async fn record(&self, _session_id: &str, _role: Role, _content: &str) -> anyhow::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_null_lookup_is_empty() {
        let lookup = NullContentLookup;
        assert!(lookup.find_blocks("payment", "", 3).await.unwrap().is_empty());
        assert!(lookup
            .find_block_by_id("payment_status")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_null_sink_accepts_everything() {
        let sink = NullTurnSink;
        assert!(sink.record("sess-1", Role::User, "bonjour").await.is_ok());
    }
}
