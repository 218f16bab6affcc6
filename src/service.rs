//! Triage service — the engine's single entry point.
//!
//! Wires classifier, extractor, policy, session memory, cache and the
//! external collaborators together, and owns the error-to-fallback
//! boundary: internal components fail loudly with typed errors, this is
//! the one place that converts them into the guaranteed well-formed
//! fallback Decision. Nothing in here terminates a request.

use crate::cache::DecisionCache;
use crate::classifier::intent::{Intent, IntentClassifier};
use crate::classifier::keywords::KeywordTable;
use crate::config::TriageConfig;
use crate::content::{ContentLookup, NullContentLookup, NullTurnSink, TurnSink};
use crate::extractor::{ExtractedFacts, FactExtractor};
use crate::message::{IncomingMessage, NormalizedText};
use crate::policy::decision::Decision;
use crate::policy::engine::DecisionPolicy;
use crate::session::state::{Role, SessionState, Turn};
use crate::session::store::SessionStore;
use std::sync::Arc;
use uuid::Uuid;

/// The intent classification and escalation decision engine.
pub struct TriageService {
    classifier: IntentClassifier,
    extractor: FactExtractor,
    policy: DecisionPolicy,
    sessions: SessionStore,
    cache: DecisionCache,
    content: Arc<dyn ContentLookup>,
    sink: Arc<dyn TurnSink>,
}

impl TriageService {
    /// Build the service with the built-in keyword table and null
    /// collaborators.
    pub fn new(config: TriageConfig) -> Self {
        Self::with_table(config, Arc::new(KeywordTable::builtin()))
    }

    /// Build the service around a custom keyword table.
    pub fn with_table(config: TriageConfig, table: Arc<KeywordTable>) -> Self {
        Self {
            classifier: IntentClassifier::new(table.clone()),
            extractor: FactExtractor::new(table.clone()),
            policy: DecisionPolicy::new(config.thresholds.clone(), table),
            sessions: SessionStore::new(config.session.clone()),
            cache: DecisionCache::new(config.cache.clone()),
            content: Arc::new(NullContentLookup),
            sink: Arc::new(NullTurnSink),
        }
    }

    /// Plug in the external content store.
    pub fn with_content_lookup(mut self, content: Arc<dyn ContentLookup>) -> Self {
        self.content = content;
        self
    }

    /// Plug in the external audit sink.
    pub fn with_turn_sink(mut self, sink: Arc<dyn TurnSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Handle one incoming message. Always returns a well-formed Decision.
    pub async fn handle(&self, message: IncomingMessage) -> Decision {
        let message = sanitize(message);
        let text = NormalizedText::new(&message.text);

        let key = self.cache.key(&text, &message.session_id);
        if let Some(hit) = self.cache.get_at(&key, message.received_at).await {
            tracing::debug!(session = %message.session_id, "decision cache hit");
            return hit;
        }

        // The session lock is held across classify + decide + record so two
        // near-simultaneous requests for the same session cannot both see a
        // flow as unpresented.
        let session = self
            .sessions
            .checkout_at(&message.session_id, message.received_at)
            .await;
        let mut state = session.lock().await;

        let intent = self.classifier.classify(&text);
        let facts = self.extractor.extract(&text);
        tracing::debug!(
            session = %message.session_id,
            intent = %intent,
            facts = %facts.summary(),
            "message analyzed"
        );

        let decision = self.decide_or_fallback(intent, &facts, &mut state, &text);
        let decision = self.enrich(decision).await;

        state.append_turn(Turn::new(Role::User, &message.text, message.received_at));
        state.append_turn(Turn::new(
            Role::Assistant,
            &decision.instructions,
            message.received_at,
        ));
        state.touch_at(message.received_at);
        tracing::info!(
            session = %message.session_id,
            decision = %decision.summary(),
            "decision recorded"
        );
        drop(state);

        self.audit(&message.session_id, &message.text, &decision.instructions);
        self.cache
            .insert_at(key, decision.clone(), message.received_at)
            .await;
        decision
    }

    /// Drop idle sessions; exposed for the host's housekeeping loop.
    pub async fn evict_expired_sessions(&self) -> usize {
        self.sessions.evict_expired().await
    }

    /// The error boundary: a policy fault becomes the fallback Decision,
    /// never a raw error to the caller.
    fn decide_or_fallback(
        &self,
        intent: Intent,
        facts: &ExtractedFacts,
        state: &mut SessionState,
        text: &NormalizedText,
    ) -> Decision {
        match self.policy.decide(intent, facts, state, text) {
            Ok(decision) => decision,
            Err(err) => {
                tracing::error!(
                    session = %state.session_id,
                    error = %err,
                    "policy evaluation failed, returning fallback"
                );
                Decision::fallback()
            }
        }
    }

    /// Best-effort enrichment from the content store; failures and empty
    /// results keep the generated instructions.
    async fn enrich(&self, mut decision: Decision) -> Decision {
        let Some(hint) = decision.block_hints.first().cloned() else {
            return decision;
        };
        match self.content.find_block_by_id(&hint).await {
            Ok(Some(block)) => {
                decision.instructions = block.body;
                return decision;
            }
            Ok(None) => {}
            Err(err) => {
                tracing::warn!(block = %hint, error = %err, "content lookup failed, keeping generated instructions");
                return decision;
            }
        }
        match self
            .content
            .find_blocks(&decision.category.to_string(), &decision.search_query, 1)
            .await
        {
            Ok(found) => {
                if let Some(block) = found.into_iter().next() {
                    decision.instructions = block.body;
                }
            }
            Err(err) => {
                tracing::warn!(category = %decision.category, error = %err, "content search failed, keeping generated instructions");
            }
        }
        decision
    }

    /// Fire-and-forget audit of both turns.
    fn audit(&self, session_id: &str, user_text: &str, assistant_text: &str) {
        let sink = self.sink.clone();
        let session_id = session_id.to_string();
        let user_text = user_text.to_string();
        let assistant_text = assistant_text.to_string();
        tokio::spawn(async move {
            if let Err(err) = sink.record(&session_id, Role::User, &user_text).await {
                tracing::warn!(session = %session_id, error = %err, "audit record failed");
            }
            if let Err(err) = sink
                .record(&session_id, Role::Assistant, &assistant_text)
                .await
            {
                tracing::warn!(session = %session_id, error = %err, "audit record failed");
            }
        });
    }
}

/// Substitute safe defaults for malformed input instead of raising.
fn sanitize(mut message: IncomingMessage) -> IncomingMessage {
    if message.text.trim().is_empty() {
        message.text = "empty message".to_string();
    }
    if message.session_id.trim().is_empty() {
        message.session_id = format!("anon-{}", Uuid::new_v4());
        tracing::debug!(session = %message.session_id, "blank session id, generated anonymous id");
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::ContentBlock;
    use crate::policy::decision::{blocks, Priority};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn service() -> TriageService {
        TriageService::new(TriageConfig::default())
    }

    struct CountingLookup {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ContentLookup for CountingLookup {
        async fn find_blocks(
            &self,
            _category: &str,
            _context_hint: &str,
            _limit: usize,
        ) -> anyhow::Result<Vec<ContentBlock>> {
            Ok(Vec::new())
        }

        async fn find_block_by_id(&self, id: &str) -> anyhow::Result<Option<ContentBlock>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Some(ContentBlock {
                id: id.to_string(),
                category: "any".to_string(),
                body: format!("corps du bloc {id}"),
            }))
        }
    }

    struct FailingLookup;

    #[async_trait]
    impl ContentLookup for FailingLookup {
        async fn find_blocks(
            &self,
            _category: &str,
            _context_hint: &str,
            _limit: usize,
        ) -> anyhow::Result<Vec<ContentBlock>> {
            anyhow::bail!("content store unavailable")
        }

        async fn find_block_by_id(&self, _id: &str) -> anyhow::Result<Option<ContentBlock>> {
            anyhow::bail!("content store unavailable")
        }
    }

    struct FailingSink;

    #[async_trait]
    impl TurnSink for FailingSink {
        async fn record(
            &self,
            _session_id: &str,
            _role: Role,
            _content: &str,
        ) -> anyhow::Result<()> {
            anyhow::bail!("audit trail down")
        }
    }

    #[tokio::test]
    async fn test_empty_message_gets_safe_default() {
        let service = service();
        let decision = service.handle(IncomingMessage::new("   ", "sess-1")).await;
        assert_eq!(decision.category, Intent::General);
        assert!(!decision.escalate);
    }

    #[tokio::test]
    async fn test_blank_session_id_is_replaced() {
        let service = service();
        // Two anonymous messages must not share a session: the second
        // formation message would otherwise skip the catalog.
        let first = service
            .handle(IncomingMessage::new("je cherche une formation", ""))
            .await;
        let second = service
            .handle(IncomingMessage::new("je cherche une formation", "  "))
            .await;
        assert_eq!(
            first.block_hints,
            vec![blocks::FORMATION_CATALOG.to_string()]
        );
        assert_eq!(
            second.block_hints,
            vec![blocks::FORMATION_CATALOG.to_string()]
        );
    }

    #[tokio::test]
    async fn test_turns_are_recorded_in_session() {
        let service = service();
        service
            .handle(IncomingMessage::new("bonjour", "sess-turns"))
            .await;
        let session = service.sessions.checkout("sess-turns").await;
        let state = session.lock().await;
        assert_eq!(state.turn_count(), 2);
        let roles: Vec<Role> = state.turns().map(|t| t.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Assistant]);
    }

    #[tokio::test]
    async fn test_cache_short_circuits_recomputation() {
        let lookup = Arc::new(CountingLookup {
            calls: AtomicUsize::new(0),
        });
        let service =
            TriageService::new(TriageConfig::default()).with_content_lookup(lookup.clone());

        let msg = IncomingMessage::new("quel est le code cpf ?", "sess-cache");
        let first = service.handle(msg.clone()).await;
        let second = service.handle(msg).await;

        assert_eq!(lookup.calls.load(Ordering::SeqCst), 1);
        assert_eq!(first.instructions, second.instructions);
    }

    #[tokio::test]
    async fn test_content_enrichment_replaces_instructions() {
        let lookup = Arc::new(CountingLookup {
            calls: AtomicUsize::new(0),
        });
        let service = TriageService::new(TriageConfig::default()).with_content_lookup(lookup);
        let decision = service
            .handle(IncomingMessage::new("je cherche une formation", "sess-e"))
            .await;
        assert_eq!(
            decision.instructions,
            format!("corps du bloc {}", blocks::FORMATION_CATALOG)
        );
    }

    #[tokio::test]
    async fn test_failing_content_store_is_non_fatal() {
        let service =
            TriageService::new(TriageConfig::default()).with_content_lookup(Arc::new(FailingLookup));
        let decision = service
            .handle(IncomingMessage::new("je cherche une formation", "sess-f"))
            .await;
        assert_eq!(
            decision.block_hints,
            vec![blocks::FORMATION_CATALOG.to_string()]
        );
        assert!(!decision.instructions.is_empty());
    }

    #[tokio::test]
    async fn test_failing_audit_sink_is_non_fatal() {
        let service = TriageService::new(TriageConfig::default())
            .with_turn_sink(Arc::new(FailingSink));
        let decision = service
            .handle(IncomingMessage::new("bonjour", "sess-sink"))
            .await;
        assert_eq!(decision.category, Intent::General);
    }

    #[tokio::test]
    async fn test_error_boundary_yields_fallback() {
        let service = service();
        let mut state = SessionState::new("sess-err", 10, chrono::Utc::now());
        let decision = service.decide_or_fallback(
            Intent::Error,
            &ExtractedFacts::default(),
            &mut state,
            &NormalizedText::new("peu importe"),
        );
        assert_eq!(decision.category, Intent::Error);
        assert!(decision.escalate);
        assert_eq!(decision.priority, Priority::Critical);
    }
}
