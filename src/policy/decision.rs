//! Decision value produced by the policy.

use crate::classifier::intent::Intent;
use serde::{Deserialize, Serialize};

/// Routing priority attached to a Decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

/// Canned-response block identifiers known to the content store.
pub mod blocks {
    pub const LEGAL_REDIRECT: &str = "legal_redirect";
    pub const PAYMENT_ASK_FACTS: &str = "payment_ask_facts";
    pub const PAYMENT_STATUS: &str = "payment_status";
    pub const PAYMENT_CPF_REVIEW_QUESTION: &str = "payment_cpf_review_question";
    pub const PAYMENT_CPF_RESOLUTION: &str = "payment_cpf_resolution";
    pub const PAYMENT_ESCALATION: &str = "payment_escalation";
    pub const FORMATION_CATALOG: &str = "formation_catalog";
    pub const FORMATION_FOLLOWUP: &str = "formation_followup";
    pub const FORMATION_SALES_OFFER: &str = "formation_sales_offer";
    pub const FORMATION_SALES_ESCALATION: &str = "formation_sales_escalation";
    pub const AMBASSADOR_OVERVIEW: &str = "ambassador_overview";
    pub const AMBASSADOR_FOLLOWUP: &str = "ambassador_followup";
    pub const CONTACT_TRANSMISSION: &str = "contact_transmission";
    pub const HUMAN_HANDOFF: &str = "human_handoff";
    pub const DEFINITION_ANSWER: &str = "definition_answer";
    pub const FUNDING_CODE_LOOKUP: &str = "funding_code_lookup";
    pub const PROSPECT_PITCH: &str = "prospect_pitch";
    pub const DELAY_INFO: &str = "delay_info";
    pub const HOSTILITY_DEESCALATION: &str = "hostility_deescalation";
    pub const GENERAL_FALLBACK: &str = "general_fallback";
    pub const ERROR_FALLBACK: &str = "error_fallback";
}

/// The engine's single output: which block to present, whether to hand the
/// conversation to a human, and what the content-retrieval step needs.
/// Immutable once returned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
    /// Query for the downstream content-retrieval step.
    pub search_query: String,
    /// Intent category this Decision answers.
    pub category: Intent,
    /// Whether the surrounding system must route to a human agent.
    pub escalate: bool,
    /// Routing priority.
    pub priority: Priority,
    /// Candidate block identifiers, most relevant first.
    pub block_hints: Vec<String>,
    /// Generated reply instructions, used as-is when content lookup
    /// yields nothing.
    pub instructions: String,
}

impl Decision {
    pub fn new(category: Intent, block: &str, instructions: impl Into<String>) -> Self {
        Self {
            search_query: String::new(),
            category,
            escalate: false,
            priority: Priority::Low,
            block_hints: vec![block.to_string()],
            instructions: instructions.into(),
        }
    }

    pub fn with_search_query(mut self, query: impl Into<String>) -> Self {
        self.search_query = query.into();
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Mark the Decision as a human handoff. Only policy rules that
    /// explicitly require escalation call this.
    pub fn escalated(mut self, priority: Priority) -> Self {
        self.escalate = true;
        self.priority = priority;
        self
    }

    /// The fallback emitted by the failure boundary: fail safe toward
    /// human review rather than silent mis-routing.
    pub fn fallback() -> Self {
        Self::new(
            Intent::Error,
            blocks::ERROR_FALLBACK,
            "Une erreur interne est survenue. Présentez des excuses et indiquez \
             qu'un conseiller va reprendre la conversation.",
        )
        .escalated(Priority::Critical)
    }

    /// Compact form for logging.
    pub fn summary(&self) -> String {
        format!(
            "category={} escalate={} priority={} blocks=[{}]",
            self.category,
            self.escalate,
            self.priority,
            self.block_hints.join(","),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_decision_does_not_escalate() {
        let d = Decision::new(Intent::General, blocks::GENERAL_FALLBACK, "réponds poliment");
        assert!(!d.escalate);
        assert_eq!(d.priority, Priority::Low);
        assert_eq!(d.block_hints, vec![blocks::GENERAL_FALLBACK.to_string()]);
    }

    #[test]
    fn test_escalated_sets_flag_and_priority() {
        let d = Decision::new(Intent::Payment, blocks::PAYMENT_ESCALATION, "transférer")
            .escalated(Priority::High);
        assert!(d.escalate);
        assert_eq!(d.priority, Priority::High);
    }

    #[test]
    fn test_fallback_shape() {
        let d = Decision::fallback();
        assert_eq!(d.category, Intent::Error);
        assert!(d.escalate);
        assert_eq!(d.priority, Priority::Critical);
        assert_eq!(d.block_hints, vec![blocks::ERROR_FALLBACK.to_string()]);
    }

    #[test]
    fn test_priority_ordering() {
        assert!(Priority::Low < Priority::Medium);
        assert!(Priority::High < Priority::Critical);
    }

    #[test]
    fn test_decision_serde() {
        let d = Decision::new(Intent::Payment, blocks::PAYMENT_STATUS, "statut")
            .with_search_query("délai paiement cpf");
        let json = serde_json::to_string(&d).unwrap();
        assert!(json.contains("\"category\":\"payment\""), "JSON: {json}");
        let parsed: Decision = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.search_query, "délai paiement cpf");
        assert_eq!(parsed.category, Intent::Payment);
    }
}
