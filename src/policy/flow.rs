//! Session-attached flow state machine types.
//!
//! The stage is advanced by the decision policy and lives inside the
//! session, never globally: two sessions can be at different points of the
//! same flow at the same time.

use serde::{Deserialize, Serialize};

/// Multi-turn flows the policy can leave open inside a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowId {
    /// Course catalog → specific interest → sales handoff.
    Formation,
    /// Ambassador overview → follow-up.
    Ambassador,
    /// Mandatory "is your case under review?" gate for long CPF delays.
    PaymentCpfReview,
}

impl std::fmt::Display for FlowId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Formation => write!(f, "formation"),
            Self::Ambassador => write!(f, "ambassador"),
            Self::PaymentCpfReview => write!(f, "payment_cpf_review"),
        }
    }
}

/// Where the session currently stands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowStage {
    /// Fresh session, nothing presented yet.
    #[default]
    Initial,
    /// The policy asked for missing facts (financing channel, end date).
    AwaitingFacts,
    /// All facts needed by the payment rule were seen.
    FactsComplete,
    /// A flow's first-time content or pending question was presented.
    FlowPresented(FlowId),
    /// An escalation was offered and awaits confirmation.
    EscalationOffered(FlowId),
    /// The conversation was handed to a human.
    Escalated,
}

impl std::fmt::Display for FlowStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Initial => write!(f, "initial"),
            Self::AwaitingFacts => write!(f, "awaiting_facts"),
            Self::FactsComplete => write!(f, "facts_complete"),
            Self::FlowPresented(flow) => write!(f, "flow_presented({flow})"),
            Self::EscalationOffered(flow) => write!(f, "escalation_offered({flow})"),
            Self::Escalated => write!(f, "escalated"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_stage_is_initial() {
        assert_eq!(FlowStage::default(), FlowStage::Initial);
    }

    #[test]
    fn test_stage_serde_round_trip() {
        let stage = FlowStage::EscalationOffered(FlowId::Formation);
        let json = serde_json::to_string(&stage).unwrap();
        let parsed: FlowStage = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, stage);
    }

    #[test]
    fn test_display() {
        assert_eq!(
            FlowStage::FlowPresented(FlowId::PaymentCpfReview).to_string(),
            "flow_presented(payment_cpf_review)"
        );
    }
}
