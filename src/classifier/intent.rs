//! Intent classification over the keyword table.
//!
//! Categories are not mutually exclusive at the lexical level ("payment"
//! and "delay" co-occur all the time), so the classifier walks an explicit
//! ordered rule list and short-circuits at the first match. Business
//! priority dictates the order: legal and payment concerns must never be
//! masked by a lower-priority generic match.

use crate::classifier::keywords::{KeywordTable, SetId};
use crate::message::NormalizedText;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Intent category attached to every Decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    /// "What is an X" style question.
    Definition,
    /// Legal or fraud red-flag.
    Legal,
    /// Payment-status request.
    Payment,
    /// Affiliate/ambassador program question.
    Ambassador,
    /// Request to transmit contact details.
    Contact,
    /// Course/training inquiry.
    Formation,
    /// Explicit request for a human.
    HumanHandoff,
    /// Funding-code lookup (CPF code).
    FundingCode,
    /// Request for a pitch to forward to a prospect.
    ProspectPitch,
    /// Generic delay/duration inquiry.
    Delay,
    /// Abusive message.
    Hostility,
    /// Default fallback.
    General,
    /// Produced only by the failure boundary, never by the classifier.
    Error,
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Definition => write!(f, "definition"),
            Self::Legal => write!(f, "legal"),
            Self::Payment => write!(f, "payment"),
            Self::Ambassador => write!(f, "ambassador"),
            Self::Contact => write!(f, "contact"),
            Self::Formation => write!(f, "formation"),
            Self::HumanHandoff => write!(f, "human_handoff"),
            Self::FundingCode => write!(f, "funding_code"),
            Self::ProspectPitch => write!(f, "prospect_pitch"),
            Self::Delay => write!(f, "delay"),
            Self::Hostility => write!(f, "hostility"),
            Self::General => write!(f, "general"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// One row of the priority table: trigger set, optional veto set.
///
/// A rule fires when its trigger set matches and its veto set (if any)
/// does not. The veto exists for the definition rule: "c'est quoi une
/// arnaque" must land on the legal rule, not the definition one.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct IntentRule {
    pub intent: Intent,
    pub trigger: SetId,
    pub veto: Option<SetId>,
}

impl IntentRule {
    pub fn new(intent: Intent, trigger: SetId) -> Self {
        Self {
            intent,
            trigger,
            veto: None,
        }
    }

    pub fn unless(mut self, veto: SetId) -> Self {
        self.veto = Some(veto);
        self
    }
}

/// Deterministic, total classifier: always returns an intent, falling back
/// to [`Intent::General`].
pub struct IntentClassifier {
    table: Arc<KeywordTable>,
    rules: Vec<IntentRule>,
}

impl IntentClassifier {
    /// Build the classifier with the production priority order.
    pub fn new(table: Arc<KeywordTable>) -> Self {
        let rules = vec![
            IntentRule::new(Intent::Definition, SetId::Definition).unless(SetId::Legal),
            IntentRule::new(Intent::Legal, SetId::Legal),
            IntentRule::new(Intent::Payment, SetId::Payment),
            IntentRule::new(Intent::Ambassador, SetId::Ambassador),
            IntentRule::new(Intent::Contact, SetId::Contact),
            IntentRule::new(Intent::Formation, SetId::Formation),
            IntentRule::new(Intent::HumanHandoff, SetId::HumanHandoff),
            IntentRule::new(Intent::FundingCode, SetId::FundingCode),
            IntentRule::new(Intent::ProspectPitch, SetId::ProspectPitch),
            IntentRule::new(Intent::Delay, SetId::Delay),
            IntentRule::new(Intent::Hostility, SetId::Hostility),
        ];
        Self { table, rules }
    }

    /// The ordered rule table, exposed so the priority order can be
    /// inspected and tested rule by rule.
    pub fn rules(&self) -> &[IntentRule] {
        &self.rules
    }

    /// First matching rule wins; no match falls back to `General`.
    pub fn classify(&self, text: &NormalizedText) -> Intent {
        for rule in &self.rules {
            if !self.table.matches(rule.trigger, text.as_str()) {
                continue;
            }
            if let Some(veto) = rule.veto {
                if self.table.matches(veto, text.as_str()) {
                    continue;
                }
            }
            return rule.intent;
        }
        Intent::General
    }
}
