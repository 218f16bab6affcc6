//! Decision policy — deterministic rule table over intent, facts and
//! session state.
//!
//! This is a pure state machine: no model calls, no I/O. Evaluation order
//! inside [`DecisionPolicy::decide`]:
//!
//! ```text
//! legal override          — fixed redirect, no state dependency
//!     │
//! pending-gate resolution — yes/no answers to an open question
//!     │                     (CPF review gate, formation sales offer)
//!     ▼
//! per-intent rule table   — one rule per category
//! ```
//!
//! Internal faults surface as [`PolicyError`]; the service boundary is the
//! single place that converts them into the fallback Decision.

use crate::classifier::intent::Intent;
use crate::classifier::keywords::{KeywordTable, SetId};
use crate::config::PolicyThresholds;
use crate::extractor::{ExtractedFacts, FinancingType};
use crate::message::NormalizedText;
use crate::policy::decision::{blocks, Decision, Priority};
use crate::policy::flow::{FlowId, FlowStage};
use crate::session::state::SessionState;
use std::sync::Arc;
use thiserror::Error;

/// Faults raised during policy evaluation. These are invariant violations,
/// not user-facing conditions.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// The error marker intent reached the rule table; only the failure
    /// boundary may produce it.
    #[error("intent {intent} is not routable by the rule table")]
    UnroutableIntent { intent: Intent },
}

/// The decision rule table.
pub struct DecisionPolicy {
    thresholds: PolicyThresholds,
    table: Arc<KeywordTable>,
}

impl DecisionPolicy {
    pub fn new(thresholds: PolicyThresholds, table: Arc<KeywordTable>) -> Self {
        Self { thresholds, table }
    }

    /// Combine classified intent, extracted facts and session state into
    /// one Decision, advancing the session's flow stage as a side effect.
    ///
    /// The caller must hold the session lock across this call and the
    /// subsequent turn recording.
    pub fn decide(
        &self,
        intent: Intent,
        facts: &ExtractedFacts,
        state: &mut SessionState,
        text: &NormalizedText,
    ) -> Result<Decision, PolicyError> {
        if intent == Intent::Error {
            return Err(PolicyError::UnroutableIntent { intent });
        }

        // Legal redirect has no state dependency and masks everything,
        // including pending gates. It is a firm refusal, not a handoff.
        if intent == Intent::Legal {
            return Ok(self.legal_redirect());
        }

        if let Some(decision) = self.resolve_pending_gate(state, text) {
            tracing::debug!(stage = %state.stage, "pending gate resolved");
            return Ok(decision);
        }

        let decision = match intent {
            Intent::Payment => self.decide_payment(facts, state),
            Intent::Formation => self.decide_formation(state, text),
            Intent::Ambassador => self.decide_ambassador(state),
            Intent::Definition => Decision::new(
                Intent::Definition,
                blocks::DEFINITION_ANSWER,
                "Expliquez le terme demandé en une ou deux phrases simples.",
            )
            .with_search_query(text.as_str()),
            Intent::Contact => Decision::new(
                Intent::Contact,
                blocks::CONTACT_TRANSMISSION,
                "Confirmez que les coordonnées sont transmises à l'équipe.",
            )
            .escalated(Priority::Medium),
            Intent::HumanHandoff => Decision::new(
                Intent::HumanHandoff,
                blocks::HUMAN_HANDOFF,
                "Indiquez qu'un conseiller reprend la conversation.",
            )
            .escalated(Priority::High),
            Intent::FundingCode => Decision::new(
                Intent::FundingCode,
                blocks::FUNDING_CODE_LOOKUP,
                "Donnez le code de financement de la formation concernée.",
            )
            .with_search_query(text.as_str()),
            Intent::ProspectPitch => Decision::new(
                Intent::ProspectPitch,
                blocks::PROSPECT_PITCH,
                "Partagez l'argumentaire standard à transmettre au prospect.",
            )
            .with_search_query("argumentaire offre de formation"),
            Intent::Delay => Decision::new(
                Intent::Delay,
                blocks::DELAY_INFO,
                "Rappelez les délais habituels de traitement.",
            )
            .with_search_query("délais de traitement"),
            Intent::Hostility => Decision::new(
                Intent::Hostility,
                blocks::HOSTILITY_DEESCALATION,
                "Restez calme et courtois, reformulez la demande sans relever le ton.",
            )
            .with_priority(Priority::Medium),
            Intent::General => self.decide_general(facts, state, text),
            // Handled above; kept exhaustive so a new intent fails loudly.
            Intent::Legal => self.legal_redirect(),
            Intent::Error => return Err(PolicyError::UnroutableIntent { intent }),
        };

        tracing::debug!(intent = %intent, decision = %decision.summary(), "rule table decision");
        Ok(decision)
    }

    /// Fixed legal redirect: `escalate = false`, regardless of state.
    fn legal_redirect(&self) -> Decision {
        Decision::new(
            Intent::Legal,
            blocks::LEGAL_REDIRECT,
            "Invitez la personne à adresser sa demande par écrit au service \
             juridique. Ne poursuivez pas la conversation sur ce sujet.",
        )
        .with_priority(Priority::High)
        .with_search_query("procédure réclamation juridique")
    }

    /// Answers to a question the session left open. Returns None when no
    /// gate is pending or the message is not a yes/no answer, in which
    /// case the per-intent table takes over.
    fn resolve_pending_gate(
        &self,
        state: &mut SessionState,
        text: &NormalizedText,
    ) -> Option<Decision> {
        let affirmed = self.table.matches(SetId::Affirmation, text.as_str());
        let denied = self.table.matches(SetId::Negation, text.as_str());
        if !affirmed && !denied {
            return None;
        }

        match state.stage {
            FlowStage::FlowPresented(FlowId::PaymentCpfReview) => {
                if affirmed {
                    // Case already flagged for review: explain the hold.
                    state.stage = FlowStage::FactsComplete;
                    Some(
                        Decision::new(
                            Intent::Payment,
                            blocks::PAYMENT_CPF_RESOLUTION,
                            "Expliquez le contrôle en cours côté Caisse des Dépôts \
                             et les délais associés.",
                        )
                        .with_search_query("dossier cpf en contrôle"),
                    )
                } else {
                    // Not under review but past the gate threshold: a human
                    // must take over. This is the only path that may
                    // escalate a CPF delay.
                    state.stage = FlowStage::Escalated;
                    Some(
                        Decision::new(
                            Intent::Payment,
                            blocks::PAYMENT_ESCALATION,
                            "Transférez le dossier à l'équipe paiements.",
                        )
                        .escalated(Priority::High)
                        .with_search_query("retard paiement cpf"),
                    )
                }
            }
            FlowStage::EscalationOffered(FlowId::Formation) if affirmed => {
                state.stage = FlowStage::Escalated;
                Some(
                    Decision::new(
                        Intent::Formation,
                        blocks::FORMATION_SALES_ESCALATION,
                        "Transmettez la demande d'inscription à l'équipe commerciale.",
                    )
                    .escalated(Priority::Medium)
                    .with_search_query("inscription formation"),
                )
            }
            _ => None,
        }
    }

    /// Payment rule: ask for missing facts, otherwise compare the delay
    /// against the financing channel's threshold.
    fn decide_payment(&self, facts: &ExtractedFacts, state: &mut SessionState) -> Decision {
        if !facts.financing.is_known() || !facts.has_duration() {
            state.stage = FlowStage::AwaitingFacts;
            let missing = match (facts.financing.is_known(), facts.has_duration()) {
                (false, false) => {
                    "Demandez le mode de financement (CPF, OPCO ou paiement direct) \
                     et la date de fin de formation."
                }
                (false, true) => {
                    "Demandez le mode de financement (CPF, OPCO ou paiement direct)."
                }
                _ => "Demandez depuis combien de temps la formation est terminée.",
            };
            return Decision::new(Intent::Payment, blocks::PAYMENT_ASK_FACTS, missing)
                .with_search_query("informations paiement manquantes");
        }

        let days = facts.day_equivalents().unwrap_or(0);
        match facts.financing {
            FinancingType::SelfFunded => {
                if days > self.thresholds.self_funded_escalation_days as u64 {
                    state.stage = FlowStage::Escalated;
                    tracing::info!(days, "self-funded delay past threshold");
                    Decision::new(
                        Intent::Payment,
                        blocks::PAYMENT_ESCALATION,
                        "Transférez le dossier à l'équipe paiements.",
                    )
                    .escalated(Priority::High)
                    .with_search_query("retard paiement direct")
                } else {
                    state.stage = FlowStage::FactsComplete;
                    self.payment_status(facts)
                }
            }
            FinancingType::Opco => {
                let months = facts.month_equivalents().unwrap_or(0.0);
                if months > self.thresholds.opco_escalation_months {
                    state.stage = FlowStage::Escalated;
                    tracing::info!(months, "opco delay past threshold");
                    Decision::new(
                        Intent::Payment,
                        blocks::PAYMENT_ESCALATION,
                        "Transférez le dossier à l'équipe paiements.",
                    )
                    .escalated(Priority::High)
                    .with_search_query("retard paiement opco")
                } else {
                    state.stage = FlowStage::FactsComplete;
                    self.payment_status(facts)
                }
            }
            FinancingType::Cpf => {
                if days > self.thresholds.cpf_review_gate_days as u64 {
                    // Mandatory intermediate question before any CPF
                    // escalation; re-asked verbatim while unanswered.
                    state.mark_presented(blocks::PAYMENT_CPF_REVIEW_QUESTION);
                    state.stage = FlowStage::FlowPresented(FlowId::PaymentCpfReview);
                    Decision::new(
                        Intent::Payment,
                        blocks::PAYMENT_CPF_REVIEW_QUESTION,
                        "Demandez si la Caisse des Dépôts a indiqué que le dossier \
                         est en contrôle.",
                    )
                    .with_priority(Priority::Medium)
                    .with_search_query("contrôle dossier cpf")
                } else {
                    state.stage = FlowStage::FactsComplete;
                    self.payment_status(facts)
                }
            }
            FinancingType::Unknown => {
                // Unreachable through the guard above; treat as missing facts.
                state.stage = FlowStage::AwaitingFacts;
                Decision::new(
                    Intent::Payment,
                    blocks::PAYMENT_ASK_FACTS,
                    "Demandez le mode de financement.",
                )
            }
        }
    }

    fn payment_status(&self, facts: &ExtractedFacts) -> Decision {
        Decision::new(
            Intent::Payment,
            blocks::PAYMENT_STATUS,
            "Rassurez sur le délai: le paiement est dans les temps pour ce \
             mode de financement.",
        )
        .with_search_query(format!("délai paiement {}", facts.financing))
    }

    /// Formation flow: catalog once, then interest-driven sales offer.
    /// The catalog is never repeated.
    fn decide_formation(&self, state: &mut SessionState, text: &NormalizedText) -> Decision {
        if !state.has_presented(blocks::FORMATION_CATALOG) {
            state.mark_presented(blocks::FORMATION_CATALOG);
            state.stage = FlowStage::FlowPresented(FlowId::Formation);
            return Decision::new(
                Intent::Formation,
                blocks::FORMATION_CATALOG,
                "Présentez le catalogue des formations disponibles.",
            )
            .with_search_query("catalogue des formations");
        }

        if self.table.matches(SetId::CourseInterest, text.as_str()) {
            state.mark_presented(blocks::FORMATION_SALES_OFFER);
            state.stage = FlowStage::EscalationOffered(FlowId::Formation);
            return Decision::new(
                Intent::Formation,
                blocks::FORMATION_SALES_OFFER,
                "Proposez un échange avec un conseiller pour finaliser le choix \
                 de cette formation.",
            )
            .with_priority(Priority::Medium)
            .with_search_query("détails formation");
        }

        Decision::new(
            Intent::Formation,
            blocks::FORMATION_FOLLOWUP,
            "Demandez quelle formation du catalogue retient son attention.",
        )
        .with_search_query("catalogue des formations")
    }

    /// Ambassador flow: overview once, follow-up afterwards.
    fn decide_ambassador(&self, state: &mut SessionState) -> Decision {
        if !state.has_presented(blocks::AMBASSADOR_OVERVIEW) {
            state.mark_presented(blocks::AMBASSADOR_OVERVIEW);
            state.stage = FlowStage::FlowPresented(FlowId::Ambassador);
            Decision::new(
                Intent::Ambassador,
                blocks::AMBASSADOR_OVERVIEW,
                "Présentez le programme ambassadeur et ses conditions.",
            )
            .with_search_query("programme ambassadeur")
        } else {
            Decision::new(
                Intent::Ambassador,
                blocks::AMBASSADOR_FOLLOWUP,
                "Répondez à la question sur le programme ambassadeur sans \
                 répéter la présentation.",
            )
            .with_search_query("programme ambassadeur détails")
        }
    }

    /// General fallback with the legal/payment safety net re-applied
    /// before fully generic content.
    fn decide_general(
        &self,
        facts: &ExtractedFacts,
        state: &mut SessionState,
        text: &NormalizedText,
    ) -> Decision {
        if self.table.matches(SetId::Legal, text.as_str()) {
            return self.legal_redirect();
        }
        if facts.financing.is_known() && facts.has_duration() {
            return self.decide_payment(facts, state);
        }
        Decision::new(
            Intent::General,
            blocks::GENERAL_FALLBACK,
            "Répondez au mieux et proposez votre aide sur les formations, \
             paiements ou le programme ambassadeur.",
        )
        .with_search_query(text.as_str())
    }
}
