//! Rule-table and threshold-boundary coverage.
//!
//! Exercises the classify → extract → decide pipeline directly, without
//! the service layer, so each rule can be pinned at its boundary values.

use chrono::Utc;
use std::sync::Arc;
use support_triage::{
    blocks, DecisionPolicy, ExtractedFacts, FactExtractor, FlowId, FlowStage, Intent,
    IntentClassifier, KeywordTable, NormalizedText, PolicyThresholds, SessionState,
};

struct Pipeline {
    classifier: IntentClassifier,
    extractor: FactExtractor,
    policy: DecisionPolicy,
}

impl Pipeline {
    fn new() -> Self {
        let table = Arc::new(KeywordTable::builtin());
        Self {
            classifier: IntentClassifier::new(table.clone()),
            extractor: FactExtractor::new(table.clone()),
            policy: DecisionPolicy::new(PolicyThresholds::default(), table),
        }
    }

    fn run(&self, state: &mut SessionState, raw: &str) -> support_triage::Decision {
        let text = NormalizedText::new(raw);
        let intent = self.classifier.classify(&text);
        let facts = self.extractor.extract(&text);
        self.policy
            .decide(intent, &facts, state, &text)
            .expect("rule table is total over classifier output")
    }
}

fn session() -> SessionState {
    SessionState::new("test", 10, Utc::now())
}

#[test]
fn test_unrecognized_text_is_general_and_never_escalates() {
    let pipeline = Pipeline::new();
    for raw in ["bonjour", "???", "je repasse plus tard", "merci beaucoup"] {
        let mut state = session();
        let d = pipeline.run(&mut state, raw);
        assert_eq!(d.category, Intent::General, "text: {raw}");
        assert!(!d.escalate, "text: {raw}");
    }
}

#[test]
fn test_extraction_returns_exactly_the_mentioned_value() {
    let extractor = FactExtractor::new(Arc::new(KeywordTable::builtin()));
    let facts = extractor.extract(&NormalizedText::new("fini depuis 3 semaines"));
    assert_eq!(facts.duration_weeks, Some(3));
    assert_eq!(facts.duration_days, None);
    assert_eq!(facts.duration_months, None);
}

#[test]
fn test_self_funded_boundary_is_strictly_greater_than_seven() {
    let pipeline = Pipeline::new();

    let mut state = session();
    let at_limit = pipeline.run(
        &mut state,
        "j'ai payé moi-même et toujours pas de virement depuis 7 jours",
    );
    assert!(!at_limit.escalate, "7 day-equivalents must hold");

    let mut state = session();
    let past_limit = pipeline.run(
        &mut state,
        "j'ai payé moi-même et toujours pas de virement depuis 8 jours",
    );
    assert!(past_limit.escalate, "8 day-equivalents must escalate");
}

#[test]
fn test_opco_boundary_is_strictly_greater_than_two_months() {
    let pipeline = Pipeline::new();

    let mut state = session();
    let at_limit = pipeline.run(
        &mut state,
        "payé par l'opco, la formation est finie depuis 2 mois",
    );
    assert!(!at_limit.escalate, "2 month-equivalents must hold");

    let mut state = session();
    // 9 weeks = 3.0 month-equivalents.
    let past_limit = pipeline.run(
        &mut state,
        "payé par l'opco, toujours rien depuis 9 semaines de virement",
    );
    assert!(past_limit.escalate, "3 month-equivalents must escalate");
}

#[test]
fn test_cpf_gate_boundary_is_strictly_greater_than_forty_five() {
    let pipeline = Pipeline::new();

    let mut state = session();
    let at_limit = pipeline.run(&mut state, "paiement cpf, fini depuis 45 jours");
    assert_eq!(
        at_limit.block_hints,
        vec![blocks::PAYMENT_STATUS.to_string()],
        "45 day-equivalents stays on the normal status block"
    );

    let mut state = session();
    let past_limit = pipeline.run(&mut state, "paiement cpf, fini depuis 46 jours");
    assert_eq!(
        past_limit.block_hints,
        vec![blocks::PAYMENT_CPF_REVIEW_QUESTION.to_string()]
    );
    assert!(!past_limit.escalate);
    assert_eq!(
        state.stage,
        FlowStage::FlowPresented(FlowId::PaymentCpfReview)
    );
}

#[test]
fn test_mixed_units_convert_before_comparison() {
    let pipeline = Pipeline::new();
    // 1 month + 2 weeks = 44 day-equivalents: under the CPF gate.
    let mut state = session();
    let d = pipeline.run(
        &mut state,
        "paiement cpf en retard depuis 1 mois et 2 semaines",
    );
    assert_eq!(d.block_hints, vec![blocks::PAYMENT_STATUS.to_string()]);

    // 1 month + 3 weeks = 51 day-equivalents: past the gate.
    let mut state = session();
    let d = pipeline.run(
        &mut state,
        "paiement cpf en retard depuis 1 mois et 3 semaines",
    );
    assert_eq!(
        d.block_hints,
        vec![blocks::PAYMENT_CPF_REVIEW_QUESTION.to_string()]
    );
}

#[test]
fn test_classification_and_extraction_are_idempotent() {
    let table = Arc::new(KeywordTable::builtin());
    let classifier = IntentClassifier::new(table.clone());
    let extractor = FactExtractor::new(table);
    let text = NormalizedText::new("paiement cpf en retard depuis 46 jours");

    assert_eq!(classifier.classify(&text), classifier.classify(&text));
    assert_eq!(extractor.extract(&text), extractor.extract(&text));
}

#[test]
fn test_presented_catalog_never_reappears_in_hints() {
    let pipeline = Pipeline::new();
    let mut state = session();
    state.mark_presented(blocks::FORMATION_CATALOG);

    for raw in [
        "je veux une formation",
        "la formation graphisme m'intéresse",
        "parlez-moi de vos formations",
    ] {
        let d = pipeline.run(&mut state, raw);
        assert!(
            !d.block_hints.contains(&blocks::FORMATION_CATALOG.to_string()),
            "text: {raw}"
        );
    }
}

#[test]
fn test_escalation_is_only_asserted_by_explicit_rules() {
    let pipeline = Pipeline::new();
    // None of these paths carries an explicit escalate rule.
    for raw in [
        "c'est quoi un opco ?",
        "quel est le code cpf ?",
        "ça prend combien de temps ?",
        "vous êtes nuls",
        "je cherche une formation",
        "devenir ambassadeur m'intéresse ?",
        "je vais porter plainte",
        "bonjour",
    ] {
        let mut state = session();
        let d = pipeline.run(&mut state, raw);
        assert!(!d.escalate, "text: {raw} → {}", d.summary());
    }
}

#[test]
fn test_cpf_escalation_unreachable_without_recorded_question() {
    let pipeline = Pipeline::new();
    // Fresh session: a bare "non" must not trip the CPF escalation path.
    let mut state = session();
    let d = pipeline.run(&mut state, "non");
    assert!(!d.escalate);
    assert_ne!(
        d.block_hints,
        vec![blocks::PAYMENT_ESCALATION.to_string()]
    );

    // Same answer once the question was recorded: escalation.
    let mut state = session();
    pipeline.run(&mut state, "paiement cpf, fini depuis 60 jours");
    let d = pipeline.run(&mut state, "non");
    assert!(d.escalate);
}

#[test]
fn test_default_facts_are_empty() {
    let facts = ExtractedFacts::default();
    assert!(!facts.has_duration());
    assert_eq!(facts.day_equivalents(), None);
}
