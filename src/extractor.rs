//! Temporal and financing-fact extraction.
//!
//! Turns normalized free text into the structured signals the decision
//! policy compares against its thresholds: how long ago the training ended
//! (days/weeks/months) and which financing channel paid for it. Extraction
//! is total — absent signals leave fields unset, never an error.

use crate::classifier::keywords::{KeywordTable, SetId};
use crate::message::NormalizedText;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, LazyLock};

static DAY_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\s*(?:jours?|days?|j\b)").unwrap());

static WEEK_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\s*(?:semaines?|weeks?|sem\b)").unwrap());

static MONTH_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\s*(?:mois\b|months?)").unwrap());

/// How the customer paid for the course.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinancingType {
    /// Paid out of pocket.
    SelfFunded,
    /// Personal training account (CPF).
    Cpf,
    /// Employer fund (OPCO).
    Opco,
    /// Not mentioned or not recognized.
    Unknown,
}

impl FinancingType {
    pub fn is_known(self) -> bool {
        self != Self::Unknown
    }
}

impl std::fmt::Display for FinancingType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SelfFunded => write!(f, "self_funded"),
            Self::Cpf => write!(f, "cpf"),
            Self::Opco => write!(f, "opco"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Structured signals extracted from one message.
///
/// `Option` keeps "not mentioned" distinct from "mentioned as zero"; a
/// message can carry several units at once ("1 mois et 2 semaines").
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExtractedFacts {
    pub duration_days: Option<u32>,
    pub duration_weeks: Option<u32>,
    pub duration_months: Option<u32>,
    pub financing: FinancingType,
}

impl Default for ExtractedFacts {
    fn default() -> Self {
        Self {
            duration_days: None,
            duration_weeks: None,
            duration_months: None,
            financing: FinancingType::Unknown,
        }
    }
}

impl ExtractedFacts {
    /// Whether any duration unit was mentioned.
    pub fn has_duration(&self) -> bool {
        self.duration_days.is_some()
            || self.duration_weeks.is_some()
            || self.duration_months.is_some()
    }

    /// Sum of all mentioned units in day-equivalents
    /// (days + weeks×7 + months×30). None when no duration was mentioned.
    pub fn day_equivalents(&self) -> Option<u64> {
        if !self.has_duration() {
            return None;
        }
        let days = self.duration_days.unwrap_or(0) as u64;
        let weeks = self.duration_weeks.unwrap_or(0) as u64;
        let months = self.duration_months.unwrap_or(0) as u64;
        Some(days + weeks * 7 + months * 30)
    }

    /// Sum of all mentioned units in month-equivalents
    /// (months + weeks×(4/12) + days/30). None when no duration was
    /// mentioned.
    pub fn month_equivalents(&self) -> Option<f64> {
        if !self.has_duration() {
            return None;
        }
        let days = self.duration_days.unwrap_or(0) as f64;
        let weeks = self.duration_weeks.unwrap_or(0) as f64;
        let months = self.duration_months.unwrap_or(0) as f64;
        Some(months + weeks * (4.0 / 12.0) + days / 30.0)
    }

    /// Compact form for logging.
    pub fn summary(&self) -> String {
        format!(
            "financing={} days={:?} weeks={:?} months={:?}",
            self.financing, self.duration_days, self.duration_weeks, self.duration_months,
        )
    }
}

/// Stateless extractor over the shared keyword table.
pub struct FactExtractor {
    table: Arc<KeywordTable>,
}

impl FactExtractor {
    pub fn new(table: Arc<KeywordTable>) -> Self {
        Self { table }
    }

    /// Extract all signals from one normalized message. Never fails.
    pub fn extract(&self, text: &NormalizedText) -> ExtractedFacts {
        ExtractedFacts {
            duration_days: first_match(&DAY_PATTERN, text.as_str()),
            duration_weeks: first_match(&WEEK_PATTERN, text.as_str()),
            duration_months: first_match(&MONTH_PATTERN, text.as_str()),
            financing: self.detect_financing(text.as_str()),
        }
    }

    /// Fixed priority: the self-funded phrasing is the most specific and
    /// can co-occur with generic funding words, so it is checked first,
    /// then the OPCO set, then a bare substring check for the CPF code.
    fn detect_financing(&self, text: &str) -> FinancingType {
        if self.table.matches(SetId::SelfFunded, text) {
            return FinancingType::SelfFunded;
        }
        if self.table.matches(SetId::Opco, text) {
            return FinancingType::Opco;
        }
        if text.contains("cpf") {
            return FinancingType::Cpf;
        }
        FinancingType::Unknown
    }
}

/// First regex match for one unit; later mentions of the same unit are
/// ignored. Values too large for u32 are treated as absent.
fn first_match(pattern: &Regex, text: &str) -> Option<u32> {
    pattern
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<u32>().ok())
}
