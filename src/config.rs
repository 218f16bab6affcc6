//! Engine configuration.
//!
//! The escalation thresholds are business rules that change independently of
//! the engine logic, so they live here as configurable values instead of
//! literals at the decision sites. Defaults match the production support
//! workflow; a deployment can override any subset from a TOML file.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Full engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TriageConfig {
    /// Escalation thresholds per financing channel.
    pub thresholds: PolicyThresholds,
    /// Session memory caps and expiry.
    pub session: SessionLimits,
    /// Decision cache caps and expiry.
    pub cache: CacheLimits,
}

impl TriageConfig {
    /// Parse a configuration from TOML text. Missing keys fall back to
    /// defaults.
    pub fn from_toml_str(text: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Load a configuration file from disk.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&text)
    }
}

/// Payment-delay escalation thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyThresholds {
    /// Day-equivalents above which a self-funded payment delay escalates.
    pub self_funded_escalation_days: u32,
    /// Month-equivalents above which an OPCO-funded delay escalates.
    pub opco_escalation_months: f64,
    /// Day-equivalents above which a CPF delay triggers the mandatory
    /// "is your case under review?" question.
    pub cpf_review_gate_days: u32,
}

impl Default for PolicyThresholds {
    fn default() -> Self {
        Self {
            self_funded_escalation_days: 7,
            opco_escalation_months: 2.0,
            cpf_review_gate_days: 45,
        }
    }
}

/// Session memory limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionLimits {
    /// Maximum tracked sessions; the oldest-idle session is evicted when
    /// the cap is reached, new sessions are never rejected.
    pub max_sessions: usize,
    /// Per-session turn window; oldest turns drop first.
    pub max_turns: usize,
    /// Idle seconds after which a session is reclaimed.
    pub idle_ttl_secs: u64,
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self {
            max_sessions: 1000,
            max_turns: 10,
            idle_ttl_secs: 3600,
        }
    }
}

/// Decision cache limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheLimits {
    /// Maximum cached decisions; oldest-inserted entries are evicted first.
    pub capacity: usize,
    /// Entry lifetime in seconds. TTL is the only invalidation mechanism.
    pub ttl_secs: u64,
    /// Number of leading message characters used in the cache key.
    pub key_prefix_chars: usize,
}

impl Default for CacheLimits {
    fn default() -> Self {
        Self {
            capacity: 256,
            ttl_secs: 300,
            key_prefix_chars: 64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_business_constants() {
        let config = TriageConfig::default();
        assert_eq!(config.thresholds.self_funded_escalation_days, 7);
        assert_eq!(config.thresholds.opco_escalation_months, 2.0);
        assert_eq!(config.thresholds.cpf_review_gate_days, 45);
        assert_eq!(config.session.max_sessions, 1000);
        assert_eq!(config.session.max_turns, 10);
        assert_eq!(config.session.idle_ttl_secs, 3600);
    }

    #[test]
    fn test_partial_toml_overrides_only_named_keys() {
        let config = TriageConfig::from_toml_str(
            r#"
            [thresholds]
            cpf_review_gate_days = 30

            [cache]
            capacity = 16
            "#,
        )
        .unwrap();
        assert_eq!(config.thresholds.cpf_review_gate_days, 30);
        assert_eq!(config.thresholds.self_funded_escalation_days, 7);
        assert_eq!(config.cache.capacity, 16);
        assert_eq!(config.cache.ttl_secs, 300);
    }

    #[test]
    fn test_toml_round_trip() {
        let config = TriageConfig::default();
        let text = toml::to_string(&config).unwrap();
        let parsed = TriageConfig::from_toml_str(&text).unwrap();
        assert_eq!(
            parsed.thresholds.opco_escalation_months,
            config.thresholds.opco_escalation_months
        );
        assert_eq!(parsed.session.max_turns, config.session.max_turns);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("triage.toml");
        std::fs::write(&path, "[session]\nmax_turns = 4\n").unwrap();

        let config = TriageConfig::load(&path).unwrap();
        assert_eq!(config.session.max_turns, 4);
        assert_eq!(config.session.max_sessions, 1000);
    }
}
