//! Engine configuration.
//!
//! Loaded once at startup from TOML and validated before any component is
//! built. Routing thresholds, initial feature weights and learning rates
//! have no built-in values: a file missing them is rejected.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::time::Duration;

use crate::confidence::Factor;
use crate::swarm::AgentType;

/// Configuration errors. All of them are fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse gatekeeper config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatekeeperConfig {
    pub routing: RoutingConfig,
    pub scoring: ScoringConfig,
    pub swarm: SwarmSettings,
    pub services: ServiceSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoutingConfig {
    pub confidence_threshold: f64,
    pub risk_threshold: f64,
    #[serde(default = "default_marginal_band")]
    pub marginal_band: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScoringConfig {
    /// Initial weight per factor. Factors absent here never contribute.
    pub feature_weights: BTreeMap<Factor, f64>,
    /// Step size of the multiplicative weight update.
    pub weight_learning_rate: f64,
    #[serde(default)]
    pub bias: f64,
    /// Lower clamp applied to every weight after a learning step.
    #[serde(default = "default_weight_floor")]
    pub weight_floor: f64,
    /// Upper clamp applied to every weight after a learning step.
    #[serde(default = "default_weight_ceiling")]
    pub weight_ceiling: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SwarmSettings {
    /// Agents consulted for every request, in dispatch order.
    pub agents: Vec<AgentType>,
    /// EMA rate for agent reliability records.
    pub agent_learning_rate: f64,
    /// Consensus confidence above which a collective outcome counts as a success.
    #[serde(default = "default_consensus_threshold")]
    pub consensus_threshold: f64,
    #[serde(default = "default_agent_timeout_ms")]
    pub agent_timeout_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceSettings {
    /// Timeout for every embedding and completion call.
    pub timeout_ms: u64,
}

fn default_marginal_band() -> f64 {
    0.05
}

fn default_weight_floor() -> f64 {
    0.01
}

fn default_weight_ceiling() -> f64 {
    2.0
}

fn default_consensus_threshold() -> f64 {
    0.75
}

fn default_agent_timeout_ms() -> u64 {
    10_000
}

impl GatekeeperConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        unit_interval("routing.confidence_threshold", self.routing.confidence_threshold)?;
        unit_interval("routing.risk_threshold", self.routing.risk_threshold)?;
        unit_interval("routing.marginal_band", self.routing.marginal_band)?;

        let scoring = &self.scoring;
        if scoring.feature_weights.is_empty() {
            return Err(invalid(
                "scoring.feature_weights",
                "at least one factor weight is required",
            ));
        }
        if !scoring.bias.is_finite() {
            return Err(invalid("scoring.bias", "must be finite"));
        }
        learning_rate("scoring.weight_learning_rate", scoring.weight_learning_rate)?;
        if !(scoring.weight_floor.is_finite() && scoring.weight_ceiling.is_finite())
            || scoring.weight_floor < 0.0
            || scoring.weight_floor >= scoring.weight_ceiling
        {
            return Err(invalid(
                "scoring.weight_floor",
                format!(
                    "need 0 <= weight_floor < weight_ceiling, got {} and {}",
                    scoring.weight_floor, scoring.weight_ceiling
                ),
            ));
        }
        // Zero disables a factor.
        for (factor, weight) in &scoring.feature_weights {
            let in_range = *weight == 0.0
                || (scoring.weight_floor..=scoring.weight_ceiling).contains(weight);
            if !in_range {
                return Err(invalid(
                    "scoring.feature_weights",
                    format!(
                        "weight for {factor} must be 0 or within [{}, {}], got {weight}",
                        scoring.weight_floor, scoring.weight_ceiling
                    ),
                ));
            }
        }

        if self.swarm.agents.is_empty() {
            return Err(invalid("swarm.agents", "at least one agent is required"));
        }
        let mut seen = HashSet::new();
        for agent in &self.swarm.agents {
            if !seen.insert(*agent) {
                return Err(invalid("swarm.agents", format!("duplicate agent {agent}")));
            }
        }
        learning_rate("swarm.agent_learning_rate", self.swarm.agent_learning_rate)?;
        unit_interval("swarm.consensus_threshold", self.swarm.consensus_threshold)?;
        if self.swarm.agent_timeout_ms == 0 {
            return Err(invalid("swarm.agent_timeout_ms", "must be positive"));
        }
        if self.services.timeout_ms == 0 {
            return Err(invalid("services.timeout_ms", "must be positive"));
        }

        Ok(())
    }

    pub fn service_timeout(&self) -> Duration {
        Duration::from_millis(self.services.timeout_ms)
    }

    pub fn agent_timeout(&self) -> Duration {
        Duration::from_millis(self.swarm.agent_timeout_ms)
    }
}

fn unit_interval(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(invalid(field, format!("must be within [0, 1], got {value}")));
    }
    Ok(())
}

fn learning_rate(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if !(value > 0.0 && value <= 1.0) {
        return Err(invalid(field, format!("must be within (0, 1], got {value}")));
    }
    Ok(())
}

/// The shipped `config/gatekeeper.toml`.
#[cfg(test)]
pub(crate) fn sample_config() -> GatekeeperConfig {
    GatekeeperConfig::from_toml_str(include_str!("../../config/gatekeeper.toml"))
        .expect("shipped config is valid")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shipped_config_parses() {
        let config = sample_config();
        assert_eq!(config.routing.confidence_threshold, 0.8);
        assert_eq!(config.routing.risk_threshold, 0.3);
        assert_eq!(config.scoring.feature_weights.len(), 5);
        assert_eq!(
            config.scoring.feature_weights.get(&Factor::Similarity),
            Some(&0.4)
        );
        assert_eq!(
            config.swarm.agents,
            vec![AgentType::Triage, AgentType::Confidence, AgentType::Research]
        );
    }

    const MINIMAL: &str = r#"
        [routing]
        confidence_threshold = 0.7
        risk_threshold = 0.4

        [scoring]
        weight_learning_rate = 0.05
        [scoring.feature_weights]
        similarity = 1.0

        [swarm]
        agents = ["confidence"]
        agent_learning_rate = 0.2

        [services]
        timeout_ms = 500
    "#;

    #[test]
    fn test_optional_fields_default() {
        let config = GatekeeperConfig::from_toml_str(MINIMAL).unwrap();
        assert_eq!(config.routing.marginal_band, 0.05);
        assert_eq!(config.scoring.bias, 0.0);
        assert_eq!(config.swarm.consensus_threshold, 0.75);
        assert_eq!(config.agent_timeout(), Duration::from_secs(10));
        assert_eq!(config.service_timeout(), Duration::from_millis(500));
    }

    #[test]
    fn test_missing_threshold_fails() {
        let content = MINIMAL.replace("confidence_threshold = 0.7", "");
        let err = GatekeeperConfig::from_toml_str(&content).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_unknown_factor_fails() {
        let content = MINIMAL.replace("similarity = 1.0", "similarity = 1.0\nvibes = 0.5");
        let err = GatekeeperConfig::from_toml_str(&content).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_out_of_range_threshold_fails() {
        let content = MINIMAL.replace("risk_threshold = 0.4", "risk_threshold = 1.4");
        let err = GatekeeperConfig::from_toml_str(&content).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "routing.risk_threshold",
                ..
            }
        ));
    }

    #[test]
    fn test_duplicate_agent_fails() {
        let content = MINIMAL.replace(r#"["confidence"]"#, r#"["confidence", "confidence"]"#);
        let err = GatekeeperConfig::from_toml_str(&content).unwrap_err();
        assert!(err.to_string().contains("duplicate agent confidence"));
    }

    #[test]
    fn test_negative_weight_fails() {
        let content = MINIMAL.replace("similarity = 1.0", "similarity = -1.0");
        assert!(GatekeeperConfig::from_toml_str(&content).is_err());
    }

    #[test]
    fn test_weight_outside_clamp_range_fails() {
        for weight in ["similarity = 0.001", "similarity = 2.5"] {
            let content = MINIMAL.replace("similarity = 1.0", weight);
            let err = GatekeeperConfig::from_toml_str(&content).unwrap_err();
            assert!(matches!(
                err,
                ConfigError::Invalid {
                    field: "scoring.feature_weights",
                    ..
                }
            ));
        }
    }

    #[test]
    fn test_zero_weight_disables_factor() {
        let content = MINIMAL.replace("similarity = 1.0", "similarity = 1.0\nquality = 0.0");
        let config = GatekeeperConfig::from_toml_str(&content).unwrap();
        assert_eq!(config.scoring.feature_weights.get(&Factor::Quality), Some(&0.0));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = GatekeeperConfig::load(&dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
