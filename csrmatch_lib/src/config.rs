//! Match scoring configuration.
//!
//! Weights, the compliance gate, and strength/risk thresholds are read from
//! TOML. Defaults are embedded from `seed_data/scoring.toml`.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Error types for scoring configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("invalid scoring config: {0}")]
    Invalid(String),
}

/// Relative weight of each sub-score in the composite. Must sum to 1.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Weights {
    pub geographic: f64,
    pub thematic: f64,
}

/// How compliance failures gate the composite score.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Gating {
    /// Composite multiplier applied when the NGO is non-compliant (0 zeroes it).
    pub non_compliant_multiplier: f64,
}

/// Sub-score cut-offs for strengths (at or above) and risks (below).
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Thresholds {
    pub geographic_strength: u8,
    pub geographic_risk: u8,
    pub thematic_strength: f64,
    pub thematic_risk: f64,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct ScoringConfig {
    pub weights: Weights,
    pub gating: Gating,
    pub thresholds: Thresholds,
}

impl ScoringConfig {
    /// Parse and validate a config from TOML content.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: ScoringConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse, and validate a config file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Embedded defaults.
    pub fn embedded() -> Result<Self, ConfigError> {
        Self::from_toml_str(include_str!("../../seed_data/scoring.toml"))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let w = &self.weights;
        if !w.geographic.is_finite() || !w.thematic.is_finite() {
            return Err(ConfigError::Invalid(format!(
                "weights must be finite numbers, got geographic={} thematic={}",
                w.geographic, w.thematic
            )));
        }
        if w.geographic < 0.0 || w.thematic < 0.0 {
            return Err(ConfigError::Invalid(
                "weights must be non-negative".to_string(),
            ));
        }
        let sum = w.geographic + w.thematic;
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(ConfigError::Invalid(format!(
                "weights must sum to 1.0, got {}",
                sum
            )));
        }

        let m = self.gating.non_compliant_multiplier;
        if !(0.0..=1.0).contains(&m) {
            return Err(ConfigError::Invalid(format!(
                "non_compliant_multiplier must be between 0 and 1, got {}",
                m
            )));
        }

        let t = &self.thresholds;
        if t.geographic_strength > 100 || t.geographic_risk > 100 {
            return Err(ConfigError::Invalid(
                "geographic thresholds must be between 0 and 100".to_string(),
            ));
        }
        for (name, value) in [
            ("thematic_strength", t.thematic_strength),
            ("thematic_risk", t.thematic_risk),
        ] {
            if !(0.0..=100.0).contains(&value) {
                return Err(ConfigError::Invalid(format!(
                    "{} must be between 0 and 100, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            weights: Weights {
                geographic: 0.5,
                thematic: 0.5,
            },
            gating: Gating {
                non_compliant_multiplier: 0.0,
            },
            thresholds: Thresholds {
                geographic_strength: 75,
                geographic_risk: 50,
                thematic_strength: 50.0,
                thematic_risk: 25.0,
            },
        }
    }
}
