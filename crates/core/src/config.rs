//! Matcher tuning: score weights, thresholds and worker count.

use serde::{Deserialize, Serialize};

/// Relative weights of the three similarity signals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScoreWeights {
    pub name: f64,
    pub parent: f64,
    pub context: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        ScoreWeights {
            name: 0.4,
            parent: 0.3,
            context: 0.3,
        }
    }
}

impl ScoreWeights {
    pub fn sum(&self) -> f64 {
        self.name + self.parent + self.context
    }

    /// Weights scaled to sum to one. Weights that already do are returned as-is
    /// so default scores stay exact.
    pub fn normalized(&self) -> ScoreWeights {
        let sum = self.sum();
        if (sum - 1.0).abs() <= 1e-12 || sum <= 0.0 {
            return self.clone();
        }
        ScoreWeights {
            name: self.name / sum,
            parent: self.parent / sum,
            context: self.context / sum,
        }
    }
}

/// Everything the matcher can be tuned with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MatchConfig {
    pub weights: ScoreWeights,
    /// Renames scoring at or above this are high-confidence.
    pub exact_threshold: f64,
    /// Candidates scoring below this are dropped.
    pub ambiguous_threshold: f64,
    /// Per-slot decay of parameter position similarity.
    pub position_decay: f64,
    /// Threads used for candidate scoring. 1 scores inline.
    pub workers: usize,
}

impl Default for MatchConfig {
    fn default() -> Self {
        MatchConfig {
            weights: ScoreWeights::default(),
            exact_threshold: 0.85,
            ambiguous_threshold: 0.5,
            position_decay: 0.5,
            workers: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} must lie in [0, 1], got {value}")]
    ThresholdOutOfRange { name: &'static str, value: f64 },

    #[error("exact_threshold ({exact}) must be greater than ambiguous_threshold ({ambiguous})")]
    ThresholdOrder { exact: f64, ambiguous: f64 },

    #[error("weight '{name}' must be a finite non-negative number, got {value}")]
    InvalidWeight { name: &'static str, value: f64 },

    #[error("score weights must not all be zero")]
    ZeroWeights,

    #[error("position_decay must lie in [0, 1], got {0}")]
    PositionDecay(f64),

    #[error("workers must be at least 1")]
    NoWorkers,
}

impl MatchConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("exact_threshold", self.exact_threshold),
            ("ambiguous_threshold", self.ambiguous_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::ThresholdOutOfRange { name, value });
            }
        }
        if self.exact_threshold <= self.ambiguous_threshold {
            return Err(ConfigError::ThresholdOrder {
                exact: self.exact_threshold,
                ambiguous: self.ambiguous_threshold,
            });
        }

        for (name, value) in [
            ("name", self.weights.name),
            ("parent", self.weights.parent),
            ("context", self.weights.context),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidWeight { name, value });
            }
        }
        if self.weights.sum() <= 0.0 {
            return Err(ConfigError::ZeroWeights);
        }

        if !(0.0..=1.0).contains(&self.position_decay) {
            return Err(ConfigError::PositionDecay(self.position_decay));
        }
        if self.workers == 0 {
            return Err(ConfigError::NoWorkers);
        }
        Ok(())
    }
}
