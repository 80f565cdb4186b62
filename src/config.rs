//! Analysis configuration
//!
//! Every tunable the engine uses lives here and is passed in explicitly.
//! Defaults reproduce the dashboard's published figures.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// Default share of observations dropped from each tail for the trimmed mean
pub const DEFAULT_TRIM_PROPORTION: f64 = 0.1;

/// Default multiplier applied to mean engagement for derived conversion
pub const DEFAULT_CONVERSION_FACTOR: f64 = 1.1;

/// Default ceiling for derived conversion
pub const DEFAULT_CONVERSION_CAP: f64 = 95.0;

/// The two zones compared by the hypothesis test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HypothesisGroups {
    pub first: String,
    pub second: String,
}

impl Default for HypothesisGroups {
    fn default() -> Self {
        Self {
            first: "Entrance".to_string(),
            second: "Checkout".to_string(),
        }
    }
}

/// Configuration shared by the zone aggregation and Unit10 components
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Proportion cut from each tail for the trimmed mean, in [0, 0.5)
    pub trim_proportion: f64,
    /// Derived conversion = min(cap, mean engagement × factor).
    /// Placeholder heuristic, not a measured conversion rate.
    pub conversion_factor: f64,
    pub conversion_cap: f64,
    pub hypothesis_groups: HypothesisGroups,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            trim_proportion: DEFAULT_TRIM_PROPORTION,
            conversion_factor: DEFAULT_CONVERSION_FACTOR,
            conversion_cap: DEFAULT_CONVERSION_CAP,
            hypothesis_groups: HypothesisGroups::default(),
        }
    }
}

impl AnalysisConfig {
    /// Load and validate a config from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: AnalysisConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..0.5).contains(&self.trim_proportion) {
            return Err(ConfigError::InvalidValue {
                field: "trim_proportion",
                reason: format!("{} is outside [0, 0.5)", self.trim_proportion),
            });
        }
        if !self.conversion_factor.is_finite() {
            return Err(ConfigError::InvalidValue {
                field: "conversion_factor",
                reason: "must be finite".to_string(),
            });
        }
        if !(self.conversion_cap.is_finite() && self.conversion_cap > 0.0) {
            return Err(ConfigError::InvalidValue {
                field: "conversion_cap",
                reason: format!("{} is not a positive number", self.conversion_cap),
            });
        }
        if self.hypothesis_groups.first == self.hypothesis_groups.second {
            return Err(ConfigError::InvalidValue {
                field: "hypothesis_groups",
                reason: "the two groups must name different zones".to_string(),
            });
        }
        Ok(())
    }
}
