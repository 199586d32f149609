//! Simulation and experiment parameters.
//!
//! Defaults reproduce the reference experiment: ten years of monthly periods,
//! logistic adoption toward 100k users, per-user minting around 10 tokens and
//! an adaptive burn starting at 2 tokens.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tsify_next::Tsify;

// === DEFAULTS ===

pub const DEFAULT_HORIZON: u32 = 120;
pub const DEFAULT_CAPACITY: f64 = 100_000.0;
pub const DEFAULT_GROWTH_RATE: f64 = 0.05;
pub const DEFAULT_INFLECTION: f64 = 36.0;
pub const DEFAULT_MINT_MEAN: f64 = 10.0;
pub const DEFAULT_MINT_STD: f64 = 3.0;
pub const DEFAULT_BURN_MEAN: f64 = 2.0;
pub const DEFAULT_BURN_STD: f64 = 1.0;
pub const DEFAULT_BURN_ADAPTATION: f64 = 0.1;
pub const DEFAULT_BASE_REWARD: f64 = 1.0;
pub const DEFAULT_RUNS: u32 = 100;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("horizon must be at least one period")]
    NonPositiveHorizon,

    #[error("carrying capacity must be positive (got {0})")]
    NonPositiveCapacity(f64),

    #[error("{field} must be non-negative (got {value})")]
    NegativeStdDev { field: &'static str, value: f64 },

    #[error("{field} must be finite")]
    NonFinite { field: &'static str },

    #[error("initial supply must be non-negative (got {0})")]
    NegativeInitialSupply(f64),

    #[error("run count must be positive")]
    NonPositiveRunCount,

    #[error("invalid config document: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Parameters shared read-only by every run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
#[serde(default)]
pub struct SimulationConfig {
    /// Number of periods, period 0 included.
    pub horizon: u32,
    /// Carrying capacity `K` of the logistic adoption curve.
    pub capacity: f64,
    /// Logistic growth rate `r`.
    pub growth_rate: f64,
    /// Inflection period `t0`.
    pub inflection: f64,
    pub mint_mean: f64,
    pub mint_std: f64,
    /// Burn mean per user at zero supply.
    pub burn_mean: f64,
    pub burn_std: f64,
    /// Sensitivity `α` of the burn mean to supply per user.
    pub burn_adaptation: f64,
    pub initial_supply: f64,
    pub base_reward: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            horizon: DEFAULT_HORIZON,
            capacity: DEFAULT_CAPACITY,
            growth_rate: DEFAULT_GROWTH_RATE,
            inflection: DEFAULT_INFLECTION,
            mint_mean: DEFAULT_MINT_MEAN,
            mint_std: DEFAULT_MINT_STD,
            burn_mean: DEFAULT_BURN_MEAN,
            burn_std: DEFAULT_BURN_STD,
            burn_adaptation: DEFAULT_BURN_ADAPTATION,
            initial_supply: 0.0,
            base_reward: DEFAULT_BASE_REWARD,
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.horizon == 0 {
            return Err(ConfigError::NonPositiveHorizon);
        }

        let finite_fields = [
            ("capacity", self.capacity),
            ("growth_rate", self.growth_rate),
            ("inflection", self.inflection),
            ("mint_mean", self.mint_mean),
            ("mint_std", self.mint_std),
            ("burn_mean", self.burn_mean),
            ("burn_std", self.burn_std),
            ("burn_adaptation", self.burn_adaptation),
            ("initial_supply", self.initial_supply),
            ("base_reward", self.base_reward),
        ];
        if let Some((field, _)) = finite_fields.into_iter().find(|(_, v)| !v.is_finite()) {
            return Err(ConfigError::NonFinite { field });
        }

        if self.capacity <= 0.0 {
            return Err(ConfigError::NonPositiveCapacity(self.capacity));
        }
        for (field, value) in [("mint_std", self.mint_std), ("burn_std", self.burn_std)] {
            if value < 0.0 {
                return Err(ConfigError::NegativeStdDev { field, value });
            }
        }
        if self.initial_supply < 0.0 {
            return Err(ConfigError::NegativeInitialSupply(self.initial_supply));
        }

        Ok(())
    }
}

/// A full Monte Carlo experiment: engine parameters plus batch size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
#[serde(default)]
pub struct ExperimentConfig {
    pub simulation: SimulationConfig,
    pub runs: u32,
    /// Run `i` is seeded with `base_seed + i`.
    pub base_seed: u64,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            simulation: SimulationConfig::default(),
            runs: DEFAULT_RUNS,
            base_seed: 0,
        }
    }
}

impl ExperimentConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.runs == 0 {
            return Err(ConfigError::NonPositiveRunCount);
        }
        self.simulation.validate()
    }

    /// Parse a JSON document. Missing fields fall back to the defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(SimulationConfig::default().validate().is_ok());
        assert!(ExperimentConfig::default().validate().is_ok());
        assert_eq!(SimulationConfig::default().horizon, 120);
    }

    #[test]
    fn test_rejects_degenerate_parameters() {
        let cfg = SimulationConfig {
            horizon: 0,
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::NonPositiveHorizon)));

        let cfg = SimulationConfig {
            capacity: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::NonPositiveCapacity(_))
        ));

        let cfg = SimulationConfig {
            burn_std: -0.5,
            ..Default::default()
        };
        match cfg.validate() {
            Err(ConfigError::NegativeStdDev { field, value }) => {
                assert_eq!(field, "burn_std");
                assert_eq!(value, -0.5);
            }
            other => panic!("expected NegativeStdDev, got {:?}", other),
        }

        let cfg = SimulationConfig {
            growth_rate: f64::NAN,
            ..Default::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::NonFinite {
                field: "growth_rate"
            })
        ));
    }

    #[test]
    fn test_zero_runs_rejected() {
        let exp = ExperimentConfig {
            runs: 0,
            ..Default::default()
        };
        assert!(matches!(exp.validate(), Err(ConfigError::NonPositiveRunCount)));
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let exp = ExperimentConfig::from_json_str(
            r#"{ "runs": 8, "simulation": { "horizon": 24, "mint_std": 0.0 } }"#,
        )
        .expect("valid partial config");

        assert_eq!(exp.runs, 8);
        assert_eq!(exp.base_seed, 0);
        assert_eq!(exp.simulation.horizon, 24);
        assert_eq!(exp.simulation.mint_std, 0.0);
        assert_eq!(exp.simulation.capacity, DEFAULT_CAPACITY);
    }

    #[test]
    fn test_json_validation_errors_surface() {
        let err = ExperimentConfig::from_json_str(r#"{ "runs": 0 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::NonPositiveRunCount));

        let err = ExperimentConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
