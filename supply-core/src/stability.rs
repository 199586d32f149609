//! Closed-form Sybil-resistance analysis.
//!
//! Farming an action pays `reward · price` tokens-worth and costs `C(a)`.
//! The mechanism is stable while `R(a)·P ≤ C(a)`, i.e. while farming loses
//! money. No randomness is involved.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tsify_next::Tsify;

pub const REWARD_MIN: f64 = 1.0;
pub const REWARD_BASE: f64 = 10.0;
pub const REWARD_MAX: f64 = 20.0;

pub const PRICE_MIN: f64 = 0.001;
pub const PRICE_MAX: f64 = 0.100;
pub const PRICE_STEPS: usize = 100;

pub const COST_MULTIPLIERS: [f64; 4] = [0.5, 1.0, 1.5, 2.0];

#[derive(Debug, Error, PartialEq)]
pub enum StabilityError {
    #[error("price sweep needs at least one step")]
    NoSteps,

    #[error("price range is empty or non-finite ({min}..={max})")]
    BadRange { min: f64, max: f64 },
}

/// Per-action production cost, in currency.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub struct ActionCost {
    /// Electricity and hardware amortization.
    pub compute: f64,
    /// Oracle fees.
    pub verification: f64,
    /// Gas.
    pub network: f64,
}

impl Default for ActionCost {
    fn default() -> Self {
        Self {
            compute: 0.10,
            verification: 0.02,
            network: 0.01,
        }
    }
}

impl ActionCost {
    pub fn total(&self) -> f64 {
        self.compute + self.verification + self.network
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub struct Profitability {
    pub revenue: f64,
    pub profit: f64,
}

impl Profitability {
    /// Farming does not pay.
    pub fn is_sybil_resistant(&self) -> bool {
        self.profit <= 0.0
    }
}

pub fn profitability(price: f64, reward: f64, cost: f64) -> Profitability {
    let revenue = reward * price;
    Profitability {
        revenue,
        profit: revenue - cost,
    }
}

/// Token price at which farming breaks even: `C(a) / R(a)`.
pub fn threshold_price(reward: f64, cost: f64) -> Option<f64> {
    if reward > 0.0 {
        Some(cost / reward)
    } else {
        None
    }
}

/// `steps` evenly spaced prices from `min` to `max`, both ends included.
pub fn price_sweep(min: f64, max: f64, steps: usize) -> Result<Vec<f64>, StabilityError> {
    if steps == 0 {
        return Err(StabilityError::NoSteps);
    }
    if !min.is_finite() || !max.is_finite() || min > max {
        return Err(StabilityError::BadRange { min, max });
    }
    if steps == 1 {
        return Ok(vec![min]);
    }
    let step = (max - min) / (steps - 1) as f64;
    Ok((0..steps)
        .map(|i| if i == steps - 1 { max } else { min + step * i as f64 })
        .collect())
}

/// Profit at each price for one reward and cost level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub struct ProfitCurve {
    pub reward: f64,
    pub cost: f64,
    pub threshold_price: Option<f64>,
    pub points: Vec<Profitability>,
}

impl ProfitCurve {
    pub fn new(reward: f64, cost: f64, prices: &[f64]) -> Self {
        Self {
            reward,
            cost,
            threshold_price: threshold_price(reward, cost),
            points: prices
                .iter()
                .map(|&p| profitability(p, reward, cost))
                .collect(),
        }
    }

    /// Fraction of swept prices where farming loses money.
    pub fn resistant_share(&self) -> f64 {
        if self.points.is_empty() {
            return 0.0;
        }
        let resistant = self.points.iter().filter(|p| p.is_sybil_resistant()).count();
        resistant as f64 / self.points.len() as f64
    }
}

/// One curve per reward level at a fixed cost.
pub fn sensitivity_sweep(rewards: &[f64], cost: f64, prices: &[f64]) -> Vec<ProfitCurve> {
    rewards
        .iter()
        .map(|&r| ProfitCurve::new(r, cost, prices))
        .collect()
}

/// One curve per cost multiplier at a fixed reward.
pub fn cost_sensitivity(
    reward: f64,
    base_cost: f64,
    multipliers: &[f64],
    prices: &[f64],
) -> Vec<ProfitCurve> {
    multipliers
        .iter()
        .map(|&m| ProfitCurve::new(reward, base_cost * m, prices))
        .collect()
}
