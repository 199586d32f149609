//! One period of stochastic minting and burning.
//!
//! Every random draw in the engine happens here. Each active user mints and
//! burns a non-negative amount drawn from a normal distribution clamped at
//! zero; the per-period totals then move supply and the reward coefficient.

use rand::Rng;
use rand_distr::{Distribution, StandardNormal};

use crate::config::SimulationConfig;
use crate::growth::sample_size;

/// Normal distribution with negative draws clamped to zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClampedNormal {
    pub mean: f64,
    pub std_dev: f64,
}

impl ClampedNormal {
    pub fn new(mean: f64, std_dev: f64) -> Self {
        Self { mean, std_dev }
    }

    /// Sum of `n` independent draws.
    pub fn sum_of<R: Rng + ?Sized>(&self, rng: &mut R, n: u64) -> f64 {
        let mut total = 0.0;
        for _ in 0..n {
            total += self.sample(rng);
        }
        total
    }
}

impl Distribution<f64> for ClampedNormal {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        let z: f64 = StandardNormal.sample(rng);
        (self.mean + self.std_dev * z).max(0.0)
    }
}

/// Everything one period produces.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeriodOutcome {
    /// Individuals actually sampled (floored user count).
    pub sampled: u64,
    pub mint: f64,
    pub burn: f64,
    /// Per-user burn mean after supply adaptation.
    pub burn_mean: f64,
    pub supply: f64,
    pub reward: f64,
    /// Burn in excess of available supply, dropped by the zero floor.
    pub deficit: f64,
}

/// Burn mean per user given the previous supply.
///
/// Rises with supply per user. The `+ 1` keeps an empty population finite.
pub fn adaptive_burn_mean(prev_supply: f64, users: f64, config: &SimulationConfig) -> f64 {
    config.burn_mean * (1.0 + config.burn_adaptation * prev_supply / (users + 1.0))
}

/// Reward coefficient from the period's burn/mint ratio.
///
/// A period with no minting leaves the base reward in place.
pub fn reward_coefficient(mint: f64, burn: f64, base_reward: f64) -> f64 {
    if mint > 0.0 {
        base_reward * (burn / mint)
    } else {
        base_reward
    }
}

/// Advances supply by one period for a single run.
#[derive(Debug, Clone, Copy)]
pub struct PeriodStepper<'a> {
    config: &'a SimulationConfig,
    mint: ClampedNormal,
}

impl<'a> PeriodStepper<'a> {
    pub fn new(config: &'a SimulationConfig) -> Self {
        Self {
            config,
            mint: ClampedNormal::new(config.mint_mean, config.mint_std),
        }
    }

    /// Draw mint then burn samples for `users` active users and settle the period.
    ///
    /// All mint draws precede all burn draws, so a seeded RNG replays the
    /// same sequence.
    pub fn step<R: Rng + ?Sized>(&self, rng: &mut R, prev_supply: f64, users: f64) -> PeriodOutcome {
        let sampled = sample_size(users);

        let mint = self.mint.sum_of(rng, sampled);

        let burn_mean = adaptive_burn_mean(prev_supply, users, self.config);
        let burn = ClampedNormal::new(burn_mean, self.config.burn_std).sum_of(rng, sampled);

        let unfloored = prev_supply + mint - burn;
        let supply = unfloored.max(0.0);
        let deficit = (-unfloored).max(0.0);

        PeriodOutcome {
            sampled,
            mint,
            burn,
            burn_mean,
            supply,
            reward: reward_coefficient(mint, burn, self.config.base_reward),
            deficit,
        }
    }
}
