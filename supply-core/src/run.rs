//! A single seeded run over the full horizon.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tsify_next::Tsify;

use crate::config::{ConfigError, SimulationConfig};
use crate::growth::user_count;
use crate::stepper::PeriodStepper;

/// State of one run at the end of one period.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub struct PeriodRecord {
    pub users: f64,
    pub mint: f64,
    pub burn: f64,
    pub supply: f64,
    pub reward: f64,
    /// Burn dropped by the zero floor on supply.
    pub deficit: f64,
}

/// One run's output, one record per period starting at period 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub struct Trajectory {
    seed: u64,
    periods: Vec<PeriodRecord>,
}

impl Trajectory {
    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn periods(&self) -> &[PeriodRecord] {
        &self.periods
    }

    pub fn len(&self) -> usize {
        self.periods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.periods.is_empty()
    }

    pub fn last(&self) -> Option<&PeriodRecord> {
        self.periods.last()
    }

    pub fn supplies(&self) -> impl Iterator<Item = f64> + '_ {
        self.periods.iter().map(|p| p.supply)
    }

    pub fn rewards(&self) -> impl Iterator<Item = f64> + '_ {
        self.periods.iter().map(|p| p.reward)
    }

    /// Periods whose burn exceeded the available supply.
    pub fn floor_events(&self) -> usize {
        self.periods.iter().filter(|p| p.deficit > 0.0).count()
    }
}

/// Drives a [`PeriodStepper`] across the horizon for a validated config.
#[derive(Debug, Clone, Copy)]
pub struct RunSimulator<'a> {
    config: &'a SimulationConfig,
    stepper: PeriodStepper<'a>,
}

impl<'a> RunSimulator<'a> {
    pub fn new(config: &'a SimulationConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            stepper: PeriodStepper::new(config),
        })
    }

    /// Same seed, same trajectory, bit for bit.
    pub fn run(&self, seed: u64) -> Trajectory {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let periods = self.run_with_rng(&mut rng, seed);
        Trajectory { seed, periods }
    }

    /// Step through every period with a caller-owned random source.
    ///
    /// `seed` only labels instrumentation events.
    pub fn run_with_rng<R: Rng + ?Sized>(&self, rng: &mut R, seed: u64) -> Vec<PeriodRecord> {
        let cfg = self.config;
        let horizon = cfg.horizon as usize;
        let mut periods = Vec::with_capacity(horizon);

        periods.push(PeriodRecord {
            users: user_count(0.0, cfg),
            mint: 0.0,
            burn: 0.0,
            supply: cfg.initial_supply,
            reward: cfg.base_reward,
            deficit: 0.0,
        });

        #[cfg(feature = "instrument")]
        tracing::info!(
            target: "period",
            seed = seed,
            period = 0u64,
            users = periods[0].users,
            sampled = 0u64,
            mint = 0.0,
            burn = 0.0,
            burn_mean = cfg.burn_mean,
            supply = cfg.initial_supply,
            reward = cfg.base_reward,
            deficit = 0.0,
        );

        let mut supply = cfg.initial_supply;
        for t in 1..horizon {
            let users = user_count(t as f64, cfg);
            let out = self.stepper.step(rng, supply, users);
            supply = out.supply;

            #[cfg(feature = "instrument")]
            tracing::info!(
                target: "period",
                seed = seed,
                period = t as u64,
                users = users,
                sampled = out.sampled,
                mint = out.mint,
                burn = out.burn,
                burn_mean = out.burn_mean,
                supply = out.supply,
                reward = out.reward,
                deficit = out.deficit,
            );

            periods.push(PeriodRecord {
                users,
                mint: out.mint,
                burn: out.burn,
                supply: out.supply,
                reward: out.reward,
                deficit: out.deficit,
            });
        }

        #[cfg(feature = "instrument")]
        tracing::info!(
            target: "run",
            seed = seed,
            final_supply = supply,
            final_reward = periods.last().map(|p| p.reward).unwrap_or(cfg.base_reward),
            floor_events = periods.iter().filter(|p| p.deficit > 0.0).count() as u64,
        );
        let _ = seed; // Suppress unused warnings without instrumentation

        periods
    }
}

/// Validate `config` and produce the trajectory for `seed`.
pub fn run(config: &SimulationConfig, seed: u64) -> Result<Trajectory, ConfigError> {
    Ok(RunSimulator::new(config)?.run(seed))
}
