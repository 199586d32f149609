use wasm_bindgen::prelude::*;

pub mod config;
pub mod growth;
pub mod monte_carlo;
pub mod report;
pub mod run;
pub mod stability;
pub mod stats;
pub mod stepper;

#[cfg(feature = "instrument")]
pub use instrument;

pub use config::{ConfigError, ExperimentConfig, SimulationConfig};
pub use growth::{sample_size, user_count};
pub use monte_carlo::{
    CancelFlag, ExecutionMode, MonteCarloResult, RunHooks, RunPlan, RunProgress, SimError,
    aggregate, aggregate_with, run_experiment,
};
pub use report::{AggregateSnapshot, ReportRow, ReportingSink, SupplyReport};
pub use run::{PeriodRecord, RunSimulator, Trajectory, run};
pub use stats::{AggregateStatistics, FinalSupplyHistogram, SupplySummary};
pub use stepper::{PeriodOutcome, PeriodStepper};

use serde::{Deserialize, Serialize};
use tsify_next::Tsify;

use stability::{ActionCost, ProfitCurve};

// ============================================================================
// WASM API - Supply experiment
// ============================================================================

/// Browser handle on a Monte Carlo experiment.
///
/// Runs execute sequentially on the calling thread; the browser has no rayon pool.
#[wasm_bindgen]
pub struct SupplyExperiment {
    config: ExperimentConfig,
}

impl Default for SupplyExperiment {
    fn default() -> Self {
        Self::new()
    }
}

#[wasm_bindgen]
impl SupplyExperiment {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        // Better panic messages in browser console
        console_error_panic_hook::set_once();

        Self {
            config: ExperimentConfig::default(),
        }
    }

    /// Build from a plain JS object; missing fields take their defaults.
    #[wasm_bindgen]
    pub fn with_config(config: JsValue) -> Result<SupplyExperiment, JsError> {
        console_error_panic_hook::set_once();

        let config: ExperimentConfig = serde_wasm_bindgen::from_value(config)?;
        config.validate()?;
        Ok(Self { config })
    }

    #[wasm_bindgen]
    pub fn get_config(&self) -> ExperimentConfig {
        self.config
    }

    /// Execute every run and return the aggregated snapshot.
    ///
    /// `progress`, if given, is called as `progress(completed, total)` after each run.
    #[wasm_bindgen]
    pub fn run(&self, progress: Option<js_sys::Function>) -> Result<AggregateSnapshot, JsError> {
        let plan = RunPlan::from(&self.config).sequential();
        plan.validate()?;
        let sim = RunSimulator::new(&self.config.simulation)?;

        let total = plan.runs;
        let mut trajectories = Vec::with_capacity(total as usize);
        for i in 0..total {
            trajectories.push(sim.run(plan.seed_for(i)));
            if let Some(f) = &progress {
                f.call2(&JsValue::NULL, &JsValue::from(i + 1), &JsValue::from(total))
                    .map_err(|e| JsError::new(&format!("progress callback failed: {:?}", e)))?;
            }
        }

        let result = MonteCarloResult::from_trajectories(trajectories);
        Ok(AggregateSnapshot::from_report(&result.report()))
    }

    /// Replay a single run by seed.
    #[wasm_bindgen]
    pub fn replay(&self, seed: u64) -> Result<Trajectory, JsError> {
        Ok(run::run(&self.config.simulation, seed)?)
    }

    /// Profit curves for the default reward levels and cost multipliers.
    ///
    /// `cost` may be `undefined` to use the default action cost.
    #[wasm_bindgen]
    pub fn stability_analysis(cost: JsValue) -> Result<StabilitySnapshot, JsError> {
        let cost: ActionCost = if cost.is_undefined() || cost.is_null() {
            ActionCost::default()
        } else {
            serde_wasm_bindgen::from_value(cost)?
        };
        Ok(StabilitySnapshot::compute(cost)?)
    }
}

/// Sybil-resistance curves for rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub struct StabilitySnapshot {
    pub cost: ActionCost,
    pub prices: Vec<f64>,
    /// One curve per reward level at the base cost.
    pub reward_curves: Vec<ProfitCurve>,
    /// One curve per cost multiplier at the base reward.
    pub cost_curves: Vec<ProfitCurve>,
}

impl StabilitySnapshot {
    pub fn compute(cost: ActionCost) -> Result<Self, stability::StabilityError> {
        let prices = stability::price_sweep(
            stability::PRICE_MIN,
            stability::PRICE_MAX,
            stability::PRICE_STEPS,
        )?;
        let total = cost.total();
        let reward_curves = stability::sensitivity_sweep(
            &[
                stability::REWARD_MIN,
                stability::REWARD_BASE,
                stability::REWARD_MAX,
            ],
            total,
            &prices,
        );
        let cost_curves = stability::cost_sensitivity(
            stability::REWARD_BASE,
            total,
            &stability::COST_MULTIPLIERS,
            &prices,
        );
        Ok(Self {
            cost,
            prices,
            reward_curves,
            cost_curves,
        })
    }
}
