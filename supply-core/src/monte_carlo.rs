//! Batches of independent runs folded into [`AggregateStatistics`].
//!
//! Run `i` of a plan is seeded with `base_seed + i` and owns its random
//! source, so any run can be replayed alone and the batch can execute on a
//! rayon pool without sharing RNG state.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use rayon::prelude::*;
use thiserror::Error;

use crate::config::{ConfigError, ExperimentConfig, SimulationConfig};
use crate::report::{ReportingSink, SupplyReport};
use crate::run::{RunSimulator, Trajectory};
use crate::stats::{AggregateStatistics, FinalSupplyHistogram};

#[derive(Debug, Error)]
pub enum SimError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("batch cancelled after {completed} of {total} runs")]
    Cancelled { completed: usize, total: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionMode {
    /// Runs spread across the rayon global pool.
    #[default]
    Parallel,
    /// Runs on the calling thread in index order.
    Sequential,
}

/// How many runs, seeded from where, executed how.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunPlan {
    pub runs: u32,
    pub base_seed: u64,
    pub mode: ExecutionMode,
}

impl RunPlan {
    pub fn new(runs: u32) -> Self {
        Self {
            runs,
            base_seed: 0,
            mode: ExecutionMode::default(),
        }
    }

    pub fn with_base_seed(mut self, base_seed: u64) -> Self {
        self.base_seed = base_seed;
        self
    }

    pub fn sequential(mut self) -> Self {
        self.mode = ExecutionMode::Sequential;
        self
    }

    pub fn seed_for(&self, run: u32) -> u64 {
        self.base_seed.wrapping_add(run as u64)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.runs == 0 {
            return Err(ConfigError::NonPositiveRunCount);
        }
        Ok(())
    }
}

impl From<&ExperimentConfig> for RunPlan {
    fn from(exp: &ExperimentConfig) -> Self {
        RunPlan::new(exp.runs).with_base_seed(exp.base_seed)
    }
}

/// Shared cancellation switch, checked before each run starts.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunProgress {
    pub completed: usize,
    pub total: usize,
    pub seed: u64,
}

type ProgressFn<'a> = Box<dyn Fn(RunProgress) + Send + Sync + 'a>;

/// Optional observers attached to a batch.
#[derive(Default)]
pub struct RunHooks<'a> {
    cancel: Option<CancelFlag>,
    progress: Option<ProgressFn<'a>>,
}

impl<'a> RunHooks<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cancel(mut self, flag: CancelFlag) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Called after every completed run. Under parallel execution calls
    /// arrive from worker threads in completion order.
    pub fn with_progress(mut self, f: impl Fn(RunProgress) + Send + Sync + 'a) -> Self {
        self.progress = Some(Box::new(f));
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelFlag::is_cancelled)
    }

    fn report(&self, progress: RunProgress) {
        #[cfg(feature = "instrument")]
        tracing::debug!(
            target: "progress",
            completed = progress.completed as u64,
            total = progress.total as u64,
            seed = progress.seed,
        );

        if let Some(f) = &self.progress {
            f(progress);
        }
    }
}

/// All trajectories of a batch, in run-index order, plus their statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct MonteCarloResult {
    pub trajectories: Vec<Trajectory>,
    pub statistics: AggregateStatistics,
}

impl MonteCarloResult {
    pub fn from_trajectories(trajectories: Vec<Trajectory>) -> Self {
        let statistics = AggregateStatistics::from_trajectories(&trajectories);
        Self {
            trajectories,
            statistics,
        }
    }

    pub fn final_histogram(&self, bins: usize) -> Option<FinalSupplyHistogram> {
        FinalSupplyHistogram::from_trajectories(&self.trajectories, bins)
    }

    pub fn report(&self) -> SupplyReport<'_> {
        SupplyReport::new(&self.statistics, &self.trajectories)
    }

    /// Hand the finished batch to a reporting collaborator.
    pub fn publish_to<S: ReportingSink + ?Sized>(&self, sink: &mut S) {
        sink.publish(&self.report());
    }
}

/// Run `run_count` parallel runs seeded `0..run_count` and fold them.
pub fn aggregate(config: &SimulationConfig, run_count: u32) -> Result<MonteCarloResult, SimError> {
    aggregate_with(config, &RunPlan::new(run_count), &RunHooks::new())
}

/// Run a full experiment as configured.
pub fn run_experiment(exp: &ExperimentConfig) -> Result<MonteCarloResult, SimError> {
    aggregate_with(&exp.simulation, &RunPlan::from(exp), &RunHooks::new())
}

/// Execute `plan` against `config`.
///
/// Both the plan and the config are validated before any run starts. A
/// cancelled batch returns [`SimError::Cancelled`] and discards partial work.
pub fn aggregate_with(
    config: &SimulationConfig,
    plan: &RunPlan,
    hooks: &RunHooks<'_>,
) -> Result<MonteCarloResult, SimError> {
    plan.validate()?;
    let sim = RunSimulator::new(config)?;

    let total = plan.runs as usize;
    let completed = AtomicUsize::new(0);

    let run_one = |i: u32| -> Option<Trajectory> {
        if hooks.is_cancelled() {
            return None;
        }
        let seed = plan.seed_for(i);
        let trajectory = sim.run(seed);
        let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
        hooks.report(RunProgress {
            completed: done,
            total,
            seed,
        });
        Some(trajectory)
    };

    let trajectories: Option<Vec<Trajectory>> = match plan.mode {
        ExecutionMode::Parallel => (0..plan.runs).into_par_iter().map(&run_one).collect(),
        ExecutionMode::Sequential => (0..plan.runs).map(&run_one).collect(),
    };

    match trajectories {
        Some(trajectories) => Ok(MonteCarloResult::from_trajectories(trajectories)),
        None => Err(SimError::Cancelled {
            completed: completed.load(Ordering::Relaxed),
            total,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn small_config() -> SimulationConfig {
        SimulationConfig {
            horizon: 18,
            capacity: 300.0,
            growth_rate: 0.4,
            inflection: 6.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_zero_runs_rejected_before_work() {
        let calls = AtomicUsize::new(0);
        let hooks = RunHooks::new().with_progress(|_| {
            calls.fetch_add(1, Ordering::Relaxed);
        });
        let err = aggregate_with(&small_config(), &RunPlan::new(0), &hooks).unwrap_err();
        assert!(matches!(err, SimError::Config(ConfigError::NonPositiveRunCount)));
        assert_eq!(calls.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let cfg = small_config();
        let par = aggregate_with(&cfg, &RunPlan::new(12), &RunHooks::new()).unwrap();
        let seq = aggregate_with(&cfg, &RunPlan::new(12).sequential(), &RunHooks::new()).unwrap();
        assert_eq!(par, seq);
        assert_eq!(par.statistics.runs, 12);
        assert_eq!(par.statistics.periods(), 18);
    }

    #[test]
    fn test_each_run_replays_alone() {
        let cfg = small_config();
        let plan = RunPlan::new(5).with_base_seed(100);
        let batch = aggregate_with(&cfg, &plan, &RunHooks::new()).unwrap();

        for (i, traj) in batch.trajectories.iter().enumerate() {
            assert_eq!(traj.seed(), 100 + i as u64);
            let replay = crate::run::run(&cfg, traj.seed()).unwrap();
            assert_eq!(&replay, traj);
        }
    }

    #[test]
    fn test_progress_reports_every_run() {
        let seen = Mutex::new(Vec::new());
        let hooks = RunHooks::new().with_progress(|p: RunProgress| {
            seen.lock().unwrap().push(p.completed);
        });
        aggregate_with(&small_config(), &RunPlan::new(6).sequential(), &hooks).unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_cancel_stops_between_runs() {
        let flag = CancelFlag::new();
        let trigger = flag.clone();
        let hooks = RunHooks::new()
            .with_cancel(flag)
            .with_progress(move |p: RunProgress| {
                if p.completed == 3 {
                    trigger.cancel();
                }
            });

        let err = aggregate_with(&small_config(), &RunPlan::new(10).sequential(), &hooks)
            .unwrap_err();
        match err {
            SimError::Cancelled { completed, total } => {
                assert_eq!(completed, 3);
                assert_eq!(total, 10);
            }
            other => panic!("expected cancellation, got {:?}", other),
        }
    }

    #[test]
    fn test_histogram_counts_every_run() {
        let result = aggregate(&small_config(), 15).unwrap();
        let hist = result.final_histogram(4).unwrap();
        assert_eq!(hist.counts.iter().sum::<u32>(), 15);
        assert!(hist.min <= hist.max);
        assert!(result.final_histogram(0).is_none());
    }

    #[test]
    fn test_experiment_config_drives_plan() {
        let exp = ExperimentConfig {
            simulation: small_config(),
            runs: 4,
            base_seed: 9,
        };
        let result = run_experiment(&exp).unwrap();
        let seeds: Vec<u64> = result.trajectories.iter().map(Trajectory::seed).collect();
        assert_eq!(seeds, vec![9, 10, 11, 12]);
    }
}
