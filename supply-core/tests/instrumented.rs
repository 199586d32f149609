//! Analyses over captured tracing events.
//!
//! Capture is thread-local, so every batch here runs sequentially on the
//! test thread.
#![cfg(feature = "instrument")]

use polars::prelude::*;

use supply_core::instrument::{self, EventLog};
use supply_core::{RunHooks, RunPlan, SimulationConfig, aggregate_with, run};

fn floored_config() -> SimulationConfig {
    SimulationConfig {
        horizon: 30,
        capacity: 400.0,
        growth_rate: 0.3,
        inflection: 6.0,
        burn_mean: 12.0,
        burn_std: 6.0,
        burn_adaptation: 0.5,
        initial_supply: 2_000.0,
        ..Default::default()
    }
}

fn capture_run(cfg: &SimulationConfig, seed: u64) -> (supply_core::Trajectory, EventLog) {
    instrument::capture(|| run(cfg, seed).unwrap())
}

#[test]
fn period_table_mirrors_trajectory() {
    let cfg = floored_config();
    let (traj, log) = capture_run(&cfg, 17);

    let table = log.table("period").expect("period events recorded");
    assert_eq!(table.row_count, cfg.horizon as usize);

    let supply = table.f64_column("supply").unwrap();
    let expected: Vec<f64> = traj.supplies().collect();
    assert_eq!(supply, &expected[..]);

    let periods = table.u64_column("period").unwrap();
    assert!(periods.iter().enumerate().all(|(i, &p)| p == i as u64));
    assert!(table.u64_column("seed").unwrap().iter().all(|&s| s == 17));
}

#[test]
fn floor_events_match_deficit_rows() {
    let cfg = floored_config();
    let (traj, log) = capture_run(&cfg, 4);

    let df = log.table("period").unwrap().to_dataframe().unwrap();
    assert_eq!(df.height(), cfg.horizon as usize);

    let floored = df
        .lazy()
        .filter(col("deficit").gt(lit(0.0)))
        .collect()
        .unwrap();
    assert_eq!(floored.height(), traj.floor_events());

    // Floored periods always end at zero supply
    let supply = floored.column("supply").unwrap().f64().unwrap();
    assert!(supply.into_no_null_iter().all(|s| s == 0.0));
}

#[test]
fn burn_mean_tracks_previous_supply() {
    let cfg = floored_config();
    let (traj, log) = capture_run(&cfg, 9);
    let table = log.table("period").unwrap();
    let burn_mean = table.f64_column("burn_mean").unwrap();
    let users = table.f64_column("users").unwrap();

    for t in 1..traj.len() {
        let prev = traj.periods()[t - 1].supply;
        let expected = cfg.burn_mean * (1.0 + cfg.burn_adaptation * prev / (users[t] + 1.0));
        assert_eq!(burn_mean[t], expected, "period {}", t);
    }
}

#[test]
fn sequential_batch_records_one_row_per_run() {
    let cfg = SimulationConfig {
        horizon: 8,
        capacity: 100.0,
        ..Default::default()
    };
    let plan = RunPlan::new(6).with_base_seed(40).sequential();
    let (result, log) =
        instrument::capture(|| aggregate_with(&cfg, &plan, &RunHooks::new()).unwrap());

    let runs = log.table("run").unwrap();
    assert_eq!(runs.row_count, 6);
    assert_eq!(runs.u64_column("seed").unwrap(), &[40, 41, 42, 43, 44, 45][..]);

    let finals: Vec<f64> = result
        .trajectories
        .iter()
        .map(|t| t.last().unwrap().supply)
        .collect();
    assert_eq!(runs.f64_column("final_supply").unwrap(), &finals[..]);

    assert_eq!(log.table("period").unwrap().row_count, 6 * 8);
    // Progress is a debug event and stays out of the tables
    assert!(log.table("progress").is_none());
}
