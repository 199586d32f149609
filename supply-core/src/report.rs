//! Data handed to reporting collaborators.
//!
//! Rendering (plots, tables, files) lives outside this crate. A sink receives
//! borrowed statistics and trajectories once a batch has finished.

use serde::{Deserialize, Serialize};
use tsify_next::Tsify;

use crate::run::Trajectory;
use crate::stats::{AggregateStatistics, FinalSupplyHistogram, SupplySummary};

/// Stride and cap used by the reference sample-path figure.
pub const SAMPLE_PATH_STRIDE: usize = 5;
pub const SAMPLE_PATH_LIMIT: usize = 50;
pub const HISTOGRAM_BINS: usize = 50;

/// Consumer of finished batches.
pub trait ReportingSink {
    fn publish(&mut self, report: &SupplyReport<'_>);
}

impl<F: FnMut(&SupplyReport<'_>)> ReportingSink for F {
    fn publish(&mut self, report: &SupplyReport<'_>) {
        self(report)
    }
}

/// One row of the per-period table a renderer plots.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub struct ReportRow {
    pub period: usize,
    pub users: f64,
    pub supply_mean: f64,
    pub supply_std: f64,
    pub supply_p05: f64,
    pub supply_p95: f64,
    pub reward_mean: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct SupplyReport<'a> {
    pub statistics: &'a AggregateStatistics,
    pub trajectories: &'a [Trajectory],
}

impl<'a> SupplyReport<'a> {
    pub fn new(statistics: &'a AggregateStatistics, trajectories: &'a [Trajectory]) -> Self {
        Self {
            statistics,
            trajectories,
        }
    }

    pub fn summary(&self) -> Option<SupplySummary> {
        self.statistics.final_summary()
    }

    pub fn rows(&self) -> impl Iterator<Item = ReportRow> + 'a {
        let s = self.statistics;
        (0..s.periods()).map(move |t| ReportRow {
            period: t,
            users: s.users[t],
            supply_mean: s.supply_mean[t],
            supply_std: s.supply_std[t],
            supply_p05: s.supply_p05[t],
            supply_p95: s.supply_p95[t],
            reward_mean: s.reward_mean[t],
        })
    }

    /// Every `stride`-th trajectory among the first `limit`.
    pub fn sample_paths(&self, stride: usize, limit: usize) -> impl Iterator<Item = &'a Trajectory> + 'a {
        sample_paths(self.trajectories, stride, limit)
    }
}

/// Owned, serializable copy of a report for the browser front end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub struct AggregateSnapshot {
    pub statistics: AggregateStatistics,
    pub summary: Option<SupplySummary>,
    /// Supply series of the sampled trajectories.
    pub sample_paths: Vec<Vec<f64>>,
    pub histogram: Option<FinalSupplyHistogram>,
}

impl AggregateSnapshot {
    pub fn from_report(report: &SupplyReport<'_>) -> Self {
        Self {
            statistics: report.statistics.clone(),
            summary: report.summary(),
            sample_paths: report
                .sample_paths(SAMPLE_PATH_STRIDE, SAMPLE_PATH_LIMIT)
                .map(|t| t.supplies().collect())
                .collect(),
            histogram: FinalSupplyHistogram::from_trajectories(report.trajectories, HISTOGRAM_BINS),
        }
    }
}

/// Every `stride`-th trajectory among the first `limit`. A zero stride is
/// treated as one.
pub fn sample_paths(
    trajectories: &[Trajectory],
    stride: usize,
    limit: usize,
) -> impl Iterator<Item = &Trajectory> {
    trajectories.iter().take(limit).step_by(stride.max(1))
}
