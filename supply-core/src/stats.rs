//! Cross-run statistics.
//!
//! Every per-period reduction sorts its values first, so the result depends
//! only on the multiset of trajectories and never on the order they arrive in.

use serde::{Deserialize, Serialize};
use tsify_next::Tsify;

use crate::run::{PeriodRecord, Trajectory};

/// Arithmetic mean; 0 for an empty slice.
pub fn mean(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        return 0.0;
    }
    xs.iter().sum::<f64>() / xs.len() as f64
}

/// Population standard deviation (divides by `N`).
pub fn std_dev(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        return 0.0;
    }
    let mu = mean(xs);
    let var = xs.iter().map(|x| (x - mu).powi(2)).sum::<f64>() / xs.len() as f64;
    var.sqrt()
}

/// Percentile of an ascending slice, `p` in `[0, 1]`.
///
/// Linear interpolation between the order statistics bracketing rank
/// `p·(N−1)`. Empty input yields NaN.
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let p = p.clamp(0.0, 1.0);
    let idx = p * (sorted.len() - 1) as f64;
    let lo = idx.floor() as usize;
    let hi = idx.ceil() as usize;
    if lo == hi {
        return sorted[lo];
    }
    let w = idx - lo as f64;
    sorted[lo] * (1.0 - w) + sorted[hi] * w
}

/// Values of one field at period `t` across all runs, ascending.
fn sorted_column(
    trajectories: &[Trajectory],
    t: usize,
    field: impl Fn(&PeriodRecord) -> f64,
) -> Vec<f64> {
    let mut column: Vec<f64> = trajectories
        .iter()
        .map(|tr| field(&tr.periods()[t]))
        .collect();
    column.sort_by(f64::total_cmp);
    column
}

/// Headline figures for the last period.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub struct SupplySummary {
    pub period: usize,
    pub mean_supply: f64,
    pub std_supply: f64,
    pub p05_supply: f64,
    pub p95_supply: f64,
    pub mean_reward: f64,
}

/// Per-period statistics over a completed batch of runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub struct AggregateStatistics {
    pub runs: usize,
    pub supply_mean: Vec<f64>,
    pub supply_std: Vec<f64>,
    pub supply_p05: Vec<f64>,
    pub supply_p95: Vec<f64>,
    pub reward_mean: Vec<f64>,
    pub mint_mean: Vec<f64>,
    pub burn_mean: Vec<f64>,
    /// Active users per period. Deterministic, so identical across runs.
    pub users: Vec<f64>,
}

impl AggregateStatistics {
    /// Fold a batch of trajectories.
    ///
    /// Periods beyond the shortest trajectory are dropped; trajectories of
    /// one config always share a length.
    pub fn from_trajectories(trajectories: &[Trajectory]) -> Self {
        let runs = trajectories.len();
        let periods = trajectories.iter().map(Trajectory::len).min().unwrap_or(0);

        let mut stats = Self {
            runs,
            supply_mean: Vec::with_capacity(periods),
            supply_std: Vec::with_capacity(periods),
            supply_p05: Vec::with_capacity(periods),
            supply_p95: Vec::with_capacity(periods),
            reward_mean: Vec::with_capacity(periods),
            mint_mean: Vec::with_capacity(periods),
            burn_mean: Vec::with_capacity(periods),
            users: Vec::with_capacity(periods),
        };

        for t in 0..periods {
            let supply = sorted_column(trajectories, t, |p| p.supply);
            stats.supply_mean.push(mean(&supply));
            stats.supply_std.push(std_dev(&supply));
            stats.supply_p05.push(percentile(&supply, 0.05));
            stats.supply_p95.push(percentile(&supply, 0.95));

            stats.reward_mean.push(mean(&sorted_column(trajectories, t, |p| p.reward)));
            stats.mint_mean.push(mean(&sorted_column(trajectories, t, |p| p.mint)));
            stats.burn_mean.push(mean(&sorted_column(trajectories, t, |p| p.burn)));
            stats.users.push(trajectories[0].periods()[t].users);
        }

        stats
    }

    pub fn periods(&self) -> usize {
        self.supply_mean.len()
    }

    /// Figures for the final period, if any period was simulated.
    pub fn final_summary(&self) -> Option<SupplySummary> {
        let period = self.periods().checked_sub(1)?;
        Some(SupplySummary {
            period,
            mean_supply: self.supply_mean[period],
            std_supply: self.supply_std[period],
            p05_supply: self.supply_p05[period],
            p95_supply: self.supply_p95[period],
            mean_reward: self.reward_mean[period],
        })
    }

    /// Relative change of mean supply across the trailing `window` periods.
    ///
    /// Small values indicate supply has levelled off. `None` when the horizon
    /// is shorter than the window or the window starts at zero supply.
    pub fn tail_drift(&self, window: usize) -> Option<f64> {
        let n = self.periods();
        if window == 0 || window >= n {
            return None;
        }
        let start = self.supply_mean[n - 1 - window];
        let end = self.supply_mean[n - 1];
        if start <= 0.0 {
            return None;
        }
        Some((end - start).abs() / start)
    }
}

/// Equal-width histogram of final-period supply across runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub struct FinalSupplyHistogram {
    pub min: f64,
    pub max: f64,
    pub bin_width: f64,
    pub counts: Vec<u32>,
}

impl FinalSupplyHistogram {
    /// Bin the last supply value of every trajectory into `bins` buckets.
    ///
    /// The top edge is inclusive. With all values equal, everything lands in
    /// the first bin.
    pub fn from_trajectories(trajectories: &[Trajectory], bins: usize) -> Option<Self> {
        if bins == 0 {
            return None;
        }
        let finals: Vec<f64> = trajectories
            .iter()
            .filter_map(|t| t.last().map(|p| p.supply))
            .collect();
        let min = finals.iter().copied().reduce(f64::min)?;
        let max = finals.iter().copied().reduce(f64::max)?;

        let bin_width = (max - min) / bins as f64;
        let mut counts = vec![0u32; bins];
        for x in finals {
            let idx = if bin_width > 0.0 {
                (((x - min) / bin_width) as usize).min(bins - 1)
            } else {
                0
            };
            counts[idx] += 1;
        }

        Some(Self {
            min,
            max,
            bin_width,
            counts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_and_population_std() {
        let xs = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_eq!(mean(&xs), 5.0);
        assert_eq!(std_dev(&xs), 2.0);
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(std_dev(&[]), 0.0);
    }

    #[test]
    fn test_percentile_interpolates_linearly() {
        let xs = [10.0, 20.0, 30.0, 40.0, 50.0];
        assert_eq!(percentile(&xs, 0.0), 10.0);
        assert_eq!(percentile(&xs, 1.0), 50.0);
        assert_eq!(percentile(&xs, 0.5), 30.0);
        // rank 0.05 * 4 = 0.2 → 10 + 0.2 * 10
        assert!((percentile(&xs, 0.05) - 12.0).abs() < 1e-12);
        // rank 0.95 * 4 = 3.8 → 40 + 0.8 * 10
        assert!((percentile(&xs, 0.95) - 48.0).abs() < 1e-12);
        assert_eq!(percentile(&[7.0], 0.95), 7.0);
        assert!(percentile(&[], 0.5).is_nan());
    }
}
