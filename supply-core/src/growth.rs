//! Logistic user adoption.

use crate::config::SimulationConfig;

/// Active users at period `t`: `K / (1 + exp(-r·(t - t0)))`.
///
/// Pure and total over all real `t`; non-decreasing in `t` whenever `r > 0`.
pub fn user_count(t: f64, config: &SimulationConfig) -> f64 {
    config.capacity / (1.0 + (-config.growth_rate * (t - config.inflection)).exp())
}

/// Number of individuals sampled in a period with `users` active users.
///
/// The real-valued user count is floored. Anything below one user (or a
/// non-finite count) samples nobody.
pub fn sample_size(users: f64) -> u64 {
    if users.is_finite() && users >= 1.0 {
        users.floor() as u64
    } else {
        0
    }
}
