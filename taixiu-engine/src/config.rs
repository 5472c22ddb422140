use serde::{Deserialize, Serialize};

/// All tunable knobs of the engine in one place.
///
/// The heuristic thresholds here were chosen empirically against backtests of
/// live feeds; they are configuration, not derived quantities.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Seed for the annealing optimizer and the logistic initialization.
    /// Fixed seed ⇒ fully reproducible predictions.
    pub seed: u64,

    /// Trailing window of outcomes fed to the Markov predictor.
    pub markov_window: usize,
    /// Trailing window mined for repeated outcome substrings.
    pub pattern_window: usize,

    /// Lookback for the per-predictor local-performance multiplier.
    pub perf_lookback: usize,
    /// Walk-forward window cap for the weight optimizer; shorter histories
    /// use whatever rounds they have.
    pub optimizer_lookback_max: usize,
    /// Annealing iteration budget.
    pub optimizer_iters: usize,
    /// Initial annealing temperature.
    pub optimizer_t0: f64,

    /// History length that triggers the one-time logistic warm-fit.
    pub warm_threshold: usize,
    /// First round index used by the warm-fit pass.
    pub warm_start: usize,
    /// Logistic gradient step size and L2 decay.
    pub learning_rate: f64,
    pub l2_lambda: f64,

    /// Kelly bankroll simulation parameters.
    pub payout_ratio: f64,
    pub max_stake_fraction: f64,
    pub min_stake: f64,
    pub initial_bankroll: f64,

    /// The ensemble never reports a confidence above this.
    pub confidence_cap: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            markov_window: 80,
            pattern_window: 40,
            perf_lookback: 60,
            optimizer_lookback_max: 120,
            optimizer_iters: 700,
            optimizer_t0: 0.08,
            warm_threshold: 120,
            warm_start: 50,
            learning_rate: 0.05,
            l2_lambda: 0.001,
            payout_ratio: 0.95,
            max_stake_fraction: 0.2,
            min_stake: 1.0,
            initial_bankroll: 100.0,
            confidence_cap: 0.995,
        }
    }
}
