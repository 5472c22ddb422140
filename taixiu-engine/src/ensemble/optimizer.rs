//! Per-predictor weight search over a recent walk-forward window.
//!
//! Predictor outputs never depend on the weights, so the window's outputs are
//! computed once up front and each search iteration is just a weighted
//! re-vote over the cached opinions.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use taixiu_data::{Outcome, Round};

use crate::config::EngineConfig;
use crate::models::logistic::LogisticModel;
use crate::models::{guarded_predict, Predictor, PredictorOutput};

const WEIGHT_MIN: f64 = 0.2;
const WEIGHT_MAX: f64 = 3.5;
/// Below this many evaluable rounds the search is skipped entirely.
const MIN_EVALUABLE: usize = 10;
/// Walk-forward windows this small get neutral performance multipliers.
const MIN_PERF_SAMPLES: usize = 8;

/// Cached opinions of every predictor (heuristics then logistic) for one
/// replayed round, with the realized next outcome.
pub(crate) struct RoundOutputs {
    pub votes: Vec<(Option<Outcome>, f64)>,
    pub actual: Outcome,
}

/// Replay the trailing `window` rounds, invoking every predictor on each
/// prefix. A panicking predictor is neutralized for that round only.
pub(crate) fn precompute_rounds(
    predictors: &[Box<dyn Predictor>],
    logistic: &LogisticModel,
    history: &[Round],
    window: usize,
) -> Vec<RoundOutputs> {
    let n = window.min(history.len().saturating_sub(1));
    let start = history.len() - 1 - n;
    let mut rounds = Vec::with_capacity(n);
    for i in start..history.len() - 1 {
        let prefix = &history[..=i];
        let heuristics: Vec<PredictorOutput> = predictors
            .iter()
            .map(|p| guarded_predict(p.as_ref(), prefix))
            .collect();
        let logistic_out = logistic.output(prefix, &heuristics);
        let votes = heuristics
            .iter()
            .chain(std::iter::once(&logistic_out))
            .map(|o| (o.prediction, o.confidence))
            .collect();
        rounds.push(RoundOutputs { votes, actual: history[i + 1].outcome });
    }
    rounds
}

/// Walk-forward accuracy of a weighted confidence vote over cached rounds.
pub(crate) fn evaluate_weights(rounds: &[RoundOutputs], weights: &[f64]) -> f64 {
    if rounds.len() <= MIN_EVALUABLE {
        return 0.5;
    }
    let mut correct = 0usize;
    for round in rounds {
        let mut score_tai = 0.0;
        let mut score_xiu = 0.0;
        for (vote, &w) in round.votes.iter().zip(weights) {
            match vote.0 {
                Some(Outcome::Tai) => score_tai += vote.1 * w,
                Some(Outcome::Xiu) => score_xiu += vote.1 * w,
                None => {}
            }
        }
        let decided = if score_tai >= score_xiu { Outcome::Tai } else { Outcome::Xiu };
        if decided == round.actual {
            correct += 1;
        }
    }
    correct as f64 / rounds.len() as f64
}

/// Per-predictor local accuracy over the cached window, mapped to a
/// multiplier in 0.75..=1.35. Windows of ≤8 rounds give everyone 1.0.
pub(crate) fn local_performance(rounds: &[RoundOutputs], n_predictors: usize) -> Vec<f64> {
    if rounds.len() <= MIN_PERF_SAMPLES {
        return vec![1.0; n_predictors];
    }
    let mut correct = vec![0usize; n_predictors];
    for round in rounds {
        for (idx, vote) in round.votes.iter().enumerate() {
            if vote.0 == Some(round.actual) {
                correct[idx] += 1;
            }
        }
    }
    correct
        .iter()
        .map(|&c| {
            let acc = c as f64 / rounds.len() as f64;
            0.75 + ((acc - 0.5) * 1.2).clamp(0.0, 0.6)
        })
        .collect()
}

/// Hill climb with mild simulated annealing: perturb one weight per
/// iteration by ±40%, accept improvements, and occasionally accept downhill
/// moves with probability shrinking on a 1/(1 + it/iters) temperature
/// schedule. Returns the best weights and accuracy ever seen, so the result
/// is never worse than the all-ones baseline.
pub(crate) fn optimize_weights(
    config: &EngineConfig,
    rounds: &[RoundOutputs],
    n_predictors: usize,
) -> (Vec<f64>, f64) {
    let mut weights = vec![1.0; n_predictors];
    if rounds.len() <= MIN_EVALUABLE {
        return (weights, 0.5);
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut best_weights = weights.clone();
    let mut best_acc = evaluate_weights(rounds, &weights);
    let iters = config.optimizer_iters;

    for it in 0..iters {
        let j = rng.random_range(0..n_predictors);
        let old = weights[j];
        let factor = 1.0 + (rng.random::<f64>() - 0.5) * 0.8;
        weights[j] = (weights[j] * factor).clamp(WEIGHT_MIN, WEIGHT_MAX);
        let acc = evaluate_weights(rounds, &weights);

        let accept = if acc >= best_acc {
            true
        } else {
            let temp = config.optimizer_t0 * (1.0 + it as f64 / iters as f64);
            rng.random::<f64>() < ((acc - best_acc) / temp).exp()
        };
        if accept {
            if acc >= best_acc {
                best_acc = acc;
                best_weights = weights.clone();
            }
        } else {
            weights[j] = old;
        }
    }

    log::debug!("optimizer best accuracy {best_acc:.3} over {} rounds", rounds.len());
    (best_weights, best_acc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::testkit::alternating_rounds;
    use crate::models::{heuristic_predictors, logistic::HEURISTIC_COUNT};

    fn cached(n: usize) -> (EngineConfig, Vec<RoundOutputs>) {
        let config = EngineConfig { optimizer_iters: 60, ..EngineConfig::default() };
        let predictors = heuristic_predictors(&config);
        let logistic = LogisticModel::new(&config);
        let hist = alternating_rounds(n);
        let rounds = precompute_rounds(&predictors, &logistic, &hist, n);
        (config, rounds)
    }

    #[test]
    fn test_tiny_window_returns_all_ones() {
        let (config, rounds) = cached(8);
        let (weights, acc) = optimize_weights(&config, &rounds, HEURISTIC_COUNT + 1);
        assert!(weights.iter().all(|&w| w == 1.0));
        assert_eq!(acc, 0.5);
    }

    #[test]
    fn test_optimized_accuracy_never_below_baseline() {
        let (config, rounds) = cached(60);
        let baseline = evaluate_weights(&rounds, &vec![1.0; HEURISTIC_COUNT + 1]);
        let (weights, acc) = optimize_weights(&config, &rounds, HEURISTIC_COUNT + 1);
        assert!(acc >= baseline);
        assert!(weights.iter().all(|&w| (WEIGHT_MIN..=WEIGHT_MAX).contains(&w)));
    }

    #[test]
    fn test_optimizer_is_deterministic() {
        let (config, rounds) = cached(50);
        let a = optimize_weights(&config, &rounds, HEURISTIC_COUNT + 1);
        let b = optimize_weights(&config, &rounds, HEURISTIC_COUNT + 1);
        assert_eq!(a.0, b.0);
        assert_eq!(a.1, b.1);
    }

    #[test]
    fn test_local_performance_bounds() {
        let (_, rounds) = cached(50);
        for mult in local_performance(&rounds, HEURISTIC_COUNT + 1) {
            assert!((0.75..=1.35).contains(&mult));
        }
        assert!(local_performance(&rounds[..5], 3).iter().all(|&m| m == 1.0));
    }

    #[test]
    fn test_precompute_respects_window() {
        let (_, rounds) = cached(30);
        assert_eq!(rounds.len(), 29);
        let config = EngineConfig::default();
        let predictors = heuristic_predictors(&config);
        let logistic = LogisticModel::new(&config);
        let hist = alternating_rounds(30);
        assert_eq!(precompute_rounds(&predictors, &logistic, &hist, 10).len(), 10);
    }
}
