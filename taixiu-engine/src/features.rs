//! Scalar features derived from a history prefix.
//!
//! Every window function truncates silently to the available length and
//! returns a defined neutral value on an empty window, never NaN and never
//! a panic.

use taixiu_data::{Outcome, Round};

pub const BASE_FEATURE_NAMES: &[&str] = &[
    "tai_ratio_10",
    "tai_ratio_20",
    "mean_total_5",
    "mean_total_20",
    "streak_len",
    "switch_rate_12",
    "entropy_30",
    "autocorr1_30",
    "autocorr2_30",
    "even_ratio_20",
    "dice_mean_5",
];

/// Named feature vector; `values` is parallel to [`BASE_FEATURE_NAMES`].
#[derive(Debug, Clone)]
pub struct FeatureVector {
    pub values: Vec<f64>,
}

pub fn extract(history: &[Round]) -> FeatureVector {
    let outcomes: Vec<Outcome> = history.iter().map(|r| r.outcome).collect();
    let totals: Vec<f64> = history.iter().map(|r| r.total as f64).collect();

    let values = vec![
        tai_ratio(&outcomes, 10),
        tai_ratio(&outcomes, 20),
        mean_total(&totals, 5),
        mean_total(&totals, 20),
        streak_of_end(&outcomes) as f64,
        switch_rate(&outcomes, 12),
        shannon_entropy(&outcomes, 30),
        autocorrelation(last_n(&totals, 30), 1),
        autocorrelation(last_n(&totals, 30), 2),
        even_ratio(history, 20),
        dice_mean(history, 5),
    ];
    debug_assert_eq!(values.len(), BASE_FEATURE_NAMES.len());
    FeatureVector { values }
}

fn last_n<T>(slice: &[T], n: usize) -> &[T] {
    &slice[slice.len().saturating_sub(n)..]
}

/// Fraction of Tài over the trailing window; 0.5 on an empty window.
pub fn tai_ratio(outcomes: &[Outcome], window: usize) -> f64 {
    let w = last_n(outcomes, window);
    if w.is_empty() {
        return 0.5;
    }
    w.iter().filter(|&&o| o == Outcome::Tai).count() as f64 / w.len() as f64
}

/// Mean total over the trailing window; the midpoint 10.5 on an empty one.
pub fn mean_total(totals: &[f64], window: usize) -> f64 {
    let w = last_n(totals, window);
    if w.is_empty() {
        return 10.5;
    }
    w.iter().sum::<f64>() / w.len() as f64
}

/// Length of the trailing same-outcome run (1 when the last two differ).
pub fn streak_of_end(outcomes: &[Outcome]) -> usize {
    let Some(&last) = outcomes.last() else {
        return 0;
    };
    outcomes.iter().rev().take_while(|&&o| o == last).count()
}

/// Fraction of adjacent pairs that differ in the trailing window.
/// Fewer than two rounds ⇒ 0.5 (no evidence either way).
pub fn switch_rate(outcomes: &[Outcome], window: usize) -> f64 {
    let w = last_n(outcomes, window);
    if w.len() < 2 {
        return 0.5;
    }
    let switches = w.windows(2).filter(|p| p[0] != p[1]).count();
    switches as f64 / (w.len() - 1) as f64
}

/// Shannon entropy (base 2) of the outcome distribution over the trailing
/// window. 0 on an empty or constant window, 1 for a balanced one.
pub fn shannon_entropy(outcomes: &[Outcome], window: usize) -> f64 {
    let w = last_n(outcomes, window);
    if w.is_empty() {
        return 0.0;
    }
    let n = w.len() as f64;
    let tai = w.iter().filter(|&&o| o == Outcome::Tai).count() as f64;
    let mut ent = 0.0;
    for count in [tai, n - tai] {
        if count > 0.0 {
            let p = count / n;
            ent -= p * p.log2();
        }
    }
    ent
}

/// Lag-k autocorrelation of a scalar series; 0 for short or constant series.
pub fn autocorrelation(series: &[f64], lag: usize) -> f64 {
    if series.len() <= lag + 1 {
        return 0.0;
    }
    let n = series.len();
    let mean = series.iter().sum::<f64>() / n as f64;
    let denom: f64 = series.iter().map(|x| (x - mean).powi(2)).sum();
    if denom <= f64::EPSILON {
        return 0.0;
    }
    let num: f64 = (0..n - lag)
        .map(|i| (series[i] - mean) * (series[i + lag] - mean))
        .sum();
    num / denom
}

/// Fraction of even totals over the trailing window; 0.5 when empty.
pub fn even_ratio(history: &[Round], window: usize) -> f64 {
    let w = last_n(history, window);
    if w.is_empty() {
        return 0.5;
    }
    w.iter().filter(|r| r.total % 2 == 0).count() as f64 / w.len() as f64
}

/// Mean die face over the trailing window; the face midpoint 3.5 when empty.
pub fn dice_mean(history: &[Round], window: usize) -> f64 {
    let w = last_n(history, window);
    if w.is_empty() {
        return 3.5;
    }
    let sum: f64 = w.iter().flat_map(|r| r.dice.iter()).map(|&d| d as f64).sum();
    sum / (w.len() * 3) as f64
}
