//! Weighted confidence vote over every predictor, with weights shaped by
//! baseline importance, recent local accuracy and the annealing optimizer.

pub mod backtest;
pub(crate) mod optimizer;

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use taixiu_data::{Outcome, Round};

use crate::config::EngineConfig;
use crate::features;
use crate::models::logistic::LogisticModel;
use crate::models::{base_importance, guarded_predict, Predictor, PredictorOutput};

/// Weight clamp applied after all multipliers are combined.
const FINAL_WEIGHT_MIN: f64 = 0.05;
const FINAL_WEIGHT_MAX: f64 = 6.0;
/// Confidence of the everyone-abstained fallback answer.
const FALLBACK_CONF: f64 = 0.52;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "Low"),
            RiskLevel::Medium => write!(f, "Medium"),
            RiskLevel::High => write!(f, "High"),
        }
    }
}

/// One predictor's row in the final report.
#[derive(Debug, Clone, Serialize)]
pub struct PredictorBreakdown {
    pub name: String,
    pub prediction: Option<Outcome>,
    pub confidence: f64,
    pub weight: f64,
    pub vote_score: f64,
    pub rationale: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PatternCount {
    pub pattern: String,
    pub count: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct Diagnostics {
    pub entropy: f64,
    pub streak: usize,
    pub transition_probabilities: BTreeMap<String, f64>,
    pub top_patterns: Vec<PatternCount>,
    pub optimized_weights: BTreeMap<String, f64>,
    pub optimized_accuracy: f64,
}

/// The full answer for one prediction request.
#[derive(Debug, Clone, Serialize)]
pub struct PredictionReport {
    pub prediction: Outcome,
    pub confidence: f64,
    pub risk_level: RiskLevel,
    pub rationale: Vec<String>,
    pub diagnostics: Diagnostics,
    pub per_predictor: Vec<PredictorBreakdown>,
}

/// Combine every predictor's opinion on `history` into one calibrated
/// decision. `history` must be non-empty (the engine enforces it).
pub fn combine(
    config: &EngineConfig,
    predictors: &[Box<dyn Predictor>],
    logistic: &LogisticModel,
    history: &[Round],
) -> PredictionReport {
    let heuristics: Vec<PredictorOutput> =
        predictors.iter().map(|p| guarded_predict(p.as_ref(), history)).collect();
    let logistic_out = logistic.output(history, &heuristics);

    let names: Vec<&'static str> = predictors
        .iter()
        .map(|p| p.name())
        .chain(std::iter::once("Logistic"))
        .collect();
    let mut outputs = heuristics;
    outputs.push(logistic_out);
    let n = outputs.len();

    // Walk-forward caches for the performance and optimizer windows. Both
    // windows are suffixes of the same replay, computed once.
    let evaluable = history.len().saturating_sub(1);
    let perf_n = config.perf_lookback.min(evaluable);
    let opt_n = config.optimizer_lookback_max.min(evaluable);
    let cache = optimizer::precompute_rounds(predictors, logistic, history, perf_n.max(opt_n));
    let perf = optimizer::local_performance(&cache[cache.len() - perf_n..], n);
    let (opt_weights, opt_acc) =
        optimizer::optimize_weights(config, &cache[cache.len() - opt_n..], n);

    let mut score_tai = 0.0;
    let mut score_xiu = 0.0;
    let mut breakdown = Vec::with_capacity(n);
    for (i, out) in outputs.iter().enumerate() {
        let weight = (base_importance(names[i]) * perf[i] * opt_weights[i])
            .clamp(FINAL_WEIGHT_MIN, FINAL_WEIGHT_MAX);
        let vote = out.confidence * weight;
        match out.prediction {
            Some(Outcome::Tai) => score_tai += vote,
            Some(Outcome::Xiu) => score_xiu += vote,
            None => {}
        }
        breakdown.push(PredictorBreakdown {
            name: names[i].to_string(),
            prediction: out.prediction,
            confidence: out.confidence,
            weight,
            vote_score: if out.prediction.is_some() { vote } else { 0.0 },
            rationale: out.rationale.clone(),
        });
    }

    let total = score_tai + score_xiu;
    let (prediction, confidence, mut rationale) = if total > 0.0 {
        let prediction = if score_tai >= score_xiu { Outcome::Tai } else { Outcome::Xiu };
        let vote_share = score_tai.max(score_xiu) / total;
        let confidence =
            (0.6 + (vote_share - 0.5) * 0.75 + opt_acc * 0.35).min(config.confidence_cap);
        let agree = breakdown
            .iter()
            .filter(|b| b.prediction == Some(prediction))
            .count() as f64
            / breakdown.len() as f64;
        let rationale = vec![
            format!(
                "final vote: Tài={score_tai:.3}, Xỉu={score_xiu:.3} (agreement {:.0}%)",
                agree * 100.0
            ),
            format!("optimizer walk-forward accuracy {:.1}% on the recent window", opt_acc * 100.0),
        ];
        (prediction, confidence, rationale)
    } else {
        // Everyone abstained: answer anyway, at a labeled low confidence.
        let last = history[history.len() - 1].outcome;
        (last, FALLBACK_CONF, vec!["insufficient history; repeating the last outcome".into()])
    };

    for out in &outputs {
        rationale.extend(out.rationale.iter().cloned());
    }

    let diagnostics = diagnostics(history, &names, &opt_weights, opt_acc);
    let risk_level = risk_level(confidence, history);

    PredictionReport { prediction, confidence, risk_level, rationale, diagnostics, per_predictor: breakdown }
}

fn diagnostics(
    history: &[Round],
    names: &[&'static str],
    opt_weights: &[f64],
    opt_acc: f64,
) -> Diagnostics {
    let outcomes: Vec<Outcome> = history.iter().map(|r| r.outcome).collect();

    // All four cells are always present, zero-filled when never observed.
    let mut transitions: BTreeMap<String, u32> = ["T->T", "T->X", "X->T", "X->X"]
        .into_iter()
        .map(|k| (k.to_string(), 0))
        .collect();
    for pair in outcomes.windows(2) {
        let key = format!("{}->{}", pair[0].symbol(), pair[1].symbol());
        *transitions.entry(key).or_default() += 1;
    }
    let total: u32 = transitions.values().sum();
    let transition_probabilities = transitions
        .into_iter()
        .map(|(k, v)| (k, if total > 0 { v as f64 / total as f64 } else { 0.0 }))
        .collect();

    let mut shapes: HashMap<String, u32> = HashMap::new();
    for round in history {
        let mut dice = round.dice;
        dice.sort_unstable();
        let key = format!("{}-{}-{}", dice[0], dice[1], dice[2]);
        *shapes.entry(key).or_default() += 1;
    }
    let mut top_patterns: Vec<PatternCount> = shapes
        .into_iter()
        .map(|(pattern, count)| PatternCount { pattern, count })
        .collect();
    top_patterns.sort_by(|a, b| b.count.cmp(&a.count).then(a.pattern.cmp(&b.pattern)));
    top_patterns.truncate(6);

    Diagnostics {
        entropy: features::shannon_entropy(&outcomes, 30),
        streak: features::streak_of_end(&outcomes),
        transition_probabilities,
        top_patterns,
        optimized_weights: names
            .iter()
            .zip(opt_weights)
            .map(|(&name, &w)| (name.to_string(), w))
            .collect(),
        optimized_accuracy: opt_acc,
    }
}

/// Risk from residual uncertainty plus volatility markers: recent switch
/// rate, a long-streak penalty and outcome entropy.
pub fn risk_level(confidence: f64, history: &[Round]) -> RiskLevel {
    let outcomes: Vec<Outcome> = history.iter().map(|r| r.outcome).collect();
    let mut risk = 1.0 - confidence;
    risk += features::switch_rate(&outcomes, 12) * 0.12;
    if features::streak_of_end(&outcomes) >= 6 {
        risk += 0.06;
    }
    risk += (features::shannon_entropy(&outcomes, 30) / 4.0).min(0.12);

    if risk <= 0.20 {
        RiskLevel::Low
    } else if risk <= 0.35 {
        RiskLevel::Medium
    } else {
        RiskLevel::High
    }
}
