pub mod autoreg;
pub mod conditional;
pub mod logistic;
pub mod markov;
pub mod pattern;
pub mod rules;
pub mod streak;
#[cfg(test)]
pub mod testkit;

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};

use taixiu_data::{Outcome, Round};

use crate::config::EngineConfig;

/// One predictor's opinion about the next round.
///
/// `prediction: None` with confidence 0.5 means "insufficient evidence" and
/// contributes no vote to the ensemble.
#[derive(Debug, Clone)]
pub struct PredictorOutput {
    pub prediction: Option<Outcome>,
    /// In [0.5, 1.0); 0.5 only together with `prediction: None`.
    pub confidence: f64,
    pub rationale: Vec<String>,
    pub meta: HashMap<String, f64>,
}

impl PredictorOutput {
    pub fn neutral(reason: impl Into<String>) -> Self {
        Self {
            prediction: None,
            confidence: 0.5,
            rationale: vec![reason.into()],
            meta: HashMap::new(),
        }
    }

    pub fn decided(prediction: Outcome, confidence: f64, reason: impl Into<String>) -> Self {
        Self {
            prediction: Some(prediction),
            confidence,
            rationale: vec![reason.into()],
            meta: HashMap::new(),
        }
    }

    /// This output re-expressed as a probability of Tài, for the logistic
    /// learner's feature vector.
    pub fn p_tai(&self) -> f64 {
        match self.prediction {
            Some(Outcome::Tai) => self.confidence,
            Some(Outcome::Xiu) => 1.0 - self.confidence,
            None => 0.5,
        }
    }
}

/// A stateless-per-call next-round estimator. `history` is the already
/// observed prefix in ascending order; implementations never see the future.
pub trait Predictor: Send + Sync {
    fn name(&self) -> &'static str;
    fn predict(&self, history: &[Round]) -> PredictorOutput;
}

/// Invoke one predictor, converting a panic into a logged neutral opinion.
/// Every walk the engine takes over the registry (live combination, replay
/// caches, logistic warm-fit) goes through here, so one faulty predictor can
/// never abort a request.
pub(crate) fn guarded_predict(predictor: &dyn Predictor, history: &[Round]) -> PredictorOutput {
    match panic::catch_unwind(AssertUnwindSafe(|| predictor.predict(history))) {
        Ok(out) => out,
        Err(_) => {
            log::warn!("predictor {} panicked; treating as no evidence", predictor.name());
            PredictorOutput::neutral(format!("{}: internal fault", predictor.name()))
        }
    }
}

/// The heuristic predictor registry, in vote order. The stateful logistic
/// learner is owned by the engine and appended at combination time.
pub fn heuristic_predictors(config: &EngineConfig) -> Vec<Box<dyn Predictor>> {
    vec![
        Box::new(rules::RuleScorer::new()),
        Box::new(markov::MarkovChain::new(config.markov_window)),
        Box::new(pattern::PatternMiner::new(config.pattern_window)),
        Box::new(streak::BreakStreak::new()),
        Box::new(autoreg::TotalAr::new()),
        Box::new(conditional::dice_shape_model()),
        Box::new(conditional::parity_model()),
        Box::new(conditional::sum_bucket_model()),
    ]
}

/// Baseline importance multiplier per predictor, keyed by name so the table
/// cannot drift out of sync with the registry order.
pub fn base_importance(name: &str) -> f64 {
    match name {
        "Rules" => 1.2,
        "Markov" => 1.0,
        "PatternMining" => 1.1,
        "BreakStreak" => 0.95,
        "TotalAr" => 0.9,
        "DiceShape" => 1.0,
        "Parity" => 0.95,
        "SumBucket" => 0.95,
        "Logistic" => 1.05,
        _ => 1.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use testkit::alternating_rounds;

    #[test]
    fn test_registry_names_are_unique() {
        let predictors = heuristic_predictors(&EngineConfig::default());
        let mut names: Vec<_> = predictors.iter().map(|p| p.name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), predictors.len());
    }

    #[test]
    fn test_all_predictors_respect_confidence_bounds() {
        let predictors = heuristic_predictors(&EngineConfig::default());
        for len in [0, 1, 2, 5, 20, 60] {
            let hist = alternating_rounds(len);
            for p in &predictors {
                let out = p.predict(&hist);
                assert!(
                    out.confidence >= 0.5 && out.confidence < 1.0,
                    "{} on len {len}: confidence {}",
                    p.name(),
                    out.confidence
                );
                if out.prediction.is_none() {
                    assert_eq!(out.confidence, 0.5, "{} abstained with bias", p.name());
                }
            }
        }
    }

    #[test]
    fn test_p_tai() {
        let out = PredictorOutput::decided(Outcome::Tai, 0.8, "x");
        assert!((out.p_tai() - 0.8).abs() < 1e-12);
        let out = PredictorOutput::decided(Outcome::Xiu, 0.8, "x");
        assert!((out.p_tai() - 0.2).abs() < 1e-12);
        assert_eq!(PredictorOutput::neutral("x").p_tai(), 0.5);
    }

    #[test]
    fn test_base_importance_covers_registry() {
        for p in heuristic_predictors(&EngineConfig::default()) {
            assert!(base_importance(p.name()) > 0.0);
        }
    }
}
