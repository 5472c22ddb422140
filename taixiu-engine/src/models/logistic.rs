use ndarray::Array1;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use taixiu_data::{Outcome, Round};

use super::{guarded_predict, Predictor, PredictorOutput};
use crate::config::EngineConfig;
use crate::features;

/// Number of heuristic predictors whose prob-of-Tài is appended to the base
/// feature vector. Must match `heuristic_predictors`.
pub const HEURISTIC_COUNT: usize = 8;

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

/// Online logistic regression over the base features plus each heuristic's
/// prob-of-Tài. Lives for the whole process: initialized once with small
/// seeded weights, bulk warm-fitted at most once, then read as a snapshot by
/// prediction and backtest replay.
pub struct LogisticModel {
    weights: Array1<f64>,
    bias: f64,
    learning_rate: f64,
    l2_lambda: f64,
    warmed: bool,
    warm_fits: u32,
}

impl LogisticModel {
    pub fn new(config: &EngineConfig) -> Self {
        let dim = features::BASE_FEATURE_NAMES.len() + HEURISTIC_COUNT;
        let mut rng = StdRng::seed_from_u64(config.seed);
        let weights = Array1::from_iter((0..dim).map(|_| rng.random_range(-0.01..0.01)));
        Self {
            weights,
            bias: 0.0,
            learning_rate: config.learning_rate,
            l2_lambda: config.l2_lambda,
            warmed: false,
            warm_fits: 0,
        }
    }

    pub fn is_warmed(&self) -> bool {
        self.warmed
    }

    pub fn warm_fit_count(&self) -> u32 {
        self.warm_fits
    }

    /// Feature vector for the next round after `history`: base features plus
    /// each heuristic output re-expressed as a probability of Tài.
    pub fn feature_vector(history: &[Round], heuristics: &[PredictorOutput]) -> Array1<f64> {
        let base = features::extract(history);
        Array1::from_iter(
            base.values
                .iter()
                .copied()
                .chain(heuristics.iter().map(|o| o.p_tai())),
        )
    }

    fn probability(&self, x: &Array1<f64>) -> f64 {
        sigmoid(self.weights.dot(x) + self.bias)
    }

    /// One gradient step on log-loss with L2 decay.
    pub fn update(&mut self, x: &Array1<f64>, label: Outcome) {
        let y = match label {
            Outcome::Tai => 1.0,
            Outcome::Xiu => 0.0,
        };
        let grad = self.probability(x) - y;
        let (lr, l2) = (self.learning_rate, self.l2_lambda);
        self.weights.zip_mut_with(x, |w, &xi| {
            *w -= lr * (grad * xi + l2 * *w);
        });
        self.bias -= lr * grad;
    }

    /// One-time walk-forward pass over the history, from the warm-start
    /// offset to the second-to-last round, labeling each prefix with its
    /// realized next outcome. Idempotent: repeated calls are no-ops.
    pub fn warm_fit(
        &mut self,
        history: &[Round],
        predictors: &[Box<dyn Predictor>],
        config: &EngineConfig,
    ) {
        if self.warmed || history.len() <= config.warm_start + 1 {
            return;
        }
        for t in config.warm_start..history.len() {
            let prefix = &history[..t];
            let heuristics: Vec<PredictorOutput> =
                predictors.iter().map(|p| guarded_predict(p.as_ref(), prefix)).collect();
            let x = Self::feature_vector(prefix, &heuristics);
            self.update(&x, history[t].outcome);
        }
        self.warmed = true;
        self.warm_fits += 1;
        log::info!(
            "logistic warm-fit over {} rounds (offset {})",
            history.len() - config.warm_start,
            config.warm_start
        );
    }

    /// The model's opinion on the next round. Abstains until warm-fitted so
    /// the untrained near-random weights never cast a vote.
    pub fn output(&self, history: &[Round], heuristics: &[PredictorOutput]) -> PredictorOutput {
        if !self.warmed {
            return PredictorOutput::neutral("Logistic: not warm-fitted yet");
        }
        let x = Self::feature_vector(history, heuristics);
        let p = self.probability(&x);
        let prediction = if p >= 0.5 { Outcome::Tai } else { Outcome::Xiu };
        let confidence = 0.5 + (p - 0.5).abs() * 0.9;
        let mut out = PredictorOutput::decided(
            prediction,
            confidence,
            format!("logistic P(Tài)={p:.3} over {} features", x.len()),
        );
        out.meta.insert("p_tai".into(), p);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::heuristic_predictors;
    use crate::models::testkit::{alternating_rounds, FaultyPredictor};

    fn small_config() -> EngineConfig {
        EngineConfig { warm_start: 10, warm_threshold: 30, ..EngineConfig::default() }
    }

    #[test]
    fn test_heuristic_count_matches_registry() {
        assert_eq!(heuristic_predictors(&EngineConfig::default()).len(), HEURISTIC_COUNT);
    }

    #[test]
    fn test_unwarmed_model_abstains() {
        let config = small_config();
        let model = LogisticModel::new(&config);
        let hist = alternating_rounds(20);
        let heuristics: Vec<_> = heuristic_predictors(&config)
            .iter()
            .map(|p| p.predict(&hist))
            .collect();
        let out = model.output(&hist, &heuristics);
        assert!(out.prediction.is_none());
        assert_eq!(out.confidence, 0.5);
    }

    #[test]
    fn test_update_moves_probability_toward_label() {
        let config = small_config();
        let mut model = LogisticModel::new(&config);
        let x = Array1::from_elem(features::BASE_FEATURE_NAMES.len() + HEURISTIC_COUNT, 1.0);
        for _ in 0..200 {
            model.update(&x, Outcome::Tai);
        }
        assert!(model.probability(&x) > 0.9);
        for _ in 0..400 {
            model.update(&x, Outcome::Xiu);
        }
        assert!(model.probability(&x) < 0.5);
    }

    #[test]
    fn test_warm_fit_runs_at_most_once() {
        let config = small_config();
        let predictors = heuristic_predictors(&config);
        let mut model = LogisticModel::new(&config);
        let hist = alternating_rounds(50);
        model.warm_fit(&hist, &predictors, &config);
        assert!(model.is_warmed());
        assert_eq!(model.warm_fit_count(), 1);
        model.warm_fit(&hist, &predictors, &config);
        assert_eq!(model.warm_fit_count(), 1);
    }

    #[test]
    fn test_warm_fit_contains_predictor_panics() {
        // A predictor that panics on every prefix must not abort the pass;
        // its opinion degrades to no evidence and the model still warms.
        let config = small_config();
        let mut predictors = heuristic_predictors(&config);
        predictors[0] = Box::new(FaultyPredictor);
        let mut model = LogisticModel::new(&config);
        model.warm_fit(&alternating_rounds(50), &predictors, &config);
        assert!(model.is_warmed());
        assert_eq!(model.warm_fit_count(), 1);
    }

    #[test]
    fn test_warm_fit_requires_enough_history() {
        let config = small_config();
        let predictors = heuristic_predictors(&config);
        let mut model = LogisticModel::new(&config);
        model.warm_fit(&alternating_rounds(5), &predictors, &config);
        assert!(!model.is_warmed());
    }

    #[test]
    fn test_warmed_output_is_bounded() {
        let config = small_config();
        let predictors = heuristic_predictors(&config);
        let mut model = LogisticModel::new(&config);
        let hist = alternating_rounds(60);
        model.warm_fit(&hist, &predictors, &config);
        let heuristics: Vec<_> = predictors.iter().map(|p| p.predict(&hist)).collect();
        let out = model.output(&hist, &heuristics);
        assert!(out.prediction.is_some());
        assert!(out.confidence >= 0.5 && out.confidence < 0.95);
    }

    #[test]
    fn test_same_seed_same_init() {
        let config = small_config();
        let a = LogisticModel::new(&config);
        let b = LogisticModel::new(&config);
        assert_eq!(a.weights, b.weights);
    }
}
