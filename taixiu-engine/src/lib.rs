pub mod config;
pub mod ensemble;
pub mod features;
pub mod models;

use std::sync::Mutex;

use taixiu_data::Round;
use thiserror::Error;

use crate::config::EngineConfig;
use crate::ensemble::backtest::{self, BacktestReport};
use crate::ensemble::{combine, PredictionReport};
use crate::models::logistic::LogisticModel;
use crate::models::Predictor;

/// The only core failure that propagates to the caller. Everything else
/// (short history, individual predictor faults, malformed records) degrades
/// to a low-confidence answer instead.
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("no usable rounds in the source history")]
    Empty,
}

/// Process-wide prediction engine.
///
/// Owns the predictor registry and the one piece of cross-request state: the
/// online logistic model. Construct one `Engine` at process start and share
/// it; the logistic warm-fit runs at most once per process, guarded by the
/// mutex plus the model's own `warmed` flag.
pub struct Engine {
    config: EngineConfig,
    predictors: Vec<Box<dyn Predictor>>,
    logistic: Mutex<LogisticModel>,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        let logistic = LogisticModel::new(&config);
        let predictors = models::heuristic_predictors(&config);
        Self { config, predictors, logistic: Mutex::new(logistic) }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Predict the next round from the full observed history.
    ///
    /// Triggers the one-time logistic warm-fit when enough history is seen,
    /// then combines every predictor on a read-only snapshot.
    pub fn predict(&self, history: &[Round]) -> Result<PredictionReport, HistoryError> {
        if history.is_empty() {
            return Err(HistoryError::Empty);
        }
        self.warm_fit_if_ready(history);
        let logistic = self.lock_logistic();
        Ok(combine(&self.config, &self.predictors, &logistic, history))
    }

    /// Walk-forward backtest over the trailing `lookback` rounds.
    ///
    /// Each replayed decision sees only its own prefix of the history; the
    /// logistic coefficients are a frozen snapshot for the whole replay, so
    /// the result is deterministic and free of label leakage.
    pub fn backtest(
        &self,
        history: &[Round],
        lookback: usize,
        with_bankroll: bool,
    ) -> Result<BacktestReport, HistoryError> {
        if history.is_empty() {
            return Err(HistoryError::Empty);
        }
        let logistic = self.lock_logistic();
        Ok(backtest::overall_backtest(
            &self.config,
            &self.predictors,
            &logistic,
            history,
            lookback,
            with_bankroll,
        ))
    }

    /// Whether the logistic model has completed its one-time warm-fit.
    pub fn is_warmed(&self) -> bool {
        self.lock_logistic().is_warmed()
    }

    fn warm_fit_if_ready(&self, history: &[Round]) {
        if history.len() < self.config.warm_threshold {
            return;
        }
        // Check-and-set under the mutex: concurrent callers race to the
        // lock, the loser sees `warmed` already set and returns.
        let mut model = self.lock_logistic();
        if model.is_warmed() {
            return;
        }
        model.warm_fit(history, &self.predictors, &self.config);
    }

    fn lock_logistic(&self) -> std::sync::MutexGuard<'_, LogisticModel> {
        // A poisoned lock only means a panic elsewhere mid-update; the model
        // state is still usable for prediction.
        self.logistic.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}
