use taixiu_data::{Outcome, Round};

use super::{Predictor, PredictorOutput};

const MIN_ROUNDS: usize = 5;
/// Fixed AR coefficients on the last two totals; the remainder goes to the
/// 20-round mean.
const COEF_LAST: f64 = 0.6;
const COEF_PREV: f64 = 0.3;
const COEF_MEAN: f64 = 0.1;
/// Midpoint of the 3..18 total range; ≥11 is Tài.
const MIDPOINT: f64 = 10.5;

/// Projects the next total with a fixed-coefficient order-2 autoregression
/// and maps the projection against the Tài/Xỉu midpoint.
pub struct TotalAr;

impl TotalAr {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TotalAr {
    fn default() -> Self {
        Self::new()
    }
}

impl Predictor for TotalAr {
    fn name(&self) -> &'static str {
        "TotalAr"
    }

    fn predict(&self, history: &[Round]) -> PredictorOutput {
        if history.len() < MIN_ROUNDS {
            return PredictorOutput::neutral("TotalAr: not enough history");
        }
        let totals: Vec<f64> = history.iter().map(|r| r.total as f64).collect();
        let n = totals.len();
        let tail = &totals[n.saturating_sub(20)..];
        let mean20 = tail.iter().sum::<f64>() / tail.len() as f64;
        let projected = COEF_LAST * totals[n - 1] + COEF_PREV * totals[n - 2] + COEF_MEAN * mean20;

        let prediction = if projected >= MIDPOINT { Outcome::Tai } else { Outcome::Xiu };
        let confidence = 0.55 + ((projected - MIDPOINT).abs() * 0.045).min(0.33);

        let mut out = PredictorOutput::decided(
            prediction,
            confidence,
            format!("projected next total {projected:.1} vs midpoint {MIDPOINT}"),
        );
        out.meta.insert("projected_total".into(), projected);
        out
    }
}
