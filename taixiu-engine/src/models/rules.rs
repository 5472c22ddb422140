use taixiu_data::{Outcome, Round};

use super::{Predictor, PredictorOutput};
use crate::features;

// Short-circuit trigger confidences.
const BIAS_4_OF_5_CONF: f64 = 0.92;
const BREAK_3_RUN_CONF: f64 = 0.86;
const ZIGZAG_CONF: f64 = 0.82;

// Additive-scoring thresholds.
const HIGH_MEAN_5: f64 = 12.0;
const LOW_MEAN_5: f64 = 9.5;
const EXTREME_HIGH_TOTAL: f64 = 17.0;
const EXTREME_LOW_TOTAL: f64 = 6.0;
const EVEN_SKEW_HIGH: f64 = 0.7;
const EVEN_SKEW_LOW: f64 = 0.3;
const DICE_MEAN_HIGH: f64 = 4.2;
const DICE_MEAN_LOW: f64 = 2.8;

/// Priority-ordered heuristic triggers with an additive point-scoring
/// fallback. The first satisfied trigger returns immediately.
pub struct RuleScorer;

impl RuleScorer {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RuleScorer {
    fn default() -> Self {
        Self::new()
    }
}

fn last_n<T>(slice: &[T], n: usize) -> &[T] {
    &slice[slice.len().saturating_sub(n)..]
}

impl Predictor for RuleScorer {
    fn name(&self) -> &'static str {
        "Rules"
    }

    fn predict(&self, history: &[Round]) -> PredictorOutput {
        if history.is_empty() {
            return PredictorOutput::neutral("Rules: empty history");
        }

        let results: Vec<Outcome> = history.iter().map(|r| r.outcome).collect();
        let totals: Vec<f64> = history.iter().map(|r| r.total as f64).collect();
        let last = results[results.len() - 1];
        let last3 = last_n(&results, 3);
        let last5 = last_n(&results, 5);
        let total3 = last_n(&totals, 3);
        let total5 = last_n(&totals, 5);

        // Trigger (a): 4-of-last-5 bias.
        let tai5 = last5.iter().filter(|&&o| o == Outcome::Tai).count();
        if tai5 >= 4 {
            return PredictorOutput::decided(
                Outcome::Tai,
                BIAS_4_OF_5_CONF,
                "last 5 rounds lean Tài (≥4/5)",
            );
        }
        if last5.len() - tai5 >= 4 {
            return PredictorOutput::decided(
                Outcome::Xiu,
                BIAS_4_OF_5_CONF,
                "last 5 rounds lean Xỉu (≥4/5)",
            );
        }

        // Trigger (b): exactly three identical trailing outcomes → break.
        if last3.len() == 3 && last3.iter().all(|&o| o == last3[0]) {
            let target = last3[0].opposite();
            return PredictorOutput::decided(
                target,
                BREAK_3_RUN_CONF,
                format!("3 consecutive {} → favor the break to {}", last3[0], target),
            );
        }

        // Trigger (c): perfect 5-round alternation → continue alternating.
        let zigzag = last5.len() == 5 && last5.windows(2).all(|p| p[0] != p[1]);
        if zigzag {
            return PredictorOutput::decided(
                last.opposite(),
                ZIGZAG_CONF,
                "clean zigzag run → continue the alternation",
            );
        }

        // Additive point scoring.
        let mut explain: Vec<String> = Vec::new();
        let mut score_tai = 0i32;
        let mut score_xiu = 0i32;

        let avg5 = if total5.is_empty() {
            10.5
        } else {
            total5.iter().sum::<f64>() / total5.len() as f64
        };
        if avg5 >= HIGH_MEAN_5 {
            score_tai += 2;
            explain.push("high 5-round mean total (≥12) → Tài".into());
        } else if avg5 <= LOW_MEAN_5 {
            score_xiu += 2;
            explain.push("low 5-round mean total (≤9.5) → Xỉu".into());
        }

        if total3.len() == 3 {
            if total3[2] > total3[1] && total3[1] > total3[0] {
                score_tai += 2;
                explain.push("3-round rising totals → Tài".into());
            } else if total3[2] < total3[1] && total3[1] < total3[0] {
                score_xiu += 2;
                explain.push("3-round falling totals → Xỉu".into());
            }
        }

        let last_total = totals[totals.len() - 1];
        if last_total >= EXTREME_HIGH_TOTAL {
            score_tai += 3;
            explain.push("extreme high total (≥17) → Tài".into());
        }
        if last_total <= EXTREME_LOW_TOTAL {
            score_xiu += 3;
            explain.push("extreme low total (≤6) → Xỉu".into());
        }
        if total5.len() == 5 && total5.iter().all(|&t| t >= 12.0) {
            score_tai += 3;
            explain.push("5 consecutive high totals → Tài".into());
        }
        if total5.len() == 5 && total5.iter().all(|&t| t <= 9.0) {
            score_xiu += 3;
            explain.push("5 consecutive low totals → Xỉu".into());
        }

        if history.len() >= 8 {
            let even10 = features::even_ratio(history, 10);
            if even10 >= EVEN_SKEW_HIGH {
                score_xiu += 1;
                explain.push("even-total skew → Xỉu".into());
            } else if even10 <= EVEN_SKEW_LOW {
                score_tai += 1;
                explain.push("odd-total skew → Tài".into());
            }
        }

        if history.len() >= 5 {
            let dm = features::dice_mean(history, 5);
            if dm >= DICE_MEAN_HIGH {
                score_tai += 2;
                explain.push("high mean die face (≥4.2) → Tài".into());
            } else if dm <= DICE_MEAN_LOW {
                score_xiu += 2;
                explain.push("low mean die face (≤2.8) → Xỉu".into());
            }
        }

        let streak = features::streak_of_end(&results);
        if (2..=3).contains(&streak) {
            match last {
                Outcome::Tai => score_tai += 1,
                Outcome::Xiu => score_xiu += 1,
            }
            explain.push(format!("short streak of {streak} → ride it"));
        } else if (4..=5).contains(&streak) {
            match last {
                Outcome::Tai => score_xiu += 1,
                Outcome::Xiu => score_tai += 1,
            }
            explain.push(format!("mid streak of {streak} → lean break"));
        }

        let (prediction, confidence) = if score_tai > score_xiu {
            let gap = (score_tai - score_xiu) as f64;
            (Outcome::Tai, 0.68 + (gap * 0.06).min(0.25))
        } else if score_xiu > score_tai {
            let gap = (score_xiu - score_tai) as f64;
            (Outcome::Xiu, 0.68 + (gap * 0.06).min(0.25))
        } else if avg5 >= 11.0 {
            explain.push("tie → bias on mean total".into());
            (Outcome::Tai, 0.64)
        } else if avg5 <= 10.0 {
            explain.push("tie → bias on mean total".into());
            (Outcome::Xiu, 0.64)
        } else {
            explain.push("no lean → flip from last".into());
            (last.opposite(), 0.6)
        };

        if explain.is_empty() {
            explain.push("rules fallback".into());
        }
        let mut out = PredictorOutput {
            prediction: Some(prediction),
            confidence,
            rationale: explain,
            meta: Default::default(),
        };
        out.meta.insert("avg5".into(), avg5);
        out.meta.insert("last_total".into(), last_total);
        out.meta.insert("score_tai".into(), score_tai as f64);
        out.meta.insert("score_xiu".into(), score_xiu as f64);
        out
    }
}
