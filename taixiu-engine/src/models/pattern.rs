use std::collections::HashMap;

use taixiu_data::{Outcome, Round};

use super::{Predictor, PredictorOutput};

/// Minimum followed occurrences before the follow-up table is trusted.
const MIN_FOLLOW_SAMPLES: u32 = 4;
/// Base of the exponential recency weighting used by the fallback vote.
const RECENCY_BASE: f64 = 1.12;
/// Substring lengths mined for repeats.
const MIN_PATTERN_LEN: usize = 3;
const MAX_PATTERN_LEN: usize = 6;

/// Mines the trailing window for the most repeated outcome substring and
/// predicts its historical follow-up; falls back to a recency-weighted vote
/// when the follow-up sample is too thin.
pub struct PatternMiner {
    window: usize,
}

impl PatternMiner {
    pub fn new(window: usize) -> Self {
        Self { window }
    }
}

#[derive(Clone, Copy)]
struct PatternStats {
    count: u32,
    first_seen: usize,
}

fn pattern_string(slice: &[Outcome]) -> String {
    slice.iter().map(|o| o.symbol()).collect()
}

impl Predictor for PatternMiner {
    fn name(&self) -> &'static str {
        "PatternMining"
    }

    fn predict(&self, history: &[Round]) -> PredictorOutput {
        let outcomes: Vec<Outcome> = history.iter().map(|r| r.outcome).collect();
        let use_w = &outcomes[outcomes.len().saturating_sub(self.window)..];
        if use_w.len() < MIN_PATTERN_LEN {
            return PredictorOutput::neutral("PatternMining: not enough history");
        }

        // Count every contiguous substring of length 3..=6 in the window.
        let mut counts: HashMap<Vec<Outcome>, PatternStats> = HashMap::new();
        let mut order = 0usize;
        for len in MIN_PATTERN_LEN..=MAX_PATTERN_LEN.min(use_w.len()) {
            for start in 0..=use_w.len() - len {
                let key = use_w[start..start + len].to_vec();
                let entry = counts.entry(key).or_insert(PatternStats { count: 0, first_seen: order });
                entry.count += 1;
                order += 1;
            }
        }

        // Most frequent; ties broken by longest pattern, then first-seen.
        let Some((best, stats)) = counts.iter().max_by(|(ka, sa), (kb, sb)| {
            sa.count
                .cmp(&sb.count)
                .then(ka.len().cmp(&kb.len()))
                .then(sb.first_seen.cmp(&sa.first_seen))
        }) else {
            return PredictorOutput::neutral("PatternMining: no pattern found");
        };

        // Follow-up distribution of the best pattern over the full history.
        let mut follow_tai = 0u32;
        let mut follow_xiu = 0u32;
        if outcomes.len() > best.len() {
            for start in 0..outcomes.len() - best.len() {
                if &outcomes[start..start + best.len()] == best.as_slice() {
                    match outcomes[start + best.len()] {
                        Outcome::Tai => follow_tai += 1,
                        Outcome::Xiu => follow_xiu += 1,
                    }
                }
            }
        }
        let follow_total = follow_tai + follow_xiu;

        if follow_total < MIN_FOLLOW_SAMPLES {
            // Exponentially recency-weighted vote over the window.
            let mut tai_score = 0.0;
            let mut xiu_score = 0.0;
            for (i, &o) in use_w.iter().enumerate() {
                let w = RECENCY_BASE.powi(i as i32);
                match o {
                    Outcome::Tai => tai_score += w,
                    Outcome::Xiu => xiu_score += w,
                }
            }
            let total = tai_score + xiu_score;
            let dominance = if total > 0.0 { (tai_score - xiu_score).abs() / total } else { 0.0 };
            let prediction = if tai_score >= xiu_score { Outcome::Tai } else { Outcome::Xiu };
            let confidence = 0.6 + (dominance * 0.9).min(0.28);
            let mut out = PredictorOutput::decided(
                prediction,
                confidence,
                format!(
                    "pattern {} x{} has no strong follow-up; recency-weighted vote",
                    pattern_string(best),
                    stats.count
                ),
            );
            out.meta.insert("follow_samples".into(), follow_total as f64);
            return out;
        }

        let p_tai = follow_tai as f64 / follow_total as f64;
        let prediction = if p_tai >= 0.5 { Outcome::Tai } else { Outcome::Xiu };
        let confidence = 0.6 + ((p_tai - 0.5).abs() * 1.4).min(0.38);
        let mut out = PredictorOutput::decided(
            prediction,
            confidence,
            format!(
                "pattern {} x{}, follow-up P(Tài)={p_tai:.3} over {follow_total} samples",
                pattern_string(best),
                stats.count
            ),
        );
        out.meta.insert("p_tai".into(), p_tai);
        out.meta.insert("follow_samples".into(), follow_total as f64);
        out
    }
}
