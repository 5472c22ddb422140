use taixiu_data::{Outcome, Round};

use super::{Predictor, PredictorOutput};
use crate::features;

/// Break probability table by trailing streak length.
const BREAK_TABLE: [(usize, f64); 4] = [(12, 0.86), (9, 0.78), (6, 0.68), (4, 0.62)];
/// Minimum completed-run observations before the empirical break rate is
/// blended in.
const MIN_BREAK_SAMPLES: u32 = 5;
/// Break probability at or above which the filter bets against the streak.
const BREAK_THRESHOLD: f64 = 0.62;
/// Confidence when riding the streak instead.
const CONTINUATION_CONF: f64 = 0.56;

/// Bets against long trailing streaks. The step table gives a prior break
/// probability; when enough completed runs of the current length exist in the
/// history, the observed break rate is averaged in.
pub struct BreakStreak;

impl BreakStreak {
    pub fn new() -> Self {
        Self
    }
}

impl Default for BreakStreak {
    fn default() -> Self {
        Self::new()
    }
}

fn table_break_prob(streak: usize) -> f64 {
    for &(min_len, prob) in &BREAK_TABLE {
        if streak >= min_len {
            return prob;
        }
    }
    0.0
}

/// Break rate among completed runs that reached `streak` rounds: of those,
/// the fraction that ended at exactly `streak`. The trailing (still open) run
/// is excluded.
fn empirical_break_rate(outcomes: &[Outcome], streak: usize) -> Option<f64> {
    let mut run_lengths: Vec<usize> = Vec::new();
    let mut run = 0usize;
    for i in 0..outcomes.len() {
        run += 1;
        if i + 1 < outcomes.len() && outcomes[i + 1] != outcomes[i] {
            run_lengths.push(run);
            run = 0;
        }
    }
    // `run` now holds the open trailing run; drop it.
    let reached = run_lengths.iter().filter(|&&l| l >= streak).count() as u32;
    if reached < MIN_BREAK_SAMPLES {
        return None;
    }
    let broke = run_lengths.iter().filter(|&&l| l == streak).count() as u32;
    Some(broke as f64 / reached as f64)
}

impl Predictor for BreakStreak {
    fn name(&self) -> &'static str {
        "BreakStreak"
    }

    fn predict(&self, history: &[Round]) -> PredictorOutput {
        let outcomes: Vec<Outcome> = history.iter().map(|r| r.outcome).collect();
        let Some(&last) = outcomes.last() else {
            return PredictorOutput::neutral("BreakStreak: empty history");
        };
        let streak = features::streak_of_end(&outcomes);

        let mut break_prob = table_break_prob(streak);
        let mut refined = false;
        if let Some(rate) = empirical_break_rate(&outcomes, streak) {
            break_prob = 0.5 * break_prob + 0.5 * rate;
            refined = true;
        }

        let mut out = if break_prob >= BREAK_THRESHOLD {
            PredictorOutput::decided(
                last.opposite(),
                break_prob,
                format!(
                    "streak of {streak} {last} → break at {}%{}",
                    (break_prob * 100.0).round(),
                    if refined { " (empirically refined)" } else { "" }
                ),
            )
        } else {
            PredictorOutput::decided(
                last,
                CONTINUATION_CONF,
                format!("streak of {streak} → ride it"),
            )
        };
        out.meta.insert("streak".into(), streak as f64);
        out.meta.insert("break_prob".into(), break_prob);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::testkit::{alternating_rounds, rounds_from_outcomes};
    use taixiu_data::Outcome::{Tai, Xiu};

    #[test]
    fn test_empty_history_is_neutral() {
        assert!(BreakStreak::new().predict(&[]).prediction.is_none());
    }

    #[test]
    fn test_streak_of_one_rides() {
        let hist = alternating_rounds(20);
        let last = hist[hist.len() - 1].outcome;
        let out = BreakStreak::new().predict(&hist);
        assert_eq!(out.prediction, Some(last));
        assert!((out.confidence - CONTINUATION_CONF).abs() < 1e-12);
    }

    #[test]
    fn test_streak_of_five_proposes_break() {
        let hist = rounds_from_outcomes(&[Tai; 5]);
        let out = BreakStreak::new().predict(&hist);
        assert_eq!(out.prediction, Some(Xiu));
        assert!((out.confidence - 0.62).abs() < 1e-12);
    }

    #[test]
    fn test_long_streak_breaks_with_table_prob() {
        let hist = rounds_from_outcomes(&[Xiu; 14]);
        let out = BreakStreak::new().predict(&hist);
        assert_eq!(out.prediction, Some(Tai));
        assert!((out.confidence - 0.86).abs() < 1e-12);
        assert_eq!(out.meta["streak"], 14.0);
    }

    #[test]
    fn test_short_streak_rides() {
        let hist = rounds_from_outcomes(&[Xiu, Xiu, Tai, Tai, Tai]);
        let out = BreakStreak::new().predict(&hist);
        assert_eq!(out.prediction, Some(Tai));
        assert!((out.confidence - CONTINUATION_CONF).abs() < 1e-12);
    }

    #[test]
    fn test_empirical_refinement_lowers_break_prob() {
        // Many completed runs of length ≥6 that kept going: the observed
        // break rate drags the table's 0.68 down below the threshold.
        let mut outcomes = Vec::new();
        for _ in 0..6 {
            outcomes.extend([Tai; 9]);
            outcomes.extend([Xiu; 9]);
        }
        outcomes.extend([Tai; 6]);
        let hist = rounds_from_outcomes(&outcomes);
        let out = BreakStreak::new().predict(&hist);
        // reached 6: all 12 completed runs; broke at exactly 6: none.
        assert_eq!(out.prediction, Some(Tai));
        assert!((out.confidence - CONTINUATION_CONF).abs() < 1e-12);
        assert!(out.meta["break_prob"] < BREAK_THRESHOLD);
    }
}
