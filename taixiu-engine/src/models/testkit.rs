//! Synthetic histories and fault-injection helpers for tests.

use taixiu_data::{Outcome, Round};

use super::{Predictor, PredictorOutput};

/// Panics on every call; for exercising predictor fault containment.
pub struct FaultyPredictor;

impl Predictor for FaultyPredictor {
    fn name(&self) -> &'static str {
        "Faulty"
    }

    fn predict(&self, _history: &[Round]) -> PredictorOutput {
        panic!("injected predictor fault")
    }
}

/// Build rounds with the given outcomes. Tài rounds get total 14, Xỉu rounds
/// total 7; indices are 1-based and ascending.
pub fn rounds_from_outcomes(outcomes: &[Outcome]) -> Vec<Round> {
    outcomes
        .iter()
        .enumerate()
        .map(|(i, &outcome)| {
            let (dice, total) = match outcome {
                Outcome::Tai => ([4, 5, 5], 14),
                Outcome::Xiu => ([2, 2, 3], 7),
            };
            Round { index: (i + 1) as i64, dice, total, outcome }
        })
        .collect()
}

/// Strictly alternating history Tài, Xỉu, Tài, ... of length `n`.
pub fn alternating_rounds(n: usize) -> Vec<Round> {
    let outcomes: Vec<Outcome> = (0..n)
        .map(|i| if i % 2 == 0 { Outcome::Tai } else { Outcome::Xiu })
        .collect();
    rounds_from_outcomes(&outcomes)
}

/// Build rounds from explicit totals (3..=18); outcomes follow the ≥11 rule
/// and the dice are synthesized to match each total.
pub fn rounds_from_totals(totals: &[u8]) -> Vec<Round> {
    totals
        .iter()
        .enumerate()
        .map(|(i, &total)| {
            let t = total.clamp(3, 18);
            let d1 = (t as i16 - 12).clamp(1, 6) as u8;
            let rem = t - d1;
            let d2 = (rem as i16 - 6).clamp(1, 6) as u8;
            let d3 = rem - d2;
            let outcome = if t >= 11 { Outcome::Tai } else { Outcome::Xiu };
            Round { index: (i + 1) as i64, dice: [d1, d2, d3], total: t, outcome }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rounds_from_totals_dice_are_consistent() {
        for t in 3..=18u8 {
            let rounds = rounds_from_totals(&[t]);
            let r = &rounds[0];
            assert_eq!(r.dice.iter().map(|&d| d as u8).sum::<u8>(), t);
            assert!(r.dice.iter().all(|&d| (1..=6).contains(&d)), "total {t}: {:?}", r.dice);
        }
    }

    #[test]
    fn test_alternating_rounds() {
        let hist = alternating_rounds(4);
        assert_eq!(hist[0].outcome, Outcome::Tai);
        assert_eq!(hist[1].outcome, Outcome::Xiu);
        assert_eq!(hist[3].index, 4);
    }
}
