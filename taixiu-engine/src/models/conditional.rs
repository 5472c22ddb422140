use std::collections::BTreeMap;
use std::fmt::Display;

use taixiu_data::{DiceShape, Outcome, Parity, Round, SumBucket};

use super::{Predictor, PredictorOutput};

/// Outcome counts following one key value.
#[derive(Debug, Default, Clone, Copy)]
struct FollowCounts {
    tai: u32,
    xiu: u32,
}

impl FollowCounts {
    fn total(&self) -> u32 {
        self.tai + self.xiu
    }
}

/// Conditional-frequency model generic over a derived round key: bucket every
/// round by its key, tally the outcome of the round that followed, then look
/// up the bucket of the most recent round. Buckets thinner than `min_samples`
/// yield insufficient evidence.
pub struct ConditionalModel<K> {
    name: &'static str,
    min_samples: u32,
    key_fn: fn(&Round) -> K,
}

impl<K: Ord + Display> ConditionalModel<K> {
    pub fn new(name: &'static str, min_samples: u32, key_fn: fn(&Round) -> K) -> Self {
        Self { name, min_samples, key_fn }
    }
}

pub fn dice_shape_model() -> ConditionalModel<DiceShape> {
    ConditionalModel::new("DiceShape", 5, DiceShape::of)
}

pub fn parity_model() -> ConditionalModel<Parity> {
    ConditionalModel::new("Parity", 8, Parity::of)
}

pub fn sum_bucket_model() -> ConditionalModel<SumBucket> {
    ConditionalModel::new("SumBucket", 8, SumBucket::of)
}

impl<K: Ord + Display + Send + Sync> Predictor for ConditionalModel<K> {
    fn name(&self) -> &'static str {
        self.name
    }

    fn predict(&self, history: &[Round]) -> PredictorOutput {
        if history.len() < 2 {
            return PredictorOutput::neutral(format!("{}: not enough history", self.name));
        }

        let mut table: BTreeMap<K, FollowCounts> = BTreeMap::new();
        for pair in history.windows(2) {
            let entry = table.entry((self.key_fn)(&pair[0])).or_default();
            match pair[1].outcome {
                Outcome::Tai => entry.tai += 1,
                Outcome::Xiu => entry.xiu += 1,
            }
        }

        let key = (self.key_fn)(&history[history.len() - 1]);
        let Some(counts) = table.get(&key).copied() else {
            return PredictorOutput::neutral(format!("{}: key {key} never followed", self.name));
        };
        if counts.total() < self.min_samples {
            return PredictorOutput::neutral(format!(
                "{}: only {} samples for key {key}",
                self.name,
                counts.total()
            ));
        }

        let p_tai = counts.tai as f64 / counts.total() as f64;
        let prediction = if p_tai >= 0.5 { Outcome::Tai } else { Outcome::Xiu };
        let confidence = 0.55 + ((p_tai - 0.5).abs() * 1.5).min(0.40);
        let mut out = PredictorOutput::decided(
            prediction,
            confidence,
            format!(
                "{}: after {key}, P(Tài)={p_tai:.3} over {} samples",
                self.name,
                counts.total()
            ),
        );
        out.meta.insert("p_tai".into(), p_tai);
        out.meta.insert("samples".into(), counts.total() as f64);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::testkit::{rounds_from_outcomes, rounds_from_totals};
    use taixiu_data::Outcome::{Tai, Xiu};

    #[test]
    fn test_too_short_is_neutral() {
        let hist = rounds_from_outcomes(&[Tai]);
        assert!(parity_model().predict(&hist).prediction.is_none());
    }

    #[test]
    fn test_below_minimum_samples_abstains() {
        // 6 rounds give at most 5 follow-ups, below Parity's minimum of 8.
        let hist = rounds_from_totals(&[14, 7, 12, 9, 13, 8]);
        let out = parity_model().predict(&hist);
        assert!(out.prediction.is_none());
        assert_eq!(out.confidence, 0.5);
    }

    #[test]
    fn test_parity_picks_up_even_bias() {
        // Alternate totals 12, 13, 12, ...: every even total is followed by
        // 13 (Tài). The history ends on an even total.
        let mut totals = Vec::new();
        for _ in 0..12 {
            totals.push(12);
            totals.push(13);
        }
        totals.push(12);
        let hist = rounds_from_totals(&totals);
        let out = parity_model().predict(&hist);
        assert_eq!(out.prediction, Some(Tai));
        assert!(out.confidence > 0.9);
    }

    #[test]
    fn test_sum_bucket_majority() {
        // Low bucket (<=6) is always followed by another low round (Xỉu).
        let hist = rounds_from_totals(&[5; 20]);
        let out = sum_bucket_model().predict(&hist);
        assert_eq!(out.prediction, Some(Xiu));
        assert!((out.confidence - 0.95).abs() < 1e-12);
    }

    #[test]
    fn test_dice_shape_lower_minimum() {
        // 7 rounds give 6 follow-ups, enough for DiceShape (min 5) but not
        // for SumBucket (min 8).
        let hist = rounds_from_outcomes(&[Tai; 7]);
        assert!(dice_shape_model().predict(&hist).prediction.is_some());
        assert!(sum_bucket_model().predict(&hist).prediction.is_none());
    }

    #[test]
    fn test_confidence_capped() {
        let hist = rounds_from_outcomes(&[Tai; 40]);
        let out = dice_shape_model().predict(&hist);
        assert!(out.confidence <= 0.95 + 1e-12);
    }
}
