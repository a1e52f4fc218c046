use std::collections::BTreeMap;

use rand::Rng;
use rand::seq::IndexedRandom;

use super::{PredictionResult, ServingPath};
use crate::emotion::Emotion;

const CHOSEN_RANGE: std::ops::RangeInclusive<f32> = 0.70..=0.95;
const OTHER_RANGE: std::ops::RangeInclusive<f32> = 0.01..=0.15;

/// Plausible-looking distribution over the default taxonomy.
///
/// `confidence` is the chosen label's weight *before* normalization, so it can differ from
/// its entry in `probabilities`.
pub fn synthetic_prediction<R: Rng + ?Sized>(rng: &mut R) -> PredictionResult {
    let chosen = Emotion::ALL
        .choose(rng)
        .copied()
        .unwrap_or(Emotion::Neutral);
    let confidence = rng.random_range(CHOSEN_RANGE);
    let mut weights: BTreeMap<String, f32> = Emotion::ALL
        .iter()
        .map(|&emotion| {
            let weight = if emotion == chosen {
                confidence
            } else {
                rng.random_range(OTHER_RANGE)
            };
            (emotion.as_str().to_string(), weight)
        })
        .collect();
    let total: f32 = weights.values().sum();
    for weight in weights.values_mut() {
        *weight /= total;
    }
    PredictionResult {
        emotion: chosen.as_str().to_string(),
        confidence,
        probabilities: weights,
        path: ServingPath::Synthetic,
    }
}
