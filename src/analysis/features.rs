use std::ops::Range;

use serde::{Deserialize, Serialize};

use super::audio::{ExtractionError, SAMPLE_RATE};
use super::frequency_domain::{
    chroma::{ChromaBank, N_CHROMA},
    contrast::{N_CONTRAST, contrast_mean},
    harmonic::harmonic_magnitude,
    mel::{MelBank, N_MELS, N_MFCC, mel_mean, mfcc_mean},
    stft::{Stft, power_from_magnitude},
    time_mean,
    tonnetz::{N_TONNETZ, tonnetz_mean},
};

/// Total feature width; the layout below is shared by every fitted artifact.
pub const FEATURE_DIM: usize = N_MFCC + N_CHROMA + N_MELS + N_CONTRAST + N_TONNETZ;

pub const MFCC_RANGE: Range<usize> = 0..N_MFCC;
pub const CHROMA_RANGE: Range<usize> = MFCC_RANGE.end..MFCC_RANGE.end + N_CHROMA;
pub const MEL_RANGE: Range<usize> = CHROMA_RANGE.end..CHROMA_RANGE.end + N_MELS;
pub const CONTRAST_RANGE: Range<usize> = MEL_RANGE.end..MEL_RANGE.end + N_CONTRAST;
pub const TONNETZ_RANGE: Range<usize> = CONTRAST_RANGE.end..CONTRAST_RANGE.end + N_TONNETZ;

/// Time-averaged `[mfcc, chroma, mel, contrast, tonnetz]` descriptor of one clip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f32>", into = "Vec<f32>")]
pub struct FeatureVector {
    values: Vec<f32>,
}

impl FeatureVector {
    pub fn from_values(values: Vec<f32>) -> Result<Self, String> {
        if values.len() != FEATURE_DIM {
            return Err(format!(
                "Feature vector must have {FEATURE_DIM} values, got {}",
                values.len()
            ));
        }
        Ok(Self { values })
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }

    pub fn into_inner(self) -> Vec<f32> {
        self.values
    }

    pub fn mfcc(&self) -> &[f32] {
        &self.values[MFCC_RANGE]
    }

    pub fn chroma(&self) -> &[f32] {
        &self.values[CHROMA_RANGE]
    }

    pub fn mel(&self) -> &[f32] {
        &self.values[MEL_RANGE]
    }

    pub fn contrast(&self) -> &[f32] {
        &self.values[CONTRAST_RANGE]
    }

    pub fn tonnetz(&self) -> &[f32] {
        &self.values[TONNETZ_RANGE]
    }
}

impl TryFrom<Vec<f32>> for FeatureVector {
    type Error = String;

    fn try_from(values: Vec<f32>) -> Result<Self, Self::Error> {
        Self::from_values(values)
    }
}

impl From<FeatureVector> for Vec<f32> {
    fn from(vector: FeatureVector) -> Self {
        vector.values
    }
}

/// Compute the feature vector of a conditioned clip.
pub fn extract_features(samples: &[f32]) -> Result<FeatureVector, ExtractionError> {
    if samples.is_empty() {
        return Err(ExtractionError::Empty);
    }
    let stft = Stft::compute(samples);
    let magnitude = stft.magnitude();
    let power = power_from_magnitude(&magnitude);

    let mel_bank = MelBank::new(SAMPLE_RATE);
    let mel_power = mel_bank.apply(&power);
    let chroma_bank = ChromaBank::new(SAMPLE_RATE);
    let chroma = chroma_bank.apply(&magnitude);
    let harmonic_chroma = chroma_bank.apply(&harmonic_magnitude(&magnitude));

    let mut values = Vec::with_capacity(FEATURE_DIM);
    values.extend(mfcc_mean(&mel_power).into_iter().map(|v| v as f32));
    values.extend(time_mean(&chroma, N_CHROMA).into_iter().map(|v| v as f32));
    values.extend(mel_mean(&mel_power).into_iter().map(|v| v as f32));
    values.extend(
        contrast_mean(&magnitude, SAMPLE_RATE)
            .into_iter()
            .map(|v| v as f32),
    );
    values.extend(tonnetz_mean(&harmonic_chroma).into_iter().map(|v| v as f32));

    if let Some(index) = values.iter().position(|v| !v.is_finite()) {
        return Err(ExtractionError::NonFinite { index });
    }
    FeatureVector::from_values(values).map_err(ExtractionError::Decode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::audio::{CANONICAL_LEN, condition};

    fn tone(freq: f32) -> Vec<f32> {
        let samples = (0..CANONICAL_LEN)
            .map(|i| (std::f32::consts::TAU * freq * i as f32 / SAMPLE_RATE as f32).sin() * 0.3)
            .collect();
        condition(samples)
    }

    #[test]
    fn layout_is_contiguous_and_193_wide() {
        assert_eq!(FEATURE_DIM, 193);
        assert_eq!(MFCC_RANGE, 0..40);
        assert_eq!(CHROMA_RANGE, 40..52);
        assert_eq!(MEL_RANGE, 52..180);
        assert_eq!(CONTRAST_RANGE, 180..187);
        assert_eq!(TONNETZ_RANGE, 187..193);
    }

    #[test]
    fn extraction_is_deterministic() {
        let clip = tone(440.0);
        let a = extract_features(&clip).unwrap();
        let b = extract_features(&clip).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_slice().len(), FEATURE_DIM);
    }

    #[test]
    fn a440_chroma_peaks_at_a() {
        let features = extract_features(&tone(440.0)).unwrap();
        let chroma = features.chroma();
        let peak = chroma
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(idx, _)| idx)
            .unwrap();
        assert_eq!(peak, 9);
    }

    #[test]
    fn silence_is_finite() {
        let features = extract_features(&vec![0.0; CANONICAL_LEN]).unwrap();
        assert!(features.as_slice().iter().all(|v| v.is_finite()));
        assert!(features.chroma().iter().all(|&v| v == 0.0));
        assert!(features.mel().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn wrong_width_is_rejected() {
        assert!(FeatureVector::from_values(vec![0.0; 10]).is_err());
        let json = serde_json::to_string(&vec![0.0_f32; 3]).unwrap();
        assert!(serde_json::from_str::<FeatureVector>(&json).is_err());
    }
}
