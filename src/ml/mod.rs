//! Classifier capability, preprocessing fits and evaluation helpers.

pub mod conv1d;
pub mod label_encoding;
pub mod metrics;
pub mod scaler;
pub mod split;

pub use conv1d::{ConvNetFit, ConvNetModel, ConvNetOptions, EpochStats, train_conv_net};
pub use label_encoding::LabelEncoding;
pub use scaler::StandardScaler;

/// Anything that maps a scaled feature vector to a class distribution.
///
/// Implementations are shared read-only across concurrent requests.
pub trait Classifier: Send + Sync {
    /// Width of the distribution returned by [`Classifier::infer`].
    fn class_count(&self) -> usize;

    /// Probabilities for one scaled feature vector, read as a single-channel sequence.
    fn infer(&self, features: &[f32]) -> Result<Vec<f32>, String>;
}

/// Scaled rows with their encoded class indices.
#[derive(Debug, Clone, Default)]
pub struct TrainDataset {
    pub x: Vec<Vec<f32>>,
    pub y: Vec<usize>,
    pub n_classes: usize,
}

impl TrainDataset {
    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// Rows at `indices`, in that order.
    pub fn subset(&self, indices: &[usize]) -> Self {
        Self {
            x: indices.iter().map(|&i| self.x[i].clone()).collect(),
            y: indices.iter().map(|&i| self.y[i]).collect(),
            n_classes: self.n_classes,
        }
    }
}

pub fn softmax(raw: &[f32]) -> Vec<f32> {
    if raw.is_empty() {
        return Vec::new();
    }
    let max = raw
        .iter()
        .copied()
        .fold(f32::NEG_INFINITY, |a, b| a.max(b));
    let mut exps: Vec<f32> = raw.iter().map(|&v| (v - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    if sum == 0.0 || !sum.is_finite() {
        return vec![1.0 / raw.len() as f32; raw.len()];
    }
    for v in &mut exps {
        *v /= sum;
    }
    exps
}

/// Index of the largest value; the first one wins ties.
pub fn argmax(values: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (idx, &value) in values.iter().enumerate() {
        if best.is_none_or(|(_, best_value)| value > best_value) {
            best = Some((idx, value));
        }
    }
    best.map(|(idx, _)| idx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn softmax_sums_to_one_and_preserves_order() {
        let probs = softmax(&[1.0, 3.0, 2.0]);
        let sum: f32 = probs.iter().sum();
        assert!((sum - 1.0).abs() < 1e-6);
        assert_eq!(argmax(&probs), Some(1));
    }

    #[test]
    fn argmax_prefers_first_of_ties() {
        assert_eq!(argmax(&[0.5, 0.5]), Some(0));
        assert_eq!(argmax(&[]), None);
    }

    #[test]
    fn subset_keeps_rows_and_labels_aligned() {
        let data = TrainDataset {
            x: vec![vec![0.0], vec![1.0], vec![2.0]],
            y: vec![0, 1, 0],
            n_classes: 2,
        };
        let subset = data.subset(&[2, 1]);
        assert_eq!(subset.x, vec![vec![2.0], vec![1.0]]);
        assert_eq!(subset.y, vec![0, 1]);
        assert_eq!(subset.n_classes, 2);
    }
}
