use serde::{Deserialize, Serialize};

use crate::ml::{Classifier, softmax};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvNetModel {
    pub model_version: i64,
    pub input_len: usize,
    pub filters: usize,
    pub kernel_size: usize,
    pub pool_size: usize,
    pub n_classes: usize,
    /// `filters x kernel_size`, row-major.
    pub conv_weights: Vec<f32>,
    pub conv_bias: Vec<f32>,
    /// `n_classes x (pooled_len * filters)`, row-major.
    pub dense_weights: Vec<f32>,
    pub dense_bias: Vec<f32>,
}

/// Intermediate activations kept for backpropagation.
pub(super) struct ForwardPass {
    pub(super) padded: Vec<f32>,
    /// Conv pre-activations, indexed `t * filters + f`.
    pub(super) conv_pre: Vec<f32>,
    /// Flattened pooled activations, indexed `p * filters + f`.
    pub(super) pooled: Vec<f32>,
    /// Source position of every pooled value inside the conv output.
    pub(super) pool_argmax: Vec<usize>,
    pub(super) probs: Vec<f32>,
}

impl ConvNetModel {
    pub const MODEL_VERSION: i64 = 1;

    pub fn pad_left(&self) -> usize {
        (self.kernel_size.saturating_sub(1)) / 2
    }

    pub fn pooled_len(&self) -> usize {
        self.input_len / self.pool_size.max(1)
    }

    pub fn flat_len(&self) -> usize {
        self.pooled_len() * self.filters
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.model_version != Self::MODEL_VERSION {
            return Err(format!(
                "Unsupported model_version {} (expected {})",
                self.model_version,
                Self::MODEL_VERSION
            ));
        }
        if self.input_len == 0 || self.filters == 0 || self.kernel_size == 0 {
            return Err("Model dimensions must be non-zero".to_string());
        }
        if self.pool_size == 0 || self.pooled_len() == 0 {
            return Err(format!(
                "pool_size {} does not fit input_len {}",
                self.pool_size, self.input_len
            ));
        }
        if self.n_classes == 0 {
            return Err("Model has no output classes".to_string());
        }
        if self.conv_weights.len() != self.filters * self.kernel_size {
            return Err("conv_weights length mismatch".to_string());
        }
        if self.conv_bias.len() != self.filters {
            return Err("conv_bias length mismatch".to_string());
        }
        if self.dense_weights.len() != self.n_classes * self.flat_len() {
            return Err("dense_weights length mismatch".to_string());
        }
        if self.dense_bias.len() != self.n_classes {
            return Err("dense_bias length mismatch".to_string());
        }
        let all_finite = self
            .conv_weights
            .iter()
            .chain(&self.conv_bias)
            .chain(&self.dense_weights)
            .chain(&self.dense_bias)
            .all(|v| v.is_finite());
        if !all_finite {
            return Err("Model weights contain non-finite values".to_string());
        }
        Ok(())
    }

    pub fn predict_proba(&self, features: &[f32]) -> Result<Vec<f32>, String> {
        if features.len() != self.input_len {
            return Err(format!(
                "Expected {} features, got {}",
                self.input_len,
                features.len()
            ));
        }
        Ok(self.forward(features).probs)
    }

    pub(super) fn forward(&self, features: &[f32]) -> ForwardPass {
        let len = self.input_len;
        let f_count = self.filters;
        let k_size = self.kernel_size;
        let mut padded = vec![0.0f32; len + k_size - 1];
        padded[self.pad_left()..self.pad_left() + len].copy_from_slice(&features[..len]);

        let mut conv_pre = vec![0.0f32; len * f_count];
        for t in 0..len {
            let window = &padded[t..t + k_size];
            for f in 0..f_count {
                let weights = &self.conv_weights[f * k_size..(f + 1) * k_size];
                let mut sum = self.conv_bias[f];
                for (w, x) in weights.iter().zip(window) {
                    sum += w * x;
                }
                conv_pre[t * f_count + f] = sum;
            }
        }

        let pooled_len = self.pooled_len();
        let pool = self.pool_size;
        let mut pooled = vec![0.0f32; pooled_len * f_count];
        let mut pool_argmax = vec![0usize; pooled_len * f_count];
        for p in 0..pooled_len {
            for f in 0..f_count {
                let mut best_t = p * pool;
                let mut best = f32::NEG_INFINITY;
                for t in p * pool..(p + 1) * pool {
                    let act = conv_pre[t * f_count + f].max(0.0);
                    if act > best {
                        best = act;
                        best_t = t;
                    }
                }
                pooled[p * f_count + f] = best;
                pool_argmax[p * f_count + f] = best_t;
            }
        }

        let flat = pooled.len();
        let logits: Vec<f32> = (0..self.n_classes)
            .map(|c| {
                let row = &self.dense_weights[c * flat..(c + 1) * flat];
                self.dense_bias[c] + row.iter().zip(&pooled).map(|(w, x)| w * x).sum::<f32>()
            })
            .collect();
        let probs = softmax(&logits);

        ForwardPass {
            padded,
            conv_pre,
            pooled,
            pool_argmax,
            probs,
        }
    }
}

impl Classifier for ConvNetModel {
    fn class_count(&self) -> usize {
        self.n_classes
    }

    fn infer(&self, features: &[f32]) -> Result<Vec<f32>, String> {
        self.predict_proba(features)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zero_model(input_len: usize, n_classes: usize) -> ConvNetModel {
        let filters = 2;
        let kernel_size = 3;
        let pool_size = 2;
        let flat = (input_len / pool_size) * filters;
        ConvNetModel {
            model_version: ConvNetModel::MODEL_VERSION,
            input_len,
            filters,
            kernel_size,
            pool_size,
            n_classes,
            conv_weights: vec![0.0; filters * kernel_size],
            conv_bias: vec![0.0; filters],
            dense_weights: vec![0.0; n_classes * flat],
            dense_bias: vec![0.0; n_classes],
        }
    }

    #[test]
    fn zero_weights_give_uniform_distribution() {
        let model = zero_model(10, 4);
        model.validate().unwrap();
        let probs = model.infer(&[1.0; 10]).unwrap();
        assert_eq!(probs.len(), 4);
        assert!(probs.iter().all(|p| (p - 0.25).abs() < 1e-6));
    }

    #[test]
    fn same_padding_keeps_sequence_length() {
        let mut model = zero_model(7, 2);
        model.kernel_size = 8;
        model.conv_weights = vec![1.0; model.filters * 8];
        let pass = model.forward(&[1.0; 7]);
        assert_eq!(pass.conv_pre.len(), 7 * model.filters);
        assert_eq!(model.pad_left(), 3);
        // Three zeros of left padding, then five real samples.
        assert_eq!(pass.conv_pre[0], 5.0);
    }

    #[test]
    fn wrong_input_width_is_rejected() {
        let model = zero_model(10, 2);
        assert!(model.infer(&[0.0; 9]).is_err());
    }

    #[test]
    fn validate_catches_shape_mismatch() {
        let mut model = zero_model(10, 3);
        model.dense_bias.pop();
        assert!(model.validate().is_err());
        let mut model = zero_model(10, 3);
        model.pool_size = 11;
        assert!(model.validate().is_err());
    }

    #[test]
    fn dense_bias_drives_prediction() {
        let mut model = zero_model(10, 3);
        model.dense_bias = vec![0.0, 5.0, 0.0];
        let probs = model.infer(&[0.0; 10]).unwrap();
        assert!(probs[1] > 0.9);
    }
}
