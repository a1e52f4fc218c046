use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::info;

use super::ConvNetModel;
use crate::config::TrainingSettings;
use crate::ml::{TrainDataset, argmax};

#[derive(Debug, Clone)]
pub struct ConvNetOptions {
    pub filters: usize,
    pub kernel_size: usize,
    pub pool_size: usize,
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f32,
    pub seed: u64,
}

impl Default for ConvNetOptions {
    fn default() -> Self {
        Self::from(&TrainingSettings::default())
    }
}

impl From<&TrainingSettings> for ConvNetOptions {
    fn from(settings: &TrainingSettings) -> Self {
        Self {
            filters: settings.filters,
            kernel_size: settings.kernel_size,
            pool_size: settings.pool_size,
            epochs: settings.epochs,
            batch_size: settings.batch_size,
            learning_rate: settings.learning_rate,
            seed: settings.seed,
        }
    }
}

/// Loss and accuracy at the end of one pass over the training rows.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EpochStats {
    pub epoch: usize,
    pub train_loss: f32,
    pub train_accuracy: f32,
    pub val_loss: Option<f32>,
    pub val_accuracy: Option<f32>,
}

#[derive(Debug, Clone)]
pub struct ConvNetFit {
    pub model: ConvNetModel,
    pub history: Vec<EpochStats>,
}

const BETA1: f32 = 0.9;
const BETA2: f32 = 0.999;
const ADAM_EPSILON: f32 = 1e-7;
const LOSS_FLOOR: f32 = 1e-7;

struct AdamSlot {
    m: Vec<f32>,
    v: Vec<f32>,
}

impl AdamSlot {
    fn new(len: usize) -> Self {
        Self {
            m: vec![0.0; len],
            v: vec![0.0; len],
        }
    }

    fn step(&mut self, params: &mut [f32], grads: &[f32], lr_t: f32) {
        for (((p, &g), m), v) in params
            .iter_mut()
            .zip(grads)
            .zip(self.m.iter_mut())
            .zip(self.v.iter_mut())
        {
            *m = BETA1 * *m + (1.0 - BETA1) * g;
            *v = BETA2 * *v + (1.0 - BETA2) * g * g;
            *p -= lr_t * *m / (v.sqrt() + ADAM_EPSILON);
        }
    }
}

struct Gradients {
    conv_w: Vec<f32>,
    conv_b: Vec<f32>,
    dense_w: Vec<f32>,
    dense_b: Vec<f32>,
}

impl Gradients {
    fn zeros(model: &ConvNetModel) -> Self {
        Self {
            conv_w: vec![0.0; model.conv_weights.len()],
            conv_b: vec![0.0; model.conv_bias.len()],
            dense_w: vec![0.0; model.dense_weights.len()],
            dense_b: vec![0.0; model.dense_bias.len()],
        }
    }

    fn scale(&mut self, factor: f32) {
        for g in self
            .conv_w
            .iter_mut()
            .chain(self.conv_b.iter_mut())
            .chain(self.dense_w.iter_mut())
            .chain(self.dense_b.iter_mut())
        {
            *g *= factor;
        }
    }
}

/// Fit a [`ConvNetModel`] with Adam on cross-entropy, reporting validation each epoch.
pub fn train_conv_net(
    train: &TrainDataset,
    validation: &TrainDataset,
    options: &ConvNetOptions,
) -> Result<ConvNetFit, String> {
    if train.x.len() != train.y.len() || validation.x.len() != validation.y.len() {
        return Err("Mismatched X/Y lengths".to_string());
    }
    if train.x.is_empty() {
        return Err("Empty training set".to_string());
    }
    if train.n_classes < 2 {
        return Err("Need at least 2 classes".to_string());
    }
    if train.y.iter().chain(&validation.y).any(|&y| y >= train.n_classes) {
        return Err("Label index out of range".to_string());
    }
    let input_len = train.x[0].len();
    if train.x.iter().chain(&validation.x).any(|row| row.len() != input_len) {
        return Err("Rows have inconsistent widths".to_string());
    }

    let mut rng = StdRng::seed_from_u64(options.seed);
    let mut model = init_model(input_len, train.n_classes, options, &mut rng);
    model.validate()?;

    let batch_size = options.batch_size.max(1);
    let mut slots = [
        AdamSlot::new(model.conv_weights.len()),
        AdamSlot::new(model.conv_bias.len()),
        AdamSlot::new(model.dense_weights.len()),
        AdamSlot::new(model.dense_bias.len()),
    ];
    let mut step = 0i32;
    let mut indices: Vec<usize> = (0..train.len()).collect();
    let mut history = Vec::with_capacity(options.epochs);

    for epoch in 1..=options.epochs {
        indices.shuffle(&mut rng);
        for batch in indices.chunks(batch_size) {
            let mut grads = Gradients::zeros(&model);
            for &idx in batch {
                accumulate_gradients(&model, &train.x[idx], train.y[idx], &mut grads);
            }
            grads.scale(1.0 / batch.len() as f32);
            step += 1;
            let lr_t = options.learning_rate * (1.0 - BETA2.powi(step)).sqrt()
                / (1.0 - BETA1.powi(step));
            slots[0].step(&mut model.conv_weights, &grads.conv_w, lr_t);
            slots[1].step(&mut model.conv_bias, &grads.conv_b, lr_t);
            slots[2].step(&mut model.dense_weights, &grads.dense_w, lr_t);
            slots[3].step(&mut model.dense_bias, &grads.dense_b, lr_t);
        }

        let (train_loss, train_accuracy) = loss_and_accuracy(&model, train);
        let (val_loss, val_accuracy) = if validation.is_empty() {
            (None, None)
        } else {
            let (loss, acc) = loss_and_accuracy(&model, validation);
            (Some(loss), Some(acc))
        };
        info!(
            epoch,
            epochs = options.epochs,
            train_loss,
            train_accuracy,
            val_loss = ?val_loss,
            val_accuracy = ?val_accuracy,
            "Epoch finished"
        );
        history.push(EpochStats {
            epoch,
            train_loss,
            train_accuracy,
            val_loss,
            val_accuracy,
        });
    }

    model.validate()?;
    Ok(ConvNetFit { model, history })
}

fn init_model(
    input_len: usize,
    n_classes: usize,
    options: &ConvNetOptions,
    rng: &mut StdRng,
) -> ConvNetModel {
    let filters = options.filters.max(1);
    let kernel_size = options.kernel_size.max(1);
    let pool_size = options.pool_size.max(1);
    let flat = (input_len / pool_size) * filters;
    let conv_limit = (6.0 / (kernel_size + kernel_size * filters) as f32).sqrt();
    let dense_limit = (6.0 / (flat + n_classes).max(1) as f32).sqrt();
    ConvNetModel {
        model_version: ConvNetModel::MODEL_VERSION,
        input_len,
        filters,
        kernel_size,
        pool_size,
        n_classes,
        conv_weights: (0..filters * kernel_size)
            .map(|_| rng.random_range(-conv_limit..conv_limit))
            .collect(),
        conv_bias: vec![0.0; filters],
        dense_weights: (0..n_classes * flat)
            .map(|_| rng.random_range(-dense_limit..dense_limit))
            .collect(),
        dense_bias: vec![0.0; n_classes],
    }
}

fn accumulate_gradients(model: &ConvNetModel, x: &[f32], y: usize, grads: &mut Gradients) {
    let pass = model.forward(x);
    let f_count = model.filters;
    let k_size = model.kernel_size;
    let flat = pass.pooled.len();

    let d_logits: Vec<f32> = pass
        .probs
        .iter()
        .enumerate()
        .map(|(c, &p)| if c == y { p - 1.0 } else { p })
        .collect();

    let mut d_pooled = vec![0.0f32; flat];
    for (c, &dz) in d_logits.iter().enumerate() {
        grads.dense_b[c] += dz;
        let base = c * flat;
        for j in 0..flat {
            grads.dense_w[base + j] += dz * pass.pooled[j];
            d_pooled[j] += dz * model.dense_weights[base + j];
        }
    }

    for (j, &d) in d_pooled.iter().enumerate() {
        let f = j % f_count;
        let t = pass.pool_argmax[j];
        if pass.conv_pre[t * f_count + f] <= 0.0 {
            continue;
        }
        grads.conv_b[f] += d;
        let window = &pass.padded[t..t + k_size];
        let row = &mut grads.conv_w[f * k_size..(f + 1) * k_size];
        for (g, &xv) in row.iter_mut().zip(window) {
            *g += d * xv;
        }
    }
}

fn loss_and_accuracy(model: &ConvNetModel, data: &TrainDataset) -> (f32, f32) {
    if data.is_empty() {
        return (0.0, 0.0);
    }
    let mut loss = 0.0f64;
    let mut correct = 0usize;
    for (row, &y) in data.x.iter().zip(&data.y) {
        let probs = model.forward(row).probs;
        loss -= (probs[y].max(LOSS_FLOOR) as f64).ln();
        if argmax(&probs) == Some(y) {
            correct += 1;
        }
    }
    let n = data.len() as f64;
    ((loss / n) as f32, (correct as f64 / n) as f32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn separable(n_per_class: usize, width: usize) -> TrainDataset {
        let mut rng = StdRng::seed_from_u64(3);
        let mut x = Vec::new();
        let mut y = Vec::new();
        for class in 0..2 {
            for _ in 0..n_per_class {
                let sign = if class == 0 { -1.0 } else { 1.0 };
                x.push(
                    (0..width)
                        .map(|_| sign + rng.random_range(-0.3f32..0.3))
                        .collect(),
                );
                y.push(class);
            }
        }
        TrainDataset { x, y, n_classes: 2 }
    }

    fn small_options() -> ConvNetOptions {
        ConvNetOptions {
            filters: 4,
            kernel_size: 3,
            pool_size: 4,
            epochs: 30,
            batch_size: 8,
            learning_rate: 0.01,
            seed: 42,
        }
    }

    #[test]
    fn learns_a_separable_problem() {
        let train = separable(20, 16);
        let validation = separable(5, 16);
        let fit = train_conv_net(&train, &validation, &small_options()).unwrap();
        let last = fit.history.last().unwrap();
        assert_eq!(fit.history.len(), 30);
        assert!(last.train_accuracy > 0.9);
        assert!(last.val_accuracy.unwrap() > 0.9);
        assert!(last.train_loss < fit.history[0].train_loss);
    }

    #[test]
    fn training_is_reproducible_for_a_seed() {
        let train = separable(6, 8);
        let mut options = small_options();
        options.epochs = 3;
        let a = train_conv_net(&train, &TrainDataset::default(), &options).unwrap();
        let b = train_conv_net(&train, &TrainDataset::default(), &options).unwrap();
        assert_eq!(a.model, b.model);
        assert!(a.history.iter().all(|epoch| epoch.val_loss.is_none()));
    }

    #[test]
    fn rejects_degenerate_inputs() {
        let options = small_options();
        let empty = TrainDataset {
            n_classes: 2,
            ..TrainDataset::default()
        };
        assert!(train_conv_net(&empty, &TrainDataset::default(), &options).is_err());
        let mut one_class = separable(3, 8);
        one_class.n_classes = 1;
        one_class.y = vec![0; one_class.x.len()];
        assert!(train_conv_net(&one_class, &TrainDataset::default(), &options).is_err());
    }

    #[test]
    fn default_options_follow_training_settings() {
        let options = ConvNetOptions::default();
        assert_eq!(options.filters, 16);
        assert_eq!(options.kernel_size, 8);
        assert_eq!(options.pool_size, 8);
        assert_eq!(options.epochs, 100);
        assert_eq!(options.batch_size, 32);
    }
}
