use super::CANONICAL_LEN;

/// Loudness every non-silent clip is scaled to.
pub const TARGET_RMS: f32 = 0.05;
const PRE_EMPHASIS: f32 = 0.97;

/// Normalize loudness, pre-emphasize, clip and fix the length of a decoded clip.
pub fn condition(mut samples: Vec<f32>) -> Vec<f32> {
    normalize_rms(&mut samples, TARGET_RMS);
    pre_emphasis(&mut samples);
    for sample in samples.iter_mut() {
        *sample = sample.clamp(-1.0, 1.0);
    }
    fix_length(&mut samples, CANONICAL_LEN);
    samples
}

/// Root-mean-square level; accumulated serially in `f64` so every CPU agrees.
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = samples.iter().map(|&s| s as f64 * s as f64).sum();
    (sum_sq / samples.len() as f64).sqrt() as f32
}

/// Scale to `target` RMS. Silence (RMS exactly zero) is left untouched.
pub fn normalize_rms(samples: &mut [f32], target: f32) {
    let level = rms(samples);
    if level == 0.0 || !level.is_finite() {
        return;
    }
    let gain = target / level;
    for sample in samples.iter_mut() {
        *sample *= gain;
    }
}

/// First-order pre-emphasis: `y'[0] = y[0]`, `y'[i] = y[i] - 0.97 * y[i-1]`.
pub fn pre_emphasis(samples: &mut [f32]) {
    let mut previous = match samples.first() {
        Some(&first) => first,
        None => return,
    };
    for sample in samples.iter_mut().skip(1) {
        let current = *sample;
        *sample = current - PRE_EMPHASIS * previous;
        previous = current;
    }
}

/// Zero-pad on the right or keep only the first `len` samples.
pub fn fix_length(samples: &mut Vec<f32>, len: usize) {
    samples.resize(len, 0.0);
}
