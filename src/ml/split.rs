use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

/// Shuffle `0..n` with `seed` and cut off `ceil(n * validation_fraction)` validation indices.
///
/// At least one training index is kept whenever `n > 0`.
pub fn train_validation_split(
    n: usize,
    validation_fraction: f32,
    seed: u64,
) -> (Vec<usize>, Vec<usize>) {
    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);
    let fraction = validation_fraction.clamp(0.0, 1.0) as f64;
    let n_val = ((n as f64 * fraction).ceil() as usize).min(n.saturating_sub(1));
    let validation = indices.split_off(n - n_val);
    (indices, validation)
}
