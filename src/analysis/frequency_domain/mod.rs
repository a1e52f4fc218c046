//! Spectral features computed from the conditioned clip.

pub(crate) mod chroma;
pub(crate) mod contrast;
pub(crate) mod harmonic;
pub(crate) mod mel;
pub(crate) mod stft;
pub(crate) mod tonnetz;

pub(crate) const N_FFT: usize = 2048;
pub(crate) const HOP_LENGTH: usize = 512;
pub(crate) const N_BINS: usize = N_FFT / 2 + 1;

const AMIN: f64 = 1e-10;
const TOP_DB: f64 = 80.0;

/// Center frequency of every rfft bin: `linspace(0, sr / 2, N_BINS)`.
pub(crate) fn fft_frequencies(sample_rate: u32) -> Vec<f64> {
    let nyquist = sample_rate as f64 / 2.0;
    (0..N_BINS)
        .map(|bin| nyquist * bin as f64 / (N_BINS - 1) as f64)
        .collect()
}

/// `10 log10(max(AMIN, x))`, floored at `TOP_DB` below the global maximum.
pub(crate) fn power_to_db(power: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let mut db: Vec<Vec<f64>> = power
        .iter()
        .map(|row| row.iter().map(|&p| 10.0 * p.max(AMIN).log10()).collect())
        .collect();
    let peak = db
        .iter()
        .flatten()
        .copied()
        .fold(f64::NEG_INFINITY, f64::max);
    if peak.is_finite() {
        let floor = peak - TOP_DB;
        for value in db.iter_mut().flatten() {
            *value = value.max(floor);
        }
    }
    db
}

/// Column means of a frame-major matrix with `width` columns.
pub(crate) fn time_mean(frames: &[Vec<f64>], width: usize) -> Vec<f64> {
    let mut sums = vec![0.0_f64; width];
    for frame in frames {
        for (sum, &value) in sums.iter_mut().zip(frame) {
            *sum += value;
        }
    }
    let count = frames.len().max(1) as f64;
    sums.into_iter().map(|sum| sum / count).collect()
}
