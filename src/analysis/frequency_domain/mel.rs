//! Slaney-style mel filterbank and MFCCs.

use super::{fft_frequencies, power_to_db, time_mean};

pub(crate) const N_MELS: usize = 128;
pub(crate) const N_MFCC: usize = 40;

const F_SP: f64 = 200.0 / 3.0;
const MIN_LOG_HZ: f64 = 1_000.0;
const MIN_LOG_MEL: f64 = MIN_LOG_HZ / F_SP;

fn log_step() -> f64 {
    6.4_f64.ln() / 27.0
}

pub(crate) fn hz_to_mel(hz: f64) -> f64 {
    if hz >= MIN_LOG_HZ {
        MIN_LOG_MEL + (hz / MIN_LOG_HZ).ln() / log_step()
    } else {
        hz / F_SP
    }
}

pub(crate) fn mel_to_hz(mel: f64) -> f64 {
    if mel >= MIN_LOG_MEL {
        MIN_LOG_HZ * (log_step() * (mel - MIN_LOG_MEL)).exp()
    } else {
        F_SP * mel
    }
}

/// Area-normalized triangular filters, stored sparsely as `(bin, weight)` pairs.
pub(crate) struct MelBank {
    filters: Vec<Vec<(usize, f64)>>,
}

impl MelBank {
    pub(crate) fn new(sample_rate: u32) -> Self {
        let fmax = sample_rate as f64 / 2.0;
        let mel_max = hz_to_mel(fmax);
        let mel_points: Vec<f64> = (0..N_MELS + 2)
            .map(|i| mel_to_hz(mel_max * i as f64 / (N_MELS + 1) as f64))
            .collect();
        let fft_freqs = fft_frequencies(sample_rate);
        let filters = (0..N_MELS)
            .map(|m| {
                let (left, center, right) = (mel_points[m], mel_points[m + 1], mel_points[m + 2]);
                let enorm = 2.0 / (right - left);
                fft_freqs
                    .iter()
                    .enumerate()
                    .filter_map(|(bin, &freq)| {
                        let lower = (freq - left) / (center - left);
                        let upper = (right - freq) / (right - center);
                        let weight = lower.min(upper);
                        (weight > 0.0).then_some((bin, weight * enorm))
                    })
                    .collect()
            })
            .collect();
        Self { filters }
    }

    /// Project power spectra onto the mel bands, frame by frame.
    pub(crate) fn apply(&self, power: &[Vec<f64>]) -> Vec<Vec<f64>> {
        power
            .iter()
            .map(|frame| {
                self.filters
                    .iter()
                    .map(|filter| {
                        filter
                            .iter()
                            .map(|&(bin, weight)| frame.get(bin).copied().unwrap_or(0.0) * weight)
                            .sum()
                    })
                    .collect()
            })
            .collect()
    }
}

/// Time-averaged mel power spectrum.
pub(crate) fn mel_mean(mel_power: &[Vec<f64>]) -> Vec<f64> {
    time_mean(mel_power, N_MELS)
}

/// Time-averaged MFCCs: dB-scaled mel power, orthonormal DCT-II, first [`N_MFCC`] terms.
pub(crate) fn mfcc_mean(mel_power: &[Vec<f64>]) -> Vec<f64> {
    let mel_db = power_to_db(mel_power);
    let basis = dct_basis(N_MELS, N_MFCC);
    let coefficients: Vec<Vec<f64>> = mel_db
        .iter()
        .map(|frame| {
            basis
                .iter()
                .map(|row| row.iter().zip(frame).map(|(b, v)| b * v).sum())
                .collect()
        })
        .collect();
    time_mean(&coefficients, N_MFCC)
}

fn dct_basis(n: usize, count: usize) -> Vec<Vec<f64>> {
    let n_f = n as f64;
    (0..count)
        .map(|k| {
            let scale = if k == 0 {
                (1.0 / n_f).sqrt()
            } else {
                (2.0 / n_f).sqrt()
            };
            (0..n)
                .map(|m| {
                    scale
                        * (std::f64::consts::PI * k as f64 * (m as f64 + 0.5) / n_f).cos()
                })
                .collect()
        })
        .collect()
}
