//! Twelve-bin pitch-class energy from a magnitude spectrogram.

use super::{N_BINS, N_FFT};

pub(crate) const N_CHROMA: usize = 12;

const CENTER_OCTAVE: f64 = 5.0;
const OCTAVE_WIDTH: f64 = 2.0;

/// Gaussian chroma filterbank, rows rotated so index 0 is C. Tuning is fixed at A440.
pub(crate) struct ChromaBank {
    weights: Vec<Vec<f64>>,
}

impl ChromaBank {
    pub(crate) fn new(sample_rate: u32) -> Self {
        let n_chroma = N_CHROMA as f64;
        let a440_base = 440.0 / 16.0;
        let mut frqbins: Vec<f64> = (1..N_FFT)
            .map(|k| {
                let freq = k as f64 * sample_rate as f64 / N_FFT as f64;
                n_chroma * (freq / a440_base).log2()
            })
            .collect();
        frqbins.insert(0, frqbins[0] - 1.5 * n_chroma);
        let mut binwidth: Vec<f64> = frqbins
            .windows(2)
            .map(|pair| (pair[1] - pair[0]).max(1.0))
            .collect();
        binwidth.push(1.0);

        let half = (n_chroma / 2.0).round();
        let mut weights = vec![vec![0.0_f64; N_FFT]; N_CHROMA];
        for (c, row) in weights.iter_mut().enumerate() {
            for (k, slot) in row.iter_mut().enumerate() {
                let d = (frqbins[k] - c as f64 + half + 10.0 * n_chroma).rem_euclid(n_chroma) - half;
                let scaled = 2.0 * d / binwidth[k];
                *slot = (-0.5 * scaled * scaled).exp();
            }
        }
        for k in 0..N_FFT {
            let norm = weights.iter().map(|row| row[k] * row[k]).sum::<f64>().sqrt();
            let octave = (frqbins[k] / n_chroma - CENTER_OCTAVE) / OCTAVE_WIDTH;
            let dominance = (-0.5 * octave * octave).exp();
            for row in weights.iter_mut() {
                if norm > 0.0 {
                    row[k] /= norm;
                }
                row[k] *= dominance;
            }
        }
        weights.rotate_left(3);
        for row in weights.iter_mut() {
            row.truncate(N_BINS);
        }
        Self { weights }
    }

    /// Per-frame chroma, each frame scaled so its largest bin is 1.
    pub(crate) fn apply(&self, magnitude: &[Vec<f64>]) -> Vec<Vec<f64>> {
        magnitude
            .iter()
            .map(|frame| {
                let mut chroma: Vec<f64> = self
                    .weights
                    .iter()
                    .map(|row| row.iter().zip(frame).map(|(w, m)| w * m).sum())
                    .collect();
                let peak = chroma.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
                if peak > f64::MIN_POSITIVE {
                    for value in chroma.iter_mut() {
                        *value /= peak;
                    }
                }
                chroma
            })
            .collect()
    }
}
