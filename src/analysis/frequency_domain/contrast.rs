//! Octave-band spectral contrast (peak versus valley energy).

use super::{N_BINS, fft_frequencies, power_to_db, time_mean};

pub(crate) const N_BANDS: usize = 6;
/// Rows produced: one per octave band plus the residual band above.
pub(crate) const N_CONTRAST: usize = N_BANDS + 1;

const FMIN: f64 = 200.0;
const QUANTILE: f64 = 0.02;

struct Band {
    bins: Vec<usize>,
    take: usize,
}

fn octave_bands(sample_rate: u32) -> Vec<Band> {
    let freqs = fft_frequencies(sample_rate);
    let mut edges = vec![0.0_f64];
    edges.extend((0..=N_BANDS).map(|k| FMIN * 2.0_f64.powi(k as i32)));
    edges
        .windows(2)
        .enumerate()
        .map(|(k, pair)| {
            let (low, high) = (pair[0], pair[1]);
            let mut mask: Vec<bool> = freqs.iter().map(|&f| f >= low && f <= high).collect();
            let first = mask.iter().position(|&m| m);
            let last = mask.iter().rposition(|&m| m);
            if k > 0 {
                if let Some(first) = first.filter(|&first| first > 0) {
                    mask[first - 1] = true;
                }
            }
            if k == N_BANDS {
                if let Some(last) = last {
                    for slot in mask.iter_mut().skip(last + 1) {
                        *slot = true;
                    }
                }
            }
            let selected = mask.iter().filter(|&&m| m).count();
            let take = ((QUANTILE * selected as f64).round_ties_even() as usize).max(1);
            let mut bins: Vec<usize> = (0..N_BINS).filter(|&bin| mask[bin]).collect();
            if k < N_BANDS {
                bins.pop();
            }
            Band { bins, take }
        })
        .collect()
}

/// Time-averaged contrast in dB for each of the [`N_CONTRAST`] bands.
pub(crate) fn contrast_mean(magnitude: &[Vec<f64>], sample_rate: u32) -> Vec<f64> {
    let bands = octave_bands(sample_rate);
    let mut peaks = Vec::with_capacity(magnitude.len());
    let mut valleys = Vec::with_capacity(magnitude.len());
    for frame in magnitude {
        let mut frame_peaks = Vec::with_capacity(N_CONTRAST);
        let mut frame_valleys = Vec::with_capacity(N_CONTRAST);
        for band in &bands {
            let mut values: Vec<f64> = band.bins.iter().map(|&bin| frame[bin]).collect();
            values.sort_by(f64::total_cmp);
            let take = band.take.min(values.len()).max(1);
            frame_valleys.push(mean(values.iter().take(take)));
            frame_peaks.push(mean(values.iter().rev().take(take)));
        }
        peaks.push(frame_peaks);
        valleys.push(frame_valleys);
    }
    let peak_db = power_to_db(&peaks);
    let valley_db = power_to_db(&valleys);
    let contrast: Vec<Vec<f64>> = peak_db
        .iter()
        .zip(&valley_db)
        .map(|(p, v)| p.iter().zip(v).map(|(p, v)| p - v).collect())
        .collect();
    time_mean(&contrast, N_CONTRAST)
}

fn mean<'a>(values: impl Iterator<Item = &'a f64>) -> f64 {
    let mut sum = 0.0;
    let mut count = 0usize;
    for value in values {
        sum += value;
        count += 1;
    }
    if count == 0 { 0.0 } else { sum / count as f64 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::audio::SAMPLE_RATE;

    #[test]
    fn seven_bands_cover_the_spectrum() {
        let bands = octave_bands(SAMPLE_RATE);
        assert_eq!(bands.len(), N_CONTRAST);
        assert!(bands.iter().all(|band| !band.bins.is_empty() && band.take >= 1));
        assert_eq!(bands[N_BANDS].bins.last().copied(), Some(N_BINS - 1));
        assert_eq!(bands[0].bins.first().copied(), Some(0));
    }

    #[test]
    fn flat_spectrum_has_zero_contrast() {
        let magnitude = vec![vec![0.5_f64; N_BINS]; 4];
        let contrast = contrast_mean(&magnitude, SAMPLE_RATE);
        assert_eq!(contrast.len(), N_CONTRAST);
        assert!(contrast.iter().all(|v| v.abs() < 1e-9));
    }

    #[test]
    fn peaky_band_has_positive_contrast() {
        let mut frame = vec![0.01_f64; N_BINS];
        frame[100] = 1.0;
        let contrast = contrast_mean(&[frame], SAMPLE_RATE);
        assert!(contrast.iter().any(|&v| v > 10.0));
        assert!(contrast.iter().all(|&v| v >= -1e-9));
    }
}
