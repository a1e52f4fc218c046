use rustfft::{FftPlanner, num_complex::Complex};

use super::{HOP_LENGTH, N_BINS, N_FFT};

/// Complex short-time spectrum, one `Vec` of [`N_BINS`] values per frame.
pub(crate) struct Stft {
    frames: Vec<Vec<Complex<f64>>>,
}

impl Stft {
    /// Centered STFT with zero padding of `N_FFT / 2` on both sides.
    pub(crate) fn compute(samples: &[f32]) -> Self {
        let window = periodic_hann(N_FFT);
        let padded = pad_center(samples, N_FFT / 2);
        let frame_count = if padded.len() >= N_FFT {
            1 + (padded.len() - N_FFT) / HOP_LENGTH
        } else {
            0
        };
        let mut planner = FftPlanner::<f64>::new();
        let fft = planner.plan_fft_forward(N_FFT);
        let mut buffer = vec![Complex::new(0.0, 0.0); N_FFT];
        let mut frames = Vec::with_capacity(frame_count);
        for frame in 0..frame_count {
            let start = frame * HOP_LENGTH;
            for (slot, (&sample, &w)) in buffer
                .iter_mut()
                .zip(padded[start..start + N_FFT].iter().zip(window.iter()))
            {
                *slot = Complex::new(sample * w, 0.0);
            }
            fft.process(&mut buffer);
            frames.push(buffer[..N_BINS].to_vec());
        }
        Self { frames }
    }

    pub(crate) fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// `|X|` per frame and bin.
    pub(crate) fn magnitude(&self) -> Vec<Vec<f64>> {
        self.frames
            .iter()
            .map(|frame| frame.iter().map(|c| c.norm()).collect())
            .collect()
    }
}

/// `|X|²` from a magnitude spectrogram.
pub(crate) fn power_from_magnitude(magnitude: &[Vec<f64>]) -> Vec<Vec<f64>> {
    magnitude
        .iter()
        .map(|frame| frame.iter().map(|m| m * m).collect())
        .collect()
}

pub(crate) fn periodic_hann(size: usize) -> Vec<f64> {
    let factor = 2.0 * std::f64::consts::PI / size.max(1) as f64;
    (0..size)
        .map(|i| 0.5 - 0.5 * (i as f64 * factor).cos())
        .collect()
}

fn pad_center(samples: &[f32], pad: usize) -> Vec<f64> {
    let mut padded = vec![0.0_f64; samples.len() + 2 * pad];
    for (slot, &sample) in padded[pad..pad + samples.len()].iter_mut().zip(samples) {
        *slot = sample as f64;
    }
    padded
}
