//! Median-filter harmonic/percussive separation on a magnitude spectrogram.

const KERNEL: usize = 31;
const MASK_POWER: i32 = 2;

/// Harmonic part of `magnitude`: a soft mask built from a time-axis median
/// (harmonic) against a frequency-axis median (percussive), applied to the input.
pub(crate) fn harmonic_magnitude(magnitude: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let frames = magnitude.len();
    let bins = magnitude.first().map_or(0, Vec::len);
    if frames == 0 || bins == 0 {
        return magnitude.to_vec();
    }

    let mut harmonic = vec![vec![0.0_f64; bins]; frames];
    let mut line = vec![0.0_f64; frames];
    for bin in 0..bins {
        for (t, slot) in line.iter_mut().enumerate() {
            *slot = magnitude[t][bin];
        }
        let filtered = median_filter_reflect(&line, KERNEL);
        for (t, value) in filtered.into_iter().enumerate() {
            harmonic[t][bin] = value;
        }
    }
    let percussive: Vec<Vec<f64>> = magnitude
        .iter()
        .map(|frame| median_filter_reflect(frame, KERNEL))
        .collect();

    magnitude
        .iter()
        .zip(harmonic.iter().zip(&percussive))
        .map(|(frame, (harm, perc))| {
            frame
                .iter()
                .zip(harm.iter().zip(perc))
                .map(|(&m, (&h, &p))| m * soft_mask(h, p))
                .collect()
        })
        .collect()
}

fn soft_mask(x: f64, reference: f64) -> f64 {
    let z = x.max(reference);
    if z < f64::MIN_POSITIVE {
        return 0.0;
    }
    let mask = (x / z).powi(MASK_POWER);
    let ref_mask = (reference / z).powi(MASK_POWER);
    mask / (mask + ref_mask)
}

/// Sliding median with mirrored edges (`d c b a | a b c d | d c b a`).
fn median_filter_reflect(values: &[f64], kernel: usize) -> Vec<f64> {
    let n = values.len();
    let half = kernel / 2;
    let mut window = Vec::with_capacity(kernel);
    (0..n)
        .map(|i| {
            window.clear();
            for offset in 0..kernel {
                let pos = i as isize + offset as isize - half as isize;
                window.push(values[reflect_index(pos, n)]);
            }
            window.sort_by(f64::total_cmp);
            window[kernel / 2]
        })
        .collect()
}

fn reflect_index(pos: isize, len: usize) -> usize {
    let len = len as isize;
    let period = 2 * len;
    let mut p = pos.rem_euclid(period);
    if p >= len {
        p = period - 1 - p;
    }
    p as usize
}
