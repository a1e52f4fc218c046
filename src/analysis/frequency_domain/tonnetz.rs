//! Tonal centroid projection of chroma (fifths, minor and major thirds).

use super::chroma::N_CHROMA;
use super::time_mean;

pub(crate) const N_TONNETZ: usize = 6;

fn projection() -> [[f64; N_CHROMA]; N_TONNETZ] {
    const SCALE: [f64; N_TONNETZ] = [7.0 / 6.0, 7.0 / 6.0, 1.5, 1.5, 2.0 / 3.0, 2.0 / 3.0];
    const RADIUS: [f64; N_TONNETZ] = [1.0, 1.0, 1.0, 1.0, 0.5, 0.5];
    let mut phi = [[0.0_f64; N_CHROMA]; N_TONNETZ];
    for (row, out) in phi.iter_mut().enumerate() {
        for (pitch, slot) in out.iter_mut().enumerate() {
            let mut v = SCALE[row] * pitch as f64;
            if row % 2 == 0 {
                v -= 0.5;
            }
            *slot = RADIUS[row] * (std::f64::consts::PI * v).cos();
        }
    }
    phi
}

/// Time-averaged tonnetz of per-frame chroma (each frame L1-normalized first).
pub(crate) fn tonnetz_mean(chroma: &[Vec<f64>]) -> Vec<f64> {
    let phi = projection();
    let frames: Vec<Vec<f64>> = chroma
        .iter()
        .map(|frame| {
            let total: f64 = frame.iter().map(|v| v.abs()).sum();
            let scale = if total > f64::MIN_POSITIVE { 1.0 / total } else { 1.0 };
            phi.iter()
                .map(|row| row.iter().zip(frame).map(|(p, c)| p * c * scale).sum())
                .collect()
        })
        .collect();
    time_mean(&frames, N_TONNETZ)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_chroma_is_at_the_origin() {
        let tonnetz = tonnetz_mean(&[vec![1.0; N_CHROMA]]);
        assert_eq!(tonnetz.len(), N_TONNETZ);
        assert!(tonnetz.iter().all(|v| v.abs() < 1e-9));
    }

    #[test]
    fn single_pitch_class_lands_on_the_unit_circles() {
        let mut frame = vec![0.0; N_CHROMA];
        frame[0] = 3.0;
        let tonnetz = tonnetz_mean(&[frame]);
        // Pitch class C: sin/cos pairs at angle zero.
        let expected = [0.0, 1.0, 0.0, 1.0, 0.0, 0.5];
        for (got, want) in tonnetz.iter().zip(expected) {
            assert!((got - want).abs() < 1e-9);
        }
    }

    #[test]
    fn silent_chroma_gives_zero_tonnetz() {
        assert_eq!(tonnetz_mean(&[vec![0.0; N_CHROMA]]), vec![0.0; N_TONNETZ]);
    }
}
