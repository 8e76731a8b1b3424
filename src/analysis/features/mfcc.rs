// MFCC module - mel power to cepstral coefficients
//
// Mel band powers are converted to decibels (floor 1e-10, dynamic range
// clamped to 80 dB below the loudest cell of the clip) and decorrelated
// with an orthonormal DCT-II over the mel axis.

use std::f64::consts::PI;

/// Power floor applied before the log to keep silence finite
const AMIN: f64 = 1e-10;

/// Dynamic range kept below the loudest mel cell
const TOP_DB: f64 = 80.0;

/// Convert a mel power spectrogram (frames × mels) to decibels in place
pub fn power_to_db(mel_frames: &mut [Vec<f64>]) {
    let mut max_db = f64::NEG_INFINITY;
    for frame in mel_frames.iter_mut() {
        for value in frame.iter_mut() {
            *value = 10.0 * value.max(AMIN).log10();
            max_db = max_db.max(*value);
        }
    }

    let floor = max_db - TOP_DB;
    for frame in mel_frames.iter_mut() {
        for value in frame.iter_mut() {
            *value = value.max(floor);
        }
    }
}

/// Orthonormal DCT-II basis truncated to the first `n_coeffs` rows
pub struct DctBasis {
    rows: Vec<Vec<f64>>,
}

impl DctBasis {
    pub fn new(n_coeffs: usize, n_inputs: usize) -> Self {
        let n = n_inputs as f64;
        let rows = (0..n_coeffs)
            .map(|k| {
                let scale = if k == 0 {
                    (1.0 / n).sqrt()
                } else {
                    (2.0 / n).sqrt()
                };
                (0..n_inputs)
                    .map(|i| scale * (PI * k as f64 * (2.0 * i as f64 + 1.0) / (2.0 * n)).cos())
                    .collect()
            })
            .collect();
        Self { rows }
    }

    /// Project one frame of log-mel energies onto the basis
    pub fn apply(&self, frame: &[f64]) -> Vec<f64> {
        self.rows
            .iter()
            .map(|row| row.iter().zip(frame).map(|(w, x)| w * x).sum())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_power_to_db_floor_and_top_db() {
        let mut frames = vec![vec![1.0, 1e-12, 1e-9]];
        power_to_db(&mut frames);
        assert!((frames[0][0] - 0.0).abs() < 1e-9);
        // 1e-12 hits the amin floor (-100 dB) then the top_db clamp (-80 dB)
        assert!((frames[0][1] + 80.0).abs() < 1e-9);
        assert!((frames[0][2] + 80.0).abs() < 1e-9);
    }

    #[test]
    fn test_power_to_db_silence_is_finite() {
        let mut frames = vec![vec![0.0; 8]; 4];
        power_to_db(&mut frames);
        assert!(frames.iter().flatten().all(|v| (*v + 100.0).abs() < 1e-9));
    }

    #[test]
    fn test_dct_constant_input_energy_in_first_coefficient() {
        let basis = DctBasis::new(4, 16);
        let coeffs = basis.apply(&vec![1.0; 16]);
        assert!((coeffs[0] - 4.0).abs() < 1e-9, "sqrt(16) * 1.0 expected, got {}", coeffs[0]);
        for c in &coeffs[1..] {
            assert!(c.abs() < 1e-9);
        }
    }

    #[test]
    fn test_dct_rows_are_orthonormal() {
        let basis = DctBasis::new(6, 6);
        for a in 0..6 {
            for b in 0..6 {
                let dot: f64 = basis.rows[a].iter().zip(&basis.rows[b]).map(|(x, y)| x * y).sum();
                let expected = if a == b { 1.0 } else { 0.0 };
                assert!((dot - expected).abs() < 1e-9);
            }
        }
    }
}
