// Mel module - Slaney-scale mel filterbank
//
// The Slaney scale is linear below 1 kHz (200/3 Hz per mel) and logarithmic
// above. Filters are triangular and area-normalised (2 / bandwidth) so each
// band has roughly constant energy per Hz.

const F_SP: f64 = 200.0 / 3.0;
const MIN_LOG_HZ: f64 = 1000.0;
const MIN_LOG_MEL: f64 = MIN_LOG_HZ / F_SP;

fn log_step() -> f64 {
    6.4f64.ln() / 27.0
}

/// Convert frequency in Hz to the Slaney mel scale
pub fn hz_to_mel(hz: f64) -> f64 {
    if hz >= MIN_LOG_HZ {
        MIN_LOG_MEL + (hz / MIN_LOG_HZ).ln() / log_step()
    } else {
        hz / F_SP
    }
}

/// Convert a Slaney mel value back to Hz
pub fn mel_to_hz(mel: f64) -> f64 {
    if mel >= MIN_LOG_MEL {
        MIN_LOG_HZ * (log_step() * (mel - MIN_LOG_MEL)).exp()
    } else {
        F_SP * mel
    }
}

/// Build the mel filterbank matrix
///
/// Returns `[n_mels][n_fft / 2 + 1]` weights spanning 0 Hz to Nyquist.
pub fn mel_filter_bank(n_mels: usize, n_fft: usize, sample_rate: u32) -> Vec<Vec<f64>> {
    let n_bins = n_fft / 2 + 1;
    let nyquist = sample_rate as f64 / 2.0;

    let fft_freqs: Vec<f64> = (0..n_bins)
        .map(|k| k as f64 * sample_rate as f64 / n_fft as f64)
        .collect();

    let max_mel = hz_to_mel(nyquist);
    let mel_points: Vec<f64> = (0..n_mels + 2)
        .map(|i| mel_to_hz(max_mel * i as f64 / (n_mels + 1) as f64))
        .collect();

    (0..n_mels)
        .map(|m| {
            let lower_edge = mel_points[m];
            let center = mel_points[m + 1];
            let upper_edge = mel_points[m + 2];
            let enorm = 2.0 / (upper_edge - lower_edge);

            fft_freqs
                .iter()
                .map(|&freq| {
                    let rising = (freq - lower_edge) / (center - lower_edge);
                    let falling = (upper_edge - freq) / (upper_edge - center);
                    rising.min(falling).max(0.0) * enorm
                })
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hz_mel_roundtrip() {
        for &hz in &[0.0, 100.0, 440.0, 999.0, 1000.0, 4000.0, 8000.0] {
            let back = mel_to_hz(hz_to_mel(hz));
            assert!((hz - back).abs() < 1e-6, "roundtrip failed for {} Hz", hz);
        }
    }

    #[test]
    fn test_linear_region() {
        assert!((hz_to_mel(200.0) - 3.0).abs() < 1e-9);
        assert!((hz_to_mel(1000.0) - 15.0).abs() < 1e-9);
    }

    #[test]
    fn test_mel_filter_bank_shape() {
        let bank = mel_filter_bank(128, 2048, 16_000);
        assert_eq!(bank.len(), 128);
        assert_eq!(bank[0].len(), 1025);

        for (m, filter) in bank.iter().enumerate() {
            assert!(filter.iter().all(|&w| w >= 0.0));
            assert!(
                filter.iter().any(|&w| w > 0.0),
                "filter {} has no support",
                m
            );
        }
    }
}
