// FFT module - short-time Fourier transform
//
// This module frames a fixed-length signal, applies a periodic Hann window
// and computes the power spectrum of every frame. Frames are centred: the
// signal is zero-padded by n_fft / 2 on both sides, so frame t covers
// samples [t * hop - n_fft / 2, t * hop + n_fft / 2).

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

/// FFT processor that computes power spectrograms from audio clips
pub struct FftProcessor {
    fft: Arc<dyn Fft<f32>>,
    fft_size: usize,
    hop_length: usize,
    /// Periodic Hann window (pre-computed)
    window: Vec<f32>,
}

impl FftProcessor {
    /// Create a new FFT processor
    ///
    /// # Arguments
    /// * `fft_size` - Frame size in samples
    /// * `hop_length` - Distance between frame starts in samples
    pub fn new(fft_size: usize, hop_length: usize) -> Self {
        // Periodic window (denominator N, not N - 1) to match spectral analysis convention
        let window = (0..fft_size)
            .map(|i| {
                0.5 * (1.0 - ((2.0 * std::f32::consts::PI * i as f32) / fft_size as f32).cos())
            })
            .collect();

        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(fft_size);

        Self {
            fft,
            fft_size,
            hop_length,
            window,
        }
    }

    /// Number of positive-frequency bins per frame
    pub fn n_bins(&self) -> usize {
        self.fft_size / 2 + 1
    }

    /// Number of centred frames produced for a signal of `len` samples
    pub fn n_frames(&self, len: usize) -> usize {
        1 + len / self.hop_length
    }

    /// Compute the power spectrogram of a signal
    ///
    /// # Returns
    /// One row per frame, each of size `fft_size / 2 + 1`, holding |X[k]|²
    pub fn power_spectrogram(&self, signal: &[f32]) -> Vec<Vec<f32>> {
        let pad = (self.fft_size / 2) as isize;
        let n_frames = self.n_frames(signal.len());
        let mut frames = Vec::with_capacity(n_frames);
        let mut buffer: Vec<Complex<f32>> = vec![Complex::new(0.0, 0.0); self.fft_size];

        for frame in 0..n_frames {
            let start = (frame * self.hop_length) as isize - pad;
            for (i, slot) in buffer.iter_mut().enumerate() {
                let idx = start + i as isize;
                let sample = if idx >= 0 && (idx as usize) < signal.len() {
                    signal[idx as usize]
                } else {
                    0.0
                };
                *slot = Complex::new(sample * self.window[i], 0.0);
            }

            self.fft.process(&mut buffer);

            frames.push(
                buffer[..self.n_bins()]
                    .iter()
                    .map(|c| c.norm_sqr())
                    .collect(),
            );
        }

        frames
    }
}
