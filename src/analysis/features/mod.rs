// FeatureExtractor - MFCC feature extraction for speaker gender classification
//
// This module turns an audio clip into a fixed-size feature vector. Clips
// are resampled to the configured rate, truncated or zero-padded to the
// configured duration, transformed into MFCCs, and pooled over time.
//
// Module organization:
// - types: Data structures (FeatureVector, batch outcomes)
// - fft: Centred STFT power spectrogram with periodic Hann window
// - mel: Slaney mel filterbank
// - mfcc: Power-to-dB conversion and orthonormal DCT-II
// - mod.rs: Coordinator (FeatureExtractor)
//
// Output layout: [mean of each coefficient, population std of each
// coefficient], length 2 × n_mfcc.

mod fft;
mod mel;
mod mfcc;
mod types;

pub use types::{BatchExtraction, ExtractionOutcome, FeatureVector};

use std::path::{Path, PathBuf};

use fft::FftProcessor;
use mfcc::DctBasis;
use tracing::debug;

use crate::audio;
use crate::config::AudioConfig;
use crate::error::{log_extraction_error, ExtractionError};

/// FeatureExtractor coordinates the audio → MFCC statistics pipeline
///
/// Filterbank and DCT basis are computed once at construction and reused
/// for every clip.
pub struct FeatureExtractor {
    fft_processor: FftProcessor,
    mel_bank: Vec<Vec<f64>>,
    dct: DctBasis,
    sample_rate: u32,
    target_len: usize,
    n_mfcc: usize,
}

impl FeatureExtractor {
    /// Create a new FeatureExtractor from the audio configuration
    pub fn new(config: &AudioConfig) -> Self {
        Self {
            fft_processor: FftProcessor::new(config.n_fft, config.hop_length),
            mel_bank: mel::mel_filter_bank(config.n_mels, config.n_fft, config.sample_rate),
            dct: DctBasis::new(config.n_mfcc, config.n_mels),
            sample_rate: config.sample_rate,
            target_len: config.target_len(),
            n_mfcc: config.n_mfcc,
        }
    }

    /// Length of every vector this extractor produces
    pub fn feature_len(&self) -> usize {
        2 * self.n_mfcc
    }

    /// Number of samples in a normalized clip
    pub fn target_len(&self) -> usize {
        self.target_len
    }

    /// Load a clip at the configured rate, truncated or padded to the target length
    pub fn load_audio_fixed_length(&self, path: &Path) -> Result<Vec<f32>, ExtractionError> {
        let (samples, native_rate) = audio::load_wav(path)?;
        if samples.is_empty() {
            return Err(ExtractionError::EmptySignal {
                path: path.to_path_buf(),
            });
        }

        let samples = audio::resample(samples, native_rate, self.sample_rate).map_err(
            |reason| ExtractionError::Resample {
                path: path.to_path_buf(),
                reason,
            },
        )?;

        Ok(audio::fix_length(samples, self.target_len))
    }

    /// Extract the pooled MFCC feature vector for one file
    ///
    /// # Errors
    /// Any read, decode or resample failure is returned to the caller, who
    /// decides whether to skip the file or abort.
    pub fn extract_features(&self, path: &Path) -> Result<FeatureVector, ExtractionError> {
        let signal = self.load_audio_fixed_length(path)?;
        let features = self.extract_signal(&signal);
        debug!(
            "[FeatureExtractor] Extracted {} features from {}",
            features.len(),
            path.display()
        );
        Ok(features)
    }

    /// Extract features from in-memory samples already at the configured rate
    ///
    /// The buffer is normalized to the target length first, so callers may
    /// pass clips of any length.
    pub fn extract_signal(&self, samples: &[f32]) -> FeatureVector {
        let signal = audio::fix_length(samples.to_vec(), self.target_len);
        let mfcc_frames = self.compute_mfcc(&signal);
        pool_frames(&mfcc_frames, self.n_mfcc)
    }

    /// Extract features for many files, keeping one outcome per input
    ///
    /// Failures are logged and recorded but never abort the batch.
    pub fn extract_features_batch<P: AsRef<Path>>(&self, paths: &[P]) -> BatchExtraction {
        let outcomes = paths
            .iter()
            .map(|path| {
                let path = path.as_ref();
                match self.extract_features(path) {
                    Ok(features) => ExtractionOutcome::Extracted {
                        path: path.to_path_buf(),
                        features,
                    },
                    Err(error) => {
                        log_extraction_error(&error, "extract_features_batch");
                        ExtractionOutcome::Failed {
                            path: PathBuf::from(path),
                            error,
                        }
                    }
                }
            })
            .collect();

        BatchExtraction { outcomes }
    }

    /// MFCC matrix, one row of `n_mfcc` coefficients per frame
    fn compute_mfcc(&self, signal: &[f32]) -> Vec<Vec<f64>> {
        let spectrogram = self.fft_processor.power_spectrogram(signal);

        let mut mel_frames: Vec<Vec<f64>> = spectrogram
            .iter()
            .map(|power| {
                self.mel_bank
                    .iter()
                    .map(|filter| {
                        filter
                            .iter()
                            .zip(power)
                            .map(|(w, &p)| w * p as f64)
                            .sum()
                    })
                    .collect()
            })
            .collect();

        mfcc::power_to_db(&mut mel_frames);

        mel_frames.iter().map(|frame| self.dct.apply(frame)).collect()
    }
}

/// Mean and population standard deviation of each coefficient over time
fn pool_frames(frames: &[Vec<f64>], n_coeffs: usize) -> FeatureVector {
    let n_frames = frames.len().max(1) as f64;
    let mut means = vec![0.0; n_coeffs];
    for frame in frames {
        for (mean, value) in means.iter_mut().zip(frame) {
            *mean += value;
        }
    }
    for mean in means.iter_mut() {
        *mean /= n_frames;
    }

    let mut stds = vec![0.0; n_coeffs];
    for frame in frames {
        for ((var, value), mean) in stds.iter_mut().zip(frame).zip(&means) {
            *var += (value - mean).powi(2);
        }
    }
    for var in stds.iter_mut() {
        *var = (*var / n_frames).sqrt();
    }

    FeatureVector::from_stats(means, stds)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Generate pure sine wave for testing
    fn generate_sine_wave(sample_rate: u32, frequency: f32, duration_samples: usize) -> Vec<f32> {
        (0..duration_samples)
            .map(|i| {
                let t = i as f32 / sample_rate as f32;
                0.5 * (2.0 * std::f32::consts::PI * frequency * t).sin()
            })
            .collect()
    }

    /// Generate white noise for testing
    fn generate_white_noise(duration_samples: usize) -> Vec<f32> {
        use rand::Rng;
        let mut rng = rand::thread_rng();
        (0..duration_samples)
            .map(|_| rng.gen_range(-1.0..1.0))
            .collect()
    }

    fn write_wav(path: &Path, sample_rate: u32, samples: &[f32]) {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for &sample in samples {
            writer.write_sample(sample).unwrap();
        }
        writer.finalize().unwrap();
    }

    fn small_config() -> AudioConfig {
        AudioConfig {
            sample_rate: 8_000,
            duration_secs: 0.5,
            n_mfcc: 13,
            n_fft: 512,
            hop_length: 128,
            n_mels: 40,
        }
    }

    #[test]
    fn test_feature_vector_length() {
        let config = AudioConfig::default();
        let extractor = FeatureExtractor::new(&config);
        let features = extractor.extract_signal(&generate_sine_wave(16_000, 220.0, 32_000));
        assert_eq!(features.len(), 2 * config.n_mfcc);
        assert_eq!(extractor.feature_len(), 80);
        assert!(features.is_finite(), "features must not contain NaN/Inf");
    }

    #[test]
    fn test_silence_produces_finite_features() {
        let extractor = FeatureExtractor::new(&small_config());
        let features = extractor.extract_signal(&vec![0.0; 4_000]);
        assert_eq!(features.len(), 26);
        assert!(features.is_finite());
        // Silence is constant over time, so every std is zero
        assert!(features.stds().iter().all(|s| s.abs() < 1e-9));
    }

    #[test]
    fn test_noise_and_tone_differ() {
        let extractor = FeatureExtractor::new(&small_config());
        let tone = extractor.extract_signal(&generate_sine_wave(8_000, 300.0, 4_000));
        let noise = extractor.extract_signal(&generate_white_noise(4_000));
        assert!(tone.is_finite() && noise.is_finite());

        let distance: f64 = tone
            .means()
            .iter()
            .zip(noise.means())
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f64>()
            .sqrt();
        assert!(distance > 1.0, "tone and noise should separate, distance {}", distance);
    }

    #[test]
    fn test_short_and_long_signals_normalized() {
        let extractor = FeatureExtractor::new(&small_config());
        let short = extractor.extract_signal(&generate_sine_wave(8_000, 440.0, 1_000));
        let long = extractor.extract_signal(&generate_sine_wave(8_000, 440.0, 12_000));
        assert_eq!(short.len(), long.len());
        assert!(short.is_finite() && long.is_finite());
    }

    #[test]
    fn test_extract_features_from_file_with_resampling() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        write_wav(&path, 16_000, &generate_sine_wave(16_000, 440.0, 16_000));

        let extractor = FeatureExtractor::new(&small_config());
        let signal = extractor.load_audio_fixed_length(&path).unwrap();
        assert_eq!(signal.len(), extractor.target_len());

        let features = extractor.extract_features(&path).unwrap();
        assert_eq!(features.len(), 26);
        assert!(features.is_finite());
    }

    #[test]
    fn test_target_len_truncates_fractional_samples() {
        let config = AudioConfig {
            duration_secs: 0.10007,
            ..small_config()
        };
        // 8000 Hz × 0.10007 s = 800.56 samples
        let extractor = FeatureExtractor::new(&config);
        assert_eq!(extractor.target_len(), 800);
        assert_eq!(extractor.extract_signal(&[0.5; 10]).len(), extractor.feature_len());
    }

    #[test]
    fn test_extract_features_missing_file() {
        let extractor = FeatureExtractor::new(&small_config());
        let result = extractor.extract_features(Path::new("/nonexistent/clip.wav"));
        assert!(matches!(result, Err(ExtractionError::SourceMissing { .. })));
    }

    #[test]
    fn test_batch_keeps_per_item_outcomes() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.wav");
        write_wav(&good, 8_000, &generate_sine_wave(8_000, 200.0, 4_000));
        let corrupt = dir.path().join("corrupt.wav");
        std::fs::write(&corrupt, b"definitely not a wav").unwrap();
        let missing = dir.path().join("missing.wav");

        let extractor = FeatureExtractor::new(&small_config());
        let batch = extractor.extract_features_batch(&[&good, &corrupt, &missing]);

        assert_eq!(batch.outcomes.len(), 3);
        assert_eq!(batch.succeeded(), 1);
        assert_eq!(batch.failed(), 2);
        assert_eq!(batch.outcomes[0].path(), &good);
        let failures = batch.failures();
        assert_eq!(failures[0].0, &corrupt);
        assert!(matches!(failures[1].1, ExtractionError::SourceMissing { .. }));
    }

    #[test]
    fn test_empty_batch_distinct_from_all_failed() {
        let extractor = FeatureExtractor::new(&small_config());
        let empty = extractor.extract_features_batch::<PathBuf>(&[]);
        assert!(empty.is_empty());

        let all_failed = extractor.extract_features_batch(&[PathBuf::from("/nonexistent/a.wav")]);
        assert!(!all_failed.is_empty());
        assert_eq!(all_failed.succeeded(), 0);
    }

    #[test]
    fn test_pool_frames_population_std() {
        let frames = vec![vec![1.0, 10.0], vec![3.0, 10.0]];
        let pooled = pool_frames(&frames, 2);
        assert_eq!(pooled.means(), &[2.0, 10.0]);
        assert_eq!(pooled.stds(), &[1.0, 0.0]);
    }
}
