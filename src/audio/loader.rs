// Loader - WAV decoding and fixed-length normalization
//
// Clips are decoded to mono f32 in [-1.0, 1.0]. Multi-channel files are
// mixed down by averaging each frame. Fixed-length normalization is
// deterministic and lossy: long clips lose their tail, short clips are
// right-padded with silence.

use std::path::Path;

use crate::error::ExtractionError;

/// Extensions (lower-case) accepted by the loader
pub const SUPPORTED_EXTENSIONS: &[&str] = &["wav"];

/// Check whether a path has a supported audio extension (case-insensitive)
pub fn is_supported_audio(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|supported| ext.eq_ignore_ascii_case(supported))
        })
        .unwrap_or(false)
}

/// Decode a WAV file to mono samples
///
/// # Returns
/// * `Ok((samples, sample_rate))` - Mono PCM and the file's native rate
/// * `Err(ExtractionError)` - Missing file, unsupported extension or decode error
pub fn load_wav(path: &Path) -> Result<(Vec<f32>, u32), ExtractionError> {
    if !path.exists() {
        return Err(ExtractionError::SourceMissing {
            path: path.to_path_buf(),
        });
    }
    if !is_supported_audio(path) {
        return Err(ExtractionError::UnsupportedFormat {
            path: path.to_path_buf(),
        });
    }

    let decode_err = |reason: String| ExtractionError::Decode {
        path: path.to_path_buf(),
        reason,
    };

    let mut reader = hound::WavReader::open(path).map_err(|err| decode_err(err.to_string()))?;
    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<Vec<f32>, _>>()
            .map_err(|err| decode_err(err.to_string()))?,
        hound::SampleFormat::Int => {
            let max = ((1i64 << (spec.bits_per_sample - 1)) - 1) as f32;
            match spec.bits_per_sample {
                8 => reader
                    .samples::<i8>()
                    .map(|sample| sample.map(|value| value as f32 / max))
                    .collect::<Result<Vec<f32>, _>>()
                    .map_err(|err| decode_err(err.to_string()))?,
                16 => reader
                    .samples::<i16>()
                    .map(|sample| sample.map(|value| value as f32 / max))
                    .collect::<Result<Vec<f32>, _>>()
                    .map_err(|err| decode_err(err.to_string()))?,
                24 | 32 => reader
                    .samples::<i32>()
                    .map(|sample| sample.map(|value| value as f32 / max))
                    .collect::<Result<Vec<f32>, _>>()
                    .map_err(|err| decode_err(err.to_string()))?,
                other => {
                    return Err(decode_err(format!("unsupported bits per sample {}", other)));
                }
            }
        }
    };

    let samples = if channels == 1 {
        interleaved
    } else {
        interleaved
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
            .collect()
    };

    Ok((samples, spec.sample_rate))
}

/// Truncate or zero-pad a signal to exactly `target_len` samples
///
/// Truncation keeps the first `target_len` samples; padding appends zeros.
/// An input of exactly `target_len` samples is returned unchanged.
pub fn fix_length(mut samples: Vec<f32>, target_len: usize) -> Vec<f32> {
    if samples.len() > target_len {
        samples.truncate(target_len);
    } else if samples.len() < target_len {
        samples.resize(target_len, 0.0);
    }
    samples
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn write_wav(path: &Path, spec: hound::WavSpec, frames: &[Vec<i16>]) {
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for frame in frames {
            for &sample in frame {
                writer.write_sample(sample).unwrap();
            }
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_fix_length_truncates_long_input() {
        let signal: Vec<f32> = (0..100).map(|i| i as f32).collect();
        let fixed = fix_length(signal, 64);
        assert_eq!(fixed.len(), 64);
        assert_eq!(fixed[63], 63.0, "truncation must keep the leading samples");
    }

    #[test]
    fn test_fix_length_pads_short_input() {
        let fixed = fix_length(vec![0.5; 10], 32);
        assert_eq!(fixed.len(), 32);
        assert_eq!(fixed[9], 0.5);
        assert!(fixed[10..].iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_fix_length_exact_input_unchanged() {
        let signal: Vec<f32> = (0..48).map(|i| (i as f32).sin()).collect();
        let fixed = fix_length(signal.clone(), 48);
        assert_eq!(fixed, signal);
    }

    #[test]
    fn test_fix_length_empty_input() {
        let fixed = fix_length(Vec::new(), 16);
        assert_eq!(fixed, vec![0.0; 16]);
    }

    #[test]
    fn test_is_supported_audio_case_insensitive() {
        assert!(is_supported_audio(Path::new("a/b/clip.wav")));
        assert!(is_supported_audio(Path::new("CLIP.WAV")));
        assert!(!is_supported_audio(Path::new("clip.json")));
        assert!(!is_supported_audio(Path::new("clip")));
    }

    #[test]
    fn test_load_wav_missing_file() {
        let result = load_wav(Path::new("/nonexistent/voice_gender/clip.wav"));
        assert!(matches!(result, Err(ExtractionError::SourceMissing { .. })));
    }

    #[test]
    fn test_load_wav_rejects_unsupported_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"not audio").unwrap();
        assert!(matches!(
            load_wav(&path),
            Err(ExtractionError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn test_load_wav_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path: PathBuf = dir.path().join("broken.wav");
        std::fs::write(&path, b"RIFF garbage").unwrap();
        assert!(matches!(load_wav(&path), Err(ExtractionError::Decode { .. })));
    }

    #[test]
    fn test_load_wav_stereo_mixdown() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 8000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        write_wav(&path, spec, &vec![vec![16384, 0]; 10]);

        let (samples, rate) = load_wav(&path).unwrap();
        assert_eq!(rate, 8000);
        assert_eq!(samples.len(), 10);
        for sample in samples {
            assert!((sample - 0.25).abs() < 1e-3, "expected averaged 0.25, got {}", sample);
        }
    }
}
