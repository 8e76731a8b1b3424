// Resample - sample-rate conversion to the configured rate
//
// Uses a one-shot rubato sinc resampler over the whole clip (chunk size =
// input length), then flushes the filter delay so the output holds
// ceil(len × to / from) samples aligned with the input.

use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use tracing::debug;

/// Convert mono samples from `from_rate` to `to_rate`
///
/// Returns the input unchanged when the rates match or it is empty.
/// Errors are reported as strings; the caller attaches the file path.
pub fn resample(samples: Vec<f32>, from_rate: u32, to_rate: u32) -> Result<Vec<f32>, String> {
    if from_rate == to_rate || samples.is_empty() {
        return Ok(samples);
    }
    if from_rate == 0 || to_rate == 0 {
        return Err(format!("invalid sample rates {} -> {}", from_rate, to_rate));
    }

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };
    let ratio = to_rate as f64 / from_rate as f64;
    let input_len = samples.len();
    let expected_len = (input_len as u64 * to_rate as u64).div_ceil(from_rate as u64) as usize;

    let mut resampler = SincFixedIn::<f32>::new(ratio, 2.0, params, input_len, 1)
        .map_err(|err| err.to_string())?;
    let delay = resampler.output_delay();

    let input = vec![samples];
    let mut resampled = resampler
        .process(&input, None)
        .map_err(|err| err.to_string())?
        .pop()
        .unwrap_or_default();
    // Drain the filter tail so the clip keeps its full length
    let tail = resampler
        .process_partial::<Vec<f32>>(None, None)
        .map_err(|err| err.to_string())?
        .pop()
        .unwrap_or_default();
    resampled.extend(tail);

    let mut resampled: Vec<f32> = resampled.into_iter().skip(delay).collect();
    resampled.truncate(expected_len);

    debug!(
        "[Resample] {} samples ({} Hz) -> {} samples ({} Hz)",
        input_len,
        from_rate,
        resampled.len(),
        to_rate
    );
    Ok(resampled)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resample_same_rate_is_identity() {
        let signal = vec![0.1, -0.2, 0.3];
        let out = resample(signal.clone(), 16_000, 16_000).unwrap();
        assert_eq!(out, signal);
    }

    #[test]
    fn test_resample_upsample_length() {
        let signal: Vec<f32> = (0..11_025)
            .map(|i| (2.0 * std::f32::consts::PI * 440.0 * i as f32 / 11_025.0).sin())
            .collect();
        let out = resample(signal, 11_025, 16_000).unwrap();
        assert_eq!(out.len(), 16_000);
    }

    #[test]
    fn test_resample_empty_is_noop() {
        let out = resample(Vec::new(), 44_100, 16_000).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_resample_downsample_keeps_duration() {
        let signal: Vec<f32> = (0..32_000)
            .map(|i| (2.0 * std::f32::consts::PI * 220.0 * i as f32 / 32_000.0).sin())
            .collect();
        let out = resample(signal, 32_000, 16_000).unwrap();
        assert_eq!(out.len(), 16_000, "downsampled clip must keep its duration");
        assert!(out.iter().all(|s| s.is_finite()));
        // Tail carries signal, not padding
        let tail_energy: f32 = out[15_800..].iter().map(|s| s * s).sum();
        assert!(tail_energy > 1.0, "tail energy {} too low", tail_energy);
    }
}
