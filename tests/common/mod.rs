//! Shared fixtures: synthetic voice-like WAV files and detector roots.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use voice_gender::{AppConfig, GenderDetector};

pub const SAMPLE_RATE: u32 = 16_000;

/// Write a 2 s harmonic tone with a slow vibrato, roughly voice-shaped
pub fn write_voice(path: &Path, fundamental: f32, variant: usize) {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    let f0 = fundamental * (1.0 + 0.02 * variant as f32);
    for i in 0..(2 * SAMPLE_RATE) {
        let t = i as f32 / SAMPLE_RATE as f32;
        let vibrato = 1.0 + 0.01 * (2.0 * std::f32::consts::PI * 5.0 * t).sin();
        let mut sample = 0.0;
        for harmonic in 1..=6 {
            let amplitude = 0.3 / harmonic as f32;
            sample += amplitude
                * (2.0 * std::f32::consts::PI * f0 * vibrato * harmonic as f32 * t).sin();
        }
        writer
            .write_sample((sample * 0.8 * i16::MAX as f32) as i16)
            .unwrap();
    }
    writer.finalize().unwrap();
}

/// `root/data/{female,male}` with `per_class` clips each
pub fn build_dataset(root: &Path, per_class: usize) -> PathBuf {
    let data = root.join("data");
    for (class, fundamental) in [("female", 220.0), ("male", 110.0)] {
        let dir = data.join(class);
        fs::create_dir_all(&dir).unwrap();
        for i in 0..per_class {
            write_voice(&dir.join(format!("{}_{}.wav", class, i)), fundamental, i);
        }
    }
    data
}

/// Small, fast configuration rooted in a temp directory
pub fn test_config(root: &Path) -> AppConfig {
    let mut config = AppConfig::default().with_base_dir(root);
    config.model.n_estimators = 25;
    config
}

pub fn detector(root: &TempDir) -> GenderDetector {
    GenderDetector::new(test_config(root.path())).unwrap()
}
