//! Configuration management for the gender detection pipeline
//!
//! This module provides runtime configuration loading from JSON files so
//! audio, model and path parameters can be adjusted without recompilation.
//! Defaults mirror the values the pipeline was tuned with (16 kHz, 2 s clips,
//! 40 MFCCs, 200 trees).

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{PipelineError, Result};

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub audio: AudioConfig,
    pub model: ModelConfig,
    pub paths: PathsConfig,
    /// Class id to display name; keys are contiguous from 0
    #[serde(default = "default_label_map")]
    pub label_map: BTreeMap<u32, String>,
    /// Feedback count after which retraining is recommended
    #[serde(default = "default_feedback_threshold")]
    pub feedback_threshold: usize,
}

/// Audio loading and MFCC parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Target sample rate in Hz; audio is resampled to this rate
    pub sample_rate: u32,
    /// Clip length in seconds after truncation/padding
    pub duration_secs: f64,
    /// Number of cepstral coefficients per frame
    pub n_mfcc: usize,
    /// STFT frame size in samples
    pub n_fft: usize,
    /// STFT hop size in samples
    pub hop_length: usize,
    /// Number of mel bands feeding the DCT
    pub n_mels: usize,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16_000,
            duration_secs: 2.0,
            n_mfcc: 40,
            n_fft: 2048,
            hop_length: 512,
            n_mels: 128,
        }
    }
}

impl AudioConfig {
    /// Number of samples in a fixed-length clip (fractional samples truncated)
    pub fn target_len(&self) -> usize {
        (self.sample_rate as f64 * self.duration_secs) as usize
    }
}

/// Classifier and training-split parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Number of trees in the forest
    pub n_estimators: usize,
    /// Seed for splits, bootstrap sampling and feature sampling
    pub random_state: u64,
    /// Fraction of samples held out for evaluation
    pub test_size: f64,
    /// Maximum tree depth (unbounded when absent)
    #[serde(default)]
    pub max_depth: Option<usize>,
    /// Minimum samples required to split an internal node
    #[serde(default = "default_min_samples_split")]
    pub min_samples_split: usize,
    /// Worker threads used to fit trees (all cores when absent)
    #[serde(default)]
    pub n_jobs: Option<usize>,
}

fn default_min_samples_split() -> usize {
    2
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            n_estimators: 200,
            random_state: 42,
            test_size: 0.2,
            max_depth: None,
            min_samples_split: default_min_samples_split(),
            n_jobs: None,
        }
    }
}

/// Artifact, feedback and log locations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    pub artifacts_dir: PathBuf,
    pub model_path: PathBuf,
    pub scaler_path: PathBuf,
    pub config_path: PathBuf,
    pub feedback_dir: PathBuf,
    pub log_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            artifacts_dir: PathBuf::from("artifacts"),
            model_path: PathBuf::from("artifacts/gender_rf.json"),
            scaler_path: PathBuf::from("artifacts/scaler.json"),
            config_path: PathBuf::from("artifacts/config.json"),
            feedback_dir: PathBuf::from("feedback_data"),
            log_dir: PathBuf::from("logs"),
        }
    }
}

fn default_label_map() -> BTreeMap<u32, String> {
    BTreeMap::from([(0, "Female".to_string()), (1, "Male".to_string())])
}

fn default_feedback_threshold() -> usize {
    100
}

impl Default for AppConfig {
    /// Default configuration values (fallback if config file not found)
    fn default() -> Self {
        Self {
            audio: AudioConfig::default(),
            model: ModelConfig::default(),
            paths: PathsConfig::default(),
            label_map: default_label_map(),
            feedback_threshold: default_feedback_threshold(),
        }
    }
}

impl AppConfig {
    /// Load configuration from JSON file
    ///
    /// # Arguments
    /// * `path` - Path to JSON config file
    ///
    /// # Returns
    /// The parsed configuration, or the defaults if the file is missing or
    /// its JSON is invalid (a warning is logged in both cases).
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    tracing::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                    config
                }
                Err(err) => {
                    tracing::warn!(
                        "[Config] Failed to parse JSON from {:?}: {}. Using defaults.",
                        path.as_ref(),
                        err
                    );
                    Self::default()
                }
            },
            Err(err) => {
                tracing::warn!(
                    "[Config] Failed to read config file {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }

    /// Re-root every configured path under `base`
    ///
    /// Relative paths are joined onto `base`; absolute paths are kept.
    pub fn with_base_dir<P: AsRef<Path>>(mut self, base: P) -> Self {
        let base = base.as_ref();
        let rebase = |p: &PathBuf| {
            if p.is_absolute() {
                p.clone()
            } else {
                base.join(p)
            }
        };
        self.paths = PathsConfig {
            artifacts_dir: rebase(&self.paths.artifacts_dir),
            model_path: rebase(&self.paths.model_path),
            scaler_path: rebase(&self.paths.scaler_path),
            config_path: rebase(&self.paths.config_path),
            feedback_dir: rebase(&self.paths.feedback_dir),
            log_dir: rebase(&self.paths.log_dir),
        };
        self
    }

    /// Check every invariant the pipeline relies on
    pub fn validate(&self) -> Result<()> {
        let audio = &self.audio;
        if audio.sample_rate == 0 {
            return Err(invalid("sample_rate must be positive"));
        }
        if !(audio.duration_secs.is_finite() && audio.duration_secs > 0.0) {
            return Err(invalid("duration_secs must be a positive number"));
        }
        if audio.n_mfcc == 0 {
            return Err(invalid("n_mfcc must be positive"));
        }
        if audio.n_mels < audio.n_mfcc {
            return Err(invalid(format!(
                "n_mels ({}) must be at least n_mfcc ({})",
                audio.n_mels, audio.n_mfcc
            )));
        }
        if audio.n_fft < 2 || audio.hop_length == 0 {
            return Err(invalid("n_fft must be >= 2 and hop_length positive"));
        }

        let model = &self.model;
        if model.n_estimators == 0 {
            return Err(invalid("n_estimators must be positive"));
        }
        if !(model.test_size > 0.0 && model.test_size < 1.0) {
            return Err(invalid(format!(
                "test_size must lie in (0, 1), got {}",
                model.test_size
            )));
        }
        if model.min_samples_split < 2 {
            return Err(invalid("min_samples_split must be at least 2"));
        }

        if self.label_map.is_empty() {
            return Err(invalid("label_map must not be empty"));
        }
        for (expected, key) in self.label_map.keys().enumerate() {
            if *key as usize != expected {
                return Err(invalid(format!(
                    "label_map keys must be contiguous from 0 (missing {})",
                    expected
                )));
            }
        }
        let mut seen = HashSet::new();
        for name in self.label_map.values() {
            if name.trim().is_empty() || !seen.insert(name.to_lowercase()) {
                return Err(invalid(format!("label name {:?} is empty or duplicated", name)));
            }
        }
        Ok(())
    }

    /// Create artifact, feedback and log directories
    pub fn ensure_directories(&self) -> Result<()> {
        for dir in [
            &self.paths.artifacts_dir,
            &self.paths.feedback_dir,
            &self.paths.log_dir,
        ] {
            fs::create_dir_all(dir)
                .map_err(|err| PipelineError::io(format!("creating {}", dir.display()), err))?;
        }
        Ok(())
    }

    /// Number of samples in a fixed-length clip
    pub fn target_len(&self) -> usize {
        self.audio.target_len()
    }

    /// Length of a pooled feature vector (mean + std per coefficient)
    pub fn feature_len(&self) -> usize {
        2 * self.audio.n_mfcc
    }

    pub fn n_classes(&self) -> usize {
        self.label_map.len()
    }

    /// Class display names in label-id order
    pub fn class_names(&self) -> Vec<String> {
        self.label_map.values().cloned().collect()
    }

    /// Lower-cased class names, used as directory names
    pub fn class_dir_names(&self) -> Vec<String> {
        self.label_map.values().map(|name| name.to_lowercase()).collect()
    }

    pub fn class_name(&self, label: u32) -> Result<&str> {
        self.label_map
            .get(&label)
            .map(String::as_str)
            .ok_or(PipelineError::UnknownLabel { label })
    }

    /// Resolve a class name (case-insensitive) to its label id
    pub fn label_for_class(&self, name: &str) -> Option<u32> {
        self.label_map
            .iter()
            .find(|(_, class)| class.eq_ignore_ascii_case(name))
            .map(|(label, _)| *label)
    }
}

fn invalid(reason: impl Into<String>) -> PipelineError {
    PipelineError::InvalidConfig {
        reason: reason.into(),
    }
}
