// Dataset module - labelled feature matrices from audio on disk
//
// A dataset is built either from a directory tree (one subdirectory per
// class, label id = position of the class in the given list) or from an
// explicit list of (path, label) pairs. Files that fail extraction are
// skipped and recorded, never retried.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};
use walkdir::WalkDir;

use crate::analysis::{ExtractionOutcome, FeatureExtractor};
use crate::audio::is_supported_audio;
use crate::error::{PipelineError, Result};

/// A file that was dropped while building a dataset
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

/// Feature matrix with aligned integer labels
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    /// One row per loaded file, each of length `2 × n_mfcc`
    pub features: Vec<Vec<f64>>,
    /// Class id per row
    pub labels: Vec<u32>,
    pub skipped: Vec<SkippedFile>,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Column count, zero for an empty dataset
    pub fn n_features(&self) -> usize {
        self.features.first().map_or(0, Vec::len)
    }

    /// Rows per class id
    pub fn class_counts(&self) -> BTreeMap<u32, usize> {
        let mut counts = BTreeMap::new();
        for &label in &self.labels {
            *counts.entry(label).or_insert(0) += 1;
        }
        counts
    }

    /// Append every row (and skip record) of `other`
    pub fn extend(&mut self, other: Dataset) {
        self.features.extend(other.features);
        self.labels.extend(other.labels);
        self.skipped.extend(other.skipped);
    }

    fn push_outcomes(&mut self, outcomes: Vec<ExtractionOutcome>, label: u32) {
        for outcome in outcomes {
            match outcome {
                ExtractionOutcome::Extracted { features, .. } => {
                    self.features.push(features.into_vec());
                    self.labels.push(label);
                }
                ExtractionOutcome::Failed { path, error } => {
                    self.skipped.push(SkippedFile {
                        path,
                        reason: error.to_string(),
                    });
                }
            }
        }
    }
}

/// Builds datasets by running the feature extractor over audio files
pub struct DatasetLoader {
    extractor: Arc<FeatureExtractor>,
}

impl DatasetLoader {
    pub fn new(extractor: Arc<FeatureExtractor>) -> Self {
        Self { extractor }
    }

    /// Load every supported audio file under `root/<class>` for each class
    ///
    /// # Arguments
    /// * `root` - Directory holding one subdirectory per class
    /// * `class_names` - Subdirectory names; the label id of a class is its index
    ///
    /// # Errors
    /// `NotFound` if `root` does not exist. A missing class directory only
    /// logs a warning and contributes no rows.
    pub fn load_from_directory<S: AsRef<str>>(
        &self,
        root: &Path,
        class_names: &[S],
    ) -> Result<Dataset> {
        if !root.is_dir() {
            return Err(PipelineError::not_found("Data directory", root));
        }

        let mut dataset = Dataset::default();
        for (label, class_name) in class_names.iter().enumerate() {
            let class_dir = root.join(class_name.as_ref());
            if !class_dir.is_dir() {
                warn!(
                    "[DatasetLoader] Class directory {} not found, skipping",
                    class_dir.display()
                );
                continue;
            }

            let files = collect_audio_files(&class_dir);
            info!(
                "[DatasetLoader] Found {} audio files for class '{}'",
                files.len(),
                class_name.as_ref()
            );

            let batch = self.extractor.extract_features_batch(&files);
            dataset.push_outcomes(batch.outcomes, label as u32);
        }

        info!(
            "[DatasetLoader] Loaded {} samples ({} skipped) from {}",
            dataset.len(),
            dataset.skipped.len(),
            root.display()
        );
        Ok(dataset)
    }

    /// Load an explicit list of files with one label per file
    pub fn load_from_file_list<P: AsRef<Path>>(&self, paths: &[P], labels: &[u32]) -> Result<Dataset> {
        if paths.len() != labels.len() {
            return Err(PipelineError::invalid_input(format!(
                "{} paths but {} labels",
                paths.len(),
                labels.len()
            )));
        }

        let mut dataset = Dataset::default();
        for (path, &label) in paths.iter().zip(labels) {
            let batch = self.extractor.extract_features_batch(&[path.as_ref()]);
            dataset.push_outcomes(batch.outcomes, label);
        }

        info!(
            "[DatasetLoader] Loaded {} of {} listed files",
            dataset.len(),
            paths.len()
        );
        Ok(dataset)
    }
}

/// Supported audio files under `dir`, recursively, in file-name order
fn collect_audio_files(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                warn!("[DatasetLoader] Error accessing entry: {}", err);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file() && is_supported_audio(entry.path()))
        .map(|entry| entry.into_path())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AudioConfig;
    use std::fs;

    fn write_tone(path: &Path, frequency: f32) {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 8_000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for i in 0..4_000 {
            let t = i as f32 / 8_000.0;
            let sample = 0.4 * (2.0 * std::f32::consts::PI * frequency * t).sin();
            writer.write_sample((sample * i16::MAX as f32) as i16).unwrap();
        }
        writer.finalize().unwrap();
    }

    fn loader() -> DatasetLoader {
        let config = AudioConfig {
            sample_rate: 8_000,
            duration_secs: 0.5,
            n_mfcc: 13,
            n_fft: 512,
            hop_length: 128,
            n_mels: 40,
        };
        DatasetLoader::new(Arc::new(FeatureExtractor::new(&config)))
    }

    #[test]
    fn test_load_from_directory_labels_by_position() {
        let root = tempfile::tempdir().unwrap();
        let female = root.path().join("female");
        let male = root.path().join("male").join("nested");
        fs::create_dir_all(&female).unwrap();
        fs::create_dir_all(&male).unwrap();
        write_tone(&female.join("a.wav"), 220.0);
        write_tone(&female.join("b.WAV"), 240.0);
        write_tone(&male.join("c.wav"), 110.0);
        fs::write(female.join("notes.txt"), "ignored").unwrap();

        let dataset = loader()
            .load_from_directory(root.path(), &["female", "male"])
            .unwrap();

        assert_eq!(dataset.len(), 3);
        assert_eq!(dataset.labels, vec![0, 0, 1]);
        assert_eq!(dataset.n_features(), 26);
        assert_eq!(dataset.class_counts(), BTreeMap::from([(0, 2), (1, 1)]));
        assert!(dataset.skipped.is_empty());
    }

    #[test]
    fn test_missing_class_directory_contributes_nothing() {
        let root = tempfile::tempdir().unwrap();
        let female = root.path().join("female");
        fs::create_dir_all(&female).unwrap();
        write_tone(&female.join("a.wav"), 220.0);

        let dataset = loader()
            .load_from_directory(root.path(), &["female", "male"])
            .unwrap();
        assert_eq!(dataset.labels, vec![0]);
    }

    #[test]
    fn test_missing_root_is_not_found() {
        let result = loader().load_from_directory(Path::new("/nonexistent/data"), &["female"]);
        assert!(matches!(result, Err(PipelineError::NotFound { .. })));
    }

    #[test]
    fn test_empty_root_yields_empty_dataset() {
        let root = tempfile::tempdir().unwrap();
        let dataset = loader().load_from_directory(root.path(), &["female", "male"]).unwrap();
        assert!(dataset.is_empty());
        assert_eq!(dataset.n_features(), 0);
    }

    #[test]
    fn test_corrupt_files_are_skipped_and_recorded() {
        let root = tempfile::tempdir().unwrap();
        let male = root.path().join("male");
        fs::create_dir_all(&male).unwrap();
        write_tone(&male.join("good.wav"), 120.0);
        fs::write(male.join("bad.wav"), b"garbage").unwrap();

        let dataset = loader().load_from_directory(root.path(), &["female", "male"]).unwrap();
        assert_eq!(dataset.labels, vec![1]);
        assert_eq!(dataset.skipped.len(), 1);
        assert!(dataset.skipped[0].path.ends_with("bad.wav"));
    }

    #[test]
    fn test_load_from_file_list() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.wav");
        let b = dir.path().join("b.wav");
        write_tone(&a, 200.0);
        write_tone(&b, 100.0);
        let missing = dir.path().join("missing.wav");

        let dataset = loader()
            .load_from_file_list(&[&a, &missing, &b], &[1, 0, 0])
            .unwrap();
        assert_eq!(dataset.labels, vec![1, 0]);
        assert_eq!(dataset.skipped.len(), 1);

        let mismatch = loader().load_from_file_list(&[&a], &[0, 1]);
        assert!(matches!(mismatch, Err(PipelineError::InvalidInput { .. })));
    }

    #[test]
    fn test_extend_concatenates() {
        let mut a = Dataset {
            features: vec![vec![1.0]],
            labels: vec![0],
            skipped: vec![],
        };
        let b = Dataset {
            features: vec![vec![2.0], vec![3.0]],
            labels: vec![1, 1],
            skipped: vec![],
        };
        a.extend(b);
        assert_eq!(a.len(), 3);
        assert_eq!(a.labels, vec![0, 1, 1]);
    }
}
