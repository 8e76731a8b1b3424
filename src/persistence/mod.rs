// ModelPersistence - classifier, scaler and metadata artifacts on disk
//
// The three artifacts form one bundle. Every save stamps a fresh bundle id
// into each file, writes them to `*.tmp` siblings and renames them into
// place only once all three writes succeeded. Loading refuses a classifier
// and scaler that carry different bundle ids.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::error::{PipelineError, Result};
use crate::model::{RandomForest, StandardScaler, TrainingMetrics};

/// On-disk envelope for the classifier and scaler files
#[derive(Debug, Serialize, Deserialize)]
struct Artifact<T> {
    bundle_id: String,
    saved_at: DateTime<Utc>,
    payload: T,
}

/// Metadata written next to the model: audio settings, labels and metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedModelConfig {
    pub sample_rate: u32,
    pub duration: f64,
    pub n_mfcc: usize,
    pub n_estimators: usize,
    /// Label ids as strings, matching the JSON object key convention
    pub label_map: BTreeMap<String, String>,
    pub metrics: TrainingMetrics,
    pub bundle_id: String,
    pub trained_at: DateTime<Utc>,
}

pub struct ModelPersistence {
    config: AppConfig,
}

impl ModelPersistence {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    fn model_path(&self) -> &Path {
        &self.config.paths.model_path
    }

    fn scaler_path(&self) -> &Path {
        &self.config.paths.scaler_path
    }

    fn config_path(&self) -> &Path {
        &self.config.paths.config_path
    }

    /// Save the bundle, replacing any previous artifacts
    ///
    /// # Returns
    /// The metadata that was written, including the new bundle id
    pub fn save_model(
        &self,
        model: &RandomForest,
        scaler: &StandardScaler,
        metrics: &TrainingMetrics,
    ) -> Result<SavedModelConfig> {
        let bundle_id = Uuid::new_v4().to_string();
        let saved_at = Utc::now();

        let saved_config = SavedModelConfig {
            sample_rate: self.config.audio.sample_rate,
            duration: self.config.audio.duration_secs,
            n_mfcc: self.config.audio.n_mfcc,
            n_estimators: self.config.model.n_estimators,
            label_map: self
                .config
                .label_map
                .iter()
                .map(|(label, name)| (label.to_string(), name.clone()))
                .collect(),
            metrics: metrics.clone(),
            bundle_id: bundle_id.clone(),
            trained_at: saved_at,
        };

        let model_bytes = serde_json::to_vec(&Artifact {
            bundle_id: bundle_id.clone(),
            saved_at,
            payload: model,
        })
        .map_err(|err| PipelineError::serialization("encoding classifier", err))?;
        let scaler_bytes = serde_json::to_vec(&Artifact {
            bundle_id: bundle_id.clone(),
            saved_at,
            payload: scaler,
        })
        .map_err(|err| PipelineError::serialization("encoding scaler", err))?;
        let config_bytes = serde_json::to_vec_pretty(&saved_config)
            .map_err(|err| PipelineError::serialization("encoding model config", err))?;

        let targets = [
            (self.model_path(), model_bytes),
            (self.scaler_path(), scaler_bytes),
            (self.config_path(), config_bytes),
        ];

        let mut staged: Vec<(PathBuf, &Path)> = Vec::with_capacity(targets.len());
        for (target, bytes) in &targets {
            match stage(target, bytes) {
                Ok(tmp) => staged.push((tmp, *target)),
                Err(err) => {
                    discard(&staged);
                    return Err(err);
                }
            }
        }

        for (index, (tmp, target)) in staged.iter().enumerate() {
            if let Err(err) = fs::rename(tmp, target) {
                discard(&staged[index..]);
                return Err(PipelineError::io(
                    format!("moving {} into place", target.display()),
                    err,
                ));
            }
        }

        info!(
            "[ModelPersistence] Saved bundle {} to {}",
            bundle_id,
            self.config.paths.artifacts_dir.display()
        );
        Ok(saved_config)
    }

    /// Load the classifier and scaler
    ///
    /// # Errors
    /// `NotFound` if either file is missing, `ArtifactMismatch` if they were
    /// saved by different training runs.
    pub fn load_model(&self) -> Result<(RandomForest, StandardScaler)> {
        let model: Artifact<RandomForest> = read_json(self.model_path(), "Model")?;
        let scaler: Artifact<StandardScaler> = read_json(self.scaler_path(), "Scaler")?;

        if model.bundle_id != scaler.bundle_id {
            return Err(PipelineError::ArtifactMismatch {
                model_bundle: model.bundle_id,
                scaler_bundle: scaler.bundle_id,
            });
        }

        info!(
            "[ModelPersistence] Loaded bundle {} ({} trees)",
            model.bundle_id,
            model.payload.n_trees()
        );
        Ok((model.payload, scaler.payload))
    }

    pub fn load_config(&self) -> Result<SavedModelConfig> {
        read_json(self.config_path(), "Model config")
    }

    /// True when both the classifier and the scaler files exist
    pub fn model_exists(&self) -> bool {
        self.model_path().is_file() && self.scaler_path().is_file()
    }
}

fn tmp_path(target: &Path) -> PathBuf {
    let mut name = target.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    target.with_file_name(name)
}

/// Write `bytes` next to `target` and return the temp path
fn stage(target: &Path, bytes: &[u8]) -> Result<PathBuf> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)
            .map_err(|err| PipelineError::io(format!("creating {}", parent.display()), err))?;
    }
    let tmp = tmp_path(target);
    fs::write(&tmp, bytes)
        .map_err(|err| PipelineError::io(format!("writing {}", tmp.display()), err))?;
    Ok(tmp)
}

fn discard(staged: &[(PathBuf, &Path)]) {
    for (tmp, _) in staged {
        if let Err(err) = fs::remove_file(tmp) {
            warn!(
                "[ModelPersistence] Could not remove {}: {}",
                tmp.display(),
                err
            );
        }
    }
}

fn read_json<T: DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
    if !path.is_file() {
        return Err(PipelineError::not_found(what, path));
    }
    let bytes = fs::read(path)
        .map_err(|err| PipelineError::io(format!("reading {}", path.display()), err))?;
    serde_json::from_slice(&bytes)
        .map_err(|err| PipelineError::serialization(format!("decoding {}", path.display()), err))
}
