// FeedbackManager - labelled feedback samples for retraining
//
// Layout under `feedback_dir`:
// - one subdirectory per class (lower-cased class name)
// - each feedback sample is an audio copy plus a same-stem JSON sidecar
// - `requests.json` maps request ids to the audio copy they produced
//
// Samples are always filed under the class the user confirmed, never the
// predicted one. Index read-modify-write cycles are serialised within the
// process; there is no cross-process locking.

mod index;
mod record;
mod stats;

pub use index::{RequestIndex, INDEX_FILE_NAME};
pub use record::{feedback_file_name, FeedbackRecord, FeedbackStatus, TIMESTAMP_FORMAT};
pub use stats::{ClassFeedbackStats, FeedbackStats};

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Utc;
use tracing::{info, warn};

use crate::audio::is_supported_audio;
use crate::config::AppConfig;
use crate::error::{PipelineError, Result};
use record::{current_timestamp, sidecar_path};

pub struct FeedbackManager {
    config: AppConfig,
    index_lock: Mutex<()>,
}

impl FeedbackManager {
    /// Create the manager and every class directory
    pub fn new(config: AppConfig) -> Result<Self> {
        let manager = Self {
            config,
            index_lock: Mutex::new(()),
        };
        for dir in manager.class_dirs() {
            fs::create_dir_all(&dir)
                .map_err(|err| PipelineError::io(format!("creating {}", dir.display()), err))?;
        }
        Ok(manager)
    }

    pub fn feedback_dir(&self) -> &Path {
        &self.config.paths.feedback_dir
    }

    fn class_dir(&self, class_name: &str) -> PathBuf {
        self.feedback_dir().join(class_name.to_lowercase())
    }

    fn class_dirs(&self) -> Vec<PathBuf> {
        self.config
            .class_dir_names()
            .iter()
            .map(|name| self.feedback_dir().join(name))
            .collect()
    }

    /// Store a feedback sample
    ///
    /// # Arguments
    /// * `audio_path` - Source clip; copied, never moved
    /// * `predicted_label` - Class id the model produced
    /// * `correct_label` - Class id the user confirmed; selects the directory
    ///
    /// # Returns
    /// Path of the stored audio copy
    pub fn save_feedback(
        &self,
        audio_path: &Path,
        predicted_label: u32,
        correct_label: u32,
        user_id: Option<&str>,
        confidence: Option<f64>,
    ) -> Result<PathBuf> {
        self.store(audio_path, predicted_label, correct_label, user_id, confidence, None)
    }

    /// Store a presumed-correct sample for a served prediction and index it
    pub fn record_prediction(
        &self,
        audio_path: &Path,
        predicted_label: u32,
        confidence: f64,
        request_id: &str,
    ) -> Result<PathBuf> {
        let saved = self.store(
            audio_path,
            predicted_label,
            predicted_label,
            None,
            Some(confidence),
            Some(request_id),
        )?;

        let _guard = self.lock_index();
        let mut index = self.load_index();
        index.insert(request_id.to_string(), saved.clone());
        index.save(self.feedback_dir())?;
        Ok(saved)
    }

    fn store(
        &self,
        audio_path: &Path,
        predicted_label: u32,
        correct_label: u32,
        user_id: Option<&str>,
        confidence: Option<f64>,
        request_id: Option<&str>,
    ) -> Result<PathBuf> {
        let predicted_class = self.config.class_name(predicted_label)?.to_string();
        let correct_class = self.config.class_name(correct_label)?.to_string();
        validate_user_id(user_id)?;

        if !audio_path.is_file() {
            return Err(PipelineError::not_found("Audio file", audio_path));
        }

        let status = FeedbackStatus::from_labels(predicted_label, correct_label);
        let extension = audio_path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default();
        let target_dir = self.class_dir(&correct_class);
        fs::create_dir_all(&target_dir)
            .map_err(|err| PipelineError::io(format!("creating {}", target_dir.display()), err))?;

        let (timestamp, target_path) = loop {
            let timestamp = current_timestamp();
            let candidate =
                target_dir.join(feedback_file_name(&timestamp, status, user_id, extension));
            if !candidate.exists() && !sidecar_path(&candidate).exists() {
                break (timestamp, candidate);
            }
        };

        fs::copy(audio_path, &target_path).map_err(|err| {
            PipelineError::io(
                format!(
                    "copying {} to {}",
                    audio_path.display(),
                    target_path.display()
                ),
                err,
            )
        })?;

        let record = FeedbackRecord {
            timestamp,
            request_id: request_id.map(str::to_string),
            predicted_label,
            predicted_class,
            correct_label,
            correct_class,
            status,
            user_id: user_id.map(str::to_string),
            confidence,
            original_path: audio_path.to_path_buf(),
            saved_path: target_path.clone(),
            updated_at: None,
        };

        if let Err(err) = write_sidecar(&target_path, &record) {
            if let Err(cleanup) = fs::remove_file(&target_path) {
                warn!(
                    "[FeedbackManager] Could not remove {} after failed save: {}",
                    target_path.display(),
                    cleanup
                );
            }
            return Err(err);
        }

        info!("[FeedbackManager] Feedback saved: {}", target_path.display());
        Ok(target_path)
    }

    /// Relabel the sample recorded for `request_id`
    ///
    /// # Returns
    /// * `Ok(true)` - The record was moved to the new class and rewritten
    /// * `Ok(false)` - No record exists for this id (or its files are gone)
    pub fn update_feedback(
        &self,
        request_id: &str,
        new_correct_label: u32,
        user_id: Option<&str>,
    ) -> Result<bool> {
        let correct_class = self.config.class_name(new_correct_label)?.to_string();
        validate_user_id(user_id)?;

        let _guard = self.lock_index();
        let mut index = self.load_index();
        if index.get(request_id).is_none() {
            // Another writer may have replaced the index after our record landed
            let scanned = RequestIndex::rebuild(&self.class_dirs());
            if let Some(path) = scanned.get(request_id) {
                warn!(
                    "[FeedbackManager] Request {} missing from index, recovered from sidecar",
                    request_id
                );
                index.insert(request_id.to_string(), path.clone());
                index.save(self.feedback_dir())?;
            }
        }
        let Some(old_audio) = index.get(request_id).cloned() else {
            info!("[FeedbackManager] Unknown request id {}", request_id);
            return Ok(false);
        };

        let old_sidecar = sidecar_path(&old_audio);
        let record = if old_audio.is_file() {
            read_sidecar(&old_sidecar)
        } else {
            None
        };
        let Some(mut record) = record else {
            warn!(
                "[FeedbackManager] Record for request {} is missing on disk, dropping it",
                request_id
            );
            index.remove(request_id);
            index.save(self.feedback_dir())?;
            return Ok(false);
        };

        let status = FeedbackStatus::from_labels(record.predicted_label, new_correct_label);
        let user_id = user_id.map(str::to_string).or(record.user_id.take());
        let extension = old_audio
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default();

        let target_dir = self.class_dir(&correct_class);
        fs::create_dir_all(&target_dir)
            .map_err(|err| PipelineError::io(format!("creating {}", target_dir.display()), err))?;
        let new_audio = target_dir.join(feedback_file_name(
            &record.timestamp,
            status,
            user_id.as_deref(),
            extension,
        ));

        if new_audio != old_audio {
            fs::rename(&old_audio, &new_audio).map_err(|err| {
                PipelineError::io(
                    format!("moving {} to {}", old_audio.display(), new_audio.display()),
                    err,
                )
            })?;
        }

        record.correct_label = new_correct_label;
        record.correct_class = correct_class;
        record.status = status;
        record.user_id = user_id;
        record.saved_path = new_audio.clone();
        record.updated_at = Some(Utc::now());
        if let Err(err) = write_sidecar(&new_audio, &record) {
            if new_audio != old_audio {
                if let Err(restore) = fs::rename(&new_audio, &old_audio) {
                    warn!(
                        "[FeedbackManager] Could not move {} back after failed update: {}",
                        new_audio.display(),
                        restore
                    );
                }
            }
            return Err(err);
        }

        let new_sidecar = sidecar_path(&new_audio);
        if new_sidecar != old_sidecar {
            if let Err(err) = fs::remove_file(&old_sidecar) {
                warn!(
                    "[FeedbackManager] Could not remove stale sidecar {}: {}",
                    old_sidecar.display(),
                    err
                );
            }
        }

        index.insert(request_id.to_string(), new_audio.clone());
        index.save(self.feedback_dir())?;

        info!(
            "[FeedbackManager] Request {} relabelled as {} ({})",
            request_id,
            record.correct_class,
            new_audio.display()
        );
        Ok(true)
    }

    /// Count stored samples per class, split by status
    pub fn get_feedback_stats(&self) -> Result<FeedbackStats> {
        let mut stats = FeedbackStats::default();
        for class_name in self.config.label_map.values() {
            let dir = self.class_dir(class_name);
            if !dir.is_dir() {
                continue;
            }

            let entries = fs::read_dir(&dir)
                .map_err(|err| PipelineError::io(format!("listing {}", dir.display()), err))?;
            let mut class_stats = ClassFeedbackStats::default();
            for entry in entries.flatten() {
                let path = entry.path();
                if !path.is_file() || !is_supported_audio(&path) {
                    continue;
                }
                let status = path
                    .file_stem()
                    .and_then(|stem| stem.to_str())
                    .and_then(FeedbackStatus::from_file_stem);
                class_stats.add(status);
            }
            stats.insert_class(class_name, class_stats);
        }
        Ok(stats)
    }

    /// Delete feedback for one class (by name, case-insensitive) or for all
    ///
    /// Directories are recreated empty and the request index is pruned.
    ///
    /// # Errors
    /// `InvalidInput` when `class_name` is not a configured class.
    pub fn clear_feedback(&self, class_name: Option<&str>) -> Result<()> {
        let dirs = match class_name {
            Some(name) => {
                let label = self.config.label_for_class(name).ok_or_else(|| {
                    PipelineError::invalid_input(format!("unknown class name '{}'", name))
                })?;
                vec![self.class_dir(self.config.class_name(label)?)]
            }
            None => self.class_dirs(),
        };

        for dir in dirs.iter().filter(|dir| dir.exists()) {
            fs::remove_dir_all(dir)
                .map_err(|err| PipelineError::io(format!("removing {}", dir.display()), err))?;
            fs::create_dir_all(dir)
                .map_err(|err| PipelineError::io(format!("recreating {}", dir.display()), err))?;
        }

        let _guard = self.lock_index();
        let mut index = self.load_index();
        let pruned = index.prune_missing();
        index.save(self.feedback_dir())?;

        match class_name {
            Some(name) => info!("[FeedbackManager] Cleared feedback for class: {}", name),
            None => info!("[FeedbackManager] Cleared all feedback data"),
        }
        if pruned > 0 {
            info!("[FeedbackManager] Dropped {} request index entries", pruned);
        }
        Ok(())
    }

    fn load_index(&self) -> RequestIndex {
        RequestIndex::load_or_rebuild(self.feedback_dir(), &self.class_dirs())
    }

    fn lock_index(&self) -> std::sync::MutexGuard<'_, ()> {
        self.index_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// User ids become part of a file name; only `[A-Za-z0-9_-]` is accepted
fn validate_user_id(user_id: Option<&str>) -> Result<()> {
    match user_id {
        Some(id) if !id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') => {
            Err(PipelineError::invalid_input(format!(
                "user id '{}' may only contain letters, digits, '_' and '-'",
                id
            )))
        }
        _ => Ok(()),
    }
}

fn write_sidecar(audio_path: &Path, record: &FeedbackRecord) -> Result<()> {
    let path = sidecar_path(audio_path);
    let bytes = serde_json::to_vec_pretty(record)
        .map_err(|err| PipelineError::serialization("encoding feedback metadata", err))?;
    fs::write(&path, bytes).map_err(|err| PipelineError::io(format!("writing {}", path.display()), err))
}

fn read_sidecar(path: &Path) -> Option<FeedbackRecord> {
    let bytes = fs::read(path).ok()?;
    serde_json::from_slice(&bytes).ok()
}
