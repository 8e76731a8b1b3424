// GenderDetector - single entry point for training, prediction and feedback
//
// Workflows:
// - Initial training: DatasetLoader → ModelTrainer → ModelPersistence
// - Prediction: FeatureExtractor → cached scaler + forest
// - Retraining: feedback tree (+ optional original data) → ModelTrainer
//
// The loaded model is an explicit cache owned by the detector. It is filled
// by training, by the first prediction, or by `reload()`; it is never
// refreshed behind the caller's back.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::analysis::FeatureExtractor;
use crate::config::AppConfig;
use crate::dataset::{Dataset, DatasetLoader};
use crate::error::{log_pipeline_error, ErrorKind, PipelineError, Result};
use crate::feedback::{FeedbackManager, FeedbackStats};
use crate::model::{
    CrossValidation, ModelTrainer, RandomForest, StandardScaler, TrainedModel, TrainingMetrics,
};
use crate::persistence::{ModelPersistence, SavedModelConfig};

/// Classifier and scaler held in memory for inference
#[derive(Debug, Clone)]
pub struct LoadedModel {
    pub model: RandomForest,
    pub scaler: StandardScaler,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    /// Predicted class name
    pub prediction: String,
    pub label_id: u32,
    /// Probability mass on the predicted class
    pub confidence: f64,
    /// Class name → probability, summing to 1
    pub probabilities: BTreeMap<String, f64>,
    pub audio_path: PathBuf,
}

/// Outcome of one item of `predict_batch`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum BatchPrediction {
    Predicted(Prediction),
    Failed {
        audio_path: PathBuf,
        kind: ErrorKind,
        error: String,
    },
}

/// Prediction served at the boundary, with its presumed-correct feedback record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionReceipt {
    pub request_id: String,
    #[serde(flatten)]
    pub prediction: Prediction,
    pub feedback_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelInfo {
    pub trained: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<SavedModelConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback_stats: Option<FeedbackStats>,
}

pub struct GenderDetector {
    config: AppConfig,
    extractor: Arc<FeatureExtractor>,
    loader: DatasetLoader,
    trainer: ModelTrainer,
    persistence: ModelPersistence,
    feedback: FeedbackManager,
    cache: Option<LoadedModel>,
}

impl GenderDetector {
    /// Validate the configuration, create directories and wire the components
    pub fn new(config: AppConfig) -> Result<Self> {
        config.validate()?;
        config.ensure_directories()?;

        let extractor = Arc::new(FeatureExtractor::new(&config.audio));
        let detector = Self {
            loader: DatasetLoader::new(Arc::clone(&extractor)),
            trainer: ModelTrainer::new(config.model.clone(), config.label_map.clone()),
            persistence: ModelPersistence::new(config.clone()),
            feedback: FeedbackManager::new(config.clone())?,
            extractor,
            config,
            cache: None,
        };

        info!("[Detector] GenderDetector initialized");
        Ok(detector)
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    fn default_classes(&self) -> Vec<String> {
        self.config.class_dir_names()
    }

    /// Train from `data_dir/<class>` directories and persist the result
    ///
    /// `classes` defaults to the lower-cased label names in label-id order.
    pub fn train_initial_model(
        &mut self,
        data_dir: &Path,
        classes: Option<&[String]>,
    ) -> Result<TrainingMetrics> {
        let classes = classes.map_or_else(|| self.default_classes(), <[String]>::to_vec);
        info!(
            "[Detector] Starting initial training from {} (classes: {:?})",
            data_dir.display(),
            classes
        );

        let dataset = self.loader.load_from_directory(data_dir, &classes)?;
        if dataset.is_empty() {
            return Err(PipelineError::invalid_input(format!(
                "no data loaded from {}; check the data directory",
                data_dir.display()
            )));
        }

        let metrics = self.fit_and_save(&dataset)?;
        info!("[Detector] Initial training complete");
        Ok(metrics)
    }

    /// Retrain from scratch on the feedback tree plus optional original data
    ///
    /// # Returns
    /// `Ok(None)` when the feedback directory holds no usable samples
    pub fn retrain_with_feedback(
        &mut self,
        original_data_dir: Option<&Path>,
    ) -> Result<Option<TrainingMetrics>> {
        info!("[Detector] Starting retraining with feedback");
        let classes = self.default_classes();

        let mut dataset = Dataset::default();
        if let Some(dir) = original_data_dir {
            let original = self.loader.load_from_directory(dir, &classes)?;
            info!("[Detector] Loaded {} original samples", original.len());
            dataset.extend(original);
        }

        let feedback = self
            .loader
            .load_from_directory(self.feedback.feedback_dir(), &classes)?;
        if feedback.is_empty() {
            warn!("[Detector] No feedback data available for retraining");
            return Ok(None);
        }
        info!("[Detector] Loaded {} feedback samples", feedback.len());
        dataset.extend(feedback);

        info!("[Detector] Total samples for retraining: {}", dataset.len());
        let metrics = self.fit_and_save(&dataset)?;
        info!("[Detector] Retraining complete");
        Ok(Some(metrics))
    }

    fn fit_and_save(&mut self, dataset: &Dataset) -> Result<TrainingMetrics> {
        let TrainedModel {
            model,
            scaler,
            metrics,
        } = self.trainer.train_model(&dataset.features, &dataset.labels)?;
        self.persistence.save_model(&model, &scaler, &metrics)?;
        self.cache = Some(LoadedModel { model, scaler });
        Ok(metrics)
    }

    /// Replace the cached model with the artifacts currently on disk
    pub fn reload(&mut self) -> Result<()> {
        let (model, scaler) = self.persistence.load_model()?;
        self.cache = Some(LoadedModel { model, scaler });
        info!("[Detector] Model reloaded from disk");
        Ok(())
    }

    fn loaded_model(&mut self) -> Result<&LoadedModel> {
        if self.cache.is_none() {
            info!("[Detector] Loading model for first prediction");
            self.reload()?;
        }
        self.cache
            .as_ref()
            .ok_or_else(|| PipelineError::not_found("Model", &self.config.paths.model_path))
    }

    /// Classify one clip
    pub fn predict(&mut self, audio_path: &Path) -> Result<Prediction> {
        let features = self.extractor.extract_features(audio_path)?;
        let label_map = self.config.label_map.clone();
        let loaded = self.loaded_model()?;

        if features.len() != loaded.scaler.n_features() {
            return Err(PipelineError::invalid_input(format!(
                "model expects {} features but extraction produced {}",
                loaded.scaler.n_features(),
                features.len()
            )));
        }

        let scaled = loaded.scaler.transform_row(features.as_slice());
        let probabilities = loaded.model.predict_proba(&scaled);
        let label_id = loaded.model.predict(&scaled);

        let prediction = label_map
            .get(&label_id)
            .cloned()
            .ok_or(PipelineError::UnknownLabel { label: label_id })?;
        let confidence = probabilities[label_id as usize];
        let probabilities = label_map
            .iter()
            .map(|(label, name)| {
                let p = probabilities.get(*label as usize).copied().unwrap_or(0.0);
                (name.clone(), p)
            })
            .collect();

        info!(
            "[Detector] Prediction: {} (confidence: {:.2}%)",
            prediction,
            confidence * 100.0
        );
        Ok(Prediction {
            prediction,
            label_id,
            confidence,
            probabilities,
            audio_path: audio_path.to_path_buf(),
        })
    }

    /// Classify many clips; failures are reported per item
    pub fn predict_batch<P: AsRef<Path>>(&mut self, audio_paths: &[P]) -> Vec<BatchPrediction> {
        audio_paths
            .iter()
            .map(|path| {
                let path = path.as_ref();
                match self.predict(path) {
                    Ok(prediction) => BatchPrediction::Predicted(prediction),
                    Err(err) => {
                        error!("[Detector] Error predicting {}: {}", path.display(), err);
                        BatchPrediction::Failed {
                            audio_path: path.to_path_buf(),
                            kind: err.kind(),
                            error: err.to_string(),
                        }
                    }
                }
            })
            .collect()
    }

    /// Predict and record a presumed-correct feedback sample under a new request id
    pub fn predict_and_record(&mut self, audio_path: &Path) -> Result<PredictionReceipt> {
        let request_id = Uuid::now_v7().to_string();
        let prediction = self.predict(audio_path)?;
        let feedback_path = self.feedback.record_prediction(
            audio_path,
            prediction.label_id,
            prediction.confidence,
            &request_id,
        )?;

        Ok(PredictionReceipt {
            request_id,
            prediction,
            feedback_path,
        })
    }

    /// Correct a prediction served by `predict_and_record`
    ///
    /// Returns `Ok(false)` for an unknown request id.
    pub fn correct_prediction(
        &self,
        request_id: &str,
        correct_label: u32,
        user_id: Option<&str>,
    ) -> Result<bool> {
        let updated = self
            .feedback
            .update_feedback(request_id, correct_label, user_id)?;
        if updated {
            self.log_threshold()?;
        }
        Ok(updated)
    }

    /// Store a feedback sample and log when retraining is due
    pub fn submit_feedback(
        &self,
        audio_path: &Path,
        predicted_label: u32,
        correct_label: u32,
        user_id: Option<&str>,
        confidence: Option<f64>,
    ) -> Result<PathBuf> {
        let saved = self
            .feedback
            .save_feedback(audio_path, predicted_label, correct_label, user_id, confidence)
            .inspect_err(|err| log_pipeline_error(err, "submit_feedback"))?;
        self.log_threshold()?;
        Ok(saved)
    }

    fn log_threshold(&self) -> Result<()> {
        let total = self.feedback.get_feedback_stats()?.total;
        let threshold = self.config.feedback_threshold;
        if threshold > 0 && total >= threshold && total % threshold == 0 {
            info!(
                "[Detector] Feedback threshold reached ({} samples). Consider retraining the model.",
                total
            );
        }
        Ok(())
    }

    /// K-fold accuracy on a labelled directory; persisted state is untouched
    pub fn cross_validate(&self, data_dir: &Path, folds: usize) -> Result<CrossValidation> {
        let dataset = self
            .loader
            .load_from_directory(data_dir, &self.default_classes())?;
        self.trainer
            .cross_validate(&dataset.features, &dataset.labels, folds)
    }

    pub fn get_feedback_statistics(&self) -> Result<FeedbackStats> {
        self.feedback.get_feedback_stats()
    }

    pub fn clear_feedback(&self, class_name: Option<&str>) -> Result<()> {
        self.feedback.clear_feedback(class_name)
    }

    pub fn is_model_trained(&self) -> bool {
        self.persistence.model_exists()
    }

    pub fn get_model_info(&self) -> Result<ModelInfo> {
        if !self.is_model_trained() {
            return Ok(ModelInfo {
                trained: false,
                config: None,
                feedback_stats: None,
            });
        }

        Ok(ModelInfo {
            trained: true,
            config: Some(self.persistence.load_config()?),
            feedback_stats: Some(self.get_feedback_statistics()?),
        })
    }
}
