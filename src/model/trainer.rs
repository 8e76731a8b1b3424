// ModelTrainer - split, scale, fit and evaluate
//
// Training pipeline:
// 1. Validate the sample set (aligned, non-empty, known labels, >= 2 classes)
// 2. Stratified, seeded train/test split
// 3. Fit the scaler on the training rows only, apply to both sides
// 4. Fit the random forest on the scaled training rows
// 5. Evaluate on the held-out rows

use std::collections::{BTreeMap, BTreeSet};

use tracing::info;

use super::forest::{ForestParams, RandomForest};
use super::metrics::{self, CrossValidation, TrainingMetrics};
use super::scaler::StandardScaler;
use super::split::{select, stratified_k_fold, stratified_train_test_split};
use crate::config::ModelConfig;
use crate::error::{PipelineError, Result};

/// Fitted classifier, scaler and held-out metrics of one training run
#[derive(Debug, Clone)]
pub struct TrainedModel {
    pub model: RandomForest,
    pub scaler: StandardScaler,
    pub metrics: TrainingMetrics,
}

pub struct ModelTrainer {
    config: ModelConfig,
    label_map: BTreeMap<u32, String>,
}

impl ModelTrainer {
    pub fn new(config: ModelConfig, label_map: BTreeMap<u32, String>) -> Self {
        Self { config, label_map }
    }

    fn n_classes(&self) -> usize {
        self.label_map.len()
    }

    fn validate(&self, features: &[Vec<f64>], labels: &[u32]) -> Result<()> {
        if features.is_empty() {
            return Err(PipelineError::invalid_input("no training samples"));
        }
        if features.len() != labels.len() {
            return Err(PipelineError::invalid_input(format!(
                "{} feature rows but {} labels",
                features.len(),
                labels.len()
            )));
        }
        if let Some(&label) = labels.iter().find(|&&l| !self.label_map.contains_key(&l)) {
            return Err(PipelineError::UnknownLabel { label });
        }
        let distinct: BTreeSet<u32> = labels.iter().copied().collect();
        if distinct.len() < 2 {
            return Err(PipelineError::invalid_input(format!(
                "training needs at least 2 classes, found {}",
                distinct.len()
            )));
        }
        Ok(())
    }

    /// Train on a stratified split and evaluate on the held-out part
    ///
    /// # Errors
    /// `InvalidInput` for empty, misaligned or single-class data, or when a
    /// class has too few rows to appear on both sides of the split.
    pub fn train_model(&self, features: &[Vec<f64>], labels: &[u32]) -> Result<TrainedModel> {
        self.validate(features, labels)?;

        let split =
            stratified_train_test_split(labels, self.config.test_size, self.config.random_state)?;
        info!(
            "[ModelTrainer] Training on {} samples, evaluating on {}",
            split.train.len(),
            split.test.len()
        );

        let x_train = select(features, &split.train);
        let y_train = select(labels, &split.train);
        let x_test = select(features, &split.test);
        let y_test = select(labels, &split.test);

        let scaler = StandardScaler::fit(&x_train)?;
        let x_train = scaler.transform(&x_train);
        let x_test = scaler.transform(&x_test);

        let model = RandomForest::fit(
            &x_train,
            &y_train,
            self.n_classes(),
            &ForestParams::from(&self.config),
        )?;

        let y_pred = model.predict_batch(&x_test);
        let metrics = metrics::evaluate(&y_test, &y_pred, &self.label_map, split.train.len());

        info!(
            "[ModelTrainer] Accuracy: {:.4}, weighted F1: {:.4}",
            metrics.accuracy, metrics.f1_score
        );
        info!(
            "[ModelTrainer] Classification report:\n{}",
            metrics.classification_report
        );

        Ok(TrainedModel {
            model,
            scaler,
            metrics,
        })
    }

    /// Stratified k-fold accuracy with a fresh scaler and forest per fold
    pub fn cross_validate(
        &self,
        features: &[Vec<f64>],
        labels: &[u32],
        folds: usize,
    ) -> Result<CrossValidation> {
        self.validate(features, labels)?;
        let params = ForestParams::from(&self.config);

        let mut scores = Vec::with_capacity(folds);
        for (fold, indices) in stratified_k_fold(labels, folds)?.into_iter().enumerate() {
            let x_train = select(features, &indices.train);
            let y_train = select(labels, &indices.train);

            let scaler = StandardScaler::fit(&x_train)?;
            let model =
                RandomForest::fit(&scaler.transform(&x_train), &y_train, self.n_classes(), &params)?;

            let y_test = select(labels, &indices.test);
            let y_pred = model.predict_batch(&scaler.transform(&select(features, &indices.test)));
            let score = metrics::accuracy(&y_test, &y_pred);
            info!("[ModelTrainer] Fold {}/{} accuracy: {:.4}", fold + 1, folds, score);
            scores.push(score);
        }

        let cv = CrossValidation::from_scores(scores);
        info!(
            "[ModelTrainer] Cross-validation accuracy: {:.4} (+/- {:.4})",
            cv.mean_accuracy, cv.std_accuracy
        );
        Ok(cv)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn label_map() -> BTreeMap<u32, String> {
        BTreeMap::from([(0, "Female".to_string()), (1, "Male".to_string())])
    }

    fn trainer() -> ModelTrainer {
        let config = ModelConfig {
            n_estimators: 20,
            ..ModelConfig::default()
        };
        ModelTrainer::new(config, label_map())
    }

    fn two_clusters(per_class: usize) -> (Vec<Vec<f64>>, Vec<u32>) {
        let mut features = Vec::new();
        let mut labels = Vec::new();
        for i in 0..per_class {
            let wobble = (i as f64).cos() * 0.2;
            features.push(vec![10.0 + wobble, 200.0 - wobble, 3.0]);
            labels.push(0);
            features.push(vec![-10.0 - wobble, 100.0 + wobble, 3.0]);
            labels.push(1);
        }
        (features, labels)
    }

    #[test]
    fn test_train_model_on_separable_data() {
        let (features, labels) = two_clusters(10);
        let trained = trainer().train_model(&features, &labels).unwrap();

        assert_eq!(trained.metrics.accuracy, 1.0);
        assert_eq!(trained.metrics.f1_score, 1.0);
        assert_eq!(trained.metrics.n_train + trained.metrics.n_test, 20);
        assert_eq!(trained.metrics.n_test, 4);
        assert_eq!(trained.metrics.confusion_matrix, vec![vec![2, 0], vec![0, 2]]);
        assert_eq!(trained.scaler.n_features(), 3);
        assert_eq!(trained.model.n_classes(), 2);
    }

    #[test]
    fn test_training_is_reproducible() {
        let (features, labels) = two_clusters(6);
        let a = trainer().train_model(&features, &labels).unwrap();
        let b = trainer().train_model(&features, &labels).unwrap();
        assert_eq!(a.model, b.model);
        assert_eq!(a.scaler, b.scaler);
    }

    #[test]
    fn test_rejects_unusable_input() {
        let t = trainer();
        assert!(matches!(
            t.train_model(&[], &[]),
            Err(PipelineError::InvalidInput { .. })
        ));
        let single = vec![vec![1.0], vec![2.0], vec![3.0]];
        assert!(matches!(
            t.train_model(&single, &[0, 0, 0]),
            Err(PipelineError::InvalidInput { .. })
        ));
        assert!(matches!(
            t.train_model(&single, &[0, 1, 7]),
            Err(PipelineError::UnknownLabel { label: 7 })
        ));
    }

    #[test]
    fn test_cross_validate() {
        let (features, labels) = two_clusters(6);
        let cv = trainer().cross_validate(&features, &labels, 3).unwrap();
        assert_eq!(cv.cv_scores.len(), 3);
        assert_eq!(cv.mean_accuracy, 1.0);
        assert_eq!(cv.std_accuracy, 0.0);

        assert!(trainer().cross_validate(&features, &labels, 7).is_err());
    }
}
