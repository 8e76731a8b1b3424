// Voice Gender - speaker gender classification from short audio clips
// MFCC features, random forest classifier, feedback-driven retraining

// Module declarations
pub mod analysis;
pub mod audio;
pub mod config;
pub mod dataset;
pub mod error;
pub mod facade;
pub mod feedback;
pub mod logging;
pub mod model;
pub mod persistence;

// Re-exports for convenience
pub use config::AppConfig;
pub use error::{ErrorKind, PipelineError};
pub use facade::{BatchPrediction, GenderDetector, ModelInfo, Prediction, PredictionReceipt};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_structure() {
        // Verify the public surface is reachable from the crate root
        let config = AppConfig::default();
        assert_eq!(config.feature_len(), 2 * config.audio.n_mfcc);
        let extractor = analysis::FeatureExtractor::new(&config.audio);
        assert_eq!(extractor.feature_len(), config.feature_len());
    }
}
