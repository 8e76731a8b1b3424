// Model module - classifier training, evaluation and inference
//
// Components:
// - scaler: StandardScaler fitted on training rows
// - tree / forest: CART trees bagged into a RandomForest
// - split: stratified train/test and k-fold partitioning
// - metrics: accuracy, weighted F1, confusion matrix, text report
// - trainer: ModelTrainer orchestrating the above

pub mod forest;
pub mod metrics;
pub mod scaler;
pub mod split;
pub mod trainer;
pub mod tree;

pub use forest::{ForestParams, RandomForest};
pub use metrics::{ClassReport, CrossValidation, TrainingMetrics};
pub use scaler::StandardScaler;
pub use trainer::{ModelTrainer, TrainedModel};
