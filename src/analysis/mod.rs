// Analysis module - audio feature extraction
//
// Turns fixed-length audio clips into pooled MFCC feature vectors consumed
// by the dataset loader, the trainer and the inference path.

pub mod features;

pub use features::{BatchExtraction, ExtractionOutcome, FeatureExtractor, FeatureVector};
