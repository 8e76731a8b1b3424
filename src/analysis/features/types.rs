// Types module - Data structures for audio features
//
// This module defines the pooled feature vector and the per-item outcome
// types used by batch extraction.

use std::path::PathBuf;

use crate::error::ExtractionError;

/// Pooled MFCC statistics for one clip
///
/// Layout: `[mean_0 .. mean_{n-1}, std_0 .. std_{n-1}]`, length `2 × n_mfcc`.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    values: Vec<f64>,
}

impl FeatureVector {
    pub fn from_stats(means: Vec<f64>, stds: Vec<f64>) -> Self {
        let mut values = means;
        values.extend(stds);
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    pub fn into_vec(self) -> Vec<f64> {
        self.values
    }

    /// Per-coefficient means (first half)
    pub fn means(&self) -> &[f64] {
        &self.values[..self.values.len() / 2]
    }

    /// Per-coefficient population standard deviations (second half)
    pub fn stds(&self) -> &[f64] {
        &self.values[self.values.len() / 2..]
    }

    pub fn is_finite(&self) -> bool {
        self.values.iter().all(|v| v.is_finite())
    }
}

/// Result of extracting one file within a batch
#[derive(Debug, Clone)]
pub enum ExtractionOutcome {
    Extracted {
        path: PathBuf,
        features: FeatureVector,
    },
    Failed {
        path: PathBuf,
        error: ExtractionError,
    },
}

impl ExtractionOutcome {
    pub fn path(&self) -> &PathBuf {
        match self {
            ExtractionOutcome::Extracted { path, .. } | ExtractionOutcome::Failed { path, .. } => {
                path
            }
        }
    }
}

/// Ordered per-item results of a batch extraction
///
/// Keeps failures alongside successes so callers can tell "no input" from
/// "every input failed".
#[derive(Debug, Clone, Default)]
pub struct BatchExtraction {
    pub outcomes: Vec<ExtractionOutcome>,
}

impl BatchExtraction {
    /// Feature rows of the successful items, in input order
    pub fn features(&self) -> Vec<&FeatureVector> {
        self.outcomes
            .iter()
            .filter_map(|outcome| match outcome {
                ExtractionOutcome::Extracted { features, .. } => Some(features),
                ExtractionOutcome::Failed { .. } => None,
            })
            .collect()
    }

    /// Paths and errors of the failed items
    pub fn failures(&self) -> Vec<(&PathBuf, &ExtractionError)> {
        self.outcomes
            .iter()
            .filter_map(|outcome| match outcome {
                ExtractionOutcome::Failed { path, error } => Some((path, error)),
                ExtractionOutcome::Extracted { .. } => None,
            })
            .collect()
    }

    pub fn succeeded(&self) -> usize {
        self.features().len()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
}
