// Random forest - bagged CART trees with averaged leaf distributions
//
// Every tree is fit on a bootstrap sample of the training rows and
// considers floor(sqrt(n_features)) features per split. Per-tree seeds
// are drawn from the forest seed before any worker starts, so the result
// does not depend on how trees are distributed across threads.

use std::num::NonZeroUsize;
use std::thread;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::tree::{DecisionTree, TreeParams};
use crate::config::ModelConfig;
use crate::error::{PipelineError, Result};

/// Forest hyperparameters
#[derive(Debug, Clone)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub random_state: u64,
    /// Worker threads; all available cores when `None`
    pub n_jobs: Option<usize>,
}

impl From<&ModelConfig> for ForestParams {
    fn from(config: &ModelConfig) -> Self {
        Self {
            n_estimators: config.n_estimators,
            max_depth: config.max_depth,
            min_samples_split: config.min_samples_split,
            random_state: config.random_state,
            n_jobs: config.n_jobs,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    n_classes: usize,
    n_features: usize,
    trees: Vec<DecisionTree>,
}

impl RandomForest {
    /// Fit a forest on `rows` with class ids `labels` in `0..n_classes`
    ///
    /// # Errors
    /// `InvalidInput` for empty, ragged or misaligned data and for labels
    /// outside `0..n_classes`.
    pub fn fit(
        rows: &[Vec<f64>],
        labels: &[u32],
        n_classes: usize,
        params: &ForestParams,
    ) -> Result<Self> {
        if rows.is_empty() || rows.len() != labels.len() {
            return Err(PipelineError::invalid_input(format!(
                "cannot fit forest on {} rows with {} labels",
                rows.len(),
                labels.len()
            )));
        }
        let n_features = rows[0].len();
        if n_features == 0 || rows.iter().any(|row| row.len() != n_features) {
            return Err(PipelineError::invalid_input("ragged or empty feature rows"));
        }
        if let Some(label) = labels.iter().find(|&&l| l as usize >= n_classes) {
            return Err(PipelineError::UnknownLabel { label: *label });
        }
        if params.n_estimators == 0 {
            return Err(PipelineError::invalid_input("n_estimators must be positive"));
        }

        let tree_params = TreeParams {
            max_depth: params.max_depth,
            min_samples_split: params.min_samples_split.max(2),
            max_features: ((n_features as f64).sqrt().floor() as usize).max(1),
        };

        let mut seeder = StdRng::seed_from_u64(params.random_state);
        let seeds: Vec<u64> = (0..params.n_estimators).map(|_| seeder.gen()).collect();

        let workers = params
            .n_jobs
            .unwrap_or_else(|| thread::available_parallelism().map_or(1, NonZeroUsize::get))
            .clamp(1, params.n_estimators);
        let chunk_size = params.n_estimators.div_ceil(workers);

        debug!(
            "[RandomForest] Fitting {} trees on {} rows x {} features with {} workers",
            params.n_estimators,
            rows.len(),
            n_features,
            workers
        );

        let trees = thread::scope(|scope| {
            let handles: Vec<_> = seeds
                .chunks(chunk_size)
                .map(|chunk| {
                    scope.spawn(move || {
                        chunk
                            .iter()
                            .map(|&seed| fit_tree(rows, labels, n_classes, tree_params, seed))
                            .collect::<Vec<_>>()
                    })
                })
                .collect();

            handles
                .into_iter()
                .flat_map(|handle| {
                    handle
                        .join()
                        .unwrap_or_else(|payload| std::panic::resume_unwind(payload))
                })
                .collect::<Vec<_>>()
        });

        Ok(Self {
            n_classes,
            n_features,
            trees,
        })
    }

    /// Mean of the tree leaf distributions, one entry per class id
    pub fn predict_proba(&self, row: &[f64]) -> Vec<f64> {
        let mut proba = vec![0.0; self.n_classes];
        for tree in &self.trees {
            for (p, d) in proba.iter_mut().zip(tree.predict_distribution(row)) {
                *p += d;
            }
        }
        let n_trees = self.trees.len().max(1) as f64;
        proba.iter_mut().for_each(|p| *p /= n_trees);
        proba
    }

    /// Most probable class id; the lowest id wins ties
    pub fn predict(&self, row: &[f64]) -> u32 {
        argmax(&self.predict_proba(row))
    }

    pub fn predict_batch(&self, rows: &[Vec<f64>]) -> Vec<u32> {
        rows.iter().map(|row| self.predict(row)).collect()
    }

    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

fn fit_tree(
    rows: &[Vec<f64>],
    labels: &[u32],
    n_classes: usize,
    params: TreeParams,
    seed: u64,
) -> DecisionTree {
    let mut rng = StdRng::seed_from_u64(seed);
    let n = rows.len();
    let bootstrap: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
    DecisionTree::fit(rows, labels, bootstrap, n_classes, params, &mut rng)
}

pub(crate) fn argmax(values: &[f64]) -> u32 {
    let mut best = 0;
    for (i, v) in values.iter().enumerate() {
        if *v > values[best] {
            best = i;
        }
    }
    best as u32
}
