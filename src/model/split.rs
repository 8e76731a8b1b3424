// Split module - stratified train/test and k-fold partitioning
//
// Both splitters work on row indices and keep every class represented on
// each side. The shuffle split is seeded; k-fold assignment is
// deterministic (round-robin within each class, in row order).

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::error::{PipelineError, Result};

/// Row indices on each side of a train/test split
#[derive(Debug, Clone, PartialEq)]
pub struct TrainTestIndices {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

fn rows_by_class(labels: &[u32]) -> BTreeMap<u32, Vec<usize>> {
    let mut groups: BTreeMap<u32, Vec<usize>> = BTreeMap::new();
    for (row, &label) in labels.iter().enumerate() {
        groups.entry(label).or_default().push(row);
    }
    groups
}

/// Stratified shuffle split holding out `test_size` of every class
///
/// # Errors
/// `InvalidInput` when fewer than two classes are present or any class has
/// fewer than two rows.
pub fn stratified_train_test_split(
    labels: &[u32],
    test_size: f64,
    seed: u64,
) -> Result<TrainTestIndices> {
    let groups = rows_by_class(labels);
    if groups.len() < 2 {
        return Err(PipelineError::invalid_input(format!(
            "stratified split needs at least 2 classes, found {}",
            groups.len()
        )));
    }
    if let Some((label, rows)) = groups.iter().find(|(_, rows)| rows.len() < 2) {
        return Err(PipelineError::invalid_input(format!(
            "class {} has {} sample(s); at least 2 are required",
            label,
            rows.len()
        )));
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut train = Vec::new();
    let mut test = Vec::new();
    for (_, mut rows) in groups {
        rows.shuffle(&mut rng);
        let n_test = ((rows.len() as f64 * test_size).round() as usize).clamp(1, rows.len() - 1);
        test.extend_from_slice(&rows[..n_test]);
        train.extend_from_slice(&rows[n_test..]);
    }
    train.shuffle(&mut rng);
    test.shuffle(&mut rng);

    Ok(TrainTestIndices { train, test })
}

/// Stratified k-fold: returns one train/test pair per fold
///
/// # Errors
/// `InvalidInput` unless `2 <= folds <= smallest class count`.
pub fn stratified_k_fold(labels: &[u32], folds: usize) -> Result<Vec<TrainTestIndices>> {
    let groups = rows_by_class(labels);
    let smallest = groups.values().map(Vec::len).min().unwrap_or(0);
    if folds < 2 || folds > smallest {
        return Err(PipelineError::invalid_input(format!(
            "folds must lie in [2, {}] (smallest class count), got {}",
            smallest, folds
        )));
    }

    let mut fold_of_row = vec![0usize; labels.len()];
    for rows in groups.values() {
        for (position, &row) in rows.iter().enumerate() {
            fold_of_row[row] = position % folds;
        }
    }

    Ok((0..folds)
        .map(|fold| {
            let (test, train): (Vec<usize>, Vec<usize>) =
                (0..labels.len()).partition(|&row| fold_of_row[row] == fold);
            TrainTestIndices { train, test }
        })
        .collect())
}

/// Gather rows (and labels) by index
pub fn select<T: Clone>(values: &[T], indices: &[usize]) -> Vec<T> {
    indices.iter().map(|&i| values[i].clone()).collect()
}
