//! Evaluation metrics for the held-out split.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Confusion matrix over the sorted union of true and predicted labels
#[derive(Debug, Clone, PartialEq)]
pub struct ConfusionMatrix {
    pub labels: Vec<u32>,
    /// `counts[truth][predicted]`, indexed by position in `labels`
    pub counts: Vec<Vec<usize>>,
}

impl ConfusionMatrix {
    pub fn from_predictions(y_true: &[u32], y_pred: &[u32]) -> Self {
        let labels: Vec<u32> = y_true
            .iter()
            .chain(y_pred)
            .copied()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let position: BTreeMap<u32, usize> =
            labels.iter().enumerate().map(|(i, &l)| (l, i)).collect();

        let mut counts = vec![vec![0; labels.len()]; labels.len()];
        for (t, p) in y_true.iter().zip(y_pred) {
            counts[position[t]][position[p]] += 1;
        }
        Self { labels, counts }
    }

    pub fn total(&self) -> usize {
        self.counts.iter().flatten().sum()
    }

    pub fn correct(&self) -> usize {
        (0..self.labels.len()).map(|i| self.counts[i][i]).sum()
    }
}

/// Precision/recall statistics for a single class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassReport {
    pub label: u32,
    pub class_name: String,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub support: usize,
}

/// Held-out evaluation of a trained model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingMetrics {
    pub accuracy: f64,
    /// Support-weighted mean of per-class F1
    pub f1_score: f64,
    pub confusion_matrix: Vec<Vec<usize>>,
    /// Label id of each confusion-matrix row/column
    pub labels: Vec<u32>,
    pub per_class: Vec<ClassReport>,
    pub classification_report: String,
    pub n_train: usize,
    pub n_test: usize,
}

/// Per-fold accuracies of a k-fold run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossValidation {
    pub cv_scores: Vec<f64>,
    pub mean_accuracy: f64,
    /// Population standard deviation of `cv_scores`
    pub std_accuracy: f64,
}

impl CrossValidation {
    pub fn from_scores(cv_scores: Vec<f64>) -> Self {
        let n = cv_scores.len().max(1) as f64;
        let mean_accuracy = cv_scores.iter().sum::<f64>() / n;
        let std_accuracy =
            (cv_scores.iter().map(|s| (s - mean_accuracy).powi(2)).sum::<f64>() / n).sqrt();
        Self {
            cv_scores,
            mean_accuracy,
            std_accuracy,
        }
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

pub fn accuracy(y_true: &[u32], y_pred: &[u32]) -> f64 {
    let correct = y_true.iter().zip(y_pred).filter(|(t, p)| t == p).count();
    ratio(correct, y_true.len())
}

/// Per-class precision, recall and F1; zero division yields 0
pub fn per_class_reports(
    matrix: &ConfusionMatrix,
    class_names: &BTreeMap<u32, String>,
) -> Vec<ClassReport> {
    let k = matrix.labels.len();
    (0..k)
        .map(|c| {
            let tp = matrix.counts[c][c];
            let support: usize = matrix.counts[c].iter().sum();
            let predicted: usize = (0..k).map(|r| matrix.counts[r][c]).sum();
            let precision = ratio(tp, predicted);
            let recall = ratio(tp, support);
            let f1_score = if precision + recall > 0.0 {
                2.0 * precision * recall / (precision + recall)
            } else {
                0.0
            };
            let label = matrix.labels[c];
            ClassReport {
                label,
                class_name: class_names
                    .get(&label)
                    .cloned()
                    .unwrap_or_else(|| label.to_string()),
                precision,
                recall,
                f1_score,
                support,
            }
        })
        .collect()
}

fn weighted_mean(reports: &[ClassReport], value: impl Fn(&ClassReport) -> f64) -> f64 {
    let total: usize = reports.iter().map(|r| r.support).sum();
    if total == 0 {
        return 0.0;
    }
    reports
        .iter()
        .map(|r| value(r) * r.support as f64)
        .sum::<f64>()
        / total as f64
}

fn macro_mean(reports: &[ClassReport], value: impl Fn(&ClassReport) -> f64) -> f64 {
    if reports.is_empty() {
        return 0.0;
    }
    reports.iter().map(value).sum::<f64>() / reports.len() as f64
}

/// Text table in the classic precision / recall / f1-score / support layout
pub fn classification_report(reports: &[ClassReport], accuracy: f64) -> String {
    const HEADERS: [&str; 4] = ["precision", "recall", "f1-score", "support"];
    let width = reports
        .iter()
        .map(|r| r.class_name.len())
        .chain(std::iter::once("weighted avg".len()))
        .max()
        .unwrap_or(12);
    let total: usize = reports.iter().map(|r| r.support).sum();

    let row = |name: &str, p: f64, r: f64, f: f64, support: usize| {
        format!(
            "{:>width$}  {:>9.2} {:>9.2} {:>9.2} {:>9}\n",
            name,
            p,
            r,
            f,
            support,
            width = width
        )
    };

    let mut out = format!("{:>width$} ", "", width = width);
    for header in HEADERS {
        out.push_str(&format!(" {:>9}", header));
    }
    out.push_str("\n\n");

    for report in reports {
        out.push_str(&row(
            &report.class_name,
            report.precision,
            report.recall,
            report.f1_score,
            report.support,
        ));
    }
    out.push('\n');

    out.push_str(&format!(
        "{:>width$}  {:>9} {:>9} {:>9.2} {:>9}\n",
        "accuracy",
        "",
        "",
        accuracy,
        total,
        width = width
    ));
    out.push_str(&row(
        "macro avg",
        macro_mean(reports, |r| r.precision),
        macro_mean(reports, |r| r.recall),
        macro_mean(reports, |r| r.f1_score),
        total,
    ));
    out.push_str(&row(
        "weighted avg",
        weighted_mean(reports, |r| r.precision),
        weighted_mean(reports, |r| r.recall),
        weighted_mean(reports, |r| r.f1_score),
        total,
    ));
    out
}

/// Compute every held-out metric for one evaluation
pub fn evaluate(
    y_true: &[u32],
    y_pred: &[u32],
    class_names: &BTreeMap<u32, String>,
    n_train: usize,
) -> TrainingMetrics {
    let matrix = ConfusionMatrix::from_predictions(y_true, y_pred);
    let per_class = per_class_reports(&matrix, class_names);
    let accuracy = accuracy(y_true, y_pred);
    let f1_score = weighted_mean(&per_class, |r| r.f1_score);
    let classification_report = classification_report(&per_class, accuracy);

    TrainingMetrics {
        accuracy,
        f1_score,
        confusion_matrix: matrix.counts,
        labels: matrix.labels,
        per_class,
        classification_report,
        n_train,
        n_test: y_true.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names() -> BTreeMap<u32, String> {
        BTreeMap::from([(0, "Female".to_string()), (1, "Male".to_string())])
    }

    #[test]
    fn test_confusion_matrix_union_of_labels() {
        let matrix = ConfusionMatrix::from_predictions(&[0, 0, 1, 1], &[0, 1, 1, 1]);
        assert_eq!(matrix.labels, vec![0, 1]);
        assert_eq!(matrix.counts, vec![vec![1, 1], vec![0, 2]]);
        assert_eq!(matrix.total(), 4);
        assert_eq!(matrix.correct(), 3);

        // Predicted-only label still gets a row and column
        let matrix = ConfusionMatrix::from_predictions(&[0, 0], &[0, 1]);
        assert_eq!(matrix.labels, vec![0, 1]);
        assert_eq!(matrix.counts, vec![vec![1, 1], vec![0, 0]]);
    }

    #[test]
    fn test_evaluate_scores() {
        let metrics = evaluate(&[0, 0, 1, 1], &[0, 1, 1, 1], &names(), 8);
        assert!((metrics.accuracy - 0.75).abs() < 1e-12);

        let female = &metrics.per_class[0];
        assert_eq!(female.precision, 1.0);
        assert_eq!(female.recall, 0.5);
        let male = &metrics.per_class[1];
        assert!((male.precision - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(male.recall, 1.0);

        // Weighted F1 = (0.6667 * 2 + 0.8 * 2) / 4
        assert!((metrics.f1_score - (2.0 / 3.0 + 0.8) / 2.0).abs() < 1e-9);
        assert_eq!(metrics.n_train, 8);
        assert_eq!(metrics.n_test, 4);
    }

    #[test]
    fn test_zero_division_is_zero() {
        let metrics = evaluate(&[0, 0], &[1, 1], &names(), 2);
        assert_eq!(metrics.accuracy, 0.0);
        assert_eq!(metrics.f1_score, 0.0);
        assert_eq!(metrics.per_class[1].precision, 0.0);
        assert_eq!(metrics.per_class[1].support, 0);
    }

    #[test]
    fn test_classification_report_layout() {
        let metrics = evaluate(&[0, 0, 1, 1], &[0, 1, 1, 1], &names(), 8);
        let report = &metrics.classification_report;
        let lines: Vec<&str> = report.lines().collect();
        assert_eq!(
            lines[0],
            "              precision    recall  f1-score   support"
        );
        assert_eq!(lines[2], "      Female       1.00      0.50      0.67         2");
        assert_eq!(lines[5], "    accuracy                           0.75         4");
        assert!(lines[7].starts_with("weighted avg"));
    }

    #[test]
    fn test_cross_validation_summary() {
        let cv = CrossValidation::from_scores(vec![0.5, 1.0]);
        assert_eq!(cv.mean_accuracy, 0.75);
        assert_eq!(cv.std_accuracy, 0.25);
    }
}
