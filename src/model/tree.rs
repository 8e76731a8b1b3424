// Decision tree - CART classifier with Gini impurity
//
// Trees are stored as a flat arena of nodes; node 0 is the root. Each
// split sends `x[feature] <= threshold` to the left child. Leaves keep the
// normalised class distribution of the training rows that reached them.
//
// At every node the candidate features are visited in random order and
// the search stops once `max_features` non-constant features have been
// evaluated, so constant columns never use up the feature budget.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

/// Growth limits shared by every tree of a forest
#[derive(Debug, Clone, Copy)]
pub struct TreeParams {
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub max_features: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    Leaf {
        distribution: Vec<f64>,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    nodes: Vec<Node>,
}

struct SplitCandidate {
    feature: usize,
    threshold: f64,
    impurity: f64,
}

/// Borrowed training data for one tree
struct TreeBuilder<'a> {
    rows: &'a [Vec<f64>],
    labels: &'a [u32],
    n_classes: usize,
    params: TreeParams,
    nodes: Vec<Node>,
}

impl DecisionTree {
    /// Grow a tree on the rows selected by `samples` (duplicates allowed)
    pub fn fit(
        rows: &[Vec<f64>],
        labels: &[u32],
        samples: Vec<usize>,
        n_classes: usize,
        params: TreeParams,
        rng: &mut StdRng,
    ) -> Self {
        let mut builder = TreeBuilder {
            rows,
            labels,
            n_classes,
            params,
            nodes: Vec::new(),
        };
        builder.grow(samples, 0, rng);
        Self {
            nodes: builder.nodes,
        }
    }

    /// Class distribution of the leaf reached by `row`
    pub fn predict_distribution(&self, row: &[f64]) -> &[f64] {
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                Node::Leaf { distribution } => return distribution,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    index = if row[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn depth(&self) -> usize {
        self.depth_from(0)
    }

    fn depth_from(&self, index: usize) -> usize {
        match &self.nodes[index] {
            Node::Leaf { .. } => 0,
            Node::Split { left, right, .. } => {
                1 + self.depth_from(*left).max(self.depth_from(*right))
            }
        }
    }
}

impl TreeBuilder<'_> {
    /// Build the subtree for `samples` and return its node index
    fn grow(&mut self, samples: Vec<usize>, depth: usize, rng: &mut StdRng) -> usize {
        let counts = self.class_counts(&samples);
        let impurity = gini(&counts, samples.len());

        let depth_reached = self.params.max_depth.is_some_and(|max| depth >= max);
        let stop = impurity <= f64::EPSILON
            || samples.len() < self.params.min_samples_split
            || depth_reached;

        let split = if stop {
            None
        } else {
            self.best_split(&samples, rng)
        };

        let Some(split) = split else {
            return self.push_leaf(&counts, samples.len());
        };

        let (left_samples, right_samples): (Vec<usize>, Vec<usize>) = samples
            .into_iter()
            .partition(|&i| self.rows[i][split.feature] <= split.threshold);

        // Reserve the slot so the parent precedes its children in the arena
        let index = self.nodes.len();
        self.nodes.push(Node::Leaf {
            distribution: Vec::new(),
        });
        let left = self.grow(left_samples, depth + 1, rng);
        let right = self.grow(right_samples, depth + 1, rng);
        self.nodes[index] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        index
    }

    fn push_leaf(&mut self, counts: &[usize], total: usize) -> usize {
        let total = total.max(1) as f64;
        self.nodes.push(Node::Leaf {
            distribution: counts.iter().map(|&c| c as f64 / total).collect(),
        });
        self.nodes.len() - 1
    }

    fn class_counts(&self, samples: &[usize]) -> Vec<usize> {
        let mut counts = vec![0; self.n_classes];
        for &i in samples {
            counts[self.labels[i] as usize] += 1;
        }
        counts
    }

    fn best_split(&self, samples: &[usize], rng: &mut StdRng) -> Option<SplitCandidate> {
        let n_features = self.rows[samples[0]].len();
        let mut features: Vec<usize> = (0..n_features).collect();
        features.shuffle(rng);

        let mut best: Option<SplitCandidate> = None;
        let mut evaluated = 0;
        let mut order = samples.to_vec();

        for feature in features {
            if evaluated >= self.params.max_features {
                break;
            }

            order.sort_by(|&a, &b| self.rows[a][feature].total_cmp(&self.rows[b][feature]));
            let lowest = self.rows[order[0]][feature];
            let highest = self.rows[order[order.len() - 1]][feature];
            if lowest >= highest {
                continue;
            }
            evaluated += 1;

            if let Some(candidate) = self.scan_feature(&order, feature) {
                if best
                    .as_ref()
                    .map_or(true, |current| candidate.impurity < current.impurity)
                {
                    best = Some(candidate);
                }
            }
        }

        best
    }

    /// Sweep thresholds over rows sorted by `feature`
    fn scan_feature(&self, order: &[usize], feature: usize) -> Option<SplitCandidate> {
        let total = order.len();
        let mut right = self.class_counts(order);
        let mut left = vec![0usize; self.n_classes];
        let mut best: Option<SplitCandidate> = None;

        for position in 1..total {
            let moved = self.labels[order[position - 1]] as usize;
            left[moved] += 1;
            right[moved] -= 1;

            let previous = self.rows[order[position - 1]][feature];
            let current = self.rows[order[position]][feature];
            if current <= previous {
                continue;
            }

            let n_left = position;
            let n_right = total - position;
            let impurity = (n_left as f64 * gini(&left, n_left)
                + n_right as f64 * gini(&right, n_right))
                / total as f64;

            if best.as_ref().map_or(true, |b| impurity < b.impurity) {
                let mut threshold = previous + (current - previous) / 2.0;
                if threshold >= current {
                    threshold = previous;
                }
                best = Some(SplitCandidate {
                    feature,
                    threshold,
                    impurity,
                });
            }
        }

        best
    }
}

fn gini(counts: &[usize], total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let total = total as f64;
    1.0 - counts
        .iter()
        .map(|&c| {
            let p = c as f64 / total;
            p * p
        })
        .sum::<f64>()
}
