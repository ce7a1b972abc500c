//! Least-squares regression tree
//!
//! Trees are grown depth-first with exact greedy splits. Nodes live in a flat
//! vector; index 0 is the root.

use serde::{Deserialize, Serialize};

/// Growth limits for a single tree
#[derive(Debug, Clone, Copy)]
pub struct TreeParams {
    pub max_depth: usize,
    pub min_samples_leaf: usize,
    pub min_split_gain: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    nodes: Vec<Node>,
}

#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    feature: usize,
    threshold: f64,
    gain: f64,
}

impl RegressionTree {
    /// Fit a tree to `targets` using only the rows listed in `rows`
    ///
    /// `features[i]` is the feature row for sample `i`. Leaves store the mean
    /// target of the rows that reach them.
    pub fn fit(features: &[Vec<f64>], targets: &[f64], rows: &[usize], params: &TreeParams) -> Self {
        let mut tree = Self { nodes: Vec::new() };
        let mut rows = rows.to_vec();
        tree.grow(features, targets, &mut rows, 0, params);
        tree
    }

    fn grow(
        &mut self,
        features: &[Vec<f64>],
        targets: &[f64],
        rows: &mut [usize],
        depth: usize,
        params: &TreeParams,
    ) -> usize {
        let id = self.nodes.len();
        let leaf_value = mean(targets, rows);
        self.nodes.push(Node::Leaf { value: leaf_value });

        if depth >= params.max_depth || rows.len() < 2 * params.min_samples_leaf.max(1) {
            return id;
        }

        let Some(best) = best_split(features, targets, rows, params) else {
            return id;
        };

        let split_at = partition(rows, |row| features[row][best.feature] <= best.threshold);
        let (left_rows, right_rows) = rows.split_at_mut(split_at);

        let left = self.grow(features, targets, left_rows, depth + 1, params);
        let right = self.grow(features, targets, right_rows, depth + 1, params);

        self.nodes[id] = Node::Split {
            feature: best.feature,
            threshold: best.threshold,
            left,
            right,
        };
        id
    }

    pub fn predict(&self, row: &[f64]) -> f64 {
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    index = if row[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn leaf_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|node| matches!(node, Node::Leaf { .. }))
            .count()
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], index: usize) -> usize {
            match &nodes[index] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, *left).max(walk(nodes, *right)),
            }
        }
        if self.nodes.is_empty() {
            0
        } else {
            walk(&self.nodes, 0)
        }
    }

    /// Structural sanity check used when loading a persisted model
    pub fn is_well_formed(&self, feature_count: usize) -> bool {
        !self.nodes.is_empty()
            && self.nodes.iter().enumerate().all(|(index, node)| match node {
                Node::Leaf { value } => value.is_finite(),
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    *feature < feature_count
                        && threshold.is_finite()
                        && *left > index
                        && *right > index
                        && *left < self.nodes.len()
                        && *right < self.nodes.len()
                }
            })
    }
}

fn mean(targets: &[f64], rows: &[usize]) -> f64 {
    if rows.is_empty() {
        return 0.0;
    }
    rows.iter().map(|&row| targets[row]).sum::<f64>() / rows.len() as f64
}

/// Scan every feature for the split with the largest squared-error reduction
fn best_split(
    features: &[Vec<f64>],
    targets: &[f64],
    rows: &[usize],
    params: &TreeParams,
) -> Option<SplitCandidate> {
    let n = rows.len();
    let min_leaf = params.min_samples_leaf.max(1);
    let total: f64 = rows.iter().map(|&row| targets[row]).sum();
    let parent_score = total * total / n as f64;
    let feature_count = features[rows[0]].len();

    let mut best: Option<SplitCandidate> = None;
    let mut sorted = rows.to_vec();

    for feature in 0..feature_count {
        sorted.sort_by(|&a, &b| features[a][feature].total_cmp(&features[b][feature]));

        let mut left_sum = 0.0;
        for i in 1..n {
            left_sum += targets[sorted[i - 1]];

            let left_n = i;
            let right_n = n - i;
            if left_n < min_leaf {
                continue;
            }
            if right_n < min_leaf {
                break;
            }

            let lo = features[sorted[i - 1]][feature];
            let hi = features[sorted[i]][feature];
            if lo == hi {
                continue;
            }

            let right_sum = total - left_sum;
            let gain = left_sum * left_sum / left_n as f64 + right_sum * right_sum / right_n as f64
                - parent_score;

            if gain > params.min_split_gain && best.map_or(true, |b| gain > b.gain) {
                best = Some(SplitCandidate {
                    feature,
                    threshold: lo + (hi - lo) / 2.0,
                    gain,
                });
            }
        }
    }

    best
}

/// Stable in-place partition; returns the number of rows satisfying `pred`
fn partition(rows: &mut [usize], pred: impl Fn(usize) -> bool) -> usize {
    let (mut matched, rest): (Vec<usize>, Vec<usize>) = rows.iter().partition(|&&row| pred(row));
    let split_at = matched.len();
    matched.extend(rest);
    rows.copy_from_slice(&matched);
    split_at
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(max_depth: usize, min_samples_leaf: usize) -> TreeParams {
        TreeParams {
            max_depth,
            min_samples_leaf,
            min_split_gain: 1e-12,
        }
    }

    #[test]
    fn test_step_function_is_learned_exactly() {
        let features: Vec<Vec<f64>> = (0..10).map(|i| vec![i as f64]).collect();
        let targets: Vec<f64> = (0..10).map(|i| if i < 5 { 1.0 } else { 3.0 }).collect();
        let rows: Vec<usize> = (0..10).collect();

        let tree = RegressionTree::fit(&features, &targets, &rows, &params(3, 1));

        assert_eq!(tree.predict(&[2.0]), 1.0);
        assert_eq!(tree.predict(&[7.0]), 3.0);
        assert_eq!(tree.predict(&[4.5]), 1.0);
        assert!(tree.is_well_formed(1));
    }

    #[test]
    fn test_constant_target_stays_a_single_leaf() {
        let features: Vec<Vec<f64>> = (0..8).map(|i| vec![i as f64, 1.0]).collect();
        let targets = vec![4.0; 8];
        let rows: Vec<usize> = (0..8).collect();

        let tree = RegressionTree::fit(&features, &targets, &rows, &params(4, 1));
        assert_eq!(tree.node_count(), 1);
        assert_eq!(tree.predict(&[100.0, 0.0]), 4.0);
    }

    #[test]
    fn test_min_samples_leaf_and_depth_are_respected() {
        let features: Vec<Vec<f64>> = (0..40).map(|i| vec![i as f64]).collect();
        let targets: Vec<f64> = (0..40).map(|i| (i * i) as f64).collect();
        let rows: Vec<usize> = (0..40).collect();

        let tree = RegressionTree::fit(&features, &targets, &rows, &params(2, 10));
        assert!(tree.depth() <= 2);
        assert!(tree.leaf_count() <= 4);
    }

    #[test]
    fn test_uses_only_listed_rows() {
        let features: Vec<Vec<f64>> = (0..6).map(|i| vec![i as f64]).collect();
        let targets = vec![1.0, 1.0, 1.0, 100.0, 100.0, 100.0];

        let tree = RegressionTree::fit(&features, &targets, &[0, 1, 2], &params(3, 1));
        assert_eq!(tree.predict(&[5.0]), 1.0);
    }
}
