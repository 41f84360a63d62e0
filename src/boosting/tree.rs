//! Regression trees used as boosting stages
//!
//! Trees are grown depth-first to a fixed depth. A node is split at the
//! threshold maximizing Friedman's improvement
//! `n_l·n_r / (n_l + n_r) · (mean_l − mean_r)²`; thresholds sit halfway
//! between consecutive distinct feature values.

use serde::{Deserialize, Serialize};

/// Variance below which a node is not split further
const MIN_IMPURITY: f64 = 1e-12;

/// Growth limits for a single tree
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TreeConfig {
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            max_depth: 3,
            min_samples_split: 2,
            min_samples_leaf: 1,
        }
    }
}

/// Tree node stored in a flat arena
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "lowercase")]
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

#[derive(Debug, Clone, Copy)]
struct BestSplit {
    feature: usize,
    threshold: f64,
    improvement: f64,
}

/// A fitted regression tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    nodes: Vec<Node>,
}

impl RegressionTree {
    /// Grow a tree on rows `x` against `targets`; leaves hold target means
    pub fn fit(x: &[Vec<f64>], targets: &[f64], config: &TreeConfig) -> Self {
        let mut tree = Self { nodes: Vec::new() };
        let indices: Vec<usize> = (0..x.len()).collect();
        tree.grow(x, targets, indices, 0, config);
        tree
    }

    fn grow(
        &mut self,
        x: &[Vec<f64>],
        targets: &[f64],
        indices: Vec<usize>,
        depth: usize,
        config: &TreeConfig,
    ) -> usize {
        let node_id = self.nodes.len();
        let n = indices.len();
        let mean = if n == 0 {
            0.0
        } else {
            indices.iter().map(|&i| targets[i]).sum::<f64>() / n as f64
        };
        self.nodes.push(Node::Leaf { value: mean });

        let impurity = if n == 0 {
            0.0
        } else {
            indices
                .iter()
                .map(|&i| (targets[i] - mean).powi(2))
                .sum::<f64>()
                / n as f64
        };

        if depth >= config.max_depth
            || n < config.min_samples_split
            || n < 2 * config.min_samples_leaf
            || impurity <= MIN_IMPURITY
        {
            return node_id;
        }

        let Some(split) = best_split(x, targets, &indices, config.min_samples_leaf) else {
            return node_id;
        };

        let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
            .into_iter()
            .partition(|&i| x[i][split.feature] <= split.threshold);

        let left = self.grow(x, targets, left_idx, depth + 1, config);
        let right = self.grow(x, targets, right_idx, depth + 1, config);
        self.nodes[node_id] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        node_id
    }

    /// Index of the leaf node `x` falls into
    pub fn apply(&self, x: &[f64]) -> usize {
        let mut id = 0;
        loop {
            match &self.nodes[id] {
                Node::Leaf { .. } => return id,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    id = if x[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    /// Leaf value for `x`
    pub fn predict(&self, x: &[f64]) -> f64 {
        match &self.nodes[self.apply(x)] {
            Node::Leaf { value } => *value,
            Node::Split { .. } => 0.0,
        }
    }

    /// Overwrite the value of a leaf; split nodes are left untouched
    pub fn set_leaf_value(&mut self, node_id: usize, new_value: f64) {
        if let Some(Node::Leaf { value }) = self.nodes.get_mut(node_id) {
            *value = new_value;
        }
    }

    /// Number of nodes
    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Number of leaves
    pub fn n_leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, Node::Leaf { .. }))
            .count()
    }

    /// Depth of the deepest leaf (a lone root has depth 0)
    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], id: usize) -> usize {
            match &nodes[id] {
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
}

fn best_split(
    x: &[Vec<f64>],
    targets: &[f64],
    indices: &[usize],
    min_samples_leaf: usize,
) -> Option<BestSplit> {
    let n = indices.len();
    let total: f64 = indices.iter().map(|&i| targets[i]).sum();
    let n_features = x[indices[0]].len();
    let mut best: Option<BestSplit> = None;

    for feature in 0..n_features {
        let mut order = indices.to_vec();
        order.sort_by(|&a, &b| x[a][feature].total_cmp(&x[b][feature]));

        let mut left_sum = 0.0;
        for split_at in 1..n {
            left_sum += targets[order[split_at - 1]];

            let lo = x[order[split_at - 1]][feature];
            let hi = x[order[split_at]][feature];
            if lo >= hi {
                continue;
            }

            let n_left = split_at;
            let n_right = n - split_at;
            if n_left < min_samples_leaf || n_right < min_samples_leaf {
                continue;
            }

            let mean_left = left_sum / n_left as f64;
            let mean_right = (total - left_sum) / n_right as f64;
            let diff = mean_left - mean_right;
            let improvement = (n_left * n_right) as f64 / n as f64 * diff * diff;

            if best.map_or(true, |b| improvement > b.improvement) {
                let mut threshold = lo + (hi - lo) / 2.0;
                // Guard against the midpoint rounding up to `hi`
                if threshold >= hi {
                    threshold = lo;
                }
                best = Some(BestSplit {
                    feature,
                    threshold,
                    improvement,
                });
            }
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stump_finds_step() {
        let x: Vec<Vec<f64>> = (0..6).map(|i| vec![i as f64]).collect();
        let y = vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];
        let config = TreeConfig {
            max_depth: 1,
            ..TreeConfig::default()
        };
        let tree = RegressionTree::fit(&x, &y, &config);

        assert_eq!(tree.n_leaves(), 2);
        assert_eq!(tree.depth(), 1);
        assert_eq!(tree.predict(&[1.0]), 0.0);
        assert_eq!(tree.predict(&[4.0]), 1.0);
        match &tree.nodes[0] {
            Node::Split { threshold, .. } => assert_eq!(*threshold, 2.5),
            Node::Leaf { .. } => panic!("root should split"),
        }
    }

    #[test]
    fn test_picks_informative_feature() {
        let x = vec![
            vec![5.0, 0.0],
            vec![1.0, 0.1],
            vec![4.0, 0.2],
            vec![2.0, 1.0],
            vec![3.0, 1.1],
            vec![0.0, 1.2],
        ];
        let y = vec![-1.0, -1.0, -1.0, 1.0, 1.0, 1.0];
        let tree = RegressionTree::fit(&x, &y, &TreeConfig::default());

        match &tree.nodes[0] {
            Node::Split { feature, .. } => assert_eq!(*feature, 1),
            Node::Leaf { .. } => panic!("root should split"),
        }
        assert_eq!(tree.predict(&[2.5, 0.05]), -1.0);
    }

    #[test]
    fn test_pure_node_is_leaf() {
        let x = vec![vec![1.0], vec![2.0], vec![3.0]];
        let tree = RegressionTree::fit(&x, &[0.5, 0.5, 0.5], &TreeConfig::default());
        assert_eq!(tree.n_nodes(), 1);
        assert_eq!(tree.predict(&[10.0]), 0.5);
    }

    #[test]
    fn test_depth_limit() {
        let x: Vec<Vec<f64>> = (0..32).map(|i| vec![i as f64]).collect();
        let y: Vec<f64> = (0..32).map(|i| ((i * 7) % 5) as f64).collect();
        let tree = RegressionTree::fit(&x, &y, &TreeConfig::default());
        assert!(tree.depth() <= 3);
        assert!(tree.n_leaves() <= 8);
    }

    #[test]
    fn test_set_leaf_value() {
        let x: Vec<Vec<f64>> = (0..4).map(|i| vec![i as f64]).collect();
        let mut tree = RegressionTree::fit(&x, &[0.0, 0.0, 1.0, 1.0], &TreeConfig::default());
        let leaf = tree.apply(&[3.0]);
        tree.set_leaf_value(leaf, 7.0);
        assert_eq!(tree.predict(&[3.0]), 7.0);
        assert_eq!(tree.predict(&[0.0]), 0.0);
    }
}
