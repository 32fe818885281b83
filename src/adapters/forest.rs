//! Random forest classifier over flat, array-encoded decision trees.
//!
//! Each tree is a node array in the layout scikit-learn exports: internal
//! nodes route left when `x[feature] <= threshold`, leaves have `left < 0` and
//! carry per-class weights in `value`. The forest probability is the mean of
//! the normalized class-1 weight of every tree's leaf.

use serde::Deserialize;

use crate::ports::{check_width, Classifier, ModelError};

/// One node of a flattened decision tree.
#[derive(Debug, Clone, Deserialize)]
pub struct TreeNode {
    /// Split feature index; ignored on leaves
    #[serde(default)]
    pub feature: i64,
    #[serde(default)]
    pub threshold: f64,
    /// Left child index, negative on leaves
    pub left: i64,
    pub right: i64,
    /// Class weights `[class 0, class 1]`
    pub value: [f64; 2],
}

impl TreeNode {
    fn is_leaf(&self) -> bool {
        self.left < 0
    }

    fn positive_fraction(&self) -> f64 {
        self.value[1] / (self.value[0] + self.value[1])
    }
}

#[derive(Debug, Deserialize)]
struct DecisionTreeNodes {
    nodes: Vec<TreeNode>,
}

/// A validated decision tree.
///
/// Invariant: every child index is greater than its parent's index and within
/// bounds, so traversal from the root always terminates on a leaf. Split
/// features are below `n_features`.
#[derive(Debug, Clone)]
pub struct DecisionTree {
    nodes: Vec<TreeNode>,
    n_features: usize,
}

impl DecisionTree {
    /// Validate a node array against the forest width.
    ///
    /// # Errors
    /// Returns a description of the first structural problem found.
    pub fn new(nodes: Vec<TreeNode>, n_features: usize) -> Result<Self, String> {
        if nodes.is_empty() {
            return Err("tree has no nodes".into());
        }

        for (idx, node) in nodes.iter().enumerate() {
            if node.is_leaf() {
                let [neg, pos] = node.value;
                if !(neg.is_finite() && pos.is_finite()) || neg < 0.0 || pos < 0.0 {
                    return Err(format!("leaf {idx} has invalid class weights"));
                }
                if neg + pos <= 0.0 {
                    return Err(format!("leaf {idx} has zero total weight"));
                }
                continue;
            }

            for child in [node.left, node.right] {
                let in_bounds = usize::try_from(child)
                    .map(|c| c > idx && c < nodes.len())
                    .unwrap_or(false);
                if !in_bounds {
                    return Err(format!("node {idx} has invalid child index {child}"));
                }
            }
            let feature_ok = usize::try_from(node.feature)
                .map(|f| f < n_features)
                .unwrap_or(false);
            if !feature_ok {
                return Err(format!(
                    "node {idx} splits on feature {} outside 0..{n_features}",
                    node.feature
                ));
            }
            if !node.threshold.is_finite() {
                return Err(format!("node {idx} has a non-finite threshold"));
            }
        }

        Ok(Self { nodes, n_features })
    }

    fn leaf(&self, row: &[f64]) -> &TreeNode {
        let mut node = &self.nodes[0];
        while !node.is_leaf() {
            // Indices were validated in `new`.
            let next = if row[node.feature as usize] <= node.threshold {
                node.left
            } else {
                node.right
            };
            node = &self.nodes[next as usize];
        }
        node
    }

    /// Class-1 fraction at the leaf reached by `row`.
    ///
    /// # Errors
    /// Returns `ModelError::DimensionMismatch` if `row` is not exactly
    /// `n_features` wide.
    pub fn predict_proba(&self, row: &[f64]) -> Result<f64, ModelError> {
        check_width("classifier", self.n_features, row)?;
        Ok(self.leaf(row).positive_fraction())
    }
}

#[derive(Debug, Deserialize)]
struct RandomForestParams {
    n_features: usize,
    trees: Vec<DecisionTreeNodes>,
}

/// Averaging ensemble of decision trees.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "RandomForestParams")]
pub struct RandomForest {
    n_features: usize,
    trees: Vec<DecisionTree>,
}

impl RandomForest {
    /// # Errors
    /// Returns a description of the problem if the forest is empty, has zero
    /// width, or any tree was validated against a different width.
    pub fn new(n_features: usize, trees: Vec<DecisionTree>) -> Result<Self, String> {
        if n_features == 0 {
            return Err("random forest has zero features".into());
        }
        if trees.is_empty() {
            return Err("random forest has no trees".into());
        }
        if let Some(i) = trees.iter().position(|t| t.n_features != n_features) {
            return Err(format!(
                "tree {i} was built for {} features, forest has {n_features}",
                trees[i].n_features
            ));
        }
        Ok(Self { n_features, trees })
    }
}

impl TryFrom<RandomForestParams> for RandomForest {
    type Error = String;

    fn try_from(params: RandomForestParams) -> Result<Self, Self::Error> {
        let trees = params
            .trees
            .into_iter()
            .enumerate()
            .map(|(i, t)| {
                DecisionTree::new(t.nodes, params.n_features).map_err(|e| format!("tree {i}: {e}"))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(params.n_features, trees)
    }
}

impl Classifier for RandomForest {
    fn kind(&self) -> &'static str {
        "random_forest"
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict_proba(&self, row: &[f64]) -> Result<f64, ModelError> {
        check_width("classifier", self.n_features, row)?;
        let mut total = 0.0;
        for tree in &self.trees {
            total += tree.predict_proba(row)?;
        }
        Ok(total / self.trees.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stump(feature: i64, threshold: f64, left_pos: f64, right_pos: f64) -> serde_json::Value {
        serde_json::json!({
            "nodes": [
                {
                    "feature": feature,
                    "threshold": threshold,
                    "left": 1,
                    "right": 2,
                    "value": [10.0, 10.0]
                },
                { "left": -1, "right": -1, "value": [10.0 - left_pos, left_pos] },
                { "left": -1, "right": -1, "value": [10.0 - right_pos, right_pos] }
            ]
        })
    }

    fn forest() -> RandomForest {
        let json = serde_json::json!({
            "n_features": 2,
            "trees": [stump(0, 0.0, 2.0, 8.0), stump(1, 1.0, 4.0, 10.0)]
        });
        serde_json::from_value(json).expect("valid forest")
    }

    #[test]
    fn test_threshold_routes_left_inclusive() {
        let model = forest();
        // x0 = 0.0 goes left in tree 0 (0.2); x1 = 1.0 goes left in tree 1 (0.4).
        let p = model.predict_proba(&[0.0, 1.0]).expect("predict");
        assert!((p - 0.3).abs() < 1e-12);

        let p = model.predict_proba(&[0.5, 3.0]).expect("predict");
        assert!((p - 0.9).abs() < 1e-12);
    }

    #[test]
    fn test_single_leaf_tree() {
        let tree = DecisionTree::new(
            vec![TreeNode {
                feature: -2,
                threshold: -2.0,
                left: -1,
                right: -1,
                value: [3.0, 1.0],
            }],
            4,
        )
        .expect("valid");
        let p = tree.predict_proba(&[0.0; 4]).expect("predict");
        assert!((p - 0.25).abs() < 1e-12);
        assert!(tree.predict_proba(&[0.0]).is_err());
    }

    #[test]
    fn test_forest_rejects_trees_of_another_width() {
        let wide = DecisionTree::new(
            vec![
                TreeNode {
                    feature: 3,
                    threshold: 0.5,
                    left: 1,
                    right: 2,
                    value: [2.0, 2.0],
                },
                TreeNode {
                    feature: 0,
                    threshold: 0.0,
                    left: -1,
                    right: -1,
                    value: [1.0, 1.0],
                },
                TreeNode {
                    feature: 0,
                    threshold: 0.0,
                    left: -1,
                    right: -1,
                    value: [0.0, 2.0],
                },
            ],
            4,
        )
        .expect("valid for four features");

        let err = RandomForest::new(1, vec![wide.clone()]).expect_err("width mismatch");
        assert!(err.contains("tree 0"));

        let forest = RandomForest::new(4, vec![wide]).expect("matching width");
        let p = forest.predict_proba(&[0.0, 0.0, 0.0, 1.0]).expect("predict");
        assert!((p - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_cycles_and_bad_features() {
        let cyclic = serde_json::json!({
            "n_features": 1,
            "trees": [{ "nodes": [
                { "feature": 0, "threshold": 0.5, "left": 0, "right": 1, "value": [1.0, 1.0] },
                { "left": -1, "right": -1, "value": [1.0, 1.0] }
            ]}]
        });
        assert!(serde_json::from_value::<RandomForest>(cyclic).is_err());

        let bad_feature = serde_json::json!({
            "n_features": 1,
            "trees": [stump(3, 0.0, 1.0, 1.0)]
        });
        assert!(serde_json::from_value::<RandomForest>(bad_feature).is_err());

        let empty = serde_json::json!({ "n_features": 2, "trees": [] });
        assert!(serde_json::from_value::<RandomForest>(empty).is_err());
    }

    #[test]
    fn test_dimension_mismatch() {
        assert!(forest().predict_proba(&[1.0, 2.0, 3.0]).is_err());
    }
}
