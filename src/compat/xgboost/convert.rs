//! Conversion from the XGBoost foreign types to the native forest.

use crate::forest::SoAForest;
use crate::trees::{ScalarLeaf, SoATreeStorage, SplitCondition, TreeBuilder};

use super::json::{GradientBooster, ModelTrees, Tree, XgbModel};

/// Error type for XGBoost model conversion.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConversionError {
    #[error("unsupported booster type `{0}`: only tree boosters can be served")]
    UnsupportedBooster(&'static str),
    #[error("multi-target models are not supported (num_target = {0})")]
    MultiTarget(i64),
    #[error("tree {0} has no nodes")]
    EmptyTree(usize),
    #[error("tree {tree}: array `{field}` has {actual} entries, expected {expected}")]
    LengthMismatch {
        tree: usize,
        field: &'static str,
        actual: usize,
        expected: usize,
    },
    #[error(
        "invalid node index in tree {tree}: node {node} references child {child} but tree has {num_nodes} nodes"
    )]
    InvalidNodeIndex {
        tree: usize,
        node: usize,
        child: i32,
        num_nodes: usize,
    },
    #[error("tree {tree}, node {node}: negative split feature index {feature}")]
    InvalidFeatureIndex { tree: usize, node: usize, feature: i32 },
    #[error("tree {tree}, node {node}: categorical splits are not supported")]
    CategoricalSplit { tree: usize, node: usize },
    #[error("dart model has {weights} tree weights for {trees} trees")]
    DartWeightMismatch { weights: usize, trees: usize },
}

/// Convert base_score from probability space to margin space based on objective.
///
/// XGBoost stores base_score in probability/original space in JSON, but the predictor
/// uses margin space. This replicates XGBoost's `ProbToMargin` logic.
fn prob_to_margin(base_score: f32, objective: &str) -> f32 {
    match objective {
        // logit(p) = ln(p / (1 - p))
        "binary:logistic" | "reg:logistic" => {
            let p = base_score.clamp(1e-7, 1.0 - 1e-7);
            (p / (1.0 - p)).ln()
        }
        "reg:gamma" | "reg:tweedie" | "count:poisson" | "survival:cox" => base_score.max(1e-7).ln(),
        _ => base_score,
    }
}

impl XgbModel {
    /// Number of output groups (1 for regression and binary, K for K-class).
    pub fn num_groups(&self) -> u32 {
        let num_class = self.learner.learner_model_param.num_class;
        if num_class <= 1 {
            1
        } else {
            num_class as u32
        }
    }

    /// Convert to a native `SoAForest<ScalarLeaf>`.
    ///
    /// This only supports gbtree and dart boosters (tree-based models).
    /// For dart, each tree's `weight_drop` entry becomes its forest weight.
    pub fn to_forest(&self) -> Result<SoAForest<ScalarLeaf>, ConversionError> {
        let (model_trees, tree_weights): (&ModelTrees, Option<&[f32]>) =
            match &self.learner.gradient_booster {
                GradientBooster::Gbtree { model } => (model, None),
                GradientBooster::Dart {
                    gbtree,
                    weight_drop,
                } => (&gbtree.model, Some(weight_drop.as_slice())),
                booster @ GradientBooster::Gblinear { .. } => {
                    return Err(ConversionError::UnsupportedBooster(booster.name()))
                }
            };

        let param = &self.learner.learner_model_param;
        if param.num_target > 1 {
            return Err(ConversionError::MultiTarget(param.num_target));
        }

        if let Some(weights) = tree_weights {
            if weights.len() != model_trees.num_trees() {
                return Err(ConversionError::DartWeightMismatch {
                    weights: weights.len(),
                    trees: model_trees.num_trees(),
                });
            }
        }

        let num_groups = self.num_groups();
        let margin_base_score = prob_to_margin(param.base_score, self.learner.objective.name());
        let mut forest =
            SoAForest::new(num_groups).with_base_score(vec![margin_base_score; num_groups as usize]);

        for (tree_idx, xgb_tree) in model_trees.trees.iter().enumerate() {
            let tree_group = model_trees.tree_info.get(tree_idx).copied().unwrap_or(0) as u32;
            let weight = tree_weights.map_or(1.0, |w| w[tree_idx]);
            forest.push_weighted_tree(convert_tree(xgb_tree, tree_idx)?, tree_group, weight);
        }

        Ok(forest)
    }
}

fn check_len(tree: usize, field: &'static str, actual: usize, expected: usize) -> Result<(), ConversionError> {
    if actual == expected {
        Ok(())
    } else {
        Err(ConversionError::LengthMismatch {
            tree,
            field,
            actual,
            expected,
        })
    }
}

/// Convert a single XGBoost tree to native SoATreeStorage.
fn convert_tree(xgb_tree: &Tree, tree_idx: usize) -> Result<SoATreeStorage<ScalarLeaf>, ConversionError> {
    let num_nodes = xgb_tree.tree_param.num_nodes.max(0) as usize;
    if num_nodes == 0 {
        return Err(ConversionError::EmptyTree(tree_idx));
    }

    check_len(tree_idx, "left_children", xgb_tree.left_children.len(), num_nodes)?;
    check_len(tree_idx, "right_children", xgb_tree.right_children.len(), num_nodes)?;
    check_len(tree_idx, "split_indices", xgb_tree.split_indices.len(), num_nodes)?;
    check_len(tree_idx, "split_conditions", xgb_tree.split_conditions.len(), num_nodes)?;
    check_len(tree_idx, "default_left", xgb_tree.default_left.len(), num_nodes)?;

    let child_index = |node: usize, child: i32| -> Result<u32, ConversionError> {
        if child < 0 || child as usize >= num_nodes {
            Err(ConversionError::InvalidNodeIndex {
                tree: tree_idx,
                node,
                child,
                num_nodes,
            })
        } else {
            Ok(child as u32)
        }
    };

    let mut builder = TreeBuilder::new();

    // XGBoost node ids are array positions, so nodes are added in index order.
    for node_idx in 0..num_nodes {
        let left_child = xgb_tree.left_children[node_idx];

        // A node is a leaf if left_child == -1 (XGBoost convention)
        if left_child == -1 {
            builder.add_leaf(ScalarLeaf(xgb_tree.split_conditions[node_idx]));
            continue;
        }

        if xgb_tree.split_type.get(node_idx).copied().unwrap_or(0) != 0 {
            return Err(ConversionError::CategoricalSplit {
                tree: tree_idx,
                node: node_idx,
            });
        }

        let feature = xgb_tree.split_indices[node_idx];
        if feature < 0 {
            return Err(ConversionError::InvalidFeatureIndex {
                tree: tree_idx,
                node: node_idx,
                feature,
            });
        }

        let condition = SplitCondition::new(
            feature as u32,
            xgb_tree.split_conditions[node_idx],
            xgb_tree.default_left[node_idx] != 0,
        );
        builder.add_split(
            condition,
            child_index(node_idx, left_child)?,
            child_index(node_idx, xgb_tree.right_children[node_idx])?,
        );
    }

    Ok(builder.build())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// A two-tree binary:logistic model over two features.
    fn model_json(booster: serde_json::Value) -> serde_json::Value {
        json!({
            "version": [2, 0, 3],
            "learner": {
                "feature_names": [],
                "feature_types": [],
                "gradient_booster": booster,
                "objective": {"name": "binary:logistic", "reg_loss_param": {"scale_pos_weight": "1"}},
                "learner_model_param": {
                    "base_score": "5E-1",
                    "num_class": "0",
                    "num_feature": "2",
                    "num_target": "1",
                    "boost_from_average": "1"
                }
            }
        })
    }

    fn stump(feature: i32, threshold: f32, left: f32, right: f32) -> serde_json::Value {
        json!({
            "tree_param": {"num_nodes": "3", "size_leaf_vector": "1", "num_feature": "2", "num_deleted": "0"},
            "id": 0,
            "loss_changes": [1.0, 0.0, 0.0],
            "sum_hessian": [10.0, 5.0, 5.0],
            "base_weights": [0.0, left * 10.0, right * 10.0],
            "left_children": [1, -1, -1],
            "right_children": [2, -1, -1],
            "parents": [2147483647, 0, 0],
            "split_indices": [feature, 0, 0],
            "split_conditions": [threshold, left, right],
            "split_type": [0, 0, 0],
            "default_left": [1, 0, 0],
            "categories": [],
            "categories_nodes": [],
            "categories_segments": [],
            "categories_sizes": []
        })
    }

    fn gbtree(trees: Vec<serde_json::Value>) -> serde_json::Value {
        let n = trees.len();
        json!({
            "name": "gbtree",
            "model": {
                "gbtree_model_param": {"num_trees": n.to_string(), "num_parallel_tree": "1"},
                "trees": trees,
                "tree_info": vec![0; n]
            }
        })
    }

    fn parse(value: serde_json::Value) -> XgbModel {
        XgbModel::from_value(&value).expect("model json should parse")
    }

    #[test]
    fn convert_gbtree_uses_split_conditions_for_leaves() {
        let model = parse(model_json(gbtree(vec![
            stump(0, 1.5, -0.2, 0.3),
            stump(1, 10.0, 0.1, -0.1),
        ])));
        let forest = model.to_forest().expect("conversion failed");

        assert_eq!(forest.num_groups(), 1);
        assert_eq!(forest.num_trees(), 2);
        // base_score 0.5 → margin 0.0
        assert!(forest.base_score()[0].abs() < 1e-6);
        let margin = forest.predict_row(&[0.0, 20.0]);
        assert!((margin[0] - (-0.2 - 0.1)).abs() < 1e-6);
    }

    #[test]
    fn convert_dart_applies_weight_drop() {
        let booster = json!({
            "name": "dart",
            "gbtree": {
                "name": "gbtree",
                "model": {
                    "gbtree_model_param": {"num_trees": "2", "num_parallel_tree": "1"},
                    "trees": [stump(0, 1.5, 1.0, 2.0), stump(0, 1.5, 1.0, 2.0)],
                    "tree_info": [0, 0]
                }
            },
            "weight_drop": [0.5, 1.0]
        });
        let forest = parse(model_json(booster)).to_forest().expect("conversion failed");

        let margin = forest.predict_row(&[0.0, 0.0]);
        assert!((margin[0] - 1.5).abs() < 1e-6);
    }

    #[test]
    fn convert_rejects_gblinear() {
        let booster = json!({"name": "gblinear", "model": {"weights": [0.1, 0.2, 0.0]}});
        let err = parse(model_json(booster)).to_forest().unwrap_err();
        assert_eq!(err, ConversionError::UnsupportedBooster("gblinear"));
    }

    #[test]
    fn convert_rejects_bad_child_index() {
        let mut tree = stump(0, 1.5, 1.0, 2.0);
        tree["right_children"] = json!([9, -1, -1]);
        let err = parse(model_json(gbtree(vec![tree]))).to_forest().unwrap_err();

        assert_eq!(
            err,
            ConversionError::InvalidNodeIndex {
                tree: 0,
                node: 0,
                child: 9,
                num_nodes: 3
            }
        );
    }

    #[test]
    fn convert_rejects_truncated_arrays() {
        let mut tree = stump(0, 1.5, 1.0, 2.0);
        tree["split_conditions"] = json!([1.5, 1.0]);
        let err = parse(model_json(gbtree(vec![tree]))).to_forest().unwrap_err();

        assert!(matches!(
            err,
            ConversionError::LengthMismatch {
                field: "split_conditions",
                actual: 2,
                expected: 3,
                ..
            }
        ));
    }

    #[test]
    fn convert_rejects_categorical_split() {
        let mut tree = stump(0, 1.5, 1.0, 2.0);
        tree["split_type"] = json!([1, 0, 0]);
        let err = parse(model_json(gbtree(vec![tree]))).to_forest().unwrap_err();

        assert_eq!(err, ConversionError::CategoricalSplit { tree: 0, node: 0 });
    }

    #[test]
    fn prob_to_margin_per_objective() {
        use approx::assert_abs_diff_eq;

        assert_abs_diff_eq!(prob_to_margin(0.5, "binary:logistic"), 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(prob_to_margin(0.75, "reg:logistic"), 3f32.ln(), epsilon = 1e-5);
        assert_abs_diff_eq!(prob_to_margin(1.0, "reg:gamma"), 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(prob_to_margin(std::f32::consts::E, "count:poisson"), 1.0, epsilon = 1e-5);
        assert_abs_diff_eq!(prob_to_margin(0.5, "survival:cox"), 0.5f32.ln(), epsilon = 1e-6);
        assert_eq!(prob_to_margin(0.25, "reg:squarederror"), 0.25);
        assert_eq!(prob_to_margin(0.25, "binary:logitraw"), 0.25);
    }
}
