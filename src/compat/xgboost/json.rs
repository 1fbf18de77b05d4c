//! XGBoost JSON model loader.
//!
//! These are "foreign types" used only for parsing; see `convert` for the
//! translation into the native forest.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use serde_with::{serde_as, DisplayFromStr};

// =============================================================================
// Custom deserializers for XGBoost-specific formats
// =============================================================================

/// Deserialize base_score which can be:
/// - A single number: 1.5
/// - A stringified number: "1.5"
/// - An array: [1.5]
/// - A bracketed format: "[1.5E0]"
fn deserialize_base_score<'de, D>(deserializer: D) -> Result<f32, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error as SerdeError;

    let mut cur = Value::deserialize(deserializer)?;
    loop {
        match cur {
            Value::Number(n) => {
                return n
                    .as_f64()
                    .map(|f| f as f32)
                    .ok_or_else(|| SerdeError::custom("invalid number"));
            }
            Value::String(s) => {
                if let Ok(f) = s.trim().parse::<f32>() {
                    return Ok(f);
                }
                // "[1.5E0]" and "[1.5]" both parse as a JSON array of one number
                // once the exponent is valid JSON; try the cheap strip first.
                let t = s.trim();
                if let Some(inner) = t.strip_prefix('[').and_then(|t| t.strip_suffix(']')) {
                    if let Ok(f) = inner.trim().parse::<f32>() {
                        return Ok(f);
                    }
                }
                match serde_json::from_str::<Vec<Value>>(&s) {
                    Ok(arr) => match arr.into_iter().next() {
                        Some(first) => cur = first,
                        None => return Err(SerdeError::custom("empty base_score array")),
                    },
                    Err(_) => {
                        return Err(SerdeError::custom(format!(
                            "cannot parse base_score from string: {s}"
                        )))
                    }
                }
            }
            Value::Array(arr) => match arr.into_iter().next() {
                Some(first) => cur = first,
                None => return Err(SerdeError::custom("empty base_score array")),
            },
            _ => {
                return Err(SerdeError::custom(
                    "base_score must be number, string, or array",
                ))
            }
        }
    }
}

/// Deserialize booleans that may be represented as bool, int (0/1), or string ("0"/"1"/"true"/"false").
fn deserialize_bool_any<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error as SerdeError;

    match Value::deserialize(deserializer)? {
        Value::Bool(b) => Ok(b),
        Value::Number(n) => n
            .as_f64()
            .map(|f| f != 0.0)
            .ok_or_else(|| SerdeError::custom("invalid number for bool")),
        Value::String(s) => {
            let t = s.trim();
            if t.eq_ignore_ascii_case("true") || t == "1" {
                Ok(true)
            } else if t.eq_ignore_ascii_case("false") || t == "0" {
                Ok(false)
            } else {
                Err(SerdeError::custom(format!("cannot parse bool from string: {s}")))
            }
        }
        _ => Err(SerdeError::custom("unsupported type for bool")),
    }
}

fn default_num_target() -> i64 {
    1
}
fn default_boost_from_average() -> bool {
    true
}
fn default_num_class() -> i64 {
    1
}

// =============================================================================
// Tree / model level definitions
// =============================================================================

#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeParam {
    #[serde_as(as = "DisplayFromStr")]
    pub num_nodes: i64,
    #[serde_as(as = "DisplayFromStr")]
    #[serde(default)]
    pub size_leaf_vector: i64,
    #[serde_as(as = "DisplayFromStr")]
    pub num_feature: i64,
    #[serde_as(as = "DisplayFromStr")]
    #[serde(default)]
    pub num_deleted: i64,
}

/// One regression tree in XGBoost's column layout.
///
/// For leaf nodes (`left_children[i] == -1`) `split_conditions[i]` holds the
/// leaf value with the learning rate already applied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tree {
    pub tree_param: TreeParam,
    #[serde(default)]
    pub id: i32,
    #[serde(default)]
    pub loss_changes: Vec<f64>,
    #[serde(default)]
    pub sum_hessian: Vec<f64>,
    #[serde(default)]
    pub base_weights: Vec<f32>,
    pub left_children: Vec<i32>,
    pub right_children: Vec<i32>,
    #[serde(default)]
    pub parents: Vec<i32>,
    pub split_indices: Vec<i32>,
    pub split_conditions: Vec<f32>,
    #[serde(default)]
    pub split_type: Vec<i32>,
    pub default_left: Vec<i32>,
    #[serde(default)]
    pub categories: Vec<i32>,
    #[serde(default)]
    pub categories_nodes: Vec<i32>,
}

#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GBTreeModelParam {
    #[serde_as(as = "DisplayFromStr")]
    pub num_trees: i64,
    #[serde_as(as = "DisplayFromStr")]
    #[serde(default)]
    pub num_parallel_tree: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelTrees {
    pub trees: Vec<Tree>,
    pub tree_info: Vec<i32>,
    pub gbtree_model_param: GBTreeModelParam,
}

impl ModelTrees {
    /// Number of trees in this model.
    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }
}

// =============================================================================
// Gradient booster variants (gbtree | gblinear | dart)
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GbLinearModel {
    pub weights: Vec<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GBTreeDefinition {
    pub name: String,
    pub model: ModelTrees,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "lowercase")]
pub enum GradientBooster {
    Gbtree {
        model: ModelTrees,
    },
    Gblinear {
        model: GbLinearModel,
    },
    Dart {
        gbtree: GBTreeDefinition,
        weight_drop: Vec<f32>,
    },
}

impl GradientBooster {
    /// Booster name as it appears in XGBoost JSON.
    pub fn name(&self) -> &'static str {
        match self {
            GradientBooster::Gbtree { .. } => "gbtree",
            GradientBooster::Gblinear { .. } => "gblinear",
            GradientBooster::Dart { .. } => "dart",
        }
    }
}

// =============================================================================
// Objective / learner-level definitions
// =============================================================================

#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoftmaxMulticlassParam {
    #[serde_as(as = "DisplayFromStr")]
    #[serde(default = "default_num_class")]
    pub num_class: i64,
}

impl Default for SoftmaxMulticlassParam {
    fn default() -> Self {
        Self { num_class: 1 }
    }
}

/// Objective the model was trained with.
///
/// Only the objective name matters for inference (it selects the output
/// transform); per-objective parameters other than the class count are
/// ignored. Objectives this loader does not know parse as `Unknown`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "name")]
pub enum Objective {
    #[serde(rename = "reg:squarederror")]
    RegSquaredError,
    #[serde(rename = "reg:pseudohubererror")]
    RegPseudohuberError,
    #[serde(rename = "reg:squaredlogerror")]
    RegSquaredLogError,
    #[serde(rename = "reg:linear")]
    RegLinear,
    #[serde(rename = "reg:logistic")]
    RegLogistic,
    #[serde(rename = "binary:logistic")]
    BinaryLogistic,
    #[serde(rename = "binary:logitraw")]
    BinaryLogitRaw,
    #[serde(rename = "binary:hinge")]
    BinaryHinge,
    #[serde(rename = "count:poisson")]
    CountPoisson,
    #[serde(rename = "reg:tweedie")]
    RegTweedie,
    #[serde(rename = "reg:absoluteerror")]
    RegAbsoluteError,
    #[serde(rename = "reg:gamma")]
    RegGamma,
    #[serde(rename = "survival:cox")]
    SurvivalCox,
    #[serde(rename = "multi:softprob")]
    MultiSoftprob {
        #[serde(default)]
        softmax_multiclass_param: SoftmaxMulticlassParam,
    },
    #[serde(rename = "multi:softmax")]
    MultiSoftmax {
        #[serde(default)]
        softmax_multiclass_param: SoftmaxMulticlassParam,
    },
    #[serde(rename = "rank:pairwise")]
    RankPairwise,
    #[serde(rename = "rank:ndcg")]
    RankNdcg,
    #[serde(rename = "rank:map")]
    RankMap,
    #[serde(other)]
    Unknown,
}

impl Objective {
    /// Get the objective name as it appears in XGBoost JSON.
    pub fn name(&self) -> &'static str {
        match self {
            Objective::RegSquaredError => "reg:squarederror",
            Objective::RegPseudohuberError => "reg:pseudohubererror",
            Objective::RegSquaredLogError => "reg:squaredlogerror",
            Objective::RegLinear => "reg:linear",
            Objective::RegLogistic => "reg:logistic",
            Objective::BinaryLogistic => "binary:logistic",
            Objective::BinaryLogitRaw => "binary:logitraw",
            Objective::BinaryHinge => "binary:hinge",
            Objective::CountPoisson => "count:poisson",
            Objective::RegTweedie => "reg:tweedie",
            Objective::RegAbsoluteError => "reg:absoluteerror",
            Objective::RegGamma => "reg:gamma",
            Objective::SurvivalCox => "survival:cox",
            Objective::MultiSoftprob { .. } => "multi:softprob",
            Objective::MultiSoftmax { .. } => "multi:softmax",
            Objective::RankPairwise => "rank:pairwise",
            Objective::RankNdcg => "rank:ndcg",
            Objective::RankMap => "rank:map",
            Objective::Unknown => "unknown",
        }
    }
}

#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearnerModelParam {
    #[serde(deserialize_with = "deserialize_base_score")]
    pub base_score: f32,
    #[serde_as(as = "DisplayFromStr")]
    pub num_class: i64,
    #[serde_as(as = "DisplayFromStr")]
    pub num_feature: i64,
    #[serde_as(as = "DisplayFromStr")]
    #[serde(default = "default_num_target")]
    pub num_target: i64,
    #[serde(deserialize_with = "deserialize_bool_any")]
    #[serde(default = "default_boost_from_average")]
    pub boost_from_average: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Learner {
    #[serde(default)]
    pub feature_names: Vec<String>,
    #[serde(default)]
    pub feature_types: Vec<String>,
    pub gradient_booster: GradientBooster,
    pub objective: Objective,
    pub learner_model_param: LearnerModelParam,
}

// =============================================================================
// Top-level XGBoost model
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XgbModel {
    pub version: [u32; 3],
    pub learner: Learner,
}

impl XgbModel {
    /// Parse a model from the bytes of a JSON model file.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    /// Parse a model from a serde_json Value.
    pub fn from_value(value: &Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn base_score_parses_number_string_array_and_bracketed() {
        let v_num = json!({"base_score": 1.5, "num_class": "1", "num_feature": "0"});
        let p_num: LearnerModelParam = serde_json::from_value(v_num).unwrap();
        assert_eq!(p_num.base_score, 1.5);

        let v_str = json!({"base_score": "1.5", "num_class": "1", "num_feature": "0"});
        let p_str: LearnerModelParam = serde_json::from_value(v_str).unwrap();
        assert_eq!(p_str.base_score, 1.5);

        let v_arr = json!({"base_score": [1.5], "num_class": "1", "num_feature": "0"});
        let p_arr: LearnerModelParam = serde_json::from_value(v_arr).unwrap();
        assert_eq!(p_arr.base_score, 1.5);

        let v_bracketed = json!({"base_score": "[1.5E0]", "num_class": "1", "num_feature": "0"});
        let p_bracketed: LearnerModelParam = serde_json::from_value(v_bracketed).unwrap();
        assert_eq!(p_bracketed.base_score, 1.5);
    }

    #[test]
    fn base_score_rejects_garbage() {
        let v = json!({"base_score": "abc", "num_class": "1", "num_feature": "0"});
        assert!(serde_json::from_value::<LearnerModelParam>(v).is_err());

        let v = json!({"base_score": [], "num_class": "1", "num_feature": "0"});
        assert!(serde_json::from_value::<LearnerModelParam>(v).is_err());
    }

    #[test]
    fn boost_from_average_accepts_various_types() {
        let v_int = json!({"base_score": 0.5, "num_class": "1", "num_feature": "0", "boost_from_average": 1});
        let p_int: LearnerModelParam = serde_json::from_value(v_int).unwrap();
        assert!(p_int.boost_from_average);

        let v_false_str = json!({"base_score": 0.5, "num_class": "1", "num_feature": "0", "boost_from_average": "0"});
        let p_false_str: LearnerModelParam = serde_json::from_value(v_false_str).unwrap();
        assert!(!p_false_str.boost_from_average);

        let v_missing = json!({"base_score": 0.5, "num_class": "1", "num_feature": "0"});
        let p_missing: LearnerModelParam = serde_json::from_value(v_missing).unwrap();
        assert!(p_missing.boost_from_average);
        assert_eq!(p_missing.num_target, 1);
    }

    #[test]
    fn objective_parses_known_and_unknown_names() {
        let obj: Objective =
            serde_json::from_value(json!({"name": "binary:logistic", "reg_loss_param": {"scale_pos_weight": "1"}}))
                .unwrap();
        assert_eq!(obj.name(), "binary:logistic");

        let obj: Objective = serde_json::from_value(
            json!({"name": "multi:softmax", "softmax_multiclass_param": {"num_class": "3"}}),
        )
        .unwrap();
        match obj {
            Objective::MultiSoftmax {
                softmax_multiclass_param,
            } => assert_eq!(softmax_multiclass_param.num_class, 3),
            other => panic!("unexpected objective {other:?}"),
        }

        let obj: Objective = serde_json::from_value(json!({"name": "reg:quantileerror"})).unwrap();
        assert!(matches!(obj, Objective::Unknown));
    }

    #[test]
    fn booster_name() {
        let booster: GradientBooster =
            serde_json::from_value(json!({"name": "gblinear", "model": {"weights": [0.0]}})).unwrap();
        assert_eq!(booster.name(), "gblinear");
    }
}
