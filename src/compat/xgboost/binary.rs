//! XGBoost legacy binary model format (XGBoost 1.x `save_model` without a
//! `.json` extension).
//!
//! Layout, all little-endian:
//!
//! ```text
//! ["binf"]                     optional magic
//! LearnerModelParam            136 bytes
//! objective name               u64 length + bytes
//! booster name                 u64 length + bytes
//! GBTreeModelParam             160 bytes
//! per tree:
//!   TreeParam                  148 bytes
//!   nodes                      20 bytes each
//!   stats                      16 bytes each
//! tree_info                    i32 per tree
//! weight_drop (dart only)      u64 count + f32 each
//! ```
//!
//! Anything after that (attributes, eval metrics) is ignored.

use serde_json::json;

use super::json::{
    GBTreeDefinition, GBTreeModelParam, GbLinearModel, GradientBooster, Learner, LearnerModelParam, ModelTrees,
    Objective, Tree, TreeParam, XgbModel,
};
use super::reader::{ByteReader, DecodeError};

/// Optional magic some XGBoost versions put in front of the binary model.
pub const BINARY_MAGIC: &[u8; 4] = b"binf";

const LEARNER_PARAM_SIZE: usize = 136;
const GBTREE_PARAM_SIZE: usize = 160;
const TREE_PARAM_SIZE: usize = 148;
const NODE_SIZE: usize = 20;
const NODE_STAT_SIZE: usize = 16;

/// Names longer than this are not plausible objective or booster names.
const MAX_NAME_LEN: u64 = 256;

const DEFAULT_LEFT_BIT: u32 = 1 << 31;
const DELETED_NODE: u32 = u32::MAX;

/// Whether `bytes` looks like a legacy binary model.
///
/// Without the magic, the objective name that follows the fixed-size
/// learner header must be a short printable string.
pub fn looks_like_binary(bytes: &[u8]) -> bool {
    if bytes.starts_with(BINARY_MAGIC) {
        return true;
    }
    let mut r = ByteReader::new(bytes);
    if r.skip(LEARNER_PARAM_SIZE).is_err() {
        return false;
    }
    matches!(read_name(&mut r), Ok(name) if !name.is_empty())
}

/// Decode a legacy binary model.
pub fn decode(bytes: &[u8]) -> Result<XgbModel, DecodeError> {
    let body = bytes.strip_prefix(BINARY_MAGIC.as_slice()).unwrap_or(bytes);
    let mut r = ByteReader::new(body);

    let learner_start = r.offset();
    let base_score = r.f32_le()?;
    let num_feature = r.u32_le()?;
    let num_class = r.i32_le()?;
    let _contain_extra_attrs = r.i32_le()?;
    let _contain_eval_metrics = r.i32_le()?;
    let major = r.u32_le()?;
    let minor = r.u32_le()?;
    // Older writers left this reserved (zero).
    let num_target = r.u32_le()?.max(1);
    r.skip(LEARNER_PARAM_SIZE - (r.offset() - learner_start))?;

    let objective_name = read_name(&mut r)?;
    let booster_name = read_name(&mut r)?;

    let learner_model_param = LearnerModelParam {
        base_score,
        num_class: i64::from(num_class),
        num_feature: i64::from(num_feature),
        num_target: i64::from(num_target),
        boost_from_average: true,
    };

    let gradient_booster = match booster_name.as_str() {
        "gbtree" => GradientBooster::Gbtree {
            model: read_gbtree(&mut r)?,
        },
        "dart" => {
            let model = read_gbtree(&mut r)?;
            let weight_drop = if model.trees.is_empty() {
                Vec::new()
            } else {
                read_f32_vec(&mut r)?
            };
            GradientBooster::Dart {
                gbtree: GBTreeDefinition {
                    name: "gbtree".to_owned(),
                    model,
                },
                weight_drop,
            }
        }
        // Conversion rejects linear boosters; their weights are not needed.
        "gblinear" => GradientBooster::Gblinear {
            model: GbLinearModel { weights: Vec::new() },
        },
        other => return Err(r.invalid(format!("unknown booster `{other}`"))),
    };

    Ok(XgbModel {
        version: [major, minor, 0],
        learner: Learner {
            feature_names: Vec::new(),
            feature_types: Vec::new(),
            gradient_booster,
            objective: objective_from_name(&objective_name, num_class),
            learner_model_param,
        },
    })
}

fn read_name(r: &mut ByteReader<'_>) -> Result<String, DecodeError> {
    let len = r.u64_le()?;
    if len > MAX_NAME_LEN {
        return Err(r.invalid(format!("implausible name length {len}")));
    }
    let offset = r.offset();
    let bytes = r.take(len as usize)?;
    if !bytes.iter().all(|b| b.is_ascii_graphic()) {
        return Err(DecodeError::Invalid {
            offset,
            reason: "name is not printable ASCII".to_owned(),
        });
    }
    Ok(String::from_utf8_lossy(bytes).into_owned())
}

/// Map an objective name onto the JSON objective, carrying the class count
/// for the multi-class objectives.
fn objective_from_name(name: &str, num_class: i32) -> Objective {
    let value = json!({
        "name": name,
        "softmax_multiclass_param": {"num_class": num_class.max(1).to_string()},
    });
    serde_json::from_value(value).unwrap_or(Objective::Unknown)
}

fn read_count(r: &mut ByteReader<'_>, value: i32, what: &str) -> Result<usize, DecodeError> {
    usize::try_from(value).map_err(|_| r.invalid(format!("negative {what} {value}")))
}

fn read_gbtree(r: &mut ByteReader<'_>) -> Result<ModelTrees, DecodeError> {
    let param_start = r.offset();
    let num_trees = r.i32_le()?;
    let num_parallel_tree = r.i32_le()?;
    r.skip(GBTREE_PARAM_SIZE - (r.offset() - param_start))?;

    let count = read_count(r, num_trees, "tree count")?;
    // Every tree needs at least its header; reject absurd counts before allocating.
    if count > r.remaining() / TREE_PARAM_SIZE {
        return Err(r.invalid(format!("{count} trees do not fit in the file")));
    }

    let mut trees = Vec::with_capacity(count);
    for id in 0..count {
        trees.push(read_tree(r, id as i32)?);
    }

    let mut tree_info = Vec::with_capacity(count);
    for _ in 0..count {
        tree_info.push(r.i32_le()?);
    }

    Ok(ModelTrees {
        trees,
        tree_info,
        gbtree_model_param: GBTreeModelParam {
            num_trees: i64::from(num_trees),
            num_parallel_tree: i64::from(num_parallel_tree.max(1)),
        },
    })
}

fn read_tree(r: &mut ByteReader<'_>, id: i32) -> Result<Tree, DecodeError> {
    let param_start = r.offset();
    let _num_roots = r.i32_le()?;
    let num_nodes = r.i32_le()?;
    let num_deleted = r.i32_le()?;
    let _max_depth = r.i32_le()?;
    let num_feature = r.i32_le()?;
    let size_leaf_vector = r.i32_le()?;
    r.skip(TREE_PARAM_SIZE - (r.offset() - param_start))?;

    if size_leaf_vector > 1 {
        return Err(r.invalid(format!("tree {id} has vector leaves of size {size_leaf_vector}")));
    }
    let n = read_count(r, num_nodes, "node count")?;
    if n > r.remaining() / (NODE_SIZE + NODE_STAT_SIZE) {
        return Err(r.invalid(format!("tree {id} declares {n} nodes, more than the file holds")));
    }

    let mut tree = Tree {
        tree_param: TreeParam {
            num_nodes: i64::from(num_nodes),
            size_leaf_vector: i64::from(size_leaf_vector),
            num_feature: i64::from(num_feature),
            num_deleted: i64::from(num_deleted),
        },
        id,
        loss_changes: Vec::with_capacity(n),
        sum_hessian: Vec::with_capacity(n),
        base_weights: Vec::with_capacity(n),
        left_children: Vec::with_capacity(n),
        right_children: Vec::with_capacity(n),
        parents: Vec::with_capacity(n),
        split_indices: Vec::with_capacity(n),
        split_conditions: Vec::with_capacity(n),
        split_type: vec![0; n],
        default_left: Vec::with_capacity(n),
        categories: Vec::new(),
        categories_nodes: Vec::new(),
    };

    for _ in 0..n {
        let parent = r.i32_le()?;
        let left = r.i32_le()?;
        let right = r.i32_le()?;
        let sindex = r.u32_le()?;
        let value = r.f32_le()?;

        // The top bit of `parent` flags a left child.
        tree.parents.push(if parent == -1 { -1 } else { parent & i32::MAX });

        if sindex == DELETED_NODE {
            // Unreachable from the root; keep it as an inert leaf.
            tree.left_children.push(-1);
            tree.right_children.push(-1);
            tree.split_indices.push(0);
            tree.split_conditions.push(0.0);
            tree.default_left.push(0);
        } else {
            tree.left_children.push(left);
            tree.right_children.push(right);
            tree.split_indices.push((sindex & !DEFAULT_LEFT_BIT) as i32);
            tree.split_conditions.push(value);
            tree.default_left.push(i32::from(sindex & DEFAULT_LEFT_BIT != 0));
        }
    }

    for _ in 0..n {
        tree.loss_changes.push(f64::from(r.f32_le()?));
        tree.sum_hessian.push(f64::from(r.f32_le()?));
        tree.base_weights.push(r.f32_le()?);
        let _leaf_child_count = r.i32_le()?;
    }

    Ok(tree)
}

fn read_f32_vec(r: &mut ByteReader<'_>) -> Result<Vec<f32>, DecodeError> {
    let len = r.u64_le()?;
    if len > (r.remaining() / 4) as u64 {
        return Err(r.invalid(format!("vector of {len} floats does not fit in the file")));
    }
    (0..len).map(|_| r.f32_le()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{booking_model_json, to_legacy_binary};

    fn booking() -> XgbModel {
        XgbModel::from_value(&booking_model_json()).unwrap()
    }

    #[test]
    fn decodes_booking_model() {
        let json = booking();
        let bytes = to_legacy_binary(&json);
        assert!(looks_like_binary(&bytes));

        let model = decode(&bytes).unwrap();
        assert_eq!(model.version, [1, 7, 0]);
        assert_eq!(model.learner.objective.name(), "binary:logistic");
        assert_eq!(model.learner.learner_model_param.num_feature, 17);
        assert_eq!(model.learner.learner_model_param.base_score, 0.5);
        assert!(model.learner.feature_names.is_empty());

        let (GradientBooster::Gbtree { model: decoded }, GradientBooster::Gbtree { model: expected }) =
            (&model.learner.gradient_booster, &json.learner.gradient_booster)
        else {
            panic!("expected gbtree boosters");
        };
        assert_eq!(decoded.num_trees(), 3);
        assert_eq!(decoded.tree_info, expected.tree_info);
        for (got, want) in decoded.trees.iter().zip(&expected.trees) {
            assert_eq!(got.left_children, want.left_children);
            assert_eq!(got.right_children, want.right_children);
            assert_eq!(got.split_indices, want.split_indices);
            assert_eq!(got.split_conditions, want.split_conditions);
            assert_eq!(got.default_left, want.default_left);
        }
    }

    #[test]
    fn magic_prefix_is_optional() {
        let mut bytes = BINARY_MAGIC.to_vec();
        bytes.extend(to_legacy_binary(&booking()));
        assert!(looks_like_binary(&bytes));
        assert_eq!(decode(&bytes).unwrap().learner.objective.name(), "binary:logistic");
    }

    #[test]
    fn default_left_and_deleted_nodes() {
        let mut xgb = booking();
        if let GradientBooster::Gbtree { model } = &mut xgb.learner.gradient_booster {
            let tree = &mut model.trees[0];
            tree.default_left[0] = 1;
            // Mark the last node deleted by pointing its split index at the marker.
            let last = tree.split_indices.len() - 1;
            tree.split_indices[last] = -1;
        }
        let model = decode(&to_legacy_binary(&xgb)).unwrap();

        let GradientBooster::Gbtree { model } = &model.learner.gradient_booster else {
            panic!("expected gbtree");
        };
        let tree = &model.trees[0];
        assert_eq!(tree.default_left[0], 1);
        let last = tree.left_children.len() - 1;
        assert_eq!(tree.left_children[last], -1);
        assert_eq!(tree.split_conditions[last], 0.0);
    }

    #[test]
    fn multiclass_objective_keeps_class_count() {
        assert!(matches!(
            objective_from_name("multi:softmax", 4),
            Objective::MultiSoftmax { softmax_multiclass_param } if softmax_multiclass_param.num_class == 4
        ));
        assert!(matches!(objective_from_name("reg:quantileerror", 0), Objective::Unknown));
    }

    #[test]
    fn truncated_model_is_rejected() {
        let bytes = to_legacy_binary(&booking());
        for len in [LEARNER_PARAM_SIZE + 4, bytes.len() / 2, bytes.len() - 1] {
            assert!(decode(&bytes[..len]).is_err(), "length {len}");
        }
    }

    #[test]
    fn arbitrary_bytes_are_not_binary() {
        assert!(!looks_like_binary(b"\x80\x04\x95pickle"));
        assert!(!looks_like_binary(&[0u8; 200]));
        assert!(!looks_like_binary(&[0xffu8; 200]));
    }
}
