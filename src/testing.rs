//! Testing utilities for hotel-inference.
//!
//! Assertion helpers and fixture builders shared by unit tests and the
//! integration tests under `tests/`.
//!
//! ```ignore
//! use hotel_inference::assert_approx_eq;
//! use hotel_inference::testing::{booking_model_json, write_bundle, DEFAULT_TOLERANCE};
//! ```

use std::fs::File;
use std::io;
use std::path::Path;

use flate2::write::GzEncoder;
use flate2::Compression;
use serde_json::Value;

use crate::compat::xgboost::{GradientBooster, ModelTrees, Tree, XgbModel};
use crate::features::BookingRecord;

// =============================================================================
// Constants
// =============================================================================

/// Default tolerance for floating point comparisons of scores.
pub const DEFAULT_TOLERANCE: f32 = 1e-5;

/// The booking model shipped with the test fixtures.
const BOOKING_MODEL: &str = include_str!("../tests/test-cases/xgboost/booking_status.model.json");

// =============================================================================
// Floating Point Assertions
// =============================================================================

/// Assert that two floats are within `tolerance` of each other.
///
/// ```
/// # use hotel_inference::assert_approx_eq;
/// assert_approx_eq!(1.0f32, 1.0001f32, 0.001);
/// ```
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr, $tolerance:expr) => {{
        let left_val = $left;
        let right_val = $right;
        let tol = $tolerance;
        let diff = (left_val - right_val).abs();
        if diff > tol {
            panic!(
                "assertion failed: `(left ≈ right)`\n  left: `{:?}`\n right: `{:?}`\n  diff: `{:?}` > tolerance `{:?}`",
                left_val, right_val, diff, tol
            );
        }
    }};
    ($left:expr, $right:expr, $tolerance:expr, $($arg:tt)+) => {{
        let left_val = $left;
        let right_val = $right;
        let tol = $tolerance;
        let diff = (left_val - right_val).abs();
        if diff > tol {
            panic!(
                "assertion failed: `(left ≈ right)` - {}\n  left: `{:?}`\n right: `{:?}`\n  diff: `{:?}` > tolerance `{:?}`",
                format_args!($($arg)+), left_val, right_val, diff, tol
            );
        }
    }};
}

// =============================================================================
// Fixtures
// =============================================================================

/// Write a gzip-compressed tar archive holding `files` (path, contents).
pub fn write_bundle(path: &Path, files: &[(&str, &[u8])]) -> io::Result<()> {
    let encoder = GzEncoder::new(File::create(path)?, Compression::default());
    let mut builder = tar::Builder::new(encoder);

    for (name, contents) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(contents.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, name, *contents)?;
    }

    builder.into_inner()?.finish()?;
    Ok(())
}

/// The 17-feature `binary:logistic` booking model as JSON.
///
/// Three trees splitting on `lead_time`, `no_of_special_requests`,
/// `market_segment_type`, `arrival_month` and `booking_status`; base score
/// 0.5.
pub fn booking_model_json() -> serde_json::Value {
    match serde_json::from_str(BOOKING_MODEL) {
        Ok(value) => value,
        Err(e) => panic!("booking model fixture is not valid JSON: {e}"),
    }
}

// =============================================================================
// Model Encoders
// =============================================================================

/// Encode `value` as UBJSON the way XGBoost writes its models: keys and
/// strings with `L` lengths, integers as `L`, and numeric arrays as typed
/// `$l` (int32) or `$d` (float32) containers.
pub fn to_ubjson(value: &Value) -> Vec<u8> {
    let mut out = Vec::new();
    write_ubjson(&mut out, value);
    out
}

fn write_ubjson_str(out: &mut Vec<u8>, s: &str) {
    out.push(b'L');
    out.extend_from_slice(&(s.len() as i64).to_be_bytes());
    out.extend_from_slice(s.as_bytes());
}

fn write_ubjson(out: &mut Vec<u8>, value: &Value) {
    let fits_i32 = |v: &Value| v.as_i64().is_some_and(|i| i32::try_from(i).is_ok());
    match value {
        Value::Null => out.push(b'Z'),
        Value::Bool(b) => out.push(if *b { b'T' } else { b'F' }),
        Value::Number(n) => match n.as_i64() {
            Some(i) => {
                out.push(b'L');
                out.extend_from_slice(&i.to_be_bytes());
            }
            None => {
                out.push(b'D');
                out.extend_from_slice(&n.as_f64().unwrap_or(f64::NAN).to_be_bytes());
            }
        },
        Value::String(s) => {
            out.push(b'S');
            write_ubjson_str(out, s);
        }
        Value::Array(items) if !items.is_empty() && items.iter().all(fits_i32) => {
            out.extend_from_slice(b"[$l#");
            write_ubjson(out, &Value::from(items.len()));
            for item in items {
                out.extend_from_slice(&(item.as_i64().unwrap_or(0) as i32).to_be_bytes());
            }
        }
        Value::Array(items) if !items.is_empty() && items.iter().all(Value::is_number) => {
            out.extend_from_slice(b"[$d#");
            write_ubjson(out, &Value::from(items.len()));
            for item in items {
                out.extend_from_slice(&(item.as_f64().unwrap_or(0.0) as f32).to_be_bytes());
            }
        }
        Value::Array(items) => {
            out.push(b'[');
            for item in items {
                write_ubjson(out, item);
            }
            out.push(b']');
        }
        Value::Object(map) => {
            out.push(b'{');
            for (key, item) in map {
                write_ubjson_str(out, key);
                write_ubjson(out, item);
            }
            out.push(b'}');
        }
    }
}

/// Encode `model` in XGBoost's legacy binary layout (as 1.x writes it,
/// without the `binf` magic). Feature names are not part of that format.
pub fn to_legacy_binary(model: &XgbModel) -> Vec<u8> {
    let mut out = Vec::new();
    let param = &model.learner.learner_model_param;

    let start = out.len();
    out.extend_from_slice(&param.base_score.to_le_bytes());
    out.extend_from_slice(&(param.num_feature as u32).to_le_bytes());
    out.extend_from_slice(&(param.num_class as i32).to_le_bytes());
    out.extend_from_slice(&0i32.to_le_bytes()); // contain_extra_attrs
    out.extend_from_slice(&0i32.to_le_bytes()); // contain_eval_metrics
    out.extend_from_slice(&model.version[0].to_le_bytes());
    out.extend_from_slice(&model.version[1].to_le_bytes());
    out.extend_from_slice(&(param.num_target as u32).to_le_bytes());
    out.resize(start + 136, 0);

    write_legacy_str(&mut out, model.learner.objective.name());
    write_legacy_str(&mut out, model.learner.gradient_booster.name());

    match &model.learner.gradient_booster {
        GradientBooster::Gbtree { model: trees } => write_legacy_gbtree(&mut out, trees, param.num_feature),
        GradientBooster::Dart { gbtree, weight_drop } => {
            write_legacy_gbtree(&mut out, &gbtree.model, param.num_feature);
            if !gbtree.model.trees.is_empty() {
                out.extend_from_slice(&(weight_drop.len() as u64).to_le_bytes());
                for w in weight_drop {
                    out.extend_from_slice(&w.to_le_bytes());
                }
            }
        }
        GradientBooster::Gblinear { .. } => {}
    }
    out
}

fn write_legacy_str(out: &mut Vec<u8>, s: &str) {
    out.extend_from_slice(&(s.len() as u64).to_le_bytes());
    out.extend_from_slice(s.as_bytes());
}

fn write_legacy_gbtree(out: &mut Vec<u8>, model: &ModelTrees, num_feature: i64) {
    let start = out.len();
    out.extend_from_slice(&(model.trees.len() as i32).to_le_bytes());
    out.extend_from_slice(&(model.gbtree_model_param.num_parallel_tree as i32).to_le_bytes());
    out.extend_from_slice(&(num_feature as i32).to_le_bytes());
    out.resize(start + 160, 0);

    for tree in &model.trees {
        write_legacy_tree(out, tree);
    }
    for group in &model.tree_info {
        out.extend_from_slice(&group.to_le_bytes());
    }
}

fn write_legacy_tree(out: &mut Vec<u8>, tree: &Tree) {
    let n = tree.left_children.len();
    let start = out.len();
    out.extend_from_slice(&1i32.to_le_bytes()); // num_roots
    out.extend_from_slice(&(n as i32).to_le_bytes());
    out.extend_from_slice(&(tree.tree_param.num_deleted as i32).to_le_bytes());
    out.extend_from_slice(&0i32.to_le_bytes()); // max_depth
    out.extend_from_slice(&(tree.tree_param.num_feature as i32).to_le_bytes());
    out.extend_from_slice(&0i32.to_le_bytes()); // size_leaf_vector
    out.resize(start + 148, 0);

    for i in 0..n {
        let parent = if i == 0 { -1 } else { tree.parents.get(i).copied().unwrap_or(0) };
        let default_left = if tree.default_left[i] != 0 { 1u32 << 31 } else { 0 };
        out.extend_from_slice(&parent.to_le_bytes());
        out.extend_from_slice(&tree.left_children[i].to_le_bytes());
        out.extend_from_slice(&tree.right_children[i].to_le_bytes());
        out.extend_from_slice(&((tree.split_indices[i] as u32) | default_left).to_le_bytes());
        out.extend_from_slice(&tree.split_conditions[i].to_le_bytes());
    }
    for i in 0..n {
        let stat = |v: &[f64]| v.get(i).copied().unwrap_or(0.0) as f32;
        out.extend_from_slice(&stat(&tree.loss_changes).to_le_bytes());
        out.extend_from_slice(&stat(&tree.sum_hessian).to_le_bytes());
        out.extend_from_slice(&tree.base_weights.get(i).copied().unwrap_or(0.0).to_le_bytes());
        out.extend_from_slice(&0i32.to_le_bytes()); // leaf_child_cnt
    }
}

/// A booking with every integer field zero.
pub fn zero_booking(market_segment_type: &str, booking_status: &str) -> BookingRecord {
    BookingRecord {
        no_of_adults: 0,
        no_of_children: 0,
        no_of_weekend_nights: 0,
        no_of_week_nights: 0,
        type_of_meal_plan: 0,
        required_car_parking_space: 0,
        room_type_reserved: 0,
        lead_time: 0,
        arrival_year: 0,
        arrival_month: 0,
        arrival_date: 0,
        market_segment_type: market_segment_type.to_owned(),
        repeated_guest: 0,
        no_of_previous_cancellations: 0,
        no_of_previous_bookings_not_canceled: 0,
        no_of_special_requests: 0,
        booking_status: booking_status.to_owned(),
    }
}

/// Logistic function, for computing expected scores by hand.
pub fn sigmoid(margin: f32) -> f32 {
    1.0 / (1.0 + (-margin).exp())
}
