//! External model format loaders.
//!
//! The scoring model is trained with XGBoost and shipped in one of its
//! serializations; this module parses them and converts the result to the
//! native forest.

pub mod xgboost;

pub use xgboost::{ConversionError, FormatError, ModelFormat, XgbModel};
