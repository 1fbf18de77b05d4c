//! XGBoost model format support.
//!
//! A model file may be JSON, UBJSON or the legacy binary layout.
//! [`XgbModel::from_bytes`] detects which and parses all three into the same
//! foreign types, which `convert` then turns into the native forest.

mod binary;
mod convert;
mod format;
mod json;
mod reader;
mod ubjson;

pub use convert::ConversionError;
pub use format::{FormatError, ModelFormat};
pub use json::*;
pub use reader::DecodeError;
