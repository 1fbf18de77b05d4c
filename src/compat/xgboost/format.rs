//! Model file format detection.

use std::fmt;

use super::json::XgbModel;
use super::reader::DecodeError;
use super::{binary, ubjson};

/// Serialization of an XGBoost model file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFormat {
    /// JSON text (`.json`).
    Json,
    /// Universal Binary JSON, the XGBoost 2.x default.
    Ubjson,
    /// The XGBoost 1.x binary layout.
    LegacyBinary,
}

/// Bytes that can follow the opening `{` of a UBJSON object but never the
/// `{` of JSON text: a key length marker or a container header.
const UBJSON_AFTER_BRACE: &[u8] = b"iUIlL$#";

impl ModelFormat {
    /// Identify the format from the leading bytes of a model file.
    pub fn detect(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(binary::BINARY_MAGIC) {
            return Some(ModelFormat::LegacyBinary);
        }
        if let [b'{', next, ..] = bytes {
            if UBJSON_AFTER_BRACE.contains(next) {
                return Some(ModelFormat::Ubjson);
            }
        }
        if bytes.iter().find(|b| !b.is_ascii_whitespace()) == Some(&b'{') {
            return Some(ModelFormat::Json);
        }
        if binary::looks_like_binary(bytes) {
            return Some(ModelFormat::LegacyBinary);
        }
        None
    }

    pub fn name(self) -> &'static str {
        match self {
            ModelFormat::Json => "JSON",
            ModelFormat::Ubjson => "UBJSON",
            ModelFormat::LegacyBinary => "legacy binary",
        }
    }
}

impl fmt::Display for ModelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A model file could not be read.
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error("not an XGBoost model in JSON, UBJSON or legacy binary format")]
    Unrecognized,
    #[error("malformed {format} model: {source}")]
    Decode {
        format: ModelFormat,
        #[source]
        source: DecodeError,
    },
    #[error("invalid {format} model document: {source}")]
    Document {
        format: ModelFormat,
        #[source]
        source: serde_json::Error,
    },
}

impl XgbModel {
    /// Parse a model file in any supported format, reporting which one it was.
    pub fn from_bytes(bytes: &[u8]) -> Result<(Self, ModelFormat), FormatError> {
        let format = ModelFormat::detect(bytes).ok_or(FormatError::Unrecognized)?;
        let document = |source: serde_json::Error| FormatError::Document { format, source };
        let decode = |source: DecodeError| FormatError::Decode { format, source };

        let model = match format {
            ModelFormat::Json => XgbModel::from_slice(bytes).map_err(document)?,
            ModelFormat::Ubjson => {
                let value = ubjson::decode(bytes).map_err(decode)?;
                XgbModel::from_value(&value).map_err(document)?
            }
            ModelFormat::LegacyBinary => binary::decode(bytes).map_err(decode)?,
        };
        Ok((model, format))
    }
}
