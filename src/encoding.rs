//! Categorical encoding of booking fields.
//!
//! The model was trained on integer codes for the two string-valued fields
//! of a booking. The code tables are fixed:
//!
//! | market segment | code |   | booking status | code |
//! |----------------|------|---|----------------|------|
//! | `Online`       | 0    |   | `Confirmed`    | 0    |
//! | `Offline`      | 1    |   | `Canceled`     | 1    |
//! | `Corporate`    | 2    |   | `Pending`      | 2    |
//! | `Others`       | 3    |   |                |      |
//!
//! Labels match exactly (case-sensitive).
//!
//! # Unknown labels
//!
//! Under [`EncodingPolicy::Fallback`] (the default) a label missing from the
//! table encodes as `0`, so an unknown segment scores exactly like `Online`
//! and an unknown status exactly like `Confirmed`. Nothing signals this to
//! the caller. Deployments that would rather reject such requests can switch
//! to [`EncodingPolicy::Strict`].

use std::fmt;

use serde::{Deserialize, Serialize};

/// Code used for labels missing from a table under the fallback policy.
pub const FALLBACK_CODE: u32 = 0;

/// Market segment through which the booking was made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarketSegment {
    Online = 0,
    Offline = 1,
    Corporate = 2,
    Others = 3,
}

impl MarketSegment {
    pub const ALL: [MarketSegment; 4] = [
        MarketSegment::Online,
        MarketSegment::Offline,
        MarketSegment::Corporate,
        MarketSegment::Others,
    ];

    pub fn label(self) -> &'static str {
        match self {
            MarketSegment::Online => "Online",
            MarketSegment::Offline => "Offline",
            MarketSegment::Corporate => "Corporate",
            MarketSegment::Others => "Others",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.label() == label)
    }

    #[inline]
    pub fn code(self) -> u32 {
        self as u32
    }
}

/// Status of the booking at the time it is scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BookingStatus {
    Confirmed = 0,
    Canceled = 1,
    Pending = 2,
}

impl BookingStatus {
    pub const ALL: [BookingStatus; 3] = [
        BookingStatus::Confirmed,
        BookingStatus::Canceled,
        BookingStatus::Pending,
    ];

    pub fn label(self) -> &'static str {
        match self {
            BookingStatus::Confirmed => "Confirmed",
            BookingStatus::Canceled => "Canceled",
            BookingStatus::Pending => "Pending",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.label() == label)
    }

    #[inline]
    pub fn code(self) -> u32 {
        self as u32
    }
}

/// Which code table a label is looked up in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CategoryKind {
    MarketSegment,
    BookingStatus,
}

impl CategoryKind {
    /// Request field carrying this category.
    pub fn field(self) -> &'static str {
        match self {
            CategoryKind::MarketSegment => "market_segment_type",
            CategoryKind::BookingStatus => "booking_status",
        }
    }

    /// Code for `label`, or `None` if the table has no such label.
    pub fn lookup(self, label: &str) -> Option<u32> {
        match self {
            CategoryKind::MarketSegment => MarketSegment::from_label(label).map(MarketSegment::code),
            CategoryKind::BookingStatus => BookingStatus::from_label(label).map(BookingStatus::code),
        }
    }
}

impl fmt::Display for CategoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field())
    }
}

/// What to do with a label that is not in its code table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncodingPolicy {
    /// Encode as [`FALLBACK_CODE`].
    #[default]
    Fallback,
    /// Reject with [`EncodingError::UnknownCategory`].
    Strict,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodingError {
    #[error("unknown {kind} value {value:?}")]
    UnknownCategory { kind: CategoryKind, value: String },
}

/// Encode `value` under the fallback policy. Total over all strings.
pub fn encode(kind: CategoryKind, value: &str) -> u32 {
    kind.lookup(value).unwrap_or_else(|| {
        tracing::debug!(field = kind.field(), value, "unknown category, using fallback code");
        FALLBACK_CODE
    })
}

/// Encode `value` under the given policy.
pub fn encode_with(policy: EncodingPolicy, kind: CategoryKind, value: &str) -> Result<u32, EncodingError> {
    match policy {
        EncodingPolicy::Fallback => Ok(encode(kind, value)),
        EncodingPolicy::Strict => kind.lookup(value).ok_or_else(|| EncodingError::UnknownCategory {
            kind,
            value: value.to_owned(),
        }),
    }
}
