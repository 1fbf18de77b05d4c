//! Booking records and the feature vector the model consumes.
//!
//! [`FEATURE_SCHEMA`] is the one place the model's input layout is written
//! down. The vector built here and the startup check against the loaded
//! model (see [`BoosterModel::check_schema`](crate::model::BoosterModel::check_schema))
//! both read it.

use serde::{Deserialize, Serialize};

use crate::encoding::{encode, encode_with, CategoryKind, EncodingError, EncodingPolicy};

/// Number of features the booking model takes.
pub const NUM_FEATURES: usize = 17;

/// Ordered feature names of the model input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureSchema {
    names: &'static [&'static str],
}

impl FeatureSchema {
    #[inline]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> &'static [&'static str] {
        self.names
    }

    /// Position of the named feature.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|&n| n == name)
    }
}

/// Model input layout, in training order.
pub const FEATURE_SCHEMA: FeatureSchema = FeatureSchema {
    names: &[
        "no_of_adults",
        "no_of_children",
        "no_of_weekend_nights",
        "no_of_week_nights",
        "type_of_meal_plan",
        "required_car_parking_space",
        "room_type_reserved",
        "lead_time",
        "arrival_year",
        "arrival_month",
        "arrival_date",
        "market_segment_type",
        "repeated_guest",
        "no_of_previous_cancellations",
        "no_of_previous_bookings_not_canceled",
        "no_of_special_requests",
        "booking_status",
    ],
};

/// Position of the encoded market segment in the vector.
pub const MARKET_SEGMENT_INDEX: usize = 11;
/// Position of the encoded booking status in the vector.
pub const BOOKING_STATUS_INDEX: usize = 16;

/// A hotel booking to be scored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingRecord {
    pub no_of_adults: i64,
    pub no_of_children: i64,
    pub no_of_weekend_nights: i64,
    pub no_of_week_nights: i64,
    pub type_of_meal_plan: i64,
    pub required_car_parking_space: i64,
    pub room_type_reserved: i64,
    pub lead_time: i64,
    pub arrival_year: i64,
    pub arrival_month: i64,
    pub arrival_date: i64,
    pub market_segment_type: String,
    pub repeated_guest: i64,
    pub no_of_previous_cancellations: i64,
    pub no_of_previous_bookings_not_canceled: i64,
    pub no_of_special_requests: i64,
    pub booking_status: String,
}

/// Numeric model input for one booking.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector(Vec<f32>);

impl FeatureVector {
    /// Wrap raw values without checking their number.
    ///
    /// Length is checked against the model when predicting.
    pub fn from_values(values: Vec<f32>) -> Self {
        Self(values)
    }

    /// Build the vector for `record` with the default (fallback) encoding.
    pub fn build(record: &BookingRecord) -> Self {
        Self::assemble(
            record,
            encode(CategoryKind::MarketSegment, &record.market_segment_type),
            encode(CategoryKind::BookingStatus, &record.booking_status),
        )
    }

    /// Lay out `record` in [`FEATURE_SCHEMA`] order with the given codes.
    /// Integers are passed through unscaled.
    fn assemble(record: &BookingRecord, market_segment: u32, booking_status: u32) -> Self {
        let values = [
            record.no_of_adults as f32,
            record.no_of_children as f32,
            record.no_of_weekend_nights as f32,
            record.no_of_week_nights as f32,
            record.type_of_meal_plan as f32,
            record.required_car_parking_space as f32,
            record.room_type_reserved as f32,
            record.lead_time as f32,
            record.arrival_year as f32,
            record.arrival_month as f32,
            record.arrival_date as f32,
            market_segment as f32,
            record.repeated_guest as f32,
            record.no_of_previous_cancellations as f32,
            record.no_of_previous_bookings_not_canceled as f32,
            record.no_of_special_requests as f32,
            booking_status as f32,
        ];
        debug_assert_eq!(values.len(), FEATURE_SCHEMA.len());

        Self(values.to_vec())
    }

    #[inline]
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Value of the named feature, if the vector has that slot.
    pub fn get(&self, name: &str) -> Option<f32> {
        FEATURE_SCHEMA.index_of(name).and_then(|i| self.0.get(i).copied())
    }

    pub fn into_vec(self) -> Vec<f32> {
        self.0
    }
}

/// Turns booking records into feature vectors.
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureVectorBuilder {
    policy: EncodingPolicy,
}

impl FeatureVectorBuilder {
    pub fn new(policy: EncodingPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> EncodingPolicy {
        self.policy
    }

    /// Assemble the vector in [`FEATURE_SCHEMA`] order.
    ///
    /// Fails only under [`EncodingPolicy::Strict`].
    pub fn build(&self, record: &BookingRecord) -> Result<FeatureVector, EncodingError> {
        let market_segment = encode_with(
            self.policy,
            CategoryKind::MarketSegment,
            &record.market_segment_type,
        )?;
        let booking_status = encode_with(self.policy, CategoryKind::BookingStatus, &record.booking_status)?;

        Ok(FeatureVector::assemble(record, market_segment, booking_status))
    }
}
