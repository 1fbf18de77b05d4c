//! Split conditions for decision nodes.

/// Numeric split condition for a decision node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplitCondition {
    /// Feature index to split on
    pub feature_index: u32,
    /// Threshold value (go left if feature < threshold)
    pub threshold: f32,
    /// Direction for missing values (true = left, false = right)
    pub default_left: bool,
}

impl SplitCondition {
    pub fn new(feature_index: u32, threshold: f32, default_left: bool) -> Self {
        Self {
            feature_index,
            threshold,
            default_left,
        }
    }

    /// Evaluate which direction to go for a feature value.
    /// Returns true for left, false for right.
    #[inline]
    pub fn go_left(&self, feature_value: f32) -> bool {
        if feature_value.is_nan() {
            self.default_left
        } else {
            feature_value < self.threshold
        }
    }

    /// Like [`go_left`](Self::go_left), reading the value from a row.
    ///
    /// A feature index past the end of the row counts as missing.
    #[inline]
    pub fn go_left_in(&self, row: &[f32]) -> bool {
        let value = row
            .get(self.feature_index as usize)
            .copied()
            .unwrap_or(f32::NAN);
        self.go_left(value)
    }
}
