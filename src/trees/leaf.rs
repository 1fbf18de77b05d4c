//! Leaf value types for tree nodes.

/// Trait for values stored in leaf nodes.
pub trait LeafValue: Clone + Default + Send + Sync {
    /// Accumulate another leaf value, scaled by `weight`.
    fn accumulate(&mut self, other: &Self, weight: f32);
}

/// Scalar leaf value (single f32).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScalarLeaf(pub f32);

impl LeafValue for ScalarLeaf {
    #[inline]
    fn accumulate(&mut self, other: &Self, weight: f32) {
        self.0 += other.0 * weight;
    }
}

impl From<f32> for ScalarLeaf {
    fn from(value: f32) -> Self {
        Self(value)
    }
}

impl From<ScalarLeaf> for f32 {
    fn from(leaf: ScalarLeaf) -> Self {
        leaf.0
    }
}
