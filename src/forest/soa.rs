//! Structure-of-Arrays forest implementation.

use crate::trees::{LeafValue, ScalarLeaf, SoATreeStorage, TreeError};

/// A forest that cannot be traversed safely.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ForestError {
    #[error("forest has no trees")]
    NoTrees,
    #[error("tree {tree}: {source}")]
    InvalidTree {
        tree: usize,
        #[source]
        source: TreeError,
    },
    #[error("tree {tree} assigned to group {group} but forest has {num_groups} groups")]
    GroupOutOfRange {
        tree: usize,
        group: u32,
        num_groups: u32,
    },
}

/// Structure-of-Arrays forest for efficient inference.
///
/// Stores multiple trees with their group assignments for multi-class support
/// and a weight per tree (1.0 except for DART ensembles).
#[derive(Debug, Clone)]
pub struct SoAForest<L: LeafValue = ScalarLeaf> {
    /// Individual tree storage
    trees: Vec<SoATreeStorage<L>>,
    /// Which output group each tree belongs to (for multi-class)
    tree_groups: Vec<u32>,
    /// Scale applied to each tree's leaf value
    tree_weights: Vec<f32>,
    /// Number of output groups (1 for regression, K for K-class)
    num_groups: u32,
    /// Base score per group (added to predictions), in margin space
    base_score: Vec<f32>,
}

impl<L: LeafValue> SoAForest<L> {
    /// Create a new forest with the given number of groups.
    pub fn new(num_groups: u32) -> Self {
        Self {
            trees: Vec::new(),
            tree_groups: Vec::new(),
            tree_weights: Vec::new(),
            num_groups,
            base_score: vec![0.0; num_groups as usize],
        }
    }

    /// Create a forest for regression (single output group).
    pub fn for_regression() -> Self {
        Self::new(1)
    }

    /// Set the base score for all groups.
    pub fn with_base_score(mut self, base_score: Vec<f32>) -> Self {
        debug_assert_eq!(base_score.len(), self.num_groups as usize);
        self.base_score = base_score;
        self
    }

    /// Add a tree with unit weight.
    pub fn push_tree(&mut self, tree: SoATreeStorage<L>, group: u32) {
        self.push_weighted_tree(tree, group, 1.0);
    }

    /// Add a tree whose leaf values are scaled by `weight`.
    pub fn push_weighted_tree(&mut self, tree: SoATreeStorage<L>, group: u32, weight: f32) {
        self.trees.push(tree);
        self.tree_groups.push(group);
        self.tree_weights.push(weight);
    }

    /// Number of trees in the forest.
    #[inline]
    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }

    /// Number of output groups.
    #[inline]
    pub fn num_groups(&self) -> u32 {
        self.num_groups
    }

    /// Get the base score for each group.
    #[inline]
    pub fn base_score(&self) -> &[f32] {
        &self.base_score
    }

    /// Iterate over trees with their group assignments and weights.
    pub fn trees(&self) -> impl Iterator<Item = (&SoATreeStorage<L>, u32, f32)> {
        self.trees
            .iter()
            .zip(self.tree_groups.iter())
            .zip(self.tree_weights.iter())
            .map(|((t, &g), &w)| (t, g, w))
    }

    /// Highest feature index any split reads, if any tree splits at all.
    pub fn max_feature_index(&self) -> Option<u32> {
        self.trees.iter().filter_map(|t| t.max_feature_index()).max()
    }

    /// Validate tree structure and group assignments.
    pub fn validate(&self) -> Result<(), ForestError> {
        if self.trees.is_empty() {
            return Err(ForestError::NoTrees);
        }
        for (idx, (tree, group, _)) in self.trees().enumerate() {
            if group >= self.num_groups {
                return Err(ForestError::GroupOutOfRange {
                    tree: idx,
                    group,
                    num_groups: self.num_groups,
                });
            }
            tree.validate()
                .map_err(|source| ForestError::InvalidTree { tree: idx, source })?;
        }
        Ok(())
    }
}

/// Prediction methods for forests with scalar leaves.
impl SoAForest<ScalarLeaf> {
    /// Predict for a single row of features.
    ///
    /// Returns one raw margin per output group.
    pub fn predict_row(&self, features: &[f32]) -> Vec<f32> {
        let mut output: Vec<ScalarLeaf> = self.base_score.iter().copied().map(ScalarLeaf).collect();

        for (tree, group, weight) in self.trees() {
            output[group as usize].accumulate(tree.predict_row(features), weight);
        }

        output.into_iter().map(f32::from).collect()
    }
}
