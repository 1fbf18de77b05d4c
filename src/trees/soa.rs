//! Structure-of-Arrays tree storage implementation.

use super::leaf::LeafValue;
use super::node::SplitCondition;

/// Structural problems found by [`SoATreeStorage::validate`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TreeError {
    #[error("tree has no nodes")]
    Empty,
    #[error("node {node} references child {child} but tree has {num_nodes} nodes")]
    ChildOutOfRange {
        node: u32,
        child: u32,
        num_nodes: usize,
    },
    #[error("node {node} is reachable more than once from the root")]
    NotATree { node: u32 },
}

/// Structure-of-Arrays tree storage for efficient inference.
///
/// Stores tree nodes in flat arrays for cache-friendly traversal.
/// Child indices are local to this tree (0 = root).
#[derive(Debug, Clone)]
pub struct SoATreeStorage<L: LeafValue> {
    /// Split feature index per node
    split_indices: Box<[u32]>,
    /// Split threshold per node
    split_thresholds: Box<[f32]>,
    /// Left child index per node (only valid for non-leaf nodes)
    left_children: Box<[u32]>,
    /// Right child index per node (only valid for non-leaf nodes)
    right_children: Box<[u32]>,
    /// Default direction for missing values (true = left)
    default_left: Box<[bool]>,
    /// Whether each node is a leaf
    is_leaf: Box<[bool]>,
    /// Leaf values (indexed by node index, only valid for leaf nodes)
    leaf_values: Box<[L]>,
}

impl<L: LeafValue> SoATreeStorage<L> {
    /// Number of nodes in this tree.
    #[inline]
    pub fn num_nodes(&self) -> usize {
        self.is_leaf.len()
    }

    /// Check if a node is a leaf.
    #[inline]
    pub fn is_leaf(&self, node_idx: u32) -> bool {
        self.is_leaf[node_idx as usize]
    }

    /// Split condition of a non-leaf node.
    #[inline]
    pub fn condition(&self, node_idx: u32) -> SplitCondition {
        let i = node_idx as usize;
        SplitCondition::new(
            self.split_indices[i],
            self.split_thresholds[i],
            self.default_left[i],
        )
    }

    /// Get left child index.
    #[inline]
    pub fn left_child(&self, node_idx: u32) -> u32 {
        self.left_children[node_idx as usize]
    }

    /// Get right child index.
    #[inline]
    pub fn right_child(&self, node_idx: u32) -> u32 {
        self.right_children[node_idx as usize]
    }

    /// Get leaf value for a node.
    #[inline]
    pub fn leaf_value(&self, node_idx: u32) -> &L {
        &self.leaf_values[node_idx as usize]
    }

    /// Highest feature index used by any split, if the tree has splits.
    pub fn max_feature_index(&self) -> Option<u32> {
        self.split_indices
            .iter()
            .zip(self.is_leaf.iter())
            .filter(|&(_, &leaf)| !leaf)
            .map(|(&feat, _)| feat)
            .max()
    }

    /// Check that every child index is in range and that each node is
    /// reached at most once from the root.
    ///
    /// [`predict_row`](Self::predict_row) only terminates on trees that pass.
    pub fn validate(&self) -> Result<(), TreeError> {
        let num_nodes = self.num_nodes();
        if num_nodes == 0 {
            return Err(TreeError::Empty);
        }

        let mut seen = vec![false; num_nodes];
        let mut stack = vec![0u32];
        while let Some(node) = stack.pop() {
            if std::mem::replace(&mut seen[node as usize], true) {
                return Err(TreeError::NotATree { node });
            }
            if self.is_leaf(node) {
                continue;
            }
            for child in [self.left_child(node), self.right_child(node)] {
                if child as usize >= num_nodes {
                    return Err(TreeError::ChildOutOfRange {
                        node,
                        child,
                        num_nodes,
                    });
                }
                stack.push(child);
            }
        }
        Ok(())
    }

    /// Traverse the tree to find the leaf for given features.
    pub fn predict_row(&self, features: &[f32]) -> &L {
        let mut idx = 0u32; // Start at root

        while !self.is_leaf(idx) {
            idx = if self.condition(idx).go_left_in(features) {
                self.left_child(idx)
            } else {
                self.right_child(idx)
            };
        }

        self.leaf_value(idx)
    }
}

/// Builder for constructing SoATreeStorage from individual nodes.
///
/// Nodes are stored in insertion order; child indices passed to
/// [`add_split`](Self::add_split) refer to that order.
#[derive(Debug, Default)]
pub struct TreeBuilder<L: LeafValue> {
    split_indices: Vec<u32>,
    split_thresholds: Vec<f32>,
    left_children: Vec<u32>,
    right_children: Vec<u32>,
    default_left: Vec<bool>,
    is_leaf: Vec<bool>,
    leaf_values: Vec<L>,
}

impl<L: LeafValue> TreeBuilder<L> {
    pub fn new() -> Self {
        Self {
            split_indices: Vec::new(),
            split_thresholds: Vec::new(),
            left_children: Vec::new(),
            right_children: Vec::new(),
            default_left: Vec::new(),
            is_leaf: Vec::new(),
            leaf_values: Vec::new(),
        }
    }

    /// Add a split node. Returns the node index.
    pub fn add_split(&mut self, condition: SplitCondition, left_child: u32, right_child: u32) -> u32 {
        let idx = self.is_leaf.len() as u32;
        self.split_indices.push(condition.feature_index);
        self.split_thresholds.push(condition.threshold);
        self.left_children.push(left_child);
        self.right_children.push(right_child);
        self.default_left.push(condition.default_left);
        self.is_leaf.push(false);
        self.leaf_values.push(L::default());
        idx
    }

    /// Add a leaf node. Returns the node index.
    pub fn add_leaf(&mut self, value: L) -> u32 {
        let idx = self.is_leaf.len() as u32;
        self.split_indices.push(0);
        self.split_thresholds.push(0.0);
        self.left_children.push(0);
        self.right_children.push(0);
        self.default_left.push(false);
        self.is_leaf.push(true);
        self.leaf_values.push(value);
        idx
    }

    /// Build the tree storage.
    pub fn build(self) -> SoATreeStorage<L> {
        SoATreeStorage {
            split_indices: self.split_indices.into_boxed_slice(),
            split_thresholds: self.split_thresholds.into_boxed_slice(),
            left_children: self.left_children.into_boxed_slice(),
            right_children: self.right_children.into_boxed_slice(),
            default_left: self.default_left.into_boxed_slice(),
            is_leaf: self.is_leaf.into_boxed_slice(),
            leaf_values: self.leaf_values.into_boxed_slice(),
        }
    }
}
