use serde::Serialize;

use crate::error::{DendroError, Result};
use crate::types::{IndividualId, Scalar};

/// Reference to a node in a [`MergeTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "index", rename_all = "snake_case")]
pub enum NodeRef {
    /// Index into [`MergeTree::leaves`].
    Leaf(usize),
    /// Index into [`MergeTree::nodes`].
    Merge(usize),
}

/// One agglomeration step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergeNode {
    /// Stable identifier, equal to the node's arena index and to its
    /// position in merge order.
    pub id: usize,
    pub left: NodeRef,
    pub right: NodeRef,
    /// Merge height. Never below the heights of the children.
    pub distance: Scalar,
    /// Number of leaves below this node.
    pub size: usize,
    /// Smallest leaf index below this node.
    pub min_leaf: usize,
}

/// Binary merge tree stored as an arena.
///
/// Children are referenced by index, and every child precedes its parent
/// in `nodes`. A tree over `n > 0` leaves has exactly `n - 1` merge nodes;
/// the last one is the root.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeTree {
    leaves: Vec<IndividualId>,
    nodes: Vec<MergeNode>,
}

impl MergeTree {
    pub(crate) fn new(leaves: Vec<IndividualId>, nodes: Vec<MergeNode>) -> Self {
        Self { leaves, nodes }
    }

    /// Leaf labels, indexed by [`NodeRef::Leaf`].
    pub fn leaves(&self) -> &[IndividualId] {
        &self.leaves
    }

    /// Merge nodes in creation order.
    pub fn nodes(&self) -> &[MergeNode] {
        &self.nodes
    }

    pub fn n_leaves(&self) -> usize {
        self.leaves.len()
    }

    pub fn n_merges(&self) -> usize {
        self.nodes.len()
    }

    /// The root: the last merge, the only leaf of a singleton tree, or
    /// `None` for an empty tree.
    pub fn root(&self) -> Option<NodeRef> {
        match (self.nodes.len(), self.leaves.len()) {
            (0, 0) => None,
            (0, _) => Some(NodeRef::Leaf(0)),
            (m, _) => Some(NodeRef::Merge(m - 1)),
        }
    }

    pub fn size_of(&self, node: NodeRef) -> usize {
        match node {
            NodeRef::Leaf(_) => 1,
            NodeRef::Merge(k) => self.nodes[k].size,
        }
    }

    pub fn height_of(&self, node: NodeRef) -> Scalar {
        match node {
            NodeRef::Leaf(_) => 0.0,
            NodeRef::Merge(k) => self.nodes[k].distance,
        }
    }

    /// Leaf indices below `node`, left subtree first.
    pub fn leaves_under(&self, node: NodeRef) -> Vec<usize> {
        let mut out = Vec::with_capacity(self.size_of(node));
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            match current {
                NodeRef::Leaf(i) => out.push(i),
                NodeRef::Merge(k) => {
                    stack.push(self.nodes[k].right);
                    stack.push(self.nodes[k].left);
                }
            }
        }
        out
    }

    /// Check the structural invariants: `n - 1` merges, each node used as
    /// a child exactly once, children before parents, consistent sizes and
    /// heights that never decrease towards the root.
    ///
    /// # Errors
    /// Returns [`DendroError::Data`] describing the first violation.
    pub fn validate(&self) -> Result<()> {
        let n = self.leaves.len();
        if n == 0 {
            return if self.nodes.is_empty() {
                Ok(())
            } else {
                Err(DendroError::Data("merge nodes without leaves".into()))
            };
        }
        if self.nodes.len() != n - 1 {
            return Err(DendroError::Data(format!(
                "tree over {} leaves has {} merges, expected {}",
                n,
                self.nodes.len(),
                n - 1
            )));
        }

        let mut leaf_used = vec![false; n];
        let mut node_used = vec![false; self.nodes.len()];

        for (k, node) in self.nodes.iter().enumerate() {
            if node.id != k {
                return Err(DendroError::Data(format!(
                    "merge node at {} carries id {}",
                    k, node.id
                )));
            }
            for child in [node.left, node.right] {
                let used = match child {
                    NodeRef::Leaf(i) if i < n => &mut leaf_used[i],
                    NodeRef::Merge(c) if c < k => &mut node_used[c],
                    other => {
                        return Err(DendroError::Data(format!(
                            "merge node {} has invalid child {:?}",
                            k, other
                        )))
                    }
                };
                if *used {
                    return Err(DendroError::Data(format!(
                        "{:?} is merged more than once",
                        child
                    )));
                }
                *used = true;

                if self.height_of(child) > node.distance {
                    return Err(DendroError::Data(format!(
                        "merge node {} at height {} is below its child {:?}",
                        k, node.distance, child
                    )));
                }
            }
            if self.size_of(node.left) + self.size_of(node.right) != node.size {
                return Err(DendroError::Data(format!(
                    "merge node {} has inconsistent size {}",
                    k, node.size
                )));
            }
        }

        Ok(())
    }
}
