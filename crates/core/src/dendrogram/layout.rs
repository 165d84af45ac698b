use serde::{Deserialize, Serialize};

use crate::cluster::{MergeTree, NodeRef};
use crate::types::{IndividualId, Scalar};

/// One row of a linkage table.
///
/// `left` and `right` index either a leaf (`< n`) or the cluster formed by
/// row `left - n` / `right - n`, the layout used by generic dendrogram
/// plotting routines.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinkageRow {
    pub left: usize,
    pub right: usize,
    pub distance: Scalar,
    pub size: usize,
}

/// Renderable view of a merge tree: leaf labels, plotting order and a
/// linkage table sorted by increasing distance.
///
/// Only [`DendrogramBuilder`] constructs layouts; they are serialised for
/// output and never read back.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DendrogramLayout {
    pub(crate) labels: Vec<IndividualId>,
    pub(crate) leaf_order: Vec<usize>,
    pub(crate) linkage: Vec<LinkageRow>,
}

impl DendrogramLayout {
    /// Leaf labels; leaf `i` of the linkage table is `labels()[i]`.
    pub fn labels(&self) -> &[IndividualId] {
        &self.labels
    }

    /// Leaf indices in left-to-right plotting order.
    pub fn leaf_order(&self) -> &[usize] {
        &self.leaf_order
    }

    pub fn linkage(&self) -> &[LinkageRow] {
        &self.linkage
    }

    pub fn n_leaves(&self) -> usize {
        self.labels.len()
    }

    /// Labels in plotting order.
    pub fn ordered_labels(&self) -> Vec<&str> {
        self.leaf_order
            .iter()
            .map(|&i| self.labels[i].as_str())
            .collect()
    }

    /// Height of the root merge, or 0 for a single leaf.
    pub fn height(&self) -> Scalar {
        self.linkage.last().map_or(0.0, |row| row.distance)
    }

    /// Whether the linkage rows are in non-decreasing distance order.
    pub fn is_monotonic(&self) -> bool {
        self.linkage
            .windows(2)
            .all(|w| w[0].distance <= w[1].distance)
    }

    /// Height of the node with linkage index `index` (0 for leaves).
    pub(crate) fn node_height(&self, index: usize) -> Scalar {
        let n = self.labels.len();
        if index < n {
            0.0
        } else {
            self.linkage[index - n].distance
        }
    }
}

/// Converts [`MergeTree`]s into [`DendrogramLayout`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct DendrogramBuilder;

impl DendrogramBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Build the layout of `tree`.
    ///
    /// Linkage rows are the merges sorted stably by distance, so a merge
    /// always follows the merges it contains. The leaf order is an in-order
    /// traversal that visits each node's left child before its right child,
    /// which never crosses branches.
    pub fn build(&self, tree: &MergeTree) -> DendrogramLayout {
        let n = tree.n_leaves();
        let nodes = tree.nodes();

        let mut order: Vec<usize> = (0..nodes.len()).collect();
        order.sort_by(|&a, &b| nodes[a].distance.total_cmp(&nodes[b].distance));

        let mut position = vec![0usize; nodes.len()];
        for (row, &k) in order.iter().enumerate() {
            position[k] = row;
        }

        let index_of = |node: NodeRef| match node {
            NodeRef::Leaf(i) => i,
            NodeRef::Merge(k) => n + position[k],
        };

        let linkage = order
            .iter()
            .map(|&k| {
                let node = &nodes[k];
                LinkageRow {
                    left: index_of(node.left),
                    right: index_of(node.right),
                    distance: node.distance,
                    size: node.size,
                }
            })
            .collect();

        let leaf_order = tree
            .root()
            .map(|root| tree.leaves_under(root))
            .unwrap_or_default();

        DendrogramLayout {
            labels: tree.leaves().to_vec(),
            leaf_order,
            linkage,
        }
    }
}
