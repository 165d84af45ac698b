use std::cmp::Ordering;

use crate::distance::{condensed_index, DistanceMatrix, DistanceTransform, MissingDistance};
use crate::error::{DendroError, Result};
use crate::network::NetworkSubset;
use crate::types::{IndividualId, Scalar};

use super::linkage::Linkage;
use super::tree::{MergeNode, MergeTree, NodeRef};

/// Ordering key of a candidate merge.
///
/// Pairs are compared by distance, then by combined cluster size, then by
/// the smaller and the larger of the two clusters' minimum leaf ranks.
/// Leaves are ranked by sorted identifier, so the last two fields realise
/// "lexicographically smallest member first". Clusters are disjoint, so no
/// two distinct pairs share a key.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    distance: Scalar,
    size: usize,
    low: usize,
    high: usize,
}

impl Candidate {
    fn cmp_key(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then(self.size.cmp(&other.size))
            .then(self.low.cmp(&other.low))
            .then(self.high.cmp(&other.high))
    }
}

/// Working state of one agglomeration run.
///
/// Slots `0..n` start as singleton clusters. When two clusters merge, the
/// union takes over one slot and the other is deactivated.
struct Workspace {
    n: usize,
    dist: Vec<Scalar>,
    active: Vec<bool>,
    size: Vec<usize>,
    min_rank: Vec<usize>,
    node: Vec<NodeRef>,
    nearest: Vec<usize>,
    best: Vec<Candidate>,
}

impl Workspace {
    fn new(n: usize, dist: Vec<Scalar>) -> Self {
        let placeholder = Candidate {
            distance: Scalar::INFINITY,
            size: usize::MAX,
            low: usize::MAX,
            high: usize::MAX,
        };
        let mut ws = Self {
            n,
            dist,
            active: vec![true; n],
            size: vec![1; n],
            min_rank: (0..n).collect(),
            node: (0..n).map(NodeRef::Leaf).collect(),
            nearest: vec![0; n],
            best: vec![placeholder; n],
        };
        for i in 0..n {
            ws.refresh(i);
        }
        ws
    }

    #[inline]
    fn d(&self, i: usize, j: usize) -> Scalar {
        self.dist[condensed_index(self.n, i, j)]
    }

    fn candidate(&self, i: usize, j: usize) -> Candidate {
        let (a, b) = (self.min_rank[i], self.min_rank[j]);
        Candidate {
            distance: self.d(i, j),
            size: self.size[i] + self.size[j],
            low: a.min(b),
            high: a.max(b),
        }
    }

    /// Recompute the nearest active neighbour of slot `i`.
    fn refresh(&mut self, i: usize) {
        let mut best: Option<(usize, Candidate)> = None;
        for j in (0..self.n).filter(|&j| j != i && self.active[j]) {
            let c = self.candidate(i, j);
            if best.map_or(true, |(_, b)| c.cmp_key(&b) == Ordering::Less) {
                best = Some((j, c));
            }
        }
        if let Some((j, c)) = best {
            self.nearest[i] = j;
            self.best[i] = c;
        }
    }

    /// Active slot whose cached candidate is globally smallest.
    fn closest_pair(&self) -> Option<(usize, usize)> {
        (0..self.n)
            .filter(|&i| self.active[i])
            .min_by(|&a, &b| self.best[a].cmp_key(&self.best[b]))
            .map(|i| (i, self.nearest[i]))
    }
}

/// Agglomerative hierarchical clustering over one network.
///
/// Distances between clusters are updated incrementally with the
/// Lance-Williams recurrence of the configured [`Linkage`]; each slot caches
/// its nearest neighbour so that only rows touched by a merge are rescanned.
/// Ties on the exact minimum distance are broken deterministically (see
/// [`ClusterEngine::cluster`]), which makes the tree independent of input
/// order.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClusterEngine {
    linkage: Linkage,
}

impl ClusterEngine {
    pub fn new(linkage: Linkage) -> Self {
        Self { linkage }
    }

    pub fn linkage(&self) -> Linkage {
        self.linkage
    }

    /// Build the distance matrix for `subset` and cluster it.
    ///
    /// # Errors
    /// [`DendroError::InsufficientData`] if the network has more than one
    /// member but no usable distance, [`DendroError::Data`] if it is empty.
    pub fn cluster_network(
        &self,
        subset: &NetworkSubset,
        transform: &DistanceTransform,
        missing: &MissingDistance,
    ) -> Result<MergeTree> {
        if subset.is_empty() {
            return Err(DendroError::Data(format!(
                "network '{}' has no members",
                subset.network_id
            )));
        }
        let matrix = DistanceMatrix::from_store(
            &subset.network_id,
            &subset.members,
            &subset.store,
            transform,
            missing,
        )?;
        self.cluster(matrix)
    }

    /// Cluster a distance matrix into a binary merge tree.
    ///
    /// Leaves are ordered by identifier. At each step the pair of active
    /// clusters with the smallest distance merges; among pairs at exactly the
    /// same distance the one with the smaller combined size wins, then the
    /// one holding the lexicographically smallest identifier, then the one
    /// whose other cluster holds the smaller identifier. Within a node the
    /// smaller subtree is the left child (ties: the one holding the smaller
    /// identifier).
    ///
    /// Merge heights are clamped to be at least the children's heights.
    ///
    /// # Errors
    /// [`DendroError::Data`] for an empty matrix or duplicate labels.
    pub fn cluster(&self, matrix: DistanceMatrix) -> Result<MergeTree> {
        let (labels, dist) = sorted_by_label(matrix)?;
        let n = labels.len();

        if n == 0 {
            return Err(DendroError::Data("cannot cluster zero individuals".into()));
        }
        if n == 1 {
            return Ok(MergeTree::new(labels, Vec::new()));
        }

        let mut ws = Workspace::new(n, dist);
        let mut nodes: Vec<MergeNode> = Vec::with_capacity(n - 1);

        for _ in 0..n - 1 {
            let Some((i, j)) = ws.closest_pair() else {
                break;
            };
            let d_ij = ws.d(i, j);
            let (keep, drop) = if i < j { (i, j) } else { (j, i) };

            let (left, right) = child_order(&ws, keep, drop);
            let height = d_ij
                .max(node_height(&nodes, ws.node[keep]))
                .max(node_height(&nodes, ws.node[drop]));
            let id = nodes.len();
            nodes.push(MergeNode {
                id,
                left: ws.node[left],
                right: ws.node[right],
                distance: height,
                size: ws.size[keep] + ws.size[drop],
                min_leaf: ws.min_rank[keep].min(ws.min_rank[drop]),
            });

            for k in 0..n {
                if k == keep || k == drop || !ws.active[k] {
                    continue;
                }
                let updated = self.linkage.update(
                    ws.d(k, keep),
                    ws.d(k, drop),
                    d_ij,
                    ws.size[keep],
                    ws.size[drop],
                    ws.size[k],
                );
                let idx = condensed_index(n, k, keep);
                ws.dist[idx] = updated;
            }

            ws.active[drop] = false;
            ws.size[keep] += ws.size[drop];
            ws.min_rank[keep] = ws.min_rank[keep].min(ws.min_rank[drop]);
            ws.node[keep] = NodeRef::Merge(id);

            ws.refresh(keep);
            for k in 0..n {
                if k == keep || !ws.active[k] {
                    continue;
                }
                if ws.nearest[k] == keep || ws.nearest[k] == drop {
                    ws.refresh(k);
                } else {
                    let c = ws.candidate(k, keep);
                    if c.cmp_key(&ws.best[k]) == Ordering::Less {
                        ws.nearest[k] = keep;
                        ws.best[k] = c;
                    }
                }
            }
        }

        let tree = MergeTree::new(labels, nodes);
        debug_assert!(tree.validate().is_ok());
        Ok(tree)
    }
}

fn node_height(nodes: &[MergeNode], node: NodeRef) -> Scalar {
    match node {
        NodeRef::Leaf(_) => 0.0,
        NodeRef::Merge(k) => nodes[k].distance,
    }
}

/// Slots `(left, right)`: smaller cluster first, then smaller minimum rank.
fn child_order(ws: &Workspace, a: usize, b: usize) -> (usize, usize) {
    let key = |s: usize| (ws.size[s], ws.min_rank[s]);
    if key(a) <= key(b) {
        (a, b)
    } else {
        (b, a)
    }
}

/// Reorder the matrix so labels are sorted; leaf rank then equals index.
fn sorted_by_label(matrix: DistanceMatrix) -> Result<(Vec<IndividualId>, Vec<Scalar>)> {
    let (labels, dist) = matrix.into_parts();
    let n = labels.len();

    if labels.windows(2).all(|w| w[0] < w[1]) {
        return Ok((labels, dist));
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| labels[a].cmp(&labels[b]));
    if let Some(w) = order.windows(2).find(|w| labels[w[0]] == labels[w[1]]) {
        return Err(DendroError::Data(format!(
            "duplicate individual '{}' in distance matrix",
            labels[w[0]]
        )));
    }

    let mut sorted = vec![0.0; dist.len()];
    for new_i in 0..n {
        for new_j in (new_i + 1)..n {
            sorted[condensed_index(n, new_i, new_j)] =
                dist[condensed_index(n, order[new_i], order[new_j])];
        }
    }
    let sorted_labels = order.iter().map(|&i| labels[i].clone()).collect();
    Ok((sorted_labels, sorted))
}
