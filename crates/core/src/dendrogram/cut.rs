use crate::types::Scalar;

use super::layout::DendrogramLayout;

/// Union-find over linkage indices (leaves and rows).
struct Forest {
    parent: Vec<usize>,
}

impl Forest {
    fn new(size: usize) -> Self {
        Self {
            parent: (0..size).collect(),
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn join(&mut self, a: usize, b: usize, into: usize) {
        let ra = self.find(a);
        let rb = self.find(b);
        self.parent[ra] = into;
        self.parent[rb] = into;
    }
}

impl DendrogramLayout {
    /// Flat clusters obtained by cutting the tree at `height`: two leaves
    /// share a cluster when they are joined by merges no higher than
    /// `height`.
    ///
    /// Returns one cluster number per leaf (indexed like
    /// [`labels`](DendrogramLayout::labels)). Clusters are numbered from 0 in
    /// the order they first appear in the plotting order.
    pub fn cut(&self, height: Scalar) -> Vec<usize> {
        let n = self.n_leaves();
        let mut forest = Forest::new(n + self.linkage.len());

        for (row, entry) in self.linkage.iter().enumerate() {
            if entry.distance <= height {
                forest.join(entry.left, entry.right, n + row);
            }
        }

        let mut cluster_of_root = std::collections::HashMap::new();
        let mut assignment = vec![0usize; n];
        for &leaf in &self.leaf_order {
            let root = forest.find(leaf);
            let next = cluster_of_root.len();
            assignment[leaf] = *cluster_of_root.entry(root).or_insert(next);
        }
        assignment
    }

    /// Number of flat clusters at `height`.
    pub fn n_clusters_at(&self, height: Scalar) -> usize {
        let below = self
            .linkage
            .iter()
            .filter(|row| row.distance <= height)
            .count();
        self.n_leaves() - below
    }

    /// Cophenetic distance: the height of the merge that first joins
    /// leaves `a` and `b`. `None` if either index is not a leaf.
    pub fn cophenetic(&self, a: usize, b: usize) -> Option<Scalar> {
        let n = self.n_leaves();
        if a >= n || b >= n {
            return None;
        }
        if a == b {
            return Some(0.0);
        }

        let mut forest = Forest::new(n + self.linkage.len());
        for (row, entry) in self.linkage.iter().enumerate() {
            forest.join(entry.left, entry.right, n + row);
            if forest.find(a) == forest.find(b) {
                return Some(entry.distance);
            }
        }
        None
    }
}
