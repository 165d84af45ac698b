use std::collections::HashMap;
use std::fmt;

use indexmap::IndexMap;
use serde::Serialize;

use crate::error::{DendroError, Result};
use crate::pairwise::PairwiseStore;
use crate::types::{IndividualId, NetworkId, Scalar};

/// A non-fatal inconsistency found while splitting edges by network.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Anomaly {
    /// The endpoints of an edge were assigned to different networks.
    CrossNetworkEdge {
        a: IndividualId,
        b: IndividualId,
        network_a: NetworkId,
        network_b: NetworkId,
        sharing: Scalar,
    },
    /// An endpoint of an edge has no network assignment at all.
    UnassignedEndpoint {
        a: IndividualId,
        b: IndividualId,
        missing: IndividualId,
    },
}

impl fmt::Display for Anomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Anomaly::CrossNetworkEdge {
                a,
                b,
                network_a,
                network_b,
                sharing,
            } => write!(
                f,
                "cross-network edge {}-{} (sharing {}) spans networks '{}' and '{}'",
                a, b, sharing, network_a, network_b
            ),
            Anomaly::UnassignedEndpoint { a, b, missing } => write!(
                f,
                "edge {}-{} dropped: '{}' has no network assignment",
                a, b, missing
            ),
        }
    }
}

/// The individuals of one network together with the edges induced on them.
#[derive(Debug, Clone)]
pub struct NetworkSubset {
    pub network_id: NetworkId,
    /// Members sorted by identifier.
    pub members: Vec<IndividualId>,
    /// Edges whose both endpoints are members.
    pub store: PairwiseStore,
}

impl NetworkSubset {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Output of [`NetworkPartitioner::partition`].
#[derive(Debug, Clone, Default)]
pub struct Partition {
    /// Per-network subsets in network-table order.
    pub networks: IndexMap<NetworkId, NetworkSubset>,
    /// Edges that were dropped instead of being clustered.
    pub anomalies: Vec<Anomaly>,
}

/// Groups individuals into the disjoint networks assigned upstream.
///
/// Networks are kept in order of first appearance. Each individual maps to
/// exactly one network; repeating an assignment is harmless, reassigning an
/// individual to a different network is an error.
#[derive(Debug, Clone, Default)]
pub struct NetworkPartitioner {
    networks: IndexMap<NetworkId, Vec<IndividualId>>,
    network_of: HashMap<IndividualId, usize>,
}

impl NetworkPartitioner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(individual, network)` pairs.
    ///
    /// # Errors
    /// Propagates the first error from [`NetworkPartitioner::assign`].
    pub fn from_assignments<I, S, T>(rows: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, T)>,
        S: AsRef<str>,
        T: AsRef<str>,
    {
        let mut partitioner = Self::new();
        for (individual, network) in rows {
            partitioner.assign(individual.as_ref(), network.as_ref())?;
        }
        Ok(partitioner)
    }

    /// Record that `individual` belongs to `network`.
    ///
    /// # Errors
    /// - [`DendroError::Data`] if either identifier is empty.
    /// - [`DendroError::NetworkConflict`] if the individual was already
    ///   assigned to a different network.
    pub fn assign(&mut self, individual: &str, network: &str) -> Result<()> {
        if individual.is_empty() || network.is_empty() {
            return Err(DendroError::Data(format!(
                "Empty identifier in network assignment ('{}', '{}')",
                individual, network
            )));
        }

        if let Some(&existing) = self.network_of.get(individual) {
            let existing_id = self.network_name(existing);
            if existing_id == network {
                return Ok(());
            }
            return Err(DendroError::NetworkConflict {
                individual: individual.to_string(),
                first: existing_id.to_string(),
                second: network.to_string(),
            });
        }

        let entry = self.networks.entry(network.to_string());
        let index = entry.index();
        entry.or_default().push(individual.to_string());
        self.network_of.insert(individual.to_string(), index);
        Ok(())
    }

    pub fn n_networks(&self) -> usize {
        self.networks.len()
    }

    pub fn n_individuals(&self) -> usize {
        self.network_of.len()
    }

    /// Network assigned to `individual`, if any.
    pub fn network_of(&self, individual: &str) -> Option<&str> {
        let &index = self.network_of.get(individual)?;
        self.networks.get_index(index).map(|(id, _)| id.as_str())
    }

    /// Network identifiers in first-appearance order.
    pub fn network_ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.networks.keys().map(|k| k.as_str())
    }

    /// Every assigned individual, grouped by network in table order.
    pub fn individuals(&self) -> impl Iterator<Item = &str> + '_ {
        self.networks
            .values()
            .flat_map(|members| members.iter().map(|m| m.as_str()))
    }

    /// The subset of a single network, or `None` if `network` is unknown.
    ///
    /// Same members and edges as the corresponding entry of
    /// [`NetworkPartitioner::partition`], without splitting the rest of the
    /// store.
    pub fn subset_for(&self, network: &str, store: &PairwiseStore) -> Option<NetworkSubset> {
        let index = self.networks.get_index_of(network)?;
        let mut members = self.networks[index].clone();
        members.sort();
        let sub = store.subset(|id| self.network_of.get(id) == Some(&index));
        Some(NetworkSubset {
            network_id: network.to_string(),
            members,
            store: sub,
        })
    }

    /// Split `store` into per-network sub-stores.
    ///
    /// Edges spanning two networks, or touching an individual with no
    /// assignment, are dropped and reported as [`Anomaly`] values rather
    /// than merged into either network.
    pub fn partition(&self, store: &PairwiseStore) -> Partition {
        let mut stores: Vec<PairwiseStore> = (0..self.networks.len())
            .map(|_| PairwiseStore::new(store.policy()))
            .collect();
        let mut anomalies = Vec::new();

        for edge in store.to_edges() {
            let na = self.network_of.get(&edge.a).copied();
            let nb = self.network_of.get(&edge.b).copied();
            match (na, nb) {
                (Some(i), Some(j)) if i == j => stores[i].push_edge(&edge),
                (Some(i), Some(j)) => anomalies.push(Anomaly::CrossNetworkEdge {
                    network_a: self.network_name(i).to_string(),
                    network_b: self.network_name(j).to_string(),
                    sharing: edge.sharing,
                    a: edge.a,
                    b: edge.b,
                }),
                (None, _) => anomalies.push(Anomaly::UnassignedEndpoint {
                    missing: edge.a.clone(),
                    a: edge.a,
                    b: edge.b,
                }),
                (Some(_), None) => anomalies.push(Anomaly::UnassignedEndpoint {
                    missing: edge.b.clone(),
                    a: edge.a,
                    b: edge.b,
                }),
            }
        }

        if !anomalies.is_empty() {
            log::warn!(
                "{} edge(s) excluded from clustering by network partitioning",
                anomalies.len()
            );
        }

        let networks = self
            .networks
            .iter()
            .zip(stores)
            .map(|((network_id, members), sub)| {
                let mut members = members.clone();
                members.sort();
                log::debug!(
                    "network '{}': {} members, {} edges",
                    network_id,
                    members.len(),
                    sub.n_edges()
                );
                (
                    network_id.clone(),
                    NetworkSubset {
                        network_id: network_id.clone(),
                        members,
                        store: sub,
                    },
                )
            })
            .collect();

        Partition {
            networks,
            anomalies,
        }
    }

    fn network_name(&self, index: usize) -> &str {
        self.networks
            .get_index(index)
            .map(|(id, _)| id.as_str())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pairwise::{DuplicatePolicy, PairwiseEdge};

    fn store(edges: &[(&str, &str, f64)]) -> PairwiseStore {
        PairwiseStore::from_edges(
            edges.iter().map(|&(a, b, s)| PairwiseEdge::new(a, b, s)),
            DuplicatePolicy::Reject,
        )
        .unwrap()
    }

    #[test]
    fn test_partition_by_network() {
        let partitioner = NetworkPartitioner::from_assignments(vec![
            ("B", "1"),
            ("A", "1"),
            ("C", "2"),
            ("D", "2"),
            ("E", "3"),
        ])
        .unwrap();
        let s = store(&[("A", "B", 0.5), ("C", "D", 0.2)]);

        let partition = partitioner.partition(&s);
        assert_eq!(partition.networks.len(), 3);
        assert!(partition.anomalies.is_empty());

        let ids: Vec<&str> = partition.networks.keys().map(|k| k.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);

        let n1 = &partition.networks["1"];
        assert_eq!(n1.members, vec!["A".to_string(), "B".to_string()]);
        assert_eq!(n1.store.get("A", "B"), Some(0.5));

        let n3 = &partition.networks["3"];
        assert_eq!(n3.len(), 1);
        assert_eq!(n3.store.n_edges(), 0);
    }

    #[test]
    fn test_subset_for_single_network() {
        let partitioner = NetworkPartitioner::from_assignments(vec![
            ("B", "1"),
            ("A", "1"),
            ("C", "2"),
        ])
        .unwrap();
        let s = store(&[("A", "B", 0.5), ("A", "C", 0.1), ("D", "A", 0.3)]);

        let n1 = partitioner.subset_for("1", &s).unwrap();
        assert_eq!(n1.members, vec!["A".to_string(), "B".to_string()]);
        assert_eq!(n1.store.n_edges(), 1);
        assert_eq!(n1.store.get("A", "B"), Some(0.5));

        let whole = partitioner.partition(&s);
        assert_eq!(whole.networks["1"].members, n1.members);
        assert_eq!(
            whole.networks["1"].store.to_edges().collect::<Vec<_>>(),
            n1.store.to_edges().collect::<Vec<_>>()
        );

        assert!(partitioner.subset_for("9", &s).is_none());
    }

    #[test]
    fn test_cross_network_edge_reported() {
        let partitioner =
            NetworkPartitioner::from_assignments(vec![("A", "1"), ("B", "1"), ("C", "2")])
                .unwrap();
        let s = store(&[("A", "B", 0.5), ("B", "C", 0.3)]);

        let partition = partitioner.partition(&s);
        assert_eq!(partition.anomalies.len(), 1);
        assert!(matches!(
            &partition.anomalies[0],
            Anomaly::CrossNetworkEdge { network_a, network_b, .. }
                if network_a == "1" && network_b == "2"
        ));
        assert_eq!(partition.networks["1"].store.n_edges(), 1);
        assert_eq!(partition.networks["2"].store.n_edges(), 0);
    }

    #[test]
    fn test_unassigned_endpoint_reported() {
        let partitioner = NetworkPartitioner::from_assignments(vec![("A", "1")]).unwrap();
        let s = store(&[("A", "Z", 0.5)]);

        let partition = partitioner.partition(&s);
        assert_eq!(
            partition.anomalies,
            vec![Anomaly::UnassignedEndpoint {
                a: "A".into(),
                b: "Z".into(),
                missing: "Z".into(),
            }]
        );
    }

    #[test]
    fn test_conflicting_assignment() {
        let mut partitioner = NetworkPartitioner::new();
        partitioner.assign("A", "1").unwrap();
        partitioner.assign("A", "1").unwrap();
        assert_eq!(partitioner.n_individuals(), 1);

        let err = partitioner.assign("A", "2").unwrap_err();
        assert!(matches!(err, DendroError::NetworkConflict { .. }));
        assert_eq!(partitioner.network_of("A"), Some("1"));
    }
}
