use rayon::prelude::*;
use serde::Serialize;

use crate::assemble::{DendrogramSet, NetworkFailure, NetworkResult, ResultAssembler};
use crate::cluster::ClusterEngine;
use crate::data::{NetworkRow, PairwiseRow};
use crate::dendrogram::DendrogramBuilder;
use crate::error::{DendroError, Result};
use crate::network::{Anomaly, NetworkPartitioner, NetworkSubset};
use crate::pairwise::{DuplicatePolicy, InsertOutcome, PairwiseStore};

use super::config::DendrogramConfig;

/// Minimum number of networks before clustering is spread over threads.
const PARALLEL_THRESHOLD: usize = 4;

/// Leaves listed per network in [`RunOutput::summary`].
const SUMMARY_LEAVES: usize = 10;

/// Everything a single run needs. Nothing is shared between runs.
#[derive(Debug, Clone, Default)]
pub struct DendrogramRequest {
    pub pairwise: Vec<PairwiseRow>,
    pub networks: Vec<NetworkRow>,
    pub config: DendrogramConfig,
}

impl DendrogramRequest {
    pub fn new(pairwise: Vec<PairwiseRow>, networks: Vec<NetworkRow>) -> Self {
        Self {
            pairwise,
            networks,
            config: DendrogramConfig::default(),
        }
    }

    pub fn config(mut self, config: DendrogramConfig) -> Self {
        self.config = config;
        self
    }
}

/// Result of [`build_dendrograms`].
#[derive(Debug, Clone, Serialize)]
pub struct RunOutput {
    /// Dendrograms keyed by network ID, in network-table order.
    pub set: DendrogramSet,
    /// Edges excluded from clustering.
    pub anomalies: Vec<Anomaly>,
    /// Networks that could not be clustered.
    pub failures: Vec<NetworkFailure>,
}

impl RunOutput {
    /// Whether every network produced a dendrogram.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Human-readable report of the run.
    pub fn summary(&self) -> String {
        let mut s = String::new();

        s.push_str("=== IBD Dendrograms ===\n\n");
        s.push_str(&format!(
            "Networks: {}   Individuals: {}   Failed networks: {}   Anomalies: {}\n",
            self.set.len(),
            self.set.n_individuals(),
            self.failures.len(),
            self.anomalies.len()
        ));

        for (network_id, result) in self.set.iter() {
            let layout = &result.layout;
            s.push_str(&format!(
                "\n--- Network {} ({} leaves, height {:.6}) ---\n",
                network_id,
                result.leaf_count,
                layout.height()
            ));
            let labels = layout.ordered_labels();
            let show = labels.len().min(SUMMARY_LEAVES);
            s.push_str(&format!("  Leaves: {}", labels[..show].join(" ")));
            if labels.len() > SUMMARY_LEAVES {
                s.push_str(&format!(" ... and {} more", labels.len() - SUMMARY_LEAVES));
            }
            s.push('\n');
            for row in layout.linkage().iter().take(SUMMARY_LEAVES) {
                s.push_str(&format!(
                    "  {:>5} {:>5}  {:.6}  {}\n",
                    row.left, row.right, row.distance, row.size
                ));
            }
            if layout.linkage().len() > SUMMARY_LEAVES {
                s.push_str(&format!(
                    "  ... and {} more merges\n",
                    layout.linkage().len() - SUMMARY_LEAVES
                ));
            }
        }

        if !self.failures.is_empty() {
            s.push_str("\n--- Failed Networks ---\n");
            for failure in &self.failures {
                s.push_str(&format!(
                    "  {} ({} members): {}\n",
                    failure.network_id,
                    failure.members.len(),
                    failure.reason
                ));
            }
        }

        if !self.anomalies.is_empty() {
            s.push_str("\n--- Anomalies ---\n");
            for anomaly in self.anomalies.iter().take(SUMMARY_LEAVES) {
                s.push_str(&format!("  {}\n", anomaly));
            }
            if self.anomalies.len() > SUMMARY_LEAVES {
                s.push_str(&format!(
                    "  ... and {} more\n",
                    self.anomalies.len() - SUMMARY_LEAVES
                ));
            }
        }

        s
    }
}

/// Load pairwise rows into a store, reconciling duplicates with `policy`.
///
/// # Errors
/// Invalid edges, or a [`DendroError::DuplicateConflict`] under
/// [`DuplicatePolicy::Reject`].
pub fn build_store(rows: &[PairwiseRow], policy: DuplicatePolicy) -> Result<PairwiseStore> {
    let mut store = PairwiseStore::new(policy);
    let mut reconciled = 0usize;
    for row in rows {
        if store.insert(row.to_edge())? != InsertOutcome::Inserted {
            reconciled += 1;
        }
    }
    if reconciled > 0 {
        log::debug!(
            "{} duplicate pair(s) reconciled with policy '{}'",
            reconciled,
            policy
        );
    }
    Ok(store)
}

/// Build the network partitioner from membership rows.
///
/// # Errors
/// [`DendroError::NetworkConflict`] if an individual is assigned to two
/// networks.
pub fn build_partitioner(rows: &[NetworkRow]) -> Result<NetworkPartitioner> {
    NetworkPartitioner::from_assignments(
        rows.iter()
            .map(|row| (row.individual.as_str(), row.network_id.as_str())),
    )
}

enum Outcome {
    Built(NetworkResult),
    Failed(NetworkFailure),
}

fn process_network(
    engine: &ClusterEngine,
    config: &DendrogramConfig,
    subset: &NetworkSubset,
) -> Result<Outcome> {
    match engine.cluster_network(subset, &config.transform, &config.missing) {
        Ok(tree) => {
            let layout = DendrogramBuilder::new().build(&tree);
            log::debug!(
                "network '{}': {} leaves, height {}",
                subset.network_id,
                layout.n_leaves(),
                layout.height()
            );
            Ok(Outcome::Built(NetworkResult::new(
                subset.network_id.clone(),
                layout,
            )))
        }
        Err(DendroError::InsufficientData { network, reason }) => {
            log::warn!("network '{}' skipped: {}", network, reason);
            Ok(Outcome::Failed(NetworkFailure {
                network_id: network,
                members: subset.members.clone(),
                reason,
            }))
        }
        Err(e) => Err(e),
    }
}

/// Build one dendrogram per network.
///
/// Pairwise rows are reconciled into a store, split by network, and every
/// network is clustered independently. Edges between networks are reported
/// in [`RunOutput::anomalies`]; a network that cannot be clustered is
/// reported in [`RunOutput::failures`] without affecting the others.
///
/// # Errors
/// Invalid configuration, invalid or conflicting pairwise rows, conflicting
/// network assignments, and [`DendroError::IncompleteCoverage`] when an
/// individual of the input is not covered by exactly one network.
///
/// # Examples
/// ```
/// use ibd_dendrogram_core::data::{NetworkRow, PairwiseRow};
/// use ibd_dendrogram_core::pipeline::{build_dendrograms, DendrogramRequest};
///
/// let request = DendrogramRequest::new(
///     vec![PairwiseRow::new("A", "B", 0.5), PairwiseRow::new("B", "C", 0.3)],
///     vec![
///         NetworkRow::new("A", "1"),
///         NetworkRow::new("B", "1"),
///         NetworkRow::new("C", "1"),
///     ],
/// );
/// let output = build_dendrograms(&request).unwrap();
/// assert_eq!(output.set.get("1").unwrap().leaf_count, 3);
/// ```
pub fn build_dendrograms(request: &DendrogramRequest) -> Result<RunOutput> {
    let config = &request.config;
    config.validate()?;

    let store = build_store(&request.pairwise, config.duplicate_policy)?;
    let partitioner = build_partitioner(&request.networks)?;

    log::info!(
        "clustering {} individuals in {} networks ({} pairs, {} linkage, {} transform)",
        partitioner.n_individuals(),
        partitioner.n_networks(),
        store.n_edges(),
        config.linkage,
        config.transform.name()
    );

    let partition = partitioner.partition(&store);
    let engine = ClusterEngine::new(config.linkage);
    let subsets: Vec<&NetworkSubset> = partition.networks.values().collect();

    let outcomes: Vec<Result<Outcome>> = if config.parallel && subsets.len() >= PARALLEL_THRESHOLD {
        subsets
            .par_iter()
            .map(|subset| process_network(&engine, config, subset))
            .collect()
    } else {
        subsets
            .iter()
            .map(|subset| process_network(&engine, config, subset))
            .collect()
    };

    let mut results = Vec::with_capacity(outcomes.len());
    let mut failures = Vec::new();
    for outcome in outcomes {
        match outcome? {
            Outcome::Built(result) => results.push(result),
            Outcome::Failed(failure) => failures.push(failure),
        }
    }

    let universe = partitioner
        .individuals()
        .chain(store.individuals().filter(|id| partitioner.network_of(id).is_none()));
    let set = ResultAssembler::new().assemble(universe, results, &failures)?;

    log::info!(
        "built {} dendrograms ({} failed, {} anomalies)",
        set.len(),
        failures.len(),
        partition.anomalies.len()
    );

    Ok(RunOutput {
        set,
        anomalies: partition.anomalies,
        failures,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::Linkage;
    use crate::distance::DistanceTransform;

    fn rows(edges: &[(&str, &str, f64)]) -> Vec<PairwiseRow> {
        edges
            .iter()
            .map(|&(a, b, s)| PairwiseRow::new(a, b, s))
            .collect()
    }

    fn members(assignments: &[(&str, &str)]) -> Vec<NetworkRow> {
        assignments
            .iter()
            .map(|&(i, n)| NetworkRow::new(i, n))
            .collect()
    }

    #[test]
    fn test_build_store_policy() {
        let pairs = rows(&[("A", "B", 0.4), ("B", "A", 0.6)]);
        let store = build_store(&pairs, DuplicatePolicy::Max).unwrap();
        assert_eq!(store.get("A", "B"), Some(0.6));
        assert!(build_store(&pairs, DuplicatePolicy::Reject).is_err());
    }

    #[test]
    fn test_single_network_run() {
        let request = DendrogramRequest::new(
            rows(&[("A", "B", 0.5), ("B", "C", 0.3), ("A", "C", 0.1)]),
            members(&[("A", "1"), ("B", "1"), ("C", "1")]),
        )
        .config(DendrogramConfig::new().linkage(Linkage::Single));

        let output = build_dendrograms(&request).unwrap();
        assert!(output.is_complete());
        assert!(output.anomalies.is_empty());
        let layout = &output.set.get("1").unwrap().layout;
        assert_eq!(layout.linkage().len(), 2);
        assert_eq!((layout.linkage()[0].left, layout.linkage()[0].right), (0, 1));
    }

    #[test]
    fn test_individual_only_in_pairs_is_uncovered() {
        let request = DendrogramRequest::new(
            rows(&[("A", "B", 0.5), ("B", "Z", 0.3)]),
            members(&[("A", "1"), ("B", "1")]),
        );
        let err = build_dendrograms(&request).unwrap_err();
        assert!(matches!(err, DendroError::IncompleteCoverage(msg) if msg.contains("'Z'")));
    }

    #[test]
    fn test_invalid_config_aborts() {
        let request = DendrogramRequest::new(rows(&[]), members(&[("A", "1")])).config(
            DendrogramConfig::new().transform(DistanceTransform::Reciprocal { floor: 1.5 }),
        );
        assert!(matches!(
            build_dendrograms(&request),
            Err(DendroError::Config(_))
        ));
    }

    #[test]
    fn test_summary_mentions_networks() {
        let request = DendrogramRequest::new(
            rows(&[("A", "B", 0.5)]),
            members(&[("A", "1"), ("B", "1"), ("C", "2")]),
        );
        let output = build_dendrograms(&request).unwrap();
        let text = output.summary();
        assert!(text.contains("Networks: 2"));
        assert!(text.contains("--- Network 1 (2 leaves"));
        assert!(text.contains("--- Network 2 (1 leaves"));
    }
}
