use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use serde::Serialize;

use crate::dendrogram::DendrogramLayout;
use crate::error::{DendroError, Result};
use crate::types::{IndividualId, NetworkId};

/// Number of offending individuals quoted in a coverage error.
const MAX_REPORTED: usize = 5;

/// Dendrogram of a single network.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetworkResult {
    pub network_id: NetworkId,
    pub layout: DendrogramLayout,
    pub leaf_count: usize,
}

impl NetworkResult {
    pub fn new(network_id: impl Into<NetworkId>, layout: DendrogramLayout) -> Self {
        let leaf_count = layout.n_leaves();
        Self {
            network_id: network_id.into(),
            layout,
            leaf_count,
        }
    }
}

/// A network whose clustering failed; other networks are unaffected.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetworkFailure {
    pub network_id: NetworkId,
    pub members: Vec<IndividualId>,
    pub reason: String,
}

/// All network results of a run, keyed by network ID in input order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct DendrogramSet {
    results: IndexMap<NetworkId, NetworkResult>,
}

impl DendrogramSet {
    pub fn get(&self, network_id: &str) -> Option<&NetworkResult> {
        self.results.get(network_id)
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &NetworkResult)> + '_ {
        self.results.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn network_ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.results.keys().map(|k| k.as_str())
    }

    /// Total number of leaves over all networks.
    pub fn n_individuals(&self) -> usize {
        self.results.values().map(|r| r.leaf_count).sum()
    }

    pub fn into_inner(self) -> IndexMap<NetworkId, NetworkResult> {
        self.results
    }
}

/// Collects per-network results and checks that they cover the input.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResultAssembler;

impl ResultAssembler {
    pub fn new() -> Self {
        Self
    }

    /// Key `results` by network ID after checking coverage.
    ///
    /// Every individual of `universe` must be a leaf of exactly one result
    /// or a member of exactly one failed network, and nothing outside
    /// `universe` may appear.
    ///
    /// # Errors
    /// [`DendroError::IncompleteCoverage`] naming the offending network or
    /// individuals.
    pub fn assemble<'a, I>(
        &self,
        universe: I,
        results: Vec<NetworkResult>,
        failures: &[NetworkFailure],
    ) -> Result<DendrogramSet>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut owner: HashMap<&str, &str> = HashMap::new();
        let mut network_seen: HashSet<&str> = HashSet::new();

        let groups = results
            .iter()
            .map(|r| (r.network_id.as_str(), r.layout.labels()))
            .chain(
                failures
                    .iter()
                    .map(|f| (f.network_id.as_str(), f.members.as_slice())),
            );

        for (network, members) in groups {
            if !network_seen.insert(network) {
                return Err(DendroError::IncompleteCoverage(format!(
                    "network '{}' is reported more than once",
                    network
                )));
            }
            for id in members {
                if let Some(previous) = owner.insert(id.as_str(), network) {
                    return Err(DendroError::IncompleteCoverage(format!(
                        "individual '{}' appears in networks '{}' and '{}'",
                        id, previous, network
                    )));
                }
            }
        }

        let universe: HashSet<&str> = universe.into_iter().collect();

        let mut uncovered: Vec<&str> = universe
            .iter()
            .copied()
            .filter(|id| !owner.contains_key(id))
            .collect();
        if !uncovered.is_empty() {
            uncovered.sort_unstable();
            return Err(DendroError::IncompleteCoverage(format!(
                "{} individual(s) not covered by any network: {}",
                uncovered.len(),
                quote_some(&uncovered)
            )));
        }

        let mut unknown: Vec<&str> = owner
            .keys()
            .copied()
            .filter(|id| !universe.contains(id))
            .collect();
        if !unknown.is_empty() {
            unknown.sort_unstable();
            return Err(DendroError::IncompleteCoverage(format!(
                "{} individual(s) in results but not in the input: {}",
                unknown.len(),
                quote_some(&unknown)
            )));
        }

        let results = results
            .into_iter()
            .map(|r| (r.network_id.clone(), r))
            .collect();
        Ok(DendrogramSet { results })
    }
}

fn quote_some(ids: &[&str]) -> String {
    let mut text = ids
        .iter()
        .take(MAX_REPORTED)
        .map(|id| format!("'{}'", id))
        .collect::<Vec<_>>()
        .join(", ");
    if ids.len() > MAX_REPORTED {
        text.push_str(", ...");
    }
    text
}
