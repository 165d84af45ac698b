use std::fmt;
use std::str::FromStr;

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

use crate::error::{DendroError, Result};
use crate::types::{IndividualId, Scalar};

use super::edge::{PairwiseEdge, SegmentStats};

/// How a repeated observation of the same unordered pair is reconciled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Fail with [`DendroError::DuplicateConflict`] when two values disagree.
    #[default]
    Reject,
    /// Keep the most recently inserted value.
    LastWins,
    /// Keep the larger sharing value.
    Max,
}

impl FromStr for DuplicatePolicy {
    type Err = DendroError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "reject" => Ok(Self::Reject),
            "last" | "last-wins" | "lastwins" => Ok(Self::LastWins),
            "max" => Ok(Self::Max),
            other => Err(DendroError::Config(format!(
                "Unknown duplicate policy '{}'. Use 'reject', 'last' or 'max'.",
                other
            ))),
        }
    }
}

impl fmt::Display for DuplicatePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Reject => "reject",
            Self::LastWins => "last",
            Self::Max => "max",
        };
        f.write_str(name)
    }
}

/// What happened to an edge passed to [`PairwiseStore::insert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// First observation of the pair.
    Inserted,
    /// The pair was already present and its value was replaced.
    Replaced,
    /// The pair was already present and the stored value was kept.
    Kept,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct EdgeEntry {
    sharing: Scalar,
    segments: Option<SegmentStats>,
}

/// Indexed store of sharing values between unordered pairs of individuals.
///
/// Individuals are interned to dense indices in first-seen order. Each
/// unordered pair is stored once under its canonical `(low, high)` index
/// key, so lookups are symmetric. Pairs that were never observed have no
/// entry; [`PairwiseStore::get`] reports them as `None`.
#[derive(Debug, Clone, Default)]
pub struct PairwiseStore {
    individuals: IndexSet<IndividualId>,
    edges: IndexMap<(usize, usize), EdgeEntry>,
    adjacency: Vec<Vec<usize>>,
    policy: DuplicatePolicy,
}

impl PairwiseStore {
    /// Create an empty store that reconciles duplicates with `policy`.
    pub fn new(policy: DuplicatePolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    /// Build a store from a sequence of edges.
    ///
    /// # Errors
    /// Propagates the first error returned by [`PairwiseStore::insert`].
    pub fn from_edges<I>(edges: I, policy: DuplicatePolicy) -> Result<Self>
    where
        I: IntoIterator<Item = PairwiseEdge>,
    {
        let mut store = Self::new(policy);
        for edge in edges {
            store.insert(edge)?;
        }
        Ok(store)
    }

    /// The reconciliation policy in effect.
    pub fn policy(&self) -> DuplicatePolicy {
        self.policy
    }

    /// Number of distinct individuals seen in any edge.
    pub fn n_individuals(&self) -> usize {
        self.individuals.len()
    }

    /// Number of distinct unordered pairs stored.
    pub fn n_edges(&self) -> usize {
        self.edges.len()
    }

    /// Whether `id` appears in at least one stored edge.
    pub fn contains(&self, id: &str) -> bool {
        self.individuals.contains(id)
    }

    /// Individuals in first-seen order.
    pub fn individuals(&self) -> impl Iterator<Item = &str> + '_ {
        self.individuals.iter().map(|s| s.as_str())
    }

    /// Add an edge or reconcile it with an existing observation of the
    /// same unordered pair.
    ///
    /// # Errors
    /// - [`DendroError::InvalidEdge`] if the edge fails validation.
    /// - [`DendroError::DuplicateConflict`] if the pair already holds a
    ///   different value and the policy is [`DuplicatePolicy::Reject`].
    pub fn insert(&mut self, edge: PairwiseEdge) -> Result<InsertOutcome> {
        edge.validate()?;

        let ia = self.intern(&edge.a);
        let ib = self.intern(&edge.b);
        let key = canonical(ia, ib);
        let incoming = EdgeEntry {
            sharing: edge.sharing,
            segments: edge.segments,
        };

        let Some(existing) = self.edges.get_mut(&key) else {
            self.edges.insert(key, incoming);
            self.adjacency[ia].push(ib);
            self.adjacency[ib].push(ia);
            return Ok(InsertOutcome::Inserted);
        };

        match self.policy {
            DuplicatePolicy::Reject => {
                if existing.sharing == incoming.sharing {
                    if existing.segments.is_none() {
                        existing.segments = incoming.segments;
                    }
                    Ok(InsertOutcome::Kept)
                } else {
                    Err(DendroError::DuplicateConflict {
                        a: edge.a,
                        b: edge.b,
                        existing: existing.sharing,
                        incoming: incoming.sharing,
                    })
                }
            }
            DuplicatePolicy::LastWins => {
                *existing = incoming;
                Ok(InsertOutcome::Replaced)
            }
            DuplicatePolicy::Max => {
                if incoming.sharing > existing.sharing {
                    *existing = incoming;
                    Ok(InsertOutcome::Replaced)
                } else {
                    Ok(InsertOutcome::Kept)
                }
            }
        }
    }

    /// Sharing value between `a` and `b`, or `None` if the pair was never
    /// observed directly.
    pub fn get(&self, a: &str, b: &str) -> Option<Scalar> {
        self.entry(a, b).map(|e| e.sharing)
    }

    /// Segment metadata recorded for the pair, if any.
    pub fn segments(&self, a: &str, b: &str) -> Option<SegmentStats> {
        self.entry(a, b).and_then(|e| e.segments)
    }

    fn entry(&self, a: &str, b: &str) -> Option<&EdgeEntry> {
        let ia = self.individuals.get_index_of(a)?;
        let ib = self.individuals.get_index_of(b)?;
        if ia == ib {
            return None;
        }
        self.edges.get(&canonical(ia, ib))
    }

    /// Lazily iterate over `(other, sharing)` for every edge touching
    /// `individual`, in insertion order.
    ///
    /// The iterator is finite and can be cloned to restart it. An unknown
    /// individual yields nothing.
    pub fn neighbors<'a>(&'a self, individual: &str) -> Neighbors<'a> {
        let (origin, adjacent) = match self.individuals.get_index_of(individual) {
            Some(i) => (i, self.adjacency[i].iter()),
            None => (0, [].iter()),
        };
        Neighbors {
            store: self,
            origin,
            adjacent,
        }
    }

    /// Iterate over all stored edges as `(a, b, sharing)` in insertion
    /// order. Endpoints are reported in first-seen order.
    pub fn edges(&self) -> impl Iterator<Item = (&str, &str, Scalar)> + '_ {
        self.edges.iter().map(move |(&(i, j), e)| {
            (
                self.individuals[i].as_str(),
                self.individuals[j].as_str(),
                e.sharing,
            )
        })
    }

    /// Iterate over all stored edges as full [`PairwiseEdge`] values.
    pub fn to_edges(&self) -> impl Iterator<Item = PairwiseEdge> + '_ {
        self.edges.iter().map(move |(&(i, j), e)| PairwiseEdge {
            a: self.individuals[i].clone(),
            b: self.individuals[j].clone(),
            sharing: e.sharing,
            segments: e.segments,
        })
    }

    /// The induced sub-store: every edge whose both endpoints satisfy
    /// `keep`. Reconciliation already happened, so the policy is copied
    /// without re-checking.
    pub fn subset<F>(&self, mut keep: F) -> PairwiseStore
    where
        F: FnMut(&str) -> bool,
    {
        let kept: Vec<bool> = self.individuals.iter().map(|id| keep(id.as_str())).collect();
        let mut sub = PairwiseStore::new(self.policy);
        for (&(i, j), entry) in &self.edges {
            if kept[i] && kept[j] {
                sub.push_reconciled(&self.individuals[i], &self.individuals[j], *entry);
            }
        }
        sub
    }

    /// Insert an edge that is already known to be unique and valid.
    pub(crate) fn push_edge(&mut self, edge: &PairwiseEdge) {
        let entry = EdgeEntry {
            sharing: edge.sharing,
            segments: edge.segments,
        };
        self.push_reconciled(&edge.a, &edge.b, entry);
    }

    fn push_reconciled(&mut self, a: &str, b: &str, entry: EdgeEntry) {
        let ia = self.intern(a);
        let ib = self.intern(b);
        if self.edges.insert(canonical(ia, ib), entry).is_none() {
            self.adjacency[ia].push(ib);
            self.adjacency[ib].push(ia);
        }
    }

    fn intern(&mut self, id: &str) -> usize {
        if let Some(i) = self.individuals.get_index_of(id) {
            return i;
        }
        let (i, _) = self.individuals.insert_full(id.to_string());
        self.adjacency.push(Vec::new());
        i
    }
}

/// Restartable iterator returned by [`PairwiseStore::neighbors`].
#[derive(Clone)]
pub struct Neighbors<'a> {
    store: &'a PairwiseStore,
    origin: usize,
    adjacent: std::slice::Iter<'a, usize>,
}

impl<'a> Iterator for Neighbors<'a> {
    type Item = (&'a str, Scalar);

    fn next(&mut self) -> Option<Self::Item> {
        let &other = self.adjacent.next()?;
        let sharing = self.store.edges[&canonical(self.origin, other)].sharing;
        Some((self.store.individuals[other].as_str(), sharing))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.adjacent.size_hint()
    }
}

impl ExactSizeIterator for Neighbors<'_> {}

#[inline]
fn canonical(i: usize, j: usize) -> (usize, usize) {
    if i < j {
        (i, j)
    } else {
        (j, i)
    }
}
