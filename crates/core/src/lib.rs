pub mod assemble;
pub mod cluster;
pub mod data;
pub mod dendrogram;
pub mod distance;
pub mod error;
pub mod network;
pub mod pairwise;
pub mod pipeline;
pub mod types;

pub use assemble::{DendrogramSet, NetworkFailure, NetworkResult, ResultAssembler};
pub use cluster::{ClusterEngine, Linkage, MergeTree};
pub use dendrogram::{DendrogramBuilder, DendrogramLayout, LinkageRow};
pub use distance::{DistanceMatrix, DistanceTransform, MissingDistance};
pub use error::{DendroError, Result};
pub use network::{Anomaly, NetworkPartitioner};
pub use pairwise::{DuplicatePolicy, PairwiseEdge, PairwiseStore};
pub use pipeline::{build_dendrograms, DendrogramConfig, DendrogramRequest, RunOutput};
