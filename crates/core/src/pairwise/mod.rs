mod edge;
mod store;

pub use edge::{PairwiseEdge, SegmentStats};
pub use store::{DuplicatePolicy, InsertOutcome, Neighbors, PairwiseStore};
