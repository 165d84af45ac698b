mod engine;
mod linkage;
mod tree;

pub use engine::ClusterEngine;
pub use linkage::Linkage;
pub use tree::{MergeNode, MergeTree, NodeRef};
