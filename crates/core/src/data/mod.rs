//! Reading upstream tables and writing dendrogram outputs.

pub mod export;
pub mod io;
pub mod rows;

pub use export::{write_json, write_leaf_order, write_linkage_tsv, write_network_files};
pub use io::{
    read_networks, read_networks_from, read_pairwise, read_pairwise_from, NetworkSchema,
    PairwiseSchema,
};
pub use rows::{NetworkRow, PairwiseRow, SharingMetric, DEFAULT_GENOME_LENGTH_CM};
