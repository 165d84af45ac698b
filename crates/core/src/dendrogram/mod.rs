mod cut;
mod layout;
mod newick;

pub use layout::{DendrogramBuilder, DendrogramLayout, LinkageRow};
