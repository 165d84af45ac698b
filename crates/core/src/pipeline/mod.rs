//! Request-scoped entry point tying the components together.

mod config;
mod run;

pub use config::DendrogramConfig;
pub use run::{build_dendrograms, build_partitioner, build_store, DendrogramRequest, RunOutput};
