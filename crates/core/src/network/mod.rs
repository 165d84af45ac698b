mod partition;

pub use partition::{Anomaly, NetworkPartitioner, NetworkSubset, Partition};
