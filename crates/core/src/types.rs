/// The scalar type used for sharing values and distances.
pub type Scalar = f64;

/// Identifier of an individual (a dendrogram leaf).
///
/// Integer identifiers from upstream files are carried as their decimal
/// string so that ordering and hashing are uniform.
pub type IndividualId = String;

/// Identifier of a network assigned by the upstream detection tool.
pub type NetworkId = String;
