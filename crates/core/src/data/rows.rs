use serde::{Deserialize, Serialize};

use crate::error::{DendroError, Result};
use crate::pairwise::{PairwiseEdge, SegmentStats};
use crate::types::{IndividualId, NetworkId, Scalar};

/// Sex-averaged length of the human autosomal genetic map, in centimorgans.
pub const DEFAULT_GENOME_LENGTH_CM: Scalar = 3545.0;

/// One row of the pairwise-sharing table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairwiseRow {
    pub id1: IndividualId,
    pub id2: IndividualId,
    /// Sharing fraction in `[0, 1]`.
    pub sharing: Scalar,
    pub segments: Option<SegmentStats>,
}

impl PairwiseRow {
    pub fn new(id1: impl Into<IndividualId>, id2: impl Into<IndividualId>, sharing: Scalar) -> Self {
        Self {
            id1: id1.into(),
            id2: id2.into(),
            sharing,
            segments: None,
        }
    }

    pub fn with_segments(mut self, segments: SegmentStats) -> Self {
        self.segments = Some(segments);
        self
    }

    pub fn to_edge(&self) -> PairwiseEdge {
        PairwiseEdge {
            a: self.id1.clone(),
            b: self.id2.clone(),
            sharing: self.sharing,
            segments: self.segments,
        }
    }
}

/// One row of the network-membership table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkRow {
    pub individual: IndividualId,
    pub network_id: NetworkId,
}

impl NetworkRow {
    pub fn new(individual: impl Into<IndividualId>, network_id: impl Into<NetworkId>) -> Self {
        Self {
            individual: individual.into(),
            network_id: network_id.into(),
        }
    }
}

/// What the value column of a pairwise table measures.
///
/// Chosen once when a table is read; every row is converted to a sharing
/// fraction with the same rule.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SharingMetric {
    /// The column already holds a fraction in `[0, 1]`.
    Fraction,
    /// The column holds total shared length in cM; it is divided by the
    /// genome length and capped at 1.
    LengthCm { genome_length_cm: Scalar },
}

impl Default for SharingMetric {
    fn default() -> Self {
        SharingMetric::LengthCm {
            genome_length_cm: DEFAULT_GENOME_LENGTH_CM,
        }
    }
}

impl SharingMetric {
    /// Convert a raw column value to a sharing fraction.
    ///
    /// # Errors
    /// [`DendroError::Data`] for negative or non-finite values.
    pub fn to_fraction(&self, value: Scalar) -> Result<Scalar> {
        if !value.is_finite() || value < 0.0 {
            return Err(DendroError::Data(format!(
                "sharing value {} must be finite and non-negative",
                value
            )));
        }
        match self {
            SharingMetric::Fraction => Ok(value),
            SharingMetric::LengthCm { genome_length_cm } => {
                Ok((value / genome_length_cm).min(1.0))
            }
        }
    }

    /// # Errors
    /// [`DendroError::Config`] if the genome length is not positive.
    pub fn validate(&self) -> Result<()> {
        match self {
            SharingMetric::Fraction => Ok(()),
            SharingMetric::LengthCm { genome_length_cm } => {
                if genome_length_cm.is_finite() && *genome_length_cm > 0.0 {
                    Ok(())
                } else {
                    Err(DendroError::Config(format!(
                        "genome length must be positive, got {}",
                        genome_length_cm
                    )))
                }
            }
        }
    }

    /// Whether the raw value is a length in centimorgans.
    pub fn is_length(&self) -> bool {
        matches!(self, SharingMetric::LengthCm { .. })
    }
}
