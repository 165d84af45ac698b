use serde::{Deserialize, Serialize};

use crate::error::{DendroError, Result};
use crate::types::{IndividualId, Scalar};

/// Optional per-pair segment metadata carried alongside the sharing value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SegmentStats {
    /// Number of IBD segments shared by the pair.
    pub count: Option<u32>,
    /// Total shared length in centimorgans.
    pub total_cm: Option<Scalar>,
}

/// One observed sharing value between two distinct individuals.
///
/// The pair is unordered: `(a, b)` and `(b, a)` describe the same edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairwiseEdge {
    pub a: IndividualId,
    pub b: IndividualId,
    /// Fraction of the genome shared IBD, in `[0, 1]`.
    pub sharing: Scalar,
    pub segments: Option<SegmentStats>,
}

impl PairwiseEdge {
    pub fn new(a: impl Into<IndividualId>, b: impl Into<IndividualId>, sharing: Scalar) -> Self {
        Self {
            a: a.into(),
            b: b.into(),
            sharing,
            segments: None,
        }
    }

    /// Attach segment metadata.
    pub fn with_segments(mut self, segments: SegmentStats) -> Self {
        self.segments = Some(segments);
        self
    }

    /// Check that the edge joins two distinct individuals with a finite
    /// sharing fraction in `[0, 1]`.
    ///
    /// # Errors
    /// Returns [`DendroError::InvalidEdge`] describing the first violation.
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: &str| DendroError::InvalidEdge {
            a: self.a.clone(),
            b: self.b.clone(),
            reason: reason.to_string(),
        };

        if self.a.is_empty() || self.b.is_empty() {
            return Err(invalid("empty individual identifier"));
        }
        if self.a == self.b {
            return Err(invalid("an individual cannot share with itself"));
        }
        if !self.sharing.is_finite() {
            return Err(invalid("sharing value is not finite"));
        }
        if !(0.0..=1.0).contains(&self.sharing) {
            return Err(invalid(&format!(
                "sharing value {} is outside [0, 1]",
                self.sharing
            )));
        }
        Ok(())
    }
}
