use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{DendroError, Result};
use crate::types::Scalar;

/// Rule defining the distance between two clusters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Linkage {
    /// Nearest member pair.
    Single,
    /// Farthest member pair.
    Complete,
    /// Mean over all member pairs (UPGMA).
    #[default]
    Average,
    /// Minimum increase in within-cluster variance.
    Ward,
}

impl Linkage {
    /// Lance-Williams update: distance from cluster `k` to the union of
    /// clusters `i` and `j`, given the distances before the merge and the
    /// cluster sizes.
    pub fn update(
        &self,
        d_ki: Scalar,
        d_kj: Scalar,
        d_ij: Scalar,
        n_i: usize,
        n_j: usize,
        n_k: usize,
    ) -> Scalar {
        match self {
            Linkage::Single => d_ki.min(d_kj),
            Linkage::Complete => d_ki.max(d_kj),
            Linkage::Average => {
                let (ni, nj) = (n_i as Scalar, n_j as Scalar);
                (ni * d_ki + nj * d_kj) / (ni + nj)
            }
            Linkage::Ward => {
                let (ni, nj, nk) = (n_i as Scalar, n_j as Scalar, n_k as Scalar);
                let numerator = (ni + nk) * d_ki * d_ki + (nj + nk) * d_kj * d_kj
                    - nk * d_ij * d_ij;
                (numerator / (ni + nj + nk)).max(0.0).sqrt()
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Linkage::Single => "single",
            Linkage::Complete => "complete",
            Linkage::Average => "average",
            Linkage::Ward => "ward",
        }
    }
}

impl FromStr for Linkage {
    type Err = DendroError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "single" => Ok(Linkage::Single),
            "complete" => Ok(Linkage::Complete),
            "average" | "upgma" => Ok(Linkage::Average),
            "ward" => Ok(Linkage::Ward),
            other => Err(DendroError::Config(format!(
                "Unknown linkage '{}'. Use 'single', 'complete', 'average' or 'ward'.",
                other
            ))),
        }
    }
}

impl fmt::Display for Linkage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
