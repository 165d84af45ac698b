use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::cluster::Linkage;
use crate::distance::{DistanceTransform, MissingDistance};
use crate::error::{DendroError, Result};
use crate::pairwise::DuplicatePolicy;

/// Options of a dendrogram run.
///
/// Every field has a default, so a JSON file only needs the keys it
/// overrides:
///
/// ```json
/// { "linkage": "ward", "transform": { "kind": "negative_log", "floor": 1e-6 } }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DendrogramConfig {
    pub linkage: Linkage,
    pub transform: DistanceTransform,
    pub missing: MissingDistance,
    pub duplicate_policy: DuplicatePolicy,
    /// Cluster networks on the rayon thread pool.
    pub parallel: bool,
}

impl Default for DendrogramConfig {
    fn default() -> Self {
        Self {
            linkage: Linkage::default(),
            transform: DistanceTransform::default(),
            missing: MissingDistance::default(),
            duplicate_policy: DuplicatePolicy::default(),
            parallel: true,
        }
    }
}

impl DendrogramConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn linkage(mut self, linkage: Linkage) -> Self {
        self.linkage = linkage;
        self
    }

    pub fn transform(mut self, transform: DistanceTransform) -> Self {
        self.transform = transform;
        self
    }

    pub fn missing(mut self, missing: MissingDistance) -> Self {
        self.missing = missing;
        self
    }

    pub fn duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicate_policy = policy;
        self
    }

    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Check the transform and the missing-pair rule.
    ///
    /// # Errors
    /// [`DendroError::Config`] on the first invalid setting.
    pub fn validate(&self) -> Result<()> {
        self.transform.validate()?;
        self.missing.validate()?;
        let sentinel = self.missing.resolve(&self.transform);
        if sentinel.is_nan() || sentinel < 0.0 {
            return Err(DendroError::Config(format!(
                "missing-pair distance {} under transform '{}' is not a valid distance",
                sentinel,
                self.transform.name()
            )));
        }
        Ok(())
    }

    /// Parse a configuration from JSON. Missing keys take their defaults.
    ///
    /// # Errors
    /// [`DendroError::Json`] on malformed input.
    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Load a configuration from a JSON file.
    ///
    /// # Errors
    /// I/O or JSON errors.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}
