use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{DendroError, Result};
use crate::types::Scalar;

/// Default lower bound applied to sharing values by [`DistanceTransform::NegativeLog`].
pub const DEFAULT_LOG_FLOOR: Scalar = 1e-6;

/// Default lower bound applied to sharing values by [`DistanceTransform::Reciprocal`].
pub const DEFAULT_RECIPROCAL_FLOOR: Scalar = 1e-4;

/// Number of grid points used to check a custom transform.
const VALIDATION_STEPS: usize = 100;

/// A user-supplied sharing-to-distance function.
#[derive(Clone)]
pub struct CustomTransform {
    name: String,
    func: Arc<dyn Fn(Scalar) -> Scalar + Send + Sync>,
}

impl CustomTransform {
    pub fn new<F>(name: &str, func: F) -> Self
    where
        F: Fn(Scalar) -> Scalar + Send + Sync + 'static,
    {
        Self {
            name: name.to_string(),
            func: Arc::new(func),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn apply(&self, sharing: Scalar) -> Scalar {
        (self.func)(sharing)
    }
}

impl fmt::Debug for CustomTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomTransform")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Mapping from an IBD sharing fraction to a clustering distance.
///
/// Every variant is non-increasing in the sharing value, returns 0 at full
/// sharing and reaches its [`ceiling`](DistanceTransform::ceiling) at zero
/// sharing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DistanceTransform {
    /// `d = 1 - s`.
    #[default]
    Linear,
    /// `d = -ln(max(s, floor))`.
    NegativeLog { floor: Scalar },
    /// `d = 1 / max(s, floor) - 1`.
    Reciprocal { floor: Scalar },
    /// Arbitrary function; not serialisable.
    #[serde(skip)]
    Custom(CustomTransform),
}

impl DistanceTransform {
    pub fn negative_log() -> Self {
        DistanceTransform::NegativeLog {
            floor: DEFAULT_LOG_FLOOR,
        }
    }

    pub fn reciprocal() -> Self {
        DistanceTransform::Reciprocal {
            floor: DEFAULT_RECIPROCAL_FLOOR,
        }
    }

    pub fn custom<F>(name: &str, func: F) -> Self
    where
        F: Fn(Scalar) -> Scalar + Send + Sync + 'static,
    {
        DistanceTransform::Custom(CustomTransform::new(name, func))
    }

    /// Short name used in logs and reports.
    pub fn name(&self) -> &str {
        match self {
            DistanceTransform::Linear => "linear",
            DistanceTransform::NegativeLog { .. } => "neglog",
            DistanceTransform::Reciprocal { .. } => "reciprocal",
            DistanceTransform::Custom(c) => c.name(),
        }
    }

    /// Distance for a sharing fraction. Inputs are clamped to `[0, 1]`.
    pub fn to_distance(&self, sharing: Scalar) -> Scalar {
        let s = sharing.clamp(0.0, 1.0);
        match self {
            DistanceTransform::Linear => 1.0 - s,
            DistanceTransform::NegativeLog { floor } => 0.0 - s.max(*floor).ln(),
            DistanceTransform::Reciprocal { floor } => 1.0 / s.max(*floor) - 1.0,
            DistanceTransform::Custom(c) => c.apply(s),
        }
    }

    /// Distance at zero sharing, the largest value the transform produces.
    pub fn ceiling(&self) -> Scalar {
        self.to_distance(0.0)
    }

    /// Check the transform parameters.
    ///
    /// Floors must lie in `(0, 1)`. A custom function is sampled on a grid
    /// over `(0, 1]` and must be finite, non-negative, non-increasing and
    /// zero at full sharing.
    ///
    /// # Errors
    /// Returns [`DendroError::Config`] describing the first violation.
    pub fn validate(&self) -> Result<()> {
        match self {
            DistanceTransform::Linear => Ok(()),
            DistanceTransform::NegativeLog { floor } | DistanceTransform::Reciprocal { floor } => {
                if *floor > 0.0 && *floor < 1.0 {
                    Ok(())
                } else {
                    Err(DendroError::Config(format!(
                        "{} transform floor must lie in (0, 1), got {}",
                        self.name(),
                        floor
                    )))
                }
            }
            DistanceTransform::Custom(c) => validate_custom(c),
        }
    }
}

fn validate_custom(c: &CustomTransform) -> Result<()> {
    let mut previous = Scalar::INFINITY;
    for step in 1..=VALIDATION_STEPS {
        let s = step as Scalar / VALIDATION_STEPS as Scalar;
        let d = c.apply(s);
        if !d.is_finite() || d < 0.0 {
            return Err(DendroError::Config(format!(
                "custom transform '{}' returned {} for sharing {}",
                c.name(),
                d,
                s
            )));
        }
        if d > previous {
            return Err(DendroError::Config(format!(
                "custom transform '{}' increases between sharing {} and {}",
                c.name(),
                s - 1.0 / VALIDATION_STEPS as Scalar,
                s
            )));
        }
        previous = d;
    }
    if c.apply(1.0).abs() > 1e-12 {
        return Err(DendroError::Config(format!(
            "custom transform '{}' must map full sharing to distance 0",
            c.name()
        )));
    }
    Ok(())
}

impl FromStr for DistanceTransform {
    type Err = DendroError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "linear" => Ok(DistanceTransform::Linear),
            "neglog" | "negative-log" | "negative_log" | "log" => Ok(Self::negative_log()),
            "reciprocal" | "inverse" => Ok(Self::reciprocal()),
            other => Err(DendroError::Config(format!(
                "Unknown distance transform '{}'. Use 'linear', 'neglog' or 'reciprocal'.",
                other
            ))),
        }
    }
}

impl fmt::Display for DistanceTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Distance assigned to pairs with no direct sharing observation.
///
/// Always finite so that networks connected only transitively still merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MissingDistance {
    /// The transform's ceiling (distance at zero sharing).
    #[default]
    Ceiling,
    /// The distance of half the detection threshold: an unobserved pair is
    /// assumed to share half of the smallest detectable amount.
    HalfThreshold { threshold: Scalar },
}

impl MissingDistance {
    /// Resolve the sentinel distance under `transform`.
    pub fn resolve(&self, transform: &DistanceTransform) -> Scalar {
        match self {
            MissingDistance::Ceiling => transform.ceiling(),
            MissingDistance::HalfThreshold { threshold } => transform.to_distance(threshold / 2.0),
        }
    }

    /// # Errors
    /// Returns [`DendroError::Config`] if the threshold is outside `(0, 1]`.
    pub fn validate(&self) -> Result<()> {
        match self {
            MissingDistance::Ceiling => Ok(()),
            MissingDistance::HalfThreshold { threshold } => {
                if *threshold > 0.0 && *threshold <= 1.0 {
                    Ok(())
                } else {
                    Err(DendroError::Config(format!(
                        "missing-pair detection threshold must lie in (0, 1], got {}",
                        threshold
                    )))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn transforms() -> Vec<DistanceTransform> {
        vec![
            DistanceTransform::Linear,
            DistanceTransform::negative_log(),
            DistanceTransform::reciprocal(),
            DistanceTransform::custom("squared", |s| (1.0 - s) * (1.0 - s)),
        ]
    }

    #[test]
    fn test_zero_only_at_full_sharing() {
        for t in transforms() {
            assert_eq!(t.to_distance(1.0), 0.0, "{}", t);
            assert!(t.to_distance(0.999) > 0.0, "{}", t);
        }
    }

    #[test]
    fn test_monotonic_non_increasing() {
        for t in transforms() {
            let mut previous = t.ceiling();
            for step in 0..=1000 {
                let s = step as f64 / 1000.0;
                let d = t.to_distance(s);
                assert!(d.is_finite(), "{} not finite at {}", t, s);
                assert!(d <= previous, "{} increased at {}", t, s);
                previous = d;
            }
        }
    }

    #[test]
    fn test_ceilings() {
        assert_relative_eq!(DistanceTransform::Linear.ceiling(), 1.0);
        assert_relative_eq!(
            DistanceTransform::negative_log().ceiling(),
            -DEFAULT_LOG_FLOOR.ln()
        );
        assert_relative_eq!(
            DistanceTransform::reciprocal().ceiling(),
            1.0 / DEFAULT_RECIPROCAL_FLOOR - 1.0
        );
    }

    #[test]
    fn test_values() {
        assert_relative_eq!(DistanceTransform::Linear.to_distance(0.3), 0.7);
        assert_relative_eq!(
            DistanceTransform::negative_log().to_distance(0.5),
            std::f64::consts::LN_2
        );
        assert_relative_eq!(DistanceTransform::reciprocal().to_distance(0.25), 3.0);
    }

    #[test]
    fn test_out_of_range_input_clamped() {
        let t = DistanceTransform::Linear;
        assert_eq!(t.to_distance(1.5), 0.0);
        assert_eq!(t.to_distance(-0.5), 1.0);
    }

    #[test]
    fn test_validate_rejects_bad_custom() {
        let increasing = DistanceTransform::custom("increasing", |s| s);
        assert!(increasing.validate().is_err());

        let negative = DistanceTransform::custom("negative", |s| s - 1.0);
        assert!(negative.validate().is_err());

        let good = DistanceTransform::custom("good", |s| 1.0 - s.sqrt());
        assert!(good.validate().is_ok());
    }

    #[test]
    fn test_validate_floor() {
        assert!(DistanceTransform::NegativeLog { floor: 0.0 }.validate().is_err());
        assert!(DistanceTransform::Reciprocal { floor: 1.0 }.validate().is_err());
        assert!(DistanceTransform::negative_log().validate().is_ok());
    }

    #[test]
    fn test_parse_names() {
        assert!(matches!(
            "Linear".parse::<DistanceTransform>().unwrap(),
            DistanceTransform::Linear
        ));
        assert!(matches!(
            "neglog".parse::<DistanceTransform>().unwrap(),
            DistanceTransform::NegativeLog { .. }
        ));
        assert!("euclid".parse::<DistanceTransform>().is_err());
    }

    #[test]
    fn test_missing_distance() {
        let t = DistanceTransform::Linear;
        assert_relative_eq!(MissingDistance::Ceiling.resolve(&t), 1.0);
        assert_relative_eq!(
            MissingDistance::HalfThreshold { threshold: 0.2 }.resolve(&t),
            0.9
        );
        assert!(MissingDistance::HalfThreshold { threshold: 0.0 }
            .validate()
            .is_err());
    }

    #[test]
    fn test_serde_round_trip_of_named_variant() {
        let json = serde_json::to_string(&DistanceTransform::negative_log()).unwrap();
        let back: DistanceTransform = serde_json::from_str(&json).unwrap();
        assert!(matches!(back, DistanceTransform::NegativeLog { floor } if floor == DEFAULT_LOG_FLOOR));
    }
}
