mod matrix;
mod transform;

pub(crate) use matrix::condensed_index;
pub use matrix::DistanceMatrix;
pub use transform::{
    CustomTransform, DistanceTransform, MissingDistance, DEFAULT_LOG_FLOOR,
    DEFAULT_RECIPROCAL_FLOOR,
};
