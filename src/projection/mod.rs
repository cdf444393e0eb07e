//! Point-to-curve projection and its linearization

pub mod linearization;
pub mod point_to_curve;

pub use linearization::*;
pub use point_to_curve::*;
