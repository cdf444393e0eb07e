//! Beam discretization, shape functions and geometric helpers

pub mod geometry;
pub mod quadrature;
pub mod shape;
pub mod types;

pub use geometry::*;
pub use quadrature::*;
pub use shape::*;
pub use types::*;
