//! Contact pair evaluation and assembly

pub mod assembly;
pub mod detection;
pub mod evaluator;
pub mod line_contact;
pub mod metrics;
pub mod pair;
pub mod point_coupling;
pub mod types;

pub use assembly::*;
pub use detection::*;
pub use evaluator::*;
pub use line_contact::*;
pub use metrics::*;
pub use pair::*;
pub use point_coupling::*;
pub use types::*;
