//! I/O module for reading and writing beam meshes and results

pub mod json;
pub mod metadata;
pub mod vtu;

pub use json::{read_json_mesh, write_json_mesh};
pub use metadata::{CandidatePairMetadata, SearchMetadata};
pub use vtu::{write_beam_mesh_to_vtu, write_contact_points_to_vtu};
