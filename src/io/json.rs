//! Simple JSON beam mesh format

use crate::error::{ContactSearchError, Result};
use crate::mesh::{BeamElement, BeamMesh, Discretization, Point, Vec3};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

#[derive(Debug, Serialize, Deserialize)]
struct JsonMesh {
    nodes: Vec<[f64; 3]>,
    /// Optional nodal tangents, one per node, for Hermite elements
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    tangents: Vec<[f64; 3]>,
    elements: Vec<BeamElement>,
}

pub fn read_json_mesh<P: AsRef<Path>>(path: P) -> Result<BeamMesh> {
    let file = File::open(path.as_ref()).map_err(ContactSearchError::IoError)?;

    let reader = BufReader::new(file);
    let json_mesh: JsonMesh = serde_json::from_reader(reader).map_err(|e| {
        ContactSearchError::ConfigError(format!("Failed to parse JSON mesh: {}", e))
    })?;

    if !json_mesh.tangents.is_empty() && json_mesh.tangents.len() != json_mesh.nodes.len() {
        return Err(ContactSearchError::InvalidMeshTopology(format!(
            "Mesh has {} nodes but {} tangents",
            json_mesh.nodes.len(),
            json_mesh.tangents.len()
        )));
    }

    let mut mesh = BeamMesh::new();
    for (i, [x, y, z]) in json_mesh.nodes.into_iter().enumerate() {
        match json_mesh.tangents.get(i) {
            Some(&[tx, ty, tz]) => {
                mesh.add_node_with_tangent(Point::new(x, y, z), Vec3::new(tx, ty, tz))
            }
            None => mesh.add_node(Point::new(x, y, z)),
        };
    }
    for element in json_mesh.elements {
        mesh.add_element(element)?;
    }

    Ok(mesh)
}

pub fn write_json_mesh<P: AsRef<Path>>(mesh: &BeamMesh, path: P) -> Result<()> {
    let json_mesh = JsonMesh {
        nodes: mesh.nodes.iter().map(|p| [p.x, p.y, p.z]).collect(),
        tangents: mesh.tangents.iter().map(|t| [t.x, t.y, t.z]).collect(),
        elements: mesh
            .element_ids()
            .into_iter()
            .map(|gid| mesh.element(gid).cloned())
            .collect::<Result<Vec<_>>>()?,
    };

    let file = File::create(path.as_ref())?;
    serde_json::to_writer_pretty(file, &json_mesh).map_err(|e| {
        ContactSearchError::ConfigError(format!("Failed to write JSON mesh: {}", e))
    })?;

    Ok(())
}
