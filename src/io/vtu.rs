//! VTU (VTK Unstructured Grid) file writer

use crate::contact::ContactPoint;
use crate::error::{ContactSearchError, Result};
use crate::mesh::shape::{calc_interpolation, evaluate_shape_functions_and_derivs};
use crate::mesh::types::{BeamMesh, Discretization};
use std::path::Path;
use vtkio::model::*;

/// Default VTK file format version (2.2 for broad compatibility)
/// This version is compatible with ParaView 6.0.1 and most VTK-based tools
pub const DEFAULT_VTK_VERSION: (u8, u8) = (2, 2);

/// Number of line segments each beam centerline is resolved into
const SEGMENTS_PER_ELEMENT: usize = 8;

fn scalars(name: &str, data: IOBuffer) -> Attribute {
    Attribute::DataArray(DataArray {
        name: name.into(),
        elem: ElementType::Scalars {
            num_comp: 1,
            lookup_table: None,
        },
        data,
    })
}

fn export(vtk: Vtk, output_path: &Path) -> Result<()> {
    vtk.export(output_path)
        .map_err(|e| ContactSearchError::VtkError(format!("Failed to write VTU file: {}", e)))?;
    log::info!("Successfully wrote VTU file to {:?}", output_path);
    Ok(())
}

/// Write beam centerlines as poly-line cells
///
/// Each element is sampled at equally spaced parameter coordinates so that
/// curved and Hermite elements are displayed with their actual shape. The
/// cross-section radius is written as point data, the element id as cell data.
pub fn write_beam_mesh_to_vtu(
    mesh: &BeamMesh,
    output_path: &Path,
    vtk_version: Option<(u8, u8)>,
) -> Result<()> {
    let version = vtk_version.unwrap_or(DEFAULT_VTK_VERSION);
    log::info!(
        "Writing beam mesh with {} elements to {:?} (VTK version {}.{})",
        mesh.num_elements(),
        output_path,
        version.0,
        version.1
    );

    let points_per_element = SEGMENTS_PER_ELEMENT + 1;
    let mut points = Vec::new();
    let mut radius = Vec::new();
    let mut element_ids = Vec::new();
    for gid in mesh.element_ids() {
        let element = mesh.element(gid)?;
        let dofs = mesh.element_dof_values(gid)?;
        for i in 0..points_per_element {
            let xi = -1.0 + 2.0 * i as f64 / SEGMENTS_PER_ELEMENT as f64;
            let shape = evaluate_shape_functions_and_derivs(xi, element.shape, element.ref_length);
            let r = calc_interpolation(&dofs, &shape.n);
            points.extend_from_slice(&[r.x, r.y, r.z]);
            radius.push(element.radius);
        }
        element_ids.push(gid as i32);
    }

    let num_cells = element_ids.len();
    let cells = Cells {
        cell_verts: VertexNumbers::XML {
            connectivity: (0..(num_cells * points_per_element) as u64).collect(),
            offsets: (0..num_cells)
                .map(|i| ((i + 1) * points_per_element) as u64)
                .collect(),
        },
        types: vec![CellType::PolyLine; num_cells],
    };

    let mut ugrid = UnstructuredGridPiece {
        points: IOBuffer::F64(points),
        cells,
        data: Attributes::new(),
    };
    ugrid.data.point.push(scalars("radius", IOBuffer::F64(radius)));
    ugrid
        .data
        .cell
        .push(scalars("element_id", IOBuffer::I32(element_ids)));

    let vtk = Vtk {
        version: Version::new(version),
        title: "Beam mesh".to_string(),
        byte_order: ByteOrder::LittleEndian,
        data: DataSet::UnstructuredGrid {
            pieces: vec![Piece::Inline(Box::new(ugrid))],
            meta: None,
        },
        file_path: None,
    };

    export(vtk, output_path)
}

/// Write contact points as vertex cells on the first element
///
/// Point data: gap, force density and the vector to the point on the
/// second element.
pub fn write_contact_points_to_vtu(
    contact_points: &[ContactPoint],
    output_path: &Path,
    vtk_version: Option<(u8, u8)>,
) -> Result<()> {
    let version = vtk_version.unwrap_or(DEFAULT_VTK_VERSION);
    log::info!(
        "Writing {} contact points to {:?} (VTK version {}.{})",
        contact_points.len(),
        output_path,
        version.0,
        version.1
    );

    let points: Vec<f64> = contact_points
        .iter()
        .flat_map(|p| [p.position1.x, p.position1.y, p.position1.z])
        .collect();

    let n = contact_points.len();
    let cells = Cells {
        cell_verts: VertexNumbers::XML {
            connectivity: (0..n as u64).collect(),
            offsets: (1..=n as u64).collect(),
        },
        types: vec![CellType::Vertex; n],
    };

    let mut ugrid = UnstructuredGridPiece {
        points: IOBuffer::F64(points),
        cells,
        data: Attributes::new(),
    };

    ugrid.data.point.push(scalars(
        "gap",
        IOBuffer::F64(contact_points.iter().map(|p| p.gap).collect()),
    ));
    ugrid.data.point.push(scalars(
        "force",
        IOBuffer::F64(contact_points.iter().map(|p| p.force).collect()),
    ));
    ugrid.data.point.push(Attribute::DataArray(DataArray {
        name: "direction".into(),
        elem: ElementType::Vectors,
        data: IOBuffer::F64(
            contact_points
                .iter()
                .flat_map(|p| {
                    let d = p.position2 - p.position1;
                    [d.x, d.y, d.z]
                })
                .collect(),
        ),
    }));
    ugrid.data.point.push(scalars(
        "element1",
        IOBuffer::I32(contact_points.iter().map(|p| p.element1 as i32).collect()),
    ));
    ugrid.data.point.push(scalars(
        "element2",
        IOBuffer::I32(contact_points.iter().map(|p| p.element2 as i32).collect()),
    ));

    let vtk = Vtk {
        version: Version::new(version),
        title: "Contact points".to_string(),
        byte_order: ByteOrder::LittleEndian,
        data: DataSet::UnstructuredGrid {
            pieces: vec![Piece::Inline(Box::new(ugrid))],
            meta: None,
        },
        file_path: None,
    };

    export(vtk, output_path)
}
