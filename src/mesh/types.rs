//! Core beam mesh data structures
//!
//! The search and projection core only consumes read-only geometric data
//! addressed by element id plus a global DOF lookup. [`Discretization`] is that
//! narrow interface; [`BeamMesh`] is the in-memory implementation used by the
//! pipeline, the CLI and the tests.

use crate::error::{ContactSearchError, Result};
use crate::mesh::quadrature::gauss_legendre;
use crate::mesh::shape::{
    bernstein_control_points, calc_interpolation, evaluate_shape_functions_and_derivs,
};
use nalgebra::{DVector, Point3, Vector3};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 3D point type
pub type Point = Point3<f64>;

/// 3D vector type
pub type Vec3 = Vector3<f64>;

/// Number of global DOFs reserved per node: position and tangent
pub const DOFS_PER_NODE: usize = 6;

/// Curve discretization of a beam element centerline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CurveShape {
    /// Linear Lagrange, 2 nodes
    Line2,
    /// Quadratic Lagrange, 3 nodes
    Line3,
    /// Cubic Lagrange, 4 nodes
    Line4,
    /// Quartic Lagrange, 5 nodes
    Line5,
    /// Cubic Hermite, 2 nodes with position and tangent
    Hermite2,
}

impl CurveShape {
    /// Number of nodes of the element
    pub fn num_nodes(&self) -> usize {
        match self {
            CurveShape::Line2 | CurveShape::Hermite2 => 2,
            CurveShape::Line3 => 3,
            CurveShape::Line4 => 4,
            CurveShape::Line5 => 5,
        }
    }

    /// Number of vector-valued nodal values (1 for Lagrange, 2 for Hermite)
    pub fn num_nodal_values(&self) -> usize {
        match self {
            CurveShape::Hermite2 => 2,
            _ => 1,
        }
    }

    /// Number of shape functions
    pub fn num_shape_functions(&self) -> usize {
        self.num_nodes() * self.num_nodal_values()
    }

    /// Number of element DOFs used for the centerline interpolation
    pub fn num_dofs(&self) -> usize {
        3 * self.num_shape_functions()
    }

    /// Human readable name
    pub fn name(&self) -> &'static str {
        match self {
            CurveShape::Line2 => "line2",
            CurveShape::Line3 => "line3",
            CurveShape::Line4 => "line4",
            CurveShape::Line5 => "line5",
            CurveShape::Hermite2 => "hermite2",
        }
    }
}

impl std::fmt::Display for CurveShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Beam element with a circular cross section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeamElement {
    /// Global element id
    pub gid: usize,

    /// Node ids, end nodes first, then interior nodes in ascending parameter order
    pub node_ids: Vec<usize>,

    /// Centerline discretization
    pub shape: CurveShape,

    /// Cross-section radius
    pub radius: f64,

    /// Reference length (set by [`BeamMesh::add_element`] if not positive)
    #[serde(default)]
    pub ref_length: f64,
}

impl BeamElement {
    /// Create a new beam element; the reference length is computed when added to a mesh
    pub fn new(gid: usize, node_ids: Vec<usize>, shape: CurveShape, radius: f64) -> Self {
        Self {
            gid,
            node_ids,
            shape,
            radius,
            ref_length: 0.0,
        }
    }
}

/// Read-only access to element geometry and DOF numbering
///
/// Implementations must be safe to share between threads because the
/// evaluator may query them from a worker pool.
pub trait Discretization: Sync {
    /// Element by global id
    fn element(&self, gid: usize) -> Result<&BeamElement>;

    /// All element ids in ascending order
    fn element_ids(&self) -> Vec<usize>;

    /// Current centerline DOF values of an element, `[node][value][xyz]` ordering
    fn element_dof_values(&self, gid: usize) -> Result<DVector<f64>>;

    /// Global DOF ids matching [`Discretization::element_dof_values`]
    fn element_dof_gids(&self, gid: usize) -> Result<Vec<usize>>;

    /// Points whose convex hull contains the element centerline
    fn element_hull_points(&self, gid: usize) -> Result<Vec<Point>>;

    /// Counter that changes whenever elements are added or removed
    fn topology_revision(&self) -> u64;

    /// Size of the global DOF vector
    fn num_dofs(&self) -> usize;
}

/// In-memory beam discretization
#[derive(Debug, Clone, Default)]
pub struct BeamMesh {
    /// Nodal positions
    pub nodes: Vec<Point>,

    /// Nodal tangents, used by Hermite elements
    pub tangents: Vec<Vec3>,

    elements: BTreeMap<usize, BeamElement>,
    revision: u64,
}

impl BeamMesh {
    /// Create a new empty mesh
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node with a default tangent along x; returns its id
    pub fn add_node(&mut self, position: Point) -> usize {
        self.add_node_with_tangent(position, Vec3::x())
    }

    /// Add a node with an explicit tangent; returns its id
    pub fn add_node_with_tangent(&mut self, position: Point, tangent: Vec3) -> usize {
        self.nodes.push(position);
        self.tangents.push(tangent);
        self.nodes.len() - 1
    }

    /// Add an element
    ///
    /// Validates node references and node count, computes the reference length
    /// if none was given and bumps the topology revision.
    pub fn add_element(&mut self, mut element: BeamElement) -> Result<()> {
        if self.elements.contains_key(&element.gid) {
            return Err(ContactSearchError::InvalidMeshTopology(format!(
                "Duplicate element id {}",
                element.gid
            )));
        }
        if element.node_ids.len() != element.shape.num_nodes() {
            return Err(ContactSearchError::InvalidMeshTopology(format!(
                "Element {} of type {} needs {} nodes, got {}",
                element.gid,
                element.shape,
                element.shape.num_nodes(),
                element.node_ids.len()
            )));
        }
        for &node in &element.node_ids {
            if node >= self.nodes.len() {
                return Err(ContactSearchError::InvalidMeshTopology(format!(
                    "Element {} references node {} but mesh has only {} nodes",
                    element.gid,
                    node,
                    self.nodes.len()
                )));
            }
        }
        if element.radius < 0.0 {
            return Err(ContactSearchError::InvalidMeshTopology(format!(
                "Element {} has negative radius {}",
                element.gid, element.radius
            )));
        }

        if element.ref_length <= 0.0 {
            element.ref_length = self.compute_ref_length(&element)?;
        }
        if element.ref_length <= 0.0 {
            return Err(ContactSearchError::InvalidMeshTopology(format!(
                "Element {} has zero length",
                element.gid
            )));
        }

        self.elements.insert(element.gid, element);
        self.revision += 1;
        Ok(())
    }

    /// Remove an element, bumping the topology revision
    pub fn remove_element(&mut self, gid: usize) -> Option<BeamElement> {
        let removed = self.elements.remove(&gid);
        if removed.is_some() {
            self.revision += 1;
        }
        removed
    }

    /// Move a single node; topology is unchanged
    pub fn set_node_position(&mut self, node: usize, position: Point) -> Result<()> {
        let slot = self.nodes.get_mut(node).ok_or_else(|| {
            ContactSearchError::InvalidMeshTopology(format!("Node {} out of bounds", node))
        })?;
        *slot = position;
        Ok(())
    }

    /// Set the tangent of a single node
    pub fn set_node_tangent(&mut self, node: usize, tangent: Vec3) -> Result<()> {
        let slot = self.tangents.get_mut(node).ok_or_else(|| {
            ContactSearchError::InvalidMeshTopology(format!("Node {} out of bounds", node))
        })?;
        *slot = tangent;
        Ok(())
    }

    /// Apply a displacement function to every node
    pub fn displace_nodes<F>(&mut self, mut displacement: F)
    where
        F: FnMut(usize, &Point) -> Vec3,
    {
        for (i, p) in self.nodes.iter_mut().enumerate() {
            let u = displacement(i, p);
            *p += u;
        }
    }

    /// Get total number of nodes
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Get total number of elements
    pub fn num_elements(&self) -> usize {
        self.elements.len()
    }

    /// Iterate over elements in ascending id order
    pub fn elements(&self) -> impl Iterator<Item = &BeamElement> {
        self.elements.values()
    }

    /// Smallest reference length over the given elements
    pub fn min_ref_length(&self, gids: &[usize]) -> Result<f64> {
        let mut min = f64::INFINITY;
        for &gid in gids {
            min = min.min(self.element(gid)?.ref_length);
        }
        Ok(min)
    }

    /// Arc length of the centerline in the current configuration
    ///
    /// Hermite elements need a reference length for their shape functions,
    /// so their length is taken as the distance between the end nodes.
    fn compute_ref_length(&self, element: &BeamElement) -> Result<f64> {
        let p0 = get_node(&self.nodes, element.node_ids[0])?;
        let p1 = get_node(&self.nodes, element.node_ids[1])?;
        let chord = (p1 - p0).norm();
        if element.shape == CurveShape::Hermite2 || chord == 0.0 {
            return Ok(chord);
        }

        let dofs = self.dof_values(element)?;
        let (points, weights) = gauss_legendre(6)?;
        let mut length = 0.0;
        for (xi, w) in points.iter().zip(weights.iter()) {
            let shape = evaluate_shape_functions_and_derivs(*xi, element.shape, chord);
            let r_xi = calc_interpolation(&dofs, &shape.n_xi);
            length += w * r_xi.norm();
        }
        Ok(length)
    }

    fn dof_values(&self, element: &BeamElement) -> Result<DVector<f64>> {
        let nvals = element.shape.num_nodal_values();
        let mut dofs = DVector::zeros(element.shape.num_dofs());
        for (inode, &node) in element.node_ids.iter().enumerate() {
            let p = get_node(&self.nodes, node)?;
            let base = 3 * inode * nvals;
            dofs.fixed_rows_mut::<3>(base).copy_from(&p.coords);
            if nvals == 2 {
                let t = self.tangents.get(node).ok_or_else(|| {
                    ContactSearchError::InvalidMeshTopology(format!(
                        "Node {} has no tangent",
                        node
                    ))
                })?;
                dofs.fixed_rows_mut::<3>(base + 3).copy_from(t);
            }
        }
        Ok(dofs)
    }
}

impl Discretization for BeamMesh {
    fn element(&self, gid: usize) -> Result<&BeamElement> {
        self.elements
            .get(&gid)
            .ok_or(ContactSearchError::ElementNotFound(gid))
    }

    fn element_ids(&self) -> Vec<usize> {
        self.elements.keys().copied().collect()
    }

    fn element_dof_values(&self, gid: usize) -> Result<DVector<f64>> {
        self.dof_values(self.element(gid)?)
    }

    fn element_dof_gids(&self, gid: usize) -> Result<Vec<usize>> {
        let element = self.element(gid)?;
        let nvals = element.shape.num_nodal_values();
        let mut gids = Vec::with_capacity(element.shape.num_dofs());
        for &node in &element.node_ids {
            for value in 0..nvals {
                for dim in 0..3 {
                    gids.push(DOFS_PER_NODE * node + 3 * value + dim);
                }
            }
        }
        Ok(gids)
    }

    fn element_hull_points(&self, gid: usize) -> Result<Vec<Point>> {
        let element = self.element(gid)?;
        let dofs = self.dof_values(element)?;
        Ok(
            bernstein_control_points(&dofs, element.shape, element.ref_length)
                .into_iter()
                .map(Point::from)
                .collect(),
        )
    }

    fn topology_revision(&self) -> u64 {
        self.revision
    }

    fn num_dofs(&self) -> usize {
        DOFS_PER_NODE * self.nodes.len()
    }
}

/// Get a node by index with bounds checking
pub fn get_node(nodes: &[Point], idx: usize) -> Result<&Point> {
    nodes.get(idx).ok_or_else(|| {
        ContactSearchError::InvalidMeshTopology(format!(
            "Node index {} out of bounds (max: {})",
            idx,
            nodes.len().saturating_sub(1)
        ))
    })
}
