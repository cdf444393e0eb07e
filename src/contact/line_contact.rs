//! Penalty line contact between two beam elements
//!
//! Gauss points on the slave centerline are projected onto the master
//! centerline. A Gauss point is active if its projection converged inside the
//! master element and the surfaces penetrate, i.e. the gap
//! `g = |r_slave - r_master| - (R_slave + R_master)` is negative. Each active
//! point contributes the penalty potential `1/2 * eps * g^2` weighted by the
//! slave Gauss weight and Jacobian.
//!
//! The force is the gradient of that potential with respect to the pair DOFs.
//! Its derivatives, i.e. the stiffness, come from `Fad<NDOF>` arithmetic in
//! which the master parameter coordinate carries the linearization of the
//! projection.

use crate::config::{ContactParameters, ProjectionParameters};
use crate::contact::pair::{check_element, check_pair_dofs, ContactPair};
use crate::contact::types::{ContactPoint, LocalContribution, Segment};
use crate::error::Result;
use crate::fad::{Fad, FadScalar};
use crate::mesh::geometry::vector_norm;
use crate::mesh::quadrature::gauss_legendre;
use crate::mesh::shape::{
    calc_interpolation, calc_interpolation_fad, evaluate_shape_functions_and_derivs,
    shape_function_matrix, ShapeFunctions,
};
use crate::mesh::types::{BeamElement, CurveShape, Discretization, Point};
use crate::projection::{
    calc_linearization_point_to_curve_projection_parameter_coord_master,
    point_to_curve_projection, OrthogonalityPartials,
};
use nalgebra::DVector;

/// Penalty line contact pair over `NDOF` = slave DOFs + master DOFs
#[derive(Debug, Clone)]
pub struct BeamToBeamLineContactPair<const NDOF: usize> {
    slave_gid: usize,
    master_gid: usize,
    slave_shape: CurveShape,
    master_shape: CurveShape,
    contact: ContactParameters,
    projection: ProjectionParameters,
    gauss_points: Vec<f64>,
    gauss_weights: Vec<f64>,
    contact_points: Vec<ContactPoint>,
    segments: Vec<Segment>,
}

impl<const NDOF: usize> BeamToBeamLineContactPair<NDOF> {
    pub fn new(
        slave: &BeamElement,
        master: &BeamElement,
        contact: &ContactParameters,
        projection: &ProjectionParameters,
    ) -> Result<Self> {
        check_pair_dofs(slave, master, NDOF)?;
        let (gauss_points, gauss_weights) = gauss_legendre(contact.num_gauss_points)?;
        Ok(Self {
            slave_gid: slave.gid,
            master_gid: master.gid,
            slave_shape: slave.shape,
            master_shape: master.shape,
            contact: contact.clone(),
            projection: projection.clone(),
            gauss_points,
            gauss_weights,
            contact_points: Vec::new(),
            segments: Vec::new(),
        })
    }

    fn elements<'a>(
        &self,
        disc: &'a dyn Discretization,
    ) -> Result<(&'a BeamElement, &'a BeamElement)> {
        let slave = check_element(disc, self.slave_gid, self.slave_shape)?;
        let master = check_element(disc, self.master_gid, self.master_shape)?;
        check_pair_dofs(slave, master, NDOF)?;
        Ok((slave, master))
    }

    /// Add the force and stiffness of one active Gauss point
    ///
    /// `lin_xi_master` is the derivative of the projected master coordinate
    /// with respect to all pair DOFs, slave DOFs first.
    #[allow(clippy::too_many_arguments)]
    fn add_gauss_point_contribution(
        &self,
        local: &mut LocalContribution,
        dofs: &[f64],
        slave_shape_functions: &ShapeFunctions<f64>,
        master: &BeamElement,
        xi_master: f64,
        lin_xi_master: &[f64],
        radius_sum: f64,
        weight: f64,
    ) {
        let n_slave_dofs = self.slave_shape.num_dofs();

        let dofs_fad: Vec<Fad<NDOF>> = dofs
            .iter()
            .enumerate()
            .map(|(i, &value)| Fad::variable(value, i))
            .collect();
        let mut gradient = [0.0; NDOF];
        gradient.copy_from_slice(lin_xi_master);
        let xi_master_fad = Fad::with_gradient(xi_master, gradient);

        let n_slave: Vec<Fad<NDOF>> = slave_shape_functions
            .n
            .iter()
            .map(|&value| Fad::from(value))
            .collect();
        let n_master =
            evaluate_shape_functions_and_derivs(xi_master_fad, master.shape, master.ref_length).n;

        let r_slave = calc_interpolation_fad(&dofs_fad[..n_slave_dofs], &n_slave);
        let r_master = calc_interpolation_fad(&dofs_fad[n_slave_dofs..], &n_master);
        let delta_r = r_slave - r_master;
        let distance = vector_norm(&delta_r);
        let normal = delta_r / distance;
        let gap = distance - Fad::from(radius_sum);

        let factor = Fad::from(weight * self.contact.penalty_parameter) * gap;

        let mut force: Vec<Fad<NDOF>> = Vec::with_capacity(NDOF);
        for n_k in &n_slave {
            for d in 0..3 {
                force.push(factor * *n_k * normal[d]);
            }
        }
        for n_k in &n_master {
            for d in 0..3 {
                force.push(-(factor * *n_k * normal[d]));
            }
        }

        for (i, f_i) in force.iter().enumerate() {
            local.force[i] += f_i.value();
            for j in 0..NDOF {
                local.stiffness[(i, j)] += f_i.dx(j);
            }
        }
    }
}

impl<const NDOF: usize> ContactPair for BeamToBeamLineContactPair<NDOF> {
    fn element_gids(&self) -> (usize, usize) {
        (self.slave_gid, self.master_gid)
    }

    fn setup(&mut self, disc: &dyn Discretization) -> Result<()> {
        self.elements(disc)?;
        self.contact_points.clear();
        self.segments.clear();
        Ok(())
    }

    fn evaluate(&mut self, disc: &dyn Discretization) -> Result<Option<LocalContribution>> {
        let (slave, master) = self.elements(disc)?;
        let slave_dofs = disc.element_dof_values(slave.gid)?;
        let master_dofs = disc.element_dof_values(master.gid)?;
        let mut dof_gids = disc.element_dof_gids(slave.gid)?;
        dof_gids.extend(disc.element_dof_gids(master.gid)?);

        let dofs: Vec<f64> = slave_dofs.iter().chain(master_dofs.iter()).copied().collect();
        let radius_sum = slave.radius + master.radius;
        let jacobian = 0.5 * slave.ref_length;

        let mut local = LocalContribution::zeros(dof_gids);
        let mut contact_points = Vec::new();
        let mut active = Vec::with_capacity(self.gauss_points.len());
        let mut xi_master_guess = 0.0;

        for (&xi_slave, &gauss_weight) in self.gauss_points.iter().zip(&self.gauss_weights) {
            let sf_slave = evaluate_shape_functions_and_derivs(xi_slave, slave.shape, slave.ref_length);
            let r_slave = calc_interpolation(&slave_dofs, &sf_slave.n);

            let projection = point_to_curve_projection(
                &r_slave,
                xi_master_guess,
                &master_dofs,
                master.shape,
                master.ref_length,
                &self.projection,
            )?;
            if !projection.converged || projection.xi_master.abs() > 1.0 {
                active.push(false);
                continue;
            }
            let xi_master = projection.xi_master;
            xi_master_guess = xi_master;

            let sf_master = evaluate_shape_functions_and_derivs(xi_master, master.shape, master.ref_length);
            let r_master = calc_interpolation(&master_dofs, &sf_master.n);
            let delta_r = r_slave - r_master;
            let gap = delta_r.norm() - radius_sum;
            if gap >= 0.0 {
                active.push(false);
                continue;
            }

            let r_xi_master = calc_interpolation(&master_dofs, &sf_master.n_xi);
            let r_xixi_master = calc_interpolation(&master_dofs, &sf_master.n_xixi);
            let partials = OrthogonalityPartials::evaluate(
                &projection,
                &delta_r,
                &r_xi_master,
                &r_xixi_master,
                self.projection.nonunique_tolerance,
            )?;
            let (lin_slave, lin_master) =
                calc_linearization_point_to_curve_projection_parameter_coord_master(
                    &partials,
                    &shape_function_matrix(&sf_slave.n),
                    &shape_function_matrix(&sf_master.n),
                    &shape_function_matrix(&sf_master.n_xi),
                );
            let lin_xi_master: DVector<f64> =
                DVector::from_iterator(NDOF, lin_slave.iter().chain(lin_master.iter()).copied());

            let weight = gauss_weight * jacobian;
            self.add_gauss_point_contribution(
                &mut local,
                &dofs,
                &sf_slave,
                master,
                xi_master,
                lin_xi_master.as_slice(),
                radius_sum,
                weight,
            );

            active.push(true);
            contact_points.push(ContactPoint {
                element1: slave.gid,
                element2: master.gid,
                xi1: xi_slave,
                xi2: xi_master,
                position1: Point::from(r_slave),
                position2: Point::from(r_master),
                gap,
                force: self.contact.penalty_parameter * gap.abs(),
                weight,
            });
        }

        self.segments = group_segments(&self.gauss_points, &active);
        self.contact_points = contact_points;

        if self.contact_points.is_empty() {
            Ok(None)
        } else {
            Ok(Some(local))
        }
    }

    fn contact_points(&self) -> &[ContactPoint] {
        &self.contact_points
    }

    fn segments(&self) -> &[Segment] {
        &self.segments
    }

    fn max_segments(&self) -> Option<usize> {
        None
    }
}

/// Group runs of consecutive active Gauss points into segments
fn group_segments(gauss_points: &[f64], active: &[bool]) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut current: Option<Segment> = None;
    for (&xi, &is_active) in gauss_points.iter().zip(active) {
        match (is_active, current.as_mut()) {
            (true, Some(segment)) => segment.xi_end = xi,
            (true, None) => {
                current = Some(Segment {
                    xi_start: xi,
                    xi_end: xi,
                })
            }
            (false, _) => segments.extend(current.take()),
        }
    }
    segments.extend(current);
    segments
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::types::BeamMesh;
    use approx::assert_relative_eq;

    /// Two crossing Line2 beams, the master along x, the slave along y,
    /// with centerlines `offset` apart in z
    fn crossing_beams(offset: f64) -> BeamMesh {
        let mut mesh = BeamMesh::new();
        mesh.add_node(Point::new(0.0, -1.0, offset));
        mesh.add_node(Point::new(0.0, 1.0, offset));
        mesh.add_node(Point::new(-1.0, 0.0, 0.0));
        mesh.add_node(Point::new(1.0, 0.0, 0.0));
        mesh.add_element(BeamElement::new(0, vec![0, 1], CurveShape::Line2, 0.1))
            .unwrap();
        mesh.add_element(BeamElement::new(1, vec![2, 3], CurveShape::Line2, 0.1))
            .unwrap();
        mesh
    }

    fn pair(mesh: &BeamMesh, num_gauss_points: usize) -> BeamToBeamLineContactPair<12> {
        let contact = ContactParameters {
            penalty_parameter: 100.0,
            num_gauss_points,
        };
        BeamToBeamLineContactPair::new(
            mesh.element(0).unwrap(),
            mesh.element(1).unwrap(),
            &contact,
            &ProjectionParameters::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_separated_beams_are_inactive() {
        let mesh = crossing_beams(0.5);
        let mut pair = pair(&mesh, 5);
        pair.setup(&mesh).unwrap();
        assert!(pair.evaluate(&mesh).unwrap().is_none());
        assert!(pair.contact_points().is_empty());
        assert!(pair.segments().is_empty());
    }

    #[test]
    fn test_penetrating_beams_push_apart() {
        // odd Gauss rule: the middle point sits exactly above the crossing
        let mesh = crossing_beams(0.15);
        let mut pair = pair(&mesh, 3);
        pair.setup(&mesh).unwrap();
        let local = pair.evaluate(&mesh).unwrap().unwrap();

        assert_eq!(pair.contact_points().len(), 1);
        let point = &pair.contact_points()[0];
        assert_relative_eq!(point.gap, -0.05, epsilon = 1e-12);
        assert_relative_eq!(point.xi1, 0.0, epsilon = 1e-12);
        assert_relative_eq!(point.xi2, 0.0, epsilon = 1e-10);
        assert_eq!(pair.segments().len(), 1);

        // the potential gradient on the slave points towards the master
        let slave_z = local.force[2] + local.force[5];
        let master_z = local.force[8] + local.force[11];
        assert!(slave_z < 0.0);
        assert_relative_eq!(slave_z, -master_z, epsilon = 1e-12);

        // weight 8/9 from the 3-point rule, Jacobian 1
        assert_relative_eq!(slave_z, 100.0 * (-0.05) * 8.0 / 9.0, epsilon = 1e-12);
    }

    #[test]
    fn test_stiffness_is_symmetric_and_consistent() {
        let mut mesh = crossing_beams(0.12);
        mesh.set_node_position(0, Point::new(0.05, -1.0, 0.13)).unwrap();
        let mut pair = pair(&mesh, 5);
        pair.setup(&mesh).unwrap();
        let local = pair.evaluate(&mesh).unwrap().unwrap();

        for i in 0..12 {
            for j in 0..12 {
                assert_relative_eq!(
                    local.stiffness[(i, j)],
                    local.stiffness[(j, i)],
                    epsilon = 1e-8
                );
            }
        }

        // finite differences of the force in each position DOF
        let h = 1e-7;
        for dof in 0..12 {
            let node = dof / 3;
            let dim = dof % 3;
            let original = mesh.nodes[node];

            let mut plus = original;
            plus[dim] += h;
            mesh.set_node_position(node, plus).unwrap();
            let f_plus = pair.evaluate(&mesh).unwrap().unwrap().force;

            let mut minus = original;
            minus[dim] -= h;
            mesh.set_node_position(node, minus).unwrap();
            let f_minus = pair.evaluate(&mesh).unwrap().unwrap().force;

            mesh.set_node_position(node, original).unwrap();

            for i in 0..12 {
                let fd = (f_plus[i] - f_minus[i]) / (2.0 * h);
                assert_relative_eq!(local.stiffness[(i, dof)], fd, epsilon = 1e-4);
            }
        }
    }

    #[test]
    fn test_changed_element_type_is_rejected() {
        let mut mesh = crossing_beams(0.15);
        let mut pair = pair(&mesh, 3);
        mesh.remove_element(1);
        mesh.add_node(Point::new(0.0, 0.0, 0.0));
        mesh.add_element(BeamElement::new(1, vec![2, 3, 4], CurveShape::Line3, 0.1))
            .unwrap();
        assert!(matches!(
            pair.setup(&mesh),
            Err(crate::error::ContactSearchError::InvalidElementType { .. })
        ));
    }

    #[test]
    fn test_group_segments() {
        let xi = [-0.8, -0.4, 0.0, 0.4, 0.8];
        let segments = group_segments(&xi, &[true, true, false, true, false]);
        assert_eq!(
            segments,
            vec![
                Segment {
                    xi_start: -0.8,
                    xi_end: -0.4
                },
                Segment {
                    xi_start: 0.4,
                    xi_end: 0.4
                },
            ]
        );
    }
}
