//! Penalty point coupling between two beam elements
//!
//! Ties the centerline point `r_1(xi_1)` of one element to `r_2(xi_2)` of
//! another with the penalty potential `1/2 * eps * |r_1 - r_2|^2`. A pair
//! supports exactly one coupling point.

use crate::contact::pair::{check_element, check_pair_dofs, ContactPair};
use crate::contact::types::{ContactPoint, LocalContribution, Segment};
use crate::error::{ContactSearchError, Result};
use crate::fad::{Fad, FadScalar};
use crate::mesh::shape::{calc_interpolation, calc_interpolation_fad, evaluate_shape_functions_and_derivs};
use crate::mesh::types::{BeamElement, CurveShape, Discretization, Point};

/// Penalty point coupling pair over `NDOF` = DOFs of element 1 + DOFs of element 2
#[derive(Debug, Clone)]
pub struct BeamToBeamPointCouplingPair<const NDOF: usize> {
    element1: usize,
    element2: usize,
    shape1: CurveShape,
    shape2: CurveShape,
    penalty_parameter: f64,
    coupling_points: Vec<(f64, f64)>,
    contact_points: Vec<ContactPoint>,
    segments: Vec<Segment>,
}

impl<const NDOF: usize> BeamToBeamPointCouplingPair<NDOF> {
    pub fn new(
        element1: &BeamElement,
        element2: &BeamElement,
        penalty_parameter: f64,
        coupling_points: Vec<(f64, f64)>,
    ) -> Result<Self> {
        check_pair_dofs(element1, element2, NDOF)?;
        Ok(Self {
            element1: element1.gid,
            element2: element2.gid,
            shape1: element1.shape,
            shape2: element2.shape,
            penalty_parameter,
            coupling_points,
            contact_points: Vec::new(),
            segments: Vec::new(),
        })
    }

    fn elements<'a>(
        &self,
        disc: &'a dyn Discretization,
    ) -> Result<(&'a BeamElement, &'a BeamElement)> {
        let e1 = check_element(disc, self.element1, self.shape1)?;
        let e2 = check_element(disc, self.element2, self.shape2)?;
        check_pair_dofs(e1, e2, NDOF)?;
        Ok((e1, e2))
    }
}

impl<const NDOF: usize> ContactPair for BeamToBeamPointCouplingPair<NDOF> {
    fn element_gids(&self) -> (usize, usize) {
        (self.element1, self.element2)
    }

    fn setup(&mut self, disc: &dyn Discretization) -> Result<()> {
        self.elements(disc)?;

        if self.coupling_points.len() > 1 {
            return Err(ContactSearchError::TooManySegments {
                element1: self.element1,
                element2: self.element2,
                found: self.coupling_points.len(),
            });
        }
        if let Some(&(xi1, xi2)) = self
            .coupling_points
            .iter()
            .find(|(xi1, xi2)| xi1.abs() > 1.0 || xi2.abs() > 1.0)
        {
            return Err(ContactSearchError::ConfigError(format!(
                "Coupling point ({}, {}) between elements {} and {} lies outside [-1, 1]",
                xi1, xi2, self.element1, self.element2
            )));
        }

        self.segments = self
            .coupling_points
            .iter()
            .map(|&(xi1, _)| Segment {
                xi_start: xi1,
                xi_end: xi1,
            })
            .collect();
        self.contact_points.clear();
        Ok(())
    }

    fn evaluate(&mut self, disc: &dyn Discretization) -> Result<Option<LocalContribution>> {
        let (e1, e2) = self.elements(disc)?;
        let Some(&(xi1, xi2)) = self.coupling_points.first() else {
            self.contact_points.clear();
            return Ok(None);
        };

        let dofs1 = disc.element_dof_values(e1.gid)?;
        let dofs2 = disc.element_dof_values(e2.gid)?;
        let mut dof_gids = disc.element_dof_gids(e1.gid)?;
        dof_gids.extend(disc.element_dof_gids(e2.gid)?);
        let n1 = dofs1.len();

        let dofs_fad: Vec<Fad<NDOF>> = dofs1
            .iter()
            .chain(dofs2.iter())
            .enumerate()
            .map(|(i, &value)| Fad::variable(value, i))
            .collect();

        let sf1 = evaluate_shape_functions_and_derivs(xi1, e1.shape, e1.ref_length);
        let sf2 = evaluate_shape_functions_and_derivs(xi2, e2.shape, e2.ref_length);
        let n1_fad: Vec<Fad<NDOF>> = sf1.n.iter().map(|&v| Fad::from(v)).collect();
        let n2_fad: Vec<Fad<NDOF>> = sf2.n.iter().map(|&v| Fad::from(v)).collect();

        let delta_r = calc_interpolation_fad(&dofs_fad[..n1], &n1_fad)
            - calc_interpolation_fad(&dofs_fad[n1..], &n2_fad);
        let penalty = Fad::<NDOF>::from(self.penalty_parameter);

        let mut local = LocalContribution::zeros(dof_gids);
        let mut index = 0;
        for (sign, shape_values) in [(1.0, &n1_fad), (-1.0, &n2_fad)] {
            for n_k in shape_values.iter() {
                for d in 0..3 {
                    let f = penalty * Fad::from(sign) * *n_k * delta_r[d];
                    local.force[index] = f.value();
                    for j in 0..NDOF {
                        local.stiffness[(index, j)] = f.dx(j);
                    }
                    index += 1;
                }
            }
        }

        let r1 = calc_interpolation(&dofs1, &sf1.n);
        let r2 = calc_interpolation(&dofs2, &sf2.n);
        let distance = (r1 - r2).norm();
        self.contact_points = vec![ContactPoint {
            element1: e1.gid,
            element2: e2.gid,
            xi1,
            xi2,
            position1: Point::from(r1),
            position2: Point::from(r2),
            gap: distance,
            force: self.penalty_parameter * distance,
            weight: 1.0,
        }];

        Ok(Some(local))
    }

    fn contact_points(&self) -> &[ContactPoint] {
        &self.contact_points
    }

    fn segments(&self) -> &[Segment] {
        &self.segments
    }

    fn max_segments(&self) -> Option<usize> {
        Some(1)
    }
}
