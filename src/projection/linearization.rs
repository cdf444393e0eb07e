//! Sensitivities of the projected parameter coordinate
//!
//! Once a point-to-curve projection has converged, the parameter coordinate
//! `xi_master` is an implicit function of the slave point and the master
//! curve. Its derivatives follow from the implicit function theorem applied to
//! the (unscaled) orthogonality condition `g = delta_r . r_xi_master = 0`:
//!
//! `d xi_master / d (.) = -(1 / dg/dxi_master) * dg/d(.)`
//!
//! Everything here is closed-form linear algebra on 3-vectors and `3 x n`
//! shape function matrices, generic over [`FadScalar`].

use crate::error::{ContactSearchError, Result};
use crate::fad::FadScalar;
use crate::projection::point_to_curve::PointToCurveProjection;
use nalgebra::{DMatrix, DVector, Matrix3, RowVector3, Vector3};

/// `dg / d xi_master = -r_xi . r_xi + delta_r . r_xixi`
///
/// Returns `None` if the magnitude is below `nonunique_tolerance`.
pub fn calc_ptc_orthogonality_condition_partial_deriv_parameter_coord_master<T: FadScalar>(
    delta_r: &Vector3<T>,
    r_xi_master: &Vector3<T>,
    r_xixi_master: &Vector3<T>,
    nonunique_tolerance: f64,
) -> Option<T> {
    let partial = -r_xi_master.dot(r_xi_master) + delta_r.dot(r_xixi_master);
    if partial.value().abs() < nonunique_tolerance {
        None
    } else {
        Some(partial)
    }
}

/// `dg / d r_slave = r_xi^T`
pub fn calc_ptc_orthogonality_condition_partial_deriv_cl_pos_slave<T: FadScalar>(
    r_xi_master: &Vector3<T>,
) -> RowVector3<T> {
    r_xi_master.transpose()
}

/// `dg / d r_master = -r_xi^T`
pub fn calc_ptc_orthogonality_condition_partial_deriv_cl_pos_master<T: FadScalar>(
    r_xi_master: &Vector3<T>,
) -> RowVector3<T> {
    -r_xi_master.transpose()
}

/// `dg / d r_xi_master = delta_r^T`
pub fn calc_ptc_orthogonality_condition_partial_deriv_cl_tangent_master<T: FadScalar>(
    delta_r: &Vector3<T>,
) -> RowVector3<T> {
    delta_r.transpose()
}

/// All partial derivatives of the orthogonality condition at a converged projection
#[derive(Debug, Clone, PartialEq)]
pub struct OrthogonalityPartials<T: FadScalar> {
    /// With respect to `xi_master`; never below the nonuniqueness tolerance
    pub xi_master: T,
    pub r_slave: RowVector3<T>,
    pub r_master: RowVector3<T>,
    pub r_xi_master: RowVector3<T>,
}

impl<T: FadScalar> OrthogonalityPartials<T> {
    /// Evaluate the partials at the projected point
    ///
    /// A vanishing `dg / d xi_master` is reported as
    /// [`ContactSearchError::NonUniqueProjection`].
    pub fn evaluate(
        projection: &PointToCurveProjection<T>,
        delta_r: &Vector3<T>,
        r_xi_master: &Vector3<T>,
        r_xixi_master: &Vector3<T>,
        nonunique_tolerance: f64,
    ) -> Result<Self> {
        let xi_master = calc_ptc_orthogonality_condition_partial_deriv_parameter_coord_master(
            delta_r,
            r_xi_master,
            r_xixi_master,
            nonunique_tolerance,
        )
        .ok_or_else(|| ContactSearchError::NonUniqueProjection {
            iteration: projection.iterations,
            xi_master: projection.xi_master.value(),
            linearization: (-r_xi_master.dot(r_xi_master) + delta_r.dot(r_xixi_master)).value(),
        })?;

        Ok(Self {
            xi_master,
            r_slave: calc_ptc_orthogonality_condition_partial_deriv_cl_pos_slave(r_xi_master),
            r_master: calc_ptc_orthogonality_condition_partial_deriv_cl_pos_master(r_xi_master),
            r_xi_master: calc_ptc_orthogonality_condition_partial_deriv_cl_tangent_master(delta_r),
        })
    }
}

fn row_times_matrix<T: FadScalar>(row: &RowVector3<T>, m: &DMatrix<T>, scale: T) -> DVector<T> {
    DVector::from_fn(m.ncols(), |j, _| {
        let mut sum = T::zero();
        for d in 0..3 {
            sum += row[d] * m[(d, j)];
        }
        sum * scale
    })
}

/// Linearization of `xi_master` with respect to the slave and master element DOFs
///
/// `n_slave` maps the slave element DOFs to the slave point, `n_master` and
/// `n_xi_master` map the master element DOFs to the master point and tangent
/// at the projection. All three are `3 x ndof`.
///
/// Returns `(lin_xi_master_slave_dofs, lin_xi_master_master_dofs)`.
pub fn calc_linearization_point_to_curve_projection_parameter_coord_master<T: FadScalar>(
    partials: &OrthogonalityPartials<T>,
    n_slave: &DMatrix<T>,
    n_master: &DMatrix<T>,
    n_xi_master: &DMatrix<T>,
) -> (DVector<T>, DVector<T>) {
    let scale = -T::one() / partials.xi_master;

    let lin_slave = row_times_matrix(&partials.r_slave, n_slave, scale);
    let lin_master = row_times_matrix(&partials.r_master, n_master, scale)
        + row_times_matrix(&partials.r_xi_master, n_xi_master, scale);

    (lin_slave, lin_master)
}

/// Partial derivatives of `xi_master` w.r.t. slave point, master point and master tangent
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterCoordPartialDerivs<T: FadScalar> {
    pub r_slave: RowVector3<T>,
    pub r_master: RowVector3<T>,
    pub r_xi_master: RowVector3<T>,
}

pub fn calc_point_to_curve_projection_parameter_coord_master_partial_derivs<T: FadScalar>(
    partials: &OrthogonalityPartials<T>,
) -> ParameterCoordPartialDerivs<T> {
    let scale = -T::one() / partials.xi_master;
    ParameterCoordPartialDerivs {
        r_slave: partials.r_slave * scale,
        r_master: partials.r_master * scale,
        r_xi_master: partials.r_xi_master * scale,
    }
}

/// Total derivatives of `delta_r = r_slave - r_master(xi_master)`
///
/// The master point slides along the curve as `xi_master` follows the
/// projection, hence the `r_xi (x) d xi_master / d (.)` terms.
#[derive(Debug, Clone, PartialEq)]
pub struct DeltaRDerivs<T: FadScalar> {
    pub r_slave: Matrix3<T>,
    pub r_master: Matrix3<T>,
    pub r_xi_master: Matrix3<T>,
}

pub fn calc_delta_r_derivs<T: FadScalar>(
    r_xi_master: &Vector3<T>,
    xi_master_partials: &ParameterCoordPartialDerivs<T>,
) -> DeltaRDerivs<T> {
    let identity = Matrix3::<T>::identity();
    DeltaRDerivs {
        r_slave: identity - r_xi_master * xi_master_partials.r_slave,
        r_master: -identity - r_xi_master * xi_master_partials.r_master,
        r_xi_master: -(r_xi_master * xi_master_partials.r_xi_master),
    }
}

/// Second partial derivatives of `xi_master`
///
/// Block `a_b` is the derivative of `d xi_master / d a` (as a column) with
/// respect to `b`, where `a` and `b` range over the slave point, the master
/// point and the master tangent and curvature vectors.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterCoordPartial2ndDerivs<T: FadScalar> {
    pub r_slave_r_slave: Matrix3<T>,
    pub r_slave_r_master: Matrix3<T>,
    pub r_slave_r_xi_master: Matrix3<T>,
    pub r_slave_r_xixi_master: Matrix3<T>,
    pub r_master_r_slave: Matrix3<T>,
    pub r_master_r_master: Matrix3<T>,
    pub r_master_r_xi_master: Matrix3<T>,
    pub r_master_r_xixi_master: Matrix3<T>,
    pub r_xi_master_r_slave: Matrix3<T>,
    pub r_xi_master_r_master: Matrix3<T>,
    pub r_xi_master_r_xi_master: Matrix3<T>,
    pub r_xi_master_r_xixi_master: Matrix3<T>,
    pub r_xixi_master_r_slave: Matrix3<T>,
    pub r_xixi_master_r_master: Matrix3<T>,
    pub r_xixi_master_r_xi_master: Matrix3<T>,
}

impl<T: FadScalar> ParameterCoordPartial2ndDerivs<T> {
    fn zeros() -> Self {
        Self {
            r_slave_r_slave: Matrix3::zeros(),
            r_slave_r_master: Matrix3::zeros(),
            r_slave_r_xi_master: Matrix3::zeros(),
            r_slave_r_xixi_master: Matrix3::zeros(),
            r_master_r_slave: Matrix3::zeros(),
            r_master_r_master: Matrix3::zeros(),
            r_master_r_xi_master: Matrix3::zeros(),
            r_master_r_xixi_master: Matrix3::zeros(),
            r_xi_master_r_slave: Matrix3::zeros(),
            r_xi_master_r_master: Matrix3::zeros(),
            r_xi_master_r_xi_master: Matrix3::zeros(),
            r_xi_master_r_xixi_master: Matrix3::zeros(),
            r_xixi_master_r_slave: Matrix3::zeros(),
            r_xixi_master_r_master: Matrix3::zeros(),
            r_xixi_master_r_xi_master: Matrix3::zeros(),
        }
    }
}

/// Add `tmp (x) d xi_master / d (.)` to the three blocks of one row
fn add_chain_rule_row<T: FadScalar>(
    blocks: [&mut Matrix3<T>; 3],
    tmp: &Vector3<T>,
    xi_master_partials: &ParameterCoordPartialDerivs<T>,
) {
    let [slave, master, xi] = blocks;
    *slave += tmp * xi_master_partials.r_slave;
    *master += tmp * xi_master_partials.r_master;
    *xi += tmp * xi_master_partials.r_xi_master;
}

/// Second derivatives of `xi_master` for consistent stiffness contributions
///
/// Built in four passes:
/// 1. explicit derivatives w.r.t. master point, tangent and curvature vectors,
/// 2. chain rule contributions through `xi_master` of those vectors,
/// 3. contributions through `delta_r`, whose derivatives already carry the
///    dependence on `xi_master`,
/// 4. linearization of the variations of `r_master` and `r_xi_master`.
pub fn calc_point_to_curve_projection_parameter_coord_master_partial_2nd_derivs<T: FadScalar>(
    partials: &OrthogonalityPartials<T>,
    xi_master_partials: &ParameterCoordPartialDerivs<T>,
    delta_r_derivs: &DeltaRDerivs<T>,
    delta_r: &Vector3<T>,
    r_xi_master: &Vector3<T>,
    r_xixi_master: &Vector3<T>,
    r_xixixi_master: &Vector3<T>,
) -> ParameterCoordPartial2ndDerivs<T> {
    let inv = T::one() / partials.xi_master;
    let inv2 = inv * inv;

    let r_xi_r_xi = r_xi_master * r_xi_master.transpose();
    let r_xi_r_xixi = r_xi_master * r_xixi_master.transpose();
    let r_xi_delta_r = r_xi_master * delta_r.transpose();
    let delta_r_r_xixi = delta_r * r_xixi_master.transpose();
    let delta_r_delta_r = delta_r * delta_r.transpose();

    let mut d = ParameterCoordPartial2ndDerivs::zeros();

    // 1)
    d.r_slave_r_xi_master = r_xi_r_xi * (T::from(-2.0) * inv2) - Matrix3::<T>::identity() * inv;
    d.r_master_r_xi_master = -d.r_slave_r_xi_master;
    d.r_slave_r_xixi_master = r_xi_delta_r * inv2;
    d.r_master_r_xixi_master = -d.r_slave_r_xixi_master;
    d.r_xi_master_r_xi_master = r_xi_delta_r.transpose() * (T::from(-2.0) * inv2);
    d.r_xi_master_r_xixi_master = delta_r_delta_r * inv2;

    // 2)
    let tmp = d.r_slave_r_xi_master * r_xixi_master + d.r_slave_r_xixi_master * r_xixixi_master;
    add_chain_rule_row(
        [
            &mut d.r_slave_r_slave,
            &mut d.r_slave_r_master,
            &mut d.r_slave_r_xi_master,
        ],
        &tmp,
        xi_master_partials,
    );
    let tmp = d.r_master_r_xi_master * r_xixi_master + d.r_master_r_xixi_master * r_xixixi_master;
    add_chain_rule_row(
        [
            &mut d.r_master_r_slave,
            &mut d.r_master_r_master,
            &mut d.r_master_r_xi_master,
        ],
        &tmp,
        xi_master_partials,
    );
    let tmp = d.r_xi_master_r_xi_master * r_xixi_master
        + d.r_xi_master_r_xixi_master * r_xixixi_master;
    add_chain_rule_row(
        [
            &mut d.r_xi_master_r_slave,
            &mut d.r_xi_master_r_master,
            &mut d.r_xi_master_r_xi_master,
        ],
        &tmp,
        xi_master_partials,
    );

    // 3)
    let columns = [
        &delta_r_derivs.r_slave,
        &delta_r_derivs.r_master,
        &delta_r_derivs.r_xi_master,
    ];
    let slave_row = [
        &mut d.r_slave_r_slave,
        &mut d.r_slave_r_master,
        &mut d.r_slave_r_xi_master,
    ];
    for (block, deriv) in slave_row.into_iter().zip(columns) {
        *block += r_xi_r_xixi * deriv * inv2;
    }
    let master_row = [
        &mut d.r_master_r_slave,
        &mut d.r_master_r_master,
        &mut d.r_master_r_xi_master,
    ];
    for (block, deriv) in master_row.into_iter().zip(columns) {
        *block -= r_xi_r_xixi * deriv * inv2;
    }
    let xi_row = [
        &mut d.r_xi_master_r_slave,
        &mut d.r_xi_master_r_master,
        &mut d.r_xi_master_r_xi_master,
    ];
    for (block, deriv) in xi_row.into_iter().zip(columns) {
        *block += deriv * (-inv) + delta_r_r_xixi * deriv * inv2;
    }

    // 4)
    let xi_partials = [
        &xi_master_partials.r_slave,
        &xi_master_partials.r_master,
        &xi_master_partials.r_xi_master,
    ];
    let xi_row = [
        &mut d.r_xi_master_r_slave,
        &mut d.r_xi_master_r_master,
        &mut d.r_xi_master_r_xi_master,
    ];
    for (block, partial) in xi_row.into_iter().zip(xi_partials) {
        *block += r_xi_master * partial * inv;
    }
    let xixi_row = [
        &mut d.r_xixi_master_r_slave,
        &mut d.r_xixi_master_r_master,
        &mut d.r_xixi_master_r_xi_master,
    ];
    for (block, partial) in xixi_row.into_iter().zip(xi_partials) {
        *block -= delta_r * partial * inv;
    }

    d
}
