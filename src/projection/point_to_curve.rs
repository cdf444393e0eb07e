//! Newton projection of a point onto a parametrized curve
//!
//! The closest point `r(xi)` on the curve satisfies the orthogonality condition
//! `(r_slave - r(xi)) . r_xi(xi) = 0`. The condition is scaled by the current
//! distance for conditioning and solved with a plain Newton iteration.

use crate::config::{ProjectionParameters, Verbosity};
use crate::error::{ContactSearchError, Result};
use crate::fad::FadScalar;
use crate::mesh::geometry::vector_norm;
use crate::mesh::shape::{calc_interpolation, evaluate_shape_functions_and_derivs};
use crate::mesh::types::CurveShape;
use nalgebra::{DVector, Vector3};

/// Outcome of a point-to-curve projection
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointToCurveProjection<T> {
    /// Parameter coordinate of the closest point on the master curve
    pub xi_master: T,

    /// `false` if the iteration budget ran out; the pair must then be treated
    /// as non-interacting by the caller
    pub converged: bool,

    /// Newton iterations performed
    pub iterations: usize,

    /// Scaled residual of the last evaluation
    pub residual: f64,

    /// Scaled residual of the first evaluation
    pub residual0: f64,
}

/// Orthogonality condition scaled by the distance: `-(delta_r . r_xi) / |delta_r|`
///
/// `norm_delta_r` is a plain value; it only scales the equation and is not
/// linearized.
pub fn evaluate_point_to_curve_orthogonality_condition<T: FadScalar>(
    delta_r: &Vector3<T>,
    norm_delta_r: f64,
    r_xi_master: &Vector3<T>,
) -> T {
    -(delta_r.dot(r_xi_master)) / T::from(norm_delta_r)
}

/// Derivative of the scaled orthogonality condition with respect to `xi_master`
///
/// Returns `None` if its magnitude is below `nonunique_tolerance`, i.e. the
/// minimal distance problem has no locally unique solution (e.g. the point
/// sits at the center of a circular arc).
pub fn evaluate_linearization_point_to_curve_orthogonality_condition<T: FadScalar>(
    delta_r: &Vector3<T>,
    norm_delta_r: f64,
    r_xi_master: &Vector3<T>,
    r_xixi_master: &Vector3<T>,
    nonunique_tolerance: f64,
) -> Option<T> {
    let df = (r_xi_master.dot(r_xi_master) - delta_r.dot(r_xixi_master)) / T::from(norm_delta_r);
    if df.value().abs() < nonunique_tolerance {
        None
    } else {
        Some(df)
    }
}

/// Project `r_slave` onto the master curve
///
/// Starts at `xi_master_initial_guess` and iterates until both the
/// length-scaled residual and the last increment are below their tolerances.
/// A point on the curve or a vanishing linearization is an error; running out
/// of iterations is not, and is reported through
/// [`PointToCurveProjection::converged`].
pub fn point_to_curve_projection<T: FadScalar>(
    r_slave: &Vector3<T>,
    xi_master_initial_guess: f64,
    master_dofs: &DVector<T>,
    master_shape: CurveShape,
    master_ref_length: f64,
    params: &ProjectionParameters,
) -> Result<PointToCurveProjection<T>> {
    if master_dofs.len() != master_shape.num_dofs() {
        return Err(ContactSearchError::InvalidElementType {
            expected: format!("{} with {} DOFs", master_shape, master_shape.num_dofs()),
            found: format!("{} DOFs", master_dofs.len()),
        });
    }

    let debug = params.verbosity == Verbosity::Debug;
    let mut xi_master = T::from(xi_master_initial_guess);
    let mut xi_master_previous = xi_master_initial_guess;
    let mut residual = 0.0;
    let mut residual0 = 0.0;

    for iter in 0..params.max_iterations {
        let shape = evaluate_shape_functions_and_derivs(xi_master, master_shape, master_ref_length);
        let r_master = calc_interpolation(master_dofs, &shape.n);
        let r_xi_master = calc_interpolation(master_dofs, &shape.n_xi);
        let r_xixi_master = calc_interpolation(master_dofs, &shape.n_xixi);

        let delta_r = r_slave - r_master;
        let norm_delta_r = vector_norm(&delta_r).value();

        if norm_delta_r < params.identical_points_tolerance {
            return Err(ContactSearchError::IdenticalPoints {
                iteration: iter,
                xi_master: xi_master.value(),
                distance: norm_delta_r,
            });
        }

        let f = evaluate_point_to_curve_orthogonality_condition(&delta_r, norm_delta_r, &r_xi_master);

        // r_xi scales with the element length
        residual = (f.value() / master_ref_length).abs();
        if iter == 0 {
            residual0 = residual;
        }

        if residual < params.tolerance_residual
            && (xi_master_previous - xi_master.value()).abs() < params.tolerance_increment
        {
            if debug {
                log::debug!(
                    "Point-to-curve projection: local Newton loop converged after {} iterations",
                    iter
                );
            }
            return Ok(PointToCurveProjection {
                xi_master,
                converged: true,
                iterations: iter,
                residual,
                residual0,
            });
        }

        let df = evaluate_linearization_point_to_curve_orthogonality_condition(
            &delta_r,
            norm_delta_r,
            &r_xi_master,
            &r_xixi_master,
            params.nonunique_tolerance,
        )
        .ok_or_else(|| ContactSearchError::NonUniqueProjection {
            iteration: iter,
            xi_master: xi_master.value(),
            linearization: (r_xi_master.dot(&r_xi_master) - delta_r.dot(&r_xixi_master)).value()
                / norm_delta_r,
        })?;

        xi_master_previous = xi_master.value();
        xi_master += -f / df;
    }

    if debug {
        log::debug!(
            "Point-to-curve projection: local Newton loop unconverged after {} iterations \
             (residual0 = {:e}, residual = {:e}, xi_master = {}, xi_master_previous = {})",
            params.max_iterations,
            residual0,
            residual,
            xi_master.value(),
            xi_master_previous
        );
    }

    Ok(PointToCurveProjection {
        xi_master,
        converged: false,
        iterations: params.max_iterations,
        residual,
        residual0,
    })
}
