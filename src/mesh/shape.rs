//! Curve shape functions
//!
//! Every supported shape function is a polynomial in the element parameter
//! `xi in [-1, 1]`. The coefficients are computed in `f64` and evaluated in any
//! [`FadScalar`], so the same code yields plain values and derivative-carrying
//! values.

use crate::fad::FadScalar;
use crate::mesh::types::CurveShape;
use nalgebra::{DMatrix, DVector, Vector3};

/// Shape function values and their first three derivatives at one parameter coordinate
#[derive(Debug, Clone)]
pub struct ShapeFunctions<T> {
    /// Values
    pub n: Vec<T>,
    /// First derivatives
    pub n_xi: Vec<T>,
    /// Second derivatives
    pub n_xixi: Vec<T>,
    /// Third derivatives
    pub n_xixixi: Vec<T>,
}

/// Parameter coordinates of Lagrange nodes, end nodes first
pub fn lagrange_node_coordinates(shape: CurveShape) -> &'static [f64] {
    match shape {
        CurveShape::Line2 | CurveShape::Hermite2 => &[-1.0, 1.0],
        CurveShape::Line3 => &[-1.0, 1.0, 0.0],
        CurveShape::Line4 => &[-1.0, 1.0, -1.0 / 3.0, 1.0 / 3.0],
        CurveShape::Line5 => &[-1.0, 1.0, 0.0, -0.5, 0.5],
    }
}

/// Monomial coefficients (ascending powers) of every shape function
///
/// Hermite tangent functions scale with half the element length, so that the
/// nodal tangents are derivatives with respect to arc length.
pub fn shape_polynomials(shape: CurveShape, ref_length: f64) -> Vec<Vec<f64>> {
    match shape {
        CurveShape::Hermite2 => {
            let l = ref_length / 8.0;
            vec![
                vec![0.5, -0.75, 0.0, 0.25],
                vec![l, -l, -l, l],
                vec![0.5, 0.75, 0.0, -0.25],
                vec![-l, -l, l, l],
            ]
        }
        _ => {
            let nodes = lagrange_node_coordinates(shape);
            (0..nodes.len())
                .map(|i| lagrange_polynomial(nodes, i))
                .collect()
        }
    }
}

fn lagrange_polynomial(nodes: &[f64], i: usize) -> Vec<f64> {
    let mut coeffs = vec![1.0];
    for (j, &xj) in nodes.iter().enumerate() {
        if j == i {
            continue;
        }
        let denom = nodes[i] - xj;
        // multiply by (xi - xj) / denom
        let mut next = vec![0.0; coeffs.len() + 1];
        for (k, c) in coeffs.iter().enumerate() {
            next[k + 1] += c / denom;
            next[k] -= c * xj / denom;
        }
        coeffs = next;
    }
    coeffs
}

fn derivative(coeffs: &[f64]) -> Vec<f64> {
    coeffs
        .iter()
        .enumerate()
        .skip(1)
        .map(|(k, c)| k as f64 * c)
        .collect()
}

fn horner<T: FadScalar>(coeffs: &[f64], xi: T) -> T {
    coeffs
        .iter()
        .rev()
        .fold(T::zero(), |acc, &c| acc * xi + T::from(c))
}

/// Evaluate shape functions and derivatives up to third order
pub fn evaluate_shape_functions_and_derivs<T: FadScalar>(
    xi: T,
    shape: CurveShape,
    ref_length: f64,
) -> ShapeFunctions<T> {
    let polys = shape_polynomials(shape, ref_length);
    let count = polys.len();
    let mut result = ShapeFunctions {
        n: Vec::with_capacity(count),
        n_xi: Vec::with_capacity(count),
        n_xixi: Vec::with_capacity(count),
        n_xixixi: Vec::with_capacity(count),
    };
    for p in &polys {
        let d1 = derivative(p);
        let d2 = derivative(&d1);
        let d3 = derivative(&d2);
        result.n.push(horner(p, xi));
        result.n_xi.push(horner(&d1, xi));
        result.n_xixi.push(horner(&d2, xi));
        result.n_xixixi.push(horner(&d3, xi));
    }
    result
}

/// Interpolate a centerline quantity: `sum_k N_k * dofs[3k..3k+3]`
pub fn calc_interpolation<T, S>(dofs: &DVector<S>, n_i: &[T]) -> Vector3<T>
where
    T: FadScalar,
    S: Into<T> + Copy + nalgebra::Scalar,
{
    let mut r = Vector3::zeros();
    for (k, nk) in n_i.iter().enumerate() {
        for d in 0..3 {
            let value: T = dofs[3 * k + d].into();
            r[d] += *nk * value;
        }
    }
    r
}

/// Interpolate with FAD-valued DOFs
pub fn calc_interpolation_fad<T: FadScalar>(dofs: &[T], n_i: &[T]) -> Vector3<T> {
    let mut r = Vector3::zeros();
    for (k, nk) in n_i.iter().enumerate() {
        for d in 0..3 {
            r[d] += *nk * dofs[3 * k + d];
        }
    }
    r
}

/// Shape function matrix `N (3 x 3n)` such that `r = N * dofs`
pub fn shape_function_matrix<T: FadScalar>(n_i: &[T]) -> DMatrix<T> {
    let mut n = DMatrix::zeros(3, 3 * n_i.len());
    for (k, nk) in n_i.iter().enumerate() {
        for d in 0..3 {
            n[(d, 3 * k + d)] = *nk;
        }
    }
    n
}

fn binomial(n: usize, k: usize) -> f64 {
    (0..k).fold(1.0, |acc, i| acc * (n - i) as f64 / (i + 1) as f64)
}

/// Bernstein control points of an element centerline
///
/// The centerline is a polynomial of degree `p` in `xi`. Rewritten in the
/// Bernstein basis on `t = (xi + 1) / 2` its `p + 1` control points form a
/// polygon whose convex hull contains the whole curve, including any bulge
/// between the nodes. The first and last control point are the end positions.
pub fn bernstein_control_points(
    dofs: &DVector<f64>,
    shape: CurveShape,
    ref_length: f64,
) -> Vec<Vector3<f64>> {
    let polys = shape_polynomials(shape, ref_length);
    let degree = polys.iter().map(|p| p.len()).max().unwrap_or(1).saturating_sub(1);

    // monomial coefficients in xi
    let mut c = vec![Vector3::zeros(); degree + 1];
    for (k, poly) in polys.iter().enumerate() {
        let d = Vector3::new(dofs[3 * k], dofs[3 * k + 1], dofs[3 * k + 2]);
        for (m, coeff) in poly.iter().enumerate() {
            c[m] += d * *coeff;
        }
    }

    // xi = 2t - 1
    let mut a = vec![Vector3::zeros(); degree + 1];
    for (m, cm) in c.iter().enumerate() {
        for (i, ai) in a.iter_mut().enumerate().take(m + 1) {
            let sign = if (m - i) % 2 == 0 { 1.0 } else { -1.0 };
            *ai += cm * (sign * binomial(m, i) * 2f64.powi(i as i32));
        }
    }

    (0..=degree)
        .map(|j| {
            (0..=j).fold(Vector3::zeros(), |acc, i| {
                acc + a[i] * (binomial(j, i) / binomial(degree, i))
            })
        })
        .collect()
}
