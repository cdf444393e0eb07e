//! Geometric helpers that work on plain and derivative-carrying vectors

use crate::error::{ContactSearchError, Result};
use crate::fad::FadScalar;
use crate::mesh::types::Point;
use nalgebra::Vector3;

/// Vectors shorter than this have no direction
pub const ZERO_VECTOR_TOLERANCE: f64 = 1.0e-12;

/// Euclidean norm for any [`FadScalar`]
///
/// nalgebra's `norm` needs a complex field; derivative types only provide the
/// operations of [`FadScalar`].
pub fn vector_norm<T: FadScalar>(v: &Vector3<T>) -> T {
    v.dot(v).sqrt()
}

/// Enclosed angle between two lines with direction `a` and `b`
///
/// Directions are unsigned, so the angle lies in `[0, pi/2]`. Returns the
/// angle and its cosine.
pub fn calc_enclosed_angle<T: FadScalar>(a: &Vector3<T>, b: &Vector3<T>) -> Result<(T, T)> {
    let norm_a = vector_norm(a);
    let norm_b = vector_norm(b);
    if norm_a.value() < ZERO_VECTOR_TOLERANCE || norm_b.value() < ZERO_VECTOR_TOLERANCE {
        return Err(ContactSearchError::GeometryError(
            "Cannot determine the enclosed angle of a zero vector".to_string(),
        ));
    }

    let cos = (a.dot(b) / (norm_a * norm_b)).abs();
    // rounding can push the cosine to one or above; the derivative is lost there
    let angle = if cos.value() < 1.0 { cos.acos() } else { T::zero() };

    if angle.value() < 0.0 || angle.value() > std::f64::consts::FRAC_PI_2 {
        return Err(ContactSearchError::GeometryError(format!(
            "Enclosed angle {} outside [0, pi/2]",
            angle.value()
        )));
    }
    Ok((angle, cos))
}

/// Compute the distance between two points
pub fn distance(p1: &Point, p2: &Point) -> f64 {
    (p2 - p1).norm()
}

/// Centroid of a set of points, `None` for an empty set
pub fn centroid(points: &[Point]) -> Option<Point> {
    if points.is_empty() {
        return None;
    }
    let sum = points
        .iter()
        .fold(Vector3::zeros(), |acc: Vector3<f64>, p| acc + p.coords);
    Some(Point::from(sum / points.len() as f64))
}
