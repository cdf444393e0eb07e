//! k-DOP bounding volumes
//!
//! A discrete oriented polytope is stored as one `[min, max]` slab per fixed
//! direction. All direction vectors are unit length, so slab widths are
//! lengths and [`BoundingVolume::enlarge`] inflates by exactly `eps` along
//! every direction.

use crate::error::{ContactSearchError, Result};
use crate::mesh::types::{Point, Vec3};
use serde::{Deserialize, Serialize};

const S: f64 = std::f64::consts::FRAC_1_SQRT_2;

const AABB_DIRECTIONS: [[f64; 3]; 3] = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];

const DOP8_DIRECTIONS: [[f64; 3]; 4] = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [S, S, 0.0], [S, -S, 0.0]];

const DOP18_DIRECTIONS: [[f64; 3]; 9] = [
    [1.0, 0.0, 0.0],
    [0.0, 1.0, 0.0],
    [0.0, 0.0, 1.0],
    [S, S, 0.0],
    [S, 0.0, S],
    [0.0, S, S],
    [S, 0.0, -S],
    [S, -S, 0.0],
    [0.0, S, -S],
];

/// Fixed direction set of a bounding volume
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DopKind {
    /// Axis aligned box (3 directions)
    Aabb,
    /// 8-DOP for planar problems (4 directions in the xy-plane)
    Dop8,
    /// 18-DOP (9 directions)
    #[default]
    Dop18,
}

impl DopKind {
    /// Unit direction vectors
    pub fn directions(&self) -> &'static [[f64; 3]] {
        match self {
            DopKind::Aabb => &AABB_DIRECTIONS,
            DopKind::Dop8 => &DOP8_DIRECTIONS,
            DopKind::Dop18 => &DOP18_DIRECTIONS,
        }
    }

    /// Number of polytope faces, i.e. twice the number of directions
    pub fn kdop(&self) -> usize {
        2 * self.directions().len()
    }
}

impl std::str::FromStr for DopKind {
    type Err = ContactSearchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "aabb" | "dop6" => Ok(DopKind::Aabb),
            "dop8" => Ok(DopKind::Dop8),
            "dop18" => Ok(DopKind::Dop18),
            other => Err(ContactSearchError::ConfigError(format!(
                "Unknown bounding volume '{}'. Expected 'aabb', 'dop8' or 'dop18'",
                other
            ))),
        }
    }
}

/// Extent along one direction
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Slab {
    pub min: f64,
    pub max: f64,
}

impl Slab {
    const EMPTY: Slab = Slab {
        min: f64::INFINITY,
        max: f64::NEG_INFINITY,
    };

    /// Width of the slab
    pub fn width(&self) -> f64 {
        self.max - self.min
    }
}

/// Discrete oriented polytope bounding volume
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundingVolume {
    kind: DopKind,
    slabs: Vec<Slab>,
}

impl BoundingVolume {
    /// Create an empty volume (contains nothing, intersects nothing)
    pub fn new(kind: DopKind) -> Self {
        Self {
            kind,
            slabs: vec![Slab::EMPTY; kind.directions().len()],
        }
    }

    /// Smallest volume containing all points
    pub fn from_points<'a, I>(kind: DopKind, points: I) -> Self
    where
        I: IntoIterator<Item = &'a Point>,
    {
        let mut bv = Self::new(kind);
        for p in points {
            bv.add_point(p);
        }
        bv
    }

    /// Direction set of this volume
    pub fn kind(&self) -> DopKind {
        self.kind
    }

    /// Slabs, one per direction
    pub fn slabs(&self) -> &[Slab] {
        &self.slabs
    }

    /// True if no point was added yet
    pub fn is_empty(&self) -> bool {
        self.slabs.iter().any(|s| s.min > s.max)
    }

    /// Projection of a point onto direction `k`
    pub fn project(&self, p: &Point, k: usize) -> f64 {
        let d = self.kind.directions()[k];
        Vec3::new(d[0], d[1], d[2]).dot(&p.coords)
    }

    /// Grow the volume to contain `p`
    pub fn add_point(&mut self, p: &Point) {
        for (k, slab) in self.slabs.iter_mut().enumerate() {
            let d = self.kind.directions()[k];
            let proj = d[0] * p.x + d[1] * p.y + d[2] * p.z;
            slab.min = slab.min.min(proj);
            slab.max = slab.max.max(proj);
        }
    }

    /// Grow the volume to contain `other`
    ///
    /// Volumes of different kinds have no common slabs and are rejected.
    pub fn merge(&mut self, other: &BoundingVolume) -> Result<()> {
        if self.kind != other.kind {
            return Err(ContactSearchError::GeometryError(format!(
                "Cannot merge {:?} into {:?} bounding volume",
                other.kind, self.kind
            )));
        }
        for (a, b) in self.slabs.iter_mut().zip(other.slabs.iter()) {
            a.min = a.min.min(b.min);
            a.max = a.max.max(b.max);
        }
        Ok(())
    }

    /// Merged copy
    pub fn merged(&self, other: &BoundingVolume) -> Result<Self> {
        let mut bv = self.clone();
        bv.merge(other)?;
        Ok(bv)
    }

    /// Inflate every slab by `eps` on both sides; negative `eps` is treated as zero
    pub fn enlarge(&mut self, eps: f64) {
        if self.is_empty() {
            return;
        }
        let eps = eps.max(0.0);
        for slab in &mut self.slabs {
            slab.min -= eps;
            slab.max += eps;
        }
    }

    /// Enlarged copy
    pub fn enlarged(&self, eps: f64) -> Self {
        let mut bv = self.clone();
        bv.enlarge(eps);
        bv
    }

    /// Check for overlap in every direction
    pub fn intersects(&self, other: &BoundingVolume) -> bool {
        if self.kind != other.kind || self.is_empty() || other.is_empty() {
            return false;
        }
        self.slabs
            .iter()
            .zip(other.slabs.iter())
            .all(|(a, b)| a.min <= b.max && b.min <= a.max)
    }

    /// Check whether `other` lies completely inside this volume
    pub fn contains(&self, other: &BoundingVolume) -> bool {
        if other.is_empty() {
            return true;
        }
        if self.kind != other.kind || self.is_empty() {
            return false;
        }
        self.slabs
            .iter()
            .zip(other.slabs.iter())
            .all(|(a, b)| a.min <= b.min && b.max <= a.max)
    }

    /// Width along direction `k`
    pub fn extent(&self, k: usize) -> f64 {
        self.slabs.get(k).map(|s| s.width().max(0.0)).unwrap_or(0.0)
    }

    /// Index of the widest direction
    pub fn longest_direction(&self) -> usize {
        let mut best = 0;
        for k in 1..self.slabs.len() {
            if self.extent(k) > self.extent(best) {
                best = k;
            }
        }
        best
    }
}
