//! Contact evaluation data types

use crate::error::{ContactSearchError, Result};
use crate::mesh::types::Point;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

/// An evaluated interaction point between two beam elements
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactPoint {
    /// Slave (or first) element id
    pub element1: usize,

    /// Master (or second) element id
    pub element2: usize,

    /// Parameter coordinate on element 1
    pub xi1: f64,

    /// Parameter coordinate on element 2
    pub xi2: f64,

    /// Centerline point on element 1
    pub position1: Point,

    /// Centerline point on element 2
    pub position2: Point,

    /// Signed gap between the beam surfaces (negative for penetration).
    /// For point couplings this is the centerline distance.
    pub gap: f64,

    /// Penalty force density at the point
    pub force: f64,

    /// Integration weight including the element Jacobian (1 for point couplings)
    pub weight: f64,
}

impl ContactPoint {
    /// Penalty energy carried by the point
    pub fn energy(&self, penalty_parameter: f64) -> f64 {
        0.5 * penalty_parameter * self.gap * self.gap * self.weight
    }
}

/// Contiguous active parameter range on element 1
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub xi_start: f64,
    pub xi_end: f64,
}

/// Element-pair force vector and stiffness matrix with their global DOF ids
#[derive(Debug, Clone, PartialEq)]
pub struct LocalContribution {
    pub dof_gids: Vec<usize>,
    pub force: DVector<f64>,
    pub stiffness: DMatrix<f64>,
}

impl LocalContribution {
    /// Zero contribution over the given DOFs
    pub fn zeros(dof_gids: Vec<usize>) -> Self {
        let n = dof_gids.len();
        Self {
            dof_gids,
            force: DVector::zeros(n),
            stiffness: DMatrix::zeros(n, n),
        }
    }

    pub fn num_dofs(&self) -> usize {
        self.dof_gids.len()
    }

    /// Check that force and stiffness match the DOF id list
    pub fn validate(&self) -> Result<()> {
        let n = self.dof_gids.len();
        if self.force.len() != n || self.stiffness.shape() != (n, n) {
            return Err(ContactSearchError::InvalidMeshTopology(format!(
                "Local contribution over {} DOFs has force of length {} and stiffness of shape {:?}",
                n,
                self.force.len(),
                self.stiffness.shape()
            )));
        }
        Ok(())
    }
}

/// Outcome of one contact evaluation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContactResults {
    /// Candidate element pairs reported by the search
    pub candidate_pairs: Vec<(usize, usize)>,

    /// Number of pairs evaluated (line contact and point coupling)
    pub num_pairs_evaluated: usize,

    /// Number of pairs that contributed to the global system
    pub num_active_pairs: usize,

    /// All active contact and coupling points
    pub contact_points: Vec<ContactPoint>,
}

impl ContactResults {
    pub fn num_contact_points(&self) -> usize {
        self.contact_points.len()
    }

    /// Smallest gap over all contact points
    pub fn min_gap(&self) -> Option<f64> {
        self.contact_points.iter().map(|p| p.gap).reduce(f64::min)
    }

    /// Print summary statistics
    pub fn print_summary(&self) {
        println!("\n{}", "=".repeat(60));
        println!("BEAM CONTACT RESULTS");
        println!("{}", "=".repeat(60));
        println!();
        println!("  Candidate Pairs: {}", self.candidate_pairs.len());
        println!("  Evaluated Pairs: {}", self.num_pairs_evaluated);
        println!("  Active Pairs:    {}", self.num_active_pairs);
        println!("  Contact Points:  {}", self.num_contact_points());
        if let Some(gap) = self.min_gap() {
            println!("  Min Gap:         {:.6}", gap);
        }
        println!();
        println!("{}", "=".repeat(60));
    }
}
