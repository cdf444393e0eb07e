//! Global force vector and sparse stiffness matrix

use crate::contact::types::LocalContribution;
use crate::error::{ContactSearchError, Result};
use nalgebra::DVector;
use nalgebra_sparse::{CooMatrix, CsrMatrix};

/// Caller-owned global system that contact contributions are scattered into
///
/// The stiffness is kept in coordinate format so that repeated scatter-adds
/// only append triplets; duplicates are summed on conversion to CSR.
#[derive(Debug, Clone)]
pub struct GlobalSystem {
    pub force: DVector<f64>,
    pub stiffness: CooMatrix<f64>,
}

impl GlobalSystem {
    pub fn new(num_dofs: usize) -> Self {
        Self {
            force: DVector::zeros(num_dofs),
            stiffness: CooMatrix::new(num_dofs, num_dofs),
        }
    }

    pub fn num_dofs(&self) -> usize {
        self.force.len()
    }

    /// Reset force and stiffness to zero
    pub fn clear(&mut self) {
        *self = Self::new(self.num_dofs());
    }

    /// Check a contribution against the system size without modifying anything
    pub fn check(&self, contribution: &LocalContribution) -> Result<()> {
        contribution.validate()?;
        if let Some(&gid) = contribution
            .dof_gids
            .iter()
            .find(|&&gid| gid >= self.num_dofs())
        {
            return Err(ContactSearchError::InvalidMeshTopology(format!(
                "DOF {} out of bounds for a global system with {} DOFs",
                gid,
                self.num_dofs()
            )));
        }
        Ok(())
    }

    /// Scatter-add a local contribution
    pub fn assemble(&mut self, contribution: &LocalContribution) -> Result<()> {
        self.check(contribution)?;
        self.scatter_add(contribution);
        Ok(())
    }

    /// Scatter-add a contribution that already passed [`GlobalSystem::check`]
    pub(crate) fn scatter_add(&mut self, contribution: &LocalContribution) {
        for (i, &gi) in contribution.dof_gids.iter().enumerate() {
            self.force[gi] += contribution.force[i];
            for (j, &gj) in contribution.dof_gids.iter().enumerate() {
                let value = contribution.stiffness[(i, j)];
                if value != 0.0 {
                    self.stiffness.push(gi, gj, value);
                }
            }
        }
    }

    /// Stiffness in compressed row format with duplicates summed
    pub fn stiffness_csr(&self) -> CsrMatrix<f64> {
        CsrMatrix::from(&self.stiffness)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::DMatrix;

    fn contribution(gids: Vec<usize>, scale: f64) -> LocalContribution {
        let n = gids.len();
        LocalContribution {
            dof_gids: gids,
            force: DVector::from_element(n, scale),
            stiffness: DMatrix::from_element(n, n, scale),
        }
    }

    #[test]
    fn test_scatter_add_sums_overlapping_dofs() {
        let mut system = GlobalSystem::new(4);
        system.assemble(&contribution(vec![0, 1], 1.0)).unwrap();
        system.assemble(&contribution(vec![1, 3], 2.0)).unwrap();

        assert_eq!(system.force.as_slice(), &[1.0, 3.0, 0.0, 2.0]);

        let dense = DMatrix::from(&system.stiffness_csr());
        assert_eq!(dense[(1, 1)], 3.0);
        assert_eq!(dense[(0, 3)], 0.0);
        assert_eq!(dense[(3, 1)], 2.0);
    }

    #[test]
    fn test_out_of_bounds_dof_leaves_system_untouched() {
        let mut system = GlobalSystem::new(2);
        assert!(system.assemble(&contribution(vec![0, 5], 1.0)).is_err());
        assert_eq!(system.force.sum(), 0.0);
        assert_eq!(system.stiffness.nnz(), 0);
    }

    #[test]
    fn test_clear() {
        let mut system = GlobalSystem::new(2);
        system.assemble(&contribution(vec![0, 1], 1.0)).unwrap();
        system.clear();
        assert_eq!(system.num_dofs(), 2);
        assert_eq!(system.stiffness.nnz(), 0);
    }
}
