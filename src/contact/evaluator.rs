//! Evaluation of a set of contact pairs into a global system
//!
//! All pairs are evaluated into local contributions first. Only if every
//! pair succeeded are the contributions scatter-added, each exactly once, so
//! a failing pair never leaves a partially assembled system behind.

use crate::contact::assembly::GlobalSystem;
use crate::contact::pair::ContactPair;
use crate::contact::types::{ContactPoint, LocalContribution};
use crate::error::{ContactSearchError, Result};
use crate::mesh::types::Discretization;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Below this number of pairs the evaluation runs serially
const PARALLEL_THRESHOLD: usize = 1000;

/// Owns a set of contact pairs and assembles their contributions
#[derive(Default)]
pub struct ContactPairEvaluator {
    pairs: Vec<Box<dyn ContactPair>>,
}

impl std::fmt::Debug for ContactPairEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let gids: Vec<(usize, usize)> = self.pairs.iter().map(|p| p.element_gids()).collect();
        f.debug_struct("ContactPairEvaluator")
            .field("pairs", &gids)
            .finish()
    }
}

impl ContactPairEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_pair(&mut self, pair: Box<dyn ContactPair>) {
        self.pairs.push(pair);
    }

    /// Replace all pairs
    pub fn set_pairs(&mut self, pairs: Vec<Box<dyn ContactPair>>) {
        self.pairs = pairs;
    }

    pub fn num_pairs(&self) -> usize {
        self.pairs.len()
    }

    pub fn pairs(&self) -> &[Box<dyn ContactPair>] {
        &self.pairs
    }

    /// Set up every pair; stops at the first failing pair
    pub fn setup(&mut self, disc: &dyn Discretization) -> Result<()> {
        for pair in self.pairs.iter_mut() {
            pair.setup(disc)?;
        }
        Ok(())
    }

    /// Evaluate all pairs and scatter-add their contributions
    ///
    /// Returns the number of active pairs. On error the global system is
    /// left unchanged.
    pub fn evaluate(&mut self, disc: &dyn Discretization, system: &mut GlobalSystem) -> Result<usize> {
        #[cfg(feature = "parallel")]
        let evaluated: Vec<Result<Option<LocalContribution>>> =
            if self.pairs.len() >= PARALLEL_THRESHOLD {
                self.pairs
                    .par_iter_mut()
                    .map(|pair| evaluate_pair(pair.as_mut(), disc))
                    .collect()
            } else {
                self.pairs
                    .iter_mut()
                    .map(|pair| evaluate_pair(pair.as_mut(), disc))
                    .collect()
            };

        #[cfg(not(feature = "parallel"))]
        let evaluated: Vec<Result<Option<LocalContribution>>> = self
            .pairs
            .iter_mut()
            .map(|pair| evaluate_pair(pair.as_mut(), disc))
            .collect();

        let contributions: Vec<LocalContribution> = evaluated
            .into_iter()
            .collect::<Result<Vec<_>>>()?
            .into_iter()
            .flatten()
            .collect();

        for contribution in &contributions {
            system.check(contribution)?;
        }
        for contribution in &contributions {
            system.scatter_add(contribution);
        }

        log::debug!(
            "Assembled {} active of {} contact pairs",
            contributions.len(),
            self.pairs.len()
        );
        Ok(contributions.len())
    }

    /// Active points of all pairs from the last evaluation
    pub fn contact_points(&self) -> Vec<ContactPoint> {
        self.pairs
            .iter()
            .flat_map(|pair| pair.contact_points().iter().cloned())
            .collect()
    }
}

fn evaluate_pair(
    pair: &mut dyn ContactPair,
    disc: &dyn Discretization,
) -> Result<Option<LocalContribution>> {
    let contribution = pair.evaluate(disc)?;
    if let Some(max) = pair.max_segments() {
        let found = pair.segments().len();
        if found > max {
            let (element1, element2) = pair.element_gids();
            return Err(ContactSearchError::TooManySegments {
                element1,
                element2,
                found,
            });
        }
    }
    Ok(contribution)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contact::types::Segment;
    use nalgebra::{DMatrix, DVector};
    use crate::mesh::types::BeamMesh;

    /// Pair returning a fixed contribution, or failing
    struct FixedPair {
        gids: (usize, usize),
        contribution: Option<LocalContribution>,
        segments: Vec<Segment>,
        max_segments: Option<usize>,
        fail: bool,
    }

    impl FixedPair {
        fn active(dofs: Vec<usize>) -> Self {
            let n = dofs.len();
            Self {
                gids: (0, 1),
                contribution: Some(LocalContribution {
                    dof_gids: dofs,
                    force: DVector::from_element(n, 1.0),
                    stiffness: DMatrix::identity(n, n),
                }),
                segments: Vec::new(),
                max_segments: None,
                fail: false,
            }
        }
    }

    impl ContactPair for FixedPair {
        fn element_gids(&self) -> (usize, usize) {
            self.gids
        }

        fn setup(&mut self, _disc: &dyn Discretization) -> Result<()> {
            Ok(())
        }

        fn evaluate(&mut self, _disc: &dyn Discretization) -> Result<Option<LocalContribution>> {
            if self.fail {
                return Err(ContactSearchError::GeometryError("failed".to_string()));
            }
            Ok(self.contribution.clone())
        }

        fn contact_points(&self) -> &[ContactPoint] {
            &[]
        }

        fn segments(&self) -> &[Segment] {
            &self.segments
        }

        fn max_segments(&self) -> Option<usize> {
            self.max_segments
        }
    }

    #[test]
    fn test_each_pair_is_assembled_once() {
        let mesh = BeamMesh::new();
        let mut evaluator = ContactPairEvaluator::new();
        evaluator.add_pair(Box::new(FixedPair::active(vec![0, 1])));
        evaluator.add_pair(Box::new(FixedPair::active(vec![1, 2])));
        let mut inactive = FixedPair::active(vec![2]);
        inactive.contribution = None;
        evaluator.add_pair(Box::new(inactive));

        let mut system = GlobalSystem::new(3);
        evaluator.setup(&mesh).unwrap();
        let active = evaluator.evaluate(&mesh, &mut system).unwrap();

        assert_eq!(active, 2);
        assert_eq!(system.force.as_slice(), &[1.0, 2.0, 1.0]);
        let dense = DMatrix::from(&system.stiffness_csr());
        assert_eq!(dense[(1, 1)], 2.0);
        assert_eq!(dense[(0, 2)], 0.0);
    }

    #[test]
    fn test_failing_pair_leaves_system_untouched() {
        let mesh = BeamMesh::new();
        let mut evaluator = ContactPairEvaluator::new();
        evaluator.add_pair(Box::new(FixedPair::active(vec![0, 1])));
        let mut failing = FixedPair::active(vec![1, 2]);
        failing.fail = true;
        evaluator.add_pair(Box::new(failing));

        let mut system = GlobalSystem::new(3);
        assert!(evaluator.evaluate(&mesh, &mut system).is_err());
        assert_eq!(system.force.sum(), 0.0);
        assert_eq!(system.stiffness.nnz(), 0);
    }

    #[test]
    fn test_out_of_bounds_contribution_leaves_system_untouched() {
        let mesh = BeamMesh::new();
        let mut evaluator = ContactPairEvaluator::new();
        evaluator.add_pair(Box::new(FixedPair::active(vec![0, 1])));
        evaluator.add_pair(Box::new(FixedPair::active(vec![1, 7])));

        let mut system = GlobalSystem::new(3);
        assert!(evaluator.evaluate(&mesh, &mut system).is_err());
        assert_eq!(system.force.sum(), 0.0);
    }

    #[test]
    fn test_segment_limit_is_enforced() {
        let mesh = BeamMesh::new();
        let mut pair = FixedPair::active(vec![0]);
        pair.max_segments = Some(1);
        pair.segments = vec![
            Segment {
                xi_start: -0.5,
                xi_end: -0.2,
            },
            Segment {
                xi_start: 0.1,
                xi_end: 0.4,
            },
        ];
        let mut evaluator = ContactPairEvaluator::new();
        evaluator.set_pairs(vec![Box::new(pair)]);

        let mut system = GlobalSystem::new(1);
        assert!(matches!(
            evaluator.evaluate(&mesh, &mut system),
            Err(ContactSearchError::TooManySegments { found: 2, .. })
        ));
    }
}
